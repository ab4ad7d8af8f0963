use chrono::Duration;
use greenr_core::{
  footprint::{CommuteMode, NewCommute, NewHouse, NewItem},
  questionnaire::{
    AnswerValue, NewQuestionnaire, NewResponse, QuestionnaireStatus,
  },
  store::TrackerStore,
  user::NewUser,
};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{Error, SCHEMA_VERSION, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory().await.unwrap()
}

fn sample_user(email: &str, user_name: &str) -> NewUser {
  NewUser {
    email:         email.to_string(),
    user_name:     user_name.to_string(),
    first_name:    Some("ferdi".to_string()),
    password_hash: "$argon2id$fake".to_string(),
  }
}

fn dec(s: &str) -> Decimal { s.parse().unwrap() }

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn migrations_reach_current_version() {
  let store = store().await;
  assert_eq!(store.schema_version().await.unwrap(), SCHEMA_VERSION);
}

#[tokio::test]
async fn migrations_replace_flat_survey_tables() {
  let store = store().await;
  let count = store
    .raw_query_i64(
      "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
       ('questions', 'answers')"
        .to_string(),
    )
    .await
    .unwrap();
  assert_eq!(count, 0);
  let count = store
    .raw_query_i64(
      "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
       ('questionnaire', 'response', 'response_item')"
        .to_string(),
    )
    .await
    .unwrap();
  assert_eq!(count, 3);
}

#[tokio::test]
async fn fresh_database_has_all_named_indexes() {
  let store = store().await;
  let count = store
    .raw_query_i64(
      "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name NOT \
       LIKE 'sqlite_%'"
        .to_string(),
    )
    .await
    .unwrap();
  assert_eq!(count, 10);
}

#[tokio::test]
async fn reopening_an_existing_file_preserves_data() {
  let path =
    std::env::temp_dir().join(format!("greenr-test-{}.db", Uuid::new_v4()));
  {
    let store = SqliteStore::open(&path).await.unwrap();
    store
      .create_user(sample_user("a@example.com", "alpha"))
      .await
      .unwrap();
  }

  let store = SqliteStore::open(&path).await.unwrap();
  assert_eq!(store.schema_version().await.unwrap(), SCHEMA_VERSION);
  assert!(
    store
      .get_user_by_email("a@example.com")
      .await
      .unwrap()
      .is_some()
  );

  drop(store);
  for suffix in ["", "-wal", "-shm"] {
    let mut file = path.clone().into_os_string();
    file.push(suffix);
    std::fs::remove_file(file).ok();
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_fetch_user() {
  let store = store().await;
  let user = store
    .create_user(sample_user("a@example.com", "alpha"))
    .await
    .unwrap();

  let by_id = store.get_user(user.user_id).await.unwrap().unwrap();
  assert_eq!(by_id.email, "a@example.com");
  assert_eq!(by_id.user_name.as_deref(), Some("alpha"));
  assert_eq!(by_id.created_at, user.created_at);

  let by_email = store
    .get_user_by_email("a@example.com")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(by_email.user_id, user.user_id);

  assert!(store.get_user(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_is_a_constraint_error() {
  let store = store().await;
  store
    .create_user(sample_user("a@example.com", "alpha"))
    .await
    .unwrap();
  let err = store
    .create_user(sample_user("a@example.com", "beta"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Constraint(_)), "got {err:?}");
}

#[tokio::test]
async fn duplicate_user_name_is_a_constraint_error() {
  let store = store().await;
  store
    .create_user(sample_user("a@example.com", "alpha"))
    .await
    .unwrap();
  let err = store
    .create_user(sample_user("b@example.com", "alpha"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Constraint(_)), "got {err:?}");
}

#[tokio::test]
async fn over_long_user_name_is_rejected_before_sql() {
  let store = store().await;
  let err = store
    .create_user(sample_user("a@example.com", "a-name-over-twenty-chars"))
    .await
    .unwrap_err();
  assert!(
    matches!(
      err,
      Error::Core(greenr_core::Error::FieldTooLong { .. })
    ),
    "got {err:?}"
  );
}

#[tokio::test]
async fn upsert_preserves_identity_and_updates_fields() {
  let store = store().await;
  let original = store
    .upsert_user(sample_user("a@example.com", "alpha"))
    .await
    .unwrap();

  let mut update = sample_user("a@example.com", "alpha2");
  update.password_hash = "$argon2id$new".to_string();
  let updated = store.upsert_user(update).await.unwrap();

  assert_eq!(updated.user_id, original.user_id);
  assert_eq!(updated.created_at, original.created_at);
  assert!(updated.updated_at > original.updated_at);
  assert_eq!(updated.user_name.as_deref(), Some("alpha2"));
  assert_eq!(updated.password_hash, "$argon2id$new");

  let count = store
    .raw_query_i64("SELECT COUNT(*) FROM users".to_string())
    .await
    .unwrap();
  assert_eq!(count, 1);
}

#[tokio::test]
async fn over_long_first_name_is_rejected_before_sql() {
  let store = store().await;
  let mut input = sample_user("a@example.com", "alpha");
  input.first_name = Some("z".repeat(21));
  let err = store.create_user(input).await.unwrap_err();
  assert!(
    matches!(
      err,
      Error::Core(greenr_core::Error::FieldTooLong { .. })
    ),
    "got {err:?}"
  );
}

#[tokio::test]
async fn length_checks_are_backstopped_by_the_schema() {
  let store = store().await;
  // Straight past the typed API: the CHECK constraint still fires.
  let err = store
    .raw_execute(format!(
      "INSERT INTO users (user_id, email, first_name, password_hash, \
       created_at, updated_at) VALUES ('u1', 'raw@example.com', '{}', 'h', \
       't', 't')",
      "z".repeat(21)
    ))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Constraint(_)), "got {err:?}");
}

#[tokio::test]
async fn update_password_requires_existing_user() {
  let store = store().await;
  let err = store
    .update_password(Uuid::new_v4(), "$argon2id$x".to_string())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UserNotFound(_)), "got {err:?}");
}

// ─── Houses / items / commutes ───────────────────────────────────────────────

#[tokio::test]
async fn house_roundtrip() {
  let store = store().await;
  let user = store
    .create_user(sample_user("a@example.com", "alpha"))
    .await
    .unwrap();

  store
    .add_house(user.user_id, NewHouse {
      energy_label: Some("B".to_string()),
      size_m2:      Some(85),
    })
    .await
    .unwrap();

  let houses = store.list_houses(user.user_id).await.unwrap();
  assert_eq!(houses.len(), 1);
  assert_eq!(houses[0].energy_label.as_deref(), Some("B"));
  assert_eq!(houses[0].size_m2, Some(85));
}

#[tokio::test]
async fn item_decimals_keep_fixed_scale() {
  let store = store().await;
  let user = store
    .create_user(sample_user("a@example.com", "alpha"))
    .await
    .unwrap();

  store
    .add_item(user.user_id, NewItem {
      item_name:        "laptop".to_string(),
      date_of_purchase: Some("2024-03-15".parse().unwrap()),
      use_case:         Some("work".to_string()),
      price:            Some(dec("899.999")),
      footprint_kg:     Some(dec("184.2")),
    })
    .await
    .unwrap();

  let items = store.list_items(user.user_id).await.unwrap();
  assert_eq!(items.len(), 1);
  // Price is stored at scale 2, footprint at scale 3.
  assert_eq!(items[0].price, Some(dec("900.00")));
  assert_eq!(items[0].footprint_kg, Some(dec("184.200")));
  assert_eq!(
    items[0].date_of_purchase,
    Some("2024-03-15".parse().unwrap())
  );
}

#[tokio::test]
async fn over_long_item_fields_are_rejected_before_sql() {
  let store = store().await;
  let user = store
    .create_user(sample_user("a@example.com", "alpha"))
    .await
    .unwrap();

  let err = store
    .add_item(user.user_id, NewItem::new("x".repeat(51)))
    .await
    .unwrap_err();
  assert!(
    matches!(
      err,
      Error::Core(greenr_core::Error::FieldTooLong { field: "item_name", .. })
    ),
    "got {err:?}"
  );

  let mut item = NewItem::new("kettle");
  item.use_case = Some("y".repeat(21));
  let err = store.add_item(user.user_id, item).await.unwrap_err();
  assert!(
    matches!(
      err,
      Error::Core(greenr_core::Error::FieldTooLong { field: "use_case", .. })
    ),
    "got {err:?}"
  );

  assert!(store.list_items(user.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn item_for_unknown_user_hits_the_foreign_key() {
  let store = store().await;
  let err = store
    .add_item(Uuid::new_v4(), NewItem {
      item_name:        "laptop".to_string(),
      date_of_purchase: None,
      use_case:         None,
      price:            None,
      footprint_kg:     None,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Constraint(_)), "got {err:?}");
}

#[tokio::test]
async fn commute_roundtrip() {
  let store = store().await;
  let user = store
    .create_user(sample_user("a@example.com", "alpha"))
    .await
    .unwrap();

  store
    .add_commute(user.user_id, NewCommute {
      mode:                         CommuteMode::PublicTransport,
      distance_km_per_trip:         dec("23.5"),
      times_per_week:               4,
      work_from_home_days_per_week: 1,
    })
    .await
    .unwrap();

  let commutes = store.list_commutes(user.user_id).await.unwrap();
  assert_eq!(commutes.len(), 1);
  assert_eq!(commutes[0].mode, CommuteMode::PublicTransport);
  assert_eq!(commutes[0].distance_km_per_trip, dec("23.500"));
  assert_eq!(commutes[0].times_per_week, 4);
}

#[tokio::test]
async fn negative_integer_columns_are_a_decode_error() {
  let store = store().await;
  let user = store
    .create_user(sample_user("a@example.com", "alpha"))
    .await
    .unwrap();
  store
    .add_commute(user.user_id, NewCommute {
      mode:                         CommuteMode::Car,
      distance_km_per_trip:         dec("10"),
      times_per_week:               5,
      work_from_home_days_per_week: 0,
    })
    .await
    .unwrap();

  store
    .raw_execute("UPDATE commutes SET times_per_week = -1".to_string())
    .await
    .unwrap();

  let err = store.list_commutes(user.user_id).await.unwrap_err();
  assert!(matches!(err, Error::IntegerOutOfRange(_)), "got {err:?}");
}

// ─── Questionnaires ──────────────────────────────────────────────────────────

const DEFINITION: &str = r#"{"questions":[{"id":"q1","type":"text"}]}"#;

#[tokio::test]
async fn fresh_questionnaire_starts_at_version_one() {
  let store = store().await;
  let q = store
    .create_questionnaire(NewQuestionnaire::new("Home energy", DEFINITION))
    .await
    .unwrap();
  assert_eq!(q.version, 1);
  assert_eq!(q.status, QuestionnaireStatus::Draft);
  assert!(q.supersedes_id.is_none());
  assert!(q.replaced_by_id.is_none());
}

#[tokio::test]
async fn superseding_chains_versions_and_demotes_the_predecessor() {
  let store = store().await;
  let v1 = store
    .create_questionnaire(NewQuestionnaire::new("Home energy", DEFINITION))
    .await
    .unwrap();
  let v1 = store.publish_questionnaire(v1.id).await.unwrap();
  assert_eq!(v1.status, QuestionnaireStatus::Active);

  let mut input = NewQuestionnaire::new("Home energy v2", DEFINITION);
  input.supersedes_id = Some(v1.id);
  let v2 = store.create_questionnaire(input).await.unwrap();

  assert_eq!(v2.canonical_id, v1.canonical_id);
  assert_eq!(v2.version, 2);
  assert_eq!(v2.supersedes_id, Some(v1.id));

  let v1_after = store.get_questionnaire(v1.id).await.unwrap().unwrap();
  assert_eq!(v1_after.status, QuestionnaireStatus::Inactive);
  assert_eq!(v1_after.replaced_by_id, Some(v2.id));

  let versions = store.list_versions(v1.canonical_id).await.unwrap();
  assert_eq!(
    versions.iter().map(|q| q.version).collect::<Vec<_>>(),
    vec![1, 2]
  );
}

#[tokio::test]
async fn superseding_a_draft_leaves_it_draft() {
  let store = store().await;
  let v1 = store
    .create_questionnaire(NewQuestionnaire::new("Home energy", DEFINITION))
    .await
    .unwrap();

  let mut input = NewQuestionnaire::new("Home energy v2", DEFINITION);
  input.supersedes_id = Some(v1.id);
  store.create_questionnaire(input).await.unwrap();

  let v1_after = store.get_questionnaire(v1.id).await.unwrap().unwrap();
  assert_eq!(v1_after.status, QuestionnaireStatus::Draft);
  assert!(v1_after.replaced_by_id.is_some());
}

#[tokio::test]
async fn superseding_an_unknown_questionnaire_fails() {
  let store = store().await;
  let mut input = NewQuestionnaire::new("Home energy v2", DEFINITION);
  input.supersedes_id = Some(Uuid::new_v4());
  let err = store.create_questionnaire(input).await.unwrap_err();
  assert!(matches!(err, Error::QuestionnaireNotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn publish_keeps_at_most_one_version_active() {
  let store = store().await;
  let v1 = store
    .create_questionnaire(NewQuestionnaire::new("Home energy", DEFINITION))
    .await
    .unwrap();
  let mut input = NewQuestionnaire::new("Home energy v2", DEFINITION);
  input.canonical_id = Some(v1.canonical_id);
  let v2 = store.create_questionnaire(input).await.unwrap();
  assert_eq!(v2.version, 2);

  store.publish_questionnaire(v1.id).await.unwrap();
  let published = store.publish_questionnaire(v2.id).await.unwrap();
  assert_eq!(published.status, QuestionnaireStatus::Active);

  let v1_after = store.get_questionnaire(v1.id).await.unwrap().unwrap();
  assert_eq!(v1_after.status, QuestionnaireStatus::Inactive);
  assert_eq!(v1_after.replaced_by_id, Some(v2.id));

  let active = store
    .active_questionnaire(v1.canonical_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(active.id, v2.id);

  let active_count = store
    .raw_query_i64(format!(
      "SELECT COUNT(*) FROM questionnaire WHERE canonical_id = '{}' AND \
       status = 'active'",
      v1.canonical_id
    ))
    .await
    .unwrap();
  assert_eq!(active_count, 1);
}

#[tokio::test]
async fn publish_unknown_questionnaire_fails() {
  let store = store().await;
  let err = store.publish_questionnaire(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::QuestionnaireNotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn invalid_definition_json_is_rejected() {
  let store = store().await;
  let err = store
    .create_questionnaire(NewQuestionnaire::new("Broken", "{not json"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(_)), "got {err:?}");
}

// ─── Responses ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_response_records_items_and_definition_hash() {
  let store = store().await;
  let user = store
    .create_user(sample_user("a@example.com", "alpha"))
    .await
    .unwrap();
  let q = store
    .create_questionnaire(NewQuestionnaire::new("Home energy", DEFINITION))
    .await
    .unwrap();

  let mut input = NewResponse::new(q.id)
    .answer("q1", AnswerValue::Text("gas boiler".to_string()))
    .answer("q2", AnswerValue::Numeric(dec("12.5")))
    .answer("q3", AnswerValue::Choice("opt_a".to_string()));
  input.user_id = Some(user.user_id);

  let response = store.submit_response(input).await.unwrap();
  assert_eq!(response.canonical_id, q.canonical_id);
  assert_eq!(response.user_id, Some(user.user_id));
  assert_eq!(
    response.definition_hash,
    hex::encode(Sha256::digest(DEFINITION.as_bytes()))
  );

  let blob: serde_json::Value =
    serde_json::from_str(&response.answers_json).unwrap();
  assert_eq!(blob["q1"], "gas boiler");
  assert_eq!(blob["q2"], "12.5");
  assert_eq!(blob["q3"], "opt_a");

  let items = store.response_items(response.id).await.unwrap();
  assert_eq!(items.len(), 3);
  assert_eq!(
    items[0].answer,
    AnswerValue::Text("gas boiler".to_string())
  );
  assert_eq!(items[1].answer, AnswerValue::Numeric(dec("12.5000")));
  assert_eq!(items[2].answer, AnswerValue::Choice("opt_a".to_string()));

  let fetched = store.get_response(response.id).await.unwrap().unwrap();
  assert_eq!(fetched.answers_json, response.answers_json);
}

#[tokio::test]
async fn numeric_answers_agree_across_both_representations() {
  let store = store().await;
  let q = store
    .create_questionnaire(NewQuestionnaire::new("Home energy", DEFINITION))
    .await
    .unwrap();

  // More precision than the column holds: both the blob and the item row
  // must land on the same scale-4 value.
  let response = store
    .submit_response(
      NewResponse::new(q.id)
        .answer("q1", AnswerValue::Numeric(dec("1.23456"))),
    )
    .await
    .unwrap();

  let blob: serde_json::Value =
    serde_json::from_str(&response.answers_json).unwrap();
  assert_eq!(blob["q1"], "1.2346");

  let items = store.response_items(response.id).await.unwrap();
  let AnswerValue::Numeric(stored) = &items[0].answer else {
    panic!("expected a numeric answer, got {:?}", items[0].answer);
  };
  assert_eq!(blob["q1"], stored.to_string());
}

#[tokio::test]
async fn anonymous_responses_are_allowed() {
  let store = store().await;
  let q = store
    .create_questionnaire(NewQuestionnaire::new("Home energy", DEFINITION))
    .await
    .unwrap();

  let response = store
    .submit_response(
      NewResponse::new(q.id)
        .answer("q1", AnswerValue::Text("no".to_string())),
    )
    .await
    .unwrap();
  assert!(response.user_id.is_none());
}

#[tokio::test]
async fn submitting_to_an_unknown_questionnaire_fails_atomically() {
  let store = store().await;
  let err = store
    .submit_response(
      NewResponse::new(Uuid::new_v4())
        .answer("q1", AnswerValue::Text("x".to_string())),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::QuestionnaireNotFound(_)), "got {err:?}");

  let count = store
    .raw_query_i64("SELECT COUNT(*) FROM response_item".to_string())
    .await
    .unwrap();
  assert_eq!(count, 0);
}

#[tokio::test]
async fn responses_aggregate_across_versions() {
  let store = store().await;
  let v1 = store
    .create_questionnaire(NewQuestionnaire::new("Home energy", DEFINITION))
    .await
    .unwrap();
  let mut input = NewQuestionnaire::new("Home energy v2", DEFINITION);
  input.supersedes_id = Some(v1.id);
  let v2 = store.create_questionnaire(input).await.unwrap();

  store
    .submit_response(
      NewResponse::new(v1.id)
        .answer("q1", AnswerValue::Text("a".to_string())),
    )
    .await
    .unwrap();
  store
    .submit_response(
      NewResponse::new(v2.id)
        .answer("q1", AnswerValue::Text("b".to_string())),
    )
    .await
    .unwrap();

  let all = store.list_responses(v1.canonical_id).await.unwrap();
  assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn response_item_check_rejects_ambiguous_rows() {
  let store = store().await;
  let err = store
    .raw_execute(
      "INSERT INTO response_item (id, response_id, question_id, answer_text, \
       answer_numeric) VALUES ('i1', 'r1', 'q1', 'both', '1.0')"
        .to_string(),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Constraint(_)), "got {err:?}");
}

#[tokio::test]
async fn response_item_requires_an_existing_response() {
  let store = store().await;
  let err = store
    .raw_execute(
      "INSERT INTO response_item (id, response_id, question_id, answer_text) \
       VALUES ('i1', 'missing', 'q1', 'orphan')"
        .to_string(),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Constraint(_)), "got {err:?}");
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn password_reset_happy_path() {
  let store = store().await;
  let user = store
    .create_user(sample_user("a@example.com", "alpha"))
    .await
    .unwrap();

  let token = store
    .create_password_reset_token(user.user_id, Duration::hours(1))
    .await
    .unwrap();
  assert!(token.used_at.is_none());

  store
    .consume_password_reset_token(
      token.token.clone(),
      "$argon2id$new".to_string(),
    )
    .await
    .unwrap();

  let user_after = store.get_user(user.user_id).await.unwrap().unwrap();
  assert_eq!(user_after.password_hash, "$argon2id$new");

  let token_after = store
    .get_password_reset_token(&token.token)
    .await
    .unwrap()
    .unwrap();
  assert!(token_after.used_at.is_some());
}

#[tokio::test]
async fn password_reset_token_is_single_use() {
  let store = store().await;
  let user = store
    .create_user(sample_user("a@example.com", "alpha"))
    .await
    .unwrap();
  let token = store
    .create_password_reset_token(user.user_id, Duration::hours(1))
    .await
    .unwrap();

  store
    .consume_password_reset_token(token.token.clone(), "$h1".to_string())
    .await
    .unwrap();
  let err = store
    .consume_password_reset_token(token.token, "$h2".to_string())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ResetTokenUsed), "got {err:?}");

  // The second attempt must not have touched the hash.
  let user_after = store.get_user(user.user_id).await.unwrap().unwrap();
  assert_eq!(user_after.password_hash, "$h1");
}

#[tokio::test]
async fn expired_reset_token_is_rejected() {
  let store = store().await;
  let user = store
    .create_user(sample_user("a@example.com", "alpha"))
    .await
    .unwrap();
  let token = store
    .create_password_reset_token(user.user_id, Duration::seconds(-5))
    .await
    .unwrap();

  let err = store
    .consume_password_reset_token(token.token, "$h".to_string())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ResetTokenExpired), "got {err:?}");
}

#[tokio::test]
async fn unknown_reset_token_is_rejected() {
  let store = store().await;
  let err = store
    .consume_password_reset_token("nope".to_string(), "$h".to_string())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ResetTokenNotFound), "got {err:?}");
}

#[tokio::test]
async fn reset_token_requires_existing_user() {
  let store = store().await;
  let err = store
    .create_password_reset_token(Uuid::new_v4(), Duration::hours(1))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UserNotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn refresh_token_lifecycle() {
  let store = store().await;
  let user = store
    .create_user(sample_user("a@example.com", "alpha"))
    .await
    .unwrap();

  let token = store
    .create_refresh_token(user.user_id, Duration::days(30))
    .await
    .unwrap();
  // 32 random bytes, URL-safe base64 without padding.
  assert_eq!(token.token.len(), 43);

  let fetched = store
    .get_refresh_token(&token.token)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.user_id, user.user_id);
  assert!(fetched.revoked_at.is_none());

  let revoked = store.revoke_refresh_token(&token.token).await.unwrap();
  assert!(revoked.revoked_at.is_some());

  let err = store.revoke_refresh_token(&token.token).await.unwrap_err();
  assert!(matches!(err, Error::RefreshTokenRevoked), "got {err:?}");

  let err = store.revoke_refresh_token("missing").await.unwrap_err();
  assert!(matches!(err, Error::RefreshTokenNotFound), "got {err:?}");
}

#[tokio::test]
async fn tokens_are_unique_per_issue() {
  let store = store().await;
  let user = store
    .create_user(sample_user("a@example.com", "alpha"))
    .await
    .unwrap();

  let a = store
    .create_refresh_token(user.user_id, Duration::days(30))
    .await
    .unwrap();
  let b = store
    .create_refresh_token(user.user_id, Duration::days(30))
    .await
    .unwrap();
  assert_ne!(a.token, b.token);
}
