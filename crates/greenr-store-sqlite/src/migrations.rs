//! Ordered schema migrations, gated on `PRAGMA user_version`.
//!
//! One step per historical schema revision. Each step runs in its own
//! transaction and bumps `user_version` on success, so a failed step leaves
//! the file at the previous revision and re-running provisioning is always
//! safe.
//!
//! Timestamps are RFC 3339 UTC text, UUIDs hyphenated lowercase text, and
//! decimal columns fixed-scale decimal strings (see `encode`).

use rusqlite::Connection;

/// The schema revision this build writes and expects.
pub const SCHEMA_VERSION: u32 = 4;

/// Connection-level pragmas; applied at open, not versioned.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// Revision 1 — baseline: core entities plus the original flat
/// questions/answers survey pair (replaced in revision 3).
const V1_BASELINE: &str = "
CREATE TABLE users (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    first_name    TEXT CHECK (length(first_name) <= 20),
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE houses (
    house_id     TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES users(user_id),
    energy_label TEXT,
    size_m2      INTEGER,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE items (
    item_id          TEXT PRIMARY KEY,
    user_id          TEXT NOT NULL REFERENCES users(user_id),
    item_name        TEXT NOT NULL CHECK (length(item_name) <= 50),
    date_of_purchase TEXT,
    use_case         TEXT CHECK (length(use_case) <= 20),
    price            TEXT,    -- decimal(10,2)
    footprint_kg     TEXT,    -- decimal(10,3)
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE commutes (
    commute_id                   TEXT PRIMARY KEY,
    user_id                      TEXT NOT NULL REFERENCES users(user_id),
    mode                         TEXT NOT NULL,
    distance_km_per_trip         TEXT NOT NULL,    -- decimal(10,3)
    times_per_week               INTEGER NOT NULL,
    work_from_home_days_per_week INTEGER NOT NULL,
    created_at                   TEXT NOT NULL,
    updated_at                   TEXT NOT NULL
);

CREATE TABLE questions (
    question_id   TEXT PRIMARY KEY,
    question_text TEXT NOT NULL,
    category      TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE answers (
    answer_id   TEXT PRIMARY KEY,
    user_id     TEXT REFERENCES users(user_id),
    question_id TEXT REFERENCES questions(question_id),
    answer_text TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX houses_user_idx   ON houses(user_id);
CREATE INDEX items_user_idx    ON items(user_id);
CREATE INDEX commutes_user_idx ON commutes(user_id);
";

/// Revision 2 — user names. Added by ALTER, so the column stays nullable at
/// the schema level; the store API requires it on every write.
const V2_USER_NAMES: &str = "
ALTER TABLE users ADD COLUMN user_name TEXT CHECK (length(user_name) <= 20);
CREATE UNIQUE INDEX users_user_name_idx ON users(user_name);
";

/// Revision 3 — the flat survey pair is replaced by versioned questionnaire
/// documents with normalised per-question response items.
const V3_QUESTIONNAIRES: &str = "
DROP TABLE answers;
DROP TABLE questions;

CREATE TABLE questionnaire (
    id              TEXT PRIMARY KEY,
    canonical_id    TEXT NOT NULL,
    version         INTEGER NOT NULL CHECK (version >= 1),
    title           TEXT NOT NULL,
    definition_json TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'draft'
                    CHECK (status IN ('draft', 'active', 'inactive')),
    supersedes_id   TEXT REFERENCES questionnaire(id),
    replaced_by_id  TEXT REFERENCES questionnaire(id),
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    UNIQUE (canonical_id, version)
);

CREATE TABLE response (
    id               TEXT PRIMARY KEY,
    questionnaire_id TEXT NOT NULL REFERENCES questionnaire(id),
    canonical_id     TEXT NOT NULL,
    user_id          TEXT REFERENCES users(user_id),
    submitted_at     TEXT NOT NULL,
    definition_hash  TEXT NOT NULL,
    answers_json     TEXT NOT NULL
);

-- Exactly one answer representation per row.
CREATE TABLE response_item (
    id               TEXT PRIMARY KEY,
    response_id      TEXT NOT NULL REFERENCES response(id),
    question_id      TEXT NOT NULL,
    answer_text      TEXT,
    answer_numeric   TEXT,    -- decimal(18,4)
    answer_choice_id TEXT,
    CHECK (
        (answer_text IS NOT NULL) + (answer_numeric IS NOT NULL)
        + (answer_choice_id IS NOT NULL) = 1
    )
);

CREATE INDEX questionnaire_canonical_idx ON questionnaire(canonical_id);
CREATE INDEX response_canonical_idx     ON response(canonical_id);
CREATE INDEX response_user_idx          ON response(user_id);
CREATE INDEX response_item_response_idx ON response_item(response_id);
";

/// Revision 4 — auth-token tables. Rows are marked used/revoked, never
/// deleted.
const V4_TOKENS: &str = "
CREATE TABLE password_reset_tokens (
    token      TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    expires_at TEXT NOT NULL,
    used_at    TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE refresh_tokens (
    token      TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    expires_at TEXT NOT NULL,
    revoked_at TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX password_reset_tokens_user_idx ON password_reset_tokens(user_id);
CREATE INDEX refresh_tokens_user_idx        ON refresh_tokens(user_id);
";

const MIGRATIONS: [&str; SCHEMA_VERSION as usize] =
  [V1_BASELINE, V2_USER_NAMES, V3_QUESTIONNAIRES, V4_TOKENS];

/// Apply all pending migrations. Returns the number of steps applied.
pub fn apply(conn: &mut Connection) -> rusqlite::Result<u32> {
  let mut applied = 0;
  loop {
    let version: u32 =
      conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version >= SCHEMA_VERSION {
      return Ok(applied);
    }

    let step = MIGRATIONS[version as usize];
    let tx = conn.transaction()?;
    tx.execute_batch(step)?;
    tx.pragma_update(None, "user_version", version + 1)?;
    tx.commit()?;
    applied += 1;
  }
}
