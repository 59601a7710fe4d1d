//! SQL statement constants for database operations

pub const CREATE_MIGRATIONS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL,
    description TEXT NOT NULL
)
"#;

pub const CREATE_POLLS_TABLE_SQL: &str = r#"
CREATE TABLE polls (
    id TEXT NOT NULL PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    is_active INTEGER NOT NULL,
    allow_multiple_votes INTEGER NOT NULL,
    ends_at TEXT,
    created_by TEXT,
    created_at TEXT NOT NULL
)
"#;

pub const CREATE_POLL_OPTIONS_TABLE_SQL: &str = r#"
CREATE TABLE poll_options (
    poll_id TEXT NOT NULL REFERENCES polls(id) ON DELETE CASCADE,
    option_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    PRIMARY KEY (poll_id, option_id)
)
"#;

pub const CREATE_VOTE_RECORDS_TABLE_SQL: &str = r#"
CREATE TABLE vote_records (
    poll_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    option_ids TEXT NOT NULL, -- array
    created_at TEXT NOT NULL,
    PRIMARY KEY (poll_id, user_id)
)
"#;

pub const CREATE_OPTION_TALLIES_TABLE_SQL: &str = r#"
CREATE TABLE option_tallies (
    poll_id TEXT NOT NULL,
    option_id TEXT NOT NULL,
    votes INTEGER NOT NULL,
    PRIMARY KEY (poll_id, option_id)
)
"#;

pub const CREATE_DB_INDEXES: &[&str] = &[
    "CREATE INDEX idx_polls_created_at ON polls(created_at)",
    "CREATE INDEX idx_poll_options_position ON poll_options(poll_id, position)",
];

pub const SELECT_POLL_SQL: &str = "SELECT * FROM polls WHERE id = ?";

pub const SELECT_POLLS_SQL: &str = "SELECT * FROM polls ORDER BY created_at DESC, id";

pub const SELECT_POLL_OPTIONS_SQL: &str =
    "SELECT * FROM poll_options WHERE poll_id = ? ORDER BY position";

pub const SELECT_ALL_POLL_OPTIONS_SQL: &str =
    "SELECT * FROM poll_options ORDER BY poll_id, position";

pub const INSERT_POLL_SQL: &str = "INSERT INTO polls \
     (id, title, description, is_active, allow_multiple_votes, ends_at, created_by, created_at) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

pub const INSERT_POLL_OPTION_SQL: &str =
    "INSERT INTO poll_options (poll_id, option_id, position, text) VALUES (?, ?, ?, ?)";

pub const UPDATE_POLL_ACTIVE_SQL: &str = "UPDATE polls SET is_active = ? WHERE id = ?";

pub const INSERT_VOTE_RECORD_SQL: &str =
    "INSERT INTO vote_records (poll_id, user_id, option_ids, created_at) VALUES (?, ?, ?, ?)";

pub const INCREMENT_OPTION_TALLY_SQL: &str =
    "INSERT INTO option_tallies (poll_id, option_id, votes) \
     VALUES (?, ?, 1) \
     ON CONFLICT(poll_id, option_id) DO UPDATE SET votes = votes + 1";

pub const SELECT_TALLY_SQL: &str =
    "SELECT option_id, votes FROM option_tallies WHERE poll_id = ?";

pub const SELECT_POLL_TOTAL_SQL: &str =
    "SELECT COALESCE(SUM(votes), 0) FROM option_tallies WHERE poll_id = ?";

pub const SELECT_VOTE_RECORD_SQL: &str =
    "SELECT * FROM vote_records WHERE poll_id = ? AND user_id = ?";
