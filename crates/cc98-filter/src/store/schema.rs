//! `SQLite` schema definitions for the block list store.

/// SQL statement to create the blocked entities table.
///
/// `position` keeps the insertion order of each list; timestamps are epoch
/// milliseconds.
pub const CREATE_BLOCKED_ENTITIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS blocked_entities (
    kind TEXT NOT NULL,
    id TEXT NOT NULL,
    position INTEGER NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    first_seen_ms INTEGER NOT NULL,
    last_seen_ms INTEGER NOT NULL,
    custom_label TEXT,
    PRIMARY KEY (kind, id)
)
";

/// SQL statement to create an index for ordered per-kind reads.
pub const CREATE_POSITION_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_blocked_entities_position ON blocked_entities(kind, position)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_BLOCKED_ENTITIES_TABLE,
    CREATE_POSITION_INDEX,
    CREATE_METADATA_TABLE,
];
