use rusqlite::Connection;

use consult_core::error::Result;

/// Initialise the sessions table and its indexes. Safe to call on every
/// startup — uses `IF NOT EXISTS` throughout. Schema matches §6.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            session_id        TEXT PRIMARY KEY,
            room_name         TEXT NOT NULL DEFAULT '',
            unique_link       TEXT NOT NULL UNIQUE,
            status            TEXT NOT NULL DEFAULT 'active',
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL,
            dialogue_history  TEXT NOT NULL DEFAULT '[]',
            anketa_data       TEXT,
            anketa_md         TEXT,
            company_name      TEXT,
            contact_name      TEXT,
            duration_seconds  REAL NOT NULL DEFAULT 0.0,
            output_dir        TEXT,
            document_context  TEXT,
            voice_config      TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_status
            ON sessions(status, updated_at DESC);
        CREATE INDEX IF NOT EXISTS idx_sessions_unique_link
            ON sessions(unique_link);",
    )?;
    Ok(())
}
