use rusqlite::Connection;

pub fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schools (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            center_code TEXT,
            latitude    REAL,
            longitude   REAL
        );

        CREATE TABLE IF NOT EXISTS persons (
            id           TEXT PRIMARY KEY,
            school_id    TEXT NOT NULL,
            classroom    TEXT NOT NULL,
            display_name TEXT
        );

        CREATE TABLE IF NOT EXISTS responses (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            person_id      TEXT NOT NULL,
            role           TEXT NOT NULL,
            submitted_at   TEXT NOT NULL, -- fixed-width RFC 3339, sorts chronologically
            total_score    INTEGER NOT NULL,
            severity       TEXT NOT NULL,
            flags          TEXT NOT NULL, -- JSON
            recommendation TEXT NOT NULL,
            blocks         TEXT NOT NULL  -- JSON
        );

        CREATE INDEX IF NOT EXISTS idx_persons_school ON persons(school_id);
        CREATE INDEX IF NOT EXISTS idx_responses_person_recency
            ON responses(person_id, submitted_at DESC, id DESC);
        ",
    )?;
    Ok(())
}
