//! Keyspace and table bootstrap
//!
//! Tables are created on startup; there is no separate migration step.
//! Timestamps are stored as epoch milliseconds (bigint).

use scylla::Session;

use crate::error::PersistenceError;

/// Create the keyspace if it does not exist
pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {keyspace}
         WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {replication_factor}}}"
    );

    session
        .query_unpaged(query, ())
        .await
        .map_err(|e| PersistenceError::SchemaError(e.to_string()))?;

    Ok(())
}

/// Create all tables if they do not exist
pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    let tables = [
        format!(
            "CREATE TABLE IF NOT EXISTS {keyspace}.phone_numbers (
                number text PRIMARY KEY,
                id uuid,
                status text,
                last_called bigint,
                created_at bigint
            )"
        ),
        // Counters cannot share a table with regular columns
        format!(
            "CREATE TABLE IF NOT EXISTS {keyspace}.phone_number_stats (
                number text PRIMARY KEY,
                call_count counter
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {keyspace}.calls (
                call_sid text PRIMARY KEY,
                phone_number text,
                direction text,
                status text,
                start_time bigint,
                end_time bigint,
                duration_secs int
            )"
        ),
        // Partition key call_sid enforces one recording per call
        format!(
            "CREATE TABLE IF NOT EXISTS {keyspace}.recordings (
                call_sid text PRIMARY KEY,
                id uuid,
                recording_sid text,
                file_url text,
                file_size bigint,
                duration_secs int,
                transcription_id uuid,
                created_at bigint
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {keyspace}.transcriptions (
                id uuid PRIMARY KEY,
                recording_id uuid,
                call_sid text,
                text text,
                status text,
                created_at bigint,
                updated_at bigint
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {keyspace}.questions (
                id uuid PRIMARY KEY,
                text text,
                display_order int
            )"
        ),
        // Clustering on question_id makes re-analysis an upsert
        format!(
            "CREATE TABLE IF NOT EXISTS {keyspace}.answers (
                transcription_id uuid,
                question_id uuid,
                question_text text,
                answer text,
                created_at bigint,
                PRIMARY KEY (transcription_id, question_id)
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {keyspace}.settings (
                name text PRIMARY KEY,
                value text
            )"
        ),
    ];

    for query in tables {
        session
            .query_unpaged(query, ())
            .await
            .map_err(|e| PersistenceError::SchemaError(e.to_string()))?;
    }

    Ok(())
}
