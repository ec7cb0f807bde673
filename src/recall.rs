//! C4 — recall sink: fire-and-forget persistence of the decision record,
//! returning a sink-assigned numeric id (spec §3 "Recall record", §4.4, §6).

use serde::Serialize;

use crate::flight::DemandFlight;

/// The serialized [`DemandFlight`], minus transport fields and the
/// runtime/snapshot reference (spec §3, §6: keys `folder`, `creative`,
/// `req`, `margin`).
#[derive(Debug, Serialize)]
pub struct RecallRecord<'a> {
    pub folder: i64,
    pub creative: i64,
    pub req: &'a crate::request::ResolvedRequest,
    pub margin: i64,
}

impl<'a> RecallRecord<'a> {
    pub fn from_flight(flight: &'a DemandFlight) -> Self {
        Self {
            folder: flight.folder_id,
            creative: flight.creative_id,
            req: &flight.request,
            margin: flight.margin,
        }
    }
}

/// External collaborator boundary (spec §1, §6): an opaque key-value service
/// that assigns a numeric recall id on insert. Expected to be internally
/// thread-safe (spec §5); monotonicity of assigned ids is not required.
#[async_trait::async_trait]
pub trait RecallSink: Send + Sync {
    async fn save(&self, record: &RecallRecord<'_>) -> anyhow::Result<i64>;
}

/// Reference implementation backed by `rusqlite`, for local runs and tests —
/// the production recall store is the opaque out-of-scope KVS named in
/// spec §1.
pub struct SqliteRecallSink {
    conn: std::sync::Arc<parking_lot::Mutex<rusqlite::Connection>>,
}

impl SqliteRecallSink {
    pub fn open(db_path: &str) -> anyhow::Result<Self> {
        let conn = rusqlite::Connection::open(db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS recalls (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                payload TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: std::sync::Arc::new(parking_lot::Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS recalls (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                payload TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: std::sync::Arc::new(parking_lot::Mutex::new(conn)),
        })
    }
}

#[async_trait::async_trait]
impl RecallSink for SqliteRecallSink {
    async fn save(&self, record: &RecallRecord<'_>) -> anyhow::Result<i64> {
        let payload = serde_json::to_string(record)?;
        let conn = self.conn.lock();
        conn.execute("INSERT INTO recalls (payload) VALUES (?1)", rusqlite::params![payload])?;
        Ok(conn.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ResolvedRequest;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn save_persists_to_disk_and_survives_reopen() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();
        let req = ResolvedRequest::default();
        let record = RecallRecord {
            folder: 1,
            creative: 9,
            req: &req,
            margin: 10,
        };

        let id = {
            let sink = SqliteRecallSink::open(path).unwrap();
            sink.save(&record).await.unwrap()
        };

        let reopened = SqliteRecallSink::open(path).unwrap();
        let second = reopened.save(&record).await.unwrap();
        assert!(second > id);
    }

    #[tokio::test]
    async fn save_assigns_monotonic_ids_in_this_reference_impl() {
        let sink = SqliteRecallSink::open_in_memory().unwrap();
        let req = ResolvedRequest::default();
        let record = RecallRecord {
            folder: 1,
            creative: 9,
            req: &req,
            margin: 10,
        };
        let first = sink.save(&record).await.unwrap();
        let second = sink.save(&record).await.unwrap();
        assert!(second > first);
    }
}
