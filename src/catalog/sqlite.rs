//! Reference `CatalogSource` backed by `rusqlite`, mirroring the way the
//! teacher crate's `auth::user_store::UserStore` owns a SQLite connection.
//!
//! This is one concrete stand-in for the real SQL-style catalog store named
//! as an external collaborator in spec §1 — useful for local runs and tests,
//! not a claim about the production catalog's schema.

use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use rusqlite::Connection;

use super::{CatalogSource, Creative, Folder, User};
use crate::error::CatalogLoadError;
use crate::pseudonym::Pseudonyms;

pub struct SqliteCatalogSource {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogSource {
    pub fn open(db_path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(db_path).context("failed to open catalog database")?;
        let source = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        source.init_schema()?;
        Ok(source)
    }

    /// In-memory instance, handy for tests.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory catalog")?;
        let source = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        source.init_schema()?;
        Ok(source)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS folders (
                id INTEGER PRIMARY KEY,
                parent_id INTEGER,
                active INTEGER NOT NULL,
                cpc INTEGER NOT NULL,
                country TEXT NOT NULL DEFAULT '',
                brand TEXT NOT NULL DEFAULT '',
                network TEXT NOT NULL DEFAULT '',
                network_type TEXT NOT NULL DEFAULT '',
                subnetwork TEXT NOT NULL DEFAULT '',
                gender TEXT NOT NULL DEFAULT '',
                device_type TEXT NOT NULL DEFAULT '',
                vertical TEXT NOT NULL DEFAULT '',
                creatives TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS creatives (
                id INTEGER PRIMARY KEY,
                redirect_url TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY
            );
            CREATE TABLE IF NOT EXISTS pseudonyms (
                dimension TEXT NOT NULL,
                value TEXT NOT NULL,
                id INTEGER NOT NULL,
                PRIMARY KEY (dimension, value)
            );",
        )
        .context("failed to initialize catalog schema")?;
        Ok(())
    }

    /// Runs arbitrary SQL against the underlying connection. Meant for
    /// seeding fixtures in tests and local runs, not production use.
    pub fn exec_batch(&self, sql: &str) -> rusqlite::Result<()> {
        self.conn.lock().execute_batch(sql)
    }

    fn parse_ids(raw: &str) -> Vec<i64> {
        raw.split(',')
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect()
    }
}

#[async_trait::async_trait]
impl CatalogSource for SqliteCatalogSource {
    async fn load_folders(&self) -> Result<Vec<Folder>, CatalogLoadError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, parent_id, active, cpc, country, brand, network, network_type,
                        subnetwork, gender, device_type, vertical, creatives FROM folders",
            )
            .map_err(|e| CatalogLoadError::Folders(e.into()))?;

        let mut by_id: std::collections::HashMap<i64, Vec<i64>> = std::collections::HashMap::new();
        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let parent_id: Option<i64> = row.get(1)?;
                let active: i64 = row.get(2)?;
                let cpc: i64 = row.get(3)?;
                let country: String = row.get(4)?;
                let brand: String = row.get(5)?;
                let network: String = row.get(6)?;
                let network_type: String = row.get(7)?;
                let subnetwork: String = row.get(8)?;
                let gender: String = row.get(9)?;
                let device_type: String = row.get(10)?;
                let vertical: String = row.get(11)?;
                let creatives: String = row.get(12)?;
                Ok(Folder {
                    id,
                    parent_id,
                    children: Vec::new(),
                    active: active != 0,
                    cpc,
                    creatives: Self::parse_ids(&creatives),
                    country: Self::parse_ids(&country),
                    brand: Self::parse_ids(&brand),
                    network: Self::parse_ids(&network),
                    network_type: Self::parse_ids(&network_type),
                    subnetwork: Self::parse_ids(&subnetwork),
                    gender: Self::parse_ids(&gender),
                    device_type: Self::parse_ids(&device_type),
                    vertical: Self::parse_ids(&vertical),
                })
            })
            .map_err(|e| CatalogLoadError::Folders(e.into()))?;

        let mut folders = Vec::new();
        for row in rows {
            let folder = row.map_err(|e| CatalogLoadError::Folders(e.into()))?;
            if let Some(parent) = folder.parent_id {
                by_id.entry(parent).or_default().push(folder.id);
            }
            folders.push(folder);
        }

        for folder in &mut folders {
            if let Some(children) = by_id.remove(&folder.id) {
                folder.children = children;
            }
        }

        Ok(folders)
    }

    async fn load_creatives(&self) -> Result<Vec<Creative>, CatalogLoadError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, redirect_url FROM creatives")
            .map_err(|e| CatalogLoadError::Creatives(e.into()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Creative {
                    id: row.get(0)?,
                    redirect_url: row.get(1)?,
                })
            })
            .map_err(|e| CatalogLoadError::Creatives(e.into()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| CatalogLoadError::Creatives(e.into()))
    }

    async fn load_users(&self) -> Result<Vec<User>, CatalogLoadError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id FROM users")
            .map_err(|e| CatalogLoadError::Users(e.into()))?;
        let rows = stmt
            .query_map([], |row| Ok(User { id: row.get(0)? }))
            .map_err(|e| CatalogLoadError::Users(e.into()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| CatalogLoadError::Users(e.into()))
    }

    async fn load_pseudonyms(&self) -> Result<Pseudonyms, CatalogLoadError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT dimension, value, id FROM pseudonyms")
            .map_err(|e| CatalogLoadError::Pseudonyms(e.into()))?;
        let rows = stmt
            .query_map([], |row| {
                let dimension: String = row.get(0)?;
                let value: String = row.get(1)?;
                let id: i64 = row.get(2)?;
                Ok((dimension, value, id))
            })
            .map_err(|e| CatalogLoadError::Pseudonyms(e.into()))?;

        let mut pseudonyms = Pseudonyms::default();
        for row in rows {
            let (dimension, value, id) = row.map_err(|e| CatalogLoadError::Pseudonyms(e.into()))?;
            let table = match dimension.as_str() {
                "country" => &mut pseudonyms.country,
                "network" => &mut pseudonyms.network,
                "subnetwork" => &mut pseudonyms.subnetwork,
                "network_type" => &mut pseudonyms.network_type,
                "device_type" => &mut pseudonyms.device_type,
                "brand" => &mut pseudonyms.brand,
                "brand_slug" => &mut pseudonyms.brand_slug,
                "vertical" => &mut pseudonyms.vertical,
                "gender" => &mut pseudonyms.gender,
                other => {
                    tracing::warn!(dimension = other, "unknown pseudonym dimension, skipping row");
                    continue;
                }
            };
            table.insert(value, id);
        }
        Ok(pseudonyms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_source() -> (SqliteCatalogSource, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let source = SqliteCatalogSource::open(temp_file.path().to_str().unwrap()).unwrap();
        (source, temp_file)
    }

    #[tokio::test]
    async fn open_on_disk_persists_schema_across_reopen() {
        let (source, temp_file) = create_test_source();
        source
            .exec_batch("INSERT INTO folders (id, parent_id, active, cpc, creatives) VALUES (1, NULL, 1, 500, '9')")
            .unwrap();
        drop(source);

        let reopened = SqliteCatalogSource::open(temp_file.path().to_str().unwrap()).unwrap();
        let folders = reopened.load_folders().await.unwrap();
        assert_eq!(folders.len(), 1);
    }

    #[tokio::test]
    async fn empty_catalog_loads_cleanly() {
        let source = SqliteCatalogSource::open_in_memory().unwrap();
        assert!(source.load_folders().await.unwrap().is_empty());
        assert!(source.load_creatives().await.unwrap().is_empty());
        assert!(source.load_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn folder_children_are_linked_from_parent_id() {
        let source = SqliteCatalogSource::open_in_memory().unwrap();
        {
            let conn = source.conn.lock();
            conn.execute(
                "INSERT INTO folders (id, parent_id, active, cpc, creatives) VALUES (1, NULL, 1, 300, '')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO folders (id, parent_id, active, cpc, creatives) VALUES (2, 1, 1, 0, '9')",
                [],
            )
            .unwrap();
        }
        let folders = source.load_folders().await.unwrap();
        let root = folders.iter().find(|f| f.id == 1).unwrap();
        assert_eq!(root.children, vec![2]);
    }
}
