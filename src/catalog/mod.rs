//! C2 — catalog data model and the `CatalogSource` external-collaborator trait.
//!
//! The catalog source (folders, creatives, users, pseudonyms) is, per spec §1,
//! out of scope: an SQL-style store loaded periodically. This module defines
//! the shape of that data and the trait boundary; [`sqlite::SqliteCatalogSource`]
//! is a reference implementation used by tests and local runs.

pub mod sqlite;

use std::collections::HashMap;

use crate::error::CatalogLoadError;
use crate::pseudonym::Pseudonyms;

/// A campaign node. See spec §3 for the invariants this type must uphold:
/// a non-root folder's id appears in its parent's `children`, and the tree
/// is at most two levels deep (roots and leaves only).
#[derive(Debug, Clone, Default)]
pub struct Folder {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub children: Vec<i64>,
    pub active: bool,
    /// CPC in integer micro-units; 0 means "inherit from parent at evaluation time".
    pub cpc: i64,
    pub creatives: Vec<i64>,
    pub country: Vec<i64>,
    pub brand: Vec<i64>,
    pub network: Vec<i64>,
    pub network_type: Vec<i64>,
    pub subnetwork: Vec<i64>,
    pub gender: Vec<i64>,
    pub device_type: Vec<i64>,
    pub vertical: Vec<i64>,
}

/// A creative: an id plus a redirect-URL template containing brace-delimited
/// placeholders (spec §6).
#[derive(Debug, Clone, Default)]
pub struct Creative {
    pub id: i64,
    pub redirect_url: String,
}

/// Opaque to this core; consulted only by the pluggable selector (spec §3).
#[derive(Debug, Clone, Default)]
pub struct User {
    pub id: i64,
}

/// An indexed view over a flat folder list, keyed by folder id, as the
/// filter needs (`ByID` in the original).
#[derive(Debug, Clone, Default)]
pub struct Folders {
    by_id: HashMap<i64, Folder>,
    roots: Vec<i64>,
}

impl Folders {
    pub fn from_vec(folders: Vec<Folder>) -> Self {
        let mut by_id = HashMap::with_capacity(folders.len());
        let mut roots = Vec::new();
        for folder in folders {
            if folder.parent_id.is_none() {
                roots.push(folder.id);
            }
            by_id.insert(folder.id, folder);
        }
        Self { by_id, roots }
    }

    pub fn by_id(&self, id: i64) -> Option<&Folder> {
        self.by_id.get(&id)
    }

    /// Root folder ids, in insertion order. The eligibility filter (C7) walks
    /// only these, then each root's children (spec §4.3).
    pub fn roots(&self) -> &[i64] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Creatives {
    by_id: HashMap<i64, Creative>,
}

impl Creatives {
    pub fn from_vec(creatives: Vec<Creative>) -> Self {
        let by_id = creatives.into_iter().map(|c| (c.id, c)).collect();
        Self { by_id }
    }

    pub fn by_id(&self, id: i64) -> Option<&Creative> {
        self.by_id.get(&id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Users {
    by_id: HashMap<i64, User>,
}

impl Users {
    pub fn from_vec(users: Vec<User>) -> Self {
        let by_id = users.into_iter().map(|u| (u.id, u)).collect();
        Self { by_id }
    }

    pub fn by_id(&self, id: i64) -> Option<&User> {
        self.by_id.get(&id)
    }
}

/// External collaborator boundary (spec §1, §6): a read-only SQL-style store
/// supplying folder rows (with child/parent linkage), creative rows, user
/// rows, and the nine pseudonym tables. Implementations are expected to be
/// cheap to call repeatedly — C3 invokes this once per reload cycle.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load_folders(&self) -> Result<Vec<Folder>, CatalogLoadError>;
    async fn load_creatives(&self) -> Result<Vec<Creative>, CatalogLoadError>;
    async fn load_users(&self) -> Result<Vec<User>, CatalogLoadError>;
    async fn load_pseudonyms(&self) -> Result<Pseudonyms, CatalogLoadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folders_index_roots_separately_from_children() {
        let folders = vec![
            Folder {
                id: 1,
                parent_id: None,
                children: vec![2],
                active: true,
                ..Default::default()
            },
            Folder {
                id: 2,
                parent_id: Some(1),
                active: true,
                ..Default::default()
            },
        ];
        let index = Folders::from_vec(folders);
        assert_eq!(index.roots(), &[1]);
        assert_eq!(index.by_id(2).unwrap().parent_id, Some(1));
        assert_eq!(index.len(), 2);
    }
}
