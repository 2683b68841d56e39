// src/contacts.rs
//! Local contact book: a JSON id → name cache next to the profile file.
//! Purely a convenience layer; every lookup degrades to the server or the
//! raw id when the cache has no answer, and a missing or corrupt file just
//! means an empty book.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

const CONTACTS_FILE: &str = "contacts.json";

#[derive(Error, Debug)]
pub enum ContactError {
    #[error("contact file io: {0}")]
    Io(#[from] std::io::Error),
    #[error("contact file encode: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct ContactBook {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl ContactBook {
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(CONTACTS_FILE);
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!("contacts file unreadable, starting empty: {err}");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    pub fn get(&self, user_id: &str) -> Option<&str> {
        self.entries.get(user_id).map(String::as_str)
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.entries.contains_key(user_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Contacts in stable (id-sorted) order for numbered listings.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
    }

    pub fn nth(&self, index: usize) -> Option<(&str, &str)> {
        self.iter().nth(index)
    }

    /// Add or rename a contact and persist the book.
    pub fn insert(&mut self, user_id: &str, name: &str) -> Result<(), ContactError> {
        self.entries.insert(user_id.to_string(), name.to_string());
        self.save()
    }

    fn save(&self) -> Result<(), ContactError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut book = ContactBook::load(dir.path());
        assert!(book.is_empty());

        book.insert("12345678", "ada").unwrap();
        book.insert("87654321", "grace").unwrap();

        let reloaded = ContactBook::load(dir.path());
        assert_eq!(reloaded.iter().count(), 2);
        assert_eq!(reloaded.get("12345678"), Some("ada"));
        assert_eq!(reloaded.get("87654321"), Some("grace"));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONTACTS_FILE), "not json {").unwrap();

        let book = ContactBook::load(dir.path());
        assert!(book.is_empty());
    }

    #[test]
    fn listing_order_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let mut book = ContactBook::load(dir.path());
        book.insert("99999999", "zed").unwrap();
        book.insert("11111111", "amy").unwrap();

        let ids: Vec<&str> = book.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["11111111", "99999999"]);
        assert_eq!(book.nth(0), Some(("11111111", "amy")));
    }
}
