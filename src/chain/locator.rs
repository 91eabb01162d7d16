//! Parent locator records.
//!
//! A locator is an ordered string map that a differencing layer stores in its
//! own metadata to find its parent.  Concrete image formats marshal it to and
//! from their binary layout; here it is format-agnostic and serializes as a
//! JSON object.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

pub const KEY_RELATIVE_PATH:  &str = "relative_path";
pub const KEY_ABSOLUTE_PATH:  &str = "absolute_path";
pub const KEY_PARENT_LINKAGE: &str = "parent_linkage";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParentLocatorRecord {
    entries: BTreeMap<String, String>,
}

impl ParentLocatorRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locator for `parent`, as seen from a child stored at `child`.
    ///
    /// The relative entry is only recorded when the parent lives under the
    /// child's directory; the absolute entry is always recorded.
    pub fn for_parent(parent: &Path, child: &Path, parent_identity: Uuid) -> Self {
        let mut rec = Self::new();
        let child_dir = child.parent().unwrap_or_else(|| Path::new(""));
        if let Ok(rel) = parent.strip_prefix(child_dir) {
            rec.insert(KEY_RELATIVE_PATH, rel.to_string_lossy());
        }
        let absolute = std::path::absolute(parent).unwrap_or_else(|_| parent.to_path_buf());
        rec.insert(KEY_ABSOLUTE_PATH, absolute.to_string_lossy());
        rec.insert(KEY_PARENT_LINKAGE, parent_identity.to_string());
        rec
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn relative_path(&self) -> Option<&str> {
        self.get(KEY_RELATIVE_PATH).filter(|p| !p.is_empty())
    }

    pub fn absolute_path(&self) -> Option<&str> {
        self.get(KEY_ABSOLUTE_PATH).filter(|p| !p.is_empty())
    }

    /// The identity token the parent must carry.  `None` when absent or not
    /// a well-formed UUID.
    pub fn parent_identity(&self) -> Option<Uuid> {
        self.get(KEY_PARENT_LINKAGE).and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Candidate parent paths in resolution order: relative to the child's
    /// directory first, then the absolute path recorded at creation.
    pub fn candidates(&self, child: &Path) -> Vec<PathBuf> {
        let mut out = Vec::with_capacity(2);
        if let Some(rel) = self.relative_path() {
            let dir = child.parent().unwrap_or_else(|| Path::new(""));
            out.push(dir.join(rel));
        }
        if let Some(abs) = self.absolute_path() {
            out.push(PathBuf::from(abs));
        }
        out
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_try_relative_before_absolute() {
        let mut rec = ParentLocatorRecord::new();
        rec.insert(KEY_ABSOLUTE_PATH, "/images/base.img");
        rec.insert(KEY_RELATIVE_PATH, "base.img");

        let got = rec.candidates(Path::new("/work/child.img"));
        assert_eq!(got, vec![PathBuf::from("/work/base.img"), PathBuf::from("/images/base.img")]);
    }

    #[test]
    fn malformed_linkage_is_not_an_identity() {
        let mut rec = ParentLocatorRecord::new();
        rec.insert(KEY_PARENT_LINKAGE, "not-a-uuid");
        assert_eq!(rec.parent_identity(), None);
    }

    #[test]
    fn serializes_as_plain_map() {
        let id = Uuid::new_v4();
        let rec = ParentLocatorRecord::for_parent(
            Path::new("/disks/base.img"),
            Path::new("/disks/child.img"),
            id,
        );
        assert_eq!(rec.relative_path(), Some("base.img"));
        assert_eq!(rec.parent_identity(), Some(id));

        let bytes = rec.to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value[KEY_PARENT_LINKAGE], id.to_string());
        assert_eq!(ParentLocatorRecord::from_bytes(&bytes).unwrap(), rec);
    }
}
