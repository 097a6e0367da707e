use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// How package code touches a global name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    Read,
    ReadWrite,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::ReadWrite => "read-write",
        }
    }

    pub fn is_write(&self) -> bool {
        *self == Access::ReadWrite
    }
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global names referenced by a file or a whole package version.
///
/// Once a name is recorded as [`Access::ReadWrite`] it stays that way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalUsage(BTreeMap<String, Access>);

impl GlobalUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &str, access: Access) {
        match self.0.get_mut(name) {
            Some(existing) => {
                if access.is_write() {
                    *existing = Access::ReadWrite;
                }
            }
            None => {
                self.0.insert(name.to_string(), access);
            }
        }
    }

    pub fn merge(&mut self, other: &GlobalUsage) {
        for (name, access) in &other.0 {
            self.record(name, *access);
        }
    }

    pub fn get(&self, name: &str) -> Option<Access> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Access> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a GlobalUsage {
    type Item = (&'a String, &'a Access);
    type IntoIter = btree_map::Iter<'a, String, Access>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<(S, Access)> for GlobalUsage {
    fn from_iter<I: IntoIterator<Item = (S, Access)>>(iter: I) -> Self {
        let mut usage = GlobalUsage::new();
        for (name, access) in iter {
            usage.record(&name.into(), access);
        }
        usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_dominates() {
        let mut usage = GlobalUsage::new();
        usage.record("x", Access::ReadWrite);
        usage.record("x", Access::Read);
        assert_eq!(usage.get("x"), Some(Access::ReadWrite));

        usage.record("y", Access::Read);
        usage.record("y", Access::ReadWrite);
        assert_eq!(usage.get("y"), Some(Access::ReadWrite));
    }

    #[test]
    fn test_merge_is_order_independent() {
        let a: GlobalUsage = [("fetch", Access::Read), ("y", Access::ReadWrite)].into_iter().collect();
        let b: GlobalUsage = [("fetch", Access::ReadWrite), ("y", Access::Read)].into_iter().collect();

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);

        assert_eq!(ab, ba);
        assert_eq!(ab.get("fetch"), Some(Access::ReadWrite));
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let usage: GlobalUsage = [("y", Access::ReadWrite), ("fetch", Access::Read)].into_iter().collect();
        assert_eq!(
            serde_json::to_string(&usage).unwrap(),
            r#"{"fetch":"read","y":"read-write"}"#
        );
    }
}
