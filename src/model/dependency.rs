use serde::{Deserialize, Serialize};
use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;

/// A resolved `name@version` pair observed in a lock file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyKey {
    pub name: String,
    pub version: String,
}

impl DependencyKey {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Every dependency pinned by one lock-file snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySet {
    entries: BTreeSet<DependencyKey>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: DependencyKey) -> bool {
        self.entries.insert(key)
    }

    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, DependencyKey> {
        self.entries.iter()
    }

    /// Entries of `self` that are not in `base`.
    pub fn difference(&self, base: &DependencySet) -> DependencyChange {
        DependencyChange {
            added: self.entries.difference(&base.entries).cloned().collect(),
        }
    }
}

impl FromIterator<DependencyKey> for DependencySet {
    fn from_iter<I: IntoIterator<Item = DependencyKey>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DependencySet {
    type Item = &'a DependencyKey;
    type IntoIter = btree_set::Iter<'a, DependencyKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Dependencies introduced by a change: new versions and new packages alike.
///
/// Removed versions never appear here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyChange {
    added: BTreeSet<DependencyKey>,
}

impl DependencyChange {
    /// Treats every entry of a freshly added lock file as introduced.
    pub fn all(set: DependencySet) -> Self {
        Self { added: set.entries }
    }

    /// Merges the changes of several lock files touched by the same change request.
    pub fn union(&mut self, other: DependencyChange) {
        self.added.extend(other.added);
    }

    pub fn retain(&mut self, keep: impl FnMut(&DependencyKey) -> bool) {
        self.added.retain(keep);
    }

    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.added.contains(key)
    }

    pub fn len(&self) -> usize {
        self.added.len()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }

    /// Entries in `name@version` order.
    pub fn iter(&self) -> btree_set::Iter<'_, DependencyKey> {
        self.added.iter()
    }
}

impl FromIterator<DependencyKey> for DependencyChange {
    fn from_iter<I: IntoIterator<Item = DependencyKey>>(iter: I) -> Self {
        Self {
            added: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DependencyChange {
    type Item = &'a DependencyKey;
    type IntoIter = btree_set::Iter<'a, DependencyKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.added.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(keys: &[(&str, &str)]) -> DependencySet {
        keys.iter().map(|(n, v)| DependencyKey::new(*n, *v)).collect()
    }

    #[test]
    fn test_key_display() {
        assert_eq!(DependencyKey::new("@babel/core", "7.24.0").to_string(), "@babel/core@7.24.0");
    }

    #[test]
    fn test_difference_ignores_removed() {
        let old = set(&[("a", "1.0.0"), ("b", "1.0.0")]);
        let new = set(&[("a", "1.0.0"), ("c", "2.0.0")]);

        let change = new.difference(&old);
        assert_eq!(change.len(), 1);
        assert!(change.contains(&DependencyKey::new("c", "2.0.0")));
        assert!(!change.contains(&DependencyKey::new("b", "1.0.0")));
    }

    #[test]
    fn test_union_deduplicates() {
        let mut first = DependencyChange::all(set(&[("a", "1.0.0")]));
        first.union(DependencyChange::all(set(&[("a", "1.0.0"), ("b", "2.0.0")])));

        let keys: Vec<String> = first.iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["a@1.0.0", "b@2.0.0"]);
    }
}
