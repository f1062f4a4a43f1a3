//! Linear name-to-name replacement table.
use crate::name::QName;

/// An ordered table of `(source, target)` name pairs.
///
/// Lookups walk the entries in insertion order and stop at the first
/// structural match.  A source whose local part is `*` matches every name
/// in its namespace; the result then combines the target's namespace with
/// the local name that was looked up.  Because the scan is strictly
/// ordered, an exact entry only wins over a wildcard entry for the same
/// namespace when it was inserted first.
#[derive(Debug, Clone, Default)]
pub struct RenameTable {
    entries: Vec<(QName, QName)>,
}

impl RenameTable {
    /// Creates an empty table.
    pub fn new() -> RenameTable {
        RenameTable::default()
    }

    /// Creates an empty table with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> RenameTable {
        RenameTable {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Appends an entry.  Existing entries are never replaced.
    pub fn put(&mut self, source: QName, target: QName) {
        self.entries.push((source, target));
    }

    /// Looks up the replacement for a name.
    ///
    /// `None` means the name passes through unchanged.
    pub fn get(&self, name: &QName) -> Option<QName> {
        for (source, target) in &self.entries {
            if source.ns() != name.ns() {
                continue;
            }
            if source.local_name() == name.local_name() {
                return Some(target.clone());
            }
            if source.is_wildcard() {
                if target.ns() == name.ns() {
                    return Some(name.clone());
                }
                return Some(QName::new(target.ns(), name.local_name()));
            }
        }
        None
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the table empty?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
