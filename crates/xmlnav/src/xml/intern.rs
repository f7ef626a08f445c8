//! Interning of element and attribute names
//!
//! Map data repeats a handful of names (`node`, `tag`, `nd`, `k`, `v`, ...)
//! millions of times. Parsers store every name through a [`NameInterner`] so
//! each distinct name is allocated once; the interner can be shared between
//! parsers running on different threads.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

/// Shared, immutable element or attribute name
pub type Name = Arc<str>;

#[derive(Debug, Default)]
pub struct NameInterner {
    names: RwLock<HashSet<Arc<str>>>,
}

impl NameInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&self, s: &str) -> Name {
        if let Some(interned) = self.names.read().get(s) {
            return Arc::clone(interned);
        }

        let mut write_guard = self.names.write();
        if let Some(interned) = write_guard.get(s) {
            return Arc::clone(interned);
        }
        let interned: Name = Arc::from(s);
        write_guard.insert(Arc::clone(&interned));
        interned
    }

    /// Number of distinct names seen so far
    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_shares_allocation() {
        let interner = NameInterner::new();
        let a = interner.intern("node");
        let b = interner.intern("node");
        let c = interner.intern("way");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_shared_across_threads() {
        let interner = Arc::new(NameInterner::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let interner = Arc::clone(&interner);
                std::thread::spawn(move || interner.intern("tag"))
            })
            .collect();

        let names: Vec<Name> = handles.into_iter().filter_map(|h| h.join().ok()).collect();
        assert_eq!(names.len(), 4);
        assert!(names.windows(2).all(|w| match w {
            [left, right] => Arc::ptr_eq(left, right),
            _ => false,
        }));
        assert_eq!(interner.len(), 1);
    }
}
