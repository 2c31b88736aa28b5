//! Declarator interning.
//!
//! Declarator identity is bytewise string equality, not pointer identity:
//! the same name arriving from two different call sites must match. The
//! table interns each distinct name once and hands out sequential ids that
//! fit the entry header's 16-bit identity field. `IndexSet` keeps insertion
//! order, so ids double as first-seen order.

use indexmap::IndexSet;
use stunt_core::DeclaratorId;

/// Interning table mapping declarator names to [`DeclaratorId`]s.
#[derive(Default)]
pub(crate) struct DeclaratorTable {
    names: IndexSet<&'static str>,
}

impl DeclaratorTable {
    /// Intern a name, returning its id; equal byte strings share one id.
    pub(crate) fn intern(&mut self, name: &'static str) -> DeclaratorId {
        let (index, _) = self.names.insert_full(name);
        // The arena caps out long before 2^16 distinct entries.
        debug_assert!(index <= usize::from(u16::MAX));
        DeclaratorId(index as u16)
    }

    /// Look up a name without interning it.
    pub(crate) fn lookup(&self, name: &str) -> Option<DeclaratorId> {
        self.names.get_index_of(name).map(|i| DeclaratorId(i as u16))
    }

    /// Resolve an id back to its name.
    pub(crate) fn resolve(&self, id: DeclaratorId) -> &'static str {
        self.names
            .get_index(usize::from(id.0))
            .expect("declarator ids are only read back from entries this table issued")
    }

    /// Forget every interned name (on store reset).
    pub(crate) fn clear(&mut self) {
        self.names.clear();
    }
}
