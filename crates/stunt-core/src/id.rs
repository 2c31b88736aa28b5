//! Strongly-typed identifiers.

use std::fmt;

/// Identifies an interned declarator (the name of a mocked call site).
///
/// Declarators are compared by byte value, not by pointer: the same string
/// appearing in two places interns to the same id. Ids are assigned
/// sequentially in first-seen order and are only meaningful within the store
/// that issued them; a reset invalidates all previously issued ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclaratorId(pub u16);

impl fmt::Display for DeclaratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for DeclaratorId {
    fn from(v: u16) -> Self {
        Self(v)
    }
}
