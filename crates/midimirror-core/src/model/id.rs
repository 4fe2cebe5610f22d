// ── Core identity types ──
//
// Handle and UniqueId are the two keys every mirrored object carries.
// The handle is transient and may be reused by the source; the unique id
// is the stable primary key of the cache.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use super::category::Category;

// ── Handle ──────────────────────────────────────────────────────────

/// Opaque object reference assigned by the handle source.
///
/// Only valid while the underlying object exists. After removal the
/// source is free to hand the same value out for an unrelated object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(u32);

impl Handle {
    /// The null reference. Never names a live object.
    pub const NULL: Self = Self(0);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u32> for Handle {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl FromStr for Handle {
    type Err = ParseIntError;

    /// Accepts decimal or `0x`-prefixed hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16).map(Self),
            None => s.parse().map(Self),
        }
    }
}

// ── UniqueId ────────────────────────────────────────────────────────

/// Source-assigned identifier, intended stable and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueId(i32);

impl UniqueId {
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for UniqueId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl FromStr for UniqueId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

// ── ParentRef ───────────────────────────────────────────────────────

/// Non-owning back reference from an object to its parent.
///
/// Stored by value so wrappers never hold the cache (or each other) alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentRef {
    pub handle: Handle,
    pub category: Category,
}

impl ParentRef {
    pub const fn new(handle: Handle, category: Category) -> Self {
        Self { handle, category }
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.category, self.handle)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn handle_parses_decimal_and_hex() {
        assert_eq!("42".parse::<Handle>().unwrap(), Handle::new(42));
        assert_eq!("0x2a".parse::<Handle>().unwrap(), Handle::new(42));
        assert_eq!(" 0X2A ".parse::<Handle>().unwrap(), Handle::new(42));
    }

    #[test]
    fn handle_display_is_hex() {
        assert_eq!(Handle::new(255).to_string(), "0xff");
    }

    #[test]
    fn null_handle() {
        assert!(Handle::NULL.is_null());
        assert!(!Handle::new(1).is_null());
    }

    #[test]
    fn unique_id_is_signed() {
        let id: UniqueId = "-1234".parse().unwrap();
        assert_eq!(id.raw(), -1234);
        assert_eq!(id.to_string(), "-1234");
    }

    #[test]
    fn parent_ref_display() {
        let parent = ParentRef::new(Handle::new(16), Category::Entity);
        assert_eq!(parent.to_string(), "entity@0x10");
    }
}
