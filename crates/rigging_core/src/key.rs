//! Capability keys identifying the value types nodes produce and consume.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifier for a semantic value type flowing through the graph.
///
/// At most one node may declare a given key as an output; the resolver
/// enforces this. Equality and hashing go through the underlying
/// [`TypeId`]; the type name is carried only for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityKey {
    id: TypeId,
    name: &'static str,
}

impl CapabilityKey {
    /// The key for value type `T`
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying type id
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.id
    }

    /// The type name, for diagnostics
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for CapabilityKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CapabilityKey {}

impl Hash for CapabilityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An output slot declared by a node: the produced key plus whether the
/// slot is fallible (a `Result` position that can abort the run).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSlot {
    /// Capability key the slot produces on success
    pub key: CapabilityKey,
    /// Whether the slot can carry an error instead of a value
    pub fallible: bool,
}

impl OutputSlot {
    /// Declare an infallible slot for `key`
    #[must_use]
    pub const fn value(key: CapabilityKey) -> Self {
        Self {
            key,
            fallible: false,
        }
    }

    /// Declare a fallible slot for `key`
    #[must_use]
    pub const fn fallible(key: CapabilityKey) -> Self {
        Self {
            key,
            fallible: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Config;
    struct Database;

    #[test]
    fn test_key_equality() {
        assert_eq!(CapabilityKey::of::<Config>(), CapabilityKey::of::<Config>());
        assert_ne!(
            CapabilityKey::of::<Config>(),
            CapabilityKey::of::<Database>()
        );
    }

    #[test]
    fn test_key_display_uses_type_name() {
        let key = CapabilityKey::of::<Config>();
        assert!(format!("{}", key).ends_with("Config"));
    }

    #[test]
    fn test_key_hash_matches_equality() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(CapabilityKey::of::<Config>());
        set.insert(CapabilityKey::of::<Config>());
        set.insert(CapabilityKey::of::<Database>());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_output_slot_constructors() {
        let key = CapabilityKey::of::<Config>();
        assert!(!OutputSlot::value(key).fallible);
        assert!(OutputSlot::fallible(key).fallible);
        assert_eq!(OutputSlot::value(key).key, key);
    }
}
