//! Registration slots keyed by type and optional name.
//!
//! Every store of the container (implementations, instances and cached plans) is a [SlotMap]:
//! for each [TypeKey] it keeps one anonymous slot and any number of named slots, which are
//! fully independent from each other.

use std::any::{type_name, TypeId};
use std::collections::hash_map::{Entry, HashMap};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a (possibly unsized) type.
///
/// Equality and hashing only use the [TypeId], the name is kept for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Anonymous and named slots of a single type
struct Slots<T> {
    anonymous: Option<T>,
    named: BTreeMap<String, T>,
}

impl<T> Slots<T> {
    fn is_empty(&self) -> bool {
        self.anonymous.is_none() && self.named.is_empty()
    }
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self {
            anonymous: None,
            named: BTreeMap::new(),
        }
    }
}

/// Store values by `(type, optional name)`
pub(crate) struct SlotMap<T>(HashMap<TypeId, Slots<T>>);

impl<T> Default for SlotMap<T> {
    fn default() -> Self {
        Self(HashMap::new())
    }
}

impl<T> SlotMap<T> {
    pub fn get(&self, key: TypeKey, name: Option<&str>) -> Option<&T> {
        let slots = self.0.get(&key.id())?;
        match name {
            None => slots.anonymous.as_ref(),
            Some(name) => slots.named.get(name),
        }
    }

    pub fn contains(&self, key: TypeKey, name: Option<&str>) -> bool {
        self.get(key, name).is_some()
    }

    /// Fill a slot, returning the previous occupant if any
    pub fn insert(&mut self, key: TypeKey, name: Option<&str>, value: T) -> Option<T> {
        let slots = self.0.entry(key.id()).or_default();
        match name {
            None => slots.anonymous.replace(value),
            Some(name) => slots.named.insert(name.to_owned(), value),
        }
    }

    /// Empty a single slot
    pub fn remove(&mut self, key: TypeKey, name: Option<&str>) -> Option<T> {
        let Entry::Occupied(mut entry) = self.0.entry(key.id()) else {
            return None;
        };
        let removed = match name {
            None => entry.get_mut().anonymous.take(),
            Some(name) => entry.get_mut().named.remove(name),
        };
        if entry.get().is_empty() {
            entry.remove();
        }
        removed
    }

    /// Empty the anonymous and all named slots of a type
    pub fn remove_all(&mut self, key: TypeKey) {
        self.0.remove(&key.id());
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Occupied slots of a type: the anonymous one first, then named ones in name order
    pub fn names(&self, key: TypeKey) -> Vec<Option<&str>> {
        let Some(slots) = self.0.get(&key.id()) else {
            return Vec::new();
        };
        slots
            .anonymous
            .iter()
            .map(|_| None)
            .chain(slots.named.keys().map(|name| Some(name.as_str())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Marker {}

    #[test]
    fn type_keys_compare_by_id() {
        assert_eq!(TypeKey::of::<dyn Marker>(), TypeKey::of::<dyn Marker>());
        assert_ne!(TypeKey::of::<dyn Marker>(), TypeKey::of::<u32>());
        assert!(TypeKey::of::<dyn Marker>().name().contains("Marker"));
    }

    #[test]
    fn anonymous_and_named_slots_are_independent() {
        let key = TypeKey::of::<dyn Marker>();
        let mut map = SlotMap::default();

        assert_eq!(map.insert(key, None, 1), None);
        assert_eq!(map.insert(key, Some("a"), 2), None);
        assert_eq!(map.get(key, None), Some(&1));
        assert_eq!(map.get(key, Some("a")), Some(&2));
        assert_eq!(map.get(key, Some("b")), None);

        assert_eq!(map.remove(key, None), Some(1));
        assert!(!map.contains(key, None));
        assert!(map.contains(key, Some("a")));
    }

    #[test]
    fn removing_the_last_slot_drops_the_type() {
        let key = TypeKey::of::<u8>();
        let mut map = SlotMap::default();
        map.insert(key, Some("only"), ());
        assert_eq!(map.remove(key, Some("only")), Some(()));
        assert!(map.is_empty());
        assert_eq!(map.remove(key, None), None);
    }

    #[test]
    fn remove_all_clears_every_slot() {
        let key = TypeKey::of::<u8>();
        let other = TypeKey::of::<u16>();
        let mut map = SlotMap::default();
        map.insert(key, None, 1);
        map.insert(key, Some("x"), 2);
        map.insert(other, None, 3);

        map.remove_all(key);
        assert!(map.names(key).is_empty());
        assert_eq!(map.get(other, None), Some(&3));

        map.remove_all(other);
        assert!(map.is_empty());
    }

    #[test]
    fn names_list_anonymous_first_then_sorted() {
        let key = TypeKey::of::<u8>();
        let mut map = SlotMap::default();
        map.insert(key, Some("zeta"), 0);
        map.insert(key, Some("alpha"), 0);
        map.insert(key, None, 0);
        assert_eq!(map.names(key), vec![None, Some("alpha"), Some("zeta")]);
    }
}
