//! Identifier encoding (`§3 DATA MODEL — Identifier`)
//!
//! An [`Id`] is a 64-bit value. A *bare* id occupies only the low 32-bit
//! lane. A *pair* id composes a predicate (high lane) and an object (low
//! lane) with the pair role bit set: `pair(pred, obj) = ROLE_PAIR |
//! (pred << 32) | obj`. One reserved low-lane value, [`WILDCARD`], means
//! "any value"; another, [`THIS_ENTITY`], is skipped by `EACH` the same way
//! the wildcard is, matching the original's `EcsWildcard`/`EcsThis` pair.

/// 64-bit identifier: entity, component, or pair.
pub type Id = u64;

/// Role bit marking an id as a predicate/object pair rather than a bare id.
pub const ROLE_PAIR: Id = 1 << 63;

/// Mask isolating the role bits (just the pair marker, here).
pub const ROLE_MASK: Id = ROLE_PAIR;

/// Reserved value meaning "any value" in a query position.
pub const WILDCARD: Id = 0xFFFF_FFFF;

/// Reserved value for the implicit `this` placeholder; `EACH` skips it the
/// same way it skips `WILDCARD` so a table that happens to hold these
/// reserved ids as rows never confuses the solver.
pub const THIS_ENTITY: Id = 0xFFFF_FFFE;

/// Low 32-bit lane (the object, for a pair; the whole value, for a bare id).
#[inline]
pub fn lo(id: Id) -> Id {
    id & 0xFFFF_FFFF
}

/// High 32-bit lane (the predicate, for a pair id).
#[inline]
pub fn hi(id: Id) -> Id {
    (id & !ROLE_MASK) >> 32
}

/// Compose a pair id from a predicate and an object.
#[inline]
pub fn pair(pred: Id, obj: Id) -> Id {
    ROLE_PAIR | (lo(pred) << 32) | lo(obj)
}

/// True if `id` carries the pair role bit.
#[inline]
pub fn is_pair(id: Id) -> bool {
    id & ROLE_PAIR != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_roundtrip() {
        let p = pair(42, 7);
        assert!(is_pair(p));
        assert_eq!(hi(p), 42);
        assert_eq!(lo(p), 7);
    }

    #[test]
    fn bare_id_is_not_a_pair() {
        assert!(!is_pair(42));
        assert_eq!(lo(42), 42);
        assert_eq!(hi(42), 0);
    }

    #[test]
    fn wildcard_distinct_from_this() {
        assert_ne!(WILDCARD, THIS_ENTITY);
    }
}
