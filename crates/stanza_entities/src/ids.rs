//! Opaque ID newtypes for run entities.
//!
//! Each ID is a thin `u32` wrapper created by [`Arena::alloc`](crate::arena::Arena::alloc)
//! and used for O(1) lookup. IDs are valid only within the run that
//! allocated them; cross-run references use the persisted forms from
//! `stanza_common` instead.

use crate::arena::ArenaId;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a document (item or layout) in a [`Site`](crate::site::Site).
    DocumentId
);

define_id!(
    /// Opaque, copyable ID for an item representation in a [`RepSet`](crate::rep::RepSet).
    RepId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn id_round_trip() {
        let id = DocumentId::from_raw(7);
        assert_eq!(id.as_raw(), 7);
        let id = RepId::from_raw(0);
        assert_eq!(id.as_raw(), 0);
    }

    #[test]
    fn ids_are_hashable_and_comparable() {
        let mut set = HashSet::new();
        set.insert(RepId::from_raw(1));
        set.insert(RepId::from_raw(1));
        set.insert(RepId::from_raw(2));
        assert_eq!(set.len(), 2);
    }
}
