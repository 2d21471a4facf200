//! Opaque ID newtypes for network entities.
//!
//! Each ID is a thin `u32` wrapper that is `Copy`, `Ord`, `Hash`, and
//! `Serialize`/`Deserialize`. IDs are created by
//! [`Arena::alloc`](crate::arena::Arena::alloc) and used for O(1) lookup.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
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

            /// Returns the index as a `usize`, for indexing scratch vectors.
            pub fn index(self) -> usize {
                self.0 as usize
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

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a node (constant, terminal, or AND gate).
    NodeId,
    "n"
);

define_id!(
    /// Opaque, copyable ID for a fanin edge inside the retiming graph.
    EdgeId,
    "e"
);
