//! Opaque ID newtypes for timing graph entities.
//!
//! [`CycleNodeId`] and [`CycleEdgeId`] are thin `u32` wrappers used as
//! indices into the timing graph. They are `Copy`, `Hash`, and `Serialize`/`Deserialize`.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
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

            /// Returns the index as a `usize`.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a node in the timing graph.
    CycleNodeId
);

define_id!(
    /// Opaque, copyable ID for an edge in the timing graph.
    CycleEdgeId
);
