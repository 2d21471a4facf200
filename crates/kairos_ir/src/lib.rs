//! Sequential AND-network representation for the Kairos retiming engine.
//!
//! A [`SeqNetwork`] is a graph of two-input AND gates, primary inputs and
//! outputs, and a constant-true node. Every fanin edge carries a complement
//! flag (as a [`Polarity`]) and an ordered list of latch initial values,
//! nearest-to-sink first. Mapped gate bindings decorate the same skeleton.
//!
//! The crate also provides structural validation, the combinational
//! (latch-free) topological order, and a three-valued cycle simulator used
//! to check retimed networks against their originals.

#![warn(missing_docs)]

pub mod arena;
pub mod error;
pub mod ids;
pub mod network;
pub mod sim;

pub use arena::{Arena, ArenaId};
pub use error::NetworkError;
pub use ids::{EdgeId, NodeId};
pub use network::{Fanin, GateBinding, Node, NodeKind, Polarity, SeqNetwork, Signal};
pub use sim::Simulator;
