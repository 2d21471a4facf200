//! Cycle-ratio timing analysis for sequential graphs.
//!
//! This crate provides a generic timing graph whose nodes carry a gate delay
//! and whose edges carry an interconnect delay and a latch count. On top of
//! it, two analyses bound the clock periods a retiming can reach:
//!
//! - [`paths`]: the longest latch-free path, i.e. the period the graph has
//!   without any retiming
//! - [`mmc`]: Howard's policy iteration for the maximum cycle ratio
//!   (total delay over total latches), below which no retiming is feasible
//!
//! # Usage
//!
//! ```
//! use kairos_timing::{max_cycle_ratio, CycleGraph};
//!
//! let mut g = CycleGraph::new();
//! let a = g.add_node("a", 1.0);
//! let b = g.add_node("b", 1.0);
//! g.add_edge(a, b, 0.0, 0);
//! g.add_edge(b, a, 0.0, 1);
//! let ratio = max_cycle_ratio(&g).unwrap().unwrap();
//! assert_eq!(ratio.ratio, 2.0);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod graph;
pub mod ids;
pub mod mmc;
pub mod paths;

pub use error::CycleError;
pub use graph::{CycleEdge, CycleGraph, CycleNode};
pub use ids::{CycleEdgeId, CycleNodeId};
pub use mmc::{max_cycle_ratio, CycleRatio};
pub use paths::{longest_path, LongestPath};
