//! Ball tree spatial index over fixed-arity numeric keys.
//!
//! Build a [`BallTree`] once from `(key, value)` pairs, then run exact lookups, k-nearest-neighbour
//! and radius queries against it. [`brute_force::LinearScan`] answers the same queries by scanning
//! and serves as the reference in tests and benches.
//!
//! ```
//! use balltree::BallTree;
//!
//! let tree = BallTree::build(vec![
//!     ([0, 0], "A"),
//!     ([1, 0], "B"),
//!     ([0, 1], "C"),
//!     ([5, 5], "D"),
//! ])
//! .unwrap();
//!
//! assert_eq!(tree.find(&[1.0, 0.0]), Some(&"B"));
//! assert_eq!(tree.k_nearest(&[0, 0], 2), Some(vec![&"B", &"C"]));
//! assert_eq!(tree.within_radius(&[0.0, 0.0], 0.5), Some(vec![]));
//! ```

pub mod ball_tree;
pub mod brute_force;
pub mod common_types;
pub mod error;
pub mod io;
pub mod synthetic;

#[cfg(feature = "python")]
mod python;

pub use ball_tree::{Ball, BallTree, Neighbor, SearchStrategy};
pub use common_types::{DataPoint, Key};
pub use error::{BuildError, CsvError, GenerateError, QueryError};
