//! A ball tree over fixed-arity numeric keys.
//!
//! The tree is built once from a batch of `(key, value)` pairs and is read-only afterwards.
//! Every ball holds exactly one point (its pivot); internal balls split their remaining points
//! on the coordinate of greatest spread, with points strictly below the pivot going left.

use std::fmt;

use log::debug;

use crate::common_types::{DataPoint, Key, validate_points};
use crate::error::BuildError;

mod build;
pub mod heap_utils;
mod node;
mod query;

use build::TreeBuilder;
pub use node::{Ball, Iter};

/// How k-NN and radius queries walk the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SearchStrategy {
    /// Visit every ball.
    #[default]
    Exhaustive,
    /// Skip balls whose bounding sphere cannot hold a qualifying point. Same results, fewer visits.
    Pruned,
}

/// A point returned by a neighbour query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a, V> {
    pub key: &'a Key,
    pub value: &'a V,
    pub squared_distance: f64,
}

impl<V> Neighbor<'_, V> {
    pub fn distance(&self) -> f64 {
        self.squared_distance.sqrt()
    }
}

/// Represents the Ball Tree itself.
#[derive(Debug, Clone)]
pub struct BallTree<V> {
    root: Box<Ball<V>>,
    size: usize,
    dimensions: usize,
    strategy: SearchStrategy,
}

impl<V> BallTree<V> {
    pub const DEFAULT_STRATEGY: SearchStrategy = SearchStrategy::Exhaustive;

    /// Builds a tree from `(key, value)` pairs.
    ///
    /// Keys may use any primitive numeric type; they are compared as `f64`.
    pub fn build<I, K>(points: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
    {
        Self::from_points(
            points
                .into_iter()
                .map(|(key, value)| DataPoint::new(key, value))
                .collect(),
        )
    }

    /// Builds a tree from a batch of data points.
    ///
    /// # Errors
    /// Fails on an empty batch, zero-length or mixed-length keys, NaN or infinite coordinates
    /// and repeated keys.
    pub fn from_points(points: Vec<DataPoint<V>>) -> Result<Self, BuildError> {
        let dimensions = validate_points(&points)?;

        let mut builder = TreeBuilder::new();
        let root = builder.build(points);
        let tree = BallTree {
            root,
            size: builder.nodes_built(),
            dimensions,
            strategy: Self::DEFAULT_STRATEGY,
        };
        debug!(
            "Built ball tree with {} nodes over {} dimensions (root radius {:.5}).",
            tree.size,
            tree.dimensions,
            tree.radius()
        );
        Ok(tree)
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    /// Number of balls, which is also the number of indexed points.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Radius of the root ball: the distance from the root pivot to the farthest point.
    pub fn radius(&self) -> f64 {
        self.root.radius()
    }

    pub fn root(&self) -> &Ball<V> {
        &self.root
    }

    /// Walks the balls in pre-order (a ball, then its left subtree, then its right subtree).
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(&self.root)
    }
}

impl<'a, V> IntoIterator for &'a BallTree<V> {
    type Item = &'a Ball<V>;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V: fmt::Display> fmt::Display for BallTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<11} {:<11} {:<11} {}", "Data:", "Radius:", "Dim. Split:", "Point:")?;
        for ball in self.iter() {
            let split = match ball.split_dimension() {
                Some(dim) => dim.to_string(),
                None => "-".to_string(),
            };
            writeln!(
                f,
                "{:<11} {:<11.5} {:<11} {}",
                ball.value().to_string(),
                ball.radius(),
                split,
                ball.pivot()
            )?;
        }
        Ok(())
    }
}
