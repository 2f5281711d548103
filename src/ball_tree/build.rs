//! Recursive construction of a ball tree from a batch of points.

use std::cmp::Ordering;

use log::trace;

use super::node::{Ball, routes_left};
use crate::common_types::{DataPoint, squared_distance};

/// Builds the ball graph and counts the balls it creates.
///
/// Expects a validated batch: non-empty, one shared arity, distinct keys.
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    nodes_built: usize,
}

impl TreeBuilder {
    pub(crate) fn new() -> Self {
        TreeBuilder::default()
    }

    pub(crate) fn nodes_built(&self) -> usize {
        self.nodes_built
    }

    pub(crate) fn build<V>(&mut self, mut points: Vec<DataPoint<V>>) -> Box<Ball<V>> {
        debug_assert!(!points.is_empty(), "TreeBuilder needs at least one point");
        self.nodes_built += 1;

        // Base case: a single point becomes a leaf.
        if points.len() == 1 {
            let DataPoint { key, value } = points.swap_remove(0);
            return Box::new(Ball::leaf(key, value));
        }

        let split_dimension = dimension_of_greatest_spread(&points);
        let pivot_index = median_of_three(&points, split_dimension);
        // `remove` keeps the order of the rest, which the next median-of-three depends on.
        let DataPoint { key: pivot, value } = points.remove(pivot_index);

        let mut squared_radius = 0.0_f64;
        let mut left_points = Vec::with_capacity(points.len() / 2);
        let mut right_points = Vec::with_capacity(points.len() / 2);
        for point in points {
            squared_radius =
                squared_radius.max(squared_distance(point.key.coordinates(), pivot.coordinates()));
            if routes_left(point.key.coordinates(), pivot.coordinates(), split_dimension) {
                left_points.push(point);
            } else {
                right_points.push(point);
            }
        }
        trace!(
            "split on dimension {} at {}: {} left, {} right, squared radius {}",
            split_dimension,
            pivot,
            left_points.len(),
            right_points.len(),
            squared_radius
        );

        let left = if left_points.is_empty() { None } else { Some(self.build(left_points)) };
        let right = if right_points.is_empty() { None } else { Some(self.build(right_points)) };

        Box::new(Ball {
            pivot,
            value,
            squared_radius,
            split_dimension: Some(split_dimension),
            left,
            right,
        })
    }
}

/// Index of the coordinate with the largest `max - min` range. Ties go to the lowest index.
fn dimension_of_greatest_spread<V>(points: &[DataPoint<V>]) -> usize {
    let dimensions = points.first().map_or(0, |p| p.key.dimensions());
    let mut mins = vec![f64::INFINITY; dimensions];
    let mut maxs = vec![f64::NEG_INFINITY; dimensions];

    for point in points {
        for (dim, &value) in point.key.coordinates().iter().enumerate() {
            mins[dim] = mins[dim].min(value);
            maxs[dim] = maxs[dim].max(value);
        }
    }

    let mut best_dimension = 0;
    let mut max_spread = f64::NEG_INFINITY;
    for dim in 0..dimensions {
        let spread = maxs[dim] - mins[dim];
        if spread > max_spread {
            max_spread = spread;
            best_dimension = dim;
        }
    }
    best_dimension
}

/// Picks, among the first, middle and last points, the one whose coordinate on `dimension` is
/// the median of the three.
fn median_of_three<V>(points: &[DataPoint<V>], dimension: usize) -> usize {
    let mut candidates = [0, points.len() / 2, points.len() - 1];
    candidates.sort_by(|&a, &b| {
        points[a].key[dimension]
            .partial_cmp(&points[b].key[dimension])
            .unwrap_or(Ordering::Equal)
    });
    candidates[1]
}
