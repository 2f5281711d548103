//! Linear-scan index answering the same queries as the ball tree by checking every point.
//!
//! Slow, but simple enough to trust, which makes it the reference the tree is tested and
//! benchmarked against.

use std::cmp::Ordering;

use num_traits::AsPrimitive;

use crate::common_types::{DataPoint, Key, squared_distance, validate_points};
use crate::error::BuildError;

#[derive(Debug, Clone)]
pub struct LinearScan<V> {
    points: Vec<DataPoint<V>>,
    dimensions: usize,
}

impl<V> LinearScan<V> {
    pub fn new(points: Vec<DataPoint<V>>) -> Result<Self, BuildError> {
        let dimensions = validate_points(&points)?;
        Ok(LinearScan { points, dimensions })
    }

    pub fn size(&self) -> usize {
        self.points.len()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn find<T: AsPrimitive<f64>>(&self, key: &[T]) -> Option<&V> {
        let key = Key::from_coordinates(key);
        self.points.iter().find(|p| p.key == key).map(|p| &p.value)
    }
}

impl<V: PartialOrd> LinearScan<V> {
    pub fn k_nearest<T: AsPrimitive<f64>>(&self, query: &[T], k: usize) -> Option<Vec<&V>> {
        if query.len() != self.dimensions {
            return None;
        }
        let query = Key::from_coordinates(query);

        let mut distances: Vec<(f64, &DataPoint<V>)> = self
            .points
            .iter()
            .map(|p| (squared_distance(query.coordinates(), p.key.coordinates()), p))
            .filter(|&(d, _)| d != 0.0)
            .collect();

        // Keep the k smallest by (distance, key), then order them by (distance, value).
        distances.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.key.cmp(&b.1.key)));
        distances.truncate(k);
        distances.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| a.1.value.partial_cmp(&b.1.value).unwrap_or(Ordering::Equal))
        });
        Some(distances.into_iter().map(|(_, p)| &p.value).collect())
    }

    pub fn within_radius<T: AsPrimitive<f64>>(&self, query: &[T], radius: f64) -> Option<Vec<&V>> {
        if query.len() != self.dimensions || !(radius > 0.0) {
            return None;
        }
        let query = Key::from_coordinates(query);
        let squared_radius = radius * radius;

        let mut found: Vec<&DataPoint<V>> = self
            .points
            .iter()
            .filter(|p| {
                p.key != query
                    && squared_distance(query.coordinates(), p.key.coordinates()) < squared_radius
            })
            .collect();
        found.sort_by(|a, b| a.key.cmp(&b.key));
        found.sort_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal));
        Some(found.into_iter().map(|p| &p.value).collect())
    }
}
