//! This module contains the data structures shared by the ball tree, the linear scan and the I/O helpers.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Index;

use num_traits::AsPrimitive;
use ordered_float::OrderedFloat;

use crate::error::BuildError;

/// A fixed-arity point used as the key of an entry.
///
/// Coordinates are converted to `f64` when the key is created, so a key built from `[3, 4]`
/// is the same key as one built from `[3.0, 4.0]`. Equality, ordering and hashing are numeric
/// (`-0.0 == 0.0`) and agree with each other.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Key {
    coordinates: Vec<f64>,
}

impl Key {
    pub fn new(coordinates: Vec<f64>) -> Self {
        Key { coordinates }
    }

    /// Builds a key from any primitive numeric coordinates.
    ///
    /// Integers are exact only up to 2^53 in magnitude. Past that, neighbouring `i64`/`u64`
    /// values round to the same `f64`, so two keys that differ only there are equal and a tree
    /// built from both reports [`BuildError::DuplicateKey`].
    pub fn from_coordinates<T: AsPrimitive<f64>>(coordinates: &[T]) -> Self {
        Key {
            coordinates: coordinates.iter().map(|c| c.as_()).collect(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.coordinates.len()
    }

    pub fn coordinates(&self) -> &[f64] {
        &self.coordinates
    }

    pub fn is_finite(&self) -> bool {
        self.coordinates.iter().all(|c| c.is_finite())
    }

    fn ordered(&self) -> impl Iterator<Item = OrderedFloat<f64>> + '_ {
        // Adding 0.0 folds -0.0 into 0.0 so hashing agrees with equality.
        self.coordinates.iter().map(|&c| OrderedFloat(c + 0.0))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.coordinates.len() == other.coordinates.len() && self.ordered().eq(other.ordered())
    }
}
impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordered().cmp(other.ordered())
    }
}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.coordinates.len().hash(state);
        for coordinate in self.ordered() {
            coordinate.hash(state);
        }
    }
}

impl Index<usize> for Key {
    type Output = f64;

    fn index(&self, dimension: usize) -> &f64 {
        &self.coordinates[dimension]
    }
}

impl<T: AsPrimitive<f64>> From<Vec<T>> for Key {
    fn from(coordinates: Vec<T>) -> Self {
        Key::from_coordinates(&coordinates)
    }
}

impl<T: AsPrimitive<f64>> From<&[T]> for Key {
    fn from(coordinates: &[T]) -> Self {
        Key::from_coordinates(coordinates)
    }
}

impl<T: AsPrimitive<f64>, const N: usize> From<[T; N]> for Key {
    fn from(coordinates: [T; N]) -> Self {
        Key::from_coordinates(&coordinates)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, coordinate) in self.coordinates.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", coordinate)?;
        }
        write!(f, ")")
    }
}

/// Represents a single entry: a key and the value attached to it.
///
/// - `V`: The type of the value (e.g., `f64`, `&str`, a record id). It never takes part in routing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataPoint<V> {
    pub key: Key,
    pub value: V,
}

impl<V> DataPoint<V> {
    pub fn new(key: impl Into<Key>, value: V) -> Self {
        DataPoint { key: key.into(), value }
    }
}

/// Squared Euclidean distance between two coordinate slices of the same length.
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// Checks a batch of points before indexing and returns its dimensionality.
///
/// The batch must be non-empty, share one non-zero arity, hold only finite coordinates and
/// contain no key twice.
pub(crate) fn validate_points<V>(points: &[DataPoint<V>]) -> Result<usize, BuildError> {
    let dimensions = match points.first() {
        Some(p) => p.key.dimensions(),
        None => return Err(BuildError::EmptyInput),
    };
    if dimensions == 0 {
        return Err(BuildError::ZeroDimensions);
    }

    let mut seen: HashSet<&Key> = HashSet::with_capacity(points.len());
    for (index, point) in points.iter().enumerate() {
        if point.key.dimensions() != dimensions {
            return Err(BuildError::DimensionMismatch {
                index,
                expected: dimensions,
                found: point.key.dimensions(),
            });
        }
        if !point.key.is_finite() {
            return Err(BuildError::NonFiniteCoordinate { index });
        }
        if !seen.insert(&point.key) {
            return Err(BuildError::DuplicateKey { index });
        }
    }
    Ok(dimensions)
}
