//! Random test data: distinct keys with uniformly drawn coordinates and `f64` values in `[0, 1)`.

use std::collections::HashSet;

use rand::Rng;

use crate::common_types::{DataPoint, Key};
use crate::error::GenerateError;

/// Whether generated coordinates are whole numbers or arbitrary reals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateKind {
    /// Integers drawn from `[ceil(min), floor(max)]`.
    Integer,
    /// Reals drawn from `[min, max)`.
    Real,
}

/// Whole-number bounds of `[min, max]`. Both must fit in an `i64`.
fn integer_bounds(min: f64, max: f64) -> Result<(i64, i64), GenerateError> {
    let (low, high) = (min.ceil(), max.floor());
    // -(i64::MIN as f64) is 2^63, one past i64::MAX.
    if !(low >= i64::MIN as f64 && high < -(i64::MIN as f64)) || low > high {
        return Err(GenerateError::InvalidRange { min, max });
    }
    Ok((low as i64, high as i64))
}

fn check_dimensions(dimensions: usize) -> Result<(), GenerateError> {
    if dimensions == 0 {
        return Err(GenerateError::ZeroDimensions);
    }
    Ok(())
}

fn check_real_bounds(min: f64, max: f64) -> Result<(), GenerateError> {
    if !min.is_finite() || !max.is_finite() || min >= max {
        return Err(GenerateError::InvalidRange { min, max });
    }
    Ok(())
}

/// Draws one key of `dimensions` coordinates.
pub fn generate_key<R: Rng + ?Sized>(
    rng: &mut R,
    dimensions: usize,
    kind: CoordinateKind,
    min: f64,
    max: f64,
) -> Result<Key, GenerateError> {
    check_dimensions(dimensions)?;
    let coordinates = match kind {
        CoordinateKind::Integer => {
            let (low, high) = integer_bounds(min, max)?;
            (0..dimensions).map(|_| rng.gen_range(low..=high) as f64).collect()
        }
        CoordinateKind::Real => {
            check_real_bounds(min, max)?;
            (0..dimensions).map(|_| rng.gen_range(min..max)).collect()
        }
    };
    Ok(Key::new(coordinates))
}

/// Draws `amount` points with pairwise distinct keys.
///
/// # Errors
/// Fails when `dimensions` is zero, when the range is empty, or when integer coordinates
/// cannot provide `amount` distinct keys.
pub fn generate_points<R: Rng + ?Sized>(
    rng: &mut R,
    dimensions: usize,
    amount: usize,
    kind: CoordinateKind,
    min: f64,
    max: f64,
) -> Result<Vec<DataPoint<f64>>, GenerateError> {
    check_dimensions(dimensions)?;
    match kind {
        CoordinateKind::Integer => {
            let (low, high) = integer_bounds(min, max)?;
            // In f64 so wide ranges cannot overflow.
            let exponent = i32::try_from(dimensions).unwrap_or(i32::MAX);
            let available = (high as f64 - low as f64 + 1.0).powi(exponent);
            if (amount as f64) > available {
                return Err(GenerateError::KeySpaceTooSmall { requested: amount, available });
            }
        }
        CoordinateKind::Real => check_real_bounds(min, max)?,
    }

    let mut seen = HashSet::with_capacity(amount);
    let mut points = Vec::with_capacity(amount);
    while points.len() < amount {
        let key = generate_key(rng, dimensions, kind, min, max)?;
        if seen.insert(key.clone()) {
            points.push(DataPoint { key, value: rng.gen_range(0.0..1.0) });
        }
    }
    Ok(points)
}
