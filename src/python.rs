//! Python bindings, built with the `python` feature.

use std::fmt::Display;

use pyo3::exceptions::{PyIOError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyString;

use crate::ball_tree::BallTree;
use crate::error::CsvError;
use crate::io::DEFAULT_EXPORT_FILE;

fn value_error(err: impl Display) -> PyErr {
    PyErr::new::<PyValueError, _>(err.to_string())
}

impl From<CsvError> for PyErr {
    fn from(err: CsvError) -> PyErr {
        match err {
            CsvError::Io(e) => PyErr::new::<PyIOError, _>(e.to_string()),
            other => value_error(other),
        }
    }
}

#[pyclass(name = "BallTree")]
struct PyBallTree {
    tree: BallTree<f64>,
}

#[pymethods]
impl PyBallTree {
    /// Accepts either a list of `(key, value)` tuples or the path of a `.csv` file.
    #[new]
    fn new(points: &Bound<'_, PyAny>) -> PyResult<Self> {
        if let Ok(path) = points.downcast::<PyString>() {
            return Self::from_csv(path.to_str()?);
        }
        let points: Vec<(Vec<f64>, f64)> = points.extract().map_err(|_| {
            PyErr::new::<PyTypeError, _>(
                "Points must be a list of (key, value) tuples or the path of a .csv file",
            )
        })?;
        let tree = BallTree::build(points).map_err(value_error)?;
        Ok(PyBallTree { tree })
    }

    #[staticmethod]
    fn from_csv(path: &str) -> PyResult<Self> {
        if !path.ends_with(".csv") {
            return Err(value_error("Must be a .csv file."));
        }
        Ok(PyBallTree { tree: BallTree::from_csv_file(path)? })
    }

    fn size(&self) -> usize {
        self.tree.size()
    }

    fn radius(&self) -> f64 {
        self.tree.radius()
    }

    fn find(&self, key: Vec<f64>) -> Option<f64> {
        self.tree.find(&key).copied()
    }

    /// Values of the `k` nearest neighbours, or `None` on a dimensionality mismatch.
    #[pyo3(signature = (point, k = 1))]
    fn nearest_neighbors(&self, point: Vec<f64>, k: i64) -> Option<Vec<f64>> {
        let k = usize::try_from(k).unwrap_or(0);
        self.tree
            .k_nearest(&point, k)
            .map(|values| values.into_iter().copied().collect())
    }

    /// Values strictly within `radius` of `point`, or `None` when `radius <= 0` or the
    /// dimensionality does not match.
    fn count_radius(&self, point: Vec<f64>, radius: f64) -> Option<Vec<f64>> {
        self.tree
            .within_radius(&point, radius)
            .map(|values| values.into_iter().copied().collect())
    }

    #[pyo3(signature = (filename = None))]
    fn export(&self, filename: Option<&str>) -> PyResult<()> {
        Ok(self.tree.export_csv(filename.unwrap_or(DEFAULT_EXPORT_FILE))?)
    }

    fn display(&self) {
        print!("{}", self.tree);
    }

    fn __len__(&self) -> usize {
        self.tree.size()
    }

    fn __repr__(&self) -> String {
        format!(
            "BallTree(size={}, dimensions={}, radius={:.5})",
            self.tree.size(),
            self.tree.dimensions(),
            self.tree.radius()
        )
    }
}

#[pymodule]
fn balltree(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyBallTree>()?;
    Ok(())
}
