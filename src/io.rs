//! Flat-file interchange: one record per line, `value,x0,x1,...,xD-1`, no header, no quoting.

use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::info;

use crate::ball_tree::BallTree;
use crate::common_types::{DataPoint, Key};
use crate::error::CsvError;

/// File name used by the exporters when the caller does not pick one.
pub const DEFAULT_EXPORT_FILE: &str = "BallTree.csv";

fn parse_field(field: &str, line: usize, column: usize) -> Result<f64, CsvError> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|source| CsvError::InvalidNumber { line, column, source })
}

/// Parses records from a reader. Blank lines are skipped; line and column numbers in errors
/// start at 1.
pub fn parse_records<R: BufRead>(reader: R) -> Result<Vec<DataPoint<f64>>, CsvError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let (value, rest) = line
            .split_once(',')
            .ok_or(CsvError::MissingCoordinates { line: line_number })?;
        let value = parse_field(value, line_number, 1)?;
        let coordinates = rest
            .split(',')
            .enumerate()
            .map(|(i, field)| parse_field(field, line_number, i + 2))
            .collect::<Result<Vec<f64>, CsvError>>()?;
        records.push(DataPoint { key: Key::new(coordinates), value });
    }
    Ok(records)
}

pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<DataPoint<f64>>, CsvError> {
    let file = File::open(path)?;
    parse_records(BufReader::new(file))
}

/// Writes `(key, value)` pairs in the flat record layout.
pub fn write_records<'a, W, V, I>(mut writer: W, records: I) -> io::Result<()>
where
    W: Write,
    V: Display + 'a,
    I: IntoIterator<Item = (&'a Key, &'a V)>,
{
    for (key, value) in records {
        write!(writer, "{}", value)?;
        for coordinate in key.coordinates() {
            write!(writer, ",{}", coordinate)?;
        }
        writeln!(writer)?;
    }
    writer.flush()
}

impl BallTree<f64> {
    /// Reads a flat file and builds a tree from it.
    pub fn from_csv_file<P: AsRef<Path>>(path: P) -> Result<Self, CsvError> {
        let records = read_records(path.as_ref())?;
        info!("Read {} records from {}.", records.len(), path.as_ref().display());
        Ok(BallTree::from_points(records)?)
    }
}

impl<V: Display> BallTree<V> {
    /// Writes every point in pre-order.
    pub fn write_csv<W: Write>(&self, writer: W) -> io::Result<()> {
        write_records(writer, self.iter().map(|ball| (ball.pivot(), ball.value())))
    }

    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), CsvError> {
        let file = File::create(path.as_ref())?;
        self.write_csv(BufWriter::new(file))?;
        info!("Exported {} records to {}.", self.size(), path.as_ref().display());
        Ok(())
    }
}
