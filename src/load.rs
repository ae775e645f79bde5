//! Data preparation ahead of clustering: reading delimited files into a
//! [`Table`], turning categorical and string columns into numbers, and
//! flattening the result into the matrix the clustering core consumes.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use itertools::Itertools;
use ndarray::Array2;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Tsv,
}

impl TableFormat {
    fn delimiter(self) -> u8 {
        match self {
            TableFormat::Csv => b',',
            TableFormat::Tsv => b'\t',
        }
    }
}

impl FromStr for TableFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(TableFormat::Csv),
            "tsv" => Ok(TableFormat::Tsv),
            other => Err(Error::Format(format!("unsupported table format '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => write!(f, "{}", text),
            Cell::Number(value) => write!(f, "{}", value),
        }
    }
}

/// Named columns over rows of equal width.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        if let Some(row) = rows.iter().find(|row| row.len() != headers.len()) {
            return Err(Error::dimension_mismatch(headers.len(), row.len()));
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// Keeps only `columns`, in the order given.
    pub fn select(&self, columns: &[&str]) -> Result<Table> {
        let indices: Vec<usize> = columns
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<_>>()?;

        Ok(Table {
            headers: indices.iter().map(|&i| self.headers[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }
}

/// Reads a delimited file. Lines starting with `#` are skipped. Without a
/// header row, columns are named `column_0`, `column_1`, ...
pub fn load_table<P: AsRef<Path>>(path: P, format: TableFormat, has_header: bool) -> Result<Table> {
    let file = File::open(path.as_ref())?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter())
        .has_headers(has_header)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let mut headers: Vec<String> = if has_header {
        reader.headers()?.iter().map(String::from).collect()
    } else {
        Vec::new()
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|field| Cell::Text(field.to_string())).collect_vec());
    }

    if !has_header {
        let width = rows.first().map_or(0, |row: &Vec<Cell>| row.len());
        headers = (0..width).map(|i| format!("column_{}", i)).collect();
    }

    log::info!(
        "Loaded {} rows x {} columns from {}",
        rows.len(),
        headers.len(),
        path.as_ref().display()
    );
    Table::new(headers, rows)
}

/// Integer codes assigned to the distinct values of one column, in first-seen order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueMapping {
    codes: HashMap<String, usize>,
    values: Vec<String>,
}

impl ValueMapping {
    pub fn code(&self, value: &str) -> Option<usize> {
        self.codes.get(value).copied()
    }

    pub fn value(&self, code: usize) -> Option<&str> {
        self.values.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Replaces each value of `column` with its integer code.
pub fn encode_categorical(mut table: Table, column: &str) -> Result<(Table, ValueMapping)> {
    let idx = table.column_index(column)?;

    let values = table.rows.iter().map(|row| row[idx].to_string()).unique().collect_vec();
    let codes: HashMap<String, usize> = values.iter().cloned().enumerate().map(|(code, value)| (value, code)).collect();

    for row in table.rows.iter_mut() {
        let code = codes[&row[idx].to_string()];
        row[idx] = Cell::Number(code as f64);
    }

    log::debug!("Encoded column '{}' into {} codes", column, values.len());
    Ok((table, ValueMapping { codes, values }))
}

fn parse_cell(cell: &Cell, row: usize, column: &str) -> Result<f64> {
    let text = match cell {
        Cell::Number(value) => return Ok(*value),
        Cell::Text(text) => text.trim(),
    };
    if text.is_empty() {
        return Ok(0.0);
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(Error::NotNumeric {
            row,
            column: column.to_string(),
            value: text.to_string(),
        }),
    }
}

/// Converts the named text columns to numbers. Empty cells become `0.0`;
/// any other text that does not parse to a finite number is an error.
pub fn coerce_numeric(mut table: Table, columns: &[&str]) -> Result<Table> {
    for &column in columns {
        let idx = table.column_index(column)?;
        for (row_idx, row) in table.rows.iter_mut().enumerate() {
            row[idx] = Cell::Number(parse_cell(&row[idx], row_idx, column)?);
        }
    }
    Ok(table)
}

/// Flattens a fully numeric table into an instances x features matrix.
pub fn to_matrix(table: &Table) -> Result<Array2<f64>> {
    let mut values = Vec::with_capacity(table.n_rows() * table.n_cols());
    for (row_idx, row) in table.rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            match cell {
                Cell::Number(value) => values.push(*value),
                Cell::Text(text) => {
                    return Err(Error::NotNumeric {
                        row: row_idx,
                        column: table.headers[col_idx].clone(),
                        value: text.clone(),
                    })
                }
            }
        }
    }

    Array2::from_shape_vec((table.n_rows(), table.n_cols()), values)
        .map_err(|_| Error::dimension_mismatch(table.n_rows() * table.n_cols(), 0))
}
