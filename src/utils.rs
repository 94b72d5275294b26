use ndarray::Array2;

use crate::error::{Error, Result};

pub fn argmax<T: PartialOrd>(values: impl Iterator<Item = T>) -> usize {
    let mut result: usize = 0;
    let mut max: Option<T> = None;
    for (i, v) in values.enumerate() {
        let better = match &max {
            Some(m) => v > *m,
            None => true,
        };
        if better {
            max = Some(v);
            result = i;
        }
    }
    result
}

pub fn moving_average(window: usize, vector: &[f64]) -> Vec<f64> {
    let window = window.max(1);
    let mut aux: usize = 0;
    let mut result: Vec<f64> = vec![];
    while aux < vector.len() {
        let end: usize = if aux + window < vector.len() {
            aux + window
        } else {
            vector.len()
        };
        let slice: &[f64] = &vector[aux..end];
        let r: f64 = slice.iter().sum();
        result.push(r / window as f64);
        aux = end;
    }
    result
}

/// Stacks equally sized rows into a matrix. Ragged input is a shape error.
pub fn array_from_rows(rows: &[Vec<f64>]) -> Result<Array2<f64>> {
    let ncols = match rows.first() {
        Some(row) => row.len(),
        None => return Ok(Array2::zeros((0, 0))),
    };
    let mut data: Vec<f64> = Vec::with_capacity(rows.len() * ncols);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != ncols {
            return Err(Error::shape(
                format!("{} columns in every row", ncols),
                format!("{} columns in row {}", row.len(), i),
            ));
        }
        data.extend_from_slice(row);
    }
    Array2::from_shape_vec((rows.len(), ncols), data)
        .map_err(|e| Error::shape("rectangular rows", e.to_string()))
}
