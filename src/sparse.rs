use crate::error::{Result, SgdError};
use crate::Matrix;

/// Compressed sparse row matrix of `f64` values.
///
/// Row `i` owns the entries `indptr[i]..indptr[i + 1]` of `indices` and `data`.
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl CsrMatrix {
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<f64>,
    ) -> Result<Self> {
        if indptr.len() != n_rows + 1 {
            return Err(SgdError::InvalidSparse(format!(
                "indptr has length {}, expected {}",
                indptr.len(),
                n_rows + 1
            )));
        }
        if indices.len() != data.len() {
            return Err(SgdError::InvalidSparse(format!(
                "indices ({}) and data ({}) lengths differ",
                indices.len(),
                data.len()
            )));
        }
        if indptr[0] != 0 || indptr[n_rows] != data.len() {
            return Err(SgdError::InvalidSparse(
                "indptr must start at 0 and end at nnz".to_string(),
            ));
        }
        if indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(SgdError::InvalidSparse("indptr must be non-decreasing".to_string()));
        }
        if let Some(&col) = indices.iter().find(|&&col| col >= n_cols) {
            return Err(SgdError::InvalidSparse(format!(
                "column index {} out of bounds for {} columns",
                col, n_cols
            )));
        }
        for i in 0..n_rows {
            let mut cols = indices[indptr[i]..indptr[i + 1]].to_vec();
            cols.sort_unstable();
            if let Some(pair) = cols.windows(2).find(|pair| pair[0] == pair[1]) {
                return Err(SgdError::InvalidSparse(format!(
                    "duplicate column index {} in row {}",
                    pair[0], i
                )));
            }
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(SgdError::InvalidSparse("data must be finite".to_string()));
        }

        Ok(Self { n_rows, n_cols, indptr, indices, data })
    }

    pub fn from_dense(x: &Matrix) -> Self {
        let mut indptr = Vec::with_capacity(x.nrows() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);

        for row in x.rows() {
            for (j, &value) in row.iter().enumerate() {
                if value != 0.0 {
                    indices.push(j);
                    data.push(value);
                }
            }
            indptr.push(data.len());
        }

        Self { n_rows: x.nrows(), n_cols: x.ncols(), indptr, indices, data }
    }

    pub fn to_dense(&self) -> Matrix {
        let mut dense = Matrix::zeros((self.n_rows, self.n_cols));
        for i in 0..self.n_rows {
            let (indices, values) = self.row(i);
            for (&j, &value) in indices.iter().zip(values) {
                dense[[i, j]] += value;
            }
        }
        dense
    }

    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let range = self.indptr[i]..self.indptr[i + 1];
        (&self.indices[range.clone()], &self.data[range])
    }

    pub fn nrows(&self) -> usize {
        self.n_rows
    }

    pub fn ncols(&self) -> usize {
        self.n_cols
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_dense_skips_zeros() {
        let x = array![[1.0, 0.0, 2.0], [0.0, 0.0, 0.0], [0.0, 3.0, 0.0]];
        let csr = CsrMatrix::from_dense(&x);

        assert_eq!(csr.nnz(), 3);
        assert_eq!(csr.row(0), (&[0, 2][..], &[1.0, 2.0][..]));
        assert!(csr.row(1).0.is_empty());
        assert_eq!(csr.to_dense(), x);
    }

    #[test]
    fn test_new_validates_structure() {
        assert!(CsrMatrix::new(2, 2, vec![0, 1], vec![0], vec![1.0]).is_err());
        assert!(CsrMatrix::new(1, 2, vec![0, 1], vec![2], vec![1.0]).is_err());
        assert!(CsrMatrix::new(2, 2, vec![0, 2, 1], vec![0, 1], vec![1.0, 1.0]).is_err());
        assert!(CsrMatrix::new(1, 2, vec![0, 1], vec![0], vec![f64::NAN]).is_err());
        assert!(CsrMatrix::new(1, 2, vec![0, 1], vec![1], vec![4.0]).is_ok());
    }

    #[test]
    fn test_new_rejects_duplicate_columns() {
        let err = CsrMatrix::new(2, 3, vec![0, 1, 3], vec![2, 1, 1], vec![1.0, 2.0, 3.0])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate column index 1 in row 1"));

        // The same column may appear in different rows.
        assert!(CsrMatrix::new(2, 3, vec![0, 1, 3], vec![1, 2, 1], vec![1.0, 2.0, 3.0]).is_ok());
    }

    #[test]
    fn test_is_finite() {
        assert!(CsrMatrix::from_dense(&array![[1.0, 0.0]]).is_finite());
        assert!(!CsrMatrix::from_dense(&array![[f64::INFINITY, 0.0]]).is_finite());
    }
}
