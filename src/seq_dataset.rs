//! Sequential access to training samples.
//!
//! The SGD kernel never looks at a whole matrix: it pulls one sample at a time
//! through [`SequentialDataset::next`], as a list of feature indices and
//! values. Dense rows list every column; sparse rows only their non-zeros.

use std::borrow::Cow;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::sparse::CsrMatrix;
use crate::{Matrix, Vector};

/// Intercept updates on sparse data are damped to reduce oscillation.
pub const SPARSE_INTERCEPT_DECAY: f64 = 0.01;

#[derive(Clone, Copy, Debug)]
pub struct Sample<'a> {
    pub indices: &'a [usize],
    pub values: &'a [f64],
    pub y: f64,
    pub sample_weight: f64,
}

pub trait SequentialDataset {
    fn n_samples(&self) -> usize;

    /// Next sample in the current visiting order, wrapping around at the end.
    fn next(&mut self) -> Sample<'_>;

    /// Permutes the visiting order using the dataset's own RNG.
    fn shuffle(&mut self);

    fn intercept_decay(&self) -> f64;
}

/// Bookkeeping shared by the dense and sparse datasets.
#[derive(Debug)]
struct Cursor {
    order: Vec<usize>,
    current: Option<usize>,
    rng: StdRng,
}

impl Cursor {
    fn new(n_samples: usize, seed: u64) -> Self {
        Self {
            order: (0..n_samples).collect(),
            current: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn advance(&mut self) -> usize {
        let position = match self.current {
            Some(p) if p + 1 < self.order.len() => p + 1,
            _ => 0,
        };
        self.current = Some(position);
        self.order[position]
    }

    fn shuffle(&mut self) {
        self.order.shuffle(&mut self.rng);
        self.current = None;
    }
}

pub struct ArrayDataset<'a> {
    data: Cow<'a, [f64]>,
    n_features: usize,
    feature_indices: Vec<usize>,
    y: &'a Vector,
    sample_weight: &'a Vector,
    cursor: Cursor,
}

impl<'a> ArrayDataset<'a> {
    pub fn new(x: &'a Matrix, y: &'a Vector, sample_weight: &'a Vector, seed: u64) -> Self {
        let data = match x.as_slice() {
            Some(slice) => Cow::Borrowed(slice),
            None => Cow::Owned(x.iter().copied().collect()),
        };

        Self {
            data,
            n_features: x.ncols(),
            feature_indices: (0..x.ncols()).collect(),
            y,
            sample_weight,
            cursor: Cursor::new(x.nrows(), seed),
        }
    }
}

impl SequentialDataset for ArrayDataset<'_> {
    fn n_samples(&self) -> usize {
        self.cursor.order.len()
    }

    fn next(&mut self) -> Sample<'_> {
        let i = self.cursor.advance();
        let start = i * self.n_features;
        Sample {
            indices: &self.feature_indices,
            values: &self.data[start..start + self.n_features],
            y: self.y[i],
            sample_weight: self.sample_weight[i],
        }
    }

    fn shuffle(&mut self) {
        self.cursor.shuffle();
    }

    fn intercept_decay(&self) -> f64 {
        1.0
    }
}

pub struct CsrDataset<'a> {
    x: &'a CsrMatrix,
    y: &'a Vector,
    sample_weight: &'a Vector,
    cursor: Cursor,
}

impl<'a> CsrDataset<'a> {
    pub fn new(x: &'a CsrMatrix, y: &'a Vector, sample_weight: &'a Vector, seed: u64) -> Self {
        Self { x, y, sample_weight, cursor: Cursor::new(x.nrows(), seed) }
    }
}

impl SequentialDataset for CsrDataset<'_> {
    fn n_samples(&self) -> usize {
        self.cursor.order.len()
    }

    fn next(&mut self) -> Sample<'_> {
        let i = self.cursor.advance();
        let (indices, values) = self.x.row(i);
        Sample { indices, values, y: self.y[i], sample_weight: self.sample_weight[i] }
    }

    fn shuffle(&mut self) {
        self.cursor.shuffle();
    }

    fn intercept_decay(&self) -> f64 {
        SPARSE_INTERCEPT_DECAY
    }
}

/// Input accepted by the estimators: dense [`Matrix`] or sparse [`CsrMatrix`].
pub trait FeatureMatrix {
    fn n_samples(&self) -> usize;

    fn n_features(&self) -> usize;

    /// False when any stored value is NaN or infinite.
    fn is_finite(&self) -> bool;

    fn dataset<'a>(
        &'a self,
        y: &'a Vector,
        sample_weight: &'a Vector,
        seed: u64,
    ) -> Box<dyn SequentialDataset + 'a>;

    /// `X · coefᵀ + intercept`, one column per coefficient row.
    fn linear_predict(&self, coef: &Matrix, intercept: &Vector) -> Matrix;
}

impl FeatureMatrix for Matrix {
    fn n_samples(&self) -> usize {
        self.nrows()
    }

    fn n_features(&self) -> usize {
        self.ncols()
    }

    fn is_finite(&self) -> bool {
        self.iter().all(|v| v.is_finite())
    }

    fn dataset<'a>(
        &'a self,
        y: &'a Vector,
        sample_weight: &'a Vector,
        seed: u64,
    ) -> Box<dyn SequentialDataset + 'a> {
        Box::new(ArrayDataset::new(self, y, sample_weight, seed))
    }

    fn linear_predict(&self, coef: &Matrix, intercept: &Vector) -> Matrix {
        let mut scores = self.dot(&coef.t());
        scores += intercept;
        scores
    }
}

impl FeatureMatrix for CsrMatrix {
    fn n_samples(&self) -> usize {
        self.nrows()
    }

    fn n_features(&self) -> usize {
        self.ncols()
    }

    fn is_finite(&self) -> bool {
        CsrMatrix::is_finite(self)
    }

    fn dataset<'a>(
        &'a self,
        y: &'a Vector,
        sample_weight: &'a Vector,
        seed: u64,
    ) -> Box<dyn SequentialDataset + 'a> {
        Box::new(CsrDataset::new(self, y, sample_weight, seed))
    }

    fn linear_predict(&self, coef: &Matrix, intercept: &Vector) -> Matrix {
        let mut scores = Matrix::zeros((self.nrows(), coef.nrows()));
        for i in 0..self.nrows() {
            let (indices, values) = self.row(i);
            for k in 0..coef.nrows() {
                let dot: f64 = indices
                    .iter()
                    .zip(values)
                    .map(|(&j, &v)| coef[[k, j]] * v)
                    .sum();
                scores[[i, k]] = dot + intercept[k];
            }
        }
        scores
    }
}
