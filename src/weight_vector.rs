use ndarray::ArrayView1;

use crate::Vector;

/// Below this scale the factor is folded back into the weights.
const MIN_WSCALE: f64 = 1e-9;

/// Dense weight vector stored as `wscale * w`.
///
/// Keeping the scale apart makes the L2 shrinkage applied on every sample an
/// O(1) operation instead of a pass over all features.
#[derive(Clone, Debug)]
pub struct WeightVector {
    w: Vector,
    wscale: f64,
    sq_norm: f64,
}

impl WeightVector {
    pub fn new(w: Vector) -> Self {
        let sq_norm = w.dot(&w);
        Self { w, wscale: 1.0, sq_norm }
    }

    pub fn len(&self) -> usize {
        self.w.len()
    }

    pub fn is_empty(&self) -> bool {
        self.w.is_empty()
    }

    pub fn wscale(&self) -> f64 {
        self.wscale
    }

    pub fn dot(&self, indices: &[usize], values: &[f64]) -> f64 {
        let inner: f64 = indices.iter().zip(values).map(|(&j, &v)| self.w[j] * v).sum();
        inner * self.wscale
    }

    /// Adds `c * x` to the logical weights.
    pub fn add(&mut self, indices: &[usize], values: &[f64], c: f64) {
        let mut inner = 0.0;
        let mut x_sq_norm = 0.0;
        let step = c / self.wscale;

        for (&j, &v) in indices.iter().zip(values) {
            inner += self.w[j] * v;
            x_sq_norm += v * v;
            self.w[j] += v * step;
        }

        self.sq_norm += x_sq_norm * c * c + 2.0 * inner * self.wscale * c;
    }

    pub fn scale(&mut self, c: f64) {
        self.wscale *= c;
        self.sq_norm *= c * c;
        if self.wscale < MIN_WSCALE {
            self.reset_wscale();
        }
    }

    pub fn reset_wscale(&mut self) {
        if self.wscale != 1.0 {
            self.w *= self.wscale;
            self.wscale = 1.0;
        }
    }

    pub fn norm(&self) -> f64 {
        self.sq_norm.max(0.0).sqrt()
    }

    pub fn nnz(&self) -> usize {
        self.w.iter().filter(|&&v| v != 0.0).count()
    }

    pub fn is_finite(&self) -> bool {
        self.wscale.is_finite() && self.w.iter().all(|v| v.is_finite())
    }

    pub fn to_vector(&self) -> Vector {
        &self.w * self.wscale
    }

    /// Cumulative L1 truncation over the touched features.
    ///
    /// `u` is the total L1 penalty every weight could have received so far and
    /// `q[j]` the penalty weight `j` actually received.
    pub fn l1_truncate(&mut self, indices: &[usize], u: f64, q: &mut Vector) {
        let wscale = self.wscale;
        for &j in indices {
            let z = self.w[j];
            if wscale * z > 0.0 {
                self.w[j] = (z - (u + q[j]) / wscale).max(0.0);
            } else if wscale * z < 0.0 {
                self.w[j] = (z + (u - q[j]) / wscale).min(0.0);
            }
            q[j] += wscale * (self.w[j] - z);

            let before = wscale * z;
            let after = wscale * self.w[j];
            self.sq_norm += after * after - before * before;
        }
    }

    /// Moves every weight toward `mean` by `min(1, rate * precision[j])` of
    /// its distance to it.
    pub fn shrink_toward(&mut self, mean: ArrayView1<f64>, precision: ArrayView1<f64>, rate: f64) {
        let wscale = self.wscale;
        let mut sq_norm = 0.0;

        for ((w, &m), &p) in self.w.iter_mut().zip(mean.iter()).zip(precision.iter()) {
            let current = *w * wscale;
            let factor = (rate * p).min(1.0);
            let updated = current - factor * (current - m);
            *w = updated / wscale;
            sq_norm += updated * updated;
        }

        self.sq_norm = sq_norm;
    }
}
