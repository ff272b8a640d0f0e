use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SgdError;

/// A per-sample loss `L(p, y)` for prediction `p` and target `y`.
pub trait LossFunction: fmt::Debug + Send + Sync {
    fn loss(&self, p: f64, y: f64) -> f64;

    /// Derivative of the loss with respect to `p`.
    fn dloss(&self, p: f64, y: f64) -> f64;

    fn name(&self) -> &'static str;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hinge {
    pub threshold: f64,
}

impl Hinge {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for Hinge {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LossFunction for Hinge {
    fn loss(&self, p: f64, y: f64) -> f64 {
        let z = p * y;
        if z <= self.threshold { self.threshold - z } else { 0.0 }
    }

    fn dloss(&self, p: f64, y: f64) -> f64 {
        if p * y <= self.threshold { -y } else { 0.0 }
    }

    fn name(&self) -> &'static str {
        if self.threshold == 0.0 { "perceptron" } else { "hinge" }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SquaredHinge {
    pub threshold: f64,
}

impl Default for SquaredHinge {
    fn default() -> Self {
        Self { threshold: 1.0 }
    }
}

impl LossFunction for SquaredHinge {
    fn loss(&self, p: f64, y: f64) -> f64 {
        let z = self.threshold - p * y;
        if z > 0.0 { z * z } else { 0.0 }
    }

    fn dloss(&self, p: f64, y: f64) -> f64 {
        let z = self.threshold - p * y;
        if z > 0.0 { -2.0 * y * z } else { 0.0 }
    }

    fn name(&self) -> &'static str {
        "squared_hinge"
    }
}

/// Logistic loss, with the exponentials cut off where they saturate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Log;

impl LossFunction for Log {
    fn loss(&self, p: f64, y: f64) -> f64 {
        let z = p * y;
        if z > 18.0 {
            (-z).exp()
        } else if z < -18.0 {
            -z
        } else {
            (-z).exp().ln_1p()
        }
    }

    fn dloss(&self, p: f64, y: f64) -> f64 {
        let z = p * y;
        if z > 18.0 {
            (-z).exp() * -y
        } else if z < -18.0 {
            -y
        } else {
            -y / (z.exp() + 1.0)
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Smoothed hinge loss; quadratic inside the margin, linear beyond `z = -1`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModifiedHuber;

impl LossFunction for ModifiedHuber {
    fn loss(&self, p: f64, y: f64) -> f64 {
        let z = p * y;
        if z >= 1.0 {
            0.0
        } else if z >= -1.0 {
            (1.0 - z) * (1.0 - z)
        } else {
            -4.0 * z
        }
    }

    fn dloss(&self, p: f64, y: f64) -> f64 {
        let z = p * y;
        if z >= 1.0 {
            0.0
        } else if z >= -1.0 {
            2.0 * (1.0 - z) * -y
        } else {
            -4.0 * y
        }
    }

    fn name(&self) -> &'static str {
        "modified_huber"
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SquaredLoss;

impl LossFunction for SquaredLoss {
    fn loss(&self, p: f64, y: f64) -> f64 {
        0.5 * (p - y) * (p - y)
    }

    fn dloss(&self, p: f64, y: f64) -> f64 {
        p - y
    }

    fn name(&self) -> &'static str {
        "squared_loss"
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Huber {
    pub c: f64,
}

impl Huber {
    pub fn new(c: f64) -> Self {
        Self { c }
    }
}

impl LossFunction for Huber {
    fn loss(&self, p: f64, y: f64) -> f64 {
        let r = p - y;
        let abs_r = r.abs();
        if abs_r <= self.c {
            0.5 * r * r
        } else {
            self.c * abs_r - 0.5 * self.c * self.c
        }
    }

    fn dloss(&self, p: f64, y: f64) -> f64 {
        let r = p - y;
        if r.abs() <= self.c {
            r
        } else if r > 0.0 {
            self.c
        } else {
            -self.c
        }
    }

    fn name(&self) -> &'static str {
        "huber"
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpsilonInsensitive {
    pub epsilon: f64,
}

impl LossFunction for EpsilonInsensitive {
    fn loss(&self, p: f64, y: f64) -> f64 {
        ((y - p).abs() - self.epsilon).max(0.0)
    }

    fn dloss(&self, p: f64, y: f64) -> f64 {
        if y - p > self.epsilon {
            -1.0
        } else if p - y > self.epsilon {
            1.0
        } else {
            0.0
        }
    }

    fn name(&self) -> &'static str {
        "epsilon_insensitive"
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SquaredEpsilonInsensitive {
    pub epsilon: f64,
}

impl LossFunction for SquaredEpsilonInsensitive {
    fn loss(&self, p: f64, y: f64) -> f64 {
        let ret = (y - p).abs() - self.epsilon;
        if ret > 0.0 { ret * ret } else { 0.0 }
    }

    fn dloss(&self, p: f64, y: f64) -> f64 {
        let z = y - p;
        if z > self.epsilon {
            -2.0 * (z - self.epsilon)
        } else if z < -self.epsilon {
            2.0 * (-z - self.epsilon)
        } else {
            0.0
        }
    }

    fn name(&self) -> &'static str {
        "squared_epsilon_insensitive"
    }
}

/// Loss selection for [`SGDClassifier`](super::SGDClassifier).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    #[default]
    Hinge,
    Log,
    ModifiedHuber,
    SquaredHinge,
    Perceptron,
    SquaredLoss,
    Huber,
    EpsilonInsensitive,
    SquaredEpsilonInsensitive,
}

impl Loss {
    /// Builds the loss; `epsilon` is only read by the Huber and
    /// epsilon-insensitive variants.
    pub fn build(self, epsilon: f64) -> Box<dyn LossFunction> {
        match self {
            Loss::Hinge => Box::new(Hinge::new(1.0)),
            Loss::Log => Box::new(Log),
            Loss::ModifiedHuber => Box::new(ModifiedHuber),
            Loss::SquaredHinge => Box::new(SquaredHinge { threshold: 1.0 }),
            Loss::Perceptron => Box::new(Hinge::new(0.0)),
            Loss::SquaredLoss => Box::new(SquaredLoss),
            Loss::Huber => Box::new(Huber::new(epsilon)),
            Loss::EpsilonInsensitive => Box::new(EpsilonInsensitive { epsilon }),
            Loss::SquaredEpsilonInsensitive => Box::new(SquaredEpsilonInsensitive { epsilon }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Loss::Hinge => "hinge",
            Loss::Log => "log",
            Loss::ModifiedHuber => "modified_huber",
            Loss::SquaredHinge => "squared_hinge",
            Loss::Perceptron => "perceptron",
            Loss::SquaredLoss => "squared_loss",
            Loss::Huber => "huber",
            Loss::EpsilonInsensitive => "epsilon_insensitive",
            Loss::SquaredEpsilonInsensitive => "squared_epsilon_insensitive",
        }
    }

    pub fn uses_epsilon(self) -> bool {
        matches!(
            self,
            Loss::Huber | Loss::EpsilonInsensitive | Loss::SquaredEpsilonInsensitive
        )
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Loss {
    type Err = SgdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let loss = match s {
            "hinge" => Loss::Hinge,
            "log" => Loss::Log,
            "modified_huber" => Loss::ModifiedHuber,
            "squared_hinge" => Loss::SquaredHinge,
            "perceptron" => Loss::Perceptron,
            "squared_loss" => Loss::SquaredLoss,
            "huber" => Loss::Huber,
            "epsilon_insensitive" => Loss::EpsilonInsensitive,
            "squared_epsilon_insensitive" => Loss::SquaredEpsilonInsensitive,
            other => return Err(SgdError::invalid("loss", format!("unknown loss {:?}", other))),
        };
        Ok(loss)
    }
}
