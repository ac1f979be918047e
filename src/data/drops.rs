// --- Файл: src/data/drops.rs ---

//! Маски сэмплирования по шагам (zoneout / sample-drop).
//!
//! При обучении каждый элемент маски - независимое испытание Бернулли
//! с вероятностью `p`, значения в {0, 1}. При оценке маска заполнена
//! константой `p`, чтобы прямой проход был детерминированным.

use crate::error::{check_probability, DataError, Result};
use ndarray::{concatenate, Array3, Axis};
use rand::distr::{Bernoulli, Distribution};
use rand::rngs::StdRng;

/// Форма и вероятности маски.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropSpec {
    /// Одна маска (T, B, hidden_dim).
    Single { prob: f32, hidden_dim: usize },
    /// Две маски (T, B, 1), склеенные по последней оси: (T, B, 2).
    Pair { primary: f32, secondary: f32 },
}

impl DropSpec {
    /// Ширина маски по последней оси.
    pub fn width(&self) -> usize {
        match self {
            DropSpec::Single { hidden_dim, .. } => *hidden_dim,
            DropSpec::Pair { .. } => 2,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            DropSpec::Single { prob, hidden_dim } => {
                check_probability(prob)?;
                if hidden_dim == 0 {
                    return Err(DataError::InvalidConfig("hidden width must be positive".into()));
                }
            }
            DropSpec::Pair { primary, secondary } => {
                check_probability(primary)?;
                check_probability(secondary)?;
            }
        }
        Ok(())
    }
}

/// Генератор масок с собственным генератором случайных чисел.
#[derive(Debug, Clone)]
pub struct DropMaskSampler {
    spec: DropSpec,
    is_evaluation: bool,
    eval_secondary_uses_primary: bool,
    rng: StdRng,
}

impl DropMaskSampler {
    pub fn new(spec: DropSpec, is_evaluation: bool, rng: StdRng) -> Result<Self> {
        spec.validate()?;
        Ok(Self {
            spec,
            is_evaluation,
            eval_secondary_uses_primary: false,
            rng,
        })
    }

    /// При оценке заполнять вторую маску вероятностью первой.
    pub fn eval_secondary_uses_primary(mut self, enabled: bool) -> Self {
        self.eval_secondary_uses_primary = enabled;
        self
    }

    pub fn is_evaluation(&self) -> bool {
        self.is_evaluation
    }

    pub fn width(&self) -> usize {
        self.spec.width()
    }

    /// Маска формы (T, B, width).
    pub fn sample(&mut self, steps: usize, batch: usize) -> Result<Array3<f32>> {
        match self.spec {
            DropSpec::Single { prob, hidden_dim } => self.channel(prob, (steps, batch, hidden_dim)),
            DropSpec::Pair { primary, secondary } => {
                let secondary = if self.is_evaluation && self.eval_secondary_uses_primary {
                    primary
                } else {
                    secondary
                };
                let first = self.channel(primary, (steps, batch, 1))?;
                let second = self.channel(secondary, (steps, batch, 1))?;
                Ok(concatenate(Axis(2), &[first.view(), second.view()])?)
            }
        }
    }

    fn channel(&mut self, prob: f32, shape: (usize, usize, usize)) -> Result<Array3<f32>> {
        if self.is_evaluation {
            return Ok(Array3::from_elem(shape, prob));
        }
        let bernoulli = Bernoulli::new(prob as f64).map_err(|_| DataError::InvalidProbability(prob))?;
        let rng = &mut self.rng;
        Ok(Array3::from_shape_simple_fn(shape, || {
            if bernoulli.sample(&mut *rng) {
                1.0
            } else {
                0.0
            }
        }))
    }
}
