// --- Файл: src/data/sample_drops.rs ---

//! Аугментирующий поток: time-major признаки, метки и свежая маска на каждый батч.

use super::dataset::RawBatch;
use super::drops::{DropMaskSampler, DropSpec};
use super::stream::BatchSource;
use super::transforms::{encode_labels, Compose, LabelMode, Labels, Permutation, Permute, PermutedAxis, TimeMajor, Transform};
use crate::error::{DataError, Result};
use ndarray::Array3;
use rand::rngs::StdRng;

/// Готовый батч в порядке (time, batch, feature).
#[derive(Debug, Clone)]
pub struct Batch {
    /// Признаки формы (T, B, F)
    pub features: Array3<f32>,
    /// Метки в выбранном кодировании
    pub labels: Option<Labels>,
    /// Маска формы (T, B, H)
    pub drops: Array3<f32>,
}

impl Batch {
    pub fn seq_len(&self) -> usize {
        self.features.shape()[0]
    }

    pub fn batch_size(&self) -> usize {
        self.features.shape()[1]
    }
}

/// Параметры аугментации.
#[derive(Debug, Clone)]
pub struct SampleDropsConfig {
    pub drops: DropSpec,
    pub is_evaluation: bool,
    pub permutation: Option<(Permutation, PermutedAxis)>,
    pub label_mode: LabelMode,
    pub eval_secondary_uses_primary: bool,
}

impl SampleDropsConfig {
    pub fn new(drops: DropSpec) -> Self {
        Self {
            drops,
            is_evaluation: false,
            permutation: None,
            label_mode: LabelMode::Final,
            eval_secondary_uses_primary: false,
        }
    }

    pub fn evaluation(mut self, is_evaluation: bool) -> Self {
        self.is_evaluation = is_evaluation;
        self
    }

    pub fn permutation(mut self, permutation: Permutation, axis: PermutedAxis) -> Self {
        self.permutation = Some((permutation, axis));
        self
    }

    pub fn label_mode(mut self, mode: LabelMode) -> Self {
        self.label_mode = mode;
        self
    }

    pub fn eval_secondary_uses_primary(mut self, enabled: bool) -> Self {
        self.eval_secondary_uses_primary = enabled;
        self
    }
}

/// Декоратор над источником сырых батчей.
///
/// На каждый запрос берет следующий батч (B, L, F), транспонирует его в
/// (L, B, F), применяет перестановку, кодирует метки и добавляет маску.
pub struct SampleDrops<S> {
    inner: S,
    transforms: Compose,
    label_mode: LabelMode,
    drops: DropMaskSampler,
    sources: Vec<&'static str>,
}

impl<S: BatchSource<Batch = RawBatch>> SampleDrops<S> {
    /// Проверяет конфигурацию против источника до первого батча.
    pub fn new(inner: S, config: SampleDropsConfig, rng: StdRng) -> Result<Self> {
        let drops = DropMaskSampler::new(config.drops, config.is_evaluation, rng)?
            .eval_secondary_uses_primary(config.eval_secondary_uses_primary);

        let mut transforms = Compose::new().add(TimeMajor);
        if let Some((permutation, axis)) = config.permutation {
            let expected = match axis {
                PermutedAxis::Time => inner.seq_len(),
                PermutedAxis::Feature => inner.feature_dim(),
            };
            if permutation.len() != expected {
                return Err(DataError::ShapeMismatch {
                    expected: vec![expected],
                    actual: vec![permutation.len()],
                });
            }
            transforms = transforms.add(Permute::new(permutation, axis));
        }

        let sources = if inner.sources().contains(&"y") {
            vec!["y", "x", "drops"]
        } else {
            vec!["x", "drops"]
        };

        Ok(Self {
            inner,
            transforms,
            label_mode: config.label_mode,
            drops,
            sources,
        })
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn is_evaluation(&self) -> bool {
        self.drops.is_evaluation()
    }

    /// Ширина маски по последней оси.
    pub fn mask_width(&self) -> usize {
        self.drops.width()
    }
}

impl<S: BatchSource<Batch = RawBatch>> BatchSource for SampleDrops<S> {
    type Batch = Batch;

    fn sources(&self) -> &[&'static str] {
        &self.sources
    }

    fn seq_len(&self) -> usize {
        self.inner.seq_len()
    }

    fn feature_dim(&self) -> usize {
        self.inner.feature_dim()
    }

    fn open_epoch(&mut self) -> Result<()> {
        self.inner.open_epoch()
    }

    fn next_batch(&mut self) -> Result<Option<Batch>> {
        let Some(raw) = self.inner.next_batch()? else {
            return Ok(None);
        };

        let features = self.transforms.apply(raw.features)?;
        let (steps, batch) = (features.shape()[0], features.shape()[1]);
        let labels = raw
            .labels
            .map(|labels| encode_labels(labels, steps, self.label_mode));
        let drops = self.drops.sample(steps, batch)?;

        tracing::trace!(
            "batch: features {:?}, drops {:?}",
            features.shape(),
            drops.shape()
        );
        Ok(Some(Batch {
            features,
            labels,
            drops,
        }))
    }
}
