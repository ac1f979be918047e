// --- Файл: src/data/transforms.rs ---

//! Детерминированные преобразования батчей: переход к time-major,
//! перестановка и кодирование меток.

use crate::error::{DataError, Result};
use ndarray::{Array1, Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Метка-заглушка для всех шагов, кроме последнего.
pub const DEFAULT_LABEL_SENTINEL: i32 = -1;

/// Трейт для преобразований трехмерных батчей.
pub trait Transform: Send + Sync {
    /// Применяет преобразование к данным.
    fn apply(&self, data: Array3<f32>) -> Result<Array3<f32>>;
}

/// Композиция нескольких преобразований.
#[derive(Default)]
pub struct Compose {
    transforms: Vec<Box<dyn Transform>>,
}

impl Compose {
    /// Создает пустую композицию.
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавляет преобразование в композицию.
    pub fn add<T: Transform + 'static>(mut self, transform: T) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl Transform for Compose {
    fn apply(&self, mut data: Array3<f32>) -> Result<Array3<f32>> {
        for transform in &self.transforms {
            data = transform.apply(data)?;
        }
        Ok(data)
    }
}

/// (B, L, F) -> (L, B, F). Чистая транспозиция первых двух осей.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeMajor;

impl Transform for TimeMajor {
    fn apply(&self, data: Array3<f32>) -> Result<Array3<f32>> {
        Ok(to_time_major(data))
    }
}

pub fn to_time_major(data: Array3<f32>) -> Array3<f32> {
    data.permuted_axes([1, 0, 2]).as_standard_layout().into_owned()
}

/// Ось time-major батча, вдоль которой действует перестановка.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermutedAxis {
    /// Ось 0: для попиксельного MNIST каждый пиксель - отдельный шаг.
    Time,
    /// Ось 2.
    Feature,
}

impl PermutedAxis {
    pub fn axis(&self) -> Axis {
        match self {
            PermutedAxis::Time => Axis(0),
            PermutedAxis::Feature => Axis(2),
        }
    }
}

/// Биекция на множестве {0, ..., n-1}.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    indices: Vec<usize>,
}

impl Permutation {
    pub fn identity(n: usize) -> Self {
        Self {
            indices: (0..n).collect(),
        }
    }

    /// Равномерно случайная перестановка.
    pub fn random(n: usize, rng: &mut StdRng) -> Self {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        Self { indices }
    }

    /// Проверяет, что индексы образуют перестановку.
    pub fn from_indices(indices: Vec<usize>) -> Result<Self> {
        let n = indices.len();
        let mut seen = vec![false; n];
        for &i in &indices {
            if i >= n || seen[i] {
                return Err(DataError::InvalidConfig(format!(
                    "{:?} is not a permutation of 0..{}",
                    indices, n
                )));
            }
            seen[i] = true;
        }
        Ok(Self { indices })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn inverse(&self) -> Self {
        let mut inverse = vec![0; self.indices.len()];
        for (position, &source) in self.indices.iter().enumerate() {
            inverse[source] = position;
        }
        Self { indices: inverse }
    }

    /// Переупорядочивает ось: `out[.., k, ..] = data[.., indices[k], ..]`.
    pub fn apply(&self, data: &Array3<f32>, axis: Axis) -> Result<Array3<f32>> {
        let actual = data.len_of(axis);
        if actual != self.len() {
            return Err(DataError::ShapeMismatch {
                expected: vec![self.len()],
                actual: vec![actual],
            });
        }
        Ok(data.select(axis, &self.indices))
    }
}

/// Перестановка, закрепленная за осью.
#[derive(Debug, Clone)]
pub struct Permute {
    permutation: Permutation,
    axis: PermutedAxis,
}

impl Permute {
    pub fn new(permutation: Permutation, axis: PermutedAxis) -> Self {
        Self { permutation, axis }
    }
}

impl Transform for Permute {
    fn apply(&self, data: Array3<f32>) -> Result<Array3<f32>> {
        self.permutation.apply(&data, self.axis.axis())
    }
}

fn default_sentinel() -> i32 {
    DEFAULT_LABEL_SENTINEL
}

/// Способ кодирования меток классификации последовательностей.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum LabelMode {
    /// Только метка последнего шага, форма (B,).
    #[default]
    Final,
    /// Метка на каждый шаг, форма (T, B): `sentinel` везде, кроме последнего шага.
    PerStep {
        #[serde(default = "default_sentinel")]
        sentinel: i32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Labels {
    Final(Array1<i32>),
    PerStep(Array2<i32>),
}

impl Labels {
    /// Настоящие метки (последний шаг) независимо от кодирования.
    pub fn final_labels(&self) -> Array1<i32> {
        match self {
            Labels::Final(labels) => labels.clone(),
            Labels::PerStep(labels) => labels.row(labels.nrows() - 1).to_owned(),
        }
    }
}

pub fn encode_labels(labels: Array1<i32>, seq_len: usize, mode: LabelMode) -> Labels {
    match mode {
        LabelMode::Final => Labels::Final(labels),
        LabelMode::PerStep { sentinel } => {
            let mut per_step = Array2::from_elem((seq_len, labels.len()), sentinel);
            if seq_len > 0 {
                per_step.row_mut(seq_len - 1).assign(&labels);
            }
            Labels::PerStep(per_step)
        }
    }
}
