// --- Файл: src/data/dataset.rs ---

//! Определение трейта Dataset и хранилищ примеров фиксированной длины.

use super::corpus::Corpus;
use crate::error::{DataError, Result};
use ndarray::{s, Array1, Array3, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;

/// Сырой батч в порядке (batch, time, feature).
#[derive(Debug, Clone)]
pub struct RawBatch {
    /// Признаки формы (B, L, F)
    pub features: Array3<f32>,
    /// Метки по одной на пример, форма (B,)
    pub labels: Option<Array1<i32>>,
    /// Индексы примеров в этом батче
    pub indices: Vec<usize>,
}

impl RawBatch {
    /// Возвращает размер батча.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Проверяет, пуст ли батч.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Трейт для хранилищ примеров с произвольным доступом.
///
/// Каждый пример - последовательность формы (L, F).
pub trait Dataset: Send + Sync {
    /// Возвращает количество примеров.
    fn num_examples(&self) -> usize;

    /// Проверяет, пуст ли датасет.
    fn is_empty(&self) -> bool {
        self.num_examples() == 0
    }

    /// Длина последовательности L.
    fn seq_len(&self) -> usize;

    /// Число признаков на шаг F.
    fn feature_dim(&self) -> usize;

    /// Есть ли у примеров метки.
    fn has_labels(&self) -> bool;

    /// Вызывается в начале каждой эпохи.
    fn open_epoch(&mut self, _rng: &mut StdRng) {}

    /// Собирает батч примеров по индексам.
    fn get(&self, indices: &[usize]) -> Result<RawBatch>;
}

fn check_indices(indices: &[usize], len: usize) -> Result<()> {
    match indices.iter().find(|&&i| i >= len) {
        Some(&index) => Err(DataError::IndexOutOfRange { index, len }),
        None => Ok(()),
    }
}

/// Изображения как последовательности: строка корпуса (F_raw,) становится
/// примером (L, F_raw / L).
///
/// Попиксельный MNIST: L = 784, F = 1. Построчный: L = 28, F = 28.
#[derive(Debug, Clone)]
pub struct ImageSequenceDataset {
    corpus: Arc<Corpus>,
    seq_len: usize,
    feature_dim: usize,
    num_examples: usize,
}

impl ImageSequenceDataset {
    pub fn new(corpus: Arc<Corpus>, seq_len: usize, max_examples: Option<usize>) -> Result<Self> {
        let raw = corpus.num_features();
        if seq_len == 0 || raw % seq_len != 0 {
            return Err(DataError::InvalidConfig(format!(
                "{} raw features cannot be split into {} timesteps",
                raw, seq_len
            )));
        }
        let num_examples = max_examples.map_or(corpus.num_rows(), |cap| cap.min(corpus.num_rows()));
        if num_examples == 0 {
            return Err(DataError::CorpusTooShort {
                rows: corpus.num_rows(),
                length: 1,
            });
        }

        Ok(Self {
            seq_len,
            feature_dim: raw / seq_len,
            num_examples,
            corpus,
        })
    }
}

impl Dataset for ImageSequenceDataset {
    fn num_examples(&self) -> usize {
        self.num_examples
    }

    fn seq_len(&self) -> usize {
        self.seq_len
    }

    fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    fn has_labels(&self) -> bool {
        self.corpus.labels().is_some()
    }

    fn get(&self, indices: &[usize]) -> Result<RawBatch> {
        check_indices(indices, self.num_examples)?;

        let features = self
            .corpus
            .features()
            .select(Axis(0), indices)
            .into_shape_with_order((indices.len(), self.seq_len, self.feature_dim))?;
        let labels = self.corpus.labels().map(|l| l.select(Axis(0), indices));

        Ok(RawBatch {
            features,
            labels,
            indices: indices.to_vec(),
        })
    }
}

/// Хранилище непересекающихся окон длины L над плоским корпусом.
///
/// Окно `i` начинается со строки `offset + i * L`. При включенной
/// аугментации смещение заново выбирается из [0, L) в начале каждой эпохи,
/// а одно окно резервируется под сдвиг.
#[derive(Debug, Clone)]
pub struct WindowedDataset {
    corpus: Arc<Corpus>,
    length: usize,
    augment: bool,
    offset: usize,
    num_examples: usize,
}

impl WindowedDataset {
    pub fn new(
        corpus: Arc<Corpus>,
        length: usize,
        augment: bool,
        max_examples: Option<usize>,
    ) -> Result<Self> {
        if length == 0 {
            return Err(DataError::InvalidConfig("window length must be positive".into()));
        }
        let rows = corpus.num_rows();
        let windows = (rows / length).saturating_sub(augment as usize);
        let num_examples = max_examples.map_or(windows, |cap| cap.min(windows));
        if num_examples == 0 {
            return Err(DataError::CorpusTooShort { rows, length });
        }

        Ok(Self {
            corpus,
            length,
            augment,
            offset: 0,
            num_examples,
        })
    }

    /// Текущее смещение окон.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn augment(&self) -> bool {
        self.augment
    }
}

impl Dataset for WindowedDataset {
    fn num_examples(&self) -> usize {
        self.num_examples
    }

    fn seq_len(&self) -> usize {
        self.length
    }

    fn feature_dim(&self) -> usize {
        self.corpus.num_features()
    }

    fn has_labels(&self) -> bool {
        false
    }

    fn open_epoch(&mut self, rng: &mut StdRng) {
        if self.augment {
            self.offset = rng.random_range(0..self.length);
            tracing::debug!("window offset for new epoch: {}", self.offset);
        }
    }

    fn get(&self, indices: &[usize]) -> Result<RawBatch> {
        check_indices(indices, self.num_examples)?;

        let start = self.offset;
        let end = start + self.num_examples * self.length;
        let windows = self
            .corpus
            .features()
            .slice_move(s![start..end, ..])
            .into_shape_with_order((self.num_examples, self.length, self.corpus.num_features()))?;

        Ok(RawBatch {
            features: windows.select(Axis(0), indices),
            labels: None,
            indices: indices.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::SeedableRng;

    /// Корпус, где значение строки равно ее номеру.
    fn ramp_corpus(rows: usize, features: usize) -> Arc<Corpus> {
        let data = Array2::from_shape_fn((rows, features), |(i, _)| i as f32);
        Arc::new(Corpus::new(data, None).unwrap())
    }

    #[test]
    fn test_window_count() {
        let plain = WindowedDataset::new(ramp_corpus(1000, 2), 100, false, None).unwrap();
        assert_eq!(plain.num_examples(), 10);

        let augmented = WindowedDataset::new(ramp_corpus(1000, 2), 100, true, None).unwrap();
        assert_eq!(augmented.num_examples(), 9);

        let capped = WindowedDataset::new(ramp_corpus(1000, 2), 100, false, Some(4)).unwrap();
        assert_eq!(capped.num_examples(), 4);
    }

    #[test]
    fn test_too_short_corpus_is_rejected() {
        assert!(matches!(
            WindowedDataset::new(ramp_corpus(50, 2), 100, false, None),
            Err(DataError::CorpusTooShort { rows: 50, length: 100 })
        ));
        // С аугментацией нужно хотя бы два окна
        assert!(WindowedDataset::new(ramp_corpus(150, 2), 100, true, None).is_err());
        assert!(WindowedDataset::new(ramp_corpus(150, 2), 0, false, None).is_err());
    }

    #[test]
    fn test_windows_do_not_overlap() {
        let dataset = WindowedDataset::new(ramp_corpus(35, 3), 10, false, None).unwrap();
        assert_eq!(dataset.num_examples(), 3);
        assert!(dataset.num_examples() * dataset.seq_len() <= 35);

        let batch = dataset.get(&[2, 0, 1]).unwrap();
        assert_eq!(batch.features.shape(), &[3, 10, 3]);
        assert_eq!(batch.features[[0, 0, 0]], 20.0);
        assert_eq!(batch.features[[0, 9, 2]], 29.0);
        assert_eq!(batch.features[[1, 0, 0]], 0.0);
        assert_eq!(batch.features[[2, 0, 0]], 10.0);
        assert!(batch.labels.is_none());
    }

    #[test]
    fn test_augmentation_offsets() {
        let mut dataset = WindowedDataset::new(ramp_corpus(100, 1), 10, true, None).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            dataset.open_epoch(&mut rng);
            let offset = dataset.offset();
            assert!(offset < 10);
            seen.insert(offset);

            // Последнее окно все еще помещается в корпус
            let last = dataset.get(&[dataset.num_examples() - 1]).unwrap();
            assert_eq!(last.features[[0, 0, 0]], (offset + 80) as f32);
        }
        assert!(seen.len() > 1);
    }

    #[test]
    fn test_offset_is_fixed_without_augmentation() {
        let mut dataset = WindowedDataset::new(ramp_corpus(100, 1), 10, false, None).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        dataset.open_epoch(&mut rng);
        assert_eq!(dataset.offset(), 0);
    }

    #[test]
    fn test_index_out_of_range() {
        let dataset = WindowedDataset::new(ramp_corpus(100, 1), 10, false, None).unwrap();
        assert!(matches!(
            dataset.get(&[3, 10]),
            Err(DataError::IndexOutOfRange { index: 10, len: 10 })
        ));
    }

    #[test]
    fn test_image_sequences() {
        let features = Array2::from_shape_fn((4, 6), |(i, j)| (i * 10 + j) as f32);
        let labels = Array1::from_vec(vec![7, 8, 9, 3]);
        let corpus = Arc::new(Corpus::new(features, Some(labels)).unwrap());

        let pixels = ImageSequenceDataset::new(Arc::clone(&corpus), 6, None).unwrap();
        assert_eq!((pixels.seq_len(), pixels.feature_dim()), (6, 1));
        assert!(pixels.has_labels());

        let rows = ImageSequenceDataset::new(Arc::clone(&corpus), 2, Some(3)).unwrap();
        assert_eq!((rows.seq_len(), rows.feature_dim()), (2, 3));
        assert_eq!(rows.num_examples(), 3);

        let batch = rows.get(&[1, 2]).unwrap();
        assert_eq!(batch.features.shape(), &[2, 2, 3]);
        assert_eq!(batch.features[[0, 1, 0]], 13.0);
        assert_eq!(batch.labels.unwrap().to_vec(), vec![8, 9]);
        assert!(rows.get(&[3]).is_err());

        assert!(ImageSequenceDataset::new(corpus, 4, None).is_err());
    }
}
