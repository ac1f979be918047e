// --- Файл: src/data/stream.rs ---

//! Источники батчей с явным управлением эпохами.

use super::dataset::{Dataset, RawBatch};
use super::sampler::{BatchSampler, IndexSampler, RandomSampler, SequentialSampler};
use crate::error::{DataError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Источник батчей, из которого потребитель тянет данные по одному батчу.
///
/// `Ok(None)` означает конец эпохи; после него источник снова выдает
/// данные только после `open_epoch`.
pub trait BatchSource {
    type Batch;

    /// Имена полей батча в объявленном порядке.
    fn sources(&self) -> &[&'static str];

    /// Источники в этом крейте всегда выдают целые батчи.
    fn produces_examples(&self) -> bool {
        false
    }

    /// Длина последовательности L.
    fn seq_len(&self) -> usize;

    /// Число признаков на шаг F.
    fn feature_dim(&self) -> usize;

    /// Начинает новую эпоху.
    fn open_epoch(&mut self) -> Result<()>;

    /// Следующий батч или `None` в конце эпохи.
    fn next_batch(&mut self) -> Result<Option<Self::Batch>>;

    /// Итератор по оставшимся батчам текущей эпохи.
    fn epoch(&mut self) -> Epoch<'_, Self>
    where
        Self: Sized,
    {
        Epoch { source: self }
    }
}

/// Итератор по батчам одной эпохи.
pub struct Epoch<'a, S: BatchSource> {
    source: &'a mut S,
}

impl<'a, S: BatchSource> Iterator for Epoch<'a, S> {
    type Item = Result<S::Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.source.next_batch().transpose()
    }
}

/// Схема обхода примеров.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchScheme {
    pub batch_size: usize,
    pub shuffle: bool,
    pub drop_last: bool,
}

impl BatchScheme {
    pub fn sequential(batch_size: usize) -> Self {
        Self {
            batch_size,
            shuffle: false,
            drop_last: false,
        }
    }

    pub fn shuffled(batch_size: usize) -> Self {
        Self {
            batch_size,
            shuffle: true,
            drop_last: false,
        }
    }

    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }
}

/// Поток сырых батчей (B, L, F) над датасетом.
///
/// # Пример
///
/// ```rust,ignore
/// let mut stream = DataStream::new(dataset, BatchScheme::shuffled(32), rng)?;
/// for batch in stream.epoch() {
///     let batch = batch?;
///     println!("Batch size: {}", batch.len());
/// }
/// stream.open_epoch()?;
/// ```
pub struct DataStream<D: Dataset> {
    dataset: D,
    batch_sampler: BatchSampler<IndexSampler>,
    rng: StdRng,
    sources: Vec<&'static str>,
    epochs_opened: usize,
}

impl<D: Dataset> DataStream<D> {
    /// Создает поток и сразу открывает первую эпоху.
    pub fn new(dataset: D, scheme: BatchScheme, mut rng: StdRng) -> Result<Self> {
        if scheme.batch_size == 0 {
            return Err(DataError::InvalidConfig("batch size must be positive".into()));
        }

        let n = dataset.num_examples();
        let sampler = if scheme.shuffle {
            IndexSampler::Random(RandomSampler::new(n, StdRng::from_rng(&mut rng)))
        } else {
            IndexSampler::Sequential(SequentialSampler::new(n))
        };
        let sources = if dataset.has_labels() {
            vec!["x", "y"]
        } else {
            vec!["x"]
        };

        let mut stream = Self {
            batch_sampler: BatchSampler::new(sampler, scheme.batch_size, scheme.drop_last),
            dataset,
            rng,
            sources,
            epochs_opened: 0,
        };
        // Сэмплер уже находится в начале эпохи, остается только датасет
        stream.dataset.open_epoch(&mut stream.rng);
        stream.epochs_opened = 1;
        Ok(stream)
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    /// Количество батчей за эпоху.
    pub fn num_batches(&self) -> usize {
        self.batch_sampler.num_batches()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_sampler.batch_size()
    }

    /// Сколько эпох было открыто, включая первую.
    pub fn epochs_opened(&self) -> usize {
        self.epochs_opened
    }
}

impl<D: Dataset> BatchSource for DataStream<D> {
    type Batch = RawBatch;

    fn sources(&self) -> &[&'static str] {
        &self.sources
    }

    fn seq_len(&self) -> usize {
        self.dataset.seq_len()
    }

    fn feature_dim(&self) -> usize {
        self.dataset.feature_dim()
    }

    fn open_epoch(&mut self) -> Result<()> {
        self.batch_sampler.reset();
        self.dataset.open_epoch(&mut self.rng);
        self.epochs_opened += 1;
        tracing::debug!(
            "opened epoch {} ({} batches)",
            self.epochs_opened,
            self.num_batches()
        );
        Ok(())
    }

    fn next_batch(&mut self) -> Result<Option<RawBatch>> {
        match self.batch_sampler.next() {
            Some(indices) => self.dataset.get(&indices).map(Some),
            None => Ok(None),
        }
    }
}
