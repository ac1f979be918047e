// --- Файл: src/data/builders.rs ---

//! Сборка готовых потоков для seq-MNIST, MNIST и PTB.
//!
//! Обучающий сплит сэмплирует маски и (по настройке) перемешивает примеры,
//! valid/test идут по порядку с детерминированной маской.

use super::corpus::{CorpusCache, CorpusSource, Split};
use super::dataset::{ImageSequenceDataset, WindowedDataset};
use super::drops::DropSpec;
use super::sample_drops::{SampleDrops, SampleDropsConfig};
use super::stream::{BatchScheme, DataStream};
use super::transforms::{Permutation, PermutedAxis};
use crate::config::StreamConfig;
use crate::error::{DataError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub type ImageStream = SampleDrops<DataStream<ImageSequenceDataset>>;
pub type CharStream = SampleDrops<DataStream<WindowedDataset>>;

/// Фабрика потоков над общим кэшем корпусов.
///
/// Каждый поток получает собственный генератор, выведенный из главного,
/// поэтому при заданном seed весь набор потоков воспроизводим.
pub struct StreamFactory<'a, S: CorpusSource> {
    cache: &'a CorpusCache<S>,
    config: StreamConfig,
    rng: StdRng,
    pixel_permutation: Option<Permutation>,
}

impl<'a, S: CorpusSource> StreamFactory<'a, S> {
    pub fn new(cache: &'a CorpusCache<S>, config: StreamConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            cache,
            config,
            rng,
            pixel_permutation: None,
        })
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    fn child_rng(&mut self) -> StdRng {
        StdRng::from_rng(&mut self.rng)
    }

    fn scheme(&self, split: Split) -> BatchScheme {
        if split.is_training() && self.config.shuffle_train {
            BatchScheme::shuffled(self.config.batch_size)
        } else {
            BatchScheme::sequential(self.config.batch_size)
        }
    }

    fn single_mask(&self) -> DropSpec {
        DropSpec::Single {
            prob: self.config.drop_prob,
            hidden_dim: self.config.hidden_dim,
        }
    }

    /// Перестановка пикселей: выбирается один раз и общая для всех сплитов.
    ///
    /// Запрос другой длины после первого выбора - ошибка `ShapeMismatch`.
    pub fn pixel_permutation(&mut self, pixels: usize) -> Result<Permutation> {
        match &self.pixel_permutation {
            Some(perm) if perm.len() == pixels => Ok(perm.clone()),
            Some(perm) => Err(DataError::ShapeMismatch {
                expected: vec![perm.len()],
                actual: vec![pixels],
            }),
            None => {
                let perm = Permutation::random(pixels, &mut self.rng);
                self.pixel_permutation = Some(perm.clone());
                Ok(perm)
            }
        }
    }

    /// Попиксельный MNIST с перестановкой пикселей: L = 784, F = 1.
    pub fn seq_mnist(&mut self, split: Split) -> Result<ImageStream> {
        let corpus = self.cache.get(split)?;
        let pixels = corpus.num_features();
        let permutation = self.pixel_permutation(pixels)?;

        let dataset = ImageSequenceDataset::new(corpus, pixels, self.config.max_examples)?;
        let inner = DataStream::new(dataset, self.scheme(split), self.child_rng())?;
        let config = SampleDropsConfig::new(self.single_mask())
            .evaluation(!split.is_training())
            .permutation(permutation, PermutedAxis::Time)
            .label_mode(self.config.label_mode);
        SampleDrops::new(inner, config, self.child_rng())
    }

    /// Пара (train, valid) с общей перестановкой.
    pub fn seq_mnist_pair(&mut self) -> Result<(ImageStream, ImageStream)> {
        Ok((self.seq_mnist(Split::Train)?, self.seq_mnist(Split::Valid)?))
    }

    /// Построчный MNIST: L = 28 строк по F = 28 пикселей.
    pub fn mnist(&mut self, split: Split) -> Result<ImageStream> {
        let corpus = self.cache.get(split)?;
        let pixels = corpus.num_features();
        let side = (pixels as f64).sqrt().round() as usize;
        if side * side != pixels {
            return Err(DataError::InvalidConfig(format!(
                "{} pixels do not form a square image",
                pixels
            )));
        }

        let dataset = ImageSequenceDataset::new(corpus, side, self.config.max_examples)?;
        let inner = DataStream::new(dataset, self.scheme(split), self.child_rng())?;
        let config = SampleDropsConfig::new(self.single_mask())
            .evaluation(!split.is_training())
            .label_mode(self.config.label_mode);
        SampleDrops::new(inner, config, self.child_rng())
    }

    /// Символьный PTB: непересекающиеся окна длины `seq_len`.
    pub fn ptb(&mut self, split: Split) -> Result<CharStream> {
        let corpus = self.cache.get(split)?;
        let augment = self.config.augment && split.is_training();

        let dataset = WindowedDataset::new(corpus, self.config.seq_len, augment, self.config.max_examples)?;
        let inner = DataStream::new(dataset, self.scheme(split), self.child_rng())?;
        let drops = match self.config.drop_prob_secondary {
            Some(secondary) => DropSpec::Pair {
                primary: self.config.drop_prob,
                secondary,
            },
            None => self.single_mask(),
        };
        let config = SampleDropsConfig::new(drops)
            .evaluation(!split.is_training())
            .eval_secondary_uses_primary(self.config.eval_secondary_uses_primary);
        SampleDrops::new(inner, config, self.child_rng())
    }

    pub fn ptb_pair(&mut self) -> Result<(CharStream, CharStream)> {
        Ok((self.ptb(Split::Train)?, self.ptb(Split::Valid)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::corpus::{Corpus, InMemorySource};
    use crate::data::dataset::Dataset;
    use crate::data::stream::BatchSource;
    use crate::data::transforms::Labels;
    use ndarray::{Array1, Array2};

    fn images(rows: usize, pixels: usize) -> Corpus {
        let features = Array2::from_shape_fn((rows, pixels), |(i, j)| ((i + j) % 7) as f32 / 7.0);
        let labels = Array1::from_shape_fn(rows, |i| (i % 10) as i32);
        Corpus::new(features, Some(labels)).unwrap()
    }

    fn image_cache() -> CorpusCache<InMemorySource> {
        CorpusCache::new(
            InMemorySource::new()
                .with_split(Split::Train, images(20, 16))
                .with_split(Split::Valid, images(8, 16)),
        )
    }

    fn config() -> StreamConfig {
        StreamConfig {
            batch_size: 4,
            seq_len: 10,
            hidden_dim: 3,
            drop_prob: 0.5,
            seed: Some(1),
            ..StreamConfig::default()
        }
    }

    #[test]
    fn test_seq_mnist_pair_shares_permutation() {
        let cache = image_cache();
        let mut factory = StreamFactory::new(&cache, config()).unwrap();
        let first = factory.pixel_permutation(16).unwrap();
        let (mut train, mut valid) = factory.seq_mnist_pair().unwrap();
        assert_eq!(factory.pixel_permutation(16).unwrap(), first);

        assert!(!train.is_evaluation());
        assert!(valid.is_evaluation());
        assert_eq!(train.inner().num_batches(), 5);

        let batch = valid.next_batch().unwrap().unwrap();
        assert_eq!(batch.features.shape(), &[16, 4, 1]);
        assert_eq!(batch.drops.shape(), &[16, 4, 3]);
        assert!(batch.drops.iter().all(|&v| v == 0.5));
        assert!(matches!(batch.labels, Some(Labels::Final(_))));

        let batch = train.next_batch().unwrap().unwrap();
        assert!(batch.drops.iter().all(|&v| v == 0.0 || v == 1.0));
    }

    #[test]
    fn test_pixel_permutation_is_never_redrawn() {
        let small = CorpusCache::new(InMemorySource::new().with_split(Split::Test, images(4, 9)));
        let cache = image_cache();
        let mut factory = StreamFactory::new(&cache, config()).unwrap();
        let (train, _valid) = factory.seq_mnist_pair().unwrap();
        let shared = factory.pixel_permutation(16).unwrap();

        assert!(matches!(
            factory.pixel_permutation(9),
            Err(DataError::ShapeMismatch { .. })
        ));
        assert_eq!(factory.pixel_permutation(16).unwrap(), shared);
        assert_eq!(train.seq_len(), 16);

        // Новая фабрика выбирает перестановку под свой размер изображения
        let mut other = StreamFactory::new(&small, config()).unwrap();
        assert_eq!(other.pixel_permutation(9).unwrap().len(), 9);
        assert!(other.seq_mnist(Split::Test).is_ok());
        assert!(other.pixel_permutation(16).is_err());
    }

    #[test]
    fn test_row_wise_mnist() {
        let cache = image_cache();
        let mut factory = StreamFactory::new(&cache, config()).unwrap();
        let mut stream = factory.mnist(Split::Valid).unwrap();
        assert_eq!((stream.seq_len(), stream.feature_dim()), (4, 4));
        assert_eq!(stream.epoch().count(), 2);
    }

    #[test]
    fn test_ptb_streams() {
        let codes: Vec<i64> = (0..200).map(|i| i % 6).collect();
        let cache = CorpusCache::new(
            InMemorySource::new()
                .with_split(Split::Train, Corpus::from_codes(&codes, 6).unwrap())
                .with_split(Split::Valid, Corpus::from_codes(&codes[..50], 6).unwrap()),
        );
        let config = StreamConfig {
            drop_prob_secondary: Some(0.1),
            ..config()
        };
        let mut factory = StreamFactory::new(&cache, config).unwrap();
        let (train, mut valid) = factory.ptb_pair().unwrap();

        assert!(train.inner().dataset().augment());
        assert_eq!(train.inner().dataset().num_examples(), 19);
        assert!(!valid.inner().dataset().augment());
        assert_eq!(valid.inner().dataset().num_examples(), 5);

        let batch = valid.next_batch().unwrap().unwrap();
        assert_eq!(batch.features.shape(), &[10, 4, 6]);
        assert_eq!(batch.drops.shape(), &[10, 4, 2]);
        assert!(batch.drops.index_axis(ndarray::Axis(2), 1).iter().all(|&v| v == 0.1));
    }

    #[test]
    fn test_invalid_config_and_missing_split() {
        let cache = image_cache();
        let bad = StreamConfig {
            hidden_dim: 0,
            ..config()
        };
        assert!(StreamFactory::new(&cache, bad).is_err());

        let mut factory = StreamFactory::new(&cache, config()).unwrap();
        assert!(factory.seq_mnist(Split::Test).is_err());
    }
}
