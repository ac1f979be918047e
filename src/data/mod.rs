//! # Data Streams Module
//!
//! Pull-based minibatch streams for recurrent models with per-timestep
//! drop masks.
//!
//! ## Key Components
//!
//! - [`CorpusCache`]: Loads each split once and shares it as `Arc<Corpus>`
//! - [`Dataset`]: Random-access store of fixed-length examples
//! - [`DataStream`]: Batched iteration with explicit epochs
//! - [`SampleDrops`]: Time-major batches with a fresh drop mask per pull
//! - [`StreamFactory`]: Ready-made seq-MNIST, MNIST and PTB streams
//!
//! ## Example
//!
//! ```ignore
//! use zoneout_streams::data::{BatchSource, CorpusCache, MnistIdxSource, StreamFactory};
//!
//! let cache = CorpusCache::new(MnistIdxSource::new("data/mnist"));
//! let mut factory = StreamFactory::new(&cache, config)?;
//! let (mut train, mut valid) = factory.seq_mnist_pair()?;
//!
//! for batch in train.epoch() {
//!     let batch = batch?;
//!     // batch.features: (T, B, F), batch.drops: (T, B, H)
//! }
//! train.open_epoch()?;
//! ```
//!
//! ## Available Components
//!
//! ### Corpus sources
//! - [`MnistIdxSource`]: MNIST IDX files, train/valid split inside the training file
//! - [`PtbCacheSource`]: Character PTB cached as SafeTensors
//! - [`InMemorySource`]: Arrays already in memory
//!
//! ### Datasets
//! - [`ImageSequenceDataset`]: Images read as sequences of pixels or rows
//! - [`WindowedDataset`]: Non-overlapping windows with optional random offset
//!
//! ### Transforms
//! - [`TimeMajor`]: (B, L, F) -> (L, B, F)
//! - [`Permute`]: Fixed [`Permutation`] along time or feature axis
//! - [`Compose`]: Chain multiple transforms

pub mod builders;
pub mod corpus;
pub mod dataset;
pub mod drops;
pub mod mnist;
pub mod ptb;
pub mod sample_drops;
pub mod sampler;
pub mod stream;
pub mod transforms;

pub use builders::{CharStream, ImageStream, StreamFactory};
pub use corpus::{Corpus, CorpusCache, CorpusSource, InMemorySource, Split};
pub use dataset::{Dataset, ImageSequenceDataset, RawBatch, WindowedDataset};
pub use drops::{DropMaskSampler, DropSpec};
pub use mnist::MnistIdxSource;
pub use ptb::{write_ptb_cache, PtbCacheSource};
pub use sample_drops::{Batch, SampleDrops, SampleDropsConfig};
pub use sampler::{BatchSampler, IndexSampler, RandomSampler, Sampler, SequentialSampler};
pub use stream::{BatchScheme, BatchSource, DataStream, Epoch};
pub use transforms::{
    Compose, LabelMode, Labels, Permutation, Permute, PermutedAxis, TimeMajor, Transform,
};
