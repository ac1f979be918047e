//! # zoneout-streams: minibatch streams for recurrent training
//!
//! Builds time-major minibatches for recurrent networks trained with
//! per-timestep stochastic masks (zoneout / sample-drop). Three datasets
//! are covered: permuted sequential MNIST, row-wise MNIST and
//! character-level Penn Treebank.
//!
//! ## Usage Example
//!
//! ```no_run
//! use zoneout_streams::config::StreamConfig;
//! use zoneout_streams::data::{BatchSource, CorpusCache, PtbCacheSource, StreamFactory};
//!
//! # fn main() -> zoneout_streams::error::Result<()> {
//! // 1. Loader with a per-split cache
//! let cache = CorpusCache::new(PtbCacheSource::new("ptb.safetensors"));
//!
//! // 2. Streams for train and valid
//! let config = StreamConfig { seed: Some(1), ..StreamConfig::default() };
//! let mut factory = StreamFactory::new(&cache, config)?;
//! let (mut train, _valid) = factory.ptb_pair()?;
//!
//! // 3. Pull batches until the epoch ends
//! while let Some(batch) = train.next_batch()? {
//!     assert_eq!(batch.drops.shape()[0], batch.features.shape()[0]);
//! }
//! train.open_epoch()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod serialization;
