//! Inspects the streams of a dataset: pulls a few batches from one split
//! and logs their shapes and mask statistics.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Instant;
use zoneout_streams::config::StreamConfig;
use zoneout_streams::data::{
    Batch, BatchSource, CorpusCache, MnistIdxSource, PtbCacheSource, Split, StreamFactory,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DatasetKind {
    /// Pixel-by-pixel MNIST with a fixed random pixel permutation
    SeqMnist,
    /// Row-by-row MNIST
    Mnist,
    /// Character-level Penn Treebank
    Ptb,
}

/// Аргументы командной строки
#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect zoneout minibatch streams", long_about = None)]
struct Args {
    /// Dataset to stream
    #[arg(short, long, value_enum)]
    dataset: DatasetKind,

    /// MNIST IDX directory or PTB safetensors cache
    #[arg(long)]
    data: PathBuf,

    /// JSON stream configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Split to read: train, valid or test
    #[arg(short, long, default_value = "train")]
    split: String,

    /// Number of batches to pull
    #[arg(short, long, default_value_t = 3)]
    batches: usize,

    /// Overrides the configured seed
    #[arg(long)]
    seed: Option<u64>,
}

fn inspect<S: BatchSource<Batch = Batch>>(stream: &mut S, limit: usize) -> zoneout_streams::error::Result<()> {
    tracing::info!(
        "sources {:?}, seq_len {}, feature_dim {}",
        stream.sources(),
        stream.seq_len(),
        stream.feature_dim()
    );

    let start = Instant::now();
    let mut pulled = 0;
    for batch in stream.epoch().take(limit) {
        let batch = batch?;
        pulled += 1;
        tracing::info!(
            "batch {}: features {:?}, drops {:?}, mask mean {:.4}, labels: {}",
            pulled,
            batch.features.shape(),
            batch.drops.shape(),
            batch.drops.mean().unwrap_or(0.0),
            if batch.labels.is_some() { "yes" } else { "no" }
        );
    }
    if pulled < limit {
        tracing::info!("epoch ended after {} batches", pulled);
    }
    tracing::info!("pulled {} batches in {:.2?}", pulled, start.elapsed());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("zoneout_streams=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let split: Split = args.split.parse()?;

    let mut config = match &args.config {
        Some(path) => StreamConfig::from_json_file(path)?,
        None => StreamConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    tracing::info!("[Config] {:?}", config);

    match args.dataset {
        DatasetKind::SeqMnist | DatasetKind::Mnist => {
            let cache = CorpusCache::new(MnistIdxSource::new(&args.data));
            let mut factory = StreamFactory::new(&cache, config)?;
            let mut stream = match args.dataset {
                DatasetKind::SeqMnist => factory.seq_mnist(split)?,
                _ => factory.mnist(split)?,
            };
            inspect(&mut stream, args.batches)?;
        }
        DatasetKind::Ptb => {
            let cache = CorpusCache::new(PtbCacheSource::new(&args.data));
            let mut factory = StreamFactory::new(&cache, config)?;
            let mut stream = factory.ptb(split)?;
            inspect(&mut stream, args.batches)?;
        }
    }

    Ok(())
}
