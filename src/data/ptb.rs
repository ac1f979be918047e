// --- Файл: src/data/ptb.rs ---

//! Кэш символьного Penn Treebank в формате SafeTensors.
//!
//! Файл содержит по тензору на сплит (`train`, `valid`, `test`). Двумерный
//! вещественный тензор считается уже развернутым one-hot корпусом, одномерный
//! целочисленный - кодами символов, которые разворачиваются по размеру
//! словаря из метаданных `vocab_size`.

use super::corpus::{Corpus, CorpusSource, Split};
use crate::error::{DataError, Result};
use crate::serialization::{save_tensors, TensorData, TensorFile};
use ndarray::{ArrayD, Ix2, IxDyn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const VOCAB_SIZE_KEY: &str = "vocab_size";

#[derive(Debug, Clone)]
pub struct PtbCacheSource {
    path: PathBuf,
}

impl PtbCacheSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn vocab_size(&self, file: &TensorFile, codes: &ArrayD<i64>) -> Result<usize> {
        let metadata = file.metadata()?;
        match metadata.get(VOCAB_SIZE_KEY) {
            Some(value) => value.parse::<usize>().map_err(|_| {
                DataError::Format(format!("'{}' metadata is not a number: {}", VOCAB_SIZE_KEY, value))
            }),
            None => {
                tracing::warn!(
                    "{} has no '{}' metadata, inferring it from the largest code",
                    self.path.display(),
                    VOCAB_SIZE_KEY
                );
                Ok(codes.iter().copied().max().map_or(0, |m| m.max(0) as usize + 1))
            }
        }
    }
}

impl CorpusSource for PtbCacheSource {
    fn name(&self) -> &str {
        "ptb"
    }

    fn load(&self, split: Split) -> Result<Corpus> {
        let file = TensorFile::open(&self.path)?;
        let names = file.names()?;
        if !names.iter().any(|name| name == split.as_str()) {
            return Err(DataError::Format(format!(
                "{} has no '{}' split, found {:?}",
                self.path.display(),
                split,
                names
            )));
        }

        match file.tensor(split.as_str())? {
            TensorData::F32(dense) => {
                let dense = dense.into_dimensionality::<Ix2>().map_err(|_| {
                    DataError::Format(format!("'{}' float tensor must be 2-D (chars x vocab)", split))
                })?;
                Corpus::new(dense, None)
            }
            TensorData::I64(codes) => {
                if codes.ndim() != 1 {
                    return Err(DataError::Format(format!(
                        "'{}' code tensor must be 1-D, got shape {:?}",
                        split,
                        codes.shape()
                    )));
                }
                let vocab = self.vocab_size(&file, &codes)?;
                let codes: Vec<i64> = codes.iter().copied().collect();
                Corpus::from_codes(&codes, vocab)
            }
        }
    }
}

/// Записывает кэш PTB: коды символов каждого сплита и размер словаря.
pub fn write_ptb_cache<P: AsRef<Path>>(
    path: P,
    splits: &[(Split, &[i64])],
    vocab_size: usize,
) -> Result<()> {
    let mut tensors = Vec::with_capacity(splits.len());
    for (split, codes) in splits {
        let arr = ArrayD::from_shape_vec(IxDyn(&[codes.len()]), codes.to_vec())?;
        tensors.push((split.as_str(), TensorData::I64(arr)));
    }

    let mut metadata = HashMap::new();
    metadata.insert(VOCAB_SIZE_KEY.to_string(), vocab_size.to_string());

    save_tensors(path, &tensors, Some(metadata))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_expanded_to_one_hot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ptb.safetensors");
        let train: Vec<i64> = vec![0, 1, 2, 3, 4, 0, 1];
        let valid: Vec<i64> = vec![4, 4];
        write_ptb_cache(&path, &[(Split::Train, train.as_slice()), (Split::Valid, valid.as_slice())], 6).unwrap();

        let source = PtbCacheSource::new(&path);
        let corpus = source.load(Split::Train).unwrap();
        assert_eq!(corpus.num_rows(), 7);
        assert_eq!(corpus.num_features(), 6);
        assert_eq!(corpus.features()[[3, 3]], 1.0);
        assert!(corpus.labels().is_none());

        assert_eq!(source.load(Split::Valid).unwrap().num_rows(), 2);
        match source.load(Split::Test) {
            Err(DataError::Format(message)) => assert!(message.contains("[\"train\", \"valid\"]")),
            other => panic!("expected a missing split error, got {:?}", other),
        }
    }

    #[test]
    fn test_dense_tensor_is_used_directly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dense.safetensors");
        let dense = ArrayD::from_shape_vec(IxDyn(&[3, 2]), vec![1.0f32, 0.0, 0.0, 1.0, 1.0, 0.0]).unwrap();
        save_tensors(&path, &[("test", TensorData::F32(dense))], None).unwrap();

        let corpus = PtbCacheSource::new(&path).load(Split::Test).unwrap();
        assert_eq!(corpus.features().shape(), &[3, 2]);
        assert_eq!(corpus.features()[[1, 1]], 1.0);
    }
}
