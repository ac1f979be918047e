// --- Файл: src/data/corpus.rs ---

//! Корпуса, сплиты и кэширующий загрузчик.
//!
//! Корпус загружается один раз на сплит и дальше разделяется между всеми
//! потоками данных через `Arc`. После загрузки он не изменяется.

use crate::error::{DataError, Result};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// Часть корпуса.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    #[serde(alias = "validation")]
    Valid,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Valid => "valid",
            Split::Test => "test",
        }
    }

    /// Только обучающий сплит сэмплирует маски и перемешивает примеры.
    pub fn is_training(&self) -> bool {
        matches!(self, Split::Train)
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "train" => Ok(Split::Train),
            "valid" | "validation" => Ok(Split::Valid),
            "test" => Ok(Split::Test),
            _ => Err(DataError::UnknownSplit(s.to_string())),
        }
    }
}

/// Неизменяемый корпус: матрица признаков (N, F) и опциональные метки (N,).
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    features: Array2<f32>,
    labels: Option<Array1<i32>>,
}

impl Corpus {
    /// Создает корпус из признаков и меток.
    ///
    /// Количество меток должно совпадать с количеством строк.
    pub fn new(features: Array2<f32>, labels: Option<Array1<i32>>) -> Result<Self> {
        if let Some(labels) = &labels {
            if labels.len() != features.nrows() {
                return Err(DataError::ShapeMismatch {
                    expected: vec![features.nrows()],
                    actual: vec![labels.len()],
                });
            }
        }
        Ok(Self { features, labels })
    }

    /// Строит one-hot корпус (N, vocab) из последовательности кодов символов.
    pub fn from_codes(codes: &[i64], vocab_size: usize) -> Result<Self> {
        if vocab_size == 0 {
            return Err(DataError::InvalidConfig("vocabulary size must be positive".into()));
        }
        let mut features = Array2::<f32>::zeros((codes.len(), vocab_size));
        for (i, &code) in codes.iter().enumerate() {
            if code < 0 || code as usize >= vocab_size {
                return Err(DataError::Format(format!(
                    "character code {} at position {} outside vocabulary of size {}",
                    code, i, vocab_size
                )));
            }
            features[[i, code as usize]] = 1.0;
        }
        Ok(Self {
            features,
            labels: None,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn features(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    pub fn labels(&self) -> Option<ArrayView1<'_, i32>> {
        self.labels.as_ref().map(|l| l.view())
    }

    /// Копирует диапазон строк в новый корпус.
    pub fn rows(&self, range: Range<usize>) -> Result<Corpus> {
        if range.start > range.end || range.end > self.num_rows() {
            return Err(DataError::InvalidConfig(format!(
                "row range {:?} outside corpus of {} rows",
                range,
                self.num_rows()
            )));
        }
        Ok(Corpus {
            features: self.features.slice(s![range.clone(), ..]).to_owned(),
            labels: self.labels.as_ref().map(|l| l.slice(s![range]).to_owned()),
        })
    }
}

/// Источник корпусов: знает, как прочитать сплит из хранилища.
pub trait CorpusSource: Send + Sync {
    /// Короткое имя источника для логов.
    fn name(&self) -> &str;

    /// Загружает сплит целиком в память.
    fn load(&self, split: Split) -> Result<Corpus>;
}

/// Источник поверх уже готовых массивов (синтетические данные, тесты).
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    splits: HashMap<Split, Corpus>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_split(mut self, split: Split, corpus: Corpus) -> Self {
        self.splits.insert(split, corpus);
        self
    }
}

impl CorpusSource for InMemorySource {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn load(&self, split: Split) -> Result<Corpus> {
        self.splits
            .get(&split)
            .cloned()
            .ok_or_else(|| DataError::InvalidConfig(format!("no '{}' split in memory", split)))
    }
}

/// Загрузчик с кэшем по сплитам.
///
/// Создается один раз и передается по ссылке всем потребителям.
/// Повторный запрос сплита возвращает тот же `Arc` без чтения хранилища.
pub struct CorpusCache<S: CorpusSource> {
    source: S,
    loaded: Mutex<HashMap<Split, Arc<Corpus>>>,
}

impl<S: CorpusSource> CorpusCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Возвращает корпус сплита, загружая его при первом обращении.
    pub fn get(&self, split: Split) -> Result<Arc<Corpus>> {
        let mut loaded = self
            .loaded
            .lock()
            .map_err(|_| DataError::InvalidConfig("corpus cache lock poisoned".into()))?;

        if let Some(corpus) = loaded.get(&split) {
            tracing::debug!("corpus cache hit: {} / {}", self.source.name(), split);
            return Ok(Arc::clone(corpus));
        }

        let corpus = Arc::new(self.source.load(split)?);
        tracing::info!(
            "loaded {} / {}: {} rows x {} features",
            self.source.name(),
            split,
            corpus.num_rows(),
            corpus.num_features()
        );
        loaded.insert(split, Arc::clone(&corpus));
        Ok(corpus)
    }

    pub fn is_cached(&self, split: Split) -> bool {
        self.loaded
            .lock()
            .map(|loaded| loaded.contains_key(&split))
            .unwrap_or(false)
    }
}
