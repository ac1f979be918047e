// --- Файл: src/error.rs ---

//! Ошибки конвейера данных.
//!
//! Конец эпохи ошибкой не является: источники батчей сообщают о нем
//! через `Ok(None)`.

use crate::serialization::SafeTensorsError;
use thiserror::Error;

/// Ошибки загрузки корпусов, конфигурации и сборки батчей.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SafeTensors error: {0}")]
    SafeTensors(#[from] SafeTensorsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("unknown split '{0}', expected one of: train, valid, test")]
    UnknownSplit(String),

    #[error("malformed corpus: {0}")]
    Format(String),

    #[error("corpus has {rows} rows, too short for windows of length {length}")]
    CorpusTooShort { rows: usize, length: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("probability must lie in [0, 1], got {0}")]
    InvalidProbability(f32),

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("example index {index} out of range for {len} examples")]
    IndexOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, DataError>;

/// Проверяет, что вероятность конечна и лежит в [0, 1].
pub(crate) fn check_probability(p: f32) -> Result<f32> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(DataError::InvalidProbability(p))
    }
}
