// --- Файл: src/serialization/mod.rs ---

//! Модуль для чтения и записи тензорных кэшей корпусов.
//!
//! Поддерживается формат **SafeTensors**: безопасный бинарный формат,
//! в котором каждый сплит корпуса хранится отдельным именованным тензором.
//!
//! # Пример
//!
//! ```rust,ignore
//! use zoneout_streams::serialization::TensorFile;
//!
//! let file = TensorFile::open("ptb.safetensors")?;
//! let train = file.tensor("train")?;
//! let meta = file.metadata()?;
//! ```

pub mod safetensors_io;

pub use safetensors_io::{save_tensors, SafeTensorsError, TensorData, TensorFile};
