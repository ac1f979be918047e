// --- Файл: src/serialization/safetensors_io.rs ---

//! Модуль для работы с форматом SafeTensors.
//!
//! Используется как формат кэша корпусов: каждый сплит хранится отдельным
//! тензором, а служебные сведения (например, размер словаря) лежат в
//! метаданных заголовка.

use ndarray::ArrayD;
use safetensors::serialize_to_file;
use safetensors::tensor::{SafeTensors, TensorView};
use safetensors::Dtype;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Ошибки при работе с SafeTensors
#[derive(Error, Debug)]
pub enum SafeTensorsError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SafeTensors error: {0}")]
    SafeTensorsError(#[from] safetensors::SafeTensorError),

    #[error("unsupported dtype: {0}")]
    UnsupportedDtype(String),

    #[error("tensor shape error: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("tensor '{0}' not found")]
    TensorNotFound(String),
}

type Result<T> = std::result::Result<T, SafeTensorsError>;

/// Содержимое одного тензора после декодирования.
///
/// Вещественные типы приводятся к `f32`, целочисленные к `i64`.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    F32(ArrayD<f32>),
    I64(ArrayD<i64>),
}

impl TensorData {
    /// Возвращает форму тензора.
    pub fn shape(&self) -> &[usize] {
        match self {
            TensorData::F32(arr) => arr.shape(),
            TensorData::I64(arr) => arr.shape(),
        }
    }

    fn dtype(&self) -> Dtype {
        match self {
            TensorData::F32(_) => Dtype::F32,
            TensorData::I64(_) => Dtype::I64,
        }
    }

    fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            TensorData::F32(arr) => arr.iter().flat_map(|&x| x.to_le_bytes()).collect(),
            TensorData::I64(arr) => arr.iter().flat_map(|&x| x.to_le_bytes()).collect(),
        }
    }
}

fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Сохраняет именованные тензоры и метаданные в файл SafeTensors.
///
/// # Аргументы
///
/// * `path` - Путь к файлу для сохранения
/// * `tensors` - Пары (имя, данные)
/// * `metadata` - Произвольные строковые метаданные заголовка
pub fn save_tensors<P: AsRef<Path>>(
    path: P,
    tensors: &[(&str, TensorData)],
    metadata: Option<HashMap<String, String>>,
) -> Result<()> {
    // Сначала конвертируем все данные в байты: TensorView только ссылается на них
    let data_storage: Vec<Vec<u8>> = tensors.iter().map(|(_, t)| t.to_le_bytes()).collect();

    let mut tensor_views: Vec<(&str, TensorView<'_>)> = Vec::with_capacity(tensors.len());
    for ((name, tensor), data) in tensors.iter().zip(&data_storage) {
        tensor_views.push((
            *name,
            TensorView::new(tensor.dtype(), tensor.shape().to_vec(), data)?,
        ));
    }

    serialize_to_file(tensor_views, &metadata, path.as_ref())?;

    Ok(())
}

/// Файл SafeTensors, прочитанный в память один раз.
///
/// Тензоры и метаданные берутся из одного буфера, повторного чтения
/// с диска нет.
#[derive(Debug, Clone)]
pub struct TensorFile {
    buffer: Vec<u8>,
}

impl TensorFile {
    /// Читает файл и проверяет заголовок.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let buffer = read_file(path)?;
        SafeTensors::read_metadata(&buffer)?;
        Ok(Self { buffer })
    }

    /// Декодирует тензор по имени.
    pub fn tensor(&self, name: &str) -> Result<TensorData> {
        let tensors = SafeTensors::deserialize(&self.buffer)?;
        if !tensors.names().iter().any(|n| n.as_str() == name) {
            return Err(SafeTensorsError::TensorNotFound(name.to_string()));
        }
        let view = tensors.tensor(name)?;
        decode(&view)
    }

    /// Строковые метаданные заголовка (пустая карта, если их нет).
    pub fn metadata(&self) -> Result<HashMap<String, String>> {
        let (_, metadata) = SafeTensors::read_metadata(&self.buffer)?;
        Ok(metadata.metadata().clone().unwrap_or_default())
    }

    /// Имена тензоров в алфавитном порядке.
    pub fn names(&self) -> Result<Vec<String>> {
        let tensors = SafeTensors::deserialize(&self.buffer)?;
        let mut names: Vec<String> = tensors.names().iter().map(|s| s.to_string()).collect();
        names.sort();
        Ok(names)
    }
}

fn decode(view: &TensorView<'_>) -> Result<TensorData> {
    let shape: Vec<usize> = view.shape().to_vec();
    let data = view.data();

    match view.dtype() {
        Dtype::F32 => {
            let values: Vec<f32> = data
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            to_array(shape, values).map(TensorData::F32)
        }
        Dtype::F64 => {
            let values: Vec<f32> = data
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32)
                .collect();
            to_array(shape, values).map(TensorData::F32)
        }
        Dtype::U8 => {
            let values: Vec<i64> = data.iter().map(|&b| b as i64).collect();
            to_array(shape, values).map(TensorData::I64)
        }
        Dtype::I32 => {
            let values: Vec<i64> = data
                .chunks_exact(4)
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as i64)
                .collect();
            to_array(shape, values).map(TensorData::I64)
        }
        Dtype::I64 => {
            let values: Vec<i64> = data
                .chunks_exact(8)
                .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect();
            to_array(shape, values).map(TensorData::I64)
        }
        other => Err(SafeTensorsError::UnsupportedDtype(format!("{:?}", other))),
    }
}

fn to_array<T>(shape: Vec<usize>, values: Vec<T>) -> Result<ArrayD<T>> {
    let len = values.len();
    ArrayD::from_shape_vec(ndarray::IxDyn(&shape), values).map_err(|_| {
        SafeTensorsError::ShapeMismatch {
            expected: shape.clone(),
            actual: vec![len],
        }
    })
}
