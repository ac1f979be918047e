// --- Файл: src/data/mnist.rs ---

//! Чтение MNIST из файлов IDX.
//!
//! Обучающий файл делится на train (первые `train_rows` строк) и valid
//! (остаток), тестовый сплит берется из файлов `t10k`.

use super::corpus::{Corpus, CorpusSource, Split};
use crate::error::{DataError, Result};
use ndarray::{Array1, Array2};
use std::fs;
use std::path::{Path, PathBuf};

pub const IMAGE_MAGIC: u32 = 2051;
pub const LABEL_MAGIC: u32 = 2049;

/// Размер обучающей части; остаток обучающего файла уходит в валидацию.
pub const DEFAULT_TRAIN_ROWS: usize = 50_000;

fn read_be_u32(data: &[u8], offset: &mut usize) -> Result<u32> {
    let bytes = data
        .get(*offset..*offset + 4)
        .ok_or_else(|| DataError::Format("IDX header is truncated".into()))?;
    *offset += 4;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Разбирает файл изображений IDX и нормирует пиксели в [0, 1].
pub fn parse_idx_images(data: &[u8]) -> Result<Array2<f32>> {
    let mut offset = 0usize;
    let magic = read_be_u32(data, &mut offset)?;
    if magic != IMAGE_MAGIC {
        return Err(DataError::Format(format!(
            "bad IDX image magic number {}, expected {}",
            magic, IMAGE_MAGIC
        )));
    }
    let count = read_be_u32(data, &mut offset)? as usize;
    let rows = read_be_u32(data, &mut offset)? as usize;
    let cols = read_be_u32(data, &mut offset)? as usize;
    let overflow = || DataError::Format("IDX header dimensions overflow".into());
    let image_size = rows.checked_mul(cols).ok_or_else(overflow)?;
    let total_bytes = count.checked_mul(image_size).ok_or_else(overflow)?;
    let end = offset.checked_add(total_bytes).ok_or_else(overflow)?;

    let pixels = data
        .get(offset..end)
        .ok_or_else(|| DataError::Format("MNIST image file is truncated".into()))?;

    let values: Vec<f32> = pixels.iter().map(|&p| p as f32 / 255.0).collect();
    Ok(Array2::from_shape_vec((count, image_size), values)?)
}

/// Разбирает файл меток IDX.
pub fn parse_idx_labels(data: &[u8]) -> Result<Array1<i32>> {
    let mut offset = 0usize;
    let magic = read_be_u32(data, &mut offset)?;
    if magic != LABEL_MAGIC {
        return Err(DataError::Format(format!(
            "bad IDX label magic number {}, expected {}",
            magic, LABEL_MAGIC
        )));
    }
    let count = read_be_u32(data, &mut offset)? as usize;
    let end = offset
        .checked_add(count)
        .ok_or_else(|| DataError::Format("IDX header dimensions overflow".into()))?;
    let labels = data
        .get(offset..end)
        .ok_or_else(|| DataError::Format("MNIST label file is truncated".into()))?;

    Ok(labels.iter().map(|&l| l as i32).collect())
}

/// Источник MNIST: каталог с четырьмя стандартными файлами IDX.
#[derive(Debug, Clone)]
pub struct MnistIdxSource {
    dir: PathBuf,
    train_rows: usize,
}

impl MnistIdxSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            train_rows: DEFAULT_TRAIN_ROWS,
        }
    }

    /// Меняет границу train/valid внутри обучающего файла.
    pub fn train_rows(mut self, rows: usize) -> Self {
        self.train_rows = rows;
        self
    }

    fn read_pair(&self, images: &str, labels: &str) -> Result<Corpus> {
        let images = parse_idx_images(&fs::read(self.dir.join(images))?)?;
        let labels = parse_idx_labels(&fs::read(self.dir.join(labels))?)?;
        Corpus::new(images, Some(labels))
    }
}

impl CorpusSource for MnistIdxSource {
    fn name(&self) -> &str {
        "mnist"
    }

    fn load(&self, split: Split) -> Result<Corpus> {
        match split {
            Split::Train | Split::Valid => {
                let full = self.read_pair("train-images-idx3-ubyte", "train-labels-idx1-ubyte")?;
                if self.train_rows == 0 || self.train_rows >= full.num_rows() {
                    return Err(DataError::InvalidConfig(format!(
                        "train/valid boundary {} must lie inside the {} training rows",
                        self.train_rows,
                        full.num_rows()
                    )));
                }
                if split == Split::Train {
                    full.rows(0..self.train_rows)
                } else {
                    full.rows(self.train_rows..full.num_rows())
                }
            }
            Split::Test => self.read_pair("t10k-images-idx3-ubyte", "t10k-labels-idx1-ubyte"),
        }
    }
}

/// Кодирует изображения и метки в формат IDX (для подготовки фикстур).
pub fn encode_idx(images: &[Vec<u8>], side: usize, labels: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut image_bytes = Vec::with_capacity(16 + images.len() * side * side);
    image_bytes.extend_from_slice(&IMAGE_MAGIC.to_be_bytes());
    image_bytes.extend_from_slice(&(images.len() as u32).to_be_bytes());
    image_bytes.extend_from_slice(&(side as u32).to_be_bytes());
    image_bytes.extend_from_slice(&(side as u32).to_be_bytes());
    for image in images {
        image_bytes.extend_from_slice(image);
    }

    let mut label_bytes = Vec::with_capacity(8 + labels.len());
    label_bytes.extend_from_slice(&LABEL_MAGIC.to_be_bytes());
    label_bytes.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    label_bytes.extend_from_slice(labels);

    (image_bytes, label_bytes)
}
