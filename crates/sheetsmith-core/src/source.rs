use crate::error::{Result, SheetError};
use image::{ImageReader, RgbaImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// In-memory frame to place (key + decoded RGBA pixels).
pub struct InputFrame {
    pub key: String,
    pub image: RgbaImage,
}

impl InputFrame {
    pub fn new(key: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            key: key.into(),
            image,
        }
    }
}

/// Resolves frame keys (file names) to decoded images.
pub trait FrameSource {
    fn load(&self, key: &str) -> Result<RgbaImage>;
}

/// Loads frames from files relative to a source folder.
#[derive(Debug, Clone)]
pub struct FolderSource {
    root: PathBuf,
}

impl FolderSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FrameSource for FolderSource {
    fn load(&self, key: &str) -> Result<RgbaImage> {
        let path = self.root.join(key);
        if !path.is_file() {
            return Err(SheetError::MissingSource(path.display().to_string()));
        }
        let img = ImageReader::open(&path)?.with_guessed_format()?.decode()?;
        Ok(img.to_rgba8())
    }
}

/// Frames held in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    images: HashMap<String, RgbaImage>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, image: RgbaImage) {
        self.images.insert(key.into(), image);
    }

    pub fn with(mut self, key: impl Into<String>, image: RgbaImage) -> Self {
        self.insert(key, image);
        self
    }
}

impl FrameSource for MemorySource {
    fn load(&self, key: &str) -> Result<RgbaImage> {
        self.images
            .get(key)
            .cloned()
            .ok_or_else(|| SheetError::MissingSource(key.to_string()))
    }
}
