//! Ordered listing of the images in one folder.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Supported image file extensions.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff", "tif"];

/// Check if a path has a supported image extension (case-insensitive).
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[derive(Debug, Error)]
pub enum FileListError {
    #[error("cannot read folder {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a supported image file", path.display())]
    NotAnImage { path: PathBuf },
}

/// Image paths of a folder sorted by name, plus the selected index.
#[derive(Debug, Default)]
pub struct FileList {
    folder: Option<PathBuf>,
    paths: Vec<PathBuf>,
    current: Option<usize>,
}

impl FileList {
    pub fn new() -> Self {
        Self::default()
    }

    /// List a folder, or the folder of a file with that file selected.
    ///
    /// A folder selects its first image (if any). On error the previous
    /// listing is kept.
    pub fn open(&mut self, path: &Path) -> Result<usize, FileListError> {
        let (folder, selected) = if path.is_dir() {
            (path.to_path_buf(), None)
        } else {
            if !is_image_file(path) {
                return Err(FileListError::NotAnImage {
                    path: path.to_path_buf(),
                });
            }
            let folder = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            (folder, Some(path))
        };

        let paths = list_images(&folder)?;
        let found = selected.and_then(|file| paths.iter().position(|p| p.file_name() == file.file_name()));
        if let (Some(file), None) = (selected, found) {
            log::warn!("{:?} is not in its folder, starting at the first image", file);
        }
        let current = found.or(if paths.is_empty() { None } else { Some(0) });

        log::info!("Loaded {} images from {:?}", paths.len(), folder);
        self.folder = Some(folder);
        self.paths = paths;
        self.current = current;
        Ok(self.paths.len())
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&Path> {
        self.current.and_then(|i| self.paths.get(i)).map(PathBuf::as_path)
    }

    /// Select `index`. Returns the selected path, or `None` if out of range.
    pub fn select(&mut self, index: usize) -> Option<&Path> {
        if index >= self.paths.len() {
            return None;
        }
        self.current = Some(index);
        self.current()
    }

    /// Step forward. Stays on the last image (no wrap).
    pub fn next(&mut self) -> Option<&Path> {
        let index = match self.current {
            Some(i) if i + 1 < self.paths.len() => i + 1,
            _ => return None,
        };
        self.select(index)
    }

    /// Step back. Stays on the first image (no wrap).
    pub fn previous(&mut self) -> Option<&Path> {
        let index = match self.current {
            Some(i) if i > 0 => i - 1,
            _ => return None,
        };
        self.select(index)
    }

    /// Drop the current entry after its file was deleted.
    ///
    /// Selects the entry that followed it, or the new last entry.
    pub fn remove_current(&mut self) -> Option<&Path> {
        let index = self.current?;
        self.paths.remove(index);

        self.current = if self.paths.is_empty() {
            None
        } else {
            Some(index.min(self.paths.len() - 1))
        };
        self.current()
    }
}

fn list_images(folder: &Path) -> Result<Vec<PathBuf>, FileListError> {
    let entries = std::fs::read_dir(folder).map_err(|source| FileListError::ReadDir {
        path: folder.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image_file(path))
        .collect();

    paths.sort();
    Ok(paths)
}
