//! Decode-and-cache layer.
//!
//! [`ImageCache`] turns a file path into an orientation-corrected [`Bitmap`]
//! bound to the compositor's rendering context and remembers it by
//! normalized path. The cache is write-through with no automatic eviction:
//! every successful decode is kept until [`ImageCache::clear`],
//! [`ImageCache::delete`] or [`ImageCache::rebind`].
//!
//! Decoding is synchronous and blocks the caller (the event loop) for the
//! read, decode and conversion of the file.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::{self, Cursor};
use std::ops::Deref;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use image::{ImageError, ImageFormat, ImageReader};
use thiserror::Error;

use crate::geometry::Size;
use crate::orientation::{Orientation, OrientationTag};
use crate::render::{Bitmap, BitmapError, ContextBinding, ContextId};

/// Category of a [`DecodeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    UnsupportedFormat,
    DecodeFailure,
    RenderResourceFailure,
    Io,
}

/// Why a path could not be turned into a bitmap (or deleted).
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{}: not a readable file ({source})", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: unsupported format ({reason})", path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("{}: decoding failed ({reason})", path.display())]
    DecodeFailure { path: PathBuf, reason: String },

    #[error("{}: cannot create bitmap ({source})", path.display())]
    RenderResourceFailure {
        path: PathBuf,
        #[source]
        source: BitmapError,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::NotFound { .. } => ErrorKind::NotFound,
            DecodeError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            DecodeError::DecodeFailure { .. } => ErrorKind::DecodeFailure,
            DecodeError::RenderResourceFailure { .. } => ErrorKind::RenderResourceFailure,
            DecodeError::Io { .. } => ErrorKind::Io,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            DecodeError::NotFound { path, .. }
            | DecodeError::UnsupportedFormat { path, .. }
            | DecodeError::DecodeFailure { path, .. }
            | DecodeError::RenderResourceFailure { path, .. }
            | DecodeError::Io { path, .. } => path,
        }
    }

    fn from_image(path: &Path, error: ImageError) -> Self {
        match error {
            ImageError::Unsupported(e) => DecodeError::UnsupportedFormat {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
            // The bytes are already in memory, so I/O errors here mean truncated data
            ImageError::IoError(e) => DecodeError::DecodeFailure {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
            other => DecodeError::DecodeFailure {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        }
    }
}

/// A decoded, upright image ready to draw.
#[derive(Debug, Clone)]
pub struct CachedImage {
    path: PathBuf,
    bitmap: Bitmap,
    orientation: Orientation,
    raw_size: (u32, u32),
}

impl CachedImage {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    /// Width after orientation correction.
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    /// Height after orientation correction.
    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    pub fn size(&self) -> Size {
        Size::from_pixels(self.width(), self.height())
    }

    /// Frame dimensions as stored in the file, before orientation correction.
    pub fn raw_size(&self) -> (u32, u32) {
        self.raw_size
    }

    /// The orientation that was baked into the pixels.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn context(&self) -> ContextId {
        self.bitmap.context()
    }
}

/// An image returned by the cache.
///
/// Borrows the cache, so no handle can survive [`ImageCache::clear`],
/// [`ImageCache::delete`] or [`ImageCache::rebind`].
#[derive(Debug)]
pub enum ImageHandle<'a> {
    /// Entry owned by the cache.
    Cached(&'a CachedImage),
    /// Freshly decoded image, returned when caching is disabled.
    Uncached(CachedImage),
}

impl ImageHandle<'_> {
    pub fn is_cached(&self) -> bool {
        matches!(self, ImageHandle::Cached(_))
    }
}

impl Deref for ImageHandle<'_> {
    type Target = CachedImage;

    fn deref(&self) -> &CachedImage {
        match self {
            ImageHandle::Cached(image) => image,
            ImageHandle::Uncached(image) => image,
        }
    }
}

/// Path -> decoded image table with an optional current selection.
#[derive(Debug)]
pub struct ImageCache {
    binding: ContextBinding,
    use_caching: bool,
    entries: HashMap<PathBuf, CachedImage>,
    current: Option<PathBuf>,
}

impl ImageCache {
    /// Create an empty cache creating bitmaps through `binding`.
    ///
    /// With `use_caching` off every lookup decodes from disk and nothing is kept.
    pub fn new(binding: ContextBinding, use_caching: bool) -> Self {
        Self {
            binding,
            use_caching,
            entries: HashMap::new(),
            current: None,
        }
    }

    /// Consume this cache and return an empty one bound to another context.
    ///
    /// Every bitmap of the old context is dropped here; because handles
    /// borrow the cache, none can be held across this call.
    pub fn rebind(self, binding: ContextBinding) -> Self {
        log::debug!(
            "Rebinding image cache from {:?} to {:?}, dropping {} entries",
            self.binding.id(),
            binding.id(),
            self.entries.len()
        );
        Self::new(binding, self.use_caching)
    }

    pub fn context(&self) -> ContextId {
        self.binding.id()
    }

    pub fn use_caching(&self) -> bool {
        self.use_caching
    }

    /// Turn caching on or off. Turning it off drops every entry.
    pub fn set_use_caching(&mut self, use_caching: bool) {
        if !use_caching {
            self.entries.clear();
        }
        self.use_caching = use_caching;
        log::info!("Image caching {}", if use_caching { "enabled" } else { "disabled" });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pixel memory held by all entries.
    pub fn memory_bytes(&self) -> usize {
        self.entries.values().map(|image| image.bitmap.byte_len()).sum()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.entries.contains_key(&normalize(path.as_ref()))
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Whether `path` names the current selection.
    pub fn is_current(&self, path: impl AsRef<Path>) -> bool {
        self.current.as_deref() == Some(normalize(path.as_ref()).as_path())
    }

    /// Get the image for `path`, decoding and storing it on a miss.
    pub fn get(&mut self, path: impl AsRef<Path>) -> Result<ImageHandle<'_>, DecodeError> {
        let key = normalize(path.as_ref());
        self.fetch(key)
    }

    /// Like [`get`](Self::get), and on success make `path` the current selection.
    ///
    /// On failure the previous selection is kept.
    pub fn set_current(&mut self, path: impl AsRef<Path>) -> Result<ImageHandle<'_>, DecodeError> {
        let key = normalize(path.as_ref());
        let fresh = self.ensure(&key)?;
        self.current = Some(key.clone());
        self.handle(key, fresh)
    }

    /// The current selection, resolved through [`get`](Self::get).
    ///
    /// Decode failures (e.g. the file vanished while uncached) are logged
    /// and reported as no image.
    pub fn current(&mut self) -> Option<ImageHandle<'_>> {
        let key = self.current.clone()?;
        match self.fetch(key) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("Current image unavailable: {}", e);
                None
            }
        }
    }

    /// Forget the current selection without touching the entries.
    pub fn deselect(&mut self) {
        self.current = None;
    }

    /// Drop every entry and the current selection.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("Clearing {} cached images", self.entries.len());
        }
        self.entries.clear();
        self.current = None;
    }

    /// Remove the entry for `path` and delete the file itself.
    ///
    /// The entry is dropped even if deleting the file fails, so the next
    /// [`get`](Self::get) always goes back to disk.
    pub fn delete(&mut self, path: impl AsRef<Path>) -> Result<(), DecodeError> {
        let key = normalize(path.as_ref());

        if self.entries.remove(&key).is_some() {
            log::debug!("Evicted {:?}", key);
        }
        if self.current.as_ref() == Some(&key) {
            self.current = None;
        }

        match std::fs::remove_file(&key) {
            Ok(()) => {
                log::info!("Deleted {:?}", key);
                Ok(())
            }
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                Err(DecodeError::NotFound { path: key, source })
            }
            Err(source) => Err(DecodeError::Io { path: key, source }),
        }
    }

    fn fetch(&mut self, key: PathBuf) -> Result<ImageHandle<'_>, DecodeError> {
        let fresh = self.ensure(&key)?;
        self.handle(key, fresh)
    }

    /// Make sure `key` is decoded. Returns the image if it was decoded but
    /// not stored (caching disabled).
    fn ensure(&mut self, key: &Path) -> Result<Option<CachedImage>, DecodeError> {
        if !self.use_caching {
            return decode(&self.binding, key).map(Some);
        }

        match self.entries.entry(key.to_path_buf()) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(slot) => {
                log::debug!("Not cached: {:?}", slot.key());
                let image = decode(&self.binding, slot.key())?;
                slot.insert(image);
                log::debug!(
                    "Cached: {:?} ({} entries, {} bytes)",
                    key,
                    self.entries.len(),
                    self.memory_bytes()
                );
                Ok(None)
            }
        }
    }

    fn handle(&self, key: PathBuf, fresh: Option<CachedImage>) -> Result<ImageHandle<'_>, DecodeError> {
        if let Some(image) = fresh {
            return Ok(ImageHandle::Uncached(image));
        }
        self.entries
            .get(&key)
            .map(ImageHandle::Cached)
            .ok_or_else(|| DecodeError::NotFound {
                path: key,
                source: io::Error::new(io::ErrorKind::NotFound, "entry missing from cache"),
            })
    }
}

/// Read, decode, orient and upload one file.
fn decode(binding: &ContextBinding, path: &Path) -> Result<CachedImage, DecodeError> {
    let start = Instant::now();

    let bytes = std::fs::read(path).map_err(|source| DecodeError::NotFound {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .map_err(|source| DecodeError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;

    if reader.format().is_none() {
        let format = ImageFormat::from_path(path).map_err(|e| DecodeError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        reader.set_format(format);
    }

    let image = reader.decode().map_err(|e| DecodeError::from_image(path, e))?;
    let raw_size = (image.width(), image.height());

    let orientation = match OrientationTag::read(&bytes) {
        OrientationTag::Absent => Orientation::IDENTITY,
        OrientationTag::Valid(orientation) => orientation,
        OrientationTag::Invalid(value) => {
            return Err(DecodeError::DecodeFailure {
                path: path.to_path_buf(),
                reason: format!("invalid EXIF orientation {}", value),
            });
        }
    };

    let upright = orientation.apply(image).into_rgba8();
    let bitmap = binding
        .create_bitmap(upright)
        .map_err(|source| DecodeError::RenderResourceFailure {
            path: path.to_path_buf(),
            source,
        })?;

    log::debug!(
        "Decoded {:?}: {}x{} (raw {}x{}, {:?}) in {:?}",
        path,
        bitmap.width(),
        bitmap.height(),
        raw_size.0,
        raw_size.1,
        orientation,
        start.elapsed()
    );

    Ok(CachedImage {
        path: path.to_path_buf(),
        bitmap,
        orientation,
        raw_size,
    })
}

/// Absolute path with `.` and `..` resolved lexically.
///
/// Does not touch the file system beyond reading the working directory, so
/// it works for files that no longer exist.
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::tests::jpeg_with_orientation;
    use crate::render::SoftwareContext;
    use image::{Rgba, RgbaImage};

    fn binding(max: u32) -> ContextBinding {
        SoftwareContext::new(max).unwrap().binding()
    }

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_get_decodes_once_then_hits() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 6, 4);
        let mut cache = ImageCache::new(binding(64), true);

        let handle = cache.get(&path).unwrap();
        assert!(handle.is_cached());
        assert_eq!((handle.width(), handle.height()), (6, 4));
        assert_eq!(cache.len(), 1);

        // Remove the file behind the cache's back: a hit must not touch disk
        std::fs::remove_file(&path).unwrap();
        assert!(cache.get(&path).is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_paths_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 2, 2);
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let dotted = dir.path().join("sub").join("..").join(".").join("a.png");

        let mut cache = ImageCache::new(binding(64), true);
        cache.get(&path).unwrap();
        cache.get(&dotted).unwrap();

        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&dotted));
    }

    #[test]
    fn test_set_current_and_current() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", 3, 3);
        let b = write_png(dir.path(), "b.png", 5, 2);
        let mut cache = ImageCache::new(binding(64), true);

        assert!(cache.current().is_none());
        assert!(cache.set_current(&a).is_ok());
        assert!(cache.is_current(&a));
        assert_eq!(cache.current().unwrap().width(), 3);

        cache.set_current(&b).unwrap();
        assert_eq!(cache.current().unwrap().width(), 5);
        assert_eq!(cache.current_path(), Some(normalize(&b).as_path()));
    }

    #[test]
    fn test_failed_set_current_keeps_previous_selection() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", 3, 3);
        let mut cache = ImageCache::new(binding(64), true);

        cache.set_current(&a).unwrap();
        let err = cache.set_current(dir.path().join("missing.png")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(cache.is_current(&a));
    }

    #[test]
    fn test_error_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ImageCache::new(binding(8), true);

        let missing = cache.get(dir.path().join("nope.png")).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "hello").unwrap();
        assert_eq!(cache.get(&text).unwrap_err().kind(), ErrorKind::UnsupportedFormat);

        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"\x89PNG\r\n\x1a\ngarbage").unwrap();
        assert_eq!(cache.get(&broken).unwrap_err().kind(), ErrorKind::DecodeFailure);

        let big = write_png(dir.path(), "big.png", 16, 4);
        let err = cache.get(&big).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RenderResourceFailure);
        assert_eq!(err.path(), normalize(&big));

        // Directories are not readable files
        assert_eq!(cache.get(dir.path()).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_orientation_is_baked_in() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rotated.jpg");
        std::fs::write(&path, jpeg_with_orientation(&RgbaImage::new(40, 20), 6)).unwrap();

        let mut cache = ImageCache::new(binding(64), true);
        let image = cache.get(&path).unwrap();

        assert_eq!(image.raw_size(), (40, 20));
        assert_eq!((image.width(), image.height()), (20, 40));
        assert_eq!(image.orientation(), Orientation::from_exif(6).unwrap());
    }

    #[test]
    fn test_invalid_orientation_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weird.jpg");
        std::fs::write(&path, jpeg_with_orientation(&RgbaImage::new(8, 8), 42)).unwrap();

        let mut cache = ImageCache::new(binding(64), true);
        let err = cache.get(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeFailure);
        assert!(err.to_string().contains("orientation"));
    }

    #[test]
    fn test_delete_forces_redecode() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 6, 4);
        let mut cache = ImageCache::new(binding(64), true);

        cache.set_current(&path).unwrap();
        assert!(cache.delete(&path).is_ok());
        assert!(!path.exists());
        assert!(!cache.contains(&path));
        assert!(cache.current_path().is_none());

        // Same path, different content: must not see the stale 6x4 entry
        write_png(dir.path(), "a.png", 2, 9);
        let image = cache.get(&path).unwrap();
        assert_eq!((image.width(), image.height()), (2, 9));
    }

    #[test]
    fn test_delete_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ImageCache::new(binding(64), true);
        let err = cache.delete(dir.path().join("gone.png")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_caching_disabled_keeps_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 4, 4);
        let mut cache = ImageCache::new(binding(64), false);

        assert!(!cache.get(&path).unwrap().is_cached());
        assert!(!cache.set_current(&path).unwrap().is_cached());
        assert!(cache.current().is_some());
        assert_eq!(cache.len(), 0);

        // Always goes back to disk
        std::fs::remove_file(&path).unwrap();
        assert!(cache.current().is_none());
    }

    #[test]
    fn test_disabling_caching_drops_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 4, 4);
        let mut cache = ImageCache::new(binding(64), true);

        cache.get(&path).unwrap();
        assert_eq!(cache.memory_bytes(), 4 * 4 * 4);
        cache.set_use_caching(false);
        assert!(cache.is_empty());
        assert!(!cache.use_caching());
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 4, 4);
        let mut cache = ImageCache::new(binding(64), true);

        cache.set_current(&path).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.current().is_none());
    }

    #[test]
    fn test_rebind_empties_and_switches_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 4, 4);
        let old = SoftwareContext::new(64).unwrap();
        let new = SoftwareContext::new(64).unwrap();

        let mut cache = ImageCache::new(old.binding(), true);
        cache.set_current(&path).unwrap();

        let mut cache = cache.rebind(new.binding());
        assert!(cache.is_empty());
        assert!(cache.current_path().is_none());
        assert_eq!(cache.context(), new.id());
        assert_eq!(cache.get(&path).unwrap().context(), new.id());
    }

    #[test]
    fn test_normalize_resolves_dots() {
        let base = std::env::temp_dir();
        let messy = base.join("x").join("..").join("y").join(".").join("z.png");
        assert_eq!(normalize(&messy), normalize(&base).join("y").join("z.png"));
        assert!(normalize(Path::new("relative.png")).is_absolute());
    }
}
