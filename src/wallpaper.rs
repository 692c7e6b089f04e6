//! Background bitmaps: packaged wallpapers on disk and user data URIs.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::RgbaImage;
use sha2::{Digest, Sha256};

use crate::ingest::decode_data_uri;
use crate::{Error, Result};

const WALLPAPER_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Decoded backgrounds kept around at once.
pub const CACHE_CAPACITY: usize = 4;

/// Resolves `background.image` values to bitmaps, with a small LRU decode
/// cache (most recent at the back).
#[derive(Debug, Default)]
pub struct WallpaperStore {
    dir: Option<PathBuf>,
    cache: Mutex<VecDeque<(String, Arc<RgbaImage>)>>,
}

/// Data URIs can be megabytes long; they are keyed by digest.
fn cache_key(source: &str) -> String {
    if source.starts_with("data:") {
        format!("sha256:{}", hex::encode(Sha256::digest(source.as_bytes())))
    } else {
        source.to_string()
    }
}

impl WallpaperStore {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            cache: Mutex::new(VecDeque::with_capacity(CACHE_CAPACITY)),
        }
    }

    pub fn cached_count(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn cached(&self, key: &str) -> Option<Arc<RgbaImage>> {
        let mut cache = self.cache.lock().ok()?;
        let pos = cache.iter().position(|(k, _)| k == key)?;
        let entry = cache.remove(pos)?;
        let hit = entry.1.clone();
        cache.push_back(entry);
        Some(hit)
    }

    fn remember(&self, key: String, bitmap: Arc<RgbaImage>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.retain(|(k, _)| *k != key);
            while cache.len() >= CACHE_CAPACITY {
                cache.pop_front();
            }
            cache.push_back((key, bitmap));
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Packaged wallpaper names (paths relative to the wallpaper directory),
    /// sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let Some(dir) = &self.dir else {
            return Ok(Vec::new());
        };
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| WALLPAPER_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Decode a data URI or load a wallpaper file. Relative paths are looked
    /// up in the wallpaper directory.
    pub fn load(&self, source: &str) -> Result<Arc<RgbaImage>> {
        let key = cache_key(source);
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let bitmap = if source.starts_with("data:") {
            let (mime, data) = decode_data_uri(source)?;
            if !mime.starts_with("image/") {
                return Err(Error::Decode(format!("background is {mime}, not an image")));
            }
            image::load_from_memory(&data)?.to_rgba8()
        } else {
            let path = self.resolve_path(source);
            log::debug!("loading wallpaper {:?}", path);
            image::open(&path)?.to_rgba8()
        };

        let bitmap = Arc::new(bitmap);
        self.remember(key, bitmap.clone());
        Ok(bitmap)
    }

    fn resolve_path(&self, source: &str) -> PathBuf {
        let path = Path::new(source);
        match &self.dir {
            Some(dir) if path.is_relative() && !path.exists() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::encode_data_uri;

    #[test]
    fn loads_data_uri_and_caches() {
        let png = crate::clipboard::encode_png(&RgbaImage::new(4, 3)).unwrap();
        let uri = encode_data_uri("image/png", &png);
        let store = WallpaperStore::default();
        let a = store.load(&uri).unwrap();
        let b = store.load(&uri).unwrap();
        assert_eq!(a.dimensions(), (4, 3));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn cache_is_bounded_and_keyed_by_digest() {
        let store = WallpaperStore::default();
        let uris: Vec<String> = (1..=20u32)
            .map(|w| {
                let png = crate::clipboard::encode_png(&RgbaImage::new(w, 2)).unwrap();
                encode_data_uri("image/png", &png)
            })
            .collect();
        for uri in &uris {
            store.load(uri).unwrap();
            assert!(store.cached_count() <= CACHE_CAPACITY);
        }
        assert_eq!(store.cached_count(), CACHE_CAPACITY);

        let cache = store.cache.lock().unwrap();
        assert!(cache.iter().all(|(k, _)| k.starts_with("sha256:") && k.len() == 7 + 64));
        // Only the most recent loads survive.
        let newest = cache_key(&uris[19]);
        assert_eq!(cache.back().map(|(k, _)| k.as_str()), Some(newest.as_str()));
        assert!(!cache.iter().any(|(k, _)| *k == cache_key(&uris[0])));
    }

    #[test]
    fn recent_hit_is_not_evicted() {
        let store = WallpaperStore::default();
        let uri = |w: u32| {
            let png = crate::clipboard::encode_png(&RgbaImage::new(w, 1)).unwrap();
            encode_data_uri("image/png", &png)
        };
        let first = store.load(&uri(1)).unwrap();
        for w in 2..=(CACHE_CAPACITY as u32) {
            store.load(&uri(w)).unwrap();
        }
        // Touch the oldest entry, then push one more.
        let again = store.load(&uri(1)).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        store.load(&uri(100)).unwrap();
        assert!(Arc::ptr_eq(&first, &store.load(&uri(1)).unwrap()));
    }

    #[test]
    fn rejects_non_image_data_uri() {
        let uri = encode_data_uri("text/plain", b"hi");
        assert!(WallpaperStore::default().load(&uri).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let store = WallpaperStore::new(Some(std::env::temp_dir()));
        assert!(store.load("definitely-not-here-7c1e.png").is_err());
    }

    #[test]
    fn no_directory_lists_nothing() {
        assert!(WallpaperStore::default().list().unwrap().is_empty());
    }
}
