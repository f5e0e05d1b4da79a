//! Raster cache scoped to a single build.
//!
//! Icons sharing a source and size are rasterized once per pixel ratio.
//! Workers never touch the map: results are collected first, then inserted.

use log::debug;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::raster::{RasterBuffer, RasterError, Rasterizer};
use crate::registry::IconRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RasterKey {
    pub source_id: String,
    pub size: u32,
    pub pixel_ratio: u32,
}

impl RasterKey {
    pub fn new(source_id: impl Into<String>, size: u32, pixel_ratio: u32) -> Self {
        Self { source_id: source_id.into(), size, pixel_ratio }
    }

    pub fn output_size(&self) -> Result<u32, RasterError> {
        self.size.checked_mul(self.pixel_ratio).ok_or(RasterError::SizeOverflow {
            size: self.size,
            pixel_ratio: self.pixel_ratio,
        })
    }
}

/// Failure while filling the cache, tagged with the key that failed.
#[derive(Debug)]
pub struct CacheFillError {
    pub key: RasterKey,
    pub error: RasterError,
}

#[derive(Debug, Default)]
pub struct RasterCache {
    entries: HashMap<RasterKey, RasterBuffer>,
}

impl RasterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &RasterKey) -> Option<&RasterBuffer> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &RasterKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: RasterKey, buffer: RasterBuffer) {
        self.entries.insert(key, buffer);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rasterize every (icon, ratio) pair not already cached.
    ///
    /// Missing keys are rendered in parallel. On failure one failing key is
    /// reported and nothing from this call is inserted.
    pub fn fill(
        &mut self,
        registry: &IconRegistry,
        pixel_ratios: &[u32],
        rasterizer: &dyn Rasterizer,
    ) -> Result<usize, CacheFillError> {
        let mut pending: Vec<RasterKey> = registry
            .descriptors()
            .iter()
            .flat_map(|d| {
                pixel_ratios
                    .iter()
                    .map(move |&ratio| RasterKey::new(d.source_id.clone(), d.size, ratio))
            })
            .filter(|key| !self.contains(key))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        pending.sort();

        let rendered: Vec<(RasterKey, RasterBuffer)> = pending
            .into_par_iter()
            .map(|key| {
                let result = match registry.source(&key.source_id) {
                    Some(source) => key
                        .output_size()
                        .and_then(|size| rasterizer.rasterize(source, size)),
                    None => Err(RasterError::Rasterization(format!(
                        "no source loaded for '{}'",
                        key.source_id
                    ))),
                };
                match result {
                    Ok(buffer) => Ok((key, buffer)),
                    Err(error) => Err(CacheFillError { key, error }),
                }
            })
            .collect::<Result<_, _>>()?;

        let count = rendered.len();
        self.entries.extend(rendered);
        debug!("Rasterized {} buffers ({} cached)", count, self.entries.len());
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::IconDescriptor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> IconRegistry {
        let descriptor = |name: &str, source: &str| IconDescriptor {
            name: name.to_string(),
            size: 4,
            source_id: source.to_string(),
            use_sdf: false,
        };
        let descriptors = vec![descriptor("a", "set/a"), descriptor("b", "set/b")];
        let sources = [("set/a", "A"), ("set/b", "B")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IconRegistry::from_parts(descriptors, sources)
    }

    #[test]
    fn test_fill_renders_each_key_once() {
        let calls = AtomicUsize::new(0);
        let raster = |_: &str, size: u32| -> Result<RasterBuffer, RasterError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(RasterBuffer::filled(size, size, [1, 2, 3, 255]))
        };

        let mut cache = RasterCache::new();
        assert_eq!(cache.fill(&registry(), &[1, 2], &raster).unwrap(), 4);
        assert_eq!(cache.fill(&registry(), &[1, 2], &raster).unwrap(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        let buf = cache.get(&RasterKey::new("set/b", 4, 2)).unwrap();
        assert_eq!(buf.width(), 8);
    }

    #[test]
    fn test_fill_failure_inserts_nothing() {
        let raster = |source: &str, size: u32| -> Result<RasterBuffer, RasterError> {
            if source == "B" {
                Err(RasterError::Rasterization("bad path data".into()))
            } else {
                Ok(RasterBuffer::filled(size, size, [0; 4]))
            }
        };

        let mut cache = RasterCache::new();
        let err = cache.fill(&registry(), &[1], &raster).unwrap_err();
        assert_eq!(err.key, RasterKey::new("set/b", 4, 1));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_fill_reports_size_overflow() {
        let huge = IconDescriptor {
            name: "huge".to_string(),
            size: u32::MAX / 2 + 1,
            source_id: "set/huge".to_string(),
            use_sdf: false,
        };
        let sources = [("set/huge".to_string(), "H".to_string())].into_iter().collect();
        let registry = IconRegistry::from_parts(vec![huge], sources);
        let raster = |_: &str, size: u32| -> Result<RasterBuffer, RasterError> {
            Ok(RasterBuffer::filled(size, size, [0; 4]))
        };

        let mut cache = RasterCache::new();
        let err = cache.fill(&registry, &[2], &raster).unwrap_err();
        assert_eq!(err.error, RasterError::SizeOverflow { size: u32::MAX / 2 + 1, pixel_ratio: 2 });
        assert!(cache.is_empty());
    }
}
