//! Artifact output - writes each variant as `sprites<suffix>.png` plus
//! `sprites<suffix>.json`, and the build manifest as `manifest.json`.

use image::RgbaImage;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::assembler::SpriteArtifact;
use crate::pipeline::SpriteBuild;

pub const SPRITE_BASENAME: &str = "sprites";
pub const MANIFEST_FILENAME: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub fn image_filename(artifact: &SpriteArtifact) -> String {
    format!("{}{}.png", SPRITE_BASENAME, artifact.suffix())
}

pub fn index_filename(artifact: &SpriteArtifact) -> String {
    format!("{}{}.json", SPRITE_BASENAME, artifact.suffix())
}

/// Write one variant; returns the image and index paths.
pub fn write_artifact(dir: &Path, artifact: &SpriteArtifact) -> Result<[PathBuf; 2], OutputError> {
    let image_path = dir.join(image_filename(artifact));
    write_png(&image_path, artifact)?;

    let index_path = dir.join(index_filename(artifact));
    write_file(&index_path, artifact.index_json()?)?;

    Ok([image_path, index_path])
}

/// Write every variant and the manifest into `dir`, creating it if needed.
///
/// On failure the files written by this call are removed again, so `dir`
/// never holds a partial set of variants from this build.
pub fn write_build(dir: &Path, build: &SpriteBuild) -> Result<Vec<PathBuf>, OutputError> {
    fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = vec![];
    if let Err(e) = write_all(dir, build, &mut written) {
        for path in &written {
            if let Err(err) = fs::remove_file(path) {
                warn!("Could not remove {}: {}", path.display(), err);
            }
        }
        return Err(e);
    }

    info!("Wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}

fn write_all(dir: &Path, build: &SpriteBuild, written: &mut Vec<PathBuf>) -> Result<(), OutputError> {
    for artifact in &build.artifacts {
        let image_path = dir.join(image_filename(artifact));
        write_png(&image_path, artifact)?;
        written.push(image_path);

        let index_path = dir.join(index_filename(artifact));
        write_file(&index_path, artifact.index_json()?)?;
        written.push(index_path);
    }

    let manifest_path = dir.join(MANIFEST_FILENAME);
    write_file(&manifest_path, serde_json::to_string_pretty(&build.manifest)?)?;
    written.push(manifest_path);
    Ok(())
}

fn write_png(path: &Path, artifact: &SpriteArtifact) -> Result<(), OutputError> {
    let image = RgbaImage::from_raw(
        artifact.image.width(),
        artifact.image.height(),
        artifact.image.data().to_vec(),
    )
    .ok_or_else(|| OutputError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, "pixel buffer size mismatch"),
    })?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|source| OutputError::Image { path: path.to_path_buf(), source })
}

fn write_file(path: &Path, contents: String) -> Result<(), OutputError> {
    fs::write(path, contents).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::AtlasIndex;
    use crate::pipeline::BuildManifest;
    use crate::raster::RasterBuffer;

    #[test]
    fn test_filenames() {
        let mut artifact = SpriteArtifact {
            pixel_ratio: 1,
            image: RasterBuffer::transparent(1, 1),
            index: AtlasIndex::new(),
        };
        assert_eq!(image_filename(&artifact), "sprites.png");
        artifact.pixel_ratio = 3;
        assert_eq!(image_filename(&artifact), "sprites@3x.png");
        assert_eq!(index_filename(&artifact), "sprites@3x.json");
    }

    #[test]
    fn test_png_round_trips_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = SpriteArtifact {
            pixel_ratio: 2,
            image: RasterBuffer::filled(3, 2, [12, 34, 56, 78]),
            index: AtlasIndex::new(),
        };
        let [png, json] = write_artifact(dir.path(), &artifact).unwrap();

        let decoded = image::open(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.as_raw(), artifact.image.data());
        assert_eq!(fs::read_to_string(json).unwrap(), "{}");
    }

    #[test]
    fn test_failed_build_removes_written_files() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the manifest name makes the last write fail.
        fs::create_dir(dir.path().join(MANIFEST_FILENAME)).unwrap();

        let artifact = |pixel_ratio| SpriteArtifact {
            pixel_ratio,
            image: RasterBuffer::filled(2, 2, [1, 2, 3, 4]),
            index: AtlasIndex::new(),
        };
        let build = SpriteBuild {
            artifacts: vec![artifact(1), artifact(2)],
            manifest: BuildManifest {
                build_id: "b".to_string(),
                created_at: chrono::Utc::now(),
                engine_version: crate::ENGINE_VERSION.to_string(),
                config_hash: String::new(),
                variants: vec![],
                manifest_hash: String::new(),
            },
        };

        let err = write_build(dir.path(), &build).unwrap_err();
        assert!(matches!(err, OutputError::Io { ref path, .. } if path.ends_with(MANIFEST_FILENAME)));
        for name in ["sprites.png", "sprites.json", "sprites@2x.png", "sprites@2x.json"] {
            assert!(!dir.path().join(name).exists(), "{name} left behind");
        }
    }
}
