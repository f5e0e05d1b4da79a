//! Hashing System - SHA-256 for Artifacts and Manifests
//!
//! Provides deterministic, reproducible hashes so identical icon sets can be
//! shown to produce identical atlases.

use sha2::{Sha256, Digest};
use serde::Serialize;
use serde_json::{Value, to_string};

use crate::assembler::SpriteArtifact;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => {
            Value::Array(arr.iter().map(sort_value).collect())
        }
        _ => v.clone()
    }
}

/// Hash of any serializable value via its canonical JSON.
pub fn compute_canonical_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(value)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Hash of an atlas image: dimensions followed by raw RGBA bytes.
pub fn compute_image_hash(artifact: &SpriteArtifact) -> String {
    let mut hasher = Sha256::new();
    hasher.update(artifact.image.width().to_be_bytes());
    hasher.update(artifact.image.height().to_be_bytes());
    hasher.update(artifact.image.data());
    hex::encode(hasher.finalize())
}

/// Build fingerprint
/// config_hash = sha256(canonical_config + ratios + engine_version)
pub fn compute_config_hash(
    config: &impl Serialize,
    pixel_ratios: &[u32],
    engine_version: &str,
) -> Result<String, serde_json::Error> {
    let canonical_config = canonical_json(config)?;
    let ratios: Vec<String> = pixel_ratios.iter().map(u32::to_string).collect();
    let combined = format!("{}:{}:{}", canonical_config, ratios.join(","), engine_version);
    Ok(sha256_hex(combined.as_bytes()))
}

// We need hex encoding
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::AtlasIndex;
    use crate::raster::RasterBuffer;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": 3});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_image_hash_covers_dimensions() {
        let wide = SpriteArtifact {
            pixel_ratio: 1,
            image: RasterBuffer::transparent(4, 1),
            index: AtlasIndex::new(),
        };
        let tall = SpriteArtifact {
            image: RasterBuffer::transparent(1, 4),
            ..wide.clone()
        };
        assert_ne!(compute_image_hash(&wide), compute_image_hash(&tall));
        assert_eq!(compute_image_hash(&wide), compute_image_hash(&wide.clone()));
    }

    #[test]
    fn test_config_hash_depends_on_ratios() {
        let config = json!({"poi": {"size": 15, "names": ["cafe"]}});
        let h1 = compute_config_hash(&config, &[1, 2], "1.0.0").unwrap();
        let h2 = compute_config_hash(&config, &[1], "1.0.0").unwrap();
        assert_ne!(h1, h2);
    }
}
