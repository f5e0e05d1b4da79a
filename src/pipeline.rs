//! Sprite Pipeline - Single Entry Point
//!
//! registry -> rasterize (cached, parallel) -> per-variant SDF + pack +
//! composite (variants in parallel) -> manifest.
//!
//! Any failure aborts the whole build; no partial set of atlases is returned.

use chrono::{DateTime, Utc};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::assembler::{variant_suffix, AssembleError, SpriteArtifact, SpriteAssembler, SpriteInput};
use crate::cache::{RasterCache, RasterKey};
use crate::hashing::{compute_canonical_hash, compute_config_hash, compute_image_hash, sha256_hex};
use crate::raster::{RasterError, Rasterizer};
use crate::registry::{IconRegistry, IconSetsConfig, RegistryError, SourceStore};
use crate::sdf::DEFAULT_SDF_RADIUS;
use crate::ENGINE_VERSION;

pub const DEFAULT_PIXEL_RATIOS: [u32; 4] = [1, 2, 3, 4];

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Rasterization failed for '{source_id}' at {pixel_ratio}x: {error}")]
    Rasterization {
        source_id: String,
        pixel_ratio: u32,
        #[source]
        error: RasterError,
    },

    #[error("Sprite variant {pixel_ratio}x failed: {error}")]
    Variant {
        pixel_ratio: u32,
        #[source]
        error: AssembleError,
    },

    #[error("Invalid build options: {0}")]
    InvalidOptions(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    #[serde(default = "default_pixel_ratios")]
    pub pixel_ratios: Vec<u32>,
    #[serde(default = "default_sdf_radius")]
    pub sdf_radius: f64,
}

fn default_pixel_ratios() -> Vec<u32> { DEFAULT_PIXEL_RATIOS.to_vec() }
fn default_sdf_radius() -> f64 { DEFAULT_SDF_RADIUS }

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            pixel_ratios: default_pixel_ratios(),
            sdf_radius: default_sdf_radius(),
        }
    }
}

impl BuildOptions {
    fn check(&self) -> Result<(), PipelineError> {
        if self.pixel_ratios.is_empty() {
            return Err(PipelineError::InvalidOptions("no pixel ratios".into()));
        }
        if self.pixel_ratios.contains(&0) {
            return Err(PipelineError::InvalidOptions("pixel ratio 0".into()));
        }
        let mut sorted = self.pixel_ratios.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != self.pixel_ratios.len() {
            return Err(PipelineError::InvalidOptions("duplicate pixel ratio".into()));
        }
        if !(self.sdf_radius.is_finite() && self.sdf_radius > 0.0) {
            return Err(PipelineError::InvalidOptions(format!(
                "sdf radius {} must be positive",
                self.sdf_radius
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantManifest {
    pub suffix: String,
    pub pixel_ratio: u32,
    pub width: u32,
    pub height: u32,
    pub icon_count: usize,
    pub image_hash: String,
    pub index_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildManifest {
    pub build_id: String,
    pub created_at: DateTime<Utc>,
    pub engine_version: String,
    pub config_hash: String,
    pub variants: Vec<VariantManifest>,
    /// Hash over every other field; empty while being computed.
    pub manifest_hash: String,
}

#[derive(Debug, Clone)]
pub struct SpriteBuild {
    /// One artifact per configured pixel ratio, in configured order.
    pub artifacts: Vec<SpriteArtifact>,
    pub manifest: BuildManifest,
}

impl SpriteBuild {
    pub fn artifact(&self, pixel_ratio: u32) -> Option<&SpriteArtifact> {
        self.artifacts.iter().find(|a| a.pixel_ratio == pixel_ratio)
    }
}

/// The sprite pipeline - single entry point for building atlases
pub struct SpritePipeline<R: Rasterizer> {
    rasterizer: R,
    options: BuildOptions,
}

impl<R: Rasterizer> SpritePipeline<R> {
    pub fn new(rasterizer: R) -> Self {
        Self::with_options(rasterizer, BuildOptions::default())
    }

    pub fn with_options(rasterizer: R, options: BuildOptions) -> Self {
        Self { rasterizer, options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Resolve `config` against `store` and build every variant.
    pub fn build_config(
        &self,
        config: &IconSetsConfig,
        store: &dyn SourceStore,
    ) -> Result<SpriteBuild, PipelineError> {
        let registry = IconRegistry::load(config, store)?;
        let config_hash = compute_config_hash(config, &self.options.pixel_ratios, ENGINE_VERSION)?;
        self.build_with_hash(&registry, config_hash)
    }

    /// Build every configured variant of `registry`.
    pub fn build(&self, registry: &IconRegistry) -> Result<SpriteBuild, PipelineError> {
        let config_hash = compute_config_hash(
            &registry.descriptors(),
            &self.options.pixel_ratios,
            ENGINE_VERSION,
        )?;
        self.build_with_hash(registry, config_hash)
    }

    fn build_with_hash(
        &self,
        registry: &IconRegistry,
        config_hash: String,
    ) -> Result<SpriteBuild, PipelineError> {
        self.options.check()?;
        info!(
            "Building {} icons at ratios {:?}",
            registry.len(),
            self.options.pixel_ratios
        );

        // Cache lives for this build only.
        let mut cache = RasterCache::new();
        cache
            .fill(registry, &self.options.pixel_ratios, &self.rasterizer)
            .map_err(|e| PipelineError::Rasterization {
                source_id: e.key.source_id,
                pixel_ratio: e.key.pixel_ratio,
                error: e.error,
            })?;

        let assembler = SpriteAssembler::new(self.options.sdf_radius);
        let artifacts: Vec<SpriteArtifact> = self
            .options
            .pixel_ratios
            .par_iter()
            .map(|&ratio| -> Result<SpriteArtifact, PipelineError> {
                let inputs: Vec<SpriteInput<'_>> = registry
                    .descriptors()
                    .iter()
                    .map(|d| SpriteInput {
                        descriptor: d,
                        buffer: cache.get(&RasterKey::new(d.source_id.as_str(), d.size, ratio)),
                    })
                    .collect();
                let artifact = assembler
                    .assemble(&inputs, ratio)
                    .map_err(|error| PipelineError::Variant { pixel_ratio: ratio, error })?;
                debug!(
                    "Assembled sprites{} ({}x{})",
                    artifact.suffix(),
                    artifact.image.width(),
                    artifact.image.height()
                );
                Ok(artifact)
            })
            .collect::<Result<_, _>>()?;

        let manifest = self.build_manifest(&artifacts, config_hash)?;
        info!("Build {} complete: {} variants", manifest.build_id, artifacts.len());

        Ok(SpriteBuild { artifacts, manifest })
    }

    fn build_manifest(
        &self,
        artifacts: &[SpriteArtifact],
        config_hash: String,
    ) -> Result<BuildManifest, PipelineError> {
        let variants = artifacts
            .iter()
            .map(|a| -> Result<VariantManifest, PipelineError> {
                Ok(VariantManifest {
                    suffix: variant_suffix(a.pixel_ratio),
                    pixel_ratio: a.pixel_ratio,
                    width: a.image.width(),
                    height: a.image.height(),
                    icon_count: a.icon_count(),
                    image_hash: compute_image_hash(a),
                    index_hash: sha256_hex(a.index_json()?.as_bytes()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut manifest = BuildManifest {
            build_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            config_hash,
            variants,
            manifest_hash: String::new(), // Computed after
        };
        manifest.manifest_hash = compute_canonical_hash(&manifest)?;
        Ok(manifest)
    }
}
