//! Spritesmith Core - Sprite Atlas Compiler
//!
//! Turns icon sets into one atlas image plus a JSON index per pixel ratio.
//!
//! # Guarantees
//! 1. Every icon owns an exclusive, unblended region of its atlas
//! 2. SDF icons are encoded from a Euclidean distance transform of their alpha
//! 3. Identical inputs produce identical pixels and indexes
//! 4. A failing icon fails the whole build

pub mod raster;
pub mod sdf;
pub mod packer;
pub mod assembler;
pub mod registry;
pub mod validation;
pub mod cache;
pub mod hashing;
pub mod pipeline;
pub mod output;
#[cfg(feature = "svg")]
pub mod svg;

pub use raster::{RasterBuffer, RasterError, Rasterizer};
pub use sdf::{compute_sdf, DistanceField};
pub use packer::{pack, PackError, Packing, PlacedRect, Rect};
pub use assembler::{assemble, AssembleError, AtlasIndex, AtlasIndexEntry, SpriteArtifact, SpriteInput};
pub use registry::{IconDescriptor, IconRegistry, IconSetConfig, IconSetsConfig, RegistryError, SourceStore};
pub use validation::{ValidationResult, ValidationRule, ValidationViolation, ViolationSeverity};
pub use pipeline::{BuildManifest, BuildOptions, PipelineError, SpriteBuild, SpritePipeline};
#[cfg(feature = "svg")]
pub use svg::SvgRasterizer;

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
