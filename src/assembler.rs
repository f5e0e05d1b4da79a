//! Sprite Assembler - composites icons into one atlas per pixel ratio
//!
//! Each icon gets an exclusive region of the canvas. Pixels are copied
//! verbatim (or SDF-encoded) into that region; nothing is blended.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use crate::packer::{pack, PackError, Rect};
use crate::raster::{RasterBuffer, RasterError};
use crate::registry::IconDescriptor;
use crate::sdf::{compute_sdf, DEFAULT_SDF_RADIUS};

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("Missing rasterized buffer for icon '{0}'")]
    MissingBuffer(String),

    #[error("Duplicate icon name '{0}'")]
    DuplicateName(String),

    #[error("Buffer for icon '{name}' is {actual_width}x{actual_height}, expected {expected}x{expected}")]
    BufferSizeMismatch {
        name: String,
        expected: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Icon '{name}' of size {size} overflows at {pixel_ratio}x")]
    SizeOverflow {
        name: String,
        size: u32,
        pixel_ratio: u32,
    },

    #[error("Pixel ratio must be positive")]
    InvalidPixelRatio,

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error(transparent)]
    Raster(#[from] RasterError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtlasIndexEntry {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: u32,
    pub sdf: bool,
}

/// Icon name -> region. Sorted so serialized indexes are stable.
pub type AtlasIndex = BTreeMap<String, AtlasIndexEntry>;

/// One icon handed to the assembler. `buffer` is `None` when rasterization
/// produced nothing for the icon.
#[derive(Debug, Clone, Copy)]
pub struct SpriteInput<'a> {
    pub descriptor: &'a IconDescriptor,
    pub buffer: Option<&'a RasterBuffer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteArtifact {
    pub pixel_ratio: u32,
    pub image: RasterBuffer,
    pub index: AtlasIndex,
}

impl SpriteArtifact {
    pub fn suffix(&self) -> String {
        variant_suffix(self.pixel_ratio)
    }

    pub fn icon_count(&self) -> usize {
        self.index.len()
    }

    pub fn index_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.index)
    }
}

/// File-name suffix for a density variant: "" for 1x, "@2x" for 2x, ...
pub fn variant_suffix(pixel_ratio: u32) -> String {
    if pixel_ratio == 1 {
        String::new()
    } else {
        format!("@{}x", pixel_ratio)
    }
}

pub struct SpriteAssembler {
    sdf_radius: f64,
}

impl SpriteAssembler {
    pub fn new(sdf_radius: f64) -> Self {
        Self { sdf_radius }
    }

    pub fn assemble(
        &self,
        icons: &[SpriteInput<'_>],
        pixel_ratio: u32,
    ) -> Result<SpriteArtifact, AssembleError> {
        if pixel_ratio == 0 {
            return Err(AssembleError::InvalidPixelRatio);
        }

        let mut names = HashSet::new();
        let mut buffers = Vec::with_capacity(icons.len());
        let mut rects = Vec::with_capacity(icons.len());
        for icon in icons {
            let d = icon.descriptor;
            if !names.insert(d.name.as_str()) {
                return Err(AssembleError::DuplicateName(d.name.clone()));
            }
            let buffer = icon
                .buffer
                .ok_or_else(|| AssembleError::MissingBuffer(d.name.clone()))?;
            let expected = d.size.checked_mul(pixel_ratio).ok_or_else(|| AssembleError::SizeOverflow {
                name: d.name.clone(),
                size: d.size,
                pixel_ratio,
            })?;
            if buffer.width() != expected || buffer.height() != expected {
                return Err(AssembleError::BufferSizeMismatch {
                    name: d.name.clone(),
                    expected,
                    actual_width: buffer.width(),
                    actual_height: buffer.height(),
                });
            }
            buffers.push(buffer);
            rects.push(Rect::new(d.name.clone(), expected, expected));
        }

        let tiles: Vec<Cow<'_, RasterBuffer>> = icons
            .par_iter()
            .zip(buffers.par_iter())
            .map(|(icon, &buffer)| {
                if icon.descriptor.use_sdf {
                    Cow::Owned(compute_sdf(buffer).to_raster(self.sdf_radius))
                } else {
                    Cow::Borrowed(buffer)
                }
            })
            .collect();

        let packing = pack(&rects)?;

        let mut image = RasterBuffer::transparent(packing.canvas_width, packing.canvas_height);
        let mut index = AtlasIndex::new();
        for ((placed, tile), icon) in packing.placements.iter().zip(&tiles).zip(icons) {
            image.blit(tile, placed.x, placed.y)?;
            index.insert(
                placed.id.clone(),
                AtlasIndexEntry {
                    x: placed.x,
                    y: placed.y,
                    width: placed.width,
                    height: placed.height,
                    pixel_ratio,
                    sdf: icon.descriptor.use_sdf,
                },
            );
        }

        Ok(SpriteArtifact { pixel_ratio, image, index })
    }
}

impl Default for SpriteAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_SDF_RADIUS)
    }
}

/// Assemble with the default SDF radius.
pub fn assemble(icons: &[SpriteInput<'_>], pixel_ratio: u32) -> Result<SpriteArtifact, AssembleError> {
    SpriteAssembler::default().assemble(icons, pixel_ratio)
}
