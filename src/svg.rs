//! SVG rasterizer backed by resvg.

use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;

use crate::raster::{RasterBuffer, RasterError, Rasterizer};

/// Renders an SVG document scaled to fill a square of the requested size.
#[derive(Default)]
pub struct SvgRasterizer {
    options: usvg::Options<'static>,
}

impl SvgRasterizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Rasterizer for SvgRasterizer {
    fn rasterize(&self, source: &str, output_size: u32) -> Result<RasterBuffer, RasterError> {
        let tree = usvg::Tree::from_str(source, &self.options)
            .map_err(|e| RasterError::Rasterization(e.to_string()))?;

        let size = tree.size();
        let scale_x = output_size as f32 / size.width();
        let scale_y = output_size as f32 / size.height();
        let transform = Transform::from_scale(scale_x, scale_y);

        let mut pixmap = Pixmap::new(output_size, output_size).ok_or_else(|| {
            RasterError::Rasterization(format!("cannot allocate {0}x{0} pixmap", output_size))
        })?;
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        // tiny-skia stores premultiplied alpha
        let data = pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        RasterBuffer::new(output_size, output_size, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10" viewBox="0 0 10 10">
        <rect x="0" y="0" width="5" height="10" fill="#ff0000"/>
    </svg>"##;

    #[test]
    fn test_renders_at_requested_size() {
        let buf = SvgRasterizer::new().rasterize(SQUARE, 20).unwrap();
        assert_eq!((buf.width(), buf.height()), (20, 20));
        assert_eq!(buf.pixel(2, 10), Some([255, 0, 0, 255]));
        assert_eq!(buf.alpha(17, 10), Some(0));
    }

    #[test]
    fn test_malformed_source() {
        let err = SvgRasterizer::new().rasterize("<svg", 8).unwrap_err();
        assert!(matches!(err, RasterError::Rasterization(_)));
    }
}
