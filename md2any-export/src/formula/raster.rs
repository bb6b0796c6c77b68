//! Vector to raster conversion

use crate::error::RasterError;
use base64::Engine;
use image::{ImageFormat, RgbaImage};
use resvg::{tiny_skia, usvg};
use std::io::Cursor;

/// Largest surface painted, in pixels (a supersampled 4096x4096 box).
pub const MAX_SURFACE_PIXELS: u64 = 8192 * 8192;

/// Decode standalone SVG markup and paint it onto a white surface of
/// `target * supersample` pixels. Returns PNG bytes.
///
/// The drawing keeps its aspect ratio and is centered on the surface. Formulas are
/// typeset for light backgrounds, so the surface is opaque white before painting.
pub fn render_png(svg_xml: &str, target: (u32, u32), supersample: f32) -> Result<Vec<u8>, RasterError> {
    if svg_xml.trim().is_empty() {
        return Err(RasterError::EmptySerialization);
    }
    let scale = supersample.max(1.0);
    let width = ((target.0 as f32) * scale).round().max(1.0) as u32;
    let height = ((target.1 as f32) * scale).round().max(1.0) as u32;
    // Allocation failure aborts instead of returning, so oversized surfaces are refused up front.
    if u64::from(width) * u64::from(height) > MAX_SURFACE_PIXELS {
        return Err(RasterError::Surface { width, height });
    }
    let tree = usvg::Tree::from_str(svg_xml, &usvg::Options::default())
        .map_err(|e| RasterError::Decode(e.to_string()))?;

    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(RasterError::Surface { width, height })?;
    pixmap.fill(tiny_skia::Color::WHITE);

    let size = tree.size();
    let fit = (width as f32 / size.width()).min(height as f32 / size.height());
    let dx = (width as f32 - size.width() * fit) / 2.0;
    let dy = (height as f32 - size.height() * fit) / 2.0;
    let transform = tiny_skia::Transform::from_row(fit, 0.0, 0.0, fit, dx, dy);
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    // The surface is fully opaque, so premultiplied and straight alpha coincide.
    let image = RgbaImage::from_raw(width, height, pixmap.take())
        .ok_or_else(|| RasterError::Encode("pixel buffer size mismatch".to_string()))?;
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| RasterError::Encode(e.to_string()))?;
    Ok(png)
}

/// Encode bytes as a `data:` URI.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
