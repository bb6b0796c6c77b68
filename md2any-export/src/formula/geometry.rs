//! Formula box measurement

use super::RasterOptions;
use crate::dom;
use markup5ever_rcdom::Handle;

/// Size of a formula in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormulaBox {
    pub width: f32,
    pub height: f32,
}

impl FormulaBox {
    /// Raster target in whole pixels, clamped to the configured minimum.
    pub fn target(&self, options: &RasterOptions) -> (u32, u32) {
        (
            self.width.max(options.min_width).ceil() as u32,
            self.height.max(options.min_height).ceil() as u32,
        )
    }
}

/// Natural size of an `<svg>` from its `width`/`height` attributes, completed from the
/// `viewBox` aspect ratio when only one of them is usable.
pub fn measure(svg: &Handle, options: &RasterOptions) -> Option<FormulaBox> {
    let width = dom::get_attr(svg, "width").and_then(|v| parse_length(&v, options));
    let height = dom::get_attr(svg, "height").and_then(|v| parse_length(&v, options));
    let view_box = dom::get_attr(svg, "viewBox").and_then(|v| parse_view_box(&v));

    let (width, height) = match (width, height, view_box) {
        (Some(w), Some(h), _) => (w, h),
        (Some(w), None, Some((vw, vh))) => (w, w * vh / vw),
        (None, Some(h), Some((vw, vh))) => (h * vw / vh, h),
        (None, None, Some((vw, vh))) => (vw, vh),
        _ => return None,
    };
    (width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0)
        .then_some(FormulaBox { width, height })
}

/// Convert a CSS length to pixels. Percentages are relative to a layout we do not
/// have and yield `None`.
pub fn parse_length(value: &str, options: &RasterOptions) -> Option<f32> {
    let value = value.trim();
    let (number, factor) = if let Some(n) = value.strip_suffix("ex") {
        (n, options.ex_px)
    } else if let Some(n) = value.strip_suffix("em") {
        (n, options.em_px)
    } else if let Some(n) = value.strip_suffix("px") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix("pt") {
        (n, 4.0 / 3.0)
    } else if value.ends_with('%') {
        return None;
    } else {
        (value, 1.0)
    };
    number.trim().parse::<f32>().ok().map(|n| n * factor)
}

fn parse_view_box(value: &str) -> Option<(f32, f32)> {
    let numbers: Vec<f32> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f32>())
        .collect::<Result<_, _>>()
        .ok()?;
    match numbers.as_slice() {
        [_, _, w, h] if *w > 0.0 && *h > 0.0 => Some((*w, *h)),
        _ => None,
    }
}
