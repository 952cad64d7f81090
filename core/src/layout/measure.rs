//! Layout measurement seam used by the paginator.

use std::sync::Arc;

use kuchiki::NodeRef;
use kuchiki::traits::*;

use crate::error::MeasureError;
use crate::types::Typography;

/// Measures the rendered height of a markup fragment.
///
/// Browser-backed hosts implement this against a hidden measuring container styled with the
/// given typography; [`TextMetricsMeasurer`] is an engine-free estimate.
pub trait LayoutMeasurementProvider: Send + Sync {
    fn measure_height(&self, markup: &str, typography: &Typography, width: f32) -> Result<f32, MeasureError>;
}

impl<T: LayoutMeasurementProvider + ?Sized> LayoutMeasurementProvider for Arc<T> {
    fn measure_height(&self, markup: &str, typography: &Typography, width: f32) -> Result<f32, MeasureError> {
        (**self).measure_height(markup, typography, width)
    }
}

impl<T: LayoutMeasurementProvider + ?Sized> LayoutMeasurementProvider for &T {
    fn measure_height(&self, markup: &str, typography: &Typography, width: f32) -> Result<f32, MeasureError> {
        (**self).measure_height(markup, typography, width)
    }
}

/// Deterministic height estimate from character counts and image attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetricsMeasurer {
    /// Average glyph advance as a fraction of the font size.
    pub char_width_ratio: f32,
    /// Vertical gap after each block element, in ems.
    pub block_spacing_em: f32,
    /// Height assumed for images without usable dimensions.
    pub default_image_height: f32,
}

impl Default for TextMetricsMeasurer {
    fn default() -> Self {
        Self { char_width_ratio: 0.5, block_spacing_em: 1.0, default_image_height: 300.0 }
    }
}

impl LayoutMeasurementProvider for TextMetricsMeasurer {
    fn measure_height(&self, markup: &str, typography: &Typography, width: f32) -> Result<f32, MeasureError> {
        if !(width.is_finite() && width > 0.0) {
            return Err(MeasureError::Unavailable(format!("invalid container width {width}")));
        }
        let document = kuchiki::parse_html().one(markup.to_string());
        let Ok(body) = document.select_first("body") else {
            return Ok(0.0);
        };
        let height = body
            .as_node()
            .children()
            .map(|node| self.node_height(&node, typography, width))
            .sum::<f32>();
        Ok(height)
    }
}

impl TextMetricsMeasurer {
    fn node_height(&self, node: &NodeRef, typography: &Typography, width: f32) -> f32 {
        if let Some(text) = node.as_text() {
            return self.text_height(&text.borrow(), typography.font_size, typography, width);
        }
        let Some(element) = node.as_element() else {
            return 0.0;
        };

        let tag = element.name.local.to_lowercase();
        if tag == "img" {
            let attributes = element.attributes.borrow();
            return self.image_height(attributes.get("width"), attributes.get("height"), width);
        }
        if tag == "br" {
            return typography.font_size * typography.line_spacing;
        }

        let font_size = typography.font_size * heading_scale(&tag);
        let images: f32 = node
            .descendants()
            .filter_map(|child| {
                let element = child.as_element()?;
                (&*element.name.local == "img").then(|| {
                    let attributes = element.attributes.borrow();
                    self.image_height(attributes.get("width"), attributes.get("height"), width)
                })
            })
            .sum();
        let text = node.text_contents();
        let text_height = if text.trim().is_empty() { 0.0 } else { self.text_height(&text, font_size, typography, width) };
        text_height + images + self.block_spacing_em * typography.font_size
    }

    fn text_height(&self, text: &str, font_size: f32, typography: &Typography, width: f32) -> f32 {
        let chars = text.split_whitespace().map(|word| word.chars().count() + 1).sum::<usize>();
        if chars == 0 {
            return 0.0;
        }
        let per_line = (width / (font_size * self.char_width_ratio)).floor().max(1.0) as usize;
        let lines = chars.div_ceil(per_line).max(1);
        lines as f32 * font_size * typography.line_spacing
    }

    fn image_height(&self, width_attr: Option<&str>, height_attr: Option<&str>, container: f32) -> f32 {
        let parse = |value: Option<&str>| value.and_then(|raw| raw.trim_end_matches("px").parse::<f32>().ok());
        match (parse(width_attr), parse(height_attr)) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 => h * (container / w).min(1.0),
            (_, Some(h)) if h > 0.0 => h,
            _ => self.default_image_height,
        }
    }
}

fn heading_scale(tag: &str) -> f32 {
    match tag {
        "h1" => 2.0,
        "h2" => 1.5,
        "h3" => 1.17,
        "h5" => 0.83,
        "h6" => 0.67,
        _ => 1.0,
    }
}
