//! Product images with zoom/pan framing.

use serde::{Deserialize, Serialize};

/// Smallest zoom factor (image fills the frame exactly).
pub const MIN_ZOOM: f32 = 1.0;
/// Largest zoom factor the editor allows.
pub const MAX_ZOOM: f32 = 4.0;
/// Pan offsets are percentages of the frame size.
pub const MAX_OFFSET: f32 = 100.0;

/// How an image sits inside its square card frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageFrame {
    #[serde(default = "default_zoom")]
    pub zoom: f32,
    #[serde(default)]
    pub offset_x: f32,
    #[serde(default)]
    pub offset_y: f32,
}

const fn default_zoom() -> f32 {
    MIN_ZOOM
}

impl Default for ImageFrame {
    fn default() -> Self {
        Self {
            zoom: MIN_ZOOM,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl ImageFrame {
    /// Build a frame, clamping every component into its allowed range.
    ///
    /// Non-finite input falls back to the neutral value.
    #[must_use]
    pub fn new(zoom: f32, offset_x: f32, offset_y: f32) -> Self {
        Self {
            zoom: clamp_finite(zoom, MIN_ZOOM, MAX_ZOOM, MIN_ZOOM),
            offset_x: clamp_finite(offset_x, -MAX_OFFSET, MAX_OFFSET, 0.0),
            offset_y: clamp_finite(offset_y, -MAX_OFFSET, MAX_OFFSET, 0.0),
        }
    }

    /// Re-clamp a frame that came from storage or a form.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self::new(self.zoom, self.offset_x, self.offset_y)
    }

    /// CSS `transform` value for rendering the framed image.
    #[must_use]
    pub fn css_transform(&self) -> String {
        let frame = self.clamped();
        format!(
            "scale({:.2}) translate({:.1}%, {:.1}%)",
            frame.zoom, frame.offset_x, frame.offset_y
        )
    }
}

fn clamp_finite(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// An image stored in the bucket, with its framing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    #[serde(default)]
    pub frame: ImageFrame,
}

impl ProductImage {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            frame: ImageFrame::default(),
        }
    }

    #[must_use]
    pub const fn with_frame(mut self, frame: ImageFrame) -> Self {
        self.frame = frame;
        self
    }
}
