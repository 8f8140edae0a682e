//! Camera module for pan/zoom transforms between screen and canvas space.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

use crate::config::CanvasConfig;

/// Camera manages the view transform for the canvas.
///
/// Rendering maps canvas space to screen space by scaling first and then
/// translating: `screen = offset + scale * canvas`. Input handling uses the
/// exact inverse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation (pan), in screen pixels.
    pub offset: Vec2,
    /// Current uniform zoom.
    pub scale: f64,
    /// Minimum allowed zoom.
    pub min_scale: f64,
    /// Maximum allowed zoom.
    pub max_scale: f64,
    surface_factor: f64,
    min_surface: Size,
    /// Over-provisioned drawing surface, allocated on the first valid viewport.
    surface: Option<Size>,
    /// Offset chosen at first initialization (None until then).
    initial_offset: Option<Vec2>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CanvasConfig::default())
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a camera using the scale limits and surface sizing of `config`.
    pub fn from_config(config: &CanvasConfig) -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            surface_factor: config.surface_factor,
            min_surface: Size::new(config.min_surface_width, config.min_surface_height),
            surface: None,
            initial_offset: None,
        }
    }

    /// Get the affine transform for rendering (canvas -> screen).
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Get the inverse transform for input handling (screen -> canvas).
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset)
    }

    /// Convert a screen point to canvas coordinates.
    pub fn to_canvas(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a canvas point to screen coordinates.
    pub fn to_screen(&self, canvas_point: Point) -> Point {
        self.transform() * canvas_point
    }

    /// Multiply the zoom by `factor`, clamped into `[min_scale, max_scale]`.
    pub fn update_scale(&mut self, factor: f64) {
        self.scale = (self.scale * factor).clamp(self.min_scale, self.max_scale);
    }

    /// Pan the camera by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Handle a viewport size change.
    ///
    /// The first valid size allocates the surface and centres it; later calls
    /// only resize the surface and never touch the translation. Returns true
    /// if the surface size changed.
    pub fn set_viewport_size(&mut self, viewport: Size) -> bool {
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return false;
        }
        let surface = Size::new(
            (viewport.width * self.surface_factor).max(self.min_surface.width),
            (viewport.height * self.surface_factor).max(self.min_surface.height),
        );
        if self.surface == Some(surface) {
            return false;
        }
        self.surface = Some(surface);

        if self.initial_offset.is_none() {
            self.offset = Vec2::new(
                (surface.width - viewport.width) / 2.0,
                (surface.height - viewport.height) / 2.0,
            );
            self.initial_offset = Some(self.offset);
            log::debug!("Camera initialized: offset=({}, {}), surface={:?}", self.offset.x, self.offset.y, surface);
        } else {
            log::debug!("Surface resized to {:?}, keeping offset ({}, {})", surface, self.offset.x, self.offset.y);
        }
        true
    }

    /// The allocated drawing surface, if a viewport has been set.
    pub fn surface_size(&self) -> Option<Size> {
        self.surface
    }

    /// The offset chosen on first initialization.
    pub fn initial_offset(&self) -> Option<Vec2> {
        self.initial_offset
    }

    /// Whether a valid viewport has been seen.
    pub fn is_initialized(&self) -> bool {
        self.initial_offset.is_some()
    }
}

/// Scale and translation a host applies to a background image so that it
/// follows the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageTransform {
    pub scale: f64,
    pub translate: Vec2,
}

impl ImageTransform {
    /// The transform as an affine (scale, then translate).
    pub fn to_affine(&self) -> Affine {
        Affine::translate(self.translate) * Affine::scale(self.scale)
    }
}

/// Compute how an image of `image_size` shown in `viewport` should be placed
/// to stay in sync with `camera`.
///
/// The image is first fitted into the viewport and centred, then zoomed by the
/// camera scale and shifted by how far the camera has panned since it was
/// initialized. Returns None for empty viewports or images.
pub fn image_transform(camera: &Camera, viewport: Size, image_size: Size) -> Option<ImageTransform> {
    if viewport.width <= 0.0 || viewport.height <= 0.0 || image_size.width <= 0.0 || image_size.height <= 0.0 {
        return None;
    }
    let base_scale = (viewport.width / image_size.width).min(viewport.height / image_size.height);
    let centred = Vec2::new(
        (viewport.width - image_size.width * base_scale) / 2.0,
        (viewport.height - image_size.height * base_scale) / 2.0,
    );
    let relative = camera.offset - camera.initial_offset.unwrap_or(Vec2::ZERO);
    Some(ImageTransform {
        scale: base_scale * camera.scale,
        translate: centred + relative,
    })
}
