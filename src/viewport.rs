/// Pixel dimensions of the drawing area.
///
/// Both dimensions are always non-zero; the constructor rejects anything else
/// so that `aspect()` never divides by zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    width: u32,
    height: u32,
}

impl Viewport {
    /// Returns `None` if either dimension is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn as_vec2(&self) -> glam::Vec2 {
        glam::Vec2::new(self.width as f32, self.height as f32)
    }

    /// Dimensions scaled by a device pixel ratio, never below 1×1.
    pub fn scaled(&self, pixel_ratio: f32) -> (u32, u32) {
        let w = (self.width as f32 * pixel_ratio).round().max(1.0) as u32;
        let h = (self.height as f32 * pixel_ratio).round().max(1.0) as u32;
        (w, h)
    }
}

/// Anything that can report the pixel size of the area the scene mounts into.
///
/// The native host implements this for the winit window; tests implement it
/// for plain structs.
pub trait Container {
    /// Current inner size in physical pixels.
    fn pixel_size(&self) -> (u32, u32);
}

impl Container for winit::window::Window {
    fn pixel_size(&self) -> (u32, u32) {
        let size = self.inner_size();
        (size.width, size.height)
    }
}

impl<C: Container + ?Sized> Container for std::sync::Arc<C> {
    fn pixel_size(&self) -> (u32, u32) {
        (**self).pixel_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_dimensions() {
        assert!(Viewport::new(0, 600).is_none());
        assert!(Viewport::new(800, 0).is_none());
        assert!(Viewport::new(1, 1).is_some());
    }

    #[test]
    fn aspect_is_width_over_height() {
        let vp = Viewport::new(1920, 1080).unwrap();
        assert_eq!(vp.aspect(), 1920.0 / 1080.0);
    }

    #[test]
    fn scaled_rounds_and_clamps() {
        let vp = Viewport::new(801, 3).unwrap();
        assert_eq!(vp.scaled(1.5), (1202, 5));
        assert_eq!(vp.scaled(0.0), (1, 1));
    }
}
