// viewport.rs - Drawable surface size
//
// World space is fixed vertically: y spans [-VIEW_HALF_HEIGHT, VIEW_HALF_HEIGHT]
// and x stretches with the aspect ratio.

/// Visible half-height in world units (a 75 degree camera five units out).
pub const VIEW_HALF_HEIGHT: f32 = 3.84;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    width: u32,
    height: u32,
}

impl Viewport {
    /// Sizes below 1x1 are clamped so the aspect ratio is always finite.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width: width.max(1), height: height.max(1) }
    }

    /// Same as `new` for host-reported float sizes (which may be 0, negative or NaN).
    pub fn from_css(width: f64, height: f64) -> Self {
        let clamp = |v: f64| if v.is_finite() && v >= 1.0 { v.min(u32::MAX as f64) as u32 } else { 1 };
        Self::new(clamp(width), clamp(height))
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn half_width(&self) -> f32 {
        VIEW_HALF_HEIGHT * self.aspect()
    }

    /// Backing store size for a device pixel ratio.
    pub fn scaled(&self, pixel_ratio: f64) -> (u32, u32) {
        let ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 { pixel_ratio } else { 1.0 };
        (
            ((self.width as f64 * ratio).round() as u32).max(1),
            ((self.height as f64 * ratio).round() as u32).max(1),
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_clamps_to_one_pixel() {
        let vp = Viewport::new(0, 0);
        assert_eq!((vp.width(), vp.height()), (1, 1));
        assert!(vp.aspect().is_finite());
        assert_eq!(vp.aspect(), 1.0);
    }

    #[test]
    fn css_sizes_survive_garbage() {
        for (w, h) in [(0.0, 0.0), (-5.0, 10.0), (f64::NAN, f64::INFINITY)] {
            let vp = Viewport::from_css(w, h);
            assert!(vp.aspect().is_finite() && vp.aspect() > 0.0);
        }
        assert_eq!(Viewport::from_css(800.7, 600.2), Viewport::new(800, 600));
    }

    #[test]
    fn scaled_respects_ratio() {
        let vp = Viewport::new(800, 600);
        assert_eq!(vp.scaled(2.0), (1600, 1200));
        assert_eq!(vp.scaled(f64::NAN), (800, 600));
    }
}
