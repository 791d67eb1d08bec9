use glow::HasContext;
use winit::dpi::PhysicalSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Covers the whole framebuffer. Dimensions past `i32::MAX` saturate.
    pub fn from_size(size: PhysicalSize<u32>) -> Self {
        Self::new(
            0,
            0,
            i32::try_from(size.width).unwrap_or(i32::MAX),
            i32::try_from(size.height).unwrap_or(i32::MAX),
        )
    }

    pub fn apply(&self, context: &glow::Context) {
        unsafe {
            context.viewport(self.x, self.y, self.width, self.height);
        }
    }
}
