use std::mem::size_of;

use crate::opengl::Layout;

pub const POSITION_COMPONENTS: usize = 3;
pub const COLOR_COMPONENTS: usize = 3;
pub const FLOATS_PER_VERTEX: usize = POSITION_COMPONENTS + COLOR_COMPONENTS;

#[rustfmt::skip]
pub const TRIANGLE_VERTICES: [f32; 3 * FLOATS_PER_VERTEX] = [
    // Position          Color
    -0.5, -0.5, 0.0,     1.0, 0.0, 0.0,
     0.5, -0.5, 0.0,     0.0, 1.0, 0.0,
     0.0,  0.5, 0.0,     0.0, 0.0, 1.0,
];

pub const CLEAR_COLOR: [f32; 4] = [0.2, 0.3, 0.3, 1.0];

/// Byte distance between consecutive vertices.
pub fn vertex_stride() -> i32 {
    (FLOATS_PER_VERTEX * size_of::<f32>()) as i32
}

/// Attribute 0 is the position, attribute 1 the color.
pub fn vertex_layouts() -> Vec<Layout> {
    vec![
        Layout::new(0, POSITION_COMPONENTS as i32, glow::FLOAT, false, 0),
        Layout::new(
            1,
            COLOR_COMPONENTS as i32,
            glow::FLOAT,
            false,
            POSITION_COMPONENTS * size_of::<f32>(),
        ),
    ]
}
