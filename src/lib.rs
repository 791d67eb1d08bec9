//! Builds an OpenGL shader program from a vertex and a fragment source and
//! draws a vertex-colored triangle with it.

pub mod config;
pub mod data;
pub mod driver;
pub mod error;
pub mod opengl;
pub mod renderer;
pub mod shaders;
pub mod viewport;
