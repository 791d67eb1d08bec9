use crate::shaders::ShaderError;

/// Failures that stop the application before the first frame.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("window handle unavailable: {0}")]
    Handle(#[from] winit::raw_window_handle::HandleError),

    #[error("GL display error: {0}")]
    Display(#[from] glutin::error::Error),

    #[error("no GL config matches the requested template")]
    NoConfig,

    #[error("window has a zero-sized framebuffer")]
    ZeroSize,

    #[error("GL object allocation failed: {0}")]
    Allocation(String),

    #[error("shader objects could not be allocated: {0}")]
    Shader(#[from] ShaderError),
}
