use std::num::NonZeroU32;
use std::process::ExitCode;
use std::sync::Arc;

use glow::HasContext;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version,
};
use glutin::display::{Display, DisplayApiPreference};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, WindowSurface};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawWindowHandle};
use winit::window::{Window, WindowId};

use hello_triangle::config::AppConfig;
use hello_triangle::data::{vertex_layouts, vertex_stride, CLEAR_COLOR, TRIANGLE_VERTICES};
use hello_triangle::error::AppError;
use hello_triangle::opengl::{self, StaticRenderData};
use hello_triangle::renderer::Renderer;
use hello_triangle::shaders::{tolerate_build_failure, ProgramBuilder, ShaderProgram};
use hello_triangle::viewport::Viewport;

struct App {
    config: AppConfig,
    failure: Option<AppError>,

    window: Option<Window>,
    current_context: Option<PossiblyCurrentContext>,
    surface: Option<Surface<WindowSurface>>,

    gl: Option<Arc<glow::Context>>,

    program: Option<ShaderProgram<glow::Context>>,
    triangle: Option<StaticRenderData>,
}

impl App {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            failure: None,
            window: None,
            current_context: None,
            surface: None,
            gl: None,
            program: None,
            triangle: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height))
            .with_resizable(false);
        let window = event_loop.create_window(attributes)?;

        // Get platform-specific handles to the display and window
        let display_handle = window.display_handle()?.as_raw();
        let window_handle = window.window_handle()?.as_raw();

        let display = unsafe { Display::new(display_handle, display_api_preference(window_handle))? };

        let config_template = ConfigTemplateBuilder::new()
            .compatible_with_native_window(window_handle)
            .build();
        let config = unsafe { display.find_configs(config_template)? }
            .next()
            .ok_or(AppError::NoConfig)?;

        // The framebuffer can be larger than the logical size on high density screens
        let physical_size = window.inner_size();
        let (Some(width), Some(height)) = (
            NonZeroU32::new(physical_size.width),
            NonZeroU32::new(physical_size.height),
        ) else {
            return Err(AppError::ZeroSize);
        };

        let surface_attributes =
            SurfaceAttributesBuilder::<WindowSurface>::new().build(window_handle, width, height);

        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .with_profile(GlProfile::Core)
            .build(Some(window_handle));

        let surface = unsafe { display.create_window_surface(&config, &surface_attributes)? };
        let non_current_context = unsafe { display.create_context(&config, &context_attributes)? };
        let current_context = non_current_context.make_current(&surface)?;

        let gl = unsafe {
            Arc::new(glow::Context::from_loader_function_cstr(|s| {
                display.get_proc_address(s)
            }))
        };

        unsafe {
            info!(
                "OpenGL {} on {} ({})",
                gl.get_parameter_string(glow::VERSION),
                gl.get_parameter_string(glow::RENDERER),
                gl.get_parameter_string(glow::VENDOR),
            );
        }

        Viewport::from_size(physical_size).apply(&gl);

        // Stage and link failures are already logged; the window still runs.
        let program = tolerate_build_failure(
            ProgramBuilder::from_files(&self.config.vertex_path, &self.config.fragment_path)
                .build(&gl),
        )?;
        if program.is_some() {
            info!(
                "Built shader program from {} and {}",
                self.config.vertex_path.display(),
                self.config.fragment_path.display()
            );
        }

        let triangle = StaticRenderData::new(&gl, &TRIANGLE_VERTICES, vertex_stride(), vertex_layouts())
            .map_err(AppError::Allocation)?;

        opengl::log_errors(&gl, "setup");

        window.request_redraw();

        self.surface = Some(surface);
        self.current_context = Some(current_context);
        self.gl = Some(gl);
        self.program = program;
        self.triangle = Some(triangle);
        self.window = Some(window);

        Ok(())
    }

    fn redraw(&self) {
        let (Some(window), Some(surface), Some(context), Some(gl), Some(triangle)) = (
            &self.window,
            &self.surface,
            &self.current_context,
            &self.gl,
            &self.triangle,
        ) else {
            return;
        };

        Renderer::render(gl, CLEAR_COLOR, self.program.as_ref(), triangle);
        opengl::log_errors(gl, "frame");

        if let Err(e) = surface.swap_buffers(context) {
            error!("Failed to swap buffers: {e}");
        }

        window.request_redraw();
    }

    /// Releases GL objects while the context is still alive.
    fn teardown(&mut self) {
        if let (Some(gl), Some(triangle)) = (&self.gl, self.triangle.take()) {
            triangle.destroy(gl);
        }
        if let Some(program) = self.program.take() {
            program.deactivate();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.failure.is_some() {
            return;
        }

        if let Err(e) = self.init(event_loop) {
            error!("{e}");
            self.failure = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("The close button was pressed; stopping");
                self.teardown();
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => (),
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(target_os = "windows")]
fn display_api_preference(window: RawWindowHandle) -> DisplayApiPreference {
    DisplayApiPreference::Wgl(Some(window))
}

#[cfg(target_os = "macos")]
fn display_api_preference(_window: RawWindowHandle) -> DisplayApiPreference {
    DisplayApiPreference::Cgl
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn display_api_preference(_window: RawWindowHandle) -> DisplayApiPreference {
    DisplayApiPreference::Egl
}

fn init_tracing(filter: Option<&str>) {
    let filter = filter
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    let config = AppConfig::parse();
    init_tracing(config.log_filter.as_deref());

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            error!("Failed to create event loop: {e}");
            return ExitCode::FAILURE;
        }
    };

    // ControlFlow::Wait pauses the event loop if no events are available to process.
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);

    if let Err(e) = event_loop.run_app(&mut app) {
        error!("Event loop terminated with an error: {e}");
        return ExitCode::FAILURE;
    }

    if app.failure.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
