use glow::HasContext;

use crate::{opengl::StaticRenderData, shaders::ShaderProgram};

pub struct Renderer;

impl Renderer {
    pub fn clear(context: &glow::Context, color: [f32; 4]) {
        unsafe {
            context.clear_color(color[0], color[1], color[2], color[3]);
            context.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    /// Clears the framebuffer and draws `mesh` with `program`. Without a
    /// program only the clear happens.
    pub fn render(
        context: &glow::Context,
        clear_color: [f32; 4],
        program: Option<&ShaderProgram<glow::Context>>,
        mesh: &StaticRenderData,
    ) {
        Self::clear(context, clear_color);

        if let Some(program) = program {
            program.activate();
            mesh.draw(context);
        }
    }
}
