use glow::*;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Layout {
    pub index: u32,
    pub size: i32,
    pub gl_type: u32,
    pub normalized: bool,
    pub offset: usize,
}

impl Layout {
    pub fn new(index: u32, size: i32, gl_type: u32, normalized: bool, offset: usize) -> Self {
        Self {
            index,
            size,
            gl_type,
            normalized,
            offset,
        }
    }
}

/// Vertex array plus the buffer backing it, drawn as a plain triangle list.
#[derive(Debug, Clone)]
pub struct StaticRenderData {
    pub vao: NativeVertexArray,
    pub vbo: NativeBuffer,
    pub stride: i32,
    pub layouts: Vec<Layout>,

    pub vertex_count: i32,
}

impl StaticRenderData {
    pub fn new(
        context: &glow::Context,
        vertices: &[f32],
        stride: i32,
        layouts: Vec<Layout>,
    ) -> Result<Self, String> {
        unsafe {
            let vao = context.create_vertex_array()?;
            context.bind_vertex_array(Some(vao));

            let vbo = match context.create_buffer() {
                Ok(vbo) => vbo,
                Err(e) => {
                    context.bind_vertex_array(None);
                    context.delete_vertex_array(vao);
                    return Err(e);
                }
            };
            context.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            context.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(vertices),
                glow::STATIC_DRAW,
            );

            // The attribute pointers are captured by the vertex array.
            for layout in &layouts {
                context.vertex_attrib_pointer_f32(
                    layout.index,
                    layout.size,
                    layout.gl_type,
                    layout.normalized,
                    stride,
                    layout.offset as i32,
                );
                context.enable_vertex_attrib_array(layout.index);
            }

            context.bind_buffer(glow::ARRAY_BUFFER, None);
            context.bind_vertex_array(None);

            let vertex_count = (vertices.len() as i32) / (stride / std::mem::size_of::<f32>() as i32);

            Ok(Self {
                vao,
                vbo,
                stride,
                layouts,

                vertex_count,
            })
        }
    }

    pub fn bind(&self, context: &glow::Context) {
        unsafe {
            context.bind_vertex_array(Some(self.vao));
        }
    }

    pub fn unbind(&self, context: &glow::Context) {
        unsafe {
            context.bind_vertex_array(None);
        }
    }

    pub fn draw(&self, context: &glow::Context) {
        self.bind(context);
        unsafe {
            context.draw_arrays(glow::TRIANGLES, 0, self.vertex_count);
        }
        self.unbind(context);
    }

    pub fn destroy(&self, context: &glow::Context) {
        unsafe {
            context.delete_vertex_array(self.vao);
            context.delete_buffer(self.vbo);
        }
    }
}

/// Drains the GL error queue, logging each entry. Returns how many were found.
pub fn log_errors(context: &glow::Context, stage: &str) -> usize {
    let mut count = 0;
    loop {
        let code = unsafe { context.get_error() };
        if code == glow::NO_ERROR {
            break count;
        }
        warn!("GL error during {stage}: {} (0x{code:04X})", error_name(code));
        count += 1;
    }
}

pub fn error_name(code: u32) -> &'static str {
    match code {
        glow::INVALID_ENUM => "GL_INVALID_ENUM",
        glow::INVALID_VALUE => "GL_INVALID_VALUE",
        glow::INVALID_OPERATION => "GL_INVALID_OPERATION",
        glow::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        glow::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        glow::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
        glow::STACK_OVERFLOW => "GL_STACK_OVERFLOW",
        _ => "unknown GL error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_error_codes_have_names() {
        assert_eq!(error_name(glow::INVALID_OPERATION), "GL_INVALID_OPERATION");
        assert_eq!(error_name(glow::OUT_OF_MEMORY), "GL_OUT_OF_MEMORY");
        assert_eq!(error_name(0xFFFF), "unknown GL error");
    }
}
