use crate::renderer::GlowError;
use glow::{
    Buffer as GlowBufferHandle, Context, HasContext, Program as GlowProgram,
    Shader as GlowShader, UniformLocation, VertexArray, ARRAY_BUFFER, FRAGMENT_SHADER,
    VERTEX_SHADER,
};
use imdraw_core::{attributes::AttributeKind, device::DeviceBuffer};
use std::{ptr::NonNull, rc::Rc};
use vek::Mat4;

/// Array buffer of floats, deleted on drop.
pub struct GlowBuffer {
    pub(crate) context: Rc<Context>,
    pub(crate) buffer: GlowBufferHandle,
    pub(crate) len: usize,
    pub(crate) mapped: Option<NonNull<f32>>,
}

impl Drop for GlowBuffer {
    fn drop(&mut self) {
        unsafe {
            if self.mapped.take().is_some() {
                self.context.bind_buffer(ARRAY_BUFFER, Some(self.buffer));
                self.context.unmap_buffer(ARRAY_BUFFER);
                self.context.bind_buffer(ARRAY_BUFFER, None);
            }
            self.context.delete_buffer(self.buffer);
        }
    }
}

impl GlowBuffer {
    pub fn handle(&self) -> GlowBufferHandle {
        self.buffer
    }

    pub(crate) fn size_in_bytes(&self) -> usize {
        self.len * std::mem::size_of::<f32>()
    }
}

impl DeviceBuffer for GlowBuffer {
    fn len(&self) -> usize {
        self.len
    }

    fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    fn mapped_mut(&mut self) -> Option<&mut [f32]> {
        // valid until unmapped, and unmapping requires `&mut self`
        self.mapped
            .map(|pointer| unsafe { std::slice::from_raw_parts_mut(pointer.as_ptr(), self.len) })
    }
}

/// Vertex array object recording which buffer feeds which attribute location.
pub struct GlowLayout {
    pub(crate) context: Rc<Context>,
    pub(crate) vertex_array: VertexArray,
    pub(crate) bindings: Vec<(AttributeKind, u32)>,
}

impl Drop for GlowLayout {
    fn drop(&mut self) {
        unsafe {
            self.context.delete_vertex_array(self.vertex_array);
        }
    }
}

impl GlowLayout {
    pub fn handle(&self) -> VertexArray {
        self.vertex_array
    }

    /// Attribute locations enabled in this layout.
    pub fn bindings(&self) -> &[(AttributeKind, u32)] {
        &self.bindings
    }
}

/// Built-in flat shaded program, with attributes bound at their default locations.
pub struct DirectDrawProgram {
    context: Rc<Context>,
    program: GlowProgram,
}

impl Drop for DirectDrawProgram {
    fn drop(&mut self) {
        unsafe {
            self.context.delete_program(self.program);
        }
    }
}

impl DirectDrawProgram {
    pub const VERTEX: &'static str = r#"#version 300 es
    in vec3 a_position;
    in vec3 a_normal;
    in vec2 a_uv;
    in vec4 a_color;
    flat out vec3 v_normal;
    flat out vec3 v_light_dir;
    flat out vec3 v_half_vec;
    out vec2 v_uv;
    out vec4 v_color;
    uniform mat4 u_model_view;
    uniform mat4 u_mvp;
    uniform mat4 u_normal_matrix;

    void main() {
        vec3 view_position = vec3(u_model_view * vec4(a_position, 1.0));
        v_light_dir = normalize(-view_position);
        v_half_vec = normalize(v_light_dir + normalize(-view_position));
        v_normal = normalize((u_normal_matrix * vec4(a_normal, 0.0)).xyz);
        v_uv = a_uv;
        v_color = a_color;
        gl_Position = u_mvp * vec4(a_position, 1.0);
    }
    "#;
    pub const FRAGMENT: &'static str = r#"#version 300 es
    precision highp float;
    flat in vec3 v_normal;
    flat in vec3 v_light_dir;
    flat in vec3 v_half_vec;
    in vec2 v_uv;
    in vec4 v_color;
    out vec4 o_color;
    uniform int u_lighting;
    uniform float u_shininess;

    void main() {
        if (u_lighting == 1) {
            vec3 normal = normalize(v_normal);
            float diffuse = abs(dot(normal, normalize(v_light_dir)));
            float specular = pow(clamp(dot(normalize(v_half_vec), normal), 0.0, 1.0), u_shininess);
            vec3 color = (v_color.rgb + v_color.rgb * specular) * diffuse;
            o_color = vec4(color * 0.9, 1.0);
        } else {
            o_color = v_color;
        }
    }
    "#;

    pub fn new(context: Rc<Context>) -> Result<Self, GlowError> {
        Self::with_sources(context, Self::VERTEX, Self::FRAGMENT)
    }

    pub fn with_sources(
        context: Rc<Context>,
        vertex: &str,
        fragment: &str,
    ) -> Result<Self, GlowError> {
        unsafe {
            let vertex_shader = compile_shader(&context, VERTEX_SHADER, vertex)?;
            let fragment_shader = match compile_shader(&context, FRAGMENT_SHADER, fragment) {
                Ok(shader) => shader,
                Err(error) => {
                    context.delete_shader(vertex_shader);
                    return Err(error);
                }
            };
            let program = context.create_program().map_err(GlowError::Resource)?;
            context.attach_shader(program, vertex_shader);
            context.attach_shader(program, fragment_shader);
            for kind in AttributeKind::ALL {
                context.bind_attrib_location(
                    program,
                    kind.index() as u32,
                    Self::attribute_name(kind),
                );
            }
            context.link_program(program);
            context.detach_shader(program, vertex_shader);
            context.detach_shader(program, fragment_shader);
            context.delete_shader(vertex_shader);
            context.delete_shader(fragment_shader);
            if !context.get_program_link_status(program) {
                let log = context.get_program_info_log(program);
                log::error!("Direct draw program linking failed: {log}");
                context.delete_program(program);
                return Err(GlowError::ProgramLink(log));
            }
            Ok(Self { context, program })
        }
    }

    pub fn attribute_name(kind: AttributeKind) -> &'static str {
        match kind {
            AttributeKind::Position => "a_position",
            AttributeKind::Normal => "a_normal",
            AttributeKind::TexCoord => "a_uv",
            AttributeKind::Color => "a_color",
        }
    }

    pub fn handle(&self) -> GlowProgram {
        self.program
    }

    pub(crate) fn activate(&self, lighting: bool) {
        unsafe {
            self.context.use_program(Some(self.program));
            self.context
                .uniform_1_i32(self.uniform("u_lighting").as_ref(), lighting as i32);
            self.context
                .uniform_1_f32(self.uniform("u_shininess").as_ref(), 5.0);
        }
    }

    /// Uploads transformation uniforms; the normal matrix is the inverse transpose of `model_view`.
    pub(crate) fn set_matrix(&self, model_view: Mat4<f32>, projection: Mat4<f32>) {
        let mvp = projection * model_view;
        let normal = model_view.inverted().transposed();
        unsafe {
            self.context.use_program(Some(self.program));
            for (name, matrix) in [
                ("u_model_view", model_view),
                ("u_mvp", mvp),
                ("u_normal_matrix", normal),
            ] {
                self.context.uniform_matrix_4_f32_slice(
                    self.uniform(name).as_ref(),
                    false,
                    &matrix.into_col_array(),
                );
            }
            self.context.use_program(None);
        }
    }

    fn uniform(&self, name: &str) -> Option<UniformLocation> {
        unsafe { self.context.get_uniform_location(self.program, name) }
    }
}

unsafe fn compile_shader(context: &Context, kind: u32, source: &str) -> Result<GlowShader, GlowError> {
    let shader = context.create_shader(kind).map_err(GlowError::Resource)?;
    context.shader_source(shader, source);
    context.compile_shader(shader);
    if context.get_shader_compile_status(shader) {
        Ok(shader)
    } else {
        let log = context.get_shader_info_log(shader);
        log::error!("Direct draw shader compilation failed: {log}");
        context.delete_shader(shader);
        Err(GlowError::ShaderCompile(log))
    }
}
