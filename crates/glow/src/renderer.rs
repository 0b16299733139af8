use crate::graphics::{DirectDrawProgram, GlowBuffer, GlowLayout};
use bytemuck::cast_slice;
use glow::{
    Context, HasContext, ARRAY_BUFFER, DYNAMIC_DRAW, FIRST_VERTEX_CONVENTION, FLOAT,
    LAST_VERTEX_CONVENTION, LINES, LINE_LOOP, LINE_STRIP, MAP_READ_BIT, MAP_WRITE_BIT, POINTS,
    STATIC_DRAW, STREAM_DRAW, TRIANGLES, TRIANGLE_FAN, TRIANGLE_STRIP,
};
use imdraw_core::{
    device::{AttributeBinding, BufferUsage, DeviceBuffer, DrawBackend},
    normals::ProvokingVertex,
    topology::Topology,
};
use std::{ptr::NonNull, rc::Rc};
use thiserror::Error;
use vek::Mat4;

/// Compatibility profile only.
pub const QUADS: u32 = 0x0007;
/// Compatibility profile only.
pub const QUAD_STRIP: u32 = 0x0008;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GlowError {
    #[error("Could not create GL resource: {0}")]
    Resource(String),
    #[error("Could not create GL context: {0}")]
    Context(String),
    #[error("Shader compilation failed: {0}")]
    ShaderCompile(String),
    #[error("Program linking failed: {0}")]
    ProgramLink(String),
    #[error("Could not map buffer of {0} floats")]
    MapFailed(usize),
    #[error("Buffer is already mapped")]
    AlreadyMapped,
    #[error("Buffer is not mapped")]
    NotMapped,
    #[error("Built-in direct draw program is unavailable")]
    ProgramUnavailable,
    #[error("Size of {0} does not fit into a GL size")]
    SizeOverflow(usize),
}

/// Converts a byte or vertex count into a `GLsizei`.
pub fn gl_size(value: usize) -> Result<i32, GlowError> {
    i32::try_from(value).map_err(|_| GlowError::SizeOverflow(value))
}

pub fn topology_into_gl(topology: Topology) -> u32 {
    match topology {
        Topology::Points => POINTS,
        Topology::Lines => LINES,
        Topology::LineStrip => LINE_STRIP,
        Topology::LineLoop => LINE_LOOP,
        Topology::Triangles => TRIANGLES,
        Topology::TriangleStrip => TRIANGLE_STRIP,
        Topology::TriangleFan => TRIANGLE_FAN,
        Topology::Quads => QUADS,
        Topology::QuadStrip => QUAD_STRIP,
    }
}

pub fn buffer_usage_into_gl(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::Static => STATIC_DRAW,
        BufferUsage::Dynamic => DYNAMIC_DRAW,
        BufferUsage::Stream => STREAM_DRAW,
    }
}

/// Value for `glProvokingVertex` matching the convention flat normals were synthesized with.
pub fn provoking_vertex_into_gl(provoking: ProvokingVertex) -> u32 {
    match provoking {
        ProvokingVertex::First => FIRST_VERTEX_CONVENTION,
        ProvokingVertex::Last => LAST_VERTEX_CONVENTION,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlowBackendConfig {
    /// Draw with the built-in program. When off, the host binds its own program and the batch
    /// attribute locations have to match it.
    pub builtin_program: bool,
    /// Let quads and quad strips through untouched (compatibility profiles only).
    pub legacy_topologies: bool,
}

impl Default for GlowBackendConfig {
    fn default() -> Self {
        Self {
            builtin_program: true,
            legacy_topologies: false,
        }
    }
}

impl GlowBackendConfig {
    pub fn builtin_program(mut self, v: bool) -> Self {
        self.builtin_program = v;
        self
    }

    pub fn legacy_topologies(mut self, v: bool) -> Self {
        self.legacy_topologies = v;
        self
    }
}

pub struct GlowBackend {
    program: Option<DirectDrawProgram>,
    config: GlowBackendConfig,
    lighting: bool,
    matrix_set: bool,
    context: Rc<Context>,
}

impl GlowBackend {
    /// Failing to build the built-in program is logged and leaves the backend unable to draw
    /// with it.
    pub fn new(context: impl Into<Rc<Context>>, config: GlowBackendConfig) -> Self {
        let context = context.into();
        let program = if config.builtin_program {
            match DirectDrawProgram::new(context.clone()) {
                Ok(program) => Some(program),
                Err(error) => {
                    log::error!("Built-in program is not installed: {error}");
                    None
                }
            }
        } else {
            None
        };
        Self {
            program,
            config,
            lighting: false,
            matrix_set: false,
            context,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn config(&self) -> &GlowBackendConfig {
        &self.config
    }

    pub fn program(&self) -> Option<&DirectDrawProgram> {
        self.program.as_ref()
    }

    pub fn is_lighting_enabled(&self) -> bool {
        self.lighting
    }

    pub fn enable_lighting(&mut self, state: bool) {
        self.lighting = state;
    }

    pub fn set_matrix(
        &mut self,
        model_view: Mat4<f32>,
        projection: Mat4<f32>,
    ) -> Result<(), GlowError> {
        let program = self.program.as_ref().ok_or(GlowError::ProgramUnavailable)?;
        program.set_matrix(model_view, projection);
        self.matrix_set = true;
        Ok(())
    }
}

impl DrawBackend for GlowBackend {
    type Buffer = GlowBuffer;
    type Layout = GlowLayout;
    type Error = GlowError;

    fn supports_topology(&self, topology: Topology) -> bool {
        !topology.is_legacy() || self.config.legacy_topologies
    }

    fn create_buffer(
        &mut self,
        data: &[f32],
        usage: BufferUsage,
    ) -> Result<Self::Buffer, Self::Error> {
        unsafe {
            let buffer = self.context.create_buffer().map_err(GlowError::Resource)?;
            self.context.bind_buffer(ARRAY_BUFFER, Some(buffer));
            self.context.buffer_data_u8_slice(
                ARRAY_BUFFER,
                cast_slice(data),
                buffer_usage_into_gl(usage),
            );
            self.context.bind_buffer(ARRAY_BUFFER, None);
            Ok(GlowBuffer {
                context: self.context.clone(),
                buffer,
                len: data.len(),
                mapped: None,
            })
        }
    }

    fn create_layout(
        &mut self,
        bindings: &[AttributeBinding<'_, Self::Buffer>],
    ) -> Result<Self::Layout, Self::Error> {
        unsafe {
            let vertex_array = self
                .context
                .create_vertex_array()
                .map_err(GlowError::Resource)?;
            self.context.bind_vertex_array(Some(vertex_array));
            for binding in bindings {
                self.context
                    .bind_buffer(ARRAY_BUFFER, Some(binding.buffer.handle()));
                self.context.vertex_attrib_pointer_f32(
                    binding.location,
                    binding.kind.components() as i32,
                    FLOAT,
                    false,
                    0,
                    0,
                );
                self.context.enable_vertex_attrib_array(binding.location);
            }
            self.context.bind_vertex_array(None);
            self.context.bind_buffer(ARRAY_BUFFER, None);
            Ok(GlowLayout {
                context: self.context.clone(),
                vertex_array,
                bindings: bindings
                    .iter()
                    .map(|binding| (binding.kind, binding.location))
                    .collect(),
            })
        }
    }

    fn map_buffer(&mut self, buffer: &mut Self::Buffer) -> Result<(), Self::Error> {
        if buffer.is_mapped() {
            return Err(GlowError::AlreadyMapped);
        }
        let size = gl_size(buffer.size_in_bytes())?;
        unsafe {
            self.context.bind_buffer(ARRAY_BUFFER, Some(buffer.buffer));
            let pointer = self.context.map_buffer_range(
                ARRAY_BUFFER,
                0,
                size,
                MAP_READ_BIT | MAP_WRITE_BIT,
            );
            self.context.bind_buffer(ARRAY_BUFFER, None);
            buffer.mapped = Some(
                NonNull::new(pointer as *mut f32).ok_or(GlowError::MapFailed(buffer.len))?,
            );
        }
        Ok(())
    }

    fn unmap_buffer(&mut self, buffer: &mut Self::Buffer) -> Result<(), Self::Error> {
        if buffer.mapped.take().is_none() {
            return Err(GlowError::NotMapped);
        }
        unsafe {
            self.context.bind_buffer(ARRAY_BUFFER, Some(buffer.buffer));
            self.context.unmap_buffer(ARRAY_BUFFER);
            self.context.bind_buffer(ARRAY_BUFFER, None);
        }
        Ok(())
    }

    fn begin_draw(&mut self) -> Result<(), Self::Error> {
        if !self.config.builtin_program {
            return Ok(());
        }
        let program = self.program.as_ref().ok_or(GlowError::ProgramUnavailable)?;
        assert!(
            self.matrix_set,
            "Transformation matrices must be provided with set_matrix() before drawing"
        );
        program.activate(self.lighting);
        Ok(())
    }

    fn draw_arrays(
        &mut self,
        layout: &Self::Layout,
        topology: Topology,
        vertices: usize,
    ) -> Result<(), Self::Error> {
        let count = gl_size(vertices)?;
        unsafe {
            self.context.bind_vertex_array(Some(layout.vertex_array));
            self.context.draw_arrays(topology_into_gl(topology), 0, count);
        }
        Ok(())
    }

    fn end_draw(&mut self) -> Result<(), Self::Error> {
        unsafe {
            self.context.bind_vertex_array(None);
            if self.config.builtin_program {
                self.context.use_program(None);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_into_gl() {
        let modes = Topology::ALL.map(topology_into_gl);
        assert_eq!(
            modes,
            [
                POINTS,
                LINES,
                LINE_STRIP,
                LINE_LOOP,
                TRIANGLES,
                TRIANGLE_STRIP,
                TRIANGLE_FAN,
                QUADS,
                QUAD_STRIP,
            ]
        );
    }

    #[test]
    fn test_usage_and_convention_into_gl() {
        assert_eq!(buffer_usage_into_gl(BufferUsage::Static), STATIC_DRAW);
        assert_eq!(buffer_usage_into_gl(BufferUsage::Dynamic), DYNAMIC_DRAW);
        assert_eq!(buffer_usage_into_gl(BufferUsage::Stream), STREAM_DRAW);
        assert_eq!(
            provoking_vertex_into_gl(ProvokingVertex::default()),
            LAST_VERTEX_CONVENTION
        );
        assert_eq!(
            provoking_vertex_into_gl(ProvokingVertex::First),
            FIRST_VERTEX_CONVENTION
        );
    }

    #[test]
    fn test_gl_size() {
        assert_eq!(gl_size(0), Ok(0));
        assert_eq!(gl_size(i32::MAX as usize), Ok(i32::MAX));
        let too_big = i32::MAX as usize + 1;
        assert_eq!(gl_size(too_big), Err(GlowError::SizeOverflow(too_big)));
    }

    #[test]
    fn test_backend_config() {
        let config = GlowBackendConfig::default();
        assert!(config.builtin_program);
        assert!(!config.legacy_topologies);
        let config = config.builtin_program(false).legacy_topologies(true);
        assert!(!config.builtin_program);
        assert!(config.legacy_topologies);
    }
}
