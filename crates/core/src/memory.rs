//! Headless backend keeping device buffers in host memory and recording issued draws.

use crate::{
    attributes::AttributeKind,
    device::{AttributeBinding, BufferUsage, DeviceBuffer, DrawBackend},
    topology::Topology,
};
use std::{cell::Cell, rc::Rc};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryBackendError {
    #[error("Buffer #{0} is already mapped")]
    AlreadyMapped(u64),
    #[error("Buffer #{0} is not mapped")]
    NotMapped(u64),
    #[error("Buffer #{0} is empty and cannot be mapped")]
    MapEmpty(u64),
    #[error("Draw issued outside of a draw pass")]
    NoDrawPass,
    #[error("Draw pass is already active")]
    DrawPassActive,
    #[error("Out of buffers: {0} are alive")]
    BufferLimit(usize),
    #[error("Too many mapped buffers: {0} are mapped")]
    MapLimit(usize),
}

pub struct MemoryBuffer {
    id: u64,
    data: Vec<f32>,
    usage: BufferUsage,
    mapped: bool,
    live: Rc<Cell<usize>>,
    live_mapped: Rc<Cell<usize>>,
}

impl Drop for MemoryBuffer {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
        if self.mapped {
            self.live_mapped.set(self.live_mapped.get() - 1);
        }
    }
}

impl MemoryBuffer {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

impl DeviceBuffer for MemoryBuffer {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn is_mapped(&self) -> bool {
        self.mapped
    }

    fn mapped_mut(&mut self) -> Option<&mut [f32]> {
        if self.mapped {
            Some(&mut self.data)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLayout {
    pub id: u64,
    /// (attribute, location, buffer id)
    pub bindings: Vec<(AttributeKind, u32, u64)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCommand {
    pub layout: u64,
    pub topology: Topology,
    pub vertices: usize,
}

pub struct MemoryBackend {
    native: [bool; Topology::COUNT],
    next_id: u64,
    drawing: bool,
    passes: usize,
    commands: Vec<DrawCommand>,
    live: Rc<Cell<usize>>,
    live_mapped: Rc<Cell<usize>>,
    buffer_limit: Option<usize>,
    map_limit: Option<usize>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self {
            native: Topology::ALL.map(|topology| !topology.is_legacy()),
            next_id: 0,
            drawing: false,
            passes: 0,
            commands: Default::default(),
            live: Default::default(),
            live_mapped: Default::default(),
            buffer_limit: None,
            map_limit: None,
        }
    }
}

impl MemoryBackend {
    /// Backend accepting quads and quad strips as they are.
    pub fn legacy() -> Self {
        Self {
            native: [true; Topology::COUNT],
            ..Default::default()
        }
    }

    pub fn native_topology(mut self, topology: Topology, supported: bool) -> Self {
        self.native[topology.index()] = supported;
        self
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of completed draw passes.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Number of buffers not yet released.
    pub fn live_buffers(&self) -> usize {
        self.live.get()
    }

    /// Number of buffers currently mapped.
    pub fn mapped_buffers(&self) -> usize {
        self.live_mapped.get()
    }

    /// Makes buffer creation fail while `limit` buffers are alive.
    pub fn set_buffer_limit(&mut self, limit: Option<usize>) {
        self.buffer_limit = limit;
    }

    /// Makes mapping fail while `limit` buffers are mapped.
    pub fn set_map_limit(&mut self, limit: Option<usize>) {
        self.map_limit = limit;
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl DrawBackend for MemoryBackend {
    type Buffer = MemoryBuffer;
    type Layout = MemoryLayout;
    type Error = MemoryBackendError;

    fn supports_topology(&self, topology: Topology) -> bool {
        self.native[topology.index()]
    }

    fn create_buffer(
        &mut self,
        data: &[f32],
        usage: BufferUsage,
    ) -> Result<Self::Buffer, Self::Error> {
        let live = self.live.get();
        if self.buffer_limit.is_some_and(|limit| live >= limit) {
            return Err(MemoryBackendError::BufferLimit(live));
        }
        self.live.set(live + 1);
        Ok(MemoryBuffer {
            id: self.next_id(),
            data: data.to_vec(),
            usage,
            mapped: false,
            live: self.live.clone(),
            live_mapped: self.live_mapped.clone(),
        })
    }

    fn create_layout(
        &mut self,
        bindings: &[AttributeBinding<'_, Self::Buffer>],
    ) -> Result<Self::Layout, Self::Error> {
        Ok(MemoryLayout {
            id: self.next_id(),
            bindings: bindings
                .iter()
                .map(|binding| (binding.kind, binding.location, binding.buffer.id))
                .collect(),
        })
    }

    fn map_buffer(&mut self, buffer: &mut Self::Buffer) -> Result<(), Self::Error> {
        if buffer.mapped {
            return Err(MemoryBackendError::AlreadyMapped(buffer.id));
        }
        if buffer.data.is_empty() {
            return Err(MemoryBackendError::MapEmpty(buffer.id));
        }
        let mapped = self.live_mapped.get();
        if self.map_limit.is_some_and(|limit| mapped >= limit) {
            return Err(MemoryBackendError::MapLimit(mapped));
        }
        self.live_mapped.set(mapped + 1);
        buffer.mapped = true;
        Ok(())
    }

    fn unmap_buffer(&mut self, buffer: &mut Self::Buffer) -> Result<(), Self::Error> {
        if !buffer.mapped {
            return Err(MemoryBackendError::NotMapped(buffer.id));
        }
        self.live_mapped.set(self.live_mapped.get() - 1);
        buffer.mapped = false;
        Ok(())
    }

    fn begin_draw(&mut self) -> Result<(), Self::Error> {
        if self.drawing {
            return Err(MemoryBackendError::DrawPassActive);
        }
        self.drawing = true;
        Ok(())
    }

    fn draw_arrays(
        &mut self,
        layout: &Self::Layout,
        topology: Topology,
        vertices: usize,
    ) -> Result<(), Self::Error> {
        if !self.drawing {
            return Err(MemoryBackendError::NoDrawPass);
        }
        self.commands.push(DrawCommand {
            layout: layout.id,
            topology,
            vertices,
        });
        Ok(())
    }

    fn end_draw(&mut self) -> Result<(), Self::Error> {
        if !self.drawing {
            return Err(MemoryBackendError::NoDrawPass);
        }
        self.drawing = false;
        self.passes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_buffer_lifecycle() {
        let mut backend = MemoryBackend::default();
        let mut buffer = backend
            .create_buffer(&[1.0, 2.0, 3.0], BufferUsage::Dynamic)
            .unwrap();
        assert_eq!(backend.live_buffers(), 1);
        assert!(buffer.mapped_mut().is_none());

        backend.map_buffer(&mut buffer).unwrap();
        assert_eq!(
            backend.map_buffer(&mut buffer),
            Err(MemoryBackendError::AlreadyMapped(buffer.id()))
        );
        buffer.mapped_mut().unwrap()[1] = 5.0;
        backend.unmap_buffer(&mut buffer).unwrap();
        assert_eq!(buffer.data(), &[1.0, 5.0, 3.0]);

        drop(buffer);
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn test_memory_backend_refuses_empty_map() {
        let mut backend = MemoryBackend::default();
        let mut buffer = backend.create_buffer(&[], BufferUsage::Static).unwrap();
        assert!(matches!(
            backend.map_buffer(&mut buffer),
            Err(MemoryBackendError::MapEmpty(_))
        ));
    }

    #[test]
    fn test_memory_backend_limits() {
        let mut backend = MemoryBackend::default();
        let mut first = backend.create_buffer(&[1.0], BufferUsage::Static).unwrap();
        let mut second = backend.create_buffer(&[2.0], BufferUsage::Static).unwrap();
        backend.set_buffer_limit(Some(2));
        assert_eq!(
            backend.create_buffer(&[3.0], BufferUsage::Static).err(),
            Some(MemoryBackendError::BufferLimit(2))
        );

        backend.set_map_limit(Some(1));
        backend.map_buffer(&mut first).unwrap();
        assert_eq!(
            backend.map_buffer(&mut second),
            Err(MemoryBackendError::MapLimit(1))
        );
        assert!(!second.is_mapped());
        drop(first);
        assert_eq!(backend.mapped_buffers(), 0);
        backend.map_buffer(&mut second).unwrap();
        assert_eq!(backend.mapped_buffers(), 1);

        backend.set_buffer_limit(None);
        assert!(backend.create_buffer(&[3.0], BufferUsage::Static).is_ok());
    }

    #[test]
    fn test_memory_backend_draw_pass() {
        let mut backend = MemoryBackend::default();
        let layout = backend.create_layout(&[]).unwrap();
        assert_eq!(
            backend.draw_arrays(&layout, Topology::Points, 1),
            Err(MemoryBackendError::NoDrawPass)
        );
        backend.begin_draw().unwrap();
        backend.draw_arrays(&layout, Topology::Lines, 2).unwrap();
        backend.end_draw().unwrap();
        assert_eq!(backend.passes(), 1);
        assert_eq!(
            backend.commands(),
            &[DrawCommand {
                layout: layout.id,
                topology: Topology::Lines,
                vertices: 2,
            }]
        );
        assert!(backend.supports_topology(Topology::TriangleFan));
        assert!(!backend.supports_topology(Topology::Quads));
        assert!(MemoryBackend::legacy().supports_topology(Topology::QuadStrip));
    }
}
