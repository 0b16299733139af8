use crate::{
    attributes::{AttributeKind, AttributeSelector, AttributeSet},
    config::DrawBatchConfig,
    converter::convert,
    device::{DeviceBufferPool, DrawBackend},
    normals::{synthesize_flat_normals, synthesize_flat_normals_for_conversion},
    staging::AttributeStreams,
    topology::{Topology, UpdateScope},
};

/// Stable identity of a submitted vertex, used to patch it after upload.
///
/// Handles of vertices recorded as quads are stale once the quads get converted into triangles,
/// while quad strip handles follow their vertex into the converted triangle strip.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VertexHandle {
    topology: Topology,
    recorded: Topology,
    draw_call: usize,
    generation: u64,
    vertex: usize,
}

impl VertexHandle {
    /// Topology of the draw call holding the vertex.
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Topology the vertex was submitted with.
    pub fn recorded(&self) -> Topology {
        self.recorded
    }

    pub fn draw_call(&self) -> usize {
        self.draw_call
    }

    /// Position in submission order.
    pub fn vertex(&self) -> usize {
        self.vertex
    }

    fn resolve(&self, vertex_count: usize) -> usize {
        match (self.recorded, self.topology) {
            (Topology::Quads, Topology::Triangles) => panic!(
                "Stale vertex handle: quads draw call #{} was split into triangles",
                self.draw_call
            ),
            // pairs got swapped, an unpaired trailing vertex stayed in place
            (Topology::QuadStrip, Topology::TriangleStrip) => {
                if self.vertex % 2 == 1 {
                    self.vertex - 1
                } else {
                    (self.vertex + 1).min(vertex_count.saturating_sub(1))
                }
            }
            _ => self.vertex,
        }
    }
}

/// Address of a finalized draw call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DrawCallId {
    pub topology: Topology,
    pub index: usize,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DrawStats {
    pub drawn: usize,
    pub skipped: usize,
    pub vertices: usize,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum BatchState {
    #[default]
    Idle,
    Recording(Topology),
    Updating(UpdateScope),
}

/// One begin/end delimited batch of vertices with its staging and device storage.
pub struct DrawCall<B: DrawBackend> {
    device: DeviceBufferPool<B>,
    streams: AttributeStreams,
    topology: Topology,
    generation: u64,
}

impl<B: DrawBackend> DrawCall<B> {
    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn vertex_count(&self) -> usize {
        self.device.vertex_count()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0
    }

    /// CPU mirror of the uploaded attributes.
    pub fn streams(&self) -> &AttributeStreams {
        &self.streams
    }

    pub fn device(&self) -> &DeviceBufferPool<B> {
        &self.device
    }

    fn draw(&self, backend: &mut B, stats: &mut DrawStats) -> Result<(), B::Error> {
        if self.is_empty() {
            log::warn!(
                "Skipping empty {:?} draw call, maybe no vertex3f() was issued between begin() and end()",
                self.topology
            );
            stats.skipped += 1;
            return Ok(());
        }
        backend.draw_arrays(self.device.layout(), self.topology, self.vertex_count())?;
        stats.drawn += 1;
        stats.vertices += self.vertex_count();
        Ok(())
    }
}

struct Recording {
    topology: Topology,
    generation: u64,
    /// Topology the draw call gets stored under once finalized.
    target: Topology,
    index: usize,
    streams: AttributeStreams,
}

/// Immediate-mode style geometry recorder backed by device buffers.
///
/// Contract violations (calls made in the wrong state, stale handles) panic.
pub struct DrawBatch<B: DrawBackend> {
    // dropped before the backend so device resources are released first
    draw_calls: [Vec<DrawCall<B>>; Topology::COUNT],
    recording: Option<Recording>,
    attributes: AttributeSet,
    state: BatchState,
    config: DrawBatchConfig,
    // bumped by every begin(), so handles of failed or cleared draw calls never match
    generation: u64,
    backend: B,
}

impl<B: DrawBackend> DrawBatch<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, Default::default())
    }

    pub fn with_config(backend: B, config: DrawBatchConfig) -> Self {
        Self {
            draw_calls: std::array::from_fn(|_| Vec::new()),
            recording: None,
            attributes: Default::default(),
            state: BatchState::Idle,
            config,
            generation: 0,
            backend,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn config(&self) -> &DrawBatchConfig {
        &self.config
    }

    /// Changes apply to draw calls finalized afterwards.
    pub fn config_mut(&mut self) -> &mut DrawBatchConfig {
        &mut self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn draw_calls(&self, topology: Topology) -> &[DrawCall<B>] {
        &self.draw_calls[topology.index()]
    }

    pub fn draw_call(&self, topology: Topology, index: usize) -> Option<&DrawCall<B>> {
        self.draw_calls[topology.index()].get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawCall<B>> {
        self.draw_calls.iter().flatten()
    }

    pub fn begin(&mut self, topology: Topology) {
        assert!(
            !matches!(self.state, BatchState::Updating(_)),
            "begin() can't be called between begin_update() and end_update()"
        );
        assert!(
            self.state == BatchState::Idle,
            "Nested begin() and end() calls are forbidden"
        );
        let target = if self.backend.supports_topology(topology) {
            topology
        } else {
            topology.converted()
        };
        self.generation += 1;
        self.state = BatchState::Recording(topology);
        self.recording = Some(Recording {
            topology,
            generation: self.generation,
            target,
            index: self.draw_calls[target.index()].len(),
            streams: AttributeStreams::new(self.config.reserve_vertices),
        });
    }

    pub fn color3f(&mut self, r: f32, g: f32, b: f32) {
        self.attributes.color(r, g, b, 1.0);
    }

    pub fn color4f(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.attributes.color(r, g, b, a);
    }

    pub fn normal3f(&mut self, x: f32, y: f32, z: f32) {
        self.attributes.normal(x, y, z, self.config.auto_normalize);
    }

    pub fn tex_coords2f(&mut self, u: f32, v: f32) {
        self.attributes.tex_coords(u, v);
    }

    /// Appends a vertex made of the given position and the current attribute values.
    pub fn vertex3f(&mut self, x: f32, y: f32, z: f32) -> VertexHandle {
        assert!(
            !matches!(self.state, BatchState::Updating(_)),
            "vertex3f() can't be called between begin_update() and end_update()"
        );
        let Some(recording) = self.recording.as_mut() else {
            panic!("vertex3f() must be called between begin() and end()");
        };
        self.attributes.position(x, y, z);
        let vertex = recording.streams.push_vertex(&self.attributes);
        VertexHandle {
            topology: recording.target,
            recorded: recording.topology,
            draw_call: recording.index,
            generation: recording.generation,
            vertex,
        }
    }

    /// Finalizes the recorded draw call: converts its topology if the backend lacks it,
    /// synthesizes flat normals if enabled, uploads it and optionally draws it right away.
    pub fn end(&mut self, autodraw: bool) -> Result<DrawCallId, B::Error> {
        assert!(
            !matches!(self.state, BatchState::Updating(_)),
            "end() can't be called between begin_update() and end_update()"
        );
        let Some(Recording {
            topology,
            generation,
            target,
            mut streams,
            ..
        }) = self.recording.take()
        else {
            panic!("end() must be preceded by begin()");
        };
        self.state = BatchState::Idle;

        let before = self.config.normals_before_conversion;
        if self.config.auto_flat_normals && before {
            let (positions, normals) = streams.positions_and_normals_mut();
            if target == topology {
                synthesize_flat_normals(topology, positions, normals, self.config.provoking_vertex);
            } else {
                synthesize_flat_normals_for_conversion(
                    topology,
                    positions,
                    normals,
                    self.config.provoking_vertex,
                );
            }
        }
        let (topology, mut streams) = if target == topology {
            (topology, streams)
        } else {
            convert(topology, streams)
        };
        if self.config.auto_flat_normals && !before {
            let (positions, normals) = streams.positions_and_normals_mut();
            synthesize_flat_normals(topology, positions, normals, self.config.provoking_vertex);
        }
        let device = DeviceBufferPool::upload(
            &mut self.backend,
            &streams,
            self.config.buffer_usage,
            &self.config.attribute_locations,
        )?;

        let calls = &mut self.draw_calls[topology.index()];
        let id = DrawCallId {
            topology,
            index: calls.len(),
        };
        log::debug!(
            "Finalized {:?} draw call #{} with {} vertices",
            topology,
            id.index,
            streams.vertex_count()
        );
        calls.push(DrawCall {
            device,
            streams,
            topology,
            generation,
        });

        if autodraw {
            let call = &self.draw_calls[topology.index()][id.index];
            self.backend.begin_draw()?;
            let result = call.draw(&mut self.backend, &mut DrawStats::default());
            let end = self.backend.end_draw();
            result.and(end)?;
        }
        Ok(id)
    }

    /// Maps device buffers of every draw call covered by `scope` for patching.
    pub fn begin_update(&mut self, scope: impl Into<UpdateScope>) -> Result<(), B::Error> {
        let scope = scope.into();
        assert!(
            !matches!(self.state, BatchState::Recording(_)),
            "begin_update() can't be called between begin() and end()"
        );
        assert!(
            self.state == BatchState::Idle,
            "Nested begin_update() and end_update() calls are forbidden"
        );
        let mut result = Ok(());
        for topology in Self::covered(scope) {
            for call in &mut self.draw_calls[topology.index()] {
                result = call.device.map(&mut self.backend);
                if result.is_err() {
                    break;
                }
            }
            if result.is_err() {
                break;
            }
        }
        if result.is_err() {
            // roll back so no buffer stays mapped while idle
            let _ = self.unmap(scope);
            return result;
        }
        self.state = BatchState::Updating(scope);
        Ok(())
    }

    /// Overwrites attribute(s) of an uploaded vertex in mapped memory.
    ///
    /// The written values also become the current attribute values.
    pub fn set(
        &mut self,
        handle: VertexHandle,
        selector: impl Into<AttributeSelector>,
        x: f32,
        y: f32,
        z: f32,
        w: f32,
    ) {
        assert!(
            !matches!(self.state, BatchState::Recording(_)),
            "set() can't be called between begin() and end()"
        );
        let BatchState::Updating(scope) = self.state else {
            panic!("set() must be called between begin_update() and end_update()");
        };
        assert!(
            scope.covers(handle.topology),
            "Trying to update a {:?} vertex while {:?} is being updated",
            handle.topology,
            scope
        );
        let Some(call) = self.draw_calls[handle.topology.index()].get_mut(handle.draw_call) else {
            panic!(
                "Stale vertex handle: there is no {:?} draw call #{}",
                handle.topology, handle.draw_call
            );
        };
        assert!(
            call.generation == handle.generation,
            "Stale vertex handle: {:?} draw call #{} was cleared or never finalized",
            handle.topology,
            handle.draw_call
        );
        let vertex = handle.resolve(call.vertex_count());
        let selector = selector.into();
        match selector {
            AttributeSelector::Kind(kind) => self.attributes.set(kind, [x, y, z, w]),
            AttributeSelector::Currents => self.attributes.position(x, y, z),
        }
        let selected = |kind: AttributeKind| match selector {
            AttributeSelector::Kind(selected) => selected == kind,
            AttributeSelector::Currents => true,
        };
        for kind in AttributeKind::ALL.into_iter().filter(|kind| selected(*kind)) {
            let values = self.attributes.components(kind);
            call.device.write(kind, vertex, values);
            call.streams
                .get_mut(kind)
                .vertex_mut(vertex)
                .copy_from_slice(values);
        }
    }

    /// Unmaps everything mapped by the matching `begin_update()`.
    pub fn end_update(&mut self) -> Result<(), B::Error> {
        assert!(
            !matches!(self.state, BatchState::Recording(_)),
            "end_update() can't be called between begin() and end()"
        );
        let BatchState::Updating(scope) = self.state else {
            panic!("end_update() must be preceded by begin_update()");
        };
        self.state = BatchState::Idle;
        self.unmap(scope)
    }

    /// Draws every finalized draw call in topology then sequence order.
    pub fn draw(&mut self) -> Result<DrawStats, B::Error> {
        assert!(
            !matches!(self.state, BatchState::Recording(_)),
            "draw() can't be called between begin() and end()"
        );
        assert!(
            self.state == BatchState::Idle,
            "draw() can't be called between begin_update() and end_update()"
        );
        let mut stats = DrawStats::default();
        self.backend.begin_draw()?;
        let result = self
            .draw_calls
            .iter()
            .flatten()
            .try_for_each(|call| call.draw(&mut self.backend, &mut stats));
        let end = self.backend.end_draw();
        result.and(end)?;
        Ok(stats)
    }

    /// Drops every draw call along with its device resources.
    pub fn clear(&mut self) {
        assert!(
            self.state == BatchState::Idle,
            "clear() can't be called between begin() and end() nor begin_update() and end_update()"
        );
        for calls in &mut self.draw_calls {
            calls.clear();
        }
    }

    fn covered(scope: UpdateScope) -> impl Iterator<Item = Topology> {
        Topology::ALL
            .into_iter()
            .filter(move |topology| scope.covers(*topology))
    }

    fn unmap(&mut self, scope: UpdateScope) -> Result<(), B::Error> {
        let mut result = Ok(());
        for topology in Self::covered(scope) {
            for call in &mut self.draw_calls[topology.index()] {
                let status = call.device.unmap(&mut self.backend);
                if result.is_ok() {
                    result = status;
                }
            }
        }
        result
    }
}
