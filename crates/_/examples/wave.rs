use imdraw_core::{
    attributes::AttributeKind,
    batch::{DrawBatch, VertexHandle},
    config::DrawBatchConfig,
    device::BufferUsage,
    topology::Topology,
};
use imdraw_glow::{
    app::{App, AppState},
    renderer::GlowBackend,
};
use vek::{Mat4, Vec3};

const SIZE: usize = 32;

fn main() {
    env_logger::init();

    // Vertices get patched every frame, so hint the driver about it.
    let app = App::default()
        .title("Direct Draw: wave")
        .batch(DrawBatchConfig::default().buffer_usage(BufferUsage::Dynamic));
    if let Err(error) = app.run(State::default()) {
        log::error!("{error}");
    }
}

#[derive(Default)]
struct State {
    time: f32,
    // one handle per grid point, row by row
    handles: Vec<VertexHandle>,
}

impl State {
    fn height(&self, x: f32, z: f32) -> f32 {
        ((x * 4.0 + self.time).sin() + (z * 3.0 + self.time * 0.7).cos()) * 0.1
    }
}

impl AppState for State {
    fn on_init(&mut self, batch: &mut DrawBatch<GlowBackend>) {
        batch.begin(Topology::Points);
        for row in 0..SIZE {
            for column in 0..SIZE {
                let x = column as f32 / (SIZE - 1) as f32 * 2.0 - 1.0;
                let z = row as f32 / (SIZE - 1) as f32 * 2.0 - 1.0;
                batch.color3f(0.5 + x * 0.5, 0.5, 0.5 + z * 0.5);
                self.handles.push(batch.vertex3f(x, 0.0, z));
            }
        }
        if let Err(error) = batch.end(false) {
            log::error!("{error}");
        }
    }

    fn on_redraw(&mut self, batch: &mut DrawBatch<GlowBackend>, width: u32, height: u32) {
        self.time += 0.05;

        if let Err(error) = batch.begin_update(Topology::Points) {
            log::error!("{error}");
            return;
        }
        for (index, handle) in self.handles.iter().enumerate() {
            let x = (index % SIZE) as f32 / (SIZE - 1) as f32 * 2.0 - 1.0;
            let z = (index / SIZE) as f32 / (SIZE - 1) as f32 * 2.0 - 1.0;
            batch.set(*handle, AttributeKind::Position, x, self.height(x, z), z, 1.0);
        }
        if let Err(error) = batch.end_update() {
            log::error!("{error}");
        }

        let projection = Mat4::perspective_fov_rh_no(
            1.0,
            width.max(1) as f32,
            height.max(1) as f32,
            0.1,
            100.0,
        );
        let model_view = Mat4::<f32>::translation_3d(Vec3::new(0.0, 0.0, -3.0))
            * Mat4::rotation_x(0.6)
            * Mat4::rotation_y(self.time * 0.1);
        if let Err(error) = batch.backend_mut().set_matrix(model_view, projection) {
            log::error!("{error}");
            return;
        }
        if let Err(error) = batch.draw() {
            log::error!("{error}");
        }
    }
}
