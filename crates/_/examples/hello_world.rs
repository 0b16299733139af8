use imdraw_core::{batch::DrawBatch, config::DrawBatchConfig, topology::Topology};
use imdraw_glow::{
    app::{App, AppState},
    renderer::GlowBackend,
};
use vek::{Mat4, Vec3};

fn main() {
    env_logger::init();

    // Flat normals are written to the last vertex of every face, which is also the
    // provoking vertex OpenGL uses by default.
    let app = App::default()
        .title("Direct Draw: hello world")
        .batch(DrawBatchConfig::default().auto_flat_normals(true));
    if let Err(error) = app.run(State::default()) {
        log::error!("{error}");
    }
}

#[derive(Default)]
struct State {
    angle: f32,
}

impl AppState for State {
    fn on_init(&mut self, batch: &mut DrawBatch<GlowBackend>) {
        batch.backend_mut().enable_lighting(true);

        // Quads are not a thing on core profiles, so this one gets uploaded as two triangles.
        batch.begin(Topology::Quads);
        batch.color3f(1.0, 0.5, 0.0);
        batch.vertex3f(-1.5, -0.5, 0.0);
        batch.vertex3f(-0.5, -0.5, 0.0);
        batch.vertex3f(-0.5, 0.5, 0.0);
        batch.vertex3f(-1.5, 0.5, 0.0);
        report(batch.end(false));

        // Open cylinder made of a single quad strip.
        batch.begin(Topology::QuadStrip);
        batch.color3f(0.2, 0.6, 1.0);
        for step in 0..=16 {
            let angle = step as f32 / 16.0 * std::f32::consts::TAU;
            let (x, z) = (angle.cos() * 0.5 + 1.0, angle.sin() * 0.5);
            batch.vertex3f(x, -0.5, z);
            batch.vertex3f(x, 0.5, z);
        }
        report(batch.end(false));

        batch.begin(Topology::TriangleFan);
        batch.color3f(0.4, 1.0, 0.4);
        batch.vertex3f(0.0, 1.0, 0.0);
        for step in 0..=8 {
            let angle = step as f32 / 8.0 * std::f32::consts::TAU;
            batch.vertex3f(angle.cos() * 0.3, 1.0 + angle.sin() * 0.3, 0.0);
        }
        report(batch.end(false));

        batch.begin(Topology::LineLoop);
        batch.color3f(1.0, 1.0, 1.0);
        batch.vertex3f(-2.0, -1.0, 0.0);
        batch.vertex3f(2.0, -1.0, 0.0);
        batch.vertex3f(2.0, 1.5, 0.0);
        batch.vertex3f(-2.0, 1.5, 0.0);
        report(batch.end(false));
    }

    fn on_redraw(&mut self, batch: &mut DrawBatch<GlowBackend>, width: u32, height: u32) {
        self.angle += 0.01;
        let projection = Mat4::perspective_fov_rh_no(
            1.0,
            width.max(1) as f32,
            height.max(1) as f32,
            0.1,
            100.0,
        );
        let model_view =
            Mat4::<f32>::translation_3d(Vec3::new(0.0, 0.0, -5.0)) * Mat4::rotation_y(self.angle);
        if let Err(error) = batch.backend_mut().set_matrix(model_view, projection) {
            log::error!("{error}");
            return;
        }
        match batch.draw() {
            Ok(stats) => log::trace!("{stats:?}"),
            Err(error) => log::error!("{error}"),
        }
    }
}

fn report<T, E: std::fmt::Display>(result: Result<T, E>) {
    if let Err(error) = result {
        log::error!("{error}");
    }
}
