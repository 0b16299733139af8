use crate::renderer::{GlowBackend, GlowBackendConfig, GlowError};
use glow::{Context, HasContext, COLOR_BUFFER_BIT, DEPTH_BUFFER_BIT, DEPTH_TEST};
use glutin::{
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    platform::run_return::EventLoopExtRunReturn,
    window::{Fullscreen, WindowBuilder},
    ContextBuilder,
};
use imdraw_core::{batch::DrawBatch, config::DrawBatchConfig};

#[allow(unused_variables)]
pub trait AppState {
    fn on_init(&mut self, batch: &mut DrawBatch<GlowBackend>) {}

    fn on_redraw(&mut self, batch: &mut DrawBatch<GlowBackend>, width: u32, height: u32) {}

    fn on_event(&mut self, event: Event<()>) -> bool {
        true
    }
}

pub struct App {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub vsync: bool,
    pub refresh_on_event: bool,
    pub depth_test: bool,
    pub color: [f32; 3],
    pub backend: GlowBackendConfig,
    pub batch: DrawBatchConfig,
}

impl Default for App {
    fn default() -> Self {
        Self {
            title: "Direct Draw".to_owned(),
            width: 1024,
            height: 576,
            fullscreen: false,
            vsync: false,
            refresh_on_event: false,
            depth_test: true,
            color: [0.0, 0.0, 0.0],
            backend: Default::default(),
            batch: Default::default(),
        }
    }
}

impl App {
    pub fn title(mut self, v: impl ToString) -> Self {
        self.title = v.to_string();
        self
    }

    pub fn width(mut self, v: u32) -> Self {
        self.width = v;
        self
    }

    pub fn height(mut self, v: u32) -> Self {
        self.height = v;
        self
    }

    pub fn fullscreen(mut self, v: bool) -> Self {
        self.fullscreen = v;
        self
    }

    pub fn vsync(mut self, v: bool) -> Self {
        self.vsync = v;
        self
    }

    pub fn refresh_on_event(mut self, v: bool) -> Self {
        self.refresh_on_event = v;
        self
    }

    pub fn depth_test(mut self, v: bool) -> Self {
        self.depth_test = v;
        self
    }

    pub fn color(mut self, v: impl Into<[f32; 3]>) -> Self {
        self.color = v.into();
        self
    }

    pub fn backend(mut self, v: GlowBackendConfig) -> Self {
        self.backend = v;
        self
    }

    pub fn batch(mut self, v: DrawBatchConfig) -> Self {
        self.batch = v;
        self
    }

    pub fn run<S: AppState>(self, mut state: S) -> Result<S, GlowError> {
        let App {
            title,
            mut width,
            mut height,
            fullscreen,
            vsync,
            refresh_on_event,
            depth_test,
            color,
            backend,
            batch,
        } = self;
        let fullscreen = if fullscreen {
            Some(Fullscreen::Borderless(None))
        } else {
            None
        };
        let mut event_loop = EventLoop::new();
        let window_builder = WindowBuilder::new()
            .with_title(title.as_str())
            .with_inner_size(LogicalSize::new(width, height))
            .with_fullscreen(fullscreen);
        let context_wrapper = unsafe {
            ContextBuilder::new()
                .with_vsync(vsync)
                .with_double_buffer(Some(true))
                .with_depth_buffer(24)
                .with_hardware_acceleration(Some(true))
                .build_windowed(window_builder, &event_loop)
                .map_err(|error| GlowError::Context(error.to_string()))?
                .make_current()
                .map_err(|(_, error)| GlowError::Context(error.to_string()))?
        };
        let context = unsafe {
            Context::from_loader_function(|name| context_wrapper.get_proc_address(name) as *const _)
        };
        let mut batch = DrawBatch::with_config(GlowBackend::new(context, backend), batch);
        state.on_init(&mut batch);
        let [r, g, b] = color;
        let mut running = true;
        while running {
            event_loop.run_return(|event, _, control_flow| {
                *control_flow = if refresh_on_event {
                    ControlFlow::Wait
                } else {
                    ControlFlow::Poll
                };
                match &event {
                    Event::MainEventsCleared => {
                        unsafe {
                            let context = batch.backend().context();
                            context.viewport(0, 0, width as _, height as _);
                            if depth_test {
                                context.enable(DEPTH_TEST);
                            } else {
                                context.disable(DEPTH_TEST);
                            }
                            context.clear_color(r, g, b, 1.0);
                            context.clear(COLOR_BUFFER_BIT | DEPTH_BUFFER_BIT);
                        }
                        state.on_redraw(&mut batch, width, height);
                        if let Err(error) = context_wrapper.swap_buffers() {
                            log::error!("Could not swap buffers: {error}");
                        }
                        *control_flow = ControlFlow::Exit;
                    }
                    Event::WindowEvent { event, .. } => match event {
                        WindowEvent::Resized(physical_size) => {
                            context_wrapper.resize(*physical_size);
                            width = physical_size.width;
                            height = physical_size.height;
                        }
                        WindowEvent::CloseRequested => {
                            running = false;
                        }
                        _ => {}
                    },
                    _ => {}
                }
                if !state.on_event(event) {
                    running = false;
                }
            });
        }
        // release device resources while the context is still current
        drop(batch);
        Ok(state)
    }
}
