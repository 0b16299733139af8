#[cfg(not(target_arch = "wasm32"))]
pub mod app;
pub mod graphics;
pub mod renderer;

pub mod prelude {
    #[cfg(not(target_arch = "wasm32"))]
    pub use crate::app::*;
    pub use crate::{graphics::*, renderer::*};
}
