pub use imdraw_core as core;
#[cfg(feature = "glow")]
pub use imdraw_glow as glow;

pub mod prelude {
    pub use imdraw_core::prelude::*;
    #[cfg(feature = "glow")]
    pub use imdraw_glow::prelude::*;
}
