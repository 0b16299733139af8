pub mod attributes;
pub mod batch;
pub mod config;
pub mod converter;
pub mod device;
pub mod memory;
pub mod normals;
pub mod staging;
pub mod topology;

pub mod prelude {
    pub use crate::{
        attributes::*, batch::*, config::*, converter::*, device::*, memory::*, normals::*,
        staging::*, topology::*,
    };
}
