pub mod config;
pub mod error;
pub mod gpu;
pub mod host;
pub mod media;
pub mod orientation;
pub mod processing;
pub mod render {
    pub mod filters;
    pub mod renderer;
    pub mod session;
    pub mod transform;
}
pub mod viewer;

pub use error::{Error, Result};
