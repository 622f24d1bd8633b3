pub mod config;
pub mod error;
pub mod geometry;
pub mod palette;
pub mod renderer;
pub mod sprite;
pub mod zoom;

pub use config::GfxConfig;
pub use error::{DecodeError, FontError, GfxError};
pub use renderer::GfxContext;
pub use renderer::registry::ImageHandle;
