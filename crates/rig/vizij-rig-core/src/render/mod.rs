//! Renderer-facing state: double-buffered meshes, visibility, sorting and blend colors.

mod controller;
mod sync;

pub use controller::RenderController;
pub use sync::{MeshBuffer, RenderSync, SwapInfo};
