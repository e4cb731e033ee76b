//! Shared mask atlas: tile allocation, per-group transforms and render bindings.

mod atlas;
mod controller;
mod junction;
mod pool;
mod tile;

pub use atlas::MaskAtlas;
pub use controller::MaskController;
pub use junction::{MaskBinding, MaskJunction};
pub use pool::MaskTilePool;
pub use tile::{MaskTile, MaskTransform};
