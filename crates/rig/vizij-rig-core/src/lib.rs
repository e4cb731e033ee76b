//! Vizij Rig Core (engine-agnostic)
//!
//! Drives an opaque native deformation solver once per frame, mirrors its flat
//! arrays into managed parameter/part/drawable entities, decodes per-drawable dirty
//! flags, and publishes only complete executions to the renderer through
//! double-buffered meshes. Masking drawables share one tiled atlas.
//!
//! Adapters (Bevy, tests) provide the solver through the traits in [`native`].

pub mod config;
pub mod dispatch;
pub mod entities;
pub mod error;
pub mod handle;
pub mod ids;
pub mod marshal;
pub mod mask;
pub mod moc;
pub mod native;
pub mod orchestrator;
pub mod render;
pub mod rig;
pub mod snapshot;
pub mod task;

#[cfg(test)]
mod test_support;

// Re-exports for consumers (adapters)
pub use config::{DispatchMode, MaskAtlasConfig, RendererConfig, RigConfig, SortingMode, UpdateDriver};
pub use dispatch::{dispatcher_for, DeferredQueue, InlineDispatcher, TaskDispatcher, WorkerDispatcher};
pub use entities::{DrawableConstants, DrawableEntity, EntityMirrors, ParameterEntity, PartEntity};
pub use error::{RigError, RigResult};
pub use handle::NativeHandle;
pub use ids::{ExecutionId, FrameKey, ListenerId, SourceId};
pub use marshal::ArrayMarshaler;
pub use mask::{MaskAtlas, MaskBinding, MaskController, MaskJunction, MaskTile, MaskTilePool, MaskTransform};
pub use moc::{MocAsset, MocRef};
pub use native::{BlendMode, ConstantFlags, MocLoader, NativeModel, NativeMoc};
pub use orchestrator::{DrawableDataListener, ModelOrchestrator, TickOutcome};
pub use render::{MeshBuffer, RenderController, RenderSync, SwapInfo};
pub use rig::{Rig, TickReport};
pub use snapshot::{DrawableSnapshots, DynamicDrawableSnapshot};
pub use task::{ModelTask, SharedTask, TaskState};
