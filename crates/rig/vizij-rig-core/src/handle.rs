//! Owned native model handle.

use std::fmt;

use crate::error::{RigError, RigResult};
use crate::moc::{MocAsset, MocRef};
use crate::native::NativeModel;

/// One native model instance plus the moc reference keeping its asset alive.
///
/// Field order matters: the model drops before the moc reference.
pub struct NativeHandle {
    model: Box<dyn NativeModel>,
    moc: MocRef,
    updates: u64,
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("moc", &self.moc.asset().name())
            .field("parameters", &self.model.parameter_count())
            .field("parts", &self.model.part_count())
            .field("drawables", &self.model.drawable_count())
            .field("updates", &self.updates)
            .finish()
    }
}

impl NativeHandle {
    /// Acquire a reference on `moc` and instantiate a model from it.
    pub fn create(moc: &MocAsset) -> RigResult<Self> {
        let moc_ref = moc
            .acquire()
            .ok_or_else(|| RigError::uninitialized(format!("revived moc '{}'", moc.name())))?;
        let model = moc_ref
            .instantiate()
            .ok_or_else(|| RigError::uninitialized(format!("model instance of '{}'", moc.name())))?;
        Ok(Self {
            model,
            moc: moc_ref,
            updates: 0,
        })
    }

    #[inline]
    pub fn model(&self) -> &dyn NativeModel {
        self.model.as_ref()
    }

    #[inline]
    pub fn model_mut(&mut self) -> &mut dyn NativeModel {
        self.model.as_mut()
    }

    pub fn moc(&self) -> &MocAsset {
        self.moc.asset()
    }

    /// Run the native solver once.
    pub fn update(&mut self) {
        self.model.update();
        self.updates += 1;
    }

    /// Number of completed native updates on this instance.
    #[inline]
    pub fn update_count(&self) -> u64 {
        self.updates
    }

    #[inline]
    pub fn has_updated(&self) -> bool {
        self.updates > 0
    }
}
