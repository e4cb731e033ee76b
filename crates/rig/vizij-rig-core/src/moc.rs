//! Reference-counted compiled asset ("moc").
//!
//! A `MocAsset` keeps the raw bytes for its whole lifetime and revives the native
//! moc on the first acquire. Every model holds one [`MocRef`] guard; when the last
//! guard drops the native moc is freed, and a later acquire revives it again.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{RigError, RigResult};
use crate::native::{MocLoader, NativeModel, NativeMoc};

struct MocState {
    refs: usize,
    revived: Option<Arc<dyn NativeMoc>>,
}

struct MocShared {
    name: String,
    bytes: Arc<[u8]>,
    loader: Arc<dyn MocLoader>,
    state: Mutex<MocState>,
}

/// Shared handle to one compiled asset. Cloning shares the same reference count.
#[derive(Clone)]
pub struct MocAsset {
    shared: Arc<MocShared>,
}

impl fmt::Debug for MocAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MocAsset")
            .field("name", &self.shared.name)
            .field("bytes", &self.shared.bytes.len())
            .field("refs", &self.ref_count())
            .finish()
    }
}

impl MocAsset {
    /// Wrap compiled asset bytes. Empty bytes are an uninitialized resource.
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
        loader: Arc<dyn MocLoader>,
    ) -> RigResult<Self> {
        let name = name.into();
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(RigError::uninitialized(format!("moc bytes for '{name}'")));
        }
        Ok(Self {
            shared: Arc::new(MocShared {
                name,
                bytes,
                loader,
                state: Mutex::new(MocState {
                    refs: 0,
                    revived: None,
                }),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.shared.bytes
    }

    pub fn ref_count(&self) -> usize {
        self.shared.state.lock().refs
    }

    pub fn is_revived(&self) -> bool {
        self.shared.state.lock().revived.is_some()
    }

    /// Take one reference, reviving the native moc on the 0 -> 1 transition.
    /// Returns `None` (and leaves the count untouched) when revival fails.
    pub fn acquire(&self) -> Option<MocRef> {
        let mut state = self.shared.state.lock();
        let moc = match &state.revived {
            Some(moc) => Arc::clone(moc),
            None => match self.shared.loader.revive(&self.shared.bytes) {
                Some(moc) => {
                    log::debug!(target: "vizij_rig::moc", "revived moc '{}'", self.shared.name);
                    state.revived = Some(Arc::clone(&moc));
                    moc
                }
                None => {
                    log::error!(
                        target: "vizij_rig::moc",
                        "failed to revive moc '{}' ({} bytes)",
                        self.shared.name,
                        self.shared.bytes.len()
                    );
                    return None;
                }
            },
        };
        state.refs += 1;
        Some(MocRef {
            asset: self.clone(),
            moc,
        })
    }

    /// Drop one reference and return the remaining count. The count never goes
    /// negative: releasing at zero warns and stays at zero.
    pub(crate) fn release(&self) -> usize {
        let mut state = self.shared.state.lock();
        if state.refs == 0 {
            log::warn!(
                target: "vizij_rig::moc",
                "reference count underflow on moc '{}'; clamped to zero",
                self.shared.name
            );
            return 0;
        }
        state.refs -= 1;
        if state.refs == 0 && state.revived.take().is_some() {
            log::debug!(target: "vizij_rig::moc", "freed moc '{}'", self.shared.name);
        }
        state.refs
    }
}

/// RAII reference on a revived moc. Dropping it releases the reference.
pub struct MocRef {
    asset: MocAsset,
    moc: Arc<dyn NativeMoc>,
}

impl fmt::Debug for MocRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MocRef")
            .field("asset", &self.asset.name())
            .finish()
    }
}

impl MocRef {
    pub fn asset(&self) -> &MocAsset {
        &self.asset
    }

    pub fn instantiate(&self) -> Option<Box<dyn NativeModel>> {
        self.moc.instantiate()
    }
}

impl Drop for MocRef {
    fn drop(&mut self) {
        self.asset.release();
    }
}
