//! Identifiers and simple allocators.

use serde::{Deserialize, Serialize};

/// Engine frame counter value used to dedupe ticks within one logical frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct FrameKey(pub u64);

/// Completed native execution of one model task. Zero means "never executed".
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub u64);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u32);

/// A registered user of the shared mask atlas.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub u32);

/// Monotonic allocator for listener and atlas source ids.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_listener: u32,
    next_source: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener = self.next_listener.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_source(&mut self) -> SourceId {
        let id = SourceId(self.next_source);
        self.next_source = self.next_source.wrapping_add(1);
        id
    }
}

impl ExecutionId {
    #[inline]
    pub fn next(self) -> Self {
        ExecutionId(self.0.wrapping_add(1))
    }
}
