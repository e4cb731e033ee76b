//! Error types for the rig runtime core.
//!
//! Per-frame paths (task update, marshaling, render sync, junction updates) never
//! surface these; they log and degrade to a no-op. `RigError` is returned from
//! setup and lookup surfaces only.

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RigError {
    /// Native handle, moc bytes or revived moc unavailable.
    #[error("uninitialized resource: {what}")]
    UninitializedResource { what: String },

    /// The mask tile pool cannot satisfy a request.
    #[error("mask tile pool exhausted: requested {requested}, free {free}")]
    TilePoolExhausted { requested: usize, free: usize },

    #[error("unknown parameter: {id}")]
    UnknownParameter { id: String },

    #[error("unknown part: {id}")]
    UnknownPart { id: String },

    #[error("unknown drawable: {index}")]
    UnknownDrawable { index: usize },

    #[error("invalid mask atlas config: {reason}")]
    InvalidMaskConfig { reason: String },
}

impl RigError {
    pub fn uninitialized(what: impl Into<String>) -> Self {
        Self::UninitializedResource { what: what.into() }
    }

    /// Whether the frame loop can keep running after this error.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidMaskConfig { .. })
    }

    /// Stable category string for logging.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::UninitializedResource { .. } => "resource",
            Self::TilePoolExhausted { .. } => "allocation",
            Self::UnknownParameter { .. } | Self::UnknownPart { .. } | Self::UnknownDrawable { .. } => {
                "lookup"
            }
            Self::InvalidMaskConfig { .. } => "config",
        }
    }
}

pub type RigResult<T> = Result<T, RigError>;
