//! `wrt-types` – shared vocabulary of the with-respect-to workspace.
//!
//! Holds the error type every crate reports through and the flat
//! [`FrameRecord`] form that storage adapters read and write.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the implicit root frame when no other name is configured.
pub const DEFAULT_ROOT_FRAME: &str = "world";

/// Tolerance used for the bottom-row and rotation-validity checks.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Number of floats in the storage layout of a pose: a row-major 3x3
/// rotation followed by the translation vector.
pub const POSE_FLOATS: usize = 12;

/// One frame in its storage form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub name: String,
    /// `None` only for the root frame.
    pub parent: Option<String>,
    /// `[r00, r01, r02, r10, r11, r12, r20, r21, r22, tx, ty, tz]`
    pub pose: [f64; POSE_FLOATS],
}

/// Boxed error produced by a storage adapter.
pub type StorageSource = Box<dyn std::error::Error + Send + Sync>;

/// Error kinds surfaced by frame-graph queries and mutations.
#[derive(Error, Debug)]
pub enum WrtError {
    #[error("Unknown frame: {0}")]
    UnknownFrame(String),

    #[error("Invalid transform: {0}")]
    InvalidTransform(String),

    /// Only surfaced when a reparent cannot be repaired (root or self-parent).
    #[error("Cycle detected: cannot place '{subject}' under '{parent}'")]
    CycleDetected { subject: String, parent: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Corrupt world: {0}")]
    CorruptWorld(String),

    #[error("Storage error: {0}")]
    Storage(#[source] StorageSource),
}

impl WrtError {
    /// Shorthand for [`WrtError::UnknownFrame`].
    pub fn unknown(name: &str) -> Self {
        WrtError::UnknownFrame(name.to_string())
    }

    /// Wrap any adapter error as [`WrtError::Storage`].
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        WrtError::Storage(Box::new(err))
    }
}
