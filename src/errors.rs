//! Error Types
//!
//! This module defines the error types used throughout the renderer core.
//!
//! # Overview
//!
//! The main error type [`RenderError`] covers the four failure classes the
//! renderer distinguishes internally: configuration errors, resource
//! exhaustion, GPU driver errors, and programmer errors (invariant
//! violations). None of these unwind across a frame boundary — see
//! [`crate::scene3d`] for how each class is turned into a logged warning
//! plus a documented fallback at the public API boundary.
//!
//! # Usage
//!
//! ```rust,ignore
//! use scene3d::errors::{RenderError, Result};
//!
//! fn reserve(min_size: u64) -> Result<()> {
//!     if min_size == 0 {
//!         return Err(RenderError::InvalidConfiguration("zero-size reserve".into()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the renderer core.
///
/// Every variant is one of the four classes from the error-handling design:
/// configuration, resource-exhaustion, GPU-driver, or programmer error.
#[derive(Error, Debug)]
pub enum RenderError {
    // ========================================================================
    // Configuration errors
    // ========================================================================
    /// An enum value, slot index, or format was out of the accepted range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A texture slot name did not resolve to a uniform location in the
    /// compiled program.
    #[error("texture slot does not exist: {0}")]
    UnknownTextureSlot(&'static str),

    // ========================================================================
    // Resource-exhaustion errors
    // ========================================================================
    /// A buffer grow would exceed the GPU's reported limit.
    #[error("buffer grow to {requested} bytes exceeds device limit of {limit} bytes")]
    BufferLimitExceeded {
        /// Bytes requested.
        requested: u64,
        /// Device-reported maximum.
        limit: u64,
    },

    /// The shadow atlas has no free slot to allocate.
    #[error("shadow atlas exhausted: all {capacity} slots in use")]
    ShadowAtlasExhausted {
        /// Configured atlas capacity.
        capacity: u32,
    },

    /// GPU resource creation failed (e.g. adapter/device request).
    #[error("GPU resource creation failed: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    // ========================================================================
    // GPU driver errors
    // ========================================================================
    /// The wgpu device reported a validation or out-of-memory error for a
    /// guarded call; the originating operation name is preserved for logs.
    #[error("GPU driver error during {operation}: {message}")]
    DriverError {
        /// Name of the operation that triggered the error.
        operation: &'static str,
        /// Driver-provided message.
        message: String,
    },

    // ========================================================================
    // Programmer errors (invariant violations)
    // ========================================================================
    /// `map`/`mapRange` called without a matching `unmap`, or vice versa.
    #[error("buffer map/unmap invariant violated: {0}")]
    MapStateViolation(String),

    /// A handle referenced a resource that no longer exists (stale
    /// generation or already destroyed).
    #[error("stale or invalid handle")]
    StaleHandle,
}

/// Alias for `Result<T, RenderError>`.
///
/// Used internally between private helpers; no public frame-API entry
/// point returns this (see `src/scene3d.rs`'s module doc for the
/// propagation policy).
pub type Result<T> = std::result::Result<T, RenderError>;
