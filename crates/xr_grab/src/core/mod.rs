//! # Core Module
//!
//! Shared configuration for the grab pipeline.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration for every pipeline stage

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{
    AttachConfig,
    AxisSmoothing,
    Config,
    ConfigError,
    GrabConfig,
    SmoothingParameters,
    ThrowConfig,
    TrackedAxes,
    VelocityTrackingConfig,
};
