//! Shared value types used across the orchestration workspace.
//!
//! Kept deliberately small: anything with real behavior lives in the crate
//! that owns it. This crate only holds the handful of types that cross
//! crate boundaries unchanged.

mod device;
mod geometry;
mod tier;
mod usage;

pub use device::{DeviceInfo, DeviceState, DeviceType};
pub use geometry::BoundingBox;
pub use tier::ProviderTier;
pub use usage::TokenUsage;
