//! Core types and codec for prefstore
//!
//! This crate defines the foundational pieces shared by every backend:
//! - Composite value types: Vec2/Vec3/Vec4, Quat, Color, Rect
//! - PrefValue: the codec trait mapping typed values to string cells
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod types;

pub use codec::{PrefValue, COMPONENT_SEPARATOR};
pub use error::{Error, Result};
pub use types::{Color, Quat, Rect, Vec2, Vec3, Vec4};
