//! # Photon Core Types
//!
//! Identifier types, the canonical operation wire format, and the capability
//! tokens shared across every hub component.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a component
//!   boundary is defined here, once.
//! - **No process-wide statics**: capability tokens and identifiers are
//!   plain values passed explicitly; nothing here is a singleton.

pub mod authority;
pub mod clock;
pub mod constants;
pub mod ids;
pub mod wire;

pub use authority::*;
pub use clock::*;
pub use constants::*;
pub use ids::*;
pub use wire::*;
