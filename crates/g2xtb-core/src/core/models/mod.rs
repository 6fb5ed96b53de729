//! # Core Models Module
//!
//! Plain data exchanged between the codecs and the engine.
//!
//! - [`request`] - the geometry and calculation request read from the driver
//! - [`result`] - the energy, gradient and properties recovered from xtb
//!
//! Both are owned values: nothing in them aliases buffers handed to the native
//! library.

pub mod request;
pub mod result;
