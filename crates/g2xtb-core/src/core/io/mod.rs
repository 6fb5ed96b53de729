//! Provides the text protocol spoken by the Gaussian `External` keyword.
//!
//! The driver writes a free-format request (`.EIn`) describing the geometry
//! and reads back a fixed-width response (`.EOu`) whose consumers locate
//! sections by exact line counts. Both directions are implemented for both
//! files behind the [`traits::RecordFile`] interface.

pub mod error;
pub mod request;
pub mod response;
pub mod traits;
