//! # g2xtb Core Library
//!
//! Bridges the Gaussian external-program protocol to the xtb shared library.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer layout:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`CalculationRequest`,
//!   `CalculationResult`), numeric layout utilities and the fixed-format
//!   request/response codecs.
//!
//! - **[`engine`]: The Foreign Boundary.** The `#[repr(C)]` options record, the
//!   scratch file used as the native report channel, the dynamically loaded
//!   entry point and the client that marshals data across the call.
//!
//! - **[`workflows`]: The Public API.** One complete external-program cycle:
//!   read the request, compute, write the message log and the response.

pub mod core;
pub mod engine;
pub mod workflows;
