//! # Workflows Module
//!
//! High-level entry points that drive a complete external-program cycle.
//!
//! - **External Workflow** ([`external`]) - reads the driver's request file,
//!   runs the calculation through the engine, writes the message log and the
//!   response file.

pub mod external;
