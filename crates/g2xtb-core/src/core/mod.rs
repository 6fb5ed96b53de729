//! # Core Module
//!
//! Data models, numeric layout helpers and the text protocol spoken by the
//! Gaussian `External` keyword.
//!
//! - **Models** ([`models`]) - the request read from the driver and the result returned by xtb
//! - **Layout** ([`layout`]) - row-major/column-major reshaping and Fortran `Dw.d` fields
//! - **File I/O** ([`io`]) - the request (`.EIn`) and response (`.EOu`) codecs

pub mod io;
pub mod layout;
pub mod models;
