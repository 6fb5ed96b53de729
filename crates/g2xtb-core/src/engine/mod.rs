pub mod client;
pub mod error;
pub mod native;
pub mod options;
pub mod scratch;
