//! HTTP server for the translation pipeline.
//!
//! Built only with the `server` feature.

mod server;

pub use server::*;
