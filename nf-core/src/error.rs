//! Error types for nf-core
//!
//! Re-exports the unified error type from the nf-error crate so downstream
//! code can use `nf_core::Result` directly.

pub use nf_error::{NotefanError, Result};
