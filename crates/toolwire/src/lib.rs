//! Language-model agents wired to everyday web services.
//!
//! Every demo of the `toolwire` binary is a [`Session`] method returning an
//! [`AgentBuilder`](toolwire_core::AgentBuilder) with its tools attached.
//! The tools, the retrieval pipeline and the spreadsheet reader can also be
//! used on their own.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod config;
#[cfg(feature = "cli")]
pub mod console;
pub mod rag;
mod session;
pub mod sheet;
pub mod tools;

pub use session::{Session, SessionError};

/// Re-exports of [`toolwire_core`] crate.
pub mod core {
    pub use toolwire_core::*;
}
