//! Provider-neutral types shared by every model backend.
//!
//! The agent talks to language models only through the traits defined
//! here, so a demo can switch between a real OpenAI-compatible endpoint
//! and the scripted test provider without touching the agent loop.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod embedding;
mod error;
mod opaque;
mod provider;
mod request;
mod response;

pub use embedding::*;
pub use error::*;
pub use opaque::*;
pub use provider::*;
pub use request::*;
pub use response::*;
