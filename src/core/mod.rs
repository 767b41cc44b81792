//! Core domain models
//!
//! This module defines the fundamental data structures that represent
//! pipelines, steps, the persisted execution state, and the registries
//! they are resolved from.

pub mod context;
pub mod pipeline;
pub mod registry;
pub mod state;
pub mod step;

pub use context::*;
pub use pipeline::*;
pub use registry::*;
pub use state::*;
pub use step::*;
