//! Shared helpers for the integration tests.
//!
//! - Fixtures for settings and a workflow context rooted in a temp dir
//! - Scripted stand-ins for the prompter, the progress surface and discovery

pub mod fakes;
pub mod fixtures;

#[allow(unused_imports)]
pub use fakes::*;
#[allow(unused_imports)]
pub use fixtures::*;
