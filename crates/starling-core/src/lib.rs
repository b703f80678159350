//! Starling Core
//!
//! Shared utilities for the starling sprite renderer: the [`Color`] value
//! type used for sprite tints, and logging setup.

pub mod color;
pub mod logging;

pub use color::Color;
