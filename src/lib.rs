//! Gridded coverage windowing, see the [`coverage`] crate.

pub use coverage::*;
