//! Batch module containing collection scheduling and batch assembly

pub mod builder;
pub mod schedule;

pub use builder::*;
pub use schedule::*;
