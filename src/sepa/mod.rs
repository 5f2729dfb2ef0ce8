//! SEPA message formats

pub mod pain008;

pub use pain008::*;
