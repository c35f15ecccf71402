#![forbid(unsafe_code)]

pub mod ids;
pub mod model;
mod temporal;
mod version;

pub use temporal::*;
pub use version::*;

#[cfg(test)]
mod tests;
