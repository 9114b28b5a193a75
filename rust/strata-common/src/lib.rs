//! Core definitions (error taxonomy and shared result type), relied upon by all
//! strata-* crates.

pub mod error;
pub mod result;

pub use result::Result;
