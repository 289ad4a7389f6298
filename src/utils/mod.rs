//! Shared helpers

pub mod string;
pub mod validation;
