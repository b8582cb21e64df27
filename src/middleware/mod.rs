//! Request-boundary layers

pub mod cors;
