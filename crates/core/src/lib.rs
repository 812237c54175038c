//! Domain core for the AnimeFactory backend: outbound request signing, the
//! fixed generation pipeline, and the subscription price mapping.
//!
//! This crate performs no I/O beyond randomness and clock reads so the API
//! layer, tests, and any future tooling can all share it.

pub mod error;
pub mod pipeline;
pub mod pricing;
pub mod signing;
pub mod types;
