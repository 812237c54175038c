//! HTTP client for the TensorArt job API.
//!
//! Every request is signed with the workload's RSA key before it leaves the
//! process; the exact bytes that were signed are the bytes that are sent.

pub mod client;

pub use client::{TensorArtClient, TensorArtError};
