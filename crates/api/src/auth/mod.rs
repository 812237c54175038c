//! Identity verification for inbound API requests.

pub mod firebase;
