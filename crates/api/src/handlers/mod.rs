pub mod billing;
pub mod generation;
pub mod webhook;
