//! Domain model structs.

pub mod account;
