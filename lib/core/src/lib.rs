//! Core domain types and utilities for groupgate.
//!
//! This crate provides the identifier types shared by the access-control
//! and membership crates, along with the rootcause-based `Result` alias.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{GroupId, ParseIdError, RoleName};
