//! groupgate web server.
//!
//! Signs users in through OpenID Connect, derives their roles from group
//! membership, and enforces role requirements on protected routes.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
