//! HTTP route handlers

pub mod registry;
pub mod tokens;
pub mod webhook;
