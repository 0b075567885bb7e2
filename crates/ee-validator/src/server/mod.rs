//! Localhost validation service
//!
//! The browser-facing agent posts generated code here before injecting it.
//! Uses axum for routing; CORS is permissive because the caller is a local
//! tool, not a web origin we control.

pub mod handlers;
pub mod routing;
pub mod startup;
pub mod types;
