//! Earth Engine code validation
//!
//! The rule set lives in [`rules`] so that the `earth-agent` CLI can apply
//! it locally when the validation service is not running. The [`server`]
//! module exposes the same rules over HTTP on localhost.

pub mod rules;
pub mod server;

pub use rules::{check_shape, RuleViolation, Validator, EARTH_ENGINE_PATTERNS};
