//! Earth Agent: natural-language prompts to Google Earth Engine code.
//!
//! The agent fetches the public dataset catalog, narrows it with a keyword
//! matcher, asks a chat model to recommend datasets and write code, extracts
//! the JavaScript from the reply, and can drive a Chromium tab to inject the
//! code into the Earth Engine Code Editor and press Run.

pub mod browser;
pub mod catalog;
pub mod codegen;
pub mod commands;
pub mod config;
pub mod extract;
pub mod inject;
pub mod llm;
pub mod matcher;
pub mod pipeline;
pub mod poll;
pub mod recommend;
pub mod run_trigger;
pub mod settings;
pub mod validation;

pub use config::AgentConfig;
pub use extract::extract;
pub use pipeline::{deploy, AgentError, AgentOutput, DeployReport, EarthAgent, ProgressSink, Stage};
