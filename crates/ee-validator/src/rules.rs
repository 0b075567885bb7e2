//! Heuristic validation rules for generated Earth Engine JavaScript.

use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Source patterns of which at least one must appear in Earth Engine code
pub const EARTH_ENGINE_PATTERNS: [&str; 7] = [
  r"ee\.Image",
  r"ee\.FeatureCollection",
  r"ee\.Geometry",
  r"ee\.Reducer",
  r"Map\.addLayer",
  r"ee\.Filter",
  r"ee\.Date",
];

static JAVASCRIPT_SHAPE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(var|let|const|function|=|\(|\)|\{|\}|;)").expect("static regex"));

static EARTH_ENGINE: Lazy<Vec<Regex>> = Lazy::new(|| {
  EARTH_ENGINE_PATTERNS.iter().map(|p| Regex::new(p).expect("static regex")).collect()
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
  #[error("String doesn't appear to contain JavaScript code")]
  NotJavaScript,

  #[error("Code doesn't appear to be Earth Engine JavaScript")]
  NotEarthEngine,

  #[error("Invalid JavaScript syntax: {message}")]
  Syntax { message: String },
}

impl RuleViolation {
  pub fn syntax(message: impl Into<String>) -> Self {
    Self::Syntax { message: message.into() }
  }
}

/// Cheap regex presence checks: looks like JavaScript, mentions Earth Engine
pub fn check_shape(code: &str) -> Result<(), RuleViolation> {
  if !JAVASCRIPT_SHAPE.is_match(code) {
    return Err(RuleViolation::NotJavaScript);
  }

  if !EARTH_ENGINE.iter().any(|pattern| pattern.is_match(code)) {
    return Err(RuleViolation::NotEarthEngine);
  }

  Ok(())
}

/// Validator combining the shape checks with an optional `node --check` pass
#[derive(Debug, Clone)]
pub struct Validator {
  syntax_check: bool,
  node_binary: String,
}

impl Default for Validator {
  fn default() -> Self {
    Self { syntax_check: true, node_binary: "node".to_string() }
  }
}

impl Validator {
  pub fn new(syntax_check: bool) -> Self {
    Self { syntax_check, ..Self::default() }
  }

  pub fn with_node_binary(mut self, node_binary: impl Into<String>) -> Self {
    self.node_binary = node_binary.into();
    self
  }

  pub fn syntax_check_enabled(&self) -> bool {
    self.syntax_check
  }

  /// Validate `code`, returning it unchanged when every rule passes
  pub async fn validate(&self, code: &str) -> Result<String, RuleViolation> {
    check_shape(code)?;

    if self.syntax_check {
      self.check_syntax(code).await?;
    }

    Ok(code.to_string())
  }

  /// Runs `node --check` on a temporary copy of the code. A missing node
  /// binary or an unusable temp dir skips the check instead of failing it.
  async fn check_syntax(&self, code: &str) -> Result<(), RuleViolation> {
    let file = match write_temp_script(code) {
      Ok(file) => file,
      Err(e) => {
        debug!(error = %e, "skipping syntax check, temp file unavailable");
        return Ok(());
      }
    };

    let output = Command::new(&self.node_binary)
      .arg("--check")
      .arg(file.path())
      .stdin(Stdio::null())
      .output()
      .await;

    match output {
      Ok(output) if output.status.success() => Ok(()),
      Ok(output) => {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(RuleViolation::syntax(first_syntax_line(&stderr)))
      }
      Err(e) => {
        debug!(error = %e, node = %self.node_binary, "skipping syntax check, node unavailable");
        Ok(())
      }
    }
  }
}

fn write_temp_script(code: &str) -> std::io::Result<tempfile::NamedTempFile> {
  let mut file = tempfile::Builder::new().suffix(".js").tempfile()?;
  file.write_all(code.as_bytes())?;
  file.flush()?;
  Ok(file)
}

// node prints the file path and a caret diagram before the actual error line
fn first_syntax_line(stderr: &str) -> String {
  stderr
    .lines()
    .find(|line| line.contains("SyntaxError"))
    .unwrap_or_else(|| stderr.lines().find(|l| !l.trim().is_empty()).unwrap_or("unknown error"))
    .trim()
    .to_string()
}
