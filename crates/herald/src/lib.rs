//! Terminal status output shared by the Earth Agent binaries.
//!
//! Everything here writes to stderr so that stdout stays reserved for
//! generated code, which is what users pipe into files or other tools.
//!
//! - Levelled lines: `info()`, `warn()`, `error()`, `debug()`, `success()`
//! - Pipeline progress: `step()` prints `[2/4]`-style stage lines
//! - Reports: `section()` prints a titled block, `fallback()` a boxed
//!   manual-action notice

use chrono::Local;
use colored::*;

/// Core output function; every line of `message` is written separately
pub fn log(message: &str) {
  for line in message.lines() {
    eprintln!("{line}");
  }
}

fn format_prefix(color: Color, prefix: &str) -> String {
  format!("[{}]{:<width$}", prefix.color(color).bold(), "", width = 7 - prefix.len() - 2)
}

fn prefixed(color: Color, prefix: &str, message: &str) {
  let prefix = format_prefix(color, prefix);
  for line in message.lines() {
    log(&format!("{prefix} {line}"));
  }
}

/// Create a rule line of the specified length and character
pub fn rule(length: usize, char: char) -> String {
  char.to_string().repeat(length)
}

pub fn info(message: &str) {
  prefixed(Color::Blue, "info", message);
}

pub fn warn(message: &str) {
  prefixed(Color::Yellow, "warn", message);
}

pub fn error(message: &str) {
  prefixed(Color::Red, "error", message);
}

pub fn debug(message: &str) {
  prefixed(Color::Magenta, "debug", message);
}

pub fn success(message: &str) {
  prefixed(Color::Green, "sccs", message);
}

/// Format a pipeline stage line such as `[2/4] 12:04:55 Analyzing datasets`
pub fn format_step(index: usize, total: usize, message: &str) -> String {
  let timestamp = Local::now().format("%H:%M:%S").to_string();
  format!("[{}] {} {}", format!("{index}/{total}").cyan().bold(), timestamp.dimmed(), message)
}

/// Pipeline stage progress
pub fn step(index: usize, total: usize, message: &str) {
  log(&format_step(index, total, message));
}

/// Print a titled block of free text, e.g. the dataset recommendation report
pub fn section(title: &str, body: &str) {
  log(&format!("{}", title.bold().underline()));
  log(body);
  log("");
}

/// Format the boxed manual-action notice printed by [`fallback`]
pub fn format_fallback(message: &str) -> String {
  let border = rule(60, '*').bright_yellow().to_string();
  let mut lines = vec![border.clone()];
  lines.extend(message.lines().map(|line| line.bright_yellow().bold().to_string()));
  lines.push(border);
  lines.join("\n")
}

/// Boxed notice for when automation gave up and the user has to act
pub fn fallback(message: &str) {
  log(&format_fallback(message));
}

/// Macros for coverage-excluded logging - these expand with LCOV_EXCL_LINE at call sites
#[macro_export]
macro_rules! info {
  ($msg:expr) => {
    $crate::info($msg); // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! warn {
  ($msg:expr) => {
    $crate::warn($msg); // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! error {
  ($msg:expr) => {
    $crate::error($msg); // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! debug {
  ($msg:expr) => {
    $crate::debug($msg); // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! success {
  ($msg:expr) => {
    $crate::success($msg); // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! step {
  ($index:expr, $total:expr, $msg:expr) => {
    $crate::step($index, $total, $msg); // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! fallback {
  ($msg:expr) => {
    $crate::fallback($msg); // LCOV_EXCL_LINE
  };
}
