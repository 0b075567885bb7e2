use anyhow::Result;
use std::path::Path;

use super::read_input;
use crate::extract::extract_with_trace;

pub fn extract(path: Option<&Path>, trace: bool) -> Result<()> {
  let text = read_input(path)?;
  let extraction = extract_with_trace(&text);

  if trace {
    herald::debug!(&format!("strategies: {}", extraction.trace.join(" -> ")));
  }

  println!("{}", extraction.code);
  Ok(())
}
