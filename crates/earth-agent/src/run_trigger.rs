//! Locate and press the editor's Run button.

use serde::Deserialize;
use tracing::{debug, info};

use crate::browser::{BrowserError, PageDriver};

/// Clicks the first matching Run button and reports `{success, message}`
pub const CLICK_RUN_SCRIPT: &str = r#"(() => {
  try {
    const button = document.querySelector('.goog-button.run-button')
      || document.querySelector('button[title="Run"]')
      || Array.from(document.querySelectorAll('button')).find((b) =>
        b.innerText === 'Run' || b.title === 'Run' || b.getAttribute('aria-label') === 'Run');
    if (!button) return {success: false, message: 'Run button not found'};
    button.click();
    return {success: true, message: 'Run button clicked'};
  } catch (error) {
    return {success: false, message: String(error)};
  }
})()"#;

/// True once the editor has rendered its Run button
pub const RUN_BUTTON_PRESENT_SCRIPT: &str =
  r#"!!(document.querySelector('.goog-button.run-button') || document.querySelector('button[title="Run"]'))"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
  Clicked,
  NotFound { message: String },
}

#[derive(Deserialize)]
struct ClickResult {
  #[serde(default)]
  success: bool,
  #[serde(default)]
  message: String,
}

pub async fn click_run(page: &dyn PageDriver) -> Result<RunOutcome, BrowserError> {
  let value = page.evaluate(CLICK_RUN_SCRIPT).await?;
  let result: ClickResult =
    serde_json::from_value(value).map_err(|e| BrowserError::Script(format!("unexpected run result: {e}")))?;

  if result.success {
    info!("Run button clicked");
    Ok(RunOutcome::Clicked)
  } else {
    debug!(message = %result.message, "Run button not clicked");
    Ok(RunOutcome::NotFound { message: result.message })
  }
}

pub async fn run_button_present(page: &dyn PageDriver) -> Result<bool, BrowserError> {
  let value = page.evaluate(RUN_BUTTON_PRESENT_SCRIPT).await?;
  Ok(value.as_bool().unwrap_or(false))
}
