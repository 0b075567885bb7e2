//! Put code into the Earth Engine editor.
//!
//! The editor's internals are not a stable API, so several approaches are
//! tried in a fixed order. Each is a self-contained script that receives the
//! code as its only argument and answers `{success, message}`.

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::browser::{js_literal, BrowserError, PageDriver};

#[derive(Error, Debug)]
pub enum InjectionError {
  #[error("No code to inject")]
  EmptyCode,

  #[error("Failed to inject code. Try copying and pasting manually. ({})", summarize(.attempts))]
  AllStrategiesFailed { attempts: Vec<InjectionAttempt> },

  #[error(transparent)]
  Browser(#[from] BrowserError),
}

fn summarize(attempts: &[InjectionAttempt]) -> String {
  attempts.iter().map(|a| format!("{}: {}", a.strategy, a.message)).collect::<Vec<_>>().join("; ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionAttempt {
  pub strategy: &'static str,
  pub success: bool,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionReport {
  /// Strategy that succeeded
  pub strategy: &'static str,
  pub message: String,
  /// Every attempt in order, the successful one last
  pub attempts: Vec<InjectionAttempt>,
}

/// A named injection approach; `body` runs with `code` in scope
#[derive(Debug, Clone, Copy)]
pub struct InjectionStrategy {
  pub name: &'static str,
  pub body: &'static str,
}

impl InjectionStrategy {
  pub fn script(&self, code: &str) -> Result<String, BrowserError> {
    Ok(format!(
      "((code) => {{ try {{ {body} }} catch (error) {{ return {{success: false, message: String(error)}}; }} }})({literal})",
      body = self.body,
      literal = js_literal(&code)?
    ))
  }
}

pub const STRATEGIES: [InjectionStrategy; 5] = [
  InjectionStrategy {
    name: "code-api",
    body: r#"
      if (window.Code && typeof window.Code.setCode === 'function') {
        window.Code.setCode(code);
        return {success: true, message: 'Code injected via Code.setCode'};
      }
      return {success: false, message: 'Code.setCode not available'};
    "#,
  },
  InjectionStrategy {
    name: "ace-api",
    body: r#"
      const element = document.querySelector('.ace_editor');
      if (!element) return {success: false, message: 'Could not find ACE editor'};
      if (!window.ace) return {success: false, message: 'ACE API not available'};
      const editor = window.ace.edit(element);
      editor.setValue(code);
      editor.clearSelection();
      return {success: true, message: 'Code injected via ACE API'};
    "#,
  },
  InjectionStrategy {
    name: "codemirror",
    body: r#"
      const legacy = document.querySelector('.CodeMirror');
      if (legacy && legacy.CodeMirror) {
        legacy.CodeMirror.setValue(code);
        return {success: true, message: 'Code injected via CodeMirror'};
      }
      const content = document.querySelector('.cm-content');
      const view = content && content.cmView && content.cmView.view;
      if (view) {
        view.dispatch({changes: {from: 0, to: view.state.doc.length, insert: code}});
        return {success: true, message: 'Code injected via CodeMirror view'};
      }
      return {success: false, message: 'No CodeMirror instance found'};
    "#,
  },
  InjectionStrategy {
    name: "text-input-paste",
    body: r#"
      const input = document.querySelector('.ace_text-input') || document.querySelector('textarea');
      if (!input) return {success: false, message: 'No text input found'};
      input.focus();
      document.execCommand('selectAll', false, null);
      if (document.execCommand('insertText', false, code)) {
        return {success: true, message: 'Code injected via text input'};
      }
      const data = new DataTransfer();
      data.setData('text/plain', code);
      input.dispatchEvent(new ClipboardEvent('paste', {clipboardData: data, bubbles: true, cancelable: true}));
      return {success: true, message: 'Code pasted into text input'};
    "#,
  },
  InjectionStrategy {
    name: "dom-replace",
    body: r#"
      const layer = document.querySelector('.ace_text-layer');
      if (!layer) return {success: false, message: 'No editor text layer found'};
      layer.innerHTML = '';
      for (const line of code.split('\n')) {
        const div = document.createElement('div');
        div.className = 'ace_line';
        div.textContent = line || ' ';
        layer.appendChild(div);
      }
      return {success: true, message: 'Code injected via DOM'};
    "#,
  },
];

#[derive(Deserialize)]
struct ProbeResult {
  #[serde(default)]
  success: bool,
  #[serde(default)]
  message: String,
}

async fn attempt(page: &dyn PageDriver, strategy: &InjectionStrategy, code: &str) -> InjectionAttempt {
  let outcome = match strategy.script(code) {
    Ok(script) => page.evaluate(&script).await,
    Err(e) => Err(e),
  };

  let (success, message) = match outcome {
    Ok(value) => match serde_json::from_value::<ProbeResult>(value) {
      Ok(result) => (result.success, result.message),
      Err(e) => (false, format!("unexpected script result: {e}")),
    },
    Err(e) => (false, e.to_string()),
  };

  debug!(strategy = strategy.name, success, %message, "injection attempt");
  InjectionAttempt { strategy: strategy.name, success, message }
}

/// Inject `code` with the first strategy that works
pub async fn inject(page: &dyn PageDriver, code: &str) -> Result<InjectionReport, InjectionError> {
  if code.trim().is_empty() {
    return Err(InjectionError::EmptyCode);
  }

  let mut attempts = Vec::with_capacity(STRATEGIES.len());
  for strategy in &STRATEGIES {
    let result = attempt(page, strategy, code).await;
    let succeeded = result.success;
    let message = result.message.clone();
    attempts.push(result);

    if succeeded {
      info!(strategy = strategy.name, "code injected");
      return Ok(InjectionReport { strategy: strategy.name, message, attempts });
    }
  }

  Err(InjectionError::AllStrategiesFailed { attempts })
}
