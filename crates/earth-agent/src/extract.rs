//! Pull runnable Earth Engine JavaScript out of free-form model output.
//!
//! Strategies are tried in order and the first one that produces something
//! wins. Structured answers (a JSON payload or a fenced block) are returned
//! as found. The heuristic strategies return their input or a strictly
//! shorter string, so [`extract`] re-runs the chain until the text stops
//! changing. Code that reads as code all the way through is left alone by
//! `settled-code`, which keeps a second extraction from changing the result.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// One named heuristic in the extraction chain
#[derive(Clone, Copy)]
pub struct Strategy {
  pub name: &'static str,
  pub apply: fn(&str) -> Option<String>,
  /// An answer from this strategy is returned without another pass
  pub conclusive: bool,
}

impl std::fmt::Debug for Strategy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name)
  }
}

pub static STRATEGIES: [Strategy; 8] = [
  Strategy { name: "json-payload", apply: json_payload, conclusive: true },
  Strategy { name: "tagged-fence", apply: tagged_fence, conclusive: true },
  Strategy { name: "any-fence", apply: any_fence, conclusive: true },
  Strategy { name: "settled-code", apply: settled_code, conclusive: true },
  Strategy { name: "ee-pattern", apply: ee_pattern, conclusive: false },
  Strategy { name: "ee-anchor", apply: ee_anchor, conclusive: false },
  Strategy { name: "line-scan", apply: line_scan, conclusive: false },
  Strategy { name: "passthrough", apply: passthrough, conclusive: true },
];

/// Result of [`extract_with_trace`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
  pub code: String,
  /// Strategy that answered on each pass
  pub trace: Vec<&'static str>,
}

/// Run the chain once; returns the answering strategy and its output
fn apply_chain(text: &str) -> (&'static Strategy, String) {
  for strategy in &STRATEGIES {
    if let Some(out) = (strategy.apply)(text) {
      debug_assert!(out.len() <= text.len(), "{} grew its input", strategy.name);
      return (strategy, out);
    }
  }
  (&STRATEGIES[STRATEGIES.len() - 1], text.to_string())
}

pub fn extract_with_trace(text: &str) -> Extraction {
  let mut current = text.to_string();
  let mut trace = Vec::new();

  if current.is_empty() {
    return Extraction { code: current, trace };
  }

  loop {
    let (strategy, next) = apply_chain(&current);
    trace.push(strategy.name);
    let stable = strategy.conclusive || next == current;
    current = next;
    if stable {
      break;
    }
  }

  Extraction { code: current, trace }
}

/// Best-effort JavaScript snippet from raw model text
pub fn extract(text: &str) -> String {
  extract_with_trace(text).code
}

#[derive(Deserialize)]
struct CodePayload {
  #[serde(rename = "type")]
  kind: Option<String>,
  code: String,
}

fn json_payload(text: &str) -> Option<String> {
  let payload: CodePayload = serde_json::from_str(text).ok()?;
  if matches!(payload.kind.as_deref(), Some(kind) if kind != "javascript_code") {
    return None;
  }
  (!payload.code.is_empty()).then_some(payload.code)
}

static TAGGED_FENCE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?s)```(?i:javascript|js)\b(.*?)```").expect("valid tagged fence regex"));

static ANY_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(.*?)```").expect("valid fence regex"));

static INFO_STRING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w+#.-]*$").expect("valid info string regex"));

fn tagged_fence(text: &str) -> Option<String> {
  let interior = TAGGED_FENCE.captures(text)?.get(1)?.as_str();
  Some(interior.trim().to_string())
}

fn any_fence(text: &str) -> Option<String> {
  let mut interior = ANY_FENCE.captures(text)?.get(1)?.as_str();

  if let Some((first, rest)) = interior.split_once('\n') {
    if INFO_STRING.is_match(first.trim()) {
      interior = rest;
    }
  }

  let interior = interior.trim();
  ["var ", "const ", "function ", "// ", "Map."]
    .iter()
    .any(|token| interior.contains(token))
    .then(|| interior.to_string())
}

static PROPERTY_LINE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r#"^[\w$'"]+\s*:\s*\S+,?$"#).expect("valid property line regex"));

const CODE_LINE_STARTS: [&str; 19] = [
  "//", "/*", "*", "}", "]", ")", "var ", "let ", "const ", "function", "return", "if ", "if(", "else", "for ",
  "for(", "while", "Map.", "ee.",
];

const CODE_LINE_ENDS: [char; 17] = [';', '{', '}', '(', ')', '[', ']', ',', '+', '-', '*', '/', '=', '&', '|', '?', '>'];

static ASSIGNMENT_LINE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[\w$.\[\]]+\s*[-+*/%]?=").expect("valid assignment line regex"));

static CALL_LINE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[\w$.]+\s*\(.*\)\s*;?$").expect("valid call line regex"));

/// Does a single line read as JavaScript rather than prose
pub fn is_code_line(line: &str) -> bool {
  let line = line.trim();
  CODE_LINE_STARTS.iter().any(|s| line.starts_with(s))
    || line.ends_with(CODE_LINE_ENDS)
    || line.starts_with("print(")
    || line.starts_with("Export.")
    || PROPERTY_LINE.is_match(line)
    || ASSIGNMENT_LINE.is_match(line)
    || CALL_LINE.is_match(line)
}

/// Prose that introduces or explains code, as opposed to a bare label line
fn is_sentence_line(line: &str) -> bool {
  let line = line.trim();
  !is_code_line(line) && line.ends_with(['.', ':', '!', '?'])
}

/// Unfenced text that ends with code and has no sentences in it is left alone
fn settled_code(text: &str) -> Option<String> {
  if text.contains("```") || text.trim().len() != text.len() {
    return None;
  }

  let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
  let last = lines.last()?;

  (is_code_line(last) && !lines.iter().any(|l| is_sentence_line(l))).then(|| text.to_string())
}

static EE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
  [
    (r"(?s)// Define [^\n]+.*Map\.centerObject", "Map.centerObject"),
    (r"(?s)var \w+ = ee\..*// End", "// End"),
    (r"(?s)// Google Earth Engine.*$", ""),
    (r"(?s)var \w+ = ee\..*$", ""),
  ]
  .into_iter()
  .map(|(pattern, stop)| (Regex::new(pattern).expect("valid Earth Engine pattern"), stop))
  .collect()
});

fn ee_pattern(text: &str) -> Option<String> {
  EE_PATTERNS.iter().find_map(|(pattern, stop)| {
    let found = pattern.find(text)?.as_str();
    let found = found.strip_suffix(stop).unwrap_or(found);
    found.contains("ee.").then(|| found.trim().to_string())
  })
}

const EE_ANCHORS: [&str; 5] = ["ee.Image", "ee.FeatureCollection", "ee.Geometry", "Map.addLayer", "Map.centerObject"];

const CODE_STARTS: [&str; 4] = ["//", "var ", "const ", "function "];

fn ee_anchor(text: &str) -> Option<String> {
  EE_ANCHORS.iter().find_map(|anchor| {
    let at = text.find(anchor)?;
    let start = CODE_STARTS
      .iter()
      .filter_map(|marker| text.match_indices(marker).map(|(i, _)| i).take_while(|&i| i <= at).last())
      .max()
      .unwrap_or(0);

    (start > 0).then(|| text[start..].trim().to_string())
  })
}

fn is_code_like(line: &str) -> bool {
  ["var ", "const ", "function ", "return ", "// ", "= ee.", "Map."].iter().any(|token| line.contains(token))
    || line.starts_with("if ")
}

fn line_scan(text: &str) -> Option<String> {
  let lines: Vec<&str> = text.split('\n').collect();
  let start = lines.iter().position(|line| is_code_like(line.trim()))?;

  let end = (start + 1..lines.len())
    .find(|&i| {
      let line = lines[i].trim();
      let next = lines.get(i + 1).map(|l| l.trim()).unwrap_or_default();
      line.is_empty() && (next.starts_with("##") || next.starts_with("Explanation"))
    })
    .unwrap_or(lines.len());

  Some(lines[start..end].join("\n").trim().to_string())
}

fn passthrough(text: &str) -> Option<String> {
  Some(text.to_string())
}
