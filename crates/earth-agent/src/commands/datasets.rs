use anyhow::Result;
use std::fmt::Write as _;

use super::load_config;
use crate::matcher::AnalysisResult;
use crate::pipeline::EarthAgent;

pub async fn datasets(task: &str, json: bool) -> Result<()> {
  let agent = EarthAgent::from_config(load_config()?)?;
  let analysis = agent.analyze(task).await?;

  if json {
    println!("{}", serde_json::to_string_pretty(&analysis)?);
  } else {
    print!("{}", render(&analysis));
  }
  Ok(())
}

fn render(analysis: &AnalysisResult) -> String {
  let mut out = String::new();
  let keywords =
    if analysis.detected_keywords.is_empty() { "none".to_string() } else { analysis.detected_keywords.join(", ") };
  let _ = writeln!(out, "Detected keywords: {keywords}");
  let _ = writeln!(
    out,
    "{} candidate datasets out of {}",
    analysis.total_potential_matches, analysis.total_datasets_available
  );

  for matched in &analysis.relevant_datasets {
    let _ = writeln!(out, "\n{} ({})", matched.entry.id, matched.entry.title);
    for reason in &matched.match_reasons {
      let _ = writeln!(out, "  - {reason}");
    }
  }

  if !analysis.additional_important_datasets.is_empty() {
    let _ = writeln!(out, "\nAlso worth considering:");
    for entry in &analysis.additional_important_datasets {
      let _ = writeln!(out, "  {} ({})", entry.id, entry.title);
    }
  }

  out
}
