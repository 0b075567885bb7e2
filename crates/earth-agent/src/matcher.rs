//! Keyword-based pre-filter over the dataset catalog.
//!
//! This narrows the catalog to datasets whose tags or titles mention a topic
//! found in the task, plus a short list of widely used datasets that are
//! always offered. It does not rank anything; ordering follows the catalog.

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, CatalogEntry};

/// Topics recognised in a task description, checked in this order
pub const KEYWORDS: [&str; 31] = [
  "landsat",
  "sentinel",
  "modis",
  "dem",
  "elevation",
  "land cover",
  "temperature",
  "precipitation",
  "climate",
  "vegetation",
  "ndvi",
  "water",
  "forest",
  "urban",
  "agriculture",
  "flood",
  "fire",
  "snow",
  "ice",
  "population",
  "nighttime",
  "lights",
  "air quality",
  "drought",
  "rainfall",
  "soil",
  "geology",
  "bathymetry",
  "ocean",
  "coral",
  "weather",
];

/// Datasets always offered when present in the catalog
pub const IMPORTANT_DATASETS: [&str; 6] = [
  "COPERNICUS/S2_SR",
  "LANDSAT/LC08/C02/T1_L2",
  "MODIS/006/MOD13Q1",
  "NASA/NASADEM_HGT/001",
  "COPERNICUS/S1_GRD",
  "ESA/WorldCover/v100",
];

/// A catalog entry with the reasons it matched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedDataset {
  #[serde(flatten)]
  pub entry: CatalogEntry,
  pub match_reasons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
  pub detected_keywords: Vec<String>,
  pub relevant_datasets: Vec<MatchedDataset>,
  pub additional_important_datasets: Vec<CatalogEntry>,
  /// Usable catalog entries, not counting those dropped for a missing id
  pub total_datasets_available: usize,
  pub total_potential_matches: usize,
}

impl AnalysisResult {
  /// Ids of every dataset offered to the recommender
  pub fn candidate_ids(&self) -> Vec<&str> {
    self
      .relevant_datasets
      .iter()
      .map(|m| m.entry.id.as_str())
      .chain(self.additional_important_datasets.iter().map(|e| e.id.as_str()))
      .collect()
  }
}

/// Vocabulary keywords that occur in the lower-cased task
pub fn detect_keywords(task: &str) -> Vec<&'static str> {
  let task = task.to_lowercase();
  KEYWORDS.iter().copied().filter(|kw| task.contains(kw)).collect()
}

fn match_reasons(entry: &CatalogEntry, keywords: &[&str]) -> Vec<String> {
  let tags = entry.tag_list();
  let title = entry.title.to_lowercase();
  let mut reasons = Vec::new();

  for kw in keywords {
    if tags.iter().any(|tag| tag == kw) {
      reasons.push(format!("Tag match: {kw}"));
    }
    if title.contains(kw) {
      reasons.push(format!("Title match: {kw}"));
    }
  }

  reasons
}

/// Match the task against the catalog
pub fn analyze(task: &str, catalog: &Catalog) -> AnalysisResult {
  let keywords = detect_keywords(task);

  let relevant_datasets: Vec<MatchedDataset> = catalog
    .datasets
    .iter()
    .filter_map(|entry| {
      let match_reasons = match_reasons(entry, &keywords);
      (!match_reasons.is_empty()).then(|| MatchedDataset { entry: entry.clone(), match_reasons })
    })
    .collect();

  let additional_important_datasets: Vec<CatalogEntry> = catalog
    .datasets
    .iter()
    .filter(|entry| IMPORTANT_DATASETS.contains(&entry.id.as_str()))
    .filter(|entry| !relevant_datasets.iter().any(|m| m.entry.id == entry.id))
    .cloned()
    .collect();

  let total_potential_matches = relevant_datasets.len() + additional_important_datasets.len();

  AnalysisResult {
    detected_keywords: keywords.into_iter().map(String::from).collect(),
    relevant_datasets,
    additional_important_datasets,
    total_datasets_available: catalog.datasets.len(),
    total_potential_matches,
  }
}
