//! Earth Engine dataset catalog retrieval.
//!
//! The catalog is a static JSON array published alongside the community
//! dataset list. Only the fields the matcher and the recommendation prompt
//! need are kept, which also keeps the prompt small.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum CatalogError {
  #[error("Failed to fetch Earth Engine catalog from {url}: {message}")]
  Network { url: String, message: String },

  #[error("Failed to fetch Earth Engine catalog from {url}: HTTP {status}")]
  Status { url: String, status: u16 },

  #[error("Earth Engine catalog is not a JSON array of datasets: {message}")]
  Parse { message: String },
}

impl CatalogError {
  pub fn network(url: &str, message: impl Into<String>) -> Self {
    Self::Network { url: url.to_string(), message: message.into() }
  }

  pub fn parse(message: impl Into<String>) -> Self {
    Self::Parse { message: message.into() }
  }
}

/// One dataset from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
  pub id: String,
  pub title: String,
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub kind: Option<String>,
  /// Comma-separated tag list, empty when the dataset has no tags
  #[serde(default)]
  pub tags: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub start_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub end_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub provider: Option<String>,
}

impl CatalogEntry {
  pub fn new(id: impl Into<String>, title: impl Into<String>, tags: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      title: title.into(),
      kind: None,
      tags: tags.into(),
      start_date: None,
      end_date: None,
      provider: None,
    }
  }

  /// Tags split on commas and trimmed; empty pieces are skipped
  pub fn tag_list(&self) -> Vec<&str> {
    self.tags.split(',').map(str::trim).filter(|t| !t.is_empty()).collect()
  }

  /// Project a raw catalog object; `None` when it has no usable id
  fn from_raw(raw: &Map<String, Value>) -> Option<Self> {
    let id = text_field(raw, "id").filter(|id| !id.trim().is_empty())?;

    Some(Self {
      id,
      title: text_field(raw, "title").unwrap_or_default(),
      kind: text_field(raw, "type"),
      tags: text_field(raw, "tags").unwrap_or_default(),
      start_date: text_field(raw, "start_date"),
      end_date: text_field(raw, "end_date"),
      provider: text_field(raw, "provider"),
    })
  }
}

fn text_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
  match raw.get(key)? {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

/// The fetched catalog, lifetime of one request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
  /// Length of the raw array, including entries that were dropped
  pub full_catalog_size: usize,
  pub datasets: Vec<CatalogEntry>,
}

impl Catalog {
  pub fn from_entries(datasets: Vec<CatalogEntry>) -> Self {
    Self { full_catalog_size: datasets.len(), datasets }
  }

  pub fn contains(&self, id: &str) -> bool {
    self.datasets.iter().any(|d| d.id == id)
  }
}

/// Parse a catalog body. Non-object items and items without an id are skipped.
pub fn parse_catalog(body: &str) -> Result<Catalog, CatalogError> {
  let raw: Vec<Value> = serde_json::from_str(body).map_err(|e| CatalogError::parse(e.to_string()))?;

  let mut datasets = Vec::with_capacity(raw.len());
  let mut skipped = 0usize;
  for item in &raw {
    match item.as_object().and_then(CatalogEntry::from_raw) {
      Some(entry) => datasets.push(entry),
      None => skipped += 1,
    }
  }

  if skipped > 0 {
    warn!(skipped, "dropped catalog entries without a dataset id");
  }

  Ok(Catalog { full_catalog_size: raw.len(), datasets })
}

/// GET the catalog from `url`
pub async fn fetch_catalog(client: &reqwest::Client, url: &str) -> Result<Catalog, CatalogError> {
  debug!(%url, "fetching Earth Engine catalog");

  let response = client.get(url).send().await.map_err(|e| CatalogError::network(url, e.to_string()))?;

  let status = response.status();
  if !status.is_success() {
    return Err(CatalogError::Status { url: url.to_string(), status: status.as_u16() });
  }

  let body = response.text().await.map_err(|e| CatalogError::network(url, e.to_string()))?;
  let catalog = parse_catalog(&body)?;

  info!(datasets = catalog.full_catalog_size, "retrieved Earth Engine catalog");
  Ok(catalog)
}

#[cfg(test)]
mod tests {
  use super::*;
  use mockito::Server;

  const SAMPLE: &str = r#"[
    {"id": "COPERNICUS/S2_SR", "title": "Sentinel-2 MSI: Level-2A", "type": "image_collection",
     "tags": "copernicus, esa, sentinel, msi", "start_date": "2017-03-28", "end_date": "2024-01-01",
     "provider": "European Union/ESA/Copernicus", "thumbnail": "https://example.com/s2.png"},
    {"id": "NASA/NASADEM_HGT/001", "title": "NASADEM: NASA 30m Digital Elevation Model",
     "type": "image", "tags": null, "start_date": 2000},
    {"title": "Entry without id"},
    {"id": "   ", "title": "Blank id"},
    "not an object"
  ]"#;

  #[test]
  fn test_parse_projects_fields_and_drops_invalid_entries() {
    let catalog = parse_catalog(SAMPLE).unwrap();

    assert_eq!(catalog.full_catalog_size, 5);
    assert_eq!(catalog.datasets.len(), 2);

    let s2 = &catalog.datasets[0];
    assert_eq!(s2.id, "COPERNICUS/S2_SR");
    assert_eq!(s2.kind.as_deref(), Some("image_collection"));
    assert_eq!(s2.tag_list(), vec!["copernicus", "esa", "sentinel", "msi"]);
    assert_eq!(s2.provider.as_deref(), Some("European Union/ESA/Copernicus"));

    let dem = &catalog.datasets[1];
    assert_eq!(dem.tags, "");
    assert!(dem.tag_list().is_empty());
    assert_eq!(dem.start_date.as_deref(), Some("2000"));
    assert_eq!(dem.end_date, None);
  }

  #[test]
  fn test_parse_rejects_non_array() {
    let error = parse_catalog(r#"{"datasets": []}"#).unwrap_err();
    assert!(matches!(error, CatalogError::Parse { .. }));
  }

  #[test]
  fn test_serialized_entry_uses_catalog_field_names() {
    let mut entry = CatalogEntry::new("ESA/WorldCover/v100", "ESA WorldCover 10m v100", "landcover");
    entry.kind = Some("image_collection".to_string());
    let json = serde_json::to_value(&entry).unwrap();

    assert_eq!(json["type"], "image_collection");
    assert!(json.get("provider").is_none());
  }

  #[tokio::test]
  async fn test_fetch_catalog_success() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("GET", "/gee_catalog.json")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(SAMPLE)
      .create_async()
      .await;

    let url = format!("{}/gee_catalog.json", server.url());
    let catalog = fetch_catalog(&reqwest::Client::new(), &url).await.unwrap();

    assert_eq!(catalog.datasets.len(), 2);
    assert!(catalog.contains("NASA/NASADEM_HGT/001"));
  }

  #[tokio::test]
  async fn test_fetch_catalog_http_error() {
    let mut server = Server::new_async().await;
    let _mock = server.mock("GET", "/gee_catalog.json").with_status(503).create_async().await;

    let url = format!("{}/gee_catalog.json", server.url());
    let error = fetch_catalog(&reqwest::Client::new(), &url).await.unwrap_err();

    match error {
      CatalogError::Status { status, .. } => assert_eq!(status, 503),
      other => panic!("Expected Status error, got: {other:?}"),
    }
  }

  #[tokio::test]
  async fn test_fetch_catalog_unreachable() {
    let error =
      fetch_catalog(&reqwest::Client::new(), "http://127.0.0.1:9/gee_catalog.json").await.unwrap_err();
    assert!(matches!(error, CatalogError::Network { .. }));
  }
}
