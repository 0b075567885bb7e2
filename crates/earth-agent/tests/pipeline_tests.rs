
use earth_agent::llm::{LlmError, ResponseFormat};
use earth_agent::pipeline::{AgentError, EarthAgent, Stage};
use earth_agent::AgentConfig;
use mock_page::{RecordingProgress, ScriptedChat};
use mockito::{Mock, Server, ServerGuard};
use serde_json::json;
use std::sync::Arc;

const CATALOG: &str = r#"[
  {"id": "COPERNICUS/S2_SR", "title": "Sentinel-2 MSI: MultiSpectral Instrument, Level-2A", "tags": "sentinel, copernicus"},
  {"id": "MODIS/006/MOD13Q1", "title": "MOD13Q1.006 Terra Vegetation Indices 16-Day Global 250m", "tags": "modis, ndvi, vegetation"},
  {"id": "ESA/WorldCover/v100", "title": "ESA WorldCover 10m v100", "tags": "landcover"}
]"#;

const CODE: &str = "var modis = ee.ImageCollection('MODIS/006/MOD13Q1');\nMap.addLayer(modis.select('NDVI').mean());";

fn recommendation_reply() -> String {
  json!({
    "selected_datasets": [{"id": "MODIS/006/MOD13Q1", "title": "MOD13Q1", "reason": "16-day NDVI"}],
    "browsing_process": "Compared vegetation products.",
    "dataset_comparisons": [{"id": "COPERNICUS/S2_SR", "reason_not_selected": "Needs cloud masking"}],
    "analysis": "MODIS NDVI is ready to use."
  })
  .to_string()
}

fn code_reply() -> String {
  format!("Here is the script:\n\n```javascript\n{CODE}\n```\n\nIt maps mean NDVI.")
}

async fn catalog_mock(server: &mut ServerGuard, hits: usize) -> Mock {
  server
    .mock("GET", "/gee_catalog.json")
    .with_status(200)
    .with_body(CATALOG)
    .expect(hits)
    .create_async()
    .await
}

fn agent(server: &ServerGuard, chat: Arc<ScriptedChat>, progress: Arc<RecordingProgress>) -> EarthAgent {
  let config = AgentConfig {
    catalog_url: format!("{}/gee_catalog.json", server.url()),
    validation_url: format!("{}/validate", server.url()),
    ..AgentConfig::default()
  };
  EarthAgent::new(config, reqwest::Client::new(), chat, progress)
}

#[tokio::test]
async fn test_full_run_produces_extracted_code() {
  let mut server = Server::new_async().await;
  let catalog = catalog_mock(&mut server, 1).await;
  let chat = Arc::new(ScriptedChat::with_replies(vec![Ok(recommendation_reply()), Ok(code_reply())]));
  let progress = Arc::new(RecordingProgress::default());

  let output = agent(&server, chat.clone(), progress.clone())
    .run("Show NDVI vegetation trends", Some("sk-test"))
    .await
    .unwrap();

  assert_eq!(output.code, CODE);
  assert_eq!(output.raw, code_reply());
  assert_eq!(
    progress.stages(),
    vec![Stage::FetchingCatalog, Stage::AnalyzingDatasets, Stage::RecommendingDatasets, Stage::GeneratingCode]
  );

  let analysis = output.analysis.unwrap();
  assert_eq!(analysis.detected_keywords, vec!["vegetation", "ndvi"]);
  assert_eq!(output.recommendation.unwrap().selected_ids(), vec!["MODIS/006/MOD13Q1"]);

  let recommend = chat.request(0);
  assert_eq!(recommend.response_format, Some(ResponseFormat::JsonObject));
  assert!(recommend.messages[1].content.contains("\"Tag match: ndvi\""));

  let generate = chat.request(1);
  assert!(generate.messages[1].content.contains("MODIS/006/MOD13Q1"));
  assert!(generate.messages[1].content.ends_with("Analysis provided: MODIS NDVI is ready to use."));
  assert_eq!(chat.keys.lock().unwrap().as_slice(), ["sk-test", "sk-test"]);

  let reports = progress.reports.lock().unwrap().clone();
  assert_eq!(reports.len(), 1);
  assert!(reports[0].1.contains("1. MODIS/006/MOD13Q1 (MOD13Q1)"));
  catalog.assert_async().await;
}

#[tokio::test]
async fn test_missing_key_stops_before_any_request() {
  let mut server = Server::new_async().await;
  let catalog = catalog_mock(&mut server, 0).await;
  let chat = Arc::new(ScriptedChat::default());
  let progress = Arc::new(RecordingProgress::default());
  let agent = agent(&server, chat.clone(), progress.clone());

  let error = agent.run("NDVI", None).await.unwrap_err();
  assert!(matches!(error, AgentError::MissingApiKey));
  assert_eq!(error.to_string(), "Please enter your OpenAI API key");

  let error = agent.run_direct("NDVI", Some("")).await.unwrap_err();
  assert!(matches!(error, AgentError::MissingApiKey));

  assert_eq!(chat.calls(), 0);
  assert!(progress.stages().is_empty());
  catalog.assert_async().await;
}

#[tokio::test]
async fn test_empty_prompt_stops_before_any_request() {
  let mut server = Server::new_async().await;
  let catalog = catalog_mock(&mut server, 0).await;
  let chat = Arc::new(ScriptedChat::default());

  let error = agent(&server, chat.clone(), Arc::new(RecordingProgress::default()))
    .run("   ", Some("sk-test"))
    .await
    .unwrap_err();

  assert!(matches!(error, AgentError::EmptyPrompt));
  assert_eq!(chat.calls(), 0);
  catalog.assert_async().await;
}

#[tokio::test]
async fn test_catalog_failure_skips_model_calls() {
  let mut server = Server::new_async().await;
  let _catalog = server.mock("GET", "/gee_catalog.json").with_status(500).create_async().await;
  let chat = Arc::new(ScriptedChat::default());

  let error = agent(&server, chat.clone(), Arc::new(RecordingProgress::default()))
    .run("NDVI", Some("sk-test"))
    .await
    .unwrap_err();

  assert!(matches!(error, AgentError::Catalog(_)));
  assert_eq!(chat.calls(), 0);
}

#[tokio::test]
async fn test_recommendation_failure_stops_pipeline() {
  let mut server = Server::new_async().await;
  let _catalog = catalog_mock(&mut server, 1).await;
  let chat = Arc::new(ScriptedChat::with_replies(vec![Err(LlmError::Api("Rate limit reached".to_string()))]));
  let progress = Arc::new(RecordingProgress::default());

  let error = agent(&server, chat.clone(), progress.clone()).run("NDVI", Some("sk-test")).await.unwrap_err();

  assert_eq!(error.to_string(), "Error recommending datasets: OpenAI API error: Rate limit reached");
  assert_eq!(chat.calls(), 1);
  assert!(!progress.stages().contains(&Stage::GeneratingCode));
}

#[tokio::test]
async fn test_free_text_recommendation_still_generates() {
  let mut server = Server::new_async().await;
  let _catalog = catalog_mock(&mut server, 1).await;
  let chat = Arc::new(ScriptedChat::with_replies(vec![
    Ok("I would use Sentinel-2 here.".to_string()),
    Ok(format!("```js\n{CODE}\n```")),
  ]));

  let output = agent(&server, chat.clone(), Arc::new(RecordingProgress::default()))
    .run("sentinel water", Some("sk-test"))
    .await
    .unwrap();

  assert_eq!(output.code, CODE);
  assert!(chat.request(1).messages[1].content.contains("Use these specific datasets: []."));
}

#[tokio::test]
async fn test_direct_mode_skips_catalog() {
  let mut server = Server::new_async().await;
  let catalog = catalog_mock(&mut server, 0).await;
  let chat = Arc::new(ScriptedChat::with_replies(vec![Ok(CODE.to_string())]));
  let progress = Arc::new(RecordingProgress::default());

  let output = agent(&server, chat.clone(), progress.clone()).run_direct("NDVI map", Some("sk-test")).await.unwrap();

  assert_eq!(output.code, CODE);
  assert!(output.analysis.is_none());
  assert_eq!(chat.calls(), 1);
  assert_eq!(chat.request(0).temperature, 0.2);
  assert_eq!(progress.stages(), vec![Stage::GeneratingCode]);
  catalog.assert_async().await;
}

#[tokio::test]
async fn test_invalid_code_is_reported_but_returned() {
  let mut server = Server::new_async().await;
  let _validate = server
    .mock("POST", "/validate")
    .with_status(400)
    .with_body(json!({"valid": false, "error": "Code doesn't appear to be Earth Engine JavaScript"}).to_string())
    .create_async()
    .await;
  let chat = Arc::new(ScriptedChat::with_replies(vec![Ok("var x = 1;".to_string())]));
  let progress = Arc::new(RecordingProgress::default());

  let output = agent(&server, chat, progress.clone())
    .with_validation()
    .run_direct("anything", Some("sk-test"))
    .await
    .unwrap();

  assert_eq!(output.code, "var x = 1;");
  assert!(!output.validation.unwrap().is_valid());
  assert_eq!(
    progress.notices(),
    vec!["Code may not be valid (validation service): Code doesn't appear to be Earth Engine JavaScript"]
  );
}

#[tokio::test]
async fn test_valid_code_from_service_replaces_output() {
  let mut server = Server::new_async().await;
  let _validate = server
    .mock("POST", "/validate")
    .with_status(200)
    .with_body(json!({"valid": true, "code": CODE}).to_string())
    .create_async()
    .await;
  let chat = Arc::new(ScriptedChat::with_replies(vec![Ok(format!("{CODE}\n"))]));
  let progress = Arc::new(RecordingProgress::default());

  let output =
    agent(&server, chat, progress.clone()).with_validation().run_direct("NDVI", Some("sk-test")).await.unwrap();

  assert_eq!(output.code, CODE);
  assert!(progress.notices().is_empty());
}
