
use earth_agent::inject::{inject, InjectionError};
use earth_agent::pipeline::{deploy, AgentError};
use earth_agent::run_trigger::{click_run, run_button_present, RunOutcome};
use earth_agent::AgentConfig;
use mock_page::{MockHost, MockPage, RecordingProgress, StrategyBehavior};
use std::time::Duration;
use tokio::time::Instant;

const CODE: &str = "var dem = ee.Image('NASA/NASADEM_HGT/001');\nMap.addLayer(dem, {min: 0, max: 4000}, 'Elevation');";

#[tokio::test(start_paused = true)]
async fn test_reused_tab_injects_and_runs_without_waiting() {
  let page = MockPage::editor(&["code-api"]);
  let host = MockHost::new(page.clone(), true);
  let progress = RecordingProgress::default();
  let start = Instant::now();

  let report = deploy(&host, CODE, &AgentConfig::default(), &progress).await.unwrap();

  assert!(report.reused_tab);
  assert_eq!(report.ready_after, None);
  assert_eq!(report.injection.strategy, "code-api");
  assert_eq!(report.run, RunOutcome::Clicked);
  assert_eq!(page.injected().as_deref(), Some(CODE));
  assert_eq!(page.run_clicks(), 1);
  assert_eq!(page.presence_probes(), 0);
  assert_eq!(start.elapsed(), Duration::ZERO);
  assert_eq!(host.opened.lock().unwrap().as_slice(), ["https://code.earthengine.google.com/"]);
}

#[tokio::test(start_paused = true)]
async fn test_new_tab_waits_for_run_button_then_settles() {
  let page = MockPage::editor(&["ace-api"]).with_run_button_after(Some(3));
  let host = MockHost::new(page.clone(), false);
  let start = Instant::now();

  let report = deploy(&host, CODE, &AgentConfig::default(), &RecordingProgress::default()).await.unwrap();

  assert!(!report.reused_tab);
  assert_eq!(report.ready_after, Some(3));
  assert_eq!(page.presence_probes(), 3);
  // two 3s poll intervals plus the 2s settle delay
  assert_eq!(start.elapsed(), Duration::from_secs(8));
  assert_eq!(report.injection.strategy, "ace-api");
}

#[tokio::test(start_paused = true)]
async fn test_editor_that_never_loads_times_out() {
  let page = MockPage::editor(&["code-api"]).with_run_button_after(None);
  let host = MockHost::new(page.clone(), false);

  let error = deploy(&host, CODE, &AgentConfig::default(), &RecordingProgress::default()).await.unwrap_err();

  assert!(matches!(error, AgentError::EditorTimeout { attempts: 10 }));
  assert_eq!(page.presence_probes(), 10);
  assert_eq!(page.injected(), None);
}

#[tokio::test(start_paused = true)]
async fn test_missing_run_button_after_injection_is_reported() {
  let page = MockPage::editor(&["dom-replace"]).with_run_button_after(None);
  let host = MockHost::new(page.clone(), true);
  let progress = RecordingProgress::default();

  let report = deploy(&host, CODE, &AgentConfig::default(), &progress).await.unwrap();

  assert_eq!(report.injection.strategy, "dom-replace");
  assert!(matches!(report.run, RunOutcome::NotFound { .. }));
  assert_eq!(progress.notices().len(), 1);
  assert!(progress.notices()[0].contains("click the Run button manually"));
}

#[tokio::test]
async fn test_empty_code_does_not_open_editor() {
  let host = MockHost::new(MockPage::editor(&["code-api"]), true);

  let error = deploy(&host, "  \n", &AgentConfig::default(), &RecordingProgress::default()).await.unwrap_err();

  assert!(matches!(error, AgentError::Injection(InjectionError::EmptyCode)));
  assert_eq!(host.open_count(), 0);
}

#[tokio::test]
async fn test_injection_falls_through_in_order() {
  let page = MockPage::editor(&["codemirror", "text-input-paste"]).with_behavior("code-api", StrategyBehavior::Throws);

  let report = inject(&page, CODE).await.unwrap();

  assert_eq!(report.strategy, "codemirror");
  let tried: Vec<(&str, bool)> = report.attempts.iter().map(|a| (a.strategy, a.success)).collect();
  assert_eq!(tried, vec![("code-api", false), ("ace-api", false), ("codemirror", true)]);
  assert_eq!(report.attempts[0].message, "Script evaluation failed: Uncaught TypeError");
  assert_eq!(page.scripts().len(), 3);
}

#[tokio::test]
async fn test_all_strategies_failing_asks_for_manual_copy() {
  let page = MockPage::editor(&[]);

  let error = inject(&page, CODE).await.unwrap_err();

  match &error {
    InjectionError::AllStrategiesFailed { attempts } => {
      assert_eq!(attempts.len(), 5);
      assert!(attempts.iter().all(|a| !a.success));
    }
    other => panic!("Expected AllStrategiesFailed, got: {other:?}"),
  }
  assert!(error.to_string().starts_with("Failed to inject code. Try copying and pasting manually."));
  assert_eq!(page.injected(), None);
}

#[tokio::test]
async fn test_code_with_quotes_and_newlines_arrives_intact() {
  let code = "// \"quoted\" `tick` ${x}\nprint('it\\'s');";
  let page = MockPage::editor(&["code-api"]);

  inject(&page, code).await.unwrap();

  assert_eq!(page.injected().as_deref(), Some(code));
}

#[tokio::test]
async fn test_run_probes() {
  let page = MockPage::editor(&[]).with_run_button_after(Some(2));

  assert!(!run_button_present(&page).await.unwrap());
  assert!(run_button_present(&page).await.unwrap());
  assert_eq!(click_run(&page).await.unwrap(), RunOutcome::Clicked);

  let missing = MockPage::editor(&[]).with_run_button_after(None);
  assert_eq!(
    click_run(&missing).await.unwrap(),
    RunOutcome::NotFound { message: "Run button not found".to_string() }
  );
}
