use anyhow::{bail, Result};
use std::path::Path;

use super::{load_config, read_input};
use crate::validation::ValidationClient;

pub async fn validate(path: Option<&Path>) -> Result<()> {
  let config = load_config()?;
  let code = read_input(path)?;

  let http = reqwest::Client::builder().timeout(config.request_timeout()).build()?;
  let report = ValidationClient::new(http, &config.validation_url).validate(code.trim()).await;

  match report.error {
    None => {
      herald::success!(&format!("Code is valid ({})", report.source));
      println!("{}", report.code);
      Ok(())
    }
    Some(error) => bail!("{error} ({})", report.source),
  }
}
