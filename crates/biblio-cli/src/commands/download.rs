//! Module for the "probe", "download" and "fetch" commands.

use std::path::Path;

use biblio::{
  configuration::IA_DOWNLOAD,
  service::{aws_s3::S3Fetcher, ia_download::IaDownloadService},
};

use super::*;

/// Creates `dir` if needed.
fn ensure_dir(dir: &Path) -> Result<()> {
  if !dir.exists() {
    println!("{} Creating directory: {}", style(INFO_PREFIX).cyan(), style(dir.display()).yellow());
    std::fs::create_dir_all(dir)?;
  }
  Ok(())
}

/// Function for the [`Commands::Probe`] in the CLI.
pub async fn probe(cli: &Cli, url: &str) -> Result<()> {
  let archive = IaDownloadService::new(cli.load_config()?.service(IA_DOWNLOAD)?)?;
  let result = archive.probe(url).await;
  println!("{}", serde_json::to_string(&result)?);
  if result.error {
    return Err(CliError::ProbeFailed(
      result.message.unwrap_or_else(|| format!("HTTP {}", result.status.unwrap_or_default())),
    ));
  }
  Ok(())
}

/// Function for the [`Commands::Download`] in the CLI.
pub async fn download(cli: &Cli, url: &str, out: &Path) -> Result<()> {
  let archive = IaDownloadService::new(cli.load_config()?.service(IA_DOWNLOAD)?)?;
  ensure_dir(out)?;
  match archive.download(url, out).await {
    Ok(path) => {
      println!("{} Saved {}", style(SUCCESS_PREFIX).green(), style(path.display()).yellow());
      Ok(())
    },
    Err(BiblioError::NotReady(message)) => {
      println!(
        "{} {} Try again shortly.",
        style(WARNING_PREFIX).yellow(),
        style(&message).yellow()
      );
      Err(BiblioError::NotReady(message).into())
    },
    Err(error) => Err(error.into()),
  }
}

/// Function for the [`Commands::Fetch`] in the CLI.
pub async fn fetch(cli: &Cli, item_path: &str, out: &Path) -> Result<()> {
  let config = cli.load_config()?;
  let fetcher = S3Fetcher::from_config(&config.s3).await;
  let (bucket, key) = fetcher.locate(item_path)?;
  println!("{} Fetching s3://{bucket}/{key}", style(INFO_PREFIX).cyan());
  ensure_dir(out)?;
  let path = fetcher.fetch(item_path, out).await?;
  println!("{} Saved {}", style(SUCCESS_PREFIX).green(), style(path.display()).yellow());
  Ok(())
}
