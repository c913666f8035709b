//! Module for the "services" command.

use super::*;

/// Function for the [`Commands::Services`] in the CLI.
pub fn services(cli: &Cli) -> Result<()> {
  let config = cli.load_config()?;
  let names = config.service_names();
  println!("{} {} known services", style(INFO_PREFIX).cyan(), names.len());

  for (index, name) in names.iter().enumerate() {
    let settings = config.service(name)?;
    let branch = if index + 1 == names.len() { TREE_LEAF } else { TREE_BRANCH };
    let state =
      if settings.enabled { style("enabled").green() } else { style("disabled").yellow() };
    let types: Vec<String> = settings.types.iter().map(ToString::to_string).collect();
    println!(
      "{branch} {} [{state}] priority={} timeout={:.1}s types={} {}",
      style(name).cyan(),
      settings.priority,
      settings.timeout.as_secs_f64(),
      if types.is_empty() { "-".to_string() } else { types.join(",") },
      style(&settings.base_url).dim(),
    );
  }
  Ok(())
}
