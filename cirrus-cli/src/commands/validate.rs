//! `cirrus validate` command

use anyhow::{Context, Result};
use colored::Colorize;

use super::{load_cluster, parse_targets};

/// Run the pre-flight checks for the requested targets without touching
/// any stack.
pub async fn run(config_path: &str, provider_name: &str, targets: &[String]) -> Result<()> {
    let cluster = load_cluster(config_path, provider_name, false)?;
    let targets = parse_targets(targets);

    cluster
        .validate(&targets)
        .await
        .context("Cluster configuration is not valid against provider state")?;

    println!(
        "{} configuration for cluster '{}' is valid",
        "✓".green().bold(),
        cluster.config().cluster_name
    );
    Ok(())
}
