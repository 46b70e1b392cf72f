//! `cirrus update` command

use anyhow::{Context, Result};
use colored::Colorize;

use super::{confirm, load_cluster, parse_targets, print_report};

/// Roll out configuration changes to the requested stacks. Stacks that are
/// already converged are reported but left untouched.
pub async fn run(
    config_path: &str,
    provider_name: &str,
    targets: &[String],
    force: bool,
    skip_wait: bool,
) -> Result<()> {
    if !force && !confirm("This operation will update the cluster. Are you sure? [y,n]:")? {
        println!("Operation cancelled");
        return Ok(());
    }

    let cluster = load_cluster(config_path, provider_name, skip_wait)?;
    let targets = parse_targets(targets);

    let report = cluster.update(&targets).await.context("Error updating cluster")?;
    print_report("Update stacks:", &report);

    println!("{}", "Cluster updated".green().bold());
    println!("{}", cluster.info());
    Ok(())
}
