//! `cirrus create` command

use anyhow::{Context, Result};
use colored::Colorize;

use super::{confirm, load_cluster, parse_targets, print_report};

/// Provision the requested stacks, in dependency order.
pub async fn run(
    config_path: &str,
    provider_name: &str,
    targets: &[String],
    force: bool,
    skip_wait: bool,
) -> Result<()> {
    if !force && !confirm("This operation will create cluster stacks. Are you sure? [y,n]:")? {
        println!("Operation cancelled");
        return Ok(());
    }

    let cluster = load_cluster(config_path, provider_name, skip_wait)?;
    let targets = parse_targets(targets);

    let report = cluster.create(&targets).await.context("Error creating cluster")?;
    print_report("Create stacks:", &report);

    println!("{}", "Cluster created".green().bold());
    println!("{}", cluster.info());
    Ok(())
}
