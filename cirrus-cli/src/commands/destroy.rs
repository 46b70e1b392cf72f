//! `cirrus destroy` command

use anyhow::{Context, Result};
use colored::Colorize;

use super::{confirm, load_cluster, parse_targets, print_report};

/// Tear down the requested stacks, dependents first.
pub async fn run(
    config_path: &str,
    provider_name: &str,
    targets: &[String],
    force: bool,
    skip_wait: bool,
) -> Result<()> {
    if !force
        && !confirm("This operation will destroy cluster stacks. Are you sure? [y,n]:")?
    {
        println!("Operation cancelled");
        return Ok(());
    }

    let cluster = load_cluster(config_path, provider_name, skip_wait)?;
    let targets = parse_targets(targets);

    let report = cluster.destroy(&targets).await.context("Error destroying cluster")?;
    print_report("Destroy stacks:", &report);

    println!("{}", "Cluster destroyed".green().bold());
    Ok(())
}
