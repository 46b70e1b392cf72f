//! CLI command implementations.

use anyhow::{Context, Result};
use cirrus_core::orchestrate::ExecutionReport;
use cirrus_core::provider;
use cirrus_core::{Cluster, ClusterConfig, OperationTarget, OrchestratorOptions};
use colored::Colorize;
use std::io::{self, Write};

pub mod create;
pub mod destroy;
pub mod plan;
pub mod update;
pub mod validate;

/// Parse raw `--targets` values into operation targets.
pub(crate) fn parse_targets(raw: &[String]) -> Vec<OperationTarget> {
    raw.iter().map(|s| OperationTarget::parse(s)).collect()
}

/// Load the configuration and wire up a cluster against the chosen
/// provider backend.
pub(crate) fn load_cluster(
    config_path: &str,
    provider_name: &str,
    skip_wait: bool,
) -> Result<Cluster> {
    let config =
        ClusterConfig::from_file(config_path).context("Failed to read cluster config")?;
    let provider = provider::for_name(provider_name)?;
    let options = OrchestratorOptions { skip_wait, ..Default::default() };
    Ok(Cluster::new(config, provider, options))
}

/// Ask for a y/n confirmation on stdin.
pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    print!("{} ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();

    Ok(answer == "y" || answer == "yes")
}

/// Print the per-stack change report, if anything changed.
pub(crate) fn print_report(heading: &str, report: &ExecutionReport) {
    let summary = report.summary();
    if !summary.is_empty() {
        println!("{}", heading.bold());
        println!("{}", summary);
        println!();
    }
}
