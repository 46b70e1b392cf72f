//! `cirrus plan` command

use anyhow::{bail, Context, Result};
use cirrus_core::plan::{plan, OperationKind};
use cirrus_core::ClusterConfig;
use tabled::{settings::Style, Table, Tabled};

use super::parse_targets;

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "ORDER")]
    order: usize,
    #[tabled(rename = "STACK")]
    stack: String,
    #[tabled(rename = "OPERATION")]
    operation: String,
    #[tabled(rename = "DEPENDS ON")]
    depends_on: String,
}

/// Show the dependency-ordered operation list for a target set without
/// executing anything. Needs no provider: planning is pure configuration.
pub fn run(config_path: &str, targets: &[String], kind: &str) -> Result<()> {
    let kind = match kind {
        "create" => OperationKind::Create,
        "update" => OperationKind::Update,
        "delete" => OperationKind::Delete,
        other => bail!("Unknown operation kind '{}' (expected create, update, or delete)", other),
    };

    let config = ClusterConfig::from_file(config_path).context("Failed to read cluster config")?;
    let targets = parse_targets(targets);
    let operations = plan(&targets, &config, kind)?;

    let rows: Vec<PlanRow> = operations
        .iter()
        .enumerate()
        .map(|(i, op)| PlanRow {
            order: i + 1,
            stack: op.target.stack_name(&config.cluster_name),
            operation: op.kind.to_string(),
            depends_on: if op.depends_on.is_empty() {
                "-".to_string()
            } else {
                op.depends_on
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            },
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    println!("{}", table);

    Ok(())
}
