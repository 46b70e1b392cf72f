use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "cirrus")]
#[command(about = "cirrus cluster provisioning CLI", long_about = None)]
struct Cli {
    /// Path to the cluster configuration file
    #[arg(short, long, global = true, default_value = "cluster.yaml")]
    config: String,

    /// Provider backend
    #[arg(long, global = true, default_value = "memory")]
    provider: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run pre-flight validation without touching any stack
    Validate {
        /// Targets: `all` or any combination of `etcd`, `control-plane`,
        /// and node pool names
        #[arg(long, value_delimiter = ',', default_value = "all")]
        targets: Vec<String>,
    },

    /// Show the ordered operation plan for a target set
    Plan {
        #[arg(long, value_delimiter = ',', default_value = "all")]
        targets: Vec<String>,

        /// Operation kind: create, update, or delete
        #[arg(long, default_value = "update")]
        kind: String,
    },

    /// Create the cluster stacks
    Create {
        #[arg(long, value_delimiter = ',', default_value = "all")]
        targets: Vec<String>,

        /// Don't ask for confirmation
        #[arg(long)]
        force: bool,

        /// Don't wait for the stacks to settle
        #[arg(long)]
        skip_wait: bool,
    },

    /// Update an existing cluster
    Update {
        /// Update nothing but the specified sub-stacks
        #[arg(long, value_delimiter = ',', default_value = "all")]
        targets: Vec<String>,

        /// Don't ask for confirmation
        #[arg(long)]
        force: bool,

        /// Don't wait for the stacks to settle
        #[arg(long)]
        skip_wait: bool,
    },

    /// Tear down cluster stacks, dependents first
    Destroy {
        #[arg(long, value_delimiter = ',', default_value = "all")]
        targets: Vec<String>,

        /// Don't ask for confirmation
        #[arg(long)]
        force: bool,

        /// Don't wait for the stacks to settle
        #[arg(long)]
        skip_wait: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { targets } => {
            commands::validate::run(&cli.config, &cli.provider, &targets).await?;
        }

        Commands::Plan { targets, kind } => {
            commands::plan::run(&cli.config, &targets, &kind)?;
        }

        Commands::Create { targets, force, skip_wait } => {
            commands::create::run(&cli.config, &cli.provider, &targets, force, skip_wait).await?;
        }

        Commands::Update { targets, force, skip_wait } => {
            commands::update::run(&cli.config, &cli.provider, &targets, force, skip_wait).await?;
        }

        Commands::Destroy { targets, force, skip_wait } => {
            commands::destroy::run(&cli.config, &cli.provider, &targets, force, skip_wait).await?;
        }
    }

    Ok(())
}
