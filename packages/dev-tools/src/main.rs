//! Tree Doctor
//!
//! Maintenance CLI for nested-set tables stored in a libsql/SQLite file.
//!
//! # Usage
//!
//! ```bash
//! # Report numbering problems in every scope
//! tree-doctor --db ./data.db check
//!
//! # Renumber scope 3 from its parent_id links
//! tree-doctor --db ./data.db rebuild --scope 3
//!
//! # Dump a scope as an indented outline, or as JSON
//! NESTEDSET_DB=./data.db tree-doctor --format json show --scope 1
//! ```
//!
//! A non-default table layout is read from `--config <file>`, a JSON
//! `TreeConfig` document. Log output is controlled with `RUST_LOG`.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use nestedset_core::{
    check_all, check_scope, config::TreeConfig, LibsqlStore, TreeIndex, TreeNode, TreeViolation,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "tree-doctor",
    version,
    about = "Inspect and repair nested-set tree tables",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        env = "NESTEDSET_DB",
        value_name = "FILE",
        help = "Database file holding the tree table"
    )]
    db: PathBuf,

    #[arg(long, value_name = "FILE", help = "JSON table/column configuration")]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for reports"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report integrity violations
    Check {
        #[arg(long, help = "Restrict the check to one scope")]
        scope: Option<i64>,
    },
    /// Renumber trees from their parent_id links
    Rebuild {
        #[arg(long, help = "Restrict the rebuild to one scope")]
        scope: Option<i64>,
    },
    /// Print the stored tree
    Show {
        #[arg(long, help = "Restrict the output to one scope")]
        scope: Option<i64>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tree_doctor=info,nestedset_core=warn")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    tracing::info!(
        "Opening table '{}' in {}",
        config.table,
        cli.db.display()
    );
    let store = Arc::new(
        LibsqlStore::open(cli.db.clone(), config)
            .await
            .with_context(|| format!("failed to open {}", cli.db.display()))?,
    );
    let tree = TreeIndex::new(store.clone());

    match cli.command {
        Command::Check { scope } => {
            let violations = match scope {
                Some(scope) => check_scope(store.as_ref(), scope).await?,
                None => check_all(store.as_ref()).await?,
            };
            report_violations(cli.format, &violations)?;
            if !violations.is_empty() {
                bail!("{} violations found", violations.len());
            }
        }
        Command::Rebuild { scope } => {
            let roots = match scope {
                Some(scope) => tree.scope_root(scope).all().await?,
                None => tree.roots().all().await?,
            };
            if roots.is_empty() {
                bail!("no root to rebuild from");
            }

            for root in &roots {
                let next = tree.rebuild_tree(root, 1).await?;
                println!("scope {}: {} nodes renumbered", root.scope, (next - 1) / 2);
            }

            let violations = check_all(store.as_ref()).await?;
            if !violations.is_empty() {
                report_violations(cli.format, &violations)?;
                bail!("rows unreachable from a root keep their numbering");
            }
        }
        Command::Show { scope } => {
            let nodes = tree.fulltree(scope).all().await?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&nodes)?),
                OutputFormat::Text => {
                    for node in &nodes {
                        println!("{}", outline_line(node));
                    }
                }
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<TreeConfig> {
    let Some(path) = path else {
        return Ok(TreeConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(TreeConfig::from_json(&raw)?)
}

fn report_violations(format: OutputFormat, violations: &[TreeViolation]) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(violations)?),
        OutputFormat::Text if violations.is_empty() => println!("ok"),
        OutputFormat::Text => {
            for violation in violations {
                println!("{}", violation);
            }
        }
    }
    Ok(())
}

fn outline_line(node: &TreeNode) -> String {
    let indent = "  ".repeat(node.level.saturating_sub(1).max(0) as usize);
    let id = node
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}#{} [{}, {}] scope {} {}",
        indent, id, node.left, node.right, node.scope, node.payload
    )
}
