use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use coach_safety_migrate::config::MigrationConfig;
use coach_safety_migrate::emit::Table;
use coach_safety_migrate::pipeline::{self, MigrationPlan};
use coach_safety_migrate::store::{self, MemoryStore};
use coach_safety_migrate::workbook::XlsxWorkbook;
use coach_safety_migrate::{db, export, report, sql};

#[derive(Parser)]
#[command(name = "coach-safety-migrate")]
#[command(about = "Migrate the coach safety tracking workbook into Postgres", long_about = None)]
struct Cli {
    /// Migration settings (defaults to ./migration.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a tracking workbook into the database
    Migrate {
        #[arg(long)]
        workbook: PathBuf,
        /// Apply to an in-memory store instead of Postgres
        #[arg(long)]
        dry_run: bool,
        /// Also write the operations as a SQL script
        #[arg(long = "sql")]
        sql_out: Option<PathBuf>,
    },
    /// Show how a workbook is interpreted without writing anything
    Inspect {
        #[arg(long)]
        workbook: PathBuf,
        /// Print the full plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown migration report
    Report {
        #[arg(long)]
        workbook: PathBuf,
        #[arg(long, default_value = "migration-report.md")]
        out: PathBuf,
    },
    /// Export assembled metric records as CSV
    Export {
        #[arg(long)]
        workbook: PathBuf,
        #[arg(long, default_value = "metrics.csv")]
        out: PathBuf,
    },
}

fn plan_from(path: &Path, config: &MigrationConfig) -> anyhow::Result<MigrationPlan> {
    let mut workbook = XlsxWorkbook::open(path)?;
    let plan = pipeline::plan_migration(&mut workbook, config)
        .with_context(|| format!("failed to plan migration for {}", path.display()))?;
    Ok(plan)
}

fn print_counts(plan: &MigrationPlan) {
    println!(
        "{} coaches, {} periods, {} metric records.",
        plan.coach_count(),
        plan.period_count(),
        plan.record_count()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = MigrationConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::InitDb => {
            let pool = db::connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Migrate {
            workbook,
            dry_run,
            sql_out,
        } => {
            let plan = plan_from(&workbook, &config)?;

            if let Some(path) = sql_out {
                std::fs::write(&path, sql::render_sql(&plan.operations))
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("SQL written to {}.", path.display());
            }

            if dry_run {
                let mut memory = MemoryStore::new();
                store::apply(&mut memory, &plan.operations).await?;
                println!(
                    "Dry run: would leave {} coaches, {} periods, {} metrics.",
                    memory.row_count(Table::Coaches),
                    memory.row_count(Table::Periods),
                    memory.row_count(Table::Metrics)
                );
                return Ok(());
            }

            let pool = db::connect().await?;
            let stats = db::apply_migration(&pool, &plan.operations).await?;
            print_counts(&plan);
            println!(
                "Applied {} operations ({} inserted, {} updated, {} already present).",
                plan.operations.len(),
                stats.inserted,
                stats.updated,
                stats.unchanged
            );
        }
        Commands::Inspect { workbook, json } => {
            let plan = plan_from(&workbook, &config)?;
            if json {
                println!("{}", plan.to_json()?);
                return Ok(());
            }

            println!("Period sheets: {}", plan.sheets.join(", "));
            for descriptor in plan.coaches.iter() {
                println!(
                    "- {} (column {}, {} records)",
                    descriptor.coach.name,
                    descriptor.source_column,
                    plan.records
                        .iter()
                        .filter(|r| r.coach_name == descriptor.coach.name)
                        .count()
                );
            }
            print_counts(&plan);
        }
        Commands::Report { workbook, out } => {
            let plan = plan_from(&workbook, &config)?;
            let report = report::build_report(&workbook.display().to_string(), &plan);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { workbook, out } => {
            let plan = plan_from(&workbook, &config)?;
            let written = export::export_csv(&out, &plan.records)?;
            println!("Exported {written} metric records to {}.", out.display());
        }
    }

    Ok(())
}
