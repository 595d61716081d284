// SPDX-License-Identifier: PMPL-1.0-or-later

//! attack-diag: generate attack-tree diagnosability benchmarks, run them
//! through TAPAAL and summarize the verdicts.

use anyhow::Result;
use attack_diag::config::HarnessConfig;
use attack_diag::report::{self, chart, output, ReportOutputFormat};
use attack_diag::verify::Runner;
use attack_diag::{diagnostics, generate, usecase};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "attack-diag")]
#[command(version)]
#[command(about = "Attack-tree diagnosability benchmarking with TAPAAL")]
#[command(long_about = None)]
struct Cli {
    /// Harness configuration (JSON or YAML)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate random attack trees as TAPAAL model/query pairs
    Generate {
        /// Number of trees (overrides the config)
        #[arg(short = 'n', long)]
        count: Option<u32>,

        /// Batch seed (overrides the config)
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Verify every model/query pair in the configured id range
    Run,

    /// Summarize a results CSV
    Summarize {
        /// Results CSV (defaults to the configured path)
        #[arg(short, long)]
        results: Option<PathBuf>,

        /// Format for --output (inferred from its extension otherwise)
        #[arg(short, long, value_enum)]
        format: Option<ReportOutputFormat>,

        /// Write the summary to a file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write an SVG bar chart of outcome counts
        #[arg(long, value_name = "FILE")]
        svg: Option<PathBuf>,
    },

    /// Build the e-commerce insider-threat use case
    UseCase {
        /// Directory for use_case.xml, use_case.q and the analysis JSON
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Run the use case through the configured verifier
        #[arg(long)]
        verify: bool,
    },

    /// Render LaTeX tables and a report from the use-case analysis
    UseCaseReport {
        /// Analysis JSON written by `use-case`
        #[arg(short, long, default_value = usecase::ANALYSIS_FILE)]
        analysis: PathBuf,

        /// Directory for the .tex and summary files
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Check verifier tooling and input files
    Doctor,
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mut config = HarnessConfig::load_or_default(cli.config.as_deref())?;
    log::debug!("configuration: {:?}", config);

    match cli.command {
        Commands::Generate { count, seed } => {
            if let Some(count) = count {
                config.generator.count = count;
            }
            if let Some(seed) = seed {
                config.generator.seed = seed;
            }
            config.validate()?;

            println!(
                "Generating {} trees (seed {})",
                config.generator.count, config.generator.seed
            );
            let batch = generate::generate_batch(&config.generator, &config.paths)?;
            generate::write_metadata(&batch, &config.paths.metadata)?;
            generate::print_summary(&batch, &config.paths);
        }

        Commands::Run => {
            let runner = Runner::new(config)?;
            runner.run()?;
        }

        Commands::Summarize {
            results,
            format,
            output: output_path,
            svg,
        } => {
            let results = results.unwrap_or_else(|| config.paths.results.clone());
            println!("Summarizing: {}", results.display());
            let summary = report::summarize_file(&results)?;

            if let Some(path) = output_path {
                let format = format
                    .or_else(|| ReportOutputFormat::from_path(&path))
                    .unwrap_or(ReportOutputFormat::Json);
                output::save_summary(&summary, format, &path)?;
            } else if let Some(format) = format {
                println!("{}", format.serialize(&summary)?);
            }

            if let Some(path) = svg {
                let title = format!("Verification outcomes ({} trees)", summary.total);
                chart::save_chart(&summary, &title, &path)?;
            }
        }

        Commands::UseCase { out_dir, verify } => {
            usecase::run_use_case(&config, &out_dir, verify)?;
        }

        Commands::UseCaseReport { analysis, out_dir } => {
            println!("Loading analysis: {}", analysis.display());
            let analysis = usecase::load_analysis(&analysis)?;
            usecase::latex::write_report(&analysis, &out_dir)?;
        }

        Commands::Doctor => {
            diagnostics::run_doctor(&config)?;
        }
    }

    Ok(())
}
