//! Generate the enrollment forecast report from CSV inputs.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use enroll_forecast::aggregate::run_forecast_from_providers;
use enroll_forecast::data::{
    CohortProvider, CsvCohortProvider, CsvHistoryProvider, CsvPrerequisiteProvider,
    StaticCohorts,
};
use enroll_forecast::profile::RunConfig;

#[derive(Parser)]
#[command(name = "forecast_report")]
#[command(about = "Forecast next-term enrollment per course from CSV history", long_about = None)]
struct Cli {
    /// Enrollment history CSV (code,term,enrolled,title)
    #[arg(long)]
    history: PathBuf,

    /// Prerequisite map CSV (course_code,prereq_1,prereq_2)
    #[arg(long)]
    prereqs: PathBuf,

    /// Cohort-size CSV (year,count); optional
    #[arg(long)]
    cohorts: Option<PathBuf>,

    /// Where to write the JSON report
    #[arg(long, default_value = "forecast_data.json")]
    out: PathBuf,

    /// Course receiving the cohort-size feature column
    #[arg(long)]
    entry_course: Option<String>,

    /// Course fitted with the (1,0,1,2) seasonal override
    #[arg(long)]
    gateway_course: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = RunConfig::default();
    if let Some(entry) = cli.entry_course {
        config.entry_course = entry;
    }
    if let Some(gateway) = cli.gateway_course {
        config.gateway_course = gateway;
    }

    let history = CsvHistoryProvider::new(&cli.history);
    let prereqs = CsvPrerequisiteProvider::new(&cli.prereqs);
    let cohorts: Box<dyn CohortProvider> = match &cli.cohorts {
        Some(path) => Box::new(CsvCohortProvider::new(path)),
        None => Box::new(StaticCohorts::default()),
    };

    let report = run_forecast_from_providers(&history, &prereqs, cohorts.as_ref(), &config)
        .context("forecast run failed")?;

    let json = report.to_json().context("report serialization failed")?;
    fs::write(&cli.out, json)
        .with_context(|| format!("writing report to {}", cli.out.display()))?;

    println!("Saved forecast report to {}", cli.out.display());
    Ok(())
}
