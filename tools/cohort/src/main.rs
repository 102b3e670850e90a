/// Percentile targeting over a previously exported statistics CSV.
///
/// The CSV artifact written by zonal_report is the authoritative input
/// here; no raster or boundary access is needed. Prints the cohort table,
/// the departments it spans, and the per-department mean Tmin.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use friaje_core::{StatisticsTable, ZonalPipeline};

/// Departments of the Amazonian lowland subset.
const AMAZON_DEPARTMENTS: &[&str] = &["LORETO", "UCAYALI", "MADRE DE DIOS"];

#[derive(Parser, Debug)]
#[command(
    name = "cohort",
    about = "Low-percentile coldest-district cohort from a statistics CSV"
)]
struct Args {
    /// Statistics CSV exported by zonal_report
    #[arg(long)]
    stats: PathBuf,

    /// Percentile threshold as a 0-1 fraction
    #[arg(short, long, default_value = "0.10")]
    percentile: f64,

    /// Restrict to these departments (comma-separated, diacritics ignored)
    #[arg(long, value_delimiter = ',')]
    scope: Option<Vec<String>>,

    /// Shortcut for --scope LORETO,UCAYALI,"MADRE DE DIOS"
    #[arg(long, conflicts_with = "scope")]
    amazon: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let table = StatisticsTable::read_csv_path(&args.stats)
        .with_context(|| format!("loading statistics from {}", args.stats.display()))?;
    info!("loaded {} rows", table.len());
    let pipeline = ZonalPipeline::from_table(table);

    let scope: Option<Vec<&str>> = if args.amazon {
        Some(AMAZON_DEPARTMENTS.to_vec())
    } else {
        args.scope
            .as_ref()
            .map(|s| s.iter().map(String::as_str).collect())
    };

    let cohort = pipeline.cohort(args.percentile, scope.as_deref())?;

    println!(
        "Threshold: mean Tmin <= {:.2} C (percentile {:.0}%)",
        cohort.threshold,
        args.percentile * 100.0
    );
    println!("\n{} district(s) in the cohort:", cohort.rows.len());
    println!(
        "  {:<8} {:<16} {:<16} {:<24} {:>8}",
        "UBIGEO", "DEPARTMENT", "PROVINCE", "DISTRICT", "TMIN"
    );
    for r in &cohort.rows {
        println!(
            "  {:<8} {:<16} {:<16} {:<24} {:>7.2}",
            r.ubigeo, r.department, r.province, r.district, r.tmin_mean
        );
    }

    println!("\nDepartments represented: {}", cohort.departments.join(", "));
    println!("Cohort mean Tmin: {:.2} C", cohort.overall_mean);
    println!("\nMean Tmin by department:");
    for (dept, m) in &cohort.department_means {
        println!("  {dept:<16} {m:>7.2} C");
    }

    Ok(())
}
