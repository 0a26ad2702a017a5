use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use cellcity::{
    analysis::AreaReport,
    render::{render_grid, render_pollution, render_power},
    scenario::ScenarioLoader,
    Region, ZoneKind,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Grid city growth simulator")]
struct Cli {
    /// Path to the run configuration (YAML or three-line text)
    #[arg(long, default_value = "scenarios/riverside.yaml")]
    config: PathBuf,

    /// Override the tick limit
    #[arg(long)]
    ticks: Option<u64>,

    /// Override how often the grid is printed
    #[arg(long)]
    refresh_interval: Option<u64>,

    /// Rectangle to analyze after the run, as x1,y1,x2,y2
    #[arg(long)]
    area: Option<String>,

    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    if EnvFilter::try_new(level).is_err() {
        warn!(level, "unrecognised log level, falling back to info");
    }
}

fn parse_area(text: &str) -> Result<[i64; 4]> {
    let parts = text
        .split(',')
        .map(|part| part.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid --area value {text:?}"))?;
    match parts.as_slice() {
        [x1, y1, x2, y2] => Ok([*x1, *y1, *x2, *y2]),
        _ => bail!("--area expects four comma-separated numbers, got {text:?}"),
    }
}

fn print_area(report: &AreaReport) {
    println!(
        "Area ({}, {}) to ({}, {}):",
        report.top_left.x, report.top_left.y, report.bottom_right.x, report.bottom_right.y
    );
    println!("  Residential population: {}", report.residential);
    println!("  Commercial population:  {}", report.commercial);
    println!("  Industrial population:  {}", report.industrial);
    println!(
        "  Pollution: {} total, {:.2} average",
        report.total_pollution, report.average_pollution
    );
    println!("  Power coverage: {:.0}%", report.power_coverage * 100.0);
}

fn print_stats(region: &Region) {
    println!("Final tick: {} ({:?})", region.current_tick(), region.state());
    for kind in ZoneKind::ALL {
        println!(
            "  {:<12} population {:>4}  density {:.2}",
            kind.name(),
            region.total_population(kind),
            region.density(kind)
        );
    }
    println!("  Total population: {}", region.overall_population());
    println!(
        "  Pollution: {} total, {:.2} average",
        region.total_pollution(),
        region.average_pollution()
    );
    println!(
        "  Workers: {} available, {:.0}% used",
        region.available_workers(),
        region.worker_utilization() * 100.0
    );
    println!(
        "  Goods: {} available, {:.0}% used",
        region.available_goods(),
        region.goods_utilization() * 100.0
    );
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.config)?;
    init_tracing(&scenario.logging.level);

    let settings = scenario.settings(cli.ticks, cli.refresh_interval)?;
    let area = cli.area.as_deref().map(parse_area).transpose()?;
    let mut region = scenario.build_region(settings)?;

    if !cli.json {
        println!("Initial region state:");
        print!("{}", render_grid(region.grid()));
    }
    let state = region.run_with_hook(|report, grid| {
        if !cli.json && settings.is_refresh_tick(report.tick) {
            println!("Tick {}:", report.tick);
            print!("{}", render_grid(grid));
        }
    })?;

    let area = area.map(|[x1, y1, x2, y2]| region.analyze_area(x1, y1, x2, y2));
    if cli.json {
        let summary = region.summary(area);
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Simulation stopped: {state:?}");
    println!("Final region state:");
    print!("{}", render_grid(region.grid()));
    print_stats(&region);
    println!("Pollution:");
    print!("{}", render_pollution(region.grid()));
    println!("Power:");
    print!("{}", render_power(region.grid()));
    if let Some(report) = &area {
        print_area(report);
    }
    Ok(())
}
