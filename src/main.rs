// src/main.rs

use anyhow::Result;
use lane_change_arbiter::scenario::{run_scenario, Scenario};
use lane_change_arbiter::Config;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config_path = args.get(1).map(String::as_str).unwrap_or("config.yaml");
    let scenario_path = args
        .get(2)
        .map(String::as_str)
        .unwrap_or("scenarios/overtake.yaml");

    let config = Config::load(config_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lane_change_arbiter={}", config.logging.level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🚗 Lane change arbiter replay starting");
    info!(
        "Freeze windows: fail={:.1}s success={:.1}s reckless={}",
        config.decider.change_lane_fail_freeze_time,
        config.decider.change_lane_success_freeze_time,
        config.decider.reckless_change_lane
    );
    if config.decider.reckless_change_lane {
        warn!("⚠️  Reckless change lane enabled, arbitration disabled");
    }

    let scenario = Scenario::load(scenario_path)?;
    info!("✓ Scenario loaded: {} cycles", scenario.cycles.len());

    let reports = run_scenario(&config, &scenario)?;

    for report in &reports {
        println!("{}", serde_json::to_string(report)?);
    }

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    let vetoed = reports
        .iter()
        .filter(|r| r.clear_to_change == Some(false))
        .count();
    if failed > 0 {
        error!("{} of {} cycles failed arbitration", failed, reports.len());
    }
    info!(
        "Done: {} cycles, {} vetoed by clearance, {} failed",
        reports.len(),
        vetoed,
        failed
    );

    Ok(())
}
