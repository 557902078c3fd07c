use std::env;
use anyhow::{Context, Result};
use log::{error, info};
use solarbill::initialization::init;
use solarbill::report::save_report;
use solarbill::simulation::{run_all, SimulationInput};

const CONFIG_ENV: &str = "SOLARBILL_CONFIG";

fn main() -> Result<()> {
    let config_path = env::args()
        .nth(1)
        .or_else(|| env::var(CONFIG_ENV).ok())
        .context(format!("usage: solarbill <config.toml>, or set {}", CONFIG_ENV))?;

    let setup = init(&config_path).context("initialization failed")?;

    let input = SimulationInput {
        consumption: &setup.consumption,
        production: &setup.production,
        schedules: &setup.config.schedules,
        market_prices: setup.market_prices.as_ref(),
    };

    let results = run_all(&input, &setup.config.offers, &setup.config.batteries)
        .inspect_err(|e| error!("{}", e))
        .context("simulation failed")?;

    for result in &results {
        info!("\n{}", result);
    }
    if let Some(best) = results.iter().min_by(|a, b| a.annual.total.total_cmp(&b.annual.total)) {
        info!("cheapest: {} with {}, {:.2} per year",
            best.offer, best.battery.as_deref().unwrap_or("no battery"), best.annual.total);
    }

    let path = save_report(
        &setup.config.files.results_dir,
        &results,
        setup.production.diagnostics(),
        setup.config.general.keep_reports_days)
        .context("saving report failed")?;
    info!("report saved to {}", path);

    Ok(())
}
