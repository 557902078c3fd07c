use log::{info, warn};
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;
use crate::config::{load_config, load_consumption, Config, General};
use crate::errors::{InitError, LoggingError};
use crate::manager_prices::{FilePrices, PriceSource};
use crate::models::consumption::ConsumptionRecord;
use crate::models::market_prices::MarketPrices;
use crate::production::ProductionIndex;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}";

/// Everything a simulation run needs, loaded and prepared
pub struct Setup {
    pub config: Config,
    pub consumption: Vec<ConsumptionRecord>,
    pub production: ProductionIndex,
    pub market_prices: Option<MarketPrices>,
}

/// Loads configuration, starts logging and prepares consumption, production and market prices
///
/// # Arguments
///
/// * 'config_path' - path to the configuration file
pub fn init(config_path: &str) -> Result<Setup, InitError> {
    let config = load_config(config_path)?;
    init_logging(&config.general)?;

    info!("solarbill version: {}", env!("CARGO_PKG_VERSION"));

    let consumption = load_consumption(&config.files.consumption_file)?;
    info!("loaded {} consumption hours from {}", consumption.len(), config.files.consumption_file);

    let production = ProductionIndex::build(&config.installation);
    info!("production index holds {:.1} kWh for a typical year", production.total());

    let market_prices = load_market_prices(&config, &consumption)?;

    Ok(Setup { config, consumption, production, market_prices })
}

/// Sets up log4rs with a file appender and, if configured, a console appender
///
/// # Arguments
///
/// * 'general' - general configuration holding log path, level and stdout flag
pub fn init_logging(general: &General) -> Result<(), LoggingError> {
    let file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build(&general.log_path)?;

    let mut builder = LogConfig::builder().appender(Appender::builder().build("file", Box::new(file)));
    let mut root = Root::builder().appender("file");

    if general.log_to_stdout {
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build();
        builder = builder.appender(Appender::builder().build("stdout", Box::new(stdout)));
        root = root.appender("stdout");
    }

    let log_config = builder.build(root.build(general.log_level))?;
    log4rs::init_config(log_config)?;

    Ok(())
}

/// Fetches market prices covering the consumption period in one batch, but only if some offer
/// needs them
///
/// # Arguments
///
/// * 'config' - the configuration
/// * 'consumption' - consumption records, defining the date range
fn load_market_prices(config: &Config, consumption: &[ConsumptionRecord]) -> Result<Option<MarketPrices>, InitError> {
    if !config.offers.iter().any(|o| o.use_market_price) {
        return Ok(None);
    }

    let Some(path) = &config.files.market_prices_file else {
        warn!("market price offers are configured but no market price file is given");
        return Ok(None);
    };

    let from = consumption.iter().map(|r| r.date).min();
    let to = consumption.iter().map(|r| r.date).max();
    match from.zip(to) {
        Some((from, to)) => Ok(Some(FilePrices::new(path).prices(from, to)?)),
        None => Ok(None),
    }
}
