use thiserror::Error;

/// Error depicting errors that occur while loading the configuration and its data files
///
#[derive(Error, Debug)]
#[error("ConfigError: {0}")]
pub struct ConfigError(pub String);
impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self { ConfigError(format!("io error: {}", e)) }
}
impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self { ConfigError(format!("toml document error: {}", e)) }
}
impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self { ConfigError(format!("json document error: {}", e)) }
}
impl From<glob::PatternError> for ConfigError {
    fn from(e: glob::PatternError) -> Self { ConfigError(format!("file pattern error: {}", e)) }
}

/// Error depicting problems with the logging setup
///
#[derive(Error, Debug)]
#[error("LoggingError: {0}")]
pub struct LoggingError(pub String);
impl From<std::io::Error> for LoggingError {
    fn from(e: std::io::Error) -> Self { LoggingError(e.to_string()) }
}
impl From<log4rs::config::runtime::ConfigErrors> for LoggingError {
    fn from(e: log4rs::config::runtime::ConfigErrors) -> Self { LoggingError(e.to_string()) }
}
impl From<log::SetLoggerError> for LoggingError {
    fn from(e: log::SetLoggerError) -> Self { LoggingError(e.to_string()) }
}

/// Error depicting violations of the tiling rules of a custom tariff schedule
///
#[derive(Error, Debug, PartialEq)]
pub enum ScheduleError {
    #[error("ScheduleError: day {month:02}-{day:02} is not covered by any date range")]
    DayNotCovered { month: u32, day: u32 },
    #[error("ScheduleError: day {month:02}-{day:02} is covered by {count} date ranges")]
    DayOverlap { month: u32, day: u32, count: usize },
    #[error("ScheduleError: date range {range} leaves hour {hour} without a time slot")]
    HourNotCovered { range: usize, hour: u32 },
    #[error("ScheduleError: date range {range} covers hour {hour} by {count} time slots")]
    HourOverlap { range: usize, hour: u32, count: usize },
    #[error("ScheduleError: date range {range} has an invalid bound: {reason}")]
    InvalidBound { range: usize, reason: String },
}

/// Error depicting invalid data model input, e.g. obstacles that can't be normalized
///
#[derive(Error, Debug)]
#[error("ModelError: {0}")]
pub struct ModelError(pub String);

/// Error depicting failures when obtaining market prices
///
#[derive(Error, Debug)]
#[error("PriceError: {0}")]
pub struct PriceError(pub String);
impl From<std::io::Error> for PriceError {
    fn from(e: std::io::Error) -> Self { PriceError(format!("io error: {}", e)) }
}
impl From<serde_json::Error> for PriceError {
    fn from(e: serde_json::Error) -> Self { PriceError(format!("json document error: {}", e)) }
}

/// Error depicting a failed simulation run
///
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("SimulationError: no consumption records to simulate")]
    NoConsumption,
    #[error("SimulationError: no company offers selected")]
    NoOffers,
    #[error("SimulationError: offer '{offer}' references unknown tariff schedule '{schedule}'")]
    UnknownSchedule { offer: String, schedule: String },
    #[error("SimulationError: offer '{0}' uses market prices but no market price table was supplied")]
    MissingMarketPrices(String),
}

/// Error depicting failures when saving simulation reports
///
#[derive(Error, Debug)]
#[error("ReportError: {0}")]
pub struct ReportError(pub String);
impl From<std::io::Error> for ReportError {
    fn from(e: std::io::Error) -> Self { ReportError(format!("io error: {}", e)) }
}
impl From<serde_json::Error> for ReportError {
    fn from(e: serde_json::Error) -> Self { ReportError(format!("json document error: {}", e)) }
}
impl From<glob::PatternError> for ReportError {
    fn from(e: glob::PatternError) -> Self { ReportError(format!("file pattern error: {}", e)) }
}

/// Error depicting failures during initialization, i.e. before any simulation has started
///
#[derive(Error, Debug)]
#[error("InitError: {0}")]
pub struct InitError(pub String);
impl From<ConfigError> for InitError {
    fn from(e: ConfigError) -> Self { InitError(e.to_string()) }
}
impl From<LoggingError> for InitError {
    fn from(e: LoggingError) -> Self { InitError(e.to_string()) }
}
impl From<PriceError> for InitError {
    fn from(e: PriceError) -> Self { InitError(e.to_string()) }
}
