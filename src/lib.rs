pub mod errors;
pub mod models;
pub mod manager_sun;
pub mod manager_prices;
pub mod shadow;
pub mod production;
pub mod periods;
pub mod charge;
pub mod billing;
pub mod simulation;
pub mod config;
pub mod initialization;
pub mod report;
