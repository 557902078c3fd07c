pub mod battery;
pub mod consumption;
pub mod installation;
pub mod market_prices;
pub mod obstacle;
pub mod results;
pub mod tariff;
