pub mod error;
pub mod finnhub;
pub mod indicators;
pub mod provider;
pub mod rate_limit;
pub mod yahoo;

pub use error::DataError;
pub use finnhub::FinnhubClient;
pub use indicators::compute_indicators;
pub use provider::{DataProvider, LiveDataProvider};
pub use rate_limit::RateLimiter;
pub use yahoo::YahooClient;
