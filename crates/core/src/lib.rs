pub mod cache;
pub mod clock;
pub mod domain;
pub mod error;
pub mod market;
pub mod news;
pub mod report;
pub mod resolver;
pub mod tools;

pub mod config {
    use anyhow::Context;

    const DEFAULT_MARKET_DATA_BASE_URL: &str = "https://query2.finance.yahoo.com";
    const DEFAULT_FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub finnhub_api_key: Option<String>,
        pub finnhub_base_url: Option<String>,
        pub market_data_base_url: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                finnhub_api_key: non_empty_var("FINNHUB_API_KEY"),
                finnhub_base_url: non_empty_var("FINNHUB_BASE_URL"),
                market_data_base_url: non_empty_var("MARKET_DATA_BASE_URL"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_finnhub_api_key(&self) -> anyhow::Result<&str> {
            self.finnhub_api_key
                .as_deref()
                .context("FINNHUB_API_KEY is required")
        }

        pub fn finnhub_base_url(&self) -> &str {
            self.finnhub_base_url
                .as_deref()
                .unwrap_or(DEFAULT_FINNHUB_BASE_URL)
        }

        pub fn market_data_base_url(&self) -> &str {
            self.market_data_base_url
                .as_deref()
                .unwrap_or(DEFAULT_MARKET_DATA_BASE_URL)
        }
    }

    pub fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
        std::env::var(key)
            .ok()
            .and_then(|s| s.trim().parse::<T>().ok())
            .unwrap_or(default)
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }

}
