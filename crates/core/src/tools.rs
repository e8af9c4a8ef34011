use crate::cache::{ResultCache, TtlCache};
use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::error::ToolError;
use crate::market::adapter::{fetch_market_data, snapshot_ratios};
use crate::market::yahoo::YahooFinanceClient;
use crate::market::MarketDataProvider;
use crate::news::finnhub::FinnhubClient;
use crate::news::relevance::{format_digest, RelevanceFilter};
use crate::news::{NewsProvider, MAX_CANDIDATES, NEWS_WINDOW_DAYS};
use crate::report::{error_payload, HealthReport};
use crate::resolver;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub const HEALTH_TOOL: &str = "get_financial_health";
pub const NEWS_TOOL: &str = "get_company_news";

#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    UnknownTool(String),
    MissingTicker,
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeError::UnknownTool(name) => write!(f, "unknown tool: {name}"),
            InvokeError::MissingTicker => write!(f, "argument 'ticker' must be a non-empty string"),
        }
    }
}

impl std::error::Error for InvokeError {}

#[derive(Clone)]
pub struct Toolbox {
    market: Arc<dyn MarketDataProvider>,
    news: Arc<dyn NewsProvider>,
    cache: Arc<dyn ResultCache>,
    clock: Arc<dyn Clock>,
}

impl Toolbox {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        news: Arc<dyn NewsProvider>,
        cache: Arc<dyn ResultCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            market,
            news,
            cache,
            clock,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Ok(Self::new(
            Arc::new(YahooFinanceClient::from_settings(settings)?),
            Arc::new(FinnhubClient::from_settings(settings)?),
            Arc::new(TtlCache::new(clock.clone())),
            clock,
        ))
    }

    pub fn descriptors() -> Vec<ToolDescriptor> {
        let ticker_schema = serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["ticker"],
            "properties": {
                "ticker": {"type": "string", "description": "Stock ticker symbol, e.g. AAPL"}
            }
        });

        vec![
            ToolDescriptor {
                name: HEALTH_TOOL,
                description: "Fetches valuation, liquidity, profitability and solvency ratios for a ticker, \
                              recomputing growth, leverage and coverage from financial statements where possible",
                input_schema: ticker_schema.clone(),
            },
            ToolDescriptor {
                name: NEWS_TOOL,
                description: "Returns up to 10 recent news articles about the company behind a ticker",
                input_schema: ticker_schema,
            },
        ]
    }

    pub async fn invoke(&self, name: &str, args: &Value) -> Result<Value, InvokeError> {
        let ticker = args
            .get("ticker")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match name {
            HEALTH_TOOL => {
                let ticker = ticker.ok_or(InvokeError::MissingTicker)?;
                Ok(self.get_financial_health(ticker).await)
            }
            NEWS_TOOL => {
                let ticker = ticker.ok_or(InvokeError::MissingTicker)?;
                Ok(Value::String(self.get_company_news(ticker).await))
            }
            other => Err(InvokeError::UnknownTool(other.to_string())),
        }
    }

    pub async fn get_financial_health(&self, ticker: &str) -> Value {
        match self.financial_health(ticker).await {
            Ok(report) => match serde_json::to_value(&report) {
                Ok(v) => v,
                Err(err) => {
                    tracing::error!(%ticker, error = %err, "failed to serialize health report");
                    serde_json::json!({ "error": format!("failed to serialize report: {err}") })
                }
            },
            Err(err) => {
                tracing::error!(%ticker, error = %err, "financial health lookup failed");
                error_payload(&err)
            }
        }
    }

    pub async fn financial_health(&self, ticker: &str) -> Result<HealthReport, ToolError> {
        let ticker = ticker.trim().to_uppercase();
        let data = fetch_market_data(self.market.as_ref(), &ticker).await?;

        let mut ratios = snapshot_ratios(&data.snapshot);
        resolver::resolve(&ticker, &mut ratios, &data.income, &data.balance_sheet);

        tracing::info!(%ticker, ratios = ratios.len(), "financial health report assembled");
        Ok(HealthReport::assemble(&data.snapshot, ratios))
    }

    pub async fn get_company_news(&self, ticker: &str) -> String {
        match self.company_news(ticker).await {
            Ok(digest) => digest,
            Err(err) => {
                tracing::error!(%ticker, error = %err, "company news lookup failed");
                err.to_string()
            }
        }
    }

    async fn company_news(&self, ticker: &str) -> Result<String, ToolError> {
        let ticker = ticker.trim().to_uppercase();

        if let Some(cached) = self.cache.lookup(&ticker).await {
            tracing::debug!(%ticker, "news cache hit");
            return Ok(cached);
        }
        tracing::debug!(%ticker, "news cache miss");

        let to = self.clock.now().date_naive();
        let from = to - chrono::Duration::days(NEWS_WINDOW_DAYS);

        let (profile, mut articles) = tokio::try_join!(
            self.news.fetch_profile(&ticker),
            self.news.fetch_company_news(&ticker, from, to),
        )
        .map_err(|err| ToolError::NewsFetch {
            ticker: ticker.clone(),
            detail: format!("{err:#}"),
        })?;
        articles.truncate(MAX_CANDIDATES);

        let filter = RelevanceFilter::new(&ticker, &profile.name);
        let kept = filter.select(&articles);
        tracing::info!(
            %ticker,
            provider = self.news.provider_name(),
            candidates = articles.len(),
            kept = kept.len(),
            "company news filtered"
        );

        let digest = format_digest(&kept);
        self.cache.store(&ticker, digest.clone()).await;
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::FakeClock;
    use crate::domain::financials::{keys, line_items, FinancialSnapshot, StatementKind, StatementTable};
    use crate::domain::news::{CompanyProfile, NewsArticle};
    use crate::news::relevance::NO_RELEVANT_NEWS;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeMarket {
        snapshot: FinancialSnapshot,
        income: StatementTable,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for FakeMarket {
        fn provider_name(&self) -> &'static str {
            "fake_market"
        }

        async fn fetch_snapshot(&self, ticker: &str) -> anyhow::Result<FinancialSnapshot> {
            if self.fail {
                anyhow::bail!("provider unreachable");
            }
            Ok(FinancialSnapshot {
                ticker: ticker.to_string(),
                ..self.snapshot.clone()
            })
        }

        async fn fetch_statement(
            &self,
            _ticker: &str,
            kind: StatementKind,
        ) -> anyhow::Result<StatementTable> {
            Ok(match kind {
                StatementKind::Income => self.income.clone(),
                other => StatementTable::empty(other),
            })
        }
    }

    struct FakeNews {
        name: String,
        articles: Vec<NewsArticle>,
        fail: bool,
        profile_calls: AtomicUsize,
        news_calls: AtomicUsize,
        last_window: Mutex<Option<(NaiveDate, NaiveDate)>>,
    }

    impl FakeNews {
        fn new(name: &str, headlines: &[&str]) -> Self {
            Self {
                name: name.to_string(),
                articles: headlines
                    .iter()
                    .map(|h| NewsArticle {
                        headline: h.to_string(),
                        summary: "summary".to_string(),
                        source: "Reuters".to_string(),
                        published_at: None,
                    })
                    .collect(),
                fail: false,
                profile_calls: AtomicUsize::new(0),
                news_calls: AtomicUsize::new(0),
                last_window: Mutex::new(None),
            }
        }
    }

    #[async_trait::async_trait]
    impl NewsProvider for FakeNews {
        fn provider_name(&self) -> &'static str {
            "fake_news"
        }

        async fn fetch_profile(&self, ticker: &str) -> anyhow::Result<CompanyProfile> {
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            Ok(CompanyProfile {
                ticker: ticker.to_string(),
                name: self.name.clone(),
            })
        }

        async fn fetch_company_news(
            &self,
            _ticker: &str,
            from: NaiveDate,
            to: NaiveDate,
        ) -> anyhow::Result<Vec<NewsArticle>> {
            self.news_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_window.lock().unwrap() = Some((from, to));
            if self.fail {
                anyhow::bail!("HTTP 503");
            }
            Ok(self.articles.clone())
        }
    }

    fn apple_snapshot() -> FinancialSnapshot {
        FinancialSnapshot {
            ticker: "AAPL".to_string(),
            long_name: Some("Apple Inc.".to_string()),
            industry: Some("Consumer Electronics".to_string()),
            description: None,
            fields: [
                ("trailingPE".to_string(), Some(28.4)),
                ("currentRatio".to_string(), Some(1.2)),
                ("revenueGrowth".to_string(), None),
            ]
            .into_iter()
            .collect(),
        }
    }

    fn toolbox(market: FakeMarket, news: Arc<FakeNews>) -> (Arc<FakeClock>, Toolbox) {
        let clock = Arc::new(FakeClock::at(
            Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap(),
        ));
        let cache = Arc::new(TtlCache::new(clock.clone()));
        let toolbox = Toolbox::new(Arc::new(market), news, cache, clock.clone());
        (clock, toolbox)
    }

    fn apple_market() -> FakeMarket {
        FakeMarket {
            snapshot: apple_snapshot(),
            income: StatementTable::empty(StatementKind::Income)
                .with_line_item(line_items::TOTAL_REVENUE, vec![Some(120.0), Some(100.0)]),
            fail: false,
        }
    }

    #[tokio::test]
    async fn health_report_blends_snapshot_and_statements() {
        let (_clock, tools) = toolbox(apple_market(), Arc::new(FakeNews::new("Apple Inc", &[])));

        let v = tools.get_financial_health("aapl").await;
        assert_eq!(v["ticker"], json!("AAPL"));
        assert_eq!(v["company_name"], json!("Apple Inc."));
        assert_eq!(v["industry"], json!("Consumer Electronics"));
        assert_eq!(v["description"], json!("N/A"));
        assert_eq!(v["ratios"][keys::PE_RATIO], json!(28.4));
        assert_eq!(v["ratios"][keys::CURRENT_RATIO], json!(1.2));
        assert_eq!(v["ratios"][keys::REVENUE_GROWTH], json!(20.0));
        assert_eq!(v["ratios"][keys::DEBT_TO_ASSET], Value::Null);
    }

    #[tokio::test]
    async fn health_failure_is_an_error_mapping() {
        let market = FakeMarket {
            fail: true,
            ..apple_market()
        };
        let (_clock, tools) = toolbox(market, Arc::new(FakeNews::new("Apple Inc", &[])));

        let v = tools.get_financial_health("AAPL").await;
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert!(obj["error"].as_str().unwrap().contains("provider unreachable"));
    }

    #[tokio::test]
    async fn news_is_cached_for_the_ttl() {
        let news = Arc::new(FakeNews::new(
            "Apple Inc",
            &["Apple unveils new chip", "Tech markets rally"],
        ));
        let (clock, tools) = toolbox(apple_market(), news.clone());

        let first = tools.get_company_news("AAPL").await;
        assert!(first.starts_with("1. Apple unveils new chip"));
        assert!(!first.contains("Tech markets rally"));

        clock.advance(Duration::minutes(10));
        let second = tools.get_company_news("aapl").await;
        assert_eq!(first, second);
        assert_eq!(news.profile_calls.load(Ordering::SeqCst), 1);
        assert_eq!(news.news_calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::minutes(21));
        let third = tools.get_company_news("AAPL").await;
        assert_eq!(third, first);
        assert_eq!(news.profile_calls.load(Ordering::SeqCst), 2);
        assert_eq!(news.news_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn news_window_is_trailing_thirty_days() {
        let news = Arc::new(FakeNews::new("Apple Inc", &[]));
        let (_clock, tools) = toolbox(apple_market(), news.clone());

        tools.get_company_news("AAPL").await;
        let window = *news.last_window.lock().unwrap();
        assert_eq!(
            window,
            Some((
                NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            ))
        );
    }

    #[tokio::test]
    async fn zero_matches_return_the_sentinel() {
        let news = Arc::new(FakeNews::new("Apple Inc", &["Tech markets rally"]));
        let (_clock, tools) = toolbox(apple_market(), news);

        assert_eq!(tools.get_company_news("AAPL").await, NO_RELEVANT_NEWS);
    }

    #[tokio::test]
    async fn news_failure_is_an_error_string_and_not_cached() {
        let mut failing = FakeNews::new("Apple Inc", &["Apple unveils new chip"]);
        failing.fail = true;
        let news = Arc::new(failing);
        let (_clock, tools) = toolbox(apple_market(), news.clone());

        let out = tools.get_company_news("aapl").await;
        assert!(out.starts_with("Error fetching news for AAPL: "));
        assert!(out.contains("HTTP 503"));

        tools.get_company_news("AAPL").await;
        assert_eq!(news.news_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn only_the_first_thirty_candidates_are_considered() {
        let mut headlines: Vec<String> = (0..30).map(|i| format!("Markets story {i}")).collect();
        headlines.push("Apple unveils new chip".to_string());
        let refs: Vec<&str> = headlines.iter().map(String::as_str).collect();
        let news = Arc::new(FakeNews::new("Apple Inc", &refs));
        let (_clock, tools) = toolbox(apple_market(), news);

        assert_eq!(tools.get_company_news("AAPL").await, NO_RELEVANT_NEWS);
    }

    #[tokio::test]
    async fn invoke_dispatches_by_name() {
        let news = Arc::new(FakeNews::new("Apple Inc", &["Apple unveils new chip"]));
        let (_clock, tools) = toolbox(apple_market(), news);

        let health = tools
            .invoke(HEALTH_TOOL, &json!({"ticker": "AAPL"}))
            .await
            .unwrap();
        assert_eq!(health["company_name"], json!("Apple Inc."));

        let digest = tools
            .invoke(NEWS_TOOL, &json!({"ticker": " aapl "}))
            .await
            .unwrap();
        assert!(digest.as_str().unwrap().starts_with("1. "));

        assert_eq!(
            tools.invoke("get_weather", &json!({"ticker": "AAPL"})).await,
            Err(InvokeError::UnknownTool("get_weather".to_string()))
        );
        assert_eq!(
            tools.invoke(NEWS_TOOL, &json!({"ticker": ""})).await,
            Err(InvokeError::MissingTicker)
        );
    }

    #[test]
    fn descriptors_cover_both_tools() {
        let names: Vec<&str> = Toolbox::descriptors().iter().map(|d| d.name).collect();
        assert_eq!(names, vec![HEALTH_TOOL, NEWS_TOOL]);
    }
}
