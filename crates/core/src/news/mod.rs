pub mod finnhub;
pub mod relevance;

use crate::domain::news::{CompanyProfile, NewsArticle};
use anyhow::Result;
use chrono::NaiveDate;

pub const NEWS_WINDOW_DAYS: i64 = 30;

pub const MAX_CANDIDATES: usize = 30;

#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_profile(&self, ticker: &str) -> Result<CompanyProfile>;

    async fn fetch_company_news(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NewsArticle>>;
}
