use crate::config::{env_or, Settings};
use crate::domain::news::{CompanyProfile, NewsArticle};
use crate::news::NewsProvider;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct FinnhubClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl FinnhubClient {
    // A missing API key is reported per call rather than here.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout_secs = env_or("NEWS_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build news http client")?;

        Ok(Self {
            http,
            base_url: settings.finnhub_base_url().to_string(),
            api_key: settings.finnhub_api_key.clone(),
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let api_key = self
            .api_key
            .as_deref()
            .context("FINNHUB_API_KEY is required")?;
        let mut headers = HeaderMap::new();
        headers.insert("X-Finnhub-Token", HeaderValue::from_str(api_key)?);
        Ok(headers)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let res = self
            .http
            .get(url)
            .headers(self.headers()?)
            .query(query)
            .send()
            .await
            .with_context(|| format!("finnhub request to {path} failed"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .with_context(|| format!("failed to read finnhub {path} response"))?;
        if !status.is_success() {
            anyhow::bail!("finnhub {path} HTTP {status}: {text}");
        }

        serde_json::from_str::<T>(&text)
            .with_context(|| format!("finnhub {path} response is not valid JSON: {text}"))
    }
}

#[async_trait::async_trait]
impl NewsProvider for FinnhubClient {
    fn provider_name(&self) -> &'static str {
        "finnhub"
    }

    async fn fetch_profile(&self, ticker: &str) -> Result<CompanyProfile> {
        let profile: ProfileResponse = self
            .get_json("/stock/profile2", &[("symbol", ticker)])
            .await?;
        Ok(profile.into_profile(ticker))
    }

    async fn fetch_company_news(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NewsArticle>> {
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        let items: Vec<NewsItem> = self
            .get_json(
                "/company-news",
                &[("symbol", ticker), ("from", from.as_str()), ("to", to.as_str())],
            )
            .await?;
        Ok(items.into_iter().map(NewsItem::into_article).collect())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    name: Option<String>,
}

impl ProfileResponse {
    // Unknown symbols come back as `{}`.
    fn into_profile(self, ticker: &str) -> CompanyProfile {
        let name = self
            .name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| ticker.to_string());
        CompanyProfile {
            ticker: ticker.to_string(),
            name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NewsItem {
    #[serde(default)]
    headline: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    datetime: Option<i64>,
}

impl NewsItem {
    fn into_article(self) -> NewsArticle {
        NewsArticle {
            headline: self.headline,
            summary: self.summary,
            source: self.source,
            published_at: self
                .datetime
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
        }
    }
}
