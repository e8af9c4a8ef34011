use crate::config::{env_or, Settings};
use crate::domain::financials::{line_items, FinancialSnapshot, StatementKind, StatementTable};
use crate::market::MarketDataProvider;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;
const COOKIE_URL: &str = "https://fc.yahoo.com";
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const SNAPSHOT_MODULES: &[&str] = &[
    "financialData",
    "defaultKeyStatistics",
    "summaryDetail",
    "price",
    "assetProfile",
];

// Statement entries carry these next to the line items.
const NON_LINE_ITEM_KEYS: &[&str] = &["maxAge", "endDate"];

const LINE_ITEM_NAMES: &[(&str, &str)] = &[
    ("totalRevenue", line_items::TOTAL_REVENUE),
    ("ebit", line_items::EBIT),
    ("interestExpense", line_items::INTEREST_EXPENSE),
    ("totalAssets", line_items::TOTAL_ASSETS),
    ("totalDebt", line_items::TOTAL_DEBT),
];

#[derive(Debug)]
pub struct YahooFinanceClient {
    http: reqwest::Client,
    base_url: String,
    retries: u32,

    // Session crumb, reused until the provider rejects it.
    crumb_cache: tokio::sync::Mutex<Option<String>>,
}

impl YahooFinanceClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout_secs = env_or("MARKET_DATA_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        let retries = env_or("MARKET_DATA_RETRIES", DEFAULT_RETRIES).max(1);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url: settings.market_data_base_url().to_string(),
            retries,
            crumb_cache: tokio::sync::Mutex::new(None),
        })
    }

    async fn crumb(&self) -> Result<String> {
        let mut guard = self.crumb_cache.lock().await;
        if let Some(crumb) = guard.as_ref() {
            return Ok(crumb.clone());
        }
        let crumb = self.fetch_crumb().await?;
        *guard = Some(crumb.clone());
        Ok(crumb)
    }

    async fn invalidate_crumb(&self) {
        *self.crumb_cache.lock().await = None;
    }

    async fn fetch_crumb(&self) -> Result<String> {
        // Only the session cookie matters here; the status is usually 404.
        let _ = self
            .http
            .get(COOKIE_URL)
            .send()
            .await
            .context("yahoo session cookie request failed")?;

        let url = format!("{}/v1/test/getcrumb", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .get(url)
            .send()
            .await
            .context("yahoo crumb request failed")?;
        let status = res.status();
        let text = res.text().await.context("failed to read yahoo crumb")?;
        if !status.is_success() {
            return Err(HttpStatusError::new("yahoo crumb", status, text).into());
        }

        let crumb = text.trim();
        anyhow::ensure!(
            !crumb.is_empty() && !crumb.contains('<'),
            "yahoo returned an invalid crumb"
        );
        Ok(crumb.to_string())
    }

    // `None` when the provider does not know the symbol.
    async fn quote_summary_once(&self, ticker: &str, modules: &str) -> Result<Option<Value>> {
        let crumb = self.crumb().await?;
        let url = quote_summary_url(&self.base_url, ticker)?;

        let res = self
            .http
            .get(url)
            .query(&[("modules", modules), ("crumb", crumb.as_str())])
            .send()
            .await
            .context("quoteSummary request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read quoteSummary response")?;

        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_crumb().await;
            return Err(HttpStatusError::new("quoteSummary", status, "crumb rejected").into());
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(HttpStatusError::new("quoteSummary", status, text).into());
        }

        let envelope = serde_json::from_str::<QuoteSummaryEnvelope>(&text)
            .with_context(|| format!("quoteSummary response is not valid JSON: {text}"))?;
        if let Some(err) = envelope.quote_summary.error.filter(|e| !e.is_null()) {
            tracing::debug!(%ticker, error = %err, "quoteSummary reported an error");
            return Ok(None);
        }
        Ok(envelope
            .quote_summary
            .result
            .and_then(|results| results.into_iter().next()))
    }

    async fn quote_summary(&self, ticker: &str, modules: &str) -> Result<Option<Value>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.quote_summary_once(ticker, modules).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if attempt >= self.retries || !is_transient(&err) {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, %ticker, modules, ?backoff, error = %err, "quoteSummary fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooFinanceClient {
    fn provider_name(&self) -> &'static str {
        "yahoo_finance"
    }

    async fn fetch_snapshot(&self, ticker: &str) -> Result<FinancialSnapshot> {
        let result = self
            .quote_summary(ticker, &SNAPSHOT_MODULES.join(","))
            .await?;
        Ok(match result {
            Some(result) => parse_snapshot(ticker, &result),
            None => FinancialSnapshot {
                ticker: ticker.to_string(),
                ..Default::default()
            },
        })
    }

    async fn fetch_statement(&self, ticker: &str, kind: StatementKind) -> Result<StatementTable> {
        let (module, _) = statement_module(kind);
        let result = self.quote_summary(ticker, module).await?;
        Ok(match result {
            Some(result) => parse_statement(kind, &result),
            None => StatementTable::empty(kind),
        })
    }
}

#[derive(Debug)]
struct HttpStatusError {
    endpoint: &'static str,
    status: StatusCode,
    body: String,
}

impl HttpStatusError {
    fn new(endpoint: &'static str, status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            endpoint,
            status,
            body: body.into(),
        }
    }
}

impl fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} HTTP {}: {}", self.endpoint, self.status, self.body)
    }
}

impl std::error::Error for HttpStatusError {}

// Transport failures, throttling, server errors and a rejected crumb are worth another
// attempt. Other client errors and undecodable bodies are not.
fn is_transient(err: &anyhow::Error) -> bool {
    if let Some(e) = err.downcast_ref::<HttpStatusError>() {
        return e.status.is_server_error()
            || e.status == StatusCode::TOO_MANY_REQUESTS
            || e.status == StatusCode::UNAUTHORIZED;
    }
    err.downcast_ref::<reqwest::Error>()
        .is_some_and(|e| e.is_timeout() || e.is_connect() || e.is_request() || e.is_body())
}

fn quote_summary_url(base: &str, ticker: &str) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(base)
        .with_context(|| format!("invalid market data base url: {base}"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("market data base url cannot carry a path: {base}"))?
        .pop_if_empty()
        .extend(["v10", "finance", "quoteSummary", ticker]);
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryBody,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryBody {
    #[serde(default)]
    result: Option<Vec<Value>>,
    #[serde(default)]
    error: Option<Value>,
}

fn statement_module(kind: StatementKind) -> (&'static str, &'static str) {
    match kind {
        StatementKind::Income => ("incomeStatementHistory", "incomeStatementHistory"),
        StatementKind::BalanceSheet => ("balanceSheetHistory", "balanceSheetStatements"),
        StatementKind::CashFlow => ("cashflowStatementHistory", "cashflowStatements"),
    }
}

// Numbers arrive either bare or as `{"raw": .., "fmt": ..}`; `{}` means not reported.
fn raw_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Object(obj) => obj.get("raw").and_then(Value::as_f64),
        _ => None,
    }
}

fn module_string(result: &Value, module: &str, key: &str) -> Option<String> {
    result
        .get(module)?
        .get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_snapshot(ticker: &str, result: &Value) -> FinancialSnapshot {
    let mut fields: BTreeMap<String, Option<f64>> = BTreeMap::new();
    for module in SNAPSHOT_MODULES {
        let Some(obj) = result.get(*module).and_then(Value::as_object) else {
            continue;
        };
        for (key, value) in obj {
            if !(value.is_number() || value.is_object()) {
                continue;
            }
            let number = raw_number(value);
            let slot = fields.entry(key.clone()).or_insert(None);
            if slot.is_none() {
                *slot = number;
            }
        }
    }

    FinancialSnapshot {
        ticker: ticker.to_string(),
        long_name: module_string(result, "price", "longName"),
        industry: module_string(result, "assetProfile", "industry"),
        description: module_string(result, "assetProfile", "longBusinessSummary"),
        fields,
    }
}

fn parse_statement(kind: StatementKind, result: &Value) -> StatementTable {
    let (module, list_key) = statement_module(kind);
    let mut periods: Vec<&Map<String, Value>> = result
        .get(module)
        .and_then(|m| m.get(list_key))
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default();

    // Most recent first.
    periods.sort_by(|a, b| {
        let a = a.get("endDate").and_then(raw_number).unwrap_or(f64::MIN);
        let b = b.get("endDate").and_then(raw_number).unwrap_or(f64::MIN);
        b.total_cmp(&a)
    });

    let mut items: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
    for (idx, period) in periods.iter().enumerate() {
        for (key, value) in period.iter() {
            if NON_LINE_ITEM_KEYS.contains(&key.as_str()) {
                continue;
            }
            let values = items
                .entry(line_item_name(key))
                .or_insert_with(|| vec![None; periods.len()]);
            values[idx] = raw_number(value);
        }
    }

    if kind == StatementKind::BalanceSheet && !items.contains_key(line_items::TOTAL_DEBT) {
        let debt: Vec<Option<f64>> = periods
            .iter()
            .map(|p| {
                let short = p.get("shortLongTermDebt").and_then(raw_number);
                let long = p.get("longTermDebt").and_then(raw_number);
                match (short, long) {
                    (None, None) => None,
                    (s, l) => Some(s.unwrap_or(0.0) + l.unwrap_or(0.0)),
                }
            })
            .collect();
        if debt.iter().any(Option::is_some) {
            items.insert(line_items::TOTAL_DEBT.to_string(), debt);
        }
    }

    StatementTable {
        kind,
        line_items: items,
    }
}

// `totalRevenue` -> `Total Revenue`, with overrides for acronyms.
fn line_item_name(key: &str) -> String {
    if let Some((_, name)) = LINE_ITEM_NAMES.iter().find(|(k, _)| *k == key) {
        return name.to_string();
    }

    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if i == 0 {
            out.extend(c.to_uppercase());
        } else if c.is_ascii_uppercase() {
            out.push(' ');
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out
}
