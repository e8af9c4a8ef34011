pub mod adapter;
pub mod yahoo;

use crate::domain::financials::{FinancialSnapshot, StatementKind, StatementTable};
use anyhow::Result;

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_snapshot(&self, ticker: &str) -> Result<FinancialSnapshot>;

    // Empty table when the provider has no statement of this kind.
    async fn fetch_statement(&self, ticker: &str, kind: StatementKind) -> Result<StatementTable>;
}
