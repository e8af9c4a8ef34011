use crate::domain::financials::{keys, FinancialSnapshot, RatioSet, StatementKind, StatementTable};
use crate::error::ToolError;
use crate::market::MarketDataProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    AsIs,
    // Provider reports a fraction.
    Percent,
}

struct SnapshotField {
    provider_key: &'static str,
    ratio_key: &'static str,
    unit: Unit,
}

const fn field(provider_key: &'static str, ratio_key: &'static str, unit: Unit) -> SnapshotField {
    SnapshotField {
        provider_key,
        ratio_key,
        unit,
    }
}

const SNAPSHOT_FIELDS: &[SnapshotField] = &[
    field("trailingPE", keys::PE_RATIO, Unit::AsIs),
    field("priceToBook", keys::PRICE_TO_BOOK, Unit::AsIs),
    field("currentRatio", keys::CURRENT_RATIO, Unit::AsIs),
    field("quickRatio", keys::QUICK_RATIO, Unit::AsIs),
    field("returnOnEquity", keys::RETURN_ON_EQUITY, Unit::Percent),
    field("returnOnAssets", keys::RETURN_ON_ASSETS, Unit::Percent),
    field("profitMargins", keys::PROFIT_MARGIN, Unit::Percent),
    field("operatingMargins", keys::OPERATING_MARGIN, Unit::Percent),
    field("grossMargins", keys::GROSS_MARGIN, Unit::Percent),
    field("trailingEps", keys::EPS, Unit::AsIs),
    field("dividendYield", keys::DIVIDEND_YIELD, Unit::Percent),
    field("debtToEquity", keys::DEBT_TO_EQUITY, Unit::AsIs),
    field("freeCashflow", keys::FREE_CASH_FLOW, Unit::AsIs),
    field("beta", keys::BETA, Unit::AsIs),
    field("revenueGrowth", keys::REVENUE_GROWTH, Unit::Percent),
    // Placeholder until the statement-derived coverage replaces it. Scaled like a percentage
    // even though the derived value is a plain multiple; see DESIGN.md.
    field("interestCoverage", keys::INTEREST_COVERAGE, Unit::Percent),
];

#[derive(Debug, Clone)]
pub struct MarketData {
    pub snapshot: FinancialSnapshot,
    pub income: StatementTable,
    pub balance_sheet: StatementTable,
    pub cash_flow: StatementTable,
}

pub async fn fetch_market_data(
    provider: &dyn MarketDataProvider,
    ticker: &str,
) -> Result<MarketData, ToolError> {
    let unavailable = |detail: String| ToolError::DataUnavailable {
        ticker: ticker.to_string(),
        detail,
    };

    let (snapshot, income, balance_sheet, cash_flow) = tokio::try_join!(
        provider.fetch_snapshot(ticker),
        provider.fetch_statement(ticker, StatementKind::Income),
        provider.fetch_statement(ticker, StatementKind::BalanceSheet),
        provider.fetch_statement(ticker, StatementKind::CashFlow),
    )
    .map_err(|err| unavailable(format!("{err:#}")))?;

    if snapshot.is_empty() {
        return Err(unavailable(format!(
            "{} returned no data for this symbol",
            provider.provider_name()
        )));
    }

    tracing::debug!(
        %ticker,
        provider = provider.provider_name(),
        fields = snapshot.fields.len(),
        income_items = income.line_items.len(),
        balance_items = balance_sheet.line_items.len(),
        cash_flow_items = cash_flow.line_items.len(),
        "market data fetched"
    );

    Ok(MarketData {
        snapshot,
        income,
        balance_sheet,
        cash_flow,
    })
}

pub fn snapshot_ratios(snapshot: &FinancialSnapshot) -> RatioSet {
    let mut ratios = RatioSet::new();
    for f in SNAPSHOT_FIELDS {
        let raw = snapshot.field(f.provider_key);
        let value = match f.unit {
            Unit::AsIs => raw,
            Unit::Percent => raw.map(|v| v * 100.0),
        };
        ratios.set(f.ratio_key, value);
    }
    ratios
}
