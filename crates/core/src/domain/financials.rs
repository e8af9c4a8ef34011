use crate::error::DerivationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod keys {
    pub const PE_RATIO: &str = "P/E Ratio";
    pub const PRICE_TO_BOOK: &str = "Price-to-Book";
    pub const CURRENT_RATIO: &str = "Current Ratio";
    pub const QUICK_RATIO: &str = "Quick Ratio";
    pub const RETURN_ON_EQUITY: &str = "Return on Equity (%)";
    pub const RETURN_ON_ASSETS: &str = "Return on Assets (%)";
    pub const PROFIT_MARGIN: &str = "Profit Margin (%)";
    pub const OPERATING_MARGIN: &str = "Operating Margin (%)";
    pub const GROSS_MARGIN: &str = "Gross Margin (%)";
    pub const EPS: &str = "EPS";
    pub const DIVIDEND_YIELD: &str = "Dividend Yield (%)";
    pub const DEBT_TO_EQUITY: &str = "Debt-to-Equity";
    pub const FREE_CASH_FLOW: &str = "Free Cash Flow";
    pub const BETA: &str = "Beta";
    pub const REVENUE_GROWTH: &str = "Revenue Growth (%)";
    pub const INTEREST_COVERAGE: &str = "Interest Coverage Ratio";
    pub const DEBT_TO_ASSET: &str = "Debt-to-Asset";
}

pub mod line_items {
    pub const TOTAL_REVENUE: &str = "Total Revenue";
    pub const EBIT: &str = "EBIT";
    pub const INTEREST_EXPENSE: &str = "Interest Expense";
    pub const TOTAL_DEBT: &str = "Total Debt";
    pub const TOTAL_ASSETS: &str = "Total Assets";
}

// Numeric fields are keyed by the provider's own names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub ticker: String,
    pub long_name: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub fields: BTreeMap<String, Option<f64>>,
}

impl FinancialSnapshot {
    pub fn field(&self, key: &str) -> Option<f64> {
        self.fields.get(key).copied().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.long_name.is_none() && self.fields.values().all(Option::is_none)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    Income,
    BalanceSheet,
    CashFlow,
}

// Every sequence is ordered most-recent-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementTable {
    pub kind: StatementKind,
    pub line_items: BTreeMap<String, Vec<Option<f64>>>,
}

impl StatementTable {
    pub fn empty(kind: StatementKind) -> Self {
        Self {
            kind,
            line_items: BTreeMap::new(),
        }
    }

    pub fn with_line_item(mut self, name: &str, periods: Vec<Option<f64>>) -> Self {
        self.line_items.insert(name.to_string(), periods);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }

    pub fn recent(&self, name: &'static str, count: usize) -> Result<Vec<f64>, DerivationError> {
        let periods = self
            .line_items
            .get(name)
            .ok_or(DerivationError::MissingLineItem(name))?;

        let values: Vec<f64> = periods
            .iter()
            .take(count)
            .map_while(|v| *v)
            .collect();
        if values.len() < count {
            return Err(DerivationError::InsufficientPeriods {
                line_item: name,
                required: count,
                found: values.len(),
            });
        }
        Ok(values)
    }

    pub fn latest(&self, name: &'static str) -> Result<f64, DerivationError> {
        Ok(self.recent(name, 1)?[0])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatioSet(BTreeMap<String, Option<f64>>);

impl RatioSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: Option<f64>) {
        self.0
            .insert(key.to_string(), value.filter(|v| v.is_finite()));
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied().flatten()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
