use crate::domain::financials::{keys, line_items, RatioSet, StatementTable};
use crate::error::DerivationError;

// Denominators with a smaller magnitude are treated as zero.
pub const NEAR_ZERO: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub enum Derivation {
    Computed(f64),
    // Prior value stays in place.
    Unavailable(DerivationError),
    // Ratio becomes absent.
    Failed(DerivationError),
}

impl Derivation {
    fn from_result(res: Result<f64, DerivationError>) -> Self {
        match res {
            Ok(v) if v.is_finite() => Derivation::Computed(v),
            Ok(_) => Derivation::Failed(DerivationError::NonFinite),
            Err(err @ DerivationError::DegenerateDenominator { .. })
            | Err(err @ DerivationError::NonFinite) => Derivation::Failed(err),
            Err(err) => Derivation::Unavailable(err),
        }
    }
}

pub fn revenue_growth(income: &StatementTable) -> Derivation {
    Derivation::from_result(compute_revenue_growth(income))
}

pub fn debt_to_asset(balance_sheet: &StatementTable) -> Derivation {
    Derivation::from_result(compute_debt_to_asset(balance_sheet))
}

pub fn interest_coverage(income: &StatementTable) -> Derivation {
    Derivation::from_result(compute_interest_coverage(income))
}

fn compute_revenue_growth(income: &StatementTable) -> Result<f64, DerivationError> {
    let revenue = income.recent(line_items::TOTAL_REVENUE, 2)?;
    let (now, prior) = (revenue[0], revenue[1]);
    let denom = nonzero(line_items::TOTAL_REVENUE, prior.abs())?;
    Ok((now - prior) / denom * 100.0)
}

fn compute_debt_to_asset(balance_sheet: &StatementTable) -> Result<f64, DerivationError> {
    let debt = balance_sheet.latest(line_items::TOTAL_DEBT)?;
    let assets = balance_sheet.latest(line_items::TOTAL_ASSETS)?;
    Ok(debt / nonzero(line_items::TOTAL_ASSETS, assets)?)
}

fn compute_interest_coverage(income: &StatementTable) -> Result<f64, DerivationError> {
    let ebit = income.latest(line_items::EBIT)?;
    let interest = income.latest(line_items::INTEREST_EXPENSE)?;
    Ok(ebit / nonzero(line_items::INTEREST_EXPENSE, interest.abs())?)
}

fn nonzero(line_item: &'static str, value: f64) -> Result<f64, DerivationError> {
    if value.abs() < NEAR_ZERO {
        return Err(DerivationError::DegenerateDenominator { line_item, value });
    }
    Ok(value)
}

pub fn resolve(
    ticker: &str,
    ratios: &mut RatioSet,
    income: &StatementTable,
    balance_sheet: &StatementTable,
) {
    // No snapshot counterpart.
    if !ratios.contains_key(keys::DEBT_TO_ASSET) {
        ratios.set(keys::DEBT_TO_ASSET, None);
    }

    let rules = [
        (keys::REVENUE_GROWTH, revenue_growth(income)),
        (keys::DEBT_TO_ASSET, debt_to_asset(balance_sheet)),
        (keys::INTEREST_COVERAGE, interest_coverage(income)),
    ];

    for (key, derivation) in rules {
        apply(ticker, ratios, key, derivation);
    }
}

fn apply(ticker: &str, ratios: &mut RatioSet, key: &'static str, derivation: Derivation) {
    match derivation {
        Derivation::Computed(value) => ratios.set(key, Some(value)),
        Derivation::Unavailable(reason) => {
            tracing::debug!(%ticker, ratio = key, %reason, "fallback ratio unavailable; keeping prior value");
        }
        Derivation::Failed(reason) => {
            tracing::warn!(%ticker, ratio = key, %reason, "fallback ratio failed; marking absent");
            ratios.set(key, None);
        }
    }
}
