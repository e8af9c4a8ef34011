use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    DataUnavailable { ticker: String, detail: String },
    NewsFetch { ticker: String, detail: String },
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::DataUnavailable { ticker, detail } => {
                write!(f, "financial data unavailable for {ticker}: {detail}")
            }
            ToolError::NewsFetch { ticker, detail } => {
                write!(f, "Error fetching news for {ticker}: {detail}")
            }
        }
    }
}

impl std::error::Error for ToolError {}

#[derive(Debug, Clone, PartialEq)]
pub enum DerivationError {
    MissingLineItem(&'static str),
    InsufficientPeriods {
        line_item: &'static str,
        required: usize,
        found: usize,
    },
    DegenerateDenominator {
        line_item: &'static str,
        value: f64,
    },
    NonFinite,
}

impl fmt::Display for DerivationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivationError::MissingLineItem(item) => write!(f, "line item '{item}' is missing"),
            DerivationError::InsufficientPeriods {
                line_item,
                required,
                found,
            } => write!(
                f,
                "line item '{line_item}' needs {required} periods (found {found})"
            ),
            DerivationError::DegenerateDenominator { line_item, value } => {
                write!(f, "line item '{line_item}' is too close to zero ({value})")
            }
            DerivationError::NonFinite => write!(f, "derived value is not finite"),
        }
    }
}

impl std::error::Error for DerivationError {}
