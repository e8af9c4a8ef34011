use crate::domain::financials::{FinancialSnapshot, RatioSet};
use crate::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub ticker: String,
    pub company_name: String,
    pub industry: String,
    pub description: String,
    pub ratios: RatioSet,
}

impl HealthReport {
    pub fn assemble(snapshot: &FinancialSnapshot, ratios: RatioSet) -> Self {
        let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        Self {
            ticker: snapshot.ticker.to_uppercase(),
            company_name: or_na(&snapshot.long_name),
            industry: or_na(&snapshot.industry),
            description: or_na(&snapshot.description),
            ratios,
        }
    }
}

pub fn error_payload(err: &ToolError) -> Value {
    serde_json::json!({ "error": err.to_string() })
}
