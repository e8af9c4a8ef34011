pub mod financials;
pub mod news;
