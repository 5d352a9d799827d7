//! Column names the pipelines look for in the cleaned claims table.

pub const PROVINCE: &str = "Province";
pub const LOSS_RATIO: &str = "loss_ratio";
pub const TOTAL_CLAIMS: &str = "TotalClaims";
pub const TRANSACTION_MONTH: &str = "TransactionMonth";

/// Boolean indicator added right before hypothesis testing.
pub const HAS_CLAIM: &str = "has_claim";
