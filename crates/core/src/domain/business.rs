use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Contractor-wide pricing defaults used when a draft has not captured its own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessDefaults {
    pub hourly_rate: Decimal,
    pub markup_pct: Decimal,
    pub tax_rate_pct: Decimal,
    pub hours_per_day: Decimal,
}

impl Default for BusinessDefaults {
    fn default() -> Self {
        Self {
            hourly_rate: Decimal::from(65),
            markup_pct: Decimal::from(20),
            tax_rate_pct: Decimal::from(8),
            hours_per_day: Decimal::from(8),
        }
    }
}
