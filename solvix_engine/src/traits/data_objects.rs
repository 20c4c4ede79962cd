use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Payment, PaymentStatus};

/// What happened when a provider's payment report was applied.
#[derive(Debug, Clone)]
pub struct PaymentReportResult {
    pub order: Order,
    pub payment: Payment,
    /// The payment status before the report was applied. `None` if the payment record was created by this report.
    pub previous_status: Option<PaymentStatus>,
    /// False when the report repeated what was already recorded, or was overruled by a final state.
    pub changed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainResult {
    pub delivered: usize,
    pub failed: usize,
}

impl DrainResult {
    pub fn total(&self) -> usize {
        self.delivered + self.failed
    }
}
