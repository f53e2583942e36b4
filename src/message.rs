//! Messages exchanged over channels and the terminal result of a run

use crate::catalog::ProductId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One warehouse's leftover contribution for one selected product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub product_id: ProductId,
    pub leftover_value: f64,
    pub leftover_quantity: f64,
}

/// Sum of all contributions for one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub product_id: ProductId,
    pub total_leftover_value: f64,
    pub total_leftover_quantity: f64,
}

/// What an aggregator reports back: the aggregate plus how many
/// contributions actually arrived, so a short count is visible to the
/// orchestrator instead of masquerading as a complete sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateOutcome {
    pub result: AggregateResult,
    pub received: usize,
    pub expected: usize,
}

impl AggregateOutcome {
    pub fn is_complete(&self) -> bool {
        self.received == self.expected
    }
}

/// Per-product line of the final report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product: String,
    pub leftover_value: f64,
    pub leftover_quantity: f64,
    pub contributions_received: usize,
    pub contributions_expected: usize,
}

impl ProductSummary {
    pub fn is_complete(&self) -> bool {
        self.contributions_received == self.contributions_expected
    }
}

/// Terminal, externally visible artifact of one computation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationResult {
    pub total_profit: f64,
    pub products: BTreeMap<ProductId, ProductSummary>,
}

impl ComputationResult {
    /// True when every product aggregate saw its full contribution count.
    pub fn is_complete(&self) -> bool {
        self.products.values().all(ProductSummary::is_complete)
    }
}
