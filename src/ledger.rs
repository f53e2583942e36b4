//! Per-product FIFO cost ledger
//!
//! Input records push purchase lots; output records consume them
//! oldest-first, realizing profit against each lot's cost basis. An output
//! larger than everything left in the ledger is clipped: remaining quantity
//! goes to zero, never negative.

use std::collections::VecDeque;

/// One unconsumed purchase lot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lot {
    pub quantity: f64,
    pub unit_cost: f64,
}

/// FIFO queue of purchase lots for a single product in a single warehouse.
///
/// Owned exclusively by the worker that built it; never shared.
#[derive(Debug, Default)]
pub struct Ledger {
    lots: VecDeque<Lot>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an input: push a lot at the back of the queue.
    pub fn receive(&mut self, quantity: f64, unit_cost: f64) {
        self.lots.push_back(Lot {
            quantity,
            unit_cost,
        });
    }

    /// Record an output: consume lots oldest-first and return the realized
    /// profit `(sale_price - unit_cost) * matched_quantity` summed over the
    /// matched lots. Quantity beyond what the ledger holds is dropped.
    pub fn issue(&mut self, quantity: f64, sale_price: f64) -> f64 {
        let mut remaining = quantity;
        let mut profit = 0.0;

        while remaining > 0.0 {
            let Some(front) = self.lots.front_mut() else {
                break;
            };
            if remaining < front.quantity {
                profit += (sale_price - front.unit_cost) * remaining;
                front.quantity -= remaining;
                remaining = 0.0;
            } else {
                profit += (sale_price - front.unit_cost) * front.quantity;
                remaining -= front.quantity;
                self.lots.pop_front();
            }
        }

        profit
    }

    /// Sum of remaining lot quantities.
    pub fn leftover_quantity(&self) -> f64 {
        self.lots.iter().map(|lot| lot.quantity).sum()
    }

    /// Sum of `remaining_quantity * unit_cost` over remaining lots.
    pub fn leftover_value(&self) -> f64 {
        self.lots.iter().map(|lot| lot.quantity * lot.unit_cost).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_within_front_lot() {
        let mut ledger = Ledger::new();
        ledger.receive(10.0, 1.0);
        let profit = ledger.issue(4.0, 1.5);
        assert_eq!(profit, 2.0);
        assert_eq!(ledger.leftover_quantity(), 6.0);
        assert_eq!(ledger.leftover_value(), 6.0);
    }

    #[test]
    fn test_output_spans_multiple_lots() {
        let mut ledger = Ledger::new();
        ledger.receive(5.0, 1.0);
        ledger.receive(5.0, 2.0);
        // 5 units against the 1.0 lot, 2 units against the 2.0 lot
        let profit = ledger.issue(7.0, 3.0);
        assert_eq!(profit, 5.0 * 2.0 + 2.0 * 1.0);
        assert_eq!(ledger.leftover_quantity(), 3.0);
        assert_eq!(ledger.leftover_value(), 6.0);
    }

    #[test]
    fn test_oversized_output_clips_to_zero() {
        let mut ledger = Ledger::new();
        ledger.receive(6.0, 1.0);
        let profit = ledger.issue(20.0, 2.0);
        // Profit realized only against the available 6 units.
        assert_eq!(profit, 6.0);
        assert_eq!(ledger.leftover_quantity(), 0.0);
        assert_eq!(ledger.leftover_value(), 0.0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_output_on_empty_ledger_is_zero() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.issue(5.0, 2.0), 0.0);
        assert_eq!(ledger.leftover_quantity(), 0.0);
    }

    #[test]
    fn test_quantity_never_negative_across_sequences() {
        let mut ledger = Ledger::new();
        ledger.receive(3.0, 1.0);
        ledger.issue(10.0, 2.0);
        ledger.receive(4.0, 1.5);
        ledger.issue(1.0, 2.0);
        assert!(ledger.leftover_quantity() >= 0.0);
        assert_eq!(ledger.leftover_quantity(), 3.0);
        assert_eq!(ledger.leftover_value(), 4.5);
    }

    #[test]
    fn test_interleaved_inputs_preserve_fifo_order() {
        let mut ledger = Ledger::new();
        ledger.receive(2.0, 1.0);
        let p1 = ledger.issue(1.0, 2.0);
        ledger.receive(2.0, 3.0);
        // The remaining unit of the first lot is matched before the new lot.
        let p2 = ledger.issue(2.0, 4.0);
        assert_eq!(p1, 1.0);
        assert_eq!(p2, 3.0 + 1.0);
        assert_eq!(ledger.leftover_quantity(), 1.0);
        assert_eq!(ledger.leftover_value(), 3.0);
    }
}
