//! Product aggregator: the reduce side of the computation
//!
//! One aggregator per selected product. It holds the receiving end of that
//! product's named channel, collects contributions until the expected count
//! arrives or the channel reaches end-of-input, and reports the summed
//! aggregate on its private result channel. A short count is reported, not
//! silently folded into a complete-looking sum.

use crate::catalog::ProductId;
use crate::error::{Result, TallyError};
use crate::message::{AggregateOutcome, AggregateResult, Contribution};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Everything a product aggregator is parameterized with at spawn time.
pub struct AggregatorParams {
    pub product_id: ProductId,
    pub product: String,
    /// Receiving end of this product's named channel
    pub contributions: mpsc::Receiver<Contribution>,
    pub result_tx: oneshot::Sender<AggregateOutcome>,
    /// One contribution per warehouse in the run
    pub expected: usize,
}

/// Run one product aggregator to completion.
///
/// The outcome is always sent, even on a short count; the `ShortCount`
/// error return additionally surfaces the degraded collection to whoever
/// joins the task.
pub async fn run_aggregator(params: AggregatorParams) -> Result<()> {
    let AggregatorParams {
        product_id,
        product,
        mut contributions,
        result_tx,
        expected,
    } = params;

    info!(product = %product, expected, "product aggregator started");

    let mut received = 0;
    let mut total_leftover_value = 0.0;
    let mut total_leftover_quantity = 0.0;

    while received < expected {
        match contributions.recv().await {
            Some(contribution) => {
                if contribution.product_id != product_id {
                    warn!(
                        product = %product,
                        got = contribution.product_id,
                        "contribution for a different product on this channel, ignoring"
                    );
                    continue;
                }
                debug!(
                    product = %product,
                    leftover_value = contribution.leftover_value,
                    leftover_quantity = contribution.leftover_quantity,
                    "collected contribution"
                );
                total_leftover_value += contribution.leftover_value;
                total_leftover_quantity += contribution.leftover_quantity;
                received += 1;
            }
            // End-of-input: every writer and the registry entry are gone.
            None => break,
        }
    }

    let outcome = AggregateOutcome {
        result: AggregateResult {
            product_id,
            total_leftover_value,
            total_leftover_quantity,
        },
        received,
        expected,
    };

    result_tx
        .send(outcome)
        .map_err(|_| TallyError::ChannelClosed {
            endpoint: format!("result channel for product {product}"),
        })?;

    if received < expected {
        warn!(product = %product, received, expected, "short contribution count");
        return Err(TallyError::ShortCount {
            product,
            received,
            expected,
        });
    }

    info!(product = %product, received, "product aggregator finished");
    Ok(())
}
