//! Warehouse worker: the map side of the computation
//!
//! One worker per warehouse partition. Lifecycle: await the selection on
//! its private channel, replay the partition's records through a FIFO cost
//! ledger per selected product, emit the single profit scalar, then emit
//! exactly one contribution per selected product on that product's named
//! channel.

use crate::catalog::{ProductCatalog, ProductId, SelectionSet};
use crate::channel::NamedChannelRegistry;
use crate::error::{Result, TallyError};
use crate::ledger::Ledger;
use crate::message::Contribution;
use crate::partition::{PartitionHandle, PartitionSource, RecordKind, TransactionRecord};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Everything a warehouse worker is parameterized with at spawn time.
///
/// `channel_names` carries the full catalog of named-channel identifiers so
/// the worker can address any product's contribution channel.
pub struct WorkerParams {
    pub partition: PartitionHandle,
    pub catalog: Arc<ProductCatalog>,
    pub source: Arc<dyn PartitionSource>,
    pub selection_rx: oneshot::Receiver<SelectionSet>,
    pub profit_tx: oneshot::Sender<f64>,
    pub registry: NamedChannelRegistry<Contribution>,
    pub channel_names: Arc<BTreeMap<ProductId, String>>,
}

/// Run one warehouse worker to completion.
pub async fn run_worker(params: WorkerParams) -> Result<()> {
    let WorkerParams {
        partition,
        catalog,
        source,
        selection_rx,
        profit_tx,
        registry,
        channel_names,
    } = params;

    info!(partition = %partition.name, "warehouse worker started");

    let selection = selection_rx
        .await
        .map_err(|_| TallyError::ChannelClosed {
            endpoint: format!("selection channel for warehouse {}", partition.name),
        })?;
    debug!(partition = %partition.name, selected = selection.len(), "received selection");

    let records = source.load(&partition).await?;

    let mut total_profit = 0.0;
    let mut contributions = Vec::with_capacity(selection.len());
    for id in selection.iter() {
        let name = catalog
            .name(id)
            .ok_or_else(|| TallyError::InvalidSelection {
                reason: format!("product number {id} is not in the catalog"),
            })?;
        let (profit, contribution) = evaluate_product(id, name, &records);
        debug!(
            partition = %partition.name,
            product = name,
            profit,
            leftover_quantity = contribution.leftover_quantity,
            "evaluated product"
        );
        total_profit += profit;
        contributions.push(contribution);
    }

    profit_tx
        .send(total_profit)
        .map_err(|_| TallyError::ChannelClosed {
            endpoint: format!("profit channel for warehouse {}", partition.name),
        })?;

    for contribution in contributions {
        let channel = channel_names
            .get(&contribution.product_id)
            .ok_or_else(|| TallyError::ChannelMissing {
                name: crate::channel::contribution_channel_name(contribution.product_id),
            })?;
        let tx = registry.open_writer(channel)?;
        tx.send(contribution)
            .await
            .map_err(|_| TallyError::ChannelClosed {
                endpoint: channel.clone(),
            })?;
        // Sender dropped here: this worker's write side is closed.
    }

    info!(partition = %partition.name, profit = total_profit, "warehouse worker finished");
    Ok(())
}

/// Replay one product's records in partition order through a FIFO ledger,
/// returning the realized profit and the leftover contribution.
pub fn evaluate_product(
    id: ProductId,
    product: &str,
    records: &[TransactionRecord],
) -> (f64, Contribution) {
    let mut ledger = Ledger::new();
    let mut profit = 0.0;

    for record in records.iter().filter(|r| r.product == product) {
        match record.kind {
            RecordKind::Input => ledger.receive(record.quantity, record.unit_price),
            RecordKind::Output => profit += ledger.issue(record.quantity, record.unit_price),
        }
    }

    let contribution = Contribution {
        product_id: id,
        leftover_value: ledger.leftover_value(),
        leftover_quantity: ledger.leftover_quantity(),
    };
    (profit, contribution)
}
