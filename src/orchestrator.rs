//! Run coordinator
//!
//! Owns the lifecycle of one computation run: create channels, spawn every
//! aggregator strictly before any worker, distribute the selection, collect
//! every expected message under a bounded wait, reclaim named channels on
//! every exit path, and assemble the terminal result.

use crate::aggregator::{run_aggregator, AggregatorParams};
use crate::catalog::{ProductCatalog, ProductId, SelectionSet};
use crate::channel::{contribution_channel_name, NamedChannelRegistry, RegistryGuard};
use crate::config::RunConfig;
use crate::error::{Result, TallyError};
use crate::message::{AggregateOutcome, ComputationResult, Contribution, ProductSummary};
use crate::partition::{PartitionHandle, PartitionSource};
use crate::worker::{run_worker, WorkerParams};
use futures::future::{join_all, BoxFuture};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Role of a spawned task, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Warehouse,
    Product,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Warehouse => write!(f, "warehouse worker"),
            Role::Product => write!(f, "product aggregator"),
        }
    }
}

/// Seam for starting worker and aggregator tasks.
///
/// Parameters are structured futures built from typed param structs, never
/// positional argument strings; the production implementation schedules on
/// the tokio runtime.
pub trait TaskSpawner: Send + Sync {
    fn spawn(
        &self,
        role: Role,
        target: &str,
        task: BoxFuture<'static, Result<()>>,
    ) -> Result<JoinHandle<Result<()>>>;
}

/// Spawns tasks on the current tokio runtime.
pub struct TokioSpawner;

impl TaskSpawner for TokioSpawner {
    fn spawn(
        &self,
        role: Role,
        target: &str,
        task: BoxFuture<'static, Result<()>>,
    ) -> Result<JoinHandle<Result<()>>> {
        debug!(%role, name = target, "spawning task");
        Ok(tokio::spawn(task))
    }
}

struct WorkerLink {
    partition: PartitionHandle,
    selection_tx: oneshot::Sender<SelectionSet>,
    profit_rx: oneshot::Receiver<f64>,
}

struct AggregatorLink {
    product_id: ProductId,
    product: String,
    result_rx: oneshot::Receiver<AggregateOutcome>,
}

/// Coordinator for one computation run
pub struct Orchestrator {
    config: RunConfig,
    catalog: Arc<ProductCatalog>,
    source: Arc<dyn PartitionSource>,
    spawner: Arc<dyn TaskSpawner>,
}

impl Orchestrator {
    pub fn new(
        config: RunConfig,
        catalog: Arc<ProductCatalog>,
        source: Arc<dyn PartitionSource>,
        spawner: Arc<dyn TaskSpawner>,
    ) -> Self {
        Self {
            config,
            catalog,
            source,
            spawner,
        }
    }

    /// Execute one run over the given partitions and selection.
    pub async fn run(
        &self,
        partitions: Vec<PartitionHandle>,
        selection: SelectionSet,
    ) -> Result<ComputationResult> {
        info!(
            warehouses = partitions.len(),
            products = selection.len(),
            "starting computation run"
        );

        // SETUP_CHANNELS: one named channel per selected product. The guard
        // removes every name on all exit paths, including early errors.
        let registry: NamedChannelRegistry<Contribution> = NamedChannelRegistry::new();
        let mut channel_names = BTreeMap::new();
        let mut contribution_rxs = BTreeMap::new();
        for id in selection.iter() {
            let name = contribution_channel_name(id);
            let rx = registry.create(&name, self.config.channel_capacity)?;
            contribution_rxs.insert(id, rx);
            channel_names.insert(id, name);
        }
        let guard = RegistryGuard::new(
            registry.clone(),
            channel_names.values().cloned().collect(),
        );
        let channel_names = Arc::new(channel_names);

        let mut handles: Vec<(Role, String, JoinHandle<Result<()>>)> = Vec::new();

        // SPAWN aggregators first: every named channel must have its reader
        // in place before any worker writes to it.
        let mut aggregator_links = Vec::with_capacity(selection.len());
        for (id, contributions) in contribution_rxs {
            let product = self
                .catalog
                .name(id)
                .ok_or_else(|| TallyError::InvalidSelection {
                    reason: format!("product number {id} is not in the catalog"),
                })?
                .to_string();
            let (result_tx, result_rx) = oneshot::channel();
            let params = AggregatorParams {
                product_id: id,
                product: product.clone(),
                contributions,
                result_tx,
                expected: partitions.len(),
            };
            let handle =
                self.spawner
                    .spawn(Role::Product, &product, Box::pin(run_aggregator(params)))?;
            handles.push((Role::Product, product.clone(), handle));
            aggregator_links.push(AggregatorLink {
                product_id: id,
                product,
                result_rx,
            });
        }

        // SPAWN one worker per warehouse partition.
        let mut worker_links = Vec::with_capacity(partitions.len());
        for partition in partitions {
            let (selection_tx, selection_rx) = oneshot::channel();
            let (profit_tx, profit_rx) = oneshot::channel();
            let params = WorkerParams {
                partition: partition.clone(),
                catalog: Arc::clone(&self.catalog),
                source: Arc::clone(&self.source),
                selection_rx,
                profit_tx,
                registry: registry.clone(),
                channel_names: Arc::clone(&channel_names),
            };
            let handle = self.spawner.spawn(
                Role::Warehouse,
                &partition.name,
                Box::pin(run_worker(params)),
            )?;
            handles.push((Role::Warehouse, partition.name.clone(), handle));
            worker_links.push(WorkerLink {
                partition,
                selection_tx,
                profit_rx,
            });
        }

        // DISTRIBUTE_SELECTION: exactly one write per worker.
        let mut profit_rxs = Vec::with_capacity(worker_links.len());
        for link in worker_links {
            link.selection_tx
                .send(selection.clone())
                .map_err(|_| TallyError::ChannelClosed {
                    endpoint: format!("selection channel for warehouse {}", link.partition.name),
                })?;
            debug!(partition = %link.partition.name, "distributed selection");
            profit_rxs.push((link.partition, link.profit_rx));
        }

        // COLLECT_RESULTS: exactly one profit per warehouse, one aggregate
        // per product. Order of summation is irrelevant; every wait is
        // bounded so a stalled worker yields a diagnostic, not a hang.
        let mut total_profit = 0.0;
        for (partition, profit_rx) in profit_rxs {
            let endpoint = format!("profit channel for warehouse {}", partition.name);
            let profit = self.recv_bounded(profit_rx, &endpoint).await?;
            debug!(partition = %partition.name, profit, "collected warehouse profit");
            total_profit += profit;
        }

        let mut products = BTreeMap::new();
        for link in aggregator_links {
            let endpoint = format!("result channel for product {}", link.product);
            let outcome = self.recv_bounded(link.result_rx, &endpoint).await?;
            if !outcome.is_complete() {
                warn!(
                    product = %link.product,
                    received = outcome.received,
                    expected = outcome.expected,
                    "aggregate is partial"
                );
            }
            products.insert(
                link.product_id,
                ProductSummary {
                    product: link.product,
                    leftover_value: outcome.result.total_leftover_value,
                    leftover_quantity: outcome.result.total_leftover_quantity,
                    contributions_received: outcome.received,
                    contributions_expected: outcome.expected,
                },
            );
        }

        // Every task has delivered its message; join them so a failure that
        // happened after delivery still surfaces.
        self.join_tasks(handles).await?;

        // CLEANUP before reporting; the guard would also run on any of the
        // error paths above.
        drop(guard);

        let result = ComputationResult {
            total_profit,
            products,
        };
        info!(
            total_profit = result.total_profit,
            complete = result.is_complete(),
            "computation run finished"
        );
        Ok(result)
    }

    async fn recv_bounded<T>(&self, rx: oneshot::Receiver<T>, endpoint: &str) -> Result<T> {
        let wait = Duration::from_secs(self.config.collect_timeout_secs);
        match timeout(wait, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(TallyError::ChannelClosed {
                endpoint: endpoint.to_string(),
            }),
            Err(_) => Err(TallyError::CollectTimeout {
                endpoint: endpoint.to_string(),
                waited_secs: self.config.collect_timeout_secs,
            }),
        }
    }

    async fn join_tasks(
        &self,
        handles: Vec<(Role, String, JoinHandle<Result<()>>)>,
    ) -> Result<()> {
        let (tags, joins): (Vec<_>, Vec<_>) = handles
            .into_iter()
            .map(|(role, target, handle)| ((role, target), handle))
            .unzip();

        for ((role, target), joined) in tags.into_iter().zip(join_all(joins).await) {
            match joined {
                Ok(Ok(())) => {}
                // Short counts were already folded into the result as a
                // partial aggregate; the run itself goes on.
                Ok(Err(err)) if !err.is_fatal() => {
                    warn!(%role, name = %target, error = %err, "task finished degraded");
                }
                Ok(Err(err)) => return Err(err),
                Err(join_err) => {
                    return Err(TallyError::TaskFailure {
                        role: role.to_string(),
                        target,
                        reason: join_err.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{RecordKind, StaticPartitionSource, TransactionRecord};
    use std::path::PathBuf;

    fn record(
        product: &str,
        unit_price: f64,
        quantity: f64,
        kind: RecordKind,
    ) -> TransactionRecord {
        TransactionRecord {
            product: product.to_string(),
            unit_price,
            quantity,
            kind,
        }
    }

    fn handle(name: &str) -> PartitionHandle {
        PartitionHandle {
            name: name.to_string(),
            path: PathBuf::new(),
        }
    }

    fn catalog() -> Arc<ProductCatalog> {
        Arc::new(ProductCatalog::new(vec![
            "bolt".to_string(),
            "nut".to_string(),
        ]))
    }

    fn orchestrator(source: StaticPartitionSource) -> Orchestrator {
        let config = RunConfig {
            collect_timeout_secs: 5,
            ..RunConfig::new(PathBuf::new(), PathBuf::new())
        };
        Orchestrator::new(config, catalog(), Arc::new(source), Arc::new(TokioSpawner))
    }

    fn two_store_source() -> StaticPartitionSource {
        StaticPartitionSource::new()
            .with_partition(
                "store_1",
                vec![
                    record("bolt", 1.0, 10.0, RecordKind::Input),
                    record("bolt", 1.5, 4.0, RecordKind::Output),
                ],
            )
            .with_partition("store_2", vec![record("bolt", 1.0, 2.0, RecordKind::Input)])
    }

    #[tokio::test]
    async fn test_single_warehouse_reference_scenario() {
        let source = StaticPartitionSource::new().with_partition(
            "store_1",
            vec![
                record("bolt", 1.0, 10.0, RecordKind::Input),
                record("bolt", 1.5, 4.0, RecordKind::Output),
            ],
        );
        let orch = orchestrator(source);
        let selection = SelectionSet::parse("1", &orch.catalog).unwrap();

        let result = orch.run(vec![handle("store_1")], selection).await.unwrap();
        assert_eq!(result.total_profit, 2.0);
        let bolt = &result.products[&1];
        assert_eq!(bolt.leftover_value, 6.0);
        assert_eq!(bolt.leftover_quantity, 6.0);
        assert!(result.is_complete());
    }

    #[tokio::test]
    async fn test_two_warehouses_sum_leftovers() {
        let orch = orchestrator(two_store_source());
        let selection = SelectionSet::parse("1", &orch.catalog).unwrap();

        let result = orch
            .run(vec![handle("store_1"), handle("store_2")], selection)
            .await
            .unwrap();
        assert_eq!(result.total_profit, 2.0);
        let bolt = &result.products[&1];
        assert_eq!(bolt.leftover_value, 8.0);
        assert_eq!(bolt.leftover_quantity, 8.0);
    }

    #[tokio::test]
    async fn test_reduce_is_commutative_over_spawn_order() {
        let orch = orchestrator(two_store_source());
        let selection = SelectionSet::parse("1 2", &orch.catalog).unwrap();

        let forward = orch
            .run(
                vec![handle("store_1"), handle("store_2")],
                selection.clone(),
            )
            .await
            .unwrap();

        let orch = orchestrator(two_store_source());
        let reversed = orch
            .run(vec![handle("store_2"), handle("store_1")], selection)
            .await
            .unwrap();

        assert_eq!(forward, reversed);
    }

    #[tokio::test]
    async fn test_profit_is_sum_over_warehouses() {
        let source = StaticPartitionSource::new()
            .with_partition(
                "store_1",
                vec![
                    record("bolt", 1.0, 10.0, RecordKind::Input),
                    record("bolt", 2.0, 5.0, RecordKind::Output),
                ],
            )
            .with_partition(
                "store_2",
                vec![
                    record("nut", 2.0, 4.0, RecordKind::Input),
                    record("nut", 3.0, 4.0, RecordKind::Output),
                ],
            );
        let orch = orchestrator(source);
        let selection = SelectionSet::parse("1 2", &orch.catalog).unwrap();

        let result = orch
            .run(vec![handle("store_1"), handle("store_2")], selection)
            .await
            .unwrap();
        // 5 * (2.0 - 1.0) + 4 * (3.0 - 2.0)
        assert_eq!(result.total_profit, 9.0);
        assert_eq!(result.products[&1].leftover_quantity, 5.0);
        assert_eq!(result.products[&2].leftover_quantity, 0.0);
    }

    #[tokio::test]
    async fn test_failing_worker_aborts_with_diagnostic() {
        // store_2 is missing from the source, so its worker dies before
        // reporting a profit.
        let source = StaticPartitionSource::new().with_partition(
            "store_1",
            vec![record("bolt", 1.0, 10.0, RecordKind::Input)],
        );
        let orch = orchestrator(source);
        let selection = SelectionSet::parse("1", &orch.catalog).unwrap();

        let err = orch
            .run(vec![handle("store_1"), handle("store_2")], selection)
            .await
            .unwrap_err();
        assert!(matches!(err, TallyError::ChannelClosed { .. }));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_fatal() {
        struct FailingSpawner;
        impl TaskSpawner for FailingSpawner {
            fn spawn(
                &self,
                role: Role,
                target: &str,
                _task: BoxFuture<'static, Result<()>>,
            ) -> Result<JoinHandle<Result<()>>> {
                Err(TallyError::Spawn {
                    role: role.to_string(),
                    target: target.to_string(),
                    reason: "spawner exhausted".to_string(),
                })
            }
        }

        let config = RunConfig::new(PathBuf::new(), PathBuf::new());
        let orch = Orchestrator::new(
            config,
            catalog(),
            Arc::new(StaticPartitionSource::new()),
            Arc::new(FailingSpawner),
        );
        let selection = SelectionSet::parse("1", &orch.catalog).unwrap();

        let err = orch.run(vec![handle("store_1")], selection).await.unwrap_err();
        assert!(matches!(err, TallyError::Spawn { .. }));
    }
}
