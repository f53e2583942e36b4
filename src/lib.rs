//! # stocktally
//!
//! Computes an aggregate profit figure and per-product leftover inventory
//! across independent warehouse partitions with a small map-reduce
//! topology: one worker task per warehouse, one aggregator task per
//! selected product, coordinated purely through channels.
//!
//! ## Modules
//!
//! - `catalog` - Product catalog and operator selection
//! - `partition` - Warehouse partitions, transaction records, storage seam
//! - `ledger` - Per-product FIFO cost ledger with clip-to-zero matching
//! - `channel` - Named channel registry with scoped cleanup
//! - `worker` - Warehouse worker (mapper)
//! - `aggregator` - Product aggregator (reducer)
//! - `orchestrator` - Run coordinator and task spawn seam
//! - `message` - Channel messages and the terminal run result
//! - `report` - Report sinks
//! - `config` - Per-run configuration
//! - `error` - Error taxonomy

pub mod aggregator;
pub mod catalog;
pub mod channel;
pub mod config;
pub mod error;
pub mod ledger;
pub mod message;
pub mod orchestrator;
pub mod partition;
pub mod report;
pub mod worker;

pub use error::{Result, TallyError};
