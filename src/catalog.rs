//! Product catalog and operator selection
//!
//! The catalog is an ordered list of product names loaded once per run;
//! positions are stable 1-based identifiers used by every other component.

use crate::error::{Result, TallyError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Stable 1-based identifier into the product catalog
pub type ProductId = usize;

/// Ordered, read-only list of product names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCatalog {
    names: Vec<String>,
}

impl ProductCatalog {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Load the catalog file: a single comma-separated record of product names.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| TallyError::CatalogLoad {
                path: path.to_path_buf(),
                source: Box::new(e),
            })?;

        let mut names = Vec::new();
        if let Some(record) = reader.records().next() {
            let record = record.map_err(|e| TallyError::CatalogLoad {
                path: path.to_path_buf(),
                source: Box::new(e),
            })?;
            names.extend(
                record
                    .iter()
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty()),
            );
        }

        if names.is_empty() {
            return Err(TallyError::CatalogEmpty {
                path: path.to_path_buf(),
            });
        }

        debug!(products = names.len(), path = %path.display(), "loaded product catalog");
        Ok(Self::new(names))
    }

    pub fn name(&self, id: ProductId) -> Option<&str> {
        if id == 0 {
            return None;
        }
        self.names.get(id - 1).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All valid identifiers, in catalog order.
    pub fn ids(&self) -> impl Iterator<Item = ProductId> {
        1..=self.names.len()
    }
}

/// Validated, non-empty set of selected product identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSet {
    ids: BTreeSet<ProductId>,
}

impl SelectionSet {
    /// Parse space-separated 1-based indices against the catalog.
    ///
    /// An empty selection, a non-numeric token, or an index outside the
    /// catalog is rejected outright: operator input errors are fatal,
    /// unlike malformed partition records.
    pub fn parse(input: &str, catalog: &ProductCatalog) -> Result<Self> {
        let mut ids = BTreeSet::new();
        for token in input.split_whitespace() {
            let id: ProductId = token.parse().map_err(|_| TallyError::InvalidSelection {
                reason: format!("'{token}' is not a product number"),
            })?;
            if catalog.name(id).is_none() {
                return Err(TallyError::InvalidSelection {
                    reason: format!(
                        "product number {id} is out of range (catalog has {} products)",
                        catalog.len()
                    ),
                });
            }
            ids.insert(id);
        }

        if ids.is_empty() {
            return Err(TallyError::InvalidSelection {
                reason: "no products selected".to_string(),
            });
        }

        Ok(Self { ids })
    }

    pub fn iter(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.ids.iter().copied()
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
