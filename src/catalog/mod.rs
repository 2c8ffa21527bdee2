// src/catalog/mod.rs
//
// Module registry.
// A static, read-only catalog of the data modules the remote service exposes,
// each with its endpoint, declared columns and declared filters.

mod modules;

use crate::error::{ReportError, Result};
use crate::models::{ColumnSpec, ColumnType, FilterSpec, Predicate};
use serde::Serialize;

pub use modules::MODULES;

// =============================================================================
// Module Descriptor
// =============================================================================

/// Immutable descriptor of one remote data module.
#[derive(Debug, PartialEq)]
pub struct Module {
    /// Registry key (e.g., "opportunities").
    pub key: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Remote endpoint path relative to the API base URL.
    pub endpoint: &'static str,
    /// Declared columns in display order.
    pub columns: &'static [ColumnSpec],
    /// Declared filters in display order.
    pub filters: &'static [FilterSpec],
    /// Associations the endpoint must be asked to embed via repeated `include[]`.
    pub includes: &'static [&'static str],
}

impl Module {
    pub fn column(&self, key: &str) -> Option<&'static ColumnSpec> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn filter(&self, key: &str) -> Option<&'static FilterSpec> {
        self.filters.iter().find(|f| f.key == key)
    }

    pub fn column_keys(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.key.to_string()).collect()
    }

    pub fn schema(&self) -> ModuleSchema {
        ModuleSchema {
            columns: self.columns.to_vec(),
            filters: self.filters.to_vec(),
        }
    }

    pub fn summary(&self) -> ModuleSummary {
        ModuleSummary {
            key: self.key,
            name: self.name,
        }
    }
}

/// Column and filter catalogue of a module, as handed to presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSchema {
    pub columns: Vec<ColumnSpec>,
    pub filters: Vec<FilterSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSummary {
    pub key: &'static str,
    pub name: &'static str,
}

// =============================================================================
// Registry
// =============================================================================

/// Lookup over the static module table. Never touches the network.
pub struct ModuleRegistry;

impl ModuleRegistry {
    pub fn get_modules() -> &'static [Module] {
        &MODULES
    }

    /// Exact, case-sensitive lookup.
    pub fn get_module(key: &str) -> Result<&'static Module> {
        MODULES
            .iter()
            .find(|m| m.key == key)
            .ok_or_else(|| ReportError::InvalidModule(key.to_string()))
    }
}

// =============================================================================
// Table Helpers
// =============================================================================

const fn col(key: &'static str, label: &'static str, column_type: ColumnType) -> ColumnSpec {
    ColumnSpec {
        key,
        label,
        column_type,
    }
}

const fn filter(
    key: &'static str,
    label: &'static str,
    filter_type: ColumnType,
    predicates: &'static [Predicate],
) -> FilterSpec {
    FilterSpec {
        key,
        label,
        filter_type,
        predicates,
        options: None,
    }
}

const fn choice(
    key: &'static str,
    label: &'static str,
    options: &'static [&'static str],
) -> FilterSpec {
    FilterSpec {
        key,
        label,
        filter_type: ColumnType::String,
        predicates: ENUM_PREDICATES,
        options: Some(options),
    }
}

const TEXT_PREDICATES: &[Predicate] = &[
    Predicate::Eq,
    Predicate::NotEq,
    Predicate::Cont,
    Predicate::NotCont,
    Predicate::Start,
    Predicate::End,
    Predicate::Null,
    Predicate::NotNull,
];

const NUMERIC_PREDICATES: &[Predicate] = &[
    Predicate::Eq,
    Predicate::NotEq,
    Predicate::Lt,
    Predicate::Lteq,
    Predicate::Gt,
    Predicate::Gteq,
    Predicate::Null,
    Predicate::NotNull,
    Predicate::In,
    Predicate::NotIn,
];

const DATE_PREDICATES: &[Predicate] = &[
    Predicate::Eq,
    Predicate::Lt,
    Predicate::Lteq,
    Predicate::Gt,
    Predicate::Gteq,
    Predicate::Null,
    Predicate::NotNull,
];

const ENUM_PREDICATES: &[Predicate] = &[
    Predicate::Eq,
    Predicate::NotEq,
    Predicate::In,
    Predicate::NotIn,
];

const BOOLEAN_PREDICATES: &[Predicate] = &[Predicate::Eq];
