// src/lib.rs

// 1. Data Structures (The "Nouns")
pub mod error;
pub mod models;

// 2. Interfaces (The "Contract")
pub mod traits;

// 3. Adapters (The "Plumbing")
pub mod connectors;

// 4. Module Discovery (The "Catalog")
pub mod catalog;

// 5. Translation and Flattening
pub mod normalize;
pub mod query;

// 6. Report Engine (The "Orchestrator")
pub mod engine;

// 7. Aggregation (The "Brains")
pub mod analytics;

// 8. Caller-facing Service
pub mod service;

// 9. Configuration
pub mod config;

pub use engine::{ReportPage, ReportQueryEngine, ReportRequest};
pub use error::{ReportError, Result};
pub use service::{AggregateQuery, ReportDefinition, ReportService};
