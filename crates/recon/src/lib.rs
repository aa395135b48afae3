//! `lineup-recon`: Cross-provider channel lineup reconciliation engine.
//!
//! Pure engine crate: receives per-provider results, returns one canonical
//! lineup table. No CLI or file-writing dependencies.

pub mod adapter;
pub mod alias;
pub mod engine;
pub mod error;
pub mod model;
pub mod project;
pub mod provider;
pub mod report;

pub use adapter::{adapt, ProviderOutcome};
pub use alias::{normalize, AliasTable};
pub use engine::{reconcile, reconcile_records};
pub use error::ConfigError;
pub use model::{AdaptedBatch, Cell, Column, Lineup, NormalizedRecord, UnifiedRow};
pub use project::{project, project_provider, ProjectedTable};
pub use provider::{Flag, ProviderId, ProviderResult, ProviderShape};
pub use report::RunReport;
