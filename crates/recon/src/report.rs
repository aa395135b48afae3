//! Machine-readable summary of one run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::adapter::ProviderOutcome;
use crate::alias::{AliasConflict, AliasTable};
use crate::model::{AdaptedBatch, Lineup, NumberConflict};
use crate::provider::ProviderId;

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Collected,
    Malformed,
    Failed,
}

impl From<&ProviderOutcome> for ProviderStatus {
    fn from(outcome: &ProviderOutcome) -> Self {
        match outcome {
            ProviderOutcome::Collected(_) => Self::Collected,
            ProviderOutcome::Malformed(_) => Self::Malformed,
            ProviderOutcome::Failed(_) => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderReport {
    pub provider: ProviderId,
    pub name: &'static str,
    pub status: ProviderStatus,
    pub plans: usize,
    pub records: usize,
    pub present: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub engine_version: &'static str,
    pub run_at: DateTime<Utc>,
    pub zip_code: String,
    pub alias_spellings: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub providers_selected: usize,
    pub providers_collected: usize,
    pub rows: usize,
    pub columns: usize,
    pub number_conflicts: usize,
    pub alias_conflicts: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub meta: ReportMeta,
    pub summary: ReportSummary,
    pub providers: Vec<ProviderReport>,
    pub number_conflicts: Vec<NumberConflict>,
    pub alias_conflicts: Vec<AliasConflict>,
}

impl RunReport {
    /// `runs` pairs each selected provider's outcome with its adapted batch.
    pub fn build(
        zip_code: &str,
        runs: &[(ProviderOutcome, AdaptedBatch)],
        aliases: &AliasTable,
        lineup: &Lineup,
    ) -> Self {
        let providers: Vec<ProviderReport> = runs
            .iter()
            .map(|(outcome, batch)| ProviderReport {
                provider: batch.provider,
                name: batch.provider.display_name(),
                status: ProviderStatus::from(outcome),
                plans: batch.plans.len(),
                records: batch.records.len(),
                present: batch.records.iter().filter(|r| r.present).count(),
                warnings: batch.warnings.iter().map(|w| w.message.clone()).collect(),
            })
            .collect();

        let summary = ReportSummary {
            providers_selected: providers.len(),
            providers_collected: providers
                .iter()
                .filter(|p| p.status == ProviderStatus::Collected)
                .count(),
            rows: lineup.rows.len(),
            columns: lineup.columns.len() + 1,
            number_conflicts: lineup.conflicts.len(),
            alias_conflicts: aliases.conflicts().len(),
        };

        RunReport {
            meta: ReportMeta {
                engine_version: ENGINE_VERSION,
                run_at: Utc::now(),
                zip_code: zip_code.to_string(),
                alias_spellings: aliases.len(),
            },
            summary,
            providers,
            number_conflicts: lineup.conflicts.clone(),
            alias_conflicts: aliases.conflicts().to_vec(),
        }
    }

    /// True when every selected provider failed to deliver data.
    pub fn nothing_collected(&self) -> bool {
        self.summary.providers_selected > 0 && self.summary.providers_collected == 0
    }
}
