use serde::Serialize;

use crate::provider::ProviderId;

// ---------------------------------------------------------------------------
// Adapted input
// ---------------------------------------------------------------------------

/// One (channel, provider, plan) availability fact.
///
/// `channel` is the raw spelling as scraped; canonicalization happens once,
/// inside the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    pub channel: String,
    pub provider: ProviderId,
    pub plan: String,
    pub present: bool,
    /// Channel number, DirecTV family only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
}

/// A recoverable problem with one provider's data. Logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdaptationWarning {
    pub provider: ProviderId,
    pub message: String,
}

impl std::fmt::Display for AdaptationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.provider, self.message)
    }
}

/// Everything the adapter produced for one provider.
#[derive(Debug, Clone, Serialize)]
pub struct AdaptedBatch {
    pub provider: ProviderId,
    /// Declared plan columns, in the provider's own order. Kept even when
    /// `records` is empty so the columns still appear in the output.
    pub plans: Vec<String>,
    pub records: Vec<NormalizedRecord>,
    pub warnings: Vec<AdaptationWarning>,
}

impl AdaptedBatch {
    pub fn empty(provider: ProviderId) -> Self {
        Self { provider, plans: Vec::new(), records: Vec::new(), warnings: Vec::new() }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let warning = AdaptationWarning { provider: self.provider, message: message.into() };
        log::warn!("{warning}");
        self.warnings.push(warning);
    }
}

// ---------------------------------------------------------------------------
// Unified output
// ---------------------------------------------------------------------------

/// One output column after the channel-name column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Column {
    /// Channel number published by a DirecTV-family provider.
    Number { provider: ProviderId },
    /// Availability in one (provider, plan).
    Plan { provider: ProviderId, plan: String },
    /// Provider selected for the run but without any usable plan data.
    Placeholder { provider: ProviderId },
}

impl Column {
    pub fn provider(&self) -> ProviderId {
        match self {
            Self::Number { provider } | Self::Plan { provider, .. } | Self::Placeholder { provider } => *provider,
        }
    }

    /// Header text for this column.
    pub fn header(&self) -> String {
        match self {
            Self::Number { provider } => format!("{} Number", provider.display_name()),
            Self::Plan { provider, plan } if plan == provider.display_name() => plan.clone(),
            Self::Plan { provider, plan } => format!("{} {}", provider.display_name(), plan_label(*provider, plan)),
            Self::Placeholder { provider } => provider.display_name().to_string(),
        }
    }
}

/// A cell value before rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Available(bool),
    Number(Option<String>),
}

/// One canonical channel across every provider and plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnifiedRow {
    pub channel: String,
    /// Aligned with [`Lineup::columns`].
    pub cells: Vec<Cell>,
}

/// Two raw spellings of one canonical channel reported different numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberConflict {
    pub provider: ProviderId,
    pub channel: String,
    /// (raw spelling, number) pairs, sorted.
    pub candidates: Vec<(String, String)>,
    pub chosen: String,
}

/// Result of reconciliation: ordered columns and rows.
#[derive(Debug, Clone, Serialize)]
pub struct Lineup {
    pub columns: Vec<Column>,
    pub rows: Vec<UnifiedRow>,
    pub conflicts: Vec<NumberConflict>,
}

impl Lineup {
    pub fn row(&self, channel: &str) -> Option<&UnifiedRow> {
        self.rows.iter().find(|r| r.channel == channel)
    }

    pub fn column_index(&self, column: &Column) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Cell for `channel` under `column`, if both exist.
    pub fn cell(&self, channel: &str, column: &Column) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.row(channel).and_then(|r| r.cells.get(idx))
    }
}

/// Plan name as shown in a header. A plan called "Number" on a provider that
/// also has a number column is suffixed so the two headers stay distinct.
pub fn plan_label(provider: ProviderId, plan: &str) -> String {
    if provider.has_channel_numbers() && plan.trim().eq_ignore_ascii_case("number") {
        format!("{plan} (plan)")
    } else {
        plan.to_string()
    }
}
