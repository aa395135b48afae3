//! Render a reconciled lineup into plain string cells for a writer.

use std::collections::HashMap;

use serde::Serialize;

use crate::engine::compare_names;
use crate::model::{plan_label, AdaptedBatch, Cell, Lineup};

/// Glyph written for "available".
pub const CHECKMARK: &str = "✔";

/// Header of the first column.
pub const CHANNEL_HEADER: &str = "Channel Name";

/// A finished table: header row plus string rows of the same width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ProjectedTable {
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Lineup order is kept as-is: no grouping, filtering or sorting here.
pub fn project(lineup: &Lineup) -> ProjectedTable {
    let mut headers = Vec::with_capacity(lineup.columns.len() + 1);
    headers.push(CHANNEL_HEADER.to_string());
    headers.extend(lineup.columns.iter().map(|c| c.header()));

    let rows = lineup
        .rows
        .iter()
        .map(|row| {
            let mut out = Vec::with_capacity(headers.len());
            out.push(row.channel.clone());
            out.extend(row.cells.iter().map(render_cell));
            out
        })
        .collect();

    ProjectedTable { headers, rows }
}

pub fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::Available(true) => CHECKMARK.to_string(),
        Cell::Available(false) => String::new(),
        Cell::Number(Some(n)) => n.clone(),
        Cell::Number(None) => String::new(),
    }
}

/// One provider's own view with raw spellings, before any alias collapsing:
/// name, number (when the provider publishes one), then its plan columns.
pub fn project_provider(batch: &AdaptedBatch) -> ProjectedTable {
    let provider = batch.provider;
    let with_numbers = provider.has_channel_numbers();

    let mut plans: Vec<&str> = batch.plans.iter().map(String::as_str).collect();
    for record in &batch.records {
        if !plans.contains(&record.plan.as_str()) {
            plans.push(&record.plan);
        }
    }

    let mut headers = vec![CHANNEL_HEADER.to_string()];
    if with_numbers {
        headers.push("Number".to_string());
    }
    headers.extend(plans.iter().map(|p| plan_label(provider, p)));

    // raw name -> (number, flag per plan)
    let mut by_name: HashMap<&str, (Option<&str>, Vec<bool>)> = HashMap::new();
    for record in &batch.records {
        let entry = by_name
            .entry(record.channel.as_str())
            .or_insert_with(|| (None, vec![false; plans.len()]));
        if entry.0.is_none() {
            entry.0 = record.number.as_deref();
        }
        if let Some(i) = plans.iter().position(|p| *p == record.plan) {
            entry.1[i] |= record.present;
        }
    }

    let mut names: Vec<&str> = by_name.keys().copied().collect();
    names.sort_by(|a, b| compare_names(a, b));

    let rows = names
        .into_iter()
        .map(|name| {
            let (number, flags) = &by_name[name];
            let mut row = vec![name.to_string()];
            if with_numbers {
                row.push(number.unwrap_or_default().to_string());
            }
            row.extend(flags.iter().map(|&f| render_cell(&Cell::Available(f))));
            row
        })
        .collect();

    ProjectedTable { headers, rows }
}
