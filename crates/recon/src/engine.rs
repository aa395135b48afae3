use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::alias::{normalize, AliasTable};
use crate::model::{AdaptedBatch, Cell, Column, Lineup, NormalizedRecord, NumberConflict, UnifiedRow};
use crate::provider::ProviderId;

/// Merge every provider's adapted batch into one canonical table.
///
/// This is the single canonicalization point. Each batch's provider counts
/// as selected for the run: it gets its columns even with zero records.
pub fn reconcile(batches: &[AdaptedBatch], aliases: &AliasTable) -> Lineup {
    let batches = merge_by_provider(batches);
    let columns = allocate_columns(&batches);

    let col_index: HashMap<(ProviderId, &str), usize> = columns
        .iter()
        .enumerate()
        .filter_map(|(i, c)| match c {
            Column::Plan { provider, plan } => Some(((*provider, plan.as_str()), i)),
            _ => None,
        })
        .collect();
    let number_index: HashMap<ProviderId, usize> = columns
        .iter()
        .enumerate()
        .filter_map(|(i, c)| match c {
            Column::Number { provider } => Some((*provider, i)),
            _ => None,
        })
        .collect();

    // canonical -> availability per column
    let mut availability: HashMap<String, Vec<bool>> = HashMap::new();
    // (provider, canonical) -> {(raw spelling, number)}
    let mut numbers: BTreeMap<(ProviderId, String), BTreeSet<(String, String)>> = BTreeMap::new();

    for batch in &batches {
        for record in &batch.records {
            let canonical = aliases.canonicalize(&record.channel);
            let cells = availability
                .entry(canonical.clone())
                .or_insert_with(|| vec![false; columns.len()]);

            // Existential OR across aliases: one present spelling is enough.
            if record.present {
                if let Some(&i) = col_index.get(&(record.provider, record.plan.trim())) {
                    cells[i] = true;
                }
            }

            if let Some(number) = &record.number {
                if number_index.contains_key(&record.provider) {
                    numbers
                        .entry((record.provider, canonical))
                        .or_default()
                        .insert((record.channel.trim().to_string(), number.clone()));
                }
            }
        }
    }

    let mut conflicts = Vec::new();
    let mut chosen: HashMap<(ProviderId, String), String> = HashMap::new();
    for ((provider, canonical), candidates) in numbers {
        let pick = pick_number(&canonical, &candidates);
        let distinct: BTreeSet<&str> = candidates.iter().map(|(_, n)| n.as_str()).collect();
        if distinct.len() > 1 {
            log::warn!(
                "{provider}: '{canonical}' has {} different numbers ({}); using {pick}",
                distinct.len(),
                distinct.iter().copied().collect::<Vec<_>>().join(", ")
            );
            conflicts.push(NumberConflict {
                provider,
                channel: canonical.clone(),
                candidates: candidates.iter().cloned().collect(),
                chosen: pick.clone(),
            });
        }
        chosen.insert((provider, canonical), pick);
    }

    let mut names: Vec<String> = availability.keys().cloned().collect();
    names.sort_by(|a, b| compare_names(a, b));

    let rows = names
        .into_iter()
        .map(|channel| {
            let flags = &availability[&channel];
            let cells = columns
                .iter()
                .enumerate()
                .map(|(i, column)| match column {
                    Column::Number { provider } => {
                        Cell::Number(chosen.get(&(*provider, channel.clone())).cloned())
                    }
                    Column::Plan { .. } | Column::Placeholder { .. } => Cell::Available(flags[i]),
                })
                .collect();
            UnifiedRow { channel, cells }
        })
        .collect::<Vec<_>>();

    log::info!(
        "reconciled {} provider(s) into {} channels x {} columns ({} number conflicts)",
        batches.len(),
        rows.len(),
        columns.len(),
        conflicts.len()
    );

    Lineup { columns, rows, conflicts }
}

/// Bare record-only variant: columns come from the records themselves, so a
/// provider with no records has no columns.
pub fn reconcile_records(records: &[NormalizedRecord], aliases: &AliasTable) -> Lineup {
    let mut batches: Vec<AdaptedBatch> = Vec::new();
    for record in records {
        let idx = match batches.iter().position(|b| b.provider == record.provider) {
            Some(idx) => idx,
            None => {
                batches.push(AdaptedBatch::empty(record.provider));
                batches.len() - 1
            }
        };
        batches[idx].records.push(record.clone());
    }
    reconcile(&batches, aliases)
}

/// Case-insensitive ascending; exact string breaks ties.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Order-independent tie-break: a spelling identical to the canonical name
/// wins, otherwise the smallest (spelling, number) pair.
fn pick_number(canonical: &str, candidates: &BTreeSet<(String, String)>) -> String {
    candidates
        .iter()
        .find(|(raw, _)| normalize(raw) == canonical)
        .or_else(|| candidates.iter().next())
        .map(|(_, number)| number.clone())
        .unwrap_or_default()
}

/// Batches sorted into registration order; repeated providers are folded
/// together so each provider appears once.
fn merge_by_provider(batches: &[AdaptedBatch]) -> Vec<AdaptedBatch> {
    let mut merged: BTreeMap<ProviderId, AdaptedBatch> = BTreeMap::new();
    for batch in batches {
        let slot = merged
            .entry(batch.provider)
            .or_insert_with(|| AdaptedBatch::empty(batch.provider));
        for plan in &batch.plans {
            if !slot.plans.contains(plan) {
                slot.plans.push(plan.clone());
            }
        }
        slot.records.extend(batch.records.iter().cloned());
        slot.warnings.extend(batch.warnings.iter().cloned());
    }
    merged.into_values().collect()
}

fn allocate_columns(batches: &[AdaptedBatch]) -> Vec<Column> {
    let mut columns = Vec::new();
    for batch in batches {
        let provider = batch.provider;
        if provider.has_channel_numbers() {
            columns.push(Column::Number { provider });
        }

        let mut plans: Vec<String> = batch.plans.iter().map(|p| p.trim().to_string()).collect();
        for record in &batch.records {
            let plan = record.plan.trim();
            if !plans.iter().any(|p| p == plan) {
                plans.push(plan.to_string());
            }
        }

        if plans.is_empty() {
            columns.push(Column::Placeholder { provider });
        } else {
            columns.extend(plans.into_iter().map(|plan| Column::Plan { provider, plan }));
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{adapt, adapt_flat_list, adapt_tabular, ProviderOutcome};

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    fn plan(provider: ProviderId, plan: &str) -> Column {
        Column::Plan { provider, plan: plan.into() }
    }

    fn record(channel: &str, provider: ProviderId, plan: &str, present: bool) -> NormalizedRecord {
        NormalizedRecord { channel: channel.into(), provider, plan: plan.into(), present, number: None }
    }

    #[test]
    fn usa_network_scenario() {
        let aliases = AliasTable::from_csv_str("usa network,usa,usa hd\n").unwrap();
        let directv = adapt_tabular(ProviderId::DirecTv, &s(&["Base"]), &[s(&["USA", "545", "✔"])]);
        let hulu = adapt_flat_list(ProviderId::HuluTv, &s(&["usa hd"]));

        let lineup = reconcile(&[directv, hulu], &aliases);

        assert_eq!(lineup.rows.len(), 1);
        assert_eq!(lineup.rows[0].channel, "usa network");
        assert_eq!(
            lineup.cell("usa network", &Column::Number { provider: ProviderId::DirecTv }),
            Some(&Cell::Number(Some("545".into())))
        );
        assert_eq!(lineup.cell("usa network", &plan(ProviderId::DirecTv, "Base")), Some(&Cell::Available(true)));
        assert_eq!(lineup.cell("usa network", &plan(ProviderId::HuluTv, "HuluTV")), Some(&Cell::Available(true)));
    }

    #[test]
    fn any_present_alias_wins() {
        let aliases = AliasTable::from_csv_str("X,X-alt\n").unwrap();
        let records = vec![
            record("X-alt", ProviderId::FuboTv, "Gold", true),
            record("X", ProviderId::FuboTv, "Gold", false),
        ];
        let lineup = reconcile_records(&records, &aliases);
        assert_eq!(lineup.rows.len(), 1);
        assert_eq!(lineup.cell("x", &plan(ProviderId::FuboTv, "Gold")), Some(&Cell::Available(true)));

        // Same again with the absent spelling processed last.
        let reversed: Vec<_> = records.into_iter().rev().collect();
        let lineup = reconcile_records(&reversed, &aliases);
        assert_eq!(lineup.cell("x", &plan(ProviderId::FuboTv, "Gold")), Some(&Cell::Available(true)));
    }

    #[test]
    fn one_row_per_canonical_name() {
        let aliases = AliasTable::from_csv_str("ESPN,espn hd\n").unwrap();
        let records = vec![
            record("ESPN", ProviderId::SlingTv, "Orange", true),
            record("espn hd", ProviderId::DishTv, "Top 120", true),
            record("CNN", ProviderId::SlingTv, "Blue", false),
        ];
        let lineup = reconcile_records(&records, &aliases);
        let names: Vec<&str> = lineup.rows.iter().map(|r| r.channel.as_str()).collect();
        assert_eq!(names, vec!["cnn", "espn"]);
        // A channel absent everywhere still gets its row.
        assert!(lineup.row("cnn").unwrap().cells.iter().all(|c| *c == Cell::Available(false)));
    }

    #[test]
    fn failed_provider_keeps_blank_column() {
        let aliases = AliasTable::empty();
        let hulu = adapt_flat_list(ProviderId::HuluTv, &s(&["ABC"]));
        let dish = adapt(ProviderId::DishTv, &ProviderOutcome::Failed("driver crashed".into()));
        let lineup = reconcile(&[hulu, dish], &aliases);

        assert_eq!(
            lineup.columns,
            vec![Column::Placeholder { provider: ProviderId::DishTv }, plan(ProviderId::HuluTv, "HuluTV")]
        );
        assert_eq!(lineup.rows.len(), 1);
        assert_eq!(lineup.rows[0].cells[0], Cell::Available(false));
    }

    #[test]
    fn declared_plans_survive_zero_rows() {
        let directv = adapt_tabular(ProviderId::DirecTv, &s(&["Entertainment", "Choice"]), &[]);
        let lineup = reconcile(&[directv], &AliasTable::empty());
        assert_eq!(
            lineup.columns,
            vec![
                Column::Number { provider: ProviderId::DirecTv },
                plan(ProviderId::DirecTv, "Entertainment"),
                plan(ProviderId::DirecTv, "Choice"),
            ]
        );
        assert!(lineup.rows.is_empty());
    }

    #[test]
    fn columns_follow_registration_order() {
        let youtube = adapt_flat_list(ProviderId::YouTubeTv, &s(&["ABC"]));
        let stream = adapt_tabular(ProviderId::DirecTvStream, &s(&["Entertainment"]), &[s(&["ABC", "7", "✔"])]);
        let directv = adapt_tabular(ProviderId::DirecTv, &s(&["Base"]), &[s(&["ABC", "7", "✔"])]);
        let lineup = reconcile(&[youtube, stream, directv], &AliasTable::empty());
        let headers: Vec<String> = lineup.columns.iter().map(Column::header).collect();
        assert_eq!(
            headers,
            vec![
                "DirecTV Number",
                "DirecTV Base",
                "DirecTV Stream Number",
                "DirecTV Stream Entertainment",
                "YouTubeTV"
            ]
        );
    }

    #[test]
    fn number_conflict_is_order_independent() {
        let aliases = AliasTable::from_csv_str("Fox News,FNC\n").unwrap();
        let rows_a = vec![s(&["FNC", "360", "✔"]), s(&["Fox News", "359", "✔"])];
        let rows_b: Vec<_> = rows_a.iter().cloned().rev().collect();
        let col = Column::Number { provider: ProviderId::DirecTv };

        for rows in [rows_a, rows_b] {
            let batch = adapt_tabular(ProviderId::DirecTv, &s(&["Base"]), &rows);
            let lineup = reconcile(&[batch], &aliases);
            assert_eq!(lineup.cell("fox news", &col), Some(&Cell::Number(Some("359".into()))));
            assert_eq!(lineup.conflicts.len(), 1);
            assert_eq!(lineup.conflicts[0].chosen, "359");
        }
    }

    #[test]
    fn number_conflict_without_canonical_spelling_takes_smallest() {
        let aliases = AliasTable::from_csv_str("Fox News,FNC,Fox News Channel\n").unwrap();
        let rows = vec![s(&["Fox News Channel", "360", "✔"]), s(&["FNC", "361", "✔"])];
        let batch = adapt_tabular(ProviderId::DirecTv, &s(&["Base"]), &rows);
        let lineup = reconcile(&[batch], &aliases);
        let col = Column::Number { provider: ProviderId::DirecTv };
        assert_eq!(lineup.cell("fox news", &col), Some(&Cell::Number(Some("361".into()))));
    }

    #[test]
    fn same_number_twice_is_not_a_conflict() {
        let aliases = AliasTable::from_csv_str("CNN,CNN HD\n").unwrap();
        let rows = vec![s(&["CNN", "202", "✔"]), s(&["CNN HD", "202", ""])];
        let batch = adapt_tabular(ProviderId::DirecTv, &s(&["Base"]), &rows);
        let lineup = reconcile(&[batch], &aliases);
        assert!(lineup.conflicts.is_empty());
    }

    #[test]
    fn channel_without_number_has_empty_number_cell() {
        let directv = adapt_tabular(ProviderId::DirecTv, &s(&["Base"]), &[s(&["ABC", "7", "✔"])]);
        let hulu = adapt_flat_list(ProviderId::HuluTv, &s(&["NBC"]));
        let lineup = reconcile(&[directv, hulu], &AliasTable::empty());
        let col = Column::Number { provider: ProviderId::DirecTv };
        assert_eq!(lineup.cell("nbc", &col), Some(&Cell::Number(None)));
    }

    #[test]
    fn repeated_provider_batches_fold_together() {
        let a = adapt_flat_list(ProviderId::HuluTv, &s(&["ABC"]));
        let b = adapt_flat_list(ProviderId::HuluTv, &s(&["CBS"]));
        let lineup = reconcile(&[a, b], &AliasTable::empty());
        assert_eq!(lineup.columns.len(), 1);
        assert_eq!(lineup.rows.len(), 2);
    }

    #[test]
    fn name_ordering_breaks_case_ties() {
        let mut names = vec!["b", "B", "a", "A"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, vec!["A", "a", "B", "b"]);
    }
}
