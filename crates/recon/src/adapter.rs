use std::collections::{BTreeMap, BTreeSet};

use crate::model::{AdaptedBatch, NormalizedRecord};
use crate::provider::{Flag, ProviderId, ProviderResult};

/// How collection went for one provider.
#[derive(Debug, Clone)]
pub enum ProviderOutcome {
    Collected(ProviderResult),
    /// Payload arrived but matches no known shape.
    Malformed(String),
    /// Scrape errored, timed out or crashed.
    Failed(String),
}

/// Convert one provider's outcome into uniform records. Never fails:
/// anything unusable becomes an empty batch with a warning.
pub fn adapt(provider: ProviderId, outcome: &ProviderOutcome) -> AdaptedBatch {
    match outcome {
        ProviderOutcome::Collected(result) => adapt_result(provider, result),
        ProviderOutcome::Malformed(reason) => {
            let mut batch = AdaptedBatch::empty(provider);
            batch.warn(format!("unrecognised result shape: {reason}"));
            batch
        }
        ProviderOutcome::Failed(reason) => {
            let mut batch = AdaptedBatch::empty(provider);
            batch.warn(format!("no result: {reason}"));
            batch
        }
    }
}

/// Dispatch on the result shape.
pub fn adapt_result(provider: ProviderId, result: &ProviderResult) -> AdaptedBatch {
    let expected = provider.shape();
    if result.shape() != expected {
        let mut batch = AdaptedBatch::empty(provider);
        batch.warn(format!("expected a {expected} result, got {}", result.shape()));
        return batch;
    }

    let batch = match result {
        ProviderResult::Tabular { plans, rows } => adapt_tabular(provider, plans, rows),
        ProviderResult::DictOfPlans { plans, channels } => adapt_dict_of_plans(provider, plans, channels),
        ProviderResult::FlatList { channels } => adapt_flat_list(provider, channels),
    };
    log::debug!(
        "{provider}: {} records over {} plan(s), {} warning(s)",
        batch.records.len(),
        batch.plans.len(),
        batch.warnings.len()
    );
    batch
}

fn clean_plans(batch: &mut AdaptedBatch, plans: &[String]) {
    let mut seen = BTreeSet::new();
    for plan in plans {
        let plan = plan.trim();
        if plan.is_empty() {
            batch.warn("empty plan name ignored");
            continue;
        }
        if !seen.insert(plan.to_string()) {
            batch.warn(format!("duplicate plan '{plan}' ignored"));
            continue;
        }
        batch.plans.push(plan.to_string());
    }
}

/// Rows are `(name, number, flag_1..flag_n)` aligned with `plans`.
pub fn adapt_tabular(provider: ProviderId, plans: &[String], rows: &[Vec<String>]) -> AdaptedBatch {
    let mut batch = AdaptedBatch::empty(provider);
    clean_plans(&mut batch, plans);

    // Flags align with the raw plan list; a repeated plan keeps its first position.
    let mut columns: Vec<(usize, &str)> = Vec::new();
    for (pos, plan) in plans.iter().enumerate() {
        let plan = plan.trim();
        if batch.plans.iter().any(|p| p == plan) && !columns.iter().any(|(_, p)| *p == plan) {
            columns.push((pos, plan));
        }
    }

    for (i, row) in rows.iter().enumerate() {
        if row.len() < 2 {
            batch.warn(format!("row {i}: expected at least name and number, got {} cell(s)", row.len()));
            continue;
        }
        let name = row[0].trim();
        if name.is_empty() {
            batch.warn(format!("row {i}: empty channel name"));
            continue;
        }
        let number = Some(row[1].trim().to_string()).filter(|n| !n.is_empty());
        let flags = &row[2..];
        if flags.len() > plans.len() {
            log::debug!("{provider}: row {i} has {} extra cell(s)", flags.len() - plans.len());
        }

        for (pos, plan) in &columns {
            // Missing trailing cells mean "not in plan".
            let present = flags
                .get(*pos)
                .map(|cell| Flag::from(cell.as_str()).is_present())
                .unwrap_or(false);
            batch.records.push(NormalizedRecord {
                channel: name.to_string(),
                provider,
                plan: plan.to_string(),
                present,
                number: number.clone(),
            });
        }

        if columns.is_empty() {
            // A number without plans still tells us the channel exists.
            batch.records.push(NormalizedRecord {
                channel: name.to_string(),
                provider,
                plan: provider.display_name().to_string(),
                present: true,
                number: number.clone(),
            });
        }
    }
    batch
}

/// Every channel expands to one record per declared plan.
pub fn adapt_dict_of_plans(
    provider: ProviderId,
    plans: &[String],
    channels: &BTreeMap<String, BTreeMap<String, Flag>>,
) -> AdaptedBatch {
    let mut batch = AdaptedBatch::empty(provider);
    clean_plans(&mut batch, plans);

    let mut undeclared: BTreeSet<String> = BTreeSet::new();

    for (name, per_plan) in channels {
        let name = name.trim();
        if name.is_empty() {
            batch.warn("channel with empty name skipped");
            continue;
        }
        if per_plan.is_empty() {
            batch.warn(format!("channel '{name}': no plan flags; skipped"));
            continue;
        }
        for plan in per_plan.keys() {
            if !batch.plans.iter().any(|p| p == plan.trim()) {
                undeclared.insert(plan.trim().to_string());
            }
        }
        for plan in &batch.plans {
            let present = per_plan
                .iter()
                .find(|(k, _)| k.trim() == plan)
                .map(|(_, flag)| flag.is_present())
                .unwrap_or(false);
            batch.records.push(NormalizedRecord {
                channel: name.to_string(),
                provider,
                plan: plan.clone(),
                present,
                number: None,
            });
        }
    }

    for plan in undeclared {
        batch.warn(format!("plan '{plan}' is not in the plan list; ignored"));
    }
    batch
}

/// One implicit, always-available plan named after the provider.
pub fn adapt_flat_list(provider: ProviderId, channels: &[String]) -> AdaptedBatch {
    let mut batch = AdaptedBatch::empty(provider);
    let plan = provider.display_name().to_string();
    batch.plans.push(plan.clone());

    for (i, name) in channels.iter().enumerate() {
        let name = name.trim();
        if name.is_empty() {
            batch.warn(format!("entry {i}: empty channel name"));
            continue;
        }
        batch.records.push(NormalizedRecord {
            channel: name.to_string(),
            provider,
            plan: plan.clone(),
            present: true,
            number: None,
        });
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn tabular_rows_expand_per_plan() {
        let batch = adapt_tabular(
            ProviderId::DirecTv,
            &s(&["Entertainment", "Choice"]),
            &[s(&["USA", "242", "✔️", ""]), s(&["ESPN", "206", "", "✔️"])],
        );
        assert!(batch.warnings.is_empty());
        assert_eq!(batch.records.len(), 4);
        assert_eq!(batch.records[0].plan, "Entertainment");
        assert!(batch.records[0].present);
        assert!(!batch.records[1].present);
        assert_eq!(batch.records[3].number.as_deref(), Some("206"));
    }

    #[test]
    fn tabular_short_rows_skipped_softly() {
        let batch = adapt_tabular(
            ProviderId::DirecTv,
            &s(&["Base"]),
            &[s(&["orphan"]), s(&[]), s(&["CNN", "202", "✔"])],
        );
        assert_eq!(batch.warnings.len(), 2);
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].channel, "CNN");
    }

    #[test]
    fn tabular_missing_flags_are_absent() {
        let batch = adapt_tabular(ProviderId::DirecTvStream, &s(&["A", "B"]), &[s(&["CNN", "202", "✔"])]);
        assert_eq!(batch.records.len(), 2);
        assert!(batch.records[0].present);
        assert!(!batch.records[1].present);
    }

    #[test]
    fn tabular_empty_number_is_none() {
        let batch = adapt_tabular(ProviderId::DirecTv, &s(&["Base"]), &[s(&["CNN", " ", "✔"])]);
        assert_eq!(batch.records[0].number, None);
    }

    #[test]
    fn dict_missing_plan_is_absent() {
        let mut channels = BTreeMap::new();
        channels.insert("ESPN".to_string(), BTreeMap::from([("Pro".to_string(), Flag::from("✔️"))]));
        let batch = adapt_dict_of_plans(ProviderId::FuboTv, &s(&["Pro", "Elite"]), &channels);
        assert_eq!(batch.records.len(), 2);
        assert!(batch.records[0].present);
        assert_eq!(batch.records[1].plan, "Elite");
        assert!(!batch.records[1].present);
    }

    #[test]
    fn dict_undeclared_plan_warns_once() {
        let mut channels = BTreeMap::new();
        for name in ["A", "B"] {
            channels.insert(name.to_string(), BTreeMap::from([("Secret".to_string(), Flag::Bool(true))]));
        }
        let batch = adapt_dict_of_plans(ProviderId::DishTv, &s(&["Top 120"]), &channels);
        assert_eq!(batch.warnings.len(), 1);
        assert!(batch.records.iter().all(|r| !r.present));
    }

    #[test]
    fn flat_list_uses_provider_plan() {
        let batch = adapt_flat_list(ProviderId::HuluTv, &s(&["ABC", " ", "usa hd"]));
        assert_eq!(batch.plans, vec!["HuluTV"]);
        assert_eq!(batch.records.len(), 2);
        assert!(batch.records.iter().all(|r| r.present && r.plan == "HuluTV"));
        assert_eq!(batch.warnings.len(), 1);
    }

    #[test]
    fn shape_mismatch_yields_nothing() {
        let result = ProviderResult::FlatList { channels: s(&["ABC"]) };
        let batch = adapt_result(ProviderId::DirecTv, &result);
        assert!(batch.records.is_empty());
        assert!(batch.plans.is_empty());
        assert_eq!(batch.warnings.len(), 1);
    }

    #[test]
    fn failed_and_malformed_outcomes_are_empty() {
        let failed = adapt(ProviderId::SlingTv, &ProviderOutcome::Failed("timeout".into()));
        assert!(failed.records.is_empty());
        assert!(failed.warnings[0].message.contains("timeout"));
        let bad = adapt(ProviderId::SlingTv, &ProviderOutcome::Malformed("number".into()));
        assert!(bad.records.is_empty());
    }

    #[test]
    fn dict_channel_without_flags_is_skipped() {
        let mut channels = BTreeMap::new();
        channels.insert("ESPN".to_string(), BTreeMap::new());
        channels.insert("CNN".to_string(), BTreeMap::from([("Pro".to_string(), Flag::Absent)]));
        let batch = adapt_dict_of_plans(ProviderId::FuboTv, &s(&["Pro"]), &channels);
        assert_eq!(batch.warnings.len(), 1);
        assert!(batch.warnings[0].message.contains("ESPN"));
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].channel, "CNN");
        assert!(!batch.records[0].present);
    }

    #[test]
    fn unreadable_entries_cost_one_warning_each() {
        let bare = serde_json::json!([[["USA", 545, "✔"], "garbage", 7, ["CNN", "202", "✔"]], ["Base"]]);
        let result = ProviderResult::from_json(&bare).unwrap();
        let batch = adapt_result(ProviderId::DirecTv, &result);
        assert_eq!(batch.warnings.len(), 2);
        let channels: Vec<&str> = batch.records.iter().map(|r| r.channel.as_str()).collect();
        assert_eq!(channels, vec!["USA", "CNN"]);
        assert_eq!(batch.records[0].number.as_deref(), Some("545"));

        let flat = ProviderResult::from_json(&serde_json::json!(["ABC", null, "CBS"])).unwrap();
        let batch = adapt_result(ProviderId::HuluTv, &flat);
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.warnings.len(), 1);

        let dict = serde_json::json!({
            "shape": "dict_of_plans",
            "plans": ["Pro"],
            "channels": {"ESPN": {"Pro": null}, "CNN": {"Pro": "✔"}, "TNT": "yes"}
        });
        let batch = adapt_result(ProviderId::FuboTv, &ProviderResult::from_json(&dict).unwrap());
        assert_eq!(batch.warnings.len(), 1);
        let present: Vec<(&str, bool)> = batch.records.iter().map(|r| (r.channel.as_str(), r.present)).collect();
        assert_eq!(present, vec![("CNN", true), ("ESPN", false)]);
    }

    #[test]
    fn duplicate_plans_collapse() {
        let batch = adapt_tabular(ProviderId::DirecTv, &s(&["Base", "Base "]), &[s(&["CNN", "202", "✔", ""])]);
        assert_eq!(batch.plans, vec!["Base"]);
        assert_eq!(batch.warnings.len(), 1);
        assert_eq!(batch.records.len(), 1);
        assert!(batch.records[0].present);
    }
}
