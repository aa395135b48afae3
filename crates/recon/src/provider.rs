use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Every supported provider, in registration order.
///
/// Declaration order is the output column order for providers, so do not
/// reorder variants casually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    #[serde(rename = "directv")]
    DirecTv,
    #[serde(rename = "directv_stream")]
    DirecTvStream,
    #[serde(rename = "dishtv")]
    DishTv,
    #[serde(rename = "fubotv")]
    FuboTv,
    #[serde(rename = "slingtv")]
    SlingTv,
    #[serde(rename = "hulutv")]
    HuluTv,
    #[serde(rename = "youtubetv")]
    YouTubeTv,
}

/// Shape of the raw result a provider's scraper hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderShape {
    Tabular,
    DictOfPlans,
    FlatList,
}

impl fmt::Display for ProviderShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tabular => write!(f, "tabular"),
            Self::DictOfPlans => write!(f, "dict_of_plans"),
            Self::FlatList => write!(f, "flat_list"),
        }
    }
}

impl ProviderId {
    pub const ALL: [ProviderId; 7] = [
        ProviderId::DirecTv,
        ProviderId::DirecTvStream,
        ProviderId::DishTv,
        ProviderId::FuboTv,
        ProviderId::SlingTv,
        ProviderId::HuluTv,
        ProviderId::YouTubeTv,
    ];

    /// Stable identifier used for file names and CLI selection.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::DirecTv => "directv",
            Self::DirecTvStream => "directv_stream",
            Self::DishTv => "dishtv",
            Self::FuboTv => "fubotv",
            Self::SlingTv => "slingtv",
            Self::HuluTv => "hulutv",
            Self::YouTubeTv => "youtubetv",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DirecTv => "DirecTV",
            Self::DirecTvStream => "DirecTV Stream",
            Self::DishTv => "DishTV",
            Self::FuboTv => "FuboTV",
            Self::SlingTv => "SlingTV",
            Self::HuluTv => "HuluTV",
            Self::YouTubeTv => "YouTubeTV",
        }
    }

    pub fn shape(&self) -> ProviderShape {
        match self {
            Self::DirecTv | Self::DirecTvStream => ProviderShape::Tabular,
            Self::DishTv | Self::FuboTv | Self::SlingTv => ProviderShape::DictOfPlans,
            Self::HuluTv | Self::YouTubeTv => ProviderShape::FlatList,
        }
    }

    /// Only the DirecTV family publishes channel numbers.
    pub fn has_channel_numbers(&self) -> bool {
        matches!(self, Self::DirecTv | Self::DirecTvStream)
    }

    /// Position in registration order.
    pub fn rank(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvider(pub String);

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known: Vec<&str> = ProviderId::ALL.iter().map(|p| p.slug()).collect();
        write!(f, "unknown provider '{}' (expected one of: {})", self.0, known.join(", "))
    }
}

impl std::error::Error for UnknownProvider {}

impl FromStr for ProviderId {
    type Err = UnknownProvider;

    /// Accepts slugs and display names; case, spaces, `_`, `-` and `+` are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let squashed: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-' | '+'))
            .flat_map(char::to_lowercase)
            .collect();
        ProviderId::ALL
            .iter()
            .copied()
            .find(|p| p.slug().replace('_', "") == squashed)
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

/// One availability cell as a scraper reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Number(f64),
    Text(String),
    /// `null` in the payload.
    Absent,
}

const FALSY_TEXT: &[&str] = &["", "0", "false", "no", "n", "none", "-", "✗", "✘"];

impl Flag {
    /// Truthy / checkmark content means the channel is in the plan.
    pub fn is_present(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::Text(s) => {
                let t = s.trim().to_lowercase();
                !FALSY_TEXT.contains(&t.as_str())
            }
            Self::Absent => false,
        }
    }

    fn from_value(v: &Value) -> Option<Flag> {
        match v {
            Value::Bool(b) => Some(Flag::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Flag::Number),
            Value::String(s) => Some(Flag::Text(s.clone())),
            Value::Null => Some(Flag::Absent),
            _ => None,
        }
    }
}

impl From<&str> for Flag {
    fn from(s: &str) -> Self {
        Flag::Text(s.to_string())
    }
}

impl From<bool> for Flag {
    fn from(b: bool) -> Self {
        Flag::Bool(b)
    }
}

// ---------------------------------------------------------------------------
// Raw results
// ---------------------------------------------------------------------------

/// Raw scrape result, one variant per provider shape.
///
/// Entries that cannot be read are kept in a form the adapter skips with a
/// warning: an empty row, an empty channel name or an empty plan map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ProviderResult {
    /// `(name, number, flag_1..flag_n)` rows aligned with `plans`.
    Tabular {
        plans: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// channel name → plan → flag.
    DictOfPlans {
        plans: Vec<String>,
        channels: BTreeMap<String, BTreeMap<String, Flag>>,
    },
    /// Channel names under a single implicit plan.
    FlatList { channels: Vec<String> },
}

impl ProviderResult {
    pub fn shape(&self) -> ProviderShape {
        match self {
            Self::Tabular { .. } => ProviderShape::Tabular,
            Self::DictOfPlans { .. } => ProviderShape::DictOfPlans,
            Self::FlatList { .. } => ProviderShape::FlatList,
        }
    }

    /// Decode a scraper payload.
    ///
    /// Accepts the tagged encoding (`{"shape": ...}`) as well as the bare
    /// shapes scraper scripts return: `[rows, plans]`, `[channels, plans]`
    /// or a plain list of names. Returns `None` only when the outer
    /// structure matches none of these.
    pub fn from_json(value: &Value) -> Option<ProviderResult> {
        if let Some(shape) = value.get("shape") {
            return match shape.as_str()? {
                "tabular" => Some(ProviderResult::Tabular {
                    plans: plan_list(value.get("plans")?)?,
                    rows: tabular_rows(value.get("rows")?)?,
                }),
                "dict_of_plans" => Some(ProviderResult::DictOfPlans {
                    plans: plan_list(value.get("plans")?)?,
                    channels: plan_maps(value.get("channels")?)?,
                }),
                "flat_list" => Some(ProviderResult::FlatList { channels: name_list(value.get("channels")?)? }),
                _ => None,
            };
        }

        let items = value.as_array()?;

        if let [data, plans @ Value::Array(_)] = items.as_slice() {
            match data {
                Value::Array(_) => {
                    return Some(ProviderResult::Tabular { plans: plan_list(plans)?, rows: tabular_rows(data)? });
                }
                Value::Object(_) => {
                    return Some(ProviderResult::DictOfPlans { plans: plan_list(plans)?, channels: plan_maps(data)? });
                }
                _ => {}
            }
        }

        // A name list needs at least one actual name; `[1, 2, 3]` is not a lineup.
        if items.is_empty() || items.iter().any(Value::is_string) {
            return Some(ProviderResult::FlatList { channels: name_list(value)? });
        }
        None
    }

    /// Parse a JSON document, then [`from_json`](Self::from_json).
    pub fn from_json_str(input: &str) -> Option<ProviderResult> {
        let value: Value = serde_json::from_str(input).ok()?;
        Self::from_json(&value)
    }
}

/// Strings and numbers as text; anything else becomes empty.
fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Unreadable plan names become empty and are dropped by the adapter,
/// keeping later flags aligned with their plans.
fn plan_list(v: &Value) -> Option<Vec<String>> {
    Some(v.as_array()?.iter().map(|p| scalar_text(p).trim().to_string()).collect())
}

fn name_list(v: &Value) -> Option<Vec<String>> {
    Some(v.as_array()?.iter().map(scalar_text).collect())
}

/// Tabular cells arrive as strings, numbers (channel numbers) or bools.
/// A row that is not a list comes back empty.
fn tabular_rows(v: &Value) -> Option<Vec<Vec<String>>> {
    let rows = v.as_array()?.iter().map(|row| match row {
        Value::Array(cells) => cells
            .iter()
            .map(|cell| match cell {
                Value::Bool(true) => "✔".to_string(),
                other => scalar_text(other),
            })
            .collect::<Vec<String>>(),
        _ => Vec::new(),
    });
    Some(rows.collect())
}

/// A channel whose plan map is not an object comes back with no plans;
/// flags that are lists or objects are left out of the map.
fn plan_maps(v: &Value) -> Option<BTreeMap<String, BTreeMap<String, Flag>>> {
    let channels = v.as_object()?.iter().map(|(name, per_plan)| {
        let flags: BTreeMap<String, Flag> = per_plan
            .as_object()
            .map(|m| {
                m.iter()
                    .filter_map(|(plan, flag)| Flag::from_value(flag).map(|f| (plan.clone(), f)))
                    .collect()
            })
            .unwrap_or_default();
        (name.clone(), flags)
    });
    Some(channels.collect())
}
