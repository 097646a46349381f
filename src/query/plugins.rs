//! Post-processing applied to query result rows.
//!
//! Each query type carries an ordered list of plugins. They run after the rows
//! come back from the store, on both the individual and the merged path.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use url::Url;

use super::QueryConfig;
use crate::store::Record;

/// A row transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Plugin {
    /// Rewrites absolute URLs on the website's own domain to their path.
    StripDomain { field: String },

    /// Adds each row's share of the column total, in percent.
    Percentage {
        field: String,
        #[serde(default = "default_percentage_target")]
        target: String,
    },

    /// Renames a column.
    Rename { from: String, to: String },

    /// Rounds a floating point column.
    Round {
        field: String,
        #[serde(default)]
        digits: u32,
    },
}

fn default_percentage_target() -> String {
    "percentage".to_string()
}

impl Plugin {
    /// Applies this plugin to a full row set.
    pub fn apply(&self, mut rows: Vec<Record>, website_domain: Option<&str>) -> Vec<Record> {
        match self {
            Self::StripDomain { field } => {
                let Some(domain) = website_domain else {
                    return rows;
                };
                for row in &mut rows {
                    if let Some(Value::String(url)) = row.get_mut(field) {
                        if let Some(path) = strip_domain(url, domain) {
                            *url = path;
                        }
                    }
                }
                rows
            }
            Self::Percentage { field, target } => {
                let total: f64 = rows.iter().filter_map(|row| as_f64(row.get(field))).sum();
                for row in &mut rows {
                    let share = match as_f64(row.get(field)) {
                        Some(value) if total > 0.0 => round_to(value / total * 100.0, 2),
                        _ => 0.0,
                    };
                    row.insert(target.clone(), float_value(share));
                }
                rows
            }
            Self::Rename { from, to } => {
                for row in &mut rows {
                    if let Some(value) = row.remove(from) {
                        row.insert(to.clone(), value);
                    }
                }
                rows
            }
            Self::Round { field, digits } => {
                for row in &mut rows {
                    if let Some(value) = row.get_mut(field) {
                        if value.is_f64() {
                            if let Some(f) = value.as_f64() {
                                *value = float_value(round_to(f, *digits));
                            }
                        }
                    }
                }
                rows
            }
        }
    }
}

/// Runs a config's plugin chain over `rows`.
pub fn apply_plugins(
    rows: Vec<Record>,
    config: &QueryConfig,
    website_domain: Option<&str>,
) -> Vec<Record> {
    config
        .plugins()
        .iter()
        .fold(rows, |rows, plugin| plugin.apply(rows, website_domain))
}

/// Returns the path (plus query) of `url` if it points at `domain`.
fn strip_domain(url: &str, domain: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let domain = domain.trim().trim_start_matches("www.").to_ascii_lowercase();

    if host != domain && host != format!("www.{domain}") {
        return None;
    }

    let mut path = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        path.push('?');
        path.push_str(query);
    }
    Some(path)
}

fn as_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Beyond this an f64 has no more decimal digits to keep.
const MAX_ROUND_DIGITS: u32 = 15;

fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits.min(MAX_ROUND_DIGITS) as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

fn float_value(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}
