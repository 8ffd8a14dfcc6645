use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One validator's opinion, as reported by the validation collaborator.
///
/// Every field is optional: panels are untrusted input and a missing or
/// non-numeric field must be tolerated, not fatal.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatorJudgment {
    pub validator_id: Option<String>,
    pub valid: Option<bool>,
    pub confidence_score: Option<f64>,
    pub overall_score: Option<f64>,
    pub risk_level: Option<String>,
    pub data_hash: Option<String>,
}

impl ValidatorJudgment {
    /// Convenience constructor for a judgment carrying only the scoring fields.
    pub fn scored(valid: bool, confidence_score: f64) -> Self {
        Self {
            valid: Some(valid),
            confidence_score: Some(confidence_score),
            ..Self::default()
        }
    }

    /// True when the entry carries both a validity flag and a confidence score.
    pub fn is_well_formed(&self) -> bool {
        self.valid.is_some() && self.confidence_score.is_some()
    }

    /// Read one panel entry. Anything that is not an object becomes an
    /// all-absent judgment.
    pub fn from_value(v: &Value) -> Self {
        let Some(obj) = v.as_object() else {
            return Self::default();
        };
        let binary = obj.get("binary_classification");
        let overall = obj.get("overall_assessment");

        let validator_id = ["validator_id", "miner_address", "miner"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(as_text));

        Self {
            validator_id,
            valid: field(v, binary, "valid").and_then(as_flag),
            confidence_score: field(v, binary, "confidence_score").and_then(as_number),
            overall_score: field(v, overall, "overall_score").and_then(as_number),
            risk_level: field(v, overall, "risk_level").and_then(as_text),
            data_hash: obj.get("data_hash").and_then(as_text),
        }
    }
}

/// Top-level key first, then the same key inside the router's nested block.
fn field<'a>(top: &'a Value, nested: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    top.get(key)
        .filter(|v| !v.is_null())
        .or_else(|| nested.and_then(|n| n.get(key)).filter(|v| !v.is_null()))
}

fn as_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn as_flag(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|x| x != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Normalize a validator panel response into a uniform judgment list.
///
/// Accepted shapes: a bare array, an object wrapping a `results` array, or a
/// single judgment object. `null` is an empty panel.
pub fn normalize_panel(response: &Value) -> Vec<ValidatorJudgment> {
    match response {
        Value::Null => Vec::new(),
        Value::Array(entries) => entries.iter().map(ValidatorJudgment::from_value).collect(),
        Value::Object(obj) => match obj.get("results") {
            Some(Value::Array(entries)) => {
                entries.iter().map(ValidatorJudgment::from_value).collect()
            }
            _ => vec![ValidatorJudgment::from_value(response)],
        },
        other => vec![ValidatorJudgment::from_value(other)],
    }
}
