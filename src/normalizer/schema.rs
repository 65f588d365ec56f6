//! Permissive shape check for model replies.
//! Required keys must be present, known keys must have a plausible type,
//! unknown keys are allowed. Nothing is repaired here.

use serde_json::{Map, Value};

use crate::error::{AppError, Result};

pub const REQUIRED_FIELDS: &[&str] = &[
    "verdict",
    "market_price",
    "net_profit",
    "product_name",
    "velocity_score",
];

/// Accept number or null.
pub const NUMERIC_FIELDS: &[&str] = &[
    "market_price",
    "net_profit",
    "ebay_price",
    "amazon_price",
    "current_price",
    "sales_tax_rate",
    "sales_tax_amount",
    "fee_percentage",
    "fees_amount",
    "shipping_cost",
];

/// Accept string or null.
pub const STRING_FIELDS: &[&str] = &[
    "market_price_source",
    "profit_calculation",
    "reasoning",
    "market_analysis",
    "product_image_url",
    "ebay_url",
    "amazon_url",
];

pub fn validate(obj: &Map<String, Value>, raw: &str) -> Result<()> {
    let violations = violations(obj);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(AppError::Schema {
            violations,
            raw: raw.to_string(),
        })
    }
}

pub fn violations(obj: &Map<String, Value>) -> Vec<String> {
    let mut out = Vec::new();

    for field in REQUIRED_FIELDS {
        if !obj.contains_key(*field) {
            out.push(format!("{field}: required"));
        }
    }

    for field in NUMERIC_FIELDS {
        match obj.get(*field) {
            None | Some(Value::Null) | Some(Value::Number(_)) => {}
            Some(other) => out.push(format!("{field}: expected number or null, got {}", kind(other))),
        }
    }

    for field in STRING_FIELDS {
        match obj.get(*field) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(other) => out.push(format!("{field}: expected string or null, got {}", kind(other))),
        }
    }

    for field in ["verdict", "product_name", "velocity_score"] {
        if let Some(v) = obj.get(field) {
            if !v.is_string() {
                out.push(format!("{field}: expected string, got {}", kind(v)));
            }
        }
    }

    out
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("fixture must be an object"),
        }
    }

    fn minimal() -> Value {
        json!({
            "verdict": "BUY",
            "market_price": 80.0,
            "net_profit": 41.2,
            "product_name": "Nintendo Switch Pro Controller",
            "velocity_score": "High",
        })
    }

    #[test]
    fn minimal_reply_passes() {
        assert!(violations(&obj(minimal())).is_empty());
    }

    #[test]
    fn extra_fields_and_nulls_are_allowed() {
        let mut v = minimal();
        v["ebay_price"] = Value::Null;
        v["ebay_url"] = Value::Null;
        v["seller_notes"] = json!(["anything", 1, true]);
        assert!(violations(&obj(v)).is_empty());
    }

    #[test]
    fn missing_required_fields_are_each_listed() {
        let found = violations(&obj(json!({ "verdict": "PASS" })));
        assert_eq!(found.len(), 4);
        assert!(found.contains(&"market_price: required".to_string()));
        assert!(found.contains(&"velocity_score: required".to_string()));
    }

    #[test]
    fn numeric_string_is_a_violation() {
        let mut v = minimal();
        v["market_price"] = json!("80");
        let found = violations(&obj(v));
        assert_eq!(found, vec!["market_price: expected number or null, got string".to_string()]);
    }

    #[test]
    fn validate_attaches_raw_reply() {
        match validate(&obj(json!({})), "{}") {
            Err(AppError::Schema { violations, raw }) => {
                assert_eq!(violations.len(), REQUIRED_FIELDS.len());
                assert_eq!(raw, "{}");
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}
