pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Flatten nested objects into dotted `(field, value)` rows, e.g.
/// `price.taxes.icms`. Arrays of objects are indexed: `fees[0].amount`.
pub fn flatten_fields(value: &Value) -> Vec<(String, Value)> {
    let mut rows = Vec::new();
    flatten_into(&mut rows, String::new(), value);
    rows
}

fn flatten_into(rows: &mut Vec<(String, Value)>, prefix: String, value: &Value) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, val) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(rows, path, val);
            }
        }
        Value::Array(items) if items.iter().any(Value::is_object) => {
            for (i, item) in items.iter().enumerate() {
                flatten_into(rows, format!("{prefix}[{i}]"), item);
            }
        }
        _ => rows.push((prefix, value.clone())),
    }
}

/// One-line rendering of a tagged warning object.
pub fn describe_warning(warning: &Value) -> String {
    match warning {
        Value::Object(map) => {
            let kind = map.get("kind").and_then(Value::as_str).unwrap_or("warning");
            let details: Vec<String> = map
                .iter()
                .filter(|(k, _)| k.as_str() != "kind")
                .map(|(k, v)| format!("{k}={}", scalar(v)))
                .collect();
            if details.is_empty() {
                kind.to_string()
            } else {
                format!("{kind}: {}", details.join(", "))
            }
        }
        other => scalar(other),
    }
}

/// Scalars without JSON quoting; anything else as compact JSON.
pub fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_result() {
        let value = json!({
            "price": {
                "gross_price": "378.99",
                "taxes": { "icms": "45.48" },
                "channel_fees": { "fees": [ { "label": "commission", "amount": "60.64" } ] }
            },
            "rates": [1, 2]
        });
        let rows = flatten_fields(&value);
        let keys: Vec<&str> = rows.iter().map(|(k, _)| k.as_str()).collect();
        assert!(keys.contains(&"price.gross_price"));
        assert!(keys.contains(&"price.taxes.icms"));
        assert!(keys.contains(&"price.channel_fees.fees[0].label"));
        assert!(keys.contains(&"rates"));
    }

    #[test]
    fn test_describe_warning() {
        let w = json!({ "kind": "channel_not_found", "name": "Etsy" });
        assert_eq!(describe_warning(&w), "channel_not_found: name=Etsy");
        assert_eq!(describe_warning(&json!("plain")), "plain");
    }
}
