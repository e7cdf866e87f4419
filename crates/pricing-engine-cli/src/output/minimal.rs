use serde_json::Value;

use super::scalar;

/// Fields that answer each command, in priority order.
const PRIORITY_KEYS: [&str; 7] = [
    "path",
    "registered",
    "gross_price",
    "unit_cost",
    "label",
    "total",
    "icms",
];

/// Print just the key answer value from the output.
///
/// Looks for well-known result fields in order of priority, also inside a
/// nested `price` object, then falls back to the first field.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_answer(value));
}

fn minimal_answer(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        let nested = map.get("price").and_then(Value::as_object);
        for key in PRIORITY_KEYS {
            let found = map.get(key).or_else(|| nested.and_then(|p| p.get(key)));
            if let Some(val) = found.filter(|v| !v.is_null()) {
                return scalar(val);
            }
        }

        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, scalar(val));
        }
    }

    scalar(result_obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_price_answer_is_gross_price() {
        let value = json!({
            "result": { "cost": { "unit_cost": "107.75" }, "price": { "gross_price": "378.99" } }
        });
        assert_eq!(minimal_answer(&value), "378.99");
    }

    #[test]
    fn test_classify_answer_is_label() {
        let value = json!({
            "result": { "margin_percent": "12.00", "margin_band": "low", "label": "LOW MARGIN - ATTENTION" }
        });
        assert_eq!(minimal_answer(&value), "LOW MARGIN - ATTENTION");
    }
}
