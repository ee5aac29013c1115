use serde_json::Value;
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
///
/// Scan reports have a common shape: an envelope holding a `result` object
/// whose scalar fields are context (symbol, expiration, current price) and
/// whose array fields are ranked candidate lists. Context prints as a
/// field/value table, each candidate list as its own titled table.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_report(result, map);
            } else {
                print_report(value, &serde_json::Map::new());
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_report(result: &Value, envelope: &serde_json::Map<String, Value>) {
    match result {
        Value::Object(map) => {
            // Context first: every scalar field of the result
            let mut builder = Builder::default();
            builder.push_record(["Field", "Value"]);
            let mut has_scalars = false;
            for (key, val) in map {
                if !matches!(val, Value::Array(_)) {
                    builder.push_record([key.as_str(), &format_value(val)]);
                    has_scalars = true;
                }
            }
            if has_scalars {
                println!("{}", Table::from(builder));
            }

            // Then each candidate list as its own table
            for (key, val) in map {
                if let Value::Array(arr) = val {
                    println!("\n{} ({})", key, arr.len());
                    print_array_table(arr);
                }
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", result),
    }

    // Print warnings if any
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    // Print methodology
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    // Collect all keys from first object for headers
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        map.get(h.as_str())
                            .map(format_value)
                            .unwrap_or_default()
                    })
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        // Simple array of values
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
