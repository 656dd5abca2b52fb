//! CSV rendering for exported collections.

use std::collections::HashSet;

use serde_json::Value;

/// Render rows as a header line plus one line per row, joined by `\n`.
///
/// The header is every object key seen across `rows`, in order of first
/// appearance. Rows missing a column get an empty cell.
pub fn render_csv_block(rows: &[Value]) -> String {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut headers: Vec<&str> = Vec::new();
    for row in rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if seen.insert(key.as_str()) {
                    headers.push(key.as_str());
                }
            }
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| quote_if_needed(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in rows {
        let cells: Vec<String> = headers.iter().map(|h| encode_cell(row.get(*h))).collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

/// Text of one cell.
///
/// Missing and `null` are empty, nested objects and arrays are compact
/// JSON, numbers print without a trailing `.0` for integral values.
pub fn encode_cell(value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) => return String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64().map(|f| f.to_string()).unwrap_or_default()
            }
        }
        Some(nested @ (Value::Array(_) | Value::Object(_))) => {
            serde_json::to_string(nested).unwrap_or_default()
        }
    };
    quote_if_needed(&text)
}

fn quote_if_needed(text: &str) -> String {
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}
