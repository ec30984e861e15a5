//! Markdown rendering for tasks, notes and JSON documents

use std::cmp::Ordering;
use std::fmt::Write;

use serde_json::{Map, Value};

use crate::identifier::Identifier;
use crate::note::Node;

/// Render a task document (or an extracted task) as a checklist
pub fn tasks_to_markdown(document: &Value) -> String {
    let mut md = String::new();
    if let Some(overview) = document.get("overview").and_then(Value::as_str) {
        md.push_str(overview);
        md.push_str("\n\n");
    }

    let Some(tasks) = document.get("tasks").and_then(Value::as_object) else {
        return md;
    };

    for (key, task) in sorted_by_task_number(tasks) {
        if let Some(description) = task.get("description").and_then(Value::as_str) {
            let _ = writeln!(md, "## [{}] {}. {}", check(task), key, description);
            if let Some(fields) = task.as_object() {
                for (sub_key, sub) in sorted_by_task_number(fields) {
                    if let Some(text) = sub.get("task").and_then(Value::as_str) {
                        let _ = writeln!(md, "- [{}] {}. {}", check(sub), sub_key, text);
                    }
                }
            }
            md.push('\n');
        } else if let Some(text) = task.get("task").and_then(Value::as_str) {
            let _ = writeln!(md, "- [{}] {}. {}", check(task), key, text);
        }
    }
    md
}

fn check(task: &Value) -> char {
    let done = match task.get("status") {
        Some(Value::Bool(b)) => *b,
        Some(Value::Null) | None => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(_) => true,
    };
    if done {
        'x'
    } else {
        ' '
    }
}

/// Order "2" before "10" and "1.2" before "1.10"
pub fn compare_task_numbers(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    _ => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn sorted_by_task_number(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| compare_task_numbers(a, b));
    entries
}

/// Render a project's note tree, one heading per node that holds notes
pub fn notes_to_markdown(project: &str, root: &Node) -> String {
    let mut md = format!("# Notes: {}\n\n", project);
    let mut current: Option<String> = None;
    let mut count = 0;

    root.walk(&Identifier::root(), &mut |at, note| {
        let heading = if at.is_root() {
            "(project)".to_string()
        } else {
            at.to_string()
        };
        if current.as_deref() != Some(heading.as_str()) {
            let _ = writeln!(md, "## {}\n", heading);
            current = Some(heading);
        }
        let _ = write!(
            md,
            "- {} _(id: {}, created {}",
            note.content.replace('\n', " "),
            note.id,
            note.created_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(updated) = note.updated_at {
            let _ = write!(md, ", updated {}", updated.format("%Y-%m-%d %H:%M"));
        }
        md.push_str(")_\n");
        count += 1;
    });

    if count == 0 {
        md.push_str("_No notes._\n");
    }
    md
}

/// Render a JSON document; OpenAPI documents get an API reference layout
pub fn json_to_markdown(document: &Value) -> String {
    if document.get("openapi").is_some() || document.get("swagger").is_some() {
        openapi_to_markdown(document)
    } else {
        let mut md = String::new();
        render_value(&mut md, document, 0);
        md
    }
}

/// API reference for an OpenAPI document
pub fn openapi_to_markdown(api: &Value) -> String {
    let mut md = String::new();
    let info = api.get("info");
    let text = |v: Option<&Value>, key: &str, default: &str| -> String {
        v.and_then(|v| v.get(key))
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };

    let _ = writeln!(md, "# {}", text(info, "title", "API Documentation"));
    let _ = writeln!(md, "**Version:** {}\n", text(info, "version", "N/A"));
    let description = text(info, "description", "");
    if !description.is_empty() {
        let _ = writeln!(md, "{}\n", description);
    }

    if let Some(servers) = api.get("servers").and_then(Value::as_array) {
        if !servers.is_empty() {
            md.push_str("## Servers\n");
            for server in servers {
                let _ = writeln!(md, "- URL: {}", text(Some(server), "url", "N/A"));
            }
            md.push('\n');
        }
    }

    if let Some(paths) = api.get("paths").and_then(Value::as_object) {
        for (path, operations) in paths {
            let _ = writeln!(md, "## Path: `{}`\n", path);
            let Some(operations) = operations.as_object() else {
                continue;
            };
            for (method, details) in operations {
                let _ = writeln!(md, "### {}", method.to_uppercase());
                let _ = writeln!(
                    md,
                    "**Summary:** {}\n",
                    text(Some(details), "summary", "N/A")
                );
                let _ = writeln!(
                    md,
                    "**Description:** {}\n",
                    text(Some(details), "description", "N/A")
                );

                if let Some(params) = details.get("parameters").and_then(Value::as_array) {
                    md.push_str("#### Parameters\n");
                    for param in params {
                        let _ = writeln!(
                            md,
                            "- {} ({}): {}",
                            text(Some(param), "name", "N/A"),
                            text(Some(param), "in", "N/A"),
                            text(Some(param), "description", "N/A")
                        );
                    }
                    md.push('\n');
                }

                if let Some(responses) = details.get("responses").and_then(Value::as_object) {
                    md.push_str("#### Responses\n");
                    for (status, response) in responses {
                        let _ = writeln!(
                            md,
                            "- Status {}: {}",
                            status,
                            text(Some(response), "description", "N/A")
                        );
                    }
                    md.push('\n');
                }
            }
        }
    }

    let schemas = api
        .get("components")
        .and_then(|c| c.get("schemas"))
        .and_then(Value::as_object);
    if let Some(schemas) = schemas.filter(|s| !s.is_empty()) {
        md.push_str("## Components (Schemas)\n\n");
        for (name, schema) in schemas {
            let _ = writeln!(md, "### {}", name);
            if let Some(props) = schema.get("properties").and_then(Value::as_object) {
                for (prop, details) in props {
                    let _ = writeln!(md, "- **{}**: {}", prop, text(Some(details), "type", "N/A"));
                    if let Some(desc) = details.get("description").and_then(Value::as_str) {
                        let _ = writeln!(md, "  - Description: {}", desc);
                    }
                }
            }
            md.push('\n');
        }
    }

    md
}

fn render_value(md: &mut String, value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if is_scalar(child) {
                    let _ = writeln!(md, "{}- **{}**: {}", indent, key, scalar(child));
                } else {
                    let _ = writeln!(md, "{}- **{}**", indent, key);
                    render_value(md, child, depth + 1);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                if is_scalar(item) {
                    let _ = writeln!(md, "{}- {}", indent, scalar(item));
                } else {
                    let _ = writeln!(md, "{}-", indent);
                    render_value(md, item, depth + 1);
                }
            }
        }
        other => {
            let _ = writeln!(md, "{}{}", indent, scalar(other));
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
