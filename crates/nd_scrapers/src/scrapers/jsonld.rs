use scraper::{Html, Selector};
use serde_json::Value;

/// All JSON-LD objects on the page, with top-level arrays and `@graph`
/// containers flattened.
fn ld_objects(document: &Html) -> Vec<Value> {
    let mut objects = Vec::new();

    if let Ok(script_selector) = Selector::parse("script[type='application/ld+json']") {
        for script in document.select(&script_selector) {
            let raw = script.text().collect::<String>();
            if let Ok(json) = serde_json::from_str::<Value>(raw.trim()) {
                flatten_into(json, &mut objects);
            }
        }
    }

    objects
}

fn flatten_into(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_into(graph, out);
            }
            out.push(Value::Object(map));
        }
        _ => {}
    }
}

fn first_string(document: &Html, key: &str) -> Option<String> {
    ld_objects(document).into_iter().find_map(|obj| match obj.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(inner) => inner
            .get("url")
            .and_then(|u| u.as_str())
            .map(|u| u.trim().to_string()),
        Value::Array(items) => items.iter().find_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Object(inner) => inner.get("url").and_then(|u| u.as_str()).map(str::to_string),
            _ => None,
        }),
        _ => None,
    })
}

/// Article headline from JSON-LD metadata.
pub fn extract_headline(document: &Html) -> Option<String> {
    first_string(document, "headline")
}

/// Raw `datePublished` value from JSON-LD metadata.
pub fn extract_date_published(document: &Html) -> Option<String> {
    first_string(document, "datePublished")
}

/// Lead image URL from JSON-LD metadata.
pub fn extract_image(document: &Html) -> Option<String> {
    first_string(document, "image")
}
