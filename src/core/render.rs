use crate::domain::model::{Recipient, RenderedMessage};
use regex::Regex;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([0-9A-Za-z_]+)\}").expect("placeholder pattern compiles"));

/// Substitutes `{field}` placeholders with the recipient's values.
///
/// Unknown fields are left as written. `{{field}}` is an escape and renders
/// as the literal `{field}`.
pub fn render(template: &str, recipient: &Recipient) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        rendered.push_str(&template[last..whole.start()]);

        let escaped =
            template[..whole.start()].ends_with('{') && template[whole.end()..].starts_with('}');
        if escaped {
            rendered.push_str(name.as_str());
        } else {
            match recipient.field(name.as_str()) {
                Some(value) => rendered.push_str(&value_text(value)),
                None => rendered.push_str(whole.as_str()),
            }
        }
        last = whole.end();
    }

    rendered.push_str(&template[last..]);
    rendered
}

pub fn render_message(template: &str, recipient: &Recipient) -> RenderedMessage {
    RenderedMessage {
        to: recipient.phone().clone(),
        body: render(template, recipient),
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
