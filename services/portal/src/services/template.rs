//! Placeholder substitution for email templates

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::template::EmailTemplate;

/// Subject and body ready to send
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Text of a data value; empty, zero, false and null count as missing
fn present(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|n| n != 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Array(_) | Value::Object(_) => value.map(Value::to_string),
        _ => None,
    }
}

/// Fill a template.
///
/// Each declared variable `{NAME}` takes `data["NAME"]`, then
/// `data["name"]`, and otherwise renders as `[NAME]`. `{DATE}`, `{TIME}`
/// and `{UNIT_PRIMARY_NAME}` are always available.
pub fn render(template: &EmailTemplate, data: &Map<String, Value>, now: &DateTime<Tz>) -> RenderedEmail {
    let mut subject = template.subject.clone();
    let mut body = template.body.clone();

    let mut replace = |placeholder: &str, value: &str| {
        subject = subject.replace(placeholder, value);
        body = body.replace(placeholder, value);
    };

    for name in template.variable_names() {
        let value = present(data.get(name))
            .or_else(|| present(data.get(&name.to_lowercase())))
            .unwrap_or_else(|| format!("[{}]", name));
        replace(&format!("{{{}}}", name), &value);
    }

    let resident = present(data.get("unitPrimaryName")).unwrap_or_else(|| "[Resident Name]".to_string());
    replace("{DATE}", &now.format("%d/%m/%Y").to_string());
    replace("{TIME}", &now.format("%H:%M").to_string());
    replace("{UNIT_PRIMARY_NAME}", &resident);

    RenderedEmail { subject, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn template(subject: &str, body: &str, variables: &str) -> EmailTemplate {
        EmailTemplate {
            template_id: "WATER01".into(),
            category: "Water".into(),
            subject: subject.into(),
            body: body.into(),
            variables: variables.into(),
            field_alert: false,
        }
    }

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn variables_fall_back_to_lowercase_then_brackets() {
        let now = chrono_tz::Australia::Sydney
            .with_ymd_and_hms(2025, 6, 12, 14, 30, 0)
            .unwrap();
        let rendered = render(
            &template(
                "Water off {START}",
                "Dear {UNIT_PRIMARY_NAME}, water is off from {START} to {END} on {DATE} ({TIME}). {AREA}",
                "START, END, AREA",
            ),
            &data(json!({"START": "9am", "end": "1pm", "AREA": ""})),
            &now,
        );

        assert_eq!(rendered.subject, "Water off 9am");
        assert_eq!(
            rendered.body,
            "Dear [Resident Name], water is off from 9am to 1pm on 12/06/2025 (14:30). [AREA]"
        );
    }

    #[test]
    fn unit_primary_name_comes_from_data() {
        let now = chrono_tz::Australia::Sydney
            .with_ymd_and_hms(2025, 1, 2, 8, 5, 0)
            .unwrap();
        let rendered = render(
            &template("Hi {UNIT_PRIMARY_NAME}", "", ""),
            &data(json!({"unitPrimaryName": "Ann Lee"})),
            &now,
        );
        assert_eq!(rendered.subject, "Hi Ann Lee");
    }
}
