//! Email delivery settings from the EmailConfigRange named range
//!
//! The range holds a header row followed by `setting | value` rows. Values
//! read back as booleans, numbers or text and are laid over the defaults.

use common::{Cell, Workbook};
use serde_json::{Map, Number, Value, json};
use tracing::{debug, info, warn};

use crate::error::{PortalError, PortalResult};

pub const EMAIL_CONFIG_RANGE: &str = "EmailConfigRange";

/// Who is told when a problem is completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionRule {
    /// The unit primary, or the zone reps when the unit has no primary email
    UnitPrimaryFirst,
    ZoneRepAlways,
    Both,
}

impl CompletionRule {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unit_primary_first" => Some(CompletionRule::UnitPrimaryFirst),
            "zone_rep_always" => Some(CompletionRule::ZoneRepAlways),
            "both" => Some(CompletionRule::Both),
            _ => None,
        }
    }
}

/// Typed view over the merged settings
#[derive(Debug, Clone, PartialEq)]
pub struct EmailConfig {
    values: Map<String, Value>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        let defaults = json!({
            "completionNotificationRule": "unit_primary_first",
            "multiZoneRepEnabled": true,
            "logEmailDelivery": true,
            "massNotificationEnabled": true,
            "systemMaintenanceMode": false,
        });
        match defaults {
            Value::Object(values) => Self { values },
            _ => Self { values: Map::new() },
        }
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        _ => false,
    }
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Setting value as stored: flags and numeric text are converted
fn cell_value(cell: &Cell) -> Value {
    match cell {
        Cell::Bool(b) => Value::Bool(*b),
        Cell::Number(n) => number_value(*n),
        Cell::Empty => Value::String(String::new()),
        Cell::Text(text) => match text.as_str() {
            "TRUE" => Value::Bool(true),
            "FALSE" => Value::Bool(false),
            raw => match raw.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => number_value(n),
                _ => Value::String(raw.to_string()),
            },
        },
    }
}

fn value_cell(value: &Value) -> Cell {
    match value {
        Value::Bool(b) => Cell::Bool(*b),
        Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
        Value::String(s) => Cell::from(s),
        Value::Null => Cell::Empty,
        other => Cell::from(other.to_string()),
    }
}

impl EmailConfig {
    /// Defaults overlaid with the given settings
    pub fn merged(overrides: Map<String, Value>) -> Self {
        let mut config = Self::default();
        config.values.extend(overrides);
        config
    }

    pub fn completion_rule(&self) -> Option<CompletionRule> {
        match self.values.get("completionNotificationRule") {
            Some(Value::String(rule)) => CompletionRule::parse(rule),
            _ => Some(CompletionRule::UnitPrimaryFirst),
        }
    }

    pub fn multi_zone_rep_enabled(&self) -> bool {
        truthy(self.values.get("multiZoneRepEnabled"))
    }

    pub fn log_email_delivery(&self) -> bool {
        truthy(self.values.get("logEmailDelivery"))
    }

    pub fn mass_notification_enabled(&self) -> bool {
        truthy(self.values.get("massNotificationEnabled"))
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

/// Email configuration repository
#[derive(Clone)]
pub struct EmailConfigRepository {
    workbook: Workbook,
}

impl EmailConfigRepository {
    pub fn new(workbook: Workbook) -> Self {
        Self { workbook }
    }

    /// Current settings; defaults alone when the range is missing or
    /// unreadable
    pub async fn load(&self) -> EmailConfig {
        match self.workbook.named_range(EMAIL_CONFIG_RANGE).await {
            Ok(Some(table)) => {
                let overrides = table
                    .rows()
                    .iter()
                    .skip(1)
                    .filter_map(|row| {
                        let setting = row.first()?.text();
                        if setting.is_empty() {
                            return None;
                        }
                        let value = row.get(1).map(cell_value).unwrap_or(Value::String(String::new()));
                        Some((setting, value))
                    })
                    .collect();
                let config = EmailConfig::merged(overrides);
                debug!("Email configuration loaded: {}", config.to_json());
                config
            }
            Ok(None) => {
                debug!("{} not found, using defaults", EMAIL_CONFIG_RANGE);
                EmailConfig::default()
            }
            Err(e) => {
                warn!("Failed to load email configuration, using defaults: {}", e);
                EmailConfig::default()
            }
        }
    }

    /// Write new values for settings already present in the range;
    /// unknown keys are ignored
    pub async fn update(&self, changes: &Map<String, Value>) -> PortalResult<usize> {
        let mut table = self
            .workbook
            .named_range(EMAIL_CONFIG_RANGE)
            .await?
            .ok_or_else(|| PortalError::not_found(format!("{} not found", EMAIL_CONFIG_RANGE)))?;

        let mut updated = 0;
        for row in 1..table.len() {
            let setting = table.get(row, 0).text();
            if let Some(value) = changes.get(&setting) {
                table.set(row, 1, value_cell(value));
                updated += 1;
            }
        }
        self.workbook.save(&table).await?;

        info!("Email configuration updated ({} settings)", updated);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_stored() {
        let config = EmailConfig::default();
        assert_eq!(config.completion_rule(), Some(CompletionRule::UnitPrimaryFirst));
        assert!(config.multi_zone_rep_enabled());
        assert!(config.log_email_delivery());
        assert_eq!(config.to_json()["systemMaintenanceMode"], false);
    }

    #[test]
    fn stored_text_converts_to_flags_and_numbers() {
        assert_eq!(cell_value(&Cell::from("FALSE")), json!(false));
        assert_eq!(cell_value(&Cell::from("42")), json!(42));
        assert_eq!(cell_value(&Cell::from("both")), json!("both"));
        assert_eq!(cell_value(&Cell::from("true")), json!("true"));
    }

    #[test]
    fn overrides_replace_defaults() {
        let mut overrides = Map::new();
        overrides.insert("logEmailDelivery".into(), json!(false));
        overrides.insert("completionNotificationRule".into(), json!("zone_rep_always"));
        let config = EmailConfig::merged(overrides);

        assert!(!config.log_email_delivery());
        assert_eq!(config.completion_rule(), Some(CompletionRule::ZoneRepAlways));
        assert!(config.mass_notification_enabled());
    }

    #[test]
    fn unknown_rule_selects_nobody() {
        let mut overrides = Map::new();
        overrides.insert("completionNotificationRule".into(), json!("carrier_pigeon"));
        assert_eq!(EmailConfig::merged(overrides).completion_rule(), None);
    }
}
