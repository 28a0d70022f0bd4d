//! Comment change classification and the bounded activity log

use serde_json::Value;

use crate::models::activity::{ActivityEntry, ChangeType, FieldChange};

/// Normalize pasted text before comparing comments.
///
/// Line endings become `\n`, non-breaking spaces become spaces, zero-width
/// spaces and byte order marks are dropped, and the result is trimmed.
pub fn normalize_comment(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{00A0}', " ")
        .replace(['\u{200B}', '\u{FEFF}'], "")
        .trim()
        .to_string()
}

/// Describe a comment edit as an addition or a replacement.
///
/// An edit that keeps the old text as a prefix only logs what was appended.
pub fn classify_comment_change(old_value: &str, new_value: &str) -> FieldChange {
    let old_norm = normalize_comment(old_value);
    let new_norm = normalize_comment(new_value);

    let appended = !old_norm.is_empty()
        && new_norm.len() > old_norm.len()
        && new_norm.starts_with(&old_norm);

    if appended {
        let added = new_norm[old_norm.len()..].trim_matches('\n');
        if !added.is_empty() {
            return FieldChange::new("Comment Added", "", added).with_type(ChangeType::Addition);
        }
        return FieldChange::new("Comments", old_value, new_value)
            .with_type(ChangeType::Replacement);
    }

    if old_norm.is_empty() {
        FieldChange::new("Comment Added", "", new_value).with_type(ChangeType::Addition)
    } else {
        FieldChange::new("Comments", old_value, new_value).with_type(ChangeType::Replacement)
    }
}

/// Append an entry to a stored log and keep only the newest `limit` entries
pub fn append_entry(mut log: Vec<Value>, entry: &ActivityEntry, limit: usize) -> Vec<Value> {
    if let Ok(value) = serde_json::to_value(entry) {
        log.push(value);
    }
    if log.len() > limit {
        log.drain(..log.len() - limit);
    }
    log
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalization_handles_pasted_text() {
        assert_eq!(
            normalize_comment("\u{FEFF} Pipe\r\nleaks\u{00A0}again\u{200B} \r"),
            "Pipe\nleaks again"
        );
    }

    #[test]
    fn appended_comment_logs_only_new_text() {
        let change = classify_comment_change("Plumber booked", "Plumber booked\n\nParts ordered\n");
        assert_eq!(change.field, "Comment Added");
        assert_eq!(change.old_value, "");
        assert_eq!(change.new_value, "Parts ordered");
        assert_eq!(change.change_type, Some(ChangeType::Addition));
    }

    #[test]
    fn crlf_paste_still_counts_as_addition() {
        let change = classify_comment_change("Line one\r\nLine two", "Line one\nLine two\nLine three");
        assert_eq!(change.change_type, Some(ChangeType::Addition));
        assert_eq!(change.new_value, "Line three");
    }

    #[test]
    fn first_comment_is_an_addition_with_full_text() {
        let change = classify_comment_change("", "  Called resident ");
        assert_eq!(change.field, "Comment Added");
        assert_eq!(change.new_value, "  Called resident ");
        assert_eq!(change.change_type, Some(ChangeType::Addition));
    }

    #[test]
    fn rewritten_comment_is_a_replacement() {
        let change = classify_comment_change("Awaiting quote", "Quote approved");
        assert_eq!(change.field, "Comments");
        assert_eq!(change.old_value, "Awaiting quote");
        assert_eq!(change.new_value, "Quote approved");
        assert_eq!(change.change_type, Some(ChangeType::Replacement));
    }

    #[test]
    fn whitespace_only_extension_is_a_replacement() {
        let change = classify_comment_change("Done", "Done\n\n");
        assert_eq!(change.change_type, Some(ChangeType::Replacement));
    }

    #[test]
    fn log_keeps_newest_entries() {
        let log: Vec<Value> = (0..50).map(|i| json!({ "n": i })).collect();
        let entry = ActivityEntry {
            timestamp: "2025-01-01T00:00:00Z".into(),
            user: "team1".into(),
            action: "Updated".into(),
            changes: vec![FieldChange::new("Status", "Reported", "On Hold")],
        };

        let log = append_entry(log, &entry, 50);
        assert_eq!(log.len(), 50);
        assert_eq!(log[0]["n"], 1);
        assert_eq!(log[49]["user"], "team1");
        assert_eq!(log[49]["changes"][0]["oldValue"], "Reported");
        assert!(log[49]["changes"][0].get("changeType").is_none());
    }
}
