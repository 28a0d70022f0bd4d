//! HTTP-level tests for the portal service
//!
//! Each test builds the router over an in-memory workbook loaded from
//! `fixtures/workbook.json` and an outbox mailer that records every email.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{Workbook, mail::OutboxMailer, workbook::memory::MemoryStore};
use portal::{AppState, Settings, create_router};
use serde_json::{Value, json};
use tower::ServiceExt;

const FIXTURE: &str = include_str!("fixtures/workbook.json");

struct Harness {
    app: Router,
    outbox: OutboxMailer,
}

fn harness() -> Harness {
    let store = MemoryStore::from_json(FIXTURE).expect("fixture workbook parses");
    let workbook = Workbook::new(Arc::new(store));
    let outbox = OutboxMailer::new();

    let mut settings = Settings::default();
    // One seeded account keeps password hashing cheap
    settings.auth.seed_accounts.truncate(1);

    let state = AppState::new(settings, workbook, Arc::new(outbox.clone()));
    Harness {
        app: create_router(state),
        outbox,
    }
}

fn exec_uri(endpoint: &str, action: &str, params: &[(&str, &str)]) -> String {
    let mut uri = format!("/{}/exec?action={}", endpoint, action);
    for (key, value) in params {
        uri.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
    }
    uri
}

async fn get_raw(app: &Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn call(app: &Router, endpoint: &str, action: &str, params: &[(&str, &str)]) -> Value {
    let (status, _, body) = get_raw(app, &exec_uri(endpoint, action, params)).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_str(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let h = harness();
    let (status, _, body) = get_raw(&h.app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "portal");
    assert_eq!(body["store"], true);
}

#[tokio::test]
async fn test_unknown_action_and_endpoint() {
    let h = harness();

    let body = call(&h.app, "portal", "frobnicate", &[]).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Unknown action: frobnicate");

    let body = call(&h.app, "billing", "getFaultLogData", &[]).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Unknown endpoint: billing");

    let (_, _, raw) = get_raw(&h.app, "/portal/exec").await;
    let body: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(body["error"], "Action is required");
}

#[tokio::test]
async fn test_jsonp_wraps_the_envelope() {
    let h = harness();

    let uri = exec_uri("explorer", "getResidents", &[("callback", "handleResidents")]);
    let (status, content_type, body) = get_raw(&h.app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("application/javascript"));
    assert!(body.starts_with("handleResidents("));
    assert!(body.ends_with(')'));

    let inner: Value =
        serde_json::from_str(&body["handleResidents(".len()..body.len() - 1]).unwrap();
    assert_eq!(inner["success"], true);
}

#[tokio::test]
async fn test_invalid_callback_is_refused() {
    let h = harness();

    let uri = exec_uri("explorer", "getResidents", &[("callback", "alert(1)")]);
    let (_, content_type, body) = get_raw(&h.app, &uri).await;
    assert!(content_type.unwrap().starts_with("application/json"));

    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid callback name");
}

#[tokio::test]
async fn test_update_logs_activity() {
    let h = harness();

    let body = call(
        &h.app,
        "portal",
        "updateProblemWithActivity",
        &[
            ("internalId", "20250612-143015"),
            ("problemPriority", "High"),
            ("comments", "Plumber booked"),
            ("user", "team1"),
        ],
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Problem updated successfully");
    assert_eq!(body["activityLogged"], true);
    assert_eq!(body["changesCount"], 2);

    let body = call(
        &h.app,
        "portal",
        "getActivityLog",
        &[("internalId", "20250612-143015")],
    )
    .await;
    let log = body["activityLog"].as_array().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0]["user"], "team1");
    assert_eq!(log[0]["action"], "Updated");
    assert_eq!(log[0]["changes"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_update_unknown_problem() {
    let h = harness();

    let body = call(&h.app, "portal", "updateProblem", &[("internalId", "19990101-000000")]).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Problem not found");

    let body = call(&h.app, "portal", "updateProblem", &[]).await;
    assert_eq!(body["error"], "Internal ID required");
}

#[tokio::test]
async fn test_completion_emails_the_unit_primary() {
    let h = harness();

    let body = call(
        &h.app,
        "portal",
        "updateProblem",
        &[
            ("internalId", "20250612-143015"),
            ("problemStatus", "Completed"),
            ("user", "team1"),
        ],
    )
    .await;
    assert_eq!(body["success"], true);

    let updates: Vec<String> = serde_json::from_value(body["updates"].clone()).unwrap();
    assert!(updates.iter().any(|u| u.starts_with("Auto-completion date: ")));
    assert!(updates.iter().any(|u| u == "📧 Completion notification sent"));

    let sent = h.outbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["ann@example.com".to_string()]);
}

#[tokio::test]
async fn test_completion_mail_failure_does_not_fail_the_update() {
    let h = harness();
    h.outbox.set_failure(Some("smtp down".to_string()));

    let body = call(
        &h.app,
        "portal",
        "updateProblem",
        &[
            ("internalId", "20250612-143015"),
            ("problemStatus", "Completed"),
        ],
    )
    .await;
    assert_eq!(body["success"], true);

    let updates: Vec<String> = serde_json::from_value(body["updates"].clone()).unwrap();
    assert!(updates.iter().any(|u| u.starts_with("⚠️ Email notification failed")));
    assert!(updates.iter().any(|u| u == "Status: Completed"));
    assert!(h.outbox.sent().is_empty());
}

#[tokio::test]
async fn test_dropdown_items_stay_sorted() {
    let h = harness();

    let body = call(
        &h.app,
        "portal",
        "addDropdownItem",
        &[("type", "Category"), ("value", "Electrical")],
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Added \"Electrical\" to Category and sorted");

    let body = call(&h.app, "portal", "getDropdownOptions", &[]).await;
    assert_eq!(
        body["data"]["categories"],
        json!(["Doors", "Electrical", "Plumbing"])
    );

    let body = call(
        &h.app,
        "portal",
        "addDropdownItem",
        &[("type", "Category"), ("value", "Plumbing")],
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "\"Plumbing\" already exists in Category");

    let body = call(
        &h.app,
        "portal",
        "addDropdownItem",
        &[("type", "Colour"), ("value", "Red")],
    )
    .await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_submission_delete_matches_trimmed_values() {
    let h = harness();

    let body = call(
        &h.app,
        "submission",
        "deleteDropdownItem",
        &[("type", "Reported By"), ("value", "Cy Dunn")],
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Successfully deleted \"Cy Dunn\" from Reported By");

    let body = call(&h.app, "submission", "getDropdownOptions", &[]).await;
    let reporters: Vec<String> = serde_json::from_value(body["reportedBy"].clone()).unwrap();
    assert!(!reporters.iter().any(|r| r.trim() == "Cy Dunn"));
}

#[tokio::test]
async fn test_submit_fault_notifies_residents_and_team() {
    let h = harness();

    let body = call(
        &h.app,
        "submission",
        "submitFault",
        &[
            ("unitNumber", "Unit 30"),
            ("reportedBy", "Bo Chan"),
            ("problemDescription", "Garage light out"),
        ],
    )
    .await;
    assert_eq!(body["success"], true);
    let friendly = body["friendlyPID"].as_str().unwrap();
    assert!(friendly.starts_with("PID "));

    let sent = h.outbox.sent();
    assert!(sent.iter().any(|e| e.to.contains(&"sam@example.com".to_string())));

    let body = call(&h.app, "explorer", "getFaultLogData", &[]).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let body = call(
        &h.app,
        "submission",
        "submitFault",
        &[("unitNumber", "Unit 30"), ("reportedBy", "Bo Chan")],
    )
    .await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_template_ids_are_unique() {
    let h = harness();

    let duplicate = json!({
        "templateId": "WATER01",
        "category": "Water",
        "subject": "Again",
        "body": "Again",
    })
    .to_string();
    let body = call(
        &h.app,
        "email",
        "createEmailTemplate",
        &[("templateData", &duplicate)],
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Template ID \"WATER01\" already exists");

    let fresh = json!({
        "templateId": "GAS01",
        "category": "Gas",
        "subject": "Gas off {START}",
        "body": "Gas is off from {START}",
        "variables": "START",
    })
    .to_string();
    let body = call(&h.app, "email", "createEmailTemplate", &[("templateData", &fresh)]).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Template \"GAS01\" created successfully");

    let incomplete = json!({ "templateId": "X" }).to_string();
    let body = call(
        &h.app,
        "email",
        "createEmailTemplate",
        &[("templateData", &incomplete)],
    )
    .await;
    assert_eq!(
        body["error"],
        "Missing required fields: templateId, category, subject, body"
    );
}

#[tokio::test]
async fn test_login_locks_after_repeated_failures() {
    let h = harness();

    let body = call(
        &h.app,
        "portal",
        "authenticateUser",
        &[("username", "director"), ("password", "maint2025")],
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["username"], "director");
    assert!(body["user"].get("passwordHash").is_none());

    for _ in 0..5 {
        let body = call(
            &h.app,
            "portal",
            "authenticateUser",
            &[("username", "director"), ("password", "wrong")],
        )
        .await;
        assert_eq!(body["success"], false);
    }

    let body = call(
        &h.app,
        "portal",
        "authenticateUser",
        &[("username", "director"), ("password", "maint2025")],
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "Account locked. Contact the director to reset the password"
    );
}

#[tokio::test]
async fn test_user_rules() {
    let h = harness();

    let body = call(
        &h.app,
        "portal",
        "toggleUserStatus",
        &[("username", "director"), ("currentStatus", "true")],
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Cannot disable director account");

    let body = call(&h.app, "portal", "getUserList", &[]).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_add_resident_placement_and_sync() {
    let h = harness();

    let body = call(
        &h.app,
        "management",
        "addResident",
        &[
            ("unitNumber", "Unit 7"),
            ("residentName", "Eve Fox"),
            ("email", "eve@example.com"),
            ("zone", "Zone 1"),
            ("stage", "Stage 1"),
        ],
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["placement"], "stage-grouped");
    assert_eq!(body["ddmSynced"], true);
    assert_eq!(body["zoneRepsSynced"], true);

    let body = call(&h.app, "management", "getUnitListData", &[]).await;
    let residents = body["residents"].as_array().unwrap();
    assert_eq!(residents[1]["unitNumber"], "Unit 7");
    assert_eq!(residents[1]["rowIndex"], 3);

    let body = call(&h.app, "submission", "getDropdownOptions", &[]).await;
    let reporters: Vec<String> = serde_json::from_value(body["reportedBy"].clone()).unwrap();
    assert!(reporters.contains(&"Eve Fox".to_string()));

    let body = call(
        &h.app,
        "management",
        "addResident",
        &[
            ("unitNumber", "Unit 9"),
            ("residentName", "Gus Hall"),
            ("stage", "Stage 2"),
        ],
    )
    .await;
    assert_eq!(body["placement"], "appended");

    let body = call(
        &h.app,
        "management",
        "addResident",
        &[("unitNumber", "Unit 11"), ("residentName", "Eve Fox")],
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Resident Eve Fox already exists");
}

#[tokio::test]
async fn test_update_resident_row_bounds() {
    let h = harness();

    let body = call(
        &h.app,
        "management",
        "updateResident",
        &[("rowIndex", "1"), ("residentName", "Nobody")],
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid row index");

    let body = call(
        &h.app,
        "management",
        "updateResident",
        &[("rowIndex", "99"), ("residentName", "Nobody")],
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Row 99 does not exist. Sheet has 5 rows.");
}

#[tokio::test]
async fn test_zone_reps_come_from_role_tags() {
    let h = harness();

    let body = call(&h.app, "management", "getZoneReps", &[]).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["zoneReps"]["1"][0]["name"], "Ann Lee");
    assert_eq!(body["zoneReps"]["2"][0]["name"], "Bo Chan");
}

#[tokio::test]
async fn test_slot_lists() {
    let h = harness();

    let body = call(&h.app, "management", "getCategories", &[]).await;
    assert_eq!(
        body["categories"],
        json!([{ "id": 1, "name": "Electrical" }, { "id": 2, "name": "Plumbing" }])
    );

    for name in ["Gardens", "Roofing"] {
        let body = call(&h.app, "management", "addCategory", &[("category", name)]).await;
        assert_eq!(body["success"], true, "adding {}", name);
    }

    let body = call(&h.app, "management", "addCategory", &[("category", "Solar")]).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No space available in categories range");

    let body = call(&h.app, "management", "getRoles", &[]).await;
    assert_eq!(
        body["roles"],
        json!([{ "id": 1, "name": "Resident" }, { "id": 2, "name": "Director" }])
    );
}

#[tokio::test]
async fn test_explorer_residents_and_stats() {
    let h = harness();

    let body = call(&h.app, "explorer", "getResidents", &[]).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 4);
    let residents = body["residents"].as_array().unwrap();
    assert!(residents.iter().any(|r| r["name"] == "Ann Lee"));

    let body = call(&h.app, "explorer", "getExplorerStats", &[]).await;
    assert_eq!(body["success"], true);
    assert!(body["data"].is_object());

    let body = call(&h.app, "explorer", "getLegacyLogData", &[]).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

async fn set_email_config(app: &Router, config: Value) {
    let body = call(app, "email", "updateEmailConfig", &[("config", &config.to_string())]).await;
    assert_eq!(body["success"], true, "config update {}", config);
}

async fn complete(app: &Router, problem: &str) -> Value {
    call(app, "email", "sendCompletionNotification", &[("problemData", problem)]).await
}

fn sent_addresses(body: &Value) -> Vec<String> {
    body["recipients"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["email"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_portal_dropdown_edits_are_limited_to_portal_types() {
    let h = harness();

    let body = call(
        &h.app,
        "portal",
        "updateDropdownItem",
        &[("type", "Unit Number"), ("oldValue", "Unit 3"), ("newValue", "Unit 99")],
    )
    .await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid type. Must be one of: "));

    let body = call(
        &h.app,
        "portal",
        "deleteDropdownItem",
        &[("type", "Reported By"), ("value", "Ann Lee")],
    )
    .await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid type. Must be one of: "));

    let body = call(&h.app, "submission", "getDropdownOptions", &[]).await;
    assert_eq!(body["unitNumbers"][0], "Unit 3");
    let reporters: Vec<String> = serde_json::from_value(body["reportedBy"].clone()).unwrap();
    assert!(reporters.contains(&"Ann Lee".to_string()));
}

#[tokio::test]
async fn test_portal_dropdown_rename_and_delete() {
    let h = harness();

    let body = call(
        &h.app,
        "portal",
        "updateDropdownItem",
        &[("type", "Category"), ("oldValue", "Doors"), ("newValue", "Gates")],
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Updated \"Doors\" to \"Gates\" in Category");

    let body = call(&h.app, "portal", "getDropdownOptions", &[]).await;
    assert_eq!(body["data"]["categories"], json!(["Gates", "Plumbing"]));

    let body = call(
        &h.app,
        "portal",
        "updateDropdownItem",
        &[("type", "Category"), ("oldValue", "Gates"), ("newValue", "Plumbing")],
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "\"Plumbing\" already exists in Category");

    let body = call(
        &h.app,
        "portal",
        "updateDropdownItem",
        &[("type", "Category"), ("oldValue", "Windows"), ("newValue", "Glass")],
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "\"Windows\" not found in Category");

    let body = call(
        &h.app,
        "portal",
        "updateDropdownItem",
        &[("type", "Category"), ("oldValue", "Gates")],
    )
    .await;
    assert_eq!(body["error"], "Type, oldValue, and newValue are required");

    let body = call(
        &h.app,
        "portal",
        "deleteDropdownItem",
        &[("type", "Category"), ("value", "Plumbing")],
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Deleted \"Plumbing\" from Category");

    let body = call(
        &h.app,
        "portal",
        "deleteDropdownItem",
        &[("type", "Category"), ("value", "Plumbing")],
    )
    .await;
    assert_eq!(body["error"], "\"Plumbing\" not found in Category");
}

#[tokio::test]
async fn test_completion_with_both_rule_mails_each_address_once() {
    let h = harness();
    set_email_config(&h.app, json!({ "completionNotificationRule": "both" })).await;

    let body = call(
        &h.app,
        "portal",
        "updateProblem",
        &[
            ("internalId", "20250612-143015"),
            ("problemStatus", "Completed"),
        ],
    )
    .await;
    assert_eq!(body["success"], true);

    // Ann is both the unit primary and the Zone 1 rep
    let sent = h.outbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["ann@example.com".to_string()]);
}

#[tokio::test]
async fn test_completion_rules_choose_recipients() {
    let h = harness();

    let body = call(
        &h.app,
        "portal",
        "addNamedRangeRow",
        &[
            ("rangeName", "ZoneRepEmailList"),
            ("zone", "Zone 1"),
            ("name", "Kim Ng"),
            ("email", "kim@example.com"),
        ],
    )
    .await;
    assert_eq!(body["success"], true);

    let problem = json!({
        "internalId": "20250612-143015",
        "unitNumber": 12,
        "zone": "Zone 1",
        "unitPrimaryName": "Ann Lee",
        "unitPrimaryEmail": "ann@example.com",
    })
    .to_string();

    let body = complete(&h.app, &problem).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["method"], "direct_email");
    assert_eq!(sent_addresses(&body), vec!["ann@example.com"]);
    assert_eq!(body["recipients"][0]["type"], "Unit Primary");

    set_email_config(&h.app, json!({ "completionNotificationRule": "both" })).await;
    let body = complete(&h.app, &problem).await;
    assert_eq!(body["emailsSent"], 2);
    assert_eq!(sent_addresses(&body), vec!["ann@example.com", "kim@example.com"]);

    set_email_config(&h.app, json!({ "completionNotificationRule": "zone_rep_always" })).await;
    let body = complete(&h.app, &problem).await;
    assert_eq!(sent_addresses(&body), vec!["ann@example.com", "kim@example.com"]);
    assert_eq!(body["recipients"][0]["type"], "Zone Representative");
    assert_eq!(body["recipients"][1]["name"], "Kim Ng");

    set_email_config(&h.app, json!({ "multiZoneRepEnabled": false })).await;
    let body = complete(&h.app, &problem).await;
    assert_eq!(sent_addresses(&body), vec!["ann@example.com"]);

    // one message per recipient
    assert_eq!(h.outbox.sent().len(), 1 + 2 + 2 + 1);
}

#[tokio::test]
async fn test_completion_falls_back_to_zone_reps() {
    let h = harness();

    let no_primary = json!({
        "internalId": "20250610-090000",
        "unitNumber": "Unit 30",
        "zone": "Zone 2",
    })
    .to_string();
    let body = call(
        &h.app,
        "email",
        "sendCompletionNotification",
        &[("problemData", &no_primary)],
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(sent_addresses(&body), vec!["bo@example.com"]);
    assert_eq!(body["recipients"][0]["type"], "Zone Representative");

    let nobody = json!({ "internalId": "20250610-090000", "zone": "Zone 3" }).to_string();
    let body = call(
        &h.app,
        "email",
        "sendCompletionNotification",
        &[("problemData", &nobody)],
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "No valid recipients found for completion notification"
    );
}

#[tokio::test]
async fn test_mass_notification_filters() {
    let h = harness();
    let data = json!({ "START": "9am", "END": "1pm" }).to_string();

    let body = call(
        &h.app,
        "email",
        "sendMassNotification",
        &[("templateId", "WATER01"), ("customData", &data)],
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["recipientCount"], 4);
    assert_eq!(body["emailCount"], 4);
    assert_eq!(body["unitCount"], 4);
    assert_eq!(body["template"]["subject"], "Water off 9am");

    let sent = h.outbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to.len(), 4);

    let body = call(
        &h.app,
        "email",
        "sendMassNotification",
        &[("templateId", "WATER01"), ("customData", &data), ("recipientFilter", "zone_1")],
    )
    .await;
    assert_eq!(body["recipientCount"], 2);
    assert_eq!(
        sent_addresses(&body),
        vec!["cy@example.com", "ann@example.com"]
    );

    let body = call(
        &h.app,
        "email",
        "sendMassNotification",
        &[("templateId", "WATER01"), ("recipientFilter", "zone_9")],
    )
    .await;
    assert_eq!(body["recipientCount"], 4);

    let body = call(
        &h.app,
        "email",
        "sendMassNotification",
        &[("templateId", "WATER01"), ("recipientFilter", "zone_3")],
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No recipients found for mass notification");

    let body = call(&h.app, "email", "sendMassNotification", &[("templateId", "NOPE01")]).await;
    assert_eq!(body["error"], "Template NOPE01 not found");

    set_email_config(&h.app, json!({ "massNotificationEnabled": false })).await;
    let body = call(&h.app, "email", "sendMassNotification", &[("templateId", "WATER01")]).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Mass notifications are disabled");
    assert_eq!(h.outbox.sent().len(), 3);
}

#[tokio::test]
async fn test_email_stats_and_quota_count_todays_deliveries() {
    let h = harness();

    let body = call(&h.app, "email", "checkEmailQuota", &[]).await;
    assert_eq!(body["used"], 0);
    assert_eq!(body["remaining"], 300);
    assert_eq!(body["quota"], 300);

    let body = call(&h.app, "email", "sendMassNotification", &[("templateId", "WATER01")]).await;
    assert_eq!(body["success"], true);
    let body = call(
        &h.app,
        "email",
        "sendMassNotification",
        &[("templateId", "WATER01"), ("recipientFilter", "zone_3")],
    )
    .await;
    assert_eq!(body["success"], false);

    let body = call(&h.app, "email", "checkEmailQuota", &[]).await;
    assert_eq!(body["used"], 4);
    assert_eq!(body["remaining"], 296);

    let body = call(&h.app, "email", "getEmailStats", &[]).await;
    let stats = &body["stats"];
    assert_eq!(stats["todayEmailCount"], 4);
    assert_eq!(stats["maxEmailsPerDay"], 300);
    assert_eq!(stats["emailsRemaining"], 296);
    assert_eq!(stats["weekTotalCount"], 4);
    assert_eq!(stats["systemStatus"], "Active");

    let recent = stats["recentActivity"].as_array().unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0]["status"], "Failed");
    assert_eq!(recent[1]["emailType"], "MassNotification");
    assert_eq!(recent[1]["recipients"], 4);
    assert_eq!(recent[2]["subject"], "Old notice");
}

#[tokio::test]
async fn test_named_range_rows() {
    let h = harness();
    let range = ("rangeName", "MtceTeamEmailList");

    let body = call(&h.app, "portal", "getNamedRangeData", &[range]).await;
    assert_eq!(body["totalRows"], 1);
    assert_eq!(body["rangeName"], "MtceTeamEmailList");
    assert_eq!(
        body["data"][0],
        json!({ "rowIndex": 0, "name": "Sam Brown", "email": "sam@example.com" })
    );

    let body = call(
        &h.app,
        "portal",
        "addNamedRangeRow",
        &[range, ("name", "Lee Park"), ("email", "lee@example")],
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["newRowData"], json!(["Lee Park", "lee@example"]));

    let body = call(
        &h.app,
        "portal",
        "updateNamedRangeRow",
        &[range, ("row", "1"), ("name", "Lee Parker"), ("email", "lee@example.com")],
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["updatedData"], json!(["Lee Parker", "lee@example.com"]));

    let body = call(&h.app, "portal", "deleteNamedRangeRow", &[range, ("row", "0")]).await;
    assert_eq!(body["success"], true);

    let body = call(&h.app, "portal", "getNamedRangeData", &[range]).await;
    assert_eq!(body["totalRows"], 1);
    assert_eq!(body["data"][0]["name"], "Lee Parker");
    assert_eq!(body["data"][0]["email"], "lee@example.com");

    for action in ["updateNamedRangeRow", "deleteNamedRangeRow"] {
        let body = call(&h.app, "portal", action, &[range, ("row", "5"), ("name", "X")]).await;
        assert_eq!(body["success"], false, "{} past the end", action);
    }
    let body = call(&h.app, "portal", "deleteNamedRangeRow", &[range, ("row", "-1")]).await;
    assert_eq!(body["error"], "Invalid row");

    let body = call(
        &h.app,
        "portal",
        "getNamedRangeData",
        &[("rangeName", "ZoneRepEmailList")],
    )
    .await;
    assert_eq!(
        body["data"][2],
        json!({ "rowIndex": 2, "zone": "Zone 2", "name": "Bo Chan", "email": "bo@example.com" })
    );

    let body = call(&h.app, "portal", "getNamedRangeData", &[]).await;
    assert_eq!(body["error"], "Range name is required");
}

#[tokio::test]
async fn test_unit_handover_replaces_the_resident() {
    let h = harness();

    let incoming = json!({
        "name": "Hal Ito",
        "email": "hal@example.com",
        "phone": "0400 555 555",
    })
    .to_string();
    let body = call(
        &h.app,
        "management",
        "processUnitHandover",
        &[("unitNumber", "Unit 30"), ("newResident", &incoming)],
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Successfully completed handover for unit Unit 30");
    assert_eq!(body["ddmSynced"], true);
    assert_eq!(body["zoneRepsSynced"], true);

    let body = call(&h.app, "management", "getUnitListData", &[]).await;
    let unit = body["residents"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["unitNumber"] == "Unit 30")
        .cloned()
        .unwrap();
    assert_eq!(unit["residentName"], "Hal Ito");
    assert_eq!(unit["unitPrimaryEmail"], "hal@example.com");
    assert_eq!(unit["stage"], "Stage 1");
    assert_eq!(unit["roleTags"], "Resident");

    let body = call(&h.app, "submission", "getDropdownOptions", &[]).await;
    let reporters: Vec<String> = serde_json::from_value(body["reportedBy"].clone()).unwrap();
    assert!(reporters.contains(&"Hal Ito".to_string()));
    assert!(!reporters.contains(&"Bo Chan".to_string()));

    let body = call(&h.app, "management", "getZoneReps", &[]).await;
    assert_eq!(body["zoneReps"]["2"], json!([]));

    let body = call(
        &h.app,
        "management",
        "processUnitHandover",
        &[("unitNumber", "Unit 99"), ("newResident", &incoming)],
    )
    .await;
    assert_eq!(body["error"], "Unit Unit 99 not found");

    let body = call(
        &h.app,
        "management",
        "processUnitHandover",
        &[("unitNumber", "Unit 30")],
    )
    .await;
    assert_eq!(body["error"], "New resident details are required");
}
