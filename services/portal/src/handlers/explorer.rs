//! Read-only explorer actions

use serde::Serialize;
use serde_json::{Value, json};

use crate::envelope::ActionParams;
use crate::error::{PortalError, PortalResult};
use crate::handlers::portal::dropdown_options;
use crate::models::resident::{Resident, unit_address};
use crate::services::stats::analyze;
use crate::state::AppState;

pub async fn dispatch(state: &AppState, action: &str, _params: &ActionParams) -> PortalResult<Value> {
    match action {
        "getFaultLogData" => fault_log(state).await,
        "getLegacyLogData" => legacy_log(state).await,
        "getExplorerStats" => explorer_stats(state).await,
        "getResidents" => residents(state).await,
        "getDropdownOptions" => dropdown_options(state).await,
        other => Err(PortalError::UnknownAction(other.to_string())),
    }
}

/// Directory entry as listed by the explorer
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryEntry {
    unit: String,
    name: String,
    email: String,
    phone: String,
    stage: String,
    role_tags: String,
    address: String,
}

impl From<&Resident> for DirectoryEntry {
    fn from(resident: &Resident) -> Self {
        Self {
            unit: resident.unit_number.clone(),
            name: resident.resident_name.clone(),
            email: resident.email.clone(),
            phone: resident.phone.clone(),
            stage: resident.stage_or_default().to_string(),
            role_tags: resident.role_tags_or_default().to_string(),
            address: unit_address(&resident.unit_number, &resident.stage),
        }
    }
}

async fn fault_log(state: &AppState) -> PortalResult<Value> {
    let problems: Vec<_> = state
        .faults
        .list()
        .await?
        .into_iter()
        .filter(|p| !p.internal_id.is_empty())
        .collect();
    Ok(json!({ "data": problems }))
}

async fn legacy_log(state: &AppState) -> PortalResult<Value> {
    Ok(json!({ "data": state.faults.legacy().await? }))
}

async fn explorer_stats(state: &AppState) -> PortalResult<Value> {
    let problems = state.faults.list().await?;
    Ok(json!({ "data": analyze(&problems, &state.clock) }))
}

async fn residents(state: &AppState) -> PortalResult<Value> {
    let rows = state.residents.list().await?;
    if rows.is_empty() {
        return Err(PortalError::not_found("No resident data found"));
    }

    let residents: Vec<DirectoryEntry> = rows
        .iter()
        .map(|(_, resident)| resident)
        .filter(|resident| resident.is_listed())
        .map(DirectoryEntry::from)
        .collect();
    Ok(json!({
        "count": residents.len(),
        "message": format!("Found {} residents", residents.len()),
        "residents": residents,
    }))
}
