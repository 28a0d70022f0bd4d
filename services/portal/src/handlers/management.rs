//! Management actions: the resident directory, derived lists, slot lists
//! and account overview

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::envelope::{ActionParams, message};
use crate::error::{PortalError, PortalResult};
use crate::handlers::to_payload;
use crate::models::resident::{COLUMN_NAMES, DEFAULT_ROLE_TAGS, DEFAULT_STAGE, Resident};
use crate::repositories::named_ranges::{
    ASSIGNED_BY, CATEGORIES, DEFAULT_ROLES, ROLES, SUB_CATEGORIES, SlotList,
};
use crate::state::AppState;

pub async fn dispatch(state: &AppState, action: &str, params: &ActionParams) -> PortalResult<Value> {
    match action {
        "getUnitListData" => unit_list(state).await,
        "addResident" => add_resident(state, params).await,
        "updateResident" => update_resident(state, params).await,
        "deleteResident" => delete_resident(state, params).await,
        "processUnitHandover" => unit_handover(state, params).await,
        "syncDDM" => to_payload(&state.directory.sync_reporters().await?),
        "syncZoneReps" => to_payload(&state.directory.sync_zone_reps().await?),
        "getZoneReps" => zone_reps(state).await,
        "getCategories" => slots(state, &CATEGORIES).await,
        "addCategory" => add_slot(state, &CATEGORIES, params.str("category")).await,
        "updateCategory" => update_slot(state, &CATEGORIES, params).await,
        "deleteCategory" => delete_slot(state, &CATEGORIES, params.int("categoryId")).await,
        "getSubCategories" => slots(state, &SUB_CATEGORIES).await,
        "addSubCategory" => add_slot(state, &SUB_CATEGORIES, params.str("subCategory")).await,
        "updateSubCategory" => update_slot(state, &SUB_CATEGORIES, params).await,
        "deleteSubCategory" => {
            delete_slot(state, &SUB_CATEGORIES, params.int("subCategoryId")).await
        }
        "getAssignedBy" => slots(state, &ASSIGNED_BY).await,
        "addAssignedBy" => add_slot(state, &ASSIGNED_BY, params.str("assignedBy")).await,
        "updateAssignedBy" => update_slot(state, &ASSIGNED_BY, params).await,
        "deleteAssignedBy" => delete_slot(state, &ASSIGNED_BY, params.int("assignedById")).await,
        "getRoles" => roles(state).await,
        "addRole" => add_role(state, params.str("role")).await,
        "updateRole" => update_slot(state, &ROLES, params).await,
        "deleteRole" => delete_slot(state, &ROLES, params.int("roleId")).await,
        "testConnection" => Ok(json!({
            "message": "Backend connection successful",
            "version": state.settings.portal.version,
        })),
        "getUserAccounts" => user_accounts(state).await,
        other => Err(PortalError::UnknownAction(other.to_string())),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UnitListEntry {
    row_index: usize,
    #[serde(flatten)]
    resident: Resident,
}

async fn unit_list(state: &AppState) -> PortalResult<Value> {
    let residents: Vec<UnitListEntry> = state
        .residents
        .list()
        .await?
        .into_iter()
        .filter(|(_, resident)| resident.is_listed())
        .map(|(idx, mut resident)| {
            resident.stage = resident.stage_or_default().to_string();
            resident.role_tags = resident.role_tags_or_default().to_string();
            UnitListEntry {
                row_index: idx + 1,
                resident,
            }
        })
        .collect();

    Ok(json!({
        "totalCount": residents.len(),
        "residents": residents,
    }))
}

async fn add_resident(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let name = params.str("residentName");
    let unit = params.str("unitNumber");
    if !name.is_empty() {
        let existing = state.residents.list().await?;
        if existing.iter().any(|(_, r)| r.resident_name == name) {
            return Err(PortalError::validation(format!("Resident {} already exists", name)));
        }
    }

    let email = params.str("email");
    let phone = params.str("phone");
    let resident = Resident {
        unit_number: unit.to_string(),
        resident_name: name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        zone: params.str("zone").to_string(),
        unit_display_name: params.str("unitDisplayName").to_string(),
        unit_primary_name: name.to_string(),
        unit_primary_email: email.to_string(),
        unit_primary_phone: phone.to_string(),
        stage: params.non_empty("stage").unwrap_or(DEFAULT_STAGE).to_string(),
        role_tags: params.non_empty("roleTags").unwrap_or(DEFAULT_ROLE_TAGS).to_string(),
    };
    let (_, placement) = state.residents.insert(&resident).await?;
    let (ddm_synced, zone_reps_synced) = state.directory.try_sync(!name.is_empty(), true).await;

    Ok(json!({
        "message": format!(
            "Successfully added {} {} {} to unit {}",
            resident.stage, resident.role_tags, name, unit
        ),
        "ddmSynced": ddm_synced,
        "zoneRepsSynced": zone_reps_synced,
        "placement": placement.as_str(),
    }))
}

/// Field values to merge into a UnitList row; `None` keeps the current value
#[derive(Debug, Clone, Default)]
struct ResidentPatch {
    unit_number: Option<String>,
    resident_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    zone: Option<String>,
    unit_display_name: Option<String>,
    stage: Option<String>,
    role_tags: Option<String>,
}

impl ResidentPatch {
    fn from_params(params: &ActionParams) -> Self {
        let sent = |key: &str| params.get(key).map(str::to_string);
        Self {
            unit_number: params.non_empty("unitNumber").map(str::to_string),
            resident_name: sent("residentName"),
            email: sent("email"),
            phone: sent("phone"),
            zone: sent("zone"),
            unit_display_name: sent("unitDisplayName"),
            stage: sent("stage"),
            role_tags: sent("roleTags"),
        }
    }

    /// The merged row; unit-primary columns mirror the contact fields
    fn apply(&self, current: &Resident) -> Resident {
        let pick = |value: &Option<String>, fallback: &str| {
            value.clone().unwrap_or_else(|| fallback.to_string())
        };
        let name = pick(&self.resident_name, &current.resident_name);
        let email = pick(&self.email, &current.email);
        let phone = pick(&self.phone, &current.phone);

        Resident {
            unit_number: pick(&self.unit_number, &current.unit_number),
            zone: pick(&self.zone, &current.zone),
            unit_display_name: pick(&self.unit_display_name, &current.unit_display_name),
            stage: pick(&self.stage, &current.stage),
            role_tags: pick(&self.role_tags, &current.role_tags),
            unit_primary_name: name.clone(),
            unit_primary_email: email.clone(),
            unit_primary_phone: phone.clone(),
            resident_name: name,
            email,
            phone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct ColumnChange {
    column: &'static str,
    old_value: String,
    new_value: String,
}

fn column_changes(before: &Resident, after: &Resident) -> Vec<ColumnChange> {
    let old_row = before.to_row();
    let new_row = after.to_row();
    COLUMN_NAMES
        .iter()
        .copied()
        .zip(old_row.iter().zip(new_row.iter()))
        .filter(|(_, (old, new))| old.text() != new.text())
        .map(|(column, (old, new))| ColumnChange {
            column,
            old_value: old.text(),
            new_value: new.text(),
        })
        .collect()
}

fn row_missing(row: usize, rows: usize) -> PortalError {
    PortalError::not_found(format!("Row {} does not exist. Sheet has {} rows.", row, rows))
}

/// Merge a patch into the 1-based sheet row, then resync derived lists
async fn patch_resident(state: &AppState, row: usize, patch: &ResidentPatch) -> PortalResult<Value> {
    let mut table = state.residents.sheet().await?;
    if row > table.len() {
        return Err(row_missing(row, table.len()));
    }

    let idx = row - 1;
    let current = Resident::from_row(&table.rows()[idx]);
    let updated = patch.apply(&current);
    let changes = column_changes(&current, &updated);
    table.rows_mut()[idx] = updated.to_row();
    state.residents.save(table).await?;

    let name_changed = current.resident_name != updated.resident_name;
    let (ddm_synced, zone_reps_synced) = state.directory.try_sync(name_changed, true).await;
    info!("Updated resident row {} ({} changes)", row, changes.len());

    Ok(json!({
        "message": format!("Successfully updated resident in unit {}", updated.unit_number),
        "ddmSynced": ddm_synced,
        "zoneRepsSynced": zone_reps_synced,
        "changes": changes,
    }))
}

async fn update_resident(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let row = params
        .int("rowIndex")
        .filter(|row| *row >= 2)
        .ok_or_else(|| PortalError::validation("Invalid row index"))?;
    patch_resident(state, row as usize, &ResidentPatch::from_params(params)).await
}

async fn delete_resident(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let row = params
        .int("rowIndex")
        .filter(|row| *row != 0)
        .ok_or_else(|| PortalError::validation("Invalid row index: must be a valid number"))?;
    if row < 2 {
        return Err(PortalError::validation(
            "Invalid row index: cannot delete header row (row 1)",
        ));
    }
    let row = row as usize;

    let mut table = state.residents.sheet().await?;
    if row > table.len() {
        return Err(row_missing(row, table.len()));
    }
    let removed = table
        .remove_row(row - 1)
        .map(|cells| Resident::from_row(&cells))
        .unwrap_or_default();
    state.residents.save(table).await?;

    let (ddm_synced, zone_reps_synced) = state.directory.try_sync(true, true).await;
    info!("Deleted resident {} from row {}", removed.resident_name, row);

    Ok(json!({
        "message": format!(
            "Successfully deleted resident {} from unit {}",
            removed.resident_name, removed.unit_number
        ),
        "ddmSynced": ddm_synced,
        "zoneRepsSynced": zone_reps_synced,
        "deletedRow": row,
    }))
}

/// Incoming resident of a unit handover
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct NewResident {
    name: String,
    email: String,
    phone: String,
    stage: String,
    role_tags: String,
}

async fn unit_handover(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let unit = params.require("unitNumber", "Unit number required for handover")?;
    let incoming: NewResident = params
        .json("newResident")?
        .ok_or_else(|| PortalError::validation("New resident details are required"))?;

    let (idx, current) = state
        .residents
        .list()
        .await?
        .into_iter()
        .find(|(_, r)| r.unit_number == unit)
        .ok_or_else(|| PortalError::not_found(format!("Unit {} not found", unit)))?;

    let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());
    let patch = ResidentPatch {
        resident_name: Some(incoming.name.clone()),
        email: Some(incoming.email.clone()),
        phone: Some(incoming.phone.clone()),
        stage: Some(non_empty(&incoming.stage).unwrap_or(current.stage)),
        role_tags: Some(
            non_empty(&incoming.role_tags).unwrap_or_else(|| DEFAULT_ROLE_TAGS.to_string()),
        ),
        ..Default::default()
    };

    let mut payload = patch_resident(state, idx + 1, &patch).await?;
    info!("Unit {} handed over to {}", unit, incoming.name);
    payload["message"] = json!(format!("Successfully completed handover for unit {}", unit));
    Ok(payload)
}

async fn zone_reps(state: &AppState) -> PortalResult<Value> {
    let reps = state.directory.zone_reps().await?;
    Ok(json!({
        "zoneReps": reps,
        "message": "Found zone representatives for all zones",
    }))
}

fn numbered(entries: impl IntoIterator<Item = (usize, String)>) -> Vec<Value> {
    entries
        .into_iter()
        .map(|(id, name)| json!({ "id": id, "name": name }))
        .collect()
}

async fn slots(state: &AppState, list: &SlotList) -> PortalResult<Value> {
    let values = state.ranges.sorted_slots(list).await?;
    let entries = numbered(values.into_iter().enumerate().map(|(idx, v)| (idx + 1, v)));
    Ok(json!({ list.key: entries }))
}

async fn roles(state: &AppState) -> PortalResult<Value> {
    match state.ranges.filled_slots(&ROLES).await? {
        Some(entries) => Ok(json!({ ROLES.key: numbered(entries) })),
        None => {
            let defaults = DEFAULT_ROLES
                .iter()
                .enumerate()
                .map(|(idx, role)| (idx + 1, role.to_string()));
            Ok(json!({
                ROLES.key: numbered(defaults),
                "message": format!("{} named range not found, default roles returned", ROLES.range),
            }))
        }
    }
}

fn slot_value<'a>(list: &SlotList, value: &'a str) -> PortalResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PortalError::validation(format!("{} name is required", list.label)));
    }
    Ok(value)
}

fn no_space(list: &SlotList) -> PortalError {
    PortalError::validation(format!("No space available in {} range", list.space_label))
}

async fn add_slot(state: &AppState, list: &SlotList, value: &str) -> PortalResult<Value> {
    let value = slot_value(list, value)?;
    if !state.ranges.add_sorted(list, value).await? {
        return Err(no_space(list));
    }
    Ok(message(format!("{} added and sorted successfully", list.label)))
}

async fn add_role(state: &AppState, value: &str) -> PortalResult<Value> {
    let value = slot_value(&ROLES, value)?;
    let slot = state
        .ranges
        .fill_free_slot(&ROLES, value)
        .await?
        .ok_or_else(|| no_space(&ROLES))?;
    Ok(json!({
        "message": "Role added successfully",
        "rowIndex": slot,
    }))
}

async fn update_slot(state: &AppState, list: &SlotList, params: &ActionParams) -> PortalResult<Value> {
    let value = slot_value(list, params.str("name"))?;
    state.ranges.set_slot(list, params.int("id"), value).await?;
    Ok(message(format!("{} updated successfully", list.label)))
}

async fn delete_slot(state: &AppState, list: &SlotList, id: Option<i64>) -> PortalResult<Value> {
    state.ranges.set_slot(list, id, "").await?;
    Ok(message(format!("{} deleted successfully", list.label)))
}

async fn user_accounts(state: &AppState) -> PortalResult<Value> {
    let users: Vec<Value> = state
        .users
        .list()
        .await?
        .into_iter()
        .map(|account| {
            json!({
                "username": account.username,
                "fullName": account.name,
                "role": account.role,
                "status": if account.is_active { "Active" } else { "Inactive" },
                "created": account.created_date,
                "lastLogin": account.last_login,
            })
        })
        .collect();
    Ok(json!({ "count": users.len(), "users": users }))
}
