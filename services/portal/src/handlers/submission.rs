//! Public submission form actions and its dropdown administration

use serde_json::{Value, json};

use crate::envelope::{ActionParams, message};
use crate::error::{PortalError, PortalResult};
use crate::handlers::to_payload;
use crate::repositories::dropdowns::{Mutation, Removal, SUBMISSION_TYPES};
use crate::services::problems::FaultSubmission;
use crate::state::AppState;

pub async fn dispatch(state: &AppState, action: &str, params: &ActionParams) -> PortalResult<Value> {
    match action {
        "submitFault" => submit_fault(state, params).await,
        "getDropdownOptions" => to_payload(&state.dropdowns.submission_options(true).await?),
        "getAdminDropdownData" => {
            let options = state.dropdowns.submission_options(false).await?;
            Ok(json!({ "data": options }))
        }
        "addDropdownItem" => add_item(state, params).await,
        "updateDropdownItem" => update_item(state, params).await,
        "deleteDropdownItem" => delete_item(state, params).await,
        other => Err(PortalError::UnknownAction(other.to_string())),
    }
}

async fn submit_fault(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let submission = FaultSubmission {
        unit_number: params.str("unitNumber").trim().to_string(),
        reported_by: params.str("reportedBy").trim().to_string(),
        problem_description: params.str("problemDescription").to_string(),
    };
    let receipt = state.problems.submit(submission).await?;
    to_payload(&receipt)
}

fn filled<'a>(params: &'a ActionParams, key: &str) -> Option<&'a str> {
    params.get(key).filter(|v| !v.is_empty())
}

fn invalid_type(prefix: &str) -> PortalError {
    PortalError::validation(format!(
        "{}. Must be one of: {}",
        prefix,
        SUBMISSION_TYPES.join(", ")
    ))
}

async fn add_item(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let (Some(kind), Some(value)) = (filled(params, "type"), filled(params, "value")) else {
        return Err(PortalError::validation("Type and value are required"));
    };
    if !SUBMISSION_TYPES.contains(&kind) {
        return Err(invalid_type("Invalid type"));
    }

    match state.dropdowns.add(kind, value).await? {
        Mutation::Duplicate => Err(PortalError::validation(format!(
            "Item \"{}\" already exists in {}",
            value, kind
        ))),
        _ => Ok(json!({
            "message": format!("Successfully added \"{}\" to {}", value, kind),
            "addedValue": value,
        })),
    }
}

async fn delete_item(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let (Some(kind), Some(value)) = (params.non_empty("type"), params.non_empty("value")) else {
        return Err(PortalError::validation("Type and value are required"));
    };

    match state.dropdowns.remove_trimmed(kind, value).await? {
        Removal::Removed(actual) => Ok(message(format!(
            "Successfully deleted \"{}\" from {}",
            actual, kind
        ))),
        Removal::NotFound { available } => Err(PortalError::not_found(format!(
            "Item \"{}\" not found in {}. Available items: {}",
            value,
            kind,
            available.join(", ")
        ))),
    }
}

async fn update_item(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let (Some(old_kind), Some(old_value), Some(new_kind), Some(new_value)) = (
        params.non_empty("oldType"),
        params.non_empty("oldValue"),
        filled(params, "newType"),
        filled(params, "newValue"),
    ) else {
        return Err(PortalError::validation(
            "Old type, old value, new type, and new value are required",
        ));
    };
    if !SUBMISSION_TYPES.contains(&new_kind) {
        return Err(invalid_type("Invalid new type"));
    }

    match state
        .dropdowns
        .replace(old_kind, old_value, new_kind, new_value)
        .await?
    {
        Mutation::Done => Ok(message(format!(
            "Successfully updated \"{}\" to \"{}\"",
            old_value, new_value
        ))),
        Mutation::Missing => Err(PortalError::not_found(format!(
            "Item \"{}\" not found in {}",
            old_value, old_kind
        ))),
        Mutation::Duplicate => Err(PortalError::validation(format!(
            "Item \"{}\" already exists in {}",
            new_value, new_kind
        ))),
    }
}
