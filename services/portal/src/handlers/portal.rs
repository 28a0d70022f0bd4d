//! Maintenance portal actions: problems, dropdowns, email lists and users

use rand::{Rng, distributions::Alphanumeric};
use serde_json::{Value, json};
use tracing::info;

use crate::envelope::{ActionParams, message};
use crate::error::{PortalError, PortalResult};
use crate::handlers::to_payload;
use crate::models::user::{DIRECTOR_USERNAME, Role, UserAccount};
use crate::repositories::dropdowns::{Mutation, PORTAL_TYPES};
use crate::repositories::named_ranges::row_layout;
use crate::repositories::users::{LoginOutcome, hash_password};
use crate::services::problems::ProblemUpdate;
use crate::state::AppState;
use crate::validation::{validate_email, validate_password, validate_username};

const TEMP_PASSWORD_LENGTH: usize = 8;

pub async fn dispatch(state: &AppState, action: &str, params: &ActionParams) -> PortalResult<Value> {
    match action {
        "getFaultLogData" => fault_log(state).await,
        "updateProblem" | "updateProblemWithActivity" => update_problem(state, params).await,
        "getActivityLog" => activity_log(state, params).await,
        "getDropdownOptions" => dropdown_options(state).await,
        "addDropdownItem" => add_dropdown_item(state, params).await,
        "updateDropdownItem" => update_dropdown_item(state, params).await,
        "deleteDropdownItem" => delete_dropdown_item(state, params).await,
        "getNamedRangeData" => named_range_data(state, params).await,
        "updateNamedRangeCell" => update_named_range_cell(state, params).await,
        "updateNamedRangeRow" => update_named_range_row(state, params).await,
        "addNamedRangeRow" => add_named_range_row(state, params).await,
        "deleteNamedRangeRow" => delete_named_range_row(state, params).await,
        "authenticateUser" => authenticate_user(state, params).await,
        "getCurrentUser" => current_user(state, params).await,
        "getUserList" => user_list(state).await,
        "createUser" => create_user(state, params).await,
        "updateUser" => update_user(state, params).await,
        "deleteUser" => delete_user(state, params).await,
        "resetUserPassword" => reset_user_password(state, params).await,
        "toggleUserStatus" => toggle_user_status(state, params).await,
        other => Err(PortalError::UnknownAction(other.to_string())),
    }
}

async fn fault_log(state: &AppState) -> PortalResult<Value> {
    let problems = state.faults.list().await?;
    Ok(json!({ "data": problems }))
}

async fn update_problem(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    params.require("internalId", "Internal ID required")?;
    let report = state.problems.update(&ProblemUpdate::from_params(params)).await?;
    to_payload(&report)
}

async fn activity_log(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let log = state.problems.activity_log(params.str("internalId")).await?;
    Ok(json!({ "activityLog": log }))
}

/// Portal dropdown lists, shared with the explorer
pub(crate) async fn dropdown_options(state: &AppState) -> PortalResult<Value> {
    let options = state.dropdowns.portal_options().await?;
    Ok(json!({ "data": options }))
}

fn portal_type(params: &ActionParams) -> PortalResult<&str> {
    let kind = params.str("type");
    if !PORTAL_TYPES.contains(&kind) {
        return Err(PortalError::validation(format!(
            "Invalid type. Must be one of: {}",
            PORTAL_TYPES.join(", ")
        )));
    }
    Ok(kind)
}

async fn add_dropdown_item(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let value = params.get("value").filter(|v| !v.is_empty());
    let (Some(_), Some(value)) = (params.non_empty("type"), value) else {
        return Err(PortalError::validation("Type and value are required"));
    };
    let kind = portal_type(params)?;

    match state.dropdowns.add(kind, value).await? {
        Mutation::Duplicate => Err(PortalError::validation(format!(
            "\"{}\" already exists in {}",
            value, kind
        ))),
        _ => Ok(message(format!("Added \"{}\" to {} and sorted", value, kind))),
    }
}

async fn update_dropdown_item(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let filled = |key: &str| params.get(key).filter(|v| !v.is_empty());
    let (Some(kind), Some(old_value), Some(new_value)) =
        (filled("type"), filled("oldValue"), filled("newValue"))
    else {
        return Err(PortalError::validation("Type, oldValue, and newValue are required"));
    };
    portal_type(params)?;

    match state.dropdowns.rename(kind, old_value, new_value).await? {
        Mutation::Done => Ok(message(format!(
            "Updated \"{}\" to \"{}\" in {}",
            old_value, new_value, kind
        ))),
        Mutation::Duplicate => Err(PortalError::validation(format!(
            "\"{}\" already exists in {}",
            new_value, kind
        ))),
        Mutation::Missing => Err(PortalError::not_found(format!(
            "\"{}\" not found in {}",
            old_value, kind
        ))),
    }
}

async fn delete_dropdown_item(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let filled = |key: &str| params.get(key).filter(|v| !v.is_empty());
    let (Some(kind), Some(value)) = (filled("type"), filled("value")) else {
        return Err(PortalError::validation("Type and value are required"));
    };
    portal_type(params)?;

    match state.dropdowns.remove_last(kind, value).await? {
        Mutation::Done => Ok(message(format!("Deleted \"{}\" from {}", value, kind))),
        _ => Err(PortalError::not_found(format!("\"{}\" not found in {}", value, kind))),
    }
}

fn row_index(params: &ActionParams, key: &str) -> PortalResult<usize> {
    params
        .int(key)
        .filter(|n| *n >= 0)
        .map(|n| n as usize)
        .ok_or_else(|| PortalError::validation(format!("Invalid {}", key)))
}

async fn named_range_data(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let range = params.require("rangeName", "Range name is required")?;
    let data = state.ranges.rows_json(range).await?;
    Ok(json!({
        "totalRows": data.len(),
        "data": data,
        "rangeName": range,
    }))
}

async fn update_named_range_cell(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let range = params.require("rangeName", "Range name is required")?;
    let row = row_index(params, "row")?;
    let col = row_index(params, "col")?;
    let value = params.str("value");

    state.ranges.update_cell(range, row, col, value).await?;
    Ok(json!({
        "message": format!("Updated {} successfully", range),
        "updatedValue": value,
    }))
}

fn email_list_row(range: &str, params: &ActionParams) -> Vec<String> {
    row_layout(range, params.str("name"), params.str("email"), params.str("zone"))
}

async fn update_named_range_row(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let range = params.require("rangeName", "Range name is required")?;
    let row = row_index(params, "row")?;
    let values = email_list_row(range, params);

    state.ranges.update_row(range, row, &values).await?;
    Ok(json!({
        "message": format!("Updated {} row successfully", range),
        "updatedData": values,
    }))
}

async fn add_named_range_row(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let range = params.require("rangeName", "Range name is required")?;
    let values = email_list_row(range, params);

    state.ranges.append_row(range, &values).await?;
    Ok(json!({
        "message": format!("Added new entry to {}", range),
        "newRowData": values,
    }))
}

async fn delete_named_range_row(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let range = params.require("rangeName", "Range name is required")?;
    let row = row_index(params, "row")?;

    state.ranges.delete_row(range, row).await?;
    Ok(message(format!("Deleted row from {}", range)))
}

async fn authenticate_user(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let password = params.get("password").filter(|p| !p.is_empty());
    let (Some(username), Some(password)) = (params.non_empty("username"), password) else {
        return Err(PortalError::validation("Username and password required"));
    };

    let max_attempts = state.settings.portal.max_login_attempts;
    match state.users.authenticate(username, password, max_attempts).await? {
        LoginOutcome::Authenticated(account) => Ok(json!({ "user": account.profile() })),
        LoginOutcome::Locked => Err(PortalError::validation(
            "Account locked. Contact the director to reset the password",
        )),
        LoginOutcome::Rejected => Err(PortalError::validation("Invalid username or password")),
    }
}

async fn current_user(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let username = params.require("username", "Username required")?;
    let account = state
        .users
        .find(username)
        .await?
        .filter(|account| account.is_active)
        .ok_or_else(|| PortalError::not_found("User not found"))?;

    Ok(json!({ "user": account.profile().with_last_login(&account.last_login) }))
}

async fn user_list(state: &AppState) -> PortalResult<Value> {
    let users: Vec<_> = state
        .users
        .list()
        .await?
        .into_iter()
        .filter(|account| account.is_active)
        .map(|account| account.profile().with_last_login(&account.last_login))
        .collect();
    Ok(json!({ "users": users }))
}

/// Role from the request, rejecting anything outside the known set
fn role(params: &ActionParams) -> PortalResult<Role> {
    Role::parse(params.str("role")).ok_or_else(|| PortalError::validation("Invalid role"))
}

async fn create_user(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let fields = ["username", "password", "email", "role", "name"];
    if fields.iter().any(|key| params.non_empty(key).is_none()) {
        return Err(PortalError::validation("All fields are required"));
    }
    let username = params.str("username").trim();
    let password = params.str("password");
    let email = params.str("email").trim();

    validate_password(password).map_err(PortalError::validation)?;
    let role = role(params)?;
    validate_username(username).map_err(PortalError::validation)?;
    validate_email(email).map_err(PortalError::validation)?;

    let existing = state.users.list().await?;
    if existing.iter().any(|account| account.username == username) {
        return Err(PortalError::validation("Username already exists"));
    }
    if existing.iter().any(|account| account.email == email) {
        return Err(PortalError::validation("Email already exists"));
    }

    let account = UserAccount {
        username: username.to_string(),
        password_hash: hash_password(password)?,
        email: email.to_string(),
        role: role.as_str().to_string(),
        name: params.str("name").trim().to_string(),
        created_date: state.clock.iso_now(),
        last_login: String::new(),
        is_active: true,
        login_attempts: 0,
    };
    state.users.insert(&account).await?;

    let mut profile = account.profile();
    profile.is_active = Some(true);
    profile.created_date = Some(account.created_date.clone());
    Ok(json!({
        "message": format!("User {} created successfully", username),
        "user": profile,
    }))
}

async fn update_user(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let fields = ["username", "email", "role", "name"];
    if fields.iter().any(|key| params.non_empty(key).is_none()) {
        return Err(PortalError::validation("All fields are required"));
    }
    let role = role(params)?;
    let username = params.str("username").trim();
    let email = params.str("email").trim();

    let existing = state.users.list().await?;
    let Some(mut account) = existing.iter().find(|a| a.username == username).cloned() else {
        return Err(PortalError::not_found("User not found"));
    };
    if existing
        .iter()
        .any(|other| other.email == email && other.username != username)
    {
        return Err(PortalError::validation("Email already exists for another user"));
    }

    account.email = email.to_string();
    account.role = role.as_str().to_string();
    account.name = params.str("name").trim().to_string();
    state.users.update(&account).await?;

    info!("Updated user account: {}", username);
    Ok(json!({
        "message": format!("User {} updated successfully", username),
        "user": account.profile(),
    }))
}

async fn delete_user(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let username = params.require("username", "Username is required")?;
    if username == DIRECTOR_USERNAME {
        return Err(PortalError::validation("Cannot delete director account"));
    }
    if !state.users.delete(username).await? {
        return Err(PortalError::not_found("User not found"));
    }
    Ok(message(format!("User {} deleted successfully", username)))
}

fn temp_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

async fn reset_user_password(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let username = params.require("username", "Username is required")?;
    let mut account = state
        .users
        .find(username)
        .await?
        .ok_or_else(|| PortalError::not_found("User not found"))?;

    let password = temp_password();
    account.password_hash = hash_password(&password)?;
    account.login_attempts = 0;
    state.users.update(&account).await?;

    info!("Password reset for {}", username);
    Ok(json!({
        "message": format!("Password reset successfully for {}", username),
        "tempPassword": password,
    }))
}

async fn toggle_user_status(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let (Some(username), Some(current)) =
        (params.non_empty("username"), params.bool("currentStatus"))
    else {
        return Err(PortalError::validation("Username and current status are required"));
    };
    if username == DIRECTOR_USERNAME && current {
        return Err(PortalError::validation("Cannot disable director account"));
    }

    let mut account = state
        .users
        .find(username)
        .await?
        .ok_or_else(|| PortalError::not_found("User not found"))?;
    let new_status = !current;
    account.is_active = new_status;
    state.users.update(&account).await?;

    let verb = if new_status { "enabled" } else { "disabled" };
    Ok(json!({
        "message": format!("User {} {} successfully", username, verb),
        "newStatus": new_status,
    }))
}
