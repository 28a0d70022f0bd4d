//! Email actions: notifications, configuration, templates and quota

use serde_json::{Map, Value, json};

use crate::envelope::{ActionParams, message};
use crate::error::{PortalError, PortalResult};
use crate::handlers::to_payload;
use crate::models::fault::FaultRecord;
use crate::models::template::TemplateInput;
use crate::state::AppState;

const DEFAULT_RECIPIENT_FILTER: &str = "all_units";

pub async fn dispatch(state: &AppState, action: &str, params: &ActionParams) -> PortalResult<Value> {
    match action {
        "sendProblemSubmissionEmails" => submission_emails(state, params).await,
        "sendCompletionNotification" => completion_notification(state, params).await,
        "sendMassNotification" => mass_notification(state, params).await,
        "getEmailConfig" => email_config(state).await,
        "updateEmailConfig" => update_email_config(state, params).await,
        "getEmailTemplates" => email_templates(state).await,
        "getEmailStats" => email_stats(state).await,
        "checkEmailQuota" => email_quota(state).await,
        "createEmailTemplate" => create_template(state, params).await,
        "updateEmailTemplate" => update_template(state, params).await,
        "deleteEmailTemplate" => delete_template(state, params).await,
        other => Err(PortalError::UnknownAction(other.to_string())),
    }
}

fn problem_data(params: &ActionParams) -> PortalResult<FaultRecord> {
    let data: Value = params
        .json("problemData")?
        .ok_or_else(|| PortalError::validation("Problem data is required"))?;
    FaultRecord::from_problem_data(data)
        .map_err(|e| PortalError::validation(format!("Invalid problemData: {}", e)))
}

async fn submission_emails(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let problem = problem_data(params)?;
    let report = state.notifier.send_submission(&problem).await?;
    to_payload(&report)
}

async fn completion_notification(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let problem = problem_data(params)?;
    let report = state.notifier.send_completion(&problem).await?;
    to_payload(&report)
}

async fn mass_notification(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let template_id = params.require("templateId", "Template ID is required")?;
    let custom_data: Map<String, Value> = params.json("customData")?.unwrap_or_default();
    let filter = params
        .non_empty("recipientFilter")
        .unwrap_or(DEFAULT_RECIPIENT_FILTER);

    let report = state
        .notifier
        .send_mass(template_id, &custom_data, filter, params.non_empty("adminUser"))
        .await?;
    to_payload(&report)
}

async fn email_config(state: &AppState) -> PortalResult<Value> {
    let config = state.email_config.load().await;
    Ok(json!({ "config": config.to_json() }))
}

async fn update_email_config(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let changes: Map<String, Value> = params
        .json("config")?
        .ok_or_else(|| PortalError::validation("Configuration is required"))?;
    state.email_config.update(&changes).await?;
    Ok(message("Email configuration updated successfully"))
}

async fn email_templates(state: &AppState) -> PortalResult<Value> {
    let templates = state.templates.list().await?;
    Ok(json!({ "templates": templates }))
}

async fn email_stats(state: &AppState) -> PortalResult<Value> {
    let stats = state.notifier.stats().await?;
    Ok(json!({ "stats": stats }))
}

async fn email_quota(state: &AppState) -> PortalResult<Value> {
    let quota = state.notifier.quota().await?;
    to_payload(&quota)
}

fn template_input(params: &ActionParams) -> PortalResult<TemplateInput> {
    let input: TemplateInput = params
        .json("templateData")?
        .ok_or_else(|| PortalError::validation("Template data is required"))?;
    if !input.is_complete() {
        return Err(PortalError::validation(
            "Missing required fields: templateId, category, subject, body",
        ));
    }
    Ok(input)
}

async fn create_template(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let template = state.templates.create(template_input(params)?).await?;
    Ok(json!({
        "message": format!("Template \"{}\" created successfully", template.template_id),
        "template": template,
    }))
}

async fn update_template(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let template = state.templates.update(template_input(params)?).await?;
    Ok(json!({
        "message": format!("Template \"{}\" updated successfully", template.template_id),
        "template": template,
    }))
}

async fn delete_template(state: &AppState, params: &ActionParams) -> PortalResult<Value> {
    let template_id = params.require("templateId", "Template ID is required")?;
    state.templates.delete(template_id).await?;
    Ok(message(format!("Template \"{}\" deleted successfully", template_id)))
}
