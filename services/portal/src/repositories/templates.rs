//! Email template repository over the EmailTemplateRange named range

use common::{Table, Workbook};
use tracing::info;

use crate::error::{PortalError, PortalResult};
use crate::models::template::{EMAIL_TEMPLATE_RANGE, EmailTemplate, TemplateInput};

/// Email template repository
#[derive(Clone)]
pub struct TemplateRepository {
    workbook: Workbook,
}

impl TemplateRepository {
    pub fn new(workbook: Workbook) -> Self {
        Self { workbook }
    }

    async fn range(&self) -> PortalResult<Table> {
        self.workbook
            .named_range(EMAIL_TEMPLATE_RANGE)
            .await?
            .ok_or_else(|| PortalError::not_found(format!("{} not found", EMAIL_TEMPLATE_RANGE)))
    }

    fn position(table: &Table, template_id: &str) -> Option<usize> {
        (1..table.len()).find(|&row| table.get(row, 0).text() == template_id)
    }

    /// Templates with an id, in range order
    pub async fn list(&self) -> PortalResult<Vec<EmailTemplate>> {
        let table = self.range().await?;
        Ok(table
            .rows()
            .iter()
            .skip(1)
            .map(|row| EmailTemplate::from_row(row))
            .filter(|t| !t.template_id.is_empty())
            .collect())
    }

    pub async fn find(&self, template_id: &str) -> PortalResult<Option<EmailTemplate>> {
        let table = self.range().await?;
        Ok(Self::position(&table, template_id).map(|row| EmailTemplate::from_row(&table.rows()[row])))
    }

    /// Store a new template in the first free row, growing the range when
    /// none is free
    pub async fn create(&self, input: TemplateInput) -> PortalResult<EmailTemplate> {
        let mut table = self.range().await?;
        if Self::position(&table, &input.template_id).is_some() {
            return Err(PortalError::validation(format!(
                "Template ID \"{}\" already exists",
                input.template_id
            )));
        }

        let field_alert = input.field_alert().unwrap_or(false);
        let template = input.into_template(field_alert);
        let row = template.to_row();
        match (1..table.len()).find(|&idx| table.get(idx, 0).is_blank()) {
            Some(idx) => table.rows_mut()[idx] = row,
            None => table.push_row(row),
        }
        self.workbook.save(&table).await?;

        info!("Created email template {}", template.template_id);
        Ok(template)
    }

    /// Overwrite an existing template; the alert flag is kept unless given
    pub async fn update(&self, input: TemplateInput) -> PortalResult<EmailTemplate> {
        let mut table = self.range().await?;
        let Some(idx) = Self::position(&table, &input.template_id) else {
            return Err(PortalError::not_found(format!(
                "Template \"{}\" not found",
                input.template_id
            )));
        };

        let current = EmailTemplate::from_row(&table.rows()[idx]);
        let field_alert = input.field_alert().unwrap_or(current.field_alert);
        let template = input.into_template(field_alert);
        table.rows_mut()[idx] = template.to_row();
        self.workbook.save(&table).await?;

        info!("Updated email template {}", template.template_id);
        Ok(template)
    }

    pub async fn delete(&self, template_id: &str) -> PortalResult<()> {
        let mut table = self.range().await?;
        let Some(idx) = Self::position(&table, template_id) else {
            return Err(PortalError::not_found(format!(
                "Template \"{}\" not found",
                template_id
            )));
        };

        table.remove_row(idx);
        self.workbook.save(&table).await?;
        info!("Deleted email template {}", template_id);
        Ok(())
    }
}
