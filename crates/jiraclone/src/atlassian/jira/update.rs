//! Update Jira ticket fields

use clap::Args;
use colored::Colorize;
use jiraclone_core::adf::{text_document, AdfNode};
use jiraclone_core::atlassian::jira::{
    build_description_update, build_update_payload, collect_error_messages,
};
use jiraclone_core::due_date::resolve_due_date;
use serde::Serialize;
use serde_json::Value;

use crate::atlassian::JiraSession;
use crate::prelude::{println, *};

/// Update a Jira ticket's fields
#[derive(Args, Debug, Clone)]
pub struct UpdateOptions {
    /// Ticket key (e.g., PROJ-123)
    pub ticket_key: String,

    /// New summary
    #[arg(long)]
    pub summary: Option<String>,

    /// New plain text description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// New due date: YYYY-MM-DD, nW or nD
    #[arg(long)]
    pub due_date: Option<String>,

    /// Replace the labels (repeatable)
    #[arg(long = "label", short = 'l')]
    pub labels: Vec<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct UpdateOutput {
    pub ticket_key: String,
    pub fields_updated: Vec<String>,
}

/// `PUT issue/{key}` with an already built `{"fields": ...}` payload.
pub async fn update_issue_fields(session: &JiraSession, issue_key: &str, payload: &Value) -> Result<()> {
    let url = session.api_url(&f!("issue/{}", urlencoding::encode(issue_key)));

    let response = session
        .client
        .put(&url)
        .json(payload)
        .send()
        .await
        .map_err(|e| eyre!("Failed to send update request: {}", e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        return Err(eyre!(
            "Failed to update {issue_key} [{status}]:\n{}",
            collect_error_messages(&body)
        ));
    }

    Ok(())
}

/// Replace the description of `issue_key` with an ADF document.
pub async fn update_description(
    session: &JiraSession,
    issue_key: &str,
    description: &AdfNode,
) -> Result<()> {
    update_issue_fields(session, issue_key, &build_description_update(description)).await?;
    log::info!("Updated description of {issue_key}");
    Ok(())
}

/// Update ticket data - handles all I/O and Jira API interactions
pub async fn update_ticket_data(session: &JiraSession, options: UpdateOptions) -> Result<UpdateOutput> {
    let due_date = options
        .due_date
        .as_deref()
        .map(|expr| resolve_due_date(expr, chrono::Local::now().date_naive()))
        .transpose()?;
    let description = options.description.map(text_document);
    let labels = (!options.labels.is_empty()).then_some(options.labels.as_slice());

    let payload = build_update_payload(
        options.summary.as_deref(),
        description.as_ref(),
        due_date.as_deref(),
        labels,
    );

    let fields_updated: Vec<String> = payload["fields"]
        .as_object()
        .map(|fields| fields.keys().cloned().collect())
        .unwrap_or_default();

    if fields_updated.is_empty() {
        return Err(eyre!(
            "At least one field must be provided for update (--summary, --description, --due-date or --label)"
        ));
    }

    update_issue_fields(session, &options.ticket_key, &payload).await?;

    Ok(UpdateOutput {
        ticket_key: options.ticket_key,
        fields_updated,
    })
}

/// CLI handler for update command
pub async fn handler(options: UpdateOptions) -> Result<()> {
    let session = JiraSession::from_env()?;
    let json = options.json;
    let output = update_ticket_data(&session, options).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "{} {}",
            f!("Updated {}:", output.ticket_key).green().bold(),
            output.fields_updated.join(", ")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlassian::tests::test_session;
    use httpmock::prelude::*;
    use serde_json::json;

    fn options(key: &str) -> UpdateOptions {
        UpdateOptions {
            ticket_key: key.to_string(),
            summary: None,
            description: None,
            due_date: None,
            labels: Vec::new(),
            json: false,
        }
    }

    #[tokio::test]
    async fn test_update_description_puts_adf() {
        // Arrange
        let server = MockServer::start();
        let doc = text_document("See attachments");
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/rest/api/3/issue/DEST-1")
                .json_body(json!({"fields": {"description": doc.to_value()}}));
            then.status(204);
        });
        let session = test_session(&server);

        // Act
        update_description(&session, "DEST-1", &doc)
            .await
            .expect("update");

        // Assert
        mock.assert();
    }

    #[tokio::test]
    async fn test_update_ticket_data_reports_fields() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PUT).path("/rest/api/3/issue/DEST-1").json_body(json!({
                "fields": {"summary": "Renamed", "duedate": "2025-01-31", "labels": ["x"]}
            }));
            then.status(204);
        });
        let session = test_session(&server);
        let mut opts = options("DEST-1");
        opts.summary = Some("Renamed".to_string());
        opts.due_date = Some("2025-01-31".to_string());
        opts.labels = vec!["x".to_string()];

        let output = update_ticket_data(&session, opts).await.expect("update");

        mock.assert();
        assert_eq!(output.ticket_key, "DEST-1");
        assert_eq!(output.fields_updated.len(), 3);
        assert!(output.fields_updated.contains(&"duedate".to_string()));
    }

    #[tokio::test]
    async fn test_update_ticket_data_requires_a_field() {
        let server = MockServer::start();
        let session = test_session(&server);

        let err = update_ticket_data(&session, options("DEST-1"))
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("At least one field"));
    }

    #[tokio::test]
    async fn test_update_issue_fields_collects_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PUT).path("/rest/api/3/issue/DEST-1");
            then.status(400)
                .json_body(json!({"errors": {"description": "Invalid media"}}));
        });
        let session = test_session(&server);

        let err = update_issue_fields(&session, "DEST-1", &json!({"fields": {}}))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to update DEST-1 [400 Bad Request]:\ndescription: Invalid media"
        );
    }
}
