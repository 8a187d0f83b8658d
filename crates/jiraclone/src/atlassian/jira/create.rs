//! Create Jira tickets

use clap::Args;
use colored::Colorize;
use jiraclone_core::adf::text_document;
use jiraclone_core::atlassian::jira::{
    build_create_payload, collect_error_messages, resolve_issue_type, transform_create_meta,
    CreateIssueRequest, JiraCreateMetaResponse, JiraIssueType, TicketOutput, DEFAULT_LINK_TYPE,
};
use jiraclone_core::due_date::resolve_due_date;
use serde::Deserialize;

use crate::atlassian::{check_response, JiraSession};
use crate::prelude::{eprintln, println, *};

/// Create a new Jira ticket
#[derive(Args, Debug, Clone)]
pub struct CreateOptions {
    /// Summary/title of the ticket (required)
    pub summary: String,

    /// Project key
    #[arg(long, short = 'p', env = "JIRA_PROJECT")]
    pub project: String,

    /// Plain text description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Issue type name or id; resolved against the project's allowed types
    #[arg(long, short = 't', default_value = "Task")]
    pub issue_type: String,

    /// Due date: YYYY-MM-DD, nW (weeks from today) or nD (days from today)
    #[arg(long)]
    pub due_date: Option<String>,

    /// Label to add (repeatable)
    #[arg(long = "label", short = 'l')]
    pub labels: Vec<String>,

    /// Parent issue key
    #[arg(long)]
    pub parent: Option<String>,

    /// Link the new ticket to this issue
    #[arg(long)]
    pub link_to: Option<String>,

    /// Link type used with --link-to
    #[arg(long, default_value = DEFAULT_LINK_TYPE)]
    pub link_type: String,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

/// Issue types the project allows, from create metadata.
pub async fn fetch_issue_types(session: &JiraSession, project: &str) -> Result<Vec<JiraIssueType>> {
    let url = session.api_url(&f!(
        "issue/createmeta?projectKeys={}&expand=projects.issuetypes",
        urlencoding::encode(project)
    ));

    let response = session
        .client
        .get(&url)
        .send()
        .await
        .map_err(|e| eyre!("Failed to fetch create metadata: {}", e))?;

    let response = check_response(response, "Failed to fetch create metadata").await?;

    let meta: JiraCreateMetaResponse = response
        .json()
        .await
        .map_err(|e| eyre!("Failed to parse create metadata: {}", e))?;

    Ok(transform_create_meta(meta))
}

/// [`fetch_issue_types`], falling back to an empty list so resolution can still use names.
pub async fn allowed_issue_types(session: &JiraSession, project: &str) -> Vec<JiraIssueType> {
    match fetch_issue_types(session, project).await {
        Ok(types) => types,
        Err(e) => {
            log::warn!("Could not load issue types for {project}: {e}");
            Vec::new()
        }
    }
}

/// Send a create request and return the new issue key.
pub async fn create_issue(session: &JiraSession, request: &CreateIssueRequest) -> Result<String> {
    let payload = build_create_payload(request);
    log::debug!("Creating issue in {}: {}", request.project_key, payload);

    let response = session
        .client
        .post(session.api_url("issue"))
        .json(&payload)
        .send()
        .await
        .map_err(|e| eyre!("Failed to create ticket: {}", e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        return Err(eyre!(
            "Failed to create ticket [{}]:\n{}",
            status,
            collect_error_messages(&body)
        ));
    }

    #[derive(Deserialize)]
    struct CreateResponse {
        key: String,
    }

    let create_response: CreateResponse = response
        .json()
        .await
        .map_err(|e| eyre!("Failed to parse create response: {}", e))?;

    log::info!("Created {}", create_response.key);
    Ok(create_response.key)
}

/// Create ticket data - handles all I/O and Jira API interactions
pub async fn create_ticket_data(
    session: &JiraSession,
    options: CreateOptions,
) -> Result<TicketOutput> {
    let due_date = options
        .due_date
        .as_deref()
        .map(|expr| resolve_due_date(expr, chrono::Local::now().date_naive()))
        .transpose()?;

    let allowed = allowed_issue_types(session, &options.project).await;

    let request = CreateIssueRequest {
        issue_type: resolve_issue_type(Some(options.issue_type.as_str()), &allowed, None),
        project_key: options.project,
        summary: options.summary,
        description: options.description.map(text_document),
        due_date,
        labels: options.labels,
        parent_key: options.parent,
    };

    let key = create_issue(session, &request).await?;

    if let Some(target) = &options.link_to {
        // The ticket exists at this point, so a failed link only warns.
        if let Err(e) = super::link::link_issues(session, &options.link_type, &key, target).await {
            eprintln!("Warning: ticket created but linking to {target} failed: {e}");
        }
    }

    super::get::get_ticket_data(session, &key).await
}

/// CLI handler for create command
pub async fn handler(options: CreateOptions) -> Result<()> {
    let session = JiraSession::from_env()?;
    let json = options.json;
    let ticket = create_ticket_data(&session, options).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ticket)?);
    } else {
        println!(
            "\n{}",
            format!("Created ticket: {}", ticket.key).green().bold()
        );
        super::display_ticket(&ticket);
    }

    Ok(())
}
