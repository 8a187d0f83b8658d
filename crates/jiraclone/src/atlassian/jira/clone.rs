//! Clone Jira tickets into another project
//!
//! Each selected ticket is created in the target project with a text-only
//! description, linked back to its source, given copies of the source
//! attachments, and finally updated with the source description where media
//! nodes have been replaced by links to the copied files.

use std::path::{Path, PathBuf};

use clap::Args;
use colored::Colorize;
use jiraclone_core::atlassian::jira::{resolve_issue_type, CreateIssueRequest, JiraIssueResponse};
use jiraclone_core::clone::{
    attachment_map, create_time_description, make_clone_summary, rewritten_description,
    AttachmentRecord, CLONE_SUMMARY_PREFIX,
};
use jiraclone_core::selection::parse_selection;
use jiraclone_core::settings::{parse_settings, CloneSettings, CloneSource, ResolvedCloneSettings};
use jiraclone_core::translate::{translate_if_japanese, Translator};
use serde::Serialize;
use tokio::io::AsyncBufRead;

use crate::atlassian::{load_env_file, resolve_env_file, JiraSession};
use crate::prelude::{eprintln, println, *};
use crate::prompt::{confirm, prompt_line};
use crate::translate::GoogleTranslator;

/// Clone tickets into another project
#[derive(Args, Debug, Clone, Default)]
#[command(after_help = "EXAMPLES:
  # Pick tickets from a JQL search and clone them into DEST:
  jiraclone jira clone --jql \"project = SRC AND status = Open\" -p DEST -l qa -t Bug --due-date 2W

  # Clone a single ticket without prompting:
  jiraclone jira clone -k SRC-123 -p DEST -l qa -t Task --due-date 2025-01-31 --yes

  # Read settings from a JSON file; flags override it:
  jiraclone jira clone -c clone.json --due-date 5D

NOTES:
  - Required after merging file and flags: jql or issue_key, project, label, due date, issue type
  - Tickets that already have a linked clone are not offered in JQL mode
  - Japanese text in summaries is translated to Korean unless --no-translate is given")]
pub struct CloneOptions {
    /// JSON settings file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// JQL selecting candidate tickets
    #[arg(long)]
    pub jql: Option<String>,

    /// Clone this single ticket (takes precedence over --jql)
    #[arg(long, short = 'k')]
    pub issue_key: Option<String>,

    /// Target project key
    #[arg(long = "project", short = 'p')]
    pub clone_project_key: Option<String>,

    /// Labels for the clones
    #[arg(long = "label", short = 'l', num_args = 1..)]
    pub clone_labels: Vec<String>,

    /// Models for the clones
    #[arg(long = "model", num_args = 1..)]
    pub clone_models: Vec<String>,

    /// Due date: YYYY-MM-DD, nW (weeks from today) or nD (days from today)
    #[arg(long)]
    pub due_date: Option<String>,

    /// Issue type name or id
    #[arg(long, short = 't')]
    pub issue_type: Option<String>,

    /// Parent issue key for the clones
    #[arg(long)]
    pub parent_key: Option<String>,

    /// Link type between clone and source (default: Relates)
    #[arg(long)]
    pub link_type: Option<String>,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Keep summaries as they are
    #[arg(long)]
    pub no_translate: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CloneOptions {
    fn cli_settings(&self) -> CloneSettings {
        let list = |values: &Vec<String>| (!values.is_empty()).then(|| values.clone());

        CloneSettings {
            jql: self.jql.clone(),
            issue_key: self.issue_key.clone(),
            clone_project_key: self.clone_project_key.clone(),
            clone_label: list(&self.clone_labels),
            clone_models: list(&self.clone_models),
            due_date: self.due_date.clone(),
            issue_type: self.issue_type.clone(),
            parent_key: self.parent_key.clone(),
            link_type: self.link_type.clone(),
            env: None,
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CloneStatus {
    Created,
    Skipped,
    Failed,
}

/// What happened to one source ticket
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CloneReport {
    pub source_key: String,
    pub summary: String,
    pub status: CloneStatus,
    pub new_key: Option<String>,
    pub attachments: Vec<AttachmentRecord>,
    pub warnings: Vec<String>,
}

impl CloneReport {
    fn new(source_key: &str, summary: &str, status: CloneStatus) -> Self {
        Self {
            source_key: source_key.to_string(),
            summary: summary.to_string(),
            status,
            new_key: None,
            attachments: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Tickets offered for cloning
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    pub issues: Vec<JiraIssueResponse>,
    /// The issues were read with every field, not just the search columns
    pub complete: bool,
}

/// A created clone and the non-fatal problems met along the way
#[derive(Debug, Clone, PartialEq)]
pub struct ClonedIssue {
    pub new_key: String,
    pub attachments: Vec<AttachmentRecord>,
    pub warnings: Vec<String>,
}

/// Read a JSON settings file.
pub async fn read_settings_file(path: &Path) -> Result<CloneSettings> {
    if !path.is_file() {
        return Err(Error::ConfigFileNotFound(path.to_path_buf()).into());
    }

    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| eyre!("Failed to read {}: {e}", path.display()))?;

    parse_settings(&text).map_err(|e| eyre!("Invalid settings in {}: {e}", path.display()))
}

/// `Clone-{summary}({key})`, with Japanese runs translated when a translator is given.
pub async fn clone_summary<T: Translator>(
    translator: Option<&T>,
    summary: &str,
    source_key: &str,
) -> String {
    let summary = match translator {
        Some(translator) => translate_if_japanese(translator, summary).await,
        None => summary.to_string(),
    };

    make_clone_summary(&summary, source_key)
}

/// Create one clone of the fully fetched `source` issue.
///
/// Only a failure to create the issue is an error. Later steps (link,
/// attachments, description) add warnings instead.
pub async fn clone_issue(
    session: &JiraSession,
    source: &JiraIssueResponse,
    summary: &str,
    settings: &ResolvedCloneSettings,
) -> Result<ClonedIssue> {
    let source_key = source.key.as_str();
    let description = source.fields.description.as_ref();

    let allowed = super::create::allowed_issue_types(session, &settings.clone_project_key).await;
    let issue_type = resolve_issue_type(
        Some(settings.issue_type.as_str()),
        &allowed,
        source.fields.issuetype.as_ref(),
    );

    let request = CreateIssueRequest {
        project_key: settings.clone_project_key.clone(),
        summary: summary.to_string(),
        issue_type,
        description: Some(create_time_description(description, source_key)),
        due_date: Some(settings.due_date.clone()),
        labels: settings.clone_labels.clone(),
        parent_key: settings.parent_key.clone(),
    };

    let new_key = super::create::create_issue(session, &request).await?;
    let mut warnings = Vec::new();
    let mut warn = |message: String| {
        log::warn!("{message}");
        warnings.push(message);
    };

    if let Err(e) = super::link::link_issues(session, &settings.link_type, &new_key, source_key).await
    {
        warn(f!("Could not link {new_key} to {source_key}: {e}"));
    }

    let attachments = match super::attachment::copy_attachments(session, source_key, &new_key).await
    {
        Ok(copy) => {
            for failure in copy.failures {
                warn(failure);
            }
            copy.copied
        }
        Err(e) => {
            warn(f!("Could not copy attachments of {source_key}: {e}"));
            Vec::new()
        }
    };

    if let Some(doc) = rewritten_description(description, &attachment_map(&attachments)) {
        if let Err(e) = super::update::update_description(session, &new_key, &doc).await {
            warn(f!("Could not update the description of {new_key}: {e}"));
        }
    }

    Ok(ClonedIssue {
        new_key,
        attachments,
        warnings,
    })
}

/// Read the full source issue unless the candidate already is one, then clone it.
async fn clone_candidate(
    session: &JiraSession,
    issue: &JiraIssueResponse,
    complete: bool,
    summary: &str,
    settings: &ResolvedCloneSettings,
) -> Result<ClonedIssue> {
    if complete {
        return clone_issue(session, issue, summary, settings).await;
    }

    let source = super::get::fetch_issue(session, &issue.key).await?;
    clone_issue(session, &source, summary, settings).await
}

/// Clone the candidates one after the other, skipping any whose clone summary already exists.
pub async fn clone_tickets<T: Translator>(
    session: &JiraSession,
    settings: &ResolvedCloneSettings,
    candidates: &Candidates,
    translator: Option<&T>,
) -> Vec<CloneReport> {
    let mut reports = Vec::with_capacity(candidates.issues.len());

    for issue in &candidates.issues {
        let summary = clone_summary(translator, &issue.fields.summary, &issue.key).await;

        let existing =
            super::search::search_by_summary(session, &settings.clone_project_key, &summary).await;

        let report = match existing {
            Ok(found) if !found.is_empty() => {
                log::info!("{summary} already exists in {}", settings.clone_project_key);
                let mut report = CloneReport::new(&issue.key, &summary, CloneStatus::Skipped);
                report.warnings.push(f!(
                    "{} already has an issue with this summary ({})",
                    settings.clone_project_key,
                    found[0].key
                ));
                report
            }
            Ok(_) => match clone_candidate(session, issue, candidates.complete, &summary, settings)
                .await
            {
                Ok(cloned) => CloneReport {
                    new_key: Some(cloned.new_key),
                    attachments: cloned.attachments,
                    warnings: cloned.warnings,
                    ..CloneReport::new(&issue.key, &summary, CloneStatus::Created)
                },
                Err(e) => {
                    let mut report = CloneReport::new(&issue.key, &summary, CloneStatus::Failed);
                    report.warnings.push(e.to_string());
                    report
                }
            },
            Err(e) => {
                let mut report = CloneReport::new(&issue.key, &summary, CloneStatus::Failed);
                report
                    .warnings
                    .push(f!("Could not check for an existing clone: {e}"));
                report
            }
        };

        reports.push(report);
    }

    reports
}

fn print_candidates(issues: &[JiraIssueResponse]) {
    for (index, issue) in issues.iter().enumerate() {
        println!(
            "{} {} - {}",
            f!("{}.", index + 1).green(),
            issue.key.bold(),
            issue.fields.summary
        );
    }
    println!("{}", "--------------------------------".bright_black());
    println!("{} ticket(s)", issues.len());
}

/// Show the numbered candidates and keep the ones the user picks.
pub async fn select_candidates<R>(
    reader: &mut R,
    issues: Vec<JiraIssueResponse>,
) -> Result<Vec<JiraIssueResponse>>
where
    R: AsyncBufRead + Unpin,
{
    print_candidates(&issues);

    let input = prompt_line(reader, "Tickets to clone (e.g. 1,3,4): ").await?;
    let selection = parse_selection(&input, issues.len());

    for warning in &selection.warnings {
        eprintln!("{} {warning}", "Warning:".yellow());
    }

    Ok(selection
        .indices
        .iter()
        .filter_map(|&index| issues.get(index).cloned())
        .collect())
}

async fn gather_candidates<R>(
    session: &JiraSession,
    source: &CloneSource,
    reader: &mut R,
) -> Result<Candidates>
where
    R: AsyncBufRead + Unpin,
{
    match source {
        CloneSource::IssueKey(key) => {
            eprintln!("Cloning single ticket {}", key.bold());
            Ok(Candidates {
                issues: vec![super::get::fetch_issue(session, key).await?],
                complete: true,
            })
        }
        CloneSource::Jql(jql) => {
            let spinner = new_spinner("Searching for tickets...")?;
            let issues = super::search::search_except_cloned(
                session,
                jql,
                CLONE_SUMMARY_PREFIX,
                jiraclone_core::atlassian::jira::MAX_SEARCH_RESULTS,
            )
            .await;
            spinner.finish_and_clear();
            let issues = issues?;

            if issues.is_empty() {
                return Ok(Candidates::default());
            }

            Ok(Candidates {
                issues: select_candidates(reader, issues).await?,
                complete: false,
            })
        }
    }
}

fn print_reports(reports: &[CloneReport]) {
    let mut table = new_table();
    table.add_row(prettytable::row!["Source", "Clone", "Status", "Summary"]);

    for report in reports {
        let status = match report.status {
            CloneStatus::Created => "created".green(),
            CloneStatus::Skipped => "skipped".yellow(),
            CloneStatus::Failed => "failed".red(),
        };
        table.add_row(prettytable::row![
            &report.source_key,
            report.new_key.as_deref().unwrap_or("-"),
            status.to_string(),
            &report.summary
        ]);
    }

    table.printstd();

    for report in reports {
        for warning in &report.warnings {
            eprintln!("{} {}: {warning}", "Warning:".yellow(), report.source_key);
        }
    }
}

/// Handle the clone command
pub async fn handler(options: CloneOptions, global: crate::Global) -> Result<()> {
    let file_settings = match &options.config {
        Some(path) => read_settings_file(path).await?,
        None => CloneSettings::default(),
    };
    let merged = file_settings.merge(options.cli_settings());

    // main skips the .env load when a settings file is given
    if options.config.is_some() {
        let env_file = resolve_env_file(global.env.as_deref(), merged.env.as_deref());
        if let Some(path) = load_env_file(env_file.as_deref())? {
            log::debug!("Loaded environment from {}", path.display());
        }
    }

    let settings = merged.validate(chrono::Local::now().date_naive())?;
    log::debug!("Clone settings: {settings:?}");

    let session = JiraSession::from_env()?;
    let mut input = crate::prompt::stdin();

    let selected = gather_candidates(&session, &settings.source, &mut input).await?;
    if selected.issues.is_empty() {
        eprintln!("No tickets to clone.");
        return Ok(());
    }

    if !options.yes {
        println!("\nSelected:");
        print_candidates(&selected.issues);

        if !confirm(&mut input, "Create the clones?").await? {
            eprintln!("Cancelled.");
            return Ok(());
        }
    }

    let translator = if options.no_translate {
        None
    } else {
        Some(GoogleTranslator::new()?)
    };

    let spinner = new_spinner(f!(
        "Cloning {} ticket(s) into {}...",
        selected.issues.len(),
        settings.clone_project_key
    ))?;
    let reports = clone_tickets(&session, &settings, &selected, translator.as_ref()).await;
    spinner.finish_and_clear();

    if options.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_reports(&reports);
    }

    Ok(())
}
