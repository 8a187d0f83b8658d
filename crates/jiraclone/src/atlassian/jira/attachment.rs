use std::path::{Path, PathBuf};

use colored::Colorize;
use jiraclone_core::atlassian::jira::{
    transform_attachment_response, AttachmentOutput, JiraAttachmentResponse, JiraIssueResponse,
};
use jiraclone_core::clone::AttachmentRecord;

use crate::atlassian::{check_response, JiraSession};
use crate::prelude::{eprintln, println, *};

/// Attachment subcommands
#[derive(Debug, clap::Subcommand)]
pub enum AttachmentCommands {
    /// List attachments on a Jira ticket
    #[clap(name = "list")]
    List {
        /// Issue key (e.g., PROJ-123)
        issue_key: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download an attachment by ID
    #[clap(name = "download")]
    Download {
        /// Issue key (e.g., PROJ-123)
        issue_key: String,

        /// Attachment ID
        attachment_id: String,

        /// Output file path (default: temp directory)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upload files as attachments to a ticket
    #[clap(name = "upload")]
    Upload {
        /// Issue key (e.g., PROJ-123)
        issue_key: String,

        /// File paths to upload
        files: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy every attachment of one ticket onto another
    #[clap(name = "copy")]
    Copy {
        /// Ticket to copy from
        source: String,

        /// Ticket to copy to
        target: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Raw attachment metadata of an issue (`fields=attachment`).
pub async fn fetch_issue_attachments(
    session: &JiraSession,
    issue_key: &str,
) -> Result<Vec<JiraAttachmentResponse>> {
    let url = session.api_url(&f!(
        "issue/{}?fields=attachment",
        urlencoding::encode(issue_key)
    ));

    let response = session
        .client
        .get(&url)
        .send()
        .await
        .map_err(|e| eyre!("Failed to fetch attachments: {e}"))?;

    let response = check_response(response, "Failed to fetch attachments").await?;

    let issue: JiraIssueResponse = response
        .json()
        .await
        .map_err(|e| eyre!("Failed to parse attachment response: {e}"))?;

    Ok(issue.fields.attachment)
}

/// List all attachments on a Jira ticket.
pub async fn list_attachments_data(
    session: &JiraSession,
    issue_key: &str,
) -> Result<Vec<AttachmentOutput>> {
    let raw = fetch_issue_attachments(session, issue_key).await?;
    Ok(transform_attachment_response(raw))
}

/// Body of an attachment's `content` URL.
pub async fn download_attachment_bytes(session: &JiraSession, content_url: &str) -> Result<Vec<u8>> {
    let response = session
        .client
        .get(content_url)
        .send()
        .await
        .map_err(|e| eyre!("Failed to download attachment: {e}"))?;

    let response = check_response(response, "Failed to download attachment").await?;

    let bytes = response
        .bytes()
        .await
        .map_err(|e| eyre!("Failed to read attachment content: {e}"))?;

    Ok(bytes.to_vec())
}

/// Download an attachment to disk. Returns the resolved output path.
pub async fn download_attachment_data(
    session: &JiraSession,
    issue_key: &str,
    attachment_id: &str,
    output: Option<PathBuf>,
) -> Result<PathBuf> {
    let attachment = fetch_issue_attachments(session, issue_key)
        .await?
        .into_iter()
        .find(|a| a.id == attachment_id)
        .ok_or_else(|| eyre!("Attachment {attachment_id} not found on {issue_key}"))?;

    let bytes = download_attachment_bytes(session, &attachment.content).await?;

    let out_path =
        output.unwrap_or_else(|| std::env::temp_dir().join(safe_file_name(&attachment.filename)));

    tokio::fs::write(&out_path, &bytes)
        .await
        .map_err(|e| eyre!("Failed to write file to {}: {e}", out_path.display()))?;

    Ok(out_path)
}

/// Upload files to `issue_key` in one multipart request.
pub async fn upload_files(
    session: &JiraSession,
    issue_key: &str,
    files: &[PathBuf],
) -> Result<Vec<JiraAttachmentResponse>> {
    if files.is_empty() {
        return Err(eyre!("At least one file path is required for upload"));
    }

    // Every file must exist before anything is sent
    for path in files {
        if !path.is_file() {
            return Err(eyre!("File not found: {}", path.display()));
        }
    }

    let mut form = reqwest::multipart::Form::new();
    for file_path in files {
        let filename = file_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let file_bytes = tokio::fs::read(file_path)
            .await
            .map_err(|e| eyre!("Failed to read {}: {e}", file_path.display()))?;

        let part = reqwest::multipart::Part::bytes(file_bytes)
            .mime_str(mime_from_extension(&filename))
            .map_err(|e| eyre!("Invalid MIME type: {e}"))?
            .file_name(filename);

        form = form.part("file", part);
    }

    let url = session.api_url(&f!(
        "issue/{}/attachments",
        urlencoding::encode(issue_key)
    ));

    let response = session
        .upload_client
        .post(&url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| eyre!("Failed to upload attachments: {e}"))?;

    let response = check_response(response, "Failed to upload attachments").await?;

    response
        .json()
        .await
        .map_err(|e| eyre!("Failed to parse upload response: {e}"))
}

/// Outcome of copying the attachments of one ticket
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct AttachmentCopy {
    pub copied: Vec<AttachmentRecord>,
    /// One message per file that could not be copied
    pub failures: Vec<String>,
}

/// Copy every attachment of `source_key` onto `target_key`.
///
/// Files are staged one at a time in a temporary directory. A file that fails
/// to download or upload is listed in `failures` and the rest are still copied.
pub async fn copy_attachments(
    session: &JiraSession,
    source_key: &str,
    target_key: &str,
) -> Result<AttachmentCopy> {
    let attachments = fetch_issue_attachments(session, source_key).await?;
    let mut result = AttachmentCopy::default();
    if attachments.is_empty() {
        return Ok(result);
    }

    let staging = tempfile::tempdir().map_err(|e| eyre!("Failed to create temp dir: {e}"))?;

    for attachment in attachments {
        match copy_one(session, &attachment, target_key, staging.path()).await {
            Ok(record) => {
                log::info!(
                    "Copied {} ({} -> {})",
                    record.filename,
                    record.old_id,
                    record.new_id
                );
                result.copied.push(record);
            }
            Err(e) => {
                let message = f!(
                    "Could not copy attachment {} to {target_key}: {e}",
                    attachment.filename
                );
                result.failures.push(message);
            }
        }
    }

    Ok(result)
}

async fn copy_one(
    session: &JiraSession,
    attachment: &JiraAttachmentResponse,
    target_key: &str,
    staging: &Path,
) -> Result<AttachmentRecord> {
    let bytes = download_attachment_bytes(session, &attachment.content).await?;

    let path = staging.join(safe_file_name(&attachment.filename));
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| eyre!("Failed to stage {}: {e}", path.display()))?;

    let uploaded = upload_files(session, target_key, std::slice::from_ref(&path)).await;

    // The staged copy is not needed once the upload has been attempted.
    if let Err(e) = tokio::fs::remove_file(&path).await {
        log::debug!("Could not remove {}: {e}", path.display());
    }

    let new = uploaded?
        .into_iter()
        .next()
        .ok_or_eyre("Upload response listed no attachments")?;

    Ok(AttachmentRecord {
        old_id: attachment.id.clone(),
        new_id: new.id,
        filename: attachment.filename.clone(),
        content_url: new.content,
    })
}

/// Last path component of an attachment name, so it cannot escape the target directory.
fn safe_file_name(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "attachment".to_string())
}

/// Infer MIME type from file extension.
fn mime_from_extension(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();

    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "txt" | "log" => "text/plain",
        "json" => "application/json",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Handle attachment subcommands.
pub async fn handler(cmd: AttachmentCommands) -> Result<()> {
    let session = JiraSession::from_env()?;

    match cmd {
        AttachmentCommands::List { issue_key, json } => {
            let attachments = list_attachments_data(&session, &issue_key).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&attachments)?);
            } else if attachments.is_empty() {
                eprintln!("No attachments found.");
            } else {
                let mut table = new_table();
                table.add_row(prettytable::row![
                    "ID".bold().cyan(),
                    "Filename".bold().cyan(),
                    "Size".bold().cyan(),
                    "Type".bold().cyan(),
                    "Created".bold().cyan()
                ]);
                for att in &attachments {
                    table.add_row(prettytable::row![
                        att.id.green().to_string(),
                        att.filename.bright_white().to_string(),
                        att.size_human.bright_yellow().to_string(),
                        att.mime_type.bright_blue().to_string(),
                        att.created.bright_black().to_string()
                    ]);
                }
                table.printstd();
            }
        }

        AttachmentCommands::Download {
            issue_key,
            attachment_id,
            output,
            json,
        } => {
            let path = download_attachment_data(&session, &issue_key, &attachment_id, output).await?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "path": path.display().to_string()
                    }))?
                );
            } else {
                println!("{} {}", "Downloaded to:".green().bold(), path.display());
            }
        }

        AttachmentCommands::Upload {
            issue_key,
            files,
            json,
        } => {
            let uploads =
                transform_attachment_response(upload_files(&session, &issue_key, &files).await?);

            if json {
                println!("{}", serde_json::to_string_pretty(&uploads)?);
            } else {
                println!(
                    "{}",
                    f!("Uploaded {} attachment(s):", uploads.len()).green().bold()
                );
                for att in &uploads {
                    println!("  - {} ({})", att.filename.bright_white(), att.size_human);
                }
            }
        }

        AttachmentCommands::Copy {
            source,
            target,
            json,
        } => {
            let result = copy_attachments(&session, &source, &target).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!(
                    "{}",
                    f!(
                        "Copied {} attachment(s) from {source} to {target}",
                        result.copied.len()
                    )
                    .green()
                    .bold()
                );
                for record in &result.copied {
                    println!(
                        "  - {} {}",
                        record.filename.bright_white(),
                        f!("({} -> {})", record.old_id, record.new_id).bright_black()
                    );
                }
                for failure in &result.failures {
                    eprintln!("{} {failure}", "Warning:".yellow());
                }
            }
        }
    }

    Ok(())
}
