use std::path::PathBuf;

use colored::Colorize;
use jiraclone_core::atlassian::jira::{
    build_comment_payload, find_last_comment_containing, JiraComment,
};

use crate::atlassian::{check_response, JiraSession};
use crate::prelude::{eprintln, println, *};

/// Comment commands
#[derive(Debug, clap::Subcommand)]
pub enum CommentCommands {
    /// Add a plain text comment, optionally attaching a file first
    Add {
        /// Issue key
        key: String,

        /// Comment text
        text: String,

        /// File to attach to the issue before commenting
        #[arg(long)]
        file: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the newest comment containing some text
    Find {
        /// Issue key
        key: String,

        /// Text the comment must contain
        needle: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Post `text` as a new comment on `issue_key`.
pub async fn add_comment(session: &JiraSession, issue_key: &str, text: &str) -> Result<JiraComment> {
    let url = session.api_url(&f!("issue/{}/comment", urlencoding::encode(issue_key)));

    let response = session
        .client
        .post(&url)
        .json(&build_comment_payload(text))
        .send()
        .await
        .map_err(|e| eyre!("Failed to send comment: {}", e))?;

    let response = check_response(response, &f!("Failed to comment on {issue_key}")).await?;

    response
        .json::<JiraComment>()
        .await
        .map_err(|e| eyre!("Failed to parse comment response: {}", e))
}

/// Attach `file` to the issue, then post `text`.
///
/// The comment is only posted once the upload succeeded.
pub async fn add_comment_with_attachment(
    session: &JiraSession,
    issue_key: &str,
    text: &str,
    file: &std::path::Path,
) -> Result<JiraComment> {
    let uploaded =
        super::attachment::upload_files(session, issue_key, &[file.to_path_buf()]).await?;
    log::debug!("Uploaded {} file(s) to {issue_key}", uploaded.len());

    add_comment(session, issue_key, text).await
}

/// Text of the newest comment on `issue_key` containing `needle`.
pub async fn find_last_comment(
    session: &JiraSession,
    issue_key: &str,
    needle: &str,
) -> Result<Option<String>> {
    let comments = super::get::fetch_comments(session, issue_key).await?;
    Ok(find_last_comment_containing(&comments, needle))
}

/// Handle comment commands
pub async fn handler(cmd: CommentCommands) -> Result<()> {
    let session = JiraSession::from_env()?;

    match cmd {
        CommentCommands::Add {
            key,
            text,
            file,
            json,
        } => {
            let comment = match &file {
                Some(path) => add_comment_with_attachment(&session, &key, &text, path).await?,
                None => add_comment(&session, &key, &text).await?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&comment)?);
            } else {
                println!(
                    "{} {} {}",
                    "Added comment".green(),
                    comment.comment_id.bright_black(),
                    f!("to {key}").bold()
                );
            }
        }
        CommentCommands::Find { key, needle, json } => {
            let found = find_last_comment(&session, &key, &needle).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&found)?);
                return Ok(());
            }

            match found {
                Some(text) => println!("{text}"),
                None => eprintln!("No comment on {key} contains '{needle}'"),
            }
        }
    }

    Ok(())
}
