use jiraclone_core::atlassian::jira::{
    transform_ticket_response, JiraComment, JiraIssueResponse, TicketOutput,
};
use serde::{Deserialize, Serialize};

use crate::atlassian::{check_response, JiraSession};
use crate::prelude::{println, *};

/// Options for getting a Jira ticket
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct GetOptions {
    /// Issue key (e.g., "PROJ-123")
    #[clap(env = "JIRA_ISSUE_KEY")]
    pub issue_key: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Fetch a single issue with all of its fields.
pub async fn fetch_issue(session: &JiraSession, issue_key: &str) -> Result<JiraIssueResponse> {
    let url = session.api_url(&f!("issue/{}", urlencoding::encode(issue_key)));

    let response = session
        .client
        .get(&url)
        .send()
        .await
        .map_err(|e| eyre!("Failed to send request to Jira: {}", e))?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(Error::IssueNotFound(issue_key.to_string()).into());
    }

    let response = check_response(response, "Failed to fetch Jira issue").await?;

    response
        .json::<JiraIssueResponse>()
        .await
        .map_err(|e| eyre!("Failed to parse Jira response: {}", e))
}

/// Fetch every comment on an issue, oldest first.
pub async fn fetch_comments(session: &JiraSession, issue_key: &str) -> Result<Vec<JiraComment>> {
    #[derive(Deserialize)]
    struct CommentsResponse {
        #[serde(default)]
        comments: Vec<JiraComment>,
    }

    let url = session.api_url(&f!("issue/{}/comment", urlencoding::encode(issue_key)));

    let response = session
        .client
        .get(&url)
        .send()
        .await
        .map_err(|e| eyre!("Failed to send request for Jira comments: {}", e))?;

    let response = check_response(response, "Failed to fetch Jira comments").await?;

    let comments: CommentsResponse = response
        .json()
        .await
        .map_err(|e| eyre!("Failed to parse Jira comments: {}", e))?;

    Ok(comments.comments)
}

/// Get detailed ticket information from Jira
pub async fn get_ticket_data(session: &JiraSession, issue_key: &str) -> Result<TicketOutput> {
    let issue = fetch_issue(session, issue_key).await?;

    // Comments are optional for display
    let comments = match fetch_comments(session, issue_key).await {
        Ok(comments) => comments,
        Err(e) => {
            log::warn!("Could not load comments for {issue_key}: {e}");
            Vec::new()
        }
    };

    Ok(transform_ticket_response(issue, comments))
}

/// Handle the get command
pub async fn handler(options: GetOptions) -> Result<()> {
    let session = JiraSession::from_env()?;
    let ticket = get_ticket_data(&session, &options.issue_key).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&ticket)?);
    } else {
        super::display_ticket(&ticket);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlassian::tests::test_session;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_ticket_data_combines_issue_and_comments() {
        // Arrange
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/issue/PROJ-1");
            then.status(200).json_body(json!({
                "key": "PROJ-1",
                "fields": {
                    "summary": "Crash on login",
                    "status": {"name": "Open"},
                    "issuelinks": [{
                        "type": {"name": "Relates"},
                        "inwardIssue": {"key": "PROJ-2", "fields": {"summary": "Other"}}
                    }]
                }
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/issue/PROJ-1/comment");
            then.status(200).json_body(json!({
                "comments": [{
                    "id": "100",
                    "body": "looks bad",
                    "created": "2024-01-01T00:00:00Z",
                    "author": {"displayName": "Ana"}
                }]
            }));
        });
        let session = test_session(&server);

        // Act
        let ticket = get_ticket_data(&session, "PROJ-1").await.expect("ticket");

        // Assert
        assert_eq!(ticket.summary, "Crash on login");
        assert_eq!(ticket.links.len(), 1);
        assert_eq!(ticket.links[0].issue_key, "PROJ-2");
        assert_eq!(ticket.comments.len(), 1);
    }

    #[tokio::test]
    async fn test_get_ticket_data_tolerates_comment_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/issue/PROJ-1");
            then.status(200)
                .json_body(json!({"key": "PROJ-1", "fields": {"summary": "S"}}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/issue/PROJ-1/comment");
            then.status(500).body("oops");
        });
        let session = test_session(&server);

        let ticket = get_ticket_data(&session, "PROJ-1").await.expect("ticket");

        assert!(ticket.comments.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_issue_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/issue/NOPE-1");
            then.status(404).json_body(json!({"errorMessages": ["Issue does not exist"]}));
        });
        let session = test_session(&server);

        let err = fetch_issue(&session, "NOPE-1").await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::IssueNotFound(key)) if key == "NOPE-1"
        ));
    }
}
