//! Issue links

use colored::Colorize;
use jiraclone_core::atlassian::jira::{
    build_link_payload, extract_linked_issues, JiraIssueLinkType, JiraIssueLinkTypesResponse,
    JiraIssueResponse, LinkedIssue, DEFAULT_LINK_TYPE,
};

use crate::atlassian::{check_response, JiraSession};
use crate::prelude::{eprintln, println, *};

/// Link commands
#[derive(Debug, clap::Subcommand)]
pub enum LinkCommands {
    /// Link two issues ("INWARD <type> OUTWARD", e.g. "DEST-1 relates to SRC-1")
    Add {
        /// Inward issue key
        inward: String,

        /// Outward issue key
        outward: String,

        /// Link type name
        #[arg(long = "type", short = 't', default_value = DEFAULT_LINK_TYPE)]
        link_type: String,
    },

    /// List the link types this Jira instance knows
    Types {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the issues linked to an issue
    List {
        /// Issue key
        key: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Create a `link_type` link between two issues.
pub async fn link_issues(
    session: &JiraSession,
    link_type: &str,
    inward_key: &str,
    outward_key: &str,
) -> Result<()> {
    let payload = build_link_payload(link_type, inward_key, outward_key);

    let response = session
        .client
        .post(session.api_url("issueLink"))
        .json(&payload)
        .send()
        .await
        .map_err(|e| eyre!("Failed to send link request: {}", e))?;

    check_response(
        response,
        &f!("Failed to link {inward_key} to {outward_key}"),
    )
    .await?;

    log::info!("Linked {inward_key} -> {outward_key} ({link_type})");
    Ok(())
}

pub async fn fetch_link_types(session: &JiraSession) -> Result<Vec<JiraIssueLinkType>> {
    let response = session
        .client
        .get(session.api_url("issueLinkType"))
        .send()
        .await
        .map_err(|e| eyre!("Failed to fetch link types: {}", e))?;

    let response = check_response(response, "Failed to fetch link types").await?;

    let types: JiraIssueLinkTypesResponse = response
        .json()
        .await
        .map_err(|e| eyre!("Failed to parse link types: {}", e))?;

    Ok(types.issue_link_types)
}

/// Issues linked to `issue_key`, in both directions.
pub async fn linked_issues(session: &JiraSession, issue_key: &str) -> Result<Vec<LinkedIssue>> {
    let url = session.api_url(&f!(
        "issue/{}?fields=issuelinks",
        urlencoding::encode(issue_key)
    ));

    let response = session
        .client
        .get(&url)
        .send()
        .await
        .map_err(|e| eyre!("Failed to fetch links: {}", e))?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(Error::IssueNotFound(issue_key.to_string()).into());
    }

    let response = check_response(response, "Failed to fetch links").await?;

    let issue: JiraIssueResponse = response
        .json()
        .await
        .map_err(|e| eyre!("Failed to parse links: {}", e))?;

    Ok(extract_linked_issues(&issue.fields))
}

/// Handle link commands
pub async fn handler(cmd: LinkCommands) -> Result<()> {
    let session = JiraSession::from_env()?;

    match cmd {
        LinkCommands::Add {
            inward,
            outward,
            link_type,
        } => {
            link_issues(&session, &link_type, &inward, &outward).await?;
            println!(
                "{} {} {} {}",
                "Linked".green(),
                inward.bold(),
                f!("({link_type})").bright_black(),
                outward.bold()
            );
        }
        LinkCommands::Types { json } => {
            let types = fetch_link_types(&session).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&types)?);
                return Ok(());
            }

            let mut table = new_table();
            table.add_row(prettytable::row!["Name", "Inward", "Outward"]);
            for link_type in &types {
                table.add_row(prettytable::row![
                    &link_type.name,
                    link_type.inward.as_deref().unwrap_or("-"),
                    link_type.outward.as_deref().unwrap_or("-")
                ]);
            }
            table.printstd();
        }
        LinkCommands::List { key, json } => {
            let links = linked_issues(&session, &key).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&links)?);
                return Ok(());
            }

            if links.is_empty() {
                eprintln!("{key} has no links.");
                return Ok(());
            }

            let mut table = new_table();
            table.add_row(prettytable::row!["Type", "Direction", "Key", "Summary"]);
            for link in &links {
                table.add_row(prettytable::row![
                    &link.link_type,
                    link.direction.to_string(),
                    &link.issue_key,
                    &link.summary
                ]);
            }
            table.printstd();
        }
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
    async fn test_link_issues_posts_both_keys() {
        // Arrange
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/rest/api/3/issueLink").json_body(json!({
                "type": {"name": "Relates"},
                "inwardIssue": {"key": "DEST-1"},
                "outwardIssue": {"key": "SRC-1"}
            }));
            then.status(201);
        });
        let session = test_session(&server);

        // Act
        link_issues(&session, "Relates", "DEST-1", "SRC-1")
            .await
            .expect("link");

        // Assert
        mock.assert();
    }

    #[tokio::test]
    async fn test_link_issues_reports_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rest/api/3/issueLink");
            then.status(404).body("No issue link type named 'Nope'");
        });
        let session = test_session(&server);

        let err = link_issues(&session, "Nope", "DEST-1", "SRC-1")
            .await
            .unwrap_err();

        assert!(err
            .to_string()
            .starts_with("Failed to link DEST-1 to SRC-1 [404 Not Found]"));
    }

    #[tokio::test]
    async fn test_fetch_link_types() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/issueLinkType");
            then.status(200).json_body(json!({
                "issueLinkTypes": [
                    {"id": "10000", "name": "Blocks", "inward": "is blocked by", "outward": "blocks"},
                    {"id": "10003", "name": "Relates", "inward": "relates to", "outward": "relates to"}
                ]
            }));
        });
        let session = test_session(&server);

        let types = fetch_link_types(&session).await.expect("types");

        let names: Vec<_> = types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Blocks", "Relates"]);
    }

    #[tokio::test]
    async fn test_linked_issues_reads_both_directions() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/rest/api/3/issue/SRC-1")
                .query_param("fields", "issuelinks");
            then.status(200).json_body(json!({
                "key": "SRC-1",
                "fields": {"issuelinks": [
                    {"type": {"name": "Relates"}, "inwardIssue": {"key": "DEST-1", "fields": {"summary": "Clone-A(SRC-1)"}}},
                    {"type": {"name": "Blocks"}, "outwardIssue": {"key": "SRC-7", "fields": {"summary": "B"}}}
                ]}
            }));
        });
        let session = test_session(&server);

        let links = linked_issues(&session, "SRC-1").await.expect("links");

        let keys: Vec<_> = links.iter().map(|l| l.issue_key.as_str()).collect();
        assert_eq!(keys, vec!["DEST-1", "SRC-7"]);
    }
}
