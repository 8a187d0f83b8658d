use crate::prelude::{eprintln, println, *};
use serde::{Deserialize, Serialize};

use jiraclone_core::atlassian::jira::{
    build_search_request, extract_linked_issues, label_search_jql, summary_search_jql,
    transform_search_issues, JiraIssueResponse, JiraSearchResponse, SearchOutput,
    DEFAULT_SEARCH_FIELDS, MAX_SEARCH_RESULTS,
};
use jiraclone_core::clone::{is_already_cloned, CLONE_SUMMARY_PREFIX};

use crate::atlassian::{check_response, JiraSession};

/// Options for searching Jira issues
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
#[command(after_help = "EXAMPLES:
  # Search with raw JQL:
  jiraclone jira search \"project = PROJ AND status = Open\"

  # Issues in a project whose summary contains some text (reserved characters are escaped):
  jiraclone jira search --project PROJ --summary \"[UI] login (safari)\"

  # Issues in a project carrying a label:
  jiraclone jira search --project PROJ --label regression

  # Hide issues that already have a linked clone:
  jiraclone jira search \"project = PROJ\" --exclude-cloned

NOTES:
  - All pages are fetched; --page-size only controls the size of each request (max 100)
  - --summary and --label need --project")]
pub struct SearchOptions {
    /// JQL query (e.g., "project = PROJ AND status = Open")
    #[clap(env = "JIRA_QUERY")]
    pub jql_query: Option<String>,

    /// Project key used with --summary or --label
    #[arg(long)]
    pub project: Option<String>,

    /// Match issues whose summary contains this text
    #[arg(long, requires = "project", conflicts_with_all = ["jql_query", "label"])]
    pub summary: Option<String>,

    /// Match issues carrying this label
    #[arg(long, requires = "project", conflicts_with = "jql_query")]
    pub label: Option<String>,

    /// Drop issues that already link to a "Clone-...(KEY)" issue
    #[arg(long)]
    pub exclude_cloned: bool,

    /// Results per request
    #[arg(long, default_value_t = MAX_SEARCH_RESULTS)]
    pub page_size: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run a JQL search and follow `nextPageToken` until the last page.
pub async fn search_all(
    session: &JiraSession,
    jql: &str,
    fields: &[String],
    page_size: usize,
) -> Result<Vec<JiraIssueResponse>> {
    let url = session.api_url("search/jql");
    let mut issues = Vec::new();
    let mut next_page_token: Option<String> = None;

    loop {
        let payload = build_search_request(jql, fields, page_size, next_page_token.as_deref());

        let response = session
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| eyre!("Failed to send request to Jira: {}", e))?;

        let response = check_response(response, "Jira API error").await?;

        let page: JiraSearchResponse = response
            .json()
            .await
            .map_err(|e| eyre!("Failed to parse Jira response: {}", e))?;

        log::debug!("Fetched {} issue(s) for '{jql}'", page.issues.len());
        issues.extend(page.issues);

        match page.next_page_token {
            Some(token) if !token.is_empty() && page.is_last != Some(true) => {
                next_page_token = Some(token)
            }
            _ => break,
        }
    }

    Ok(issues)
}

fn default_fields() -> Vec<String> {
    DEFAULT_SEARCH_FIELDS.iter().map(|f| f.to_string()).collect()
}

/// Issues in `project` whose summary contains `summary`.
pub async fn search_by_summary(
    session: &JiraSession,
    project: &str,
    summary: &str,
) -> Result<Vec<JiraIssueResponse>> {
    let jql = summary_search_jql(project, summary);
    search_all(session, &jql, &default_fields(), MAX_SEARCH_RESULTS).await
}

/// Issues in `project` carrying `label`.
pub async fn search_by_label(
    session: &JiraSession,
    project: &str,
    label: &str,
) -> Result<Vec<JiraIssueResponse>> {
    let jql = label_search_jql(project, label);
    search_all(session, &jql, &default_fields(), MAX_SEARCH_RESULTS).await
}

/// Search `jql` and drop issues that already have a linked clone named with `head`.
pub async fn search_except_cloned(
    session: &JiraSession,
    jql: &str,
    head: &str,
    page_size: usize,
) -> Result<Vec<JiraIssueResponse>> {
    let mut fields = default_fields();
    fields.push("issuelinks".to_string());

    let issues = search_all(session, jql, &fields, page_size).await?;
    let total = issues.len();

    let remaining: Vec<_> = issues
        .into_iter()
        .filter(|issue| {
            let linked = extract_linked_issues(&issue.fields);
            let cloned = is_already_cloned(&issue.key, &linked, head);
            if cloned {
                log::info!("{} already has a linked clone, skipping", issue.key);
            }
            !cloned
        })
        .collect();

    log::debug!("{} of {total} issue(s) not cloned yet", remaining.len());
    Ok(remaining)
}

/// Public data function for the search command
pub async fn search_issues_data(
    session: &JiraSession,
    options: &SearchOptions,
) -> Result<SearchOutput> {
    let issues = match (&options.project, &options.summary, &options.label) {
        (Some(project), Some(summary), _) => search_by_summary(session, project, summary).await?,
        (Some(project), None, Some(label)) => search_by_label(session, project, label).await?,
        _ => {
            let jql = options
                .jql_query
                .as_deref()
                .ok_or_else(|| eyre!("Provide a JQL query, or --project with --summary or --label"))?;

            if options.exclude_cloned {
                search_except_cloned(session, jql, CLONE_SUMMARY_PREFIX, options.page_size).await?
            } else {
                search_all(session, jql, &default_fields(), options.page_size).await?
            }
        }
    };

    Ok(transform_search_issues(issues))
}

/// Handle the search command
pub async fn handler(options: SearchOptions) -> Result<()> {
    let session = JiraSession::from_env()?;
    let data = search_issues_data(&session, &options).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if data.issues.is_empty() {
        eprintln!("No issues found.");
        return Ok(());
    }

    println!("Found {} issue(s):\n", data.total);

    let mut table = new_table();
    table.add_row(prettytable::row!["Key", "Summary", "Status", "Assignee"]);

    for issue in &data.issues {
        table.add_row(prettytable::row![
            &issue.key,
            &issue.summary,
            &issue.status,
            issue.assignee.as_deref().unwrap_or("Unassigned")
        ]);
    }

    table.printstd();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlassian::tests::test_session;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_search_all_follows_page_tokens() {
        // Arrange
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/api/3/search/jql")
                .body_includes("\"jql\":\"project = PROJ\"")
                .body_excludes("nextPageToken");
            then.status(200).json_body(json!({
                "issues": [{"key": "PROJ-1", "fields": {"summary": "One"}}],
                "nextPageToken": "page-2"
            }));
        });
        let second = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/api/3/search/jql")
                .body_includes("\"nextPageToken\":\"page-2\"");
            then.status(200).json_body(json!({
                "issues": [{"key": "PROJ-2", "fields": {"summary": "Two"}}],
                "isLast": true
            }));
        });
        let session = test_session(&server);

        // Act
        let issues = search_all(&session, "project = PROJ", &default_fields(), 100)
            .await
            .expect("search");

        // Assert
        let keys: Vec<_> = issues.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["PROJ-1", "PROJ-2"]);
        first.assert_calls(1);
        second.assert_calls(1);
    }

    #[tokio::test]
    async fn test_search_all_surfaces_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rest/api/3/search/jql");
            then.status(400)
                .json_body(json!({"errorMessages": ["Error in the JQL Query"]}));
        });
        let session = test_session(&server);

        let err = search_all(&session, "bad jql (", &default_fields(), 100)
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Jira API error [400 Bad Request]"));
    }

    #[tokio::test]
    async fn test_search_except_cloned_filters_linked_clones() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/rest/api/3/search/jql")
                .body_includes("issuelinks");
            then.status(200).json_body(json!({
                "issues": [
                    {
                        "key": "SRC-1",
                        "fields": {
                            "summary": "Already cloned",
                            "issuelinks": [{
                                "type": {"name": "Relates"},
                                "inwardIssue": {"key": "DEST-5", "fields": {"summary": "Clone-Already cloned(SRC-1)"}}
                            }]
                        }
                    },
                    {"key": "SRC-2", "fields": {"summary": "Fresh", "issuelinks": []}}
                ]
            }));
        });
        let session = test_session(&server);

        let issues = search_except_cloned(&session, "project = SRC", CLONE_SUMMARY_PREFIX, 100)
            .await
            .expect("search");

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].key, "SRC-2");
    }

    #[tokio::test]
    async fn test_search_by_summary_sends_escaped_jql() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/api/3/search/jql")
                .body_includes("project = \\\"DEST\\\" AND summary ~")
                .body_includes("crash\\\\\\\\(SRC-1");
            then.status(200).json_body(json!({"issues": []}));
        });
        let session = test_session(&server);

        let issues = search_by_summary(&session, "DEST", "Clone-[UI] crash(SRC-1)")
            .await
            .expect("search");

        assert!(issues.is_empty());
        mock.assert();
    }
}
