//! Transformation functions for Jira API responses and request payloads

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::adf::{text_document, AdfNode};

/// Fields requested by a search when the caller does not pick any.
pub const DEFAULT_SEARCH_FIELDS: [&str; 3] = ["summary", "status", "assignee"];

/// Largest page size accepted by `POST /rest/api/3/search/jql`.
pub const MAX_SEARCH_RESULTS: usize = 100;

/// Link type used when none is given.
pub const DEFAULT_LINK_TYPE: &str = "Relates";

/// Issue type used when nothing else resolves.
pub const DEFAULT_ISSUE_TYPE: &str = "Task";

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Jira issue response from API
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraIssueResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub key: String,
    #[serde(default)]
    pub fields: JiraIssueFields,
}

/// Fields from Jira issue. Every field is optional because searches only
/// return the fields they ask for.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct JiraIssueFields {
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default)]
    pub description: Option<Value>, // Can be a string or ADF (Atlassian Document Format)
    #[serde(default)]
    pub status: Option<JiraStatus>,
    #[serde(default)]
    pub assignee: Option<JiraAssignee>,
    #[serde(default)]
    pub priority: Option<JiraPriority>,
    #[serde(default)]
    pub issuetype: Option<JiraIssueType>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub duedate: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub issuelinks: Vec<JiraIssueLink>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachment: Vec<JiraAttachmentResponse>,
}

/// Jira status field
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraStatus {
    pub name: String,
}

/// Jira assignee field
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct JiraAssignee {
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(default)]
    #[serde(rename = "emailAddress")]
    pub email_address: Option<String>,
}

/// Jira priority field
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraPriority {
    #[serde(default)]
    pub name: String,
}

/// Jira issue type, as found on an issue or in project create metadata
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct JiraIssueType {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One entry of an issue's `issuelinks` field
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraIssueLink {
    #[serde(rename = "type")]
    pub link_type: JiraIssueLinkType,
    #[serde(rename = "inwardIssue", default)]
    pub inward_issue: Option<JiraLinkedIssue>,
    #[serde(rename = "outwardIssue", default)]
    pub outward_issue: Option<JiraLinkedIssue>,
}

/// Issue link type (e.g. "Relates", "Blocks")
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct JiraIssueLinkType {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub inward: Option<String>,
    #[serde(default)]
    pub outward: Option<String>,
}

/// Response of `GET /rest/api/3/issueLinkType`
#[derive(Debug, Deserialize, Clone)]
pub struct JiraIssueLinkTypesResponse {
    #[serde(rename = "issueLinkTypes", default)]
    pub issue_link_types: Vec<JiraIssueLinkType>,
}

/// The issue on the other end of a link
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraLinkedIssue {
    pub key: String,
    #[serde(default)]
    pub fields: Option<JiraLinkedIssueFields>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraLinkedIssueFields {
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
}

/// Attachment metadata as returned by Jira
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct JiraAttachmentResponse {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(default)]
    pub created: String,
    /// Download URL
    #[serde(default)]
    pub content: String,
}

/// Search response from Jira API
/// The POST /rest/api/3/search/jql endpoint returns this structure
#[derive(Debug, Deserialize, Clone)]
pub struct JiraSearchResponse {
    #[serde(default)]
    pub issues: Vec<JiraIssueResponse>,
    #[serde(default)]
    #[serde(rename = "isLast")]
    pub is_last: Option<bool>,
    #[serde(default)]
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// Project create metadata (`GET /rest/api/3/issue/createmeta`)
#[derive(Debug, Deserialize, Clone, Default)]
pub struct JiraCreateMetaResponse {
    #[serde(default)]
    pub projects: Vec<JiraCreateMetaProject>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct JiraCreateMetaProject {
    #[serde(default)]
    pub issuetypes: Vec<JiraIssueType>,
}

/// Comment on a Jira ticket
#[derive(Debug, Serialize, Clone, Deserialize, PartialEq)]
pub struct JiraComment {
    #[serde(rename = "id")]
    pub comment_id: String,
    #[serde(rename = "body")]
    pub body: Value,
    #[serde(rename = "created")]
    pub created_at: String,
    pub author: Option<JiraAssignee>,
}

/// Output structure for a single issue
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IssueOutput {
    pub key: String,
    pub summary: String,
    pub description: Option<String>,
    pub status: String,
    pub assignee: Option<String>,
}

/// Output structure for search command
#[derive(Debug, Serialize, PartialEq)]
pub struct SearchOutput {
    pub issues: Vec<IssueOutput>,
    pub total: usize,
}

/// Direction of an issue link relative to the issue it was read from
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinkDirection {
    Inward,
    Outward,
}

impl std::fmt::Display for LinkDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkDirection::Inward => write!(f, "inward"),
            LinkDirection::Outward => write!(f, "outward"),
        }
    }
}

/// A linked issue, flattened for display
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LinkedIssue {
    pub link_type: String,
    pub direction: LinkDirection,
    pub issue_key: String,
    pub summary: String,
}

/// Attachment as presented to the user
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AttachmentOutput {
    pub id: String,
    pub filename: String,
    pub size: u64,
    pub size_human: String,
    pub mime_type: String,
    pub created: String,
    pub content_url: String,
}

/// Output structure for detailed ticket information
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TicketOutput {
    pub key: String,
    pub summary: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: Option<String>,
    pub issue_type: Option<String>,
    pub assignee: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub due_date: Option<String>,
    pub labels: Vec<String>,
    pub links: Vec<LinkedIssue>,
    pub attachments: Vec<AttachmentOutput>,
    pub comments: Vec<JiraComment>,
}

/// Issue type reference sent on create: by id when known, otherwise by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueTypeRef {
    Id(String),
    Name(String),
}

impl IssueTypeRef {
    pub fn to_value(&self) -> Value {
        match self {
            IssueTypeRef::Id(id) => json!({ "id": id }),
            IssueTypeRef::Name(name) => json!({ "name": name }),
        }
    }

    fn from_allowed(issue_type: &JiraIssueType) -> Option<Self> {
        match (&issue_type.id, &issue_type.name) {
            (Some(id), _) => Some(IssueTypeRef::Id(id.clone())),
            (None, Some(name)) => Some(IssueTypeRef::Name(name.clone())),
            (None, None) => None,
        }
    }
}

/// Everything needed to build a `POST /rest/api/3/issue` body
#[derive(Debug, Clone)]
pub struct CreateIssueRequest {
    pub project_key: String,
    pub summary: String,
    pub issue_type: IssueTypeRef,
    pub description: Option<AdfNode>,
    pub due_date: Option<String>,
    pub labels: Vec<String>,
    pub parent_key: Option<String>,
}

/// Extract description from Jira field (handles both string and ADF)
///
/// Jira descriptions can be either plain strings or ADF (Atlassian Document Format) JSON.
/// ADF documents are rendered to readable text with [`render_adf`].
pub fn extract_description(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        v @ Value::Object(_) if v.get("type").and_then(Value::as_str) == Some("doc") => {
            render_adf(&AdfNode::from_value(v))
        }
        _ => None,
    }
}

/// Render an ADF document to readable text
///
/// Paragraphs end with a newline, list items are bulleted and indented by depth,
/// and media references show as `[attachment: name]`.
pub fn render_adf(node: &AdfNode) -> Option<String> {
    let mut output = String::new();
    render_node(node, 0, &mut output);

    let trimmed = output.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn render_node(node: &AdfNode, depth: usize, out: &mut String) {
    match node {
        AdfNode::Text(text) => out.push_str(&text.text),
        AdfNode::Paragraph(_) => {
            render_children(node, depth, out);
            out.push('\n');
        }
        AdfNode::BulletList(_) => render_children(node, depth + 1, out),
        AdfNode::ListItem(_) => {
            let mut item = String::new();
            render_children(node, depth, &mut item);
            out.push_str(&format!(
                "{}• {}\n",
                "  ".repeat(depth.saturating_sub(1)),
                item.trim()
            ));
        }
        AdfNode::Media(_) => {
            let name = node.media_file_name().unwrap_or("image");
            out.push_str(&format!("[attachment: {name}]\n"));
        }
        AdfNode::MediaSingle(_) | AdfNode::MediaGroup(_) => render_children(node, depth, out),
        AdfNode::Other(_) if node.node_type() == Some("hardBreak") => out.push('\n'),
        AdfNode::Doc(_) | AdfNode::Other(_) => {
            render_children(node, depth, out);
            if !out.ends_with('\n') && node.node_type() != Some("doc") && !out.is_empty() {
                out.push('\n');
            }
        }
    }
}

fn render_children(node: &AdfNode, depth: usize, out: &mut String) {
    for child in node.children().unwrap_or_default() {
        render_node(child, depth, out);
    }
}

/// Text of the top-level paragraphs, one line per block
///
/// Only text nodes directly under a top-level block are read; nested lists and
/// media are skipped. A plain string description is returned as-is.
pub fn first_level_text(description: &Value) -> String {
    if let Some(s) = description.as_str() {
        return s.to_string();
    }

    description
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|block| block.get("content").and_then(Value::as_array))
                .flat_map(|inline| inline.iter())
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
                .map(|item| item.get("text").and_then(Value::as_str).unwrap_or_default())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

/// Text of a comment body: top-level inline text nodes joined by spaces
pub fn comment_plain_text(body: &Value) -> String {
    if let Some(s) = body.as_str() {
        return s.trim().to_string();
    }

    body.get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|block| block.get("content").and_then(Value::as_array))
                .flat_map(|inline| inline.iter())
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
                .map(|item| item.get("text").and_then(Value::as_str).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Newest comment whose text contains `needle`
pub fn find_last_comment_containing(comments: &[JiraComment], needle: &str) -> Option<String> {
    comments
        .iter()
        .rev()
        .map(|comment| comment_plain_text(&comment.body))
        .find(|text| text.contains(needle))
}

/// Convert Jira API response to domain model
pub fn transform_search_issues(issues: Vec<JiraIssueResponse>) -> SearchOutput {
    let issues: Vec<IssueOutput> = issues
        .into_iter()
        .map(|issue| {
            // Prefer displayName over emailAddress for assignee
            let assignee = issue
                .fields
                .assignee
                .and_then(|a| a.display_name.or(a.email_address));

            let description = issue
                .fields
                .description
                .as_ref()
                .map(first_level_text)
                .filter(|text| !text.trim().is_empty());

            IssueOutput {
                key: issue.key,
                summary: issue.fields.summary,
                description,
                status: issue
                    .fields
                    .status
                    .map(|s| s.name)
                    .unwrap_or_else(|| "Unknown".to_string()),
                assignee,
            }
        })
        .collect();

    SearchOutput {
        total: issues.len(),
        issues,
    }
}

/// Flatten an issue's links into [`LinkedIssue`] entries
///
/// A link with an outward issue is reported as outward; otherwise the inward
/// issue is used. Links with neither side are skipped.
pub fn extract_linked_issues(fields: &JiraIssueFields) -> Vec<LinkedIssue> {
    fields
        .issuelinks
        .iter()
        .filter_map(|link| {
            let (direction, other) = match (&link.outward_issue, &link.inward_issue) {
                (Some(outward), _) => (LinkDirection::Outward, outward),
                (None, Some(inward)) => (LinkDirection::Inward, inward),
                (None, None) => return None,
            };

            Some(LinkedIssue {
                link_type: link.link_type.name.clone(),
                direction,
                issue_key: other.key.clone(),
                summary: other
                    .fields
                    .as_ref()
                    .map(|f| f.summary.clone())
                    .unwrap_or_default(),
            })
        })
        .collect()
}

/// Human readable file size
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

/// Convert raw attachment metadata into output records
pub fn transform_attachment_response(raw: Vec<JiraAttachmentResponse>) -> Vec<AttachmentOutput> {
    raw.into_iter()
        .map(|a| AttachmentOutput {
            size_human: format_size(a.size),
            id: a.id,
            filename: a.filename,
            size: a.size,
            mime_type: a.mime_type,
            created: a.created,
            content_url: a.content,
        })
        .collect()
}

/// Convert a full issue response + comments to ticket output
pub fn transform_ticket_response(
    issue: JiraIssueResponse,
    comments: Vec<JiraComment>,
) -> TicketOutput {
    let links = extract_linked_issues(&issue.fields);
    let fields = issue.fields;

    TicketOutput {
        key: issue.key,
        summary: fields.summary,
        description: extract_description(fields.description.as_ref()),
        status: fields
            .status
            .map(|s| s.name)
            .unwrap_or_else(|| "Unknown".to_string()),
        priority: fields.priority.map(|p| p.name).filter(|n| !n.is_empty()),
        issue_type: fields.issuetype.and_then(|it| it.name),
        assignee: fields.assignee.and_then(|a| a.display_name),
        created: fields.created,
        updated: fields.updated,
        due_date: fields.duedate,
        labels: fields.labels,
        links,
        attachments: transform_attachment_response(fields.attachment),
        comments,
    }
}

/// Issue types allowed in the first project of a createmeta response
pub fn transform_create_meta(meta: JiraCreateMetaResponse) -> Vec<JiraIssueType> {
    meta.projects
        .into_iter()
        .next()
        .map(|project| project.issuetypes)
        .unwrap_or_default()
}

fn find_by_name<'a>(allowed: &'a [JiraIssueType], name: &str) -> Option<&'a JiraIssueType> {
    let wanted = name.to_lowercase();
    allowed
        .iter()
        .find(|it| it.name.as_deref().unwrap_or_default().to_lowercase() == wanted)
}

/// Pick the issue type to create with
///
/// Resolution order:
/// 1. `requested` matched against `allowed` by id (when all digits), then by
///    case-insensitive name
/// 2. the source issue's type, by id then by name
/// 3. the first allowed type
/// 4. `requested` by name, or "Task"
pub fn resolve_issue_type(
    requested: Option<&str>,
    allowed: &[JiraIssueType],
    source: Option<&JiraIssueType>,
) -> IssueTypeRef {
    if let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) {
        if requested.chars().all(|c| c.is_ascii_digit()) {
            if let Some(found) = allowed
                .iter()
                .find(|it| it.id.as_deref() == Some(requested))
            {
                if let Some(resolved) = IssueTypeRef::from_allowed(found) {
                    return resolved;
                }
            }
        }

        if let Some(resolved) = find_by_name(allowed, requested).and_then(IssueTypeRef::from_allowed)
        {
            return resolved;
        }
    }

    if let Some(source) = source {
        if let Some(src_id) = source.id.as_deref() {
            if allowed.iter().any(|it| it.id.as_deref() == Some(src_id)) {
                return IssueTypeRef::Id(src_id.to_string());
            }
        }

        if let Some(src_name) = source.name.as_deref() {
            if let Some(found) = find_by_name(allowed, src_name) {
                return match &found.id {
                    Some(id) => IssueTypeRef::Id(id.clone()),
                    None => IssueTypeRef::Name(src_name.to_string()),
                };
            }
        }
    }

    if let Some(first) = allowed.first() {
        return IssueTypeRef::from_allowed(first)
            .unwrap_or_else(|| IssueTypeRef::Name(DEFAULT_ISSUE_TYPE.to_string()));
    }

    IssueTypeRef::Name(
        requested
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ISSUE_TYPE)
            .to_string(),
    )
}

/// Escape text for use inside a quoted JQL `~` (text search) clause
///
/// Lucene reserved characters get a JQL-escaped backslash in front; a double
/// quote additionally needs its own JQL escape.
pub fn escape_jql_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => escaped.push_str("\\\\\\\""),
            '[' | ']' | '(' | ')' | '&' => {
                escaped.push_str("\\\\");
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// JQL matching issues in `project` whose summary contains `summary`
pub fn summary_search_jql(project: &str, summary: &str) -> String {
    format!(
        "project = \"{project}\" AND summary ~ \"{}\"",
        escape_jql_text(summary)
    )
}

/// JQL matching issues in `project` carrying `label`
pub fn label_search_jql(project: &str, label: &str) -> String {
    format!("project = \"{project}\" AND labels = \"{label}\"")
}

/// Body of a `POST /rest/api/3/search/jql` request
pub fn build_search_request(
    jql: &str,
    fields: &[String],
    max_results: usize,
    next_page_token: Option<&str>,
) -> Value {
    let mut payload = json!({
        "jql": jql,
        "maxResults": max_results.min(MAX_SEARCH_RESULTS),
        "fields": fields,
    });

    if let Some(token) = next_page_token {
        payload["nextPageToken"] = json!(token);
    }

    payload
}

/// Body of a `POST /rest/api/3/issue` request
pub fn build_create_payload(request: &CreateIssueRequest) -> Value {
    let mut fields = json!({
        "project": { "key": request.project_key },
        "summary": request.summary,
        "issuetype": request.issue_type.to_value(),
    });

    if let Some(description) = &request.description {
        fields["description"] = description.to_value();
    }

    if let Some(due_date) = &request.due_date {
        fields["duedate"] = json!(due_date);
    }

    if !request.labels.is_empty() {
        fields["labels"] = json!(request.labels);
    }

    if let Some(parent) = &request.parent_key {
        fields["parent"] = json!({ "key": parent });
    }

    json!({ "fields": fields })
}

/// Body of a `POST /rest/api/3/issueLink` request
pub fn build_link_payload(link_type: &str, inward_key: &str, outward_key: &str) -> Value {
    json!({
        "type": { "name": link_type },
        "inwardIssue": { "key": inward_key },
        "outwardIssue": { "key": outward_key },
    })
}

/// Body of a `POST /rest/api/3/issue/{key}/comment` request
pub fn build_comment_payload(text: &str) -> Value {
    json!({ "body": text_document(text).to_value() })
}

/// Body of a `PUT /rest/api/3/issue/{key}` request replacing the description
pub fn build_description_update(description: &AdfNode) -> Value {
    json!({ "fields": { "description": description.to_value() } })
}

/// Body of a `PUT /rest/api/3/issue/{key}` request setting the given fields
///
/// Fields left as `None` are not sent. The `fields` object may end up empty;
/// callers should check before sending.
pub fn build_update_payload(
    summary: Option<&str>,
    description: Option<&AdfNode>,
    due_date: Option<&str>,
    labels: Option<&[String]>,
) -> Value {
    let mut fields = serde_json::Map::new();

    if let Some(summary) = summary {
        fields.insert("summary".to_string(), json!(summary));
    }
    if let Some(description) = description {
        fields.insert("description".to_string(), description.to_value());
    }
    if let Some(due_date) = due_date {
        fields.insert("duedate".to_string(), json!(due_date));
    }
    if let Some(labels) = labels {
        fields.insert("labels".to_string(), json!(labels));
    }

    json!({ "fields": fields })
}

/// Collect `errorMessages` and per-field `errors` from a Jira error body
///
/// Falls back to the raw body when it is not JSON or carries no messages.
pub fn collect_error_messages(body: &str) -> String {
    let Ok(error_json) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    let mut messages = Vec::new();

    if let Some(error_messages) = error_json.get("errorMessages").and_then(|em| em.as_array()) {
        for msg in error_messages {
            if let Some(text) = msg.as_str() {
                messages.push(text.to_string());
            }
        }
    }

    if let Some(errors) = error_json.get("errors").and_then(|e| e.as_object()) {
        for (field, error) in errors {
            if let Some(error_text) = error.as_str() {
                messages.push(format!("{}: {}", field, error_text));
            }
        }
    }

    if messages.is_empty() {
        body.to_string()
    } else {
        messages.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper to create a basic issue response for testing
    fn create_issue_response(
        key: &str,
        summary: &str,
        status: &str,
        assignee: Option<JiraAssignee>,
    ) -> JiraIssueResponse {
        JiraIssueResponse {
            id: None,
            key: key.to_string(),
            fields: JiraIssueFields {
                summary: summary.to_string(),
                status: Some(JiraStatus {
                    name: status.to_string(),
                }),
                assignee,
                ..JiraIssueFields::default()
            },
        }
    }

    fn issue_type(id: Option<&str>, name: Option<&str>) -> JiraIssueType {
        JiraIssueType {
            id: id.map(String::from),
            name: name.map(String::from),
        }
    }

    #[test]
    fn test_transform_search_issues_basic() {
        // Arrange: Create a basic search response with one issue
        let issues = vec![create_issue_response(
            "PROJ-123",
            "Fix bug in authentication",
            "In Progress",
            Some(JiraAssignee {
                display_name: Some("John Doe".to_string()),
                email_address: Some("john@example.com".to_string()),
            }),
        )];

        // Act: Transform the response
        let output = transform_search_issues(issues);

        // Assert: Verify the transformation
        assert_eq!(output.total, 1);
        let issue = &output.issues[0];
        assert_eq!(issue.key, "PROJ-123");
        assert_eq!(issue.summary, "Fix bug in authentication");
        assert_eq!(issue.status, "In Progress");
        assert_eq!(issue.assignee, Some("John Doe".to_string()));
        assert_eq!(issue.description, None);
    }

    #[test]
    fn test_transform_search_issues_assignee_email_only() {
        // Arrange: Create an issue with assignee having only emailAddress
        let issues = vec![create_issue_response(
            "PROJ-999",
            "Issue with email only",
            "Blocked",
            Some(JiraAssignee {
                display_name: None,
                email_address: Some("user@example.com".to_string()),
            }),
        )];

        // Act: Transform the response
        let output = transform_search_issues(issues);

        // Assert: Verify emailAddress is used as fallback
        assert_eq!(
            output.issues[0].assignee,
            Some("user@example.com".to_string()),
            "Should use emailAddress when displayName is not available"
        );
    }

    #[test]
    fn test_transform_search_issues_reads_first_level_description() {
        let mut issue = create_issue_response("PROJ-1", "Test", "Open", None);
        issue.fields.description = Some(json!({
            "type": "doc",
            "version": 1,
            "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "line one"}]},
                {"type": "paragraph", "content": [{"type": "text", "text": "line two"}]}
            ]
        }));

        let output = transform_search_issues(vec![issue]);

        assert_eq!(
            output.issues[0].description,
            Some("line one\nline two".to_string())
        );
    }

    #[test]
    fn test_deserialize_issue_with_null_fields() {
        // Arrange: Jira sends explicit nulls for empty fields
        let raw = json!({
            "id": "10001",
            "key": "PROJ-7",
            "fields": {
                "summary": "Nulls everywhere",
                "description": null,
                "assignee": null,
                "labels": null,
                "issuelinks": null,
                "attachment": null
            }
        });

        // Act
        let issue: JiraIssueResponse = serde_json::from_value(raw).unwrap();

        // Assert
        assert_eq!(issue.key, "PROJ-7");
        assert!(issue.fields.description.is_none());
        assert!(issue.fields.labels.is_empty());
        assert!(issue.fields.issuelinks.is_empty());
        assert!(issue.fields.attachment.is_empty());
    }

    #[test]
    fn test_extract_linked_issues_prefers_outward() {
        let fields: JiraIssueFields = serde_json::from_value(json!({
            "summary": "Source",
            "issuelinks": [
                {
                    "type": {"name": "Relates"},
                    "outwardIssue": {"key": "PROJ-2", "fields": {"summary": "Outward one"}}
                },
                {
                    "type": {"name": "Blocks"},
                    "inwardIssue": {"key": "PROJ-3", "fields": {"summary": "Inward one"}}
                },
                {
                    "type": {"name": "Broken"}
                }
            ]
        }))
        .unwrap();

        let links = extract_linked_issues(&fields);

        assert_eq!(
            links,
            vec![
                LinkedIssue {
                    link_type: "Relates".to_string(),
                    direction: LinkDirection::Outward,
                    issue_key: "PROJ-2".to_string(),
                    summary: "Outward one".to_string(),
                },
                LinkedIssue {
                    link_type: "Blocks".to_string(),
                    direction: LinkDirection::Inward,
                    issue_key: "PROJ-3".to_string(),
                    summary: "Inward one".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_transform_ticket_response_full() {
        // Arrange
        let issue: JiraIssueResponse = serde_json::from_value(json!({
            "key": "PROJ-456",
            "fields": {
                "summary": "Implement authentication",
                "description": {
                    "type": "doc",
                    "version": 1,
                    "content": [
                        {"type": "paragraph", "content": [{"type": "text", "text": "Intro"}]},
                        {"type": "mediaSingle", "content": [{"type": "media", "attrs": {"fileName": "shot.png"}}]}
                    ]
                },
                "status": {"name": "In Progress"},
                "priority": {"name": ""},
                "issuetype": {"id": "10002", "name": "Story"},
                "labels": ["backend"],
                "duedate": "2024-01-15",
                "attachment": [{
                    "id": "1",
                    "filename": "shot.png",
                    "size": 2048,
                    "mimeType": "image/png",
                    "created": "2024-01-01T10:00:00Z",
                    "content": "https://jira/att/1"
                }]
            }
        }))
        .unwrap();

        // Act
        let output = transform_ticket_response(issue, vec![]);

        // Assert
        assert_eq!(output.key, "PROJ-456");
        assert_eq!(output.status, "In Progress");
        assert_eq!(output.priority, None, "empty priority is dropped");
        assert_eq!(output.issue_type, Some("Story".to_string()));
        assert_eq!(
            output.description,
            Some("Intro\n[attachment: shot.png]".to_string())
        );
        assert_eq!(output.attachments.len(), 1);
        assert_eq!(output.attachments[0].size_human, "2.0 KB");
        assert_eq!(output.attachments[0].content_url, "https://jira/att/1");
        assert_eq!(output.labels, vec!["backend"]);
    }

    #[test]
    fn test_extract_description_string_and_list() {
        assert_eq!(
            extract_description(Some(&json!("plain text"))),
            Some("plain text".to_string())
        );
        assert_eq!(extract_description(None), None);
        assert_eq!(extract_description(Some(&json!({"foo": "bar"}))), None);

        let adf = json!({
            "type": "doc",
            "version": 1,
            "content": [{
                "type": "bulletList",
                "content": [
                    {"type": "listItem", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "First"}]}]},
                    {"type": "listItem", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "Second"}]}]}
                ]
            }]
        });
        assert_eq!(
            extract_description(Some(&adf)),
            Some("• First\n• Second".to_string())
        );
    }

    #[test]
    fn test_comment_plain_text_and_last_match() {
        let comment = |id: &str, text: &str| JiraComment {
            comment_id: id.to_string(),
            body: text_document(text).to_value(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            author: None,
        };
        let comments = vec![
            comment("1", "build 41 passed"),
            comment("2", "unrelated"),
            comment("3", "build 42 passed"),
        ];

        assert_eq!(
            find_last_comment_containing(&comments, "build"),
            Some("build 42 passed".to_string())
        );
        assert_eq!(find_last_comment_containing(&comments, "missing"), None);
    }

    #[test]
    fn test_resolve_issue_type_by_id_and_name() {
        let allowed = vec![
            issue_type(Some("10001"), Some("Task")),
            issue_type(Some("10004"), Some("Bug")),
        ];

        assert_eq!(
            resolve_issue_type(Some("10004"), &allowed, None),
            IssueTypeRef::Id("10004".to_string())
        );
        assert_eq!(
            resolve_issue_type(Some(" bug "), &allowed, None),
            IssueTypeRef::Id("10004".to_string())
        );
    }

    #[test]
    fn test_resolve_issue_type_name_without_id() {
        let allowed = vec![issue_type(None, Some("Bug"))];

        assert_eq!(
            resolve_issue_type(Some("BUG"), &allowed, None),
            IssueTypeRef::Name("Bug".to_string())
        );
    }

    #[test]
    fn test_resolve_issue_type_falls_back_to_source_then_first() {
        let allowed = vec![
            issue_type(Some("10001"), Some("Task")),
            issue_type(Some("10004"), Some("Bug")),
        ];
        let source_by_id = issue_type(Some("10004"), Some("Defect"));
        let source_by_name = issue_type(Some("99999"), Some("bug"));
        let unknown_source = issue_type(Some("99999"), Some("Epic"));

        assert_eq!(
            resolve_issue_type(Some("Story"), &allowed, Some(&source_by_id)),
            IssueTypeRef::Id("10004".to_string())
        );
        assert_eq!(
            resolve_issue_type(Some("Story"), &allowed, Some(&source_by_name)),
            IssueTypeRef::Id("10004".to_string())
        );
        assert_eq!(
            resolve_issue_type(Some("Story"), &allowed, Some(&unknown_source)),
            IssueTypeRef::Id("10001".to_string())
        );
    }

    #[test]
    fn test_resolve_issue_type_without_metadata() {
        assert_eq!(
            resolve_issue_type(Some("Bug"), &[], None),
            IssueTypeRef::Name("Bug".to_string())
        );
        assert_eq!(
            resolve_issue_type(None, &[], None),
            IssueTypeRef::Name("Task".to_string())
        );
    }

    #[test]
    fn test_transform_create_meta_uses_first_project() {
        let meta: JiraCreateMetaResponse = serde_json::from_value(json!({
            "projects": [
                {"issuetypes": [{"id": "1", "name": "Task"}]},
                {"issuetypes": [{"id": "2", "name": "Bug"}]}
            ]
        }))
        .unwrap();

        assert_eq!(
            transform_create_meta(meta),
            vec![issue_type(Some("1"), Some("Task"))]
        );
        assert!(transform_create_meta(JiraCreateMetaResponse::default()).is_empty());
    }

    #[test]
    fn test_summary_search_jql_escapes_reserved_characters() {
        let jql = summary_search_jql("PROJ", "Clone-[UI] crash (login) & more");

        assert_eq!(
            jql,
            r#"project = "PROJ" AND summary ~ "Clone-\\[UI\\] crash \\(login\\) \\& more""#
        );
    }

    #[test]
    fn test_label_search_jql() {
        assert_eq!(
            label_search_jql("PROJ", "regression"),
            r#"project = "PROJ" AND labels = "regression""#
        );
    }

    #[test]
    fn test_build_search_request_caps_page_size() {
        let fields = vec!["summary".to_string()];

        let first = build_search_request("project = X", &fields, 500, None);
        let next = build_search_request("project = X", &fields, 50, Some("tok"));

        assert_eq!(first["maxResults"], json!(100));
        assert!(first.get("nextPageToken").is_none());
        assert_eq!(next["maxResults"], json!(50));
        assert_eq!(next["nextPageToken"], json!("tok"));
    }

    #[test]
    fn test_build_create_payload() {
        // Arrange
        let request = CreateIssueRequest {
            project_key: "DEST".to_string(),
            summary: "Clone-Crash(SRC-1)".to_string(),
            issue_type: IssueTypeRef::Id("10004".to_string()),
            description: Some(text_document("body")),
            due_date: Some("2024-02-01".to_string()),
            labels: vec!["cloned".to_string()],
            parent_key: Some("DEST-9".to_string()),
        };

        // Act
        let payload = build_create_payload(&request);

        // Assert
        assert_eq!(
            payload,
            json!({
                "fields": {
                    "project": {"key": "DEST"},
                    "summary": "Clone-Crash(SRC-1)",
                    "issuetype": {"id": "10004"},
                    "description": {
                        "type": "doc",
                        "version": 1,
                        "content": [{"type": "paragraph", "content": [{"type": "text", "text": "body"}]}]
                    },
                    "duedate": "2024-02-01",
                    "labels": ["cloned"],
                    "parent": {"key": "DEST-9"}
                }
            })
        );
    }

    #[test]
    fn test_build_create_payload_omits_empty_optionals() {
        let request = CreateIssueRequest {
            project_key: "DEST".to_string(),
            summary: "Minimal".to_string(),
            issue_type: IssueTypeRef::Name("Task".to_string()),
            description: None,
            due_date: None,
            labels: vec![],
            parent_key: None,
        };

        let payload = build_create_payload(&request);

        let fields = payload["fields"].as_object().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields["issuetype"], json!({"name": "Task"}));
    }

    #[test]
    fn test_build_link_payload() {
        assert_eq!(
            build_link_payload("Relates", "NEW-1", "OLD-1"),
            json!({
                "type": {"name": "Relates"},
                "inwardIssue": {"key": "NEW-1"},
                "outwardIssue": {"key": "OLD-1"}
            })
        );
    }

    #[test]
    fn test_build_update_payload_only_sends_given_fields() {
        let labels = vec!["a".to_string(), "b".to_string()];

        let payload = build_update_payload(Some("New title"), None, None, Some(&labels));
        let empty = build_update_payload(None, None, None, None);

        assert_eq!(
            payload,
            json!({"fields": {"summary": "New title", "labels": ["a", "b"]}})
        );
        assert_eq!(empty, json!({"fields": {}}));
        assert_eq!(
            build_description_update(&text_document("x")),
            build_update_payload(None, Some(&text_document("x")), None, None)
        );
    }

    #[test]
    fn test_collect_error_messages() {
        let body = r#"{"errorMessages":["Bad request"],"errors":{"summary":"required"}}"#;

        assert_eq!(collect_error_messages(body), "Bad request\nsummary: required");
        assert_eq!(collect_error_messages("<html>oops</html>"), "<html>oops</html>");
        assert_eq!(collect_error_messages("{}"), "{}");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
