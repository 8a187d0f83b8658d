/// Atlassian-related transformations (Jira)
///
/// Pure functions over Jira REST payloads. No I/O happens here.
pub mod jira;
