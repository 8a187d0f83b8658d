//! Clone settings merged from a JSON config file and command line flags

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::atlassian::jira::DEFAULT_LINK_TYPE;
use crate::due_date::{resolve_due_date, DueDateError};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("missing required settings: {}. Provide them as CLI options or in the JSON config", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid JSON config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    DueDate(#[from] DueDateError),
}

/// Accept either `["a", "b"]` or `"a b"`.
fn string_or_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Words {
        Joined(String),
        List(Vec<String>),
    }

    Ok(Option::<Words>::deserialize(deserializer)?.map(|words| match words {
        Words::Joined(s) => s.split_whitespace().map(String::from).collect(),
        Words::List(list) => list,
    }))
}

/// Every clone setting, each optional. Used for both the file and the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloneSettings {
    pub jql: Option<String>,
    pub issue_key: Option<String>,
    pub clone_project_key: Option<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub clone_label: Option<Vec<String>>,
    #[serde(deserialize_with = "string_or_list")]
    pub clone_models: Option<Vec<String>>,
    pub due_date: Option<String>,
    pub issue_type: Option<String>,
    pub parent_key: Option<String>,
    pub link_type: Option<String>,
    pub env: Option<String>,
}

/// Where the issues to clone come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneSource {
    IssueKey(String),
    Jql(String),
}

/// Validated settings with the due date already resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCloneSettings {
    pub source: CloneSource,
    pub clone_project_key: String,
    pub clone_labels: Vec<String>,
    pub clone_models: Vec<String>,
    pub due_date: String,
    pub issue_type: String,
    pub parent_key: Option<String>,
    pub link_type: String,
    pub env: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse the contents of a JSON config file.
pub fn parse_settings(json: &str) -> Result<CloneSettings, SettingsError> {
    Ok(serde_json::from_str(json)?)
}

impl CloneSettings {
    /// Overlay `cli` on top of `self`. A CLI value wins whenever it is set and non-empty.
    pub fn merge(self, cli: CloneSettings) -> CloneSettings {
        CloneSettings {
            jql: non_empty(cli.jql).or(self.jql),
            issue_key: non_empty(cli.issue_key).or(self.issue_key),
            clone_project_key: non_empty(cli.clone_project_key).or(self.clone_project_key),
            clone_label: cli.clone_label.or(self.clone_label),
            clone_models: cli.clone_models.or(self.clone_models),
            due_date: non_empty(cli.due_date).or(self.due_date),
            issue_type: non_empty(cli.issue_type).or(self.issue_type),
            parent_key: non_empty(cli.parent_key).or(self.parent_key),
            link_type: non_empty(cli.link_type).or(self.link_type),
            env: non_empty(cli.env).or(self.env),
        }
    }

    /// Check required settings and resolve the due date against `today`.
    ///
    /// All missing settings are reported together. `issue_key` takes precedence
    /// over `jql` when both are present.
    pub fn validate(self, today: NaiveDate) -> Result<ResolvedCloneSettings, SettingsError> {
        let issue_key = non_empty(self.issue_key);
        let jql = non_empty(self.jql);
        let clone_project_key = non_empty(self.clone_project_key);
        let clone_labels = self
            .clone_label
            .unwrap_or_default()
            .into_iter()
            .filter(|l| !l.trim().is_empty())
            .collect::<Vec<_>>();
        let due_date = non_empty(self.due_date);
        let issue_type = non_empty(self.issue_type);

        let mut missing = Vec::new();
        if issue_key.is_none() && jql.is_none() {
            missing.push("jql or issue_key");
        }
        if clone_project_key.is_none() {
            missing.push("clone_project_key");
        }
        if clone_labels.is_empty() {
            missing.push("clone_label");
        }
        if due_date.is_none() {
            missing.push("due_date");
        }
        if issue_type.is_none() {
            missing.push("issue_type");
        }

        let (Some(clone_project_key), Some(due_date), Some(issue_type)) =
            (clone_project_key, due_date, issue_type)
        else {
            return Err(SettingsError::Missing(missing));
        };
        let source = match (issue_key, jql) {
            (Some(key), _) => CloneSource::IssueKey(key),
            (None, Some(jql)) => CloneSource::Jql(jql),
            (None, None) => return Err(SettingsError::Missing(missing)),
        };
        if !missing.is_empty() {
            return Err(SettingsError::Missing(missing));
        }

        Ok(ResolvedCloneSettings {
            source,
            clone_project_key,
            clone_labels,
            clone_models: self.clone_models.unwrap_or_default(),
            due_date: resolve_due_date(&due_date, today)?,
            issue_type,
            parent_key: non_empty(self.parent_key),
            link_type: non_empty(self.link_type).unwrap_or_else(|| DEFAULT_LINK_TYPE.to_string()),
            env: non_empty(self.env),
        })
    }
}
