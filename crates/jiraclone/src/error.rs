use std::path::PathBuf;

#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("The .env file does not exist: {}", .0.display())]
    EnvFileNotFound(PathBuf),

    #[error("The JSON config file does not exist: {}", .0.display())]
    ConfigFileNotFound(PathBuf),

    #[error("Issue not found: {0}")]
    IssueNotFound(String),

    #[error("Operation cancelled")]
    Cancelled,
}
