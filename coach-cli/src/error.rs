use coach_core::ProfileIssue;
use coach_rag::RagError;
use coach_store::StoreError;
use thiserror::Error;

/// Errors raised while serving one session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The submitted profile breaks one or more rules; nothing was saved.
    #[error("invalid profile: {}", join_issues(.0))]
    InvalidProfile(Vec<ProfileIssue>),

    #[error("empty message")]
    EmptyMessage,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Chain(#[from] RagError),
}

fn join_issues(issues: &[ProfileIssue]) -> String {
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

pub type Result<T> = std::result::Result<T, SessionError>;
