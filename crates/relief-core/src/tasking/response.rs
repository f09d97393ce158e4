//! Structural parsing of AI task drafts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::ServiceError;
use crate::types::ResponderRole;

/// Role choice as expressed by the model. Every variant maps to a non-empty
/// role set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleAssignment {
    Volunteer,
    FirstResponder,
    Both,
}

impl RoleAssignment {
    /// Unrecognized labels fall back to volunteers.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "both" => RoleAssignment::Both,
            "fr" | "first_responder" | "first responder" => RoleAssignment::FirstResponder,
            _ => RoleAssignment::Volunteer,
        }
    }

    pub fn roles(&self) -> Vec<ResponderRole> {
        match self {
            RoleAssignment::Volunteer => vec![ResponderRole::Volunteer],
            RoleAssignment::FirstResponder => vec![ResponderRole::FirstResponder],
            RoleAssignment::Both => vec![ResponderRole::Volunteer, ResponderRole::FirstResponder],
        }
    }
}

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("language model call failed: {0}")]
    Service(#[from] ServiceError),

    #[error("response is not the expected JSON object: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("response carries an empty description")]
    EmptyDescription,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub description: String,
    pub assignment: RoleAssignment,
    pub reasoning: Option<String>,
    pub resource_utilization: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDraft {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    roles: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    resource_utilization: Option<String>,
}

/// Removes a surrounding Markdown code fence (```` ```json ```` or
/// ```` ``` ````), if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Full draft from the primary prompt. A missing or blank description is a
/// failure.
pub fn parse_primary(raw: &str) -> Result<TaskDraft, DraftError> {
    let draft = parse_raw(raw)?;
    if draft.description.is_empty() {
        return Err(DraftError::EmptyDescription);
    }
    Ok(draft)
}

/// Draft from the minimal retry prompt. The description may be empty here;
/// the caller substitutes its templated sentence.
pub fn parse_retry(raw: &str) -> Result<TaskDraft, DraftError> {
    parse_raw(raw)
}

fn parse_raw(raw: &str) -> Result<TaskDraft, DraftError> {
    let parsed: RawDraft = serde_json::from_str(strip_code_fence(raw))?;
    let assignment = parsed
        .roles
        .as_deref()
        .map(RoleAssignment::from_label)
        .unwrap_or(RoleAssignment::Volunteer);
    Ok(TaskDraft {
        description: parsed.description.unwrap_or_default().trim().to_string(),
        assignment,
        reasoning: parsed.reasoning,
        resource_utilization: parsed.resource_utilization,
    })
}
