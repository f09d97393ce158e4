//! Help-request pipeline: fetch disaster -> fetch resources -> generate task
//! -> save task -> save request.

mod heuristic;
mod prompt;
mod response;

pub use heuristic::{heuristic_draft, templated_description, HeuristicInput, HEURISTIC_REASONING};
pub use prompt::{assignment_prompt, retry_prompt, TaskContext};
pub use response::{
    parse_primary, parse_retry, strip_code_fence, DraftError, RoleAssignment, TaskDraft,
};

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::geo::Coordinates;
use crate::proximity::{rank_nearest, Ranked};
use crate::repository::{
    DisasterRepository, RepositoryError, ResourceRepository, TaskRepository,
    UserRequestRepository,
};
use crate::services::{LanguageModel, PromptPart};
use crate::types::{
    RequestStatus, ResourceCandidate, ResponderRole, TaskOrigin, TaskRecord, TaskStatus,
    UserRequestRecord,
};

const DEFAULT_EMERGENCY_TYPE: &str = "general emergency";
const AI_REASONING: &str = "AI-determined role assignment";
const RETRY_REASONING: &str = "Role assignment from simplified AI retry";
const NO_RESOURCE_PLAN: &str = "none";

/// Stores the task pipeline reads from and writes to.
#[derive(Clone)]
pub struct TaskStores {
    pub disasters: Arc<dyn DisasterRepository>,
    pub resources: Arc<dyn ResourceRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub requests: Arc<dyn UserRequestRepository>,
}

#[derive(Debug, Clone)]
pub struct HelpRequest {
    pub disaster_id: String,
    pub user_id: String,
    pub help: String,
    pub urgency: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HelpRequestOutcome {
    pub task_id: String,
    pub roles: Vec<ResponderRole>,
    pub description: String,
    pub origin: TaskOrigin,
}

/// A drafted task plus which link of the fallback chain produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTask {
    pub draft: TaskDraft,
    pub origin: TaskOrigin,
}

/// The front end sends "moderate"; tasks are filed as "medium".
pub fn normalize_urgency(urgency: &str) -> String {
    if urgency.eq_ignore_ascii_case("moderate") {
        "medium".to_string()
    } else {
        urgency.to_string()
    }
}

pub struct TaskPipeline {
    language_model: Arc<dyn LanguageModel>,
    stores: TaskStores,
    config: PipelineConfig,
}

impl TaskPipeline {
    pub fn new(
        language_model: Arc<dyn LanguageModel>,
        stores: TaskStores,
        config: PipelineConfig,
    ) -> Self {
        Self {
            language_model,
            stores,
            config,
        }
    }

    /// Turns a help request into a stored task and user request.
    ///
    /// Only a missing (or unreadable) disaster and a failed write of the new
    /// task are errors; every other step degrades.
    pub async fn process(&self, request: HelpRequest) -> Result<HelpRequestOutcome> {
        let location = Coordinates::new(request.latitude, request.longitude);
        let urgency = normalize_urgency(&request.urgency);

        let emergency_type = self.fetch_emergency_type(&request.disaster_id).await?;
        let resources = self.nearby_resources(&request.disaster_id, &location).await;

        let context = TaskContext {
            emergency_type,
            help_text: request.help.clone(),
            urgency,
            location,
            resources,
        };
        let generated = self.generate_task(&context).await;
        let task = build_task(&request, &context, generated);

        self.save_task(&task).await?;
        self.save_request(&request, &context, &task).await;

        info!(
            task_id = %task.task_id,
            disaster_id = %task.disaster_id,
            origin = ?task.origin,
            "help request processed"
        );
        Ok(HelpRequestOutcome {
            task_id: task.task_id,
            roles: task.roles,
            description: task.description,
            origin: task.origin,
        })
    }

    /// Live request for a requester, if any.
    pub async fn user_request(&self, user_id: &str) -> Result<Option<UserRequestRecord>> {
        Ok(self.stores.requests.fetch_user_request(user_id).await?)
    }

    /// Moves a task forward (pending -> in_progress -> done).
    pub async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        action_done_by: Option<String>,
    ) -> Result<TaskRecord> {
        let mut task = self
            .stores
            .tasks
            .fetch_task(task_id)
            .await?
            .ok_or_else(|| PipelineError::TaskNotFound(task_id.to_string()))?;

        if !task.status.can_move_to(status) {
            return Err(PipelineError::InvalidTaskTransition {
                id: task_id.to_string(),
                from: task.status,
                to: status,
            });
        }

        task.status = status;
        if action_done_by.is_some() {
            task.action_done_by = action_done_by;
        }
        self.stores.tasks.update_task(&task).await?;
        Ok(task)
    }

    async fn fetch_emergency_type(&self, disaster_id: &str) -> Result<String> {
        let disaster = self
            .stores
            .disasters
            .fetch_disaster(disaster_id)
            .await?
            .ok_or_else(|| PipelineError::DisasterNotFound(disaster_id.to_string()))?;

        if disaster.emergency_type.trim().is_empty() {
            Ok(DEFAULT_EMERGENCY_TYPE.to_string())
        } else {
            Ok(disaster.emergency_type)
        }
    }

    async fn nearby_resources(
        &self,
        disaster_id: &str,
        origin: &Coordinates,
    ) -> Vec<Ranked<ResourceCandidate>> {
        match self.stores.resources.resources_for_disaster(disaster_id).await {
            Ok(candidates) => rank_nearest(origin, candidates, self.config.nearby_resource_limit),
            Err(err) => {
                warn!(disaster_id, "resource lookup failed, continuing without resources: {err}");
                Vec::new()
            }
        }
    }

    /// Primary prompt, then one minimal retry, then the keyword heuristic.
    pub async fn generate_task(&self, context: &TaskContext) -> GeneratedTask {
        let primary = assignment_prompt(context, self.config.prompt_resource_limit);
        match self.ask(&primary).await.and_then(|raw| parse_primary(&raw)) {
            Ok(draft) => {
                return GeneratedTask {
                    draft,
                    origin: TaskOrigin::Ai,
                }
            }
            Err(err) => warn!("primary task generation failed, retrying: {err}"),
        }

        match self
            .ask(&retry_prompt(context))
            .await
            .and_then(|raw| parse_retry(&raw))
        {
            Ok(mut draft) => {
                if draft.description.is_empty() {
                    draft.description = templated_description(&context.help_text, &context.location);
                }
                return GeneratedTask {
                    draft,
                    origin: TaskOrigin::AiRetry,
                };
            }
            Err(err) => warn!("retry task generation failed, using heuristic: {err}"),
        }

        let nearest = context
            .resources
            .first()
            .map(|ranked| ranked.item.name.as_deref().unwrap_or("nearby resource"));
        GeneratedTask {
            draft: heuristic_draft(&HeuristicInput {
                help_text: &context.help_text,
                emergency_type: &context.emergency_type,
                urgency: &context.urgency,
                location: context.location,
                nearest_resource: nearest,
            }),
            origin: TaskOrigin::Heuristic,
        }
    }

    async fn ask(&self, prompt: &[PromptPart]) -> std::result::Result<String, DraftError> {
        Ok(self.language_model.generate(prompt).await?)
    }

    /// Replaces any earlier non-first task of the same requester for the same
    /// disaster. Cleanup failures never block the insert.
    async fn save_task(&self, task: &TaskRecord) -> Result<()> {
        match self
            .stores
            .tasks
            .tasks_for(&task.user_id, &task.disaster_id)
            .await
        {
            Ok(existing) => {
                for stale in existing.iter().filter(|existing| !existing.is_first_task) {
                    if let Err(err) = self.stores.tasks.delete_task(&stale.task_id).await {
                        warn!(task_id = %stale.task_id, "failed to delete superseded task: {err}");
                    }
                }
            }
            Err(err) => warn!(user_id = %task.user_id, "failed to list previous tasks: {err}"),
        }

        self.stores.tasks.insert_task(task).await?;
        Ok(())
    }

    /// One live request per requester. The request is a secondary record, so
    /// neither the cleanup nor the insert can fail the help request.
    async fn save_request(
        &self,
        request: &HelpRequest,
        context: &TaskContext,
        task: &TaskRecord,
    ) {
        match self.stores.requests.delete_user_request(&request.user_id).await {
            Ok(()) | Err(RepositoryError::NotFound(_)) => {}
            Err(err) => warn!(user_id = %request.user_id, "failed to delete previous request: {err}"),
        }

        let record = UserRequestRecord {
            disaster_id: request.disaster_id.clone(),
            help: request.help.clone(),
            urgency_type: request.urgency.clone(),
            latitude: request.latitude,
            longitude: request.longitude,
            emergency_type: context.emergency_type.clone(),
            task_id: task.task_id.clone(),
            status: RequestStatus::Submitted,
            feedback: None,
            assigned_roles: task.roles.clone(),
            ai_reasoning: task.ai_reasoning.clone(),
            user_id: request.user_id.clone(),
        };
        if let Err(err) = self.stores.requests.insert_user_request(&record).await {
            warn!(
                user_id = %request.user_id,
                task_id = %task.task_id,
                "failed to store user request: {err}"
            );
        }
    }
}

fn build_task(request: &HelpRequest, context: &TaskContext, generated: GeneratedTask) -> TaskRecord {
    let GeneratedTask { draft, origin } = generated;
    let default_reasoning = match origin {
        TaskOrigin::Ai => AI_REASONING,
        TaskOrigin::AiRetry => RETRY_REASONING,
        TaskOrigin::Heuristic => HEURISTIC_REASONING,
    };

    TaskRecord {
        task_id: Uuid::new_v4().to_string(),
        description: draft.description,
        status: TaskStatus::Pending,
        action_done_by: None,
        roles: draft.assignment.roles(),
        emergency_type: context.emergency_type.clone(),
        urgency_level: context.urgency.clone(),
        latitude: request.latitude,
        longitude: request.longitude,
        help_needed: request.help.clone(),
        user_id: request.user_id.clone(),
        disaster_id: request.disaster_id.clone(),
        origin,
        is_fallback: origin != TaskOrigin::Ai,
        is_first_task: false,
        ai_reasoning: draft
            .reasoning
            .filter(|reasoning| !reasoning.trim().is_empty())
            .unwrap_or_else(|| default_reasoning.to_string()),
        resource_utilization: draft
            .resource_utilization
            .unwrap_or_else(|| NO_RESOURCE_PLAN.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderate_urgency_becomes_medium() {
        assert_eq!(normalize_urgency("moderate"), "medium");
        assert_eq!(normalize_urgency("high"), "high");
    }
}
