//! Project / task lifecycle and the registry of live agents.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::core::agent::{
    AgentInfo, AgentResponse, AgentTask, InvokerSettings, ModificationRequest, PLANNER_ROLE,
    PlannerAgent, RoleAgent, WorkerAgent,
};
use crate::core::error::{CrewError, CrewResult, EntityKind};
use crate::core::llm::LlmClient;
use crate::core::model::{
    AgentStatus, ProjectStatus, TaskStatus, can_transition, require_non_empty, validate_role,
};
use crate::core::store::{
    AgentRecord, AgentRuleRecord, AiFeedbackRecord, CodeModificationRecord, FeedbackFilter,
    ProjectRecord, Store, StoreStats, TaskRecord,
};

pub const DEFAULT_PROJECT_NAME: &str = "New Project";

/// What `start_project` hands back.
#[derive(Debug, Clone)]
pub struct ProjectStart {
    pub project: ProjectRecord,
    pub tasks: Vec<TaskRecord>,
}

/// A finished execution: the task as stored afterwards and the agent output.
#[derive(Debug, Clone)]
pub struct TaskRun {
    pub task: TaskRecord,
    pub response: AgentResponse,
}

/// Owns the live agents and the write path for projects and tasks.
/// Built once at startup and passed to whoever drives it.
pub struct Coordinator {
    store: Arc<Store>,
    planner: Arc<PlannerAgent>,
    worker: Arc<dyn RoleAgent>,
    agents: HashMap<String, Arc<dyn RoleAgent>>,
    // One slot per role: calls against the same role run one at a time.
    lanes: HashMap<String, Arc<Mutex<()>>>,
}

impl Coordinator {
    pub async fn new(
        store: Arc<Store>,
        llm: Option<Arc<dyn LlmClient>>,
        settings: InvokerSettings,
    ) -> CrewResult<Self> {
        let planner = PlannerAgent::new(store.clone(), llm.clone(), settings.clone()).await?;
        let worker = WorkerAgent::new(store.clone(), llm, settings).await?;
        Self::with_agents(store, planner, Arc::new(worker)).await
    }

    /// Same as `new` with a caller-supplied worker role.
    pub async fn with_agents(
        store: Arc<Store>,
        planner: PlannerAgent,
        worker: Arc<dyn RoleAgent>,
    ) -> CrewResult<Self> {
        let planner = Arc::new(planner);
        let mut agents: HashMap<String, Arc<dyn RoleAgent>> = HashMap::new();
        agents.insert(planner.role().to_string(), planner.clone());
        agents.insert(worker.role().to_string(), worker.clone());

        let mut lanes = HashMap::new();
        for (role, agent) in &agents {
            let identity = agent.invoker().identity();
            store
                .register_agent(&identity.id, &identity.name, &identity.role)
                .await?;
            lanes.insert(role.clone(), Arc::new(Mutex::new(())));
        }
        info!("Coordinator ready with {} agents", agents.len());

        Ok(Self {
            store,
            planner,
            worker,
            agents,
            lanes,
        })
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn agent(&self, role: &str) -> Option<&Arc<dyn RoleAgent>> {
        self.agents.get(role)
    }

    fn lane(&self, role: &str) -> Arc<Mutex<()>> {
        self.lanes
            .get(role)
            .cloned()
            .unwrap_or_else(|| Arc::new(Mutex::new(())))
    }

    async fn set_agent_status(&self, agent_id: &str, status: AgentStatus) {
        if let Err(e) = self.store.update_agent_status(agent_id, status).await {
            warn!("Failed to mark agent {} {}: {}", agent_id, status, e);
        }
    }

    /// Creates a project for the requirement and one pending task per title
    /// the planner extracts from it.
    pub async fn start_project(&self, requirement: &str) -> CrewResult<ProjectStart> {
        require_non_empty("requirement", requirement)?;
        info!("Starting project: {}", requirement);

        let project = self
            .store
            .create_project(DEFAULT_PROJECT_NAME, requirement)
            .await?;

        let titles = {
            let lane = self.lane(PLANNER_ROLE);
            let _slot = lane.lock().await;
            self.set_agent_status(self.planner.id(), AgentStatus::Busy)
                .await;
            let result = self.planner.decompose(requirement, Some(&project.id)).await;
            self.set_agent_status(self.planner.id(), AgentStatus::Idle)
                .await;
            result?
        };

        let mut tasks = Vec::with_capacity(titles.len());
        for title in titles {
            tasks.push(self.store.create_task(&project.id, &title, "").await?);
        }
        info!(
            "Project {} created with {} tasks",
            project.id,
            tasks.len()
        );
        Ok(ProjectStart { project, tasks })
    }

    /// Runs a pending task on the worker. A degraded AI call still completes
    /// the task; an error from the execution path fails it and is returned.
    pub async fn execute_task(&self, task_id: &str) -> CrewResult<TaskRun> {
        let worker = self.worker.clone();
        let lane = self.lane(worker.role());
        let _slot = lane.lock().await;

        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| CrewError::not_found(EntityKind::Task, task_id))?;
        if !can_transition(task.status, TaskStatus::Running) {
            return Err(CrewError::InvalidTransition {
                task_id: task.id,
                from: task.status,
                to: TaskStatus::Running,
            });
        }

        self.store
            .update_task_status(task_id, TaskStatus::Running, Some(worker.id()))
            .await?;
        self.set_agent_status(worker.id(), AgentStatus::Busy).await;
        info!("Task {} running on {}", task_id, worker.id());

        // Completion is part of the execution path: if it cannot be written
        // the task is failed like any other execution error.
        let outcome = async {
            let response = worker.execute_task(&AgentTask::from(&task)).await?;
            self.store
                .update_task_status(task_id, TaskStatus::Completed, Some(worker.id()))
                .await?;
            Ok::<_, CrewError>(response)
        }
        .await;

        match outcome {
            Ok(response) => {
                self.set_agent_status(worker.id(), AgentStatus::Idle).await;
                if response.is_degraded() {
                    warn!("Task {} completed with a placeholder response", task_id);
                } else {
                    info!("Task {} completed", task_id);
                }
                let task = self.get_task(task_id).await?;
                Ok(TaskRun { task, response })
            }
            Err(err) => {
                error!("Task {} failed: {}", task_id, err);
                if let Err(e) = self
                    .store
                    .update_task_status(task_id, TaskStatus::Failed, Some(worker.id()))
                    .await
                {
                    warn!("Failed to mark task {} failed: {}", task_id, e);
                }
                self.set_agent_status(worker.id(), AgentStatus::Idle).await;
                Err(CrewError::TaskExecution {
                    task_id: task_id.to_string(),
                    source: Box::new(err),
                })
            }
        }
    }

    /// Stores new rule content (bumping its version) and reloads the live
    /// agent of that role so its next call renders with it.
    pub async fn update_agent_rule(&self, role: &str, content: &str) -> CrewResult<AgentRuleRecord> {
        validate_role(role)?;
        require_non_empty("rule_content", content)?;

        let rule = self.store.update_agent_rule(role, content).await?;
        if let Some(agent) = self.agents.get(role) {
            agent.reload_rule().await?;
            info!("Reloaded '{}' agent at rule version {}", role, rule.version);
        }
        Ok(rule)
    }

    pub async fn get_projects(&self) -> CrewResult<Vec<ProjectRecord>> {
        Ok(self.store.get_all_projects().await?)
    }

    pub async fn get_project(&self, project_id: &str) -> CrewResult<ProjectRecord> {
        self.store
            .get_project(project_id)
            .await?
            .ok_or_else(|| CrewError::not_found(EntityKind::Project, project_id))
    }

    pub async fn get_project_tasks(&self, project_id: &str) -> CrewResult<Vec<TaskRecord>> {
        self.get_project(project_id).await?;
        Ok(self.store.get_project_tasks(project_id).await?)
    }

    pub async fn get_task(&self, task_id: &str) -> CrewResult<TaskRecord> {
        self.store
            .get_task(task_id)
            .await?
            .ok_or_else(|| CrewError::not_found(EntityKind::Task, task_id))
    }

    pub async fn get_agents(&self) -> CrewResult<Vec<AgentRecord>> {
        Ok(self.store.get_all_agents().await?)
    }

    pub async fn agent_info(&self, role: &str) -> CrewResult<AgentInfo> {
        let agent = self
            .agents
            .get(role)
            .ok_or_else(|| CrewError::not_found(EntityKind::Agent, role))?;
        agent.info().await
    }

    pub async fn get_agent_rules(&self) -> CrewResult<Vec<AgentRuleRecord>> {
        Ok(self.store.get_all_agent_rules().await?)
    }

    pub async fn get_agent_rule(&self, role: &str) -> CrewResult<AgentRuleRecord> {
        self.store
            .get_agent_rule(role)
            .await?
            .ok_or_else(|| CrewError::not_found(EntityKind::AgentRule, role))
    }

    pub async fn update_project_status(
        &self,
        project_id: &str,
        status: ProjectStatus,
    ) -> CrewResult<ProjectRecord> {
        if !self.store.update_project_status(project_id, status).await? {
            return Err(CrewError::not_found(EntityKind::Project, project_id));
        }
        info!("Project {} is now {}", project_id, status);
        self.get_project(project_id).await
    }

    pub async fn update_task_description(
        &self,
        task_id: &str,
        description: &str,
    ) -> CrewResult<TaskRecord> {
        if !self
            .store
            .update_task_description(task_id, description)
            .await?
        {
            return Err(CrewError::not_found(EntityKind::Task, task_id));
        }
        self.get_task(task_id).await
    }

    /// Removes the project and, through the cascade, its tasks. Audit
    /// records are kept.
    pub async fn delete_project(&self, project_id: &str) -> CrewResult<()> {
        if !self.store.delete_project(project_id).await? {
            return Err(CrewError::not_found(EntityKind::Project, project_id));
        }
        info!("Deleted project {}", project_id);
        Ok(())
    }

    pub async fn stats(&self) -> CrewResult<StoreStats> {
        Ok(self.store.stats().await?)
    }

    /// Audit trail of one task, newest first.
    pub async fn task_feedback(&self, task_id: &str) -> CrewResult<Vec<AiFeedbackRecord>> {
        let filter = FeedbackFilter {
            task_id: Some(task_id.to_string()),
            ..Default::default()
        };
        Ok(self.store.list_ai_feedback(&filter).await?)
    }

    pub async fn record_modification(
        &self,
        role: &str,
        request: ModificationRequest,
    ) -> CrewResult<CodeModificationRecord> {
        let agent = self
            .agents
            .get(role)
            .ok_or_else(|| CrewError::not_found(EntityKind::Agent, role))?;
        agent.record_modification(request).await
    }
}

#[cfg(test)]
mod tests;
