mod rule_reload;
mod state_machine;

use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::core::agent::{
    AgentIdentity, AgentResponse, AgentTask, InvokerSettings, PLANNER_ID, RoleAgent,
    RuleBoundInvoker, WORKER_ID, WORKER_NAME, WORKER_ROLE,
};
use crate::core::coordinator::Coordinator;
use crate::core::error::{CrewError, CrewResult};
use crate::core::llm::{LlmClient, LlmError, LlmReply};
use crate::core::model::AgentStatus;
use crate::core::store::{Store, TaskRecord};

/// Replays canned replies in order and keeps every prompt it was sent.
struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedLlm {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }

    fn slow(replies: &[&str], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
            delay: Some(delay),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }

    async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_id(&self) -> &str {
        "scripted"
    }

    async fn send(&self, _model: &str, prompt: &str) -> Result<LlmReply, LlmError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.prompts.lock().await.push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self.replies.lock().await.pop_front();
        self.active.fetch_sub(1, Ordering::SeqCst);
        match reply {
            Some(text) => Ok(LlmReply {
                text,
                tokens_used: Some(64),
            }),
            None => Err(LlmError::Status {
                status: 503,
                body: "no more replies".to_string(),
            }),
        }
    }
}

/// Store state seen from inside an AI call.
#[derive(Debug, Clone)]
struct Observation {
    tasks: Vec<TaskRecord>,
    planner: AgentStatus,
    worker: AgentStatus,
}

/// Answers from a script and snapshots tasks and agent status on every call.
struct ObservingLlm {
    store: Arc<Store>,
    replies: Mutex<VecDeque<String>>,
    seen: Mutex<Vec<Observation>>,
}

impl ObservingLlm {
    fn new(store: &Arc<Store>, replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            store: store.clone(),
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    async fn seen(&self) -> Vec<Observation> {
        self.seen.lock().await.clone()
    }

    async fn agent_status(&self, id: &str) -> Result<AgentStatus, LlmError> {
        self.store
            .get_agent(id)
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?
            .map(|agent| agent.status)
            .ok_or_else(|| LlmError::Transport(format!("agent {} not registered", id)))
    }
}

#[async_trait]
impl LlmClient for ObservingLlm {
    fn provider_id(&self) -> &str {
        "observing"
    }

    async fn send(&self, _model: &str, _prompt: &str) -> Result<LlmReply, LlmError> {
        let tasks = self
            .store
            .get_all_tasks()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        let observation = Observation {
            tasks,
            planner: self.agent_status(PLANNER_ID).await?,
            worker: self.agent_status(WORKER_ID).await?,
        };
        self.seen.lock().await.push(observation);

        match self.replies.lock().await.pop_front() {
            Some(text) => Ok(LlmReply {
                text,
                tokens_used: None,
            }),
            None => Err(LlmError::Transport("no more replies".to_string())),
        }
    }
}

/// A worker that succeeds but leaves the store refusing the `completed` write.
struct CompletionBlockingWorker {
    invoker: RuleBoundInvoker,
    store: Arc<Store>,
}

impl CompletionBlockingWorker {
    async fn new(store: Arc<Store>) -> Arc<Self> {
        let identity = AgentIdentity::new(WORKER_ID, WORKER_NAME, WORKER_ROLE);
        let invoker =
            RuleBoundInvoker::new(identity, store.clone(), None, InvokerSettings::default())
                .await
                .unwrap();
        Arc::new(Self { invoker, store })
    }
}

#[async_trait]
impl RoleAgent for CompletionBlockingWorker {
    fn invoker(&self) -> &RuleBoundInvoker {
        &self.invoker
    }

    async fn execute_task(&self, _task: &AgentTask) -> CrewResult<AgentResponse> {
        let db = self.store.get_db();
        db.lock()
            .await
            .execute_batch(
                "CREATE TRIGGER IF NOT EXISTS refuse_completion
                 BEFORE UPDATE OF status ON tasks
                 WHEN NEW.status = 'completed'
                 BEGIN SELECT RAISE(ABORT, 'completion refused'); END;",
            )
            .map_err(|e| CrewError::Storage(e.into()))?;
        Ok(AgentResponse::Real {
            text: "done".to_string(),
            feedback_id: "fb_unrecorded".to_string(),
        })
    }
}

/// A worker whose execution path itself breaks, after the agent layer.
struct FailingWorker {
    invoker: RuleBoundInvoker,
}

impl FailingWorker {
    async fn new(store: Arc<Store>) -> Arc<Self> {
        let identity = AgentIdentity::new(WORKER_ID, WORKER_NAME, WORKER_ROLE);
        let invoker = RuleBoundInvoker::new(identity, store, None, InvokerSettings::default())
            .await
            .unwrap();
        Arc::new(Self { invoker })
    }
}

#[async_trait]
impl RoleAgent for FailingWorker {
    fn invoker(&self) -> &RuleBoundInvoker {
        &self.invoker
    }

    async fn execute_task(&self, _task: &AgentTask) -> CrewResult<AgentResponse> {
        Err(CrewError::Storage(anyhow!("disk full")))
    }
}

async fn seeded_store() -> Arc<Store> {
    let store = Arc::new(Store::open_in_memory().unwrap());
    store.seed_default_rules().await.unwrap();
    store
}

async fn coordinator(store: &Arc<Store>, llm: Option<Arc<dyn LlmClient>>) -> Coordinator {
    Coordinator::new(store.clone(), llm, InvokerSettings::default())
        .await
        .unwrap()
}

async fn coordinator_with_worker(store: &Arc<Store>, worker: Arc<dyn RoleAgent>) -> Coordinator {
    let planner = crate::core::agent::PlannerAgent::new(store.clone(), None, InvokerSettings::default())
        .await
        .unwrap();
    Coordinator::with_agents(store.clone(), planner, worker)
        .await
        .unwrap()
}

async fn failing_coordinator(store: &Arc<Store>) -> Coordinator {
    coordinator_with_worker(store, FailingWorker::new(store.clone()).await).await
}
