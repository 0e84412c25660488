use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::{AgentInfo, AgentResponse, DegradedReason, LoadedRule, ModificationRequest};
use crate::core::config::LlmConfig;
use crate::core::error::CrewResult;
use crate::core::llm::{LlmClient, LlmError, LlmReply};
use crate::core::model::new_id;
use crate::core::store::{CodeModificationRecord, NewAiFeedback, NewCodeModification, Store};

pub const FALLBACK_RULE: &str = "# Default rule\n\nNo rule configured.";

const PLACEHOLDER_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct AgentIdentity {
    pub id: String,
    pub name: String,
    pub role: String,
}

impl AgentIdentity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: role.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvokerSettings {
    pub model: String,
    pub timeout: Option<Duration>,
}

impl From<&LlmConfig> for InvokerSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            timeout: config.timeout(),
        }
    }
}

impl Default for InvokerSettings {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    pub project_id: Option<String>,
    pub task_id: Option<String>,
    pub model: Option<String>,
}

impl InvokeOptions {
    pub fn for_task(project_id: Option<&str>, task_id: &str) -> Self {
        Self {
            project_id: project_id.map(str::to_string),
            task_id: Some(task_id.to_string()),
            model: None,
        }
    }
}

pub fn compose_prompt(rule: &str, prompt: &str) -> String {
    format!(
        "{}\n\n---\n\n# Current task\n\n{}\n\nFollow the rules above strictly when completing this task.",
        rule.trim(),
        prompt.trim()
    )
}

/// Renders prompts against the cached rule of one role, calls the AI
/// capability and writes exactly one audit record per call.
pub struct RuleBoundInvoker {
    identity: AgentIdentity,
    store: Arc<Store>,
    llm: Option<Arc<dyn LlmClient>>,
    settings: InvokerSettings,
    rule: RwLock<LoadedRule>,
}

/// Outcome of the network leg before it is audited.
enum CallOutcome {
    Success(LlmReply),
    Unconfigured,
    Failed(LlmError),
}

impl RuleBoundInvoker {
    /// Builds the invoker and loads the current rule for its role.
    pub async fn new(
        identity: AgentIdentity,
        store: Arc<Store>,
        llm: Option<Arc<dyn LlmClient>>,
        settings: InvokerSettings,
    ) -> CrewResult<Self> {
        let invoker = Self {
            identity,
            store,
            llm,
            settings,
            rule: RwLock::new(LoadedRule::fallback()),
        };
        invoker.load_rule().await?;
        Ok(invoker)
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    pub fn is_configured(&self) -> bool {
        self.llm.is_some()
    }

    /// Reads the stored rule for the role into the cache. A missing rule is
    /// not an error: the built-in fallback is used instead.
    pub async fn load_rule(&self) -> CrewResult<LoadedRule> {
        let loaded = match self.store.get_agent_rule(&self.identity.role).await? {
            Some(rule) => {
                info!(
                    "{} loaded rule for '{}' (version {})",
                    self.identity.name, rule.agent_role, rule.version
                );
                LoadedRule {
                    content: rule.rule_content,
                    version: Some(rule.version),
                    is_fallback: false,
                }
            }
            None => {
                warn!(
                    "{} found no rule for '{}', using default rule",
                    self.identity.name, self.identity.role
                );
                LoadedRule::fallback()
            }
        };
        *self.rule.write().await = loaded.clone();
        Ok(loaded)
    }

    pub async fn reload_rule(&self) -> CrewResult<LoadedRule> {
        self.load_rule().await
    }

    pub async fn rule(&self) -> LoadedRule {
        self.rule.read().await.clone()
    }

    /// Deterministic stand-in used whenever the AI capability is unavailable.
    pub fn placeholder(&self, rule: &str) -> String {
        let excerpt: String = rule.chars().take(PLACEHOLDER_EXCERPT_CHARS).collect();
        format!(
            "Placeholder response from {}\n\nPer rule:\n{}...\n\nTask complete.",
            self.identity.name, excerpt
        )
    }

    pub async fn invoke(&self, prompt: &str, options: InvokeOptions) -> CrewResult<AgentResponse> {
        let rule = self.rule().await;
        let full_prompt = compose_prompt(&rule.content, prompt);
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.settings.model.clone());

        let started = Instant::now();
        let outcome = match &self.llm {
            None => CallOutcome::Unconfigured,
            Some(client) => {
                let call = client.send(&model, &full_prompt);
                let result = match self.settings.timeout {
                    Some(limit) => match tokio::time::timeout(limit, call).await {
                        Ok(result) => result,
                        Err(_) => Err(LlmError::Timeout(limit)),
                    },
                    None => call.await,
                };
                match result {
                    Ok(reply) => CallOutcome::Success(reply),
                    Err(err) => CallOutcome::Failed(err),
                }
            }
        };
        let duration_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

        // Attribution uses the version stored now, not the one cached at render time.
        let rule_version = match self.store.get_agent_rule(&self.identity.role).await {
            Ok(rule) => rule.map(|r| r.version),
            Err(e) => {
                warn!(
                    "{}: could not read rule version for audit: {}",
                    self.identity.name, e
                );
                None
            }
        };
        let provider = self.llm.as_ref().map(|c| c.provider_id().to_string());

        let feedback_id = new_id("fb");
        let (response, record_text, tokens_used, metadata) = match outcome {
            CallOutcome::Success(reply) => {
                let metadata = json!({
                    "rule_version": rule_version,
                    "outcome": "success",
                    "provider": provider,
                });
                let response = AgentResponse::Real {
                    text: reply.text.clone(),
                    feedback_id: feedback_id.clone(),
                };
                (response, reply.text, reply.tokens_used, metadata)
            }
            CallOutcome::Unconfigured => {
                warn!(
                    "{}: no API credential configured, using placeholder response",
                    self.identity.name
                );
                let text = self.placeholder(&rule.content);
                let metadata = json!({
                    "rule_version": rule_version,
                    "outcome": DegradedReason::Unconfigured.as_str(),
                    "provider": provider,
                });
                let response = AgentResponse::Degraded {
                    text: text.clone(),
                    feedback_id: feedback_id.clone(),
                    reason: DegradedReason::Unconfigured,
                };
                (response, text, None, metadata)
            }
            CallOutcome::Failed(err) => {
                let reason = match err {
                    LlmError::Timeout(_) => DegradedReason::TimedOut,
                    _ => DegradedReason::Failed,
                };
                warn!("{}: AI call failed: {}", self.identity.name, err);
                let metadata = json!({
                    "rule_version": rule_version,
                    "outcome": reason.as_str(),
                    "provider": provider,
                    "error": err.to_string(),
                });
                let response = AgentResponse::Degraded {
                    text: self.placeholder(&rule.content),
                    feedback_id: feedback_id.clone(),
                    reason,
                };
                (response, format!("ERROR: {}", err), None, metadata)
            }
        };

        self.store
            .create_ai_feedback(&NewAiFeedback {
                id: feedback_id,
                agent_id: self.identity.id.clone(),
                prompt: full_prompt,
                response: record_text,
                model,
                project_id: options.project_id,
                task_id: options.task_id,
                tokens_used,
                duration_ms,
                metadata,
            })
            .await?;

        if !response.is_degraded() {
            info!(
                "{}: AI call succeeded ({}ms, tokens: {})",
                self.identity.name,
                duration_ms,
                tokens_used.map_or_else(|| "n/a".to_string(), |t| t.to_string())
            );
        }
        Ok(response)
    }

    pub async fn record_modification(
        &self,
        request: ModificationRequest,
    ) -> CrewResult<CodeModificationRecord> {
        let record = self
            .store
            .create_code_modification(&NewCodeModification {
                id: new_id("mod"),
                agent_id: self.identity.id.clone(),
                project_id: request.project_id,
                task_id: request.task_id,
                file_path: request.file_path,
                modification_type: request.modification_type,
                before_content: request.before_content,
                after_content: request.after_content,
                diff: request.diff,
                reason: request.reason,
                ai_feedback_id: request.ai_feedback_id,
                can_rollback: true,
            })
            .await?;
        info!(
            "{} recorded modification: {} ({})",
            self.identity.name, record.file_path, record.modification_type
        );
        Ok(record)
    }

    pub async fn info(&self) -> CrewResult<AgentInfo> {
        let rule_version = self
            .store
            .get_agent_rule(&self.identity.role)
            .await?
            .map_or(0, |r| r.version);
        Ok(AgentInfo {
            id: self.identity.id.clone(),
            name: self.identity.name.clone(),
            role: self.identity.role.clone(),
            rule_version,
        })
    }
}
