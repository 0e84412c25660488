use super::{
    CompletionBlockingWorker, ObservingLlm, coordinator, coordinator_with_worker,
    failing_coordinator, seeded_store,
};
use crate::core::agent::{PLANNER_ID, WORKER_ID};
use crate::core::error::CrewError;
use crate::core::model::{AgentStatus, TaskStatus};

#[tokio::test]
async fn pending_task_runs_to_completed() {
    let store = seeded_store().await;
    let coordinator = coordinator(&store, None).await;
    let project = store.create_project("p", "d").await.unwrap();
    let task = store.create_task(&project.id, "Build API", "").await.unwrap();

    let run = coordinator.execute_task(&task.id).await.unwrap();
    assert_eq!(run.task.status, TaskStatus::Completed);
    assert_eq!(run.task.agent_id.as_deref(), Some(WORKER_ID));
    assert!(run.task.updated_at > task.updated_at);
    assert!(run.response.is_degraded());

    let worker = store.get_agent(WORKER_ID).await.unwrap().unwrap();
    assert_eq!(worker.status, AgentStatus::Idle);
}

#[tokio::test]
async fn task_is_running_on_busy_worker_while_it_executes() {
    let store = seeded_store().await;
    let llm = ObservingLlm::new(&store, &["1. Design schema", "schema done"]);
    let coordinator = coordinator(&store, Some(llm.clone())).await;

    let started = coordinator.start_project("Build a todo app").await.unwrap();
    assert_eq!(started.tasks.len(), 1);
    let run = coordinator.execute_task(&started.tasks[0].id).await.unwrap();
    assert_eq!(run.task.status, TaskStatus::Completed);

    let seen = llm.seen().await;
    assert_eq!(seen.len(), 2);

    // Decomposition happens before any task exists.
    let planning = &seen[0];
    assert!(planning.tasks.is_empty());
    assert_eq!(planning.planner, AgentStatus::Busy);
    assert_eq!(planning.worker, AgentStatus::Idle);

    let executing = &seen[1];
    assert_eq!(executing.tasks.len(), 1);
    assert_eq!(executing.tasks[0].id, started.tasks[0].id);
    assert_eq!(executing.tasks[0].status, TaskStatus::Running);
    assert_eq!(executing.tasks[0].agent_id.as_deref(), Some(WORKER_ID));
    assert_eq!(executing.worker, AgentStatus::Busy);
    assert_eq!(executing.planner, AgentStatus::Idle);

    for id in [PLANNER_ID, WORKER_ID] {
        let agent = store.get_agent(id).await.unwrap().unwrap();
        assert_eq!(agent.status, AgentStatus::Idle, "{id} left busy");
    }
}

#[tokio::test]
async fn refused_completion_write_fails_task_and_frees_worker() {
    let store = seeded_store().await;
    let coordinator =
        coordinator_with_worker(&store, CompletionBlockingWorker::new(store.clone()).await).await;
    let project = store.create_project("p", "d").await.unwrap();
    let task = store.create_task(&project.id, "Build API", "").await.unwrap();

    let err = coordinator.execute_task(&task.id).await.unwrap_err();
    assert!(matches!(err, CrewError::TaskExecution { .. }));
    assert!(err.to_string().contains("completion refused"));

    let stored = store.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Failed);
    let worker = store.get_agent(WORKER_ID).await.unwrap().unwrap();
    assert_eq!(worker.status, AgentStatus::Idle);
}

#[tokio::test]
async fn execution_error_fails_task_and_is_surfaced() {
    let store = seeded_store().await;
    let coordinator = failing_coordinator(&store).await;
    let project = store.create_project("p", "d").await.unwrap();
    let task = store.create_task(&project.id, "Build API", "").await.unwrap();

    let err = coordinator.execute_task(&task.id).await.unwrap_err();
    match &err {
        CrewError::TaskExecution { task_id, .. } => assert_eq!(task_id, &task.id),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("disk full"));

    let stored = store.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Failed);
    assert_eq!(stored.agent_id.as_deref(), Some(WORKER_ID));
    let worker = store.get_agent(WORKER_ID).await.unwrap().unwrap();
    assert_eq!(worker.status, AgentStatus::Idle);
}

#[tokio::test]
async fn unknown_task_is_not_found_and_changes_nothing() {
    let store = seeded_store().await;
    let coordinator = coordinator(&store, None).await;
    let project = store.create_project("p", "d").await.unwrap();
    let task = store.create_task(&project.id, "t", "").await.unwrap();
    let before = store.stats().await.unwrap();

    let err = coordinator.execute_task("task_missing").await.unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(store.stats().await.unwrap(), before);
    let untouched = store.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, TaskStatus::Pending);
    let worker = store.get_agent(WORKER_ID).await.unwrap().unwrap();
    assert_eq!(worker.status, AgentStatus::Idle);
}

#[tokio::test]
async fn completed_task_cannot_run_again() {
    let store = seeded_store().await;
    let coordinator = coordinator(&store, None).await;
    let project = store.create_project("p", "d").await.unwrap();
    let task = store.create_task(&project.id, "t", "").await.unwrap();
    coordinator.execute_task(&task.id).await.unwrap();
    let feedback_before = store.stats().await.unwrap().ai_feedback;

    let err = coordinator.execute_task(&task.id).await.unwrap_err();
    assert!(matches!(
        err,
        CrewError::InvalidTransition {
            from: TaskStatus::Completed,
            to: TaskStatus::Running,
            ..
        }
    ));
    assert_eq!(store.stats().await.unwrap().ai_feedback, feedback_before);
    let stored = store.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Completed);
}

#[tokio::test]
async fn failed_task_never_returns_to_pending() {
    let store = seeded_store().await;
    let coordinator = failing_coordinator(&store).await;
    let project = store.create_project("p", "d").await.unwrap();
    let task = store.create_task(&project.id, "t", "").await.unwrap();
    coordinator.execute_task(&task.id).await.unwrap_err();

    let err = coordinator.execute_task(&task.id).await.unwrap_err();
    assert!(matches!(
        err,
        CrewError::InvalidTransition {
            from: TaskStatus::Failed,
            ..
        }
    ));
    let stored = store.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Failed);
}
