use std::sync::Arc;

use super::{ScriptedLlm, coordinator, seeded_store};
use crate::core::agent::{FALLBACK_RULE, RoleAgent};
use crate::core::error::CrewError;
use crate::core::store::Store;

#[tokio::test]
async fn update_bumps_version_and_next_call_uses_new_rule() {
    let store = seeded_store().await;
    let llm = ScriptedLlm::new(&["first", "second"]);
    let coordinator = coordinator(&store, Some(llm.clone())).await;
    let project = store.create_project("p", "d").await.unwrap();

    let task = store.create_task(&project.id, "one", "").await.unwrap();
    coordinator.execute_task(&task.id).await.unwrap();
    let before = coordinator.get_agent_rule("dev").await.unwrap();

    let updated = coordinator
        .update_agent_rule("dev", "# Dev rules v2\n\nAlways write tests first.")
        .await
        .unwrap();
    assert_eq!(updated.version, before.version + 1);
    assert_eq!(updated.rule_content, "# Dev rules v2\n\nAlways write tests first.");

    let task = store.create_task(&project.id, "two", "").await.unwrap();
    coordinator.execute_task(&task.id).await.unwrap();

    let prompts = llm.prompts().await;
    assert!(!prompts[0].starts_with("# Dev rules v2"));
    assert!(prompts[1].starts_with("# Dev rules v2"));

    let feedback = coordinator.task_feedback(&task.id).await.unwrap();
    assert_eq!(feedback[0].rule_version(), Some(updated.version));
}

#[tokio::test]
async fn every_update_adds_exactly_one() {
    let store = seeded_store().await;
    let coordinator = coordinator(&store, None).await;
    let mut version = coordinator.get_agent_rule("pm").await.unwrap().version;
    for n in 0..3 {
        let rule = coordinator
            .update_agent_rule("pm", &format!("pm rules {n}"))
            .await
            .unwrap();
        assert_eq!(rule.version, version + 1);
        version = rule.version;
    }
    assert_eq!(coordinator.agent_info("pm").await.unwrap().rule_version, version);
}

#[tokio::test]
async fn role_without_live_agent_is_still_stored() {
    let store = seeded_store().await;
    let coordinator = coordinator(&store, None).await;

    let rule = coordinator.update_agent_rule("qa", "qa rules").await.unwrap();
    assert_eq!(rule.version, 2);
    assert!(coordinator.agent("qa").is_none());
}

#[tokio::test]
async fn malformed_update_is_rejected() {
    let store = seeded_store().await;
    let coordinator = coordinator(&store, None).await;

    let err = coordinator
        .update_agent_rule("Bad Role!", "x")
        .await
        .unwrap_err();
    assert!(matches!(err, CrewError::Validation { field: "role", .. }));

    let err = coordinator.update_agent_rule("dev", "  ").await.unwrap_err();
    assert!(matches!(err, CrewError::Validation { .. }));
    assert_eq!(coordinator.get_agent_rule("dev").await.unwrap().version, 1);
}

#[tokio::test]
async fn fallback_agent_picks_up_first_stored_rule() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let llm = ScriptedLlm::new(&["a", "b"]);
    let coordinator = coordinator(&store, Some(llm.clone())).await;
    let project = store.create_project("p", "d").await.unwrap();

    let worker = coordinator.agent("dev").unwrap();
    assert!(worker.invoker().rule().await.is_fallback);
    let task = store.create_task(&project.id, "one", "").await.unwrap();
    coordinator.execute_task(&task.id).await.unwrap();

    let rule = coordinator.update_agent_rule("dev", "dev rules").await.unwrap();
    assert_eq!(rule.version, 1);
    let loaded = worker.invoker().rule().await;
    assert!(!loaded.is_fallback);
    assert_eq!(loaded.version, Some(1));

    let task = store.create_task(&project.id, "two", "").await.unwrap();
    coordinator.execute_task(&task.id).await.unwrap();

    let prompts = llm.prompts().await;
    assert!(prompts[0].starts_with(FALLBACK_RULE));
    assert!(prompts[1].starts_with("dev rules"));
}
