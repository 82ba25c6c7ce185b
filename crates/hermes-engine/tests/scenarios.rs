use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use hermes_core::HermesConfig;
use hermes_engine::Engine;
use hermes_llm::MockProvider;

fn test_config(name: &str) -> HermesConfig {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let base = std::env::temp_dir().join(format!("hermes_engine_test_{name}_{}_{nanos}", std::process::id()));
    HermesConfig {
        root_dir: base.join("research"),
        backup_dir: base.join("research/.backups"),
        max_depth_hint: 3,
        per_command_output_max_length: None,
        budget_total: None,
    }
}

#[tokio::test]
async fn defining_the_root_problem_starts_the_scheduler() {
    let config = test_config("define");
    let root_dir = config.root_dir.clone();
    let reply = "<<<define_problem\n///title Research the thing\n///content Find out what the thing is\n>>>".to_string();
    let provider = Arc::new(MockProvider::new(vec![reply]));
    let mut engine = Engine::new(config, provider).unwrap();

    let finished = engine.run_turn().await.unwrap();
    assert!(!finished);
    let current = engine.current_node().expect("root should now be current");
    assert_eq!(current.read().unwrap().title, "Research the thing");

    std::fs::remove_dir_all(root_dir.parent().unwrap()).ok();
}

#[tokio::test]
async fn finishing_the_root_problem_ends_the_run() {
    let config = test_config("finish_root");
    let root_dir = config.root_dir.clone();
    let define = "<<<define_problem\n///title Root\n///content Solve it\n>>>".to_string();
    let finish = "<<<finish_problem\n>>>".to_string();
    let provider = Arc::new(MockProvider::new(vec![define, finish]));
    let mut engine = Engine::new(config, provider).unwrap();

    assert!(!engine.run_turn().await.unwrap());
    assert!(engine.run_turn().await.unwrap());
    assert!(engine.is_finished());

    std::fs::remove_dir_all(root_dir.parent().unwrap()).ok();
}

#[tokio::test]
async fn activating_a_subproblem_focuses_down_and_finishing_it_resumes_root() {
    let config = test_config("subproblem");
    let root_dir = config.root_dir.clone();
    let define = "<<<define_problem\n///title Root\n///content Solve it\n>>>".to_string();
    let add_sub = "<<<add_subproblem\n///title Child\n///content Solve part of it\n>>>".to_string();
    let activate = "<<<activate_subproblems_and_wait\n///title Child\n>>>".to_string();
    let finish_child = "<<<finish_problem\n>>>".to_string();
    let provider = Arc::new(MockProvider::new(vec![define, add_sub, activate, finish_child]));
    let mut engine = Engine::new(config, provider).unwrap();

    engine.run_turn().await.unwrap(); // define_problem
    engine.run_turn().await.unwrap(); // add_subproblem
    engine.run_turn().await.unwrap(); // activate_subproblems_and_wait -> focus down to Child
    assert_eq!(engine.current_node().unwrap().read().unwrap().title, "Child");

    engine.run_turn().await.unwrap(); // finish_problem on Child -> resumes Root
    assert_eq!(engine.current_node().unwrap().read().unwrap().title, "Root");
    assert!(!engine.is_finished());

    std::fs::remove_dir_all(root_dir.parent().unwrap()).ok();
}

#[tokio::test]
async fn shutdown_sentinel_forces_immediate_finish() {
    let config = test_config("shutdown");
    let root_dir = config.root_dir.clone();
    let define = "<<<define_problem\n///title Root\n///content Solve it\n>>>".to_string();
    let shutdown = "Stopping now. SHUT_DOWN_DEEP_RESEARCHER".to_string();
    let provider = Arc::new(MockProvider::new(vec![define, shutdown]));
    let mut engine = Engine::new(config, provider).unwrap();

    engine.run_turn().await.unwrap();
    let finished = engine.run_turn().await.unwrap();
    assert!(finished);
    assert!(engine.is_finished());

    std::fs::remove_dir_all(root_dir.parent().unwrap()).ok();
}

#[tokio::test]
async fn syntax_error_blocks_every_command_in_the_message() {
    let config = test_config("syntax_error");
    let root_dir = config.root_dir.clone();
    let define = "<<<define_problem\n///title Root\n///content Solve it\n>>>".to_string();
    // Two opening tags with no closing tag between them: a syntax error.
    let broken = "<<<add_criteria\n<<<add_criteria\n///criteria x\n>>>".to_string();
    let provider = Arc::new(MockProvider::new(vec![define, broken]));
    let mut engine = Engine::new(config, provider).unwrap();

    engine.run_turn().await.unwrap();
    engine.run_turn().await.unwrap();
    let current = engine.current_node().unwrap();
    assert!(current.read().unwrap().criteria.is_empty());

    std::fs::remove_dir_all(root_dir.parent().unwrap()).ok();
}

#[tokio::test]
async fn repeated_title_sections_queue_every_subproblem_in_order() {
    let config = test_config("activate_multi");
    let root_dir = config.root_dir.clone();
    let define = "<<<define_problem\n///title Root\n///content Solve it\n>>>".to_string();
    let add_a = "<<<add_subproblem\n///title A\n///content part a\n>>>".to_string();
    let add_b = "<<<add_subproblem\n///title B\n///content part b\n>>>".to_string();
    let activate = "<<<activate_subproblems_and_wait\n///title A\n///title B\n>>>".to_string();
    let finish_a = "<<<finish_problem\n>>>".to_string();
    let finish_b = "<<<finish_problem\n>>>".to_string();
    let provider = Arc::new(MockProvider::new(vec![define, add_a, add_b, activate, finish_a, finish_b]));
    let mut engine = Engine::new(config, provider).unwrap();

    engine.run_turn().await.unwrap(); // define_problem
    engine.run_turn().await.unwrap(); // add_subproblem A
    engine.run_turn().await.unwrap(); // add_subproblem B
    engine.run_turn().await.unwrap(); // activate_subproblems_and_wait -> focus down to A
    assert_eq!(engine.current_node().unwrap().read().unwrap().title, "A");

    engine.run_turn().await.unwrap(); // finish_problem on A -> scheduler picks up queued B
    assert_eq!(engine.current_node().unwrap().read().unwrap().title, "B");

    engine.run_turn().await.unwrap(); // finish_problem on B -> resumes Root
    assert_eq!(engine.current_node().unwrap().read().unwrap().title, "Root");

    std::fs::remove_dir_all(root_dir.parent().unwrap()).ok();
}

#[tokio::test]
async fn a_command_after_a_should_be_last_command_is_rejected() {
    let config = test_config("trailing_command");
    let root_dir = config.root_dir.clone();
    let define = "<<<define_problem\n///title Root\n///content Solve it\n>>>".to_string();
    let add_sub = "<<<add_subproblem\n///title Child\n///content part\n>>>".to_string();
    let trailing =
        "<<<finish_problem\n>>>\n<<<add_criteria\n///criteria should never run\n>>>".to_string();
    let provider = Arc::new(MockProvider::new(vec![define, add_sub, trailing]));
    let mut engine = Engine::new(config, provider).unwrap();

    engine.run_turn().await.unwrap(); // define_problem
    engine.run_turn().await.unwrap(); // add_subproblem
    engine.run_turn().await.unwrap(); // finish_problem, then a rejected trailing add_criteria

    let reply = engine.last_auto_reply().expect("a reply should have been recorded");
    assert!(reply.errors.iter().any(|e| e.contains("must be the last command")));
    assert!(engine.root_node().unwrap().read().unwrap().criteria.is_empty());

    std::fs::remove_dir_all(root_dir.parent().unwrap()).ok();
}

#[tokio::test]
async fn failing_a_subproblem_still_resumes_the_parent() {
    let config = test_config("fail_subproblem");
    let root_dir = config.root_dir.clone();
    let define = "<<<define_problem\n///title Root\n///content Solve it\n>>>".to_string();
    let add_sub = "<<<add_subproblem\n///title Child\n///content Doomed\n>>>".to_string();
    let activate = "<<<activate_subproblems_and_wait\n///title Child\n>>>".to_string();
    let fail_child = "<<<fail_problem\n///message Could not solve it\n>>>".to_string();
    let provider = Arc::new(MockProvider::new(vec![define, add_sub, activate, fail_child]));
    let mut engine = Engine::new(config, provider).unwrap();

    engine.run_turn().await.unwrap();
    engine.run_turn().await.unwrap();
    engine.run_turn().await.unwrap();
    engine.run_turn().await.unwrap();

    let root = engine.root_node().unwrap();
    let child = root.read().unwrap().subproblems.get("Child").unwrap().clone();
    assert_eq!(child.read().unwrap().status, hermes_core::NodeStatus::Failed);
    assert_eq!(engine.current_node().unwrap().read().unwrap().title, "Root");

    std::fs::remove_dir_all(root_dir.parent().unwrap()).ok();
}
