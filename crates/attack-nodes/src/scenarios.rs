//! End-to-end runs of the built-in blocks through the engine

use std::sync::Arc;
use std::time::Duration;

use flow_engine::{
    create_block, EngineConfig, Edge, FlowError, NodeId, NodeRunState, NullEventSink, Outcome,
    Position, VecEventSink, Workflow, WorkflowEvent, WorkflowRunner, WorkflowStore,
};
use serde_json::{json, Value};

use crate::config::StixSourceKind;
use crate::setup::{builtin_registry, BlockServices};
use crate::stix::{StaticStixSource, StixBundle};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn attack_pattern(id: &str, attack_id: &str, name: &str, phase: &str, platforms: &[&str]) -> Value {
    json!({
        "type": "attack-pattern",
        "id": id,
        "name": name,
        "kill_chain_phases": [{"kill_chain_name": "mitre-attack", "phase_name": phase}],
        "external_references": [{"source_name": "mitre-attack", "external_id": attack_id}],
        "x_mitre_platforms": platforms,
    })
}

fn uses(n: u32, target: &str) -> Value {
    json!({
        "type": "relationship",
        "id": format!("relationship--{}", n),
        "relationship_type": "uses",
        "source_ref": "intrusion-set--apt29",
        "target_ref": target,
    })
}

/// A small enterprise dataset: one actor using four techniques
fn fixture_bundle() -> StixBundle {
    let value = json!({
        "type": "bundle",
        "id": "bundle--fixture",
        "objects": [
            {
                "type": "intrusion-set",
                "id": "intrusion-set--apt29",
                "name": "APT29",
                "aliases": ["Cozy Bear", "The Dukes"],
            },
            attack_pattern("attack-pattern--a", "T1566", "Phishing", "initial-access", &["Windows", "Linux", "macOS"]),
            attack_pattern("attack-pattern--b", "T1059.001", "PowerShell", "execution", &["Windows"]),
            attack_pattern("attack-pattern--c", "T1053.003", "Cron", "persistence", &["Linux", "macOS"]),
            attack_pattern("attack-pattern--d", "T1078", "Valid Accounts", "defense-evasion", &["Windows", "Linux"]),
            attack_pattern("attack-pattern--e", "T1105", "Ingress Tool Transfer", "command-and-control", &["Linux"]),
            uses(1, "attack-pattern--a"),
            uses(2, "attack-pattern--b"),
            uses(3, "attack-pattern--c"),
            uses(4, "attack-pattern--d"),
        ],
    });
    serde_json::from_value(value).unwrap()
}

fn services() -> BlockServices {
    BlockServices::offline(
        StaticStixSource::new().with_bundle(StixSourceKind::Enterprise, fixture_bundle()),
    )
}

fn runner(store: WorkflowStore) -> WorkflowRunner {
    WorkflowRunner::new(
        store,
        Arc::new(builtin_registry(&services())),
        Arc::new(NullEventSink),
    )
}

async fn add(runner: &WorkflowRunner, block_type: &str, x: f64) -> NodeId {
    runner
        .store()
        .add_block(runner.registry(), block_type, Position::new(x, 0.0))
        .await
        .unwrap()
}

async fn connect(runner: &WorkflowRunner, source: &str, target: &str, port: &str) {
    assert!(
        runner.store().connect(Edge::new(source, port, target, port)).await,
        "{} -> {} on {} rejected",
        source,
        target,
        port
    );
}

async fn output(runner: &WorkflowRunner, node_id: &str, port: &str) -> Value {
    let node = runner.store().node(node_id).await.unwrap();
    node.data.output(port).cloned().unwrap_or(Value::Null)
}

fn technique_ids(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect()
}

/// Loader -> actor -> filter -> plan -> commands -> report
async fn full_chain(runner: &WorkflowRunner) -> Vec<NodeId> {
    let loader = add(runner, "stixLoader", 0.0).await;
    let actor = add(runner, "threatActor", 250.0).await;
    let filter = add(runner, "techniqueFilter", 500.0).await;
    let plan = add(runner, "aiGenerator", 750.0).await;
    let commands = add(runner, "commandBuilder", 1000.0).await;
    let report = add(runner, "reportGenerator", 1250.0).await;

    connect(runner, &loader, &actor, "stixData").await;
    connect(runner, &actor, &filter, "techniques").await;
    connect(runner, &filter, &plan, "filteredTechniques").await;
    connect(runner, &plan, &commands, "plan").await;
    connect(runner, &commands, &report, "commands").await;
    connect(runner, &plan, &report, "plan").await;

    vec![loader, actor, filter, plan, commands, report]
}

#[tokio::test]
async fn test_full_chain_produces_report() {
    init_logging();
    let runner = runner(WorkflowStore::new());
    let ids = full_chain(&runner).await;
    runner
        .store()
        .update_configuration(&ids[1], "actor", json!("cozy bear"))
        .await
        .unwrap();

    let summary = runner.run().await.unwrap();
    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.succeeded(), 6);
    assert_eq!(summary.order(), ids.iter().map(String::as_str).collect::<Vec<_>>());

    let techniques = output(&runner, &ids[1], "techniques").await;
    assert_eq!(technique_ids(&techniques), vec!["T1566", "T1059.001", "T1053.003", "T1078"]);

    let report = output(&runner, &ids[5], "report").await;
    let report = report.as_str().unwrap();
    assert!(report.starts_with("# Attack Simulation Report"));
    assert!(report.contains("## Attack Plan"));
    assert!(report.contains("- Use Phishing to gain entry"));
    assert!(report.contains("### Command 1"));
}

#[tokio::test]
async fn test_unconnected_blocks_run_in_insertion_order() {
    init_logging();
    let runner = runner(WorkflowStore::new());
    let actor = add(&runner, "threatActor", 0.0).await;
    let filter = add(&runner, "techniqueFilter", 250.0).await;

    let summary = runner.run().await.unwrap();
    assert_eq!(summary.order(), vec![actor.as_str(), filter.as_str()]);
    assert_eq!(summary.failed(), 0);

    let techniques = output(&runner, &actor, "techniques").await;
    assert_eq!(techniques, json!([{"id": "T1078", "name": "Valid Accounts"}]));
    assert_eq!(output(&runner, &filter, "filteredTechniques").await, json!([]));
}

#[tokio::test]
async fn test_cycle_falls_back_and_settles_each_node_once() {
    init_logging();
    let registry = builtin_registry(&services());

    // A hand-edited file can hold a cycle the editor would never allow
    let mut workflow = Workflow::new();
    for (i, block_type) in ["aiGenerator", "commandBuilder", "reportGenerator"].iter().enumerate() {
        let node = create_block(&registry, block_type, Position::new(i as f64 * 250.0, 0.0)).unwrap();
        workflow.nodes.push(node);
    }
    let ids: Vec<NodeId> = workflow.nodes.iter().map(|n| n.id.clone()).collect();
    workflow.edges = vec![
        Edge::new(&ids[0], "plan", &ids[1], "plan"),
        Edge::new(&ids[1], "commands", &ids[2], "commands"),
        Edge::new(&ids[2], "report", &ids[0], "filteredTechniques"),
    ];

    let events = Arc::new(VecEventSink::new());
    let runner = WorkflowRunner::new(
        WorkflowStore::from_workflow(workflow),
        Arc::new(registry),
        events.clone(),
    );
    let summary = runner.run().await.unwrap();

    assert_eq!(summary.order(), ids.iter().map(String::as_str).collect::<Vec<_>>());
    for id in &ids {
        let completions = events
            .events()
            .iter()
            .filter(|e| matches!(e, WorkflowEvent::NodeCompleted { node_id, .. } if node_id == id))
            .count();
        assert_eq!(completions, 1, "{} settled {} times", id, completions);
        assert!(matches!(
            runner.node_state(id).await,
            Some(NodeRunState::Settled { outcome: Outcome::Success })
        ));
    }
}

#[tokio::test]
async fn test_linux_filter_keeps_linux_subset_in_order() {
    init_logging();
    let runner = runner(WorkflowStore::new());
    let loader = add(&runner, "stixLoader", 0.0).await;
    let actor = add(&runner, "threatActor", 250.0).await;
    let filter = add(&runner, "techniqueFilter", 500.0).await;
    connect(&runner, &loader, &actor, "stixData").await;
    connect(&runner, &actor, &filter, "techniques").await;

    // Empty actor selects the whole dataset, including T1105 nobody uses
    runner
        .store()
        .update_configuration(&filter, "filterByPlatform", json!(true))
        .await
        .unwrap();
    runner
        .store()
        .update_configuration(&filter, "platform", json!("linux"))
        .await
        .unwrap();

    runner.run().await.unwrap();
    let filtered = output(&runner, &filter, "filteredTechniques").await;
    assert_eq!(
        technique_ids(&filtered),
        vec!["T1566", "T1053.003", "T1078", "T1105"]
    );
}

#[tokio::test]
async fn test_failed_block_records_error_and_run_continues() {
    init_logging();
    let runner = runner(WorkflowStore::new());
    let ids = full_chain(&runner).await;
    runner
        .store()
        .update_configuration(&ids[1], "actor", json!("APT1"))
        .await
        .unwrap();

    let summary = runner.run().await.unwrap();
    assert_eq!(summary.nodes.len(), 6);
    assert_eq!(summary.failed(), 1);

    let actor = runner.store().node(&ids[1]).await.unwrap();
    assert_eq!(
        actor.data.error_message(),
        Some("Threat actor 'APT1' not found in dataset")
    );

    // Downstream blocks saw the failed output as unresolved
    let filtered = output(&runner, &ids[2], "filteredTechniques").await;
    assert_eq!(filtered, json!([]));
    assert!(output(&runner, &ids[5], "report").await.is_string());
}

#[tokio::test]
async fn test_save_load_round_trip_through_store() {
    init_logging();
    let runner = runner(WorkflowStore::new());
    let ids = full_chain(&runner).await;
    runner
        .store()
        .update_configuration(&ids[3], "impact", json!("ransomware"))
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workflow.json");
    runner.store().save_to_path(&path).await.unwrap();

    let restored = WorkflowStore::new();
    restored.load_from_path(&path).await.unwrap();
    assert_eq!(restored.snapshot().await, runner.store().snapshot().await);
}

#[tokio::test]
async fn test_reset_is_idempotent() {
    init_logging();
    let runner = runner(WorkflowStore::new());
    let ids = full_chain(&runner).await;
    runner.run().await.unwrap();
    assert!(runner.store().node(&ids[5]).await.unwrap().data.execution_result.is_some());

    runner.reset_execution().await.unwrap();
    let once = runner.store().snapshot().await;
    runner.reset_execution().await.unwrap();
    assert_eq!(runner.store().snapshot().await, once);

    for id in &ids {
        assert_eq!(runner.node_state(id).await, Some(NodeRunState::Idle));
    }
}

#[tokio::test(start_paused = true)]
async fn test_second_run_is_rejected_while_running() {
    init_logging();
    let runner = runner(WorkflowStore::new())
        .with_config(EngineConfig::default().with_step_delay(Duration::from_millis(50)));
    full_chain(&runner).await;

    let first = runner.run();
    let second = async {
        while !runner.is_running() {
            tokio::task::yield_now().await;
        }
        let reset = runner.reset_execution().await;
        (runner.run().await, reset)
    };
    let (first, (second, reset)) = tokio::join!(first, second);

    assert_eq!(first.unwrap().succeeded(), 6);
    assert!(matches!(second, Err(FlowError::RunInProgress)));
    assert!(matches!(reset, Err(FlowError::RunInProgress)));
    assert!(!runner.is_running());
}

#[tokio::test]
async fn test_event_stream_for_full_chain() {
    init_logging();
    let events = Arc::new(VecEventSink::new());
    let runner = WorkflowRunner::new(
        WorkflowStore::new(),
        Arc::new(builtin_registry(&services())),
        events.clone(),
    );
    full_chain(&runner).await;
    runner.run().await.unwrap();

    let events = events.events();
    assert!(matches!(events.first(), Some(WorkflowEvent::RunStarted { node_count: 6, .. })));
    assert!(matches!(events.last(), Some(WorkflowEvent::RunCompleted { .. })));
    // started + completed per node, plus run start and end
    assert_eq!(events.len(), 6 * 2 + 2);
}
