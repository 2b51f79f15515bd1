//! Space manager + run service tests over an in-process sandbox double.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cordon_core::{ApprovalStatus, RunStatus, RuntimeConfig, SpaceStatus};
use cordon_executor::SandboxDriver;
use cordon_policy::{PolicyOverrides, PolicyPreset, ShellOverrides};
use cordon_protocol::{Encoding, EventPayload, FileEdit, Operation};
use cordon_runtime::{
    ApprovalRequest, ApprovalVerdict, CreateSpaceOptions, RunService, RuntimeError,
    SandboxProvisioner, SpaceManager, SpacePatch, SpaceSandbox,
};
use cordon_sandbox::{
    DeleteResult, EditResult, ExecOptions, ExecResult, ReadResult, SandboxConfig, SandboxResult,
    WriteResult,
};
use cordon_store::{ApprovalStore, MemoryStore, SpaceStore};

/// Flat-map sandbox double shared by every provisioned space.
#[derive(Default)]
struct MockDriver {
    files: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl SandboxDriver for MockDriver {
    async fn create_file(
        &self,
        path: &str,
        content: &str,
        _encoding: Encoding,
        overwrite: bool,
    ) -> WriteResult {
        let mut files = self.files.lock().unwrap();
        if files.contains_key(path) && !overwrite {
            return WriteResult::failure("File already exists");
        }
        files.insert(path.to_string(), content.to_string());
        WriteResult::written(content.len() as u64)
    }

    async fn read_file(&self, path: &str, encoding: Encoding) -> ReadResult {
        match self.files.lock().unwrap().get(path) {
            Some(content) => ReadResult::read(content.clone(), encoding, content.len() as u64),
            None => ReadResult::failure("File not found"),
        }
    }

    async fn edit_file(&self, path: &str, edits: &[FileEdit]) -> EditResult {
        let mut files = self.files.lock().unwrap();
        let Some(content) = files.get_mut(path) else {
            return EditResult::failure("File not found");
        };
        for edit in edits {
            *content = content.replacen(&edit.old_content, &edit.new_content, 1);
        }
        EditResult::applied(edits.len() as u64, content.len() as u64)
    }

    async fn delete_file(&self, path: &str) -> DeleteResult {
        match self.files.lock().unwrap().remove(path) {
            Some(_) => DeleteResult::deleted(),
            None => DeleteResult::failure("File not found"),
        }
    }

    async fn exec(&self, _command: &str, _options: ExecOptions) -> ExecResult {
        ExecResult {
            success: true,
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 1,
            timed_out: false,
        }
    }
}

struct MockSandbox {
    driver: MockDriver,
    workspace: PathBuf,
    destroyed: AtomicBool,
}

#[async_trait]
impl SpaceSandbox for MockSandbox {
    fn driver(&self) -> &dyn SandboxDriver {
        &self.driver
    }

    fn workspace_path(&self) -> &Path {
        &self.workspace
    }

    async fn destroy(&self) -> SandboxResult<()> {
        self.destroyed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct MockProvisioner {
    provisioned: Mutex<Vec<Arc<MockSandbox>>>,
}

impl MockProvisioner {
    fn last(&self) -> Arc<MockSandbox> {
        self.provisioned.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl SandboxProvisioner for MockProvisioner {
    async fn provision(&self, config: SandboxConfig) -> SandboxResult<Arc<dyn SpaceSandbox>> {
        let sandbox = Arc::new(MockSandbox {
            driver: MockDriver::default(),
            workspace: config.workspace_base_dir.join(&config.id),
            destroyed: AtomicBool::new(false),
        });
        self.provisioned.lock().unwrap().push(sandbox.clone());
        Ok(sandbox)
    }
}

struct Harness {
    provisioner: Arc<MockProvisioner>,
    spaces: Arc<SpaceManager>,
    runs: RunService,
    store: Arc<MemoryStore>,
}

fn harness() -> Harness {
    let provisioner = Arc::new(MockProvisioner::default());
    let store = Arc::new(MemoryStore::new());
    let spaces = Arc::new(SpaceManager::new(
        provisioner.clone(),
        RuntimeConfig::default(),
        store.clone(),
    ));
    let runs = RunService::new(spaces.clone(), store.clone(), store.clone());
    Harness {
        provisioner,
        spaces,
        runs,
        store,
    }
}

fn options_with_rm_allowed() -> CreateSpaceOptions {
    CreateSpaceOptions {
        policy: Some(PolicyPreset::Standard),
        policy_overrides: Some(PolicyOverrides {
            shell: Some(ShellOverrides {
                allowed_commands: Some(vec!["rm".to_string(), "echo".to_string()]),
                ..ShellOverrides::default()
            }),
            ..PolicyOverrides::default()
        }),
        ..CreateSpaceOptions::default()
    }
}

fn message(content: &str) -> Operation {
    Operation::Message {
        id: None,
        content: content.to_string(),
    }
}

fn create_file(path: &str, content: &str) -> Operation {
    Operation::CreateFile {
        id: None,
        path: path.to_string(),
        content: content.to_string(),
        encoding: Encoding::Utf8,
        overwrite: false,
    }
}

fn gated_shell(id: &str) -> Operation {
    Operation::Shell {
        id: Some(id.to_string()),
        command: "rm -rf tmp".to_string(),
        cwd: None,
        timeout_ms: None,
        env: None,
    }
}

#[tokio::test]
async fn create_space_persists_and_registers() {
    let h = harness();
    let record = h
        .spaces
        .create(CreateSpaceOptions {
            name: Some("build box".to_string()),
            ..CreateSpaceOptions::default()
        })
        .await
        .unwrap();

    assert!(record.id.as_str().starts_with("spc_"));
    assert_eq!(record.status, SpaceStatus::Ready);
    assert_eq!(record.policy, PolicyPreset::Standard);
    assert!(record.expires_at > record.created_at);

    let stored = h.store.get_space(&record.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "build box");
    assert!(h.spaces.get_sandbox(&record.id).await.is_ok());
    assert!(h.spaces.get_policy_engine(&record.id).await.is_ok());
}

#[tokio::test]
async fn destroy_releases_sandbox_and_tombstones() {
    let h = harness();
    let record = h.spaces.create(CreateSpaceOptions::default()).await.unwrap();
    let sandbox = h.provisioner.last();

    let destroyed = h.spaces.destroy(&record.id).await.unwrap();
    assert_eq!(destroyed.status, SpaceStatus::Destroyed);
    assert!(sandbox.destroyed.load(Ordering::SeqCst));

    // Idempotent; the tombstone survives and the registry stays empty.
    let again = h.spaces.destroy(&record.id).await.unwrap();
    assert_eq!(again.status, SpaceStatus::Destroyed);
    assert!(matches!(
        h.spaces.get_sandbox(&record.id).await,
        Err(RuntimeError::SpaceNotFound { .. })
    ));
}

#[tokio::test]
async fn run_against_destroyed_space_is_refused() {
    let h = harness();
    let record = h.spaces.create(CreateSpaceOptions::default()).await.unwrap();
    h.spaces.destroy(&record.id).await.unwrap();

    let err = h
        .runs
        .create(&record.id, vec![message("hi")])
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::SpaceNotFound { .. }));
}

#[tokio::test]
async fn run_completes_and_persists_events() {
    let h = harness();
    let space = h.spaces.create(CreateSpaceOptions::default()).await.unwrap();

    let run = h
        .runs
        .create(
            &space.id,
            vec![message("hi"), create_file("a.txt", "hello")],
        )
        .await
        .unwrap();

    assert!(run.id.as_str().starts_with("run_"));
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.events.len(), 2);
    assert!(run.completed_at.is_some());

    let fetched = h.runs.get(&run.id).await.unwrap();
    assert_eq!(fetched.events.len(), 2);
    let listed = h.runs.list(&space.id, None).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn approval_flow_approved() {
    let h = harness();
    let space = h.spaces.create(options_with_rm_allowed()).await.unwrap();

    let run = h
        .runs
        .create(&space.id, vec![gated_shell("op1"), message("tail")])
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::AwaitingApproval);
    assert_eq!(
        run.pending_approval.as_ref().unwrap().operation_id,
        "op1"
    );
    assert_eq!(run.events.len(), 1);

    // A pending approval record was opened.
    let approvals = h.store.list_approvals_for_run(&run.id).await.unwrap();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].status, ApprovalStatus::Pending);

    let resumed = h
        .runs
        .resume(
            &run.id,
            ApprovalRequest {
                operation_id: "op1".to_string(),
                decision: ApprovalVerdict::Approved,
                reason: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(resumed.status, RunStatus::Completed);
    assert!(resumed.pending_approval.is_none());
    // Pre-suspension events plus the approved shell and the tail message.
    assert_eq!(resumed.events.len(), 3);
    match &resumed.events[1].payload {
        EventPayload::Shell { success, .. } => assert!(*success),
        other => panic!("unexpected payload: {other:?}"),
    }

    let approvals = h.store.list_approvals_for_run(&run.id).await.unwrap();
    assert_eq!(approvals[0].status, ApprovalStatus::Approved);
    assert!(approvals[0].decided_at.is_some());
}

#[tokio::test]
async fn approval_flow_denied_with_reason() {
    let h = harness();
    let space = h.spaces.create(options_with_rm_allowed()).await.unwrap();

    let run = h
        .runs
        .create(&space.id, vec![gated_shell("op1")])
        .await
        .unwrap();

    let resumed = h
        .runs
        .resume(
            &run.id,
            ApprovalRequest {
                operation_id: "op1".to_string(),
                decision: ApprovalVerdict::Denied,
                reason: Some("no".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(resumed.status, RunStatus::Completed);
    match &resumed.events[1].payload {
        EventPayload::PolicyDenied { reason, .. } => assert_eq!(reason, "no"),
        other => panic!("unexpected payload: {other:?}"),
    }

    let approvals = h.store.list_approvals_for_run(&run.id).await.unwrap();
    assert_eq!(approvals[0].status, ApprovalStatus::Denied);
    assert_eq!(approvals[0].decision_reason.as_deref(), Some("no"));
}

#[tokio::test]
async fn resume_preconditions() {
    let h = harness();
    let space = h.spaces.create(options_with_rm_allowed()).await.unwrap();
    let run = h
        .runs
        .create(&space.id, vec![gated_shell("op1")])
        .await
        .unwrap();

    // Wrong operation id.
    let err = h
        .runs
        .resume(
            &run.id,
            ApprovalRequest {
                operation_id: "op9".to_string(),
                decision: ApprovalVerdict::Approved,
                reason: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::ApprovalMismatch { .. }));

    // Resolve, then resume again.
    h.runs
        .resume(
            &run.id,
            ApprovalRequest {
                operation_id: "op1".to_string(),
                decision: ApprovalVerdict::Approved,
                reason: None,
            },
        )
        .await
        .unwrap();
    let err = h
        .runs
        .resume(
            &run.id,
            ApprovalRequest {
                operation_id: "op1".to_string(),
                decision: ApprovalVerdict::Approved,
                reason: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::RunNotSuspended { .. }));
}

#[tokio::test]
async fn second_gate_opens_a_second_approval_record() {
    let h = harness();
    let space = h.spaces.create(options_with_rm_allowed()).await.unwrap();

    let run = h
        .runs
        .create(&space.id, vec![gated_shell("a"), gated_shell("b")])
        .await
        .unwrap();
    assert_eq!(run.pending_approval.as_ref().unwrap().operation_id, "a");

    let resumed = h
        .runs
        .resume(
            &run.id,
            ApprovalRequest {
                operation_id: "a".to_string(),
                decision: ApprovalVerdict::Approved,
                reason: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(resumed.status, RunStatus::AwaitingApproval);
    assert_eq!(resumed.pending_approval.as_ref().unwrap().operation_id, "b");

    let approvals = h.store.list_approvals_for_run(&run.id).await.unwrap();
    assert_eq!(approvals.len(), 2);
    assert_eq!(approvals[0].status, ApprovalStatus::Approved);
    assert_eq!(approvals[1].status, ApprovalStatus::Pending);
}

#[tokio::test]
async fn cancel_blocks_resume() {
    let h = harness();
    let space = h.spaces.create(options_with_rm_allowed()).await.unwrap();
    let run = h
        .runs
        .create(&space.id, vec![gated_shell("op1")])
        .await
        .unwrap();

    let cancelled = h.runs.cancel(&run.id).await.unwrap();
    assert_eq!(cancelled.status, RunStatus::Cancelled);
    assert!(cancelled.completed_at.is_some());

    let err = h
        .runs
        .resume(
            &run.id,
            ApprovalRequest {
                operation_id: "op1".to_string(),
                decision: ApprovalVerdict::Approved,
                reason: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::RunNotSuspended { .. }));

    // A terminal run cannot be cancelled again.
    let err = h.runs.cancel(&run.id).await.unwrap_err();
    assert!(matches!(err, RuntimeError::RunNotCancellable { .. }));
}

#[tokio::test]
async fn update_and_extend() {
    let h = harness();
    let space = h.spaces.create(CreateSpaceOptions::default()).await.unwrap();

    let updated = h
        .spaces
        .update(
            &space.id,
            SpacePatch {
                name: Some("renamed".to_string()),
                metadata: Some(serde_json::json!({"team": "infra"})),
                ..SpacePatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "renamed");

    let extended = h.spaces.extend(&space.id, 3_600).await.unwrap();
    assert_eq!(
        extended.expires_at,
        space.expires_at + chrono::Duration::seconds(3_600)
    );
}

#[tokio::test]
async fn spaces_run_concurrently_but_runs_serialize_within_a_space() {
    let h = harness();
    let space = h.spaces.create(CreateSpaceOptions::default()).await.unwrap();

    // Two batches into the same space; the gate serializes them and both
    // land with consistent event counts.
    let runs = &h.runs;
    let (a, b) = tokio::join!(
        runs.create(&space.id, vec![create_file("one.txt", "1")]),
        runs.create(&space.id, vec![create_file("two.txt", "2")]),
    );
    assert_eq!(a.unwrap().status, RunStatus::Completed);
    assert_eq!(b.unwrap().status, RunStatus::Completed);
    assert_eq!(h.runs.list(&space.id, None).await.unwrap().len(), 2);
}
