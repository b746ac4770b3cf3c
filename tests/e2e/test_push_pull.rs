//! S1 (first-time publish), S2 (pull then re-pull), S4 (deletion guard),
//! and a local-drift `verify` scenario, all against a local bare remote.

use protato::git::{OpenOpts, Repo};
use protato::orchestrator::{self, CancellationToken, RetryPolicy};
use protato::registry::{ProjectPath, RegistryCache};
use protato::workspace::{Directories, Workspace, WorkspaceConfig};

use super::support;

fn producer_config(service: &str) -> WorkspaceConfig {
    WorkspaceConfig {
        service: service.to_string(),
        directories: Directories { owned: "proto".into(), vendor: "vendor".into() },
        auto_discover: true,
        projects: vec![],
        ignores: vec![],
    }
}

fn consumer_config(service: &str) -> WorkspaceConfig {
    WorkspaceConfig {
        service: service.to_string(),
        directories: Directories::default(),
        auto_discover: true,
        projects: vec![],
        ignores: vec![],
    }
}

/// S1: an empty registry, one producer, one owned project. After
/// `push`, the registry's new HEAD carries exactly that project's files
/// plus its metadata file, recording the producer's normalized origin
/// URL and HEAD commit.
#[tokio::test]
async fn first_time_publish_creates_project_and_metadata() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = tmp.path().join("remote.git");
    support::init_bare_remote(&remote);

    let producer_root = tmp.path().join("producer");
    support::init_producer_repo(&producer_root, "git@github.com:acme/payments.git");

    let workspace = Workspace::init(&producer_root, producer_config("payments"), false).unwrap();
    let proj_dir = workspace.owned_dir().join("api/v1");
    std::fs::create_dir_all(&proj_dir).unwrap();
    std::fs::write(proj_dir.join("payment.proto"), b"syntax = \"proto3\";\nmessage Payment {}\n").unwrap();
    support::commit_all(&producer_root, "add payment.proto");

    let producer_repo = Repo::open(&producer_root, OpenOpts { bare: false }).unwrap();
    let expected_head = producer_repo.rev_hash("HEAD").unwrap();

    let cache = RegistryCache::open(&tmp.path().join("cache"), remote.to_str().unwrap(), "main").unwrap();
    let cancel = CancellationToken::new();

    let outcome = orchestrator::push(
        &workspace,
        &producer_repo,
        &cache,
        RetryPolicy::default(),
        &cancel,
        false, // skip protox validation; out of scope for this test
        None,
    )
    .await
    .unwrap();

    let snapshot = outcome.snapshot.expect("a project was owned, so push should produce a snapshot");
    assert_eq!(outcome.projects_updated, vec![ProjectPath::parse("payments/api/v1").unwrap()]);

    // A second, independent cache pointed at the same remote sees exactly
    // what was published — no other paths were touched.
    let verify_cache =
        RegistryCache::open(&tmp.path().join("verify-cache"), remote.to_str().unwrap(), "main").unwrap();
    verify_cache.refresh().await.unwrap();
    let head = verify_cache.snapshot().unwrap();
    assert_eq!(head, snapshot);

    let project_path = ProjectPath::parse("payments/api/v1").unwrap();
    let files = verify_cache.list_project_files(&project_path, &head).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "payment.proto");

    let (project, _tree) = verify_cache.lookup_project(&project_path, &head).unwrap().unwrap();
    assert_eq!(project.source_commit, expected_head);
    assert_eq!(project.source_repo_url, "https://github.com/acme/payments");

    // Every other registry project (there are none) stays absent: the
    // only project visible is the one just published.
    assert_eq!(verify_cache.list_projects(None, &head).unwrap(), vec![project_path]);
}

/// S2: a consumer pulls a published project, then immediately re-pulls
/// with no arguments; the second pull reports zero changes.
#[tokio::test]
async fn consumer_pull_then_repull_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = tmp.path().join("remote.git");
    support::init_bare_remote(&remote);

    let producer_root = tmp.path().join("producer");
    support::init_producer_repo(&producer_root, "git@github.com:acme/payments.git");
    let producer_ws = Workspace::init(&producer_root, producer_config("payments"), false).unwrap();
    let proj_dir = producer_ws.owned_dir().join("api");
    std::fs::create_dir_all(&proj_dir).unwrap();
    std::fs::write(proj_dir.join("payment.proto"), b"syntax = \"proto3\";\nmessage Payment {}\n").unwrap();
    support::commit_all(&producer_root, "add payment.proto");

    let producer_repo = Repo::open(&producer_root, OpenOpts { bare: false }).unwrap();
    let producer_cache = RegistryCache::open(&tmp.path().join("producer-cache"), remote.to_str().unwrap(), "main").unwrap();
    let cancel = CancellationToken::new();
    orchestrator::push(&producer_ws, &producer_repo, &producer_cache, RetryPolicy::default(), &cancel, false, None)
        .await
        .unwrap();

    let consumer_root = tmp.path().join("consumer");
    std::fs::create_dir_all(&consumer_root).unwrap();
    let consumer_ws = Workspace::init(&consumer_root, consumer_config("checkout"), false).unwrap();
    let consumer_cache = RegistryCache::open(&tmp.path().join("consumer-cache"), remote.to_str().unwrap(), "main").unwrap();

    let roots = vec![ProjectPath::parse("payments/api").unwrap()];
    let first = orchestrator::pull(&consumer_ws, &consumer_cache, &cancel, &roots, false, true, false, None)
        .await
        .unwrap();
    assert_eq!(first.files_changed, 1);
    assert_eq!(first.files_deleted, 0);

    let pulled_file = consumer_ws.vendor_dir().join("payments/api/payment.proto");
    assert_eq!(
        std::fs::read(&pulled_file).unwrap(),
        std::fs::read(proj_dir.join("payment.proto")).unwrap()
    );
    let lock = std::fs::read_to_string(consumer_ws.vendor_dir().join("payments/api/protato.lock")).unwrap();
    assert!(lock.contains("snapshot:"));

    // Immediate re-pull with no explicit roots re-pulls every currently
    // pulled project and reports zero changes.
    let second = orchestrator::pull(&consumer_ws, &consumer_cache, &cancel, &[], false, true, false, None)
        .await
        .unwrap();
    assert_eq!(second.files_changed, 0);
    assert_eq!(second.files_deleted, 0);
    assert_eq!(second.projects, vec![ProjectPath::parse("payments/api").unwrap()]);
}

/// S4: a file that disappears from the registry between pulls would be
/// deleted locally; without `--force` the pull aborts before any write,
/// and with `--force` it proceeds and advances the lock.
#[tokio::test]
async fn pull_without_force_refuses_to_delete_local_files() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = tmp.path().join("remote.git");
    support::init_bare_remote(&remote);

    let producer_root = tmp.path().join("producer");
    support::init_producer_repo(&producer_root, "git@github.com:acme/widgets.git");
    let producer_ws = Workspace::init(&producer_root, producer_config("widgets"), false).unwrap();
    let proj_dir = producer_ws.owned_dir().join("core");
    std::fs::create_dir_all(&proj_dir).unwrap();
    std::fs::write(proj_dir.join("x.proto"), b"syntax = \"proto3\";\nmessage X {}\n").unwrap();
    std::fs::write(proj_dir.join("y.proto"), b"syntax = \"proto3\";\nmessage Y {}\n").unwrap();
    support::commit_all(&producer_root, "add x and y");

    let producer_repo = Repo::open(&producer_root, OpenOpts { bare: false }).unwrap();
    let producer_cache = RegistryCache::open(&tmp.path().join("producer-cache"), remote.to_str().unwrap(), "main").unwrap();
    let cancel = CancellationToken::new();
    orchestrator::push(&producer_ws, &producer_repo, &producer_cache, RetryPolicy::default(), &cancel, false, None)
        .await
        .unwrap();

    let consumer_root = tmp.path().join("consumer");
    std::fs::create_dir_all(&consumer_root).unwrap();
    let consumer_ws = Workspace::init(&consumer_root, consumer_config("checkout"), false).unwrap();
    let consumer_cache = RegistryCache::open(&tmp.path().join("consumer-cache"), remote.to_str().unwrap(), "main").unwrap();

    let roots = vec![ProjectPath::parse("widgets/core").unwrap()];
    orchestrator::pull(&consumer_ws, &consumer_cache, &cancel, &roots, false, true, false, None)
        .await
        .unwrap();

    let y_path = consumer_ws.vendor_dir().join("widgets/core/y.proto");
    assert!(y_path.is_file());

    // Producer drops y.proto and republishes.
    std::fs::remove_file(proj_dir.join("y.proto")).unwrap();
    support::commit_all(&producer_root, "drop y.proto");
    orchestrator::push(&producer_ws, &producer_repo, &producer_cache, RetryPolicy::default(), &cancel, false, None)
        .await
        .unwrap();

    // Re-pull (no explicit roots) without --force: aborts before any write.
    let err = orchestrator::pull(&consumer_ws, &consumer_cache, &cancel, &[], false, true, false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, protato::orchestrator::OrchestratorError::DeletionWouldOccur { .. }));
    assert!(y_path.is_file(), "workspace must be unchanged when the pull aborts");

    // With --force, the deletion proceeds and the lock advances.
    let forced = orchestrator::pull(&consumer_ws, &consumer_cache, &cancel, &[], false, true, true, None)
        .await
        .unwrap();
    assert_eq!(forced.files_deleted, 1);
    assert!(!y_path.is_file());
}

/// A file edited locally after a pull shows up as `ModifiedLocally` in
/// `verify`, without that being escalated to an error (§4.5 "Verify
/// pipeline").
#[tokio::test]
async fn verify_reports_local_drift_as_a_warning_not_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = tmp.path().join("remote.git");
    support::init_bare_remote(&remote);

    let producer_root = tmp.path().join("producer");
    support::init_producer_repo(&producer_root, "git@github.com:acme/widgets.git");
    let producer_ws = Workspace::init(&producer_root, producer_config("widgets"), false).unwrap();
    let proj_dir = producer_ws.owned_dir().join("core");
    std::fs::create_dir_all(&proj_dir).unwrap();
    std::fs::write(proj_dir.join("x.proto"), b"syntax = \"proto3\";\nmessage X {}\n").unwrap();
    support::commit_all(&producer_root, "add x.proto");

    let producer_repo = Repo::open(&producer_root, OpenOpts { bare: false }).unwrap();
    let producer_cache = RegistryCache::open(&tmp.path().join("producer-cache"), remote.to_str().unwrap(), "main").unwrap();
    let cancel = CancellationToken::new();
    orchestrator::push(&producer_ws, &producer_repo, &producer_cache, RetryPolicy::default(), &cancel, false, None)
        .await
        .unwrap();

    let consumer_root = tmp.path().join("consumer");
    std::fs::create_dir_all(&consumer_root).unwrap();
    let consumer_ws = Workspace::init(&consumer_root, consumer_config("checkout"), false).unwrap();
    let consumer_cache = RegistryCache::open(&tmp.path().join("consumer-cache"), remote.to_str().unwrap(), "main").unwrap();

    let roots = vec![ProjectPath::parse("widgets/core").unwrap()];
    orchestrator::pull(&consumer_ws, &consumer_cache, &cancel, &roots, false, true, false, None)
        .await
        .unwrap();

    std::fs::write(consumer_ws.vendor_dir().join("widgets/core/x.proto"), b"syntax = \"proto3\";\nmessage X { string id = 1; }\n").unwrap();

    let report = orchestrator::verify(&consumer_ws, &consumer_cache, "https://github.com/acme/checkout").unwrap();
    assert!(!report.has_errors());
    assert_eq!(report.file_diffs.len(), 1);
    assert_eq!(report.file_diffs[0].verdict, protato::orchestrator::FileVerdict::ModifiedLocally);
    assert!(report.ownership_conflicts.is_empty());
}
