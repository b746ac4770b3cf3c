//! S5: two independent producers racing to own the same registry path.

use protato::git::{OpenOpts, Repo};
use protato::orchestrator::{self, CancellationToken, OrchestratorError, RetryPolicy};
use protato::registry::RegistryCache;
use protato::workspace::{Directories, Workspace, WorkspaceConfig};

use super::support;

fn config(service: &str) -> WorkspaceConfig {
    WorkspaceConfig {
        service: service.to_string(),
        directories: Directories { owned: "proto".into(), vendor: "vendor".into() },
        auto_discover: true,
        projects: vec![],
        ignores: vec![],
    }
}

/// Two different producers, each owning a local project path of `svc`,
/// both belonging to service `teamA`, race to publish. The second
/// pusher is rejected with the first's normalized origin URL as the
/// recorded owner, and the registry is left exactly as the first pusher
/// left it.
#[tokio::test]
async fn second_producer_is_rejected_by_first_producers_claim() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = tmp.path().join("remote.git");
    support::init_bare_remote(&remote);
    let cancel = CancellationToken::new();

    let u1_root = tmp.path().join("u1");
    support::init_producer_repo(&u1_root, "https://git.example.com/u1/svc.git");
    let u1_ws = Workspace::init(&u1_root, config("teamA"), false).unwrap();
    let u1_proj = u1_ws.owned_dir().join("svc");
    std::fs::create_dir_all(&u1_proj).unwrap();
    std::fs::write(u1_proj.join("service.proto"), b"syntax = \"proto3\";\nmessage Service {}\n").unwrap();
    support::commit_all(&u1_root, "u1 adds svc");
    let u1_repo = Repo::open(&u1_root, OpenOpts { bare: false }).unwrap();
    let u1_cache = RegistryCache::open(&tmp.path().join("u1-cache"), remote.to_str().unwrap(), "main").unwrap();

    let u1_outcome = orchestrator::push(&u1_ws, &u1_repo, &u1_cache, RetryPolicy::default(), &cancel, false, None)
        .await
        .unwrap();
    let snapshot_after_u1 = u1_outcome.snapshot.unwrap();

    let u2_root = tmp.path().join("u2");
    support::init_producer_repo(&u2_root, "https://git.example.com/u2/svc.git");
    let u2_ws = Workspace::init(&u2_root, config("teamA"), false).unwrap();
    let u2_proj = u2_ws.owned_dir().join("svc");
    std::fs::create_dir_all(&u2_proj).unwrap();
    std::fs::write(u2_proj.join("service.proto"), b"syntax = \"proto3\";\nmessage OtherService {}\n").unwrap();
    support::commit_all(&u2_root, "u2 adds svc");
    let u2_repo = Repo::open(&u2_root, OpenOpts { bare: false }).unwrap();
    let u2_cache = RegistryCache::open(&tmp.path().join("u2-cache"), remote.to_str().unwrap(), "main").unwrap();

    let err = orchestrator::push(&u2_ws, &u2_repo, &u2_cache, RetryPolicy::default(), &cancel, false, None)
        .await
        .unwrap_err();

    match err {
        OrchestratorError::ConflictOwner { path, owner } => {
            assert_eq!(path.as_str(), "teamA/svc");
            assert_eq!(owner, "https://git.example.com/u1/svc");
        }
        other => panic!("expected ConflictOwner, got {other:?}"),
    }

    // The registry is untouched by the rejected push.
    let check_cache = RegistryCache::open(&tmp.path().join("check-cache"), remote.to_str().unwrap(), "main").unwrap();
    check_cache.refresh().await.unwrap();
    assert_eq!(check_cache.snapshot().unwrap(), snapshot_after_u1);
}

/// A producer whose owned tree has both `api` and `api/v1` carrying
/// their own `.proto` files would, if published, nest one project under
/// another (§3's overlap prohibition). The push pipeline must reject the
/// whole batch before staging anything, rather than letting
/// `check_project_claim` try (and fail) to catch it against a snapshot
/// where neither project exists yet.
#[tokio::test]
async fn push_rejects_a_batch_with_self_overlapping_owned_projects() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = tmp.path().join("remote.git");
    support::init_bare_remote(&remote);

    let producer_root = tmp.path().join("producer");
    support::init_producer_repo(&producer_root, "https://git.example.com/acme/payments.git");
    let ws = Workspace::init(&producer_root, config("payments"), false).unwrap();

    let api_dir = ws.owned_dir().join("api");
    std::fs::create_dir_all(&api_dir).unwrap();
    std::fs::write(api_dir.join("a.proto"), b"syntax = \"proto3\";\nmessage A {}\n").unwrap();

    let nested_dir = ws.owned_dir().join("api/v1");
    std::fs::create_dir_all(&nested_dir).unwrap();
    std::fs::write(nested_dir.join("b.proto"), b"syntax = \"proto3\";\nmessage B {}\n").unwrap();

    support::commit_all(&producer_root, "add overlapping api and api/v1");
    let repo = Repo::open(&producer_root, OpenOpts { bare: false }).unwrap();
    let cache = RegistryCache::open(&tmp.path().join("cache"), remote.to_str().unwrap(), "main").unwrap();
    let cancel = CancellationToken::new();

    let err = orchestrator::push(&ws, &repo, &cache, RetryPolicy::default(), &cancel, false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::ProjectsOverlap { .. }));

    // Nothing was staged or pushed: the remote's tracking branch never
    // advanced past its initial (nonexistent) state.
    let check_cache = RegistryCache::open(&tmp.path().join("check-cache"), remote.to_str().unwrap(), "main").unwrap();
    check_cache.refresh().await.unwrap();
    assert!(check_cache.list_projects(None, &check_cache.snapshot().unwrap()).unwrap().is_empty());
}

/// Once a producer has published `svc`, the *same* producer may not
/// later publish `svc/v2` as a second, separate project: overlap is
/// absolute (§3, §4.2), not contingent on who owns the colliding path.
#[tokio::test]
async fn same_owner_cannot_nest_a_new_project_under_its_own_existing_one() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = tmp.path().join("remote.git");
    support::init_bare_remote(&remote);

    let producer_root = tmp.path().join("producer");
    support::init_producer_repo(&producer_root, "https://git.example.com/acme/payments.git");
    let ws = Workspace::init(&producer_root, config("payments"), false).unwrap();
    let svc_dir = ws.owned_dir().join("svc");
    std::fs::create_dir_all(&svc_dir).unwrap();
    std::fs::write(svc_dir.join("service.proto"), b"syntax = \"proto3\";\nmessage Service {}\n").unwrap();
    support::commit_all(&producer_root, "add svc");

    let repo = Repo::open(&producer_root, OpenOpts { bare: false }).unwrap();
    let cache = RegistryCache::open(&tmp.path().join("cache"), remote.to_str().unwrap(), "main").unwrap();
    let cancel = CancellationToken::new();
    orchestrator::push(&ws, &repo, &cache, RetryPolicy::default(), &cancel, false, None)
        .await
        .unwrap();

    // Replace svc's own file with a nested svc/v2 project, so this second
    // push's only owned project is the new, nested one.
    std::fs::remove_file(svc_dir.join("service.proto")).unwrap();
    let nested_dir = svc_dir.join("v2");
    std::fs::create_dir_all(&nested_dir).unwrap();
    std::fs::write(nested_dir.join("service.proto"), b"syntax = \"proto3\";\nmessage ServiceV2 {}\n").unwrap();
    support::commit_all(&producer_root, "add svc/v2");

    let err = orchestrator::push(&ws, &repo, &cache, RetryPolicy::default(), &cancel, false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::ConflictParent { .. }), "expected ConflictParent, got {err:?}");
}
