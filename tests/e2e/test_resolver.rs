//! S6: transitive import closure over projects staged directly onto the
//! registry cache (bypassing the push pipeline, since only the resolver
//! is under test here).

use protato::git::Identity;
use protato::registry::{ProjectPath, RegistryCache};

use super::support;

#[test]
fn closure_follows_import_into_owning_project() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = tmp.path().join("remote.git");
    support::init_bare_remote(&remote);

    let cache = RegistryCache::open(&tmp.path().join("cache"), remote.to_str().unwrap(), "main").unwrap();

    let author = Identity {
        name: "protato".to_string(),
        email: "protato@localhost".to_string(),
        time: gix::date::Time::now_local_or_utc(),
    };

    let base = cache.snapshot().unwrap();
    let common = ProjectPath::parse("teamA/common").unwrap();
    let snapshot_1 = cache
        .set_project(
            &common,
            &[("v1/types.proto".to_string(), b"syntax = \"proto3\";\nmessage Id {}\n".to_vec())],
            &base,
            &author,
            "https://git.example.com/teamA/common",
            "0000000000000000000000000000000000000a",
        )
        .unwrap();

    let svc = ProjectPath::parse("teamA/svc").unwrap();
    let service_proto = b"syntax = \"proto3\";\nimport \"proto/teamA/common/v1/types.proto\";\nmessage Service {}\n".to_vec();
    let snapshot_2 = cache
        .set_project(
            &svc,
            &[("v1/service.proto".to_string(), service_proto)],
            &snapshot_1,
            &author,
            "https://git.example.com/teamA/svc",
            "0000000000000000000000000000000000000b",
        )
        .unwrap();

    let result = protato::resolver::compute_closure(&cache, &[svc.clone()], &snapshot_2, Some("proto")).unwrap();

    assert!(result.unresolved.is_empty(), "unexpected unresolved imports: {:?}", result.unresolved);
    assert_eq!(
        result.closure,
        [svc, common].into_iter().collect::<std::collections::BTreeSet<_>>()
    );
}

/// An import that cannot be matched to any registry project (typo'd
/// path, or a project that was never published) is reported rather than
/// silently dropped, and does not stop resolution of the rest of the
/// closure.
#[test]
fn closure_reports_unresolved_import_without_failing() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = tmp.path().join("remote.git");
    support::init_bare_remote(&remote);

    let cache = RegistryCache::open(&tmp.path().join("cache"), remote.to_str().unwrap(), "main").unwrap();
    let author = Identity {
        name: "protato".to_string(),
        email: "protato@localhost".to_string(),
        time: gix::date::Time::now_local_or_utc(),
    };

    let base = cache.snapshot().unwrap();
    let svc = ProjectPath::parse("teamA/svc").unwrap();
    let service_proto =
        b"syntax = \"proto3\";\nimport \"proto/teamA/missing/v1/types.proto\";\nmessage Service {}\n".to_vec();
    let snapshot = cache
        .set_project(
            &svc,
            &[("v1/service.proto".to_string(), service_proto)],
            &base,
            &author,
            "https://git.example.com/teamA/svc",
            "0000000000000000000000000000000000000c",
        )
        .unwrap();

    let result = protato::resolver::compute_closure(&cache, &[svc.clone()], &snapshot, Some("proto")).unwrap();

    assert_eq!(result.closure, [svc].into_iter().collect::<std::collections::BTreeSet<_>>());
    assert_eq!(result.unresolved.len(), 1);
    assert_eq!(result.unresolved[0].import, "proto/teamA/missing/v1/types.proto");
}
