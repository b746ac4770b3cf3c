//! Staging a project update into a new commit (§4.2 "Key algorithms" /
//! "Staging").
//!
//! `stage_project_update` composes the new tree by walking the base tree
//! and substituting exactly one directory, bottom-up: each file becomes a
//! blob (content-addressed, so re-writing identical bytes is free), each
//! intermediate directory a tree object, and every sibling subtree is
//! reused by hash without being re-read or re-written.

use std::collections::BTreeMap;

use crate::git::{self, Identity, NewTreeEntry, Repo};

use super::error::RegistryResult;
use super::project::{METADATA_FILE, PROJECT_COMMIT_MESSAGE_VERB, ProjectMetadata, ProjectPath, PROTOS_ROOT};

enum Node {
    File(String, gix::objs::tree::EntryMode),
    Dir(BTreeMap<String, Node>),
}

fn insert_into(tree: &mut BTreeMap<String, Node>, parts: &[&str], hash: String, mode: gix::objs::tree::EntryMode) {
    if parts.len() == 1 {
        tree.insert(parts[0].to_string(), Node::File(hash, mode));
        return;
    }
    let entry = tree
        .entry(parts[0].to_string())
        .or_insert_with(|| Node::Dir(BTreeMap::new()));
    if let Node::Dir(sub) = entry {
        insert_into(sub, &parts[1..], hash, mode);
    }
}

fn write_node(repo: &Repo, node: &BTreeMap<String, Node>) -> RegistryResult<String> {
    let mut entries = Vec::with_capacity(node.len());
    for (name, child) in node {
        match child {
            Node::File(hash, mode) => entries.push(NewTreeEntry {
                mode: *mode,
                hash: hash.clone(),
                name: name.clone(),
            }),
            Node::Dir(sub) => {
                let hash = write_node(repo, sub)?;
                entries.push(NewTreeEntry {
                    mode: git::tree_mode(),
                    hash,
                    name: name.clone(),
                });
            }
        }
    }
    Ok(git::write_tree(repo, &entries)?)
}

/// Build the project's subtree (files + regenerated metadata), returning
/// its hash.
fn build_project_tree(repo: &Repo, files: &[(String, Vec<u8>)], metadata_yaml: &str) -> RegistryResult<String> {
    let mut root: BTreeMap<String, Node> = BTreeMap::new();

    for (rel_path, bytes) in files {
        let hash = git::write_blob(repo, bytes)?;
        let parts: Vec<&str> = rel_path.split('/').collect();
        insert_into(&mut root, &parts, hash, git::blob_mode());
    }

    let metadata_hash = git::write_blob(repo, metadata_yaml.as_bytes())?;
    root.insert(
        METADATA_FILE.to_string(),
        Node::File(metadata_hash, git::blob_mode()),
    );

    write_node(repo, &root)
}

/// Replace the tree at `dir_path` (relative to `snapshot`'s root,
/// `""` meaning the root itself) with `leaf_hash`, re-composing every
/// ancestor directory up to the root while reusing every sibling subtree
/// unchanged. Returns the new root tree hash.
fn replace_in_tree(repo: &Repo, snapshot: &str, dir_path: &str, segments: &[&str], leaf_hash: &str) -> RegistryResult<String> {
    if segments.is_empty() {
        return Ok(leaf_hash.to_string());
    }

    let name = segments[0];
    let rest = &segments[1..];

    let spec = if dir_path.is_empty() {
        snapshot.to_string()
    } else {
        format!("{snapshot}:{dir_path}")
    };
    let existing_entries = git::read_tree(repo, &spec, false).unwrap_or_default();

    let child_dir_path = if dir_path.is_empty() {
        name.to_string()
    } else {
        format!("{dir_path}/{name}")
    };
    let new_child_hash = replace_in_tree(repo, snapshot, &child_dir_path, rest, leaf_hash)?;

    let mut entries: Vec<NewTreeEntry> = existing_entries
        .iter()
        .filter(|e| e.path != name)
        .map(|e| NewTreeEntry {
            mode: e.mode,
            hash: e.hash.clone(),
            name: e.path.clone(),
        })
        .collect();
    entries.push(NewTreeEntry {
        mode: git::tree_mode(),
        hash: new_child_hash,
        name: name.to_string(),
    });

    Ok(git::write_tree(repo, &entries)?)
}

/// Compose and commit a new snapshot whose tree equals `base_snapshot`'s
/// tree with `project`'s subtree replaced by exactly `files` plus a
/// regenerated metadata file carrying `(repo_commit, repo_url)`. The
/// commit's only parent is `base_snapshot`.
pub fn stage_project_update(
    repo: &Repo,
    project: &ProjectPath,
    files: &[(String, Vec<u8>)],
    base_snapshot: &str,
    author: &Identity,
    repo_url: &str,
    repo_commit: &str,
) -> RegistryResult<String> {
    let metadata = ProjectMetadata::new(repo_commit, repo_url);
    let metadata_yaml = metadata
        .to_yaml()
        .map_err(|e| crate::git::GitError::GitCommand(format!("failed to render metadata: {e}")))?;

    let project_tree_hash = build_project_tree(repo, files, &metadata_yaml)?;

    let mut segments: Vec<&str> = vec![PROTOS_ROOT];
    segments.extend(project.segments());

    let new_root_tree = replace_in_tree(repo, base_snapshot, "", &segments, &project_tree_hash)?;

    let message = format!("{PROJECT_COMMIT_MESSAGE_VERB} {project}");
    let new_commit = git::commit(
        repo,
        &new_root_tree,
        &[base_snapshot.to_string()],
        author,
        author,
        &message,
    )?;

    Ok(new_commit)
}
