//! Low-level object read/write operations: trees, blobs, commits.
//!
//! This is the part of the substrate the registry cache leans on hardest:
//! every snapshot read and every staged mutation goes through here. Mirrors
//! the teacher's `introspection`/`diff` modules' pattern of doing the gix
//! work inside a small focused function and mapping every fallible gix call
//! through `GitError::Gix`.

use std::io::Write;

use gix::bstr::{BStr, BString, ByteSlice, ByteVec};
use gix::objs::tree::EntryKind;

use super::error::{GitError, GitResult};
use super::repo::Repo;

/// The kind of object a tree entry points at. The spec only distinguishes
/// blob vs. tree; submodules/symlinks are folded into `Blob` for read
/// purposes (none of the upper layers special-case them) but are preserved
/// in `mode` so bit-identical trees can be re-written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Blob,
    Tree,
}

/// One entry of a tree listing, relative to the tree root that was read.
#[derive(Debug, Clone)]
pub struct TreeEntry {
    pub mode: gix::objs::tree::EntryMode,
    pub kind: EntryType,
    pub hash: String,
    /// Path relative to the tree root (forward-slash separated).
    pub path: String,
}

fn entry_type(mode: gix::objs::tree::EntryMode) -> EntryType {
    if mode.is_tree() {
        EntryType::Tree
    } else {
        EntryType::Blob
    }
}

/// Read the entries of `treeish` (anything `rev_hash` would resolve, or a
/// bare tree id). Non-recursive mode lists only the immediate children;
/// recursive mode flattens the whole subtree with paths relative to the
/// root.
pub fn read_tree(repo: &Repo, treeish: &str, recursive: bool) -> GitResult<Vec<TreeEntry>> {
    let tree_id = resolve_tree(repo, treeish)?;
    let tree = repo
        .raw()
        .find_tree(tree_id)
        .map_err(|e| GitError::Gix(Box::new(e)))?;

    if !recursive {
        let mut out = Vec::new();
        for entry in tree.iter() {
            let entry = entry.map_err(|e| GitError::Gix(Box::new(e)))?;
            out.push(TreeEntry {
                mode: entry.mode(),
                kind: entry_type(entry.mode()),
                hash: entry.oid().to_string(),
                path: entry.filename().to_str_lossy().into_owned(),
            });
        }
        return Ok(out);
    }

    let mut out = Vec::new();
    walk_recursive(repo, tree_id, BString::default(), &mut out)?;
    Ok(out)
}

fn walk_recursive(
    repo: &Repo,
    tree_id: gix::ObjectId,
    prefix: BString,
    out: &mut Vec<TreeEntry>,
) -> GitResult<()> {
    let tree = repo
        .raw()
        .find_tree(tree_id)
        .map_err(|e| GitError::Gix(Box::new(e)))?;

    for entry in tree.iter() {
        let entry = entry.map_err(|e| GitError::Gix(Box::new(e)))?;
        let mut path = prefix.clone();
        if !path.is_empty() {
            path.push_byte(b'/');
        }
        path.extend_from_slice(entry.filename());

        if entry.mode().is_tree() {
            walk_recursive(repo, entry.oid().detach(), path, out)?;
        } else {
            out.push(TreeEntry {
                mode: entry.mode(),
                kind: EntryType::Blob,
                hash: entry.oid().to_string(),
                path: path.to_str_lossy().into_owned(),
            });
        }
    }

    Ok(())
}

fn resolve_tree(repo: &Repo, treeish: &str) -> GitResult<gix::ObjectId> {
    let spec = repo
        .raw()
        .rev_parse_single(treeish.as_bytes().as_bstr())
        .map_err(|_| GitError::UnknownRevision(treeish.to_string()))?;
    let object = repo
        .raw()
        .find_object(spec)
        .map_err(|_| GitError::UnknownObject(treeish.to_string()))?;
    let tree_id = match object.kind {
        gix::object::Kind::Commit => object
            .try_into_commit()
            .map_err(|e| GitError::Gix(Box::new(e)))?
            .tree_id()
            .map_err(|e| GitError::Gix(Box::new(e)))?
            .detach(),
        gix::object::Kind::Tree => object.id,
        _ => return Err(GitError::UnknownObject(treeish.to_string())),
    };
    Ok(tree_id)
}

/// Stream a blob's bytes to `writer`.
pub fn read_blob(repo: &Repo, hash: &str, writer: &mut impl Write) -> GitResult<()> {
    let id = parse_hash(hash)?;
    let object = repo
        .raw()
        .find_object(id)
        .map_err(|_| GitError::UnknownObject(hash.to_string()))?;
    writer.write_all(&object.data)?;
    Ok(())
}

/// Convenience wrapper returning the blob's bytes directly.
pub fn read_blob_bytes(repo: &Repo, hash: &str) -> GitResult<Vec<u8>> {
    let mut buf = Vec::new();
    read_blob(repo, hash, &mut buf)?;
    Ok(buf)
}

/// Write `bytes` as a new blob object, returning its hash. Content
/// addressing makes this idempotent: writing identical bytes twice yields
/// the same hash without growing the object database.
pub fn write_blob(repo: &Repo, bytes: &[u8]) -> GitResult<String> {
    let id = repo
        .raw()
        .write_blob(bytes)
        .map_err(|e| GitError::Gix(Box::new(e)))?;
    Ok(id.detach().to_string())
}

/// One entry to compose into a new tree via `write_tree`.
#[derive(Debug, Clone)]
pub struct NewTreeEntry {
    pub mode: gix::objs::tree::EntryMode,
    pub hash: String,
    pub name: String,
}

/// Write a flat set of entries as a new tree object, returning its hash.
/// Entries must already be ordered/named the way `gix::objs::Tree`
/// expects; duplicate names are a caller bug and will simply overwrite in
/// whatever order they're passed, since callers build entries from a
/// `BTreeMap` (see `registry::staging`).
pub fn write_tree(repo: &Repo, entries: &[NewTreeEntry]) -> GitResult<String> {
    let mut tree = gix::objs::Tree::empty();
    for entry in entries {
        let oid = parse_hash(&entry.hash)?;
        tree.entries.push(gix::objs::tree::Entry {
            mode: entry.mode,
            oid,
            filename: BString::from(entry.name.as_str()),
        });
    }
    tree.entries.sort();

    let id = repo
        .raw()
        .write_object(&tree)
        .map_err(|e| GitError::Gix(Box::new(e)))?;
    Ok(id.detach().to_string())
}

/// A commit author/committer identity and timestamp.
#[derive(Debug, Clone)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub time: gix::date::Time,
}

/// Create a new commit object atop `tree`, with the given `parents`,
/// returning the new commit's hash. This does not move any ref; the
/// caller (registry cache) is responsible for tracking the resulting
/// snapshot and eventually pushing it.
pub fn commit(
    repo: &Repo,
    tree: &str,
    parents: &[String],
    author: &Identity,
    committer: &Identity,
    message: &str,
) -> GitResult<String> {
    let tree_id = parse_hash(tree)?;
    let parent_ids = parents
        .iter()
        .map(|p| parse_hash(p))
        .collect::<GitResult<Vec<_>>>()?;

    let commit = gix::objs::Commit {
        tree: tree_id,
        parents: parent_ids.into(),
        author: gix::actor::Signature {
            name: BString::from(author.name.as_str()),
            email: BString::from(author.email.as_str()),
            time: author.time,
        },
        committer: gix::actor::Signature {
            name: BString::from(committer.name.as_str()),
            email: BString::from(committer.email.as_str()),
            time: committer.time,
        },
        encoding: None,
        message: BString::from(message),
        extra_headers: Vec::new(),
    };

    let id = repo
        .raw()
        .write_object(&commit)
        .map_err(|e| GitError::Gix(Box::new(e)))?;
    Ok(id.detach().to_string())
}

/// Blob entry mode (non-executable regular file) — the overwhelming
/// majority of entries the registry cache writes.
pub fn blob_mode() -> gix::objs::tree::EntryMode {
    EntryKind::Blob.into()
}

/// Tree entry mode, for composing intermediate directories.
pub fn tree_mode() -> gix::objs::tree::EntryMode {
    EntryKind::Tree.into()
}

fn parse_hash(hash: &str) -> GitResult<gix::ObjectId> {
    gix::ObjectId::from_hex(hash.as_bytes()).map_err(|_| GitError::UnknownObject(hash.to_string()))
}

/// Reference used to hold the registry mirror's tracking branch tip.
pub fn branch_full_name(branch: &str) -> String {
    if branch.starts_with("refs/") {
        branch.to_string()
    } else {
        format!("refs/heads/{branch}")
    }
}

/// Move `refname` to point at `target` (used after staging/pushing).
pub fn update_ref(repo: &Repo, refname: &str, target: &str) -> GitResult<()> {
    let id = parse_hash(target)?;
    let full = branch_full_name(refname);
    repo.raw()
        .reference(
            full,
            id,
            gix::refs::transaction::PreviousValue::Any,
            "protato: update snapshot",
        )
        .map_err(|e| GitError::Gix(Box::new(e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_full_name_adds_heads_prefix() {
        assert_eq!(branch_full_name("main"), "refs/heads/main");
        assert_eq!(branch_full_name("refs/heads/main"), "refs/heads/main");
    }
}
