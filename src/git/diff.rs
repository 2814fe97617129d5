//! First-parent diffs, unified diff text and mailbox patches.
//!
//! Changes are found by walking the commit's tree and its first parent's tree
//! side by side (the empty tree stands in for a missing parent). Only the
//! per-file hunks come from libgit2; headers, diffstat and the mailbox
//! envelope are written here so the output matches `git format-patch`.

use chrono::{Offset, Utc};
use git2::{DiffOptions, Oid, Patch, Repository};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{AppError, Result};
use crate::git::repository::{find_commit, GitRepository};
use crate::git::tree::{is_binary, read_blob};
use crate::models::{Change, ChangeKind, ChangeSide, DiffStats, EntryMode, FileStat};

const CONTEXT_LINES: u32 = 3;

/// `git format-patch` writes this fixed date on the mbox separator line.
const MAILBOX_SENTINEL_DATE: &str = "Mon Sep 17 00:00:00 2001";
const PATCH_DATE_FORMAT: &str = "%a, %-d %b %Y %H:%M:%S %z";

const EMPTY_BLOB: &str = "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391";
const DIFFSTAT_BAR_WIDTH: usize = 50;
const TREE_MODE: i32 = 0o040000;

/// One change rendered as patch text, with its line counts.
struct FilePatch {
    text: String,
    stat: FileStat,
}

/// Unified diff text and the line counts gathered while producing it.
#[derive(Debug)]
pub struct RenderedDiff {
    pub text: String,
    pub stats: DiffStats,
}

impl GitRepository {
    /// Paths that differ between `commit` and its first parent.
    pub fn changes_between(&self, commit: Oid) -> Result<Vec<Change>> {
        self.with_repo(|repo| changes_for_commit(repo, commit))
    }

    /// Unified diff for `changes`, one blank line between files, together
    /// with its diff stats. Each blob pair is diffed once.
    pub fn render_unified(&self, changes: &[Change]) -> Result<RenderedDiff> {
        self.with_repo(|repo| {
            let patches = file_patches(repo, changes)?;
            Ok(RenderedDiff {
                text: join_patches(&patches, "\n"),
                stats: collect_stats(&patches),
            })
        })
    }

    /// Single-commit patch in the mailbox format `git am` consumes.
    pub fn render_patch_envelope(&self, commit: Oid) -> Result<String> {
        self.with_repo(|repo| {
            let commit_obj = find_commit(repo, commit)?;
            if commit_obj.parent_count() == 0 {
                return Err(AppError::RootCommit(commit.to_string()));
            }

            let changes = changes_for_commit(repo, commit)?;
            let patches = file_patches(repo, &changes)?;
            let stats = collect_stats(&patches);

            let author = commit_obj.author();
            let (subject, body) = split_message(commit_obj.message().unwrap_or(""));

            let mut out = String::new();
            out.push_str(&format!("From {} {}\n", commit, MAILBOX_SENTINEL_DATE));
            out.push_str(&format!(
                "From: {} <{}>\n",
                author.name().unwrap_or("Unknown"),
                author.email().unwrap_or("")
            ));
            out.push_str(&format!("Date: {}\n", format_patch_date(&author.when())));
            out.push_str(&format!("Subject: [PATCH] {}\n\n", subject));
            if !body.is_empty() {
                out.push_str(body);
                out.push('\n');
            }
            out.push_str("---\n");
            out.push_str(&render_diffstat(&stats, &changes));
            out.push('\n');
            out.push_str(&join_patches(&patches, ""));
            Ok(out)
        })
    }
}

fn changes_for_commit(repo: &Repository, oid: Oid) -> Result<Vec<Change>> {
    let commit = find_commit(repo, oid)?;
    let new_tree = commit.tree()?;

    // Merge parents beyond the first are not compared.
    let old_tree = if commit.parent_count() > 0 {
        Some(commit.parent(0)?.tree()?)
    } else {
        None
    };

    let mut changes = Vec::new();
    compare_trees(repo, old_tree.as_ref(), Some(&new_tree), "", &mut changes)?;

    let mut changes = pair_exact_renames(changes);
    changes.sort_by(|a, b| a.path().cmp(b.path()));
    Ok(changes)
}

type Entries = BTreeMap<String, (Oid, i32)>;

fn tree_entries(tree: Option<&git2::Tree>) -> Entries {
    tree.map(|tree| {
        tree.iter()
            .map(|entry| {
                let name = String::from_utf8_lossy(entry.name_bytes()).to_string();
                (name, (entry.id(), entry.filemode()))
            })
            .collect()
    })
    .unwrap_or_default()
}

fn subtree<'r>(repo: &'r Repository, entry: Option<(Oid, i32)>) -> Result<Option<git2::Tree<'r>>> {
    match entry {
        Some((oid, mode)) if mode == TREE_MODE => Ok(Some(repo.find_tree(oid)?)),
        _ => Ok(None),
    }
}

fn compare_trees(
    repo: &Repository,
    old: Option<&git2::Tree>,
    new: Option<&git2::Tree>,
    base: &str,
    out: &mut Vec<Change>,
) -> Result<()> {
    let old_entries = tree_entries(old);
    let new_entries = tree_entries(new);
    let names: BTreeSet<&String> = old_entries.keys().chain(new_entries.keys()).collect();

    for name in names {
        let before = old_entries.get(name).copied();
        let after = new_entries.get(name).copied();
        if before == after {
            continue;
        }

        let path = if base.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", base, name)
        };

        let old_sub = subtree(repo, before)?;
        let new_sub = subtree(repo, after)?;
        if old_sub.is_some() || new_sub.is_some() {
            compare_trees(repo, old_sub.as_ref(), new_sub.as_ref(), &path, out)?;
        }

        let old_leaf = before.filter(|(_, mode)| *mode != TREE_MODE);
        let new_leaf = after.filter(|(_, mode)| *mode != TREE_MODE);
        let (kind, from, to) = match (old_leaf, new_leaf) {
            (Some(b), Some(a)) => (ChangeKind::Modified, Some(b), Some(a)),
            (Some(b), None) => (ChangeKind::Deleted, Some(b), None),
            (None, Some(a)) => (ChangeKind::Added, None, Some(a)),
            (None, None) => continue,
        };
        out.push(Change {
            kind,
            from: from.map(|entry| side(&path, entry)),
            to: to.map(|entry| side(&path, entry)),
        });
    }

    Ok(())
}

fn side(path: &str, (oid, mode): (Oid, i32)) -> ChangeSide {
    ChangeSide {
        path: path.to_string(),
        oid: oid.to_string(),
        mode: EntryMode::from_filemode(mode).unwrap_or(EntryMode::File),
    }
}

/// Turn a deletion plus an addition of the very same blob into a rename.
fn pair_exact_renames(changes: Vec<Change>) -> Vec<Change> {
    let mut out = Vec::with_capacity(changes.len());
    let mut additions: Vec<Option<Change>> = Vec::new();
    let mut deletions = Vec::new();

    for change in changes {
        match change.kind {
            ChangeKind::Added => additions.push(Some(change)),
            ChangeKind::Deleted => deletions.push(change),
            _ => out.push(change),
        }
    }

    for deletion in deletions {
        let matched = deletion
            .from
            .as_ref()
            .filter(|from| from.oid != EMPTY_BLOB && from.mode != EntryMode::Submodule)
            .and_then(|from| {
                additions.iter_mut().find(|slot| {
                    matches!(
                        slot,
                        Some(Change { to: Some(to), .. })
                            if to.oid == from.oid && to.mode != EntryMode::Submodule
                    )
                })
            })
            .and_then(|slot| slot.take());

        match matched {
            Some(addition) => out.push(Change {
                kind: ChangeKind::Renamed,
                from: deletion.from,
                to: addition.to,
            }),
            None => out.push(deletion),
        }
    }

    out.extend(additions.into_iter().flatten());
    out
}

fn file_patches(repo: &Repository, changes: &[Change]) -> Result<Vec<FilePatch>> {
    changes.iter().map(|change| file_patch(repo, change)).collect()
}

fn file_patch(repo: &Repository, change: &Change) -> Result<FilePatch> {
    let from = change.from.as_ref();
    let to = change.to.as_ref();
    let old_path = from.or(to).map(|s| s.path.as_str()).unwrap_or("");
    let new_path = to.or(from).map(|s| s.path.as_str()).unwrap_or("");

    let mut text = format!("diff --git a/{} b/{}\n", old_path, new_path);
    match (from, to) {
        (None, Some(to)) => text.push_str(&format!("new file mode {}\n", to.mode.octal())),
        (Some(from), None) => text.push_str(&format!("deleted file mode {}\n", from.mode.octal())),
        (Some(from), Some(to)) => {
            if from.mode != to.mode {
                text.push_str(&format!("old mode {}\n", from.mode.octal()));
                text.push_str(&format!("new mode {}\n", to.mode.octal()));
            }
            if change.kind == ChangeKind::Renamed {
                text.push_str("similarity index 100%\n");
                text.push_str(&format!("rename from {}\n", old_path));
                text.push_str(&format!("rename to {}\n", new_path));
            }
        }
        (None, None) => {}
    }

    let mut stat = FileStat {
        path: if change.kind == ChangeKind::Renamed {
            format!("{} => {}", old_path, new_path)
        } else {
            new_path.to_string()
        },
        insertions: 0,
        deletions: 0,
        is_binary: false,
    };

    let old_oid = from.map(|s| s.oid.as_str());
    let new_oid = to.map(|s| s.oid.as_str());
    if old_oid == new_oid {
        return Ok(FilePatch { text, stat });
    }

    text.push_str(&format!("index {}..{}", abbreviate(old_oid), abbreviate(new_oid)));
    match (from, to) {
        (Some(from), Some(to)) if from.mode == to.mode => {
            text.push_str(&format!(" {}\n", to.mode.octal()))
        }
        _ => text.push('\n'),
    }

    let old_content = side_content(repo, from)?;
    let new_content = side_content(repo, to)?;
    let old_label = from
        .map(|s| format!("a/{}", s.path))
        .unwrap_or_else(|| "/dev/null".to_string());
    let new_label = to
        .map(|s| format!("b/{}", s.path))
        .unwrap_or_else(|| "/dev/null".to_string());

    if is_binary(&old_content) || is_binary(&new_content) {
        text.push_str(&format!("Binary files {} and {} differ\n", old_label, new_label));
        stat.is_binary = true;
        return Ok(FilePatch { text, stat });
    }

    text.push_str(&format!("--- {}\n", old_label));
    text.push_str(&format!("+++ {}\n", new_label));

    let mut opts = DiffOptions::new();
    opts.context_lines(CONTEXT_LINES).force_text(true);
    let patch = Patch::from_buffers(
        &old_content,
        Some(Path::new(old_path)),
        &new_content,
        Some(Path::new(new_path)),
        Some(&mut opts),
    )?;

    let (insertions, deletions) = write_hunks(&patch, &mut text)?;
    stat.insertions = insertions;
    stat.deletions = deletions;
    Ok(FilePatch { text, stat })
}

fn write_hunks(patch: &Patch, text: &mut String) -> Result<(usize, usize)> {
    let mut insertions = 0;
    let mut deletions = 0;

    for hunk_idx in 0..patch.num_hunks() {
        let (hunk, _) = patch.hunk(hunk_idx)?;
        text.push_str(&String::from_utf8_lossy(hunk.header()));
        if !text.ends_with('\n') {
            text.push('\n');
        }

        for line_idx in 0..patch.num_lines_in_hunk(hunk_idx)? {
            let line = patch.line_in_hunk(hunk_idx, line_idx)?;
            match line.origin() {
                origin @ ('+' | '-' | ' ') => {
                    match origin {
                        '+' => insertions += 1,
                        '-' => deletions += 1,
                        _ => {}
                    }
                    text.push(origin);
                    text.push_str(&String::from_utf8_lossy(line.content()));
                    if !text.ends_with('\n') {
                        text.push('\n');
                    }
                }
                // end-of-file markers for a missing trailing newline
                '=' | '>' | '<' => text.push_str("\\ No newline at end of file\n"),
                _ => {}
            }
        }
    }

    Ok((insertions, deletions))
}

fn side_content(repo: &Repository, side: Option<&ChangeSide>) -> Result<Vec<u8>> {
    let Some(side) = side else {
        return Ok(Vec::new());
    };
    if side.mode == EntryMode::Submodule {
        return Ok(format!("Subproject commit {}\n", side.oid).into_bytes());
    }
    let oid = Oid::from_str(&side.oid)?;
    read_blob(repo, oid)
}

fn abbreviate(oid: Option<&str>) -> &str {
    match oid {
        Some(oid) => &oid[..7.min(oid.len())],
        None => "0000000",
    }
}

fn join_patches(patches: &[FilePatch], separator: &str) -> String {
    patches
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

fn collect_stats(patches: &[FilePatch]) -> DiffStats {
    let files: Vec<FileStat> = patches.iter().map(|p| p.stat.clone()).collect();
    DiffStats {
        files_changed: files.len(),
        insertions: files.iter().map(|f| f.insertions).sum(),
        deletions: files.iter().map(|f| f.deletions).sum(),
        files,
    }
}

fn split_message(message: &str) -> (&str, &str) {
    let message = message.trim();
    match message.split_once('\n') {
        Some((subject, body)) => (subject.trim_end(), body.trim()),
        None => (message, ""),
    }
}

fn format_patch_date(time: &git2::Time) -> String {
    let offset = chrono::FixedOffset::east_opt(time.offset_minutes() * 60).unwrap_or(Utc.fix());
    chrono::DateTime::from_timestamp(time.seconds(), 0)
        .map(|dt| dt.with_timezone(&offset).format(PATCH_DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// git's `scale_linear`: non-zero counts always get at least one column.
fn scale_linear(count: usize, width: usize, max_change: usize) -> usize {
    if count == 0 || max_change == 0 {
        return 0;
    }
    1 + (count * (width - 1)) / max_change
}

/// `git diff --stat` style summary, including create/delete/rename lines.
pub fn render_diffstat(stats: &DiffStats, changes: &[Change]) -> String {
    let name_width = stats.files.iter().map(|f| f.path.chars().count()).max().unwrap_or(0);
    let max_change = stats
        .files
        .iter()
        .map(|f| f.insertions + f.deletions)
        .max()
        .unwrap_or(0);
    let count_width = max_change.to_string().len();

    let mut out = String::new();
    for file in &stats.files {
        if file.is_binary {
            out.push_str(&format!(" {:<name_width$} | Bin\n", file.path));
            continue;
        }

        let total = file.insertions + file.deletions;
        let (plus, minus) = if max_change > DIFFSTAT_BAR_WIDTH {
            let total_cols = scale_linear(total, DIFFSTAT_BAR_WIDTH, max_change);
            let plus_cols = scale_linear(file.insertions, DIFFSTAT_BAR_WIDTH, max_change);
            (plus_cols, total_cols.saturating_sub(plus_cols))
        } else {
            (file.insertions, file.deletions)
        };
        let line = format!(
            " {:<name_width$} | {:>count_width$} {}{}",
            file.path,
            total,
            "+".repeat(plus),
            "-".repeat(minus)
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out.push_str(&format!(
        " {} file{} changed",
        stats.files_changed,
        if stats.files_changed == 1 { "" } else { "s" }
    ));
    if stats.insertions > 0 {
        out.push_str(&format!(
            ", {} insertion{}(+)",
            stats.insertions,
            if stats.insertions == 1 { "" } else { "s" }
        ));
    }
    if stats.deletions > 0 {
        out.push_str(&format!(
            ", {} deletion{}(-)",
            stats.deletions,
            if stats.deletions == 1 { "" } else { "s" }
        ));
    }
    out.push('\n');

    for change in changes {
        match (change.kind, &change.from, &change.to) {
            (ChangeKind::Added, _, Some(to)) => {
                out.push_str(&format!(" create mode {} {}\n", to.mode.octal(), to.path))
            }
            (ChangeKind::Deleted, Some(from), _) => {
                out.push_str(&format!(" delete mode {} {}\n", from.mode.octal(), from.path))
            }
            (ChangeKind::Renamed, Some(from), Some(to)) => {
                out.push_str(&format!(" rename {} => {} (100%)\n", from.path, to.path))
            }
            (ChangeKind::Modified, Some(from), Some(to)) if from.mode != to.mode => {
                out.push_str(&format!(
                    " mode change {} => {} {}\n",
                    from.mode.octal(),
                    to.mode.octal(),
                    to.path
                ))
            }
            _ => {}
        }
    }

    out
}
