//! Three-way merge classification.
//!
//! Given the file mappings at the split point, the current tip and the given
//! tip, [`plan`] decides per path what the merge must do. Applying the plan
//! to the working tree and index is the repository's job.

use std::collections::BTreeSet;

use tracing::debug;

use crate::commit::FileMap;

/// What a merge does with one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Leave the current version (or absence) alone.
    KeepCurrent,
    /// Check out and stage the given branch's blob.
    TakeGiven { hash: String },
    /// Given deleted a file current left untouched.
    RemoveFile,
    /// Both sides changed the path differently.
    Conflict {
        current: Option<String>,
        given: Option<String>,
    },
}

/// Result of a merge, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Given tip is already reachable from current; nothing changed.
    AlreadyAncestor,
    /// Current tip was an ancestor of given; the branch moved forward.
    FastForwarded,
    /// A merge commit was created.
    Merged { commit: String, conflicted: bool },
}

/// Classify one path by blob ids at the split point and both tips.
pub fn resolve(split: Option<&str>, current: Option<&str>, given: Option<&str>) -> Resolution {
    if current == given || given == split {
        return Resolution::KeepCurrent;
    }
    if current == split {
        return match given {
            Some(hash) => Resolution::TakeGiven {
                hash: hash.to_string(),
            },
            None => Resolution::RemoveFile,
        };
    }
    Resolution::Conflict {
        current: current.map(String::from),
        given: given.map(String::from),
    }
}

/// Every path that needs an action, sorted. Paths that keep the current
/// version are omitted.
pub fn plan(split: &FileMap, current: &FileMap, given: &FileMap) -> Vec<(String, Resolution)> {
    let paths: BTreeSet<&String> = split.keys().chain(current.keys()).chain(given.keys()).collect();

    let mut actions = Vec::new();
    for path in paths {
        let resolution = resolve(
            split.get(path).map(String::as_str),
            current.get(path).map(String::as_str),
            given.get(path).map(String::as_str),
        );
        if resolution != Resolution::KeepCurrent {
            debug!(path = %path, ?resolution, "merge action");
            actions.push((path.clone(), resolution));
        }
    }
    actions
}

/// Working-tree content for a conflicted path. A missing side contributes
/// nothing.
pub fn conflict_content(current: &[u8], given: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(current.len() + given.len() + 32);
    out.extend_from_slice(b"<<<<<<< HEAD\n");
    out.extend_from_slice(current);
    out.extend_from_slice(b"=======\n");
    out.extend_from_slice(given);
    out.extend_from_slice(b">>>>>>>\n");
    out
}

/// Message of the commit a non-trivial merge creates.
pub fn merge_message(given: &str, current: &str) -> String {
    format!("Merged {given} into {current}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> FileMap {
        pairs
            .iter()
            .map(|(p, h)| (p.to_string(), h.to_string()))
            .collect()
    }

    #[test]
    fn test_unchanged_on_both_sides() {
        assert_eq!(resolve(Some("s"), Some("s"), Some("s")), Resolution::KeepCurrent);
        assert_eq!(resolve(None, None, None), Resolution::KeepCurrent);
    }

    #[test]
    fn test_only_given_changed() {
        assert_eq!(
            resolve(Some("s"), Some("s"), Some("g")),
            Resolution::TakeGiven { hash: "g".into() }
        );
        assert_eq!(
            resolve(None, None, Some("g")),
            Resolution::TakeGiven { hash: "g".into() }
        );
        assert_eq!(resolve(Some("s"), Some("s"), None), Resolution::RemoveFile);
    }

    #[test]
    fn test_only_current_changed() {
        assert_eq!(resolve(Some("s"), Some("c"), Some("s")), Resolution::KeepCurrent);
        assert_eq!(resolve(Some("s"), None, Some("s")), Resolution::KeepCurrent);
        assert_eq!(resolve(None, Some("c"), None), Resolution::KeepCurrent);
    }

    #[test]
    fn test_both_changed_the_same_way() {
        assert_eq!(resolve(Some("s"), Some("x"), Some("x")), Resolution::KeepCurrent);
        assert_eq!(resolve(Some("s"), None, None), Resolution::KeepCurrent);
    }

    #[test]
    fn test_conflicts() {
        assert_eq!(
            resolve(Some("s"), Some("c"), Some("g")),
            Resolution::Conflict {
                current: Some("c".into()),
                given: Some("g".into())
            }
        );
        assert_eq!(
            resolve(Some("s"), None, Some("g")),
            Resolution::Conflict {
                current: None,
                given: Some("g".into())
            }
        );
        assert_eq!(
            resolve(None, Some("c"), Some("g")),
            Resolution::Conflict {
                current: Some("c".into()),
                given: Some("g".into())
            }
        );
    }

    #[test]
    fn test_plan_covers_union_of_paths() {
        let split = map(&[("same", "1"), ("theirs", "1"), ("gone", "1"), ("both", "1")]);
        let current = map(&[("same", "1"), ("theirs", "1"), ("gone", "1"), ("both", "2"), ("mine", "5")]);
        let given = map(&[("same", "1"), ("theirs", "9"), ("both", "3"), ("new", "7")]);

        let actions = plan(&split, &current, &given);
        let paths: Vec<_> = actions.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["both", "gone", "new", "theirs"]);
        assert!(matches!(actions[0].1, Resolution::Conflict { .. }));
        assert_eq!(actions[1].1, Resolution::RemoveFile);
        assert_eq!(actions[2].1, Resolution::TakeGiven { hash: "7".into() });
        assert_eq!(actions[3].1, Resolution::TakeGiven { hash: "9".into() });
    }

    #[test]
    fn test_conflict_content() {
        let out = conflict_content(b"AAA\n", b"BBB\n");
        assert_eq!(out, b"<<<<<<< HEAD\nAAA\n=======\nBBB\n>>>>>>>\n".to_vec());

        let deleted = conflict_content(b"", b"BBB\n");
        assert_eq!(deleted, b"<<<<<<< HEAD\n=======\nBBB\n>>>>>>>\n".to_vec());
    }

    #[test]
    fn test_merge_message() {
        assert_eq!(merge_message("other", "master"), "Merged other into master.");
    }
}
