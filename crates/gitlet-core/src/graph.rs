//! Commit graph traversal.
//!
//! All walks go through one breadth-first worklist routine, [`walk`].
//! History printing follows first parents only; ancestor and split-point
//! search follow both parents.
//!
//! # Split points
//!
//! [`lowest_common_ancestor`] returns the first commit reached breadth-first
//! from `b` that is also an ancestor of `a`. It is always a true common
//! ancestor, but when the DAG contains several merge paths of different
//! depths (criss-cross merges) it is not necessarily the unique deepest one.

use std::collections::{BTreeSet, HashSet, VecDeque};

use tracing::debug;

use crate::error::{GitletError, GitletResult};

/// Anything that can report a commit's parents.
pub trait ParentLookup {
    /// Parent ids of `id`, first parent first.
    fn parents_of(&self, id: &str) -> GitletResult<Vec<String>>;
}

/// Which parent edges a walk follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Follow {
    FirstParent,
    AllParents,
}

/// Breadth-first walk from `start`, visiting each commit once.
///
/// `visit` returns `true` to stop the walk; the commit it stopped on is
/// returned.
pub fn walk<G, F>(
    graph: &G,
    start: &str,
    follow: Follow,
    mut visit: F,
) -> GitletResult<Option<String>>
where
    G: ParentLookup + ?Sized,
    F: FnMut(&str) -> bool,
{
    let mut queue = VecDeque::from([start.to_string()]);
    let mut seen = HashSet::new();

    while let Some(id) = queue.pop_front() {
        if !seen.insert(id.clone()) {
            continue;
        }
        if visit(&id) {
            return Ok(Some(id));
        }
        let parents = graph.parents_of(&id)?;
        match follow {
            Follow::FirstParent => queue.extend(parents.into_iter().take(1)),
            Follow::AllParents => queue.extend(parents),
        }
    }
    Ok(None)
}

/// Every commit reachable from `id` along both parent edges, `id` included.
pub fn ancestors<G: ParentLookup + ?Sized>(graph: &G, id: &str) -> GitletResult<BTreeSet<String>> {
    let mut found = BTreeSet::new();
    walk(graph, id, Follow::AllParents, |c| {
        found.insert(c.to_string());
        false
    })?;
    Ok(found)
}

/// True if `ancestor` is reachable from `descendant` (or equal to it).
pub fn is_ancestor<G: ParentLookup + ?Sized>(
    graph: &G,
    ancestor: &str,
    descendant: &str,
) -> GitletResult<bool> {
    let hit = walk(graph, descendant, Follow::AllParents, |c| c == ancestor)?;
    Ok(hit.is_some())
}

/// First-parent chain from `tip` back to the root, tip first.
pub fn first_parent_history<G: ParentLookup + ?Sized>(
    graph: &G,
    tip: &str,
) -> GitletResult<Vec<String>> {
    let mut chain = Vec::new();
    walk(graph, tip, Follow::FirstParent, |c| {
        chain.push(c.to_string());
        false
    })?;
    Ok(chain)
}

/// Split point of `a` and `b`: the first ancestor of `a` met breadth-first
/// from `b`.
pub fn lowest_common_ancestor<G: ParentLookup + ?Sized>(
    graph: &G,
    a: &str,
    b: &str,
) -> GitletResult<String> {
    let of_a = ancestors(graph, a)?;
    let split = walk(graph, b, Follow::AllParents, |c| of_a.contains(c))?;
    debug!(a, b, split = ?split, "split point search");
    split.ok_or_else(|| GitletError::Corrupt(format!("commits {a} and {b} share no ancestor")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// In-memory DAG: id -> parents.
    struct Dag(BTreeMap<&'static str, Vec<&'static str>>);

    impl ParentLookup for Dag {
        fn parents_of(&self, id: &str) -> GitletResult<Vec<String>> {
            self.0
                .get(id)
                .map(|ps| ps.iter().map(|p| p.to_string()).collect())
                .ok_or_else(|| GitletError::ObjectNotFound(id.to_string()))
        }
    }

    /// Builds a DAG from `(id, "space-separated parents")` pairs.
    fn dag(edges: &[(&'static str, &'static str)]) -> Dag {
        Dag(edges
            .iter()
            .map(|(c, ps)| (*c, ps.split_whitespace().collect()))
            .collect())
    }

    /// root - a - b - m
    ///         \     /
    ///          c - d
    fn diamond() -> Dag {
        dag(&[
            ("root", ""),
            ("a", "root"),
            ("b", "a"),
            ("c", "a"),
            ("d", "c"),
            ("m", "b d"),
        ])
    }

    #[test]
    fn test_ancestors_include_start() {
        let g = diamond();
        let set = ancestors(&g, "b").unwrap();
        assert!(set.contains("b"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_ancestors_closed_under_parent() {
        let g = diamond();
        let set = ancestors(&g, "m").unwrap();
        for id in &set {
            for p in g.parents_of(id).unwrap() {
                assert!(set.contains(&p), "{p} missing from ancestors of m");
            }
        }
        assert_eq!(set.len(), 6);
    }

    #[test]
    fn test_first_parent_history() {
        let g = diamond();
        assert_eq!(
            first_parent_history(&g, "m").unwrap(),
            vec!["m", "b", "a", "root"]
        );
    }

    #[test]
    fn test_lca_reflexive() {
        let g = diamond();
        for id in ["root", "a", "d", "m"] {
            assert_eq!(lowest_common_ancestor(&g, id, id).unwrap(), id);
        }
    }

    #[test]
    fn test_lca_of_branches() {
        let g = diamond();
        assert_eq!(lowest_common_ancestor(&g, "b", "d").unwrap(), "a");
        assert_eq!(lowest_common_ancestor(&g, "d", "b").unwrap(), "a");
    }

    #[test]
    fn test_lca_with_ancestor() {
        let g = diamond();
        assert_eq!(lowest_common_ancestor(&g, "m", "c").unwrap(), "c");
        // From m, a (via b) is met before c (via d).
        assert_eq!(lowest_common_ancestor(&g, "c", "m").unwrap(), "a");
        assert!(is_ancestor(&g, "c", "m").unwrap());
        assert!(!is_ancestor(&g, "m", "c").unwrap());
    }

    #[test]
    fn test_lca_after_merge() {
        // e branches from d; merging e into m should split at d.
        let mut g = diamond();
        g.0.insert("e", vec!["d"]);
        assert_eq!(lowest_common_ancestor(&g, "m", "e").unwrap(), "d");
    }

    #[test]
    fn test_lca_criss_cross_returns_first_found() {
        //   root - x1 - m1 (x1, y1)
        //      \      X
        //       y1 - m2 (y1, x1)
        // Both x1 and y1 are best common ancestors of m1 and m2; the walk
        // from m2 meets its first parent y1 first.
        let g = dag(&[
            ("root", ""),
            ("x1", "root"),
            ("y1", "root"),
            ("m1", "x1 y1"),
            ("m2", "y1 x1"),
        ]);
        assert_eq!(lowest_common_ancestor(&g, "m1", "m2").unwrap(), "y1");
    }

    #[test]
    fn test_disjoint_roots_is_corrupt() {
        let g = dag(&[("r1", ""), ("r2", "")]);
        assert!(matches!(
            lowest_common_ancestor(&g, "r1", "r2"),
            Err(GitletError::Corrupt(_))
        ));
    }

    #[test]
    fn test_missing_parent_propagates() {
        let g = dag(&[("a", "ghost")]);
        assert!(matches!(
            ancestors(&g, "a"),
            Err(GitletError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn test_walk_stops_early() {
        let g = diamond();
        let mut visited = Vec::new();
        let stop = walk(&g, "m", Follow::AllParents, |c| {
            visited.push(c.to_string());
            c == "b"
        })
        .unwrap();
        assert_eq!(stop.as_deref(), Some("b"));
        assert_eq!(visited, vec!["m", "b"]);
    }
}
