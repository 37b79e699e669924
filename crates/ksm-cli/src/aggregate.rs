//! Concurrent fan-out of independent remote calls and cross-scope ranking.

use std::thread;

use ksm_core::{MemoryScope, SearchHit};

/// Result cap when both scopes are merged and no `--limit` is given.
pub const DEFAULT_MERGED_LIMIT: usize = 10;

/// Run two independent calls concurrently and wait for both.
pub fn join2<A, B, FA, FB>(a: FA, b: FB) -> (A, B)
where
    A: Send,
    B: Send,
    FA: FnOnce() -> A + Send,
    FB: FnOnce() -> B + Send,
{
    thread::scope(|s| {
        let handle = s.spawn(a);
        let rb = b();
        (join_handle(handle), rb)
    })
}

/// Run three independent calls concurrently and wait for all of them.
pub fn join3<A, B, C, FA, FB, FC>(a: FA, b: FB, c: FC) -> (A, B, C)
where
    A: Send,
    B: Send,
    C: Send,
    FA: FnOnce() -> A + Send,
    FB: FnOnce() -> B + Send,
    FC: FnOnce() -> C + Send,
{
    thread::scope(|s| {
        let ha = s.spawn(a);
        let hb = s.spawn(b);
        let rc = c();
        (join_handle(ha), join_handle(hb), rc)
    })
}

fn join_handle<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(v) => v,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Merge per-scope hits into one list ranked by similarity, best first.
///
/// Ties keep insertion order: user hits before project hits.
pub fn merge_ranked(user: Vec<SearchHit>, project: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    let tag = |scope: MemoryScope| {
        move |mut hit: SearchHit| {
            hit.scope = Some(scope);
            hit
        }
    };

    let mut merged: Vec<SearchHit> = user
        .into_iter()
        .map(tag(MemoryScope::User))
        .chain(project.into_iter().map(tag(MemoryScope::Project)))
        .collect();
    merged.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    merged.truncate(limit);
    merged
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;

    use super::*;

    fn hit(id: &str, similarity: f64) -> SearchHit {
        SearchHit {
            id: Some(id.into()),
            memory: Some(format!("memory {id}")),
            similarity,
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_orders_by_similarity() {
        let merged = merge_ranked(vec![hit("u", 0.4)], vec![hit("p", 0.9)], 10);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id.as_deref(), Some("p"));
        assert_eq!(merged[0].scope, Some(MemoryScope::Project));
        assert_eq!(merged[1].scope, Some(MemoryScope::User));
    }

    #[test]
    fn test_merge_truncates_to_limit() {
        let merged = merge_ranked(vec![hit("u", 0.4)], vec![hit("p", 0.9)], 1);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].similarity, 0.9);
    }

    #[test]
    fn test_merge_ties_keep_insertion_order() {
        let merged = merge_ranked(
            vec![hit("u1", 0.7), hit("u2", 0.5)],
            vec![hit("p1", 0.7), hit("p2", 0.5)],
            10,
        );
        let ids: Vec<_> = merged.iter().filter_map(|h| h.id.as_deref()).collect();
        assert_eq!(ids, vec!["u1", "p1", "u2", "p2"]);
    }

    #[test]
    fn test_merge_overwrites_incoming_scope() {
        let mut stale = hit("u", 0.3);
        stale.scope = Some(MemoryScope::Project);
        let merged = merge_ranked(vec![stale], Vec::new(), DEFAULT_MERGED_LIMIT);
        assert_eq!(merged[0].scope, Some(MemoryScope::User));
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_ranked(Vec::new(), Vec::new(), DEFAULT_MERGED_LIMIT).is_empty());
    }

    #[test]
    fn test_join2_runs_concurrently() {
        // Each side waits for the other; sequential execution would never return.
        let barrier = Barrier::new(2);
        let (a, b) = join2(
            || {
                barrier.wait();
                1
            },
            || {
                barrier.wait();
                2
            },
        );
        assert_eq!((a, b), (1, 2));
    }

    #[test]
    fn test_join3_runs_concurrently() {
        let barrier = Barrier::new(3);
        let (a, b, c) = join3(
            || barrier.wait().is_leader(),
            || barrier.wait().is_leader(),
            || barrier.wait().is_leader(),
        );
        assert_eq!([a, b, c].iter().filter(|l| **l).count(), 1);
    }

    #[test]
    fn test_join3_returns_in_argument_order() {
        let (a, b, c) = join3(|| "profile", || "search", || "list");
        assert_eq!((a, b, c), ("profile", "search", "list"));
    }
}
