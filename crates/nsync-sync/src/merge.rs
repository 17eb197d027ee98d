//! Repository merge: whole-note last-writer-wins with tombstones.
//!
//! Rules, per note id present in either snapshot:
//!   - tombstoned by either side: dropped, the tombstone is kept
//!   - present on one side only: kept
//!   - present on both: the later `modified_at` wins, a tie keeps the local note
//!
//! Tombstones are the union of both sides and are never pruned, so replaying
//! a merge against an old snapshot cannot resurrect a deleted note.

use nsync_core::{RepositorySnapshot, Safe};
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

/// Merge `remote` into `local`. The result keeps the local identity.
pub fn merge(local: &RepositorySnapshot, remote: &RepositorySnapshot) -> RepositorySnapshot {
    let deleted_notes: BTreeSet<Uuid> = local
        .deleted_notes
        .union(&remote.deleted_notes)
        .copied()
        .collect();

    // the side that reordered last decides the order
    let remote_order_wins = remote.order_modified_at > local.order_modified_at;

    let notes = merge_by_id(
        &local.notes[..],
        &remote.notes[..],
        remote_order_wins,
        |n| n.id,
        |n| n.modified_at,
        |id| deleted_notes.contains(id),
    );
    let safes = merge_by_id(
        &local.safes[..],
        &remote.safes[..],
        remote_order_wins,
        |s: &Safe| s.id,
        |s| s.modified_at,
        |_| false,
    );

    tracing::debug!(
        local_notes = local.notes.len(),
        remote_notes = remote.notes.len(),
        merged_notes = notes.len(),
        tombstones = deleted_notes.len(),
        "merged repositories"
    );

    RepositorySnapshot {
        id: local.id,
        revision: local.revision.max(remote.revision),
        order_modified_at: local.order_modified_at.max(remote.order_modified_at),
        notes,
        deleted_notes,
        safes,
    }
}

/// Union two id-keyed lists. Order follows the winning side, items only
/// present on the other side are appended in that side's order.
fn merge_by_id<T: Clone>(
    local: &[T],
    remote: &[T],
    remote_order_wins: bool,
    id_of: impl Fn(&T) -> Uuid,
    modified_at: impl Fn(&T) -> u64,
    is_deleted: impl Fn(&Uuid) -> bool,
) -> Vec<T> {
    let local_by_id: HashMap<Uuid, &T> = local.iter().map(|x| (id_of(x), x)).collect();
    let remote_by_id: HashMap<Uuid, &T> = remote.iter().map(|x| (id_of(x), x)).collect();

    let (first, second) = if remote_order_wins {
        (remote, local)
    } else {
        (local, remote)
    };

    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(first.len().max(second.len()));
    for item in first.iter().chain(second.iter()) {
        let id = id_of(item);
        if is_deleted(&id) || !seen.insert(id) {
            continue;
        }
        let winner = match (local_by_id.get(&id), remote_by_id.get(&id)) {
            (Some(l), Some(r)) if modified_at(r) > modified_at(l) => *r,
            (Some(l), _) => *l,
            (None, Some(r)) => *r,
            (None, None) => item,
        };
        merged.push(winner.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsync_core::Note;

    fn note(id: u128, modified_at: u64, html: &str) -> Note {
        let mut n = Note::new(html);
        n.id = Uuid::from_u128(id);
        n.created_at = 1;
        n.modified_at = modified_at;
        n
    }

    fn repo(notes: Vec<Note>, order_modified_at: u64) -> RepositorySnapshot {
        RepositorySnapshot {
            notes,
            order_modified_at,
            ..RepositorySnapshot::new()
        }
    }

    fn ids(r: &RepositorySnapshot) -> Vec<u128> {
        r.notes.iter().map(|n| n.id.as_u128()).collect()
    }

    #[test]
    fn test_one_sided_notes_are_kept() {
        let local = repo(vec![note(1, 10, "a")], 5);
        let remote = repo(vec![note(2, 10, "b")], 1);
        let merged = merge(&local, &remote);
        assert_eq!(ids(&merged), vec![1, 2]);
        assert_eq!(merged.id, local.id);
    }

    #[test]
    fn test_later_modification_wins() {
        let local = repo(vec![note(1, 10, "old"), note(2, 30, "mine")], 0);
        let remote = repo(vec![note(1, 20, "new"), note(2, 25, "theirs")], 0);
        let merged = merge(&local, &remote);
        assert_eq!(merged.note(&Uuid::from_u128(1)).unwrap().html_content, "new");
        assert_eq!(merged.note(&Uuid::from_u128(2)).unwrap().html_content, "mine");
    }

    #[test]
    fn test_tie_keeps_local() {
        let local = repo(vec![note(1, 10, "local")], 0);
        let remote = repo(vec![note(1, 10, "remote")], 0);
        assert_eq!(merge(&local, &remote).notes[0].html_content, "local");
        assert_eq!(merge(&remote, &local).notes[0].html_content, "remote");
    }

    #[test]
    fn test_tombstone_drops_note_from_other_side() {
        let mut local = repo(vec![note(1, 10, "a"), note(2, 10, "b")], 0);
        local.delete_note_permanently(&Uuid::from_u128(2));
        // remote edited note 2 after local deleted it: deletion still wins
        let remote = repo(vec![note(1, 10, "a"), note(2, 99, "b edited")], 0);

        let merged = merge(&local, &remote);
        assert_eq!(ids(&merged), vec![1]);
        assert!(merged.deleted_notes.contains(&Uuid::from_u128(2)));

        let reverse = merge(&remote, &local);
        assert_eq!(ids(&reverse), vec![1]);
        assert!(reverse.deleted_notes.contains(&Uuid::from_u128(2)));
    }

    #[test]
    fn test_tombstones_are_unioned() {
        let mut local = repo(vec![], 0);
        local.deleted_notes.insert(Uuid::from_u128(7));
        let mut remote = repo(vec![], 0);
        remote.deleted_notes.insert(Uuid::from_u128(8));
        let merged = merge(&local, &remote);
        assert_eq!(merged.deleted_notes.len(), 2);
    }

    #[test]
    fn test_order_follows_latest_reorder() {
        let local = repo(vec![note(1, 1, "a"), note(2, 1, "b"), note(3, 1, "c")], 10);
        let remote = repo(vec![note(3, 1, "c"), note(1, 1, "a"), note(4, 1, "d")], 20);
        let merged = merge(&local, &remote);
        assert_eq!(ids(&merged), vec![3, 1, 4, 2]);
        assert_eq!(merged.order_modified_at, 20);
    }

    #[test]
    fn test_safes_union_later_wins() {
        let mut s1 = Safe::new("key-v1");
        s1.id = Uuid::from_u128(100);
        s1.modified_at = 5;
        let mut s1b = s1.clone();
        s1b.serialized_key = "key-v2".into();
        s1b.modified_at = 6;
        let mut s2 = Safe::new("other");
        s2.id = Uuid::from_u128(200);

        let local = RepositorySnapshot {
            safes: vec![s1],
            ..repo(vec![], 0)
        };
        let remote = RepositorySnapshot {
            safes: vec![s1b, s2],
            ..repo(vec![], 0)
        };
        let merged = merge(&local, &remote);
        assert_eq!(merged.safes.len(), 2);
        assert_eq!(merged.safe(&Uuid::from_u128(100)).unwrap().serialized_key, "key-v2");
    }

    #[test]
    fn test_merge_with_self_is_identical() {
        let local = repo(vec![note(1, 3, "a"), note(2, 4, "b")], 9);
        assert!(merge(&local, &local).is_identical(&local));
    }
}
