//! Drag-and-drop ordering for kits, highlights and category items.
//!
//! The admin UI moves an item locally, posts the full proposed order and
//! replaces its list with whatever order the server answers with.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderError {
    #[error("position {index} is out of bounds for {len} items")]
    OutOfBounds { index: usize, len: usize },
    #[error("item {0} appears more than once")]
    Duplicate(String),
    #[error("item {0} is not in the list")]
    Unknown(String),
    #[error("item {0} is missing from the new order")]
    Missing(String),
}

/// One row whose stored sort order must change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortUpdate<T> {
    pub id: T,
    pub sort_order: i32,
}

/// Move the item at `from` so it ends up at `to`.
///
/// # Errors
///
/// Returns [`ReorderError::OutOfBounds`] when either index is past the end.
pub fn move_item<T>(list: &mut Vec<T>, from: usize, to: usize) -> Result<(), ReorderError> {
    let len = list.len();
    for index in [from, to] {
        if index >= len {
            return Err(ReorderError::OutOfBounds { index, len });
        }
    }
    let item = list.remove(from);
    list.insert(to, item);
    Ok(())
}

/// Check that `proposed` holds exactly the ids in `current`.
///
/// # Errors
///
/// Reports the first duplicate, unknown or missing id found.
pub fn validate_permutation<T>(current: &[T], proposed: &[T]) -> Result<(), ReorderError>
where
    T: Eq + Hash + Debug,
{
    let known: HashSet<&T> = current.iter().collect();
    let mut seen = HashSet::with_capacity(proposed.len());

    for id in proposed {
        if !known.contains(id) {
            return Err(ReorderError::Unknown(format!("{id:?}")));
        }
        if !seen.insert(id) {
            return Err(ReorderError::Duplicate(format!("{id:?}")));
        }
    }
    if let Some(missing) = current.iter().find(|id| !seen.contains(id)) {
        return Err(ReorderError::Missing(format!("{missing:?}")));
    }
    Ok(())
}

/// Assign sort orders `0..n` following `proposed`, keeping only the rows
/// whose stored value differs.
///
/// `current` pairs every id with its stored sort order.
///
/// # Errors
///
/// Fails when `proposed` is not a permutation of the current ids.
pub fn plan<T>(current: &[(T, i32)], proposed: &[T]) -> Result<Vec<SortUpdate<T>>, ReorderError>
where
    T: Eq + Hash + Debug + Copy,
{
    let ids: Vec<T> = current.iter().map(|(id, _)| *id).collect();
    validate_permutation(&ids, proposed)?;

    let stored: HashMap<T, i32> = current.iter().copied().collect();
    let mut updates = Vec::new();
    for (position, id) in proposed.iter().enumerate() {
        let sort_order = i32::try_from(position).unwrap_or(i32::MAX);
        if stored.get(id) != Some(&sort_order) {
            updates.push(SortUpdate {
                id: *id,
                sort_order,
            });
        }
    }
    Ok(updates)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::KitId;

    fn kits(ids: &[i32]) -> Vec<KitId> {
        ids.iter().copied().map(KitId::new).collect()
    }

    #[test]
    fn test_move_item_forward_and_back() {
        let mut list = vec!['a', 'b', 'c', 'd'];
        move_item(&mut list, 0, 2).unwrap();
        assert_eq!(list, vec!['b', 'c', 'a', 'd']);
        move_item(&mut list, 3, 0).unwrap();
        assert_eq!(list, vec!['d', 'b', 'c', 'a']);
        move_item(&mut list, 1, 1).unwrap();
        assert_eq!(list, vec!['d', 'b', 'c', 'a']);
    }

    #[test]
    fn test_move_item_out_of_bounds() {
        let mut list = vec![1, 2];
        assert_eq!(
            move_item(&mut list, 0, 2),
            Err(ReorderError::OutOfBounds { index: 2, len: 2 })
        );
        assert_eq!(list, vec![1, 2]);
    }

    #[test]
    fn test_validate_permutation() {
        let current = kits(&[1, 2, 3]);
        assert!(validate_permutation(&current, &kits(&[3, 1, 2])).is_ok());
        assert!(matches!(
            validate_permutation(&current, &kits(&[1, 1, 2])),
            Err(ReorderError::Duplicate(_))
        ));
        assert!(matches!(
            validate_permutation(&current, &kits(&[1, 2, 4])),
            Err(ReorderError::Unknown(_))
        ));
        assert!(matches!(
            validate_permutation(&current, &kits(&[1, 2])),
            Err(ReorderError::Missing(_))
        ));
    }

    #[test]
    fn test_plan_only_returns_changed_rows() {
        let current = vec![(KitId::new(1), 0), (KitId::new(2), 1), (KitId::new(3), 2)];
        let updates = plan(&current, &kits(&[1, 3, 2])).unwrap();
        assert_eq!(
            updates,
            vec![
                SortUpdate {
                    id: KitId::new(3),
                    sort_order: 1
                },
                SortUpdate {
                    id: KitId::new(2),
                    sort_order: 2
                },
            ]
        );
        assert!(plan(&current, &kits(&[1, 2, 3])).unwrap().is_empty());
    }

    #[test]
    fn test_plan_normalizes_gaps() {
        let current = vec![(KitId::new(7), 10), (KitId::new(8), 10)];
        let updates = plan(&current, &kits(&[7, 8])).unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].sort_order, 0);
        assert_eq!(updates[1].sort_order, 1);
    }

    #[test]
    fn test_plan_rejects_bad_order() {
        let current = vec![(KitId::new(1), 0)];
        assert!(plan(&current, &kits(&[2])).is_err());
    }
}
