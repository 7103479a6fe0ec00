//! # Ordering Policy
//!
//! Every sibling-group (all boards, the columns of one board, the top-level tasks
//! of one column, the subtasks of one task) keeps a **dense** `order`: the values
//! are exactly `0..n-1`, with no gaps and no duplicates.
//!
//! ## Operations
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | append | new member gets `order = n` ([`next_order`]) |
//! | insert at `k` | members at `>= k` shift up by one ([`insert_at`]) |
//! | remove | later members shift down by one ([`remove`]) |
//! | densify | re-sequence by current relative order ([`densify`]) |
//! | reorder | order becomes position in an explicit id list ([`reorder_by_ids`]) |
//!
//! A move between groups is a [`remove`] on the origin followed by an
//! [`insert_at`] on the destination. A move within a group is the same two steps
//! on one list, so the target index is interpreted among the *remaining* siblings.
//!
//! ## Reading Unordered Records
//!
//! Records with a missing or null `order` carry [`UNORDERED`] and sort after all
//! ordered siblings. Sorting is stable, so ties keep their storage/iteration
//! order. This rule lives here and nowhere else: backends call [`sort_by_order`].
//!
//! ## Change Tracking
//!
//! Every mutating function returns clones of the siblings whose order actually
//! changed, so backends only write back what moved.

use serde::{Deserialize, Deserializer};

/// Sentinel for a record whose stored order is missing or null.
pub const UNORDERED: u32 = u32::MAX;

/// Anything that lives in a sibling-group.
pub trait Ordered {
    fn id(&self) -> &str;
    fn order(&self) -> u32;
    fn set_order(&mut self, order: u32);
}

/// Serde default for absent `order` fields.
pub fn unordered() -> u32 {
    UNORDERED
}

/// Reads an `order` field that may be null.
pub fn deserialize_order<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(UNORDERED))
}

/// Order for a member appended to a group of `len` siblings.
pub fn next_order(len: usize) -> u32 {
    to_order(len)
}

fn to_order(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(UNORDERED - 1)
}

/// Stable sort by `order`; unordered records go last.
pub fn sort_by_order<T: Ordered>(items: &mut [T]) {
    items.sort_by_key(|item| item.order());
}

/// True when orders are exactly `0..n-1` in sorted position.
pub fn is_dense<T: Ordered>(items: &[T]) -> bool {
    let mut orders: Vec<u32> = items.iter().map(Ordered::order).collect();
    orders.sort_unstable();
    orders
        .iter()
        .enumerate()
        .all(|(index, order)| *order == to_order(index))
}

// Assigns position as order; returns clones of the members that changed.
fn renumber<T: Ordered + Clone>(items: &mut [T]) -> Vec<T> {
    let mut changed = Vec::new();
    for (index, item) in items.iter_mut().enumerate() {
        let order = to_order(index);
        if item.order() != order {
            item.set_order(order);
            changed.push(item.clone());
        }
    }
    changed
}

/// Re-sequences `siblings` to `0..n-1`, keeping their relative order.
pub fn densify<T: Ordered + Clone>(siblings: &mut Vec<T>) -> Vec<T> {
    sort_by_order(siblings);
    renumber(siblings)
}

/// Removes the member with `id` and closes the gap it leaves.
///
/// Returns the removed member (if it was present) and the siblings whose order
/// changed.
pub fn remove<T: Ordered + Clone>(siblings: &mut Vec<T>, id: &str) -> (Option<T>, Vec<T>) {
    sort_by_order(siblings);
    let removed = siblings
        .iter()
        .position(|item| item.id() == id)
        .map(|index| siblings.remove(index));
    let changed = renumber(siblings);
    (removed, changed)
}

/// Inserts `item` at position `index` (clamped to the group size).
///
/// Members at or after `index` shift up by one. The returned changes include
/// `item` itself when its order differs from the one it arrived with.
pub fn insert_at<T: Ordered + Clone>(siblings: &mut Vec<T>, item: T, index: usize) -> Vec<T> {
    sort_by_order(siblings);
    let index = index.min(siblings.len());
    siblings.insert(index, item);
    renumber(siblings)
}

/// Orders `siblings` by an explicit list of ids.
///
/// Listed ids that are not members of the group are ignored. Members missing
/// from the list keep their relative order and follow the listed ones.
pub fn reorder_by_ids<T: Ordered + Clone>(siblings: &mut Vec<T>, ids: &[String]) -> Vec<T> {
    sort_by_order(siblings);
    let mut pending: Vec<Option<T>> = siblings.drain(..).map(Some).collect();
    let mut reordered = Vec::with_capacity(pending.len());

    for id in ids {
        if let Some(slot) = pending
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|item| item.id() == id))
        {
            reordered.extend(slot.take());
        }
    }
    reordered.extend(pending.into_iter().flatten());

    *siblings = reordered;
    renumber(siblings)
}
