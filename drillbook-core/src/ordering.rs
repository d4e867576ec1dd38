//! Manual ordering engine
//!
//! Courses, lessons, and rudiments share the same scheme: an integer `order`
//! field per entity, canonical listing order ascending by `order` with the
//! document ID as a deterministic tie-break, and single-position moves done
//! by exchanging the `order` values of two adjacent list entries.
//!
//! Duplicate `order` values are a recognized state, not corruption: a
//! reorder whose second write failed leaves two siblings sharing one value,
//! and the tie-break keeps their listing deterministic until the next
//! successful move repairs it.

use serde::{Deserialize, Serialize};

/// Entity that participates in a manually ordered scope
pub trait Orderable {
    fn doc_id(&self) -> &str;
    fn order(&self) -> i64;
    fn set_order(&mut self, order: i64);
}

/// Direction of an adjacent move within the listed order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

/// Pending order write for one entity, produced by [`move_adjacent`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderWrite {
    pub doc_id: String,
    pub order: i64,
}

/// The two writes of an adjacent swap, to be issued first-then-second
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacentSwap {
    pub first: OrderWrite,
    pub second: OrderWrite,
}

/// Sort into canonical listing order: ascending `order`, then ascending ID.
pub fn sort_canonical<T: Orderable>(items: &mut [T]) {
    items.sort_by(|a, b| {
        a.order()
            .cmp(&b.order())
            .then_with(|| a.doc_id().cmp(b.doc_id()))
    });
}

/// Move `target_id` one position within the held ordered list.
///
/// Operates on the caller's current list, not a fresh read. Returns the
/// re-sorted list with both entities' `order` fields already exchanged in
/// memory, plus the two order writes that persist the swap. When the target
/// is missing or already at the relevant extreme this is a no-op: the input
/// list comes back unchanged with no writes.
pub fn move_adjacent<T: Orderable + Clone>(
    items: &[T],
    target_id: &str,
    direction: MoveDirection,
) -> (Vec<T>, Option<AdjacentSwap>) {
    let Some(pos) = items.iter().position(|e| e.doc_id() == target_id) else {
        return (items.to_vec(), None);
    };
    let neighbor = match direction {
        MoveDirection::Up => pos.checked_sub(1),
        MoveDirection::Down => (pos + 1 < items.len()).then_some(pos + 1),
    };
    let Some(neighbor) = neighbor else {
        // Already at an extreme
        return (items.to_vec(), None);
    };

    let mut next = items.to_vec();
    let target_order = next[pos].order();
    let neighbor_order = next[neighbor].order();
    next[pos].set_order(neighbor_order);
    next[neighbor].set_order(target_order);

    let swap = AdjacentSwap {
        first: OrderWrite {
            doc_id: next[pos].doc_id().to_string(),
            order: neighbor_order,
        },
        second: OrderWrite {
            doc_id: next[neighbor].doc_id().to_string(),
            order: target_order,
        },
    };

    sort_canonical(&mut next);
    (next, Some(swap))
}
