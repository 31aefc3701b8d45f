//! Duplicate detection for candidate orders.
//!
//! Two records collide when they share the same non-empty order number
//! (exact, case-sensitive). Whether a collision replaces the stored record
//! is decided by the caller; this module never prompts.

use crate::order::{NewOrder, OrderRecord};

/// What to do with a candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// No collision: store the candidate.
    Insert(NewOrder),
    /// Collision confirmed: remove `old_id`, then store the candidate.
    Replace { old_id: i64, candidate: NewOrder },
    /// Collision declined: store nothing.
    Reject,
}

/// Caller-owned source of the replace/keep decision.
///
/// Receives the stored record (whose client name and date are usually shown
/// to the user) and the incoming candidate.
pub trait ReplaceDecision {
    fn confirm_replace(&self, existing: &OrderRecord, candidate: &NewOrder) -> bool;
}

impl<F> ReplaceDecision for F
where
    F: Fn(&OrderRecord, &NewOrder) -> bool,
{
    fn confirm_replace(&self, existing: &OrderRecord, candidate: &NewOrder) -> bool {
        self(existing, candidate)
    }
}

/// Finds the stored record the candidate collides with, if any.
pub fn find_collision<'a>(
    candidate: &NewOrder,
    existing: &'a [OrderRecord],
) -> Option<&'a OrderRecord> {
    if candidate.order_number.is_empty() {
        return None;
    }
    existing
        .iter()
        .find(|r| r.order.order_number == candidate.order_number)
}

/// Resolves a candidate given an already-made decision for the collision case.
pub fn reconcile(candidate: NewOrder, existing: &[OrderRecord], replace: bool) -> Resolution {
    match find_collision(&candidate, existing) {
        None => Resolution::Insert(candidate),
        Some(old) if replace => Resolution::Replace {
            old_id: old.id,
            candidate,
        },
        Some(_) => Resolution::Reject,
    }
}

/// Resolves a candidate, consulting `decision` only when there is a collision.
pub fn reconcile_with(
    candidate: NewOrder,
    existing: &[OrderRecord],
    decision: &dyn ReplaceDecision,
) -> Resolution {
    let replace = match find_collision(&candidate, existing) {
        None => false,
        Some(old) => decision.confirm_replace(old, &candidate),
    };
    reconcile(candidate, existing, replace)
}
