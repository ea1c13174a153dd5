//! Attribute reconciliation.
//!
//! Declared flags are the minimum a patch requires. The bits of the existing definition that the
//! host format reserves ([`MemberAttributes::PRESERVED`]) are always kept. Accessibility is
//! compared on the partial order of [`crate::metadata::attributes::AccessLevel`]; every other bit
//! takes the declared value.
//!
//! How accessibility is reconciled depends on the existence policy:
//!
//! - `FailIfMissing` widens to the declared level only if the existing level does not already
//!   dominate it, and otherwise keeps the existing level.
//! - `CreateIfMissing` and `FailIfPresent` set exactly the declared level.

use crate::{metadata::attributes::MemberAttributes, modification::ModificationKind};

/// Computes the flags a definition must have to satisfy `declared`.
///
/// `nested` selects the type visibility encoding and is ignored for members. The caller compares
/// the result with `existing` to decide whether a write is needed.
#[must_use]
pub fn merge_attributes<F: MemberAttributes>(
    existing: F,
    declared: F,
    nested: bool,
    kind: ModificationKind,
) -> F {
    let access_mask = F::ACCESS_MASK;
    let keep_mask = F::PRESERVED & !access_mask;

    let access = match kind {
        ModificationKind::FailIfMissing
            if existing
                .access_level(nested)
                .dominates(declared.access_level(nested)) =>
        {
            existing.raw() & access_mask
        }
        _ => declared.raw() & access_mask,
    };

    let rest = (declared.raw() & !access_mask & !keep_mask) | (existing.raw() & keep_mask);
    F::from_raw(access | rest)
}
