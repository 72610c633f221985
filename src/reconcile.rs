//! Set arithmetic over inventories.

use std::collections::BTreeSet;

/// Everything in `a` that is not in `b`.
///
/// Both inputs are ordered sets, so this is a single merge pass over the two
/// and the output comes back sorted without a separate sort step.
pub fn difference<T: Ord + Clone>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> BTreeSet<T> {
    a.difference(b).cloned().collect()
}
