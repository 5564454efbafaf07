//! Diff engine
//!
//! Compares the believed driver state against the requested state and marks
//! every binding point that has to be re-issued.

use super::binding::{same_binding, BindingState, TrackedBinding};
use super::key::BindingKey;
use super::mask::BindingDiff;
use rustc_hash::FxHashMap;

impl BindingState {
    /// Compute the change masks that take `self` (current) to `target`.
    ///
    /// A binding point is marked when `forced` is set, when the requested
    /// resource differs from the bound one (absent and dropped both count as
    /// unbound), or when the bound resource moved or was resized since it
    /// was bound.
    pub fn diff(&self, target: &BindingState, forced: bool) -> BindingDiff {
        let mut diff = BindingDiff::default();
        diff_category(&self.buffers, &target.buffers, forced, &mut diff);
        diff_category(&self.textures, &target.textures, forced, &mut diff);
        diff_category(&self.images, &target.images, forced, &mut diff);
        diff
    }
}

// Both directions are scanned: a key may be present in either map only.
fn diff_category<B: TrackedBinding>(
    current: &FxHashMap<BindingKey, B>,
    target: &FxHashMap<BindingKey, B>,
    forced: bool,
    diff: &mut BindingDiff,
) {
    for (key, bound) in current {
        if forced || bound.is_stale() || !same_binding(Some(bound), target.get(key)) {
            mark(diff, *key);
        }
    }
    for (key, wanted) in target {
        let bound = current.get(key);
        let stale = bound.is_some_and(|bound| bound.is_stale());
        if forced || stale || !same_binding(bound, Some(wanted)) {
            mark(diff, *key);
        }
    }
}

fn mark(diff: &mut BindingDiff, key: BindingKey) {
    if !diff.mark(key) {
        tracing::warn!(?key, "binding point is outside the trackable slot range, ignoring");
    }
}
