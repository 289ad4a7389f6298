//! Course progress bookkeeping
//!
//! Progress is a whole percentage derived from the set of completed lessons.
//! The stored value only moves forward: lessons added to a course after a
//! learner finished it never take the completion away.

use crate::types::Enrollment;
use chrono::{DateTime, Utc};

/// Percentage of `completed` out of `total`, rounded half away from zero.
///
/// A course without lessons has 0% progress. `completed` is clamped to
/// `total` so stale completion rows (e.g. for deleted lessons) cannot push
/// the value past 100.
pub fn compute_progress(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    ((100.0 * completed as f64) / total as f64).round() as u8
}

/// Fold a freshly computed percentage into an enrollment.
///
/// Keeps the larger of the stored and computed value and stamps
/// `completed_at` the first time progress reaches 100. Returns true when this
/// call performed that transition.
pub fn apply_progress(enrollment: &mut Enrollment, computed: u8, now: DateTime<Utc>) -> bool {
    let computed = computed.min(100);
    enrollment.progress = enrollment.progress.max(computed);

    if enrollment.progress == 100 && enrollment.completed_at.is_none() {
        enrollment.completed_at = Some(now);
        return true;
    }
    false
}

/// Check the `completed_at iff progress == 100` invariant
pub fn is_consistent(enrollment: &Enrollment) -> bool {
    enrollment.progress <= 100 && (enrollment.completed_at.is_some() == (enrollment.progress == 100))
}
