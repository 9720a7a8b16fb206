//! # Merge Operator
//!
//! Consolidates two exam sessions into one.
//!
//! The merged record keeps the target's id and slot, concatenates the
//! descriptive fields (source first) and takes its staffing entirely from the
//! source. The source record is removed.
//!
//! Merging is driven by a two-step selection: the first pick remembers the
//! source, a second distinct pick merges, and picking the same exam twice
//! cancels.

use crate::editor::check_seats;
use crate::primitives::MERGE_SEPARATOR;
use crate::store::Roster;
use crate::{Exam, ExamId, Grade, InvigilError};

/// Combine source `s` into target `t` without touching any store.
#[must_use]
pub fn combine(s: &Exam, t: &Exam) -> Exam {
    Exam {
        id: t.id,
        slot: t.slot,
        subject: format!("{}{}{}", s.subject, MERGE_SEPARATOR, t.subject),
        grade: Grade::combine(&s.grade, &t.grade),
        student_count: s.student_count.saturating_add(t.student_count),
        examiners: s.examiners.clone(),
        proctors: s.proctors.clone(),
    }
}

/// Merge `source` into `target` inside `roster`.
///
/// Returns `Ok(None)` when either exam no longer exists or both ids are the
/// same; nothing is changed in that case. Fails without mutation when the
/// source staff already sit in another exam at the target's slot.
pub(crate) fn merge(
    roster: &mut Roster,
    source: ExamId,
    target: ExamId,
) -> Result<Option<Exam>, InvigilError> {
    if source == target {
        return Ok(None);
    }
    let (Some(s), Some(t)) = (roster.exam(source), roster.exam(target)) else {
        return Ok(None);
    };

    let merged = combine(s, t);
    check_seats(roster, merged.slot, merged.assigned(), &[source, target])?;

    let entry = roster
        .exam_mut(target)
        .ok_or(InvigilError::ExamNotFound(target))?;
    *entry = merged.clone();
    roster.remove_exam(source);
    Ok(Some(merged))
}

// =============================================================================
// TWO-STEP SELECTION
// =============================================================================

/// Outcome of one merge selection click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeStep {
    /// The exam was remembered as the merge source.
    SourceSelected(ExamId),
    /// The pending source was picked again; selection cleared.
    Cancelled(ExamId),
    /// Source merged into target; carries the resulting record.
    Merged { source: ExamId, merged: Exam },
    /// One of the exams vanished before the merge; nothing changed.
    Skipped { source: ExamId, target: ExamId },
}

/// Pending merge source, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSelection {
    pending: Option<ExamId>,
}

impl MergeSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The exam waiting to be merged into the next pick.
    #[must_use]
    pub fn pending(&self) -> Option<ExamId> {
        self.pending
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Register a pick of `exam`.
    ///
    /// The pending source is cleared once a second pick happens, whether or
    /// not the merge succeeds.
    pub(crate) fn select(
        &mut self,
        roster: &mut Roster,
        exam: ExamId,
    ) -> Result<MergeStep, InvigilError> {
        let Some(source) = self.pending.take() else {
            self.pending = Some(exam);
            return Ok(MergeStep::SourceSelected(exam));
        };
        if source == exam {
            return Ok(MergeStep::Cancelled(exam));
        }
        Ok(match merge(roster, source, exam)? {
            Some(merged) => MergeStep::Merged { source, merged },
            None => MergeStep::Skipped {
                source,
                target: exam,
            },
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
