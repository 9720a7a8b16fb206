//! # Availability Resolver
//!
//! Computes which teachers may fill a given seat of an exam being composed.
//!
//! A teacher is excluded when:
//! - they already sit in the staged exam, in any seat other than the one being
//!   edited (same role array) or in any seat of the other role array;
//! - they sit in a committed exam at the same slot, unless that exam is the
//!   one being edited in place.
//!
//! Branch and grade never exclude anyone. Results are ordered by branch under
//! Turkish collation; teachers with equal branches keep roster order.

use crate::collation;
use crate::store::Roster;
use crate::{ExamDraft, ExamId, Role, Slot, Teacher, TeacherId};
use std::collections::BTreeSet;

/// Read-only resolver over a roster.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    roster: &'a Roster,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(roster: &'a Roster) -> Self {
        Self { roster }
    }

    /// All teachers sorted by branch (stable).
    #[must_use]
    pub fn sorted_teachers(&self) -> Vec<&'a Teacher> {
        let mut teachers: Vec<&Teacher> = self.roster.teachers().iter().collect();
        teachers.sort_by(|a, b| collation::compare(&a.branch, &b.branch));
        teachers
    }

    /// Teachers eligible for seat `index` of `role` in `draft`.
    ///
    /// `exclude` names the committed exam the draft is replacing, if any.
    /// Without a chosen date and time no slot filtering applies, and every
    /// teacher is returned.
    #[must_use]
    pub fn available(
        &self,
        draft: &ExamDraft,
        role: Role,
        index: usize,
        exclude: Option<ExamId>,
    ) -> Vec<&'a Teacher> {
        let Some(slot) = draft.slot() else {
            return self.sorted_teachers();
        };

        let mut taken: BTreeSet<TeacherId> = draft
            .seats(role)
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .filter_map(|(_, seat)| *seat)
            .collect();
        taken.extend(draft.seats(role.other()).iter().filter_map(|seat| *seat));
        taken.extend(self.booked_at(slot, exclude));

        self.sorted_teachers()
            .into_iter()
            .filter(|t| !taken.contains(&t.id))
            .collect()
    }

    /// Teachers seated in any committed exam at `slot`, except `exclude`.
    #[must_use]
    pub fn booked_at(&self, slot: Slot, exclude: Option<ExamId>) -> BTreeSet<TeacherId> {
        self.roster
            .exams_at(slot)
            .filter(|e| Some(e.id) != exclude)
            .flat_map(|e| e.assigned())
            .collect()
    }

    /// The committed exam at `slot` (other than those in `exclude`) in which
    /// `teacher` already sits.
    #[must_use]
    pub fn conflict(&self, teacher: TeacherId, slot: Slot, exclude: &[ExamId]) -> Option<ExamId> {
        self.roster
            .exams_at(slot)
            .filter(|e| !exclude.contains(&e.id))
            .find(|e| e.holds(teacher))
            .map(|e| e.id)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Exam, Grade, Snapshot};

    fn teacher(id: u64, name: &str, branch: &str) -> Teacher {
        Teacher::new(TeacherId(id), name, branch)
    }

    fn exam(id: u64, time: &str, examiners: &[u64], proctors: &[u64]) -> Exam {
        Exam {
            id: ExamId(id),
            slot: Slot::parse("2025-02-10", time).expect("slot"),
            subject: "Math".to_string(),
            grade: Grade::default(),
            student_count: 1,
            examiners: examiners.iter().map(|&t| Some(TeacherId(t))).collect(),
            proctors: proctors.iter().map(|&t| Some(TeacherId(t))).collect(),
        }
    }

    fn roster() -> Roster {
        Roster::from_snapshot(Snapshot {
            teachers: vec![
                teacher(1, "Ali", "Matematik"),
                teacher(2, "Veli", "Biyoloji"),
                teacher(3, "Can", "Coğrafya"),
                teacher(4, "Deniz", "Biyoloji"),
                teacher(5, "Ece", "Çizim"),
            ],
            exams: vec![exam(10, "09:00", &[1], &[2]), exam(11, "10:00", &[3], &[])],
            ..Snapshot::default()
        })
    }

    fn ids(teachers: &[&Teacher]) -> Vec<u64> {
        teachers.iter().map(|t| t.id.0).collect()
    }

    fn draft_at(time: &str) -> ExamDraft {
        ExamDraft {
            date: Some(Slot::parse("2025-02-10", time).expect("slot").date),
            time: Some(Slot::parse("2025-02-10", time).expect("slot").time),
            ..ExamDraft::default()
        }
    }

    #[test]
    fn sorted_by_branch_with_stable_ties() {
        let roster = roster();
        let sorted = Resolver::new(&roster).sorted_teachers();
        // Biyoloji (2, 4), Coğrafya (3), Çizim (5), Matematik (1)
        assert_eq!(ids(&sorted), vec![2, 4, 3, 5, 1]);
    }

    #[test]
    fn unset_slot_returns_everyone() {
        let roster = roster();
        let draft = ExamDraft {
            examiners: vec![Some(TeacherId(3))],
            ..ExamDraft::default()
        };
        let available = Resolver::new(&roster).available(&draft, Role::Proctor, 0, None);
        assert_eq!(available.len(), 5);
    }

    #[test]
    fn excludes_teachers_booked_at_same_slot() {
        let roster = roster();
        let available =
            Resolver::new(&roster).available(&draft_at("09:00"), Role::Examiner, 0, None);
        assert_eq!(ids(&available), vec![4, 3, 5]);
    }

    #[test]
    fn other_slots_do_not_exclude() {
        let roster = roster();
        let available =
            Resolver::new(&roster).available(&draft_at("11:00"), Role::Examiner, 0, None);
        assert_eq!(available.len(), 5);
    }

    #[test]
    fn exclude_id_ignores_the_exam_being_edited() {
        let roster = roster();
        let available = Resolver::new(&roster).available(
            &draft_at("09:00"),
            Role::Examiner,
            0,
            Some(ExamId(10)),
        );
        assert_eq!(available.len(), 5);
    }

    #[test]
    fn seat_being_edited_stays_selectable() {
        let roster = roster();
        let mut draft = draft_at("11:00");
        draft.examiners = vec![Some(TeacherId(4)), Some(TeacherId(5))];
        draft.proctors = vec![Some(TeacherId(3))];

        let resolver = Resolver::new(&roster);
        let for_first = resolver.available(&draft, Role::Examiner, 0, None);
        // 4 occupies the seat being edited; 5 and 3 are taken elsewhere in the draft.
        assert_eq!(ids(&for_first), vec![2, 4, 1]);

        let for_proctor = resolver.available(&draft, Role::Proctor, 0, None);
        assert_eq!(ids(&for_proctor), vec![2, 3, 1]);
    }

    #[test]
    fn conflict_reports_the_holding_exam() {
        let roster = roster();
        let slot = Slot::parse("2025-02-10", "09:00").expect("slot");
        let resolver = Resolver::new(&roster);
        assert_eq!(resolver.conflict(TeacherId(2), slot, &[]), Some(ExamId(10)));
        assert_eq!(resolver.conflict(TeacherId(2), slot, &[ExamId(10)]), None);
        assert_eq!(resolver.conflict(TeacherId(4), slot, &[]), None);
    }
}
