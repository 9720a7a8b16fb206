//! # Statistics Aggregator
//!
//! Per-teacher workload derived from the exam collection.
//!
//! Counts are numbers of exams in which the teacher holds at least one seat of
//! that role, not the number of seats. Results are sorted by total descending;
//! equal totals keep roster order.

use crate::store::Roster;
use crate::{Role, Teacher};
use serde::{Deserialize, Serialize};

/// Workload of one teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherLoad {
    pub teacher: Teacher,
    pub examiner_count: usize,
    pub proctor_count: usize,
    pub total: usize,
}

/// Workload of every teacher, busiest first.
#[must_use]
pub fn workload(roster: &Roster) -> Vec<TeacherLoad> {
    let mut loads: Vec<TeacherLoad> = roster
        .teachers()
        .iter()
        .map(|teacher| {
            let count = |role: Role| {
                roster
                    .exams()
                    .iter()
                    .filter(|exam| exam.has_role(teacher.id, role))
                    .count()
            };
            let examiner_count = count(Role::Examiner);
            let proctor_count = count(Role::Proctor);
            TeacherLoad {
                teacher: teacher.clone(),
                examiner_count,
                proctor_count,
                total: examiner_count + proctor_count,
            }
        })
        .collect();

    // sort_by is stable
    loads.sort_by(|a, b| b.total.cmp(&a.total));
    loads
}

// =============================================================================
// ROSTER METRICS
// =============================================================================

/// Summary counts over the whole roster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterMetrics {
    pub teacher_count: usize,
    pub exam_count: usize,
    /// Seats across all exams, filled or not.
    pub seat_count: usize,
    pub filled_seat_count: usize,
    /// Distinct (date, time) slots in use.
    pub slot_count: usize,
    pub student_count: u64,
}

impl RosterMetrics {
    #[must_use]
    pub fn from_roster(roster: &Roster) -> Self {
        let exams = roster.exams();
        let mut slots: Vec<_> = exams.iter().map(|e| e.slot).collect();
        slots.sort_unstable();
        slots.dedup();

        Self {
            teacher_count: roster.teacher_count(),
            exam_count: exams.len(),
            seat_count: exams
                .iter()
                .map(|e| e.examiners.len() + e.proctors.len())
                .sum(),
            filled_seat_count: exams.iter().map(|e| e.assigned().count()).sum(),
            slot_count: slots.len(),
            student_count: exams.iter().map(|e| u64::from(e.student_count)).sum(),
        }
    }

    /// Seats still waiting for a teacher.
    #[must_use]
    pub fn open_seat_count(&self) -> usize {
        self.seat_count.saturating_sub(self.filled_seat_count)
    }
}
