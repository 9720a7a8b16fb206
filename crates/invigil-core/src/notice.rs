//! # Notice Projection
//!
//! Read-only views for printing: a teacher's assignment notice and the exam
//! program. Teacher ids are resolved to names here and nowhere else.

use crate::store::Roster;
use crate::{Exam, ExamId, Grade, InvigilError, Role, Slot, Teacher, TeacherId};
use serde::{Deserialize, Serialize};

/// One exam on a teacher's notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duty {
    pub exam: ExamId,
    pub slot: Slot,
    pub subject: String,
    pub grade: Grade,
    pub role: Role,
    /// Printed duty title, e.g. "GÖZETMEN".
    pub title: String,
}

/// A teacher's assignment notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub school_name: String,
    pub exam_period: String,
    pub principal_name: String,
    pub teacher: Teacher,
    /// Ordered by slot ascending.
    pub duties: Vec<Duty>,
}

/// Exams in which `teacher` holds a seat, ordered by slot.
///
/// Exams sharing a slot keep roster order.
#[must_use]
pub fn duties_for(roster: &Roster, teacher: TeacherId) -> Vec<Duty> {
    let mut duties: Vec<Duty> = roster
        .exams()
        .iter()
        .filter_map(|exam| {
            let role = exam.role_of(teacher)?;
            Some(Duty {
                exam: exam.id,
                slot: exam.slot,
                subject: exam.subject.clone(),
                grade: exam.grade.clone(),
                role,
                title: role.title().to_string(),
            })
        })
        .collect();
    duties.sort_by_key(|d| d.slot);
    duties
}

/// Full notice for `teacher`.
pub fn notice_for(roster: &Roster, teacher: TeacherId) -> Result<Notice, InvigilError> {
    let person = roster
        .teacher(teacher)
        .ok_or(InvigilError::TeacherNotFound(teacher))?;
    let settings = roster.settings();
    Ok(Notice {
        school_name: settings.school_name.clone(),
        exam_period: settings.exam_period.clone(),
        principal_name: settings.principal_name.clone(),
        teacher: person.clone(),
        duties: duties_for(roster, teacher),
    })
}

// =============================================================================
// PROGRAM
// =============================================================================

/// One row of the printed exam program, names resolved.
///
/// Empty seats resolve to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRow {
    pub exam: ExamId,
    pub slot: Slot,
    pub subject: String,
    pub grade: Grade,
    pub student_count: u32,
    pub examiners: Vec<Option<String>>,
    pub proctors: Vec<Option<String>>,
}

impl ProgramRow {
    fn resolve(roster: &Roster, exam: &Exam) -> Self {
        let names = |role: Role| {
            exam.seats(role)
                .iter()
                .map(|seat| seat.and_then(|id| roster.name_of(id)).map(str::to_string))
                .collect()
        };
        Self {
            exam: exam.id,
            slot: exam.slot,
            subject: exam.subject.clone(),
            grade: exam.grade.clone(),
            student_count: exam.student_count,
            examiners: names(Role::Examiner),
            proctors: names(Role::Proctor),
        }
    }
}

/// Exams sorted by slot (stable), in printable form.
#[must_use]
pub fn program(roster: &Roster) -> Vec<ProgramRow> {
    let mut rows: Vec<ProgramRow> = roster
        .exams()
        .iter()
        .map(|exam| ProgramRow::resolve(roster, exam))
        .collect();
    rows.sort_by_key(|r| r.slot);
    rows
}
