//! # Assignment Editor
//!
//! Validated create/update/delete for exams and teachers, and settings edits.
//!
//! Every operation either applies completely or returns an error with the
//! roster untouched. Exam saves are checked for:
//! - a chosen date and time
//! - date/time membership in the allowed sets (when those are non-empty)
//! - seat counts within `MAX_ROLE_SEATS`
//! - seats referencing existing teachers
//! - no teacher seated twice in the same exam
//! - no teacher seated in another exam at the same slot

use crate::availability::Resolver;
use crate::primitives::{MAX_ROLE_SEATS, MAX_TEXT_LENGTH};
use crate::store::Roster;
use crate::{
    Exam, ExamDraft, ExamId, InvigilError, Role, SettingsPatch, Slot, Teacher, TeacherId,
};
use chrono::{NaiveDate, NaiveTime};
use std::collections::BTreeSet;

/// Mutating view over a roster.
#[derive(Debug)]
pub struct Editor<'a> {
    roster: &'a mut Roster,
}

impl<'a> Editor<'a> {
    pub fn new(roster: &'a mut Roster) -> Self {
        Self { roster }
    }

    // =========================================================================
    // EXAMS
    // =========================================================================

    /// Validate `draft` and store it as a new exam.
    pub fn create_exam(&mut self, draft: &ExamDraft) -> Result<ExamId, InvigilError> {
        let slot = self.validate_exam(draft, None)?;
        let id = self.roster.allocate_exam_id();
        self.roster.push_exam(build_exam(id, slot, draft));
        Ok(id)
    }

    /// Replace the exam `id` with the contents of `draft`. The id is kept.
    pub fn update_exam(&mut self, id: ExamId, draft: &ExamDraft) -> Result<(), InvigilError> {
        if self.roster.exam(id).is_none() {
            return Err(InvigilError::ExamNotFound(id));
        }
        let slot = self.validate_exam(draft, Some(id))?;
        let exam = self
            .roster
            .exam_mut(id)
            .ok_or(InvigilError::ExamNotFound(id))?;
        *exam = build_exam(id, slot, draft);
        Ok(())
    }

    /// Remove the exam `id`. Returns the removed exam, or `None` if it did
    /// not exist.
    pub fn delete_exam(&mut self, id: ExamId) -> Option<Exam> {
        self.roster.remove_exam(id)
    }

    /// Check `draft` against the roster and return its slot.
    ///
    /// `replacing` is the exam the draft would overwrite; it is ignored in
    /// the conflict check.
    pub fn validate_exam(
        &self,
        draft: &ExamDraft,
        replacing: Option<ExamId>,
    ) -> Result<Slot, InvigilError> {
        let date = draft.date.ok_or(InvigilError::MissingField("date"))?;
        let time = draft.time.ok_or(InvigilError::MissingField("time"))?;
        let slot = Slot::new(date, time);

        let settings = self.roster.settings();
        if !settings.allows_date(date) {
            return Err(InvigilError::DateNotAllowed(date));
        }
        if !settings.allows_time(time) {
            return Err(InvigilError::TimeNotAllowed(time));
        }

        check_text("subject", &draft.subject)?;

        for role in [Role::Examiner, Role::Proctor] {
            let count = draft.seats(role).len();
            if count > MAX_ROLE_SEATS {
                return Err(InvigilError::TooManySeats {
                    role,
                    count,
                    max: MAX_ROLE_SEATS,
                });
            }
        }

        let exclude: Vec<ExamId> = replacing.into_iter().collect();
        check_seats(
            self.roster,
            slot,
            draft
                .examiners
                .iter()
                .chain(draft.proctors.iter())
                .filter_map(|seat| *seat),
            &exclude,
        )?;

        Ok(slot)
    }

    // =========================================================================
    // TEACHERS
    // =========================================================================

    /// Add a teacher. The name is required; surrounding whitespace is trimmed.
    pub fn add_teacher(&mut self, name: &str, branch: &str) -> Result<TeacherId, InvigilError> {
        let name = required_name(name)?;
        let branch = branch.trim();
        check_text("branch", branch)?;
        Ok(self
            .roster
            .insert_teacher(name.to_string(), branch.to_string()))
    }

    /// Rename and/or re-branch a teacher.
    ///
    /// Exams reference teachers by id, so every exam that seats this teacher
    /// shows the new name from now on.
    pub fn update_teacher(
        &mut self,
        id: TeacherId,
        name: &str,
        branch: &str,
    ) -> Result<(), InvigilError> {
        let name = required_name(name)?;
        let branch = branch.trim();
        check_text("branch", branch)?;
        let teacher = self
            .roster
            .teacher_mut(id)
            .ok_or(InvigilError::TeacherNotFound(id))?;
        teacher.name = name.to_string();
        teacher.branch = branch.to_string();
        Ok(())
    }

    /// Remove a teacher and vacate every seat they held.
    ///
    /// Returns the removed teacher and the number of seats freed.
    pub fn delete_teacher(&mut self, id: TeacherId) -> Option<(Teacher, usize)> {
        let teacher = self.roster.remove_teacher(id)?;
        let freed = self.roster.exams_mut().map(|exam| exam.vacate(id)).sum();
        Some((teacher, freed))
    }

    // =========================================================================
    // SETTINGS
    // =========================================================================

    /// Apply a partial settings update.
    pub fn update_settings(&mut self, patch: SettingsPatch) {
        patch.apply_to(self.roster.settings_mut());
    }

    /// Add an allowed exam date. Returns `false` if it was already present.
    pub fn add_allowed_date(&mut self, date: NaiveDate) -> bool {
        self.roster.settings_mut().allowed_dates.insert(date)
    }

    /// Remove an allowed exam date. Returns `false` if it was not present.
    pub fn remove_allowed_date(&mut self, date: NaiveDate) -> bool {
        self.roster.settings_mut().allowed_dates.remove(&date)
    }

    /// Add an allowed exam time. Returns `false` if it was already present.
    pub fn add_allowed_time(&mut self, time: NaiveTime) -> bool {
        self.roster.settings_mut().allowed_times.insert(time)
    }

    /// Remove an allowed exam time. Returns `false` if it was not present.
    pub fn remove_allowed_time(&mut self, time: NaiveTime) -> bool {
        self.roster.settings_mut().allowed_times.remove(&time)
    }

    /// Delete every teacher and exam. Settings are kept.
    pub fn reset_records(&mut self) {
        self.roster.clear_records();
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Verify that the given seated teachers exist, appear once, and are free at
/// `slot` outside the exams in `exclude`.
pub(crate) fn check_seats(
    roster: &Roster,
    slot: Slot,
    seated: impl Iterator<Item = TeacherId>,
    exclude: &[ExamId],
) -> Result<(), InvigilError> {
    let resolver = Resolver::new(roster);
    let mut seen = BTreeSet::new();
    for teacher in seated {
        if roster.teacher(teacher).is_none() {
            return Err(InvigilError::TeacherNotFound(teacher));
        }
        if !seen.insert(teacher) {
            return Err(InvigilError::DuplicateSeat(teacher));
        }
        if let Some(exam) = resolver.conflict(teacher, slot, exclude) {
            return Err(InvigilError::SlotConflict {
                teacher,
                slot,
                exam,
            });
        }
    }
    Ok(())
}

fn build_exam(id: ExamId, slot: Slot, draft: &ExamDraft) -> Exam {
    Exam {
        id,
        slot,
        subject: draft.subject.trim().to_string(),
        grade: draft.grade.clone(),
        student_count: draft.student_count,
        examiners: draft.examiners.clone(),
        proctors: draft.proctors.clone(),
    }
}

fn required_name(name: &str) -> Result<&str, InvigilError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(InvigilError::MissingField("name"));
    }
    check_text("name", trimmed)?;
    Ok(trimmed)
}

fn check_text(field: &'static str, value: &str) -> Result<(), InvigilError> {
    if value.chars().count() > MAX_TEXT_LENGTH {
        return Err(InvigilError::InvalidValue {
            field,
            value: value.chars().take(32).collect::<String>() + "...",
        });
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
