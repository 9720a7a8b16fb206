//! # Session Module
//!
//! Session management combining the Roster with a volatile edit buffer.
//!
//! - The roster is the single source of truth and the unit of persistence.
//! - The edit buffer (staged exam and the id it replaces) and the pending
//!   merge selection are session-local: never serialized, cleared on import
//!   and reset.
//! - Every successful mutation bumps `revision`, which callers use to decide
//!   when a snapshot needs saving.

use crate::availability::Resolver;
use crate::editor::Editor;
use crate::export::{export_json, import_json};
use crate::merge::{MergeSelection, MergeStep};
use crate::notice::{Notice, ProgramRow, notice_for, program};
use crate::primitives::MAX_ROLE_SEATS;
use crate::stats::{RosterMetrics, TeacherLoad, workload};
use crate::store::Roster;
use crate::{
    Exam, ExamDraft, ExamId, InvigilError, Role, Seat, SettingsPatch, Snapshot, Teacher,
    TeacherId,
};
use chrono::{NaiveDate, NaiveTime};

/// The exam being composed, and the committed exam it will replace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    pub editing: Option<ExamId>,
    pub draft: ExamDraft,
}

impl EditBuffer {
    /// Reset to a fresh draft for a new exam.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A Session combines a Roster with a volatile edit buffer.
#[derive(Debug, Clone)]
pub struct Session {
    roster: Roster,
    buffer: EditBuffer,
    merge: MergeSelection,
    revision: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session over a fresh dataset (default settings, one sample teacher).
    #[must_use]
    pub fn new() -> Self {
        Self::with_roster(Roster::seeded())
    }

    #[must_use]
    pub fn with_roster(roster: Roster) -> Self {
        Self {
            roster,
            buffer: EditBuffer::default(),
            merge: MergeSelection::new(),
            revision: 0,
        }
    }

    /// A session over a loaded snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self::with_roster(Roster::from_snapshot(snapshot))
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    #[must_use]
    pub fn draft(&self) -> &ExamDraft {
        &self.buffer.draft
    }

    /// The committed exam currently loaded for editing.
    #[must_use]
    pub fn editing(&self) -> Option<ExamId> {
        self.buffer.editing
    }

    #[must_use]
    pub fn pending_merge(&self) -> Option<ExamId> {
        self.merge.pending()
    }

    /// Mutation counter; increases on every change to the roster.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.roster.to_snapshot()
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    // =========================================================================
    // EDIT BUFFER
    // =========================================================================

    /// Replace the staged draft, keeping what it is editing.
    pub fn stage_draft(&mut self, draft: ExamDraft) -> Result<(), InvigilError> {
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
        self.buffer.draft = draft;
        Ok(())
    }

    /// Load the committed exam `id` into the buffer for in-place editing.
    pub fn edit_exam(&mut self, id: ExamId) -> Result<&ExamDraft, InvigilError> {
        let exam = self.roster.exam(id).ok_or(InvigilError::ExamNotFound(id))?;
        self.buffer = EditBuffer {
            editing: Some(id),
            draft: ExamDraft::from_exam(exam),
        };
        Ok(&self.buffer.draft)
    }

    /// Discard the buffer and start a new draft.
    pub fn clear_draft(&mut self) {
        self.buffer.clear();
    }

    /// Change the seat count of `role` in the draft.
    pub fn resize_draft(&mut self, role: Role, count: usize) -> Result<(), InvigilError> {
        if count > MAX_ROLE_SEATS {
            return Err(InvigilError::TooManySeats {
                role,
                count,
                max: MAX_ROLE_SEATS,
            });
        }
        self.buffer.draft.resize(role, count);
        Ok(())
    }

    /// Fill or clear one seat of the draft.
    pub fn assign_seat(&mut self, role: Role, index: usize, seat: Seat) -> Result<(), InvigilError> {
        if let Some(teacher) = seat.filter(|&t| self.roster.teacher(t).is_none()) {
            return Err(InvigilError::TeacherNotFound(teacher));
        }
        self.buffer.draft.assign(role, index, seat)
    }

    /// Teachers that may fill seat `index` of `role` in the draft.
    #[must_use]
    pub fn available(&self, role: Role, index: usize) -> Vec<&Teacher> {
        Resolver::new(&self.roster).available(
            &self.buffer.draft,
            role,
            index,
            self.buffer.editing,
        )
    }

    /// Save the draft: update the exam being edited, or create a new one.
    /// The buffer is cleared on success and kept on failure.
    pub fn commit_draft(&mut self) -> Result<ExamId, InvigilError> {
        let draft = &self.buffer.draft;
        let mut editor = Editor::new(&mut self.roster);
        let id = match self.buffer.editing {
            Some(id) => {
                editor.update_exam(id, draft)?;
                id
            }
            None => editor.create_exam(draft)?,
        };
        self.buffer.clear();
        self.touch();
        Ok(id)
    }

    // =========================================================================
    // EXAMS
    // =========================================================================

    pub fn create_exam(&mut self, draft: &ExamDraft) -> Result<ExamId, InvigilError> {
        let id = Editor::new(&mut self.roster).create_exam(draft)?;
        self.touch();
        Ok(id)
    }

    pub fn update_exam(&mut self, id: ExamId, draft: &ExamDraft) -> Result<(), InvigilError> {
        Editor::new(&mut self.roster).update_exam(id, draft)?;
        self.touch();
        Ok(())
    }

    /// Delete an exam. Clears the buffer if that exam was being edited.
    pub fn delete_exam(&mut self, id: ExamId) -> Result<Exam, InvigilError> {
        let exam = Editor::new(&mut self.roster)
            .delete_exam(id)
            .ok_or(InvigilError::ExamNotFound(id))?;
        if self.buffer.editing == Some(id) {
            self.buffer.clear();
        }
        if self.merge.pending() == Some(id) {
            self.merge.clear();
        }
        self.touch();
        Ok(exam)
    }

    /// Exams ordered by (date, time); equal slots keep insertion order.
    #[must_use]
    pub fn sorted_exams(&self) -> Vec<&Exam> {
        let mut exams: Vec<&Exam> = self.roster.exams().iter().collect();
        exams.sort_by_key(|e| e.slot);
        exams
    }

    // =========================================================================
    // MERGE
    // =========================================================================

    /// Register a merge pick. See [`MergeSelection`].
    pub fn select_for_merge(&mut self, id: ExamId) -> Result<MergeStep, InvigilError> {
        let step = self.merge.select(&mut self.roster, id)?;
        if let MergeStep::Merged { source, .. } = &step {
            if self.buffer.editing == Some(*source) {
                self.buffer.clear();
            }
            self.touch();
        }
        Ok(step)
    }

    // =========================================================================
    // TEACHERS
    // =========================================================================

    pub fn add_teacher(&mut self, name: &str, branch: &str) -> Result<TeacherId, InvigilError> {
        let id = Editor::new(&mut self.roster).add_teacher(name, branch)?;
        self.touch();
        Ok(id)
    }

    pub fn update_teacher(
        &mut self,
        id: TeacherId,
        name: &str,
        branch: &str,
    ) -> Result<(), InvigilError> {
        Editor::new(&mut self.roster).update_teacher(id, name, branch)?;
        self.touch();
        Ok(())
    }

    /// Delete a teacher, vacating their seats in every exam and in the draft.
    pub fn delete_teacher(&mut self, id: TeacherId) -> Result<Teacher, InvigilError> {
        let (teacher, _) = Editor::new(&mut self.roster)
            .delete_teacher(id)
            .ok_or(InvigilError::TeacherNotFound(id))?;
        let draft = &mut self.buffer.draft;
        for seat in draft.examiners.iter_mut().chain(draft.proctors.iter_mut()) {
            if *seat == Some(id) {
                *seat = None;
            }
        }
        self.touch();
        Ok(teacher)
    }

    /// Teachers ordered by branch under Turkish collation.
    #[must_use]
    pub fn sorted_teachers(&self) -> Vec<&Teacher> {
        Resolver::new(&self.roster).sorted_teachers()
    }

    // =========================================================================
    // SETTINGS
    // =========================================================================

    pub fn update_settings(&mut self, patch: SettingsPatch) {
        Editor::new(&mut self.roster).update_settings(patch);
        self.touch();
    }

    pub fn add_allowed_date(&mut self, date: NaiveDate) -> bool {
        let added = Editor::new(&mut self.roster).add_allowed_date(date);
        if added {
            self.touch();
        }
        added
    }

    pub fn remove_allowed_date(&mut self, date: NaiveDate) -> bool {
        let removed = Editor::new(&mut self.roster).remove_allowed_date(date);
        if removed {
            self.touch();
        }
        removed
    }

    pub fn add_allowed_time(&mut self, time: NaiveTime) -> bool {
        let added = Editor::new(&mut self.roster).add_allowed_time(time);
        if added {
            self.touch();
        }
        added
    }

    pub fn remove_allowed_time(&mut self, time: NaiveTime) -> bool {
        let removed = Editor::new(&mut self.roster).remove_allowed_time(time);
        if removed {
            self.touch();
        }
        removed
    }

    // =========================================================================
    // PROJECTIONS
    // =========================================================================

    #[must_use]
    pub fn stats(&self) -> Vec<TeacherLoad> {
        workload(&self.roster)
    }

    #[must_use]
    pub fn metrics(&self) -> RosterMetrics {
        RosterMetrics::from_roster(&self.roster)
    }

    pub fn notice(&self, teacher: TeacherId) -> Result<Notice, InvigilError> {
        notice_for(&self.roster, teacher)
    }

    #[must_use]
    pub fn program(&self) -> Vec<ProgramRow> {
        program(&self.roster)
    }

    // =========================================================================
    // WHOLE-DATASET OPERATIONS
    // =========================================================================

    pub fn export_json(&self) -> Result<String, InvigilError> {
        export_json(&self.roster.to_snapshot())
    }

    /// Replace the whole dataset from JSON text. On error nothing changes.
    pub fn import_json(&mut self, text: &str) -> Result<(), InvigilError> {
        let snapshot = import_json(text)?;
        self.replace(snapshot);
        Ok(())
    }

    /// Replace the whole dataset with `snapshot`.
    pub fn replace(&mut self, snapshot: Snapshot) {
        self.roster = Roster::from_snapshot(snapshot);
        self.buffer.clear();
        self.merge.clear();
        self.touch();
    }

    /// Delete every exam and teacher. Settings are kept.
    pub fn reset(&mut self) {
        Editor::new(&mut self.roster).reset_records();
        self.buffer.clear();
        self.merge.clear();
        self.touch();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Grade, Slot};

    fn session() -> Session {
        let mut session = Session::from_snapshot(Snapshot::default());
        session.add_teacher("Ali", "Matematik").expect("add");
        session.add_teacher("Veli", "Fizik").expect("add");
        session.add_teacher("Can", "Biyoloji").expect("add");
        session
    }

    fn stage(session: &mut Session, time: &str, examiner: u64, proctor: u64) {
        let slot = Slot::parse("2025-02-10", time).expect("slot");
        session
            .stage_draft(ExamDraft {
                date: Some(slot.date),
                time: Some(slot.time),
                subject: "Math".to_string(),
                ..ExamDraft::default()
            })
            .expect("stage");
        session
            .assign_seat(Role::Examiner, 0, Some(TeacherId(examiner)))
            .expect("assign");
        session
            .assign_seat(Role::Proctor, 0, Some(TeacherId(proctor)))
            .expect("assign");
    }

    #[test]
    fn new_session_is_seeded() {
        let session = Session::new();
        assert_eq!(session.roster().teacher_count(), 1);
        assert_eq!(session.draft().grade, Grade::default());
        assert_eq!(session.draft().examiners.len(), 1);
        assert_eq!(session.draft().proctors.len(), 1);
    }

    #[test]
    fn commit_creates_then_updates_in_place() {
        let mut session = session();
        stage(&mut session, "09:00", 1, 2);
        let id = session.commit_draft().expect("commit");
        assert_eq!(session.editing(), None);

        session.edit_exam(id).expect("edit");
        // The exam's own staff stay available while editing it.
        assert_eq!(session.available(Role::Examiner, 0).len(), 2);
        session.resize_draft(Role::Proctor, 2).expect("resize");
        session
            .assign_seat(Role::Proctor, 1, Some(TeacherId(3)))
            .expect("assign");
        assert_eq!(session.commit_draft().expect("commit"), id);

        assert_eq!(session.roster().exam_count(), 1);
        assert_eq!(
            session.roster().exam(id).expect("exam").proctors,
            vec![Some(TeacherId(2)), Some(TeacherId(3))]
        );
    }

    #[test]
    fn failed_commit_keeps_buffer() {
        let mut session = session();
        stage(&mut session, "09:00", 1, 2);
        session.commit_draft().expect("commit");

        stage(&mut session, "09:00", 1, 3);
        let before = session.buffer().clone();
        assert!(session.commit_draft().is_err());
        assert_eq!(session.buffer(), &before);
    }

    #[test]
    fn deleting_edited_exam_clears_buffer() {
        let mut session = session();
        stage(&mut session, "09:00", 1, 2);
        let id = session.commit_draft().expect("commit");
        session.edit_exam(id).expect("edit");

        session.delete_exam(id).expect("delete");
        assert_eq!(session.editing(), None);
        assert_eq!(session.draft(), &ExamDraft::default());
    }

    #[test]
    fn merge_away_edited_exam_clears_buffer() {
        let mut session = session();
        stage(&mut session, "09:00", 1, 2);
        let source = session.commit_draft().expect("commit");
        stage(&mut session, "10:00", 3, 2);
        let target = session.commit_draft().expect("commit");

        session.edit_exam(source).expect("edit");
        session.select_for_merge(source).expect("select");
        let step = session.select_for_merge(target).expect("merge");
        assert!(matches!(step, MergeStep::Merged { .. }));
        assert_eq!(session.editing(), None);
        assert_eq!(session.roster().exam_count(), 1);
    }

    #[test]
    fn delete_teacher_clears_draft_seats() {
        let mut session = session();
        stage(&mut session, "09:00", 1, 2);
        session.delete_teacher(TeacherId(1)).expect("delete");
        assert_eq!(session.draft().examiners, vec![None]);
    }

    #[test]
    fn assign_unknown_teacher_rejected() {
        let mut session = session();
        assert!(matches!(
            session.assign_seat(Role::Examiner, 0, Some(TeacherId(99))),
            Err(InvigilError::TeacherNotFound(_))
        ));
    }

    #[test]
    fn failed_import_leaves_state() {
        let mut session = session();
        let before = session.snapshot();
        let revision = session.revision();
        assert!(session.import_json(r#"{"exams": [], "teachers": []}"#).is_err());
        assert_eq!(session.snapshot(), before);
        assert_eq!(session.revision(), revision);
    }

    #[test]
    fn export_import_replaces_dataset() {
        let mut source = session();
        stage(&mut source, "09:00", 1, 2);
        source.commit_draft().expect("commit");
        let text = source.export_json().expect("export");

        let mut target = Session::new();
        target.import_json(&text).expect("import");
        assert_eq!(target.snapshot(), source.snapshot());
    }

    #[test]
    fn reset_keeps_settings() {
        let mut session = session();
        session.update_settings(SettingsPatch {
            school_name: Some("Test Lisesi".to_string()),
            ..SettingsPatch::default()
        });
        session.reset();
        assert_eq!(session.roster().teacher_count(), 0);
        assert_eq!(session.roster().settings().school_name, "Test Lisesi");
    }

    #[test]
    fn revision_tracks_mutations() {
        let mut session = session();
        let start = session.revision();
        let date = Slot::parse("2025-02-10", "09:00").expect("slot").date;
        assert!(session.add_allowed_date(date));
        assert!(!session.add_allowed_date(date));
        assert_eq!(session.revision(), start + 1);
    }
}
