//! # Entity Store
//!
//! The in-memory collections of teachers and exams plus global settings.
//!
//! The `Roster` is the single source of truth. Read access is public; every
//! mutating method is crate-private so that changes only happen through the
//! editor, the merge operator and the session.
//!
//! Collections keep insertion order. Ordering for presentation (branch
//! collation, slot order) is applied by the readers.

use crate::primitives::{SAMPLE_TEACHER_BRANCH, SAMPLE_TEACHER_NAME};
use crate::{Exam, ExamId, Settings, Slot, Snapshot, Teacher, TeacherId};

/// In-memory store of teachers, exams and settings.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    teachers: Vec<Teacher>,
    exams: Vec<Exam>,
    settings: Settings,
    next_teacher_id: u64,
    next_exam_id: u64,
}

impl Roster {
    /// Create an empty roster with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a roster for a brand-new dataset: default settings and one
    /// example teacher.
    #[must_use]
    pub fn seeded() -> Self {
        let mut roster = Self::new();
        roster.insert_teacher(SAMPLE_TEACHER_NAME.to_string(), SAMPLE_TEACHER_BRANCH.to_string());
        roster
    }

    /// Rebuild a roster from a snapshot. Id counters continue after the
    /// highest id present.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let next_teacher_id = snapshot
            .teachers
            .iter()
            .map(|t| t.id.0)
            .max()
            .map_or(1, |max| max.saturating_add(1));
        let next_exam_id = snapshot
            .exams
            .iter()
            .map(|e| e.id.0)
            .max()
            .map_or(1, |max| max.saturating_add(1));

        Self {
            teachers: snapshot.teachers,
            exams: snapshot.exams,
            settings: snapshot.settings,
            next_teacher_id,
            next_exam_id,
        }
    }

    /// Copy the current state into a snapshot.
    #[must_use]
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            exams: self.exams.clone(),
            teachers: self.teachers.clone(),
            settings: self.settings.clone(),
        }
    }

    // =========================================================================
    // READ ACCESS
    // =========================================================================

    /// Teachers in insertion order.
    #[must_use]
    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    /// Exams in insertion order.
    #[must_use]
    pub fn exams(&self) -> &[Exam] {
        &self.exams
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn teacher(&self, id: TeacherId) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn exam(&self, id: ExamId) -> Option<&Exam> {
        self.exams.iter().find(|e| e.id == id)
    }

    /// First teacher whose name is exactly `name`.
    #[must_use]
    pub fn teacher_by_name(&self, name: &str) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.name == name)
    }

    /// Display name of a teacher, if the teacher exists.
    #[must_use]
    pub fn name_of(&self, id: TeacherId) -> Option<&str> {
        self.teacher(id).map(|t| t.name.as_str())
    }

    /// Committed exams held at `slot`.
    pub fn exams_at(&self, slot: Slot) -> impl Iterator<Item = &Exam> + '_ {
        self.exams.iter().filter(move |e| e.slot == slot)
    }

    #[must_use]
    pub fn teacher_count(&self) -> usize {
        self.teachers.len()
    }

    #[must_use]
    pub fn exam_count(&self) -> usize {
        self.exams.len()
    }

    // =========================================================================
    // MUTATION (crate-private)
    // =========================================================================

    pub(crate) fn insert_teacher(&mut self, name: String, branch: String) -> TeacherId {
        let id = TeacherId(self.next_teacher_id.max(1));
        self.next_teacher_id = id.0.saturating_add(1);
        self.teachers.push(Teacher { id, name, branch });
        id
    }

    pub(crate) fn teacher_mut(&mut self, id: TeacherId) -> Option<&mut Teacher> {
        self.teachers.iter_mut().find(|t| t.id == id)
    }

    pub(crate) fn remove_teacher(&mut self, id: TeacherId) -> Option<Teacher> {
        let index = self.teachers.iter().position(|t| t.id == id)?;
        Some(self.teachers.remove(index))
    }

    /// Allocate the id of the next exam without inserting anything.
    pub(crate) fn allocate_exam_id(&mut self) -> ExamId {
        let id = ExamId(self.next_exam_id.max(1));
        self.next_exam_id = id.0.saturating_add(1);
        id
    }

    pub(crate) fn push_exam(&mut self, exam: Exam) {
        self.exams.push(exam);
    }

    pub(crate) fn exam_mut(&mut self, id: ExamId) -> Option<&mut Exam> {
        self.exams.iter_mut().find(|e| e.id == id)
    }

    pub(crate) fn exams_mut(&mut self) -> impl Iterator<Item = &mut Exam> + '_ {
        self.exams.iter_mut()
    }

    pub(crate) fn remove_exam(&mut self, id: ExamId) -> Option<Exam> {
        let index = self.exams.iter().position(|e| e.id == id)?;
        Some(self.exams.remove(index))
    }

    pub(crate) fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Drop all teachers and exams. Settings are kept.
    pub(crate) fn clear_records(&mut self) {
        self.teachers.clear();
        self.exams.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================
