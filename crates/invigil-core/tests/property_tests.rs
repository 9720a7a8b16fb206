//! # Property-Based Tests
//!
//! Invariants of the assignment engine under random edit sequences.

use invigil_core::{
    ExamDraft, ExamId, Role, Roster, Session, Slot, Snapshot, TeacherId, export_json, import_json,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;

const TEACHERS: u64 = 6;
const TIMES: [&str; 3] = ["09:00", "10:30", "13:00"];

#[derive(Debug, Clone)]
enum Op {
    Create {
        time: usize,
        examiners: Vec<Option<u64>>,
        proctors: Vec<Option<u64>>,
    },
    Select(u64),
    DeleteTeacher(u64),
    DeleteExam(u64),
}

fn op() -> impl Strategy<Value = Op> {
    let seats = || vec(prop::option::of(1..=TEACHERS), 0..4);
    prop_oneof![
        4 => (0..TIMES.len(), seats(), seats()).prop_map(
            |(time, examiners, proctors)| Op::Create {
                time,
                examiners,
                proctors
            }
        ),
        2 => (1u64..12).prop_map(Op::Select),
        1 => (1..=TEACHERS).prop_map(Op::DeleteTeacher),
        1 => (1u64..12).prop_map(Op::DeleteExam),
    ]
}

fn session() -> Session {
    let mut session = Session::from_snapshot(Snapshot::default());
    for i in 1..=TEACHERS {
        session
            .add_teacher(&format!("Teacher {i}"), if i % 2 == 0 { "Fizik" } else { "Biyoloji" })
            .expect("add");
    }
    session
}

fn draft(time: usize, examiners: &[Option<u64>], proctors: &[Option<u64>]) -> ExamDraft {
    let slot = Slot::parse("2025-02-10", TIMES[time]).expect("slot");
    ExamDraft {
        date: Some(slot.date),
        time: Some(slot.time),
        subject: "Exam".to_string(),
        examiners: examiners.iter().map(|s| s.map(TeacherId)).collect(),
        proctors: proctors.iter().map(|s| s.map(TeacherId)).collect(),
        ..ExamDraft::default()
    }
}

fn apply(session: &mut Session, op: &Op) {
    // Rejected operations are expected; only the invariant matters.
    match op {
        Op::Create {
            time,
            examiners,
            proctors,
        } => {
            let _ = session.create_exam(&draft(*time, examiners, proctors));
        }
        Op::Select(id) => {
            let _ = session.select_for_merge(ExamId(*id));
        }
        Op::DeleteTeacher(id) => {
            let _ = session.delete_teacher(TeacherId(*id));
        }
        Op::DeleteExam(id) => {
            let _ = session.delete_exam(ExamId(*id));
        }
    }
}

/// No two distinct exams at the same slot share a filled seat, and no exam
/// seats a teacher twice.
fn slots_disjoint(roster: &Roster) -> bool {
    let exams = roster.exams();
    exams.iter().all(|a| {
        let seats: Vec<TeacherId> = a.assigned().collect();
        let unique: BTreeSet<TeacherId> = seats.iter().copied().collect();
        seats.len() == unique.len()
            && exams
                .iter()
                .filter(|b| b.id != a.id && b.slot == a.slot)
                .all(|b| b.assigned().all(|t| !unique.contains(&t)))
    })
}

proptest! {
    /// Same-slot exams never share a filled seat, whatever the edit sequence.
    #[test]
    fn same_slot_exams_stay_disjoint(ops in vec(op(), 1..40)) {
        let mut session = session();
        for op in &ops {
            apply(&mut session, op);
            prop_assert!(slots_disjoint(session.roster()));
        }
    }

    /// Availability never offers a teacher booked at the same slot elsewhere.
    #[test]
    fn available_excludes_booked_teachers(
        ops in vec(op(), 1..30),
        time in 0..TIMES.len(),
        role_is_examiner in any::<bool>(),
    ) {
        let mut session = session();
        for op in &ops {
            apply(&mut session, op);
        }
        session.stage_draft(draft(time, &[None], &[None])).expect("stage");
        let role = if role_is_examiner { Role::Examiner } else { Role::Proctor };

        let slot = Slot::parse("2025-02-10", TIMES[time]).expect("slot");
        let booked: BTreeSet<TeacherId> = session
            .roster()
            .exams_at(slot)
            .flat_map(|e| e.assigned())
            .collect();

        for teacher in session.available(role, 0) {
            prop_assert!(!booked.contains(&teacher.id));
        }
    }

    /// Every offered teacher can actually be committed into the seat.
    #[test]
    fn available_teachers_commit_cleanly(
        ops in vec(op(), 1..30),
        time in 0..TIMES.len(),
    ) {
        let mut session = session();
        for op in &ops {
            apply(&mut session, op);
        }
        session.stage_draft(draft(time, &[None], &[None])).expect("stage");
        let offered: Vec<TeacherId> =
            session.available(Role::Proctor, 0).iter().map(|t| t.id).collect();

        for teacher in offered {
            let mut candidate = session.clone();
            candidate
                .assign_seat(Role::Proctor, 0, Some(teacher))
                .expect("assign");
            prop_assert!(candidate.commit_draft().is_ok());
        }
    }

    /// Export then import reproduces the dataset.
    #[test]
    fn export_import_preserves_roster(ops in vec(op(), 1..30)) {
        let mut session = session();
        for op in &ops {
            apply(&mut session, op);
        }
        let snapshot = session.snapshot();
        let text = export_json(&snapshot).expect("export");
        prop_assert_eq!(import_json(&text).expect("import"), snapshot);
    }
}
