//! # CLI Command Implementations

use crate::api;
use crate::config::Config;
use crate::persist;
use invigil_core::{
    ExamDraft, ExamId, InvigilError, Resolver, Role, Session, Slot, SnapshotStore, Teacher,
    TeacherId,
    primitives::{MAX_ROLE_SEATS, MAX_SNAPSHOT_SIZE},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), InvigilError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| InvigilError::Persistence(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(InvigilError::Format(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, InvigilError> {
    let canonical = path.canonicalize().map_err(|e| {
        InvigilError::Persistence(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(InvigilError::Persistence(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize the parent directory of an output path.
fn validate_output_path(path: &Path) -> Result<PathBuf, InvigilError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        InvigilError::Persistence(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(InvigilError::Persistence(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| InvigilError::Persistence("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

fn seat_label(name: Option<&String>) -> &str {
    name.map_or("-", String::as_str)
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server with debounced persistence.
pub async fn cmd_server(config: &Config) -> Result<(), InvigilError> {
    let store = config.open_store()?;
    let owner = config.storage.owner_key.as_str();

    // A dataset that cannot be loaded must not keep the server down.
    let session = match load_session(store.as_ref(), owner) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(owner, error = %e, "snapshot load failed, starting from a fresh dataset");
            Session::new()
        }
    };

    let addr: std::net::SocketAddr = config
        .bind_addr()
        .parse()
        .map_err(|_| InvigilError::InvalidValue {
            field: "server address",
            value: config.bind_addr(),
        })?;

    println!("Invigil Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", addr);
    println!("  Backend:  {}", config.storage.backend);
    println!("  Data:     {:?}", config.storage.path);
    println!("  Owner:    {}", owner);
    println!("  Quiet:    {} ms", config.persistence.quiet_period_ms);
    println!();
    println!("Endpoints:");
    println!("  GET  /health          - Health check");
    println!("  GET  /status          - Dataset summary");
    println!("  GET  /teachers        - Teachers by branch");
    println!("  GET  /exams           - Exams by date and time");
    println!("  PUT  /draft           - Stage an exam");
    println!("  POST /draft/available - Teachers free for a seat");
    println!("  POST /draft/commit    - Save the staged exam");
    println!("  POST /merge/select    - Two-step exam merge");
    println!("  GET  /stats           - Workload per teacher");
    println!("  GET  /snapshot        - Export dataset");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let writer = persist::spawn(Arc::clone(&store), owner, config.quiet_period());
    api::run_server(addr, session, Some(writer)).await
}

// =============================================================================
// REPORTING COMMANDS
// =============================================================================

/// Show dataset summary.
pub fn cmd_status(config: &Config, json_mode: bool) -> Result<(), InvigilError> {
    let session = open_session(config)?;
    let metrics = session.metrics();

    if json_mode {
        print_json(&serde_json::json!({
            "backend": config.storage.backend.to_string(),
            "data": config.storage.path.to_string_lossy(),
            "owner": config.storage.owner_key,
            "teacher_count": metrics.teacher_count,
            "exam_count": metrics.exam_count,
            "seat_count": metrics.seat_count,
            "filled_seat_count": metrics.filled_seat_count,
            "open_seat_count": metrics.open_seat_count(),
            "slot_count": metrics.slot_count,
            "student_count": metrics.student_count,
        }));
        return Ok(());
    }

    let settings = session.roster().settings();
    println!("Invigil Dataset Status");
    println!("======================");
    println!("Owner:    {}", config.storage.owner_key);
    println!("Backend:  {}", config.storage.backend);
    println!("School:   {}", settings.school_name);
    println!("Period:   {}", settings.exam_period);
    println!();
    println!("Teachers:   {}", metrics.teacher_count);
    println!("Exams:      {}", metrics.exam_count);
    println!("Slots:      {}", metrics.slot_count);
    println!(
        "Seats:      {} ({} open)",
        metrics.seat_count,
        metrics.open_seat_count()
    );
    println!("Students:   {}", metrics.student_count);

    Ok(())
}

/// Show per-teacher workload.
pub fn cmd_stats(config: &Config, json_mode: bool) -> Result<(), InvigilError> {
    let session = open_session(config)?;
    let stats = session.stats();

    if json_mode {
        print_json(&stats);
        return Ok(());
    }

    println!("{:<32} {:<16} {:>9} {:>8} {:>6}", "Teacher", "Branch", "Examiner", "Proctor", "Total");
    for load in &stats {
        println!(
            "{:<32} {:<16} {:>9} {:>8} {:>6}",
            load.teacher.name,
            load.teacher.branch,
            load.examiner_count,
            load.proctor_count,
            load.total
        );
    }
    Ok(())
}

/// Print the exam program.
pub fn cmd_program(config: &Config, json_mode: bool) -> Result<(), InvigilError> {
    let session = open_session(config)?;
    let rows = session.program();

    if json_mode {
        print_json(&rows);
        return Ok(());
    }

    let settings = session.roster().settings();
    println!("{}", settings.school_name);
    println!("{}", settings.exam_period);
    println!();
    for row in &rows {
        let examiners: Vec<&str> = row.examiners.iter().map(|n| seat_label(n.as_ref())).collect();
        let proctors: Vec<&str> = row.proctors.iter().map(|n| seat_label(n.as_ref())).collect();
        println!(
            "{}  {:<24} {:<20} {:>4}  examiners: {}  proctors: {}",
            row.slot,
            row.subject,
            row.grade.as_str(),
            row.student_count,
            examiners.join(", "),
            proctors.join(", ")
        );
    }
    Ok(())
}

/// Print one teacher's assignment notice.
pub fn cmd_notice(config: &Config, json_mode: bool, teacher: u64) -> Result<(), InvigilError> {
    let session = open_session(config)?;
    let notice = session.notice(TeacherId(teacher))?;

    if json_mode {
        print_json(&notice);
        return Ok(());
    }

    println!("{}", notice.school_name);
    println!("{}", notice.exam_period);
    println!();
    println!("{} ({})", notice.teacher.name, notice.teacher.branch);
    println!();
    for duty in &notice.duties {
        println!(
            "{}  {:<24} {:<20} {}",
            duty.slot,
            duty.subject,
            duty.grade.as_str(),
            duty.title
        );
    }
    println!();
    println!("{}", notice.principal_name);
    Ok(())
}

/// List teachers that may fill seat `slot` of `role` at the given date/time.
pub fn cmd_available(
    config: &Config,
    json_mode: bool,
    date: &str,
    time: &str,
    role: Role,
    slot: usize,
    exclude: Option<u64>,
) -> Result<(), InvigilError> {
    if slot >= MAX_ROLE_SEATS {
        return Err(InvigilError::SeatOutOfRange {
            role,
            index: slot,
            len: MAX_ROLE_SEATS,
        });
    }
    let session = open_session(config)?;
    let at = Slot::parse(date, time)?;
    let exclude = exclude.map(ExamId);

    let mut draft = match exclude {
        Some(id) => session
            .roster()
            .exam(id)
            .map(ExamDraft::from_exam)
            .ok_or(InvigilError::ExamNotFound(id))?,
        None => ExamDraft::default(),
    };
    draft.date = Some(at.date);
    draft.time = Some(at.time);
    if draft.seats(role).len() <= slot {
        draft.resize(role, slot + 1);
    }

    let teachers: Vec<Teacher> = Resolver::new(session.roster())
        .available(&draft, role, slot, exclude)
        .into_iter()
        .cloned()
        .collect();

    if json_mode {
        print_json(&teachers);
        return Ok(());
    }

    println!("Available {} for seat {} at {}:", role, slot, at);
    for teacher in &teachers {
        println!("  {:>4}  {:<32} {}", teacher.id, teacher.name, teacher.branch);
    }
    Ok(())
}

// =============================================================================
// DATASET COMMANDS
// =============================================================================

/// Export the dataset as a JSON document.
pub fn cmd_export(config: &Config, output: &Path) -> Result<(), InvigilError> {
    let validated_output = validate_output_path(output)?;
    let session = open_session(config)?;
    let text = session.export_json()?;

    std::fs::write(&validated_output, &text)
        .map_err(|e| InvigilError::Persistence(format!("Write export: {}", e)))?;

    println!("Exported {} bytes to {:?}", text.len(), validated_output);
    Ok(())
}

/// Replace the dataset from a JSON document. Nothing is saved on error.
pub fn cmd_import(config: &Config, input: &Path) -> Result<(), InvigilError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_SNAPSHOT_SIZE as u64)?;

    let text = std::fs::read_to_string(&validated_path)
        .map_err(|e| InvigilError::Persistence(format!("Read import: {}", e)))?;

    let store = config.open_store()?;
    let mut session = load_session(store.as_ref(), &config.storage.owner_key)?;
    session.import_json(&text)?;
    save_session(store.as_ref(), &config.storage.owner_key, &session)?;

    let metrics = session.metrics();
    println!(
        "Imported {} exams and {} teachers from {:?}",
        metrics.exam_count, metrics.teacher_count, validated_path
    );
    Ok(())
}

/// Create a fresh dataset.
pub fn cmd_init(config: &Config, force: bool) -> Result<(), InvigilError> {
    let store = config.open_store()?;
    let owner = &config.storage.owner_key;

    // An unreadable dataset counts as existing too.
    let exists = !matches!(store.load(owner), Ok(None));
    if exists && !force {
        return Err(InvigilError::Persistence(
            "Dataset already exists. Use --force to overwrite.".to_string(),
        ));
    }

    save_session(store.as_ref(), owner, &Session::new())?;
    println!(
        "Initialized new {} dataset '{}' at {:?}",
        config.storage.backend, owner, config.storage.path
    );
    Ok(())
}

/// Delete all exams and teachers, keeping settings.
pub fn cmd_reset(config: &Config) -> Result<(), InvigilError> {
    let store = config.open_store()?;
    let owner = &config.storage.owner_key;
    let mut session = load_session(store.as_ref(), owner)?;
    session.reset();
    save_session(store.as_ref(), owner, &session)?;
    println!("Reset dataset '{}': exams and teachers removed", owner);
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the configured store and load the session from it.
pub fn open_session(config: &Config) -> Result<Session, InvigilError> {
    let store = config.open_store()?;
    load_session(store.as_ref(), &config.storage.owner_key)
}

/// Load the stored dataset for `owner_key`, or a fresh one if none exists.
pub fn load_session(store: &dyn SnapshotStore, owner_key: &str) -> Result<Session, InvigilError> {
    match store.load(owner_key)? {
        Some(snapshot) => Ok(Session::from_snapshot(snapshot)),
        None => {
            tracing::debug!(owner = owner_key, "no stored dataset, starting fresh");
            Ok(Session::new())
        }
    }
}

/// Write the session's dataset to the store.
pub fn save_session(
    store: &dyn SnapshotStore,
    owner_key: &str,
    session: &Session,
) -> Result<(), InvigilError> {
    store.save(owner_key, &session.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;
    use invigil_core::FileSnapshotStore;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir, backend: Backend) -> Config {
        let mut config = Config::default();
        config.storage.backend = backend;
        config.storage.path = match backend {
            Backend::File => dir.path().join("data"),
            Backend::Redb => dir.path().join("invigil.redb"),
        };
        config
    }

    #[test]
    fn available_rejects_seat_beyond_limit() {
        let dir = TempDir::new().expect("tempdir");
        let config = config_in(&dir, Backend::File);
        cmd_init(&config, false).expect("init");

        for slot in [MAX_ROLE_SEATS, 1_000_000_000, usize::MAX] {
            let result =
                cmd_available(&config, true, "2025-02-10", "09:00", Role::Proctor, slot, None);
            assert!(matches!(result, Err(InvigilError::SeatOutOfRange { .. })));
        }
        let last = MAX_ROLE_SEATS - 1;
        cmd_available(&config, true, "2025-02-10", "09:00", Role::Proctor, last, None)
            .expect("last seat");
    }

    #[test]
    fn init_refuses_existing_dataset_without_force() {
        let dir = TempDir::new().expect("tempdir");
        let config = config_in(&dir, Backend::File);

        cmd_init(&config, false).expect("first init");
        assert!(cmd_init(&config, false).is_err());
        cmd_init(&config, true).expect("forced init");
    }

    #[test]
    fn export_then_import_round_trips_through_files() {
        let dir = TempDir::new().expect("tempdir");
        let config = config_in(&dir, Backend::Redb);

        let store = config.open_store().expect("store");
        let mut session = Session::new();
        session.add_teacher("Ali Kaya", "Fizik").expect("add");
        save_session(store.as_ref(), "default", &session).expect("save");
        drop(store);

        let path = dir.path().join("export.json");
        cmd_export(&config, &path).expect("export");

        cmd_reset(&config).expect("reset");
        assert_eq!(open_session(&config).expect("open").roster().teacher_count(), 0);

        cmd_import(&config, &path).expect("import");
        let restored = open_session(&config).expect("open");
        assert!(restored.roster().teacher_by_name("Ali Kaya").is_some());
    }

    #[test]
    fn rejected_import_keeps_stored_dataset() {
        let dir = TempDir::new().expect("tempdir");
        let config = config_in(&dir, Backend::File);
        cmd_init(&config, false).expect("init");

        let path = dir.path().join("broken.json");
        std::fs::write(&path, r#"{"exams": []}"#).expect("write");
        assert!(cmd_import(&config, &path).is_err());

        let store = FileSnapshotStore::open(dir.path().join("data")).expect("store");
        let snapshot = store.load("default").expect("load").expect("present");
        assert_eq!(snapshot, Session::new().snapshot());
    }

    #[test]
    fn missing_input_file_rejected() {
        assert!(validate_file_path(Path::new("/definitely/not/here.json")).is_err());
    }
}
