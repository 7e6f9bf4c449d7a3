//! End-to-end orchestrator scenarios against a temporary project.
//!
//! A fake generator stands in for the content service; it counts calls and
//! can be told to fail or to write the artifact itself mid-call.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use scribe_codec::artifact;
use scribe_core::types::{ChangeLevel, FileOutcome, GeneratorId};
use scribe_core::{config, Config, ProjectLayout};
use scribe_detector::SignatureExtractor;
use scribe_sync::{
    hashing, ContentGenerator, DirectoryLocks, GenerateError, GeneratedArtifact,
    GenerationRequest, GitignoreOracle, Orchestrator, Services, SyncError,
};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeGenerator {
    calls: AtomicUsize,
    fail_for: Option<PathBuf>,
    /// Written over the artifact while "generating", simulating another trigger.
    race_with: Option<(PathBuf, String)>,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl FakeGenerator {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ContentGenerator for FakeGenerator {
    fn id(&self) -> GeneratorId {
        GeneratorId::from("fake")
    }

    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedArtifact, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if self.fail_for.as_deref() == Some(request.source_path.as_path()) {
            return Err(GenerateError::Transport("connection refused".to_string()));
        }
        if let Some((path, content)) = &self.race_with {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        Ok(GeneratedArtifact {
            body: format!(
                "# {}\n\nDocuments {}.\n",
                request.source_path.display(),
                request.source_path.display()
            ),
            summary: None,
        })
    }
}

struct Project {
    _dir: TempDir,
    layout: ProjectLayout,
    config: Config,
}

impl Project {
    fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = TempDir::new().expect("tempdir");
        let layout = ProjectLayout::new(dir.path());
        let config = config::init_at(&layout).expect("init");
        Self {
            _dir: dir,
            layout,
            config,
        }
    }

    fn root(&self) -> &Path {
        self.layout.root()
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn artifact_path(&self, rel: &str) -> PathBuf {
        self.layout.artifact_path(&self.config, Path::new(rel))
    }

    fn artifact(&self, rel: &str) -> String {
        fs::read_to_string(self.artifact_path(rel)).expect("artifact exists")
    }

    fn summary(&self, rel_dir: &str) -> String {
        fs::read_to_string(self.layout.summary_path(&self.config, Path::new(rel_dir)))
            .expect("summary exists")
    }

    fn orchestrator(&self, generator: Arc<FakeGenerator>) -> Orchestrator {
        let services = Services {
            generator,
            extractor: Arc::new(SignatureExtractor),
            ignore: Arc::new(GitignoreOracle::new(self.root(), &self.config.ignore).unwrap()),
        };
        Orchestrator::new(
            self.layout.clone(),
            self.config.clone(),
            services,
            Arc::new(DirectoryLocks::new()),
        )
        .expect("orchestrator")
    }
}

const A_V1: &str = "def run():\n    return 1\n";
const A_BODY_EDIT: &str = "def run():\n    return 2\n";
const A_NEW_FN: &str = "def run():\n    return 1\n\ndef stop():\n    pass\n";

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn new_file_is_generated_with_footer_and_summary() {
    let p = Project::new();
    p.write("src/a.py", A_V1);
    let generator = Arc::new(FakeGenerator::default());

    let stats = p.orchestrator(generator.clone()).update_scope(&[], |_, _| {}).unwrap();

    assert_eq!(stats.new, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(generator.calls(), 1);

    let parsed = artifact::parse(&p.artifact("src/a.py"));
    assert_eq!(parsed.body, "# src/a.py\n\nDocuments src/a.py.");
    let meta = parsed.metadata.expect("footer");
    assert_eq!(meta.source_path, Path::new("src/a.py"));
    assert_eq!(meta.source_hash, hashing::sha256_hex(A_V1));
    assert!(meta.interface_hash.is_some());
    assert_eq!(meta.design_hash, hashing::design_hash(&parsed.body));
    assert_eq!(meta.generator_id, GeneratorId::from("fake"));

    assert!(p
        .summary("src")
        .contains("- [a.py](a.py.md) — Documents src/a.py."));
}

#[test]
fn second_run_is_a_no_op() {
    let p = Project::new();
    p.write("src/a.py", A_V1);
    p.write("README.md", "# Project\n");
    let generator = Arc::new(FakeGenerator::default());
    let orchestrator = p.orchestrator(generator.clone());

    orchestrator.update_scope(&[], |_, _| {}).unwrap();
    let artifact_before = p.artifact("src/a.py");
    let summary_before = p.summary("src");

    let stats = orchestrator.update_scope(&[], |_, _| {}).unwrap();
    assert_eq!(stats.unchanged, 2);
    assert_eq!(stats.regenerated(), 0);
    assert_eq!(generator.calls(), 2, "no calls on the second run");
    assert_eq!(p.artifact("src/a.py"), artifact_before);
    assert_eq!(p.summary("src"), summary_before);
}

#[test]
fn hand_edited_artifact_keeps_its_body() {
    let p = Project::new();
    p.write("src/a.py", A_V1);
    let generator = Arc::new(FakeGenerator::default());
    let orchestrator = p.orchestrator(generator.clone());
    orchestrator.update_scope(&[], |_, _| {}).unwrap();

    let edited = p
        .artifact("src/a.py")
        .replace("Documents src/a.py.", "Hand-written notes about run().");
    fs::write(p.artifact_path("src/a.py"), &edited).unwrap();
    p.write("src/a.py", A_BODY_EDIT);

    let stats = orchestrator.update_scope(&[], |_, _| {}).unwrap();
    assert_eq!(stats.agent_updated, 1);
    assert_eq!(generator.calls(), 1, "footer refresh never calls the generator");

    let parsed = artifact::parse(&p.artifact("src/a.py"));
    assert_eq!(parsed.body, "# src/a.py\n\nHand-written notes about run().");
    let meta = parsed.metadata.unwrap();
    assert_eq!(meta.source_hash, hashing::sha256_hex(A_BODY_EDIT));
    assert_eq!(meta.design_hash, hashing::design_hash(&parsed.body));

    let again = orchestrator.update_scope(&[], |_, _| {}).unwrap();
    assert_eq!(again.unchanged, 1);
}

#[test]
fn footerless_artifact_gets_a_footer() {
    let p = Project::new();
    p.write("src/a.py", A_V1);
    p.write(".scribe/mirror/src/a.py.md", "Written by a person.\n");
    let generator = Arc::new(FakeGenerator::default());

    let outcome = p.orchestrator(generator.clone()).update_file(Path::new("src/a.py"));
    assert_eq!(outcome, FileOutcome::AgentUpdated);
    assert_eq!(generator.calls(), 0);

    let parsed = artifact::parse(&p.artifact("src/a.py"));
    assert_eq!(parsed.body, "Written by a person.");
    assert_eq!(
        parsed.metadata.unwrap().generator_id,
        GeneratorId::from("external-edit")
    );
}

#[test]
fn interface_and_content_changes_are_distinguished() {
    let p = Project::new();
    p.write("src/a.py", A_V1);
    let generator = Arc::new(FakeGenerator::default());
    let orchestrator = p.orchestrator(generator.clone());
    orchestrator.update_scope(&[], |_, _| {}).unwrap();

    p.write("src/a.py", A_BODY_EDIT);
    let stats = orchestrator.update_scope(&[], |_, _| {}).unwrap();
    assert_eq!(stats.content_only, 1);

    p.write("src/a.py", A_NEW_FN);
    let stats = orchestrator.update_scope(&[], |_, _| {}).unwrap();
    assert_eq!(stats.interface_changed, 1);
    assert_eq!(generator.calls(), 3);

    let request = generator.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.change_level, ChangeLevel::InterfaceChanged);
    assert_eq!(
        request.existing_body.as_deref(),
        Some("# src/a.py\n\nDocuments src/a.py.")
    );
    assert_eq!(
        request.interface_skeleton.as_deref(),
        Some("def run()\ndef stop()")
    );
}

#[test]
fn concurrent_artifact_write_discards_generation() {
    let p = Project::new();
    p.write("src/a.py", A_V1);
    let generator = Arc::new(FakeGenerator {
        race_with: Some((p.artifact_path("src/a.py"), "another trigger won\n".to_string())),
        ..FakeGenerator::default()
    });

    let stats = p.orchestrator(generator).update_scope(&[], |_, _| {}).unwrap();
    assert_eq!(stats.discarded_race, 1);
    assert_eq!(stats.new, 0, "counters only move on a successful write");
    assert_eq!(p.artifact("src/a.py"), "another trigger won\n");
}

#[test]
fn conflicted_source_is_skipped() {
    let p = Project::new();
    p.write(
        "src/a.py",
        "def run():\n<<<<<<< HEAD\n    return 1\n=======\n    return 2\n>>>>>>> topic\n",
    );
    let generator = Arc::new(FakeGenerator::default());

    let stats = p.orchestrator(generator.clone()).update_scope(&[], |_, _| {}).unwrap();
    assert_eq!(stats.skipped_conflict, 1);
    assert_eq!(generator.calls(), 0);
    assert!(!p.artifact_path("src/a.py").exists());
}

#[test]
fn one_failure_does_not_abort_the_batch() {
    let p = Project::new();
    p.write("src/a.py", A_V1);
    p.write("src/b.py", A_V1);
    let generator = Arc::new(FakeGenerator {
        fail_for: Some(PathBuf::from("src/a.py")),
        ..FakeGenerator::default()
    });

    let mut outcomes = Vec::new();
    let stats = p
        .orchestrator(generator)
        .update_scope(&[], |path, outcome| {
            outcomes.push((path.to_path_buf(), outcome.clone()))
        })
        .unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.new, 1);
    assert!(!p.artifact_path("src/a.py").exists());
    assert!(p.artifact_path("src/b.py").exists());
    assert!(matches!(outcomes[0], (ref path, FileOutcome::Failed(_)) if path == Path::new("src/a.py")));
    assert_eq!(
        outcomes[1],
        (PathBuf::from("src/b.py"), FileOutcome::Regenerated(ChangeLevel::NewFile))
    );
}

#[test]
fn summary_failure_keeps_the_regenerated_outcome() {
    let p = Project::new();
    p.write("src/a.py", A_V1);
    // A directory where the summary file belongs makes every summary write fail.
    let summary_path = p.layout.summary_path(&p.config, Path::new("src"));
    fs::create_dir_all(&summary_path).unwrap();
    let generator = Arc::new(FakeGenerator::default());
    let orchestrator = p.orchestrator(generator.clone());

    let mut outcomes = Vec::new();
    let stats = orchestrator
        .update_scope(&[], |_, outcome| outcomes.push(outcome.clone()))
        .unwrap();

    assert_eq!(outcomes, vec![FileOutcome::Regenerated(ChangeLevel::NewFile)]);
    assert_eq!(stats.new, 1);
    assert_eq!(stats.failed, 0);
    assert!(p.artifact_path("src/a.py").is_file());

    // Once the obstruction is gone the next run lists the artifact.
    fs::remove_dir(&summary_path).unwrap();
    let stats = orchestrator.update_scope(&[], |_, _| {}).unwrap();
    assert_eq!(stats.unchanged, 1);
    assert_eq!(generator.calls(), 1);
    assert!(p.summary("src").contains("[a.py](a.py.md)"));
}

#[test]
fn missing_scope_target_is_fatal() {
    let p = Project::new();
    let generator = Arc::new(FakeGenerator::default());
    let err = p
        .orchestrator(generator)
        .update_scope(&[PathBuf::from("does/not/exist")], |_, _| {})
        .unwrap_err();
    assert!(matches!(err, SyncError::ScopeNotFound { .. }));
}

#[test]
fn dry_run_classifies_without_writing() {
    let p = Project::new();
    p.write("src/a.py", A_V1);
    let generator = Arc::new(FakeGenerator::default());

    let stats = p
        .orchestrator(generator.clone())
        .dry_run(true)
        .update_scope(&[], |_, _| {})
        .unwrap();
    assert_eq!(stats.new, 1);
    assert_eq!(generator.calls(), 0);
    assert!(!p.artifact_path("src/a.py").exists());
}

#[test]
fn skip_reasons_are_counted() {
    let p = Project::new();
    p.write(".gitignore", "build/\n");
    p.write("build/out.py", A_V1);
    p.write("assets/logo.bin", "\0\0\0binary");
    p.write("data/huge.json", &"x".repeat(600 * 1024));
    let generator = Arc::new(FakeGenerator::default());

    let stats = p.orchestrator(generator).update_scope(&[], |_, _| {}).unwrap();
    assert_eq!(stats.skipped_ignored, 1);
    assert_eq!(stats.skipped_binary, 1);
    assert_eq!(stats.skipped_oversized, 1);
    // .gitignore itself is a regular file with no language.
    assert_eq!(stats.new, 1);
}

#[test]
fn vanished_sources_are_pruned_from_summaries() {
    let p = Project::new();
    p.write("src/a.py", A_V1);
    p.write("src/b.py", A_V1);
    let generator = Arc::new(FakeGenerator::default());
    let orchestrator = p.orchestrator(generator);
    orchestrator.update_scope(&[], |_, _| {}).unwrap();
    assert!(p.summary("src").contains("[b.py]"));

    fs::remove_file(p.root().join("src/b.py")).unwrap();
    orchestrator.update_scope(&[], |_, _| {}).unwrap();
    let summary = p.summary("src");
    assert!(summary.contains("[a.py]"));
    assert!(!summary.contains("[b.py]"));
}

#[test]
fn changed_paths_skip_vanished_files_silently() {
    let p = Project::new();
    p.write("src/a.py", A_V1);
    let generator = Arc::new(FakeGenerator::default());

    let stats = p.orchestrator(generator).update_changed(&[
        PathBuf::from("src/a.py"),
        PathBuf::from("src/deleted.py"),
    ]);
    assert_eq!(stats.new, 1);
    assert_eq!(stats.skipped(), 0);
    assert_eq!(stats.failed, 0);
}

#[test]
fn directory_update_is_shallow() {
    let p = Project::new();
    p.write("src/a.py", A_V1);
    p.write("src/nested/b.py", A_V1);
    let generator = Arc::new(FakeGenerator::default());

    let stats = p
        .orchestrator(generator)
        .update_directories(&[p.root().join("src")]);
    assert_eq!(stats.new, 1);
    assert!(p.artifact_path("src/a.py").exists());
    assert!(!p.artifact_path("src/nested/b.py").exists());
}

#[test]
fn files_outside_scope_count_as_ignored() {
    let mut p = Project::new();
    p.config.scope = PathBuf::from("src");
    p.write("src/a.py", A_V1);
    p.write("docs/guide.py", A_V1);
    let generator = Arc::new(FakeGenerator::default());

    let stats = p
        .orchestrator(generator)
        .update_scope(&[PathBuf::from("src"), PathBuf::from("docs/guide.py")], |_, _| {})
        .unwrap();
    assert_eq!(stats.new, 1);
    assert_eq!(stats.skipped_ignored, 1);
}
