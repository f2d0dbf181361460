//! Build orchestration
//!
//! One build cycle: pick the toolchain, load the previous build state, scan
//! sources and class files, plan what is stale, compile the stale set in a
//! single compiler invocation, turn its output into diagnostics and write
//! the updated state back to `outputs/build.json`.

use crate::diagnostics::{DiagnosticIssue, DiagnosticParser};
use crate::error::{BuildError, BuildResult};
use crate::incremental::{IncrementalPlan, RecompileReason, StalenessPlanner};
use crate::path::RelativePath;
use crate::process::{ProcessInvocation, ProcessOutput, ProcessRunner, SystemProcessRunner};
use crate::references::ReferenceScanner;
use crate::snapshot::{scan_timestamps, Timestamps};
use crate::state::{BuildState, SourceFileRecord, BUILD_STATE_FILE_NAME};

use kiln_package::manifest::DESCRIPTOR_FILE_NAME;
use kiln_package::{
    DependencyClosure, DependencyIssue, DependencyResolver, PackageStore, ProjectDescriptor,
    Toolchain, ToolchainLocator, VersionNumber,
};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const SOURCE_EXTENSION: &str = "java";
const CLASS_EXTENSION: &str = "class";

#[cfg(windows)]
const CLASSPATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const CLASSPATH_SEPARATOR: &str = ":";

/// Build configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Folder containing `project.json`
    pub project_root: PathBuf,
    /// Package store root
    pub store_root: PathBuf,
    /// Toolchain version to use instead of the descriptor's or the latest one
    pub toolchain_version: Option<VersionNumber>,
    /// Source folder, relative to the project root
    pub source_folder: String,
    /// Class output folder, relative to the project root
    pub output_folder: String,
}

impl BuildConfig {
    pub fn new(project_root: impl Into<PathBuf>, store_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            store_root: store_root.into(),
            toolchain_version: None,
            source_folder: "sources".to_string(),
            output_folder: "outputs".to_string(),
        }
    }

    /// Load settings with `loader` for the project containing `start_dir`
    pub fn load(loader: &kiln_config::ConfigLoader, start_dir: &Path) -> BuildResult<Self> {
        let config = loader.load_from_directory(start_dir)?;
        Self::from_config(&config)
    }

    /// Build configuration from loaded settings. A project root is required.
    pub fn from_config(config: &kiln_config::Config) -> BuildResult<Self> {
        let project_root = config.project_root.clone().ok_or_else(|| {
            BuildError::invalid_argument(format!("no {} found for this build", DESCRIPTOR_FILE_NAME))
        })?;

        let toolchain_version = config
            .toolchain
            .as_deref()
            .map(VersionNumber::parse)
            .transpose()?;

        Ok(Self {
            toolchain_version,
            ..Self::new(project_root, config.store_root.clone())
        })
    }

    pub fn with_toolchain_version(mut self, version: VersionNumber) -> Self {
        self.toolchain_version = Some(version);
        self
    }

    pub fn with_source_folder(mut self, folder: impl Into<String>) -> Self {
        self.source_folder = folder.into();
        self
    }

    pub fn with_output_folder(mut self, folder: impl Into<String>) -> Self {
        self.output_folder = folder.into();
        self
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.project_root.join(DESCRIPTOR_FILE_NAME)
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.project_root.join(&self.source_folder)
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.project_root.join(&self.output_folder)
    }

    pub fn state_path(&self) -> PathBuf {
        self.outputs_dir().join(BUILD_STATE_FILE_NAME)
    }
}

/// Outcome of one build cycle
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Toolchain version used
    pub toolchain: VersionNumber,
    /// Stale sources and why each was stale
    pub stale: BTreeMap<RelativePath, RecompileReason>,
    /// Stale sources that compiled successfully
    pub compiled: Vec<RelativePath>,
    /// Stale sources that did not compile
    pub failed: Vec<RelativePath>,
    /// Sources that did not need compiling
    pub up_to_date: Vec<RelativePath>,
    /// Sources that were recorded but no longer exist
    pub removed: Vec<RelativePath>,
    /// Class files deleted because their source was removed
    pub deleted_artifacts: Vec<RelativePath>,
    /// Diagnostics reported by the compiler
    pub issues: Vec<DiagnosticIssue>,
    /// Compiler exit code; `None` when the compiler was not run
    pub exit_code: Option<i32>,
    /// Dependencies that could not be fully resolved
    pub dependency_issues: Vec<DependencyIssue>,
    pub total_time: Duration,
}

impl BuildReport {
    fn new(toolchain: VersionNumber) -> Self {
        Self {
            toolchain,
            stale: BTreeMap::new(),
            compiled: Vec::new(),
            failed: Vec::new(),
            up_to_date: Vec::new(),
            removed: Vec::new(),
            deleted_artifacts: Vec::new(),
            issues: Vec::new(),
            exit_code: None,
            dependency_issues: Vec::new(),
            total_time: Duration::ZERO,
        }
    }

    /// Whether every stale source compiled and the compiler exited cleanly
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.exit_code.map_or(true, |code| code == 0)
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|issue| issue.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|issue| issue.is_warning())
    }
}

/// Main builder for orchestrating builds
pub struct Builder<R = SystemProcessRunner> {
    config: BuildConfig,
    descriptor: ProjectDescriptor,
    store: PackageStore,
    runner: R,
}

impl Builder<SystemProcessRunner> {
    /// Create a builder for the project described by `config`.
    ///
    /// Fails when the project's `project.json` is missing or unreadable.
    pub fn new(config: BuildConfig) -> BuildResult<Self> {
        let descriptor = ProjectDescriptor::load(&config.descriptor_path())?;
        let store = PackageStore::new(&config.store_root);
        Ok(Self {
            config,
            descriptor,
            store,
            runner: SystemProcessRunner::new(),
        })
    }
}

impl<R: ProcessRunner> Builder<R> {
    /// Run the toolchain through a different process runner
    pub fn with_runner<T: ProcessRunner>(self, runner: T) -> Builder<T> {
        Builder {
            config: self.config,
            descriptor: self.descriptor,
            store: self.store,
            runner,
        }
    }

    /// Pin the toolchain version
    pub fn with_toolchain_version(mut self, version: VersionNumber) -> Self {
        self.config.toolchain_version = Some(version);
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn descriptor(&self) -> &ProjectDescriptor {
        &self.descriptor
    }

    /// Run one incremental build cycle.
    ///
    /// A missing toolchain or a compiler that cannot be launched fails the
    /// build before anything on disk changes. Compiler errors do not: they
    /// are reported in the [`BuildReport`] and the affected sources stay
    /// stale for the next build.
    pub fn build(&self) -> BuildResult<BuildReport> {
        let start = Instant::now();

        let toolchain = self.locate_toolchain()?;
        info!(version = %toolchain.version(), root = %toolchain.root().display(), "using toolchain");

        let state_path = self.config.state_path();
        let mut state = load_state(&state_path)?;

        let sources_dir = self.config.sources_dir();
        if !sources_dir.is_dir() {
            return Err(BuildError::SourceFolderNotFound(sources_dir));
        }
        let outputs_dir = self.config.outputs_dir();
        let sources = scan_timestamps(&sources_dir, SOURCE_EXTENSION)?;
        let artifacts = scan_timestamps(&outputs_dir, CLASS_EXTENSION)?;

        let closure = DependencyResolver::new(&self.store).resolve_closure(&self.descriptor);
        for issue in &closure.issues {
            warn!(dependency = %issue.coordinate, "{}", issue.message);
        }

        let plan = StalenessPlanner::new(&state)
            .with_toolchain(toolchain.version())
            .with_dependencies(&closure.coordinates)
            .plan(&sources, &artifacts);
        info!(
            sources = sources.len(),
            stale = plan.recompile.len(),
            removed = plan.removed_sources.len(),
            "planned build"
        );

        let mut report = BuildReport::new(toolchain.version().clone());
        report.stale = plan.recompile.clone();
        report.up_to_date = sources
            .keys()
            .filter(|path| !plan.needs_recompile(path.as_str()))
            .cloned()
            .collect();
        report.dependency_issues = closure.issues.clone();

        let output = if plan.recompile.is_empty() {
            None
        } else {
            let invocation = self.compile_invocation(&toolchain, &plan, &closure)?;
            let output = self.runner.run(&invocation)?;
            info!(exit_code = output.exit_code, "compiler finished");
            Some(output)
        };

        if let Some(output) = &output {
            report.exit_code = Some(output.exit_code);
            report.issues = self.parse_issues(output);
        }

        report.deleted_artifacts = self.delete_removed_artifacts(&plan, &outputs_dir)?;
        for removed in &plan.removed_sources {
            state.remove_source_file(removed.as_str());
        }
        report.removed = plan.removed_sources.clone();

        if let Some(output) = &output {
            self.record_results(&mut state, &mut report, &plan, &sources, &artifacts, output)?;
        }

        state.set_javac_version(Some(toolchain.version().clone()));
        state.set_project(Some(resolved_descriptor(&self.descriptor, &closure)));
        state.save(&state_path)?;
        debug!(path = %state_path.display(), records = state.len(), "saved build state");

        report.total_time = start.elapsed();
        info!(
            compiled = report.compiled.len(),
            failed = report.failed.len(),
            up_to_date = report.up_to_date.len(),
            elapsed_ms = report.total_time.as_millis() as u64,
            "build finished"
        );
        Ok(report)
    }

    /// Remove the output folder, build state included
    pub fn clean(&self) -> BuildResult<()> {
        let outputs_dir = self.config.outputs_dir();
        match fs::remove_dir_all(&outputs_dir) {
            Ok(()) => {
                info!(path = %outputs_dir.display(), "removed outputs");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BuildError::io(outputs_dir, e)),
        }
    }

    fn locate_toolchain(&self) -> BuildResult<Toolchain> {
        let requested = self
            .config
            .toolchain_version
            .clone()
            .or_else(|| self.descriptor.toolchain_requirement());
        Ok(ToolchainLocator::new(&self.store).locate(requested.as_ref())?)
    }

    fn compile_invocation(
        &self,
        toolchain: &Toolchain,
        plan: &IncrementalPlan,
        closure: &DependencyClosure,
    ) -> BuildResult<ProcessInvocation> {
        let mut classpath = vec![self.config.output_folder.clone()];
        for coordinate in &closure.coordinates {
            let library = self.store.library_path(coordinate)?;
            classpath.push(library.display().to_string());
        }

        let files = plan
            .files()
            .map(|path| format!("{}/{}", self.config.source_folder, path));

        Ok(ProcessInvocation::new(toolchain.compiler())
            .with_working_dir(&self.config.project_root)
            .arg("-d")
            .arg(self.config.output_folder.as_str())
            .arg("-cp")
            .arg(classpath.join(CLASSPATH_SEPARATOR))
            .args(files))
    }

    fn parse_issues(&self, output: &ProcessOutput) -> Vec<DiagnosticIssue> {
        let root = &self.config.project_root;
        DiagnosticParser::new(output.stderr.lines())
            .with_base_folder(root)
            .chain(DiagnosticParser::new(output.stdout.lines()).with_base_folder(root))
            .collect()
    }

    /// Source file an issue points at, relative to the source folder
    fn issue_source(&self, issue: &DiagnosticIssue) -> Option<RelativePath> {
        let path = RelativePath::new(issue.path.as_deref()?).ok()?;
        path.strip_folder(&self.config.source_folder)
    }

    fn delete_removed_artifacts(
        &self,
        plan: &IncrementalPlan,
        outputs_dir: &Path,
    ) -> BuildResult<Vec<RelativePath>> {
        let mut deleted = Vec::new();
        for artifact in &plan.artifacts_to_delete {
            // A recompiled source may have produced a class of the same name
            if plan.files().any(|source| owns_class_file(source, artifact)) {
                continue;
            }
            let path = outputs_dir.join(artifact.to_path());
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(artifact = %artifact, "deleted class file");
                    deleted.push(artifact.clone());
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(BuildError::io(path, e)),
            }
        }
        Ok(deleted)
    }

    fn record_results(
        &self,
        state: &mut BuildState,
        report: &mut BuildReport,
        plan: &IncrementalPlan,
        sources: &Timestamps,
        previous_artifacts: &Timestamps,
        output: &ProcessOutput,
    ) -> BuildResult<()> {
        let produced = scan_timestamps(&self.config.outputs_dir(), CLASS_EXTENSION)?;
        let scanner = ReferenceScanner::new(sources.keys());

        let with_errors: HashSet<RelativePath> = report
            .issues
            .iter()
            .filter(|issue| issue.is_error())
            .filter_map(|issue| self.issue_source(issue))
            .collect();
        let exit_failed = output.exit_code != 0;

        for path in plan.files() {
            let Some(modified) = sources.get(path.as_str()) else {
                continue;
            };

            let primary = path.with_extension(CLASS_EXTENSION);
            let rewritten = match (produced.get(primary.as_str()), previous_artifacts.get(primary.as_str())) {
                (Some(now), Some(before)) => now != before,
                (Some(_), None) => true,
                (None, _) => false,
            };
            let failed = with_errors.contains(path)
                || (exit_failed && (with_errors.is_empty() || !rewritten));

            let source_path = self.config.sources_dir().join(path.to_path());
            let content = fs::read(&source_path).map_err(|e| BuildError::io(&source_path, e))?;
            let dependencies = scanner.scan(path, &String::from_utf8_lossy(&content));

            let extra = state
                .source_file(path.as_str())
                .map(|record| record.extra.clone())
                .unwrap_or_default();

            // Class files left over from an earlier build stay recorded after a
            // failure so they are deleted with the source.
            let class_files = produced
                .iter()
                .filter(|(class_file, _)| owns_class_file(path, class_file))
                .map(|(class_file, time)| (class_file.clone(), *time))
                .collect();

            let last_modified = if failed {
                warn!(file = %path, "compilation failed");
                report.failed.push(path.clone());
                None
            } else {
                debug!(file = %path, "compiled");
                report.compiled.push(path.clone());
                Some(*modified)
            };
            let record = SourceFileRecord {
                last_modified,
                dependencies,
                class_files,
                extra,
            };
            state.set_source_file(path.clone(), record);
        }

        Ok(())
    }
}

/// The project descriptor with its dependencies replaced by the resolved closure
fn resolved_descriptor(descriptor: &ProjectDescriptor, closure: &DependencyClosure) -> ProjectDescriptor {
    let mut resolved = descriptor.clone();
    resolved.dependencies = closure.coordinates.clone();
    resolved
}

/// Load the previous build state, starting over when it is absent or corrupt
fn load_state(path: &Path) -> BuildResult<BuildState> {
    match BuildState::load(path) {
        Ok(state) => {
            debug!(path = %path.display(), records = state.len(), "loaded build state");
            Ok(state)
        }
        Err(BuildError::StateNotFound(_)) => {
            info!(path = %path.display(), "no previous build state");
            Ok(BuildState::new())
        }
        Err(BuildError::InvalidStateFile { path, error }) => {
            warn!(path = %path.display(), %error, "discarding unreadable build state");
            Ok(BuildState::new())
        }
        Err(e) => Err(e),
    }
}

/// Whether `class_file` was produced from `source`: `a/Foo.java` owns
/// `a/Foo.class` and the nested `a/Foo$*.class` files
fn owns_class_file(source: &RelativePath, class_file: &RelativePath) -> bool {
    if source.parent() != class_file.parent() || class_file.extension() != Some(CLASS_EXTENSION) {
        return false;
    }
    let stem = source.file_stem();
    let class_stem = class_file.file_stem();
    class_stem == stem
        || class_stem
            .strip_prefix(stem)
            .is_some_and(|rest| rest.starts_with('$'))
}
