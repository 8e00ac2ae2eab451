//! Idempotent batch conversion of a texture tree.
//!
//! The planner walks a root directory, classifies every file by name and
//! decides which conversions are still needed. Every target path is checked
//! before anything is written, and outputs are published without clobbering,
//! so a run over a fully processed tree does nothing.

use std::path::{Path, PathBuf};
use std::time::Instant;

use normalforge_core::{generate_normal_map, CodedError, DEFAULT_STRENGTH};
use serde::Serialize;
use thiserror::Error;
use walkdir::WalkDir;

use crate::classify::{classify_path, normal_map_path, reduced_path, FileClass};
use crate::publish::{self, PublishError};
use crate::reducer::{BitDepthReducer, ReduceError};

/// Errors that stop a batch before any work happens.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Root directory does not exist: {}", .path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Which chain of conversions a raw heightmap goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    /// `rock.png` -> `rock_8bit.png` -> `rock_8bit_normal_map.png`.
    #[default]
    Reduce,
    /// `rock.png` -> `rock_normal_map.png`, no external tool.
    Direct,
}

impl Pipeline {
    /// Returns the string identifier for this pipeline.
    pub fn as_str(&self) -> &'static str {
        match self {
            Pipeline::Reduce => "reduce",
            Pipeline::Direct => "direct",
        }
    }
}

/// Configuration for a batch run.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Bump strength passed to the kernel.
    pub strength: f64,
    /// Conversion chain for raw heightmaps.
    pub pipeline: Pipeline,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            strength: DEFAULT_STRENGTH,
            pipeline: Pipeline::Reduce,
        }
    }
}

impl PlannerConfig {
    /// Sets the bump strength.
    pub fn strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    /// Sets the pipeline.
    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }
}

/// Why a step was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The file is itself a normal map.
    IsNormalMap,
    /// The reduced variant already exists.
    ReducedExists,
    /// The normal map already exists.
    NormalMapExists,
}

impl SkipReason {
    /// Short human-readable description.
    pub fn describe(&self) -> &'static str {
        match self {
            SkipReason::IsNormalMap => "already a normal map",
            SkipReason::ReducedExists => "8-bit variant already exists",
            SkipReason::NormalMapExists => "normal map already exists",
        }
    }
}

/// One thing that happened during a batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FileEvent {
    Skipped {
        path: String,
        reason: SkipReason,
    },
    Reduced {
        source: String,
        target: String,
    },
    ReductionFailed {
        source: String,
        code: &'static str,
        error: String,
    },
    Generated {
        source: String,
        target: String,
        width: u32,
        height: u32,
        hash: String,
    },
    GenerationFailed {
        source: String,
        code: &'static str,
        error: String,
    },
    WalkFailed {
        path: Option<String>,
        error: String,
    },
}

impl FileEvent {
    /// Whether this event records a failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            FileEvent::ReductionFailed { .. }
                | FileEvent::GenerationFailed { .. }
                | FileEvent::WalkFailed { .. }
        )
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Root directory that was walked.
    pub root: String,
    /// Pipeline used for raw heightmaps.
    pub pipeline: Pipeline,
    /// Bump strength.
    pub strength: f64,
    /// Regular files found under the root.
    pub files_seen: usize,
    /// Files ignored because they are not PNGs.
    pub ignored: usize,
    /// Steps skipped because their target already existed.
    pub skipped: usize,
    /// External tool invocations.
    pub reductions_attempted: usize,
    /// Reduced variants published.
    pub reductions_succeeded: usize,
    /// Reductions that failed.
    pub reductions_failed: usize,
    /// Kernel invocations.
    pub kernel_invocations: usize,
    /// Normal maps published.
    pub generated: usize,
    /// Normal map generations that failed.
    pub generation_failed: usize,
    /// Total runtime in seconds.
    pub runtime_seconds: f64,
    /// Everything that happened, in order.
    pub events: Vec<FileEvent>,
}

impl BatchReport {
    fn new(root: &Path, config: &PlannerConfig) -> Self {
        Self {
            root: root.to_string_lossy().to_string(),
            pipeline: config.pipeline,
            strength: config.strength,
            files_seen: 0,
            ignored: 0,
            skipped: 0,
            reductions_attempted: 0,
            reductions_succeeded: 0,
            reductions_failed: 0,
            kernel_invocations: 0,
            generated: 0,
            generation_failed: 0,
            runtime_seconds: 0.0,
            events: Vec::new(),
        }
    }

    /// Number of failure events.
    pub fn failures(&self) -> usize {
        self.events.iter().filter(|e| e.is_failure()).count()
    }

    /// Whether the run changed nothing on disk.
    pub fn is_noop(&self) -> bool {
        self.reductions_attempted == 0 && self.kernel_invocations == 0
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Walks a tree and performs the conversions it still needs.
pub struct BatchPlanner<R> {
    reducer: R,
    config: PlannerConfig,
}

struct Run<'a> {
    report: BatchReport,
    observer: &'a mut dyn FnMut(&FileEvent),
}

impl Run<'_> {
    fn emit(&mut self, event: FileEvent) {
        (self.observer)(&event);
        self.report.events.push(event);
    }

    fn skip(&mut self, path: &Path, reason: SkipReason) {
        self.report.skipped += 1;
        self.emit(FileEvent::Skipped {
            path: display(path),
            reason,
        });
    }
}

impl<R: BitDepthReducer> BatchPlanner<R> {
    /// Creates a planner with the given reducer and configuration.
    pub fn new(reducer: R, config: PlannerConfig) -> Self {
        Self { reducer, config }
    }

    /// The reducer this planner invokes.
    pub fn reducer(&self) -> &R {
        &self.reducer
    }

    /// Run over `root` without observing events live.
    pub fn run(&self, root: &Path) -> Result<BatchReport, PlanError> {
        self.run_with_observer(root, &mut |_| {})
    }

    /// Run over `root`, passing each event to `observer` as it happens.
    ///
    /// Only a missing root or an unusable strength is an error; per-file
    /// failures are recorded in the report and the walk continues.
    pub fn run_with_observer(
        &self,
        root: &Path,
        observer: &mut dyn FnMut(&FileEvent),
    ) -> Result<BatchReport, PlanError> {
        let start = Instant::now();

        normalforge_core::validate_strength(self.config.strength)
            .map_err(|e| PlanError::InvalidParameter(e.to_string()))?;

        if !root.is_dir() {
            return Err(PlanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut run = Run {
            report: BatchReport::new(root, &self.config),
            observer,
        };

        // Collect first so files produced during the run are not revisited.
        // Symlinks are followed; broken links and loops become walk failures.
        let mut files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).follow_links(true) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().map(display);
                    run.emit(FileEvent::WalkFailed {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        // Sort for deterministic order
        files.sort();
        run.report.files_seen = files.len();

        for path in &files {
            self.process_file(&mut run, path);
        }

        run.report.runtime_seconds = start.elapsed().as_secs_f64();
        Ok(run.report)
    }

    fn process_file(&self, run: &mut Run<'_>, path: &Path) {
        match classify_path(path) {
            FileClass::Ignored => run.report.ignored += 1,
            FileClass::NormalMap => run.skip(path, SkipReason::IsNormalMap),
            FileClass::Reduced => self.generate_step(run, path),
            FileClass::Raw => match self.config.pipeline {
                Pipeline::Direct => self.generate_step(run, path),
                Pipeline::Reduce => {
                    let reduced = reduced_path(path);
                    if self.reduce_step(run, path, &reduced) {
                        self.generate_step(run, &reduced);
                    }
                }
            },
        }
    }

    /// Returns whether `target` is available as kernel input afterwards.
    fn reduce_step(&self, run: &mut Run<'_>, source: &Path, target: &Path) -> bool {
        if target.exists() {
            run.skip(target, SkipReason::ReducedExists);
            return true;
        }

        run.report.reductions_attempted += 1;
        match self.reduce_atomically(source, target) {
            Ok(()) => {
                run.report.reductions_succeeded += 1;
                run.emit(FileEvent::Reduced {
                    source: display(source),
                    target: display(target),
                });
                true
            }
            Err(PublishOutcome::Raced) => {
                // Another writer published the same target meanwhile.
                run.skip(target, SkipReason::ReducedExists);
                true
            }
            Err(PublishOutcome::Failed(e)) => {
                run.report.reductions_failed += 1;
                run.emit(FileEvent::ReductionFailed {
                    source: display(source),
                    code: e.code(),
                    error: e.to_string(),
                });
                false
            }
        }
    }

    fn reduce_atomically(&self, source: &Path, target: &Path) -> Result<(), PublishOutcome> {
        let staged = publish::staging_path(target).map_err(publish_failure)?;
        self.reducer
            .reduce(source, &staged)
            .map_err(PublishOutcome::Failed)?;

        let produced = std::fs::metadata(&staged)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !produced {
            return Err(PublishOutcome::Failed(ReduceError::OutputMissing {
                path: target.to_path_buf(),
            }));
        }

        publish::publish_staged(staged, target, false).map_err(publish_failure)
    }

    fn generate_step(&self, run: &mut Run<'_>, source: &Path) {
        let target = normal_map_path(source);
        if target.exists() {
            run.skip(&target, SkipReason::NormalMapExists);
            return;
        }

        run.report.kernel_invocations += 1;
        let generated = std::fs::read(source)
            .map_err(normalforge_core::NormalMapError::from)
            .and_then(|bytes| generate_normal_map(&bytes, self.config.strength));

        let result = match generated {
            Ok(result) => result,
            Err(e) => {
                run.report.generation_failed += 1;
                run.emit(FileEvent::GenerationFailed {
                    source: display(source),
                    code: e.code(),
                    error: e.to_string(),
                });
                return;
            }
        };

        match publish::publish_bytes(&target, &result.data, false) {
            Ok(()) => {
                run.report.generated += 1;
                run.emit(FileEvent::Generated {
                    source: display(source),
                    target: display(&target),
                    width: result.width,
                    height: result.height,
                    hash: result.hash,
                });
            }
            Err(PublishError::AlreadyExists { .. }) => {
                run.skip(&target, SkipReason::NormalMapExists);
            }
            Err(PublishError::Io(e)) => {
                run.report.generation_failed += 1;
                run.emit(FileEvent::GenerationFailed {
                    source: display(source),
                    code: "PUBLISH_001",
                    error: format!("Failed to write {}: {}", target.display(), e),
                });
            }
        }
    }
}

enum PublishOutcome {
    Raced,
    Failed(ReduceError),
}

fn publish_failure(e: PublishError) -> PublishOutcome {
    match e {
        PublishError::AlreadyExists { .. } => PublishOutcome::Raced,
        PublishError::Io(e) => PublishOutcome::Failed(ReduceError::Io(e)),
    }
}
