//! normalforge CLI library.
//!
//! Batch conversion of heightmap trees into normal maps: filename
//! classification, the idempotent planner, the external bit-depth reducer and
//! atomic output publishing, plus the command implementations behind the
//! `normalforge` binary.

pub mod classify;
pub mod commands;
pub mod planner;
pub mod publish;
pub mod reducer;

pub use classify::{classify, classify_path, normal_map_path, reduced_path, FileClass};
pub use planner::{
    BatchPlanner, BatchReport, FileEvent, PlanError, Pipeline, PlannerConfig, SkipReason,
};
pub use reducer::{BitDepthReducer, MagickReducer, ReduceError, ReducerConfig};
