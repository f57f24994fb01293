//! mend: recover edit plans from unreliable generator output and apply them
//! to a local project with fuzzy patching, git checkpoints and a
//! build-verify repair loop.

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod generate;
pub mod memory;
pub mod patch;
pub mod pipeline;
pub mod rank;
pub mod recover;
pub mod render;
pub mod scan;
pub mod utils;
pub mod verify;

pub use domain::{Config, EditOperation, EditPlan, FailurePolicy, SearchReplace};
pub use error::{BuildFailure, CheckpointError, ParseFailure, PatchError};
