//! Package build pipeline.
//!
//! Turns a project (its `manifest.json` plus the scope directory) into a
//! single archive that the runtime loads.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Staging**: copy the manifest and scope into a scratch directory
//! - **Conversion**: compile legacy `.xml` levels and sprite-sheets to `.json`
//! - **Packaging**: rewrite the staged manifest and zip the staging directory
//!
//! # Example
//!
//! ```no_run
//! use clockwork::build::{BuildContext, BuildPipeline};
//!
//! let context = BuildContext::new("my-game").with_jobs(4);
//! let result = BuildPipeline::new(context).build_project()?;
//! println!("{}", result.summary());
//! # Ok::<(), clockwork::build::BuildError>(())
//! ```

pub mod archive;
pub mod context;
pub mod convert;
pub mod pipeline;
pub mod result;
pub mod stage;

pub use archive::ArchiveError;
pub use context::*;
pub use pipeline::*;
pub use result::*;
pub use stage::StageError;
