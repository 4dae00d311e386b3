//! Profile provisioning for running PySpark inside IPython/Jupyter notebooks.
//!
//! The crate builds a dedicated IPython profile (startup script, kernel and
//! notebook configs) plus a Jupyter kernel spec. All filesystem and process
//! access goes through the [`FileSystem`] and [`ProcessRunner`] ports so the
//! provisioning logic can run against an in-memory filesystem in tests.

pub mod config;
pub mod error;
pub mod fs;
pub mod kernelspec;
pub mod paths;
pub mod process;
pub mod provision;
pub mod submit;
pub mod templates;

pub use config::{EnvSnapshot, ProfileSettings, ProvisionConfig};
pub use error::ProvisionError;
pub use fs::{FileSystem, LocalFs, MemoryFs};
pub use kernelspec::KernelSpec;
pub use paths::ProfilePaths;
pub use process::{ProcessRunner, SystemRunner};
pub use provision::{Artifact, ArtifactOutcome, ArtifactReport, ProvisionReport, Provisioner};
