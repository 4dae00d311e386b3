use std::path::PathBuf;

use miette::Diagnostic;

/// Errors that can occur while provisioning the notebook profile
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ProvisionError {
    #[error("No Python interpreter found")]
    #[diagnostic(help("set PYSPARK_PYTHON or put python3 on your PATH"))]
    MissingInterpreter,

    #[error("`{command}` printed nothing")]
    #[diagnostic(help("make sure IPython is installed and `ipython locate` works"))]
    EmptyLocateOutput { command: String },

    #[error("Failed to execute `{command}`")]
    #[diagnostic(help("is it installed and on your PATH?"))]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Kernel config not found at {}", path.display())]
    #[diagnostic(help("`ipython profile create` should have created it; check your IPython version"))]
    MissingKernelConfig { path: PathBuf },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize kernel spec")]
    Serialize(#[from] serde_json::Error),
}

impl ProvisionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProvisionError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
