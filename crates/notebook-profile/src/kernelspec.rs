use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{ProfileSettings, SUBMIT_ARGS_VAR};

// Kernel specification for installation
// DOCS: https://jupyter-client.readthedocs.io/en/latest/kernels.html#kernel-specs
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KernelSpec {
    pub display_name: String, // The kernel's name as it should be displayed in the UI
    pub language: String,     // The name of the language of the kernel
    pub argv: Vec<String>,    // A list of command line arguments used to start the kernel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>, // A dictionary of environment variables to set for the kernel
}

impl KernelSpec {
    /// IPython kernel started with the PySpark profile and submit options.
    pub fn pyspark(interpreter: &Path, settings: &ProfileSettings, submit_args: &str) -> Self {
        let mut env = BTreeMap::new();
        env.insert(SUBMIT_ARGS_VAR.to_string(), submit_args.to_string());

        Self {
            display_name: settings.display_name.clone(),
            language: settings.language.clone(),
            argv: vec![
                interpreter.to_string_lossy().to_string(),
                "-m".to_string(),
                "IPython.kernel".to_string(),
                format!("--profile={}", settings.profile_name),
                "-f".to_string(),
                "{connection_file}".to_string(),
            ],
            env: Some(env),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
