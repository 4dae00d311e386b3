//! Configuration for a provisioning run.
//!
//! Everything the provisioner needs is gathered here once, at startup:
//! the fixed profile settings (overridable from the command line) and a
//! snapshot of the environment variables that influence the generated files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{ProvisionError, Result};

pub const SUBMIT_ARGS_VAR: &str = "PYSPARK_SUBMIT_ARGS";
pub const SPARK_HOME_VAR: &str = "SPARK_HOME";
pub const PYTHON_VAR: &str = "PYSPARK_PYTHON";
pub const DRIVER_PYTHON_VAR: &str = "PYSPARK_DRIVER_PYTHON";
pub const DRIVER_PYTHON_OPTS_VAR: &str = "PYSPARK_DRIVER_PYTHON_OPTS";

/// Fixed settings of the profile and kernel being provisioned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileSettings {
    pub profile_name: String,
    pub kernel_name: String,
    pub display_name: String,
    pub language: String,
    pub ip: String, // Warning: anything other than localhost exposes the notebook
    pub port: u16,
    pub master: String,
    pub driver_memory: String,
    pub ipython: String, // Executable used for `locate` and `profile create`
    pub py4j_archive: String, // Relative to SPARK_HOME
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            profile_name: "pyspark".to_string(),
            kernel_name: "pyspark".to_string(),
            display_name: "PySpark".to_string(),
            language: "python".to_string(),
            ip: "localhost".to_string(),
            port: 8081,
            master: "local[*]".to_string(),
            driver_memory: "4g".to_string(),
            ipython: "ipython".to_string(),
            py4j_archive: "python/lib/py4j-0.8.2.1-src.zip".to_string(),
        }
    }
}

/// The environment variables read by the provisioner, captured once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    pub submit_args: Option<String>,
    pub spark_home: Option<PathBuf>,
    pub python: Option<PathBuf>,
}

impl EnvSnapshot {
    /// Capture from the current process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Capture through an arbitrary lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            submit_args: get(SUBMIT_ARGS_VAR),
            spark_home: get(SPARK_HOME_VAR).map(PathBuf::from),
            python: get(PYTHON_VAR).map(PathBuf::from),
        }
    }
}

/// Fully resolved configuration passed to the provisioner.
#[derive(Clone, Debug)]
pub struct ProvisionConfig {
    pub settings: ProfileSettings,
    pub env: EnvSnapshot,
    pub python: Option<PathBuf>,
}

impl ProvisionConfig {
    /// Resolve the configuration. `default_interpreter` is only consulted
    /// when `PYSPARK_PYTHON` is unset. A missing interpreter is reported by
    /// [`ProvisionConfig::interpreter`], so actions that never launch Python
    /// still work without one.
    pub fn resolve<F>(settings: ProfileSettings, env: EnvSnapshot, default_interpreter: F) -> Self
    where
        F: FnOnce() -> Option<PathBuf>,
    {
        let python = env.python.clone().or_else(default_interpreter);

        Self {
            settings,
            env,
            python,
        }
    }

    pub fn interpreter(&self) -> Result<&Path> {
        self.python
            .as_deref()
            .ok_or(ProvisionError::MissingInterpreter)
    }

    /// Options handed to the IPython driver so `pyspark` opens a notebook.
    pub fn driver_python_opts(&self) -> String {
        format!("notebook --profile={}", self.settings.profile_name)
    }

    /// Driver environment for child processes. The provisioner never
    /// mutates its own environment.
    pub fn driver_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        if let Some(python) = &self.python {
            env.insert(PYTHON_VAR.to_string(), python.to_string_lossy().to_string());
        }
        env.insert(DRIVER_PYTHON_VAR.to_string(), self.settings.ipython.clone());
        env.insert(DRIVER_PYTHON_OPTS_VAR.to_string(), self.driver_python_opts());
        env
    }

    /// Location of the Spark release file, if SPARK_HOME is known.
    pub fn release_file(&self) -> Option<PathBuf> {
        self.env.spark_home.as_ref().map(|home| home.join("RELEASE"))
    }
}
