//! The profile provisioner.
//!
//! A run wipes the profile and kernel-spec directories, asks IPython to
//! recreate the profile, then writes the four generated files. Each write is
//! skipped when the target already carries the expected content.

use std::fmt;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::config::ProvisionConfig;
use crate::error::{ProvisionError, Result};
use crate::fs::FileSystem;
use crate::kernelspec::KernelSpec;
use crate::paths::ProfilePaths;
use crate::process::{ProcessRunner, command_line};
use crate::submit::derive_submit_args;
use crate::templates;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    StartupScript,
    KernelConfig,
    NotebookConfig,
    KernelSpec,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Artifact::StartupScript => "PySpark setup",
            Artifact::KernelConfig => "IPython kernel config",
            Artifact::NotebookConfig => "IPython Notebook config",
            Artifact::KernelSpec => "Jupyter Notebook kernel spec",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOutcome {
    Written,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReport {
    pub artifact: Artifact,
    pub path: PathBuf,
    pub outcome: ArtifactOutcome,
    pub sha256: String, // Of the content on disk after the run
}

/// Summary of an install run.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub paths: ProfilePaths,
    pub submit_args: String,
    pub artifacts: Vec<ArtifactReport>,
}

impl ProvisionReport {
    pub fn get(&self, artifact: Artifact) -> Option<&ArtifactReport> {
        self.artifacts.iter().find(|report| report.artifact == artifact)
    }
}

pub fn fingerprint(contents: &str) -> String {
    hex::encode(Sha256::digest(contents.as_bytes()))
}

pub struct Provisioner<F, R> {
    config: ProvisionConfig,
    fs: F,
    runner: R,
}

impl<F: FileSystem, R: ProcessRunner> Provisioner<F, R> {
    pub fn new(config: ProvisionConfig, fs: F, runner: R) -> Self {
        Self { config, fs, runner }
    }

    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// Ask IPython where its profiles live.
    pub fn locate(&self) -> Result<PathBuf> {
        let program = &self.config.settings.ipython;
        let output = self
            .runner
            .capture(program, &["locate"], &self.config.driver_env())?;
        let dir = output.trim();

        if dir.is_empty() {
            return Err(ProvisionError::EmptyLocateOutput {
                command: command_line(program, &["locate"]),
            });
        }
        Ok(PathBuf::from(dir))
    }

    /// Submit options for the driver, taking Spark's RELEASE file into account.
    pub fn submit_args(&self) -> Result<String> {
        let release = match self.config.release_file() {
            Some(path) if self.fs.exists(&path) => Some(self.read(&path)?),
            _ => None,
        };
        let settings = &self.config.settings;

        Ok(derive_submit_args(
            self.config.env.submit_args.as_deref(),
            &settings.master,
            &settings.driver_memory,
            release.as_deref(),
        ))
    }

    pub fn install(&self) -> Result<ProvisionReport> {
        // Fail before anything on disk is touched
        self.config.interpreter()?;
        let submit_args = self.submit_args()?;
        let paths = ProfilePaths::new(&self.locate()?, &self.config.settings);

        self.remove(&paths.profile_dir)?;
        self.remove(&paths.kernel_dir)?;

        if !self.fs.exists(&paths.profile_dir) {
            self.create_profile()?;
        }

        let artifacts = vec![
            self.write_startup_script(&paths.startup_script, &submit_args)?,
            self.patch_kernel_config(&paths.kernel_config)?,
            self.write_notebook_config(&paths.notebook_config)?,
            self.write_kernel_spec(&paths, &submit_args)?,
        ];

        Ok(ProvisionReport {
            paths,
            submit_args,
            artifacts,
        })
    }

    /// Remove the profile and kernel spec created by [`Provisioner::install`].
    pub fn uninstall(&self) -> Result<ProfilePaths> {
        let paths = ProfilePaths::new(&self.locate()?, &self.config.settings);

        for dir in [&paths.profile_dir, &paths.kernel_dir] {
            if self.fs.exists(dir) {
                println!("Removing {}", dir.display());
            }
            self.remove(dir)?;
        }
        Ok(paths)
    }

    fn create_profile(&self) -> Result<()> {
        let settings = &self.config.settings;
        println!("Creating IPython Notebook profile\n");
        self.runner.run(
            &settings.ipython,
            &["profile", "create", &settings.profile_name],
            &self.config.driver_env(),
        )?;
        println!();
        Ok(())
    }

    fn write_startup_script(&self, path: &Path, submit_args: &str) -> Result<ArtifactReport> {
        if self.fs.exists(path) {
            return self.unchanged(Artifact::StartupScript, path);
        }

        if let Some(startup_dir) = path.parent() {
            self.fs
                .create_dir_all(startup_dir)
                .map_err(|e| ProvisionError::io(startup_dir, e))?;
        }
        let script = templates::startup_script(&self.config.settings, submit_args);
        self.write(Artifact::StartupScript, path, &script)
    }

    fn patch_kernel_config(&self, path: &Path) -> Result<ArtifactReport> {
        if !self.fs.exists(path) {
            return Err(ProvisionError::MissingKernelConfig {
                path: path.to_path_buf(),
            });
        }

        let existing = self.read(path)?;
        match templates::patch_kernel_config(&existing) {
            Some(patched) => self.write(Artifact::KernelConfig, path, &patched),
            None => Ok(self.report(Artifact::KernelConfig, path, ArtifactOutcome::Unchanged, &existing)),
        }
    }

    fn write_notebook_config(&self, path: &Path) -> Result<ArtifactReport> {
        let existing = if self.fs.exists(path) {
            Some(self.read(path)?)
        } else {
            None
        };

        match existing {
            Some(text) if !templates::needs_notebook_config(Some(&text)) => {
                Ok(self.report(Artifact::NotebookConfig, path, ArtifactOutcome::Unchanged, &text))
            }
            _ => {
                let config = templates::notebook_config(&self.config.settings);
                self.write(Artifact::NotebookConfig, path, &config)
            }
        }
    }

    fn write_kernel_spec(&self, paths: &ProfilePaths, submit_args: &str) -> Result<ArtifactReport> {
        if self.fs.exists(&paths.kernel_spec) {
            return self.unchanged(Artifact::KernelSpec, &paths.kernel_spec);
        }

        self.fs
            .create_dir_all(&paths.kernel_dir)
            .map_err(|e| ProvisionError::io(&paths.kernel_dir, e))?;
        let spec = KernelSpec::pyspark(self.config.interpreter()?, &self.config.settings, submit_args);
        self.write(Artifact::KernelSpec, &paths.kernel_spec, &spec.to_json()?)
    }

    fn read(&self, path: &Path) -> Result<String> {
        self.fs
            .read_to_string(path)
            .map_err(|e| ProvisionError::io(path, e))
    }

    fn remove(&self, dir: &Path) -> Result<()> {
        self.fs
            .remove_dir_all(dir)
            .map_err(|e| ProvisionError::io(dir, e))
    }

    fn write(&self, artifact: Artifact, path: &Path, contents: &str) -> Result<ArtifactReport> {
        println!("Writing {artifact}\n");
        self.fs
            .write_private(path, contents)
            .map_err(|e| ProvisionError::io(path, e))?;
        Ok(self.report(artifact, path, ArtifactOutcome::Written, contents))
    }

    fn unchanged(&self, artifact: Artifact, path: &Path) -> Result<ArtifactReport> {
        let existing = self.read(path)?;
        Ok(self.report(artifact, path, ArtifactOutcome::Unchanged, &existing))
    }

    fn report(&self, artifact: Artifact, path: &Path, outcome: ArtifactOutcome, contents: &str) -> ArtifactReport {
        ArtifactReport {
            artifact,
            path: path.to_path_buf(),
            outcome,
            sha256: fingerprint(contents),
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;
    use crate::config::{EnvSnapshot, ProfileSettings};
    use crate::fs::{MemoryFs, PRIVATE_FILE_MODE};

    const IPYTHON_DIR: &str = "/home/ada/.ipython";
    const DEFAULT_KERNEL_CONFIG: &str = "c = get_config()\n# c.IPKernelApp.matplotlib = None\n";

    /// Pretends to be `ipython`: answers `locate` and creates profiles in the
    /// shared in-memory filesystem.
    struct FakeIpython<'a> {
        fs: &'a MemoryFs,
        locate_output: String,
        calls: Mutex<Vec<String>>,
    }

    impl<'a> FakeIpython<'a> {
        fn new(fs: &'a MemoryFs) -> Self {
            Self {
                fs,
                locate_output: format!("{IPYTHON_DIR}\n"),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ProcessRunner for FakeIpython<'_> {
        fn capture(&self, program: &str, args: &[&str], _env: &BTreeMap<String, String>) -> Result<String> {
            self.calls.lock().unwrap().push(command_line(program, args));
            Ok(self.locate_output.clone())
        }

        fn run(&self, program: &str, args: &[&str], env: &BTreeMap<String, String>) -> Result<()> {
            self.calls.lock().unwrap().push(command_line(program, args));
            assert_eq!(env["PYSPARK_DRIVER_PYTHON"], "ipython");

            let profile = args[2];
            let dir = Path::new(IPYTHON_DIR).join(format!("profile_{profile}"));
            self.fs.add_file(dir.join("ipython_kernel_config.py"), DEFAULT_KERNEL_CONFIG);
            self.fs.add_file(dir.join("ipython_config.py"), "c = get_config()\n");
            self.fs.create_dir_all(&dir.join("startup")).unwrap();
            Ok(())
        }
    }

    fn config(env: EnvSnapshot) -> ProvisionConfig {
        ProvisionConfig::resolve(ProfileSettings::default(), env, || {
            Some(PathBuf::from("/usr/bin/python3"))
        })
    }

    fn paths() -> ProfilePaths {
        ProfilePaths::new(Path::new(IPYTHON_DIR), &ProfileSettings::default())
    }

    #[test]
    fn test_install_writes_all_artifacts() {
        let fs = MemoryFs::new();
        let ipython = FakeIpython::new(&fs);
        let provisioner = Provisioner::new(config(EnvSnapshot::default()), &fs, &ipython);

        let report = provisioner.install().unwrap();
        let paths = paths();

        assert_eq!(report.paths, paths);
        assert_eq!(report.submit_args, "--master local[*] --driver-memory 4g");
        assert!(report
            .artifacts
            .iter()
            .all(|a| a.outcome == ArtifactOutcome::Written));
        assert_eq!(
            ipython.calls(),
            vec!["ipython locate", "ipython profile create pyspark"]
        );

        for path in [
            &paths.startup_script,
            &paths.kernel_config,
            &paths.notebook_config,
            &paths.kernel_spec,
        ] {
            assert_eq!(fs.mode(path), Some(PRIVATE_FILE_MODE), "{}", path.display());
        }

        let kernel_config = fs.contents(&paths.kernel_config).unwrap();
        assert_eq!(kernel_config, "c = get_config()\nc.IPKernelApp.matplotlib = 'inline'\n");

        let notebook = fs.contents(&paths.notebook_config).unwrap();
        assert!(notebook.contains("c.NotebookApp.ip = 'localhost'"));
        assert!(notebook.contains("c.NotebookApp.port = 8081"));
        assert!(notebook.contains("open_browser = False"));

        let spec: serde_json::Value =
            serde_json::from_str(&fs.contents(&paths.kernel_spec).unwrap()).unwrap();
        assert_eq!(spec["env"]["PYSPARK_SUBMIT_ARGS"], report.submit_args);
        assert_eq!(spec["argv"][0], "/usr/bin/python3");
    }

    #[test]
    fn test_reinstall_is_byte_identical() {
        let fs = MemoryFs::new();
        let ipython = FakeIpython::new(&fs);
        let provisioner = Provisioner::new(config(EnvSnapshot::default()), &fs, &ipython);

        let first = provisioner.install().unwrap();
        let second = provisioner.install().unwrap();

        assert_eq!(first.artifacts, second.artifacts);
        assert_eq!(first.submit_args, second.submit_args);
    }

    #[test]
    fn test_install_wipes_stale_files() {
        let fs = MemoryFs::new();
        let paths = paths();
        fs.add_file(&paths.startup_script, "stale");
        fs.add_file(paths.profile_dir.join("leftover.py"), "");
        fs.add_file(&paths.kernel_spec, "{}");

        let ipython = FakeIpython::new(&fs);
        Provisioner::new(config(EnvSnapshot::default()), &fs, &ipython)
            .install()
            .unwrap();

        assert!(!fs.exists(&paths.profile_dir.join("leftover.py")));
        assert_ne!(fs.contents(&paths.startup_script).as_deref(), Some("stale"));
        assert_ne!(fs.contents(&paths.kernel_spec).as_deref(), Some("{}"));
    }

    #[test]
    fn test_legacy_release_adds_shell_flag_once() {
        let fs = MemoryFs::new();
        fs.add_file("/opt/spark/RELEASE", "Spark 1.4.1 built for Hadoop 2.6.0\n");
        let env = EnvSnapshot {
            submit_args: Some("--driver-memory 2g pyspark-shell".to_string()),
            spark_home: Some(PathBuf::from("/opt/spark")),
            python: None,
        };
        let ipython = FakeIpython::new(&fs);
        let report = Provisioner::new(config(env), &fs, &ipython).install().unwrap();

        assert_eq!(report.submit_args, "--master local[*] --driver-memory 2g pyspark-shell");
        let script = fs.contents(paths().startup_script).unwrap();
        assert_eq!(script.matches("pyspark-shell").count(), 2); // env assignment and PATH fallback
    }

    #[test]
    fn test_missing_release_file_skips_flag() {
        let fs = MemoryFs::new();
        let env = EnvSnapshot {
            spark_home: Some(PathBuf::from("/opt/spark")),
            ..EnvSnapshot::default()
        };
        let ipython = FakeIpython::new(&fs);
        let provisioner = Provisioner::new(config(env), &fs, &ipython);

        assert_eq!(provisioner.submit_args().unwrap(), "--master local[*] --driver-memory 4g");
    }

    #[test]
    fn test_kernel_config_with_marker_is_untouched() {
        struct InlineIpython<'a>(FakeIpython<'a>);

        impl ProcessRunner for InlineIpython<'_> {
            fn capture(&self, program: &str, args: &[&str], env: &BTreeMap<String, String>) -> Result<String> {
                self.0.capture(program, args, env)
            }

            fn run(&self, program: &str, args: &[&str], env: &BTreeMap<String, String>) -> Result<()> {
                self.0.run(program, args, env)?;
                self.0.fs.add_file(
                    paths().kernel_config,
                    "c = get_config()\nc.IPKernelApp.matplotlib = 'inline'\n",
                );
                Ok(())
            }
        }

        let fs = MemoryFs::new();
        let ipython = InlineIpython(FakeIpython::new(&fs));
        let report = Provisioner::new(config(EnvSnapshot::default()), &fs, &ipython)
            .install()
            .unwrap();

        let kernel = report.get(Artifact::KernelConfig).unwrap();
        assert_eq!(kernel.outcome, ArtifactOutcome::Unchanged);
        assert_eq!(fs.write_count(paths().kernel_config), 0);
    }

    #[test]
    fn test_missing_kernel_config_is_an_error() {
        struct BareIpython;

        impl ProcessRunner for BareIpython {
            fn capture(&self, _: &str, _: &[&str], _: &BTreeMap<String, String>) -> Result<String> {
                Ok(IPYTHON_DIR.to_string())
            }

            fn run(&self, _: &str, _: &[&str], _: &BTreeMap<String, String>) -> Result<()> {
                Ok(())
            }
        }

        let fs = MemoryFs::new();
        let result = Provisioner::new(config(EnvSnapshot::default()), &fs, BareIpython).install();

        assert!(matches!(result, Err(ProvisionError::MissingKernelConfig { .. })));
        // The startup script was already written; nothing is rolled back
        assert!(fs.exists(&paths().startup_script));
    }

    #[test]
    fn test_empty_locate_output() {
        let fs = MemoryFs::new();
        let mut ipython = FakeIpython::new(&fs);
        ipython.locate_output = "\n".to_string();

        let result = Provisioner::new(config(EnvSnapshot::default()), &fs, &ipython).install();
        assert!(matches!(result, Err(ProvisionError::EmptyLocateOutput { .. })));
    }

    #[test]
    fn test_uninstall_removes_directories() {
        let fs = MemoryFs::new();
        let ipython = FakeIpython::new(&fs);
        let provisioner = Provisioner::new(config(EnvSnapshot::default()), &fs, &ipython);
        provisioner.install().unwrap();

        let paths = provisioner.uninstall().unwrap();

        assert!(!fs.exists(&paths.profile_dir));
        assert!(!fs.exists(&paths.kernel_dir));
        assert!(fs.is_dir(IPYTHON_DIR));
    }

    #[test]
    fn test_uninstall_needs_no_interpreter() {
        let fs = MemoryFs::new();
        let ipython = FakeIpython::new(&fs);
        let with_python = Provisioner::new(config(EnvSnapshot::default()), &fs, &ipython);
        with_python.install().unwrap();

        let no_python =
            ProvisionConfig::resolve(ProfileSettings::default(), EnvSnapshot::default(), || None);
        let provisioner = Provisioner::new(no_python, &fs, &ipython);

        let paths = provisioner.uninstall().unwrap();
        assert!(!fs.exists(&paths.profile_dir));
        assert!(!fs.exists(&paths.kernel_dir));
    }

    #[test]
    fn test_install_without_interpreter_touches_nothing() {
        let fs = MemoryFs::new();
        let paths = paths();
        fs.add_file(&paths.kernel_spec, "{}");
        let ipython = FakeIpython::new(&fs);
        let no_python =
            ProvisionConfig::resolve(ProfileSettings::default(), EnvSnapshot::default(), || None);

        let result = Provisioner::new(no_python, &fs, &ipython).install();

        assert!(matches!(result, Err(ProvisionError::MissingInterpreter)));
        assert_eq!(fs.contents(&paths.kernel_spec).as_deref(), Some("{}"));
        assert!(ipython.calls().is_empty());
    }

    #[test]
    fn test_fingerprint() {
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
