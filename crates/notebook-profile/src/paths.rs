use std::path::{Path, PathBuf};

use crate::config::ProfileSettings;

/// Filesystem locations of everything the provisioner touches, relative to
/// the directory reported by `ipython locate`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfilePaths {
    pub ipython_dir: PathBuf,
    pub profile_dir: PathBuf,
    pub startup_script: PathBuf,
    pub kernel_config: PathBuf,
    pub notebook_config: PathBuf,
    pub kernel_dir: PathBuf,
    pub kernel_spec: PathBuf,
}

impl ProfilePaths {
    pub fn new(ipython_dir: &Path, settings: &ProfileSettings) -> Self {
        let name = &settings.profile_name;
        let profile_dir = ipython_dir.join(format!("profile_{name}"));
        let kernel_dir = ipython_dir.join("kernels").join(&settings.kernel_name);

        Self {
            ipython_dir: ipython_dir.to_path_buf(),
            startup_script: profile_dir
                .join("startup")
                .join(format!("00-{name}-setup.py")),
            kernel_config: profile_dir.join("ipython_kernel_config.py"),
            notebook_config: profile_dir.join("ipython_notebook_config.py"),
            kernel_spec: kernel_dir.join("kernel.json"),
            profile_dir,
            kernel_dir,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_layout() {
        let paths = ProfilePaths::new(Path::new("/home/ada/.ipython"), &ProfileSettings::default());

        assert_eq!(paths.profile_dir, PathBuf::from("/home/ada/.ipython/profile_pyspark"));
        assert_eq!(
            paths.startup_script,
            PathBuf::from("/home/ada/.ipython/profile_pyspark/startup/00-pyspark-setup.py")
        );
        assert_eq!(
            paths.kernel_config,
            PathBuf::from("/home/ada/.ipython/profile_pyspark/ipython_kernel_config.py")
        );
        assert_eq!(
            paths.notebook_config,
            PathBuf::from("/home/ada/.ipython/profile_pyspark/ipython_notebook_config.py")
        );
        assert_eq!(
            paths.kernel_spec,
            PathBuf::from("/home/ada/.ipython/kernels/pyspark/kernel.json")
        );
    }

    #[test]
    fn test_custom_names() {
        let settings = ProfileSettings {
            profile_name: "spark2".to_string(),
            kernel_name: "spark2-kernel".to_string(),
            ..ProfileSettings::default()
        };
        let paths = ProfilePaths::new(Path::new("/tmp/ipy"), &settings);

        assert_eq!(
            paths.startup_script,
            PathBuf::from("/tmp/ipy/profile_spark2/startup/00-spark2-setup.py")
        );
        assert_eq!(paths.kernel_dir, PathBuf::from("/tmp/ipy/kernels/spark2-kernel"));
    }
}
