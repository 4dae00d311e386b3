use clap::Parser;
use notebook_profile::ProfileSettings;

#[derive(Parser)]
#[command(name = "pyspark-notebook")]
#[command(about = "Create an IPython profile and Jupyter kernel that start PySpark")]
pub struct Cli {
    /// Remove the profile and kernel spec instead of creating them
    #[arg(long)]
    pub uninstall: bool,

    /// Print shell exports that make `pyspark` open a notebook
    #[arg(long)]
    pub print_env: bool,

    /// Name of the IPython profile
    #[arg(long, default_value = "pyspark")]
    pub profile: String,

    /// Name of the Jupyter kernel spec directory
    #[arg(long, default_value = "pyspark")]
    pub kernel: String,

    /// Kernel name shown in the notebook UI
    #[arg(long, default_value = "PySpark")]
    pub display_name: String,

    /// Address the notebook server binds to
    #[arg(long, default_value = "localhost")]
    pub ip: String,

    /// Port the notebook server listens on
    #[arg(long, default_value_t = 8081)]
    pub port: u16,

    /// Spark master URL
    #[arg(long, default_value = "local[*]")]
    pub master: String,

    /// Driver memory used when PYSPARK_SUBMIT_ARGS is unset
    #[arg(long, default_value = "4g")]
    pub driver_memory: String,

    /// IPython executable
    #[arg(long, default_value = "ipython")]
    pub ipython: String,

    /// py4j archive, relative to SPARK_HOME
    #[arg(long, default_value = "python/lib/py4j-0.8.2.1-src.zip")]
    pub py4j_archive: String,
}

impl Cli {
    pub fn settings(&self) -> ProfileSettings {
        ProfileSettings {
            profile_name: self.profile.clone(),
            kernel_name: self.kernel.clone(),
            display_name: self.display_name.clone(),
            ip: self.ip.clone(),
            port: self.port,
            master: self.master.clone(),
            driver_memory: self.driver_memory.clone(),
            ipython: self.ipython.clone(),
            py4j_archive: self.py4j_archive.clone(),
            ..ProfileSettings::default()
        }
    }
}
