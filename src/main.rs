mod cli;

use clap::Parser;
use cli::Cli;
use miette::{GraphicalReportHandler, GraphicalTheme};
use notebook_profile::fs::restrict_umask;
use notebook_profile::templates::shell_exports;
use notebook_profile::{
    ArtifactOutcome, EnvSnapshot, LocalFs, ProvisionConfig, ProvisionError, ProvisionReport,
    Provisioner, SystemRunner,
};
use tokio::task::JoinError;

enum Action {
    Install,
    Uninstall,
    PrintEnv,
}

fn default_interpreter() -> Option<std::path::PathBuf> {
    which::which("python3")
        .or_else(|_| which::which("python"))
        .ok()
}

fn run(config: ProvisionConfig, action: Action) -> Result<(), ProvisionError> {
    let provisioner = Provisioner::new(config, LocalFs, SystemRunner);

    match action {
        Action::Install => {
            let report = provisioner.install()?;
            print_summary(&report);
        }
        Action::Uninstall => {
            let paths = provisioner.uninstall()?;
            println!("PySpark profile and kernel removed from {}", paths.ipython_dir.display());
        }
        Action::PrintEnv => {
            provisioner.config().interpreter()?;
            let submit_args = provisioner.submit_args()?;
            let driver_env = provisioner.config().driver_env();
            let vars = std::iter::once(("PYSPARK_SUBMIT_ARGS", submit_args.as_str()))
                .chain(driver_env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            print!("{}", shell_exports(vars));
        }
    }
    Ok(())
}

fn print_summary(report: &ProvisionReport) {
    println!("PySpark profile ready: {}", report.paths.profile_dir.display());
    println!("  Submit args: {}", report.submit_args);
    for artifact in &report.artifacts {
        let status = match artifact.outcome {
            ArtifactOutcome::Written => "written",
            ArtifactOutcome::Unchanged => "unchanged",
        };
        println!(
            "  {}: {} ({status}, sha256 {})",
            artifact.artifact,
            artifact.path.display(),
            &artifact.sha256[..12]
        );
    }
    println!();
    println!("Start the notebook with `ipython notebook --profile=pyspark`,");
    println!("or pick the PySpark kernel from `jupyter notebook`.");
}

fn render_error(error: &ProvisionError) -> String {
    let handler = GraphicalReportHandler::new().with_theme(GraphicalTheme::default());
    let mut output = String::new();
    match handler.render_report(&mut output, error) {
        Ok(_) => output,
        Err(_) => format!("Error: {error}"),
    }
}

/// Report the outcome of the provisioning task and pick the exit code.
fn exit_code(joined: Result<Result<(), ProvisionError>, JoinError>) -> i32 {
    match joined {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => {
            eprint!("{}", render_error(&e));
            2
        }
        Err(e) => {
            eprintln!("Error: provisioning task failed: {e}");
            2
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let action = match (cli.uninstall, cli.print_env) {
        (false, false) => Action::Install,
        (true, false) => Action::Uninstall,
        (false, true) => Action::PrintEnv,
        _ => {
            eprintln!("Usage: pyspark-notebook [--uninstall | --print-env] [OPTIONS]");
            std::process::exit(2);
        }
    };

    // Before anything is created or spawned
    restrict_umask();

    let config = ProvisionConfig::resolve(cli.settings(), EnvSnapshot::from_env(), default_interpreter);
    let task = tokio::task::spawn_blocking(move || run(config, action));

    tokio::select! {
        joined = task => {
            let code = exit_code(joined);
            if code != 0 {
                std::process::exit(code);
            }
        }
        Ok(()) = tokio::signal::ctrl_c() => {
            println!("Aborted\n");
            std::process::exit(1);
        }
    }

    Ok(())
}
