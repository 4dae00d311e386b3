//! Derivation of the `PYSPARK_SUBMIT_ARGS` string.

/// Spark releases that only start the Python shell when told explicitly.
pub const LEGACY_RELEASES: [&str; 2] = ["Spark 1.4", "Spark 1.5"];

/// Trailing argument those releases require.
pub const SHELL_FLAG: &str = "pyspark-shell";

/// Build the submit options from the optional user override, the execution
/// target, the driver memory fallback and the contents of Spark's RELEASE file.
pub fn derive_submit_args(
    override_args: Option<&str>,
    master: &str,
    driver_memory: &str,
    release: Option<&str>,
) -> String {
    let rest = match override_args.map(str::trim).filter(|args| !args.is_empty()) {
        Some(args) => args.to_string(),
        None => format!("--driver-memory {driver_memory}"),
    };

    let mut args = format!("--master {master} {rest}");

    if release.is_some_and(needs_shell_flag) && !has_shell_flag(&args) {
        args.push(' ');
        args.push_str(SHELL_FLAG);
    }

    args
}

pub fn needs_shell_flag(release: &str) -> bool {
    LEGACY_RELEASES.iter().any(|marker| release.contains(marker))
}

fn has_shell_flag(args: &str) -> bool {
    args.split_whitespace().any(|token| token == SHELL_FLAG)
}
