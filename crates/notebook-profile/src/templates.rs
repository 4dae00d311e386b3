//! Text of the generated profile files.

use crate::config::ProfileSettings;

pub const INLINE_PLOTTING_PLACEHOLDER: &str = "# c.IPKernelApp.matplotlib = None";
pub const INLINE_PLOTTING_MARKER: &str = "c.IPKernelApp.matplotlib = 'inline'";
pub const NO_BROWSER_MARKER: &str = "open_browser = False";

const STARTUP_TEMPLATE: &str = r#"import os, sys

spark_home = os.getenv('SPARK_HOME', None)
if spark_home:
    print('Using $SPARK_HOME')
    sys.path.insert(0, os.path.join(spark_home, 'python'))

    # Not needed if py4j is installed; adjust the version to match your Spark
    sys.path.insert(0, os.path.join(spark_home, '{py4j_archive}'))

    os.environ['PYSPARK_SUBMIT_ARGS'] = '{submit_args}'
    # Predefines the SparkContext variable 'sc'
    exec(open(os.path.join(spark_home, 'python/pyspark/shell.py')).read())
elif 'spark' in os.getenv('PATH', ''):
    os.system('pyspark {submit_args}')
else:
    raise ValueError('SPARK_HOME environment variable is not set and binaries are not added to the PATH')
"#;

const NOTEBOOK_TEMPLATE: &str = "c = get_config()
c.NotebookApp.ip = '{ip}'
c.NotebookApp.port = {port}
c.NotebookApp.open_browser = False
";

/// Escape a value for use inside a single-quoted Python string literal.
fn py_quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Quote a value for a POSIX shell: single quotes, with embedded quotes
/// written as `'\''`.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// `export` lines for the given variables, safe to `eval` in sh or bash.
pub fn shell_exports<'a, I>(vars: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    vars.into_iter()
        .map(|(key, value)| format!("export {key}={}\n", shell_quote(value)))
        .collect()
}

/// Startup script dropped into `profile_<name>/startup/`.
pub fn startup_script(settings: &ProfileSettings, submit_args: &str) -> String {
    STARTUP_TEMPLATE
        .replace("{py4j_archive}", &py_quote(&settings.py4j_archive))
        .replace("{submit_args}", &py_quote(submit_args))
}

/// Notebook server config binding to the configured address and port.
pub fn notebook_config(settings: &ProfileSettings) -> String {
    NOTEBOOK_TEMPLATE
        .replace("{ip}", &py_quote(&settings.ip))
        .replace("{port}", &settings.port.to_string())
}

pub fn needs_notebook_config(existing: Option<&str>) -> bool {
    existing.is_none_or(|text| !text.contains(NO_BROWSER_MARKER))
}

/// Enable inline plotting in a kernel config. Returns `None` when the config
/// already has it. Without the commented default line to substitute, the
/// marker is appended.
pub fn patch_kernel_config(existing: &str) -> Option<String> {
    if existing.contains(INLINE_PLOTTING_MARKER) {
        return None;
    }

    if existing.contains(INLINE_PLOTTING_PLACEHOLDER) {
        return Some(existing.replace(INLINE_PLOTTING_PLACEHOLDER, INLINE_PLOTTING_MARKER));
    }

    let mut patched = existing.to_string();
    if !patched.is_empty() && !patched.ends_with('\n') {
        patched.push('\n');
    }
    patched.push_str(INLINE_PLOTTING_MARKER);
    patched.push('\n');
    Some(patched)
}
