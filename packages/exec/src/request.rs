//! Child-execution requests.
//!
//! The request surface mirrors what the toolchain's process-spawning code
//! constructs. Several fields exist only so that requests asking for them
//! can be rejected loudly: the sandbox has no extra file handles, no process
//! attributes, no process handles, and no cancellation. Silently ignoring
//! those would corrupt the toolchain's assumptions, so each one fails the
//! request with a specific `NotSupported` before the host is ever invoked.

use std::io::{Read, Write};

/// An inherited file handle beyond stdin, stdout, and stderr.
#[derive(Debug, Clone)]
pub struct ExtraFile {
    pub name: String,
}

/// Platform-specific process attributes (credentials, chroot, session
/// flags). Never supported in the sandbox.
#[derive(Debug, Clone, Default)]
pub struct ProcAttr;

/// Handle to an already-started child process.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pub pid: i32,
}

/// Recorded exit state from a completed child process.
#[derive(Debug, Clone)]
pub struct ExitState {
    pub code: i32,
}

/// Binding to an external cancellation context.
#[derive(Debug, Clone, Default)]
pub struct CancelBinding;

/// A request to run a child program.
pub struct ExecRequest {
    /// Absolute path of the executable.
    pub path: String,
    /// Full argument vector; `args[0]` is the command name and is not
    /// forwarded to the host.
    pub args: Vec<String>,
    /// Raw `NAME=VALUE` environment entries, parsed by the bridge.
    pub env: Vec<String>,
    /// Working directory for the child.
    pub dir: String,
    /// Input source; `None` reads as empty.
    pub stdin: Option<Box<dyn Read + Send>>,
    /// Output sink for stdout; `None` discards.
    pub stdout: Option<Box<dyn Write + Send>>,
    /// Output sink for stderr; `None` discards.
    pub stderr: Option<Box<dyn Write + Send>>,

    /// Never supported; any entry fails the request.
    pub extra_files: Vec<ExtraFile>,
    /// Never supported; `Some` fails the request.
    pub proc_attr: Option<ProcAttr>,
    /// Never supported; `Some` fails the request.
    pub process: Option<ProcessHandle>,
    /// Never supported; `Some` fails the request.
    pub exit_state: Option<ExitState>,
    /// Never supported; `Some` fails the request.
    pub cancel: Option<CancelBinding>,
}

impl ExecRequest {
    /// Build a request for `path` with the given arguments.
    ///
    /// The command name is prepended as `args[0]`; the working directory
    /// defaults to the sandbox home.
    pub fn command<I, S>(path: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path = path.into();
        let mut argv = vec![path.clone()];
        argv.extend(args.into_iter().map(Into::into));
        Self {
            path,
            args: argv,
            env: Vec::new(),
            dir: "/root".to_string(),
            stdin: None,
            stdout: None,
            stderr: None,
            extra_files: Vec::new(),
            proc_attr: None,
            process: None,
            exit_state: None,
            cancel: None,
        }
    }
}
