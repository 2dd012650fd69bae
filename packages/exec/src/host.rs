//! The execution-host capability interface.
//!
//! The host is the only party that can actually run a child program. It is
//! asynchronous and callback-driven: the bridge hands it a request together
//! with three callback handles and a single-slot completion signal, and the
//! host invokes the callbacks on its own turns of the event loop before
//! firing the signal exactly once.
//!
//! Abstracting the host behind one trait method keeps the bridge
//! deterministic to test: a test double can invoke every callback and
//! resolve the signal synchronously inside [`ExecutionHost::submit`].

use std::collections::BTreeMap;

use thiserror::Error;
use tokio::sync::oneshot;

/// What the host needs to start a child program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRequest {
    /// Absolute path of the executable inside the virtual filesystem.
    pub path: String,
    /// Argument vector, excluding argv[0].
    pub args: Vec<String>,
    /// Parsed environment mapping.
    pub env: BTreeMap<String, String>,
    /// Working directory for the child.
    pub dir: String,
    /// Reserved extra-files placeholder. Always empty: the bridge rejects
    /// requests that ask for extra handles before anything reaches the host.
    pub extra_files: Vec<String>,
}

/// Input-pull callback, invoked by the host whenever it wants more bytes.
///
/// Fills the front of the buffer and returns the count. Contract: at least
/// one byte per invocation unless the input is exhausted — a return of
/// `Ok(0)` signals end-of-input, never "no data yet". A failing read is
/// reported as a string for the host to surface.
pub type InputPull = Box<dyn FnMut(&mut [u8]) -> std::result::Result<usize, String> + Send>;

/// Output-push callback, invoked by the host as child output becomes
/// available. Must do only bounded, non-blocking work.
pub type OutputPush = Box<dyn FnMut(&[u8]) + Send>;

/// The three callback handles accompanying one request.
pub struct HostIo {
    pub stdin: InputPull,
    pub stdout: OutputPush,
    pub stderr: OutputPush,
}

/// Single-slot completion signal for one request.
///
/// Exactly one outcome is delivered per request; the bridge holds the
/// receiving half and consumes it exactly once.
pub type CompletionSignal = oneshot::Sender<std::result::Result<(), HostError>>;

/// How the host reports a failed request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// A structured error the host produced for the child.
    #[error("{0}")]
    Failure(String),

    /// Any other rejection value, already formatted to text.
    #[error("host rejected request: {0}")]
    Value(String),
}

/// The asynchronous execution primitive the sandbox exposes.
pub trait ExecutionHost: Send + Sync {
    /// Hand a request to the host.
    ///
    /// The hand-off itself must not block. The host invokes the `io`
    /// callbacks on its own turns, fires `done` exactly once when the child
    /// finishes or the request is rejected, and drops all callback handles
    /// afterwards so no host-side references leak.
    fn submit(&self, request: HostRequest, io: HostIo, done: CompletionSignal);
}
