//! Execution adapters for the sandboxed toolchain.
//!
//! The sandbox offers no process creation and no file locking. This crate
//! provides the substitutes the toolchain runs against:
//!
//! - an [`ExecBridge`] that presents a blocking-looking "run a child
//!   program" call on top of the host's asynchronous, callback-driven
//!   execution primitive;
//! - a [`LockRegistry`] emulating advisory file locks with
//!   immediate-failure semantics;
//! - absolute-path executable [`lookup`](lookup::lookup_path) against the
//!   virtual filesystem;
//! - a [`Session`] that owns the store and the registry for one process
//!   lifetime.
//!
//! Everything here runs on a single logical thread with cooperative
//! scheduling. A call into the bridge suspends at the point the request is
//! handed to the host and resumes when the request's completion signal
//! fires; the host's callbacks do only bounded, non-blocking work.

pub mod bridge;
pub mod error;
pub mod host;
pub mod lock;
pub mod lookup;
pub mod request;
pub mod session;

pub use bridge::{ExecBridge, ExecId};
pub use error::{ExecError, LockError, LookupError, Result};
pub use host::{CompletionSignal, ExecutionHost, HostError, HostIo, HostRequest, InputPull, OutputPush};
pub use lock::{FileId, LockMode, LockPolicy, LockRegistry};
pub use lookup::lookup_path;
pub use request::{CancelBinding, ExecRequest, ExitState, ExtraFile, ProcAttr, ProcessHandle};
pub use session::{LoadPlan, Session, SessionConfig};
