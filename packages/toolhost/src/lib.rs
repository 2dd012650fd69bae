//! Toolhost: sandboxed host adapters for a multi-stage compiler toolchain.
//!
//! Toolhost lets a toolchain written against synchronous, OS-backed
//! primitives run inside a host that offers neither a disk nor process
//! creation: packed archives are staged into an in-memory filesystem before
//! the toolchain starts, child-tool execution is bridged onto the host's
//! asynchronous callback primitive, and advisory file locking is emulated in
//! memory.

pub use toolhost_archive as archive;
pub use toolhost_exec as exec;
pub use toolhost_vfs as vfs;

pub use toolhost_archive::{decode, encode, ArchiveError, ArchiveMap};
pub use toolhost_exec::{
    ExecBridge, ExecError, ExecRequest, ExecutionHost, LoadPlan, LockMode, LockPolicy,
    LockRegistry, Session, SessionConfig,
};
pub use toolhost_vfs::{ArchiveSource, LoadError, Loader, MountLayout, VfsError, VfsStore};
