//! Blocking-looking execution over the asynchronous host.
//!
//! [`ExecBridge::run`] suspends its caller at the point the request is
//! handed to the host and resumes when that request's completion signal
//! fires. Output is buffered: the push callbacks only append to internal
//! buffers (bounded work on the host's turns), and after completion the
//! bridge writes the complete stdout buffer to the caller's sink, then the
//! complete stderr buffer. Caller-provided sinks are therefore never touched
//! during the asynchronous callback sequence and the two streams never
//! interleave.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use crate::error::ExecError;
use crate::host::{
    CompletionSignal, ExecutionHost, HostError, HostIo, HostRequest, InputPull, OutputPush,
};
use crate::request::ExecRequest;

/// Unique identifier for one execution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecId(Uuid);

impl ExecId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExecId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One in-flight request: the receiving half of its completion signal.
///
/// Exactly one outcome is ever delivered; `wait` consumes it exactly once.
struct PendingExecution {
    id: ExecId,
    target: String,
    done: oneshot::Receiver<Result<(), HostError>>,
}

impl PendingExecution {
    fn new(id: ExecId, target: String) -> (Self, CompletionSignal) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                id,
                target,
                done: rx,
            },
            tx,
        )
    }

    /// Suspend until the outcome arrives, then classify it.
    async fn wait(self) -> Result<(), ExecError> {
        match self.done.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(HostError::Failure(cause))) => Err(ExecError::Execution {
                target: self.target,
                cause,
            }),
            Ok(Err(HostError::Value(detail))) => Err(ExecError::Failed { detail }),
            Err(_) => {
                debug!(id = %self.id, "host dropped the completion signal");
                Err(ExecError::CompletionLost)
            }
        }
    }
}

/// Presents blocking child-process execution over an injected host.
pub struct ExecBridge<H> {
    host: H,
}

impl<H: ExecutionHost> ExecBridge<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Run a child program to completion.
    ///
    /// Preconditions are checked before the host is invoked: a malformed
    /// environment entry or a populated never-supported field fails the
    /// request without any host call. Afterwards the caller is suspended on
    /// the request's completion signal; on resumption the buffered stdout
    /// and stderr are flushed, in that order, and the outcome is returned.
    pub async fn run(&self, request: ExecRequest) -> Result<(), ExecError> {
        check_supported(&request)?;
        let env = parse_env(&request.env)?;

        let ExecRequest {
            path,
            args,
            dir,
            stdin,
            stdout,
            stderr,
            ..
        } = request;

        let id = ExecId::new();
        let stdout_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let io = HostIo {
            stdin: input_pull(stdin),
            stdout: buffer_push(Arc::clone(&stdout_buf)),
            stderr: buffer_push(Arc::clone(&stderr_buf)),
        };

        let host_request = HostRequest {
            path: path.clone(),
            args: args.into_iter().skip(1).collect(),
            env,
            dir,
            extra_files: Vec::new(),
        };

        debug!(%id, target = %path, "submitting execution request");
        let (pending, done) = PendingExecution::new(id, path);
        self.host.submit(host_request, io, done);
        let outcome = pending.wait().await;

        // One flush per stream, strictly after completion: stdout first.
        flush_buffer(stdout, &stdout_buf)?;
        flush_buffer(stderr, &stderr_buf)?;
        outcome
    }
}

/// Reject requests for capabilities the sandbox does not have.
fn check_supported(request: &ExecRequest) -> Result<(), ExecError> {
    if !request.extra_files.is_empty() {
        return Err(ExecError::NotSupported {
            feature: "extra file handles",
        });
    }
    if request.proc_attr.is_some() {
        return Err(ExecError::NotSupported {
            feature: "process attributes",
        });
    }
    if request.process.is_some() {
        return Err(ExecError::NotSupported {
            feature: "pre-existing process handle",
        });
    }
    if request.exit_state.is_some() {
        return Err(ExecError::NotSupported {
            feature: "recorded exit state",
        });
    }
    if request.cancel.is_some() {
        return Err(ExecError::NotSupported {
            feature: "cancellation binding",
        });
    }
    Ok(())
}

/// Parse raw `NAME=VALUE` entries into a mapping.
fn parse_env(entries: &[String]) -> Result<BTreeMap<String, String>, ExecError> {
    let mut env = BTreeMap::new();
    for entry in entries {
        let Some((name, value)) = entry.split_once('=') else {
            return Err(ExecError::InvalidEnvironment {
                entry: entry.clone(),
            });
        };
        env.insert(name.to_string(), value.to_string());
    }
    Ok(env)
}

/// Wrap the caller's input source as the host's pull callback.
fn input_pull(stdin: Option<Box<dyn Read + Send>>) -> InputPull {
    let mut source = stdin;
    Box::new(move |buf: &mut [u8]| {
        let Some(reader) = source.as_mut() else {
            return Ok(0);
        };
        loop {
            match reader.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.to_string()),
            }
        }
    })
}

/// A push callback that appends into a shared buffer.
fn buffer_push(buf: Arc<Mutex<Vec<u8>>>) -> OutputPush {
    Box::new(move |chunk: &[u8]| {
        buf.lock().unwrap().extend_from_slice(chunk);
    })
}

/// Write a stream's complete buffer to its sink, if any.
fn flush_buffer(
    sink: Option<Box<dyn std::io::Write + Send>>,
    buf: &Arc<Mutex<Vec<u8>>>,
) -> Result<(), ExecError> {
    let Some(mut sink) = sink else {
        return Ok(());
    };
    let data = std::mem::take(&mut *buf.lock().unwrap());
    sink.write_all(&data)?;
    sink.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Host double that scripts one interaction per submitted request.
    struct ScriptedHost {
        invocations: AtomicUsize,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        echo_stdin: bool,
        outcome: Result<(), HostError>,
        seen: Mutex<Vec<HostRequest>>,
    }

    impl ScriptedHost {
        fn succeeding() -> Self {
            Self {
                invocations: AtomicUsize::new(0),
                stdout: Vec::new(),
                stderr: Vec::new(),
                echo_stdin: false,
                outcome: Ok(()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn invocation_count(&self) -> usize {
            self.invocations.load(Ordering::SeqCst)
        }
    }

    impl ExecutionHost for ScriptedHost {
        fn submit(&self, request: HostRequest, mut io: HostIo, done: CompletionSignal) {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request);

            if self.echo_stdin {
                let mut buf = [0u8; 8];
                loop {
                    match (io.stdin)(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => (io.stdout)(&buf[..n]),
                        Err(message) => {
                            let _ = done.send(Err(HostError::Failure(message)));
                            return;
                        }
                    }
                }
            }
            if !self.stdout.is_empty() {
                (io.stdout)(&self.stdout);
            }
            if !self.stderr.is_empty() {
                (io.stderr)(&self.stderr);
            }
            let _ = done.send(self.outcome.clone());
        }
    }

    /// A sink that records writes and the order they happened in.
    #[derive(Clone)]
    struct SharedSink {
        data: Arc<Mutex<Vec<u8>>>,
        log: Arc<Mutex<Vec<&'static str>>>,
        label: &'static str,
    }

    impl SharedSink {
        fn pair() -> (Self, Self, Arc<Mutex<Vec<&'static str>>>) {
            let log = Arc::new(Mutex::new(Vec::new()));
            let out = Self {
                data: Arc::new(Mutex::new(Vec::new())),
                log: Arc::clone(&log),
                label: "stdout",
            };
            let err = Self {
                data: Arc::new(Mutex::new(Vec::new())),
                log: Arc::clone(&log),
                label: "stderr",
            };
            (out, err, log)
        }

        fn contents(&self) -> Vec<u8> {
            self.data.lock().unwrap().clone()
        }
    }

    impl std::io::Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.lock().unwrap().extend_from_slice(buf);
            self.log.lock().unwrap().push(self.label);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn environment_is_parsed_into_mapping() {
        let host = ScriptedHost::succeeding();
        let bridge = ExecBridge::new(host);

        let mut request = ExecRequest::command("/bin/tool", ["-v"]);
        request.env = vec!["A=1".to_string(), "B=2".to_string()];
        bridge.run(request).await.unwrap();

        let seen = bridge.host().seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].env["A"], "1");
        assert_eq!(seen[0].env["B"], "2");
        // argv[0] is not forwarded, and the extra-files slot stays empty.
        assert_eq!(seen[0].args, vec!["-v"]);
        assert!(seen[0].extra_files.is_empty());
    }

    #[tokio::test]
    async fn malformed_env_entry_never_reaches_host() {
        let host = ScriptedHost::succeeding();
        let bridge = ExecBridge::new(host);

        let mut request = ExecRequest::command("/bin/tool", Vec::<String>::new());
        request.env = vec!["NOEQUALS".to_string()];
        let result = bridge.run(request).await;

        assert!(matches!(
            result,
            Err(ExecError::InvalidEnvironment { entry }) if entry == "NOEQUALS"
        ));
        assert_eq!(bridge.host().invocation_count(), 0);
    }

    #[tokio::test]
    async fn env_value_may_contain_separator() {
        let host = ScriptedHost::succeeding();
        let bridge = ExecBridge::new(host);

        let mut request = ExecRequest::command("/bin/tool", Vec::<String>::new());
        request.env = vec!["FLAGS=-a=b".to_string()];
        bridge.run(request).await.unwrap();

        let seen = bridge.host().seen.lock().unwrap();
        assert_eq!(seen[0].env["FLAGS"], "-a=b");
    }

    #[tokio::test]
    async fn unsupported_fields_fail_fast() {
        use crate::request::{CancelBinding, ExitState, ExtraFile, ProcAttr, ProcessHandle};

        let host = ScriptedHost::succeeding();
        let bridge = ExecBridge::new(host);

        let cases: Vec<(&'static str, Box<dyn Fn(&mut ExecRequest)>)> = vec![
            (
                "extra file handles",
                Box::new(|r| {
                    r.extra_files.push(ExtraFile {
                        name: "aux".to_string(),
                    })
                }),
            ),
            ("process attributes", Box::new(|r| r.proc_attr = Some(ProcAttr))),
            (
                "pre-existing process handle",
                Box::new(|r| r.process = Some(ProcessHandle { pid: 1 })),
            ),
            (
                "recorded exit state",
                Box::new(|r| r.exit_state = Some(ExitState { code: 0 })),
            ),
            ("cancellation binding", Box::new(|r| r.cancel = Some(CancelBinding))),
        ];

        for (feature, mutate) in cases {
            let mut request = ExecRequest::command("/bin/tool", Vec::<String>::new());
            mutate(&mut request);
            let result = bridge.run(request).await;
            assert!(
                matches!(result, Err(ExecError::NotSupported { feature: f }) if f == feature),
                "expected NotSupported for {feature}"
            );
        }
        assert_eq!(bridge.host().invocation_count(), 0);
    }

    #[tokio::test]
    async fn stdout_flushes_before_stderr() {
        let mut host = ScriptedHost::succeeding();
        host.stdout = b"compiled 3 packages\n".to_vec();
        host.stderr = b"warning: slow path\n".to_vec();
        let bridge = ExecBridge::new(host);

        let (out, err, log) = SharedSink::pair();
        let mut request = ExecRequest::command("/bin/tool", Vec::<String>::new());
        request.stdout = Some(Box::new(out.clone()));
        request.stderr = Some(Box::new(err.clone()));
        bridge.run(request).await.unwrap();

        assert_eq!(out.contents(), b"compiled 3 packages\n");
        assert_eq!(err.contents(), b"warning: slow path\n");
        assert_eq!(*log.lock().unwrap(), vec!["stdout", "stderr"]);
    }

    #[tokio::test]
    async fn output_flushes_even_when_child_fails() {
        let mut host = ScriptedHost::succeeding();
        host.stderr = b"undefined symbol\n".to_vec();
        host.outcome = Err(HostError::Failure("exit status 2".to_string()));
        let bridge = ExecBridge::new(host);

        let (out, err, _log) = SharedSink::pair();
        let mut request = ExecRequest::command("/go/pkg/tool/sandbox/link", Vec::<String>::new());
        request.stdout = Some(Box::new(out));
        request.stderr = Some(Box::new(err.clone()));
        let result = bridge.run(request).await;

        assert!(matches!(
            result,
            Err(ExecError::Execution { ref target, ref cause })
                if target == "/go/pkg/tool/sandbox/link" && cause == "exit status 2"
        ));
        assert_eq!(err.contents(), b"undefined symbol\n");
    }

    #[tokio::test]
    async fn arbitrary_rejection_becomes_generic_failure() {
        let mut host = ScriptedHost::succeeding();
        host.outcome = Err(HostError::Value("42".to_string()));
        let bridge = ExecBridge::new(host);

        let request = ExecRequest::command("/bin/tool", Vec::<String>::new());
        let result = bridge.run(request).await;
        assert!(matches!(result, Err(ExecError::Failed { detail }) if detail == "42"));
    }

    #[tokio::test]
    async fn stdin_streams_to_host() {
        let mut host = ScriptedHost::succeeding();
        host.echo_stdin = true;
        let bridge = ExecBridge::new(host);

        let (out, _err, _log) = SharedSink::pair();
        let mut request = ExecRequest::command("/bin/cat", Vec::<String>::new());
        request.stdin = Some(Box::new(std::io::Cursor::new(b"stream me".to_vec())));
        request.stdout = Some(Box::new(out.clone()));
        bridge.run(request).await.unwrap();

        assert_eq!(out.contents(), b"stream me");
    }

    #[tokio::test]
    async fn missing_stdin_reads_as_empty() {
        let mut host = ScriptedHost::succeeding();
        host.echo_stdin = true;
        let bridge = ExecBridge::new(host);

        let (out, _err, _log) = SharedSink::pair();
        let mut request = ExecRequest::command("/bin/cat", Vec::<String>::new());
        request.stdout = Some(Box::new(out.clone()));
        bridge.run(request).await.unwrap();

        assert!(out.contents().is_empty());
    }

    #[tokio::test]
    async fn stdin_read_error_is_reported_as_string() {
        struct FailingReader;
        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk on fire"))
            }
        }

        let mut host = ScriptedHost::succeeding();
        host.echo_stdin = true;
        let bridge = ExecBridge::new(host);

        let mut request = ExecRequest::command("/bin/cat", Vec::<String>::new());
        request.stdin = Some(Box::new(FailingReader));
        let result = bridge.run(request).await;

        assert!(matches!(
            result,
            Err(ExecError::Execution { ref cause, .. }) if cause.contains("disk on fire")
        ));
    }

    #[tokio::test]
    async fn dropped_completion_signal_is_an_error() {
        struct DroppingHost;
        impl ExecutionHost for DroppingHost {
            fn submit(&self, _request: HostRequest, _io: HostIo, done: CompletionSignal) {
                drop(done);
            }
        }

        let bridge = ExecBridge::new(DroppingHost);
        let request = ExecRequest::command("/bin/tool", Vec::<String>::new());
        let result = bridge.run(request).await;
        assert!(matches!(result, Err(ExecError::CompletionLost)));
    }

    #[tokio::test]
    async fn discarded_output_is_silently_dropped() {
        let mut host = ScriptedHost::succeeding();
        host.stdout = b"nobody listens\n".to_vec();
        let bridge = ExecBridge::new(host);

        let request = ExecRequest::command("/bin/tool", Vec::<String>::new());
        bridge.run(request).await.unwrap();
    }
}
