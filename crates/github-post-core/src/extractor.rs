//! Failure extraction from raw stress-test console output.
//!
//! [`FailureScanner`] makes a single forward pass over `go test -v` output
//! (usually wrapped by the `stress` harness and interleaved with glog lines)
//! and yields one [`FailureRecord`] per recognized failure signature.
//!
//! The only state carried between lines is the most recent "currently
//! running" test marker and, while a fatal trace is being collected, that
//! trace's lines.

use std::io::{BufRead, Lines};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PostError, Result};
use crate::signature::{LineKind, Signature, Signatures};

/// One recognized failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Package the failing test belongs to.
    pub package: String,

    /// Name of the failing test.
    pub test: String,

    /// Log excerpt describing the failure, verbatim. May span several lines.
    pub excerpt: String,

    /// Which signature matched.
    pub signature: Signature,

    /// 1-based line number of the matching line.
    pub line: usize,
}

/// What happens to the running-test marker once a failure is attributed to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerPolicy {
    /// Keep the marker; every failure until the next marker belongs to the
    /// same test and yields its own record.
    #[default]
    Shared,

    /// Clear the marker after the first failure; later failures before a new
    /// marker are unattributed.
    ConsumeOnce,
}

struct PendingFatal {
    test: String,
    line: usize,
    lines: Vec<String>,
}

/// Lazy iterator over the failures in a log stream.
///
/// Yields `Err(PostError::UnattributedFailure)` for a failure seen while no
/// test marker is active and keeps scanning afterwards. A read error is
/// yielded once as `Err(PostError::Io)` and ends the iteration.
pub struct FailureScanner<R> {
    lines: Lines<R>,
    signatures: Signatures,
    policy: MarkerPolicy,
    package: String,
    line_no: usize,
    current_test: Option<String>,
    pending: Option<PendingFatal>,
    carried: Option<String>,
    done: bool,
}

impl<R: BufRead> FailureScanner<R> {
    /// Scan `input`, attributing every failure to `package`.
    pub fn new(input: R, package: impl Into<String>) -> Self {
        Self {
            lines: input.lines(),
            signatures: Signatures::new(),
            policy: MarkerPolicy::default(),
            package: package.into(),
            line_no: 0,
            current_test: None,
            pending: None,
            carried: None,
            done: false,
        }
    }

    pub fn with_policy(mut self, policy: MarkerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Number of lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.line_no
    }

    fn next_line(&mut self) -> Option<std::io::Result<String>> {
        // A carried line was already counted when it was first read.
        if let Some(line) = self.carried.take() {
            return Some(Ok(line));
        }
        let line = self.lines.next()?;
        if line.is_ok() {
            self.line_no += 1;
        }
        Some(line)
    }

    fn attribute(&mut self) -> Option<String> {
        match self.policy {
            MarkerPolicy::Shared => self.current_test.clone(),
            MarkerPolicy::ConsumeOnce => self.current_test.take(),
        }
    }

    fn record(
        &self,
        test: String,
        signature: Signature,
        line: usize,
        excerpt: String,
    ) -> FailureRecord {
        debug!(
            package = %self.package,
            test = %test,
            signature = %signature,
            line,
            "Matched failure signature"
        );
        FailureRecord {
            package: self.package.clone(),
            test,
            excerpt,
            signature,
            line,
        }
    }

    fn finish_fatal(&self, mut pending: PendingFatal) -> FailureRecord {
        while pending
            .lines
            .last()
            .is_some_and(|line| line.trim().is_empty())
        {
            pending.lines.pop();
        }
        self.record(
            pending.test,
            Signature::Fatal,
            pending.line,
            pending.lines.join("\n"),
        )
    }
}

impl<R: BufRead> Iterator for FailureScanner<R> {
    type Item = Result<FailureRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let line = match self.next_line() {
                Some(Ok(line)) => line,
                Some(Err(err)) => {
                    self.done = true;
                    self.pending = None;
                    return Some(Err(PostError::Io(err)));
                }
                None => {
                    self.done = true;
                    let pending = self.pending.take()?;
                    return Some(Ok(self.finish_fatal(pending)));
                }
            };

            let kind = self.signatures.classify(&line);

            if let Some(pending) = self.pending.as_mut() {
                if kind == LineKind::Other {
                    pending.lines.push(line);
                    continue;
                }
                // The trace ended; this line is looked at again on the next call.
                self.carried = Some(line);
                let pending = self.pending.take()?;
                return Some(Ok(self.finish_fatal(pending)));
            }

            match kind {
                LineKind::TestStarted(name) => {
                    self.current_test = Some(name.to_string());
                }
                LineKind::TestFinished(name) => {
                    if self.current_test.as_deref() == Some(name) {
                        self.current_test = None;
                    }
                }
                LineKind::Failure(signature) => {
                    let at = self.line_no;
                    let Some(test) = self.attribute() else {
                        return Some(Err(PostError::UnattributedFailure {
                            signature,
                            line: at,
                        }));
                    };
                    match signature {
                        Signature::ConditionTimeout => {
                            return Some(Ok(self.record(test, signature, at, line)));
                        }
                        Signature::Fatal => {
                            self.pending = Some(PendingFatal {
                                test,
                                line: at,
                                lines: vec![line],
                            });
                        }
                    }
                }
                LineKind::Summary | LineKind::Other => {}
            }
        }
    }
}
