//! Failure signatures recognized in stress logs.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Known classes of stress-test failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Signature {
    /// `<file>:<line>: <path>, condition failed to evaluate within <duration>: <message>`
    ConditionTimeout,

    /// `FYYMMDD HH:MM:SS.micros ...` glog fatal line, followed by its trace.
    Fatal,
}

impl Signature {
    /// Get the signature name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Signature::ConditionTimeout => "condition_timeout",
            Signature::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How a single log line was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `=== RUN`, `=== CONT` or `--- FAIL:` naming the test whose output follows.
    TestStarted(&'a str),

    /// `--- PASS:` or `--- SKIP:`; the named test produced no failure.
    TestFinished(&'a str),

    /// A failure signature.
    Failure(Signature),

    /// `PASS`, `FAIL`, `ok  <pkg>`, `[ERROR: ]exit status N`: the package run is over.
    Summary,

    /// Anything else.
    Other,
}

/// Compiled patterns for every line shape the scanner cares about.
#[derive(Debug, Clone)]
pub struct Signatures {
    started: Regex,
    finished: Regex,
    timeout: Regex,
    fatal: Regex,
    summary: Regex,
}

impl Signatures {
    pub fn new() -> Self {
        Self {
            started: compile(r"^\s*(?:=== (?:RUN|CONT)\s+|--- FAIL: )(\S+)"),
            finished: compile(r"^\s*--- (?:PASS|SKIP): (\S+)"),
            timeout: compile(
                r"^\s*\S+:\d+: \S+, condition failed to evaluate within \S+: ",
            ),
            fatal: compile(r"^F\d{6} \d{2}:\d{2}:\d{2}\.\d{6} "),
            summary: compile(r"^(?:PASS|FAIL)(?:\s|$)|^ok\s|^(?:ERROR: )?exit status \d+"),
        }
    }

    /// Classify one line of log output.
    pub fn classify<'a>(&self, line: &'a str) -> LineKind<'a> {
        if let Some(caps) = self.started.captures(line) {
            if let Some(name) = caps.get(1) {
                return LineKind::TestStarted(name.as_str());
            }
        }
        if let Some(caps) = self.finished.captures(line) {
            if let Some(name) = caps.get(1) {
                return LineKind::TestFinished(name.as_str());
            }
        }
        if self.timeout.is_match(line) {
            return LineKind::Failure(Signature::ConditionTimeout);
        }
        if self.fatal.is_match(line) {
            return LineKind::Failure(Signature::Fatal);
        }
        if self.summary.is_match(line) {
            return LineKind::Summary;
        }
        LineKind::Other
    }
}

impl Default for Signatures {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in signature pattern must compile")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_names() {
        assert_eq!(Signature::ConditionTimeout.name(), "condition_timeout");
        assert_eq!(Signature::Fatal.name(), "fatal");
        assert_eq!(Signature::Fatal.to_string(), "fatal");
    }

    #[test]
    fn test_classify_markers() {
        let sigs = Signatures::new();
        assert_eq!(
            sigs.classify("=== RUN   TestReplicateQueueRebalance"),
            LineKind::TestStarted("TestReplicateQueueRebalance")
        );
        assert_eq!(
            sigs.classify("=== CONT  TestRaftRemoveRace"),
            LineKind::TestStarted("TestRaftRemoveRace")
        );
        assert_eq!(
            sigs.classify("--- FAIL: TestReplicateQueueRebalance (45.33s)"),
            LineKind::TestStarted("TestReplicateQueueRebalance")
        );
        assert_eq!(
            sigs.classify("    --- PASS: TestFoo/bar (0.01s)"),
            LineKind::TestFinished("TestFoo/bar")
        );
        assert_eq!(
            sigs.classify("--- SKIP: TestBaz (0.00s)"),
            LineKind::TestFinished("TestBaz")
        );
    }

    #[test]
    fn test_classify_condition_timeout() {
        let sigs = Signatures::new();
        let line = "\t<autogenerated>:12: storage/replicate_queue_test.go:103, condition failed to evaluate within 45s: not balanced: [10 1 10 1 8]";
        assert_eq!(
            sigs.classify(line),
            LineKind::Failure(Signature::ConditionTimeout)
        );
    }

    #[test]
    fn test_classify_fatal() {
        let sigs = Signatures::new();
        let line = "F161007 00:27:33.243126 449 storage/store.go:2446  [s3] could not remove placeholder";
        assert_eq!(sigs.classify(line), LineKind::Failure(Signature::Fatal));

        // Info and warning lines share the timestamp format but are not fatal.
        let info = "I161007 00:27:33.243126 449 storage/store.go:2446  [s3] all good";
        assert_eq!(sigs.classify(info), LineKind::Other);

        // A word that merely starts with F is not a fatal line.
        assert_eq!(sigs.classify("Finished setup"), LineKind::Other);
    }

    #[test]
    fn test_classify_summary() {
        let sigs = Signatures::new();
        assert_eq!(sigs.classify("PASS"), LineKind::Summary);
        assert_eq!(sigs.classify("FAIL"), LineKind::Summary);
        assert_eq!(
            sigs.classify("FAIL\tgithub.com/cockroachdb/cockroach/storage\t3.123s"),
            LineKind::Summary
        );
        assert_eq!(
            sigs.classify("ok  \tgithub.com/cockroachdb/cockroach/util\t0.012s"),
            LineKind::Summary
        );
        assert_eq!(sigs.classify("exit status 255"), LineKind::Summary);
        assert_eq!(sigs.classify("ERROR: exit status 255"), LineKind::Summary);
        assert_eq!(sigs.classify("FAILED to connect"), LineKind::Other);
    }
}
