//! Accumulates linter output chunks into a single run outcome.
//!
//! Output arrives as arbitrary chunks from stdout and stderr. Each stream is
//! collected in full and the pattern runs once over it when the process has
//! exited, so a match may span lines regardless of where chunks were cut.

use crate::diagnostics::{Diagnostic, Severity};
use crate::profile::ResolvedProfile;
use regex::Regex;
use std::sync::OnceLock;

static DAEMON_ERROR_PATTERN: OnceLock<Regex> = OnceLock::new();

fn daemon_error_pattern() -> &'static Regex {
    DAEMON_ERROR_PATTERN.get_or_init(|| {
        Regex::new(r"(?mR)^((?:Error response from daemon: |Cannot connect to the Docker daemon).*)$")
            .unwrap()
    })
}

/// Return the first docker daemon error line found in `output`, if any.
pub fn detect_daemon_error(output: &str) -> Option<String> {
    daemon_error_pattern()
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Information diagnostic on the first line summarising how the linter exited.
pub fn exit_status_diagnostic(profile: &str, exit_code: Option<i32>, output: &str) -> Diagnostic {
    let mut message = match exit_code {
        Some(code) => format!("{profile} exited with code {code}"),
        None => format!("{profile} was terminated by a signal"),
    };
    let output = output.trim_end();
    if !output.is_empty() {
        message.push_str("\n\n");
        message.push_str(output);
    }
    Diagnostic::whole_line(0, Severity::Information, message)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// A piece of raw output as read from the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub stream: Stream,
    pub bytes: Vec<u8>,
}

impl OutputChunk {
    pub fn stdout(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            stream: Stream::Stdout,
            bytes: bytes.into(),
        }
    }

    pub fn stderr(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            stream: Stream::Stderr,
            bytes: bytes.into(),
        }
    }
}

/// Holds back a trailing partial line until the rest of it arrives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append `bytes` and return every complete line buffered so far.
    pub fn push(&mut self, bytes: &[u8]) -> Option<String> {
        self.pending.extend_from_slice(bytes);
        let last_newline = self.pending.iter().rposition(|b| *b == b'\n')?;
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);
        Some(String::from_utf8_lossy(&complete).into_owned())
    }

    /// Return whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Everything learned from one linter run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub diagnostics: Vec<Diagnostic>,
    /// Set when docker itself reported a failure; the diagnostics are then
    /// only those extracted from the output.
    pub daemon_error: Option<String>,
    pub exit_code: Option<i32>,
    /// Combined raw output in arrival order.
    pub output: String,
}

/// Text of one output stream, decoded a complete line at a time.
#[derive(Debug, Default)]
struct StreamText {
    buffer: LineBuffer,
    text: String,
}

/// Consumes output chunks for a single run of `profile`.
pub struct RunCollector<'a> {
    profile: &'a ResolvedProfile,
    stdout: StreamText,
    stderr: StreamText,
    output: String,
}

impl<'a> RunCollector<'a> {
    pub fn new(profile: &'a ResolvedProfile) -> Self {
        Self {
            profile,
            stdout: StreamText::default(),
            stderr: StreamText::default(),
            output: String::new(),
        }
    }

    pub fn push(&mut self, chunk: &OutputChunk) {
        let stream = match chunk.stream {
            Stream::Stdout => &mut self.stdout,
            Stream::Stderr => &mut self.stderr,
        };
        if let Some(text) = stream.buffer.push(&chunk.bytes) {
            stream.text.push_str(&text);
            self.output.push_str(&text);
        }
    }

    /// Extract from each stream once it is complete. Diagnostics are
    /// concatenated stdout first, then stderr.
    pub fn finish(mut self, exit_code: Option<i32>) -> RunOutcome {
        let mut diagnostics = Vec::new();
        for stream in [&mut self.stdout, &mut self.stderr] {
            if let Some(rest) = stream.buffer.finish() {
                stream.text.push_str(&rest);
                self.output.push_str(&rest);
            }
            diagnostics.extend(self.profile.extractor.extract(&stream.text));
        }

        let daemon_error = detect_daemon_error(&self.output);
        if daemon_error.is_none() && self.profile.report_exit_status {
            diagnostics.push(exit_status_diagnostic(
                self.profile.name.as_str(),
                exit_code,
                &self.output,
            ));
        }

        RunOutcome {
            diagnostics,
            daemon_error,
            exit_code,
            output: self.output,
        }
    }
}
