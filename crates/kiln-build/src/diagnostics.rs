//! Compiler diagnostic parsing
//!
//! Turns the compiler's text output into structured issues. A diagnostic
//! looks like:
//!
//! ```text
//! sources/Empty.java:1: error: class Class1 is public, should be declared in a file named Class1.java
//! public class Class1
//!        ^
//! 1 error
//! ```
//!
//! The header line carries path, line, type and message; the next line
//! repeats the offending source and the one after marks the column with `^`.
//! Indented follow-up lines (`symbol:`, `location:`, `where T is a
//! type-variable:` blocks) and summary lines are context and are dropped.
//! Parsing never fails: unrecognized text just produces no issues.

use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

/// One diagnostic reported by the compiler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticIssue {
    /// Source path, forward-slash separated
    pub path: Option<String>,
    /// 1-based line, as reported by the compiler
    pub line: Option<u32>,
    /// 1-based column of the caret marker
    pub column: Option<u32>,
    /// Severity label such as `error`, `warning` or `Note`
    pub kind: Option<String>,
    pub message: Option<String>,
}

impl DiagnosticIssue {
    pub fn is_error(&self) -> bool {
        self.kind_is("error")
    }

    pub fn is_warning(&self) -> bool {
        self.kind_is("warning")
    }

    fn kind_is(&self, expected: &str) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|kind| kind.eq_ignore_ascii_case(expected))
    }
}

impl fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}", path)?;
            if let Some(line) = self.line {
                write!(f, ":{}", line)?;
                if let Some(column) = self.column {
                    write!(f, ":{}", column)?;
                }
            }
            write!(f, ": ")?;
        }
        if let Some(kind) = &self.kind {
            write!(f, "{}: ", kind)?;
        }
        write!(f, "{}", self.message.as_deref().unwrap_or_default())
    }
}

fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<path>\S.*?):(?P<line>\d+): (?P<kind>[A-Za-z][A-Za-z ]*?): (?P<message>.*)$")
            .unwrap_or_else(|e| unreachable!("invalid diagnostic header pattern: {}", e))
    })
}

fn summary_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d+ (?:error|warning)s?$")
            .unwrap_or_else(|e| unreachable!("invalid diagnostic summary pattern: {}", e))
    })
}

enum ParseState {
    /// Looking for a header line
    Start,
    /// Header seen; the next line is the source snippet
    AwaitingSnippet(DiagnosticIssue),
    /// Snippet seen; the next line should be the caret marker
    AwaitingCaret(DiagnosticIssue),
}

/// Lazy, single-pass parser over compiler output lines
pub struct DiagnosticParser<I> {
    lines: I,
    state: ParseState,
    base_folder: Option<String>,
}

impl<I, S> DiagnosticParser<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    pub fn new(lines: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            lines: lines.into_iter(),
            state: ParseState::Start,
            base_folder: None,
        }
    }

    /// Report paths under `folder` relative to it
    pub fn with_base_folder(mut self, folder: &Path) -> Self {
        let folder = normalize_separators(&folder.to_string_lossy());
        let folder = folder.trim_end_matches('/');
        self.base_folder = (!folder.is_empty()).then(|| format!("{}/", folder));
        self
    }

    fn parse_header(&self, line: &str) -> Option<DiagnosticIssue> {
        let captures = header_pattern().captures(line)?;
        let line_number = captures["line"].parse::<u32>().ok()?;

        Some(DiagnosticIssue {
            path: Some(self.normalize_path(&captures["path"])),
            line: Some(line_number),
            column: None,
            kind: Some(captures["kind"].to_string()),
            message: Some(captures["message"].to_string()),
        })
    }

    fn normalize_path(&self, path: &str) -> String {
        let path = normalize_separators(path);
        let path = match &self.base_folder {
            Some(base) => path.strip_prefix(base.as_str()).unwrap_or(&path),
            None => &path,
        };
        path.strip_prefix("./").unwrap_or(path).to_string()
    }
}

impl<I, S> Iterator for DiagnosticParser<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = DiagnosticIssue;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(line) = self.lines.next() else {
                // Flush a diagnostic whose context was cut off
                return match std::mem::replace(&mut self.state, ParseState::Start) {
                    ParseState::Start => None,
                    ParseState::AwaitingSnippet(issue) | ParseState::AwaitingCaret(issue) => {
                        Some(issue)
                    }
                };
            };
            let line = line.as_ref().trim_end_matches('\r');

            match std::mem::replace(&mut self.state, ParseState::Start) {
                ParseState::Start => {
                    if let Some(issue) = self.parse_header(line) {
                        self.state = ParseState::AwaitingSnippet(issue);
                    }
                }
                ParseState::AwaitingSnippet(issue) => {
                    if summary_pattern().is_match(line) {
                        return Some(issue);
                    }
                    if let Some(next) = self.parse_header(line) {
                        self.state = ParseState::AwaitingSnippet(next);
                        return Some(issue);
                    }
                    self.state = ParseState::AwaitingCaret(issue);
                }
                ParseState::AwaitingCaret(mut issue) => {
                    if let Some(column) = caret_column(line) {
                        issue.column = Some(column);
                    } else if let Some(next) = self.parse_header(line) {
                        self.state = ParseState::AwaitingSnippet(next);
                    }
                    return Some(issue);
                }
            }
        }
    }
}

/// Parse the lines of a block of compiler output
pub fn parse_output(text: &str) -> DiagnosticParser<std::str::Lines<'_>> {
    DiagnosticParser::new(text.lines())
}

/// 1-based column of a caret marker line, if `line` is one
fn caret_column(line: &str) -> Option<u32> {
    let marker = line.trim_start();
    if !marker.starts_with('^') || !marker[1..].trim().is_empty() {
        return None;
    }
    let leading = line.chars().take_while(|c| c.is_whitespace()).count();
    u32::try_from(leading + 1).ok()
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}
