//! Output formatting.

use crate::cli::OutputFormat;
use camino::Utf8Path;
use doc_tree::{LineCol, LineIndex, Span};
use marker_expand::{ExpandWarning, ExpandWarningKind};
use markup_parser::ParseError;
use serde::Serialize;

/// A build diagnostic tied to a position in one source document.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// The severity.
    pub severity: Severity,
    /// The message.
    pub message: String,
    /// A short machine-friendly code.
    pub code: &'static str,
    /// Where in the source it happened.
    pub span: Span,
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn from_parse_error(error: &ParseError) -> Self {
        Self {
            severity: Severity::Error,
            message: error.to_string(),
            code: "parse-error",
            span: error.span,
        }
    }

    pub fn from_warning(warning: &ExpandWarning) -> Self {
        let code = match warning.kind {
            ExpandWarningKind::UnknownComponent { .. } => "unknown-component",
            ExpandWarningKind::MalformedMarker { .. } => "malformed-marker",
            ExpandWarningKind::MissingEndMarker { .. } => "missing-end-marker",
            ExpandWarningKind::StrayEndMarker { .. } => "stray-end-marker",
        };
        Self {
            severity: Severity::Warning,
            message: warning.kind.to_string(),
            code,
            span: warning.span,
        }
    }
}

/// A formatted diagnostic for JSON output.
#[derive(Debug, Serialize)]
pub struct FormattedDiagnostic {
    /// The diagnostic type (Error or Warning).
    #[serde(rename = "type")]
    pub diagnostic_type: String,
    /// The file path.
    pub filename: String,
    /// The start position.
    pub start: Position,
    /// The end position.
    pub end: Position,
    /// The message.
    pub message: String,
    /// The diagnostic code.
    pub code: String,
}

/// A position in the source.
#[derive(Debug, Serialize)]
pub struct Position {
    /// 1-indexed line number.
    pub line: u32,
    /// 1-indexed column number.
    pub column: u32,
    /// Byte offset.
    pub offset: u32,
}

/// Formats diagnostics for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a collection of diagnostics for one file.
    pub fn format(&self, diagnostics: &[Diagnostic], file_path: &Utf8Path, source: &str) -> String {
        match self.format {
            OutputFormat::Human => self.format_human(diagnostics, file_path, source),
            OutputFormat::HumanVerbose => self.format_human_verbose(diagnostics, file_path, source),
            OutputFormat::Json => self.format_json(diagnostics, file_path, source),
            OutputFormat::Machine => self.format_machine(diagnostics, file_path, source),
        }
    }

    fn format_human(
        &self,
        diagnostics: &[Diagnostic],
        file_path: &Utf8Path,
        source: &str,
    ) -> String {
        let line_index = LineIndex::new(source);
        let mut output = String::new();

        for diag in diagnostics {
            let start = line_index
                .line_col(diag.span.start)
                .unwrap_or(LineCol::new(0, 0));

            output.push_str(&format!(
                "{}:{}:{}\n{}: {} ({})\n\n",
                file_path,
                start.line + 1,
                start.col + 1,
                severity_name(diag.severity),
                diag.message,
                diag.code
            ));
        }

        output
    }

    fn format_human_verbose(
        &self,
        diagnostics: &[Diagnostic],
        file_path: &Utf8Path,
        source: &str,
    ) -> String {
        let line_index = LineIndex::new(source);
        let lines: Vec<&str> = source.lines().collect();
        let mut output = String::new();

        for diag in diagnostics {
            let start = line_index
                .line_col(diag.span.start)
                .unwrap_or(LineCol::new(0, 0));

            output.push_str(&format!(
                "{}:{}:{}\n{}: {} ({})\n",
                file_path,
                start.line + 1,
                start.col + 1,
                severity_name(diag.severity),
                diag.message,
                diag.code
            ));

            let line_num = start.line as usize;
            if line_num < lines.len() {
                output.push_str(&format!("  {} | {}\n", line_num + 1, lines[line_num]));

                let padding = " ".repeat(start.col as usize);
                output.push_str(&format!(
                    "  {} | {}^\n",
                    " ".repeat((line_num + 1).to_string().len()),
                    padding
                ));
            }

            output.push('\n');
        }

        output
    }

    fn format_json(
        &self,
        diagnostics: &[Diagnostic],
        file_path: &Utf8Path,
        source: &str,
    ) -> String {
        let formatted = Self::format_json_diagnostics(diagnostics, file_path, source);
        serde_json::to_string_pretty(&formatted).unwrap_or_default()
    }

    /// Formats diagnostics into JSON-ready structs.
    pub fn format_json_diagnostics(
        diagnostics: &[Diagnostic],
        file_path: &Utf8Path,
        source: &str,
    ) -> Vec<FormattedDiagnostic> {
        let line_index = LineIndex::new(source);
        diagnostics
            .iter()
            .map(|diag| {
                let start = line_index
                    .line_col(diag.span.start)
                    .unwrap_or(LineCol::new(0, 0));
                let end = line_index
                    .line_col(diag.span.end)
                    .unwrap_or(LineCol::new(0, 0));

                FormattedDiagnostic {
                    diagnostic_type: severity_name(diag.severity).to_string(),
                    filename: file_path.to_string(),
                    start: Position {
                        line: start.line + 1,
                        column: start.col + 1,
                        offset: u32::from(diag.span.start),
                    },
                    end: Position {
                        line: end.line + 1,
                        column: end.col + 1,
                        offset: u32::from(diag.span.end),
                    },
                    message: diag.message.clone(),
                    code: diag.code.to_string(),
                }
            })
            .collect()
    }

    fn format_machine(
        &self,
        diagnostics: &[Diagnostic],
        file_path: &Utf8Path,
        source: &str,
    ) -> String {
        let line_index = LineIndex::new(source);
        let mut output = String::new();

        for diag in diagnostics {
            let start = line_index
                .line_col(diag.span.start)
                .unwrap_or(LineCol::new(0, 0));
            let end = line_index
                .line_col(diag.span.end)
                .unwrap_or(LineCol::new(0, 0));

            output.push_str(&format!(
                "{} {}:{}:{}:{}:{} {} ({})\n",
                severity_name(diag.severity).to_uppercase(),
                file_path,
                start.line + 1,
                start.col + 1,
                end.line + 1,
                end.col + 1,
                diag.message,
                diag.code
            ));
        }

        output
    }
}

fn severity_name(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "Error",
        Severity::Warning => "Warning",
    }
}

/// Summary of a build run.
#[derive(Debug, Default)]
pub struct BuildSummary {
    /// Number of documents processed.
    pub file_count: usize,
    /// Number of errors.
    pub error_count: usize,
    /// Number of warnings.
    pub warning_count: usize,
    /// Number of runtime scripts written.
    pub scripts_written: usize,
    /// Whether to fail on warnings.
    pub fail_on_warnings: bool,
}

impl BuildSummary {
    /// Formats the summary line.
    pub fn format(&self) -> String {
        let error_word = if self.error_count == 1 {
            "error"
        } else {
            "errors"
        };
        let warning_word = if self.warning_count == 1 {
            "warning"
        } else {
            "warnings"
        };
        let file_word = if self.file_count == 1 {
            "document"
        } else {
            "documents"
        };

        format!(
            "====================================\nmarkweave built {} {} with {} {} and {} {}",
            self.file_count,
            file_word,
            self.error_count,
            error_word,
            self.warning_count,
            warning_word
        )
    }
}
