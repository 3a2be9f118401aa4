//! Error types for template compilation and rendering

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Character range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Template error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("Template error: {message}")]
    Invalid { message: String },
}

impl CompileError {
    pub fn message(&self) -> &str {
        match self {
            CompileError::Syntax { message, .. } | CompileError::Invalid { message } => message,
        }
    }

    /// Location of the error in `source`, when the compiler reported one
    pub fn span(&self, source: &str) -> Option<Span> {
        let CompileError::Syntax { line, column, .. } = self else {
            return None;
        };
        let len = source.chars().count();
        let line_start: usize = source
            .split('\n')
            .take(line.saturating_sub(1))
            .map(|l| l.chars().count() + 1)
            .sum();
        let start = (line_start + column.saturating_sub(1)).min(len);
        Some(start..(start + 1).min(len.max(start)))
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let span = self.span(source).unwrap_or(0..0);
        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(self.message())
            .with_label(
                Label::new((filename, span))
                    .with_message(self.message())
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);
        if written.is_err() {
            return self.to_string();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl From<handlebars::TemplateError> for CompileError {
    fn from(err: handlebars::TemplateError) -> Self {
        let message = err.reason().to_string();
        match err.pos() {
            Some((line, column)) => CompileError::Syntax {
                line,
                column,
                message,
            },
            None => CompileError::Invalid { message },
        }
    }
}

/// Failure while rendering a compiled template with data
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Render error: {message}")]
pub struct RenderError {
    pub message: String,
}

impl From<handlebars::RenderError> for RenderError {
    fn from(err: handlebars::RenderError) -> Self {
        RenderError {
            message: err.to_string(),
        }
    }
}
