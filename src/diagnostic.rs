//! Diagnostic reporting for tag source files using ariadne
use crate::library::SourceIssue;
use crate::source::SourceError;
use crate::span::Span;
use ariadne::{Color, Label, Report, ReportKind, Source};

/// One-character span at `offset`, kept inside the source
fn error_span(source: &str, offset: usize) -> Span {
    let start = offset.min(source.len().saturating_sub(1));
    Span::new(start, (start + 1).min(source.len()))
}

/// Render a source error against the file's content
pub fn report_source_error(source_name: &str, source: &str, error: &SourceError) -> String {
    let mut output = Vec::new();

    let offset = error.offset().unwrap_or(0);
    let report = match error {
        SourceError::Yaml(e) => {
            let span = error_span(source, offset);
            Report::build(ReportKind::Error, source_name, span.start)
                .with_message("Invalid YAML tag source")
                .with_label(
                    Label::new((source_name, span.range()))
                        .with_message(e.to_string())
                        .with_color(Color::Red),
                )
                .with_note("The file is skipped; references into it expand to nothing")
                .finish()
        }
        SourceError::Csv(e) => {
            let span = error_span(source, offset);
            Report::build(ReportKind::Error, source_name, span.start)
                .with_message("Invalid CSV tag source")
                .with_label(
                    Label::new((source_name, span.range()))
                        .with_message(e.to_string())
                        .with_color(Color::Red),
                )
                .with_help("Every row needs as many fields as the header")
                .finish()
        }
        SourceError::Shape(message) => Report::build(ReportKind::Error, source_name, 0)
            .with_message(format!("Unsupported tag source layout: {}", message))
            .with_help("Use a list of strings, a mapping of entries or nested mappings of lists")
            .finish(),
        SourceError::Io { .. } => Report::build(ReportKind::Error, source_name, 0)
            .with_message(error.to_string())
            .finish(),
    };

    if report
        .write((source_name, Source::from(source)), &mut output)
        .is_err()
    {
        return format!("{}: {}", source_name, error);
    }
    String::from_utf8_lossy(&output).into_owned()
}

/// Render an issue found by [`TagLibrary::check`](crate::TagLibrary::check)
pub fn report_issue(issue: &SourceIssue) -> String {
    let name = issue.path.display().to_string();
    report_source_error(&name, &issue.content, &issue.error)
}
