/*
 * report.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Human-readable error reports with source context.

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use crate::error::SourceError;
use crate::source::LineIndex;

impl SourceError {
    /// Render this error against the template `source` it came from,
    /// underlining the offending line.
    ///
    /// Falls back to the one-line `Display` form when the error has no line
    /// or the line is outside `source`.
    pub fn to_report(&self, source: &str) -> String {
        self.render_source_context(source)
            .unwrap_or_else(|| format!("Error: {}\n", self))
    }

    fn render_source_context(&self, source: &str) -> Option<String> {
        let line = self.line()?;
        let span = LineIndex::new(source).line_span(line)?;

        // ariadne works with character offsets, not bytes
        let start = source[..span.start].chars().count();
        let end = start + source[span.clone()].chars().count();
        let path = self.path().to_string();

        let mut report = Report::build(ReportKind::Error, path.clone(), start)
            .with_config(Config::default().with_color(false));
        report = report.with_message(format!("{}: {}", self.kind(), self.message()));
        report = report.with_label(
            Label::new((path.clone(), start..end))
                .with_message(self.message())
                .with_color(Color::Red),
        );
        if let Some(cause) = self.cause() {
            report = report.with_note(cause.to_string());
        }

        let report = report.finish();
        let mut output = Vec::new();
        report
            .write((path, Source::from(source)), &mut output)
            .ok()?;
        String::from_utf8(output).ok()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::SourceError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_report_shows_source_line() {
        let source = "<h1>{{ title }}</h1>\n{% if draft %}\nbody\n";
        let err = SourceError::document("`if` tag opened on line 2 was never closed", 2)
            .in_path("page.liquid");
        let report = err.to_report(source);

        assert!(report.contains("page.liquid"));
        assert!(report.contains("was never closed"));
        assert!(report.contains("{% if draft %}"));
        assert!(!report.contains("<h1>"));
    }

    #[test]
    fn test_report_handles_multibyte_text() {
        let source = "héllo wörld\n{{ x | nope }}";
        let err = SourceError::evaluation("undefined filter `nope`", 2);
        let report = err.to_report(source);
        assert!(report.contains("{{ x | nope }}"));
        assert!(report.contains("<template>"));
    }

    #[test]
    fn test_report_without_line_falls_back() {
        let err = SourceError::new(crate::error::ErrorKind::HostIntegration, "no loader");
        assert_eq!(
            err.to_report("anything"),
            format!("Error: {}\n", err)
        );
    }

    #[test]
    fn test_report_line_out_of_range_falls_back() {
        let err = SourceError::lex("unterminated tag", 9);
        assert!(err.to_report("one line").starts_with("Error: "));
    }
}
