//! Comparison of a backend's tree dump with the expected document of a test
//!
//! The fixtures and the test serializer use slightly different formats: fixture lines start
//! with "| ", serialized lines with "|  " and the serialization starts with a line for the
//! document node. Both are converted into the same canonical text before comparing.
use crate::testing::tree_construction::diagnostics::{
    format_parse_error, ErrorMessages, NoErrorMessages,
};
use crate::testing::tree_construction::parser::TestRecord;
use crate::testing::tree_construction::result::{Failure, FailureKind};
use crate::testing::tree_construction::runner::Invocation;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

lazy_static! {
    /// An element header without a namespace: leading indentation, then "<name>"
    static ref BARE_TAG_HEADER: Regex = Regex::new(r"^(\s*)<(\S+)>").expect("tag header regex");
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ComparatorConfig {
    /// Also require that the number of parse errors matches the expected errors. Off by
    /// default, as the error messages of the fixtures are not reliable.
    pub check_parse_errors: bool,
}

/// Strips `strip` characters from every line that starts with "|"
fn convert(strip: usize, data: &str) -> String {
    data.split('\n')
        .map(|line| {
            if line.starts_with('|') {
                line.char_indices()
                    .nth(strip)
                    .map_or("", |(idx, _)| &line[idx..])
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Converts the output of the test serializer into the canonical form
pub fn convert_tree_dump(dump: &str) -> String {
    convert(3, dump)
        .split('\n')
        .skip(1)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Converts the #document section of a test into the canonical form
pub fn convert_expected(expected: &str) -> String {
    convert(2, expected)
}

/// Rewrites every bare element header into its html namespaced form (`<p>` into `<html p>`).
/// Headers that already carry a namespace are left alone, so applying this twice is the same
/// as applying it once.
pub fn namespace_expected(expected: &str) -> String {
    expected
        .split('\n')
        .map(|line| BARE_TAG_HEADER.replace(line, "${1}<html ${2}>"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct Comparator {
    config: ComparatorConfig,
    messages: Arc<dyn ErrorMessages>,
}

impl Comparator {
    #[must_use]
    pub fn new(config: ComparatorConfig) -> Self {
        Self {
            config,
            messages: Arc::new(NoErrorMessages),
        }
    }

    /// Uses the given table to render parse errors in failure messages
    #[must_use]
    pub fn with_error_messages(mut self, messages: Arc<dyn ErrorMessages>) -> Self {
        self.messages = messages;
        self
    }

    pub fn config(&self) -> ComparatorConfig {
        self.config
    }

    /// Returns the expected document in canonical form for the given namespace mode
    pub fn expected_output(&self, record: &TestRecord, namespace_mode: bool) -> String {
        let expected = convert_expected(&record.expected_document);
        if namespace_mode {
            namespace_expected(&expected)
        } else {
            expected
        }
    }

    pub fn compare(
        &self,
        record: &TestRecord,
        namespace_mode: bool,
        invocation: &Invocation,
    ) -> Result<(), Failure> {
        let expected = self.expected_output(record, namespace_mode);
        let output = convert_tree_dump(&invocation.document.serialize());

        if expected != output {
            return Err(Failure::new(
                FailureKind::OutputMismatch,
                format!(
                    "Input:\n{}\n\nExpected:\n{}\n\nReceived:\n{}",
                    record.data, expected, output
                ),
            ));
        }

        if self.config.check_parse_errors && invocation.parse_errors.len() != record.errors.len() {
            let actual = invocation
                .parse_errors
                .iter()
                .map(|e| format_parse_error(e, self.messages.as_ref()))
                .collect::<Vec<_>>();

            return Err(Failure::new(
                FailureKind::ErrorCountMismatch,
                format!(
                    "Input:\n{}\n\nExpected errors ({}):\n{}\n\nActual errors ({}):\n{}",
                    record.data,
                    record.errors.len(),
                    record.errors.join("\n"),
                    actual.len(),
                    actual.join("\n")
                ),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::tree_construction::backend::Document;
    use crate::testing::tree_construction::diagnostics::ParseErrorRecord;
    use std::collections::HashMap;
    use test_case::test_case;

    const EXPECTED: &str = "| <html>\n|   <head>\n|   <body>\n|     <p>\n|       \"One\"\n|       <b>\n|         \"Two\"";

    struct Dump(String);

    impl Document for Dump {
        fn serialize(&self) -> String {
            self.0.clone()
        }
    }

    fn record(errors: &[&str]) -> TestRecord {
        TestRecord {
            data: "<p>One<b>Two".into(),
            errors: errors.iter().map(|s| s.to_string()).collect(),
            expected_document: EXPECTED.into(),
            line: 1,
            ..TestRecord::default()
        }
    }

    fn invocation(dump: &str, parse_errors: Vec<ParseErrorRecord>) -> Invocation {
        Invocation {
            document: Box::new(Dump(dump.into())),
            warnings: vec![],
            parse_errors,
        }
    }

    /// Serializes a fixture document the way the test serializer does
    fn as_dump(expected: &str) -> String {
        let lines = expected
            .split('\n')
            .map(|line| match line.strip_prefix("| ") {
                Some(rest) => format!("|  {rest}"),
                None => line.to_string(),
            })
            .collect::<Vec<_>>();

        format!("#document\n{}", lines.join("\n"))
    }

    #[test]
    fn converts_both_formats_to_the_same_text() {
        let canonical = "<html>\n  <head>\n  <body>\n    <p>\n      \"One\"\n      <b>\n        \"Two\"";

        assert_eq!(convert_expected(EXPECTED), canonical);
        assert_eq!(convert_tree_dump(&as_dump(EXPECTED)), canonical);
    }

    #[test]
    fn multi_line_text_is_kept() {
        let expected = "| <html>\n|   <body>\n|     \"\nx\"";
        assert_eq!(convert_expected(expected), "<html>\n  <body>\n    \"\nx\"");
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let once = convert_expected(EXPECTED);
        assert_eq!(convert_expected(&once), once);

        let dump = convert_tree_dump(&as_dump(EXPECTED));
        assert_eq!(convert_expected(&dump), dump);
    }

    #[test_case("<p>", "<html p>" ; "top level")]
    #[test_case("    <b>", "    <html b>" ; "indented")]
    #[test_case("  <svg svg>", "  <svg svg>" ; "already namespaced")]
    #[test_case("<!DOCTYPE html>", "<!DOCTYPE html>" ; "doctype")]
    #[test_case("  <!-- foo -->", "  <!-- foo -->" ; "comment")]
    #[test_case("    \"<p>\"", "    \"<p>\"" ; "text")]
    #[test_case("    class=\"x\"", "    class=\"x\"" ; "attribute")]
    fn namespace_rewrite(line: &str, rewritten: &str) {
        assert_eq!(namespace_expected(line), rewritten);
    }

    #[test]
    fn namespace_rewrite_is_idempotent() {
        let once = namespace_expected(&convert_expected(EXPECTED));
        let twice = namespace_expected(&once);

        assert_eq!(once, twice);
        assert!(!twice.contains("<html html html>"));
        assert!(once.starts_with("<html html>\n  <html head>"));
    }

    #[test]
    fn matching_dump_passes() {
        let comparator = Comparator::new(ComparatorConfig::default());
        let record = record(&[]);

        let result = comparator.compare(&record, false, &invocation(&as_dump(EXPECTED), vec![]));
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn namespaced_dump_is_compared_with_rewritten_expected() {
        let comparator = Comparator::new(ComparatorConfig::default());
        let record = record(&[]);
        let namespaced = as_dump(EXPECTED)
            .replace("<html>", "<html html>")
            .replace("<head>", "<html head>")
            .replace("<body>", "<html body>")
            .replace("<p>", "<html p>")
            .replace("<b>", "<html b>");

        assert!(comparator
            .compare(&record, true, &invocation(&namespaced, vec![]))
            .is_ok());

        // A plain dump does not match the namespaced expectation
        let failure = comparator
            .compare(&record, true, &invocation(&as_dump(EXPECTED), vec![]))
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::OutputMismatch);
    }

    #[test]
    fn mismatch_reports_input_expected_and_received() {
        let comparator = Comparator::new(ComparatorConfig::default());
        let record = record(&[]);
        let dump = "#document\n|  <html>\n|    <head>\n|    <body>";

        let failure = comparator
            .compare(&record, false, &invocation(dump, vec![]))
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::OutputMismatch);
        assert!(failure.message.starts_with("Input:\n<p>One<b>Two\n\nExpected:\n<html>"));
        assert!(failure.message.ends_with("Received:\n<html>\n  <head>\n  <body>"));
    }

    #[test]
    fn error_count_is_ignored_by_default() {
        let comparator = Comparator::new(ComparatorConfig::default());
        let record = record(&["(1,3): expected-doctype-but-got-start-tag"]);

        assert!(comparator
            .compare(&record, false, &invocation(&as_dump(EXPECTED), vec![]))
            .is_ok());
    }

    #[test]
    fn error_count_is_checked_when_enabled() {
        let mut messages = HashMap::new();
        messages.insert(
            "expected-doctype-but-got-start-tag".to_string(),
            "Unexpected start tag (%(name)s). Expected DOCTYPE.".to_string(),
        );
        let comparator = Comparator::new(ComparatorConfig {
            check_parse_errors: true,
        })
        .with_error_messages(Arc::new(messages));
        let record = record(&["(1,3): expected-doctype-but-got-start-tag"]);

        let error =
            ParseErrorRecord::new(1, 3, "expected-doctype-but-got-start-tag").with_arg("name", "p");
        assert!(comparator
            .compare(&record, false, &invocation(&as_dump(EXPECTED), vec![error.clone()]))
            .is_ok());

        let failure = comparator
            .compare(
                &record,
                false,
                &invocation(&as_dump(EXPECTED), vec![error.clone(), error]),
            )
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::ErrorCountMismatch);
        assert!(failure.message.contains("Expected errors (1):"));
        assert!(failure
            .message
            .contains("Actual errors (2):\nLine: 1 Col: 3 Unexpected start tag (p). Expected DOCTYPE."));
    }
}
