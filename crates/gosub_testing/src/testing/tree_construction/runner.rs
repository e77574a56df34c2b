use crate::testing::tree_construction::backend::{Document, ParserOptions};
use crate::testing::tree_construction::diagnostics::{capture, ParseErrorRecord, Warning};
use crate::testing::tree_construction::matrix::MatrixCell;
use crate::testing::tree_construction::result::{Failure, FailureKind};
use log::debug;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Everything a single parse produced
pub struct Invocation {
    pub document: Box<dyn Document>,
    /// Warnings emitted while parsing, in order
    pub warnings: Vec<Warning>,
    pub parse_errors: Vec<ParseErrorRecord>,
}

/// Parses the cell's input with a fresh parser of the cell's backend. Warnings are captured for
/// exactly this parse. Errors and panics from the backend are turned into a failure, so a
/// single broken input never stops the rest of the matrix.
pub fn invoke(cell: &MatrixCell) -> Result<Invocation, Failure> {
    let record = cell.record;
    let options = ParserOptions {
        namespace_html_elements: cell.namespace_mode,
    };

    debug!("parsing {}", cell.id());

    let (parsed, warnings) = capture(|| {
        panic::catch_unwind(AssertUnwindSafe(|| {
            let mut parser = cell.backend.create_parser(options);

            let document = match &record.fragment_context {
                Some(context) => parser.parse_fragment(&record.data, context),
                None => parser.parse(&record.data),
            }?;

            Ok::<_, anyhow::Error>((document, parser.errors().to_vec()))
        }))
    });

    let trace = match parsed {
        Ok(Ok((document, parse_errors))) => {
            return Ok(Invocation {
                document,
                warnings,
                parse_errors,
            })
        }
        Ok(Err(err)) => format!("{err:?}"),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };

    Err(Failure::new(
        FailureKind::BackendError,
        format!(
            "Input:\n{}\n\nExpected:\n{}\n\nTraceback:\n{}",
            record.data, record.expected_document, trace
        ),
    ))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<unknown panic payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_messages() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new(format!("index {} out of bounds", 3));
        assert_eq!(panic_message(payload.as_ref()), "index 3 out of bounds");

        let payload: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(payload.as_ref()), "<unknown panic payload>");
    }
}
