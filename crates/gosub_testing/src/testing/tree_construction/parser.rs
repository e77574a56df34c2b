// See https://github.com/html5lib/html5lib-tests/tree/master/tree-construction
use gosub_shared::types::{Error, Result};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till},
    character::complete::char,
    combinator::{all_consuming, eof, map, not, opt},
    multi::many0,
    sequence::{preceded, terminated, tuple},
    Finish, IResult,
};
use nom_locate::{position, LocatedSpan};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

type Span<'a> = LocatedSpan<&'a str>;

pub const SECTION_DATA: &str = "data";
pub const SECTION_ERRORS: &str = "errors";
pub const SECTION_NEW_ERRORS: &str = "new-errors";
pub const SECTION_DOCUMENT_FRAGMENT: &str = "document-fragment";
pub const SECTION_DOCUMENT: &str = "document";
pub const FLAG_SCRIPT_ON: &str = "script-on";
pub const FLAG_SCRIPT_OFF: &str = "script-off";

const KNOWN_SECTIONS: &[&str] = &[
    SECTION_DATA,
    SECTION_ERRORS,
    SECTION_NEW_ERRORS,
    SECTION_DOCUMENT_FRAGMENT,
    SECTION_DOCUMENT,
    FLAG_SCRIPT_ON,
    FLAG_SCRIPT_OFF,
];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ScriptMode {
    ScriptOn,
    ScriptOff,
    #[default]
    Both,
}

/// A single section ("#name" followed by its body lines) as found in a fixture
#[derive(Clone, Debug, PartialEq, Eq)]
struct RawSection {
    name: String,
    line: usize,
    lines: Vec<String>,
}

/// A record as found in the fixture file, before any validation of its sections
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// Line of the "#data" header in the fixture
    pub line: usize,
    /// Section bodies by section name
    pub sections: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn section(&self, name: &str) -> Option<&str> {
        self.sections.get(name).map(String::as_str)
    }

    /// The raw input of the record. Every record has one, as records are started by it.
    pub fn data(&self) -> &str {
        self.section(SECTION_DATA).unwrap_or_default()
    }
}

/// A single tree-construction test as found in a fixture file
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestRecord {
    /// #data section
    pub data: String,
    /// #errors section, one entry per line
    pub errors: Vec<String>,
    /// #new-errors section, one entry per line
    pub new_errors: Vec<String>,
    /// #document-fragment section
    pub fragment_context: Option<String>,
    /// #document section
    pub expected_document: String,
    /// Bare marker sections (#script-on, #script-off)
    pub flags: BTreeSet<String>,
    /// Line of the "#data" header in the fixture
    pub line: usize,
}

impl TestRecord {
    /// Validates a raw record and converts it into a test. A record with both scripting flags
    /// or without an expected document is a broken fixture.
    pub fn from_raw(raw: RawRecord, path: &Path) -> Result<Self> {
        let integrity_error = |message: String| Error::FixtureIntegrity {
            path: path.to_path_buf(),
            line: raw.line,
            message,
        };

        let flags = [FLAG_SCRIPT_ON, FLAG_SCRIPT_OFF]
            .into_iter()
            .filter(|flag| raw.sections.contains_key(*flag))
            .map(str::to_string)
            .collect::<BTreeSet<_>>();

        if flags.len() > 1 {
            return Err(integrity_error(format!(
                "test has scripting enabled and disabled all at once: {:?}",
                raw.data()
            ))
            .into());
        }

        let Some(expected_document) = raw.section(SECTION_DOCUMENT) else {
            return Err(integrity_error("missing #document section".into()).into());
        };

        Ok(TestRecord {
            data: raw.data().to_string(),
            errors: split_lines(raw.section(SECTION_ERRORS)),
            new_errors: split_lines(raw.section(SECTION_NEW_ERRORS)),
            fragment_context: raw
                .section(SECTION_DOCUMENT_FRAGMENT)
                .map(|s| s.trim().to_string()),
            expected_document: expected_document.to_string(),
            flags,
            line: raw.line,
        })
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment_context.is_some()
    }

    pub fn script_mode(&self) -> ScriptMode {
        if self.flags.contains(FLAG_SCRIPT_OFF) {
            ScriptMode::ScriptOff
        } else if self.flags.contains(FLAG_SCRIPT_ON) {
            ScriptMode::ScriptOn
        } else {
            ScriptMode::Both
        }
    }

    /// Tests marked #script-off can't be run, as only scripting enabled parsing is supported
    pub fn scripting_disabled(&self) -> bool {
        self.script_mode() == ScriptMode::ScriptOff
    }
}

fn split_lines(section: Option<&str>) -> Vec<String> {
    match section {
        Some(s) if !s.is_empty() => s.split('\n').map(str::to_string).collect(),
        _ => vec![],
    }
}

/// Rest of the current line without its line ending. "\r\n", "\n" and a lone "\r" all end a line.
fn line_rest(i: Span) -> IResult<Span, Span> {
    terminated(
        take_till(|c: char| c == '\n' || c == '\r'),
        opt(alt((tag("\r\n"), tag("\n"), tag("\r")))),
    )(i)
}

fn body_line(i: Span) -> IResult<Span, Span> {
    preceded(tuple((not(eof), not(char('#')))), line_rest)(i)
}

fn heading(i: Span) -> IResult<Span, Span> {
    preceded(char('#'), line_rest)(i)
}

fn section(i: Span) -> IResult<Span, RawSection> {
    let (i, start) = position(i)?;

    map(tuple((heading, many0(body_line))), move |(name, lines)| {
        RawSection {
            name: name.trim().to_string(),
            line: start.location_line() as usize,
            lines: lines.iter().map(|l| l.fragment().to_string()).collect(),
        }
    })(i)
}

fn fixture(i: Span) -> IResult<Span, (Vec<Span>, Vec<RawSection>)> {
    all_consuming(tuple((many0(body_line), many0(section))))(i)
}

/// Parses the fixture text into raw records. Only the structure of the fixture is checked here:
/// unknown section headers, sections outside a record and text before the first section abort
/// loading the whole file.
pub fn parse_fixture(path: &Path, input: &str) -> Result<Vec<RawRecord>> {
    let integrity_error = |line: usize, message: String| Error::FixtureIntegrity {
        path: path.to_path_buf(),
        line,
        message,
    };

    let (_, (preamble, sections)) = fixture(Span::new(input))
        .finish()
        .map_err(|err| integrity_error(err.input.location_line() as usize, err.to_string()))?;

    if let Some(text) = preamble.iter().find(|l| !l.trim().is_empty()) {
        return Err(integrity_error(
            text.location_line() as usize,
            "text found before the first section".into(),
        )
        .into());
    }

    let mut records: Vec<RawRecord> = vec![];
    let mut sections = sections.into_iter().peekable();
    while let Some(mut section) = sections.next() {
        if !KNOWN_SECTIONS.contains(&section.name.as_str()) {
            return Err(integrity_error(
                section.line,
                format!("malformed section header '#{}'", section.name),
            )
            .into());
        }

        if section.name == SECTION_DATA {
            records.push(RawRecord {
                line: section.line,
                sections: BTreeMap::new(),
            });
        }

        let Some(record) = records.last_mut() else {
            return Err(integrity_error(
                section.line,
                format!("section '#{}' found before any #data section", section.name),
            )
            .into());
        };

        if record.sections.contains_key(&section.name) {
            return Err(integrity_error(
                section.line,
                format!("duplicate section '#{}'", section.name),
            )
            .into());
        }

        // Records are separated by blank lines, which end up in the last section of a record
        let ends_record = sections
            .peek()
            .map_or(true, |next| next.name == SECTION_DATA);
        if ends_record {
            while section.lines.last().is_some_and(String::is_empty) {
                section.lines.pop();
            }
        }

        record.sections.insert(section.name, section.lines.join("\n"));
    }

    Ok(records)
}
