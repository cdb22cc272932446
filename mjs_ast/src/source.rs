use std::fmt;
use std::rc::Rc;

/// The three conformance levels this interpreter supports. Every lexer and
/// parser decision that differs across editions (keyword set, whitespace
/// categories, escape forms, strict mode) is gated on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Version {
    Es1,
    Es3,
    Es5,
}

impl Version {
    pub fn at_least(self, other: Version) -> bool {
        self >= other
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Version::Es1 => "es1",
            Version::Es3 => "es3",
            Version::Es5 => "es5",
        })
    }
}

/// Strips Unicode format-control (`Cf`) characters from ES3 source text
/// before lexing. ES5 instead permits these inside identifiers and string
/// literals, so stripping only happens for the ES3 tier.
fn strip_format_control_characters(text: &str) -> String {
    text.chars()
        .filter(|c| !is_format_control(*c))
        .collect()
}

fn is_format_control(c: char) -> bool {
    // Conservative `Cf` approximation covering the characters that actually
    // show up in JS source: soft hyphen, the bidi controls, and the
    // zero-width joiner/non-joiner/BOM.
    matches!(
        c,
        '\u{00AD}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{FEFF}'
    )
}

/// A loaded source file: filename, text, and the language version it is
/// parsed under. ES3 strips format-control characters up front; ES1 and ES5
/// keep the text untouched (ES5 gives format controls meaning inside
/// identifiers and literals instead of discarding them).
#[derive(Debug)]
pub struct SourceFile {
    filename: String,
    text: String,
    version: Version,
}

impl SourceFile {
    pub fn new(filename: impl Into<String>, text: impl Into<String>, version: Version) -> Rc<Self> {
        let text = text.into();
        let text = if version == Version::Es3 {
            strip_format_control_characters(&text)
        } else {
            text
        };
        Rc::new(Self {
            filename: filename.into(),
            text,
            version,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn version(&self) -> Version {
        self.version
    }
}

/// A byte range into a [`SourceFile`], attached to every AST node for
/// diagnostics and to every lex error for position reporting.
#[derive(Debug, Clone)]
pub struct SourceExtend {
    pub file: Rc<SourceFile>,
    pub start: u32,
    pub end: u32,
}

impl SourceExtend {
    pub fn new(file: Rc<SourceFile>, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    pub fn text(&self) -> &str {
        &self.file.text()[self.start as usize..self.end as usize]
    }

    /// 1-indexed (line, column) of `self.start`, for diagnostics.
    pub fn start_position(&self) -> (u32, u32) {
        position_of(self.file.text(), self.start)
    }
}

impl fmt::Display for SourceExtend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (line, col) = self.start_position();
        write!(f, "{}:{}:{}", self.file.filename(), line, col)
    }
}

fn position_of(text: &str, offset: u32) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;
    for ch in text[..offset as usize].chars() {
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}
