// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::*;
use core::cmp;
use core::fmt::{self, Debug, Formatter};
use core::iter::Peekable;
use core::ops::RangeInclusive;
use core::str::CharIndices;

use anyhow::{anyhow, bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    File,
    None,
    Synthetic,
}

#[derive(Clone)]
struct SourceInternal {
    pub file: String,
    pub contents: String,
    pub lines: Vec<(u32, u32)>,
    kind: SourceKind,
}

#[derive(Clone)]
pub struct Source {
    src: Rc<SourceInternal>,
}

impl cmp::Ord for Source {
    fn cmp(&self, other: &Source) -> cmp::Ordering {
        Rc::as_ptr(&self.src).cmp(&Rc::as_ptr(&other.src))
    }
}

impl cmp::PartialOrd for Source {
    fn partial_cmp(&self, other: &Source) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl cmp::PartialEq for Source {
    fn eq(&self, other: &Source) -> bool {
        Rc::as_ptr(&self.src) == Rc::as_ptr(&other.src)
    }
}

impl cmp::Eq for Source {}

impl std::hash::Hash for Source {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.src).hash(state)
    }
}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        self.src.file.fmt(f)
    }
}

impl Source {
    pub fn from_contents(file: String, contents: String) -> Result<Source> {
        let max_size = u32::MAX as usize - 2; // Account for rows, cols possibly starting at 1, EOF etc.
        if contents.len() > max_size {
            bail!("{file} exceeds maximum allowed script size {max_size}");
        }
        let mut lines = vec![];
        let mut prev_ch = ' ';
        let mut prev_pos = 0u32;
        let mut start = 0u32;
        for (i, ch) in contents.char_indices() {
            if ch == '\n' {
                let end = match prev_ch {
                    '\r' => prev_pos,
                    _ => i as u32,
                };
                lines.push((start, end));
                start = i as u32 + 1;
            }
            prev_ch = ch;
            prev_pos = i as u32;
        }
        // The text after the last line break is a line too, even when empty.
        lines.push((start, contents.len() as u32));

        Ok(Self {
            src: Rc::new(SourceInternal {
                file,
                contents,
                lines,
                kind: SourceKind::File,
            }),
        })
    }

    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Source> {
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => bail!("Failed to read {}. {e}", path.as_ref().display()),
        };
        Self::from_contents(path.as_ref().to_string_lossy().to_string(), contents)
    }

    fn sentinel(file: &str, kind: SourceKind) -> Source {
        Self {
            src: Rc::new(SourceInternal {
                file: file.to_string(),
                contents: String::new(),
                lines: vec![(0, 0)],
                kind,
            }),
        }
    }

    pub fn file(&self) -> &String {
        &self.src.file
    }

    pub fn contents(&self) -> &String {
        &self.src.contents
    }

    pub fn line_count(&self) -> u32 {
        self.src.lines.len() as u32
    }

    /// Text of the 1-based line `line`, without its line terminator.
    pub fn line(&self, line: u32) -> &str {
        match (line as usize).checked_sub(1) {
            Some(idx) if idx < self.src.lines.len() => {
                let (start, end) = self.src.lines[idx];
                &self.src.contents[start as usize..end as usize]
            }
            _ => "",
        }
    }

    fn line_index(&self, offset: u32) -> usize {
        match self.src.lines.binary_search_by(|(start, _)| start.cmp(&offset)) {
            Ok(idx) => idx,
            Err(0) => 0,
            Err(idx) => idx - 1,
        }
    }

    /// 1-based line containing a byte offset. The offset may fall inside a
    /// multi-byte character.
    pub fn line_of(&self, offset: u32) -> u32 {
        self.line_index(offset) as u32 + 1
    }

    /// 1-based line and column of a byte offset. Columns count characters.
    /// An offset inside a character is moved back to the start of it.
    pub fn position(&self, offset: u32) -> (u32, u32) {
        let idx = self.line_index(offset);
        let line_start = self.src.lines[idx].0 as usize;
        let contents = &self.src.contents;
        let mut offset = (offset as usize).min(contents.len()).max(line_start);
        while !contents.is_char_boundary(offset) {
            offset -= 1;
        }
        let col = contents[line_start..offset].chars().count() as u32 + 1;
        (idx as u32 + 1, col)
    }

    pub fn message(&self, line: u32, col: u32, kind: &str, msg: &str) -> String {
        if line == 0 || line as usize > self.src.lines.len() {
            return format!("{}: invalid line {} specified", self.src.file, line);
        }

        let line_str = format!("{line}");
        let line_num_width = line_str.len() + 1;
        let col_spaces = col.saturating_sub(1) as usize;

        format!(
            "\n--> {}:{}:{}\n{:<line_num_width$}|\n\
		{:<line_num_width$}| {}\n\
		{:<line_num_width$}| {:<col_spaces$}^\n\
		{}: {}",
            self.src.file,
            line,
            col,
            "",
            line,
            self.line(line),
            "",
            "",
            kind,
            msg
        )
    }

    pub fn error(&self, line: u32, col: u32, msg: &str) -> anyhow::Error {
        anyhow!(self.message(line, col, "error", msg))
    }
}

#[derive(Clone)]
pub struct Span {
    pub source: Source,
    pub line: u32,
    pub col: u32,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(source: Source, start: u32, end: u32) -> Span {
        let (line, col) = source.position(start);
        Span {
            source,
            line,
            col,
            start,
            end,
        }
    }

    /// Span of nodes that have no backing text, such as schema defaults.
    pub fn none() -> Span {
        Span::new(Source::sentinel("<none>", SourceKind::None), 0, 0)
    }

    /// Span of programmatically created nodes.
    pub fn synthetic() -> Span {
        Span::new(Source::sentinel("<synthetic>", SourceKind::Synthetic), 0, 0)
    }

    pub fn is_none(&self) -> bool {
        self.source.src.kind == SourceKind::None
    }

    pub fn is_synthetic(&self) -> bool {
        self.source.src.kind == SourceKind::Synthetic
    }

    pub fn text(&self) -> &str {
        &self.source.contents()[self.start as usize..self.end as usize]
    }

    /// Span from the start of `self` to the end of `other`.
    pub fn to(&self, other: &Span) -> Span {
        Span {
            source: self.source.clone(),
            line: self.line,
            col: self.col,
            start: self.start,
            end: other.end,
        }
    }

    pub fn end_line(&self) -> u32 {
        self.source.line_of(self.end)
    }

    pub fn end_col(&self) -> u32 {
        self.source.position(self.end).1
    }

    pub fn line_range(&self) -> RangeInclusive<u32> {
        self.line..=self.end_line()
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.source == other.source && self.start <= other.start && other.end <= self.end
    }

    pub fn message(&self, kind: &str, msg: &str) -> String {
        self.source.message(self.line, self.col, kind, msg)
    }

    pub fn error(&self, msg: &str) -> anyhow::Error {
        self.source.error(self.line, self.col, msg)
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let t = self.text().escape_debug().to_string();
        let max = 32;
        let (txt, trailer) = if t.len() > max {
            let mut cut = max;
            while !t.is_char_boundary(cut) {
                cut -= 1;
            }
            (&t[0..cut], "...")
        } else {
            (t.as_str(), "")
        };

        f.write_fmt(format_args!(
            "{}:{}:{}:{}, \"{}{}\"",
            self.line, self.col, self.start, self.end, txt, trailer
        ))
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenKind {
    Symbol,
    String,
    Number,
    Ident,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token(pub TokenKind, pub Span);

#[derive(Clone)]
pub struct Lexer<'source> {
    source: Source,
    iter: Peekable<CharIndices<'source>>,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source Source) -> Self {
        Self {
            source: source.clone(),
            iter: source.contents().char_indices().peekable(),
        }
    }

    fn peek(&mut self) -> (usize, char) {
        match self.iter.peek() {
            Some((index, chr)) => (*index, *chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn peekahead(&mut self, n: usize) -> (usize, char) {
        match self.iter.clone().nth(n) {
            Some((index, chr)) => (index, chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn at_eof(&mut self) -> bool {
        self.iter.peek().is_none()
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.source.clone(), start as u32, end as u32)
    }

    fn error_at(&self, offset: usize, msg: &str) -> anyhow::Error {
        let (line, col) = self.source.position(offset as u32);
        self.source.error(line, col, msg)
    }

    fn read_ident(&mut self) -> Result<Token> {
        let start = self.peek().0;
        loop {
            let ch = self.peek().1;
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.iter.next();
            } else {
                break;
            }
        }
        let end = self.peek().0;
        Ok(Token(TokenKind::Ident, self.span(start, end)))
    }

    fn read_digits(&mut self) {
        while self.peek().1.is_ascii_digit() {
            self.iter.next();
        }
    }

    // Decimal integers with an optional sign and an optional `L` suffix.
    fn read_number(&mut self) -> Result<Token> {
        let (start, _) = self.peek();
        self.iter.next();
        self.read_digits();

        if self.peek().1 == 'L' {
            self.iter.next();
        }

        let (end, ch) = self.peek();
        if ch == '.' && self.peekahead(1).1.is_ascii_digit() {
            return Err(self.error_at(start, "floating point literals are not supported"));
        }
        if ch == '_' || ch.is_ascii_alphanumeric() {
            return Err(self.error_at(end, "invalid number"));
        }

        Ok(Token(TokenKind::Number, self.span(start, end)))
    }

    fn read_string(&mut self) -> Result<Token> {
        let (start, _) = self.peek();
        self.iter.next();
        loop {
            let (offset, ch) = self.peek();
            match ch {
                _ if self.at_eof() => break,
                '"' => break,
                '\\' => {
                    self.iter.next();
                    let (offset, ch) = self.peek();
                    self.iter.next();
                    match ch {
                        // json escape sequence
                        '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' => (),
                        'u' => {
                            for _i in 0..4 {
                                let (offset, ch) = self.peek();
                                if !ch.is_ascii_hexdigit() {
                                    return Err(
                                        self.error_at(offset, "invalid hex escape sequence")
                                    );
                                }
                                self.iter.next();
                            }
                        }
                        _ => return Err(self.error_at(offset, "invalid escape sequence")),
                    }
                }
                _ => {
                    if !('\u{0020}'..='\u{10FFFF}').contains(&ch) {
                        return Err(self.error_at(offset, "invalid character in string"));
                    }
                    self.iter.next();
                }
            }
        }

        if self.peek().1 != '"' {
            return Err(self.error_at(start, "unmatched \""));
        }

        self.iter.next();
        let end = self.peek().0;

        // Ensure that the string can be decoded.
        if let Err(e) = serde_json::from_str::<String>(&self.source.contents()[start..end]) {
            bail!(
                "{} {e}",
                self.error_at(start, "serde_json cannot parse string:")
            )
        }

        Ok(Token(TokenKind::String, self.span(start, end)))
    }

    fn skip_ws(&mut self) -> Result<()> {
        // Comments are skipped along with whitespace.
        'outer: loop {
            match self.peek().1 {
                ' ' | '\t' | '\n' => (),
                '\r' => {
                    if self.peekahead(1).1 != '\n' {
                        let offset = self.peek().0;
                        return Err(self.error_at(offset, "\\r must be followed by \\n"));
                    }
                }
                '/' if self.peekahead(1).1 == '/' => {
                    self.iter.next();
                    loop {
                        match self.peek().1 {
                            _ if self.at_eof() => continue 'outer,
                            '\n' => continue 'outer,
                            _ => self.iter.next(),
                        };
                    }
                }
                '/' if self.peekahead(1).1 == '*' => {
                    let start = self.peek().0;
                    self.iter.next();
                    self.iter.next();
                    loop {
                        match self.peek().1 {
                            '*' if self.peekahead(1).1 == '/' => {
                                self.iter.next();
                                self.iter.next();
                                continue 'outer;
                            }
                            _ if self.at_eof() => {
                                return Err(self.error_at(start, "unterminated comment"))
                            }
                            _ => self.iter.next(),
                        };
                    }
                }
                _ => break,
            }
            self.iter.next();
        }
        Ok(())
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_ws()?;

        let (start, chr) = self.peek();
        if self.at_eof() {
            return Ok(Token(TokenKind::Eof, self.span(start, start)));
        }

        match chr {
            // - followed by a digit is a negative number.
            '-' if self.peekahead(1).1.is_ascii_digit() => self.read_number(),
            '{' | '}' | '(' | ')' | ',' | ';' | '.' | '=' => {
                self.iter.next();
                Ok(Token(TokenKind::Symbol, self.span(start, start + 1)))
            }
            '+' if self.peekahead(1).1 == '=' => {
                self.iter.next();
                self.iter.next();
                Ok(Token(TokenKind::Symbol, self.span(start, start + 2)))
            }
            '"' => self.read_string(),
            _ if chr.is_ascii_digit() => self.read_number(),
            _ if chr.is_ascii_alphabetic() || chr == '_' => self.read_ident(),
            _ => Err(self.error_at(start, "invalid character")),
        }
    }
}
