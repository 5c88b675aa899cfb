//! Praat text-format reader
//!
//! Handles both the long ("ooTextFile" with labels) and the short layout.
//! The tokenizer keeps only values: numbers, quoted strings and `<flag>`s.
//! Labels such as `xmin =`, `!` comments and bracketed indices like
//! `item [1]:` are skipped.

use std::iter::Peekable;
use std::str::Chars;

use super::{IntervalTier, PointTier, TextGrid, TextInterval, TextPoint, Tier};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Flag(bool),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Text(s) => format!("string \"{}\"", s),
            Token::Flag(b) => format!("flag <{}>", if *b { "exists" } else { "absent" }),
        }
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn error(&self, message: impl AsRef<str>) -> Error {
        Error::Parse(format!("line {}: {}", self.line, message.as_ref()))
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        while let Some(&c) = self.chars.peek() {
            match c {
                '"' => {
                    self.bump();
                    return self.read_string().map(Some);
                }
                '<' => {
                    self.bump();
                    return self.read_flag().map(Some);
                }
                '!' => self.skip_until('\n'),
                '[' => self.skip_until(']'),
                c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                    return self.read_number().map(Some);
                }
                _ => {
                    self.bump();
                }
            }
        }
        Ok(None)
    }

    fn skip_until(&mut self, end: char) {
        while let Some(c) = self.bump() {
            if c == end {
                break;
            }
        }
    }

    fn read_string(&mut self) -> Result<Token> {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => {
                    if self.chars.peek() == Some(&'"') {
                        self.bump();
                        text.push('"');
                    } else {
                        return Ok(Token::Text(text));
                    }
                }
                Some(c) => text.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn read_flag(&mut self) -> Result<Token> {
        let mut name = String::new();
        loop {
            match self.bump() {
                Some('>') => break,
                Some(c) => name.push(c),
                None => return Err(self.error("unterminated flag")),
            }
        }
        match name.trim() {
            "exists" => Ok(Token::Flag(true)),
            "absent" => Ok(Token::Flag(false)),
            other => Err(self.error(format!("unknown flag <{}>", other))),
        }
    }

    fn read_number(&mut self) -> Result<Token> {
        let mut raw = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E') {
                raw.push(c);
                self.bump();
            } else {
                break;
            }
        }
        raw.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| self.error(format!("invalid number '{}'", raw)))
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    fn next(&mut self, expected: &str) -> Result<Token> {
        self.lexer
            .next_token()?
            .ok_or_else(|| self.lexer.error(format!("unexpected end of file, expected {}", expected)))
    }

    fn real(&mut self, what: &str) -> Result<f64> {
        match self.next(what)? {
            Token::Number(n) if n.is_finite() => Ok(n),
            other => Err(self
                .lexer
                .error(format!("expected {}, found {}", what, other.describe()))),
        }
    }

    fn count(&mut self, what: &str) -> Result<usize> {
        let n = self.real(what)?;
        if n < 0.0 || n.fract() != 0.0 {
            return Err(self.lexer.error(format!("{} must be a non-negative integer, found {}", what, n)));
        }
        Ok(n as usize)
    }

    fn text(&mut self, what: &str) -> Result<String> {
        match self.next(what)? {
            Token::Text(s) => Ok(s),
            other => Err(self
                .lexer
                .error(format!("expected {}, found {}", what, other.describe()))),
        }
    }

    fn flag(&mut self, what: &str) -> Result<bool> {
        match self.next(what)? {
            Token::Flag(b) => Ok(b),
            other => Err(self
                .lexer
                .error(format!("expected {}, found {}", what, other.describe()))),
        }
    }

    fn textgrid(&mut self) -> Result<TextGrid> {
        let file_type = self.text("file type")?;
        if !file_type.starts_with("ooTextFile") {
            return Err(Error::Parse(format!("unsupported file type \"{}\"", file_type)));
        }
        let class = self.text("object class")?;
        if !class.starts_with("TextGrid") {
            return Err(Error::Parse(format!("object class \"{}\" is not a TextGrid", class)));
        }

        let xmin = self.real("xmin")?;
        let xmax = self.real("xmax")?;
        if xmax <= xmin {
            return Err(Error::Parse(format!("TextGrid domain [{}, {}] is empty", xmin, xmax)));
        }

        let mut tiers = Vec::new();
        if self.flag("tiers flag")? {
            let size = self.count("tier count")?;
            for number in 1..=size {
                tiers.push(self.tier(number)?);
            }
        }
        if let Some(extra) = self.lexer.next_token()? {
            return Err(self
                .lexer
                .error(format!("trailing content after last tier: {}", extra.describe())));
        }
        Ok(TextGrid::from_parsed(xmin, xmax, tiers))
    }

    fn tier(&mut self, number: usize) -> Result<Tier> {
        let class = self.text("tier class")?;
        let name = self.text("tier name")?;
        let xmin = self.real("tier xmin")?;
        let xmax = self.real("tier xmax")?;
        let size = self.count("tier size")?;
        match class.as_str() {
            "IntervalTier" => {
                let mut intervals = Vec::new();
                for _ in 0..size {
                    let start = self.real("interval xmin")?;
                    let end = self.real("interval xmax")?;
                    let text = self.text("interval text")?;
                    intervals.push(TextInterval {
                        xmin: start,
                        xmax: end,
                        text,
                    });
                }
                IntervalTier::from_parsed(name, xmin, xmax, intervals)
                    .map(Tier::Interval)
                    .map_err(|e| Error::Parse(format!("tier {}: {}", number, e)))
            }
            "TextTier" => {
                let mut points = Vec::new();
                for _ in 0..size {
                    let time = self.real("point time")?;
                    let mark = self.text("point mark")?;
                    points.push(TextPoint { time, mark });
                }
                PointTier::from_parsed(name, xmin, xmax, points)
                    .map(Tier::Point)
                    .map_err(|e| Error::Parse(format!("tier {}: {}", number, e)))
            }
            other => Err(Error::Parse(format!("tier {}: unknown tier class \"{}\"", number, other))),
        }
    }
}

/// Parse a TextGrid from decoded text
pub fn parse_textgrid(text: &str) -> Result<TextGrid> {
    let mut parser = Parser {
        lexer: Lexer::new(text),
    };
    parser.textgrid()
}
