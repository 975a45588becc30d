//! Tokenizer for cron expressions.
//!
//! The lexer works on an ASCII-uppercased copy of the caller's string so that every
//! reported position is a byte offset into the original input.

use strum::{Display, EnumIs};

use crate::errors::CronError;
use crate::keywords::KeywordTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIs)]
pub enum TokenKind {
    #[strum(to_string = "number")]
    Number,
    #[strum(to_string = "field separator")]
    FieldSeparator,
    #[strum(to_string = "wildcard '*'")]
    Wildcard,
    #[strum(to_string = "placeholder '?'")]
    Unspecified,
    #[strum(to_string = "range operator '-'")]
    Range,
    #[strum(to_string = "step operator '/'")]
    Step,
    #[strum(to_string = "list separator ','")]
    ListSeparator,
    #[strum(to_string = "last modifier 'L'")]
    Last,
    #[strum(to_string = "weekday modifier 'W'")]
    Weekday,
    #[strum(to_string = "nth modifier '#'")]
    Nth,
    #[strum(to_string = "end of input")]
    EndOfInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
    /// The number as written (or the keyword's value).
    pub raw: u32,
    /// `raw` shifted by the field offset.
    pub value: i64,
}

impl Token {
    pub fn new(kind: TokenKind, position: usize) -> Self {
        Self {
            kind,
            position,
            raw: 0,
            value: 0,
        }
    }

    fn number(position: usize, raw: u32, value: i64) -> Self {
        Self {
            kind: TokenKind::Number,
            position,
            raw,
            value,
        }
    }
}

pub struct Lexer {
    input: Vec<u8>,
    pos: usize,
    offset: i64,
    keywords: Option<&'static KeywordTable>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        let input = source.to_ascii_uppercase().into_bytes();
        let pos = input
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(input.len());
        Self {
            input,
            pos,
            offset: 0,
            keywords: None,
        }
    }

    /// Sets the numeric offset and keyword table for the next field.
    pub fn configure(&mut self, offset: i64, keywords: Option<&'static KeywordTable>) {
        self.offset = offset;
        self.keywords = keywords;
    }

    /// True while anything other than whitespace is left to consume.
    pub fn has_next(&self) -> bool {
        self.input[self.pos..]
            .iter()
            .any(|b| !b.is_ascii_whitespace())
    }

    /// Lexes one token. Returns `EndOfInput` once the input is used up.
    pub fn next_token(&mut self) -> Result<Token, CronError> {
        let start = self.pos;
        let Some(&byte) = self.input.get(start) else {
            return Ok(Token::new(TokenKind::EndOfInput, start));
        };

        let kind = match byte {
            b if b.is_ascii_whitespace() => {
                self.skip_while(|b| b.is_ascii_whitespace());
                return Ok(Token::new(TokenKind::FieldSeparator, start));
            }
            b if b.is_ascii_digit() => return self.number(start),
            b if b.is_ascii_alphabetic() => return self.word(start),
            b'*' => TokenKind::Wildcard,
            b'?' => TokenKind::Unspecified,
            b'-' => TokenKind::Range,
            b'/' => TokenKind::Step,
            b',' => TokenKind::ListSeparator,
            b'#' => TokenKind::Nth,
            _ => return Err(self.unexpected_character(start)),
        };
        self.pos += 1;
        Ok(Token::new(kind, start))
    }

    fn number(&mut self, start: usize) -> Result<Token, CronError> {
        let end = self.skip_while(|b| b.is_ascii_digit());
        let raw = self.input[start..end]
            .iter()
            .try_fold(0u32, |acc, digit| {
                acc.checked_mul(10)?.checked_add(u32::from(digit - b'0'))
            })
            .ok_or(CronError::NumberTooLarge { position: start })?;
        Ok(Token::number(start, raw, i64::from(raw) - self.offset))
    }

    fn word(&mut self, start: usize) -> Result<Token, CronError> {
        let end = self.skip_while(|b| b.is_ascii_alphabetic());
        match &self.input[start..end] {
            b"L" => return Ok(Token::new(TokenKind::Last, start)),
            b"W" => return Ok(Token::new(TokenKind::Weekday, start)),
            [_] => return Err(self.unexpected_character(start)),
            _ => {}
        }

        // Alphabetic runs are pure ASCII.
        let keyword = String::from_utf8_lossy(&self.input[start..end]).into_owned();
        match self.keywords.and_then(|table| table.lookup(&keyword)) {
            // Keywords already carry native values, the field offset does not apply.
            Some(value) => Ok(Token::number(start, value, i64::from(value))),
            None => Err(CronError::UnknownKeyword {
                keyword,
                position: start,
            }),
        }
    }

    fn skip_while(&mut self, predicate: impl Fn(u8) -> bool) -> usize {
        while self.input.get(self.pos).is_some_and(|&b| predicate(b)) {
            self.pos += 1;
        }
        self.pos
    }

    fn unexpected_character(&self, position: usize) -> CronError {
        let character = String::from_utf8_lossy(&self.input[position..])
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        CronError::UnexpectedCharacter {
            character,
            position,
        }
    }
}
