//! Lossless C# tokenizer.
//!
//! Concatenating the text of every token reproduces the input exactly.
//! Token boundaries always fall on ASCII bytes or at the end of input, so
//! slicing never splits a UTF-8 sequence.

/// Token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Whitespace,
    Comment,
    Ident,
    Number,
    Literal,
    Punct,
}

/// A token borrowed from the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub(crate) kind: TokenKind,
    pub(crate) text: &'a str,
}

impl Token<'_> {
    /// Whitespace and comments.
    pub(crate) fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }

    pub(crate) fn is_ident(&self, text: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == text
    }

    pub(crate) fn is_punct(&self, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == text
    }
}

/// Reserved words that never name a variable.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while", "await", "yield",
];

pub(crate) fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

const fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte >= 0x80
}

const fn is_ident_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte >= 0x80
}

/// Splits `source` into tokens.
pub(crate) fn tokenize(source: &str) -> Vec<Token<'_>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let (kind, end) = scan(bytes, pos);
        tokens.push(Token {
            kind,
            text: &source[pos..end],
        });
        pos = end;
    }

    tokens
}

fn scan(bytes: &[u8], start: usize) -> (TokenKind, usize) {
    let peek = |offset: usize| bytes.get(start + offset).copied();
    let first = bytes[start];

    match first {
        b if b.is_ascii_whitespace() => (
            TokenKind::Whitespace,
            skip_while(bytes, start, |c| c.is_ascii_whitespace()),
        ),
        // U+FEFF byte order mark
        0xEF if peek(1) == Some(0xBB) && peek(2) == Some(0xBF) => {
            (TokenKind::Whitespace, start + 3)
        }
        b'/' if peek(1) == Some(b'/') => (TokenKind::Comment, line_end(bytes, start)),
        b'/' if peek(1) == Some(b'*') => (TokenKind::Comment, block_comment_end(bytes, start)),
        b'"' if peek(1) == Some(b'"') && peek(2) == Some(b'"') => {
            (TokenKind::Literal, raw_string_end(bytes, start))
        }
        b'"' => (TokenKind::Literal, quoted_end(bytes, start + 1, b'"')),
        b'\'' => (TokenKind::Literal, quoted_end(bytes, start + 1, b'\'')),
        b'@' if peek(1) == Some(b'"') => (TokenKind::Literal, verbatim_end(bytes, start + 2)),
        b'$' if peek(1) == Some(b'"') => (TokenKind::Literal, quoted_end(bytes, start + 2, b'"')),
        b'$' if peek(1) == Some(b'@') && peek(2) == Some(b'"') => {
            (TokenKind::Literal, verbatim_end(bytes, start + 3))
        }
        b'@' if peek(1).is_some_and(is_ident_start) => (
            TokenKind::Ident,
            skip_while(bytes, start + 1, is_ident_continue),
        ),
        b if b.is_ascii_digit() => (
            TokenKind::Number,
            skip_while(bytes, start, |c| c.is_ascii_alphanumeric() || c == b'_' || c == b'.'),
        ),
        b if is_ident_start(b) => (TokenKind::Ident, skip_while(bytes, start, is_ident_continue)),
        b'+' if matches!(peek(1), Some(b'+' | b'=')) => (TokenKind::Punct, start + 2),
        b'-' if peek(1) == Some(b'-') => (TokenKind::Punct, start + 2),
        _ => (TokenKind::Punct, start + 1),
    }
}

fn skip_while(bytes: &[u8], mut pos: usize, pred: impl Fn(u8) -> bool) -> usize {
    while pos < bytes.len() && pred(bytes[pos]) {
        pos += 1;
    }
    pos
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

/// Line comments stop before the newline.
fn line_end(bytes: &[u8], start: usize) -> usize {
    find(bytes, start, b"\n").unwrap_or(bytes.len())
}

fn block_comment_end(bytes: &[u8], start: usize) -> usize {
    find(bytes, start + 2, b"*/").map_or(bytes.len(), |pos| pos + 2)
}

/// Regular string or char literal with backslash escapes. A newline ends an
/// unterminated literal without consuming it.
fn quoted_end(bytes: &[u8], mut pos: usize, quote: u8) -> usize {
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'\n' => return pos,
            b if b == quote => return pos + 1,
            _ => pos += 1,
        }
    }
    bytes.len()
}

/// Verbatim string: `""` escapes a quote, newlines are allowed.
fn verbatim_end(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() {
        if bytes[pos] == b'"' {
            if bytes.get(pos + 1) == Some(&b'"') {
                pos += 2;
                continue;
            }
            return pos + 1;
        }
        pos += 1;
    }
    bytes.len()
}

/// Raw string: opened by three or more quotes, closed by the same run.
fn raw_string_end(bytes: &[u8], start: usize) -> usize {
    let open = skip_while(bytes, start, |c| c == b'"') - start;
    let fence = vec![b'"'; open];
    find(bytes, start + open, &fence).map_or(bytes.len(), |pos| pos + open)
}
