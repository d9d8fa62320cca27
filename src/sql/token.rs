//! SQL tokens - the atomic units of generated SQL text.
//!
//! The lexer never fails: generated SQL is frequently malformed, so every
//! input produces some token sequence and the parser decides what to make
//! of it. Rendering is the inverse direction and produces a canonical,
//! single-line spelling (keywords uppercased, one space between tokens).

use std::fmt;

/// Words treated as SQL keywords. Matched case-insensitively and rendered
/// uppercase; everything else is an identifier.
const KEYWORDS: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CROSS", "DELETE", "DESC", "DISTINCT",
    "ELSE", "END", "EXCEPT", "EXISTS", "FROM", "FULL", "GROUP", "HAVING", "IN", "INNER", "INSERT",
    "INTERSECT", "IS", "JOIN", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR",
    "ORDER", "OUTER", "RIGHT", "SELECT", "THEN", "UNION", "UPDATE", "USING", "WHEN", "WHERE",
    "WITH",
];

/// Check whether a word is a SQL keyword.
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|kw| kw.eq_ignore_ascii_case(word))
}

/// A lexed SQL token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// Identifier or keyword, spelled as written.
    Word(String),
    /// Backtick- or bracket-quoted identifier (contents only).
    QuotedIdent(String),
    /// Numeric literal, including a leading sign.
    Number(String),
    /// Single-quoted string literal (unescaped contents).
    Str(String),
    /// Double-quoted text. Generators use this for string literals.
    DoubleQuoted(String),
    /// Comparison or arithmetic operator.
    Op(String),
    Comma,
    Dot,
    Star,
    LParen,
    RParen,
    Semicolon,
}

impl Token {
    /// Build a keyword token.
    pub fn kw(word: &str) -> Self {
        Token::Word(word.to_string())
    }

    /// Build an operator token.
    pub fn op(op: &str) -> Self {
        Token::Op(op.to_string())
    }

    /// True if this is the given word, compared case-insensitively.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(word))
    }

    /// The identifier text, if this token names something (non-keyword
    /// word or quoted identifier).
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Token::Word(w) if !is_keyword(w) => Some(w),
            Token::QuotedIdent(w) => Some(w),
            _ => None,
        }
    }

    /// The contents of a string literal of either quote style.
    pub fn as_text_literal(&self) -> Option<&str> {
        match self {
            Token::Str(s) | Token::DoubleQuoted(s) => Some(s),
            _ => None,
        }
    }

    /// True for `=`, `!=`, `<>`, `<`, `>`, `<=`, `>=`.
    pub fn is_comparison(&self) -> bool {
        matches!(self, Token::Op(op) if matches!(op.as_str(), "=" | "!=" | "<>" | "<" | ">" | "<=" | ">="))
    }

    /// True if the token ends an operand, so a following `-` is binary.
    fn ends_operand(&self) -> bool {
        match self {
            Token::Word(w) => !is_keyword(w),
            Token::QuotedIdent(_)
            | Token::Number(_)
            | Token::Str(_)
            | Token::DoubleQuoted(_)
            | Token::RParen
            | Token::Star => true,
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) if is_keyword(w) => write!(f, "{}", w.to_uppercase()),
            Token::Word(w) => write!(f, "{}", w),
            Token::QuotedIdent(w) => write!(f, "`{}`", w),
            Token::Number(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Token::DoubleQuoted(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Token::Op(op) => write!(f, "{}", op),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Star => write!(f, "*"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Semicolon => write!(f, ";"),
        }
    }
}

/// Split SQL text into tokens.
pub fn tokenize(input: &str) -> Vec<Token> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '\'' => {
                let (text, next) = read_quoted(&chars, i + 1, '\'');
                tokens.push(Token::Str(text));
                i = next;
            }
            '"' => {
                let (text, next) = read_quoted(&chars, i + 1, '"');
                tokens.push(Token::DoubleQuoted(text));
                i = next;
            }
            '`' => {
                let (text, next) = read_quoted(&chars, i + 1, '`');
                tokens.push(Token::QuotedIdent(text));
                i = next;
            }
            '[' => {
                let (text, next) = read_quoted(&chars, i + 1, ']');
                tokens.push(Token::QuotedIdent(text));
                i = next;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '.' if chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())
                && !tokens.last().is_some_and(Token::ends_operand) =>
            {
                let (number, next) = read_number(&chars, i);
                tokens.push(Token::Number(number));
                i = next;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ';' => {
                tokens.push(Token::Semicolon);
                i += 1;
            }
            c if c.is_ascii_digit() => {
                let (number, next) = read_number(&chars, i);
                tokens.push(Token::Number(number));
                i = next;
            }
            '-' if chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())
                && !tokens.last().is_some_and(Token::ends_operand) =>
            {
                let (number, next) = read_number(&chars, i + 1);
                tokens.push(Token::Number(format!("-{}", number)));
                i = next;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Word(chars[start..i].iter().collect()));
            }
            '<' | '>' | '!' | '=' | '|' => {
                let pair: String = chars[i..(i + 2).min(chars.len())].iter().collect();
                if matches!(pair.as_str(), "<=" | ">=" | "<>" | "!=" | "||" | "==") {
                    let op = if pair == "==" { "=".to_string() } else { pair };
                    tokens.push(Token::Op(op));
                    i += 2;
                } else {
                    tokens.push(Token::Op(c.to_string()));
                    i += 1;
                }
            }
            other => {
                tokens.push(Token::Op(other.to_string()));
                i += 1;
            }
        }
    }

    tokens
}

/// Read quoted contents starting after the opening quote. A doubled closing
/// quote is an escaped quote. Unterminated input runs to the end.
fn read_quoted(chars: &[char], start: usize, close: char) -> (String, usize) {
    let mut text = String::new();
    let mut i = start;
    while i < chars.len() {
        if chars[i] == close {
            if chars.get(i + 1) == Some(&close) && close != ']' {
                text.push(close);
                i += 2;
                continue;
            }
            return (text, i + 1);
        }
        text.push(chars[i]);
        i += 1;
    }
    (text, i)
}

fn read_number(chars: &[char], start: usize) -> (String, usize) {
    let mut i = start;
    let mut seen_dot = false;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_digit() {
            i += 1;
        } else if c == '.' && !seen_dot && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()) {
            seen_dot = true;
            i += 1;
        } else {
            break;
        }
    }
    (chars[start..i].iter().collect(), i)
}

/// Render tokens back to SQL text.
pub fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Token> = None;
    for token in tokens {
        if let Some(prev) = prev {
            if needs_space(prev, token) {
                out.push(' ');
            }
        }
        out.push_str(&token.to_string());
        prev = Some(token);
    }
    out
}

fn needs_space(prev: &Token, next: &Token) -> bool {
    match (prev, next) {
        (Token::Dot, _) | (_, Token::Dot) => false,
        (Token::LParen, _) => false,
        (_, Token::RParen) | (_, Token::Comma) | (_, Token::Semicolon) => false,
        // Function call: no space between the name and its argument list.
        (Token::Word(w), Token::LParen) => is_keyword(w),
        _ => true,
    }
}
