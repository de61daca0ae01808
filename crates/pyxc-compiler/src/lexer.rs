//! lexer.rs : source -> tokens (positions ligne/colonne).
//!
//! Deux passes :
//!  1. `Lexeme` (logos) découpe le texte brut ; espaces et commentaires `#`
//!     sont sautés, les opérateurs multi-caractères gagnent (plus long match).
//!  2. `layout` transforme les fins de ligne et l'indentation en tokens
//!     `Newline` / `Indent` / `Dedent`, ignore les lignes vides et les retours
//!     à la ligne à l'intérieur des parenthèses.
//!
//! Toute erreur est fatale : aucun flux partiel n'est rendu.

use std::fmt;

use logos::Logos;
use serde::Serialize;

use crate::diagnostics::{CompileError, Pos};

/* ─────────────────────────── Tokens publics ─────────────────────────── */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Op {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Not,
    PlusPlus,
    MinusMinus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Keyword {
    If,
    Elif,
    Else,
    Match,
    Case,
    While,
    For,
    In,
    Break,
    Continue,
    Pass,
    Print,
    Fallthrough,
    True,
    False,
}

impl Keyword {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Elif => "elif",
            Self::Else => "else",
            Self::Match => "match",
            Self::Case => "case",
            Self::While => "while",
            Self::For => "for",
            Self::In => "in",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::Pass => "pass",
            Self::Print => "print",
            Self::Fallthrough => "fallthrough",
            Self::True => "True",
            Self::False => "False",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Delim {
    LParen,
    RParen,
    Comma,
    Colon,
    Semicolon,
    Newline,
    Indent,
    Dedent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Ident(String),
    Int(i64),
    Str(String),
    Op(Op),
    Kw(Keyword),
    Delim(Delim),
    Eof,
}

/// Token immuable : genre, texte littéral tel qu'écrit, position de début.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub pos: Pos,
}

impl Token {
    /// Description courte pour les messages "expected X, found Y".
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Ident(name) => format!("identifier `{name}`"),
            TokenKind::Int(_) => format!("integer `{}`", self.text),
            TokenKind::Str(_) => format!("string {}", self.text),
            TokenKind::Op(_) | TokenKind::Kw(_) => format!("`{}`", self.text),
            TokenKind::Delim(Delim::Newline) => "newline".into(),
            TokenKind::Delim(Delim::Indent) => "indentation".into(),
            TokenKind::Delim(Delim::Dedent) => "end of indented block".into(),
            TokenKind::Delim(_) => format!("`{}`", self.text),
            TokenKind::Eof => "end of input".into(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.kind {
            TokenKind::Ident(_) => "ident",
            TokenKind::Int(_) => "int",
            TokenKind::Str(_) => "str",
            TokenKind::Op(_) => "op",
            TokenKind::Kw(_) => "kw",
            TokenKind::Delim(_) => "delim",
            TokenKind::Eof => "eof",
        };
        write!(f, "{:>4}:{:<3} {class:<6} {}", self.pos.line, self.pos.col, self.text.escape_debug())
    }
}

/* ─────────────────────────── Passe 1 : logos ─────────────────────────── */

#[derive(Debug, Clone, Default, PartialEq)]
enum LexErrorKind {
    #[default]
    InvalidCharacter,
    UnterminatedString,
    BadEscape(char),
    IntOutOfRange,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t\f]+")]
#[logos(skip r"#[^\n]*")]
enum Lexeme {
    #[regex(r"\r?\n")]
    Newline,

    #[regex("[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Ident(String),

    #[regex("[0-9]+", |lex| lex.slice().parse::<i64>().map_err(|_| LexErrorKind::IntOutOfRange))]
    Int(i64),

    #[token("\"", |lex| string_body(lex, '"'))]
    #[token("'", |lex| string_body(lex, '\''))]
    Str(String),

    #[token("if", |_| Keyword::If)]
    #[token("elif", |_| Keyword::Elif)]
    #[token("else", |_| Keyword::Else)]
    #[token("match", |_| Keyword::Match)]
    #[token("case", |_| Keyword::Case)]
    #[token("while", |_| Keyword::While)]
    #[token("for", |_| Keyword::For)]
    #[token("in", |_| Keyword::In)]
    #[token("break", |_| Keyword::Break)]
    #[token("continue", |_| Keyword::Continue)]
    #[token("pass", |_| Keyword::Pass)]
    #[token("print", |_| Keyword::Print)]
    #[token("fallthrough", |_| Keyword::Fallthrough)]
    #[token("True", |_| Keyword::True)]
    #[token("true", |_| Keyword::True)]
    #[token("False", |_| Keyword::False)]
    #[token("false", |_| Keyword::False)]
    Kw(Keyword),

    #[token("+", |_| Op::Plus)]
    #[token("-", |_| Op::Minus)]
    #[token("*", |_| Op::Star)]
    #[token("/", |_| Op::Slash)]
    #[token("%", |_| Op::Percent)]
    #[token("=", |_| Op::Assign)]
    #[token("==", |_| Op::EqEq)]
    #[token("!=", |_| Op::NotEq)]
    #[token("<", |_| Op::Lt)]
    #[token("<=", |_| Op::LtEq)]
    #[token(">", |_| Op::Gt)]
    #[token(">=", |_| Op::GtEq)]
    #[token("&&", |_| Op::And)]
    #[token("and", |_| Op::And)]
    #[token("||", |_| Op::Or)]
    #[token("or", |_| Op::Or)]
    #[token("!", |_| Op::Not)]
    #[token("not", |_| Op::Not)]
    #[token("++", |_| Op::PlusPlus)]
    #[token("--", |_| Op::MinusMinus)]
    Op(Op),

    #[token("(", |_| Delim::LParen)]
    #[token(")", |_| Delim::RParen)]
    #[token(",", |_| Delim::Comma)]
    #[token(":", |_| Delim::Colon)]
    #[token(";", |_| Delim::Semicolon)]
    Delim(Delim),
}

/// Lit le corps d'une chaîne après le guillemet ouvrant ; pas de saut de ligne brut.
fn string_body(lex: &mut logos::Lexer<'_, Lexeme>, quote: char) -> Result<String, LexErrorKind> {
    let mut value = String::new();
    let mut chars = lex.remainder().chars();
    let mut consumed = 0;
    loop {
        let Some(c) = chars.next() else {
            lex.bump(consumed);
            return Err(LexErrorKind::UnterminatedString);
        };
        consumed += c.len_utf8();
        match c {
            c if c == quote => break,
            '\n' => {
                lex.bump(consumed - 1);
                return Err(LexErrorKind::UnterminatedString);
            }
            '\\' => {
                let Some(e) = chars.next() else {
                    lex.bump(consumed);
                    return Err(LexErrorKind::UnterminatedString);
                };
                consumed += e.len_utf8();
                value.push(match e {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    '\\' => '\\',
                    '"' => '"',
                    '\'' => '\'',
                    other => {
                        lex.bump(consumed);
                        return Err(LexErrorKind::BadEscape(other));
                    }
                });
            }
            c => value.push(c),
        }
    }
    lex.bump(consumed);
    Ok(value)
}

/* ─────────────────────────── Positions ─────────────────────────── */

/// Table des débuts de ligne : offset octet -> (ligne, colonne en caractères).
struct LineIndex<'a> {
    src: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(src: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { src, starts }
    }

    fn pos(&self, offset: usize) -> Pos {
        let line = self.starts.partition_point(|&s| s <= offset) - 1;
        let col = self.src[self.starts[line]..offset].chars().count() + 1;
        Pos::new(to_u32(line + 1), to_u32(col))
    }
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/* ─────────────────────────── API ─────────────────────────── */

/// Tokenise tout le source ; le dernier token est toujours `Eof`.
pub fn tokenize(src: &str) -> Result<Vec<Token>, CompileError> {
    let index = LineIndex::new(src);
    let mut raw = Vec::new();
    let mut lex = Lexeme::lexer(src);
    while let Some(item) = lex.next() {
        let span = lex.span();
        let pos = index.pos(span.start);
        match item {
            Ok(lexeme) => raw.push((lexeme, lex.slice().to_owned(), pos)),
            Err(kind) => return Err(lex_error(kind, &src[span], pos)),
        }
    }
    let end = index.pos(src.len());
    let tokens = layout(raw, end)?;
    log::debug!("lexer: {} token(s)", tokens.len());
    Ok(tokens)
}

fn lex_error(kind: LexErrorKind, slice: &str, pos: Pos) -> CompileError {
    match kind {
        LexErrorKind::InvalidCharacter => {
            let c = slice.chars().next().unwrap_or('?');
            CompileError::lex(pos, format!("invalid character `{}`", c.escape_debug()))
        }
        LexErrorKind::UnterminatedString => CompileError::lex(pos, "unterminated string literal"),
        LexErrorKind::BadEscape(c) => {
            CompileError::lex(pos, format!("unknown escape sequence `\\{}` in string literal", c.escape_debug()))
        }
        LexErrorKind::IntOutOfRange => {
            CompileError::lex(pos, format!("integer literal `{slice}` does not fit in 64 bits"))
        }
    }
}

/* ─────────────────────────── Passe 2 : layout ─────────────────────────── */

fn layout(raw: Vec<(Lexeme, String, Pos)>, end: Pos) -> Result<Vec<Token>, CompileError> {
    let mut out = Vec::with_capacity(raw.len() + 8);
    // colonnes d'indentation ouvertes ; la base est la colonne 1
    let mut indents: Vec<u32> = vec![1];
    let mut paren_depth = 0usize;
    let mut at_line_start = true;

    let delim = |d: Delim, text: &str, pos: Pos| Token {
        kind: TokenKind::Delim(d),
        text: text.to_owned(),
        pos,
    };

    for (lexeme, text, pos) in raw {
        if lexeme == Lexeme::Newline {
            if paren_depth == 0 && !at_line_start {
                out.push(delim(Delim::Newline, "\\n", pos));
                at_line_start = true;
            }
            continue;
        }

        if at_line_start {
            let current = indents.last().copied().unwrap_or(1);
            if pos.col > current {
                indents.push(pos.col);
                out.push(delim(Delim::Indent, "", pos));
            } else if pos.col < current {
                while indents.last().is_some_and(|&c| c > pos.col) {
                    indents.pop();
                    out.push(delim(Delim::Dedent, "", pos));
                }
                if indents.last() != Some(&pos.col) {
                    return Err(CompileError::lex(
                        pos,
                        "inconsistent dedent: indentation does not match any enclosing block",
                    ));
                }
            }
            at_line_start = false;
        }

        let kind = match lexeme {
            Lexeme::Ident(name) => TokenKind::Ident(name),
            Lexeme::Int(n) => TokenKind::Int(n),
            Lexeme::Str(s) => TokenKind::Str(s),
            Lexeme::Kw(k) => TokenKind::Kw(k),
            Lexeme::Op(op) => TokenKind::Op(op),
            Lexeme::Delim(d) => {
                match d {
                    Delim::LParen => paren_depth += 1,
                    Delim::RParen => paren_depth = paren_depth.saturating_sub(1),
                    _ => {}
                }
                TokenKind::Delim(d)
            }
            Lexeme::Newline => unreachable!("newlines handled above"),
        };
        out.push(Token { kind, text, pos });
    }

    if !at_line_start {
        out.push(delim(Delim::Newline, "\\n", end));
    }
    for _ in 1..indents.len() {
        out.push(delim(Delim::Dedent, "", end));
    }
    out.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        pos: end,
    });
    Ok(out)
}
