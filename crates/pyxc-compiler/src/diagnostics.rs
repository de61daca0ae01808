//! diagnostics.rs : erreurs structurées de la pipeline.
//!
//! Toutes les étapes échouent sur la première erreur (pas de reprise) ; chaque
//! variante porte sa position source et le token/la construction fautive.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Position 1-based dans le source (ligne, colonne en caractères).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Famille d'erreur, telle qu'affichée à l'utilisateur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lex,
    Parse,
    UndefinedVariable,
    TypeConflict,
    InvalidLvalue,
    DuplicateDispatchCase,
    DuplicateDefaultClause,
    UnsupportedConstruct,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lex => "LexError",
            Self::Parse => "ParseError",
            Self::UndefinedVariable => "UndefinedVariable",
            Self::TypeConflict => "TypeConflict",
            Self::InvalidLvalue => "InvalidLvalue",
            Self::DuplicateDispatchCase => "DuplicateDispatchCase",
            Self::DuplicateDefaultClause => "DuplicateDefaultClause",
            Self::UnsupportedConstruct => "UnsupportedConstruct",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Erreur fatale de traduction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("LexError at {pos}: {message}")]
    Lex { pos: Pos, message: String },

    #[error("ParseError at {pos}: expected {expected}, found {found}")]
    Parse {
        pos: Pos,
        expected: String,
        found: String,
    },

    #[error("UndefinedVariable at {pos}: `{name}` is read before any assignment")]
    UndefinedVariable { pos: Pos, name: String },

    #[error("TypeConflict at {pos}: {message}")]
    TypeConflict { pos: Pos, message: String },

    #[error("InvalidLvalue at {pos}: {construct} cannot be incremented or decremented, only a variable can")]
    InvalidLvalue { pos: Pos, construct: String },

    #[error("DuplicateDispatchCase at {pos}: case {value} is already handled at {first}")]
    DuplicateDispatchCase { pos: Pos, value: String, first: Pos },

    #[error("DuplicateDefaultClause at {pos}: `case _` already appears at {first}")]
    DuplicateDefaultClause { pos: Pos, first: Pos },

    #[error("UnsupportedConstruct at {pos}: {construct} has no C++ translation")]
    UnsupportedConstruct { pos: Pos, construct: String },
}

impl CompileError {
    pub fn lex(pos: Pos, message: impl Into<String>) -> Self {
        Self::Lex { pos, message: message.into() }
    }

    pub fn parse(pos: Pos, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::Parse {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn type_conflict(pos: Pos, message: impl Into<String>) -> Self {
        Self::TypeConflict { pos, message: message.into() }
    }

    pub fn unsupported(pos: Pos, construct: impl Into<String>) -> Self {
        Self::UnsupportedConstruct {
            pos,
            construct: construct.into(),
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Lex { .. } => ErrorKind::Lex,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::UndefinedVariable { .. } => ErrorKind::UndefinedVariable,
            Self::TypeConflict { .. } => ErrorKind::TypeConflict,
            Self::InvalidLvalue { .. } => ErrorKind::InvalidLvalue,
            Self::DuplicateDispatchCase { .. } => ErrorKind::DuplicateDispatchCase,
            Self::DuplicateDefaultClause { .. } => ErrorKind::DuplicateDefaultClause,
            Self::UnsupportedConstruct { .. } => ErrorKind::UnsupportedConstruct,
        }
    }

    pub const fn pos(&self) -> Pos {
        match self {
            Self::Lex { pos, .. }
            | Self::Parse { pos, .. }
            | Self::UndefinedVariable { pos, .. }
            | Self::TypeConflict { pos, .. }
            | Self::InvalidLvalue { pos, .. }
            | Self::DuplicateDispatchCase { pos, .. }
            | Self::DuplicateDefaultClause { pos, .. }
            | Self::UnsupportedConstruct { pos, .. } => *pos,
        }
    }

    /// Rendu "compilateur" : `fichier:ligne:col`, message, ligne source + caret.
    pub fn render(&self, src: &str, file: &str) -> String {
        let pos = self.pos();
        let mut out = format!("{file}:{pos}: error: {self}");
        let Some(line) = src.lines().nth(pos.line.saturating_sub(1) as usize) else {
            return out;
        };
        let gutter = pos.line.to_string().len();
        let pad = " ".repeat(gutter);
        let caret = " ".repeat(pos.col.saturating_sub(1) as usize);
        out.push_str(&format!("\n{pad} |\n{} | {line}\n{pad} | {caret}^", pos.line));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_kind_and_position() {
        let e = CompileError::parse(Pos::new(3, 7), "`:`", "newline");
        assert_eq!(e.to_string(), "ParseError at 3:7: expected `:`, found newline");
        assert_eq!(e.kind(), ErrorKind::Parse);
        assert_eq!(e.pos(), Pos::new(3, 7));
    }

    #[test]
    fn render_points_at_column() {
        let src = "a = 1\nb = a +\n";
        let e = CompileError::parse(Pos::new(2, 8), "an expression", "newline");
        let text = e.render(src, "demo.py");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "demo.py:2:8: error: ParseError at 2:8: expected an expression, found newline");
        assert_eq!(lines[2], "2 | b = a +");
        assert_eq!(lines[3], "  |        ^");
    }

    #[test]
    fn render_without_source_line_keeps_header() {
        let e = CompileError::lex(Pos::new(9, 1), "invalid character `$`");
        assert_eq!(e.render("", "x.py"), "x.py:9:1: error: LexError at 9:1: invalid character `$`");
    }
}
