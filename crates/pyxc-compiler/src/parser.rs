//! parser.rs : descente récursive, un token d'avance, arrêt à la première erreur.
//!
//! Précédences (de la plus faible à la plus forte) : affectation (niveau
//! instruction), `or`/`||`, `and`/`&&`, `==` `!=`, `<` `<=` `>` `>=`, `+` `-`,
//! `*` `/` `%`, unaires préfixes/postfixes, primaires. Tous les binaires sont
//! associatifs à gauche.
//!
//! La profondeur (parenthèses, unaires, blocs, chaînes d'opérateurs) est
//! bornée par `MAX_NESTING` : au-delà, `ParseError` plutôt qu'un débordement
//! de pile ici ou dans les passes suivantes.

use std::collections::HashMap;

use crate::ast::{
    Assignment, Binding, BinaryOp, Block, CondArm, DispatchCase, DispatchStatement, Expr, ExprKind, Fixity,
    ForLoop, IfChain, IncDecOp, Literal, LogicalOp, PrintStatement, Program, Stmt, UnaryOp, WhileLoop,
};
use crate::diagnostics::{CompileError, Pos};
use crate::lexer::{Delim, Keyword, Op, Token, TokenKind};

type PResult<T> = Result<T, CompileError>;

pub const MAX_NESTING: usize = 128;

const EQUALITY: &[(Op, BinaryOp)] = &[(Op::EqEq, BinaryOp::Eq), (Op::NotEq, BinaryOp::Ne)];
const RELATIONAL: &[(Op, BinaryOp)] = &[
    (Op::LtEq, BinaryOp::Le),
    (Op::Lt, BinaryOp::Lt),
    (Op::GtEq, BinaryOp::Ge),
    (Op::Gt, BinaryOp::Gt),
];
const ADDITIVE: &[(Op, BinaryOp)] = &[(Op::Plus, BinaryOp::Add), (Op::Minus, BinaryOp::Sub)];
const MULTIPLICATIVE: &[(Op, BinaryOp)] = &[
    (Op::Star, BinaryOp::Mul),
    (Op::Slash, BinaryOp::Div),
    (Op::Percent, BinaryOp::Rem),
];

/// Parse un flux complet (terminé par `Eof`) en `Program`.
pub fn parse(tokens: Vec<Token>) -> PResult<Program> {
    Parser::new(tokens).parse_program()
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    loop_depth: usize,
    case_depth: usize,
    nesting: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(Token { kind: TokenKind::Eof, .. })) {
            let pos = tokens.last().map(|t| t.pos).unwrap_or_default();
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                pos,
            });
        }
        Self {
            tokens,
            pos: 0,
            loop_depth: 0,
            case_depth: 0,
            nesting: 0,
        }
    }

    pub fn parse_program(&mut self) -> PResult<Program> {
        let mut stmts = Vec::new();
        loop {
            while self.eat_delim(Delim::Newline) {}
            if self.peek().kind == TokenKind::Eof {
                break;
            }
            self.parse_statement(&mut stmts)?;
        }
        log::debug!("parser: {} top-level statement(s)", stmts.len());
        Ok(Program {
            body: Block::new(stmts),
        })
    }

    /* ─────────────────────────── Instructions ─────────────────────────── */

    fn parse_statement(&mut self, out: &mut Vec<Stmt>) -> PResult<()> {
        match self.peek().kind {
            TokenKind::Kw(Keyword::If) => out.push(Stmt::If(self.parse_if()?)),
            TokenKind::Kw(Keyword::Match) => out.push(Stmt::Dispatch(self.parse_match()?)),
            TokenKind::Kw(Keyword::While) => out.push(Stmt::While(self.parse_while()?)),
            TokenKind::Kw(Keyword::For) => out.push(Stmt::For(self.parse_for()?)),
            _ => self.parse_simple_line(out)?,
        }
        Ok(())
    }

    /// `simple (';' simple)* [';'] NEWLINE`
    fn parse_simple_line(&mut self, out: &mut Vec<Stmt>) -> PResult<()> {
        out.push(self.parse_simple()?);
        while self.eat_delim(Delim::Semicolon) {
            if self.check_delim(Delim::Newline) {
                break;
            }
            out.push(self.parse_simple()?);
        }
        self.expect_delim(Delim::Newline, "end of line")?;
        Ok(())
    }

    fn parse_simple(&mut self) -> PResult<Stmt> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Kw(Keyword::Print) => self.parse_print().map(Stmt::Print),
            TokenKind::Kw(Keyword::Pass) => {
                self.advance();
                Ok(Stmt::Pass(tok.pos))
            }
            TokenKind::Kw(Keyword::Break | Keyword::Continue) => {
                if self.loop_depth == 0 {
                    return Err(CompileError::parse(
                        tok.pos,
                        format!("`{}` inside a `while` or `for` loop", tok.text),
                        format!("{} outside any loop", tok.describe()),
                    ));
                }
                self.advance();
                Ok(if tok.kind == TokenKind::Kw(Keyword::Break) {
                    Stmt::Break(tok.pos)
                } else {
                    Stmt::Continue(tok.pos)
                })
            }
            TokenKind::Kw(Keyword::Fallthrough) => {
                if self.case_depth == 0 {
                    return Err(CompileError::parse(
                        tok.pos,
                        "`fallthrough` at the end of a `case` body",
                        "`fallthrough` outside any `case`",
                    ));
                }
                self.advance();
                Ok(Stmt::Fallthrough(tok.pos))
            }
            TokenKind::Ident(name) if self.peek_at(1).kind == TokenKind::Op(Op::Assign) => {
                self.advance();
                self.advance();
                let value = self.parse_expr()?;
                Ok(Stmt::Assign(Assignment {
                    name,
                    pos: tok.pos,
                    value,
                    binding: Binding::Unresolved,
                }))
            }
            _ => {
                let expr = self.parse_expr()?;
                if matches!(expr.kind, ExprKind::IncDec { .. }) {
                    Ok(Stmt::IncDec(expr))
                } else {
                    Err(CompileError::parse(
                        tok.pos,
                        "an assignment, `print(...)` or an increment/decrement statement",
                        format!("expression starting with {}", tok.describe()),
                    ))
                }
            }
        }
    }

    fn parse_print(&mut self) -> PResult<PrintStatement> {
        let pos = self.expect_kw(Keyword::Print)?.pos;
        self.expect_delim(Delim::LParen, "`(` after `print`")?;
        let mut args = Vec::new();
        if !self.check_delim(Delim::RParen) {
            args.push(self.parse_expr()?);
            while self.eat_delim(Delim::Comma) {
                args.push(self.parse_expr()?);
            }
        }
        self.expect_delim(Delim::RParen, "`)` closing `print(`")?;
        Ok(PrintStatement { args, pos })
    }

    /// `NEWLINE INDENT statement+ DEDENT` ou une ligne simple après `:`.
    fn parse_suite(&mut self) -> PResult<Block> {
        let pos = self.peek().pos;
        self.descend(pos, Self::parse_suite_body)
    }

    fn parse_suite_body(&mut self) -> PResult<Block> {
        let mut stmts = Vec::new();
        if self.eat_delim(Delim::Newline) {
            self.expect_delim(Delim::Indent, "an indented block")?;
            while !self.eat_delim(Delim::Dedent) {
                self.parse_statement(&mut stmts)?;
            }
        } else {
            self.parse_simple_line(&mut stmts)?;
        }
        Ok(Block::new(stmts))
    }

    fn parse_if(&mut self) -> PResult<IfChain> {
        let pos = self.expect_kw(Keyword::If)?.pos;
        let mut arms = vec![self.parse_cond_arm("`:` after the `if` condition")?];
        while self.eat_kw(Keyword::Elif) {
            arms.push(self.parse_cond_arm("`:` after the `elif` condition")?);
        }
        let otherwise = if self.eat_kw(Keyword::Else) {
            self.expect_delim(Delim::Colon, "`:` after `else`")?;
            Some(self.parse_suite()?)
        } else {
            None
        };
        Ok(IfChain { arms, otherwise, pos })
    }

    fn parse_cond_arm(&mut self, colon: &str) -> PResult<CondArm> {
        let cond = self.parse_expr()?;
        self.expect_delim(Delim::Colon, colon)?;
        let body = self.parse_suite()?;
        Ok(CondArm { cond, body })
    }

    fn parse_while(&mut self) -> PResult<WhileLoop> {
        let pos = self.expect_kw(Keyword::While)?.pos;
        let cond = self.parse_expr()?;
        self.expect_delim(Delim::Colon, "`:` after the `while` condition")?;
        self.loop_depth += 1;
        let body = self.parse_suite();
        self.loop_depth -= 1;
        Ok(WhileLoop { cond, body: body?, pos })
    }

    /// `for NAME in range(stop | start, stop | start, stop, step):`
    fn parse_for(&mut self) -> PResult<ForLoop> {
        let pos = self.expect_kw(Keyword::For)?.pos;
        let var_tok = self.advance();
        let TokenKind::Ident(var) = var_tok.kind else {
            return Err(CompileError::parse(var_tok.pos, "a loop variable after `for`", var_tok.describe()));
        };
        self.expect_kw(Keyword::In)?;
        let range = self.advance();
        if !matches!(&range.kind, TokenKind::Ident(name) if name == "range") {
            return Err(CompileError::parse(range.pos, "`range(...)` after `in`", range.describe()));
        }
        self.expect_delim(Delim::LParen, "`(` after `range`")?;
        let first = self.parse_expr()?;
        let second = if self.eat_delim(Delim::Comma) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let third = if second.is_some() && self.eat_delim(Delim::Comma) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect_delim(Delim::RParen, "`)` closing `range(`")?;
        self.expect_delim(Delim::Colon, "`:` after `range(...)`")?;

        let (start, stop) = match second {
            Some(stop) => (first, stop),
            None => (Expr::new(ExprKind::Literal(Literal::Int(0)), range.pos), first),
        };
        let (step, step_pos) = match third {
            Some(e) => (range_step(&e)?, e.pos),
            None => (1, range.pos),
        };

        self.loop_depth += 1;
        let body = self.parse_suite();
        self.loop_depth -= 1;
        Ok(ForLoop {
            var,
            var_pos: var_tok.pos,
            start,
            stop,
            step,
            step_pos,
            body: body?,
            pos,
        })
    }

    fn parse_match(&mut self) -> PResult<DispatchStatement> {
        let pos = self.expect_kw(Keyword::Match)?.pos;
        let scrutinee = self.parse_expr()?;
        self.expect_delim(Delim::Colon, "`:` after the `match` subject")?;
        self.expect_delim(Delim::Newline, "a new line after `match ...:`")?;
        self.expect_delim(Delim::Indent, "an indented block of `case` clauses")?;

        let mut cases: Vec<DispatchCase> = Vec::new();
        let mut default: Option<(Pos, Block)> = None;
        let mut seen: HashMap<Literal, Pos> = HashMap::new();

        while !self.eat_delim(Delim::Dedent) {
            let case_pos = self.expect_kw(Keyword::Case)?.pos;
            let pattern = self.parse_case_pattern()?;
            self.expect_delim(Delim::Colon, "`:` after the `case` pattern")?;

            self.case_depth += 1;
            let body = self.parse_suite();
            self.case_depth -= 1;
            let mut body = body?;

            match pattern {
                None => {
                    if let Some((first, _)) = &default {
                        return Err(CompileError::DuplicateDefaultClause {
                            pos: case_pos,
                            first: *first,
                        });
                    }
                    reject_stray_fallthrough(&body)?;
                    default = Some((case_pos, body));
                }
                Some((value, value_pos)) => {
                    if let Some(first) = seen.get(&value) {
                        return Err(CompileError::DuplicateDispatchCase {
                            pos: value_pos,
                            value: value.to_string(),
                            first: *first,
                        });
                    }
                    seen.insert(value.clone(), value_pos);
                    let falls_through = matches!(body.stmts.last(), Some(Stmt::Fallthrough(_)));
                    if falls_through {
                        body.stmts.pop();
                    }
                    reject_stray_fallthrough(&body)?;
                    cases.push(DispatchCase {
                        value,
                        pos: value_pos,
                        body,
                        falls_through,
                    });
                }
            }
        }

        Ok(DispatchStatement {
            scrutinee,
            cases,
            default: default.map(|(_, block)| block),
            pos,
        })
    }

    /// `None` pour `_` (clause par défaut), sinon le littéral et sa position.
    fn parse_case_pattern(&mut self) -> PResult<Option<(Literal, Pos)>> {
        let tok = self.advance();
        let lit = match tok.kind {
            TokenKind::Ident(name) if name == "_" => return Ok(None),
            TokenKind::Int(n) => Literal::Int(n),
            TokenKind::Op(Op::Minus) => {
                let num = self.advance();
                match num.kind {
                    TokenKind::Int(n) => Literal::Int(-n),
                    _ => return Err(CompileError::parse(num.pos, "an integer after `-`", num.describe())),
                }
            }
            TokenKind::Str(s) => Literal::Text(s),
            TokenKind::Kw(Keyword::True) => Literal::Bool(true),
            TokenKind::Kw(Keyword::False) => Literal::Bool(false),
            _ => {
                return Err(CompileError::parse(
                    tok.pos,
                    "a literal or `_` as `case` pattern",
                    tok.describe(),
                ))
            }
        };
        Ok(Some((lit, tok.pos)))
    }

    /* ─────────────────────────── Expressions ─────────────────────────── */

    pub fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let base = self.nesting;
        let res = self.parse_or_chain();
        self.nesting = base;
        res
    }

    fn parse_or_chain(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.check_op(Op::Or) {
            let pos = self.advance().pos;
            self.deepen(pos)?;
            let rhs = self.parse_and()?;
            lhs = logical(LogicalOp::Or, lhs, rhs, pos);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let base = self.nesting;
        let res = self.parse_and_chain();
        self.nesting = base;
        res
    }

    fn parse_and_chain(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.check_op(Op::And) {
            let pos = self.advance().pos;
            self.deepen(pos)?;
            let rhs = self.parse_equality()?;
            lhs = logical(LogicalOp::And, lhs, rhs, pos);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        self.parse_binary_level(EQUALITY, Self::parse_relational)
    }

    fn parse_relational(&mut self) -> PResult<Expr> {
        self.parse_binary_level(RELATIONAL, Self::parse_additive)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        self.parse_binary_level(ADDITIVE, Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        self.parse_binary_level(MULTIPLICATIVE, Self::parse_unary)
    }

    /// Chaque opérateur de la chaîne ajoute un niveau à l'arbre (associativité
    /// à gauche) : il compte dans `nesting` jusqu'à la fin du niveau.
    fn parse_binary_level(&mut self, ops: &[(Op, BinaryOp)], next: fn(&mut Self) -> PResult<Expr>) -> PResult<Expr> {
        let base = self.nesting;
        let res = self.parse_binary_chain(ops, next);
        self.nesting = base;
        res
    }

    fn parse_binary_chain(&mut self, ops: &[(Op, BinaryOp)], next: fn(&mut Self) -> PResult<Expr>) -> PResult<Expr> {
        let mut lhs = next(self)?;
        while let Some(op) = self.match_binary(ops) {
            let pos = self.advance().pos;
            self.deepen(pos)?;
            let rhs = next(self)?;
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                pos,
            );
        }
        Ok(lhs)
    }

    fn match_binary(&self, ops: &[(Op, BinaryOp)]) -> Option<BinaryOp> {
        match self.peek().kind {
            TokenKind::Op(tok) => ops.iter().find(|(o, _)| *o == tok).map(|(_, b)| *b),
            _ => None,
        }
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let pos = self.peek().pos;
        let kind = match self.peek().kind {
            TokenKind::Op(Op::Minus) => {
                self.advance();
                ExprKind::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(self.descend(pos, Self::parse_unary)?),
                }
            }
            TokenKind::Op(Op::Not) => {
                self.advance();
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(self.descend(pos, Self::parse_unary)?),
                }
            }
            TokenKind::Op(op @ (Op::PlusPlus | Op::MinusMinus)) => {
                self.advance();
                ExprKind::IncDec {
                    op: if op == Op::PlusPlus { IncDecOp::Inc } else { IncDecOp::Dec },
                    fixity: Fixity::Prefix,
                    operand: Box::new(self.descend(pos, Self::parse_unary)?),
                }
            }
            _ => return self.parse_postfix(),
        };
        Ok(Expr::new(kind, pos))
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Op(Op::PlusPlus) => IncDecOp::Inc,
                TokenKind::Op(Op::MinusMinus) => IncDecOp::Dec,
                _ => return Ok(expr),
            };
            self.advance();
            let pos = expr.pos;
            expr = Expr::new(
                ExprKind::IncDec {
                    op,
                    fixity: Fixity::Postfix,
                    operand: Box::new(expr),
                },
                pos,
            );
        }
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let tok = self.advance();
        let kind = match tok.kind {
            TokenKind::Int(n) => ExprKind::Literal(Literal::Int(n)),
            TokenKind::Str(s) => ExprKind::Literal(Literal::Text(s)),
            TokenKind::Kw(Keyword::True) => ExprKind::Literal(Literal::Bool(true)),
            TokenKind::Kw(Keyword::False) => ExprKind::Literal(Literal::Bool(false)),
            TokenKind::Ident(name) => ExprKind::Ident(name),
            TokenKind::Delim(Delim::LParen) => {
                let inner = self.descend(tok.pos, Self::parse_expr)?;
                self.expect_delim(Delim::RParen, "`)`")?;
                return Ok(inner);
            }
            _ => return Err(CompileError::parse(tok.pos, "an expression", tok.describe())),
        };
        Ok(Expr::new(kind, tok.pos))
    }

    /* ─────────────────────────── Helpers ─────────────────────────── */

    fn descend<T>(&mut self, pos: Pos, f: fn(&mut Self) -> PResult<T>) -> PResult<T> {
        self.deepen(pos)?;
        let res = f(self);
        self.nesting -= 1;
        res
    }

    fn deepen(&mut self, pos: Pos) -> PResult<()> {
        if self.nesting >= MAX_NESTING {
            return Err(CompileError::parse(
                pos,
                format!("at most {MAX_NESTING} levels of nesting"),
                "a deeper expression or block",
            ));
        }
        self.nesting += 1;
        Ok(())
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn check_op(&self, op: Op) -> bool {
        self.peek().kind == TokenKind::Op(op)
    }

    fn check_delim(&self, d: Delim) -> bool {
        self.peek().kind == TokenKind::Delim(d)
    }

    fn eat_delim(&mut self, d: Delim) -> bool {
        let hit = self.check_delim(d);
        if hit {
            self.advance();
        }
        hit
    }

    fn eat_kw(&mut self, kw: Keyword) -> bool {
        let hit = self.peek().kind == TokenKind::Kw(kw);
        if hit {
            self.advance();
        }
        hit
    }

    fn expect_delim(&mut self, d: Delim, what: &str) -> PResult<Token> {
        if self.check_delim(d) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_kw(&mut self, kw: Keyword) -> PResult<Token> {
        if self.peek().kind == TokenKind::Kw(kw) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("`{}`", kw.as_str())))
        }
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        let tok = self.peek();
        CompileError::parse(tok.pos, expected, tok.describe())
    }
}

/// Le pas fixe le sens de la comparaison en C++ : littéral entier non nul.
fn range_step(e: &Expr) -> PResult<i64> {
    let value = match &e.kind {
        ExprKind::Literal(Literal::Int(n)) => Some(*n),
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => match operand.kind {
            ExprKind::Literal(Literal::Int(n)) => Some(-n),
            _ => None,
        },
        _ => None,
    };
    match value {
        Some(0) => Err(CompileError::parse(e.pos, "a non-zero `range` step", "step 0")),
        Some(n) => Ok(n),
        None => Err(CompileError::parse(e.pos, "an integer literal as `range` step", "a computed step")),
    }
}

fn logical(op: LogicalOp, lhs: Expr, rhs: Expr, pos: Pos) -> Expr {
    Expr::new(
        ExprKind::Logical {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        pos,
    )
}

/// Un `fallthrough` restant ailleurs qu'en fin de `case` est une erreur.
fn reject_stray_fallthrough(block: &Block) -> PResult<()> {
    for stmt in &block.stmts {
        match stmt {
            Stmt::Fallthrough(pos) => {
                return Err(CompileError::parse(
                    *pos,
                    "`fallthrough` as the last statement of a `case` body",
                    "`fallthrough` in the middle of the clause",
                ))
            }
            Stmt::If(chain) => {
                for arm in &chain.arms {
                    reject_stray_fallthrough(&arm.body)?;
                }
                if let Some(otherwise) = &chain.otherwise {
                    reject_stray_fallthrough(otherwise)?;
                }
            }
            Stmt::While(w) => reject_stray_fallthrough(&w.body)?,
            Stmt::For(f) => reject_stray_fallthrough(&f.body)?,
            _ => {}
        }
    }
    Ok(())
}
