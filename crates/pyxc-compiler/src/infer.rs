//! infer.rs : inférence de types minimale (Integer / Boolean / Text).
//!
//! Un seul parcours post-ordre. La première affectation d'un nom fixe son type
//! pour toute la portée qui la contient ; une ré-affectation d'un autre type
//! est une `TypeConflict` fatale (C++ ne peut pas re-typer une variable).
//!
//! Chaque expression complète est aussi vérifiée pour l'ordre d'évaluation :
//! C++ n'ordonne pas les opérandes d'un binaire (ni les arguments d'un appel),
//! donc un nom modifié par `++`/`--` n'y est utilisé qu'une fois.

use std::collections::HashMap;

use crate::ast::{
    Assignment, Binding, Block, DispatchStatement, Expr, ExprKind, Fixity, ForLoop, IfChain, IncDecOp, InferredType,
    Program, Stmt, UnaryOp,
};
use crate::diagnostics::{CompileError, Pos};

/* ─────────────────────────── Table des symboles ─────────────────────────── */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub ty: InferredType,
    /// Position de la première affectation (celle qui déclare).
    pub declared_at: Pos,
    /// Variable d'un `for` : lue seulement dans le corps.
    pub loop_var: bool,
}

/// Pile de portées, une par bloc. La racine n'est jamais dépilée.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<HashMap<String, Symbol>>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Profondeur courante ; 0 = portée racine.
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.resolve(name).map(|(_, sym)| sym)
    }

    /// Comme `lookup`, avec la profondeur de la portée qui définit le nom.
    pub fn resolve(&self, name: &str) -> Option<(usize, &Symbol)> {
        self.scopes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(depth, scope)| scope.get(name).map(|sym| (depth, sym)))
    }

    /// Déclare dans la portée courante (peut masquer un nom externe).
    pub fn declare(&mut self, name: impl Into<String>, symbol: Symbol) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), symbol);
        }
    }
}

/* ─────────────────────────── API ─────────────────────────── */

/// Annote le programme en place : `Expr::ty` et `Assignment::binding`.
pub fn infer_program(program: &mut Program) -> Result<(), CompileError> {
    let mut inf = Inferencer::default();
    // la racine du programme utilise directement la portée racine
    inf.stmts(&mut program.body)?;
    log::debug!("infer: {} top-level name(s)", inf.symbols.scopes[0].len());
    Ok(())
}

#[derive(Default)]
struct Inferencer {
    symbols: SymbolTable,
}

impl Inferencer {
    fn scoped_block(&mut self, block: &mut Block) -> Result<(), CompileError> {
        self.symbols.push_scope();
        let res = self.stmts(block);
        self.symbols.pop_scope();
        res
    }

    fn stmts(&mut self, block: &mut Block) -> Result<(), CompileError> {
        for stmt in &mut block.stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &mut Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Assign(a) => self.assign(a),
            Stmt::Print(p) => {
                for arg in &mut p.args {
                    self.expr(arg)?;
                }
                check_print_order(&p.args)
            }
            Stmt::IncDec(e) => self.full_expr(e).map(drop),
            Stmt::If(chain) => self.if_chain(chain),
            Stmt::Dispatch(d) => self.dispatch(d),
            Stmt::While(w) => {
                self.full_expr(&mut w.cond)?;
                self.scoped_block(&mut w.body)
            }
            Stmt::For(f) => self.for_loop(f),
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Pass(_) | Stmt::Fallthrough(_) => Ok(()),
        }
    }

    fn assign(&mut self, a: &mut Assignment) -> Result<(), CompileError> {
        // membre droit d'abord : `x = x + 1` sur un `x` neuf est une lecture indéfinie
        let ty = self.full_expr(&mut a.value)?;
        let current = self.symbols.depth();
        match self.symbols.resolve(&a.name) {
            Some((_, first)) if first.loop_var => {
                return Err(CompileError::unsupported(
                    a.pos,
                    format!("assigning the `for` variable `{}` inside its loop", a.name),
                ));
            }
            Some((depth, first)) => {
                if first.ty != ty {
                    return Err(CompileError::type_conflict(
                        a.pos,
                        format!(
                            "`{}` has type {} since its first assignment at {}, it cannot now hold {}",
                            a.name, first.ty, first.declared_at, ty
                        ),
                    ));
                }
                if depth < current {
                    log::debug!(
                        "infer: `{}` re-assigned at {} from a nested block, keeps type {} declared at {}",
                        a.name,
                        a.pos,
                        first.ty,
                        first.declared_at
                    );
                }
                a.binding = Binding::Reassign;
            }
            None => {
                log::trace!("infer: declare `{}`: {} at {} (depth {})", a.name, ty, a.pos, current);
                self.symbols.declare(
                    a.name.clone(),
                    Symbol {
                        ty,
                        declared_at: a.pos,
                        loop_var: false,
                    },
                );
                a.binding = Binding::Declare;
            }
        }
        Ok(())
    }

    fn if_chain(&mut self, chain: &mut IfChain) -> Result<(), CompileError> {
        for arm in &mut chain.arms {
            self.full_expr(&mut arm.cond)?;
            self.scoped_block(&mut arm.body)?;
        }
        if let Some(otherwise) = &mut chain.otherwise {
            self.scoped_block(otherwise)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, d: &mut DispatchStatement) -> Result<(), CompileError> {
        let subject = self.full_expr(&mut d.scrutinee)?;
        for case in &mut d.cases {
            let ty = case.value.ty();
            if ty != subject {
                return Err(CompileError::type_conflict(
                    case.pos,
                    format!(
                        "case value {} is {} but the `match` subject is {}",
                        case.value, ty, subject
                    ),
                ));
            }
            self.scoped_block(&mut case.body)?;
        }
        if let Some(default) = &mut d.default {
            self.scoped_block(default)?;
        }
        Ok(())
    }

    /// Bornes évaluées une fois avant la boucle ; `var` n'existe que dans le corps.
    fn for_loop(&mut self, f: &mut ForLoop) -> Result<(), CompileError> {
        for bound in [&mut f.start, &mut f.stop] {
            let t = self.full_expr(bound)?;
            if t != InferredType::Integer {
                return Err(CompileError::type_conflict(
                    bound.pos,
                    format!("`range` bounds must be Integer, found {t}"),
                ));
            }
        }
        if let Some(existing) = self.symbols.lookup(&f.var) {
            return Err(CompileError::unsupported(
                f.var_pos,
                format!(
                    "reusing `{}` (first assigned at {}) as a `for` variable",
                    f.var, existing.declared_at
                ),
            ));
        }
        self.symbols.push_scope();
        self.symbols.declare(
            f.var.clone(),
            Symbol {
                ty: InferredType::Integer,
                declared_at: f.var_pos,
                loop_var: true,
            },
        );
        let res = self.stmts(&mut f.body);
        self.symbols.pop_scope();
        res
    }

    /// Expression complète (instruction, condition, borne) : typée puis
    /// vérifiée pour l'ordre d'évaluation.
    fn full_expr(&mut self, e: &mut Expr) -> Result<InferredType, CompileError> {
        let ty = self.expr(e)?;
        collect_accesses(e, &mut Vec::new())?;
        Ok(ty)
    }

    fn expr(&mut self, e: &mut Expr) -> Result<InferredType, CompileError> {
        let ty = match &mut e.kind {
            ExprKind::Literal(lit) => lit.ty(),
            ExprKind::Ident(name) => match self.symbols.lookup(name) {
                Some(sym) => sym.ty,
                None => {
                    return Err(CompileError::UndefinedVariable {
                        pos: e.pos,
                        name: name.clone(),
                    })
                }
            },
            ExprKind::Unary { op, operand } => {
                let t = self.expr(operand)?;
                let (want, label) = match op {
                    UnaryOp::Neg => (InferredType::Integer, "unary `-`"),
                    UnaryOp::Not => (InferredType::Boolean, "`not`"),
                };
                if t != want {
                    return Err(CompileError::type_conflict(
                        operand.pos,
                        format!("operand of {label} must be {want}, found {t}"),
                    ));
                }
                want
            }
            ExprKind::IncDec { op, operand, .. } => {
                if !matches!(operand.kind, ExprKind::Ident(_)) {
                    return Err(CompileError::InvalidLvalue {
                        pos: operand.pos,
                        construct: lvalue_label(operand),
                    });
                }
                let t = self.expr(operand)?;
                if t != InferredType::Integer {
                    return Err(CompileError::type_conflict(
                        operand.pos,
                        format!("`{}` needs an Integer variable, found {t}", op.as_str()),
                    ));
                }
                if let ExprKind::Ident(name) = &operand.kind {
                    if self.symbols.lookup(name).is_some_and(|sym| sym.loop_var) {
                        return Err(CompileError::unsupported(
                            e.pos,
                            format!("`{}` on the `for` variable `{name}` inside its loop", op.as_str()),
                        ));
                    }
                }
                InferredType::Integer
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.expr(lhs)?;
                let r = self.expr(rhs)?;
                if op.is_comparison() {
                    if l != r || l == InferredType::Boolean {
                        return Err(CompileError::type_conflict(
                            e.pos,
                            format!(
                                "`{}` compares Integer with Integer or Text with Text, found {l} and {r}",
                                op.as_str()
                            ),
                        ));
                    }
                    InferredType::Boolean
                } else {
                    if l != InferredType::Integer || r != InferredType::Integer {
                        return Err(CompileError::type_conflict(
                            e.pos,
                            format!("operands of `{}` must be Integer, found {l} and {r}", op.as_str()),
                        ));
                    }
                    InferredType::Integer
                }
            }
            ExprKind::Logical { op, lhs, rhs } => {
                let l = self.expr(lhs)?;
                let r = self.expr(rhs)?;
                if l != InferredType::Boolean || r != InferredType::Boolean {
                    return Err(CompileError::type_conflict(
                        e.pos,
                        format!("operands of `{}` must be Boolean, found {l} and {r}", op.as_str()),
                    ));
                }
                InferredType::Boolean
            }
        };
        e.ty = ty;
        Ok(ty)
    }
}

/* ─────────────────────────── Ordre d'évaluation ─────────────────────────── */

/// Lecture (`write == None`) ou modification d'un nom dans une expression.
struct Access<'e> {
    name: &'e str,
    pos: Pos,
    write: Option<(IncDecOp, Fixity)>,
}

impl Access<'_> {
    fn describe(&self) -> String {
        match self.write {
            Some((op, Fixity::Prefix)) => format!("`{}{}`", op.as_str(), self.name),
            Some((op, Fixity::Postfix)) => format!("`{}{}`", self.name, op.as_str()),
            None => format!("`{}`", self.name),
        }
    }
}

/// Collecte les accès de `e` ; les deux côtés d'un binaire ne doivent pas
/// se croiser sur un nom modifié. `&&` / `||` ordonnent leurs opérandes.
fn collect_accesses<'e>(e: &'e Expr, out: &mut Vec<Access<'e>>) -> Result<(), CompileError> {
    match &e.kind {
        ExprKind::Literal(_) => {}
        ExprKind::Ident(name) => out.push(Access {
            name,
            pos: e.pos,
            write: None,
        }),
        ExprKind::Unary { operand, .. } => collect_accesses(operand, out)?,
        ExprKind::IncDec { op, fixity, operand } => {
            if let ExprKind::Ident(name) = &operand.kind {
                out.push(Access {
                    name,
                    pos: e.pos,
                    write: Some((*op, *fixity)),
                });
            }
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            let mut left = Vec::new();
            collect_accesses(lhs, &mut left)?;
            let mut right = Vec::new();
            collect_accesses(rhs, &mut right)?;
            check_unordered(&left, &right)?;
            out.append(&mut left);
            out.append(&mut right);
        }
        ExprKind::Logical { lhs, rhs, .. } => {
            collect_accesses(lhs, out)?;
            collect_accesses(rhs, out)?;
        }
    }
    Ok(())
}

/// Les arguments de `print` deviennent des arguments d'appel ou des
/// opérandes C++ : même règle qu'entre les deux côtés d'un binaire.
fn check_print_order(args: &[Expr]) -> Result<(), CompileError> {
    let mut seen = Vec::new();
    for arg in args {
        let mut own = Vec::new();
        collect_accesses(arg, &mut own)?;
        check_unordered(&seen, &own)?;
        seen.append(&mut own);
    }
    Ok(())
}

fn check_unordered(first: &[Access<'_>], second: &[Access<'_>]) -> Result<(), CompileError> {
    for a in first {
        for b in second.iter().filter(|b| b.name == a.name) {
            let (write, other) = match (a.write, b.write) {
                (Some(_), _) => (a, b),
                (None, Some(_)) => (b, a),
                (None, None) => continue,
            };
            return Err(CompileError::unsupported(
                write.pos,
                format!(
                    "{} together with {} at {} in one expression (unspecified evaluation order)",
                    write.describe(),
                    other.describe(),
                    other.pos
                ),
            ));
        }
    }
    Ok(())
}

fn lvalue_label(e: &Expr) -> String {
    match &e.kind {
        ExprKind::Literal(lit) => format!("literal {lit}"),
        ExprKind::IncDec { .. } => "the result of `++`/`--`".into(),
        _ => "an expression".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorKind;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn annotated(src: &str) -> Result<Program, CompileError> {
        let mut program = parse(tokenize(src)?)?;
        infer_program(&mut program)?;
        Ok(program)
    }

    fn first_value_type(src: &str) -> InferredType {
        let p = annotated(src).unwrap();
        match p.body.stmts.last() {
            Some(Stmt::Assign(a)) => a.value.ty,
            other => panic!("expected trailing assignment, got {other:?}"),
        }
    }

    #[test]
    fn literal_and_operator_types() {
        assert_eq!(first_value_type("x = 1 + 2 * 3\n"), InferredType::Integer);
        assert_eq!(first_value_type("x = \"hi\"\n"), InferredType::Text);
        assert_eq!(first_value_type("a = 5\nx = a < 10 and not False\n"), InferredType::Boolean);
        assert_eq!(first_value_type("s = 'a'\nx = s == \"b\"\n"), InferredType::Boolean);
        assert_eq!(first_value_type("a = 5\nb = 1\nx = a++ + --b\n"), InferredType::Integer);
    }

    #[test]
    fn a_modified_name_is_used_once_per_operand_tree() {
        for src in [
            "a = 5\nx = a++ + --a\n",
            "a = 5\nx = a++ + a\n",
            "a = 5\ny = a++ < a\n",
            "a = 5\nx = -(a--) * (1 + a)\n",
            "a = 5\nprint(a++, a)\n",
            "a = 5\nif a == ++a: pass\n",
        ] {
            let err = annotated(src).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct, "{src:?} -> {err}");
        }
        let err = annotated("a = 5\nx = a++ + a\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "UnsupportedConstruct at 2:5: `a++` together with `a` at 2:11 in one expression \
             (unspecified evaluation order) has no C++ translation"
        );

        // `&&` / `||` ordonnent ; l'affectation lit son membre droit d'abord
        for src in [
            "a = 5\nb = 1\nx = a++ + b--\n",
            "a = 5\nok = a++ > 0 && a < 10\n",
            "a = 5\na = a++ + 1\n",
            "a = 5\nb = a++\nprint(a, b)\n",
            "a = 5\nb = 2\nprint(a++, b)\n",
        ] {
            assert!(annotated(src).is_ok(), "{src:?}");
        }
    }

    #[test]
    fn for_declares_a_fresh_read_only_integer() {
        let p = annotated("n = 3\nfor i in range(n):\n    print(i * 2)\nfor i in range(1, n, 2): pass\n").unwrap();
        let Stmt::For(f) = &p.body.stmts[1] else { panic!("not a for") };
        assert_eq!(f.stop.ty, InferredType::Integer);

        // le nom ne sort pas de la boucle
        let err = annotated("for i in range(3): pass\nprint(i)\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedVariable);

        let err = annotated("i = 0\nfor i in range(3): pass\n").unwrap_err();
        assert_eq!(err.to_string(), "UnsupportedConstruct at 2:5: reusing `i` (first assigned at 1:1) as a `for` variable has no C++ translation");

        for src in ["for i in range(3):\n    i = 5\n", "for i in range(3):\n    i++\n"] {
            let err = annotated(src).unwrap_err();
            assert_eq!((err.kind(), err.pos().line), (ErrorKind::UnsupportedConstruct, 2), "{src:?}");
        }

        let err = annotated("s = \"x\"\nfor i in range(s): pass\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeConflict);
        let err = annotated("for i in range(i): pass\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedVariable);
    }

    #[test]
    fn every_subexpression_is_annotated() {
        let p = annotated("a = 5\nb = (a < 10) || (a - 1 > 2)\n").unwrap();
        let Stmt::Assign(b) = &p.body.stmts[1] else { panic!() };
        let ExprKind::Logical { lhs, rhs, .. } = &b.value.kind else { panic!() };
        assert_eq!(lhs.ty, InferredType::Boolean);
        let ExprKind::Binary { lhs: inner, .. } = &rhs.kind else { panic!() };
        assert_eq!(inner.ty, InferredType::Integer);
    }

    #[test]
    fn first_assignment_declares_later_ones_reassign() {
        let p = annotated("a = 1\na = a + 1\n").unwrap();
        let bindings: Vec<_> = p
            .body
            .stmts
            .iter()
            .map(|s| match s {
                Stmt::Assign(a) => a.binding,
                _ => Binding::Unresolved,
            })
            .collect();
        assert_eq!(bindings, vec![Binding::Declare, Binding::Reassign]);
    }

    #[test]
    fn incompatible_reassignment_is_a_type_conflict() {
        let err = annotated("a = 1\na = \"one\"\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeConflict at 2:1: `a` has type Integer since its first assignment at 1:1, it cannot now hold Text"
        );
    }

    #[test]
    fn reading_before_assignment_is_undefined() {
        let err = annotated("x = x + 1\n").unwrap_err();
        assert_eq!(
            err,
            CompileError::UndefinedVariable {
                pos: Pos::new(1, 5),
                name: "x".into()
            }
        );
    }

    #[test]
    fn names_declared_in_a_block_do_not_escape_it() {
        let err = annotated("if True:\n    y = 1\nprint(y)\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedVariable);

        // un bloc peut ré-affecter un nom externe...
        assert!(annotated("y = 1\nwhile y < 3:\n    y++\n    y = y + 1\nprint(y)\n").is_ok());
        // ...et un nom de bloc peut être re-déclaré ailleurs avec un autre type
        assert!(annotated("if True:\n    y = 1\nelse:\n    y = \"one\"\n").is_ok());
    }

    #[test]
    fn outer_type_still_binds_inside_blocks() {
        let err = annotated("y = 1\nif True:\n    y = False\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeConflict);
        assert_eq!(err.pos(), Pos::new(3, 5));
    }

    #[test]
    fn increment_needs_an_integer_variable() {
        let err = annotated("a = 5++\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidLvalue);
        assert!(err.to_string().contains("literal 5"), "{err}");

        let err = annotated("a = 1\nb = (a + 1)++\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidLvalue);

        let err = annotated("s = \"x\"\ns++\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeConflict);
    }

    #[test]
    fn operator_operand_rules() {
        for src in [
            "x = 1 + \"a\"\n",
            "x = \"a\" * 2\n",
            "x = True + 1\n",
            "x = 1 < \"a\"\n",
            "x = True == False\n",
            "x = 1 && True\n",
            "x = not 0\n",
            "x = -\"a\"\n",
        ] {
            let err = annotated(src).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::TypeConflict, "{src:?} -> {err}");
        }
    }

    #[test]
    fn match_cases_share_the_subject_type() {
        assert!(annotated("o = 2\nmatch o:\n    case 1: pass\n    case _: pass\n").is_ok());
        let err = annotated("o = 2\nmatch o:\n    case 1: pass\n    case \"two\": pass\n").unwrap_err();
        assert_eq!(err.to_string(), "TypeConflict at 4:10: case value \"two\" is Text but the `match` subject is Integer");
    }

    #[test]
    fn conditions_accept_any_type() {
        assert!(annotated("n = 3\nwhile n:\n    n--\ns = \"x\"\nif s: pass\n").is_ok());
    }

    #[test]
    fn symbol_table_shadows_and_pops() {
        let mut t = SymbolTable::new();
        let outer = Symbol {
            ty: InferredType::Integer,
            declared_at: Pos::new(1, 1),
            loop_var: false,
        };
        t.declare("a", outer);
        t.push_scope();
        t.declare(
            "a",
            Symbol {
                ty: InferredType::Text,
                declared_at: Pos::new(2, 5),
                loop_var: false,
            },
        );
        assert_eq!(t.resolve("a").map(|(d, s)| (d, s.ty)), Some((1, InferredType::Text)));
        t.pop_scope();
        assert_eq!(t.lookup("a"), Some(&outer));
        t.pop_scope();
        assert_eq!(t.depth(), 0, "root scope is never popped");
    }
}
