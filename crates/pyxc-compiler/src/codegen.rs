//! codegen.rs : AST annoté -> lignes C++.
//!
//! Parcours post-ordre déterministe : même AST, même texte à l'octet près.
//! Ce qui n'a pas de traduction fidèle est refusé (`UnsupportedConstruct`),
//! jamais deviné.

use std::collections::HashSet;

use crate::ast::{
    Assignment, Binding, Block, DispatchStatement, Expr, ExprKind, Fixity, ForLoop, IfChain, InferredType, Literal,
    Program, Stmt, UnaryOp, WhileLoop,
};
use crate::config::{IntType, TranspileConfig};
use crate::diagnostics::{CompileError, Pos};
use crate::print::{PrintArg, PrintSupport};

/// Mots réservés C++ (plus `std`, masqué par une variable locale) interdits comme noms.
const CPP_RESERVED: &[&str] = &[
    "alignas", "alignof", "asm", "auto", "bool", "case", "catch", "char", "char8_t", "char16_t", "char32_t",
    "class", "co_await", "co_return", "co_yield", "concept", "const", "const_cast", "consteval", "constexpr",
    "constinit", "decltype", "default", "delete", "do", "double", "dynamic_cast", "enum", "explicit", "export",
    "extern", "float", "for", "friend", "goto", "inline", "int", "long", "mutable", "namespace", "new", "noexcept",
    "nullptr", "operator", "private", "protected", "public", "register", "reinterpret_cast", "requires", "return",
    "short", "signed", "sizeof", "static", "static_assert", "static_cast", "std", "struct", "switch", "template",
    "this", "thread_local", "throw", "try", "typedef", "typeid", "typename", "union", "unsigned", "using",
    "virtual", "void", "volatile", "wchar_t", "and", "and_eq", "bitand", "bitor", "compl", "not", "not_eq", "or",
    "or_eq", "xor", "xor_eq", "true", "false", "main",
];

/// Macros et objets que `<iostream>` / `<string>` / `<cstdint>` peuvent
/// amener dans `main` (souvent via `<cstdio>`, `<cerrno>`, `<cassert>`).
const CPP_PREDEFINED: &[&str] = &[
    "EOF", "NULL", "BUFSIZ", "FILENAME_MAX", "errno", "stdin", "stdout", "stderr", "assert", "offsetof",
    "EXIT_SUCCESS", "EXIT_FAILURE", "RAND_MAX", "INT8_MIN", "INT8_MAX", "INT16_MIN", "INT16_MAX", "INT32_MIN",
    "INT32_MAX", "INT64_MIN", "INT64_MAX", "UINT8_MAX", "UINT16_MAX", "UINT32_MAX", "UINT64_MAX", "SIZE_MAX",
    "INTMAX_MIN", "INTMAX_MAX", "INTPTR_MIN", "INTPTR_MAX", "PTRDIFF_MIN", "PTRDIFF_MAX",
];

/* ─────────────────────────── Sortie ─────────────────────────── */

/// Ligne C++ : profondeur d'indentation + texte sans indentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLine {
    pub depth: usize,
    pub text: String,
}

/// Liste ordonnée, en ajout seul.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedCode {
    lines: Vec<CodeLine>,
}

impl GeneratedCode {
    pub fn push(&mut self, depth: usize, text: impl Into<String>) {
        self.lines.push(CodeLine {
            depth,
            text: text.into(),
        });
    }

    pub fn lines(&self) -> &[CodeLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/* ─────────────────────────── Générateur ─────────────────────────── */

/// Constructions sur lesquelles `break` agit en C++.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Breakable {
    Loop,
    Switch,
}

pub struct CodeGenerator<'a> {
    config: &'a TranspileConfig,
    print: &'a dyn PrintSupport,
    code: GeneratedCode,
    depth: usize,
    breakables: Vec<Breakable>,
    /// Noms du programme et noms générés : un nom caché n'en masque aucun.
    names: HashSet<String>,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(config: &'a TranspileConfig, print: &'a dyn PrintSupport) -> Self {
        Self {
            config,
            print,
            code: GeneratedCode::default(),
            depth: 0,
            breakables: Vec::new(),
            names: HashSet::new(),
        }
    }

    /// Génère le corps de `main` (profondeur 0 = premier niveau du corps).
    pub fn generate(mut self, program: &Program) -> Result<GeneratedCode, CompileError> {
        collect_names(&program.body, &mut self.names);
        self.block(&program.body)?;
        log::debug!("codegen: {} line(s)", self.code.len());
        Ok(self.code)
    }

    fn line(&mut self, text: impl Into<String>) {
        self.code.push(self.depth, text);
    }

    fn nested(&mut self, block: &Block) -> Result<(), CompileError> {
        self.depth += 1;
        let res = self.block(block);
        self.depth -= 1;
        res
    }

    fn block(&mut self, block: &Block) -> Result<(), CompileError> {
        for stmt in &block.stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Assign(a) => self.assign(a),
            Stmt::Print(p) => {
                let texts = p.args.iter().map(|e| self.expr(e)).collect::<Result<Vec<_>, _>>()?;
                let args: Vec<PrintArg<'_>> = p
                    .args
                    .iter()
                    .zip(&texts)
                    .map(|(e, text)| PrintArg {
                        text: text.as_str(),
                        ty: e.ty,
                        atomic: e.is_atom(),
                    })
                    .collect();
                let line = self.print.print_statement(&args);
                self.line(line);
                Ok(())
            }
            Stmt::IncDec(e) => {
                let text = self.expr(e)?;
                self.line(format!("{text};"));
                Ok(())
            }
            Stmt::If(chain) => self.if_chain(chain),
            Stmt::Dispatch(d) => self.dispatch(d),
            Stmt::While(w) => self.while_loop(w),
            Stmt::For(f) => self.for_loop(f),
            Stmt::Break(pos) => {
                if self.breakables.last() == Some(&Breakable::Switch) {
                    return Err(CompileError::unsupported(
                        *pos,
                        "`break` inside a `case` body (it would leave the C++ `switch`, not the loop)",
                    ));
                }
                self.line("break;");
                Ok(())
            }
            Stmt::Continue(_) => {
                self.line("continue;");
                Ok(())
            }
            Stmt::Pass(_) => Ok(()),
            Stmt::Fallthrough(pos) => Err(CompileError::unsupported(*pos, "`fallthrough` outside a case tail")),
        }
    }

    fn assign(&mut self, a: &Assignment) -> Result<(), CompileError> {
        let name = cpp_ident(&a.name, a.pos)?;
        let value = self.expr(&a.value)?;
        match a.binding {
            Binding::Declare => {
                let ty = self.cpp_type(a.value.ty, a.value.pos)?;
                self.line(format!("{ty} {name} = {value};"));
            }
            Binding::Reassign => self.line(format!("{name} = {value};")),
            Binding::Unresolved => {
                return Err(CompileError::unsupported(
                    a.pos,
                    format!("assignment to `{}` without inferred binding", a.name),
                ))
            }
        }
        Ok(())
    }

    fn if_chain(&mut self, chain: &IfChain) -> Result<(), CompileError> {
        for (i, arm) in chain.arms.iter().enumerate() {
            let cond = self.condition(&arm.cond)?;
            if i == 0 {
                self.line(format!("if ({cond}) {{"));
            } else {
                self.line(format!("}} else if ({cond}) {{"));
            }
            self.nested(&arm.body)?;
        }
        if let Some(otherwise) = &chain.otherwise {
            self.line("} else {");
            self.nested(otherwise)?;
        }
        self.line("}");
        Ok(())
    }

    fn while_loop(&mut self, w: &WhileLoop) -> Result<(), CompileError> {
        let cond = self.condition(&w.cond)?;
        self.line(format!("while ({cond}) {{"));
        self.breakables.push(Breakable::Loop);
        let res = self.nested(&w.body);
        self.breakables.pop();
        res?;
        self.line("}");
        Ok(())
    }

    /// `for (T i = start[, i_stop = stop]; i < stop; ++i)` ; une borne non
    /// constante passe par une variable cachée, évaluée une seule fois.
    fn for_loop(&mut self, f: &ForLoop) -> Result<(), CompileError> {
        let var = cpp_ident(&f.var, f.var_pos)?;
        let ty = self.cpp_type(InferredType::Integer, f.var_pos)?;
        let start = self.expr(&f.start)?;
        let stop = self.expr(&f.stop)?;
        let step = self.int_literal(f.step, f.step_pos)?;
        let (init, bound) = if f.stop.is_constant() {
            (format!("{ty} {var} = {start}"), stop)
        } else {
            let hidden = self.fresh_name(&var);
            (format!("{ty} {var} = {start}, {hidden} = {stop}"), hidden)
        };
        let (cmp, update) = match f.step {
            1 => ("<", format!("++{var}")),
            -1 => (">", format!("--{var}")),
            n if n > 0 => ("<", format!("{var} += {step}")),
            n => (">", format!("{var} -= {}", n.unsigned_abs())),
        };
        self.line(format!("for ({init}; {var} {cmp} {bound}; {update}) {{"));
        self.breakables.push(Breakable::Loop);
        let res = self.nested(&f.body);
        self.breakables.pop();
        res?;
        self.line("}");
        Ok(())
    }

    /// `<var>_stop`, suffixé d'un numéro si le nom est déjà pris.
    fn fresh_name(&mut self, var: &str) -> String {
        let stem = match var.trim_end_matches('_') {
            "" => "range",
            trimmed => trimmed,
        };
        let mut candidate = format!("{stem}_stop");
        let mut n = 1;
        while self.names.contains(&candidate) {
            n += 1;
            candidate = format!("{stem}_stop{n}");
        }
        self.names.insert(candidate.clone());
        candidate
    }

    /// `case v: { ... break; }`, défaut en dernier. Un cas marqué `fallthrough`
    /// n'a pas de `break` et continue dans le cas émis juste après.
    fn dispatch(&mut self, d: &DispatchStatement) -> Result<(), CompileError> {
        if d.scrutinee.ty == InferredType::Text {
            return Err(CompileError::unsupported(
                d.scrutinee.pos,
                "`match` over a Text value (C++ `switch` needs an integral subject)",
            ));
        }
        let subject = self.expr(&d.scrutinee)?;
        // un `switch` sur un `bool` est signalé par -Wswitch-bool
        if d.scrutinee.ty == InferredType::Boolean {
            self.line(format!("switch (static_cast<int>({subject})) {{"));
        } else {
            self.line(format!("switch ({subject}) {{"));
        }
        self.breakables.push(Breakable::Switch);
        let res = self.dispatch_clauses(d);
        self.breakables.pop();
        res?;
        self.line("}");
        Ok(())
    }

    fn dispatch_clauses(&mut self, d: &DispatchStatement) -> Result<(), CompileError> {
        for (i, case) in d.cases.iter().enumerate() {
            let label = match &case.value {
                Literal::Int(n) => self.int_literal(*n, case.pos)?,
                Literal::Bool(b) => b.to_string(),
                Literal::Text(_) => {
                    return Err(CompileError::unsupported(case.pos, "Text `case` value"));
                }
            };
            let has_next = i + 1 < d.cases.len() || d.default.is_some();
            if case.falls_through && case.body.stmts.is_empty() && has_next {
                // cas groupés : `case 1: case 2: { ... }`
                self.line(format!("case {label}:"));
                continue;
            }
            self.line(format!("case {label}: {{"));
            self.depth += 1;
            self.block(&case.body)?;
            if !case.falls_through {
                self.line("break;");
            } else if has_next {
                self.line("[[fallthrough]];");
            }
            self.depth -= 1;
            self.line("}");
        }
        if let Some(default) = &d.default {
            self.line("default: {");
            self.depth += 1;
            self.block(default)?;
            self.line("break;");
            self.depth -= 1;
            self.line("}");
        }
        Ok(())
    }

    /* ─────────────────────────── Expressions ─────────────────────────── */

    /// Condition C++ : vérité source pour Integer (`!= 0`) et Text (non vide).
    fn condition(&self, e: &Expr) -> Result<String, CompileError> {
        let text = self.expr(e)?;
        Ok(match e.ty {
            InferredType::Integer if e.is_atom() => format!("{text} != 0"),
            InferredType::Integer => format!("({text}) != 0"),
            InferredType::Text if matches!(e.kind, ExprKind::Ident(_)) => format!("!{text}.empty()"),
            InferredType::Text => format!("!{}.empty()", string_operand(e, text)),
            _ => text,
        })
    }

    fn expr(&self, e: &Expr) -> Result<String, CompileError> {
        if e.ty == InferredType::Unknown {
            return Err(CompileError::unsupported(e.pos, "expression whose type could not be inferred"));
        }
        Ok(match &e.kind {
            ExprKind::Literal(Literal::Int(n)) => self.int_literal(*n, e.pos)?,
            ExprKind::Literal(lit) => literal(lit),
            ExprKind::Ident(name) => cpp_ident(name, e.pos)?,
            ExprKind::Unary { op, operand } => {
                let inner = self.expr(operand)?;
                match op {
                    UnaryOp::Neg if operand.is_atom() => format!("-{inner}"),
                    UnaryOp::Neg => format!("-({inner})"),
                    UnaryOp::Not => format!("!({inner})"),
                }
            }
            ExprKind::IncDec { op, fixity, operand } => {
                let inner = self.expr(operand)?;
                match fixity {
                    Fixity::Prefix => format!("{}{inner}", op.as_str()),
                    Fixity::Postfix => format!("{inner}{}", op.as_str()),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let mut l = self.operand(lhs)?;
                let mut r = self.operand(rhs)?;
                if op.is_comparison() {
                    // "a" < "b" comparerait des pointeurs
                    l = string_operand(lhs, l);
                    r = string_operand(rhs, r);
                }
                format!("{l} {} {r}", op.as_str())
            }
            ExprKind::Logical { op, lhs, rhs } => {
                let l = self.expr(lhs)?;
                let r = self.expr(rhs)?;
                format!("({l}) {} ({r})", op.as_str())
            }
        })
    }

    /// Opérande d'un binaire : parenthésé s'il est lui-même binaire/logique.
    fn operand(&self, e: &Expr) -> Result<String, CompileError> {
        let text = self.expr(e)?;
        Ok(match e.kind {
            ExprKind::Binary { .. } | ExprKind::Logical { .. } => format!("({text})"),
            _ => text,
        })
    }

    /// Un littéral hors de l'entier C++ choisi changerait de valeur.
    fn int_literal(&self, n: i64, pos: Pos) -> Result<String, CompileError> {
        if self.config.int_type == IntType::Int && i32::try_from(n).is_err() {
            return Err(CompileError::unsupported(
                pos,
                format!("integer literal {n} with `int_type = \"int\"` (outside the 32-bit range)"),
            ));
        }
        Ok(n.to_string())
    }

    fn cpp_type(&self, ty: InferredType, pos: Pos) -> Result<&'static str, CompileError> {
        match ty {
            InferredType::Integer => Ok(self.config.int_type.as_cpp()),
            InferredType::Boolean => Ok("bool"),
            InferredType::Text => Ok("std::string"),
            InferredType::Unknown => Err(CompileError::unsupported(pos, "declaration of unknown type")),
        }
    }
}

fn cpp_ident(name: &str, pos: Pos) -> Result<String, CompileError> {
    let reason = if CPP_RESERVED.contains(&name) {
        "reserved in C++"
    } else if CPP_PREDEFINED.contains(&name) {
        "defined by the standard headers"
    } else if name.contains("__") || (name.starts_with('_') && name[1..].starts_with(|c: char| c.is_ascii_uppercase())) {
        "reserved for the C++ implementation"
    } else {
        return Ok(name.to_owned());
    };
    Err(CompileError::unsupported(pos, format!("variable name `{name}` ({reason})")))
}

/// Tous les noms déclarés dans le programme, quel que soit le bloc.
fn collect_names(block: &Block, names: &mut HashSet<String>) {
    for stmt in &block.stmts {
        match stmt {
            Stmt::Assign(a) => {
                names.insert(a.name.clone());
            }
            Stmt::For(f) => {
                names.insert(f.var.clone());
                collect_names(&f.body, names);
            }
            Stmt::While(w) => collect_names(&w.body, names),
            Stmt::If(chain) => {
                for arm in &chain.arms {
                    collect_names(&arm.body, names);
                }
                if let Some(otherwise) = &chain.otherwise {
                    collect_names(otherwise, names);
                }
            }
            Stmt::Dispatch(d) => {
                for case in &d.cases {
                    collect_names(&case.body, names);
                }
                if let Some(default) = &d.default {
                    collect_names(default, names);
                }
            }
            Stmt::Print(_)
            | Stmt::IncDec(_)
            | Stmt::Break(_)
            | Stmt::Continue(_)
            | Stmt::Pass(_)
            | Stmt::Fallthrough(_) => {}
        }
    }
}

fn string_operand(e: &Expr, text: String) -> String {
    if matches!(e.kind, ExprKind::Literal(Literal::Text(_))) {
        format!("std::string({text})")
    } else {
        text
    }
}

fn literal(lit: &Literal) -> String {
    match lit {
        Literal::Int(n) => n.to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Text(s) => cpp_string(s),
    }
}

/// Littéral chaîne C++ ; les contrôles passent en octal sur 3 chiffres
/// (un `\0` suivi d'un chiffre serait relu comme un autre octal).
fn cpp_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_ascii_control() => out.push_str(&format!("\\{:03o}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorKind;
    use crate::infer::infer_program;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use crate::print::IostreamPrint;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn gen_with(src: &str, config: &TranspileConfig) -> Result<String, CompileError> {
        let mut program = parse(tokenize(src)?)?;
        infer_program(&mut program)?;
        let code = CodeGenerator::new(config, &IostreamPrint).generate(&program)?;
        Ok(code
            .lines()
            .iter()
            .map(|l| format!("{}{}\n", "  ".repeat(l.depth), l.text))
            .collect())
    }

    fn gen(src: &str) -> String {
        gen_with(src, &TranspileConfig::default()).unwrap()
    }

    fn gen_err(src: &str) -> CompileError {
        gen_with(src, &TranspileConfig::default()).unwrap_err()
    }

    #[test]
    fn declarations_then_bare_reassignments() {
        let got = gen("a = 5\nok = a < 10\ns = \"hi\"\na = a * 2\n");
        assert_eq!(
            got,
            indoc! {r#"
                long long a = 5;
                bool ok = a < 10;
                std::string s = "hi";
                a = a * 2;
            "#}
        );
    }

    #[test]
    fn int_spelling_follows_config() {
        let config = TranspileConfig {
            int_type: crate::config::IntType::Int64,
            ..TranspileConfig::default()
        };
        assert_eq!(gen_with("n = 1\n", &config).unwrap(), "std::int64_t n = 1;\n");
    }

    #[test]
    fn nested_operands_keep_their_grouping() {
        assert_eq!(gen("a = 1\nb = (a + 2) * (a - 3) - a\n"), "long long a = 1;\nlong long b = ((a + 2) * (a - 3)) - a;\n");
        assert_eq!(gen("a = 1\nb = a - (a - 1)\n"), "long long a = 1;\nlong long b = a - (a - 1);\n");
        assert_eq!(gen("a = 1\nb = -(a + 1)\n"), "long long a = 1;\nlong long b = -(a + 1);\n");
    }

    #[test]
    fn logical_operands_are_always_parenthesized() {
        let got = gen("a = 5\nb = 10\nc = a < b and not (b > 0) || a == b\n");
        assert!(
            got.ends_with("bool c = ((a < b) && (!(b > 0))) || (a == b);\n"),
            "{got}"
        );
    }

    #[test]
    fn text_literals_in_comparisons_become_strings() {
        let got = gen("s = \"b\"\nx = \"a\" < s\ny = \"a\" == \"a\"\n");
        assert!(got.contains("bool x = std::string(\"a\") < s;"), "{got}");
        assert!(got.contains("bool y = std::string(\"a\") == std::string(\"a\");"), "{got}");
    }

    #[test]
    fn if_chain_maps_one_to_one() {
        let got = gen(indoc! {r#"
            a = 5
            b = 10
            if a < b:
                print("lt")
            elif a == b:
                print("eq")
            else:
                print("gt")
        "#});
        assert_eq!(
            got,
            indoc! {r#"
                long long a = 5;
                long long b = 10;
                if (a < b) {
                  std::cout << "lt" << '\n';
                } else if (a == b) {
                  std::cout << "eq" << '\n';
                } else {
                  std::cout << "gt" << '\n';
                }
            "#}
        );
    }

    #[test]
    fn conditions_apply_source_truthiness() {
        let got = gen("n = 3\ns = \"x\"\nwhile n:\n    n--\nif s: pass\nif n + 1: pass\nif \"\": pass\n");
        assert!(got.contains("while (n != 0) {"), "{got}");
        assert!(got.contains("if (!s.empty()) {"), "{got}");
        assert!(got.contains("if ((n + 1) != 0) {"), "{got}");
        assert!(got.contains("if (!std::string(\"\").empty()) {"), "{got}");
    }

    #[test]
    fn dispatch_emits_switch_with_default_last() {
        let got = gen(indoc! {r#"
            option = 2
            match option:
                case 1:
                    print("one")
                case _:
                    print("other")
                case 2:
                    print("two")
                    fallthrough
                case 3:
                    print("three")
        "#});
        assert_eq!(
            got,
            indoc! {r#"
                long long option = 2;
                switch (option) {
                case 1: {
                  std::cout << "one" << '\n';
                  break;
                }
                case 2: {
                  std::cout << "two" << '\n';
                  [[fallthrough]];
                }
                case 3: {
                  std::cout << "three" << '\n';
                  break;
                }
                default: {
                  std::cout << "other" << '\n';
                  break;
                }
                }
            "#}
        );
    }

    #[test]
    fn empty_fallthrough_cases_are_grouped() {
        let got = gen("x = -1\nmatch x:\n    case -1: fallthrough\n    case 0:\n        print(x)\n");
        assert!(got.contains("case -1:\ncase 0: {\n"), "{got}");
    }

    #[test]
    fn last_fallthrough_case_has_no_attribute() {
        let got = gen("x = 1\nmatch x:\n    case 1:\n        x++\n        fallthrough\n");
        assert!(!got.contains("[[fallthrough]]"), "{got}");
        assert!(!got.contains("break;"), "{got}");
    }

    #[test]
    fn text_dispatch_is_unsupported() {
        let err = gen_err("s = \"a\"\nmatch s:\n    case \"a\": pass\n");
        assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
        assert_eq!(err.pos(), Pos::new(2, 7));
    }

    #[test]
    fn break_inside_case_inside_loop_is_unsupported() {
        let src = "i = 0\nwhile i < 3:\n    match i:\n        case 1:\n            break\n    i++\n";
        let err = gen_err(src);
        assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
        assert_eq!(err.pos(), Pos::new(5, 13));

        // un `while` interne redonne à `break` son sens
        let ok = gen("i = 0\nwhile i < 3:\n    match i:\n        case 1:\n            while True:\n                break\n    i++\n");
        assert!(ok.contains("break;"), "{ok}");
        // `continue` vise toujours la boucle
        assert!(gen("i = 0\nwhile i < 3:\n    i++\n    match i:\n        case 1:\n            continue\n").contains("continue;"));
    }

    #[test]
    fn reserved_cpp_names_are_unsupported() {
        let err = gen_err("int = 1\n");
        assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
        assert!(err.to_string().contains("`int`"), "{err}");

        for name in ["EOF", "NULL", "errno", "stdin", "stdout", "stderr", "assert", "__x", "a__b", "_Upper"] {
            let err = gen_err(&format!("{name} = 1\nprint({name})\n"));
            assert_eq!((err.kind(), err.pos()), (ErrorKind::UnsupportedConstruct, Pos::new(1, 1)), "{name}");
        }
        assert_eq!(
            gen_err("EOF = 1\n").to_string(),
            "UnsupportedConstruct at 1:1: variable name `EOF` (defined by the standard headers) has no C++ translation"
        );
        assert_eq!(gen("_lower = 1\nEof = 2\n"), "long long _lower = 1;\nlong long Eof = 2;\n");
    }

    #[test]
    fn int_spelling_rejects_literals_it_cannot_hold() {
        let int = TranspileConfig {
            int_type: crate::config::IntType::Int,
            ..TranspileConfig::default()
        };
        let err = gen_with("a = 3000000000\nprint(a)\n", &int).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
        assert_eq!(err.pos(), Pos::new(1, 5));
        assert!(err.to_string().contains("3000000000"), "{err}");

        let err = gen_with("a = 1\nmatch a:\n    case 4294967296: pass\n", &int).unwrap_err();
        assert_eq!(err.pos(), Pos::new(3, 10));

        assert_eq!(gen_with("a = 2147483647\n", &int).unwrap(), "int a = 2147483647;\n");
        assert_eq!(gen("a = 3000000000\n"), "long long a = 3000000000;\n");
    }

    #[test]
    fn for_range_becomes_a_counted_loop() {
        assert_eq!(
            gen("for i in range(3):\n    print(i)\n"),
            "for (long long i = 0; i < 3; ++i) {\n  std::cout << i << '\\n';\n}\n"
        );
        assert_eq!(
            gen("n = 5\nfor i in range(1, n, 2): pass\n"),
            "long long n = 5;\nfor (long long i = 1, i_stop = n; i < i_stop; i += 2) {\n}\n"
        );
        assert_eq!(gen("for k in range(10, -1, -3): pass\n"), "for (long long k = 10; k > -1; k -= 3) {\n}\n");
        assert_eq!(gen("for k in range(3, 0, -1): pass\n"), "for (long long k = 3; k > 0; --k) {\n}\n");
    }

    #[test]
    fn hidden_loop_bound_never_shadows_a_program_name() {
        let got = gen("i_stop = 4\nfor i in range(i_stop):\n    print(i_stop)\n");
        assert!(got.contains("for (long long i = 0, i_stop2 = i_stop; i < i_stop2; ++i) {"), "{got}");

        let got = gen("n = 2\nfor i in range(n):\n    for j in range(n): pass\nfor i in range(n): pass\n");
        assert!(got.contains("i_stop = n; i < i_stop;"), "{got}");
        assert!(got.contains("j_stop = n; j < j_stop;"), "{got}");
        assert!(got.contains("i_stop2 = n; i < i_stop2;"), "{got}");

        let got = gen("n = 2\nfor _ in range(n): pass\n");
        assert!(got.contains("long long _ = 0, range_stop = n;"), "{got}");
    }

    #[test]
    fn break_in_for_targets_the_loop() {
        let got = gen("for i in range(9):\n    if i == 3:\n        break\n");
        assert!(got.contains("    break;\n"), "{got}");
        let err = gen_err("for i in range(9):\n    match i:\n        case 3:\n            break\n");
        assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
    }

    #[test]
    fn boolean_subject_switches_on_an_int() {
        let got = gen("flag = 2 > 1\nmatch flag:\n    case True:\n        print(1)\n    case False: pass\n");
        assert!(got.contains("switch (static_cast<int>(flag)) {\ncase true: {\n"), "{got}");
        assert!(got.contains("case false: {\n"), "{got}");
    }

    #[test]
    fn unknown_types_never_reach_the_output() {
        // AST non annoté : aucune inférence n'a tourné
        let program = parse(tokenize("a = 1\n").unwrap()).unwrap();
        let err = CodeGenerator::new(&TranspileConfig::default(), &IostreamPrint)
            .generate(&program)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
    }

    #[test]
    fn increments_and_prints() {
        let got = gen("a = 5\na++\n--a\nprint(a, a == 5, \"done\")\nprint()\n");
        assert_eq!(
            got,
            indoc! {r#"
                long long a = 5;
                a++;
                --a;
                std::cout << a << ' ' << ((a == 5) ? 1 : 0) << ' ' << "done" << '\n';
                std::cout << '\n';
            "#}
        );
    }

    #[test]
    fn string_escapes_are_valid_cpp() {
        assert_eq!(cpp_string("a\"b\\c\n\t"), r#""a\"b\\c\n\t""#);
        assert_eq!(cpp_string("\u{0}1"), r#""\0001""#);
        assert_eq!(cpp_string("é"), "\"é\"");
    }
}
