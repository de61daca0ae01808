//! print.rs : support d'impression côté C++.
//!
//! Le générateur ne connaît pas la façon d'afficher une valeur ; il passe le
//! texte C++ de chaque argument et son type à un `PrintSupport`.

use crate::ast::InferredType;

/// Un argument de `print(...)` déjà traduit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintArg<'a> {
    pub text: &'a str,
    pub ty: InferredType,
    /// Littéral ou identifiant : pas besoin de parenthèses autour.
    pub atomic: bool,
}

pub trait PrintSupport {
    /// `#include` requis, ex. `<iostream>`.
    fn includes(&self) -> &[&'static str];

    /// Une instruction C++ complète (avec `;`) qui affiche les arguments
    /// séparés par une espace puis un saut de ligne.
    fn print_statement(&self, args: &[PrintArg<'_>]) -> String;
}

/// `std::cout`, booléens affichés `1` / `0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IostreamPrint;

impl PrintSupport for IostreamPrint {
    fn includes(&self) -> &[&'static str] {
        &["<iostream>"]
    }

    fn print_statement(&self, args: &[PrintArg<'_>]) -> String {
        let mut out = String::from("std::cout");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                out.push_str(" << ' '");
            }
            out.push_str(" << ");
            match arg.ty {
                InferredType::Boolean => {
                    out.push_str("((");
                    out.push_str(arg.text);
                    out.push_str(") ? 1 : 0)");
                }
                // `<<` lie plus fort que les comparaisons et `&&`
                _ if !arg.atomic => {
                    out.push('(');
                    out.push_str(arg.text);
                    out.push(')');
                }
                _ => out.push_str(arg.text),
            }
        }
        out.push_str(" << '\\n';");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg(text: &str, ty: InferredType, atomic: bool) -> PrintArg<'_> {
        PrintArg { text, ty, atomic }
    }

    #[test]
    fn empty_print_is_a_newline() {
        assert_eq!(IostreamPrint.print_statement(&[]), "std::cout << '\\n';");
    }

    #[test]
    fn arguments_are_space_separated() {
        let got = IostreamPrint.print_statement(&[
            arg("\"a =\"", InferredType::Text, true),
            arg("a", InferredType::Integer, true),
            arg("a + 1", InferredType::Integer, false),
        ]);
        assert_eq!(got, "std::cout << \"a =\" << ' ' << a << ' ' << (a + 1) << '\\n';");
    }

    #[test]
    fn booleans_print_as_digits() {
        let got = IostreamPrint.print_statement(&[arg("a < b", InferredType::Boolean, false)]);
        assert_eq!(got, "std::cout << ((a < b) ? 1 : 0) << '\\n';");
    }
}
