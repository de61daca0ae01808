//! emit.rs : assemblage final du fichier C++ (purement textuel).

use crate::codegen::GeneratedCode;
use crate::config::TranspileConfig;
use crate::print::PrintSupport;

pub struct Emitter<'a> {
    config: &'a TranspileConfig,
    print: &'a dyn PrintSupport,
}

impl<'a> Emitter<'a> {
    pub fn new(config: &'a TranspileConfig, print: &'a dyn PrintSupport) -> Self {
        Self { config, print }
    }

    /// `#include`s dédupliqués, dans l'ordre : print support, `<string>`, `<cstdint>`.
    pub fn includes(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::new();
        let extra = [
            Some("<string>"),
            self.config.int_type.needs_cstdint().then_some("<cstdint>"),
        ];
        for inc in self.print.includes().iter().copied().chain(extra.into_iter().flatten()) {
            if !out.contains(&inc) {
                out.push(inc);
            }
        }
        out
    }

    /// Fichier complet : en-tête optionnel, includes, `int main()` autour du code.
    pub fn emit(&self, code: &GeneratedCode, source_name: &str) -> String {
        let indent = " ".repeat(self.config.indent_width);
        let mut out = String::new();
        if self.config.header_comment {
            out.push_str(&format!(
                "// Generated by pyxc {} from {source_name}. Do not edit.\n",
                env!("CARGO_PKG_VERSION")
            ));
        }
        for inc in self.includes() {
            out.push_str("#include ");
            out.push_str(inc);
            out.push('\n');
        }
        out.push_str("\nint main() {\n");
        for line in code.lines() {
            for _ in 0..=line.depth {
                out.push_str(&indent);
            }
            out.push_str(&line.text);
            out.push('\n');
        }
        out.push_str(&indent);
        out.push_str("return 0;\n}\n");
        log::trace!("emit: {} byte(s) for {source_name}", out.len());
        out
    }
}
