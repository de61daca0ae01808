//! pyxc-compiler : traducteur d'un script indenté restreint vers C++17.
//!
//! Pipeline batch, chaque étape consomme toute la sortie de la précédente :
//!  - `lexer`   : source -> tokens (+ `Newline` / `Indent` / `Dedent`)
//!  - `parser`  : descente récursive -> `ast::Program`
//!  - `infer`   : types Integer / Boolean / Text, portées par bloc
//!  - `codegen` : AST annoté -> `GeneratedCode`
//!  - `emit`    : includes + `int main()` autour des lignes
//!
//! API publique : `Transpiler` (configurable) ou `transpile_str` (défauts) ;
//! `tokenize`, `parse_source` et `check_source` pour les étapes amont.
//! Aucun état global : chaque appel construit sa propre table des symboles.
//!
//! ```
//! let cpp = pyxc_compiler::transpile_str("a = 5\na++\nprint(a)\n", "demo.py").unwrap();
//! assert!(cpp.contains("long long a = 5;"));
//! assert!(cpp.contains("int main() {"));
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]

pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod emit;
pub mod infer;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod print;

pub use ast::{InferredType, Program};
pub use codegen::{CodeGenerator, GeneratedCode};
pub use config::{CliOverrides, ConfigError, IntType, TranspileConfig};
pub use diagnostics::{CompileError, ErrorKind, Pos};
pub use emit::Emitter;
pub use lexer::{tokenize, Token};
pub use output::{default_output_path, write_atomic, OutputError};
pub use print::{IostreamPrint, PrintArg, PrintSupport};

/// --------- API PUBLIQUE ---------

/// Pipeline complète, paramétrée par une config et un support d'impression.
pub struct Transpiler {
    config: TranspileConfig,
    print: Box<dyn PrintSupport>,
}

impl Default for Transpiler {
    fn default() -> Self {
        Self::new(TranspileConfig::default())
    }
}

impl Transpiler {
    pub fn new(config: TranspileConfig) -> Self {
        Self {
            config,
            print: Box::new(IostreamPrint),
        }
    }

    /// Remplace l'impression `std::cout` par défaut.
    #[must_use]
    pub fn with_print_support(mut self, print: impl PrintSupport + 'static) -> Self {
        self.print = Box::new(print);
        self
    }

    pub fn config(&self) -> &TranspileConfig {
        &self.config
    }

    /// Corps de `main` seulement, sans includes.
    pub fn generate(&self, source: &str) -> Result<GeneratedCode, CompileError> {
        let program = check_source(source)?;
        CodeGenerator::new(&self.config, self.print.as_ref()).generate(&program)
    }

    /// Traduction complète ; `source_name` apparaît dans l'en-tête.
    pub fn transpile(&self, source: &str, source_name: &str) -> Result<String, CompileError> {
        let code = self.generate(source)?;
        let text = Emitter::new(&self.config, self.print.as_ref()).emit(&code, source_name);
        log::info!("{source_name}: {} line(s) of C++", text.lines().count());
        Ok(text)
    }
}

/// Lexer + parser, sans inférence.
pub fn parse_source(source: &str) -> Result<Program, CompileError> {
    parser::parse(lexer::tokenize(source)?)
}

/// Jusqu'à l'inférence incluse : l'AST rendu est annoté.
pub fn check_source(source: &str) -> Result<Program, CompileError> {
    let mut program = parse_source(source)?;
    infer::infer_program(&mut program)?;
    Ok(program)
}

/// Traduction avec la configuration par défaut.
pub fn transpile_str(source: &str, source_name: &str) -> Result<String, CompileError> {
    Transpiler::default().transpile(source, source_name)
}
