//! pyxc-cli/src/lib.rs : CLI lib pour pyxc
//!
//! Sous-commandes :
//!   - build  : traduit un script en `.cpp` (écriture atomique, ou stdout)
//!   - check  : lexer + parser + inférence, sans rien écrire
//!   - tokens : dump des tokens (layout compris)
//!   - ast    : dump JSON de l'AST (annoté avec `--typed`)
//!
//! Configuration : defaults < `pyxc.toml` < ENV `PYXC_*` < flags.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::{debug, info};
use thiserror::Error;

use pyxc_compiler::config::CONFIG_FILE_NAME;
use pyxc_compiler::{
    check_source, default_output_path, parse_source, tokenize, write_atomic, CliOverrides, CompileError, ErrorKind,
    IntType, TranspileConfig, Transpiler,
};

/// Erreur de traduction déjà mise en forme (position, ligne source, caret).
#[derive(Debug, Error)]
#[error("{rendered}")]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub rendered: String,
}

/// Point d'entrée du binaire (à appeler depuis src/main.rs)
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dispatch(cli)
}

/// Exécute une ligne de commande déjà parsée (sans toucher au logger).
pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.cmd {
        Cmd::Build { input, output, stdout, codegen } => {
            let cfg = resolve_config(cli.config.as_deref(), &codegen.overrides(), |k| std::env::var(k).ok())?;
            let written = cmd_build(&cfg, &input, output.as_deref(), stdout)?;
            if let Some(path) = written {
                eprintln!("wrote {}", path.display());
            }
            Ok(())
        }
        Cmd::Check { input } => {
            let summary = cmd_check(&input)?;
            println!("{summary}");
            Ok(())
        }
        Cmd::Tokens { input } => {
            for tok in cmd_tokens(&input)? {
                println!("{tok}");
            }
            Ok(())
        }
        Cmd::Ast { input, typed } => {
            println!("{}", cmd_ast(&input, typed)?);
            Ok(())
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pyxc", version, about = "Translate restricted indentation scripts to C++17")]
pub struct Cli {
    /// Fichier de configuration (défaut : ./pyxc.toml s'il existe)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<Utf8PathBuf>,

    /// Verbosité : -v info, -vv debug, -vvv trace (RUST_LOG a le dernier mot)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Traduit un script en C++17
    Build {
        /// Script source
        input: Utf8PathBuf,
        /// Fichier de sortie (défaut : même nom, extension .cpp)
        #[arg(short, long, conflicts_with = "stdout")]
        output: Option<Utf8PathBuf>,
        /// Écrit le C++ sur stdout au lieu d'un fichier
        #[arg(long)]
        stdout: bool,
        #[command(flatten)]
        codegen: CodegenArgs,
    },
    /// Vérifie syntaxe et types sans générer de code
    Check {
        input: Utf8PathBuf,
    },
    /// Affiche les tokens produits par le lexer
    Tokens {
        input: Utf8PathBuf,
    },
    /// Affiche l'AST en JSON
    Ast {
        input: Utf8PathBuf,
        /// Lance l'inférence avant le dump (types + liaisons)
        #[arg(long)]
        typed: bool,
    },
}

/// Overrides de génération, dernier mot sur ENV et fichier.
#[derive(Args, Debug, Default)]
struct CodegenArgs {
    /// Espaces par niveau d'indentation
    #[arg(long, value_name = "N")]
    indent_width: Option<usize>,
    /// Type C++ des entiers : "long long", int, int64_t
    #[arg(long, value_name = "TYPE")]
    int_type: Option<IntType>,
    /// Pas de commentaire d'en-tête
    #[arg(long)]
    no_header: bool,
}

impl CodegenArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            indent_width: self.indent_width,
            int_type: self.int_type,
            header_comment: self.no_header.then_some(false),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

/// Defaults, puis fichier (explicite ou `./pyxc.toml`), puis ENV, puis flags.
pub fn resolve_config(
    explicit: Option<&Utf8Path>,
    overrides: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> Result<TranspileConfig> {
    let file = match explicit {
        Some(path) => Some(path.to_owned()),
        None => Some(Utf8PathBuf::from(CONFIG_FILE_NAME)).filter(|p| p.exists()),
    };
    let base = match &file {
        Some(path) => TranspileConfig::load(path.as_std_path()).with_context(|| format!("loading {path}"))?,
        None => TranspileConfig::default(),
    };
    let mut cfg = base.apply_env_from(env).context("reading PYXC_* environment")?;
    cfg.apply_cli_overrides(overrides);
    cfg.validate().context("command-line options")?;
    debug!("config: {cfg:?}");
    Ok(cfg)
}

/* ───────────────────────────── Commandes ───────────────────────────── */

/// Traduit `input` ; rend le chemin écrit, `None` si envoyé sur stdout.
/// Rien n'est écrit si une étape échoue.
pub fn cmd_build(
    cfg: &TranspileConfig,
    input: &Utf8Path,
    output: Option<&Utf8Path>,
    stdout: bool,
) -> Result<Option<PathBuf>> {
    let src = read_source(input)?;
    let name = input.file_name().unwrap_or(input.as_str());
    let cpp = Transpiler::new(cfg.clone())
        .transpile(&src, name)
        .map_err(|e| diagnostic(&e, &src, input))?;

    if stdout {
        print!("{cpp}");
        return Ok(None);
    }
    let out = output.map_or_else(|| default_output_path(input.as_std_path()), |p| p.as_std_path().to_path_buf());
    if same_file(&out, input.as_std_path()) {
        bail!("output {} would overwrite the input", out.display());
    }
    write_atomic(&out, &cpp).with_context(|| format!("writing {}", out.display()))?;
    info!("{input} -> {}", out.display());
    Ok(Some(out))
}

pub fn cmd_check(input: &Utf8Path) -> Result<String> {
    let src = read_source(input)?;
    let program = check_source(&src).map_err(|e| diagnostic(&e, &src, input))?;
    Ok(format!("{input}: ok, {} top-level statement(s)", program.body.stmts.len()))
}

pub fn cmd_tokens(input: &Utf8Path) -> Result<Vec<pyxc_compiler::Token>> {
    let src = read_source(input)?;
    tokenize(&src).map_err(|e| diagnostic(&e, &src, input).into())
}

pub fn cmd_ast(input: &Utf8Path, typed: bool) -> Result<String> {
    let src = read_source(input)?;
    let program = if typed { check_source(&src) } else { parse_source(&src) };
    let program = program.map_err(|e| diagnostic(&e, &src, input))?;
    serde_json::to_string_pretty(&program).context("serializing AST")
}

/* ───────────────────────────── Helpers ───────────────────────────── */

fn read_source(path: &Utf8Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read {path}"))
}

fn diagnostic(err: &CompileError, src: &str, path: &Utf8Path) -> Diagnostic {
    Diagnostic {
        kind: err.kind(),
        rendered: err.render(src, path.as_str()),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
