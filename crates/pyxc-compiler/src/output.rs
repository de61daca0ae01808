//! output.rs : écriture tout-ou-rien du fichier C++.
//!
//! Le texte est écrit dans un fichier temporaire du répertoire de destination,
//! puis renommé atomiquement. Un échec ne laisse jamais de fichier partiel.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("cannot create temporary file in {dir}: {source}")]
    Create {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Chemin par défaut : même nom que l'entrée, extension `.cpp`.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("cpp")
}

/// Écrit `text` dans `path` de façon atomique (temp + rename).
pub fn write_atomic(path: &Path, text: &str) -> Result<(), OutputError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = NamedTempFile::new_in(&dir).map_err(|source| OutputError::Create { dir: dir.clone(), source })?;
    let write_err = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };
    tmp.write_all(text.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    log::debug!("output: wrote {} ({} bytes)", path.display(), text.len());
    Ok(())
}
