//! Office document to PDF conversion through an external headless converter.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("failed to start converter '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("converter exited with status {code}: {output}")]
    Exit { code: i32, output: String },
    #[error("converter reported success but {0} was not produced")]
    MissingOutput(PathBuf),
    #[error("failed to prepare conversion output: {0}")]
    Io(#[source] std::io::Error),
}

/// Converts one document into a PDF written to `out_dir/desired_name`.
pub trait DocumentConverter: Send + Sync {
    fn convert(
        &self,
        input: &Path,
        out_dir: &Path,
        desired_name: &str,
    ) -> Result<PathBuf, ConversionError>;
}

/// Runs LibreOffice (`soffice`) in headless mode.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: String,
}

impl SofficeConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SofficeConverter {
    fn default() -> Self {
        Self::new("soffice")
    }
}

impl DocumentConverter for SofficeConverter {
    fn convert(
        &self,
        input: &Path,
        out_dir: &Path,
        desired_name: &str,
    ) -> Result<PathBuf, ConversionError> {
        fs::create_dir_all(out_dir).map_err(ConversionError::Io)?;

        log::info!("Converting {} to PDF with {}", input.display(), self.program);
        let output = Command::new(&self.program)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            .output()
            .map_err(|source| ConversionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let diagnostic = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            log::error!("Converter exited with status {}: {}", code, diagnostic);
            return Err(ConversionError::Exit {
                code,
                output: diagnostic,
            });
        }

        let emitted = emitted_pdf_path(input, out_dir);
        finalize_output(&emitted, out_dir, desired_name)
    }
}

/// Where the converter writes its result: the input's stem with a `.pdf` extension.
pub fn emitted_pdf_path(input: &Path, out_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    out_dir.join(format!("{}.pdf", stem))
}

/// Move the emitted file to its final name if the two differ.
pub fn finalize_output(
    emitted: &Path,
    out_dir: &Path,
    desired_name: &str,
) -> Result<PathBuf, ConversionError> {
    if !emitted.exists() {
        return Err(ConversionError::MissingOutput(emitted.to_path_buf()));
    }

    let desired = out_dir.join(desired_name);
    if emitted != desired {
        fs::rename(emitted, &desired).map_err(ConversionError::Io)?;
        log::debug!("Renamed {} to {}", emitted.display(), desired.display());
    }
    Ok(desired)
}
