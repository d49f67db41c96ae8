//! `.docx` template filling.
//!
//! A Word document is a ZIP archive of XML parts. Placeholders are written in
//! the template as `{{ key }}`; Word frequently splits such text over several
//! runs, so markup found between the braces is discarded together with the
//! placeholder when the value is substituted.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::common::escape_xml;
use super::context::RenderContext;

const MAIN_PART: &str = "word/document.xml";

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"(?s)\{(?:<[^>]*>)*\{(.*?)\}(?:<[^>]*>)*\}").expect("valid placeholder regex");
    static ref MARKUP: Regex = Regex::new(r"<[^>]*>").expect("valid markup regex");
    static ref IDENTIFIER: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex");
}

#[derive(Debug, Error)]
pub enum FillError {
    #[error("failed to open contract template: {0}")]
    TemplateIo(#[source] std::io::Error),
    #[error("contract template is not a valid .docx archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("contract template has no word/document.xml part")]
    NotADocx,
    #[error("template part {0} is not valid UTF-8")]
    Encoding(String),
    #[error("malformed placeholder '{0}' in template")]
    MalformedPlaceholder(String),
    #[error("template field '{0}' has no value")]
    MissingField(String),
    #[error("failed to write filled document: {0}")]
    WriteOutput(#[source] std::io::Error),
}

/// Fills a `.docx` template from a [`RenderContext`].
#[derive(Debug, Clone)]
pub struct DocxFiller {
    template_path: PathBuf,
    output_dir: PathBuf,
    strict: bool,
}

impl DocxFiller {
    pub fn new(template_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            output_dir: output_dir.into(),
            strict: false,
        }
    }

    /// When strict, a placeholder without a value aborts the fill instead of
    /// rendering blank.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Fill the template and write `<output_base>.docx` into the output directory.
    pub fn fill(&self, context: &RenderContext, output_base: &str) -> Result<PathBuf, FillError> {
        let template = File::open(&self.template_path).map_err(FillError::TemplateIo)?;
        let mut archive = ZipArchive::new(template)?;
        if archive.by_name(MAIN_PART).is_err() {
            return Err(FillError::NotADocx);
        }

        fs::create_dir_all(&self.output_dir).map_err(FillError::WriteOutput)?;
        let output_path = self.output_dir.join(format!("{}.docx", output_base));

        if let Err(e) = self.write_filled(&mut archive, context, &output_path) {
            let _ = fs::remove_file(&output_path);
            return Err(e);
        }

        log::info!(
            "Filled template {} into {}",
            self.template_path.display(),
            output_path.display()
        );
        Ok(output_path)
    }

    fn write_filled(
        &self,
        archive: &mut ZipArchive<File>,
        context: &RenderContext,
        output_path: &Path,
    ) -> Result<(), FillError> {
        let output = File::create(output_path).map_err(FillError::WriteOutput)?;
        let mut writer = ZipWriter::new(output);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();

            if entry.is_dir() {
                writer.add_directory(name, options)?;
                continue;
            }

            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data).map_err(FillError::TemplateIo)?;

            if is_fillable_part(&name) {
                let xml = String::from_utf8(data).map_err(|_| FillError::Encoding(name.clone()))?;
                data = render_xml(&xml, context, self.strict)?.into_bytes();
            }

            writer.start_file(name, options)?;
            writer.write_all(&data).map_err(FillError::WriteOutput)?;
        }

        writer.finish()?;
        Ok(())
    }
}

/// Parts of a Word package that may carry placeholders.
fn is_fillable_part(name: &str) -> bool {
    let Some(file) = name.strip_prefix("word/") else {
        return false;
    };
    if file.contains('/') || !file.ends_with(".xml") {
        return false;
    }
    file == "document.xml"
        || file == "footnotes.xml"
        || file == "endnotes.xml"
        || file.starts_with("header")
        || file.starts_with("footer")
}

/// Substitute every `{{ key }}` placeholder in an XML part.
pub fn render_xml(xml: &str, context: &RenderContext, strict: bool) -> Result<String, FillError> {
    let mut out = String::with_capacity(xml.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(xml) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        let key = MARKUP.replace_all(inner.as_str(), "");
        let key = key.trim();
        if !IDENTIFIER.is_match(key) {
            return Err(FillError::MalformedPlaceholder(key.to_string()));
        }

        let value = match context.get(key) {
            Some(value) => value,
            None if strict => return Err(FillError::MissingField(key.to_string())),
            None => {
                log::warn!("Template field '{}' has no value; rendering blank", key);
                ""
            }
        };

        out.push_str(&xml[last..whole.start()]);
        out.push_str(&escape_xml(value));
        last = whole.end();
    }

    out.push_str(&xml[last..]);
    Ok(out)
}
