#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use rental_contract_server::catalog::VehicleCatalog;
use rental_contract_server::config::DeliveryMode;
use rental_contract_server::contract::{ContractPipeline, PipelineSettings, RentalRequest};
use rental_contract_server::documents::{ConversionError, DocumentConverter};
use rental_contract_server::notifier::{Notifier, NotifyError, OutgoingEmail};

pub const RECIPIENT: &str = "locadora@example.com";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

/// Every placeholder the rental contract uses, one paragraph each.
pub const CONTRACT_KEYS: [&str; 23] = [
    "locatario_nome",
    "locatario_nacionalidade",
    "locatario_estado_civil",
    "locatario_profissao",
    "locatario_rg",
    "locatario_cpf",
    "locatario_cnh",
    "locatario_rua",
    "locatario_numero",
    "locatario_bairro",
    "locatario_cep",
    "locatario_cidade",
    "locatario_uf",
    "carro_marca",
    "carro_modelo",
    "carro_ano",
    "carro_cor",
    "carro_placa",
    "carro_categoria",
    "carro_valor_avaliacao",
    "dias_locacao",
    "data_inicio",
    "data_fim",
];

/// Wrap paragraph run XML into a minimal WordprocessingML body.
pub fn document_xml(runs: &[String]) -> String {
    let paragraphs: String = runs.iter().map(|r| format!("<w:p>{}</w:p>", r)).collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        paragraphs
    )
}

/// One `key=[{{ key }}]` line per contract placeholder.
pub fn contract_document_xml() -> String {
    let runs: Vec<String> = CONTRACT_KEYS
        .iter()
        .map(|key| format!("<w:r><w:t>{}=[{{{{ {} }}}}]</w:t></w:r>", key, key))
        .collect();
    document_xml(&runs)
}

/// Write a `.docx` archive from `(part name, content)` pairs.
pub fn write_docx(path: &Path, parts: &[(&str, String)]) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    let options = FileOptions::default();

    writer.start_file("[Content_Types].xml", options).unwrap();
    writer.write_all(CONTENT_TYPES.as_bytes()).unwrap();
    for (name, content) in parts {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

pub fn write_contract_template(path: &Path) {
    write_docx(path, &[("word/document.xml", contract_document_xml())]);
}

pub fn read_docx_part(path: &Path, name: &str) -> String {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut out = String::new();
    part.read_to_string(&mut out).unwrap();
    out
}

/// Extract `key=[value]` pairs written by [`contract_document_xml`].
pub fn filled_value(document: &str, key: &str) -> String {
    let marker = format!("{}=[", key);
    let start = document.find(&marker).unwrap() + marker.len();
    let end = document[start..].find(']').unwrap() + start;
    document[start..end].to_string()
}

/// Write a PDF with one page per label; each page draws its label as text.
pub fn write_labelled_pdf(path: &Path, labels: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for label in labels {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(*label)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => labels.len() as u32,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// The label drawn on each page, in page order.
pub fn page_labels(path: &Path, candidates: &[&str]) -> Vec<String> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|page_id| {
            let content = doc.get_page_content(*page_id).unwrap();
            let text = String::from_utf8_lossy(&content).into_owned();
            candidates
                .iter()
                .find(|label| text.contains(&format!("({})", label)))
                .map(|label| label.to_string())
                .unwrap_or_else(|| "?".to_string())
        })
        .collect()
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Pixel size of the image drawn on each page, `None` for pages without one.
pub fn page_image_sizes(path: &Path) -> Vec<Option<(i64, i64)>> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|page_id| {
            let page = doc.get_dictionary(*page_id).ok()?;
            let resources = resolve(&doc, page.get(b"Resources").ok()?)?.as_dict().ok()?;
            let xobjects = resolve(&doc, resources.get(b"XObject").ok()?)?.as_dict().ok()?;
            let image = resolve(&doc, xobjects.get(b"Im0").ok()?)?.as_stream().ok()?;
            let width = image.dict.get(b"Width").ok()?.as_i64().ok()?;
            let height = image.dict.get(b"Height").ok()?.as_i64().ok()?;
            Some((width, height))
        })
        .collect()
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]))
        .save(path)
        .unwrap();
}

/// Stands in for the office suite: writes a one-page PDF labelled `CONTRATO`.
pub struct FakeConverter;

impl DocumentConverter for FakeConverter {
    fn convert(
        &self,
        input: &Path,
        out_dir: &Path,
        desired_name: &str,
    ) -> Result<PathBuf, ConversionError> {
        assert!(input.exists(), "converter input must exist");
        fs::create_dir_all(out_dir).unwrap();
        let output = out_dir.join(desired_name);
        write_labelled_pdf(&output, &["CONTRATO"]);
        Ok(output)
    }
}

pub struct FailingConverter;

impl DocumentConverter for FailingConverter {
    fn convert(&self, _: &Path, _: &Path, _: &str) -> Result<PathBuf, ConversionError> {
        Err(ConversionError::Exit {
            code: 1,
            output: "Error: source file could not be loaded".to_string(),
        })
    }
}

/// Records every email instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, email: OutgoingEmail) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub struct TestEnv {
    pub dir: TempDir,
    pub settings: PipelineSettings,
}

impl TestEnv {
    pub fn new(mode: DeliveryMode) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("contrato_template.docx");
        write_contract_template(&template_path);

        let settings = PipelineSettings {
            upload_dir: dir.path().join("uploads"),
            output_dir: dir.path().join("outputs"),
            template_path,
            template_strict: false,
            delivery_mode: mode,
            recipient: Some(RECIPIENT.to_string()),
        };
        Self { dir, settings }
    }

    pub fn pipeline(
        &self,
        converter: Arc<dyn DocumentConverter>,
        notifier: Arc<dyn Notifier>,
    ) -> ContractPipeline {
        ContractPipeline::new(
            self.settings.clone(),
            Arc::new(VehicleCatalog::default()),
            converter,
            notifier,
        )
    }

    pub fn output(&self, name: &str) -> PathBuf {
        self.settings.output_dir.join(name)
    }

    pub fn upload_files(&self) -> Vec<PathBuf> {
        match fs::read_dir(&self.settings.upload_dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

pub fn sample_request() -> RentalRequest {
    RentalRequest {
        locatario_nome: "Maria da Silva".to_string(),
        locatario_nacionalidade: "brasileira".to_string(),
        locatario_estado_civil: "casada".to_string(),
        locatario_profissao: "professora".to_string(),
        locatario_rg: "12.345.678-9".to_string(),
        locatario_cpf: "123.456.789-00".to_string(),
        locatario_cnh: "01234567890".to_string(),
        locatario_rua: "rua das acácias".to_string(),
        locatario_numero: "42".to_string(),
        locatario_bairro: "jardim américa".to_string(),
        locatario_cep: "01000-000".to_string(),
        locatario_cidade: "são paulo".to_string(),
        locatario_uf: "sp".to_string(),
        carro: "gol_2017".to_string(),
        data_inicio: "2025-01-10".to_string(),
        data_fim: "2025-01-15".to_string(),
    }
}
