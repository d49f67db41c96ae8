mod common;

#[cfg(test)]
mod docx_filler_tests {
    use std::fs;

    use rental_contract_server::documents::{DocxFiller, FillError, RenderContext};

    use crate::common::{document_xml, read_docx_part, write_docx};

    fn context() -> RenderContext {
        let mut ctx = RenderContext::new();
        ctx.insert_upper("locatario_nome", "maria da silva");
        ctx.insert("locatario_cpf", "123.456.789-00");
        ctx.insert("data_inicio", "10/01/2025");
        ctx
    }

    #[test]
    fn test_fill_replaces_body_header_and_footer() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.docx");
        write_docx(
            &template,
            &[
                (
                    "word/document.xml",
                    document_xml(&[
                        "<w:r><w:t>Locatário: {{ locatario_nome }}</w:t></w:r>".to_string(),
                        "<w:r><w:t>CPF: {{</w:t></w:r><w:r><w:t>locatario_cpf</w:t></w:r><w:r><w:t>}}</w:t></w:r>".to_string(),
                    ]),
                ),
                ("word/header1.xml", "<w:hdr><w:t>Início {{data_inicio}}</w:t></w:hdr>".to_string()),
                ("word/footer1.xml", "<w:ftr><w:t>{{ locatario_nome }}</w:t></w:ftr>".to_string()),
                ("word/styles.xml", "<w:styles>{{ untouched }}</w:styles>".to_string()),
            ],
        );

        let filler = DocxFiller::new(&template, dir.path().join("outputs"));
        let output = filler.fill(&context(), "contrato_Maria_20250110093000").unwrap();

        assert_eq!(
            output,
            dir.path().join("outputs").join("contrato_Maria_20250110093000.docx")
        );

        let body = read_docx_part(&output, "word/document.xml");
        assert!(body.contains("Locatário: MARIA DA SILVA"));
        assert!(body.contains("<w:r><w:t>CPF: 123.456.789-00</w:t></w:r>"));
        assert!(!body.contains("{{"));

        let header = read_docx_part(&output, "word/header1.xml");
        assert_eq!(header, "<w:hdr><w:t>Início 10/01/2025</w:t></w:hdr>");
        let footer = read_docx_part(&output, "word/footer1.xml");
        assert_eq!(footer, "<w:ftr><w:t>MARIA DA SILVA</w:t></w:ftr>");

        // Non-text parts are copied verbatim.
        let styles = read_docx_part(&output, "word/styles.xml");
        assert_eq!(styles, "<w:styles>{{ untouched }}</w:styles>");
        assert!(!read_docx_part(&output, "[Content_Types].xml").is_empty());
    }

    #[test]
    fn test_missing_key_blank_then_strict() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.docx");
        write_docx(
            &template,
            &[(
                "word/document.xml",
                document_xml(&["<w:r><w:t>CNH: [{{ locatario_cnh }}]</w:t></w:r>".to_string()]),
            )],
        );

        let lenient = DocxFiller::new(&template, dir.path());
        let output = lenient.fill(&context(), "lenient").unwrap();
        assert!(read_docx_part(&output, "word/document.xml").contains("CNH: []"));

        let strict = DocxFiller::new(&template, dir.path()).strict(true);
        let err = strict.fill(&context(), "strict").unwrap_err();
        assert!(matches!(err, FillError::MissingField(ref key) if key == "locatario_cnh"));
        assert!(!dir.path().join("strict.docx").exists());
    }

    #[test]
    fn test_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let filler = DocxFiller::new(dir.path().join("nope.docx"), dir.path());
        let err = filler.fill(&context(), "out").unwrap_err();
        assert!(matches!(err, FillError::TemplateIo(_)));
    }

    #[test]
    fn test_template_that_is_not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.docx");
        fs::write(&template, b"plain text, not a word document").unwrap();

        let err = DocxFiller::new(&template, dir.path())
            .fill(&context(), "out")
            .unwrap_err();
        assert!(matches!(err, FillError::Archive(_)));
    }

    #[test]
    fn test_zip_without_document_part() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.docx");
        write_docx(&template, &[("word/styles.xml", "<w:styles/>".to_string())]);

        let err = DocxFiller::new(&template, dir.path())
            .fill(&context(), "out")
            .unwrap_err();
        assert!(matches!(err, FillError::NotADocx));
    }
}
