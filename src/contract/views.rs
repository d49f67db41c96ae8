//! HTML pages for the browser flow, rendered with tera templates compiled
//! into the binary.

use tera::{Context, Tera};

use crate::catalog::Vehicle;
use crate::contract::models::ContractOutcome;

const FORM: &str = "form.html";
const RESULT: &str = "result.html";
const ERROR: &str = "error.html";

pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (FORM, include_str!("../../templates/form.html")),
            (RESULT, include_str!("../../templates/result.html")),
            (ERROR, include_str!("../../templates/error.html")),
        ])?;
        Ok(Self { tera })
    }

    pub fn form(&self, vehicles: &[Vehicle]) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("carros", vehicles);
        self.tera.render(FORM, &context)
    }

    pub fn result(&self, outcome: &ContractOutcome) -> Result<String, tera::Error> {
        let context = Context::from_serialize(outcome)?;
        self.tera.render(RESULT, &context)
    }

    pub fn error(&self, status: u16, message: &str) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("status", &status);
        context.insert("mensagem", message);
        self.tera.render(ERROR, &context)
    }
}
