//! Rendering command results as tables, TSV, JSON, YAML or bare ids

use console::{style, Term};
use miette::{IntoDiagnostic, Result};
use serde_json::{Map, Value};
use tabled::{builder::Builder, settings::Style};

use crate::cli::OutputFormat;

/// Rows of string cells under named columns
#[derive(Debug, Clone, Default)]
pub struct Listing {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Listing {
    pub fn new(headers: &[&'static str]) -> Self {
        Self {
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn push<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by column name
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let record: Map<String, Value> = self
                    .headers
                    .iter()
                    .zip(row)
                    .map(|(h, cell)| (h.to_lowercase(), Value::String(cell.clone())))
                    .collect();
                Value::Object(record)
            })
            .collect()
    }

    /// Render in the requested format
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        let format = match format {
            OutputFormat::Auto if Term::stdout().is_term() => return Ok(self.render_table()),
            OutputFormat::Auto => OutputFormat::Tsv,
            other => other,
        };

        let text = match format {
            OutputFormat::Json => {
                let mut s = serde_json::to_string_pretty(&self.to_records()).into_diagnostic()?;
                s.push('\n');
                s
            }
            OutputFormat::Yaml => serde_yml::to_string(&self.to_records()).into_diagnostic()?,
            OutputFormat::Id => self
                .rows
                .iter()
                .filter_map(|row| row.first())
                .map(|cell| format!("{}\n", cell))
                .collect(),
            _ => self
                .rows
                .iter()
                .map(|row| format!("{}\n", row.join("\t")))
                .collect(),
        };
        Ok(text)
    }

    fn render_table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.headers.iter().map(|h| h.to_string()));
        for row in &self.rows {
            builder.push_record(row.iter().cloned());
        }
        format!("{}\n", builder.build().with(Style::sharp()))
    }

    /// Print to stdout, with a count summary on terminals
    pub fn print(&self, format: OutputFormat, noun: &str) -> Result<()> {
        print!("{}", self.render(format)?);
        if format == OutputFormat::Auto && Term::stdout().is_term() {
            println!("{} {}(s)", style(self.len()).cyan(), noun);
        }
        Ok(())
    }
}

/// Print one value: as JSON/YAML when asked, plain text otherwise
pub fn print_value(format: OutputFormat, key: &str, value: &str) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let mut record = Map::new();
            record.insert(key.to_string(), Value::String(value.to_string()));
            println!("{}", serde_json::to_string_pretty(&record).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            let mut record = Map::new();
            record.insert(key.to_string(), Value::String(value.to_string()));
            print!("{}", serde_yml::to_string(&record).into_diagnostic()?);
        }
        _ => println!("{}", value),
    }
    Ok(())
}
