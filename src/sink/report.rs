//! Report files: HTML for people, JSON for re-verification.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::ResultSink;
use crate::arbitrage::ArbitrageOpportunity;
use crate::error::SinkError;

/// Rewrites the HTML (and optional JSON) report after every discovery.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    html_path: PathBuf,
    json_path: Option<PathBuf>,
}

impl ReportWriter {
    /// Write the HTML report to `html_path`.
    pub fn new(html_path: impl Into<PathBuf>) -> Self {
        Self {
            html_path: html_path.into(),
            json_path: None,
        }
    }

    /// Also write a JSON copy to `json_path`.
    pub fn with_json(mut self, json_path: impl Into<PathBuf>) -> Self {
        self.json_path = Some(json_path.into());
        self
    }

    /// Overwrite both report files with `all`.
    pub fn write_all(&self, all: &[ArbitrageOpportunity]) -> Result<(), SinkError> {
        write_file(&self.html_path, &render_html(all))?;
        if let Some(json_path) = &self.json_path {
            write_file(json_path, &serde_json::to_string_pretty(all)?)?;
        }
        debug!(
            path = %self.html_path.display(),
            opportunities = all.len(),
            "Report written"
        );
        Ok(())
    }
}

impl ResultSink for ReportWriter {
    fn publish(
        &mut self,
        _latest: &ArbitrageOpportunity,
        all: &[ArbitrageOpportunity],
        _suppress: bool,
    ) -> Result<(), SinkError> {
        self.write_all(all)
    }

    fn cleared(&mut self) -> Result<(), SinkError> {
        self.write_all(&[])
    }

    fn name(&self) -> &'static str {
        "report"
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), SinkError> {
    fs::write(path, contents).map_err(|source| SinkError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Load opportunities from a JSON report.
pub fn load_opportunities(path: impl AsRef<Path>) -> Result<Vec<ArbitrageOpportunity>, SinkError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| SinkError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Render the opportunity list as a standalone HTML page.
pub fn render_html(all: &[ArbitrageOpportunity]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Arbitrage Opportunities</title>\n</head>\n<body>\n\
         <h1>Arbitrage Opportunities</h1>\n",
    );

    if all.is_empty() {
        html.push_str("<p>No opportunities found.</p>\n");
    } else {
        html.push_str(
            "<table border=\"1\">\n<tr><th>Game</th><th>Market</th><th>Profit</th>\
             <th>Link</th><th>Instructions</th></tr>\n",
        );
        for opp in all {
            let instructions = opp
                .instructions
                .iter()
                .map(|i| format!("<li>{}</li>", escape(&i.to_string())))
                .collect::<String>();
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td><a href=\"{url}\">{url}</a></td>\
                 <td><ul>{}</ul></td></tr>\n",
                escape(opp.game()),
                escape(opp.market()),
                opp.profit,
                instructions,
                url = escape(&opp.url),
            ));
        }
        html.push_str("</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
