// src/stages/css.rs

//! CSS minification and vendor prefixing through lightningcss.
//!
//! Browserslist queries decide which prefixes are added and which syntax is
//! lowered, so a single stage covers what a prefixer plus a minifier would.

use anyhow::anyhow;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

#[derive(Debug)]
pub struct CssMinifier {
    targets: Targets,
}

impl CssMinifier {
    pub fn new(browsers: &[String]) -> anyhow::Result<Self> {
        let targets = if browsers.is_empty() {
            Targets::default()
        } else {
            Browsers::from_browserslist(browsers.iter().map(String::as_str))
                .map_err(|e| anyhow!("invalid browserslist query {browsers:?}: {e}"))?
                .map(Targets::from)
                .unwrap_or_default()
        };
        Ok(Self { targets })
    }

    /// Minify `source`; errors are rendered to strings with their location.
    pub fn minify(&self, source: &str, filename: &str) -> Result<String, String> {
        let mut sheet = StyleSheet::parse(
            source,
            ParserOptions {
                filename: filename.to_string(),
                ..ParserOptions::default()
            },
        )
        .map_err(|e| e.to_string())?;

        sheet
            .minify(MinifyOptions {
                targets: self.targets.clone(),
                ..MinifyOptions::default()
            })
            .map_err(|e| e.to_string())?;

        let out = sheet
            .to_css(PrinterOptions {
                minify: true,
                targets: self.targets.clone(),
                ..PrinterOptions::default()
            })
            .map_err(|e| e.to_string())?;
        Ok(out.code)
    }
}
