// src/stages/html.rs

//! Whitespace-collapsing HTML minifier.
//!
//! Formatting whitespace (any run containing a line break) between two tags is
//! dropped, other runs collapse to a single space. The bodies of `pre`,
//! `textarea`, `script` and `style` elements are copied untouched.

use regex::Regex;

#[derive(Debug)]
pub struct HtmlMinifier {
    preserved: Regex,
    between_tags: Regex,
    whitespace: Regex,
}

impl HtmlMinifier {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            preserved: Regex::new(
                r"(?is)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
            )?,
            between_tags: Regex::new(r">[ \t\r\f]*\n\s*<")?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    pub fn minify(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut last = 0;
        for block in self.preserved.find_iter(input) {
            out.push_str(&self.collapse(&input[last..block.start()], last > 0, true));
            out.push_str(block.as_str());
            last = block.end();
        }
        out.push_str(&self.collapse(&input[last..], last > 0, false));
        out.trim().to_string()
    }

    /// Collapse one segment. `after_tag`/`before_tag` say whether a preserved
    /// block sits on that side, so gaps next to it count as between tags.
    fn collapse(&self, segment: &str, after_tag: bool, before_tag: bool) -> String {
        let mut padded = String::with_capacity(segment.len() + 2);
        if after_tag {
            padded.push('>');
        }
        padded.push_str(segment);
        if before_tag {
            padded.push('<');
        }

        let tight = self.between_tags.replace_all(&padded, "><");
        let mut collapsed = self.whitespace.replace_all(&tight, " ").into_owned();
        if before_tag {
            collapsed.pop();
        }
        if after_tag {
            collapsed.remove(0);
        }
        collapsed
    }
}
