//! Pipeline config templates
//!
//! Templates are plain text with `${name}` placeholders. A template is parsed
//! once into segments; `check` runs before any text is produced so an unknown
//! placeholder is reported as a validation error, and `render` is a pure
//! function of the template and the validated parameters.
//!
//! Text values are written as quoted string literals, so templates leave
//! string placeholders bare: `label_map_path: ${label_map_path}`.

use crate::detector::config::{DetectorConfig, ParamValue};
use crate::error::{TpodError, TpodResult};
use crate::pbtxt;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Placeholder(String),
}

/// A parsed pipeline config template
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineTemplate {
    segments: Vec<Segment>,
}

impl PipelineTemplate {
    /// Parse template text
    ///
    /// `$$` produces a literal `$`. A `$` not followed by `{` is kept as-is.
    pub fn parse(source: &str) -> TpodResult<Self> {
        let mut segments = vec![];
        let mut text = String::new();
        let mut rest = source;

        while let Some(pos) = rest.find('$') {
            text.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            if let Some(stripped) = after.strip_prefix('$') {
                text.push('$');
                rest = stripped;
            } else if let Some(body) = after.strip_prefix('{') {
                let end = body.find('}').ok_or_else(|| {
                    TpodError::Internal(format!(
                        "unterminated placeholder in pipeline template at byte {}",
                        source.len() - rest.len() + pos
                    ))
                })?;
                let name = body[..end].trim();
                if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    return Err(TpodError::Internal(format!(
                        "invalid placeholder in pipeline template: ${{{}}}",
                        &body[..end]
                    )));
                }
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Placeholder(name.to_string()));
                rest = &body[end + 1..];
            } else {
                text.push('$');
                rest = after;
            }
        }

        text.push_str(rest);
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self { segments })
    }

    /// Names referenced by the template
    pub fn placeholders(&self) -> BTreeSet<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Placeholder(name) => Some(name.as_str()),
                Segment::Text(_) => None,
            })
            .collect()
    }

    /// Verify every placeholder has a value
    pub fn check(&self, params: &DetectorConfig) -> TpodResult<()> {
        match self.placeholders().into_iter().find(|k| !params.contains(k)) {
            Some(key) => Err(TpodError::TemplateRenderError {
                key: key.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Substitute parameter values into the template
    pub fn render(&self, params: &DetectorConfig) -> TpodResult<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(t),
                Segment::Placeholder(key) => {
                    let value = params.get(key).ok_or_else(|| TpodError::TemplateRenderError {
                        key: key.clone(),
                    })?;
                    out.push_str(&literal(value));
                }
            }
        }
        Ok(out)
    }
}

/// Text format literal for a parameter value
fn literal(value: &ParamValue) -> String {
    match value {
        ParamValue::Text(s) => pbtxt::quote(s),
        other => other.to_string(),
    }
}
