//! Display body rendering.
//!
//! Two strategies produce the `htmlMessage` handed back to the host:
//! - `InlineRenderer` escapes the raw message body in place
//! - `TemplateRenderer` substitutes `${subject}`, `${validationResultClass}`
//!   and `${validationResult}` into an HTML template

use std::borrow::Cow;
use std::path::Path;

use regex::{Captures, Regex};

use crate::config::{RenderStrategy, VoteCheckConfig};
use crate::error::RenderError;
use crate::pipeline::types::{IncomingMessage, VerificationStatus};

/// Built-in template used when no template path is configured.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/vote_check.html");

/// Produces the display body for a processed message.
pub trait BodyRenderer: Send + Sync {
    fn render(
        &self,
        message: &IncomingMessage,
        status: VerificationStatus,
        raw_output: &str,
    ) -> String;
}

/// Build the renderer selected by the configuration.
pub fn renderer_for(config: &VoteCheckConfig) -> Result<Box<dyn BodyRenderer>, RenderError> {
    Ok(match config.render_strategy {
        RenderStrategy::Inline => Box::new(InlineRenderer),
        RenderStrategy::Template => match config.template_path {
            Some(ref path) => Box::new(TemplateRenderer::from_file(path)?),
            None => Box::new(TemplateRenderer::new(DEFAULT_TEMPLATE)),
        },
    })
}

/// Line breaks become `<br/>`, hyphens become `&ndash;`.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineRenderer;

impl BodyRenderer for InlineRenderer {
    fn render(&self, message: &IncomingMessage, _: VerificationStatus, _: &str) -> String {
        message
            .full_body
            .replace("\r\n", "<br/>")
            .replace('\n', "<br/>")
            .replace('-', "&ndash;")
    }
}

/// `${name}` substitution over an HTML template.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    template: String,
    placeholder: Regex,
}

impl TemplateRenderer {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            placeholder: Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
                .expect("placeholder pattern is valid"),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        let template = std::fs::read_to_string(path).map_err(|source| RenderError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(template))
    }

    /// Substitute known variables in one pass; unknown placeholders are kept.
    pub fn substitute(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        self.placeholder
            .replace_all(&self.template, |caps: &Captures| {
                lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

impl BodyRenderer for TemplateRenderer {
    fn render(
        &self,
        message: &IncomingMessage,
        status: VerificationStatus,
        raw_output: &str,
    ) -> String {
        self.substitute(|name| {
            let value = match name {
                "subject" => message.subject.as_str(),
                "validationResultClass" => status.label(),
                "validationResult" => raw_output,
                _ => return None,
            };
            Some(escape_html(value).into_owned())
        })
    }
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}
