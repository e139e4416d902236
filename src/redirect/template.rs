//! Replacement templates.
//!
//! A replacement is plain text with regex capture references (`$1`, `${1}`,
//! `$name`, `$$`) and `{{ ... }}` actions that read from the current request:
//!
//! ```text
//! https://${1}{{ header "X-Tenant" }}.example.com$2
//! ```
//!
//! Actions are limited to a fixed accessor set. The dotted forms
//! (`.Request.Header.Get "X-Foo"`, `.Request.Host`, ...) are accepted as
//! aliases so existing redirect rules keep working.
//!
//! Templates are parsed once when the middleware is built; any syntax error is
//! reported then, never on the request path.

use axum::http::HeaderName;
use regex::Captures;
use thiserror::Error;

use crate::redirect::context::RequestContext;
use crate::redirect::error::RedirectError;

/// Template syntax errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed action starting at offset {offset}")]
    Unclosed { offset: usize },

    #[error("empty action at offset {offset}")]
    EmptyAction { offset: usize },

    #[error("unknown accessor {name:?}")]
    UnknownAccessor { name: String },

    #[error("accessor {accessor:?} requires a quoted argument")]
    MissingArgument { accessor: String },

    #[error("accessor {accessor:?} takes no argument")]
    UnexpectedArgument { accessor: String },

    #[error("argument {argument:?} must be a double-quoted string")]
    UnquotedArgument { argument: String },

    #[error("invalid header name {name:?}")]
    InvalidHeaderName { name: String },
}

/// Request values an action may read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accessor {
    Header(HeaderName),
    Host,
    Method,
    Path,
    Query,
    Scheme,
}

impl Accessor {
    fn parse(name: &str, argument: Option<&str>) -> Result<Self, TemplateError> {
        let accessor = match name {
            "header" | ".Request.Header.Get" => {
                let argument = argument.ok_or_else(|| TemplateError::MissingArgument {
                    accessor: name.to_string(),
                })?;
                let header = unquote(argument)?;
                let header = HeaderName::from_bytes(header.as_bytes()).map_err(|_| {
                    TemplateError::InvalidHeaderName {
                        name: header.to_string(),
                    }
                })?;
                return Ok(Accessor::Header(header));
            }
            "host" | ".Request.Host" => Accessor::Host,
            "method" | ".Request.Method" => Accessor::Method,
            "path" | ".Request.URL.Path" => Accessor::Path,
            "query" | ".Request.URL.RawQuery" => Accessor::Query,
            "scheme" => Accessor::Scheme,
            _ => {
                return Err(TemplateError::UnknownAccessor {
                    name: name.to_string(),
                })
            }
        };

        if argument.is_some() {
            return Err(TemplateError::UnexpectedArgument {
                accessor: name.to_string(),
            });
        }
        Ok(accessor)
    }

    fn write<C: RequestContext + ?Sized>(
        &self,
        ctx: &C,
        out: &mut String,
    ) -> Result<(), RedirectError> {
        match self {
            Accessor::Header(name) => {
                if let Some(value) = ctx.header(name) {
                    let value = value.to_str().map_err(|_| RedirectError::RewriteFailure {
                        reason: format!("header {} is not valid text", name),
                    })?;
                    out.push_str(value);
                }
            }
            Accessor::Host => out.push_str(ctx.host()),
            Accessor::Method => out.push_str(ctx.method().as_str()),
            Accessor::Path => out.push_str(ctx.path()),
            Accessor::Query => out.push_str(ctx.query().unwrap_or("")),
            Accessor::Scheme => out.push_str(ctx.scheme()),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Text expanded with regex capture syntax.
    Text(String),
    Action(Accessor),
}

/// A parsed replacement template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a replacement string.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }
            let body_start = open + 2;
            let close = rest[body_start..]
                .find("}}")
                .ok_or(TemplateError::Unclosed {
                    offset: offset + open,
                })?;
            let body = rest[body_start..body_start + close].trim();
            if body.is_empty() {
                return Err(TemplateError::EmptyAction {
                    offset: offset + open,
                });
            }
            segments.push(Segment::Action(parse_action(body)?));

            let consumed = body_start + close + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Append the rendering for one regex match to `out`.
    pub fn render<C: RequestContext + ?Sized>(
        &self,
        captures: &Captures<'_>,
        ctx: &C,
        out: &mut String,
    ) -> Result<(), RedirectError> {
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => captures.expand(text, out),
                Segment::Action(accessor) => accessor.write(ctx, out)?,
            }
        }
        Ok(())
    }
}

fn parse_action(body: &str) -> Result<Accessor, TemplateError> {
    match body.split_once(char::is_whitespace) {
        Some((name, argument)) => Accessor::parse(name, Some(argument.trim())),
        None => Accessor::parse(body, None),
    }
}

fn unquote(argument: &str) -> Result<&str, TemplateError> {
    argument
        .strip_prefix('"')
        .and_then(|a| a.strip_suffix('"'))
        .filter(|a| !a.contains('"'))
        .ok_or_else(|| TemplateError::UnquotedArgument {
            argument: argument.to_string(),
        })
}
