//! Path-template compilation.
//!
//! A template such as `/users/:id/files/*` compiles into one anchored regex:
//!
//! | token   | becomes      | captured as |
//! |---------|--------------|-------------|
//! | `:name` | `([-\w.]+)`  | `name`      |
//! | `*`     | `(.*)`       | `path`      |
//!
//! A `:name` token matches exactly one segment made of word characters,
//! hyphens and dots; it never crosses a `/`. Everything else in the template
//! is copied into the pattern as-is. Nothing is escaped, so a template that
//! uses regex metacharacters gets their regex meaning, and one that does not
//! compile is rejected with [`Error::InvalidTemplate`].

use std::fmt;
use std::sync::LazyLock;

use http::Method;
use regex::{Captures, Regex};

use crate::error::Error;
use crate::handler::BoxedHandler;
use crate::request::Params;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":([\w-]+)|\*").unwrap_or_else(|e| unreachable!("token pattern: {e}"))
});

const SEGMENT: &str = r"([-\w.]+)";
const REMAINDER: &str = "(.*)";
const WILDCARD_PARAM: &str = "path";

/// One registered (method, template, handler) rule.
pub struct Route {
    method: Method,
    pattern: Regex,
    param_names: Vec<String>,
    template: String,
    pub(crate) handler: BoxedHandler,
}

impl Route {
    /// Compiles `template` into a matcher for `method`.
    pub fn compile(method: Method, template: &str, handler: BoxedHandler) -> Result<Self, Error> {
        let mut param_names = Vec::new();
        let body = TOKEN.replace_all(template, |caps: &Captures<'_>| match caps.get(1) {
            Some(name) => {
                param_names.push(name.as_str().to_owned());
                SEGMENT
            }
            None => {
                param_names.push(WILDCARD_PARAM.to_owned());
                REMAINDER
            }
        });

        let pattern = Regex::new(&format!("^{body}$")).map_err(|source| Error::InvalidTemplate {
            template: template.to_owned(),
            source,
        })?;

        Ok(Self { method, pattern, param_names, template: template.to_owned(), handler })
    }

    /// Runs the matcher against `path`, pairing captures with parameter names.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let caps = self.pattern.captures(path)?;
        Some(
            self.param_names
                .iter()
                .zip(caps.iter().skip(1))
                .map(|(name, value)| {
                    let value = value.map_or("", |m| m.as_str());
                    (name.clone(), value.to_owned())
                })
                .collect(),
        )
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn template(&self) -> &str { &self.template }
    pub fn param_names(&self) -> &[String] { &self.param_names }

    /// Source of the compiled matcher, e.g. `^/users/([-\w.]+)$`.
    pub fn pattern(&self) -> &str { self.pattern.as_str() }

    /// The original template, or `None` when the route was registered with
    /// an empty one.
    pub fn path_template(&self) -> Option<&str> {
        (!self.template.is_empty()).then_some(self.template.as_str())
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("template", &self.template)
            .field("pattern", &self.pattern.as_str())
            .field("param_names", &self.param_names)
            .finish_non_exhaustive()
    }
}
