//! Hydration of instance configuration files from shared templates.
//!
//! Templates use named `{{placeholder}}` markers. Each [`TemplateKind`]
//! declares the exact set of placeholders it carries, and hydration refuses to
//! write anything when the template, the supplied values, and the schema
//! disagree.

use std::fmt;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::error::ProvisionError;
use crate::fs_util;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Placeholder {
    Database,
    Serial,
    Domain,
}

impl Placeholder {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Placeholder::Database => "database",
            Placeholder::Serial => "serial",
            Placeholder::Domain => "domain",
        }
    }

    fn marker(self) -> String {
        format!("{OPEN}{}{CLOSE}", self.name())
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    RootCsr,
    RootAuthority,
    IntermediateCsr,
    IntermediateAuthority,
    ServerCsr,
    ServerSigning,
}

impl TemplateKind {
    /// Placeholders the template must contain, in binding order.
    #[must_use]
    pub fn schema(self) -> &'static [Placeholder] {
        match self {
            TemplateKind::RootCsr | TemplateKind::IntermediateCsr => &[],
            TemplateKind::RootAuthority | TemplateKind::IntermediateAuthority => {
                &[Placeholder::Database, Placeholder::Serial]
            }
            TemplateKind::ServerCsr => &[Placeholder::Domain],
            TemplateKind::ServerSigning => &[
                Placeholder::Database,
                Placeholder::Serial,
                Placeholder::Domain,
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HydrationFault {
    #[error("expected values for [{}], got [{}]", join(.expected), join(.supplied))]
    Arity {
        expected: Vec<Placeholder>,
        supplied: Vec<Placeholder>,
    },

    #[error("template does not contain placeholder {{{{{0}}}}}")]
    MissingPlaceholder(Placeholder),

    #[error("template contains undeclared placeholder {{{{{0}}}}}")]
    UndeclaredPlaceholder(String),

    #[error("value for {0} must be a single line without placeholder markers")]
    UnsafeValue(Placeholder),
}

fn join(placeholders: &[Placeholder]) -> String {
    placeholders
        .iter()
        .map(|placeholder| placeholder.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values bound to placeholders for one hydration.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: Vec<(Placeholder, String)>,
}

impl Bindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn bind(mut self, placeholder: Placeholder, value: impl Into<String>) -> Self {
        self.values.push((placeholder, value.into()));
        self
    }

    #[must_use]
    pub fn bind_path(self, placeholder: Placeholder, path: &Path) -> Self {
        self.bind(placeholder, path.display().to_string())
    }

    fn placeholders(&self) -> Vec<Placeholder> {
        self.values.iter().map(|(placeholder, _)| *placeholder).collect()
    }
}

/// Substitutes `bindings` into `template` after checking both against the
/// schema of `kind`.
///
/// # Errors
/// Returns a fault when the bindings do not match the schema, a value could
/// break out of its line, a declared placeholder is missing from the template,
/// or an undeclared placeholder remains after substitution.
pub fn render(
    kind: TemplateKind,
    template: &str,
    bindings: &Bindings,
) -> Result<String, HydrationFault> {
    let expected = kind.schema();
    let mut supplied = bindings.placeholders();
    let mut sorted_expected = expected.to_vec();
    supplied.sort_unstable();
    sorted_expected.sort_unstable();
    if supplied != sorted_expected {
        return Err(HydrationFault::Arity {
            expected: expected.to_vec(),
            supplied: bindings.placeholders(),
        });
    }

    if let Some((placeholder, _)) = bindings.values.iter().find(|(_, value)| !is_inert(value)) {
        return Err(HydrationFault::UnsafeValue(*placeholder));
    }

    let mut rendered = template.to_string();
    for (placeholder, value) in &bindings.values {
        let marker = placeholder.marker();
        if !rendered.contains(&marker) {
            return Err(HydrationFault::MissingPlaceholder(*placeholder));
        }
        rendered = rendered.replace(&marker, value);
    }

    if let Some(stray) = find_placeholder(&rendered) {
        return Err(HydrationFault::UndeclaredPlaceholder(stray.to_string()));
    }
    Ok(rendered)
}

/// A value is inert when it stays on its own line and cannot form a marker.
fn is_inert(value: &str) -> bool {
    !value.chars().any(char::is_control) && !value.contains(OPEN) && !value.contains(CLOSE)
}

fn find_placeholder(text: &str) -> Option<&str> {
    let start = text.find(OPEN)? + OPEN.len();
    let end = text[start..].find(CLOSE)? + start;
    Some(text[start..end].trim())
}

/// Materializes `output` from `template`. Not idempotent on its own: callers
/// check for an existing output first.
///
/// # Errors
/// Returns an error if the template cannot be read, fails validation, or the
/// output cannot be written.
pub fn hydrate(
    kind: TemplateKind,
    template: &Path,
    output: &Path,
    bindings: &Bindings,
) -> Result<(), ProvisionError> {
    let contents = fs::read_to_string(template)
        .map_err(|err| ProvisionError::io("read template", template, err))?;
    let rendered = render(kind, &contents, bindings).map_err(|fault| {
        ProvisionError::TemplateHydration {
            template: template.to_path_buf(),
            output: output.to_path_buf(),
            fault,
        }
    })?;
    info!("Hydrating {} from {}", output.display(), template.display());
    fs_util::write_atomic(output, rendered.as_bytes())
}
