//! Failure and success hooks.

use crate::errors::StepInterfaceError;
use crate::source::{Source, SourceObject, SourceResolver};
use std::fmt;
use std::sync::Arc;

/// An argument a hook accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookArgument {
    /// The step context.
    Context,
    /// The step parameters object.
    Parameters,
    /// The error that failed the step.
    Exception,
}

/// A hook declaration: a named callable and the arguments it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookDecl {
    name: String,
    arguments: Vec<HookArgument>,
}

impl HookDecl {
    /// Creates a hook without arguments.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    /// Adds an argument.
    #[must_use]
    pub fn argument(mut self, argument: HookArgument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Returns the hook name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared arguments.
    #[must_use]
    pub fn arguments(&self) -> &[HookArgument] {
        &self.arguments
    }
}

/// Which event a hook reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// The step failed.
    Failure,
    /// The step succeeded.
    Success,
}

impl HookKind {
    /// Returns the hook kind as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Failure => "failure",
            Self::Success => "success",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookSpec {
    /// A `::` separated import path.
    ImportPath(String),
    /// A resolved source.
    Source(Source),
}

impl From<&str> for HookSpec {
    fn from(path: &str) -> Self {
        Self::ImportPath(path.to_string())
    }
}

impl From<String> for HookSpec {
    fn from(path: String) -> Self {
        Self::ImportPath(path)
    }
}

impl From<Source> for HookSpec {
    fn from(source: Source) -> Self {
        Self::Source(source)
    }
}

impl fmt::Display for HookSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImportPath(path) => f.write_str(path),
            Self::Source(source) => fmt::Display::fmt(source, f),
        }
    }
}

/// Resolves a hook and checks that its arguments fit the hook kind.
///
/// # Errors
///
/// Returns an error if the hook cannot be loaded, is not a hook, repeats an
/// argument, or is a success hook taking the exception.
pub fn resolve_hook(
    spec: &HookSpec,
    kind: HookKind,
    resolver: &dyn SourceResolver,
) -> Result<Source, StepInterfaceError> {
    let invalid = |reason: String| StepInterfaceError::InvalidHook {
        kind: kind.to_string(),
        hook: spec.to_string(),
        reason,
    };

    let source = match spec {
        HookSpec::ImportPath(path) => resolver.resolve(path).map_err(|e| invalid(e.to_string()))?,
        HookSpec::Source(source) => source.clone(),
    };
    let hook: Arc<HookDecl> = match resolver.load(&source).map_err(|e| invalid(e.to_string()))? {
        SourceObject::Hook(hook) => hook,
        other => return Err(invalid(format!("resolves to a {}, not a hook", other.kind()))),
    };

    let mut seen = Vec::with_capacity(hook.arguments.len());
    for argument in &hook.arguments {
        if seen.contains(argument) {
            return Err(invalid(format!("argument {argument:?} is declared more than once")));
        }
        if kind == HookKind::Success && *argument == HookArgument::Exception {
            return Err(invalid("success hooks cannot take the exception".to_string()));
        }
        seen.push(*argument);
    }

    Ok(source)
}
