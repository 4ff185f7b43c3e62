//! Error taxonomy of an engine run.
//!
//! | Type | Raised by |
//! |------|-----------|
//! | [`DesignError::Declaration`] | builder misuse during the definition pass, duplicate names |
//! | [`DesignError::Reference`] | a name or identifier that never resolves during finalize |
//! | [`DesignError::Validation`] | a constraint check of the validation engine |
//! | [`DesignError::Projection`] | a response view checked during finalize |
//!
//! [`ProjectionError`] is also returned directly by
//! [`Registry::project`](crate::Registry::project), which is an on-demand
//! query rather than part of the batch sweep.

use thiserror::Error;

use crate::types::Kind;

/// One problem found during a run, tagged with the definition it came from.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DesignError {
    #[error("{context}: {message}")]
    Declaration { context: String, message: String },

    #[error("{context}: unknown type or media type {name:?}")]
    Reference { context: String, name: String },

    #[error("{context}: {source}")]
    Validation {
        context: String,
        #[source]
        source: ValidationError,
    },

    #[error("{context}: {source}")]
    Projection {
        context: String,
        #[source]
        source: ProjectionError,
    },
}

impl DesignError {
    pub fn declaration(context: impl Into<String>, message: impl Into<String>) -> Self {
        DesignError::Declaration {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn reference(context: impl Into<String>, name: impl Into<String>) -> Self {
        DesignError::Reference {
            context: context.into(),
            name: name.into(),
        }
    }

    pub fn validation(context: impl Into<String>, source: ValidationError) -> Self {
        DesignError::Validation {
            context: context.into(),
            source,
        }
    }

    pub fn projection(context: impl Into<String>, source: ProjectionError) -> Self {
        DesignError::Projection {
            context: context.into(),
            source,
        }
    }

    /// The offending definition, e.g. `type "Bottle" attribute "vintage"`.
    pub fn context(&self) -> &str {
        match self {
            DesignError::Declaration { context, .. }
            | DesignError::Reference { context, .. }
            | DesignError::Validation { context, .. }
            | DesignError::Projection { context, .. } => context,
        }
    }

    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            DesignError::Validation { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A failed constraint check on an attribute or media type.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("value {value} in enum is not assignable to {expected}")]
    EnumValueMismatch { value: String, expected: Kind },

    #[error("default value {value} is not assignable to {expected}")]
    DefaultValueMismatch { value: String, expected: Kind },

    #[error("unknown format {0:?}")]
    UnknownFormat(String),

    #[error("format {format:?} is not allowed on {kind} attributes")]
    FormatNotAllowed { format: String, kind: Kind },

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("pattern is only allowed on String attributes, not {0}")]
    PatternNotAllowed(Kind),

    #[error("minimum and maximum are only allowed on Integer or Number attributes, not {0}")]
    BoundsNotAllowed(Kind),

    #[error("minimum {minimum} is greater than maximum {maximum}")]
    InvertedBounds { minimum: f64, maximum: f64 },

    #[error("min_length and max_length are only allowed on String, Array or Hash attributes, not {0}")]
    LengthNotAllowed(Kind),

    #[error("min_length {min} is greater than max_length {max}")]
    InvertedLength { min: usize, max: usize },

    #[error("required is only allowed on Object attributes, not {0}")]
    RequiredNotObject(Kind),

    #[error("required attribute {0:?} does not exist")]
    UnknownRequired(String),

    #[error("media type must define a \"default\" view")]
    MissingDefaultView,

    #[error("view {view:?} lists unknown attribute {attribute:?}")]
    UnknownViewAttribute { view: String, attribute: String },

    #[error("link {0:?} names no attribute of the media type")]
    UnknownLinkAttribute(String),

    #[error("link {0:?} targets an attribute that is not a media type")]
    LinkTargetNotMediaType(String),
}

/// Why a view could not be materialized.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProjectionError {
    #[error("view name must not be empty")]
    EmptyView,

    #[error("{0} is not a media type")]
    NotMediaType(String),

    #[error("unknown view {view:?} on media type {identifier:?}")]
    UnknownView { identifier: String, view: String },

    #[error("view {view:?} of media type {identifier:?} lists unknown attribute {attribute:?}")]
    UnknownAttribute {
        identifier: String,
        view: String,
        attribute: String,
    },

    #[error("link {link:?} of media type {identifier:?} names no attribute")]
    UnknownLinkAttribute { identifier: String, link: String },

    #[error("link {link:?} of media type {identifier:?} does not target a media type")]
    LinkTargetNotMediaType { identifier: String, link: String },

    #[error("attribute {attribute:?} projected with view {view:?}: {source}")]
    Attribute {
        attribute: String,
        view: String,
        #[source]
        source: Box<ProjectionError>,
    },

    #[error("collection element: {0}")]
    CollectionElement(#[source] Box<ProjectionError>),
}

impl ProjectionError {
    /// The innermost error, after unwrapping nested attribute failures.
    pub fn root_cause(&self) -> &ProjectionError {
        match self {
            ProjectionError::Attribute { source, .. } | ProjectionError::CollectionElement(source) => {
                source.root_cause()
            }
            other => other,
        }
    }
}

/// Every error collected by one [`Registry::run`](crate::Registry::run), in
/// the order they were found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorList(Vec<DesignError>);

impl ErrorList {
    pub fn iter(&self) -> std::slice::Iter<'_, DesignError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<DesignError> {
        self.0
    }
}

impl From<Vec<DesignError>> for ErrorList {
    fn from(errors: Vec<DesignError>) -> Self {
        ErrorList(errors)
    }
}

impl IntoIterator for ErrorList {
    type Item = DesignError;
    type IntoIter = std::vec::IntoIter<DesignError>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a DesignError;
    type IntoIter = std::slice::Iter<'a, DesignError>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One error per line.
impl std::fmt::Display for ErrorList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorList {}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let e = DesignError::validation(
            "type \"Person\" attribute \"age\"",
            ValidationError::PatternNotAllowed(Kind::Integer),
        );
        assert_eq!(
            e.to_string(),
            "type \"Person\" attribute \"age\": pattern is only allowed on String attributes, not Integer"
        );
        assert_eq!(e.context(), "type \"Person\" attribute \"age\"");
    }

    #[test]
    fn error_list_displays_one_per_line() {
        let list = ErrorList::from(vec![
            DesignError::reference("type \"A\" attribute \"b\"", "B"),
            DesignError::declaration("media type \"mt/json\"", "duplicate media type"),
        ]);
        assert_eq!(list.len(), 2);
        assert_eq!(
            list.to_string(),
            "type \"A\" attribute \"b\": unknown type or media type \"B\"\n\
             media type \"mt/json\": duplicate media type"
        );
    }

    #[test]
    fn root_cause_unwraps_nesting() {
        let e = ProjectionError::Attribute {
            attribute: "parent".into(),
            view: "tiny".into(),
            source: Box::new(ProjectionError::CollectionElement(Box::new(
                ProjectionError::EmptyView,
            ))),
        };
        assert_eq!(e.root_cause(), &ProjectionError::EmptyView);
    }
}
