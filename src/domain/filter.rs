//! Marking filters restrict which children are eligible for a partial tree.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{DomainError, FieldValue, Node};

/// Boxed node predicate for [`MarkingFilter::Predicate`].
pub type NodePredicate = Box<dyn Fn(&Node) -> bool>;

/// Predicate over nodes, at most one active per builder.
#[derive(Default)]
pub enum MarkingFilter {
    /// Every node is eligible.
    #[default]
    None,
    /// Field must equal the single value, or be one of several values.
    FieldEquals {
        field: String,
        values: Vec<FieldValue>,
    },
    /// Arbitrary callback.
    Predicate(NodePredicate),
}

impl MarkingFilter {
    pub fn field(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        MarkingFilter::FieldEquals {
            field: field.into(),
            values: vec![value.into()],
        }
    }

    pub fn field_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        MarkingFilter::FieldEquals {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn predicate(func: impl Fn(&Node) -> bool + 'static) -> Self {
        MarkingFilter::Predicate(Box::new(func))
    }

    /// Build a filter from loosely configured parts.
    ///
    /// A field without values (or values without a field) is a broken
    /// configuration and fails instead of silently matching everything.
    pub fn from_parts(
        field: Option<String>,
        values: Option<Vec<FieldValue>>,
    ) -> Result<Self, DomainError> {
        match (field, values) {
            (None, None) => Ok(MarkingFilter::None),
            (Some(field), Some(values)) if !field.trim().is_empty() => {
                Ok(MarkingFilter::FieldEquals { field, values })
            }
            (Some(field), None) => Err(DomainError::MalformedFilter(format!(
                "field '{}' has no value",
                field
            ))),
            (None, Some(_)) => Err(DomainError::MalformedFilter(
                "value given without a field".to_string(),
            )),
            (Some(_), Some(_)) => Err(DomainError::MalformedFilter(
                "empty field name".to_string(),
            )),
        }
    }

    /// Parse `Field=value`, `Field=a,b` or `Field in a,b`.
    pub fn parse(expr: &str) -> Result<Self, DomainError> {
        static EXPR: OnceLock<Regex> = OnceLock::new();
        let re = EXPR.get_or_init(|| {
            Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?:=|\s+in\s+)\s*(.+?)\s*$")
                .expect("static regex")
        });

        let caps = re
            .captures(expr)
            .ok_or_else(|| DomainError::MalformedFilter(expr.to_string()))?;
        let field = caps[1].to_string();
        let values: Vec<FieldValue> = caps[2]
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(FieldValue::from)
            .collect();
        if values.is_empty() {
            return Err(DomainError::MalformedFilter(expr.to_string()));
        }
        Self::from_parts(Some(field), Some(values))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, MarkingFilter::None)
    }

    /// Whether `node` passes this filter.
    pub fn matches(&self, node: &Node) -> bool {
        match self {
            MarkingFilter::None => true,
            MarkingFilter::FieldEquals { field, values } => {
                let actual = node.field(field);
                values.iter().any(|v| actual.loosely_equals(v))
            }
            MarkingFilter::Predicate(func) => func(node),
        }
    }
}

impl fmt::Debug for MarkingFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkingFilter::None => write!(f, "MarkingFilter::None"),
            MarkingFilter::FieldEquals { field, values } => f
                .debug_struct("MarkingFilter::FieldEquals")
                .field("field", field)
                .field("values", values)
                .finish(),
            MarkingFilter::Predicate(_) => write!(f, "MarkingFilter::Predicate(..)"),
        }
    }
}
