//! Type-Safe DateNode Wrapper
//!
//! Provides ergonomic, type-safe access to date node properties while
//! maintaining the universal Node storage model. Date nodes carry their date
//! value and a display format under `properties.date`.
//!
//! # Examples
//!
//! ```rust
//! use blockline_core::models::DateNode;
//! use chrono::NaiveDate;
//!
//! let date = DateNode::for_date(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()).build();
//! assert_eq!(date.date().unwrap(), NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
//! ```

use crate::models::{Node, NodeType, ValidationError};
use chrono::NaiveDate;
use serde_json::json;

/// Default display format tag for date nodes
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD";

/// Type-safe wrapper for date nodes.
///
/// The date value lives at `properties.date.value` (ISO `YYYY-MM-DD`); the
/// display format tag at `properties.date.format`. Content mirrors the value
/// so the node still renders as plain text.
#[derive(Debug, Clone)]
pub struct DateNode {
    node: Node,
}

impl DateNode {
    /// Create a DateNode from an existing Node.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidNodeType` if the node type is not
    /// [`NodeType::Date`].
    pub fn from_node(node: Node) -> Result<Self, ValidationError> {
        if node.node_type != NodeType::Date {
            return Err(ValidationError::InvalidNodeType(format!(
                "Expected 'date', got '{}'",
                node.node_type
            )));
        }
        Ok(Self { node })
    }

    /// Builder for a specific calendar date
    pub fn for_date(date: NaiveDate) -> DateNodeBuilder {
        DateNodeBuilder {
            date,
            format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    /// Parse the stored date value
    ///
    /// # Errors
    ///
    /// Returns a message when `properties.date.value` is missing or not ISO
    /// formatted.
    pub fn date(&self) -> Result<NaiveDate, String> {
        let value = self
            .node
            .properties
            .pointer("/date/value")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "date node is missing properties.date.value".to_string())?;
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|e| format!("invalid date value '{}': {}", value, e))
    }

    /// Display format tag (defaults to [`DEFAULT_DATE_FORMAT`])
    pub fn format(&self) -> String {
        self.node
            .properties
            .pointer("/date/format")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_DATE_FORMAT)
            .to_string()
    }

    /// Set the display format tag
    pub fn set_format(&mut self, format: impl Into<String>) {
        if !self.node.properties.is_object() {
            self.node.properties = json!({});
        }
        if let Some(obj) = self.node.properties.as_object_mut() {
            let date = obj.entry("date").or_insert_with(|| json!({}));
            if !date.is_object() {
                *date = json!({});
            }
            if let Some(date) = date.as_object_mut() {
                date.insert("format".to_string(), json!(format.into()));
            }
        }
        self.node.touch();
    }

    /// Get a reference to the underlying Node
    pub fn as_node(&self) -> &Node {
        &self.node
    }

    /// Get a mutable reference to the underlying Node
    pub fn as_node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    /// Convert back to the universal Node (consumes the wrapper)
    pub fn into_node(self) -> Node {
        self.node
    }
}

/// Builder for creating new DateNode instances
pub struct DateNodeBuilder {
    date: NaiveDate,
    format: String,
}

impl DateNodeBuilder {
    /// Override the display format tag
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Build the DateNode
    pub fn build(self) -> DateNode {
        let value = self.date.format("%Y-%m-%d").to_string();
        let properties = json!({
            "date": {
                "value": value,
                "format": self.format,
            }
        });

        DateNode {
            node: Node::new(NodeType::Date, value, properties),
        }
    }
}

#[cfg(test)]
#[path = "date_node_test.rs"]
mod date_node_test;
