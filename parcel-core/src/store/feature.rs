//! Features and the attribute schema they are built against.

use std::collections::BTreeMap;

use thiserror::Error;

/// Ordered attribute names of a layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSchema {
    names: Vec<String>,
}

impl FieldSchema {
    /// Build a schema from attribute names, keeping their order.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the schema declares `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|field| field == name)
    }

    /// Attribute names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the schema has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Errors raised while populating a [`Feature`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    /// The schema the feature was built from has no such attribute.
    #[error("layer has no attribute named {name:?}")]
    UnknownField {
        /// Requested attribute name.
        name: String,
    },
}

/// A feature waiting to be added to a layer.
///
/// Every schema attribute starts out null. The geometry is kept as WKT and
/// only turned into a real geometry by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    attributes: BTreeMap<String, Option<String>>,
    geometry_wkt: Option<String>,
}

impl Feature {
    /// Create an empty feature compatible with `schema`.
    #[must_use]
    pub fn new(schema: &FieldSchema) -> Self {
        Self {
            attributes: schema.names().map(|name| (name.to_owned(), None)).collect(),
            geometry_wkt: None,
        }
    }

    /// Set attribute `name` to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::UnknownField`] when the schema lacks `name`;
    /// the feature is left unchanged.
    pub fn set_attribute(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), FeatureError> {
        let slot = self
            .attributes
            .get_mut(name)
            .ok_or_else(|| FeatureError::UnknownField {
                name: name.to_owned(),
            })?;
        *slot = Some(value.into());
        Ok(())
    }

    /// Value of attribute `name`, if the schema has it and it is set.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(|value| value.as_deref())
    }

    /// All attributes with their values, nulls included.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    /// Attach WKT geometry.
    pub fn set_geometry_wkt(&mut self, wkt: impl Into<String>) {
        self.geometry_wkt = Some(wkt.into());
    }

    /// Attached WKT geometry, if any.
    #[must_use]
    pub fn geometry_wkt(&self) -> Option<&str> {
        self.geometry_wkt.as_deref()
    }
}
