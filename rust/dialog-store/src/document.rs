use indexmap::IndexMap;

/// The reserved map key under which a polymorphic value's concrete class name
/// is recorded, so a decoder can resolve it back to the right codec.
pub const CLASS_TAG_FIELD: &str = "__class";

/// The untyped, recursive tree exchanged with the storage layer.
///
/// This is the wire-independent shape every [`crate::DataCodec`] encodes into
/// and decodes from. It deliberately says nothing about bytes, BSON, JSON, or
/// any other concrete encoding — that translation is a `DataTable` concern,
/// outside this crate.
#[derive(Clone, Debug, PartialEq)]
pub enum Document {
    /// The absence of a value.
    Null,
    /// A boolean scalar.
    Bool(bool),
    /// A signed 64-bit integer scalar.
    Int(i64),
    /// An unsigned 64-bit integer scalar.
    UInt(u64),
    /// A double-precision float scalar.
    Float(f64),
    /// A UTF-8 string scalar.
    String(String),
    /// An ordered list of values.
    List(Vec<Document>),
    /// A string-keyed map of values. Order is preserved for round-tripping
    /// encoders that care about field order.
    Map(IndexMap<String, Document>),
}

impl Document {
    /// Returns the `__class` tag of a map node, if present.
    pub fn class_tag(&self) -> Option<&str> {
        match self {
            Document::Map(fields) => fields.get(CLASS_TAG_FIELD).and_then(|v| match v {
                Document::String(s) => Some(s.as_str()),
                _ => None,
            }),
            _ => None,
        }
    }

    /// True if this document is [`Document::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Document::Null)
    }

    /// Borrows the field named `name` out of a map node.
    pub fn field(&self, name: &str) -> Option<&Document> {
        match self {
            Document::Map(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Borrows the list elements, if this is a list node.
    pub fn as_list(&self) -> Option<&[Document]> {
        match self {
            Document::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrows the map fields, if this is a map node.
    pub fn as_map(&self) -> Option<&IndexMap<String, Document>> {
        match self {
            Document::Map(fields) => Some(fields),
            _ => None,
        }
    }
}

impl From<bool> for Document {
    fn from(value: bool) -> Self {
        Document::Bool(value)
    }
}

impl From<i64> for Document {
    fn from(value: i64) -> Self {
        Document::Int(value)
    }
}

impl From<u64> for Document {
    fn from(value: u64) -> Self {
        Document::UInt(value)
    }
}

impl From<f64> for Document {
    fn from(value: f64) -> Self {
        Document::Float(value)
    }
}

impl From<String> for Document {
    fn from(value: String) -> Self {
        Document::String(value)
    }
}

impl From<&str> for Document {
    fn from(value: &str) -> Self {
        Document::String(value.to_owned())
    }
}

impl<T: Into<Document>> From<Vec<T>> for Document {
    fn from(values: Vec<T>) -> Self {
        Document::List(values.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_reads_the_class_tag_of_a_map_node() {
        let mut fields = IndexMap::new();
        fields.insert(CLASS_TAG_FIELD.to_string(), Document::from("pkg.Shape"));
        let doc = Document::Map(fields);
        assert_eq!(doc.class_tag(), Some("pkg.Shape"));
    }

    #[test]
    fn it_has_no_class_tag_on_non_map_nodes() {
        assert_eq!(Document::Int(1).class_tag(), None);
        assert_eq!(Document::List(vec![]).class_tag(), None);
    }
}
