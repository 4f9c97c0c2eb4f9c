//! Connector Framework operation types
//!
//! Identity objects, attribute sets, per-attribute deltas, attribute
//! selections and the predicate tree used to query target systems.

use serde::{Deserialize, Serialize, Serializer};

/// Identity attribute names with framework-defined meaning.
///
/// A name of the form `__X__` is special. Special names the connector does
/// not recognise have no counterpart in the target system.
pub mod special {
    /// Stable identifier of the object.
    pub const UID: &str = "__UID__";
    /// Entry path (naming attribute) of the object.
    pub const NAME: &str = "__NAME__";
    /// Password, never returned in clear.
    pub const PASSWORD: &str = "__PASSWORD__";
    /// Groups an account belongs to, as references.
    pub const GROUPS: &str = "__GROUPS__";
    /// Members of a group, as references.
    pub const MEMBERS: &str = "__MEMBERS__";

    /// Whether `name` uses the special `__X__` form.
    pub fn is_special(name: &str) -> bool {
        name.len() > 4 && name.starts_with("__") && name.ends_with("__")
    }
}

/// Kind of identity object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectClass {
    /// A user account.
    Account,
    /// A group.
    Group,
    /// Any other object kind, named by the caller.
    Other(String),
}

impl ObjectClass {
    /// Framework name of the account class.
    pub const ACCOUNT_NAME: &'static str = "__ACCOUNT__";
    /// Framework name of the group class.
    pub const GROUP_NAME: &'static str = "__GROUP__";

    /// Parse an object class from its framework name.
    pub fn from_name(name: &str) -> Self {
        match name {
            Self::ACCOUNT_NAME => ObjectClass::Account,
            Self::GROUP_NAME => ObjectClass::Group,
            other => ObjectClass::Other(other.to_string()),
        }
    }

    /// Get the framework name of this class.
    pub fn name(&self) -> &str {
        match self {
            ObjectClass::Account => Self::ACCOUNT_NAME,
            ObjectClass::Group => Self::GROUP_NAME,
            ObjectClass::Other(name) => name,
        }
    }
}

impl std::fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for ObjectClass {
    fn from(name: String) -> Self {
        ObjectClass::from_name(&name)
    }
}

impl From<ObjectClass> for String {
    fn from(class: ObjectClass) -> Self {
        class.name().to_string()
    }
}

/// Unique identifier for an object in a target system.
///
/// The value is opaque to callers; the attribute name records where the
/// connector read it from (e.g. `entryUUID`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Uid {
    /// The attribute name used as the identifier.
    attribute_name: String,
    /// The actual value of the identifier.
    value: String,
}

impl Uid {
    /// Create a new UID with the given attribute name and value.
    pub fn new(attribute_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            value: value.into(),
        }
    }

    /// Create a UID for LDAP Distinguished Name.
    pub fn from_dn(dn: impl Into<String>) -> Self {
        Self::new("dn", dn)
    }

    /// Get the attribute name.
    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    /// Get the value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.attribute_name, self.value)
    }
}

/// Identification of another object by class and name (entry path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectReference {
    pub object_class: ObjectClass,
    pub name: String,
}

impl ObjectReference {
    pub fn new(object_class: ObjectClass, name: impl Into<String>) -> Self {
        Self {
            object_class,
            name: name.into(),
        }
    }
}

/// Secret value that never prints or serializes in clear.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct GuardedString(String);

impl GuardedString {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Access the clear text. Only the write path to the target system
    /// should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for GuardedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GuardedString(***REDACTED***)")
    }
}

impl Serialize for GuardedString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***REDACTED***")
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A string value.
    String(String),
    /// An integer value.
    Integer(i64),
    /// A boolean value.
    Boolean(bool),
    /// Binary data.
    Binary(Vec<u8>),
    /// A reference to another object.
    Reference(ObjectReference),
    /// A password.
    Password(GuardedString),
}

impl AttributeValue {
    /// Get as a string if this is a string value.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as an integer if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as a boolean if this is a boolean value.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the bytes if this is a binary value.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Get the reference if this is a reference value.
    pub fn as_reference(&self) -> Option<&ObjectReference> {
        match self {
            AttributeValue::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// Get the secret if this is a password value.
    pub fn as_password(&self) -> Option<&GuardedString> {
        match self {
            AttributeValue::Password(p) => Some(p),
            _ => None,
        }
    }

    /// Text form of a non-binary, non-secret value.
    ///
    /// Booleans render as `TRUE`/`FALSE` and references as their name.
    pub fn to_text(&self) -> Option<String> {
        match self {
            AttributeValue::String(s) => Some(s.clone()),
            AttributeValue::Integer(i) => Some(i.to_string()),
            AttributeValue::Boolean(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
            AttributeValue::Reference(r) => Some(r.name.clone()),
            AttributeValue::Binary(_) | AttributeValue::Password(_) => None,
        }
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<i32> for AttributeValue {
    fn from(i: i32) -> Self {
        AttributeValue::Integer(i64::from(i))
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(bytes: Vec<u8>) -> Self {
        AttributeValue::Binary(bytes)
    }
}

impl From<ObjectReference> for AttributeValue {
    fn from(reference: ObjectReference) -> Self {
        AttributeValue::Reference(reference)
    }
}

impl From<GuardedString> for AttributeValue {
    fn from(secret: GuardedString) -> Self {
        AttributeValue::Password(secret)
    }
}

/// A named, ordered list of values. An empty list means "present but empty".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    name: String,
    values: Vec<AttributeValue>,
}

impl Attribute {
    /// Create an attribute with the given values.
    pub fn new(name: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Create a present-but-empty attribute.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Create a single-valued attribute.
    pub fn single(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::new(name, vec![value.into()])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<AttributeValue> {
        self.values
    }

    /// First value, if any.
    pub fn first(&self) -> Option<&AttributeValue> {
        self.values.first()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether this attribute carries the given name (case-insensitive).
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A set of attributes, unique by case-insensitive name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttributeSet {
    attributes: Vec<Attribute>,
}

impl AttributeSet {
    /// Create a new empty attribute set.
    pub fn new() -> Self {
        Self {
            attributes: Vec::new(),
        }
    }

    /// Insert an attribute, replacing any attribute with the same name.
    pub fn set(&mut self, attribute: Attribute) {
        match self
            .attributes
            .iter_mut()
            .find(|existing| existing.is_named(&attribute.name))
        {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    /// Set a single-valued attribute using builder pattern.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set(Attribute::single(name, value));
        self
    }

    /// Set a multi-valued attribute using builder pattern.
    pub fn with_values(mut self, name: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        self.set(Attribute::new(name, values));
        self
    }

    /// Get an attribute by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.is_named(name))
    }

    /// Get the first value of an attribute as a string.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(Attribute::first)
            .and_then(AttributeValue::as_string)
    }

    /// Check if an attribute exists.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove an attribute.
    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        let index = self.attributes.iter().position(|a| a.is_named(name))?;
        Some(self.attributes.remove(index))
    }

    /// Get all attribute names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(Attribute::name)
    }

    /// Get the number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterate over all attributes.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = Attribute>>(iter: T) -> Self {
        let mut set = AttributeSet::new();
        for attribute in iter {
            set.set(attribute);
        }
        set
    }
}

impl IntoIterator for AttributeSet {
    type Item = Attribute;
    type IntoIter = std::vec::IntoIter<Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.into_iter()
    }
}

/// An object in the target system as seen by the identity framework.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityObject {
    pub object_class: ObjectClass,
    pub uid: Uid,
    /// Entry path of the object.
    pub name: String,
    pub attributes: AttributeSet,
}

impl IdentityObject {
    /// Create an object with no attributes besides id and name.
    pub fn new(object_class: ObjectClass, uid: Uid, name: impl Into<String>) -> Self {
        Self {
            object_class,
            uid,
            name: name.into(),
            attributes: AttributeSet::new(),
        }
    }

    /// Add an attribute using builder pattern.
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.set(attribute);
        self
    }
}

/// Which identity attributes a caller wants returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeSelection {
    /// Every attribute the object carries.
    #[default]
    All,
    /// Only the named attributes.
    Only(Vec<String>),
}

impl AttributeSelection {
    /// Select every attribute.
    pub fn all() -> Self {
        AttributeSelection::All
    }

    /// Select the given attribute names.
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttributeSelection::Only(names.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, AttributeSelection::All)
    }

    /// Whether `name` is selected (case-insensitive). `All` selects everything.
    pub fn includes(&self, name: &str) -> bool {
        match self {
            AttributeSelection::All => true,
            AttributeSelection::Only(names) => names.iter().any(|n| n.eq_ignore_ascii_case(name)),
        }
    }

    /// The explicit names, or `None` for `All`.
    pub fn names(&self) -> Option<&[String]> {
        match self {
            AttributeSelection::All => None,
            AttributeSelection::Only(names) => Some(names),
        }
    }
}

/// Change to a single attribute during update operations.
///
/// `values_to_replace = Some(vec![])` replaces the attribute with nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeDelta {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values_to_add: Vec<AttributeValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values_to_remove: Vec<AttributeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values_to_replace: Option<Vec<AttributeValue>>,
}

impl AttributeDelta {
    fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values_to_add: Vec::new(),
            values_to_remove: Vec::new(),
            values_to_replace: None,
        }
    }

    /// Add values to an attribute.
    pub fn add(name: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        Self {
            values_to_add: values,
            ..Self::named(name)
        }
    }

    /// Remove values from an attribute.
    pub fn remove(name: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        Self {
            values_to_remove: values,
            ..Self::named(name)
        }
    }

    /// Replace all values of an attribute.
    pub fn replace(name: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        Self {
            values_to_replace: Some(values),
            ..Self::named(name)
        }
    }

    /// Also add values using builder pattern.
    pub fn and_add(mut self, values: Vec<AttributeValue>) -> Self {
        self.values_to_add.extend(values);
        self
    }

    /// Also remove values using builder pattern.
    pub fn and_remove(mut self, values: Vec<AttributeValue>) -> Self {
        self.values_to_remove.extend(values);
        self
    }

    /// Check if this delta has any changes.
    pub fn is_empty(&self) -> bool {
        self.values_to_add.is_empty()
            && self.values_to_remove.is_empty()
            && self.values_to_replace.is_none()
    }
}

/// Predicate tree for search operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Attribute holds every one of the values.
    Equals {
        attribute: String,
        values: Vec<AttributeValue>,
    },

    /// Attribute equals the value, ignoring case.
    EqualsIgnoreCase {
        attribute: String,
        value: AttributeValue,
    },

    /// Attribute contains the value (substring).
    Contains {
        attribute: String,
        value: AttributeValue,
    },

    /// Attribute starts with the value.
    StartsWith {
        attribute: String,
        value: AttributeValue,
    },

    /// Attribute ends with the value.
    EndsWith {
        attribute: String,
        value: AttributeValue,
    },

    /// Attribute is greater than the value.
    GreaterThan {
        attribute: String,
        value: AttributeValue,
    },

    /// Attribute is greater than or equal to the value.
    GreaterThanOrEquals {
        attribute: String,
        value: AttributeValue,
    },

    /// Attribute is less than the value.
    LessThan {
        attribute: String,
        value: AttributeValue,
    },

    /// Attribute is less than or equal to the value.
    LessThanOrEquals {
        attribute: String,
        value: AttributeValue,
    },

    /// Multi-valued attribute contains all of the values.
    ContainsAllValues {
        attribute: String,
        values: Vec<AttributeValue>,
    },

    /// Logical AND of multiple filters.
    And { filters: Vec<Filter> },

    /// Logical OR of multiple filters.
    Or { filters: Vec<Filter> },

    /// Logical NOT of a filter.
    Not { filter: Box<Filter> },
}

impl Filter {
    /// Create an equals filter on a single value.
    pub fn eq(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            values: vec![value.into()],
        }
    }

    /// Create an equals filter on several values.
    pub fn eq_all(attribute: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            values,
        }
    }

    /// Create a case-insensitive equals filter.
    pub fn eq_ignore_case(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Filter::EqualsIgnoreCase {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a contains filter.
    pub fn contains(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Filter::Contains {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a starts-with filter.
    pub fn starts_with(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Filter::StartsWith {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create an ends-with filter.
    pub fn ends_with(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Filter::EndsWith {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn gt(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Filter::GreaterThan {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn ge(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Filter::GreaterThanOrEquals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn lt(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Filter::LessThan {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn le(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Filter::LessThanOrEquals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a contains-all-values filter.
    pub fn contains_all_values(attribute: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        Filter::ContainsAllValues {
            attribute: attribute.into(),
            values,
        }
    }

    /// Create an AND filter.
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    /// Create an OR filter.
    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    /// Create a NOT filter (negation).
    pub fn negate(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    /// Combine this filter with another using AND.
    pub fn and_with(self, other: Filter) -> Self {
        match self {
            Filter::And { mut filters } => {
                filters.push(other);
                Filter::And { filters }
            }
            _ => Filter::And {
                filters: vec![self, other],
            },
        }
    }

    /// Combine this filter with another using OR.
    pub fn or_with(self, other: Filter) -> Self {
        match self {
            Filter::Or { mut filters } => {
                filters.push(other);
                Filter::Or { filters }
            }
            _ => Filter::Or {
                filters: vec![self, other],
            },
        }
    }
}

/// Result of a search operation.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    /// The matching objects.
    pub objects: Vec<IdentityObject>,
}

impl SearchResult {
    /// Create a new search result.
    pub fn new(objects: Vec<IdentityObject>) -> Self {
        Self { objects }
    }

    /// Create an empty search result.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the number of objects returned.
    pub fn count(&self) -> usize {
        self.objects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_creation() {
        let uid = Uid::new("entryUUID", "5f2c1a7e-0000-4000-8000-000000000001");
        assert_eq!(uid.attribute_name(), "entryUUID");
        assert_eq!(uid.value(), "5f2c1a7e-0000-4000-8000-000000000001");
        assert_eq!(
            uid.to_string(),
            "entryUUID=5f2c1a7e-0000-4000-8000-000000000001"
        );
    }

    #[test]
    fn test_object_class_names() {
        assert_eq!(ObjectClass::from_name("__ACCOUNT__"), ObjectClass::Account);
        assert_eq!(ObjectClass::from_name("__GROUP__"), ObjectClass::Group);
        assert_eq!(
            ObjectClass::from_name("device"),
            ObjectClass::Other("device".to_string())
        );
        assert_eq!(ObjectClass::Group.to_string(), "__GROUP__");
    }

    #[test]
    fn test_special_names() {
        assert!(special::is_special(special::UID));
        assert!(special::is_special("__ENABLE__"));
        assert!(!special::is_special("cn"));
        assert!(!special::is_special("____"));
    }

    #[test]
    fn test_attribute_set_is_case_insensitive_and_unique() {
        let mut attrs = AttributeSet::new()
            .with("mail", "john@example.com")
            .with("cn", "John");

        attrs.set(Attribute::single("MAIL", "jdoe@example.com"));

        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get_string("Mail"), Some("jdoe@example.com"));
        assert_eq!(attrs.names().collect::<Vec<_>>(), vec!["MAIL", "cn"]);
    }

    #[test]
    fn test_present_but_empty_attribute() {
        let attrs = AttributeSet::new().with_values("telephoneNumber", vec![]);
        let attr = attrs.get("telephoneNumber").unwrap();
        assert!(attr.is_empty());
        assert!(attrs.has("telephonenumber"));
    }

    #[test]
    fn test_value_text_forms() {
        assert_eq!(AttributeValue::from(42i64).to_text(), Some("42".to_string()));
        assert_eq!(AttributeValue::from(true).to_text(), Some("TRUE".to_string()));
        assert_eq!(
            AttributeValue::from(ObjectReference::new(ObjectClass::Group, "cn=g,o=isp"))
                .to_text(),
            Some("cn=g,o=isp".to_string())
        );
        assert_eq!(AttributeValue::Binary(vec![1, 2]).to_text(), None);
        assert_eq!(
            AttributeValue::Password(GuardedString::new("s3cret")).to_text(),
            None
        );
    }

    #[test]
    fn test_guarded_string_never_leaks() {
        let secret = GuardedString::new("s3cret");
        assert!(!format!("{:?}", secret).contains("s3cret"));

        let json = serde_json::to_string(&AttributeValue::Password(secret.clone())).unwrap();
        assert!(!json.contains("s3cret"));
        assert_eq!(secret.expose(), "s3cret");
    }

    #[test]
    fn test_attribute_selection() {
        let all = AttributeSelection::all();
        assert!(all.includes("anything"));
        assert!(all.names().is_none());

        let some = AttributeSelection::only(["cn", "__GROUPS__"]);
        assert!(some.includes("CN"));
        assert!(some.includes("__groups__"));
        assert!(!some.includes("mail"));
    }

    #[test]
    fn test_attribute_delta() {
        let delta = AttributeDelta::add("mail", vec!["a@example.com".into()])
            .and_remove(vec!["b@example.com".into()]);
        assert!(!delta.is_empty());
        assert!(delta.values_to_replace.is_none());

        let clear = AttributeDelta::replace("mail", vec![]);
        assert!(!clear.is_empty());
    }

    #[test]
    fn test_filter_construction() {
        let filter = Filter::eq("mail", "john@example.com")
            .and_with(Filter::starts_with("cn", "Jo"))
            .and_with(Filter::negate(Filter::eq("employeeType", "contractor")));

        if let Filter::And { filters } = filter {
            assert_eq!(filters.len(), 3);
        } else {
            panic!("Expected AND filter");
        }
    }
}
