//! Predicate tree to LDAP filter translation.
//!
//! A predicate becomes a [`NativeFilter`]: an optional RFC 4515 filter string
//! plus an optional entry DN. The entry DN is how a constraint on the entry
//! path is expressed, since the path is the search base rather than an
//! attribute the directory can match.
//!
//! Parts of a predicate that cannot be pushed down translate to "no filter";
//! the search then returns a superset and the caller narrows it.

use xavyo_connector::diagnostics::{Diagnostic, Diagnostics};
use xavyo_connector::error::{ConnectorError, ConnectorResult};
use xavyo_connector::operation::{AttributeValue, Filter, ObjectClass};

use crate::attributes::AttributeNameTable;

/// Directory-side form of a translated predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeFilter {
    entry_dn: Option<String>,
    native: Option<String>,
}

impl NativeFilter {
    /// Filter selecting exactly the entry at `dn`.
    pub fn for_entry_dn(dn: impl Into<String>) -> Self {
        Self {
            entry_dn: Some(dn.into()),
            native: None,
        }
    }

    /// Filter with a native filter string.
    pub fn for_native(filter: impl Into<String>) -> Self {
        Self {
            entry_dn: None,
            native: Some(filter.into()),
        }
    }

    pub fn entry_dn(&self) -> Option<&str> {
        self.entry_dn.as_deref()
    }

    pub fn native(&self) -> Option<&str> {
        self.native.as_deref()
    }

    /// True when neither part is set, i.e. the filter matches everything.
    pub fn is_empty(&self) -> bool {
        self.entry_dn.is_none() && self.native.is_none()
    }

    /// Conjunction. Fails when both sides constrain different entry DNs.
    pub fn and(self, other: NativeFilter) -> ConnectorResult<NativeFilter> {
        let entry_dn = match (self.entry_dn, other.entry_dn) {
            (Some(left), Some(right)) if left != right => {
                return Err(ConnectorError::untranslatable(format!(
                    "conjunction of two entry paths: {left} and {right}"
                )));
            }
            (Some(left), _) => Some(left),
            (None, right) => right,
        };

        let native = match (self.native, other.native) {
            (Some(left), Some(right)) => Some(format!("(&{left}{right})")),
            (left, right) => left.or(right),
        };

        Ok(NativeFilter { entry_dn, native })
    }

    /// Disjunction. Fails when either side constrains an entry DN.
    pub fn or(self, other: NativeFilter) -> ConnectorResult<NativeFilter> {
        if let Some(dn) = self.entry_dn.as_ref().or(other.entry_dn.as_ref()) {
            return Err(ConnectorError::untranslatable(format!(
                "disjunction involving entry path {dn}"
            )));
        }

        if self.is_empty() || other.is_empty() {
            return Ok(NativeFilter::default());
        }

        let native = match (self.native, other.native) {
            (Some(left), Some(right)) => Some(format!("(|{left}{right})")),
            (left, right) => left.or(right),
        };

        Ok(NativeFilter {
            entry_dn: None,
            native,
        })
    }
}

/// Result of translating a predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    /// `None` means no filter could be pushed down.
    pub filter: Option<NativeFilter>,
    pub diagnostics: Diagnostics,
}

/// Escape special characters in LDAP filter values (RFC 4515).
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

/// Escape every byte of a binary value as `\xx`.
pub fn escape_filter_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("\\{b:02x}")).collect()
}

/// `(objectClass=<class>)`.
pub fn object_class_filter(object_class: &str) -> String {
    format!("(objectClass={})", escape_filter_value(object_class))
}

/// Object-class filter, narrowed by `native` when present.
pub fn search_filter(object_class: &str, native: Option<&str>) -> String {
    match native {
        Some(native) => format!("(&{}{})", object_class_filter(object_class), native),
        None => object_class_filter(object_class),
    }
}

fn render_value(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Binary(bytes) => escape_filter_bytes(bytes),
        other => other
            .to_text()
            .map(|text| escape_filter_value(&text))
            .unwrap_or_default(),
    }
}

#[derive(Debug, Clone, Copy)]
enum Substring {
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone, Copy)]
enum Leaf {
    Equality,
    Substring(Substring),
    /// `operator` is what the directory supports; `complement` marks strict
    /// comparisons expressed as the negation of the opposite bound.
    Ordering {
        operator: &'static str,
        complement: bool,
    },
}

/// Translates predicates for one object class.
pub struct FilterTranslator<'a> {
    names: &'a AttributeNameTable,
    object_class: &'a ObjectClass,
}

impl<'a> FilterTranslator<'a> {
    pub fn new(names: &'a AttributeNameTable, object_class: &'a ObjectClass) -> Self {
        Self {
            names,
            object_class,
        }
    }

    /// Translate a predicate tree.
    ///
    /// Returns an error only when the predicate combines entry paths in a
    /// way no single request can express.
    pub fn translate(&self, filter: &Filter) -> ConnectorResult<Translation> {
        let mut diagnostics = Diagnostics::new();
        let filter = self.node(filter, false, &mut diagnostics)?;
        Ok(Translation {
            filter,
            diagnostics,
        })
    }

    fn node(
        &self,
        filter: &Filter,
        negated: bool,
        diagnostics: &mut Diagnostics,
    ) -> ConnectorResult<Option<NativeFilter>> {
        match filter {
            Filter::Not { filter } => self.node(filter, !negated, diagnostics),
            // De Morgan: NOT pushed down to the leaves.
            Filter::And { filters } if negated => self.disjunction(filters, true, diagnostics),
            Filter::And { filters } => self.conjunction(filters, false, diagnostics),
            Filter::Or { filters } if negated => self.conjunction(filters, true, diagnostics),
            Filter::Or { filters } => self.disjunction(filters, false, diagnostics),
            leaf => self.leaf(leaf, negated, diagnostics),
        }
    }

    fn conjunction(
        &self,
        filters: &[Filter],
        negated: bool,
        diagnostics: &mut Diagnostics,
    ) -> ConnectorResult<Option<NativeFilter>> {
        let mut result: Option<NativeFilter> = None;
        for filter in filters {
            if let Some(part) = self.node(filter, negated, diagnostics)? {
                result = Some(match result {
                    Some(acc) => acc.and(part)?,
                    None => part,
                });
            }
        }
        Ok(result)
    }

    fn disjunction(
        &self,
        filters: &[Filter],
        negated: bool,
        diagnostics: &mut Diagnostics,
    ) -> ConnectorResult<Option<NativeFilter>> {
        let mut parts = Vec::with_capacity(filters.len());
        for filter in filters {
            parts.push(self.node(filter, negated, diagnostics)?);
        }

        // A branch that cannot be pushed down could match anything.
        let Some(parts) = parts.into_iter().collect::<Option<Vec<_>>>() else {
            return Ok(None);
        };

        let mut parts = parts.into_iter();
        let Some(first) = parts.next() else {
            return Ok(None);
        };
        parts.try_fold(first, NativeFilter::or).map(Some)
    }

    fn leaf(
        &self,
        filter: &Filter,
        negated: bool,
        diagnostics: &mut Diagnostics,
    ) -> ConnectorResult<Option<NativeFilter>> {
        let (attribute, values, leaf) = match filter {
            Filter::Equals { attribute, values }
            | Filter::ContainsAllValues { attribute, values } => {
                (attribute, values.as_slice(), Leaf::Equality)
            }
            Filter::EqualsIgnoreCase { attribute, value } => {
                (attribute, std::slice::from_ref(value), Leaf::Equality)
            }
            Filter::Contains { attribute, value } => (
                attribute,
                std::slice::from_ref(value),
                Leaf::Substring(Substring::Contains),
            ),
            Filter::StartsWith { attribute, value } => (
                attribute,
                std::slice::from_ref(value),
                Leaf::Substring(Substring::StartsWith),
            ),
            Filter::EndsWith { attribute, value } => (
                attribute,
                std::slice::from_ref(value),
                Leaf::Substring(Substring::EndsWith),
            ),
            Filter::GreaterThan { attribute, value } => (
                attribute,
                std::slice::from_ref(value),
                Leaf::Ordering {
                    operator: "<=",
                    complement: true,
                },
            ),
            Filter::GreaterThanOrEquals { attribute, value } => (
                attribute,
                std::slice::from_ref(value),
                Leaf::Ordering {
                    operator: ">=",
                    complement: false,
                },
            ),
            Filter::LessThan { attribute, value } => (
                attribute,
                std::slice::from_ref(value),
                Leaf::Ordering {
                    operator: ">=",
                    complement: true,
                },
            ),
            Filter::LessThanOrEquals { attribute, value } => (
                attribute,
                std::slice::from_ref(value),
                Leaf::Ordering {
                    operator: "<=",
                    complement: false,
                },
            ),
            Filter::And { .. } | Filter::Or { .. } | Filter::Not { .. } => {
                return self.node(filter, negated, diagnostics);
            }
        };

        let Some(directory) = self.names.filter_attribute(self.object_class, attribute) else {
            diagnostics.push(Diagnostic::UnresolvedAttribute {
                attribute: attribute.clone(),
            });
            return Ok(None);
        };

        if values.iter().any(|v| v.as_password().is_some()) {
            return Ok(None);
        }

        if AttributeNameTable::is_entry_path(directory) {
            return Ok(Self::entry_path(values, negated));
        }

        let (body, negated) = match leaf {
            Leaf::Equality => match values {
                [] => return Ok(None),
                [single] => (assertion(directory, "=", single), negated),
                many => {
                    let mut body = String::from("&");
                    for value in many {
                        body.push('(');
                        body.push_str(&assertion(directory, "=", value));
                        body.push(')');
                    }
                    (body, negated)
                }
            },
            Leaf::Substring(kind) => {
                let Some(value) = values.first() else {
                    return Ok(None);
                };
                (substring(directory, kind, value), negated)
            }
            Leaf::Ordering {
                operator,
                complement,
            } => {
                let Some(value) = values.first() else {
                    return Ok(None);
                };
                (assertion(directory, operator, value), negated != complement)
            }
        };

        let native = if negated {
            format!("(!({body}))")
        } else {
            format!("({body})")
        };
        Ok(Some(NativeFilter::for_native(native)))
    }

    /// A leaf on the entry path constrains the search base to one entry,
    /// whatever its operator. A negated path constraint has no such form.
    fn entry_path(values: &[AttributeValue], negated: bool) -> Option<NativeFilter> {
        if negated {
            return None;
        }
        match values {
            [single] => single
                .to_text()
                .filter(|dn| !dn.is_empty())
                .map(NativeFilter::for_entry_dn),
            _ => None,
        }
    }
}

fn assertion(attribute: &str, operator: &str, value: &AttributeValue) -> String {
    let rendered = render_value(value);
    if rendered.is_empty() {
        format!("{attribute}{operator}*")
    } else {
        format!("{attribute}{operator}{rendered}")
    }
}

fn substring(attribute: &str, kind: Substring, value: &AttributeValue) -> String {
    let rendered = render_value(value);
    if rendered.is_empty() {
        return format!("{attribute}=*");
    }
    match kind {
        Substring::Contains => format!("{attribute}=*{rendered}*"),
        Substring::StartsWith => format!("{attribute}={rendered}*"),
        Substring::EndsWith => format!("{attribute}=*{rendered}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AttributeMappingConfig;
    use xavyo_connector::operation::GuardedString;

    fn names() -> AttributeNameTable {
        AttributeNameTable::new(&AttributeMappingConfig::default())
    }

    fn translate(filter: &Filter) -> ConnectorResult<Option<NativeFilter>> {
        let names = names();
        let class = ObjectClass::Account;
        FilterTranslator::new(&names, &class)
            .translate(filter)
            .map(|t| t.filter)
    }

    fn native(filter: &Filter) -> Option<String> {
        translate(filter)
            .unwrap()
            .and_then(|f| f.native().map(str::to_string))
    }

    // =========================================================================
    // NativeFilter combination
    // =========================================================================

    #[test]
    fn test_and_keeps_entry_dn_and_native() {
        let combined = NativeFilter::for_entry_dn("o=isp")
            .and(NativeFilter::for_native("(foo=1)"))
            .unwrap();
        assert_eq!(combined.entry_dn(), Some("o=isp"));
        assert_eq!(combined.native(), Some("(foo=1)"));
    }

    #[test]
    fn test_and_of_two_entry_dns_fails() {
        let err = NativeFilter::for_entry_dn("o=isp")
            .and(NativeFilter::for_entry_dn("o=other"))
            .unwrap_err();
        assert_eq!(err.error_code(), "UNTRANSLATABLE_FILTER");
    }

    #[test]
    fn test_and_of_identical_entry_dns() {
        let combined = NativeFilter::for_entry_dn("o=isp")
            .and(NativeFilter::for_entry_dn("o=isp"))
            .unwrap();
        assert_eq!(combined, NativeFilter::for_entry_dn("o=isp"));
    }

    #[test]
    fn test_and_of_natives() {
        let combined = NativeFilter::for_native("(a=1)")
            .and(NativeFilter::for_native("(b=2)"))
            .unwrap();
        assert_eq!(combined.native(), Some("(&(a=1)(b=2))"));
        assert_eq!(combined.entry_dn(), None);
    }

    #[test]
    fn test_or_with_entry_dn_fails() {
        assert!(NativeFilter::for_entry_dn("o=isp")
            .or(NativeFilter::for_native("(foo=1)"))
            .is_err());
        assert!(NativeFilter::for_native("(foo=1)")
            .or(NativeFilter::for_entry_dn("o=isp"))
            .is_err());
    }

    #[test]
    fn test_or_of_natives() {
        let combined = NativeFilter::for_native("(a=1)")
            .or(NativeFilter::for_native("(b=2)"))
            .unwrap();
        assert_eq!(combined.native(), Some("(|(a=1)(b=2))"));
    }

    #[test]
    fn test_or_with_match_all_matches_all() {
        let combined = NativeFilter::default()
            .or(NativeFilter::for_native("(b=2)"))
            .unwrap();
        assert!(combined.is_empty());
    }

    // =========================================================================
    // Leaves
    // =========================================================================

    #[test]
    fn test_contains() {
        assert_eq!(native(&Filter::contains("foo", "")), Some("(foo=*)".into()));
        assert_eq!(
            native(&Filter::contains("foo", "bar")),
            Some("(foo=*bar*)".into())
        );
    }

    #[test]
    fn test_starts_with() {
        assert_eq!(native(&Filter::starts_with("foo", "")), Some("(foo=*)".into()));
        assert_eq!(
            native(&Filter::negate(Filter::starts_with("foo", ""))),
            Some("(!(foo=*))".into())
        );
        assert_eq!(
            native(&Filter::starts_with("foo", "bar")),
            Some("(foo=bar*)".into())
        );
    }

    #[test]
    fn test_ends_with() {
        assert_eq!(native(&Filter::ends_with("foo", "")), Some("(foo=*)".into()));
        assert_eq!(
            native(&Filter::ends_with("foo", "bar")),
            Some("(foo=*bar)".into())
        );
    }

    #[test]
    fn test_equals() {
        assert_eq!(translate(&Filter::eq_all("foo", vec![])).unwrap(), None);
        assert_eq!(native(&Filter::eq("foo", "")), Some("(foo=*)".into()));
        assert_eq!(native(&Filter::eq("foo", "bar")), Some("(foo=bar)".into()));
        assert_eq!(
            native(&Filter::eq_all("foo", vec!["bar".into(), "baz".into()])),
            Some("(&(foo=bar)(foo=baz))".into())
        );
        assert_eq!(
            native(&Filter::negate(Filter::eq_all(
                "foo",
                vec!["bar".into(), "baz".into()]
            ))),
            Some("(!(&(foo=bar)(foo=baz)))".into())
        );
    }

    #[test]
    fn test_equals_ignore_case_is_equals() {
        assert_eq!(
            native(&Filter::eq_ignore_case("foo", "Bar")),
            Some("(foo=Bar)".into())
        );
    }

    #[test]
    fn test_contains_all_values() {
        assert_eq!(
            native(&Filter::contains_all_values(
                "mail",
                vec!["a@x".into(), "b@x".into()]
            )),
            Some("(&(mail=a@x)(mail=b@x))".into())
        );
    }

    #[test]
    fn test_greater_than() {
        assert_eq!(native(&Filter::gt("foo", 42i64)), Some("(!(foo<=42))".into()));
        assert_eq!(
            native(&Filter::negate(Filter::gt("foo", 42i64))),
            Some("(foo<=42)".into())
        );
    }

    #[test]
    fn test_greater_than_or_equals() {
        assert_eq!(native(&Filter::ge("foo", 42i64)), Some("(foo>=42)".into()));
        assert_eq!(
            native(&Filter::negate(Filter::ge("foo", 42i64))),
            Some("(!(foo>=42))".into())
        );
    }

    #[test]
    fn test_less_than() {
        assert_eq!(native(&Filter::lt("foo", 42i64)), Some("(!(foo>=42))".into()));
        assert_eq!(
            native(&Filter::negate(Filter::lt("foo", 42i64))),
            Some("(foo>=42)".into())
        );
    }

    #[test]
    fn test_less_than_or_equals() {
        assert_eq!(native(&Filter::le("foo", 42i64)), Some("(foo<=42)".into()));
        assert_eq!(
            native(&Filter::negate(Filter::le("foo", 42i64))),
            Some("(!(foo<=42))".into())
        );
    }

    #[test]
    fn test_values_are_escaped() {
        assert_eq!(
            native(&Filter::eq("cn", "a*(b)\\c")),
            Some("(cn=a\\2a\\28b\\29\\5cc)".into())
        );
        assert_eq!(
            native(&Filter::contains("cn", "*")),
            Some("(cn=*\\2a*)".into())
        );
    }

    #[test]
    fn test_binary_values_are_hex_escaped() {
        assert_eq!(
            native(&Filter::eq("objectGUID", vec![0x01u8, 0xab, 0x2a])),
            Some("(objectGUID=\\01\\ab\\2a)".into())
        );
        assert_eq!(
            native(&Filter::eq("objectGUID", Vec::<u8>::new())),
            Some("(objectGUID=*)".into())
        );
    }

    #[test]
    fn test_special_names_resolve() {
        assert_eq!(
            native(&Filter::eq("__UID__", "1234")),
            Some("(entryUUID=1234)".into())
        );
        assert_eq!(
            native(&Filter::eq("__MEMBERS__", "uid=a,o=isp")),
            Some("(member=uid=a,o=isp)".into())
        );
    }

    #[test]
    fn test_unresolved_special_name_is_no_filter() {
        let names = names();
        let class = ObjectClass::Account;
        let translation = FilterTranslator::new(&names, &class)
            .translate(&Filter::eq("__ENABLE__", true))
            .unwrap();
        assert_eq!(translation.filter, None);
        assert!(translation
            .diagnostics
            .any(|d| matches!(d, Diagnostic::UnresolvedAttribute { attribute } if attribute == "__ENABLE__")));
    }

    #[test]
    fn test_password_values_are_never_rendered() {
        let filter = Filter::eq("__PASSWORD__", GuardedString::new("s3cret"));
        assert_eq!(translate(&filter).unwrap(), None);
    }

    // =========================================================================
    // Entry path
    // =========================================================================

    #[test]
    fn test_entry_dn_with_any_operator() {
        for filter in [
            Filter::eq("entryDN", "o=isp"),
            Filter::contains("entryDN", "o=isp"),
            Filter::starts_with("dn", "o=isp"),
            Filter::ends_with("distinguishedName", "o=isp"),
            Filter::gt("entryDN", "o=isp"),
            Filter::le("__NAME__", "o=isp"),
        ] {
            assert_eq!(
                translate(&filter).unwrap(),
                Some(NativeFilter::for_entry_dn("o=isp")),
                "{filter:?}"
            );
        }
    }

    #[test]
    fn test_entry_dn_with_several_values_is_no_filter() {
        let filter = Filter::contains_all_values(
            "entryDN",
            vec!["o=isp".into(), "o=other".into()],
        );
        assert_eq!(translate(&filter).unwrap(), None);
    }

    #[test]
    fn test_negated_entry_dn_is_no_filter() {
        assert_eq!(
            translate(&Filter::negate(Filter::eq("entryDN", "o=isp"))).unwrap(),
            None
        );
    }

    #[test]
    fn test_and_of_entry_dn_and_attribute() {
        let filter = Filter::and(vec![
            Filter::eq("entryDN", "uid=a,o=isp"),
            Filter::eq("foo", "1"),
        ]);
        let translated = translate(&filter).unwrap().unwrap();
        assert_eq!(translated.entry_dn(), Some("uid=a,o=isp"));
        assert_eq!(translated.native(), Some("(foo=1)"));
    }

    #[test]
    fn test_and_of_two_entry_dns_is_an_error() {
        let filter = Filter::and(vec![
            Filter::eq("entryDN", "o=isp"),
            Filter::eq("entryDN", "o=other"),
        ]);
        assert!(translate(&filter).is_err());
    }

    #[test]
    fn test_or_with_entry_dn_is_an_error() {
        let filter = Filter::or(vec![
            Filter::eq("entryDN", "o=isp"),
            Filter::eq("foo", "1"),
        ]);
        assert!(translate(&filter).is_err());
    }

    // =========================================================================
    // Composite predicates
    // =========================================================================

    #[test]
    fn test_and_or_composition() {
        let filter = Filter::and(vec![
            Filter::eq("a", "1"),
            Filter::or(vec![Filter::eq("b", "2"), Filter::eq("c", "3")]),
        ]);
        assert_eq!(native(&filter), Some("(&(a=1)(|(b=2)(c=3)))".into()));
    }

    #[test]
    fn test_double_negation_is_identity() {
        let leaves = vec![
            Filter::eq("cn", "John"),
            Filter::eq_all("mail", vec!["a@x".into(), "b@x".into()]),
            Filter::eq_ignore_case("cn", "john"),
            Filter::contains("cn", "oh"),
            Filter::starts_with("cn", "Jo"),
            Filter::ends_with("cn", "hn"),
            Filter::gt("uidNumber", 500i64),
            Filter::ge("uidNumber", 500i64),
            Filter::lt("uidNumber", 500i64),
            Filter::le("uidNumber", 500i64),
            Filter::contains_all_values("mail", vec!["a@x".into(), "b@x".into()]),
        ];
        for leaf in leaves {
            let plain = translate(&leaf).unwrap();
            assert!(plain.is_some(), "{leaf:?}");
            let twice = translate(&Filter::negate(Filter::negate(leaf.clone()))).unwrap();
            assert_eq!(twice, plain, "{leaf:?}");
        }
    }

    #[test]
    fn test_escaped_value_reverses_to_original() {
        fn unescape(rendered: &str) -> String {
            let bytes = rendered.as_bytes();
            let mut out = Vec::new();
            let mut i = 0;
            while i < bytes.len() {
                if bytes[i] == b'\\' {
                    let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap();
                    out.push(u8::from_str_radix(hex, 16).unwrap());
                    i += 3;
                } else {
                    out.push(bytes[i]);
                    i += 1;
                }
            }
            String::from_utf8(out).unwrap()
        }

        let value = "a*(b)\\c\0d**";
        let escaped = escape_filter_value(value);
        assert!(!escaped.contains(['*', '(', ')', '\0']));
        assert_eq!(unescape(&escaped), value);

        let clause = native(&Filter::eq("cn", value)).unwrap();
        let rendered = clause
            .strip_prefix("(cn=")
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap();
        assert_eq!(unescape(rendered), value);
    }

    #[test]
    fn test_negation_is_pushed_to_leaves() {
        let filter = Filter::negate(Filter::and(vec![
            Filter::eq("a", "1"),
            Filter::eq("b", "2"),
        ]));
        assert_eq!(native(&filter), Some("(|(!(a=1))(!(b=2)))".into()));

        let filter = Filter::negate(Filter::or(vec![
            Filter::eq("a", "1"),
            Filter::gt("n", 5i64),
        ]));
        assert_eq!(native(&filter), Some("(&(!(a=1))(n<=5))".into()));
    }

    #[test]
    fn test_and_skips_untranslatable_branches() {
        let filter = Filter::and(vec![Filter::eq("__ENABLE__", true), Filter::eq("a", "1")]);
        assert_eq!(native(&filter), Some("(a=1)".into()));
    }

    #[test]
    fn test_or_with_untranslatable_branch_is_no_filter() {
        let filter = Filter::or(vec![Filter::eq("__ENABLE__", true), Filter::eq("a", "1")]);
        assert_eq!(translate(&filter).unwrap(), None);
    }

    #[test]
    fn test_empty_composites_are_no_filter() {
        assert_eq!(translate(&Filter::and(vec![])).unwrap(), None);
        assert_eq!(translate(&Filter::or(vec![])).unwrap(), None);
    }

    #[test]
    fn test_search_filter() {
        assert_eq!(search_filter("inetOrgPerson", None), "(objectClass=inetOrgPerson)");
        assert_eq!(
            search_filter("inetOrgPerson", Some("(cn=a)")),
            "(&(objectClass=inetOrgPerson)(cn=a))"
        );
        assert_eq!(object_class_filter("a(b"), "(objectClass=a\\28b)");
    }

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("John Doe"), "John Doe");
        assert_eq!(escape_filter_value("John*"), "John\\2a");
        assert_eq!(escape_filter_value("(admin)"), "\\28admin\\29");
        assert_eq!(escape_filter_value("a\\b"), "a\\5cb");
        assert_eq!(escape_filter_value("nul\0"), "nul\\00");
    }
}
