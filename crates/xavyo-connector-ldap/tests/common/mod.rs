//! Integration test helpers for xavyo-connector-ldap.
//!
//! Provides an in-memory directory with a change log, standing in for an
//! LDAP server that supports content synchronization.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use uuid::Uuid;

use xavyo_connector::error::{ConnectorError, ConnectorResult};
use xavyo_connector_ldap::directory::{
    DirectoryConnection, EntryState, Modification, ModificationKind, RawAttribute, RawEntry,
    SearchRequest, SearchScope, SyncNotification, SyncRequest, SyncSession, SyncSessionFactory,
    NO_ATTRIBUTES,
};
use xavyo_connector_ldap::{LdapConfig, LdapConnector};

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

pub const BASE_DN: &str = "o=isp";

// ============================================================================
// Filter evaluation
// ============================================================================

#[derive(Debug)]
enum Node {
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
    Present(String),
    Equal(String, String),
    Substring(String, Vec<String>),
    GreaterOrEqual(String, String),
    LessOrEqual(String, String),
}

fn unescape(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 2 < bytes.len() {
            let hex = &value[i + 1..i + 3];
            out.push(u8::from_str_radix(hex, 16).expect("valid escape"));
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn parse(input: &str) -> Node {
    let (node, rest) = parse_filter(input);
    assert!(rest.is_empty(), "trailing input in filter: {rest}");
    node
}

fn parse_filter(input: &str) -> (Node, &str) {
    let input = input.strip_prefix('(').expect("filter starts with '('");
    match input.chars().next() {
        Some('&') => {
            let (children, rest) = parse_list(&input[1..]);
            (Node::And(children), rest)
        }
        Some('|') => {
            let (children, rest) = parse_list(&input[1..]);
            (Node::Or(children), rest)
        }
        Some('!') => {
            let (child, rest) = parse_filter(&input[1..]);
            let rest = rest.strip_prefix(')').expect("closing ')'");
            (Node::Not(Box::new(child)), rest)
        }
        _ => {
            let end = input.find(')').expect("closing ')'");
            (parse_item(&input[..end]), &input[end + 1..])
        }
    }
}

fn parse_list(mut input: &str) -> (Vec<Node>, &str) {
    let mut children = Vec::new();
    while !input.starts_with(')') {
        let (child, rest) = parse_filter(input);
        children.push(child);
        input = rest;
    }
    (children, &input[1..])
}

fn parse_item(item: &str) -> Node {
    if let Some((attribute, value)) = item.split_once(">=") {
        return Node::GreaterOrEqual(attribute.to_string(), unescape(value));
    }
    if let Some((attribute, value)) = item.split_once("<=") {
        return Node::LessOrEqual(attribute.to_string(), unescape(value));
    }
    let (attribute, value) = item.split_once('=').expect("attribute assertion");
    if value == "*" {
        Node::Present(attribute.to_string())
    } else if value.contains('*') {
        Node::Substring(
            attribute.to_string(),
            value.split('*').map(unescape).collect(),
        )
    } else {
        Node::Equal(attribute.to_string(), unescape(value))
    }
}

fn values_of(entry: &RawEntry, attribute: &str) -> Vec<String> {
    if attribute.eq_ignore_ascii_case("entryDN") {
        return vec![entry.dn.to_lowercase()];
    }
    entry
        .get(attribute)
        .map(|a| a.text_values().map(|v| v.to_lowercase()).collect())
        .unwrap_or_default()
}

fn compare(left: &str, right: &str) -> std::cmp::Ordering {
    match (left.parse::<i64>(), right.parse::<i64>()) {
        (Ok(l), Ok(r)) => l.cmp(&r),
        _ => left.cmp(right),
    }
}

fn substring_matches(value: &str, parts: &[String]) -> bool {
    let last = parts.len() - 1;
    let mut position = 0;
    for (i, part) in parts.iter().enumerate() {
        let part = part.to_lowercase();
        if i == 0 {
            if !value.starts_with(&part) {
                return false;
            }
            position = part.len();
        } else if i == last {
            return value.len() >= position + part.len() && value.ends_with(&part);
        } else if let Some(found) = value[position..].find(&part) {
            position += found + part.len();
        } else {
            return false;
        }
    }
    true
}

fn matches(node: &Node, entry: &RawEntry) -> bool {
    match node {
        Node::And(children) => children.iter().all(|c| matches(c, entry)),
        Node::Or(children) => children.iter().any(|c| matches(c, entry)),
        Node::Not(child) => !matches(child, entry),
        Node::Present(attribute) => !values_of(entry, attribute).is_empty(),
        Node::Equal(attribute, value) => {
            let value = value.to_lowercase();
            values_of(entry, attribute).iter().any(|v| *v == value)
        }
        Node::Substring(attribute, parts) => values_of(entry, attribute)
            .iter()
            .any(|v| substring_matches(v, parts)),
        Node::GreaterOrEqual(attribute, value) => values_of(entry, attribute)
            .iter()
            .any(|v| compare(v, &value.to_lowercase()).is_ge()),
        Node::LessOrEqual(attribute, value) => values_of(entry, attribute)
            .iter()
            .any(|v| compare(v, &value.to_lowercase()).is_le()),
    }
}

fn in_scope(dn: &str, base: &str, scope: SearchScope) -> bool {
    let dn = dn.to_lowercase();
    let base = base.to_lowercase();
    match scope {
        SearchScope::Base => dn == base,
        SearchScope::OneLevel => dn
            .split_once(',')
            .map(|(_, parent)| parent == base)
            .unwrap_or(false),
        SearchScope::Subtree => dn == base || dn.ends_with(&format!(",{base}")),
    }
}

fn select(entry: &RawEntry, attributes: &[String]) -> RawEntry {
    if attributes.iter().any(|a| a == NO_ATTRIBUTES) {
        return RawEntry::new(entry.dn.clone());
    }
    if attributes.iter().any(|a| a == "*") {
        return entry.clone();
    }
    RawEntry {
        dn: entry.dn.clone(),
        attributes: entry
            .attributes
            .iter()
            .filter(|a| attributes.iter().any(|n| n.eq_ignore_ascii_case(&a.name)))
            .cloned()
            .collect(),
    }
}

// ============================================================================
// In-memory directory
// ============================================================================

struct Stored {
    uuid: String,
    entry: RawEntry,
    changed: u64,
}

#[derive(Default)]
struct State {
    entries: BTreeMap<String, Stored>,
    deleted: Vec<(u64, String)>,
    stale: Vec<String>,
    clock: u64,
    fail_next_sync: bool,
    searches: Vec<SearchRequest>,
    modifications: Vec<(String, Vec<Modification>)>,
    sync_requests: Vec<SyncRequest>,
}

impl State {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn find_mut(&mut self, dn: &str) -> Option<&mut Stored> {
        self.entries.get_mut(&dn.to_lowercase())
    }
}

/// Directory contents plus a change log, answering searches, modifies and
/// content-sync sessions.
#[derive(Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
    closed_sessions: Arc<AtomicUsize>,
}

impl InMemoryDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store an entry and return its entry UUID.
    pub fn add(&self, entry: RawEntry) -> String {
        let uuid = Uuid::new_v4().to_string();
        let mut state = self.state.lock().unwrap();
        let changed = state.tick();
        let entry = entry.with(RawAttribute::text("entryUUID", [uuid.clone()]));
        state.entries.insert(
            entry.dn.to_lowercase(),
            Stored {
                uuid: uuid.clone(),
                entry,
                changed,
            },
        );
        uuid
    }

    /// Replace the values of one attribute.
    pub fn set(&self, dn: &str, attribute: &str, values: &[&str]) {
        let mut state = self.state.lock().unwrap();
        let changed = state.tick();
        let stored = state.find_mut(dn).expect("entry exists");
        stored
            .entry
            .attributes
            .retain(|a| !a.name.eq_ignore_ascii_case(attribute));
        if !values.is_empty() {
            stored
                .entry
                .attributes
                .push(RawAttribute::text(attribute, values.iter().copied()));
        }
        stored.changed = changed;
    }

    pub fn delete(&self, dn: &str) {
        let mut state = self.state.lock().unwrap();
        let changed = state.tick();
        let stored = state
            .entries
            .remove(&dn.to_lowercase())
            .expect("entry exists");
        state.deleted.push((changed, stored.uuid));
    }

    /// Report an id as possibly deleted in the next sync session.
    pub fn announce_stale(&self, uuid: &str) {
        self.state.lock().unwrap().stale.push(uuid.to_string());
    }

    /// Make the next sync session fail after its first notification.
    pub fn fail_next_sync(&self) {
        self.state.lock().unwrap().fail_next_sync = true;
    }

    pub fn entry(&self, dn: &str) -> Option<RawEntry> {
        let state = self.state.lock().unwrap();
        state
            .entries
            .get(&dn.to_lowercase())
            .map(|s| s.entry.clone())
    }

    pub fn searches(&self) -> Vec<SearchRequest> {
        self.state.lock().unwrap().searches.clone()
    }

    pub fn modifications(&self) -> Vec<(String, Vec<Modification>)> {
        self.state.lock().unwrap().modifications.clone()
    }

    pub fn sync_requests(&self) -> Vec<SyncRequest> {
        self.state.lock().unwrap().sync_requests.clone()
    }

    pub fn closed_sessions(&self) -> usize {
        self.closed_sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryConnection for InMemoryDirectory {
    async fn search(&self, request: &SearchRequest) -> ConnectorResult<Vec<RawEntry>> {
        let mut state = self.state.lock().unwrap();
        state.searches.push(request.clone());
        let filter = parse(&request.filter);
        Ok(state
            .entries
            .values()
            .filter(|s| in_scope(&s.entry.dn, &request.base, request.scope))
            .filter(|s| matches(&filter, &s.entry))
            .map(|s| select(&s.entry, &request.attributes))
            .collect())
    }

    async fn modify(&self, dn: &str, modifications: Vec<Modification>) -> ConnectorResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .modifications
            .push((dn.to_string(), modifications.clone()));
        let changed = state.tick();
        let stored = state
            .find_mut(dn)
            .ok_or_else(|| ConnectorError::ObjectNotFound {
                identifier: dn.to_string(),
            })?;

        for modification in modifications {
            let attributes = &mut stored.entry.attributes;
            let position = attributes
                .iter()
                .position(|a| a.name.eq_ignore_ascii_case(&modification.attribute));
            match modification.kind {
                ModificationKind::Add => match position {
                    Some(i) => {
                        for value in modification.values {
                            if !attributes[i].values.contains(&value) {
                                attributes[i].values.push(value);
                            }
                        }
                    }
                    None => attributes.push(RawAttribute::new(
                        modification.attribute,
                        modification.values,
                    )),
                },
                ModificationKind::Delete => {
                    if let Some(i) = position {
                        if modification.values.is_empty() {
                            attributes.remove(i);
                        } else {
                            attributes[i]
                                .values
                                .retain(|v| !modification.values.contains(v));
                            if attributes[i].values.is_empty() {
                                attributes.remove(i);
                            }
                        }
                    }
                }
                ModificationKind::Replace => {
                    if let Some(i) = position {
                        attributes.remove(i);
                    }
                    if !modification.values.is_empty() {
                        attributes.push(RawAttribute::new(
                            modification.attribute,
                            modification.values,
                        ));
                    }
                }
            }
        }
        stored.changed = changed;
        Ok(())
    }
}

#[async_trait]
impl SyncSessionFactory for InMemoryDirectory {
    async fn open(&self, request: &SyncRequest) -> ConnectorResult<Box<dyn SyncSession>> {
        let mut state = self.state.lock().unwrap();
        state.sync_requests.push(request.clone());

        let since = match &request.cookie {
            Some(cookie) => Some(
                String::from_utf8_lossy(cookie)
                    .parse::<u64>()
                    .map_err(|_| ConnectorError::sync_failed(&request.filter, "bad cookie"))?,
            ),
            None => None,
        };

        let filter = parse(&request.filter);
        let mut notifications: VecDeque<ConnectorResult<SyncNotification>> = state
            .entries
            .values()
            .filter(|s| since.map_or(true, |since| s.changed > since))
            .filter(|s| in_scope(&s.entry.dn, &request.base, SearchScope::Subtree))
            .filter(|s| matches(&filter, &s.entry))
            .map(|s| {
                Ok(SyncNotification::Entry {
                    state: if since.is_some() {
                        EntryState::Modify
                    } else {
                        EntryState::Add
                    },
                    entry_uuid: s.uuid.clone(),
                    entry: select(&s.entry, &request.attributes),
                })
            })
            .collect();

        if let Some(since) = since {
            let mut stale: Vec<String> = state
                .deleted
                .iter()
                .filter(|(changed, _)| *changed > since)
                .map(|(_, uuid)| uuid.clone())
                .collect();
            stale.append(&mut state.stale);
            if !stale.is_empty() {
                notifications.push_back(Ok(SyncNotification::IdSet { entry_uuids: stale }));
            }
        }

        if state.fail_next_sync {
            state.fail_next_sync = false;
            notifications.truncate(1);
            notifications.push_back(Err(ConnectorError::sync_failed(
                &request.filter,
                "connection reset",
            )));
        } else {
            notifications.push_back(Ok(SyncNotification::Done {
                cookie: Some(state.clock.to_string().into_bytes()),
            }));
        }

        Ok(Box::new(InMemorySession {
            notifications,
            closed: Arc::clone(&self.closed_sessions),
        }))
    }
}

struct InMemorySession {
    notifications: VecDeque<ConnectorResult<SyncNotification>>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl SyncSession for InMemorySession {
    async fn next(&mut self) -> ConnectorResult<Option<SyncNotification>> {
        self.notifications.pop_front().transpose()
    }

    async fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn person(uid: &str, cn: &str) -> RawEntry {
    RawEntry::new(format!("uid={uid},ou=people,{BASE_DN}"))
        .with(RawAttribute::text(
            "objectClass",
            ["top", "person", "inetOrgPerson"],
        ))
        .with(RawAttribute::text("uid", [uid]))
        .with(RawAttribute::text("cn", [cn]))
        .with(RawAttribute::text("sn", [cn.rsplit(' ').next().unwrap_or(cn)]))
}

/// A group entry; without members it has no member attribute, as the
/// store never keeps an attribute without values.
pub fn group(cn: &str, members: &[&str]) -> RawEntry {
    let entry = RawEntry::new(format!("cn={cn},ou=groups,{BASE_DN}"))
        .with(RawAttribute::text("objectClass", ["top", "groupOfNames"]))
        .with(RawAttribute::text("cn", [cn]));
    if members.is_empty() {
        entry
    } else {
        entry.with(RawAttribute::text("member", members.iter().copied()))
    }
}

pub fn person_dn(uid: &str) -> String {
    format!("uid={uid},ou=people,{BASE_DN}")
}

pub fn group_dn(cn: &str) -> String {
    format!("cn={cn},ou=groups,{BASE_DN}")
}

/// A connector over an in-memory directory.
pub fn connector(config: LdapConfig) -> (LdapConnector, Arc<InMemoryDirectory>) {
    init_test_logging();
    let directory = InMemoryDirectory::new();
    let connector =
        LdapConnector::with_capabilities(config, directory.clone(), directory.clone())
            .expect("valid configuration");
    (connector, directory)
}

pub fn config() -> LdapConfig {
    LdapConfig::new("ldap.test", BASE_DN)
}
