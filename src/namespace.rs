//! Configuration namespaces and item promotion.
//!
//! A namespace holds members: plain values, configuration items and the
//! `BACKENDS` default chain. Each item moves through three states:
//!
//! - **Unbound**: declared, name unknown to the item.
//! - **Bound**: the binding routine ran; every access still goes through the
//!   instance member table.
//! - **Promoted**: after the first successful read the item is moved into the
//!   namespace's promoted table, so later accesses skip binding entirely.
//!
//! Promotion caches the lookup path, not the value. Values are only cached by
//! non-volatile backends.

use crate::backend::{Backend, Scope};
use crate::binding;
use crate::error::{ConfigError, Result};
use crate::item::{BindContext, ConfigItem, ItemId, Precedence};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Member name of a namespace's default backend chain.
pub const BACKENDS: &str = "BACKENDS";

/// A namespace member.
#[derive(Debug)]
pub enum Member {
    Value(Value),
    Item(ConfigItem),
    Backends(Vec<Backend>),
}

impl From<ConfigItem> for Member {
    fn from(item: ConfigItem) -> Self {
        Member::Item(item)
    }
}

impl From<Value> for Member {
    fn from(value: Value) -> Self {
        Member::Value(value)
    }
}

impl From<Vec<Backend>> for Member {
    fn from(backends: Vec<Backend>) -> Self {
        Member::Backends(backends)
    }
}

/// Lifecycle state of an item within its namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeState {
    Unbound,
    Bound,
    Promoted,
}

/// Declarations collected before a namespace is constructed.
#[derive(Debug)]
pub struct NamespaceBuilder {
    name: String,
    code_root: Option<PathBuf>,
    working_dir: Option<PathBuf>,
    precedence: Precedence,
    members: Vec<(String, Member)>,
}

impl NamespaceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code_root: None,
            working_dir: None,
            precedence: Precedence::default(),
            members: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.code_root = Some(dir.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Policy for items that do not choose one.
    pub fn precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }

    /// Default chain for items declared without backends.
    pub fn backends(self, backends: Vec<Backend>) -> Self {
        self.member(BACKENDS, Member::Backends(backends))
    }

    pub fn item(self, name: impl Into<String>, item: ConfigItem) -> Self {
        self.member(name, Member::Item(item))
    }

    pub fn value(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.member(name, Member::Value(value.into()))
    }

    /// Declare a member. Later declarations of the same name replace earlier ones.
    pub fn member(mut self, name: impl Into<String>, member: impl Into<Member>) -> Self {
        self.members.push((name.into(), member.into()));
        self
    }

    /// Build a configuration namespace.
    pub fn build(self) -> Namespace {
        let scope = Scope {
            namespace: self.name.clone(),
            code_root: self.code_root,
            working_dir: self.working_dir,
        };
        Namespace {
            name: self.name,
            scope: Arc::new(scope),
            precedence: self.precedence,
            members: self.members.into_iter().collect(),
            promoted: BTreeMap::new(),
            bindings: 0,
        }
    }

    pub(crate) fn into_members(self) -> (String, BTreeMap<String, Member>) {
        (self.name, self.members.into_iter().collect())
    }
}

/// A configuration namespace.
///
/// Reads take `&mut self` because they may fill backend caches and promote
/// items. Share a namespace across threads behind a `Mutex`.
#[derive(Debug)]
pub struct Namespace {
    name: String,
    scope: Arc<Scope>,
    precedence: Precedence,
    /// Instance storage.
    members: BTreeMap<String, Member>,
    /// Items promoted after their first successful read.
    promoted: BTreeMap<String, ConfigItem>,
    bindings: usize,
}

impl Namespace {
    pub fn builder(name: impl Into<String>) -> NamespaceBuilder {
        NamespaceBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Number of times the binding routine ran.
    pub fn binding_count(&self) -> usize {
        self.bindings
    }

    /// The `BACKENDS` default chain, if declared.
    pub fn default_backends(&self) -> Option<&[Backend]> {
        match self.members.get(BACKENDS) {
            Some(Member::Backends(chain)) => Some(chain),
            _ => None,
        }
    }

    /// Replace the default chain. Items bound earlier keep the chain they adopted.
    pub fn set_backends(&mut self, backends: Vec<Backend>) {
        self.members
            .insert(BACKENDS.to_string(), Member::Backends(backends));
    }

    /// Declare a member after construction.
    pub fn declare(&mut self, name: impl Into<String>, member: impl Into<Member>) -> Result<()> {
        let name = name.into();
        if self.promoted.contains_key(&name) {
            return Err(ConfigError::not_resolvable(&name, "already promoted"));
        }
        self.members.insert(name, member.into());
        Ok(())
    }

    /// State of the item named `name`; `None` when `name` is not an item.
    pub fn state(&self, name: &str) -> Option<AttributeState> {
        if self.promoted.contains_key(name) {
            return Some(AttributeState::Promoted);
        }
        match self.members.get(name) {
            Some(Member::Item(item)) if item.is_bound() => Some(AttributeState::Bound),
            Some(Member::Item(_)) => Some(AttributeState::Unbound),
            _ => None,
        }
    }

    /// The item named `name`, promoted or not.
    pub fn item(&self, name: &str) -> Option<&ConfigItem> {
        if let Some(item) = self.promoted.get(name) {
            return Some(item);
        }
        match self.members.get(name) {
            Some(Member::Item(item)) => Some(item),
            _ => None,
        }
    }

    /// Names of all items, promoted or not.
    pub fn item_names(&self) -> Vec<String> {
        let instance = self.members.iter().filter_map(|(name, member)| match member {
            Member::Item(_) => Some(name.clone()),
            _ => None,
        });
        let mut names: Vec<String> = self.promoted.keys().cloned().chain(instance).collect();
        names.sort();
        names
    }

    /// Read member `name`, resolving it if it is a configuration item.
    pub fn get(&mut self, name: &str) -> Result<Value> {
        if let Some(item) = self.promoted.get_mut(name) {
            return item.get();
        }
        match self.members.get(name) {
            None => Err(ConfigError::no_such_member(&self.name, name)),
            Some(Member::Value(value)) => Ok(value.clone()),
            Some(Member::Backends(_)) => Err(ConfigError::not_resolvable(
                name,
                "a backend chain has no value",
            )),
            Some(Member::Item(_)) => self.resolve_member(name),
        }
    }

    /// Resolve an item by identity rather than by name.
    pub fn get_item(&mut self, id: ItemId) -> Result<Value> {
        if let Some(item) = self.promoted.values_mut().find(|item| item.id() == id) {
            return item.get();
        }
        let name = binding::locate(&self.name, &self.members, id)?;
        self.resolve_member(&name)
    }

    /// Assign member `name`.
    ///
    /// Items write through to their writable backends. Anything else is
    /// stored as a plain value.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        if let Some(item) = self.promoted.get_mut(name) {
            return item.set(value);
        }
        match self.members.get(name) {
            Some(Member::Item(_)) => {
                self.bind(name)?;
                self.instance_item(name)?.set(value)
            }
            Some(Member::Backends(_)) => Err(ConfigError::not_resolvable(
                name,
                "use set_backends to replace the default chain",
            )),
            Some(Member::Value(_)) | None => {
                self.members.insert(name.to_string(), Member::Value(value));
                Ok(())
            }
        }
    }

    /// Bind the item named `name` if it is not bound yet.
    pub fn bind(&mut self, name: &str) -> Result<()> {
        if self.promoted.contains_key(name) {
            return Ok(());
        }
        let id = match self.members.get(name) {
            Some(Member::Item(item)) if item.is_bound() => return Ok(()),
            Some(Member::Item(item)) => item.id(),
            Some(_) => return Err(ConfigError::not_resolvable(name, "not a configuration item")),
            None => return Err(ConfigError::no_such_member(&self.name, name)),
        };

        let member_name = binding::locate(&self.name, &self.members, id)?;
        self.bindings += 1;

        let defaults = self.default_backends().map(<[Backend]>::to_vec);
        let ctx = BindContext {
            scope: Arc::clone(&self.scope),
            defaults: defaults.as_deref(),
            precedence: self.precedence,
        };
        self.instance_item(&member_name)?.bind(&member_name, &ctx)
    }

    fn resolve_member(&mut self, name: &str) -> Result<Value> {
        self.bind(name)?;
        let value = self.instance_item(name)?.get()?;
        self.promote(name)?;
        Ok(value)
    }

    fn promote(&mut self, name: &str) -> Result<()> {
        self.instance_item(name)?.assign_name(name)?;
        if let Some(Member::Item(item)) = self.members.remove(name) {
            self.promoted.insert(name.to_string(), item);
            debug!(item = %name, namespace = %self.name, "promoted configuration item");
        }
        Ok(())
    }

    fn instance_item(&mut self, name: &str) -> Result<&mut ConfigItem> {
        match self.members.get_mut(name) {
            Some(Member::Item(item)) => Ok(item),
            _ => Err(ConfigError::no_such_member(&self.name, name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendOptions, MemorySource};
    use crate::error::ErrorCode;
    use crate::spec::ItemSpec;
    use serde_json::json;

    fn chain(source: &Arc<MemorySource>) -> Vec<Backend> {
        vec![Backend::new(source.clone(), BackendOptions::writable()).unwrap()]
    }

    #[test]
    fn test_plain_values_are_returned_as_is() {
        let mut ns = Namespace::builder("app.configuration")
            .value("VERSION", "1.2")
            .build();
        assert_eq!(ns.get("VERSION").unwrap(), json!("1.2"));
        assert_eq!(ns.state("VERSION"), None);
    }

    #[test]
    fn test_unknown_member() {
        let mut ns = Namespace::builder("app.configuration").build();
        assert_eq!(ns.get("NOPE").unwrap_err().code(), ErrorCode::NoSuchMember);
    }

    #[test]
    fn test_backends_member_is_not_a_value() {
        let source = Arc::new(MemorySource::new());
        let mut ns = Namespace::builder("app.configuration")
            .backends(chain(&source))
            .build();
        assert_eq!(ns.get(BACKENDS).unwrap_err().code(), ErrorCode::NotResolvable);
        assert!(ns.default_backends().is_some());
    }

    #[test]
    fn test_state_transitions() {
        let source = Arc::new(MemorySource::new().with_value("X", json!(1)));
        let mut ns = Namespace::builder("app.configuration")
            .backends(chain(&source))
            .item("X", ConfigItem::new(ItemSpec::default()))
            .build();

        assert_eq!(ns.state("X"), Some(AttributeState::Unbound));
        ns.bind("X").unwrap();
        assert_eq!(ns.state("X"), Some(AttributeState::Bound));
        assert_eq!(ns.get("X").unwrap(), json!(1));
        assert_eq!(ns.state("X"), Some(AttributeState::Promoted));
        assert_eq!(ns.item("X").unwrap().name(), Some("X"));
    }

    #[test]
    fn test_failed_read_does_not_promote() {
        let source = Arc::new(MemorySource::new());
        let mut ns = Namespace::builder("app.configuration")
            .backends(chain(&source))
            .item("X", ConfigItem::new(ItemSpec::default()))
            .build();

        assert_eq!(ns.get("X").unwrap_err().code(), ErrorCode::Undefined);
        assert_eq!(ns.state("X"), Some(AttributeState::Bound));

        source.insert("X", json!("now"));
        assert_eq!(ns.get("X").unwrap(), json!("now"));
        assert_eq!(ns.state("X"), Some(AttributeState::Promoted));
        assert_eq!(ns.binding_count(), 1);
    }

    #[test]
    fn test_set_on_unbound_item_binds_without_promoting() {
        let source = Arc::new(MemorySource::new());
        let mut ns = Namespace::builder("app.configuration")
            .backends(chain(&source))
            .item("X", ConfigItem::new(ItemSpec::default()))
            .build();

        ns.set("X", json!("v")).unwrap();
        assert_eq!(source.value("X"), Some(json!("v")));
        assert_eq!(ns.state("X"), Some(AttributeState::Bound));
    }

    #[test]
    fn test_set_plain_member() {
        let mut ns = Namespace::builder("app.configuration").build();
        ns.set("DEBUG", json!(true)).unwrap();
        assert_eq!(ns.get("DEBUG").unwrap(), json!(true));
    }

    #[test]
    fn test_declare_after_promotion_is_rejected() {
        let source = Arc::new(MemorySource::new().with_value("X", json!(1)));
        let mut ns = Namespace::builder("app.configuration")
            .backends(chain(&source))
            .item("X", ConfigItem::new(ItemSpec::default()))
            .build();
        ns.get("X").unwrap();

        let err = ns.declare("X", json!(2)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotResolvable);
        ns.declare("Y", json!(2)).unwrap();
        assert_eq!(ns.get("Y").unwrap(), json!(2));
    }

    #[test]
    fn test_item_names_cover_both_tables() {
        let source = Arc::new(MemorySource::new().with_value("A", json!(1)));
        let mut ns = Namespace::builder("app.configuration")
            .backends(chain(&source))
            .item("B", ConfigItem::new(ItemSpec::default()))
            .item("A", ConfigItem::new(ItemSpec::default()))
            .value("C", 3)
            .build();
        ns.get("A").unwrap();
        assert_eq!(ns.item_names(), vec!["A".to_string(), "B".to_string()]);
    }
}
