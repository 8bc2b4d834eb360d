//! Integration tests for namespaces: binding, promotion and construction.
//!
//! Tests touching the process environment hold `ENV_LOCK` so they never
//! observe each other's variables.

use config_chain::backend::{EnvSource, JsonFileSource, MemorySource};
use config_chain::{
    AttributeState, Backend, BackendOptions, ConfigItem, ErrorCode, ItemSpec, Location, Member,
    Module, Namespace, NamespaceBuilder, Registry, Scope,
};
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::TempDir;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Sets an environment variable for the lifetime of the guard.
struct EnvVar {
    key: &'static str,
    _lock: MutexGuard<'static, ()>,
}

impl EnvVar {
    fn lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn unset(key: &'static str) -> Self {
        let lock = Self::lock();
        // SAFETY: ENV_LOCK serializes every environment access in this test binary.
        unsafe { std::env::remove_var(key) };
        Self { key, _lock: lock }
    }

    fn set(&self, value: &str) {
        // SAFETY: the guard holds ENV_LOCK.
        unsafe { std::env::set_var(self.key, value) };
    }
}

impl Drop for EnvVar {
    fn drop(&mut self) {
        // SAFETY: the guard still holds ENV_LOCK.
        unsafe { std::env::remove_var(self.key) };
    }
}

fn memory_chain(source: &Arc<MemorySource>) -> Vec<Backend> {
    vec![Backend::new(source.clone(), BackendOptions::writable()).expect("Failed to declare backend")]
}

/// The TOKEN namespace: env, then config.json in the code root, then in the working dir.
fn token_namespace(code_root: &Path, working_dir: &Path) -> Namespace {
    let chain = vec![
        Backend::of(EnvSource::new()).unwrap(),
        Backend::of(JsonFileSource::new("config.json", Location::CodeRoot)).unwrap(),
        Backend::of(JsonFileSource::new("config.json", Location::WorkingDir)).unwrap(),
    ];
    let spec = ItemSpec::from_value(json!({
        "type": "string",
        "empty": false,
        "default": "Asdf"
    }))
    .unwrap();

    let module = Registry::global().construct(
        NamespaceBuilder::new("app.configuration")
            .code_root(code_root)
            .working_dir(working_dir)
            .backends(chain)
            .item("TOKEN", ConfigItem::new(spec)),
    );
    module.into_configuration().expect("Expected a configuration namespace")
}

mod scenario_tests {
    use super::*;

    #[test]
    fn token_falls_back_to_default() {
        let _env = EnvVar::unset("TOKEN");
        let code_root = TempDir::new().unwrap();
        let working_dir = TempDir::new().unwrap();

        let mut ns = token_namespace(code_root.path(), working_dir.path());
        assert_eq!(ns.get("TOKEN").unwrap(), json!("Asdf"));
    }

    #[test]
    fn token_from_environment() {
        let env = EnvVar::unset("TOKEN");
        let code_root = TempDir::new().unwrap();
        let working_dir = TempDir::new().unwrap();
        env.set("9");

        let mut ns = token_namespace(code_root.path(), working_dir.path());
        assert_eq!(ns.get("TOKEN").unwrap(), json!("9"));
    }

    #[test]
    fn token_from_working_dir_file() {
        let _env = EnvVar::unset("TOKEN");
        let code_root = TempDir::new().unwrap();
        let working_dir = TempDir::new().unwrap();
        std::fs::write(working_dir.path().join("config.json"), r#"{"token": "7"}"#).unwrap();

        let mut ns = token_namespace(code_root.path(), working_dir.path());
        assert_eq!(ns.get("TOKEN").unwrap(), json!("7"));
    }

    #[test]
    fn working_dir_file_beats_environment_and_code_root() {
        let env = EnvVar::unset("TOKEN");
        let code_root = TempDir::new().unwrap();
        let working_dir = TempDir::new().unwrap();
        env.set("9");
        std::fs::write(code_root.path().join("config.json"), r#"{"token": "5"}"#).unwrap();
        std::fs::write(working_dir.path().join("config.json"), r#"{"token": "7"}"#).unwrap();

        let mut ns = token_namespace(code_root.path(), working_dir.path());
        assert_eq!(ns.get("TOKEN").unwrap(), json!("7"));

        std::fs::remove_file(working_dir.path().join("config.json")).unwrap();
        assert_eq!(ns.get("TOKEN").unwrap(), json!("5"));
    }

    #[test]
    fn environment_is_read_on_every_access() {
        let env = EnvVar::unset("TOKEN");
        let code_root = TempDir::new().unwrap();
        let working_dir = TempDir::new().unwrap();

        let mut ns = token_namespace(code_root.path(), working_dir.path());
        assert_eq!(ns.get("TOKEN").unwrap(), json!("Asdf"));
        env.set("9");
        assert_eq!(ns.get("TOKEN").unwrap(), json!("9"));
    }

    #[test]
    fn empty_environment_value_fails_validation() {
        let env = EnvVar::unset("TOKEN");
        let code_root = TempDir::new().unwrap();
        let working_dir = TempDir::new().unwrap();
        env.set("");

        let mut ns = token_namespace(code_root.path(), working_dir.path());
        assert_eq!(ns.get("TOKEN").unwrap_err().code(), ErrorCode::Invalid);
    }
}

mod binding_tests {
    use super::*;

    #[test]
    fn item_learns_its_member_name() {
        let source = Arc::new(MemorySource::new().with_value("HOST", json!("localhost")));
        let mut ns = Namespace::builder("app.configuration")
            .backends(memory_chain(&source))
            .item("HOST", ConfigItem::new(ItemSpec::string()))
            .build();

        assert_eq!(ns.item("HOST").unwrap().name(), None);
        assert_eq!(ns.get("HOST").unwrap(), json!("localhost"));
        assert_eq!(ns.item("HOST").unwrap().name(), Some("HOST"));
        assert_eq!(ns.item("HOST").unwrap().backends()[0].owner(), Some("HOST"));
    }

    #[test]
    fn name_given_twice_is_idempotent() {
        let mut item = ConfigItem::named("HOST", ItemSpec::default());
        item.assign_name("HOST").unwrap();
        assert_eq!(item.name(), Some("HOST"));
    }

    #[test]
    fn different_name_is_a_conflict() {
        let mut item = ConfigItem::new(ItemSpec::default());
        item.assign_name("HOST").unwrap();
        let err = item.assign_name("PORT").unwrap_err();
        assert_eq!(err.code(), ErrorCode::NameConflict);
        assert_eq!(item.name(), Some("HOST"));
    }

    #[test]
    fn item_declared_under_another_name_conflicts() {
        let source = Arc::new(MemorySource::new().with_value("PORT", json!(1)));
        let mut ns = Namespace::builder("app.configuration")
            .backends(memory_chain(&source))
            .item("PORT", ConfigItem::named("HOST", ItemSpec::default()))
            .build();

        assert_eq!(ns.get("PORT").unwrap_err().code(), ErrorCode::NameConflict);
        assert_eq!(ns.state("PORT"), Some(AttributeState::Unbound));
    }

    #[test]
    fn failed_binding_never_falls_back_to_default_chain() {
        let explicit = Arc::new(MemorySource::new().with_value("X", json!("explicit")));
        let mut claimed = Backend::new(explicit, BackendOptions::default()).unwrap();
        claimed
            .bind("OTHER", Arc::new(Scope::new("other.configuration")))
            .unwrap();
        let defaults = Arc::new(MemorySource::new().with_value("X", json!("default")));

        let mut ns = Namespace::builder("app.configuration")
            .backends(memory_chain(&defaults))
            .item("X", ConfigItem::new(ItemSpec::default()).with_backends(vec![claimed]))
            .build();

        for _ in 0..2 {
            assert_eq!(ns.get("X").unwrap_err().code(), ErrorCode::NameConflict);
        }
        assert_eq!(ns.state("X"), Some(AttributeState::Unbound));
        assert_eq!(ns.item("X").unwrap().backends()[0].owner(), Some("OTHER"));
        assert_eq!(defaults.read_count(), 0);
    }

    #[test]
    fn item_outside_namespace_is_not_found() {
        let source = Arc::new(MemorySource::new());
        let mut ns = Namespace::builder("app.configuration")
            .backends(memory_chain(&source))
            .item("HOST", ConfigItem::new(ItemSpec::default()))
            .build();

        let stray = ConfigItem::new(ItemSpec::default().with_default("x"));
        let err = ns.get_item(stray.id()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BindingNotFound);
        assert_eq!(ns.binding_count(), 0);
    }

    #[test]
    fn item_resolves_by_identity() {
        let source = Arc::new(MemorySource::new().with_value("HOST", json!("db")));
        let host = ConfigItem::new(ItemSpec::default());
        let id = host.id();
        let mut ns = Namespace::builder("app.configuration")
            .backends(memory_chain(&source))
            .item("HOST", host)
            .build();

        assert_eq!(ns.get_item(id).unwrap(), json!("db"));
        assert_eq!(ns.get_item(id).unwrap(), json!("db"));
        assert_eq!(ns.binding_count(), 1);
    }

    #[test]
    fn item_without_any_chain_fails() {
        let mut ns = Namespace::builder("app.configuration")
            .item("HOST", ConfigItem::new(ItemSpec::default()))
            .build();
        assert_eq!(ns.get("HOST").unwrap_err().code(), ErrorCode::NoBackends);
    }
}

mod promotion_tests {
    use super::*;

    #[test]
    fn second_access_skips_binding() {
        let source = Arc::new(MemorySource::new().with_value("X", json!(1)));
        let mut ns = Namespace::builder("app.configuration")
            .backends(memory_chain(&source))
            .item("X", ConfigItem::new(ItemSpec::default()))
            .build();

        assert_eq!(ns.get("X").unwrap(), json!(1));
        assert_eq!(ns.state("X"), Some(AttributeState::Promoted));
        assert_eq!(ns.binding_count(), 1);

        assert_eq!(ns.get("X").unwrap(), json!(1));
        assert_eq!(ns.binding_count(), 1);
    }

    #[test]
    fn promotion_caches_path_not_value() {
        let source = Arc::new(MemorySource::new().with_value("X", json!(1)));
        let mut ns = Namespace::builder("app.configuration")
            .backends(memory_chain(&source))
            .item("X", ConfigItem::new(ItemSpec::default()))
            .build();

        assert_eq!(ns.get("X").unwrap(), json!(1));
        source.insert("X", json!(2));
        assert_eq!(ns.get("X").unwrap(), json!(2));
        assert_eq!(source.read_count(), 2);
    }

    #[test]
    fn promoted_item_accepts_writes() {
        let source = Arc::new(MemorySource::new().with_value("X", json!(1)));
        let mut ns = Namespace::builder("app.configuration")
            .backends(memory_chain(&source))
            .item("X", ConfigItem::new(ItemSpec::default()))
            .build();

        ns.get("X").unwrap();
        ns.set("X", json!(5)).unwrap();
        assert_eq!(ns.get("X").unwrap(), json!(5));
        assert_eq!(ns.binding_count(), 1);
    }

    #[test]
    fn items_share_sources_but_not_caches() {
        let source = Arc::new(
            MemorySource::new()
                .with_value("A", json!("a"))
                .with_value("B", json!("b")),
        );
        let chain = vec![Backend::new(source.clone(), BackendOptions::cached()).unwrap()];
        let mut ns = Namespace::builder("app.configuration")
            .backends(chain)
            .item("A", ConfigItem::new(ItemSpec::default()))
            .item("B", ConfigItem::new(ItemSpec::default()))
            .build();

        assert_eq!(ns.get("A").unwrap(), json!("a"));
        assert_eq!(ns.get("B").unwrap(), json!("b"));
        assert_eq!(ns.get("A").unwrap(), json!("a"));
        assert_eq!(source.read_count(), 2);
    }
}

mod registry_tests {
    use super::*;

    #[test]
    fn matching_name_gets_configuration_semantics() {
        let module = Registry::global().construct(
            NamespaceBuilder::new("app.configuration")
                .item("X", ConfigItem::new(ItemSpec::default().with_default(3))),
        );
        assert!(module.is_configuration());
        assert_eq!(module.name(), "app.configuration");
    }

    #[test]
    fn other_names_are_constructed_plain() {
        let mut module = Registry::global().construct(
            NamespaceBuilder::new("app.settings")
                .value("VERSION", "1")
                .item("X", ConfigItem::new(ItemSpec::default().with_default(3))),
        );
        assert!(module.as_configuration_mut().is_none());

        let Module::Plain(plain) = module else {
            panic!("expected a plain module");
        };
        assert!(matches!(plain.get("VERSION"), Some(Member::Value(v)) if v == &json!("1")));
        assert!(matches!(plain.get("X"), Some(Member::Item(item)) if item.name().is_none()));
    }
}
