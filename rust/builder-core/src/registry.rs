// rust/builder-core/src/registry.rs

//! Builder lookup and shared derived values.
//!
//! [`Registry`] is the context object handed to every pipeline stage. It holds
//! two independent maps:
//!
//! - [`BuilderRegistry`]: builder name to factory. Names are unique; a second
//!   registration under the same name is rejected.
//! - [`SharedState`]: string keys to [`RegistryValue`]s, used to pass derived
//!   sizes from dataset loading to model construction. Last write wins.
//!
//! Both maps use interior locking, so a `Registry` can be shared behind an
//! `Arc`. Locks are released before builder factories run.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::builder::{self, DatasetBuilder};
use crate::error::{BuilderError, Result};

/// Well-known shared state keys.
pub mod keys {
    /// Number of comma-joined image feature sources of the train split.
    pub const NUM_IMAGE_FEATURES: &str = "num_image_features";

    pub fn text_vocab_size(dataset_name: &str) -> String {
        format!("{dataset_name}_text_vocab_size")
    }

    pub fn num_final_outputs(dataset_name: &str) -> String {
        format!("{dataset_name}_num_final_outputs")
    }
}

/// Creates a fresh builder instance.
pub type BuilderFactory = Arc<dyn Fn() -> Box<dyn DatasetBuilder> + Send + Sync>;

#[derive(Default)]
pub struct BuilderRegistry {
    factories: RwLock<HashMap<String, BuilderFactory>>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateBuilder` if `name` is already taken; the existing
    /// registration is left in place.
    pub fn register<F>(&self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn DatasetBuilder> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut factories = self.factories.write();
        if factories.contains_key(&name) {
            return Err(BuilderError::duplicate_builder(name));
        }
        tracing::debug!("Registered dataset builder '{}'", name);
        factories.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Instantiates the builder registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<Box<dyn DatasetBuilder>> {
        let factory = self
            .factories
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BuilderError::not_found(name))?;
        Ok(factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderRegistry")
            .field("names", &self.names())
            .finish()
    }
}

/// A value published into [`SharedState`].
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl RegistryValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RegistryValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Non-negative integers as `usize`.
    pub fn as_usize(&self) -> Option<usize> {
        self.as_i64().and_then(|v| usize::try_from(v).ok())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RegistryValue::Float(v) => Some(*v),
            RegistryValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RegistryValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RegistryValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for RegistryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryValue::Int(v) => write!(f, "{v}"),
            RegistryValue::Float(v) => write!(f, "{v}"),
            RegistryValue::Bool(v) => write!(f, "{v}"),
            RegistryValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<i64> for RegistryValue {
    fn from(v: i64) -> Self {
        RegistryValue::Int(v)
    }
}

impl From<usize> for RegistryValue {
    fn from(v: usize) -> Self {
        RegistryValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for RegistryValue {
    fn from(v: f64) -> Self {
        RegistryValue::Float(v)
    }
}

impl From<bool> for RegistryValue {
    fn from(v: bool) -> Self {
        RegistryValue::Bool(v)
    }
}

impl From<&str> for RegistryValue {
    fn from(v: &str) -> Self {
        RegistryValue::Str(v.to_string())
    }
}

impl From<String> for RegistryValue {
    fn from(v: String) -> Self {
        RegistryValue::Str(v)
    }
}

/// Derived values passed between otherwise decoupled stages.
#[derive(Debug, Default)]
pub struct SharedState {
    values: RwLock<BTreeMap<String, RegistryValue>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `value` under `key`, replacing any previous value.
    pub fn register(&self, key: impl Into<String>, value: impl Into<RegistryValue>) {
        let key = key.into();
        let value = value.into();
        tracing::debug!("Registry: {} = {}", key, value);
        self.values.write().insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<RegistryValue> {
        self.values.read().get(key).cloned()
    }

    pub fn get_or(&self, key: &str, default: impl Into<RegistryValue>) -> RegistryValue {
        self.get(key).unwrap_or_else(|| default.into())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    pub fn unregister(&self, key: &str) -> Option<RegistryValue> {
        self.values.write().remove(key)
    }

    /// All entries, sorted by key.
    pub fn snapshot(&self) -> Vec<(String, RegistryValue)> {
        self.values
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Context passed to every builder call.
#[derive(Debug, Default)]
pub struct Registry {
    builders: BuilderRegistry,
    state: SharedState,
}

impl Registry {
    /// An empty registry with no builders.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in builder registered.
    pub fn with_builtin_builders() -> Result<Self> {
        let registry = Self::new();
        builder::register_builtin_builders(&registry.builders)?;
        Ok(registry)
    }

    pub fn builders(&self) -> &BuilderRegistry {
        &self.builders
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Vqa2Builder;

    #[test]
    fn test_register_and_get_builder() {
        let builders = BuilderRegistry::new();
        builders
            .register("vqa2", || Box::new(Vqa2Builder::new()) as Box<dyn DatasetBuilder>)
            .unwrap();

        let builder = builders.get("vqa2").unwrap();
        assert_eq!(builder.dataset_name(), "vqa2");
        assert!(builders.contains("vqa2"));
        assert_eq!(builders.len(), 1);
    }

    #[test]
    fn test_get_unregistered_builder() {
        let builders = BuilderRegistry::new();
        let err = builders.get("clevr").err().unwrap();
        assert!(matches!(err, BuilderError::NotFound { ref name } if name == "clevr"));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let builders = BuilderRegistry::new();
        builders
            .register("vqa2", || Box::new(Vqa2Builder::new()) as Box<dyn DatasetBuilder>)
            .unwrap();

        let err = builders
            .register("vqa2", || Box::new(Vqa2Builder::train_val()) as Box<dyn DatasetBuilder>)
            .unwrap_err();
        assert!(matches!(err, BuilderError::DuplicateBuilder { .. }));

        // The first registration survives.
        assert_eq!(
            builders.get("vqa2").unwrap().config_path(),
            Vqa2Builder::new().config_path()
        );
    }

    #[test]
    fn test_each_get_returns_fresh_builder() {
        let builders = BuilderRegistry::new();
        builders
            .register("vqa2", || Box::new(Vqa2Builder::new()) as Box<dyn DatasetBuilder>)
            .unwrap();

        let a = builders.get("vqa2").unwrap();
        let b = builders.get("vqa2").unwrap();
        assert!(a.dataset().is_none());
        assert!(b.dataset().is_none());
    }

    #[test]
    fn test_builtin_builders() {
        let registry = Registry::with_builtin_builders().unwrap();
        assert_eq!(registry.builders().names(), vec!["vqa2", "vqa2_train_val"]);
        assert!(registry.state().snapshot().is_empty());
    }

    #[test]
    fn test_shared_state_last_write_wins() {
        let state = SharedState::new();
        state.register("num_image_features", 1usize);
        state.register("num_image_features", 2usize);

        assert_eq!(state.get("num_image_features"), Some(RegistryValue::Int(2)));
        assert_eq!(state.get("missing"), None);
        assert_eq!(state.get_or("missing", 5i64).as_i64(), Some(5));
    }

    #[test]
    fn test_shared_state_unregister_and_snapshot() {
        let state = SharedState::new();
        state.register("b", "two");
        state.register("a", true);
        state.register("c", 0.5);

        let keys: Vec<String> = state.snapshot().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);

        assert_eq!(state.unregister("b").unwrap().as_str(), Some("two"));
        assert!(!state.contains("b"));
        assert!(state.unregister("b").is_none());
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(RegistryValue::from(3usize).as_usize(), Some(3));
        assert_eq!(RegistryValue::from(-1i64).as_usize(), None);
        assert_eq!(RegistryValue::from(2i64).as_f64(), Some(2.0));
        assert_eq!(RegistryValue::from(false).as_bool(), Some(false));
        assert_eq!(RegistryValue::from("x").as_i64(), None);
        assert_eq!(RegistryValue::from(1.5).to_string(), "1.5");
    }

    #[test]
    fn test_key_helpers() {
        assert_eq!(keys::text_vocab_size("vqa2"), "vqa2_text_vocab_size");
        assert_eq!(keys::num_final_outputs("vqa2_train_val"), "vqa2_train_val_num_final_outputs");
    }
}
