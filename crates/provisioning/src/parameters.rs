//! Shared parameter context passed through phase hooks and actions

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Key under which a phase stores its own id
pub const PARM_PHASE_ID: &str = "phaseId";
/// Key under which the provisioning context is stored
pub const PARM_CONTEXT: &str = "context";
/// Key under which the current operand is stored
pub const PARM_OPERAND: &str = "operand";
/// Key under which the unit an operand acts on is stored
pub const PARM_UNIT: &str = "iu";
/// Key of the shared artifact request list filled during `collect`
pub const PARM_ARTIFACT_REQUESTS: &str = "artifactRequests";

type Value = Arc<dyn Any + Send + Sync>;

/// String-keyed map of shared values.
///
/// Values are reference counted, so cloning a `Parameters` is shallow:
/// the phase parameters are cloned into every operand's context and a
/// value with interior mutability stays shared between them.
#[derive(Clone, Default)]
pub struct Parameters {
    values: HashMap<String, Value>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value under `key`
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Arc::new(value));
    }

    /// Insert an already shared value without re-wrapping it
    pub fn insert_shared<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: Arc<T>) {
        self.values.insert(key.into(), value);
    }

    /// Typed lookup; `None` if absent or of another type
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref::<T>()
    }

    /// Typed lookup returning the shared handle
    pub fn get_shared<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.values.get(key)?.clone().downcast::<T>().ok()
    }

    /// Lookup of a string value
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get::<String>(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys in sorted order
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameters")
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_typed_get() {
        let mut params = Parameters::new();
        params.insert("name", "hello".to_string());
        params.insert("count", 3_u32);

        assert_eq!(params.get_str("name"), Some("hello"));
        assert_eq!(params.get::<u32>("count"), Some(&3));
        assert_eq!(params.get::<String>("count"), None);
        assert_eq!(params.get_str("missing"), None);
    }

    #[test]
    fn test_clone_is_shallow_for_shared_values() {
        let mut phase = Parameters::new();
        phase.insert("list", Mutex::new(Vec::<String>::new()));

        let operand = phase.clone();
        operand
            .get::<Mutex<Vec<String>>>("list")
            .unwrap()
            .lock()
            .unwrap()
            .push("a".into());

        let seen = phase.get::<Mutex<Vec<String>>>("list").unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_clone_isolates_keys() {
        let phase = Parameters::new();
        let mut operand = phase.clone();
        operand.insert("only.here", true);

        assert!(operand.contains_key("only.here"));
        assert!(!phase.contains_key("only.here"));
    }
}
