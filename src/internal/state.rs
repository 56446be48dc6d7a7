//! Key-path addressable application state with change notification.
//!
//! The store holds one rooted JSON tree. Paths are dot separated
//! (`snapshots.current_project`); the empty path addresses the root.
//! Subscribers registered on a path are invoked after every write to that
//! path or to any of its descendants.
//!
//! Notification is synchronous and reentrant: a callback may call
//! [`KeyPathStore::set`] again, which notifies recursively. There is no cycle
//! detection, so two subscribers that write each other's paths unconditionally
//! will recurse until the stack overflows.

use serde_json::{Map, Value, json};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Well-known key paths shared by the index and the UI.
pub mod paths {
    pub const THEME: &str = "theme";
    pub const PRIMARY_COLOR: &str = "theme.primary_color";
    pub const BACKGROUND_COLOR: &str = "theme.background_color";
    pub const TEXT_COLOR: &str = "theme.text_color";

    pub const ALL_PROJECTS: &str = "snapshots.all_projects";
    pub const ALL_DATES: &str = "snapshots.all_dates";
    pub const CURRENT_PROJECT: &str = "snapshots.current_project";
    pub const CURRENT_PROJECT_DATES: &str = "snapshots.current_project_dates";
    pub const CURRENT_DATE: &str = "snapshots.current_date";
    pub const CURRENT_SNAPSHOT: &str = "snapshots.current_snapshot";
}

/// Handle returned by [`KeyPathStore::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Rc<dyn Fn(Option<&Value>)>;

pub struct KeyPathStore {
    state: RefCell<Value>,
    subscribers: RefCell<HashMap<String, Vec<(SubscriptionId, Callback)>>>,
    next_id: Cell<u64>,
}

impl KeyPathStore {
    /// Create a store seeded with the default theme and an empty selection.
    pub fn new() -> Self {
        Self::with_state(default_state())
    }

    pub fn with_state(state: Value) -> Self {
        Self {
            state: RefCell::new(state),
            subscribers: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
        }
    }

    /// Clone of the whole tree.
    pub fn snapshot(&self) -> Value {
        self.state.borrow().clone()
    }

    /// Resolve `path` by sequential field lookup.
    ///
    /// Returns `None` as soon as a segment is missing or a non-object value
    /// would have to be indexed further. The empty path yields the whole tree.
    pub fn get(&self, path: &str) -> Option<Value> {
        let state = self.state.borrow();
        if path.is_empty() {
            return Some(state.clone());
        }
        let mut current = &*state;
        for segment in path.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current.clone())
    }

    /// String value at `path`; `None` when absent, null or not a string.
    pub fn get_str(&self, path: &str) -> Option<String> {
        match self.get(path)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// String items of the array at `path`, skipping non-string items.
    pub fn get_string_list(&self, path: &str) -> Vec<String> {
        match self.get(path) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Assign `value` at `path`, creating intermediate objects as needed,
    /// then notify `path` and each of its ancestors.
    pub fn set(&self, path: &str, value: impl Into<Value>) {
        self.write(path, value.into());
        self.notify(path);
    }

    /// Assign several top-level paths at once.
    ///
    /// All entries are written before any notification. Each entry then
    /// notifies like [`set`](Self::set), and when its value is an object every
    /// nested key path inside it is notified as well (depth first, in key
    /// order), so writing `{"theme": {"primary_color": ..}}` reaches both
    /// `theme` and `theme.primary_color` subscribers.
    pub fn set_many(&self, entries: Map<String, Value>) {
        for (path, value) in &entries {
            self.write(path, value.clone());
        }
        for (path, value) in &entries {
            self.notify(path);
            if let Value::Object(nested) = value {
                self.notify_nested(path, nested);
            }
        }
    }

    /// Register `callback` on the exact path string `path`.
    pub fn subscribe<F>(&self, path: &str, callback: F) -> SubscriptionId
    where
        F: Fn(Option<&Value>) + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers
            .borrow_mut()
            .entry(path.to_string())
            .or_default()
            .push((id, Rc::new(callback)));
        id
    }

    /// Remove a subscription. Unknown paths or ids are ignored.
    pub fn unsubscribe(&self, path: &str, id: SubscriptionId) {
        let mut subscribers = self.subscribers.borrow_mut();
        if let Some(list) = subscribers.get_mut(path) {
            list.retain(|(existing, _)| *existing != id);
            if list.is_empty() {
                subscribers.remove(path);
            }
        }
    }

    pub fn subscriber_count(&self, path: &str) -> usize {
        self.subscribers.borrow().get(path).map_or(0, Vec::len)
    }

    fn write(&self, path: &str, value: Value) {
        let mut state = self.state.borrow_mut();
        if path.is_empty() {
            *state = value;
            return;
        }

        let (parents, leaf) = match path.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, path),
        };

        let mut current: &mut Value = &mut state;
        for segment in parents.into_iter().flat_map(|p| p.split('.')) {
            current = as_object_mut(current, path)
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        as_object_mut(current, path).insert(leaf.to_string(), value);
    }

    fn notify(&self, path: &str) {
        self.notify_exact(path);

        let mut current = path;
        while !current.is_empty() {
            current = current.rsplit_once('.').map_or("", |(parent, _)| parent);
            self.notify_exact(current);
        }
    }

    fn notify_nested(&self, parent: &str, map: &Map<String, Value>) {
        for (key, value) in map {
            let nested = format!("{parent}.{key}");
            self.notify(&nested);
            if let Value::Object(inner) = value {
                self.notify_nested(&nested, inner);
            }
        }
    }

    fn notify_exact(&self, path: &str) {
        // Copy the list so callbacks may (un)subscribe while we iterate.
        let callbacks: Vec<Callback> = match self.subscribers.borrow().get(path) {
            Some(list) => list.iter().map(|(_, cb)| Rc::clone(cb)).collect(),
            None => return,
        };
        for callback in callbacks {
            let value = self.get(path);
            callback(value.as_ref());
        }
    }
}

impl Default for KeyPathStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyPathStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscriptions: usize = self.subscribers.borrow().values().map(Vec::len).sum();
        f.debug_struct("KeyPathStore")
            .field("state", &self.state.borrow())
            .field("subscriptions", &subscriptions)
            .finish()
    }
}

/// Upsert helper: a scalar or array found along a write path is replaced by
/// an empty object.
fn as_object_mut<'a>(value: &'a mut Value, path: &str) -> &'a mut Map<String, Value> {
    if !value.is_object() {
        if !value.is_null() {
            tracing::warn!(path, replaced = %value, "Overwriting non-object value on key path");
        }
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

pub fn default_state() -> Value {
    json!({
        "theme": {
            "primary_color": "#007bff",
            "background_color": "#ffffff",
            "text_color": "#000000"
        },
        "snapshots": {
            "all_projects": [],
            "all_dates": [],
            "current_project": null,
            "current_project_dates": [],
            "current_date": null,
            "current_snapshot": null
        }
    })
}
