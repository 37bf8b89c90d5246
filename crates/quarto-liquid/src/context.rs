/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Variable bindings and render-time scopes.
//!
//! [`Bindings`] are supplied by the host and never modified by a render.
//! A [`Scope`] layers a stack of frames on top of them for the duration of
//! one render call: loop iterations and includes push frames, `assign` and
//! `capture` write into them.

use crate::value::{Map, Value};

/// Variable bindings supplied by the host application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    variables: Map,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.variables.iter()
    }

    /// Build bindings from a JSON object, preserving key order.
    ///
    /// Returns `None` if `json` is not an object.
    pub fn from_json(json: serde_json::Value) -> Option<Self> {
        match Value::from(json) {
            Value::Map(variables) => Some(Self { variables }),
            _ => None,
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            variables: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl From<Map> for Bindings {
    fn from(variables: Map) -> Self {
        Self { variables }
    }
}

/// The stack of binding frames visible during one render.
///
/// Frames are searched innermost-first, then the host bindings. The root
/// frame is never popped; it holds top-level assignments.
#[derive(Debug)]
pub struct Scope<'a> {
    globals: &'a Bindings,
    frames: Vec<Map>,
}

impl<'a> Scope<'a> {
    pub fn new(globals: &'a Bindings) -> Self {
        Self {
            globals,
            frames: vec![Map::new()],
        }
    }

    /// Look up a variable, innermost frame first.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .or_else(|| self.globals.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Bind a variable in the innermost frame.
    pub fn set_local(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    /// Bind a variable for `assign`/`capture`.
    ///
    /// Rebinding a name that a pushed frame already holds (e.g. a loop
    /// variable) updates that frame; any other name lands in the root frame
    /// so it stays visible after the enclosing block completes.
    pub fn assign(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        let frame = match self
            .frames
            .iter()
            .rposition(|frame| frame.contains_key(&name))
        {
            Some(idx) => &mut self.frames[idx],
            None => &mut self.frames[0],
        };
        frame.insert(name, value);
    }

    pub fn push_frame(&mut self, frame: Map) {
        self.frames.push(frame);
    }

    /// Pop the innermost frame. The root frame is never popped.
    pub fn pop_frame(&mut self) -> Option<Map> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    /// Number of frames, including the root frame.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Per-iteration metadata of a `for` loop, exposed as `forloop`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopState {
    pub name: String,
    pub index0: usize,
    pub length: usize,
    pub parent: Option<Box<LoopState>>,
}

impl LoopState {
    pub fn new(name: impl Into<String>, length: usize, parent: Option<LoopState>) -> Self {
        Self {
            name: name.into(),
            index0: 0,
            length,
            parent: parent.map(Box::new),
        }
    }

    pub fn is_first(&self) -> bool {
        self.index0 == 0
    }

    pub fn is_last(&self) -> bool {
        self.index0 + 1 == self.length
    }

    /// The `forloop` object seen by the template.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::from(self.name.as_str()));
        map.insert("first".to_string(), Value::Bool(self.is_first()));
        map.insert("last".to_string(), Value::Bool(self.is_last()));
        map.insert("index".to_string(), Value::from(self.index0 + 1));
        map.insert("index0".to_string(), Value::from(self.index0));
        map.insert("rindex".to_string(), Value::from(self.length - self.index0));
        map.insert(
            "rindex0".to_string(),
            Value::from(self.length - self.index0 - 1),
        );
        map.insert("length".to_string(), Value::from(self.length));
        map.insert(
            "parentloop".to_string(),
            self.parent
                .as_ref()
                .map_or(Value::Nil, |parent| parent.to_value()),
        );
        Value::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn globals() -> Bindings {
        let mut bindings = Bindings::new();
        bindings.insert("x", "global_x");
        bindings.insert("y", "global_y");
        bindings
    }

    #[test]
    fn test_scope_innermost_first() {
        let globals = globals();
        let mut scope = Scope::new(&globals);

        let mut frame = Map::new();
        frame.insert("x".to_string(), Value::from("frame_x"));
        scope.push_frame(frame);

        assert_eq!(scope.get("x"), Some(&Value::from("frame_x")));
        assert_eq!(scope.get("y"), Some(&Value::from("global_y")));
        assert_eq!(scope.get("z"), None);

        scope.pop_frame();
        assert_eq!(scope.get("x"), Some(&Value::from("global_x")));
        // host bindings themselves are untouched
        assert_eq!(globals.get("x"), Some(&Value::from("global_x")));
    }

    #[test]
    fn test_root_frame_is_never_popped() {
        let globals = Bindings::new();
        let mut scope = Scope::new(&globals);
        assert_eq!(scope.depth(), 1);
        assert!(scope.pop_frame().is_none());
        assert_eq!(scope.depth(), 1);
    }

    #[test]
    fn test_assign_outlives_block_frame() {
        let globals = Bindings::new();
        let mut scope = Scope::new(&globals);

        let mut frame = Map::new();
        frame.insert("item".to_string(), Value::Int(1));
        scope.push_frame(frame);

        scope.assign("total", Value::Int(10));
        scope.assign("item", Value::Int(2));
        assert_eq!(scope.get("item"), Some(&Value::Int(2)));

        scope.pop_frame();
        assert_eq!(scope.get("total"), Some(&Value::Int(10)));
        assert_eq!(scope.get("item"), None);
    }

    #[test]
    fn test_assign_shadows_host_binding() {
        let globals = globals();
        let mut scope = Scope::new(&globals);
        scope.assign("x", Value::from("assigned"));
        assert_eq!(scope.get("x"), Some(&Value::from("assigned")));
    }

    #[test]
    fn test_bindings_from_json() {
        let bindings =
            Bindings::from_json(serde_json::json!({"b": 1, "a": "two"})).expect("object");
        let keys: Vec<_> = bindings.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert!(Bindings::from_json(serde_json::json!([1, 2])).is_none());
    }

    #[test]
    fn test_loop_state_value() {
        let parent = LoopState {
            index0: 1,
            ..LoopState::new("outer", 2, None)
        };
        let state = LoopState::new("inner", 3, Some(parent));
        let value = state.to_value();
        assert_eq!(value.property("index"), Value::Int(1));
        assert_eq!(value.property("index0"), Value::Int(0));
        assert_eq!(value.property("rindex"), Value::Int(3));
        assert_eq!(value.property("rindex0"), Value::Int(2));
        assert_eq!(value.property("first"), Value::Bool(true));
        assert_eq!(value.property("last"), Value::Bool(false));
        assert_eq!(
            value.property("parentloop").property("last"),
            Value::Bool(true)
        );
    }
}
