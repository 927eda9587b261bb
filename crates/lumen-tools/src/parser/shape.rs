//! Adapter from raw JSON values to tool-call shapes.

use serde_json::{Map, Value};

/// The JSON shapes a textual tool call may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallShape {
    /// `{"tool": ..., "args": ...}` in either key order.
    ToolArgs,
    /// `{"name": ..., "arguments": ...}`.
    NameArguments,
}

impl CallShape {
    fn keys(self) -> (&'static str, &'static str) {
        match self {
            Self::ToolArgs => ("tool", "args"),
            Self::NameArguments => ("name", "arguments"),
        }
    }
}

/// A value resolved to a name and an argument mapping.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolvedCall {
    pub(crate) shape: CallShape,
    pub(crate) name: String,
    pub(crate) arguments: Map<String, Value>,
    /// Whether the arguments key was present in the source object.
    pub(crate) explicit_arguments: bool,
}

/// Resolve a value as a tool call, trying `tool`/`args` before
/// `name`/`arguments`.
pub(crate) fn resolve(value: &Value) -> Option<ResolvedCall> {
    resolve_as(value, CallShape::ToolArgs).or_else(|| resolve_as(value, CallShape::NameArguments))
}

/// Resolve a value as one specific shape.
pub(crate) fn resolve_as(value: &Value, shape: CallShape) -> Option<ResolvedCall> {
    let obj = value.as_object()?;
    let (name_key, args_key) = shape.keys();

    let name = obj.get(name_key)?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }

    let raw_args = obj.get(args_key);
    let arguments = match raw_args {
        None | Some(Value::Null) => Map::new(),
        Some(value) => arguments_map(value)?,
    };

    Some(ResolvedCall {
        shape,
        name: name.to_string(),
        arguments,
        explicit_arguments: raw_args.is_some(),
    })
}

/// Arguments must be a mapping; a JSON-encoded mapping inside a string is
/// accepted too.
fn arguments_map(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(s) if s.trim().is_empty() => Some(Map::new()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_args_shape() {
        let call = resolve(&json!({"tool": "exec", "args": {"command": "ls"}})).unwrap();
        assert_eq!(call.shape, CallShape::ToolArgs);
        assert_eq!(call.name, "exec");
        assert_eq!(call.arguments["command"], "ls");
    }

    #[test]
    fn test_name_arguments_shape() {
        let call = resolve(&json!({"name": "get_time", "arguments": {}})).unwrap();
        assert_eq!(call.shape, CallShape::NameArguments);
        assert!(call.explicit_arguments);
    }

    #[test]
    fn test_tool_args_wins_over_name() {
        let call = resolve(&json!({"tool": "a", "name": "b"})).unwrap();
        assert_eq!(call.name, "a");
    }

    #[test]
    fn test_missing_arguments_default_empty() {
        let call = resolve(&json!({"tool": "get_time"})).unwrap();
        assert!(call.arguments.is_empty());
        assert!(!call.explicit_arguments);
    }

    #[test]
    fn test_string_arguments_parsed() {
        let call = resolve(&json!({"name": "exec", "arguments": "{\"command\":\"ls\"}"})).unwrap();
        assert_eq!(call.arguments["command"], "ls");
    }

    #[test]
    fn test_rejections() {
        assert!(resolve(&json!({"tool": ""})).is_none());
        assert!(resolve(&json!({"tool": 42})).is_none());
        assert!(resolve(&json!({"tool": "x", "args": [1, 2]})).is_none());
        assert!(resolve(&json!({"tool": "x", "args": "not json"})).is_none());
        assert!(resolve(&json!(["tool", "x"])).is_none());
        assert!(resolve(&json!({"command": "ls"})).is_none());
    }
}
