//! Tool descriptors and argument validation.
//!
//! Every tool declares its arguments as an ordered list of [`ArgSpec`]s. The
//! registry runs one uniform validation pass over the incoming argument map
//! before the handler deserializes it into its typed params struct.

use std::sync::Arc;

use rmcp::model::JsonObject;
use serde_json::{Map, Value, json};

use super::error::{ToolError, ToolResult};
use super::handlers::Arguments;

/// JSON type accepted for an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    String,
    Integer,
    Boolean,
    StringArray,
}

impl ArgType {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::StringArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::StringArray => "array of strings",
        }
    }

    fn json_schema(self) -> Value {
        match self {
            Self::String => json!({ "type": "string" }),
            Self::Integer => json!({ "type": "integer" }),
            Self::Boolean => json!({ "type": "boolean" }),
            Self::StringArray => json!({ "type": "array", "items": { "type": "string" } }),
        }
    }
}

/// One declared argument.
#[derive(Debug, Clone)]
pub struct ArgSpec {
    pub name: &'static str,
    pub ty: ArgType,
    pub required: bool,
    pub default: Option<Value>,
    pub description: &'static str,
}

impl ArgSpec {
    pub fn required(name: &'static str, ty: ArgType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            required: true,
            default: None,
            description,
        }
    }

    pub fn optional(name: &'static str, ty: ArgType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            required: false,
            default: None,
            description,
        }
    }

    /// Value inserted when an optional argument is absent.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// How the registry runs a tool's handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionKind {
    /// Called inline on the dispatching task.
    Direct,
    /// Sent to the bounded blocking worker pool.
    Offloaded,
    /// Awaited as an asynchronous subprocess delegation.
    Subprocess,
}

impl ExecutionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Offloaded => "offloaded",
            Self::Subprocess => "subprocess",
        }
    }
}

/// Immutable description of a registered tool.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub args: Vec<ArgSpec>,
    pub kind: ExecutionKind,
    pub output_schema: Option<Arc<JsonObject>>,
}

impl ToolDescriptor {
    pub fn new(name: &'static str, description: &'static str, kind: ExecutionKind) -> Self {
        Self {
            name,
            description,
            args: Vec::new(),
            kind,
            output_schema: None,
        }
    }

    pub fn arg(mut self, spec: ArgSpec) -> Self {
        self.args.push(spec);
        self
    }

    pub fn output_schema(mut self, schema: Arc<JsonObject>) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Check the raw argument map against the declared arguments.
    ///
    /// Missing required arguments fail with `MissingArgument`, wrongly typed
    /// ones with `InvalidArgument`. Null counts as absent. Defaults are filled
    /// in for absent optional arguments; undeclared keys are passed through.
    pub fn validate(&self, mut raw: Map<String, Value>) -> ToolResult<Arguments> {
        for spec in &self.args {
            let well_typed = match raw.get(spec.name) {
                None | Some(Value::Null) => None,
                Some(value) => Some(spec.ty.accepts(value)),
            };
            match well_typed {
                None => {
                    if spec.required {
                        return Err(ToolError::MissingArgument(spec.name.to_string()));
                    }
                    raw.remove(spec.name);
                    if let Some(default) = &spec.default {
                        raw.insert(spec.name.to_string(), default.clone());
                    }
                }
                Some(false) => {
                    return Err(ToolError::invalid_argument(
                        spec.name,
                        format!("expected {}", spec.ty.name()),
                    ));
                }
                Some(true) => {}
            }
        }
        Ok(Arguments::new(raw))
    }

    /// JSON Schema for the argument list, as advertised to MCP clients.
    pub fn input_schema(&self) -> JsonObject {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for spec in &self.args {
            let mut prop = spec.ty.json_schema();
            prop["description"] = Value::String(spec.description.to_string());
            if let Some(default) = &spec.default {
                prop["default"] = default.clone();
            }
            properties.insert(spec.name.to_string(), prop);
            if spec.required {
                required.push(Value::String(spec.name.to_string()));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new("demo", "demo tool", ExecutionKind::Direct)
            .arg(ArgSpec::required("path", ArgType::String, "a path"))
            .arg(ArgSpec::optional("lines", ArgType::Integer, "line count"))
            .arg(
                ArgSpec::optional("recursive", ArgType::Boolean, "recurse")
                    .with_default(json!(false)),
            )
    }

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_missing_required() {
        let err = descriptor().validate(map(json!({}))).unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument(name) if name == "path"));
    }

    #[test]
    fn test_null_required_is_missing() {
        let err = descriptor().validate(map(json!({"path": null}))).unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument(_)));
    }

    #[test]
    fn test_type_mismatch() {
        let err = descriptor()
            .validate(map(json!({"path": "a", "lines": "ten"})))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { name, .. } if name == "lines"));
    }

    #[test]
    fn test_defaults_and_extras() {
        let args = descriptor()
            .validate(map(json!({"path": "a", "extra": 1})))
            .unwrap();
        assert_eq!(args.get("recursive"), Some(&json!(false)));
        assert_eq!(args.get("extra"), Some(&json!(1)));
        assert!(args.get("lines").is_none());
    }

    #[test]
    fn test_input_schema_shape() {
        let schema = descriptor().input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["path"]));
        assert_eq!(schema["properties"]["lines"]["type"], "integer");
        assert_eq!(schema["properties"]["recursive"]["default"], false);
    }
}
