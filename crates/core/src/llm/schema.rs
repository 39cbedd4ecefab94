//! Runtime schema descriptor for structured LLM output: model as a
//! compile-time Rust type (`T: JsonSchema + DeserializeOwned`) plus a
//! runtime descriptor derived from it, so providers that enforce schemas
//! server-side (tool-use, `response_format: json_schema`) and the
//! `jsonschema`-backed post-hoc validator share one source of truth.

use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject, SingleOrVec};
use schemars::JsonSchema;
use serde_json::Value;

/// Coarse classification of a JSON Schema node, used to describe fields to
/// providers that don't accept a full schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonSchemaKind {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

/// Shape of a response schema: a bare scalar, or an object with named,
/// classified fields.
#[derive(Debug, Clone)]
pub enum ResponseSchemaKind {
    Scalar(JsonSchemaKind),
    Object { fields: Vec<(String, JsonSchemaKind)> },
}

/// Runtime descriptor for the structured output a caller expects back,
/// paired with the full JSON Schema document used for validation.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub kind: ResponseSchemaKind,
    document: Value,
}

impl ResponseSchema {
    /// Derive a descriptor from any type implementing [`JsonSchema`].
    /// Uses the generator directly (rather than the `schema_for!` macro,
    /// which requires a concrete type path) so this works in a generic
    /// context.
    pub fn for_type<T: JsonSchema>() -> Self {
        let root = SchemaGenerator::default().into_root_schema_for::<T>();
        let document = serde_json::to_value(&root).unwrap_or(Value::Null);
        let kind = classify(&root.schema);
        Self { kind, document }
    }

    /// Full JSON Schema document, suitable for a provider's native
    /// schema-enforcement parameter or for `jsonschema` compilation.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Validate `value` against the underlying JSON Schema document.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        let compiled = jsonschema::JSONSchema::compile(&self.document)
            .map_err(|e| format!("invalid response schema: {e}"))?;

        compiled.validate(value).map_err(|errors| {
            errors
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        })
    }
}

fn classify(schema: &SchemaObject) -> ResponseSchemaKind {
    let instance_type = schema.instance_type.as_ref().and_then(|t| match t {
        SingleOrVec::Single(boxed) => Some(**boxed),
        SingleOrVec::Vec(types) => types.first().copied(),
    });

    if instance_type == Some(InstanceType::Object) {
        if let Some(object) = &schema.object {
            let fields = object
                .properties
                .iter()
                .map(|(name, sub_schema)| (name.clone(), classify_kind(sub_schema)))
                .collect();
            return ResponseSchemaKind::Object { fields };
        }
        return ResponseSchemaKind::Object { fields: Vec::new() };
    }

    ResponseSchemaKind::Scalar(kind_for_instance_type(instance_type))
}

fn classify_kind(schema: &Schema) -> JsonSchemaKind {
    match schema {
        Schema::Object(obj) => {
            let instance_type = obj.instance_type.as_ref().and_then(|t| match t {
                SingleOrVec::Single(boxed) => Some(**boxed),
                SingleOrVec::Vec(types) => types.first().copied(),
            });
            kind_for_instance_type(instance_type)
        }
        Schema::Bool(_) => JsonSchemaKind::Boolean,
    }
}

fn kind_for_instance_type(instance_type: Option<InstanceType>) -> JsonSchemaKind {
    match instance_type {
        Some(InstanceType::String) => JsonSchemaKind::String,
        Some(InstanceType::Number) => JsonSchemaKind::Number,
        Some(InstanceType::Integer) => JsonSchemaKind::Integer,
        Some(InstanceType::Boolean) => JsonSchemaKind::Boolean,
        Some(InstanceType::Array) => JsonSchemaKind::Array,
        _ => JsonSchemaKind::Object,
    }
}
