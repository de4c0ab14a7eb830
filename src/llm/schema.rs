//! Response-schema descriptor (the OpenAPI subset Gemini accepts).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    Object,
    Array,
    String,
}

/// A node of a response schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSchema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    /// Object properties; `property_ordering` carries the declared order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, ResponseSchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ResponseSchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_ordering: Option<Vec<String>>,
}

impl ResponseSchema {
    pub fn string() -> Self {
        Self {
            kind: SchemaType::String,
            properties: None,
            items: None,
            required: None,
            property_ordering: None,
        }
    }

    pub fn array(items: ResponseSchema) -> Self {
        Self {
            kind: SchemaType::Array,
            items: Some(Box::new(items)),
            ..Self::string()
        }
    }

    /// An object whose listed properties are all required, in this order.
    pub fn object(properties: Vec<(&str, ResponseSchema)>) -> Self {
        let names: Vec<String> = properties.iter().map(|(n, _)| n.to_string()).collect();
        let properties = properties
            .into_iter()
            .map(|(name, schema)| (name.to_string(), schema))
            .collect();
        Self {
            kind: SchemaType::Object,
            properties: Some(properties),
            items: None,
            required: Some(names.clone()),
            property_ordering: Some(names),
        }
    }
}
