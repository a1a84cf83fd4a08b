// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Useful JSON Schema definitions

use schemars::{
    JsonSchema,
    r#gen::SchemaGenerator,
    schema::{InstanceType, Schema, SchemaObject},
};

/// A network hostname
pub struct Hostname;

impl JsonSchema for Hostname {
    fn schema_name() -> String {
        "Hostname".to_string()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        Schema::Object(SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            format: Some("hostname".to_owned()),
            ..SchemaObject::default()
        })
    }
}

/// A command line argument template, which may contain placeholders
pub struct ArgumentTemplate;

impl JsonSchema for ArgumentTemplate {
    fn schema_name() -> String {
        "ArgumentTemplate".to_string()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        Schema::Object(SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            metadata: Some(Box::new(schemars::schema::Metadata {
                description: Some(
                    "Command argument. `{room_id}`, `{days}` and `{purge_up_to_ts}` are replaced before running the command".to_owned(),
                ),
                ..Default::default()
            })),
            ..SchemaObject::default()
        })
    }
}
