//! Generic resource payloads.

use azure_mgmt_core::error::ArmResult;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::resource_id::ResourceId;

/// A Resource Manager resource.
///
/// Carries the envelope every tracked resource shares. Fields this type
/// does not model are kept in [`extra`](Self::extra) in the order the
/// service sent them and written back unchanged, so a read-modify-write
/// cycle never drops data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceData {
    /// Fully qualified resource id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Resource type, e.g. `Microsoft.Storage/storageAccounts`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    /// Azure region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Resource tags, in the order the service sent them. `null` reads as
    /// no tags.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Map::is_empty"
    )]
    pub tags: Map<String, Value>,

    /// Resource-specific properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,

    /// Creation and modification metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_data: Option<SystemData>,

    /// Every field not listed above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResourceData {
    /// A resource in `location`, ready to be created.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), Value::String(value.into()));
        self
    }

    /// The value of tag `key`, when it is a string.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key)?.as_str()
    }

    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = Some(properties);
        self
    }

    /// `properties.provisioningState`, if reported.
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties.as_ref()?.get("provisioningState")?.as_str()
    }

    /// The parsed [`id`](Self::id).
    ///
    /// # Errors
    ///
    /// Returns an error when the service returned an id that does not parse.
    pub fn resource_id(&self) -> ArmResult<Option<ResourceId>> {
        self.id.as_deref().map(ResourceId::parse).transpose()
    }

    /// Re-read this resource as a more specific model, such as a
    /// [`Polymorphic`](crate::polymorphic::Polymorphic) family.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Serialization`](azure_mgmt_core::error::ArmError::Serialization)
    /// when the payload does not fit `T`.
    pub fn decode_as<T: DeserializeOwned>(&self) -> ArmResult<T> {
        Ok(serde_json::from_value(serde_json::to_value(self)?)?)
    }
}

pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Who created and last modified a resource, and when.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    /// `User`, `Application`, `ManagedIdentity` or `Key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_type: Option<String>,

    /// RFC 3339 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn storage_account() -> Value {
        json!({
            "id": "/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.Storage/storageAccounts/st1",
            "name": "st1",
            "type": "Microsoft.Storage/storageAccounts",
            "location": "westeurope",
            "sku": {"name": "Standard_LRS"},
            "kind": "StorageV2",
            "tags": {"env": "test"},
            "properties": {"provisioningState": "Succeeded", "accessTier": "Hot"},
            "systemData": {"createdBy": "alice@example.com", "createdByType": "User"},
            "etag": "W/\"abc\""
        })
    }

    #[test]
    fn deserializes_envelope_and_keeps_unknown_fields() {
        let data: ResourceData = serde_json::from_value(storage_account()).unwrap();

        assert_eq!(data.name.as_deref(), Some("st1"));
        assert_eq!(data.resource_type.as_deref(), Some("Microsoft.Storage/storageAccounts"));
        assert_eq!(data.tag("env"), Some("test"));
        assert_eq!(data.provisioning_state(), Some("Succeeded"));
        assert_eq!(
            data.system_data.as_ref().and_then(|s| s.created_by.as_deref()),
            Some("alice@example.com")
        );

        let extra: Vec<&str> = data.extra.keys().map(String::as_str).collect();
        assert_eq!(extra, vec!["sku", "kind", "etag"]);
    }

    #[test]
    fn unknown_fields_survive_read_modify_write() {
        let mut data: ResourceData = serde_json::from_value(storage_account()).unwrap();
        data.tags.insert("owner".into(), json!("team-a"));

        let written = serde_json::to_value(&data).unwrap();
        assert_eq!(written["sku"], json!({"name": "Standard_LRS"}));
        assert_eq!(written["kind"], "StorageV2");
        assert_eq!(written["etag"], "W/\"abc\"");
        assert_eq!(written["tags"]["owner"], "team-a");
        assert_eq!(written["properties"]["accessTier"], "Hot");
    }

    #[test]
    fn new_resource_serializes_minimal_body() {
        let data = ResourceData::new("westus")
            .with_tag("env", "dev")
            .with_properties(json!({"enabled": true}));
        let written = serde_json::to_value(&data).unwrap();
        assert_eq!(
            written,
            json!({"location": "westus", "tags": {"env": "dev"}, "properties": {"enabled": true}})
        );
    }

    #[test]
    fn null_tags_read_as_empty() {
        let data: ResourceData =
            serde_json::from_str(r#"{"id":"/subscriptions/s","name":"n","tags":null}"#).unwrap();
        assert!(data.tags.is_empty());
        assert_eq!(data.tag("env"), None);

        let written = serde_json::to_value(&data).unwrap();
        assert!(written.get("tags").is_none());
    }

    #[test]
    fn tag_order_survives_round_trip() {
        let body = r#"{"tags":{"zeta":"1","alpha":"2","mid":"3"}}"#;
        let data: ResourceData = serde_json::from_str(body).unwrap();
        let keys: Vec<&str> = data.tags.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(serde_json::to_string(&data).unwrap(), body);
    }

    #[test]
    fn resource_id_parses_service_id() {
        let data: ResourceData = serde_json::from_value(storage_account()).unwrap();
        let id = data.resource_id().unwrap().unwrap();
        assert_eq!(id.resource_group_name(), Some("rg-1"));

        let bad = ResourceData {
            id: Some("not-an-id".into()),
            ..ResourceData::default()
        };
        assert!(bad.resource_id().is_err());
    }
}
