//! Resource Manager resource identifiers.
//!
//! ```rust
//! use azure_mgmt_resources::resource_id::ResourceId;
//!
//! let id: ResourceId = "/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.Sql/servers/srv/databases/db"
//!     .parse()
//!     .unwrap();
//!
//! assert_eq!(id.subscription_id(), Some("sub-1"));
//! assert_eq!(id.resource_group_name(), Some("rg-1"));
//! assert_eq!(id.resource_type(), "Microsoft.Sql/servers/databases");
//! assert_eq!(id.name(), "db");
//! assert_eq!(
//!     id.parent().unwrap().to_string(),
//!     "/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.Sql/servers/srv"
//! );
//! ```

use azure_mgmt_core::error::{ArmError, ArmResult};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const SUBSCRIPTIONS: &str = "subscriptions";
const RESOURCE_GROUPS: &str = "resourceGroups";
const PROVIDERS: &str = "providers";
const RESOURCES_NAMESPACE: &str = "Microsoft.Resources";

/// A parsed Resource Manager resource id.
///
/// Ids are compared case-insensitively, as Resource Manager does.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    segments: Vec<String>,
}

impl ResourceId {
    /// Parse an id such as
    /// `/subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{type}/{name}`.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidArgument`] when the id is not absolute,
    /// has empty segments, or does not consist of key/value pairs.
    pub fn parse(id: &str) -> ArmResult<Self> {
        let trimmed = id.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Err(invalid_id(id, "must start with '/'"));
        };
        let segments: Vec<String> = rest
            .trim_end_matches('/')
            .split('/')
            .map(str::to_string)
            .collect();

        if segments.iter().any(String::is_empty) {
            return Err(invalid_id(id, "contains an empty segment"));
        }
        if segments.len() % 2 != 0 {
            return Err(invalid_id(id, "segments must come in key/value pairs"));
        }
        let first_key = &segments[0];
        if !first_key.eq_ignore_ascii_case(SUBSCRIPTIONS) && !first_key.eq_ignore_ascii_case(PROVIDERS) {
            return Err(invalid_id(id, "must start with /subscriptions or /providers"));
        }
        Ok(Self { segments })
    }

    /// The id of a subscription.
    pub fn subscription(subscription_id: &str) -> ArmResult<Self> {
        validate_segment("subscription id", subscription_id)?;
        Ok(Self {
            segments: vec![SUBSCRIPTIONS.into(), subscription_id.into()],
        })
    }

    /// The id of a resource group.
    pub fn resource_group(subscription_id: &str, resource_group: &str) -> ArmResult<Self> {
        validate_segment("resource group name", resource_group)?;
        let mut id = Self::subscription(subscription_id)?;
        id.segments.push(RESOURCE_GROUPS.into());
        id.segments.push(resource_group.into());
        Ok(id)
    }

    /// The id of a child resource: `{self}/{child_type}/{name}`.
    pub fn append_child(&self, child_type: &str, name: &str) -> ArmResult<Self> {
        validate_segment("child resource type", child_type)?;
        validate_segment("resource name", name)?;
        let mut segments = self.segments.clone();
        segments.push(child_type.into());
        segments.push(name.into());
        Ok(Self { segments })
    }

    /// The id of a provider resource under this scope:
    /// `{self}/providers/{namespace}/{resource_type}/{name}`.
    pub fn append_provider_resource(&self, namespace: &str, resource_type: &str, name: &str) -> ArmResult<Self> {
        validate_segment("provider namespace", namespace)?;
        let mut segments = self.segments.clone();
        segments.push(PROVIDERS.into());
        segments.push(namespace.into());
        Self { segments }.append_child(resource_type, name)
    }

    fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.segments
            .chunks_exact(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
    }

    /// The subscription the resource lives in.
    pub fn subscription_id(&self) -> Option<&str> {
        self.pairs()
            .next()
            .filter(|(key, _)| key.eq_ignore_ascii_case(SUBSCRIPTIONS))
            .map(|(_, value)| value)
    }

    /// The resource group the resource lives in.
    pub fn resource_group_name(&self) -> Option<&str> {
        self.pairs()
            .take_while(|(key, _)| !key.eq_ignore_ascii_case(PROVIDERS))
            .find(|(key, _)| key.eq_ignore_ascii_case(RESOURCE_GROUPS))
            .map(|(_, value)| value)
    }

    /// The namespace of the innermost provider, e.g. `Microsoft.Storage`.
    pub fn provider_namespace(&self) -> Option<&str> {
        self.pairs()
            .filter(|(key, _)| key.eq_ignore_ascii_case(PROVIDERS))
            .last()
            .map(|(_, value)| value)
    }

    /// The full resource type, e.g. `Microsoft.Sql/servers/databases`.
    ///
    /// Scopes without a provider report `Microsoft.Resources/subscriptions`
    /// or `Microsoft.Resources/resourceGroups`.
    pub fn resource_type(&self) -> String {
        let mut types = Vec::new();
        for (key, _) in self.pairs() {
            if key.eq_ignore_ascii_case(PROVIDERS) {
                types.clear();
            } else {
                types.push(key);
            }
        }
        match (self.provider_namespace(), types.last()) {
            (Some(ns), Some(_)) => format!("{ns}/{}", types.join("/")),
            (_, Some(last)) => format!("{RESOURCES_NAMESPACE}/{last}"),
            (_, None) => RESOURCES_NAMESPACE.to_string(),
        }
    }

    /// The resource name, the last value of the id.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// The id of the enclosing scope, `None` at the top level.
    pub fn parent(&self) -> Option<Self> {
        let mut segments = self.segments.clone();
        segments.truncate(segments.len().saturating_sub(2));
        let ends_with_provider = segments.len() >= 2
            && segments[segments.len() - 2].eq_ignore_ascii_case(PROVIDERS);
        if ends_with_provider {
            segments.truncate(segments.len() - 2);
        }
        (!segments.is_empty()).then_some(Self { segments })
    }
}

fn invalid_id(id: &str, reason: &str) -> ArmError {
    ArmError::InvalidArgument(format!("invalid resource id '{id}': {reason}"))
}

/// Check a value that becomes one path segment of an id.
pub(crate) fn validate_segment(what: &str, value: &str) -> ArmResult<()> {
    if value.trim().is_empty() {
        return Err(ArmError::InvalidArgument(format!("{what} must not be empty")));
    }
    if value.contains('/') {
        return Err(ArmError::InvalidArgument(format!(
            "{what} '{value}' must not contain '/'"
        )));
    }
    Ok(())
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl FromStr for ResourceId {
    type Err = ArmError;

    fn from_str(s: &str) -> ArmResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = ArmError;

    fn try_from(value: String) -> ArmResult<Self> {
        Self::parse(&value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.to_string()
    }
}

impl PartialEq for ResourceId {
    fn eq(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for ResourceId {}

impl Hash for ResourceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for segment in &self.segments {
            segment.to_ascii_lowercase().hash(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VM: &str = "/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.Compute/virtualMachines/vm-1";

    #[test]
    fn parses_resource_group_resource() {
        let id = ResourceId::parse(VM).unwrap();
        assert_eq!(id.subscription_id(), Some("sub-1"));
        assert_eq!(id.resource_group_name(), Some("rg-1"));
        assert_eq!(id.provider_namespace(), Some("Microsoft.Compute"));
        assert_eq!(id.resource_type(), "Microsoft.Compute/virtualMachines");
        assert_eq!(id.name(), "vm-1");
        assert_eq!(id.to_string(), VM);
    }

    #[test]
    fn parses_scopes() {
        let sub = ResourceId::parse("/subscriptions/sub-1").unwrap();
        assert_eq!(sub.resource_type(), "Microsoft.Resources/subscriptions");
        assert_eq!(sub.resource_group_name(), None);
        assert!(sub.parent().is_none());

        let rg = ResourceId::parse("/subscriptions/sub-1/resourceGroups/rg-1/").unwrap();
        assert_eq!(rg.resource_type(), "Microsoft.Resources/resourceGroups");
        assert_eq!(rg.name(), "rg-1");
        assert_eq!(rg.parent().unwrap(), sub);
    }

    #[test]
    fn parent_skips_provider_segment() {
        let id = ResourceId::parse(VM).unwrap();
        let parent = id.parent().unwrap();
        assert_eq!(parent.to_string(), "/subscriptions/sub-1/resourceGroups/rg-1");
    }

    #[test]
    fn extension_resource_uses_innermost_provider() {
        let lock = format!("{VM}/providers/Microsoft.Authorization/locks/no-delete");
        let id = ResourceId::parse(&lock).unwrap();
        assert_eq!(id.provider_namespace(), Some("Microsoft.Authorization"));
        assert_eq!(id.resource_type(), "Microsoft.Authorization/locks");
        assert_eq!(id.resource_group_name(), Some("rg-1"));
        assert_eq!(id.parent().unwrap().to_string(), VM);
    }

    #[test]
    fn rejects_malformed_ids() {
        for bad in [
            "",
            "subscriptions/sub-1",
            "/subscriptions//resourceGroups/rg",
            "/subscriptions/sub-1/resourceGroups",
            "/tenants/t-1",
        ] {
            let err = ResourceId::parse(bad).unwrap_err();
            assert!(matches!(err, ArmError::InvalidArgument(_)), "{bad}: {err:?}");
        }
    }

    #[test]
    fn builds_child_ids() {
        let server = ResourceId::resource_group("sub-1", "rg-1")
            .unwrap()
            .append_provider_resource("Microsoft.Sql", "servers", "srv")
            .unwrap();
        let db = server.append_child("databases", "db").unwrap();
        assert_eq!(db.resource_type(), "Microsoft.Sql/servers/databases");
        assert_eq!(db.parent().unwrap(), server);

        assert!(server.append_child("databases", "").is_err());
        assert!(server.append_child("databases", "a/b").is_err());
    }

    #[test]
    fn comparison_ignores_case() {
        let a = ResourceId::parse(VM).unwrap();
        let b = ResourceId::parse(&VM.to_uppercase()).unwrap();
        assert_eq!(a, b);

        use std::collections::HashSet;
        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn serializes_as_string() {
        let id = ResourceId::parse(VM).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{VM}\""));
        let back: ResourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ResourceId>("\"not-an-id\"").is_err());
    }
}
