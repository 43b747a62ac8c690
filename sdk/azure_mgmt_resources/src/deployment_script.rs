//! `Microsoft.Resources/deploymentScripts`, a family keyed on `kind`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{null_as_empty, SystemData};
use crate::polymorphic::Discriminated;

/// Resource type of deployment scripts.
pub const DEPLOYMENT_SCRIPTS: &str = "Microsoft.Resources/deploymentScripts";

/// A deployment script, by runtime.
///
/// Decode through [`Polymorphic`](crate::polymorphic::Polymorphic) to accept
/// runtimes added after this crate was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DeploymentScript {
    #[serde(rename = "AzurePowerShell")]
    AzurePowerShell(ScriptResource<AzurePowerShellProperties>),
    #[serde(rename = "AzureCLI")]
    AzureCli(ScriptResource<AzureCliProperties>),
}

impl Discriminated for DeploymentScript {
    const FIELD: &'static str = "kind";
    const KINDS: &'static [&'static str] = &["AzurePowerShell", "AzureCLI"];

    fn kind(&self) -> &'static str {
        match self {
            Self::AzurePowerShell(_) => "AzurePowerShell",
            Self::AzureCli(_) => "AzureCLI",
        }
    }
}

impl DeploymentScript {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::AzurePowerShell(script) => script.name.as_deref(),
            Self::AzureCli(script) => script.name.as_deref(),
        }
    }

    pub fn provisioning_state(&self) -> Option<&str> {
        match self {
            Self::AzurePowerShell(script) => script.properties.common.provisioning_state.as_deref(),
            Self::AzureCli(script) => script.properties.common.provisioning_state.as_deref(),
        }
    }
}

/// Resource envelope shared by every script runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptResource<P> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Map::is_empty"
    )]
    pub tags: Map<String, Value>,

    pub properties: P,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_data: Option<SystemData>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Properties every runtime shares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptCommonProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_script_uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,

    /// ISO 8601 duration, e.g. `PT1H`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_interval: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzurePowerShellProperties {
    /// Az module version, e.g. `11.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub az_power_shell_version: Option<String>,

    #[serde(flatten)]
    pub common: ScriptCommonProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureCliProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub az_cli_version: Option<String>,

    #[serde(flatten)]
    pub common: ScriptCommonProperties,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polymorphic::Polymorphic;
    use serde_json::json;

    fn cli_script() -> Value {
        json!({
            "kind": "AzureCLI",
            "id": "/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.Resources/deploymentScripts/s1",
            "name": "s1",
            "type": "Microsoft.Resources/deploymentScripts",
            "location": "westus",
            "identity": {"type": "UserAssigned"},
            "properties": {
                "azCliVersion": "2.52.0",
                "scriptContent": "az group list",
                "retentionInterval": "PT1H",
                "provisioningState": "Succeeded",
                "outputs": {"count": 3}
            }
        })
    }

    #[test]
    fn known_kind_decodes_into_its_shape() {
        let script: Polymorphic<DeploymentScript> = serde_json::from_value(cli_script()).unwrap();
        assert_eq!(script.kind(), Some("AzureCLI"));

        let Some(DeploymentScript::AzureCli(cli)) = script.known() else {
            panic!("expected an Azure CLI script, got {script:?}");
        };
        assert_eq!(cli.name.as_deref(), Some("s1"));
        assert_eq!(cli.properties.az_cli_version.as_deref(), Some("2.52.0"));
        assert_eq!(cli.properties.common.retention_interval.as_deref(), Some("PT1H"));
        assert_eq!(cli.properties.common.extra["outputs"], json!({"count": 3}));
        assert_eq!(cli.extra["identity"], json!({"type": "UserAssigned"}));
        assert!(!cli.extra.contains_key("kind"));
    }

    #[test]
    fn powershell_kind_selects_powershell_shape() {
        let body = json!({
            "kind": "AzurePowerShell",
            "name": "ps1",
            "tags": null,
            "properties": {"azPowerShellVersion": "11.0", "provisioningState": "Running"}
        });
        let script: DeploymentScript = serde_json::from_value(body).unwrap();
        assert!(matches!(script, DeploymentScript::AzurePowerShell(_)));
        assert_eq!(script.name(), Some("ps1"));
        assert_eq!(script.provisioning_state(), Some("Running"));
    }

    #[test]
    fn unknown_kind_is_kept_verbatim() {
        let body = json!({
            "kind": "AzurePython",
            "name": "py1",
            "properties": {"pythonVersion": "3.12"}
        });
        let script: Polymorphic<DeploymentScript> = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(script.kind(), Some("AzurePython"));
        assert!(script.known().is_none());
        assert_eq!(serde_json::to_value(&script).unwrap(), body);
    }

    #[test]
    fn missing_kind_is_unknown() {
        let script: Polymorphic<DeploymentScript> =
            serde_json::from_value(json!({"name": "s1", "properties": {}})).unwrap();
        assert!(matches!(script, Polymorphic::Unknown { kind: None, .. }));
    }

    #[test]
    fn known_kind_with_wrong_shape_is_an_error() {
        let body = json!({"kind": "AzureCLI", "name": "s1"});
        let result = serde_json::from_value::<Polymorphic<DeploymentScript>>(body);
        assert!(result.is_err());
    }

    #[test]
    fn known_kind_round_trips() {
        let script: Polymorphic<DeploymentScript> = serde_json::from_value(cli_script()).unwrap();
        let written = serde_json::to_value(&script).unwrap();
        assert_eq!(written, cli_script());

        let again: Polymorphic<DeploymentScript> = serde_json::from_value(written).unwrap();
        assert_eq!(again, script);
    }

    #[test]
    fn built_script_writes_its_discriminator() {
        let script = DeploymentScript::AzureCli(ScriptResource {
            location: Some("westus".into()),
            properties: AzureCliProperties {
                az_cli_version: Some("2.52.0".into()),
                common: ScriptCommonProperties {
                    script_content: Some("echo hi".into()),
                    retention_interval: Some("P1D".into()),
                    ..ScriptCommonProperties::default()
                },
            },
            ..ScriptResource::default()
        });
        let written = serde_json::to_value(Polymorphic::from(script)).unwrap();
        assert_eq!(
            written,
            json!({
                "kind": "AzureCLI",
                "location": "westus",
                "properties": {
                    "azCliVersion": "2.52.0",
                    "scriptContent": "echo hi",
                    "retentionInterval": "P1D"
                }
            })
        );
    }
}
