//! Model families whose concrete shape is chosen by one wire field.
//!
//! A family is a serde enum tagged on its discriminator field, e.g.
//! `#[serde(tag = "kind")]` or `#[serde(tag = "@odata.type")]`, that also
//! implements [`Discriminated`]. Wrapping it in [`Polymorphic`] decodes known
//! kinds into the enum and keeps anything else as raw JSON, so a payload from
//! a newer service version still round-trips.
//!
//! ```
//! use azure_mgmt_resources::polymorphic::Polymorphic;
//! use azure_mgmt_resources::DeploymentScript;
//!
//! let body = r#"{"kind":"AzureCLI","name":"s1","properties":{"azCliVersion":"2.52.0"}}"#;
//! let script: Polymorphic<DeploymentScript> = serde_json::from_str(body).unwrap();
//! match script {
//!     Polymorphic::Known(DeploymentScript::AzureCli(cli)) => {
//!         assert_eq!(cli.properties.az_cli_version.as_deref(), Some("2.52.0"));
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// The discriminator registry of a model family.
pub trait Discriminated: Serialize + DeserializeOwned {
    /// Wire field holding the discriminator.
    const FIELD: &'static str;

    /// Every discriminator value the family decodes.
    const KINDS: &'static [&'static str];

    /// The discriminator of this value.
    fn kind(&self) -> &'static str;
}

/// A member of a [`Discriminated`] family, or a shape this crate does not know.
#[derive(Debug, Clone, PartialEq)]
pub enum Polymorphic<T> {
    Known(T),
    /// A payload whose discriminator is missing or unregistered, kept as sent.
    Unknown {
        kind: Option<String>,
        raw: Map<String, Value>,
    },
}

impl<T: Discriminated> Polymorphic<T> {
    /// The wire discriminator, if the payload carried one.
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Known(value) => Some(value.kind()),
            Self::Unknown { kind, .. } => kind.as_deref(),
        }
    }

    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown { .. } => None,
        }
    }

    pub fn into_known(self) -> Option<T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown { .. } => None,
        }
    }

    /// Decode one JSON object.
    ///
    /// # Errors
    ///
    /// A registered discriminator whose payload does not match its shape is an
    /// error. It is never demoted to [`Polymorphic::Unknown`].
    pub fn from_object(raw: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let kind = raw.get(T::FIELD).and_then(Value::as_str).map(str::to_string);
        match kind {
            Some(kind) if T::KINDS.contains(&kind.as_str()) => {
                serde_json::from_value(Value::Object(raw)).map(Self::Known)
            }
            kind => Ok(Self::Unknown { kind, raw }),
        }
    }
}

impl<T> From<T> for Polymorphic<T> {
    fn from(value: T) -> Self {
        Self::Known(value)
    }
}

impl<T: Discriminated> Serialize for Polymorphic<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Known(value) => value.serialize(serializer),
            Self::Unknown { raw, .. } => raw.serialize(serializer),
        }
    }
}

impl<'de, T: Discriminated> Deserialize<'de> for Polymorphic<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_object(raw).map_err(D::Error::custom)
    }
}
