//! Which roles may perform which protected action.
//!
//! The server layers its routes from this table and the probe CLI uses the
//! same table to predict the status code each caller should observe.

use axum::http::Method;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::auth::{authorize, Denial, Role, RoleSet, RoleSetError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Action {
    #[serde(rename = "device.list")]
    DeviceList,
    #[serde(rename = "device.create")]
    DeviceCreate,
    #[serde(rename = "device.delete")]
    DeviceDelete,
    #[serde(rename = "weather.list")]
    WeatherList,
    #[serde(rename = "weather.collect")]
    WeatherCollect,
    #[serde(rename = "template.list")]
    TemplateList,
    #[serde(rename = "template.create")]
    TemplateCreate,
    #[serde(rename = "template.delete")]
    TemplateDelete,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::DeviceList,
        Action::DeviceCreate,
        Action::DeviceDelete,
        Action::WeatherList,
        Action::WeatherCollect,
        Action::TemplateList,
        Action::TemplateCreate,
        Action::TemplateDelete,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Action::DeviceList => "device.list",
            Action::DeviceCreate => "device.create",
            Action::DeviceDelete => "device.delete",
            Action::WeatherList => "weather.list",
            Action::WeatherCollect => "weather.collect",
            Action::TemplateList => "template.list",
            Action::TemplateCreate => "template.create",
            Action::TemplateDelete => "template.delete",
        }
    }

    /// Environment variable overriding this action's permitted roles,
    /// e.g. `POLICY_DEVICE_CREATE`.
    pub fn env_key(&self) -> String {
        format!("POLICY_{}", self.name().replace('.', "_").to_uppercase())
    }

    pub fn method(&self) -> Method {
        match self {
            Action::DeviceList | Action::WeatherList | Action::TemplateList => Method::GET,
            Action::DeviceCreate | Action::WeatherCollect | Action::TemplateCreate => Method::POST,
            Action::DeviceDelete | Action::TemplateDelete => Method::DELETE,
        }
    }

    /// Route path as mounted on the router.
    pub fn route(&self) -> &'static str {
        match self {
            Action::DeviceList | Action::DeviceCreate => "/api/devices",
            Action::DeviceDelete => "/api/devices/:id",
            Action::WeatherList => "/api/weather",
            Action::WeatherCollect => "/api/weather/collect",
            Action::TemplateList | Action::TemplateCreate => "/api/templates",
            Action::TemplateDelete => "/api/templates/:id",
        }
    }

    /// Concrete path a probe requests. Deletes target the nil id.
    pub fn probe_path(&self) -> String {
        self.route().replace(":id", &uuid::Uuid::nil().to_string())
    }

    /// Status an authorized probe request is expected to get.
    pub fn success_status(&self) -> u16 {
        match self {
            Action::DeviceCreate | Action::WeatherCollect | Action::TemplateCreate => 201,
            // the nil id never exists
            Action::DeviceDelete | Action::TemplateDelete => 404,
            Action::DeviceList | Action::WeatherList | Action::TemplateList => 200,
        }
    }

    /// Body sent by probes; `None` for requests without one.
    pub fn sample_body(&self) -> Option<serde_json::Value> {
        use serde_json::json;
        match self {
            Action::DeviceCreate => Some(json!({
                "name": "probe-device",
                "type": "sensor",
                "location": "probe-bench"
            })),
            Action::WeatherCollect => Some(json!({
                "location": "probe-bench",
                "temperature_c": 21.5,
                "humidity": 40
            })),
            Action::TemplateCreate => Some(json!({
                "name": "probe-template",
                "subject": "Probe",
                "body": "Device {{device}} reported {{reading}}"
            })),
            _ => None,
        }
    }

    fn default_roles(&self) -> RoleSet {
        match self {
            Action::DeviceList | Action::WeatherList | Action::TemplateList => RoleSet::all(),
            Action::DeviceCreate | Action::WeatherCollect => {
                RoleSet::new(Role::Admin, [Role::Editor])
            }
            Action::DeviceDelete | Action::TemplateCreate | Action::TemplateDelete => {
                RoleSet::single(Role::Admin)
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<&str> = Action::ALL.iter().map(Action::name).collect();
                format!("unknown action '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// A `POLICY_*` value that does not parse to a role set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid role list in {key}: {source}")]
pub struct PolicyError {
    pub key: String,
    #[source]
    pub source: RoleSetError,
}

/// Permitted-role set for every action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    rules: HashMap<Action, RoleSet>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            rules: Action::ALL.into_iter().map(|a| (a, a.default_roles())).collect(),
        }
    }
}

impl Policy {
    pub fn permitted(&self, action: Action) -> RoleSet {
        self.rules
            .get(&action)
            .cloned()
            .unwrap_or_else(|| action.default_roles())
    }

    pub fn set(&mut self, action: Action, roles: RoleSet) {
        self.rules.insert(action, roles);
    }

    /// Override one action from a comma separated role list.
    pub fn override_from_list(&mut self, action: Action, value: &str) -> Result<(), RoleSetError> {
        let roles = RoleSet::parse_list(value)?;
        self.set(action, roles);
        Ok(())
    }

    /// Apply `POLICY_<ACTION>` overrides from a variable lookup. Any bad value
    /// fails the whole load; a broken role list is a deployment error.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, PolicyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for action in Action::ALL {
            let key = action.env_key();
            if let Some(value) = lookup(key.as_str()) {
                self.override_from_list(action, &value)
                    .map_err(|source| PolicyError { key, source })?;
            }
        }
        Ok(self)
    }

    pub fn check(&self, action: Action, caller: Option<&str>) -> Result<Role, Denial> {
        authorize(caller, &self.permitted(action))
    }

    /// Status a caller with a valid token carrying `caller` should observe.
    pub fn expected_status(&self, action: Action, caller: Option<&str>) -> u16 {
        match self.check(action, caller) {
            Ok(_) => action.success_status(),
            Err(Denial::MissingCredential) => 401,
            Err(Denial::InsufficientPrivilege { .. }) => 403,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table() {
        let policy = Policy::default();
        assert_eq!(policy.permitted(Action::DeviceCreate).to_string(), "admin,editor");
        assert_eq!(policy.permitted(Action::TemplateDelete).to_string(), "admin");
        assert_eq!(policy.permitted(Action::WeatherList), RoleSet::all());
    }

    #[test]
    fn expected_statuses() {
        let policy = Policy::default();
        assert_eq!(policy.expected_status(Action::DeviceCreate, Some("admin")), 201);
        assert_eq!(policy.expected_status(Action::DeviceCreate, Some("Editor")), 201);
        assert_eq!(policy.expected_status(Action::DeviceCreate, Some("viewer")), 403);
        assert_eq!(policy.expected_status(Action::DeviceCreate, None), 401);
        assert_eq!(policy.expected_status(Action::DeviceList, Some("viewer")), 200);
        assert_eq!(policy.expected_status(Action::DeviceDelete, Some("admin")), 404);
    }

    #[test]
    fn overrides_replace_defaults() {
        let mut policy = Policy::default();
        policy.override_from_list(Action::TemplateCreate, "editor, ADMIN").unwrap();
        assert_eq!(policy.check(Action::TemplateCreate, Some("editor")), Ok(Role::Editor));

        assert_eq!(
            policy.override_from_list(Action::TemplateCreate, ""),
            Err(RoleSetError::Empty)
        );
    }

    #[test]
    fn overrides_from_lookup() {
        let lookup = |key: &str| match key {
            "POLICY_DEVICE_DELETE" => Some("admin,editor".to_string()),
            _ => None,
        };
        let policy = Policy::default().with_overrides(lookup).unwrap();
        assert_eq!(policy.expected_status(Action::DeviceDelete, Some("editor")), 404);
        assert_eq!(policy.expected_status(Action::TemplateDelete, Some("editor")), 403);

        let err = Policy::default()
            .with_overrides(|key: &str| (key == "POLICY_WEATHER_LIST").then(|| "nobody".to_string()))
            .unwrap_err();
        assert_eq!(err.key, "POLICY_WEATHER_LIST");
        assert_eq!(err.source, RoleSetError::UnknownRole("nobody".to_string()));
    }

    #[test]
    fn action_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(action.name().parse::<Action>(), Ok(action));
        }
        assert!("device.explode".parse::<Action>().is_err());
        assert_eq!(Action::WeatherCollect.env_key(), "POLICY_WEATHER_COLLECT");
        assert_eq!(
            Action::DeviceDelete.probe_path(),
            "/api/devices/00000000-0000-0000-0000-000000000000"
        );
    }
}
