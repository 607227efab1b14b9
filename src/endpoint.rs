//! Endpoint registry for the quality profiles API.
//!
//! Every public operation is described by a static [`Endpoint`] entry naming
//! its HTTP method, path and accepted parameters. Operations build a
//! [`RequestSpec`] against their entry and hand it to
//! [`SonarClient::execute`](crate::SonarClient::execute), which validates the
//! parameters against the table before anything goes over the wire.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SonarError};
use crate::pagination::Query;

/// HTTP method used by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// How request parameters are carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// URL query string.
    Query,
    /// `application/x-www-form-urlencoded` body.
    Form,
    /// `multipart/form-data` body with a file part.
    Multipart,
}

/// A single entry in the endpoint registry.
#[derive(Debug, PartialEq, Eq)]
pub struct Endpoint {
    /// Operation name, unique within the registry.
    pub name: &'static str,
    pub method: HttpMethod,
    pub encoding: Encoding,
    /// Path relative to the API base URL.
    pub path: &'static str,
    /// Every parameter the endpoint accepts.
    pub params: &'static [&'static str],
    /// Parameters that must be present.
    pub required: &'static [&'static str],
}

impl Endpoint {
    /// Returns true if the endpoint accepts the parameter.
    pub fn accepts(&self, param: &str) -> bool {
        self.params.contains(&param)
    }
}

pub const SEARCH: Endpoint = Endpoint {
    name: "search",
    method: HttpMethod::Get,
    encoding: Encoding::Query,
    path: "api/qualityprofiles/search",
    params: &["organization", "defaults", "language", "project", "qualityProfile"],
    required: &["organization"],
};

pub const SET_DEFAULT: Endpoint = Endpoint {
    name: "set_default",
    method: HttpMethod::Post,
    encoding: Encoding::Form,
    path: "api/qualityprofiles/set_default",
    params: &["language", "qualityProfile", "organization"],
    required: &["language", "qualityProfile", "organization"],
};

pub const ADD_PROJECT: Endpoint = Endpoint {
    name: "add_project",
    method: HttpMethod::Post,
    encoding: Encoding::Form,
    path: "api/qualityprofiles/add_project",
    params: &["project", "language", "qualityProfile", "organization"],
    required: &["project", "language", "qualityProfile", "organization"],
};

pub const REMOVE_PROJECT: Endpoint = Endpoint {
    name: "remove_project",
    method: HttpMethod::Post,
    encoding: Encoding::Form,
    path: "api/qualityprofiles/remove_project",
    params: &["project", "language", "qualityProfile", "organization"],
    required: &["project", "language", "qualityProfile", "organization"],
};

pub const BACKUP: Endpoint = Endpoint {
    name: "backup",
    method: HttpMethod::Get,
    encoding: Encoding::Query,
    path: "api/qualityprofiles/backup",
    params: &["language", "qualityProfile", "organization"],
    required: &["language", "qualityProfile", "organization"],
};

pub const CHANGE_PARENT: Endpoint = Endpoint {
    name: "change_parent",
    method: HttpMethod::Post,
    encoding: Encoding::Form,
    path: "api/qualityprofiles/change_parent",
    params: &[
        "parentQualityProfile",
        "language",
        "qualityProfile",
        "organization",
    ],
    required: &["language", "qualityProfile", "organization"],
};

pub const CHANGELOG: Endpoint = Endpoint {
    name: "changelog",
    method: HttpMethod::Get,
    encoding: Encoding::Query,
    path: "api/qualityprofiles/changelog",
    params: &[
        "language",
        "qualityProfile",
        "organization",
        "since",
        "to",
        "p",
        "ps",
    ],
    required: &["language", "qualityProfile", "organization"],
};

pub const CREATE: Endpoint = Endpoint {
    name: "create",
    method: HttpMethod::Post,
    encoding: Encoding::Form,
    path: "api/qualityprofiles/create",
    params: &["language", "name", "organization"],
    required: &["language", "name", "organization"],
};

pub const DELETE: Endpoint = Endpoint {
    name: "delete",
    method: HttpMethod::Post,
    encoding: Encoding::Form,
    path: "api/qualityprofiles/delete",
    params: &["language", "qualityProfile", "organization"],
    required: &["language", "qualityProfile", "organization"],
};

pub const EXPORT: Endpoint = Endpoint {
    name: "export",
    method: HttpMethod::Get,
    encoding: Encoding::Query,
    path: "api/qualityprofiles/export",
    params: &["organization", "exporterKey", "language", "qualityProfile"],
    required: &["organization"],
};

pub const EXPORTERS: Endpoint = Endpoint {
    name: "exporters",
    method: HttpMethod::Get,
    encoding: Encoding::Query,
    path: "api/qualityprofiles/exporters",
    params: &[],
    required: &[],
};

pub const INHERITANCE: Endpoint = Endpoint {
    name: "inheritance",
    method: HttpMethod::Get,
    encoding: Encoding::Query,
    path: "api/qualityprofiles/inheritance",
    params: &["language", "qualityProfile", "organization"],
    required: &["language", "qualityProfile", "organization"],
};

pub const RESTORE: Endpoint = Endpoint {
    name: "restore",
    method: HttpMethod::Post,
    encoding: Encoding::Multipart,
    path: "api/qualityprofiles/restore",
    params: &["backup", "organization"],
    required: &["backup", "organization"],
};

/// All quality profile endpoints.
pub static ENDPOINTS: &[&Endpoint] = &[
    &SEARCH,
    &SET_DEFAULT,
    &ADD_PROJECT,
    &REMOVE_PROJECT,
    &BACKUP,
    &CHANGE_PARENT,
    &CHANGELOG,
    &CREATE,
    &DELETE,
    &EXPORT,
    &EXPORTERS,
    &INHERITANCE,
    &RESTORE,
];

/// Look up an endpoint by operation name.
pub fn lookup(name: &str) -> Option<&'static Endpoint> {
    ENDPOINTS.iter().copied().find(|e| e.name == name)
}

/// A file uploaded as part of a multipart request.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: &'static str,
    pub file_name: String,
    pub content: Vec<u8>,
}

/// A request bound to a registry entry.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    endpoint: &'static Endpoint,
    params: Vec<(String, String)>,
    file: Option<FilePart>,
}

impl RequestSpec {
    /// Start a request for the given endpoint.
    pub fn new(endpoint: &'static Endpoint) -> Self {
        Self {
            endpoint,
            params: Vec::new(),
            file: None,
        }
    }

    /// Add a parameter.
    #[must_use]
    pub fn param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.push((name.to_string(), value.into()));
        self
    }

    /// Add a parameter only when a value is present.
    #[must_use]
    pub fn opt_param<V: Into<String>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self,
        }
    }

    /// Add every entry of a query.
    #[must_use]
    pub fn extend(mut self, query: &Query) -> Self {
        self.params
            .extend(query.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        self
    }

    /// Add the fields of a serializable parameter struct.
    ///
    /// Field names are taken as wire names; `None` fields are skipped and
    /// booleans and numbers are rendered as text.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` does not serialize to a flat object.
    pub fn params_from<S: Serialize + ?Sized>(mut self, params: &S) -> Result<Self> {
        let obj = match serde_json::to_value(params)? {
            Value::Object(obj) => obj,
            _ => {
                return Err(SonarError::DataContract {
                    field: "<params>".to_string(),
                })
            }
        };

        for (name, value) in obj {
            let value = match value {
                Value::Null => continue,
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(SonarError::DataContract { field: name })
                }
            };
            self.params.push((name, value));
        }

        Ok(self)
    }

    /// Attach a file part.
    #[must_use]
    pub fn file(mut self, field: &'static str, file_name: impl Into<String>, content: Vec<u8>) -> Self {
        self.file = Some(FilePart {
            field,
            file_name: file_name.into(),
            content,
        });
        self
    }

    pub fn endpoint(&self) -> &'static Endpoint {
        self.endpoint
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub(crate) fn into_parts(self) -> (&'static Endpoint, Vec<(String, String)>, Option<FilePart>) {
        (self.endpoint, self.params, self.file)
    }

    /// Value of a parameter, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Check the request against its registry entry.
    ///
    /// # Errors
    ///
    /// Returns [`SonarError::UnknownParameter`] for a parameter the endpoint
    /// does not accept and [`SonarError::MissingParameter`] for an absent
    /// required one.
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint;

        let supplied = self
            .params
            .iter()
            .map(|(k, _)| k.as_str())
            .chain(self.file.as_ref().map(|f| f.field));

        for name in supplied.clone() {
            if !endpoint.accepts(name) {
                return Err(SonarError::UnknownParameter {
                    endpoint: endpoint.name,
                    param: name.to_string(),
                });
            }
        }

        for required in endpoint.required {
            if !supplied.clone().any(|name| name == *required) {
                return Err(SonarError::MissingParameter {
                    endpoint: endpoint.name,
                    param: *required,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_names_are_unique() {
        for (i, a) in ENDPOINTS.iter().enumerate() {
            for b in &ENDPOINTS[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn test_required_params_are_accepted() {
        for endpoint in ENDPOINTS {
            for required in endpoint.required {
                assert!(
                    endpoint.accepts(required),
                    "{} requires unaccepted param {}",
                    endpoint.name,
                    required
                );
            }
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("changelog"), Some(&CHANGELOG));
        assert_eq!(lookup("restore").unwrap().encoding, Encoding::Multipart);
        assert!(lookup("activate_rule").is_none());
    }

    #[test]
    fn test_get_endpoints_use_query_encoding() {
        for endpoint in ENDPOINTS {
            if endpoint.method == HttpMethod::Get {
                assert_eq!(endpoint.encoding, Encoding::Query, "{}", endpoint.name);
            }
        }
    }

    #[test]
    fn test_validate_rejects_unknown_param() {
        let spec = RequestSpec::new(&DELETE)
            .param("language", "java")
            .param("qualityProfile", "Sonar way")
            .param("organization", "acme")
            .param("force", "true");

        match spec.validate() {
            Err(SonarError::UnknownParameter { endpoint, param }) => {
                assert_eq!(endpoint, "delete");
                assert_eq!(param, "force");
            }
            other => panic!("expected UnknownParameter, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_missing_required() {
        let spec = RequestSpec::new(&CREATE)
            .param("language", "java")
            .param("organization", "acme");

        match spec.validate() {
            Err(SonarError::MissingParameter { endpoint, param }) => {
                assert_eq!(endpoint, "create");
                assert_eq!(param, "name");
            }
            other => panic!("expected MissingParameter, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_counts_file_part_as_param() {
        let spec = RequestSpec::new(&RESTORE)
            .param("organization", "acme")
            .file("backup", "profile.xml", b"<profile/>".to_vec());
        assert!(spec.validate().is_ok());

        let spec = RequestSpec::new(&RESTORE).param("organization", "acme");
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_params_from_struct() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Params {
            organization: &'static str,
            defaults: bool,
            quality_profile: Option<&'static str>,
            language: Option<&'static str>,
        }

        let spec = RequestSpec::new(&SEARCH)
            .params_from(&Params {
                organization: "acme",
                defaults: true,
                quality_profile: Some("Sonar way"),
                language: None,
            })
            .unwrap();

        assert_eq!(spec.get("organization"), Some("acme"));
        assert_eq!(spec.get("defaults"), Some("true"));
        assert_eq!(spec.get("qualityProfile"), Some("Sonar way"));
        assert_eq!(spec.get("language"), None);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_params_from_rejects_nested_values() {
        let result = RequestSpec::new(&SEARCH)
            .params_from(&serde_json::json!({"organization": ["a", "b"]}));
        assert!(matches!(result, Err(SonarError::DataContract { .. })));
    }

    #[test]
    fn test_opt_param_skips_none() {
        let spec = RequestSpec::new(&EXPORT)
            .param("organization", "acme")
            .opt_param("exporterKey", None::<String>)
            .opt_param("language", Some("java"));

        assert_eq!(spec.get("language"), Some("java"));
        assert_eq!(spec.get("exporterKey"), None);
        assert_eq!(spec.params().len(), 2);
    }
}
