// Request description and composition.
//
// `RequestSpec` is what a caller asks for; `compose` resolves it against
// an established session into the concrete method, URL, headers, query
// pairs and body that the transport sends.

use std::fmt;

use indexmap::IndexMap;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use secrecy::ExposeSecret;
use serde_json::Value;
use url::Url;

use crate::auth::{AuthMaterial, SessionHandle};
use crate::config::ConnectionConfig;
use crate::error::Error;
use crate::filter::{self, FilterExpression};
use crate::redact;

/// Query parameter carrying the Mobility Master session UID.
pub const UID_PARAM: &str = "UIDARUBA";
/// Query parameter carrying the built filter.
pub const FILTER_PARAM: &str = "filter";

/// HTTP method of a resource call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// POST, PUT and DELETE change upstream state and carry the CSRF token.
    pub fn is_state_changing(self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Delete => Self::DELETE,
        }
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Form(Vec<(String, String)>),
}

/// A resource call as described by the caller.
///
/// Query values may be unset; unset values are omitted from the wire,
/// never serialized as empty strings.
#[derive(Debug, Clone, Default)]
pub struct RequestSpec {
    pub method: Method,
    pub endpoint: String,
    /// Config scope (Mobility Master `config_path`).
    pub scope: Option<String>,
    pub query: IndexMap<String, Option<String>>,
    /// Structured filter clause.
    pub filter: Option<FilterExpression>,
    /// Raw filter text. Overrides `filter` when both are set.
    pub raw_filter: Option<String>,
    pub body: Option<Body>,
}

impl RequestSpec {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>, payload: Value) -> Self {
        Self::new(Method::Post, endpoint).json(payload)
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(key.into(), Some(value.to_string()));
        self
    }

    /// Add a parameter that may be unset. `None` is kept as a slot in the
    /// map but never sent.
    pub fn param_opt<T: ToString>(mut self, key: impl Into<String>, value: Option<T>) -> Self {
        self.query
            .insert(key.into(), value.map(|v| v.to_string()));
        self
    }

    pub fn filter(mut self, filter: FilterExpression) -> Self {
        match filter {
            FilterExpression::Raw(raw) => self.raw_filter = Some(raw),
            structured @ FilterExpression::Structured { .. } => self.filter = Some(structured),
        }
        self
    }

    pub fn raw_filter(mut self, raw: impl Into<String>) -> Self {
        self.raw_filter = Some(raw.into());
        self
    }

    pub fn json(mut self, payload: Value) -> Self {
        self.body = Some(Body::Json(payload));
        self
    }

    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Some(Body::Form(
            fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ));
        self
    }
}

/// A fully resolved request, ready for the transport.
///
/// The query is kept apart from `url` so that the URL can be logged and
/// put into errors without leaking query-borne tokens.
pub struct ComposedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl ComposedRequest {
    pub(crate) fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub(crate) fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// The URL with the query string applied, exactly as sent.
    pub fn full_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        url
    }

    /// Value of a query parameter, if present.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for ComposedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("query", &redact::redact(&format!("{:?}", self.query_string())))
            .finish_non_exhaustive()
    }
}

impl ComposedRequest {
    fn query_string(&self) -> String {
        self.query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Resolve `spec` against an established session.
///
/// Scope falls back to the config's default scope, then the backend's.
/// Auth material is attached per backend: the UID as a query parameter,
/// the CSRF token as a header on state-changing calls, or a bearer header.
pub fn compose(
    spec: &RequestSpec,
    session: &SessionHandle,
    config: &ConnectionConfig,
) -> Result<ComposedRequest, Error> {
    let backend = session.backend;
    let mut request = ComposedRequest::new(spec.method, join_endpoint(&session.base_url, &spec.endpoint)?);

    let scope = spec
        .scope
        .as_deref()
        .or(config.default_scope.as_deref())
        .or(backend.default_scope());
    if let Some(scope) = scope {
        let Some(param) = backend.scope_param() else {
            return Err(Error::Configuration {
                message: format!("{} has no config scope; got `{scope}`", backend.product_name()),
            });
        };
        request.query.push((param.to_owned(), scope.to_owned()));
    }

    match &session.auth {
        AuthMaterial::Uid(uid) => {
            request
                .query
                .push((UID_PARAM.to_owned(), uid.expose_secret().to_owned()));
        }
        AuthMaterial::Cookie { csrf } => {
            if let Some(csrf) = csrf.as_ref().filter(|_| spec.method.is_state_changing()) {
                let name = HeaderName::try_from(csrf.header.as_str()).map_err(|e| Error::Configuration {
                    message: format!("invalid CSRF header name: {e}"),
                })?;
                request.headers.insert(name, sensitive_header(csrf.value.expose_secret())?);
            }
        }
        AuthMaterial::Bearer(token) => {
            request.headers.insert(
                AUTHORIZATION,
                sensitive_header(&format!("Bearer {}", token.expose_secret()))?,
            );
        }
    }

    if let Some(active) = filter::select(spec.raw_filter.as_deref(), spec.filter.as_ref()) {
        request.query.push((FILTER_PARAM.to_owned(), active.build()?));
    }

    let reserved = [backend.scope_param(), Some(UID_PARAM), Some(FILTER_PARAM)];
    for (key, value) in &spec.query {
        if reserved.contains(&Some(key.as_str())) {
            return Err(Error::Configuration {
                message: format!("query parameter `{key}` is set by the client; use the dedicated field"),
            });
        }
        if let Some(value) = value {
            request.query.push((key.clone(), value.clone()));
        }
    }

    request.body.clone_from(&spec.body);
    Ok(request)
}

/// Join an endpoint onto the base URL with exactly one `/`.
pub(crate) fn join_endpoint(base: &Url, endpoint: &str) -> Result<Url, Error> {
    let base = base.as_str().trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    Ok(Url::parse(&format!("{base}/{endpoint}"))?)
}

fn sensitive_header(value: &str) -> Result<HeaderValue, Error> {
    let mut value = HeaderValue::from_str(value).map_err(|_| Error::Configuration {
        message: "auth material contains characters not allowed in a header".into(),
    })?;
    value.set_sensitive(true);
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::{Backend, CsrfToken};
    use crate::filter::FilterOp;
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;

    fn mm_session() -> SessionHandle {
        SessionHandle {
            backend: Backend::Mobility,
            auth: AuthMaterial::Uid(SecretString::from("uid-123")),
            expires_at: None,
            base_url: Url::parse("https://mm.example.net:4343/v1").unwrap(),
        }
    }

    fn pairs(request: &ComposedRequest) -> Vec<(&str, &str)> {
        request
            .query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn mobility_request_gets_scope_uid_and_filter() {
        let spec = RequestSpec::get("/configuration/object/ap_group").filter(FilterExpression::structured(
            "ap_group.profile-name",
            FilterOp::Eq,
            "default",
        ));
        let request = compose(&spec, &mm_session(), &ConnectionConfig::default()).unwrap();

        assert_eq!(
            request.url.as_str(),
            "https://mm.example.net:4343/v1/configuration/object/ap_group"
        );
        assert_eq!(
            pairs(&request),
            vec![
                ("config_path", "/md"),
                ("UIDARUBA", "uid-123"),
                ("filter", r#"[{"ap_group.profile-name":{"$eq":["default"]}}]"#),
            ]
        );
    }

    #[test]
    fn unset_params_are_omitted() {
        let spec = RequestSpec::get("configuration/object/ssid_prof")
            .param("limit", 10)
            .param_opt("offset", None::<u32>)
            .param_opt("sort", Some("+profile-name"));
        let request = compose(&spec, &mm_session(), &ConnectionConfig::default()).unwrap();
        assert_eq!(request.query_value("limit"), Some("10"));
        assert_eq!(request.query_value("offset"), None);
        assert_eq!(request.query_value("sort"), Some("+profile-name"));
    }

    #[test]
    fn raw_filter_gives_identical_url_whatever_the_structured_clause() {
        let raw = r#"[{"ap_group.profile-name": {"$in": ["a", "b"]}}]"#;
        let urls: Vec<String> = ["default", "other", ""]
            .into_iter()
            .map(|value| {
                let spec = RequestSpec::get("configuration/object/ap_group")
                    .filter(FilterExpression::structured("ap_group.profile-name", FilterOp::Neq, value))
                    .raw_filter(raw);
                compose(&spec, &mm_session(), &ConnectionConfig::default())
                    .unwrap()
                    .full_url()
                    .to_string()
            })
            .collect();
        assert!(urls.windows(2).all(|w| w[0] == w[1]), "{urls:?}");
    }

    #[test]
    fn explicit_scope_overrides_default() {
        let config = ConnectionConfig {
            default_scope: Some("/md/branch".into()),
            ..ConnectionConfig::default()
        };
        let from_config = compose(&RequestSpec::get("x"), &mm_session(), &config).unwrap();
        assert_eq!(from_config.query_value("config_path"), Some("/md/branch"));

        let explicit = compose(&RequestSpec::get("x").scope("/mm"), &mm_session(), &config).unwrap();
        assert_eq!(explicit.query_value("config_path"), Some("/mm"));
    }

    #[test]
    fn reserved_params_are_rejected() {
        let spec = RequestSpec::get("x").param("UIDARUBA", "forged");
        assert!(matches!(
            compose(&spec, &mm_session(), &ConnectionConfig::default()),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn csrf_only_on_state_changing_calls() {
        let session = SessionHandle {
            backend: Backend::AirWave,
            auth: AuthMaterial::Cookie {
                csrf: Some(CsrfToken {
                    header: "X-BISCOTTI".into(),
                    value: SecretString::from("biscotti"),
                }),
            },
            expires_at: None,
            base_url: Url::parse("https://amp.example.net/").unwrap(),
        };
        let config = ConnectionConfig::default();

        let get = compose(&RequestSpec::get("ap_list.xml"), &session, &config).unwrap();
        assert!(get.headers.get("x-biscotti").is_none());
        assert!(get.query.is_empty());
        assert_eq!(get.url.as_str(), "https://amp.example.net/ap_list.xml");

        let post = compose(&RequestSpec::post("api/ap", Value::Null), &session, &config).unwrap();
        assert_eq!(post.headers.get("x-biscotti").unwrap(), "biscotti");
    }

    #[test]
    fn scope_on_scopeless_backend_is_an_error() {
        let session = SessionHandle {
            backend: Backend::Central,
            auth: AuthMaterial::Bearer(SecretString::from("tok")),
            expires_at: None,
            base_url: Url::parse("https://central.example.net/").unwrap(),
        };
        let spec = RequestSpec::get("monitoring/v1/aps").scope("/md");
        assert!(matches!(
            compose(&spec, &session, &ConnectionConfig::default()),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn bearer_header_is_sensitive() {
        let session = SessionHandle {
            backend: Backend::Central,
            auth: AuthMaterial::Bearer(SecretString::from("tok")),
            expires_at: None,
            base_url: Url::parse("https://central.example.net/").unwrap(),
        };
        let request = compose(&RequestSpec::get("monitoring/v1/aps"), &session, &ConnectionConfig::default()).unwrap();
        let header = request.headers.get(AUTHORIZATION).unwrap();
        assert_eq!(header, "Bearer tok");
        assert!(header.is_sensitive());
        assert!(!format!("{request:?}").contains("tok\""));
    }

    #[test]
    fn debug_output_hides_the_uid() {
        let request = compose(&RequestSpec::get("x"), &mm_session(), &ConnectionConfig::default()).unwrap();
        assert!(!format!("{request:?}").contains("uid-123"));
    }
}
