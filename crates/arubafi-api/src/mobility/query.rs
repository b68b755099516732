use tracing::warn;

use crate::filter::{FilterExpression, FilterOp};
use crate::request::{Method, RequestSpec};

/// Query options of a configuration object call.
///
/// `profile_name` becomes a structured filter on
/// `<object>.profile-name`, where `<object>` is the last segment of the
/// endpoint. A raw `filter` replaces it entirely.
#[derive(Debug, Clone, Default)]
pub struct ObjectQuery {
    /// Config scope; the client's default applies when unset.
    pub config_path: Option<String>,
    pub profile_name: Option<String>,
    /// Operator for the `profile_name` filter, `$eq` when unset.
    pub filter_op: Option<FilterOp>,
    /// Raw filter text.
    pub filter: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub total: Option<u32>,
    pub count: Option<String>,
    pub sort: Option<String>,
}

impl ObjectQuery {
    /// Match a single profile by name.
    pub fn profile(name: impl Into<String>) -> Self {
        Self {
            profile_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn raw_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub(crate) fn into_spec(self, method: Method, endpoint: &str) -> RequestSpec {
        let object = endpoint
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(endpoint);

        let structured = match (self.profile_name, self.filter_op) {
            (Some(name), op) => Some(FilterExpression::structured(
                format!("{object}.profile-name"),
                op.unwrap_or_default(),
                name,
            )),
            (None, Some(op)) => {
                warn!(%op, "filter operator given without a profile name; ignored");
                None
            }
            (None, None) => None,
        };

        let mut spec = RequestSpec::new(method, endpoint)
            .param_opt("limit", self.limit)
            .param_opt("offset", self.offset)
            .param_opt("total", self.total)
            .param_opt("count", self.count)
            .param_opt("sort", self.sort);
        spec.scope = self.config_path;
        spec.filter = structured;
        spec.raw_filter = self.filter;
        spec
    }
}
