use utoipa::IntoParams;

/// Pagination window for list queries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct Paginated {
    /// Zero-based page index.
    #[serde(default)]
    pub page: u64,
    /// Maximum number of items per page.
    #[serde(default = "default::limit")]
    pub limit: u64,
}

impl Default for Paginated {
    fn default() -> Self {
        Self {
            page: 0,
            limit: default::limit(),
        }
    }
}

impl Paginated {
    pub fn offset(&self) -> u64 {
        self.page * self.limit
    }
}

mod default {
    pub(super) fn limit() -> u64 {
        20
    }
}
