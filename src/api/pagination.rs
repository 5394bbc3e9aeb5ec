use serde::{Deserialize, Serialize};

pub(crate) const MAX_LIMIT: i64 = 500;

pub(crate) const fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageQuery {
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

impl PageQuery {
    /// Offset and limit with negatives removed and the limit capped.
    pub(crate) fn bounds(&self) -> (i64, i64) {
        (self.skip.max(0), self.limit.clamp(1, MAX_LIMIT))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

impl<T> PaginatedResponse<T> {
    pub(crate) fn empty(skip: i64, limit: i64) -> Self {
        Self { items: Vec::new(), total_count: 0, skip, limit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_clamp_out_of_range_values() {
        let query: PageQuery = serde_json::from_str(r#"{"skip":-5,"limit":100000}"#).unwrap();
        assert_eq!(query.bounds(), (0, MAX_LIMIT));

        let query: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.bounds(), (0, default_limit()));
    }
}
