// SPDX-License-Identifier: Apache-2.0

use crate::errors::ApiError;
use lugline_model::{DeliveryStatus, Priority, Role};
use std::collections::BTreeMap;

pub const MAX_PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: usize,
    pub limit: usize,
}

impl PageParams {
    #[must_use]
    pub fn offset(&self) -> usize {
        (self.page - 1) * self.limit
    }

    #[must_use]
    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.limit)
    }
}

pub fn parse_page_params(
    query: &BTreeMap<String, String>,
    default_limit: usize,
) -> Result<PageParams, ApiError> {
    let page = match query.get("page") {
        Some(raw) => {
            let value = raw
                .parse::<usize>()
                .map_err(|_| ApiError::invalid_param("page", raw))?;
            if value == 0 {
                return Err(ApiError::invalid_param("page", raw));
            }
            value
        }
        None => 1,
    };
    let limit = match query.get("limit") {
        Some(raw) => {
            let value = raw
                .parse::<usize>()
                .map_err(|_| ApiError::invalid_param("limit", raw))?;
            if value == 0 || value > MAX_PAGE_LIMIT {
                return Err(ApiError::invalid_param("limit", raw));
            }
            value
        }
        None => default_limit,
    };
    Ok(PageParams { page, limit })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryFilters {
    pub status: Option<DeliveryStatus>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
}

pub fn parse_delivery_filters(query: &BTreeMap<String, String>) -> Result<DeliveryFilters, ApiError> {
    let status = match query.get("status") {
        Some(raw) => Some(
            DeliveryStatus::parse(raw).map_err(|_| ApiError::invalid_param("status", raw))?,
        ),
        None => None,
    };
    let priority = match query.get("priority") {
        Some(raw) => {
            Some(Priority::parse(raw).map_err(|_| ApiError::invalid_param("priority", raw))?)
        }
        None => None,
    };
    let search = query
        .get("search")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    Ok(DeliveryFilters {
        status,
        priority,
        search,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilters {
    pub role: Option<Role>,
    pub search: Option<String>,
}

pub fn parse_user_filters(query: &BTreeMap<String, String>) -> Result<UserFilters, ApiError> {
    let role = match query.get("role") {
        Some(raw) => Some(Role::parse(raw).map_err(|_| ApiError::invalid_param("role", raw))?),
        None => None,
    };
    let search = query
        .get("search")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    Ok(UserFilters { role, search })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn q(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let params = parse_page_params(&q(&[]), 10).unwrap();
        assert_eq!(params, PageParams { page: 1, limit: 10 });
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn page_and_limit_parse() {
        let params = parse_page_params(&q(&[("page", "3"), ("limit", "25")]), 10).unwrap();
        assert_eq!(params.page, 3);
        assert_eq!(params.limit, 25);
        assert_eq!(params.offset(), 50);
    }

    #[test]
    fn zero_and_oversize_are_rejected() {
        assert!(parse_page_params(&q(&[("page", "0")]), 10).is_err());
        assert!(parse_page_params(&q(&[("limit", "0")]), 10).is_err());
        assert!(parse_page_params(&q(&[("limit", "101")]), 10).is_err());
        assert!(parse_page_params(&q(&[("page", "abc")]), 10).is_err());
    }

    #[test]
    fn total_pages_rounds_up() {
        let params = PageParams { page: 1, limit: 10 };
        assert_eq!(params.total_pages(0), 0);
        assert_eq!(params.total_pages(10), 1);
        assert_eq!(params.total_pages(11), 2);
    }

    #[test]
    fn delivery_filters_parse() {
        let filters =
            parse_delivery_filters(&q(&[("status", "pending"), ("priority", "urgent")])).unwrap();
        assert_eq!(filters.status, Some(DeliveryStatus::Pending));
        assert_eq!(filters.priority, Some(Priority::Urgent));
        assert!(parse_delivery_filters(&q(&[("status", "lost")])).is_err());
    }

    #[test]
    fn blank_search_is_dropped() {
        let filters = parse_delivery_filters(&q(&[("search", "   ")])).unwrap();
        assert_eq!(filters.search, None);
        let filters = parse_user_filters(&q(&[("search", " dana ")])).unwrap();
        assert_eq!(filters.search.as_deref(), Some("dana"));
    }
}
