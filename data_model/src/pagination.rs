//! Query parameters for the backend's list endpoints: pagination, sorting,
//! filtering and free-text search.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::transaction::{TransactionStatus, TransactionType};

const PAGINATION_PAGE: &str = "page";
const PAGINATION_PAGE_SIZE: &str = "page_size";
const SORT_BY: &str = "sort_by";
const SORT_ORDER: &str = "order";
const FILTER_STATUS: &str = "status";
const FILTER_TYPE: &str = "type";
const SEARCH: &str = "search";

/// Structure for pagination requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Pagination {
    /// 1-based page index.
    pub page: Option<u32>,
    /// Items per page.
    pub page_size: Option<u32>,
}

impl Pagination {
    /// Constructs [`Pagination`].
    pub const fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self { page, page_size }
    }
}

impl From<Pagination> for Vec<(&'static str, String)> {
    fn from(pagination: Pagination) -> Self {
        let mut vec = Vec::new();
        if let Some(page) = pagination.page {
            vec.push((PAGINATION_PAGE, page.to_string()));
        }
        if let Some(page_size) = pagination.page_size {
            vec.push((PAGINATION_PAGE_SIZE, page_size.to_string()));
        }
        vec
    }
}

/// Direction of a sort.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    #[display(fmt = "asc")]
    Asc,
    /// Descending.
    #[display(fmt = "desc")]
    Desc,
}

/// Structure for sorting requests.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Sorting {
    /// Field to sort by.
    pub sort_by: Option<String>,
    /// Sort direction.
    pub order: Option<SortOrder>,
}

impl Sorting {
    /// Creates a sorting by the given field.
    pub fn by_field(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            sort_by: Some(field.into()),
            order: Some(order),
        }
    }
}

impl From<Sorting> for Vec<(&'static str, String)> {
    fn from(sorting: Sorting) -> Self {
        let mut vec = Vec::new();
        if let Some(field) = sorting.sort_by {
            vec.push((SORT_BY, field));
        }
        if let Some(order) = sorting.order {
            vec.push((SORT_ORDER, order.to_string()));
        }
        vec
    }
}

/// Combined query over a backend list endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ListQuery {
    /// Pagination window.
    pub pagination: Pagination,
    /// Sorting.
    pub sorting: Sorting,
    /// Restrict to one lifecycle state.
    pub status: Option<TransactionStatus>,
    /// Restrict to one transaction kind.
    pub tx_type: Option<TransactionType>,
    /// Free-text search over names and ids.
    pub search: Option<String>,
}

impl From<ListQuery> for Vec<(&'static str, String)> {
    fn from(query: ListQuery) -> Self {
        let mut vec: Vec<(&'static str, String)> = query.pagination.into();
        vec.extend(Vec::from(query.sorting));
        if let Some(status) = query.status {
            vec.push((FILTER_STATUS, status.to_string()));
        }
        if let Some(tx_type) = query.tx_type {
            vec.push((FILTER_TYPE, tx_type.to_string()));
        }
        if let Some(search) = query.search {
            vec.push((SEARCH, search));
        }
        vec
    }
}
