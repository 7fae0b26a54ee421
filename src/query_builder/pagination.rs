//! Page number sources and the pagination envelope

use crate::database::types::Row;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::Serialize;

/// Supplies the requested page number, 1-based
pub trait PageSource: Send + Sync {
    fn page(&self) -> u64;
}

/// Always the same page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPage(pub u64);

impl Default for FixedPage {
    fn default() -> Self {
        FixedPage(1)
    }
}

impl PageSource for FixedPage {
    fn page(&self) -> u64 {
        self.0.max(1)
    }
}

/// Request query parameters (`page=3&sort=name`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    params: IndexMap<String, String>,
}

impl QueryParams {
    /// Parse an `application/x-www-form-urlencoded` query string; a leading
    /// `?` is accepted. Repeated keys keep the last value.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let params = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { params }
    }

    /// Parse the query part of a request target such as `/users?page=2#top`
    pub fn from_request_target(target: &str) -> Self {
        let without_fragment = target.split('#').next().unwrap_or_default();
        match without_fragment.split_once('?') {
            Some((_, query)) => Self::parse(query),
            None => Self::default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

impl PageSource for QueryParams {
    /// `page` as a positive integer; 1 when missing, zero, negative or not
    /// a number. Fractions are truncated.
    fn page(&self) -> u64 {
        self.get("page")
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|page| page.is_finite() && *page >= 1.0)
            .map(|page| page.trunc() as u64)
            .unwrap_or(1)
    }
}

/// One page of results with navigation metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginationEnvelope {
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
    pub next_page: Option<u64>,
    pub prev_page: Option<u64>,
    pub from: u64,
    pub to: u64,
    pub data: Vec<Row>,
}

/// Navigation numbers for `page` of `total` rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageWindow {
    pub offset: u64,
    pub last_page: u64,
    pub next_page: Option<u64>,
    pub prev_page: Option<u64>,
    pub from: u64,
    pub to: u64,
}

impl PageWindow {
    /// `page` and `per_page` are at least 1. A page whose row offset does
    /// not fit in a `u64` is an `InvalidArgument`.
    pub fn compute(total: u64, per_page: u64, page: u64) -> Result<Self> {
        let out_of_range = || {
            Error::invalid_argument(format!(
                "Page {} with {} rows per page is out of range",
                page, per_page
            ))
        };
        let offset = (page - 1).checked_mul(per_page).ok_or_else(out_of_range)?;
        let end = offset.checked_add(per_page).ok_or_else(out_of_range)?;
        let last_page = total.div_ceil(per_page);

        Ok(Self {
            offset,
            last_page,
            next_page: if page >= last_page { None } else { Some(page + 1) },
            prev_page: if page == 1 { None } else { Some(page - 1) },
            from: offset + 1,
            to: end.min(total),
        })
    }
}
