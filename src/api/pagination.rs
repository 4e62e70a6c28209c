/// Page-by-page fetching of list endpoints
use log::debug;
use serde_json::{json, Value};
use std::future::Future;

use super::Params;
use crate::error::Result;

pub const DEFAULT_PER_PAGE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    pub per_page: usize,
    /// Stop once at least this many items have been fetched. `Some(0)` means no limit.
    pub limit: Option<usize>,
}

impl Default for PageOptions {
    fn default() -> Self {
        PageOptions {
            per_page: DEFAULT_PER_PAGE,
            limit: None,
        }
    }
}

impl PageOptions {
    pub fn with_limit(per_page: usize, limit: usize) -> Self {
        PageOptions {
            per_page,
            limit: Some(limit),
        }
    }
}

/// Fetch pages 1, 2, 3, ... strictly in sequence and concatenate them.
///
/// `fetch_page` receives `params` extended with `page` and `per_page`. The
/// first page is always fetched. The loop ends after the first empty page,
/// or once `limit` items have been collected. The limit is checked between
/// pages, so the last page is kept whole and the result may exceed it.
///
/// Any page failure is returned as is; items already fetched are discarded.
pub async fn fetch_all_pages<F, Fut>(
    params: &Params,
    options: PageOptions,
    mut fetch_page: F,
) -> Result<Vec<Value>>
where
    F: FnMut(Params) -> Fut,
    Fut: Future<Output = Result<Vec<Value>>>,
{
    let limit = options.limit.filter(|limit| *limit > 0);
    let mut items = Vec::new();
    let mut page = 1usize;

    loop {
        let mut page_params = params.clone();
        page_params.insert("per_page".to_string(), json!(options.per_page));
        page_params.insert("page".to_string(), json!(page));

        let chunk = fetch_page(page_params).await?;
        debug!("Fetched page {} with {} items", page, chunk.len());

        let exhausted = chunk.is_empty();
        items.extend(chunk);
        page += 1;

        if exhausted {
            break;
        }
        if limit.map_or(false, |limit| items.len() >= limit) {
            break;
        }
    }

    Ok(items)
}
