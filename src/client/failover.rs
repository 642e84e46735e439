//! Failover cursor over a tenant's ordered base URLs.

use std::sync::atomic::{AtomicUsize, Ordering};

use url::Url;

/// Ordered base URLs plus the index currently treated as primary.
///
/// The index is shared by every request on the tenant. Advancing is a
/// compare-and-swap from the index the failed attempt observed, so two
/// requests failing against the same URL move the cursor once, not twice.
#[derive(Debug)]
pub struct FailoverCursor {
    urls: Vec<Url>,
    index: AtomicUsize,
}

impl FailoverCursor {
    /// Create a cursor starting at the primary (first) URL.
    pub fn new(urls: Vec<Url>) -> Self {
        Self {
            urls,
            index: AtomicUsize::new(0),
        }
    }

    /// Number of configured base URLs.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Index of the base URL currently in use.
    pub fn index(&self) -> usize {
        self.index.load(Ordering::Acquire)
    }

    /// The base URL currently in use, with its index.
    pub fn current(&self) -> Option<(usize, &Url)> {
        let index = self.index();
        self.urls.get(index).map(|url| (index, url))
    }

    /// Move past `observed` to the next URL, wrapping at the end.
    ///
    /// Returns the index in effect afterwards. If another request already
    /// moved the cursor away from `observed`, its choice is kept.
    pub fn advance_from(&self, observed: usize) -> usize {
        if self.urls.is_empty() {
            return 0;
        }
        let next = (observed + 1) % self.urls.len();
        match self
            .index
            .compare_exchange(observed, next, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => next,
            Err(current) => current,
        }
    }

    /// Base URL at a given index.
    pub fn url(&self, index: usize) -> Option<&Url> {
        self.urls.get(index)
    }
}
