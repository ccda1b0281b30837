//! Crawl frontier and visited set
//!
//! The frontier is a FIFO queue of `(url, depth)` entries. Admission is decided
//! when an entry is dequeued, and an admitted URL is marked visited before it
//! is handed to a worker, so no URL is ever dispatched twice.

use crate::url::{extract_domain, has_blacklisted_extension, is_allowed_host};
use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL waiting to be crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Absolute URL with the fragment stripped
    pub url: Url,

    /// Link distance from the seed (seed = 0)
    pub depth: u32,
}

impl FrontierEntry {
    pub fn new(mut url: Url, depth: u32) -> Self {
        url.set_fragment(None);
        Self { url, depth }
    }
}

/// Result of the admission predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accept,
    AlreadyVisited,
    TooDeep,
    DomainNotAllowed,
    BlacklistedExtension,
}

/// Bounds applied to every candidate URL
#[derive(Debug, Clone, Default)]
pub struct CrawlPolicy {
    pub max_depth: u32,

    /// Lower-cased hosts; empty means any host
    pub allowed_domains: Vec<String>,

    /// Lower-cased extensions with a leading dot
    pub blacklist_extensions: Vec<String>,
}

/// FIFO queue plus the set of URLs already dispatched
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
    policy: CrawlPolicy,
}

impl Frontier {
    pub fn new(policy: CrawlPolicy) -> Self {
        Self {
            queue: VecDeque::new(),
            visited: HashSet::new(),
            policy,
        }
    }

    /// Evaluates the admission checks in order
    ///
    /// 1. already visited
    /// 2. deeper than the maximum depth
    /// 3. host outside a non-empty allow-list
    /// 4. path ending with a blacklisted extension
    pub fn should_crawl(&self, entry: &FrontierEntry) -> Admission {
        if self.visited.contains(entry.url.as_str()) {
            return Admission::AlreadyVisited;
        }

        if entry.depth > self.policy.max_depth {
            return Admission::TooDeep;
        }

        if !self.policy.allowed_domains.is_empty() {
            let allowed = extract_domain(&entry.url)
                .map(|host| is_allowed_host(&self.policy.allowed_domains, &host))
                .unwrap_or(false);
            if !allowed {
                return Admission::DomainNotAllowed;
            }
        }

        if has_blacklisted_extension(&entry.url, &self.policy.blacklist_extensions) {
            return Admission::BlacklistedExtension;
        }

        Admission::Accept
    }

    /// Dequeues entries until one is admitted, marking it visited
    ///
    /// URLs rejected for their domain or extension are marked visited as well,
    /// since no later path to them can change the outcome. Depth rejections
    /// are not, because the same URL may turn up again at a shallower depth.
    pub fn next_admitted(&mut self) -> Option<FrontierEntry> {
        while let Some(entry) = self.queue.pop_front() {
            match self.should_crawl(&entry) {
                Admission::Accept => {
                    self.visited.insert(entry.url.as_str().to_string());
                    return Some(entry);
                }
                reason @ (Admission::AlreadyVisited | Admission::TooDeep) => {
                    tracing::trace!("Dropping {} ({:?})", entry.url, reason);
                }
                rejection => {
                    tracing::debug!("Rejected {}: {:?}", entry.url, rejection);
                    self.visited.insert(entry.url.as_str().to_string());
                }
            }
        }
        None
    }

    /// Enqueues an entry without any checks
    pub fn push(&mut self, entry: FrontierEntry) {
        self.queue.push_back(entry);
    }

    /// Folds the links of a completed page back into the queue
    ///
    /// Nothing is enqueued when the parent is already at the maximum depth.
    /// Returns the number of entries added.
    pub fn enqueue_links(&mut self, parent_depth: u32, links: Vec<Url>) -> usize {
        if parent_depth >= self.policy.max_depth {
            return 0;
        }

        let mut added = 0;
        for link in links {
            let entry = FrontierEntry::new(link, parent_depth + 1);
            if self.visited.contains(entry.url.as_str()) {
                continue;
            }
            // Blacklisted links never reach the queue.
            if has_blacklisted_extension(&entry.url, &self.policy.blacklist_extensions) {
                continue;
            }
            self.queue.push_back(entry);
            added += 1;
        }
        added
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        let mut url = url.clone();
        url.set_fragment(None);
        self.visited.contains(url.as_str())
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }
}
