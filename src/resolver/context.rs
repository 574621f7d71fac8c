//! Per-call resolution state and limits.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::ResolverConfig;
use crate::model::ObjectId;
use crate::storage::Collection;

/// Limits for one resolution call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Recurse into the reference fields of fetched documents.
    pub deep: bool,
    /// Deepest level at which references are still fetched. The fields of
    /// the document passed in are level 1.
    pub max_depth: usize,
    /// Maximum number of documents fetched.
    pub max_elements: usize,
}

impl ResolveOptions {
    pub fn shallow() -> Self {
        Self {
            deep: false,
            ..Self::default()
        }
    }

    pub fn deep() -> Self {
        Self {
            deep: true,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn with_max_elements(mut self, max_elements: usize) -> Self {
        self.max_elements = max_elements;
        self
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::from(&ResolverConfig::default())
    }
}

impl From<&ResolverConfig> for ResolveOptions {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            deep: config.deep,
            max_depth: config.max_depth.max(1),
            max_elements: config.max_elements,
        }
    }
}

/// What happened during one resolution call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveReport {
    /// Documents fetched from the store.
    pub fetched: usize,
    /// References whose target no longer exists.
    pub missing: usize,
    /// References whose target had the wrong shape or collection.
    pub invalid: usize,
    /// Repeat occurrences returned as stubs.
    pub cycles_broken: usize,
    /// References left as stubs because a limit was reached.
    pub truncated: usize,
}

impl ResolveReport {
    /// Whether every reachable reference was followed.
    pub fn is_complete(&self) -> bool {
        self.truncated == 0
    }

    /// Add the counters of another call.
    pub fn absorb(&mut self, other: &ResolveReport) {
        self.fetched += other.fetched;
        self.missing += other.missing;
        self.invalid += other.invalid;
        self.cycles_broken += other.cycles_broken;
        self.truncated += other.truncated;
    }
}

/// Visited set and counters, local to one call.
#[derive(Debug)]
pub(crate) struct ResolveContext {
    pub options: ResolveOptions,
    pub report: ResolveReport,
    visited: HashSet<(Collection, ObjectId)>,
}

impl ResolveContext {
    pub fn new(options: ResolveOptions) -> Self {
        Self {
            options,
            report: ResolveReport::default(),
            visited: HashSet::new(),
        }
    }

    /// Mark a document as visited. Returns false if it already was.
    pub fn visit(&mut self, collection: Collection, id: &ObjectId) -> bool {
        self.visited.insert((collection, id.clone()))
    }

    pub fn is_visited(&self, collection: Collection, id: &ObjectId) -> bool {
        self.visited.contains(&(collection, id.clone()))
    }

    pub fn budget_exhausted(&self) -> bool {
        self.report.fetched >= self.options.max_elements
    }

    /// Whether documents fetched at `level` have their own fields followed.
    pub fn descends_below(&self, level: usize) -> bool {
        self.options.deep && level < self.options.max_depth
    }
}
