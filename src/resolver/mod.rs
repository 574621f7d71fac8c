//! Reference resolution.
//!
//! Documents reference each other by id. A stored reference is either a
//! stub (`{"_id": ...}` or a bare id) or an embedded copy of the target.
//! The [`Resolver`] replaces stubs with the documents they point to,
//! working on the JSON wire form so that fields the graph does not model
//! pass through untouched.
//!
//! Dangling references never fail a call: a missing target becomes `null`
//! in arrays, is dropped from relation maps, and leaves single references
//! as stubs. Only a store failure is returned as an error.

mod context;
mod fields;

use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::error::Result;
use crate::model::{is_stub_value, stub_value, value_id, Document, ObjectId};
use crate::storage::{Collection, DocumentStore};

pub use context::{ResolveOptions, ResolveReport};
pub use fields::{check_shape, field_specs, FieldKind, FieldSpec};

use context::ResolveContext;

/// A resolved document and what it took to resolve it.
#[derive(Debug, Clone)]
pub struct Resolution<T> {
    pub document: T,
    pub report: ResolveReport,
}

/// Outcome of following one reference.
enum Slot {
    Value(Value),
    Gone,
}

/// Resolves stub references against a document store.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn DocumentStore>,
    options: ResolveOptions,
}

impl Resolver {
    pub fn new(store: Arc<dyn DocumentStore>, options: ResolveOptions) -> Self {
        Self { store, options }
    }

    pub fn from_config(store: Arc<dyn DocumentStore>, config: &ResolverConfig) -> Self {
        Self::new(store, ResolveOptions::from(config))
    }

    /// A resolver sharing this store with different limits.
    pub fn with_options(&self, options: ResolveOptions) -> Self {
        Self::new(self.store.clone(), options)
    }

    pub fn options(&self) -> ResolveOptions {
        self.options
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Resolve the given fields of a wire document.
    pub async fn resolve_fields(
        &self,
        document: Value,
        specs: &[FieldSpec],
    ) -> Result<Resolution<Value>> {
        let mut ctx = ResolveContext::new(self.options);
        let document = self.resolve_document(document, specs, 0, &mut ctx).await?;
        Ok(Resolution {
            document,
            report: ctx.report,
        })
    }

    /// Resolve a wire document of `collection`.
    pub async fn resolve_value(
        &self,
        collection: Collection,
        document: Value,
    ) -> Result<Resolution<Value>> {
        let mut ctx = ResolveContext::new(self.options);
        if let Some(id) = value_id(&document) {
            ctx.visit(collection, &id);
        }
        let document = self
            .resolve_document(document, field_specs(collection), 0, &mut ctx)
            .await?;
        debug!(
            "Resolved {} document: {} fetched, {} missing, {} truncated",
            collection, ctx.report.fetched, ctx.report.missing, ctx.report.truncated
        );
        Ok(Resolution {
            document,
            report: ctx.report,
        })
    }

    /// Resolve a typed document.
    pub async fn resolve<T: Document>(&self, document: T) -> Result<Resolution<T>> {
        let value = serde_json::to_value(&document)?;
        let Resolution { document, report } = self.resolve_value(T::COLLECTION, value).await?;
        Ok(Resolution {
            document: serde_json::from_value(document)?,
            report,
        })
    }

    /// Load a document by id and resolve it.
    ///
    /// Returns `None` when the document does not exist or does not have
    /// the shape of `T`.
    pub async fn fetch<T: Document>(&self, id: &ObjectId) -> Result<Option<Resolution<T>>> {
        match self.load::<T>(id).await? {
            Some(document) => self.resolve(document).await.map(Some),
            None => Ok(None),
        }
    }

    /// Load several documents concurrently without resolving them.
    ///
    /// The result is positional: entry `i` belongs to `ids[i]`.
    pub async fn fetch_many<T: Document>(&self, ids: &[ObjectId]) -> Result<Vec<Option<T>>> {
        future::try_join_all(ids.iter().map(|id| self.load::<T>(id))).await
    }

    async fn load<T: Document>(&self, id: &ObjectId) -> Result<Option<T>> {
        let Some(stored) = self.store.get_by_id(T::COLLECTION, id).await? else {
            debug!("No {} document with id {}", T::COLLECTION, id);
            return Ok(None);
        };
        match stored.decode::<T>() {
            Ok(document) => Ok(Some(document)),
            Err(e) => {
                warn!("Treating {}/{} as missing: {}", T::COLLECTION, id, e);
                Ok(None)
            }
        }
    }

    fn resolve_document<'a>(
        &'a self,
        mut document: Value,
        specs: &'a [FieldSpec],
        level: usize,
        ctx: &'a mut ResolveContext,
    ) -> BoxFuture<'a, Result<Value>> {
        async move {
            let Some(map) = document.as_object_mut() else {
                return Ok(document);
            };

            for spec in specs {
                let Some(field) = map.get_mut(spec.name) else {
                    continue;
                };

                match spec.kind {
                    FieldKind::Single => {
                        let current = field.take();
                        *field = match self
                            .resolve_reference(spec.target, current.clone(), level + 1, ctx)
                            .await?
                        {
                            Slot::Value(value) => value,
                            Slot::Gone => current,
                        };
                    }
                    FieldKind::Array => {
                        let Value::Array(items) = field else {
                            continue;
                        };
                        for item in items.iter_mut() {
                            let current = item.take();
                            *item = match self
                                .resolve_reference(spec.target, current, level + 1, ctx)
                                .await?
                            {
                                Slot::Value(value) => value,
                                Slot::Gone => Value::Null,
                            };
                        }
                    }
                    FieldKind::MapOfArrays => {
                        let Value::Object(relations) = field else {
                            continue;
                        };
                        let mut merged = Map::new();
                        for (owner, entry) in std::mem::take(relations) {
                            let Value::Array(items) = entry else {
                                merged.insert(owner, entry);
                                continue;
                            };
                            let mut kept = Vec::with_capacity(items.len());
                            let mut dropped = 0;
                            for item in items {
                                match self
                                    .resolve_reference(spec.target, item, level + 1, ctx)
                                    .await?
                                {
                                    Slot::Value(value) => kept.push(value),
                                    Slot::Gone => dropped += 1,
                                }
                            }
                            if kept.is_empty() && dropped > 0 {
                                debug!("Dropping relation key {} from {}", owner, spec.name);
                            } else {
                                merged.insert(owner, Value::Array(kept));
                            }
                        }
                        *relations = merged;
                    }
                }
            }

            Ok(document)
        }
        .boxed()
    }

    fn resolve_reference<'a>(
        &'a self,
        target: Collection,
        value: Value,
        level: usize,
        ctx: &'a mut ResolveContext,
    ) -> BoxFuture<'a, Result<Slot>> {
        async move {
            if value.is_null() {
                return Ok(Slot::Gone);
            }

            if !is_stub_value(&value) {
                // Already resolved: pass through, following its own fields in
                // deep mode the first time it is seen.
                if ctx.descends_below(level) {
                    if let Some(id) = value_id(&value) {
                        if ctx.visit(target, &id) {
                            let document = self
                                .resolve_document(value, field_specs(target), level, ctx)
                                .await?;
                            return Ok(Slot::Value(document));
                        }
                    }
                }
                return Ok(Slot::Value(value));
            }

            let Some(id) = value_id(&value) else {
                warn!("Ignoring {} reference without a usable id: {}", target, value);
                ctx.report.invalid += 1;
                return Ok(Slot::Gone);
            };

            if ctx.options.deep && ctx.is_visited(target, &id) {
                debug!("Breaking reference cycle at {}/{}", target, id);
                ctx.report.cycles_broken += 1;
                return Ok(Slot::Value(stub_value(&id)));
            }

            if level > ctx.options.max_depth || ctx.budget_exhausted() {
                debug!("Resolution limit reached, leaving {}/{} as stub", target, id);
                ctx.report.truncated += 1;
                return Ok(Slot::Value(stub_value(&id)));
            }

            let Some(stored) = self.store.get_by_id(target, &id).await? else {
                debug!("Reference to missing {}/{}", target, id);
                ctx.report.missing += 1;
                return Ok(Slot::Gone);
            };
            ctx.report.fetched += 1;

            if let Err(e) = check_shape(&stored) {
                warn!("Treating {}/{} as missing: {}", target, id, e);
                ctx.report.invalid += 1;
                return Ok(Slot::Gone);
            }

            if ctx.options.deep {
                ctx.visit(target, &id);
            }

            if ctx.descends_below(level) {
                let document = self
                    .resolve_document(stored.body, field_specs(target), level, ctx)
                    .await?;
                Ok(Slot::Value(document))
            } else {
                Ok(Slot::Value(stored.body))
            }
        }
        .boxed()
    }
}
