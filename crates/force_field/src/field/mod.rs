//! Force composition
//!
//! [`ForceField`] is the registry of active producers and the composition
//! engine that answers "what force applies at this point, for this
//! category?". It owns its producers; callers hold [`ProducerHandle`]s.
//!
//! Per category, eligible producers are split into two passes:
//!
//! * **Override** producers are visited in importance order and alpha
//!   composited front to back. Positive importances come first (highest
//!   first), then negative ones (largest magnitude first), then zero
//!   importance. Once coverage reaches 1 the rest are skipped. Whatever
//!   coverage remains is filled with a zero vector.
//! * **Additive** producers are summed, each scaled by its coverage.
//!
//! The category result is the sum of both passes. The field holds no
//! per-query state; every call samples the producers afresh.

mod blend;
#[cfg(test)]
mod scenarios;

pub use blend::AlphaAccumulator;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace, warn};
use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

use crate::category::{CategoryId, CategoryTable};
use crate::foundation::math::Vec3;
use crate::producer::{ForceProducer, ProducerError};
use crate::shape::ShapeError;

new_key_type! {
    /// Stable handle to a registered producer
    pub struct ProducerHandle;
}

/// Errors reported by the force field
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    /// The handle does not name a registered producer
    #[error("no producer registered for handle {0:?}")]
    UnknownHandle(ProducerHandle),

    /// A producer failed validation
    #[error("invalid producer: {0}")]
    Producer(#[from] ProducerError),

    /// A shape query failed during composition
    #[error("shape query failed: {0}")]
    Shape(#[from] ShapeError),
}

/// Producer counts for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldStats {
    /// Registered producers
    pub total: usize,
    /// Registered and enabled producers
    pub enabled: usize,
    /// Enabled override-mode producers
    pub override_mode: usize,
    /// Enabled additive-mode producers
    pub additive_mode: usize,
    /// Distinct categories among enabled producers
    pub categories: usize,
}

/// Evaluation rank of an importance value; lower ranks are visited first
fn importance_rank(importance: i32) -> (u8, i64) {
    let value = i64::from(importance);
    match importance.cmp(&0) {
        Ordering::Greater => (0, -value),
        Ordering::Less => (1, value),
        Ordering::Equal => (2, 0),
    }
}

/// Producer registry and composition engine
#[derive(Debug, Clone)]
pub struct ForceField {
    producers: SlotMap<ProducerHandle, ForceProducer>,
    order: Vec<ProducerHandle>,
    categories: CategoryTable,
}

impl Default for ForceField {
    fn default() -> Self {
        Self::new()
    }
}

impl ForceField {
    /// Empty field with the built-in categories
    pub fn new() -> Self {
        Self::with_categories(CategoryTable::with_defaults())
    }

    /// Empty field using the given category table
    pub fn with_categories(categories: CategoryTable) -> Self {
        Self {
            producers: SlotMap::with_key(),
            order: Vec::new(),
            categories,
        }
    }

    /// Category table
    pub fn categories(&self) -> &CategoryTable {
        &self.categories
    }

    /// Mutable category table
    pub fn categories_mut(&mut self) -> &mut CategoryTable {
        &mut self.categories
    }

    /// Validate and add a producer
    pub fn register(&mut self, producer: ForceProducer) -> Result<ProducerHandle, FieldError> {
        producer.validate()?;
        debug!(
            "Registering {} producer '{}' (category {}, importance {}, {})",
            producer.kind.name(),
            producer.label(),
            producer.category,
            producer.importance,
            if producer.additive { "additive" } else { "override" }
        );
        let handle = self.producers.insert(producer);
        self.order.push(handle);
        self.sort_order();
        Ok(handle)
    }

    /// Remove a producer; removing an unknown handle does nothing
    pub fn unregister(&mut self, handle: ProducerHandle) -> Option<ForceProducer> {
        let producer = self.producers.remove(handle)?;
        self.order.retain(|h| *h != handle);
        debug!("Unregistered producer '{}'", producer.label());
        Some(producer)
    }

    /// Whether the handle names a registered producer
    pub fn contains(&self, handle: ProducerHandle) -> bool {
        self.producers.contains_key(handle)
    }

    /// Look up a producer
    pub fn get(&self, handle: ProducerHandle) -> Option<&ForceProducer> {
        self.producers.get(handle)
    }

    /// Modify a producer in place
    ///
    /// The change is validated before it is kept; on failure the producer
    /// is left as it was. Evaluation order is recomputed afterwards since
    /// importance or mode may have changed.
    pub fn update_producer<F>(&mut self, handle: ProducerHandle, update: F) -> Result<(), FieldError>
    where
        F: FnOnce(&mut ForceProducer),
    {
        let producer = self
            .producers
            .get_mut(handle)
            .ok_or(FieldError::UnknownHandle(handle))?;

        let mut updated = producer.clone();
        update(&mut updated);
        updated.validate()?;
        *producer = updated;

        self.sort_order();
        Ok(())
    }

    /// Number of registered producers
    pub fn len(&self) -> usize {
        self.producers.len()
    }

    /// Whether no producer is registered
    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }

    /// Producers in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = (ProducerHandle, &ForceProducer)> {
        self.order
            .iter()
            .filter_map(move |&handle| self.producers.get(handle).map(|p| (handle, p)))
    }

    /// Invalidate cached shape data of every producer
    pub fn mark_all_dirty(&mut self) {
        for producer in self.producers.values_mut() {
            producer.mark_dirty();
        }
    }

    /// Recompute cached shape data of every producer
    pub fn refresh(&mut self) {
        for producer in self.producers.values_mut() {
            producer.refresh();
        }
    }

    fn sort_order(&mut self) {
        let producers = &self.producers;
        self.order
            .sort_by_key(|handle| producers.get(*handle).map_or((u8::MAX, 0), |p| importance_rank(p.importance)));
    }

    /// Producers that may contribute to `category` at `point`
    fn eligible<'a>(
        &'a self,
        point: Vec3,
        category: &'a CategoryId,
        layer: Option<u8>,
    ) -> impl Iterator<Item = &'a ForceProducer> + 'a {
        self.iter().map(|(_, p)| p).filter(move |p| {
            p.is_active()
                && p.matches_layer(layer)
                && self.categories.mixes(category, &p.category)
                && p.in_range(point)
        })
    }

    /// Importance-ordered alpha composite of the override producers
    pub fn query_weighted(
        &self,
        point: Vec3,
        category: &CategoryId,
        layer: Option<u8>,
    ) -> Result<Vec3, FieldError> {
        let mut acc = AlphaAccumulator::new();
        for producer in self.eligible(point, category, layer).filter(|p| p.is_override()) {
            if acc.is_opaque() {
                break;
            }
            let sample = producer.sample(point)?;
            if sample.strength > 0.0 {
                acc.composite(sample.vector, sample.strength);
                trace!(
                    "{category}: '{}' importance {} strength {:.3} -> alpha {:.3}",
                    producer.label(),
                    producer.importance,
                    sample.strength,
                    acc.alpha()
                );
            }
        }
        Ok(acc.finish())
    }

    /// Sum of the additive producers, each scaled by its coverage
    pub fn query_additive(
        &self,
        point: Vec3,
        category: &CategoryId,
        layer: Option<u8>,
    ) -> Result<Vec3, FieldError> {
        let mut total = Vec3::zeros();
        for producer in self.eligible(point, category, layer).filter(|p| p.additive) {
            let sample = producer.sample(point)?;
            if sample.strength > 0.0 {
                total += sample.weighted();
                trace!(
                    "{category}: additive '{}' strength {:.3}",
                    producer.label(),
                    sample.strength
                );
            }
        }
        Ok(total)
    }

    /// Combined force of a category at `point`
    ///
    /// `layer` restricts the query to producers acting on that layer; `None`
    /// considers every producer.
    pub fn query_category(
        &self,
        point: Vec3,
        category: &CategoryId,
        layer: Option<u8>,
    ) -> Result<Vec3, FieldError> {
        Ok(self.query_weighted(point, category, layer)? + self.query_additive(point, category, layer)?)
    }

    /// Combined force of every category an enabled producer can reach
    ///
    /// Agrees with [`ForceField::query_category`] for each returned
    /// category; see [`ForceField::reachable_categories`].
    pub fn query_all_categories(
        &self,
        point: Vec3,
        layer: Option<u8>,
    ) -> Result<BTreeMap<CategoryId, Vec3>, FieldError> {
        self.reachable_categories()
            .into_iter()
            .map(|category| {
                let force = self.query_category(point, &category, layer)?;
                Ok((category, force))
            })
            .collect()
    }

    /// Categories of enabled producers, in name order
    pub fn active_categories(&self) -> BTreeSet<CategoryId> {
        self.producers
            .values()
            .filter(|p| p.is_active())
            .map(|p| p.category.clone())
            .collect()
    }

    /// Categories of enabled producers plus every known category whose
    /// mixing set accepts one of them
    pub fn reachable_categories(&self) -> BTreeSet<CategoryId> {
        let active = self.active_categories();
        let mixed: Vec<CategoryId> = self
            .categories
            .iter()
            .map(|c| c.id())
            .filter(|id| active.iter().any(|a| self.categories.mixes(id, a)))
            .cloned()
            .collect();
        active.into_iter().chain(mixed).collect()
    }

    /// Producer categories that only ever blend with themselves
    pub fn isolated_categories(&self) -> Vec<CategoryId> {
        let isolated_known = self.categories.isolated_categories();
        self.producers
            .values()
            .map(|p| &p.category)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|c| self.categories.get(c).is_none() || isolated_known.contains(c))
            .cloned()
            .collect()
    }

    /// Producer counts
    pub fn stats(&self) -> FieldStats {
        let enabled: Vec<&ForceProducer> = self.producers.values().filter(|p| p.is_active()).collect();
        FieldStats {
            total: self.producers.len(),
            enabled: enabled.len(),
            override_mode: enabled.iter().filter(|p| p.is_override()).count(),
            additive_mode: enabled.iter().filter(|p| p.additive).count(),
            categories: self.active_categories().len(),
        }
    }

    /// Log producer counts and categories that blend only with themselves
    pub fn log_diagnostics(&self) {
        let stats = self.stats();
        debug!(
            "Force field: {} producers ({} enabled, {} override, {} additive) across {} categories",
            stats.total, stats.enabled, stats.override_mode, stats.additive_mode, stats.categories
        );
        for category in self.isolated_categories() {
            warn!("Category '{category}' is not mixed into any other category");
        }
    }
}
