//! Force categories and their mixing rules
//!
//! A category is an open, user-named tag. Each category declares which
//! categories it blends with; a producer contributes to a query for
//! category `C` only when its own category is in `C`'s mixing set. The
//! set always contains the category itself, listed first.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a force category
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    /// Create a category id from a name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The category name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Built-in `force` category
    pub fn force() -> Self {
        Self::new("force")
    }

    /// Built-in `acceleration` category
    pub fn acceleration() -> Self {
        Self::new("acceleration")
    }

    /// Built-in `impulse` category
    pub fn impulse() -> Self {
        Self::new("impulse")
    }

    /// Built-in `velocity_change` category
    pub fn velocity_change() -> Self {
        Self::new("velocity_change")
    }

    /// Built-in `wind` category
    pub fn wind() -> Self {
        Self::new("wind")
    }

    /// Built-in `gravity` category
    pub fn gravity() -> Self {
        Self::new("gravity")
    }

    /// Built-in `generic` category
    pub fn generic() -> Self {
        Self::new("generic")
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for CategoryId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// How the physics collaborator applies a category's vector to a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceMode {
    /// Continuous force, mass dependent
    #[default]
    Force,
    /// Continuous acceleration, mass independent
    Acceleration,
    /// Instant impulse, mass dependent
    Impulse,
    /// Instant velocity change, mass independent
    VelocityChange,
}

/// A category and its mixing set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    id: CategoryId,
    mixes_with: Vec<CategoryId>,
    mode: ForceMode,
}

impl Category {
    /// Category that mixes only with itself
    pub fn new(id: impl Into<CategoryId>, mode: ForceMode) -> Self {
        let id = id.into();
        Self {
            mixes_with: vec![id.clone()],
            id,
            mode,
        }
    }

    /// Add categories to the mixing set
    #[must_use]
    pub fn with_mixes<I, C>(mut self, others: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CategoryId>,
    {
        for other in others {
            let other = other.into();
            if !self.mixes_with.contains(&other) {
                self.mixes_with.push(other);
            }
        }
        self
    }

    /// Category identity
    pub fn id(&self) -> &CategoryId {
        &self.id
    }

    /// Categories this one blends with, itself first
    pub fn mixes_with(&self) -> &[CategoryId] {
        &self.mixes_with
    }

    /// Force mode hint
    pub fn mode(&self) -> ForceMode {
        self.mode
    }

    /// Whether producers of `other` contribute to queries for this category
    pub fn accepts(&self, other: &CategoryId) -> bool {
        self.mixes_with.contains(other)
    }
}

/// Registry of known categories
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    categories: BTreeMap<CategoryId, Category>,
}

impl CategoryTable {
    /// Empty table; every category mixes only with itself
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding the built-in categories
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        for (id, mode) in [
            (CategoryId::force(), ForceMode::Force),
            (CategoryId::acceleration(), ForceMode::Acceleration),
            (CategoryId::impulse(), ForceMode::Impulse),
            (CategoryId::velocity_change(), ForceMode::VelocityChange),
            (CategoryId::wind(), ForceMode::Force),
            (CategoryId::gravity(), ForceMode::Acceleration),
            (CategoryId::generic(), ForceMode::Force),
        ] {
            table.insert(Category::new(id, mode));
        }
        table
    }

    /// Add or replace a category
    pub fn insert(&mut self, category: Category) {
        self.categories.insert(category.id.clone(), category);
    }

    /// Look up a category
    pub fn get(&self, id: &CategoryId) -> Option<&Category> {
        self.categories.get(id)
    }

    /// Iterate over known categories in name order
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    /// Number of known categories
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Whether a producer of category `producer` contributes to a query for `requested`
    ///
    /// Unknown categories mix only with themselves.
    pub fn mixes(&self, requested: &CategoryId, producer: &CategoryId) -> bool {
        match self.categories.get(requested) {
            Some(category) => category.accepts(producer),
            None => requested == producer,
        }
    }

    /// Force mode of a category, [`ForceMode::Force`] when unknown
    pub fn mode(&self, id: &CategoryId) -> ForceMode {
        self.categories.get(id).map_or(ForceMode::Force, Category::mode)
    }

    /// Categories that no other category names in its mixing set
    ///
    /// Such categories only ever blend with themselves. This is valid, and
    /// reported for diagnostics.
    pub fn isolated_categories(&self) -> Vec<CategoryId> {
        self.categories
            .keys()
            .filter(|id| {
                !self
                    .categories
                    .values()
                    .any(|other| other.id != **id && other.accepts(id))
            })
            .cloned()
            .collect()
    }
}
