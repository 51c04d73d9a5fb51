//! # Object Catalog
//!
//! Immutable, in-memory collection of the records a server hands out.
//!
//! Records are keyed `"{category}_{sequence_id}"` (for example `cat_2`) and
//! kept in insertion order. Sequence ids are assigned per category by
//! [`CatalogBuilder`], starting at 1. Once built, a catalog is only ever read,
//! so sessions share it through an `Arc` without locking.

use std::collections::HashMap;
use std::fmt;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::protocol::message::ResultPayload;

/// Closed set of record kinds the server knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Cat,
    Dog,
    Human,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Cat, Category::Dog, Category::Human];

    /// Lowercase class name used in keys and queries
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Cat => "cat",
            Category::Dog => "dog",
            Category::Human => "human",
        }
    }

    /// Capitalised name used when printing records
    pub fn type_name(self) -> &'static str {
        match self {
            Category::Cat => "Cat",
            Category::Dog => "Dog",
            Category::Human => "Human",
        }
    }

    /// Case-insensitive lookup of a class name typed by a user
    pub fn from_class_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub category: Category,
    pub sequence_id: u32,
    pub display_name: String,
}

impl CatalogRecord {
    pub fn new(category: Category, sequence_id: u32, display_name: impl Into<String>) -> Self {
        Self {
            category,
            sequence_id,
            display_name: display_name.into(),
        }
    }

    pub fn key(&self) -> String {
        format!("{}_{}", self.category, self.sequence_id)
    }
}

impl fmt::Display for CatalogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(id={}, name={}, entity_type={})",
            self.category.type_name(),
            self.sequence_id,
            self.display_name,
            self.category
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<CatalogRecord>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// The twelve records every stock server starts with
    pub fn with_default_entries() -> Self {
        let mut builder = Self::builder();
        for name in ["Mruczek", "Luna", "Kleo", "Filemon"] {
            builder.add(Category::Cat, name);
        }
        for name in ["Reksio", "Azor", "Burek", "Nero"] {
            builder.add(Category::Dog, name);
        }
        for name in ["Adam", "Ewa", "Jan", "Anna"] {
            builder.add(Category::Human, name);
        }
        builder.build()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogRecord> {
        self.records.iter()
    }

    pub fn get(&self, key: &str) -> Option<&CatalogRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    pub fn contains(&self, record: &CatalogRecord) -> bool {
        self.get(&record.key()) == Some(record)
    }

    /// All records whose key starts with `prefix`, in insertion order
    pub fn find_by_prefix(&self, prefix: &str) -> Vec<CatalogRecord> {
        self.records
            .iter()
            .filter(|record| record.key().starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn random_record<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&CatalogRecord> {
        self.records.choose(rng)
    }

    /// Answer a query for `class_name`.
    ///
    /// The name is lowercased before matching. A non-empty match set becomes a
    /// collection; otherwise one record is drawn uniformly from the whole
    /// catalog. Only an empty catalog yields an empty collection.
    pub fn resolve_query<R: Rng + ?Sized>(&self, class_name: &str, rng: &mut R) -> ResultPayload {
        let requested = class_name.to_lowercase();
        let matches = self.find_by_prefix(&requested);
        if !matches.is_empty() {
            return ResultPayload::Collection(matches);
        }

        match self.random_record(rng) {
            Some(record) => ResultPayload::Single(record.clone()),
            None => ResultPayload::Collection(Vec::new()),
        }
    }
}

/// Assigns per-category sequence ids while a catalog is being assembled
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    records: Vec<CatalogRecord>,
    next_ids: HashMap<Category, u32>,
}

impl CatalogBuilder {
    pub fn add(&mut self, category: Category, display_name: impl Into<String>) -> &mut Self {
        let next = self.next_ids.entry(category).or_insert(0);
        *next += 1;
        self.records
            .push(CatalogRecord::new(category, *next, display_name));
        self
    }

    pub fn build(self) -> Catalog {
        let index = self
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.key(), i))
            .collect();
        Catalog {
            records: self.records,
            index,
        }
    }
}
