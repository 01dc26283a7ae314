//! Type registry: persisted type tag -> constructor.
//!
//! The codec never names concrete element, material or load types. It asks
//! a [`Registry`] for an empty instance of whatever tag a record carries, so
//! new kinds are added by registering them, not by editing the reader.
//!
//! A process-wide registry is installed once with [`initialize`] (or lazily
//! with the built-in kinds by [`global`]) and is read-only afterwards.

use crate::element::{Bar2D, Beam2D, Element, Tri3};
use crate::error::{Error, Result};
use crate::load::{Load, LoadBc, LoadGravity, LoadNode};
use crate::material::{LinearElastic, Material};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Constructor of an empty element variant.
pub type ElementFactory = fn() -> Box<dyn Element>;
/// Constructor of an empty material variant.
pub type MaterialFactory = fn() -> Box<dyn Material>;
/// Constructor of an empty load variant.
pub type LoadFactory = fn() -> Box<dyn Load>;

/// Tag-to-constructor tables for every entity category.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    elements: HashMap<String, ElementFactory>,
    materials: HashMap<String, MaterialFactory>,
    loads: HashMap<String, LoadFactory>,
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Install the process-wide registry.
///
/// Only the first installation takes effect; later calls return the registry
/// already in place. Call this before any mesh is read.
pub fn initialize(registry: Registry) -> &'static Registry {
    let mut candidate = Some(registry);
    let installed = GLOBAL.get_or_init(|| candidate.take().unwrap_or_default());
    if candidate.is_some() {
        log::debug!("type registry already initialized; ignoring new registry");
    }
    installed
}

/// The process-wide registry, installing the built-in kinds on first use.
pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(Registry::with_builtins)
}

fn register<F>(table: &mut HashMap<String, F>, category: &str, tag: &str, factory: F) {
    if table.contains_key(tag) {
        log::debug!("{} type '{}' already registered", category, tag);
        return;
    }
    table.insert(tag.to_owned(), factory);
}

fn sorted_tags<F>(table: &HashMap<String, F>) -> Vec<&str> {
    let mut tags: Vec<&str> = table.keys().map(String::as_str).collect();
    tags.sort_unstable();
    tags
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in kind.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register_element(Bar2D::TAG, || Box::new(Bar2D::default()))
            .register_element(Beam2D::TAG, || Box::new(Beam2D::default()))
            .register_element(Tri3::TAG, || Box::new(Tri3::default()))
            .register_material(LinearElastic::TAG, || Box::new(LinearElastic::default()))
            .register_load(LoadNode::TAG, || Box::new(LoadNode::default()))
            .register_load(LoadGravity::TAG, || Box::new(LoadGravity::default()))
            .register_load(LoadBc::TAG, || Box::new(LoadBc::default()));
        registry
    }

    /// Register an element kind. Re-registering a tag keeps the first constructor.
    pub fn register_element(&mut self, tag: &str, factory: ElementFactory) -> &mut Self {
        register(&mut self.elements, "element", tag, factory);
        self
    }

    /// Register a material kind. Re-registering a tag keeps the first constructor.
    pub fn register_material(&mut self, tag: &str, factory: MaterialFactory) -> &mut Self {
        register(&mut self.materials, "material", tag, factory);
        self
    }

    /// Register a load kind. Re-registering a tag keeps the first constructor.
    pub fn register_load(&mut self, tag: &str, factory: LoadFactory) -> &mut Self {
        register(&mut self.loads, "load", tag, factory);
        self
    }

    /// Create an empty element of the given kind.
    pub fn create_element(&self, tag: &str) -> Result<Box<dyn Element>> {
        self.elements
            .get(tag)
            .map(|factory| factory())
            .ok_or_else(|| unknown("element", tag))
    }

    /// Create an empty material of the given kind.
    pub fn create_material(&self, tag: &str) -> Result<Box<dyn Material>> {
        self.materials
            .get(tag)
            .map(|factory| factory())
            .ok_or_else(|| unknown("material", tag))
    }

    /// Create an empty load of the given kind.
    pub fn create_load(&self, tag: &str) -> Result<Box<dyn Load>> {
        self.loads
            .get(tag)
            .map(|factory| factory())
            .ok_or_else(|| unknown("load", tag))
    }

    /// Registered element tags, sorted.
    pub fn element_tags(&self) -> Vec<&str> {
        sorted_tags(&self.elements)
    }

    /// Registered material tags, sorted.
    pub fn material_tags(&self) -> Vec<&str> {
        sorted_tags(&self.materials)
    }

    /// Registered load tags, sorted.
    pub fn load_tags(&self) -> Vec<&str> {
        sorted_tags(&self.loads)
    }
}

fn unknown(category: &'static str, tag: &str) -> Error {
    Error::UnknownType {
        category,
        tag: tag.to_owned(),
    }
}
