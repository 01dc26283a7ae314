//! Loads applied to elements.
//!
//! A load targets one element by identity and describes what it contributes
//! through a [`LoadContribution`]; the target element turns that description
//! into its local load vector. Essential boundary conditions are loads too:
//! they contribute nothing to the load vector and are collected as
//! constraints during assembly.

use crate::codec::{ReadContext, RecordReader, RecordWriter};
use crate::element::Element;
use crate::error::{Error, Result};
use crate::types::{ElementId, LoadId, Vec2};
use std::fmt;

/// What a load contributes to its target element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadContribution<'a> {
    /// Concentrated force on one local node, one component per nodal DOF.
    NodalForce { point: usize, force: &'a [f64] },
    /// Uniform acceleration acting on the element's mass.
    BodyForce { acceleration: Vec2 },
    /// Prescribed value of one local DOF.
    Constraint { dof: usize, value: f64 },
}

/// Load interface.
pub trait Load: Send + Sync + fmt::Debug {
    /// Persisted type tag of this variant.
    fn tag(&self) -> &'static str;

    /// Identity within the owning mesh.
    fn id(&self) -> LoadId;

    /// The element this load acts on.
    fn element_id(&self) -> ElementId;

    /// Describe this load's contribution to its element.
    fn contribution(&self) -> LoadContribution<'_>;

    /// Populate this instance from a record body.
    fn read(&mut self, record: &mut RecordReader<'_>, ctx: &ReadContext<'_>) -> Result<()>;

    /// Write the record body.
    fn write(&self, record: &mut RecordWriter);

    /// Check that this load fits the shape of its target element.
    fn validate(&self, element: &dyn Element) -> Result<()> {
        let ok = match self.contribution() {
            LoadContribution::NodalForce { point, force } => {
                point < element.n_nodes() && force.len() == element.dofs_per_node()
            }
            LoadContribution::BodyForce { .. } => true,
            LoadContribution::Constraint { dof, .. } => dof < element.n_dofs(),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::Mesh(format!(
                "{} {} does not fit {} element {}",
                self.tag(),
                self.id(),
                element.tag(),
                element.id()
            )))
        }
    }
}

/// Concentrated force on one node of an element.
///
/// Record body: `id element point n f1 .. fn`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadNode {
    id: LoadId,
    element: ElementId,
    point: usize,
    force: Vec<f64>,
}

impl LoadNode {
    /// Persisted type tag.
    pub const TAG: &'static str = "LoadNode";

    /// Create a nodal force on local node `point` of `element`.
    pub fn new(id: LoadId, element: ElementId, point: usize, force: Vec<f64>) -> Self {
        Self {
            id,
            element,
            point,
            force,
        }
    }

    /// Force components, one per nodal DOF.
    pub fn force(&self) -> &[f64] {
        &self.force
    }
}

impl Load for LoadNode {
    fn tag(&self) -> &'static str {
        Self::TAG
    }

    fn id(&self) -> LoadId {
        self.id
    }

    fn element_id(&self) -> ElementId {
        self.element
    }

    fn contribution(&self) -> LoadContribution<'_> {
        LoadContribution::NodalForce {
            point: self.point,
            force: &self.force,
        }
    }

    fn read(&mut self, record: &mut RecordReader<'_>, ctx: &ReadContext<'_>) -> Result<()> {
        self.id = LoadId(record.next_u32("load id")?);
        self.element = ctx.require_element(ElementId(record.next_u32("element id")?))?.id();
        self.point = record.next_usize("point index")?;
        let n = record.next_usize("force component count")?;
        self.force = (0..n)
            .map(|_| record.next_f64("force component"))
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn write(&self, record: &mut RecordWriter) {
        record
            .field(self.id)
            .field(self.element)
            .field(self.point)
            .field(self.force.len());
        for f in &self.force {
            record.field(f);
        }
    }
}

/// Uniform acceleration (gravity) over an element.
///
/// Record body: `id element gx gy`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadGravity {
    id: LoadId,
    element: ElementId,
    acceleration: Vec2,
}

impl LoadGravity {
    /// Persisted type tag.
    pub const TAG: &'static str = "LoadGravity";

    pub fn new(id: LoadId, element: ElementId, acceleration: Vec2) -> Self {
        Self {
            id,
            element,
            acceleration,
        }
    }
}

impl Default for LoadGravity {
    fn default() -> Self {
        Self::new(LoadId(0), ElementId(0), Vec2::zeros())
    }
}

impl Load for LoadGravity {
    fn tag(&self) -> &'static str {
        Self::TAG
    }

    fn id(&self) -> LoadId {
        self.id
    }

    fn element_id(&self) -> ElementId {
        self.element
    }

    fn contribution(&self) -> LoadContribution<'_> {
        LoadContribution::BodyForce {
            acceleration: self.acceleration,
        }
    }

    fn read(&mut self, record: &mut RecordReader<'_>, ctx: &ReadContext<'_>) -> Result<()> {
        self.id = LoadId(record.next_u32("load id")?);
        self.element = ctx.require_element(ElementId(record.next_u32("element id")?))?.id();
        let gx = record.next_f64("acceleration x")?;
        let gy = record.next_f64("acceleration y")?;
        self.acceleration = Vec2::new(gx, gy);
        Ok(())
    }

    fn write(&self, record: &mut RecordWriter) {
        record
            .field(self.id)
            .field(self.element)
            .field(self.acceleration.x)
            .field(self.acceleration.y);
    }
}

/// Prescribed value of one local DOF of an element.
///
/// Record body: `id element dof value`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadBc {
    id: LoadId,
    element: ElementId,
    dof: usize,
    value: f64,
}

impl LoadBc {
    /// Persisted type tag.
    pub const TAG: &'static str = "LoadBc";

    /// Fix local DOF `dof` of `element` to `value`.
    pub fn new(id: LoadId, element: ElementId, dof: usize, value: f64) -> Self {
        Self {
            id,
            element,
            dof,
            value,
        }
    }
}

impl Load for LoadBc {
    fn tag(&self) -> &'static str {
        Self::TAG
    }

    fn id(&self) -> LoadId {
        self.id
    }

    fn element_id(&self) -> ElementId {
        self.element
    }

    fn contribution(&self) -> LoadContribution<'_> {
        LoadContribution::Constraint {
            dof: self.dof,
            value: self.value,
        }
    }

    fn read(&mut self, record: &mut RecordReader<'_>, ctx: &ReadContext<'_>) -> Result<()> {
        self.id = LoadId(record.next_u32("load id")?);
        self.element = ctx.require_element(ElementId(record.next_u32("element id")?))?.id();
        self.dof = record.next_usize("local dof")?;
        self.value = record.next_f64("prescribed value")?;
        Ok(())
    }

    fn write(&self, record: &mut RecordWriter) {
        record
            .field(self.id)
            .field(self.element)
            .field(self.dof)
            .field(self.value);
    }
}
