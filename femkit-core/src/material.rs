//! Material property definitions.
//!
//! A material is a shared record of named scalar properties. Elements never
//! own a material; they hold its [`MaterialId`] and receive a `&dyn Material`
//! from the mesh when they compute their stiffness.

use crate::codec::{ReadContext, RecordReader, RecordWriter};
use crate::error::{Error, Result};
use crate::types::MaterialId;
use nalgebra::Matrix3;
use std::fmt;

/// Material interface.
///
/// Variants are constructed empty by the registry and populated by [`Material::read`].
pub trait Material: Send + Sync + fmt::Debug {
    /// Persisted type tag of this variant.
    fn tag(&self) -> &'static str;

    /// Identity within the owning mesh.
    fn id(&self) -> MaterialId;

    /// Look up a named scalar property.
    fn property(&self, name: &str) -> Option<f64>;

    /// Names of every property this variant carries, in persisted order.
    fn property_names(&self) -> &'static [&'static str];

    /// Populate this instance from a record body.
    fn read(&mut self, record: &mut RecordReader<'_>, ctx: &ReadContext<'_>) -> Result<()>;

    /// Write the record body.
    fn write(&self, record: &mut RecordWriter);

    /// Look up a property that an element cannot do without.
    fn require(&self, name: &str) -> Result<f64> {
        self.property(name).ok_or_else(|| {
            Error::InvalidMaterial(format!(
                "material {} ({}) has no property '{}'",
                self.id(),
                self.tag(),
                name
            ))
        })
    }
}

/// Isotropic linear elastic material.
///
/// Carries every property the built-in elements consume: bars read `E`, `A`
/// and `rho`, beams add `I`, triangles read `E`, `nu`, `h` and `rho`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearElastic {
    id: MaterialId,
    /// Young's modulus `E`.
    pub youngs_modulus: f64,
    /// Cross-sectional area `A`.
    pub area: f64,
    /// Second moment of area `I`.
    pub moment_of_inertia: f64,
    /// Poisson's ratio `nu`.
    pub poissons_ratio: f64,
    /// Plate thickness `h`.
    pub thickness: f64,
    /// Mass density `rho`.
    pub density: f64,
}

impl LinearElastic {
    /// Persisted type tag.
    pub const TAG: &'static str = "LinearElastic";

    const PROPERTIES: [&'static str; 6] = ["E", "A", "I", "nu", "h", "rho"];

    /// Create a new material with unit section properties.
    ///
    /// # Errors
    ///
    /// Returns error if material properties are physically invalid.
    pub fn new(id: MaterialId, youngs_modulus: f64, poissons_ratio: f64) -> Result<Self> {
        let material = Self {
            id,
            youngs_modulus,
            poissons_ratio,
            ..Self::default()
        };
        material.validate()?;
        Ok(material)
    }

    /// Set the cross-sectional area.
    pub fn with_area(mut self, area: f64) -> Result<Self> {
        self.area = area;
        self.validate()?;
        Ok(self)
    }

    /// Set the second moment of area.
    pub fn with_moment_of_inertia(mut self, moment_of_inertia: f64) -> Result<Self> {
        self.moment_of_inertia = moment_of_inertia;
        self.validate()?;
        Ok(self)
    }

    /// Set the plate thickness.
    pub fn with_thickness(mut self, thickness: f64) -> Result<Self> {
        self.thickness = thickness;
        self.validate()?;
        Ok(self)
    }

    /// Set the mass density.
    pub fn with_density(mut self, density: f64) -> Result<Self> {
        self.density = density;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.youngs_modulus <= 0.0 {
            return Err(Error::InvalidMaterial(
                "Young's modulus must be positive".into(),
            ));
        }
        if self.poissons_ratio <= -1.0 || self.poissons_ratio >= 0.5 {
            return Err(Error::InvalidMaterial(
                "Poisson's ratio must be in range (-1, 0.5)".into(),
            ));
        }
        if self.area <= 0.0 || self.thickness <= 0.0 {
            return Err(Error::InvalidMaterial(
                "area and thickness must be positive".into(),
            ));
        }
        if self.moment_of_inertia < 0.0 || self.density < 0.0 {
            return Err(Error::InvalidMaterial(
                "moment of inertia and density must not be negative".into(),
            ));
        }
        Ok(())
    }

    fn slot(&mut self, name: &str) -> Option<&mut f64> {
        match name {
            "E" => Some(&mut self.youngs_modulus),
            "A" => Some(&mut self.area),
            "I" => Some(&mut self.moment_of_inertia),
            "nu" => Some(&mut self.poissons_ratio),
            "h" => Some(&mut self.thickness),
            "rho" => Some(&mut self.density),
            _ => None,
        }
    }
}

impl Default for LinearElastic {
    fn default() -> Self {
        Self {
            id: MaterialId(0),
            youngs_modulus: 1.0,
            area: 1.0,
            moment_of_inertia: 1.0,
            poissons_ratio: 0.0,
            thickness: 1.0,
            density: 0.0,
        }
    }
}

impl Material for LinearElastic {
    fn tag(&self) -> &'static str {
        Self::TAG
    }

    fn id(&self) -> MaterialId {
        self.id
    }

    fn property(&self, name: &str) -> Option<f64> {
        match name {
            "E" => Some(self.youngs_modulus),
            "A" => Some(self.area),
            "I" => Some(self.moment_of_inertia),
            "nu" => Some(self.poissons_ratio),
            "h" => Some(self.thickness),
            "rho" => Some(self.density),
            _ => None,
        }
    }

    fn property_names(&self) -> &'static [&'static str] {
        &Self::PROPERTIES
    }

    fn read(&mut self, record: &mut RecordReader<'_>, _ctx: &ReadContext<'_>) -> Result<()> {
        self.id = MaterialId(record.next_u32("material id")?);
        let line = record.line();
        let mut seen = [false; Self::PROPERTIES.len()];
        while let Some((name, value)) = record.next_property()? {
            let Some(index) = Self::PROPERTIES.iter().position(|&p| p == name) else {
                return Err(Error::malformed(
                    line,
                    format!("unknown {} property '{}'", Self::TAG, name),
                ));
            };
            if std::mem::replace(&mut seen[index], true) {
                return Err(Error::malformed(
                    line,
                    format!("property '{}' given more than once", name),
                ));
            }
            if let Some(slot) = self.slot(name) {
                *slot = value;
            }
        }

        let missing: Vec<&str> = Self::PROPERTIES
            .iter()
            .zip(seen)
            .filter(|(_, seen)| !seen)
            .map(|(&name, _)| name)
            .collect();
        if !missing.is_empty() {
            return Err(Error::malformed(
                line,
                format!("{} {} is missing {}", Self::TAG, self.id, missing.join(", ")),
            ));
        }
        self.validate().map_err(|e| Error::malformed(line, e.to_string()))
    }

    fn write(&self, record: &mut RecordWriter) {
        record.field(self.id);
        for name in Self::PROPERTIES {
            if let Some(value) = self.property(name) {
                record.property(name, value);
            }
        }
    }
}

/// Plane stress constitutive matrix.
///
/// Returns a 3x3 matrix for [σ_xx, σ_yy, τ_xy] = D * [ε_xx, ε_yy, γ_xy].
pub fn constitutive_plane_stress(youngs_modulus: f64, poissons_ratio: f64) -> Matrix3<f64> {
    let e = youngs_modulus;
    let nu = poissons_ratio;

    let factor = e / (1.0 - nu * nu);

    #[rustfmt::skip]
    let d = Matrix3::new(
        factor,         factor * nu, 0.0,
        factor * nu,    factor,      0.0,
        0.0,            0.0,         factor * (1.0 - nu) / 2.0,
    );
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_material_creation() {
        let mat = LinearElastic::new(MaterialId(3), 200e9, 0.3).unwrap();
        assert_eq!(mat.id(), MaterialId(3));
        assert_relative_eq!(mat.youngs_modulus, 200e9);
        assert_relative_eq!(mat.poissons_ratio, 0.3);
        assert_relative_eq!(mat.area, 1.0);
    }

    #[test]
    fn test_invalid_youngs_modulus() {
        assert!(LinearElastic::new(MaterialId(0), -100e9, 0.3).is_err());
        assert!(LinearElastic::new(MaterialId(0), 0.0, 0.3).is_err());
    }

    #[test]
    fn test_invalid_poissons_ratio() {
        assert!(LinearElastic::new(MaterialId(0), 200e9, 0.5).is_err());
        assert!(LinearElastic::new(MaterialId(0), 200e9, -1.0).is_err());
    }

    #[test]
    fn test_invalid_section() {
        let mat = LinearElastic::new(MaterialId(0), 1.0, 0.0).unwrap();
        assert!(mat.clone().with_area(0.0).is_err());
        assert!(mat.clone().with_thickness(-1.0).is_err());
        assert!(mat.with_density(-1.0).is_err());
    }

    #[test]
    fn test_named_properties() {
        let mat = LinearElastic::new(MaterialId(0), 210.0, 0.25)
            .unwrap()
            .with_area(2.0)
            .unwrap();
        assert_eq!(mat.property("E"), Some(210.0));
        assert_eq!(mat.property("A"), Some(2.0));
        assert_eq!(mat.property("nu"), Some(0.25));
        assert_eq!(mat.property("bogus"), None);
        assert!(mat.require("bogus").is_err());
        for name in mat.property_names() {
            assert!(mat.property(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn test_plane_stress_symmetry() {
        let d = constitutive_plane_stress(200e9, 0.3);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(d[(i, j)], d[(j, i)], epsilon = 1e-10);
            }
        }
        assert_relative_eq!(d[(0, 0)], 200e9 / 0.91, max_relative = 1e-12);
    }
}
