//! Physical environment model: materials and the obstacles made of them.
//!
//! The environment is a static snapshot for the whole run. Obstacle loss
//! queries it for the objects a propagation path crosses; material constants
//! feed the dielectric and reflection loss terms.

use crate::geometry::{Coord, Intersection, LineSegment, Shape};

/// Vacuum permittivity in F/m.
pub const VACUUM_PERMITTIVITY: f64 = 8.854_187_817e-12;

/// Speed of light in vacuum in m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Electromagnetic properties of an obstacle material.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    /// Relative permittivity (dimensionless, >= 1 for passive materials).
    pub relative_permittivity: f64,
    /// Relative permeability (dimensionless).
    pub relative_permeability: f64,
    /// Resistivity in ohm-meters; higher means less conductive loss.
    pub resistivity: f64,
}

impl Material {
    /// Dielectric loss tangent at `frequency` Hz:
    /// `1 / (2 pi f eps0 epsr rho)`.
    pub fn dielectric_loss_tangent(&self, frequency: f64) -> f64 {
        1.0 / (2.0
            * std::f64::consts::PI
            * frequency
            * VACUUM_PERMITTIVITY
            * self.relative_permittivity
            * self.resistivity)
    }

    /// Propagation speed of the wave inside the material in m/s:
    /// `c / sqrt(epsr * mur)`.
    pub fn propagation_speed(&self) -> f64 {
        SPEED_OF_LIGHT / (self.relative_permittivity * self.relative_permeability).sqrt()
    }

    /// Refractive index relative to air (sqrt of relative permittivity).
    pub fn refractive_index(&self) -> f64 {
        self.relative_permittivity.sqrt()
    }
}

/// An obstacle: a shape placed at a position, made of a single material.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalObject {
    pub id: u32,
    pub position: Coord,
    pub shape: Shape,
    pub material: Material,
}

/// Static collection of obstacles inside an axis-aligned space bound.
#[derive(Debug, Clone, Default)]
pub struct PhysicalEnvironment {
    pub space_min: Coord,
    pub space_max: Coord,
    pub objects: Vec<PhysicalObject>,
}

impl PhysicalEnvironment {
    pub fn new(space_min: Coord, space_max: Coord, objects: Vec<PhysicalObject>) -> Self {
        PhysicalEnvironment { space_min, space_max, objects }
    }

    pub fn object_by_id(&self, id: u32) -> Option<&PhysicalObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Length of the space diagonal, the longest straight path a signal can
    /// travel inside the bounds.
    pub fn diagonal(&self) -> f64 {
        self.space_min.distance_to(&self.space_max)
    }

    /// Objects the segment passes through, paired with the chord it cuts.
    pub fn objects_intersecting<'a>(
        &'a self,
        segment: &'a LineSegment,
    ) -> impl Iterator<Item = (&'a PhysicalObject, Intersection)> + 'a {
        self.objects
            .iter()
            .filter_map(move |object| {
                object.shape.intersection(object.position, segment).map(|hit| (object, hit))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concrete() -> Material {
        Material {
            name: "concrete".to_string(),
            relative_permittivity: 4.5,
            relative_permeability: 1.0,
            resistivity: 100.0,
        }
    }

    #[test]
    fn loss_tangent_decreases_with_frequency() {
        let m = concrete();
        let low = m.dielectric_loss_tangent(868e6);
        let high = m.dielectric_loss_tangent(2.4e9);
        assert!(low > high);
        assert!(low > 0.0);
    }

    #[test]
    fn propagation_speed_below_light_speed() {
        let m = concrete();
        let v = m.propagation_speed();
        assert!(v < SPEED_OF_LIGHT);
        assert!((v - SPEED_OF_LIGHT / 4.5_f64.sqrt()).abs() < 1.0);
    }

    #[test]
    fn environment_lookup_and_diagonal() {
        let env = PhysicalEnvironment::new(
            Coord::ZERO,
            Coord::new(3.0, 4.0, 0.0),
            vec![PhysicalObject {
                id: 7,
                position: Coord::new(1.0, 1.0, 0.0),
                shape: Shape::Sphere { radius: 0.5 },
                material: concrete(),
            }],
        );
        assert!(env.object_by_id(7).is_some());
        assert!(env.object_by_id(8).is_none());
        assert!((env.diagonal() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn segment_object_query() {
        let env = PhysicalEnvironment::new(
            Coord::ZERO,
            Coord::new(10.0, 10.0, 10.0),
            vec![
                PhysicalObject {
                    id: 1,
                    position: Coord::new(5.0, 1.0, 0.0),
                    shape: Shape::Sphere { radius: 0.5 },
                    material: concrete(),
                },
                PhysicalObject {
                    id: 2,
                    position: Coord::new(5.0, 5.0, 0.0),
                    shape: Shape::Sphere { radius: 0.5 },
                    material: concrete(),
                },
            ],
        );
        let through = LineSegment::new(Coord::new(0.0, 1.0, 0.0), Coord::new(10.0, 1.0, 0.0));
        let hits: Vec<_> = env.objects_intersecting(&through).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.id, 1);
        assert!((hits[0].1.distance() - 1.0).abs() < 1e-9);
    }
}
