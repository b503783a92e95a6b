//! Radio signal power and loss calculations.
//!
//! Contains:
//! - dBm/mW and dB/ratio conversions
//! - Deterministic free-space (Friis) path loss and its inverse for range
//!   estimation
//! - Log-distance path loss with optional log-normal shadowing
//! - Obstacle loss along a propagation path through a physical environment
//!
//! Units:
//! - Power: dBm, mW (conversion provided)
//! - Frequency: Hz
//! - Distance: meters
//!
//! All loss computations return dimensionless power factors in `(0, 1]`,
//! where 1.0 means no attenuation. Conversion to dB is left to the caller.

use rand::thread_rng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

use crate::environment::PhysicalEnvironment;
use crate::geometry::{Coord, LineSegment};

/// Convert power from dBm (decibels relative to 1 milliwatt) to milliwatts.
///
/// # Formula
///
/// ```text
/// P(mW) = 10^(P(dBm) / 10)
/// ```
///
/// # Examples
///
/// ```text
/// 0 dBm   → 1 mW
/// 10 dBm  → 10 mW
/// -10 dBm → 0.1 mW
/// ```
pub fn dbm_to_mw(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0)
}

/// Convert power from milliwatts to dBm (decibels relative to 1 milliwatt).
///
/// # Formula
///
/// ```text
/// P(dBm) = 10 × log₁₀(P(mW))
/// ```
///
/// Inverse of [`dbm_to_mw`]. For `mw <= 0` the result is NaN or -∞; power
/// values should always be positive.
pub fn mw_to_dbm(mw: f64) -> f64 {
    10.0 * mw.log10()
}

/// Convert a dimensionless power ratio to decibels.
pub fn ratio_to_db(ratio: f64) -> f64 {
    10.0 * ratio.log10()
}

/// Convert decibels to a dimensionless power ratio.
pub fn db_to_ratio(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

/// Deterministic free-space path loss model (Friis transmission equation
/// with a distance exponent and a system loss factor).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FreeSpacePathLoss {
    /// Distance exponent (2.0 for ideal free space, larger for cluttered
    /// environments).
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// System loss factor L >= 1 covering hardware losses not related to
    /// propagation.
    #[serde(default = "default_system_loss")]
    pub system_loss: f64,
}

fn default_alpha() -> f64 {
    2.0
}

fn default_system_loss() -> f64 {
    1.0
}

impl Default for FreeSpacePathLoss {
    fn default() -> Self {
        FreeSpacePathLoss { alpha: default_alpha(), system_loss: default_system_loss() }
    }
}

impl FreeSpacePathLoss {
    /// Compute the path loss power factor for a link.
    ///
    /// # Formula
    ///
    /// ```text
    /// factor = λ² / (16 π² dᵅ L)   where λ = v / f
    /// ```
    ///
    /// # Parameters
    ///
    /// - `propagation_speed`: wave speed in the medium in m/s
    /// - `frequency`: carrier frequency in Hz
    /// - `distance`: transmitter-receiver distance in meters
    ///
    /// # Returns
    ///
    /// Dimensionless power factor clamped to at most 1.0. A non-positive
    /// distance (co-located antennas) yields 1.0, no loss.
    pub fn compute_path_loss(&self, propagation_speed: f64, frequency: f64, distance: f64) -> f64 {
        if distance <= 0.0 {
            return 1.0;
        }
        let wavelength = propagation_speed / frequency;
        let loss = wavelength * wavelength
            / (16.0 * std::f64::consts::PI * std::f64::consts::PI
                * distance.powf(self.alpha)
                * self.system_loss);
        loss.min(1.0)
    }

    /// Invert the model: the distance at which the path loss factor equals
    /// `loss_factor`.
    ///
    /// ```text
    /// d = (λ² / (16 π² L × factor))^(1/α)
    /// ```
    ///
    /// Used for communication and interference range estimation. A factor
    /// of 1.0 or more maps to distance 0.
    pub fn compute_range(&self, propagation_speed: f64, frequency: f64, loss_factor: f64) -> f64 {
        if loss_factor >= 1.0 {
            return 0.0;
        }
        let wavelength = propagation_speed / frequency;
        let d_alpha = wavelength * wavelength
            / (16.0 * std::f64::consts::PI * std::f64::consts::PI * self.system_loss * loss_factor);
        d_alpha.powf(1.0 / self.alpha)
    }
}

/// Log-distance path loss model with log-normal shadowing.
///
/// Statistical alternative to [`FreeSpacePathLoss`] for cluttered
/// environments where a deterministic model underestimates variance.
#[derive(Debug, Clone, Deserialize)]
pub struct LogDistancePathLoss {
    /// Path loss exponent (n). 2.0 for free space, 2.7 to 3.5 for urban
    /// areas, up to 5.0 indoors.
    pub path_loss_exponent: f64,
    /// Standard deviation of the log-normal shadowing term in dB. 0.0
    /// disables shadowing.
    pub shadowing_sigma: f64,
    /// Path loss at the 1 meter reference distance in dB.
    pub path_loss_at_reference_distance: f64,
}

impl LogDistancePathLoss {
    /// Calculate path loss in dB at `distance` meters.
    ///
    /// ```text
    /// PL(d) = PL(d₀) + 10 × n × log₁₀(d/d₀) + X_σ,  d₀ = 1 m
    /// ```
    ///
    /// Each call samples a fresh shadowing value, so repeated calls with
    /// the same distance yield different results when sigma is nonzero.
    /// Distances below the reference return the reference loss unchanged.
    pub fn compute_path_loss_db(&self, distance: f64) -> f64 {
        if distance < 1.0 {
            return self.path_loss_at_reference_distance;
        }
        let path_loss =
            self.path_loss_at_reference_distance + 10.0 * self.path_loss_exponent * distance.log10();
        let shadowing = if self.shadowing_sigma > 0.0 {
            match Normal::new(0.0_f64, self.shadowing_sigma) {
                Ok(normal) => normal.sample(&mut thread_rng()),
                Err(_) => 0.0,
            }
        } else {
            0.0
        };
        path_loss + shadowing
    }

    /// Path loss as a power factor in `(0, 1]` for combination with other
    /// loss terms.
    pub fn compute_path_loss(&self, distance: f64) -> f64 {
        db_to_ratio(-self.compute_path_loss_db(distance)).min(1.0)
    }
}

/// Obstacle loss along a straight propagation path.
///
/// For every physical object the path intersects, two effects are combined:
///
/// - Dielectric absorption over the traversed chord
/// - Fresnel reflection at the entry and exit faces
///
/// A path crossing no obstacle has a loss factor of exactly 1.0.
pub struct ObstacleLoss<'a> {
    environment: &'a PhysicalEnvironment,
}

impl<'a> ObstacleLoss<'a> {
    pub fn new(environment: &'a PhysicalEnvironment) -> Self {
        ObstacleLoss { environment }
    }

    /// Compute the total obstacle loss power factor between two positions
    /// at the given carrier frequency.
    ///
    /// Factors of all intersected objects multiply. A degenerate path
    /// (identical endpoints) traverses nothing and returns 1.0.
    pub fn compute_obstacle_loss(&self, frequency: f64, transmission_position: Coord, reception_position: Coord) -> f64 {
        let segment = LineSegment::new(transmission_position, reception_position);
        let Some(direction) = segment.direction() else {
            return 1.0;
        };
        let mut total = 1.0;
        for (object, hit) in self.environment.objects_intersecting(&segment) {
            let material = &object.material;

            // Absorption inside the material over the chord length:
            // exp(-atan(tanδ) · 2πf · d / v)
            let loss_tangent = material.dielectric_loss_tangent(frequency);
            let dielectric = (-loss_tangent.atan()
                * 2.0
                * std::f64::consts::PI
                * frequency
                * hit.distance()
                / material.propagation_speed())
            .exp();

            // Reflection transmittance at both crossed faces
            let entry =
                fresnel_transmittance(&direction, &hit.entry_normal, material.refractive_index());
            let exit =
                fresnel_transmittance(&direction, &hit.exit_normal, 1.0 / material.refractive_index());

            total *= dielectric * entry * exit;
        }
        total
    }
}

/// Power transmittance of an unpolarized wave crossing a dielectric face.
///
/// Averages the s and p polarization reflectances from the Fresnel
/// equations; `relative_index` is n2/n1 across the face. Total internal
/// reflection transmits nothing.
fn fresnel_transmittance(direction: &Coord, face_normal: &Coord, relative_index: f64) -> f64 {
    // Angle between the ray and the face normal, folded into [0, pi/2]
    let cos_incident = direction.dot(face_normal).abs().min(1.0);
    let sin_incident = (1.0 - cos_incident * cos_incident).sqrt();

    // Snell: sin θt = sin θi / (n2/n1)
    let sin_transmitted = sin_incident / relative_index;
    if sin_transmitted >= 1.0 {
        return 0.0;
    }
    let cos_transmitted = (1.0 - sin_transmitted * sin_transmitted).sqrt();

    let rs = (cos_incident - relative_index * cos_transmitted)
        / (cos_incident + relative_index * cos_transmitted);
    let rp = (relative_index * cos_incident - cos_transmitted)
        / (relative_index * cos_incident + cos_transmitted);
    let reflectance = (rs * rs + rp * rp) / 2.0;
    1.0 - reflectance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Material, PhysicalObject};
    use crate::geometry::Shape;

    const C: f64 = 299_792_458.0;

    fn brick() -> Material {
        Material {
            name: "brick".to_string(),
            relative_permittivity: 4.0,
            relative_permeability: 1.0,
            resistivity: 50.0,
        }
    }

    #[test]
    fn dbm_mw_conversion_roundtrip_reasonable() {
        for v in [-100.0, -50.0, 0.0, 10.0] {
            let mw = dbm_to_mw(v);
            assert!((mw_to_dbm(mw) - v).abs() < 1e-9);
        }
        assert!((db_to_ratio(ratio_to_db(0.25)) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn friis_loss_monotonic_in_distance_and_frequency() {
        let model = FreeSpacePathLoss::default();
        let near = model.compute_path_loss(C, 868e6, 10.0);
        let far = model.compute_path_loss(C, 868e6, 100.0);
        assert!(near > far);
        assert!(far > 0.0);

        let low_f = model.compute_path_loss(C, 868e6, 100.0);
        let high_f = model.compute_path_loss(C, 2.4e9, 100.0);
        assert!(low_f > high_f);
    }

    #[test]
    fn friis_loss_clamped_at_short_range() {
        let model = FreeSpacePathLoss::default();
        assert_eq!(model.compute_path_loss(C, 868e6, 0.0), 1.0);
        assert_eq!(model.compute_path_loss(C, 868e6, -5.0), 1.0);
        // Inside a fraction of a wavelength the formula exceeds unity and
        // must be clamped
        assert_eq!(model.compute_path_loss(C, 868e6, 0.001), 1.0);
    }

    #[test]
    fn friis_range_inverts_loss() {
        let model = FreeSpacePathLoss::default();
        let loss = model.compute_path_loss(C, 868e6, 250.0);
        let range = model.compute_range(C, 868e6, loss);
        assert!((range - 250.0).abs() < 1e-6);
        assert_eq!(model.compute_range(C, 868e6, 1.0), 0.0);
    }

    #[test]
    fn log_distance_reference_floor_and_growth() {
        let model = LogDistancePathLoss {
            path_loss_exponent: 2.0,
            shadowing_sigma: 0.0,
            path_loss_at_reference_distance: 40.0,
        };
        assert_eq!(model.compute_path_loss_db(0.5), 40.0);
        assert!((model.compute_path_loss_db(10.0) - 60.0).abs() < 1e-9);
        assert!(model.compute_path_loss(10.0) < model.compute_path_loss(2.0));
    }

    #[test]
    fn clear_path_has_unit_obstacle_loss() {
        let env = PhysicalEnvironment::new(
            Coord::ZERO,
            Coord::new(100.0, 100.0, 10.0),
            vec![PhysicalObject {
                id: 1,
                position: Coord::new(50.0, 50.0, 0.0),
                shape: Shape::Sphere { radius: 2.0 },
                material: brick(),
            }],
        );
        let loss = ObstacleLoss::new(&env);
        // Path well clear of the only obstacle
        assert_eq!(
            loss.compute_obstacle_loss(868e6, Coord::new(0.0, 0.0, 0.0), Coord::new(100.0, 0.0, 0.0)),
            1.0
        );
        // Degenerate path traverses nothing
        assert_eq!(
            loss.compute_obstacle_loss(868e6, Coord::new(50.0, 50.0, 0.0), Coord::new(50.0, 50.0, 0.0)),
            1.0
        );
    }

    #[test]
    fn obstructed_path_is_attenuated() {
        let env = PhysicalEnvironment::new(
            Coord::ZERO,
            Coord::new(100.0, 100.0, 10.0),
            vec![PhysicalObject {
                id: 1,
                position: Coord::new(50.0, 0.0, 0.0),
                shape: Shape::Cuboid { size: Coord::new(4.0, 4.0, 4.0) },
                material: brick(),
            }],
        );
        let loss = ObstacleLoss::new(&env);
        let factor =
            loss.compute_obstacle_loss(868e6, Coord::new(0.0, 0.0, 0.0), Coord::new(100.0, 0.0, 0.0));
        assert!(factor < 1.0);
        assert!(factor > 0.0);
    }

    #[test]
    fn thicker_obstacle_attenuates_more() {
        let make_env = |size: f64| {
            PhysicalEnvironment::new(
                Coord::ZERO,
                Coord::new(100.0, 100.0, 10.0),
                vec![PhysicalObject {
                    id: 1,
                    position: Coord::new(50.0, 0.0, 0.0),
                    shape: Shape::Cuboid { size: Coord::new(size, 4.0, 4.0) },
                    material: brick(),
                }],
            )
        };
        let thin_env = make_env(1.0);
        let thick_env = make_env(10.0);
        let a = Coord::new(0.0, 0.0, 0.0);
        let b = Coord::new(100.0, 0.0, 0.0);
        let thin = ObstacleLoss::new(&thin_env).compute_obstacle_loss(868e6, a, b);
        let thick = ObstacleLoss::new(&thick_env).compute_obstacle_loss(868e6, a, b);
        assert!(thick < thin);
    }
}
