//! Scene loading, parsing, and validation.
//!
//! A scene JSON file describes the static world: the space bounds, the
//! material palette, the obstacles placed in the space, and the radios
//! with their transmit power and receiver parameters. The medium-level
//! knobs (propagation speed, noise floor, codec stages) live in a separate
//! TOML config so the same scene can be run under different channel
//! conditions.

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;

use crate::codec::CodecConfig;
use crate::environment::{Material, PhysicalEnvironment, PhysicalObject, SPEED_OF_LIGHT};
use crate::geometry::{Coord, Shape};
use crate::medium::{RadioId, Receiver};
use crate::signal::FreeSpacePathLoss;

/// Error type for scene and config loading failures.
#[derive(Debug)]
pub enum SceneLoadError {
    FileReadError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for SceneLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneLoadError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            SceneLoadError::ParseError(msg) => write!(f, "Failed to parse: {}", msg),
            SceneLoadError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for SceneLoadError {}

/// Material definition as it appears in the scene file.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneMaterial {
    pub name: String,
    pub relative_permittivity: f64,
    #[serde(default = "default_permeability")]
    pub relative_permeability: f64,
    pub resistivity: f64,
}

fn default_permeability() -> f64 {
    1.0
}

/// Obstacle placement referencing a material by name.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneObject {
    pub id: u32,
    pub position: Coord,
    pub shape: Shape,
    pub material: String,
}

/// Radio placement with its receiver parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneRadio {
    pub id: RadioId,
    pub position: Coord,
    /// Transmit power in dBm.
    pub power_dbm: f64,
    pub receiver: Receiver,
}

/// Root structure representing the entire scene.
#[derive(Debug, Deserialize)]
pub struct Scene {
    /// Lower corner of the axis-aligned world space, in meters.
    pub space_min: Coord,
    /// Upper corner of the world space.
    pub space_max: Coord,
    #[serde(default)]
    pub materials: Vec<SceneMaterial>,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    pub radios: Vec<SceneRadio>,
}

/// Medium configuration, loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct MediumConfig {
    /// Signal propagation speed in m/s.
    #[serde(default = "default_propagation_speed")]
    pub propagation_speed: f64,
    /// Thermal noise floor in dBm.
    pub background_noise_dbm: f64,
    /// Signals below this power are ignored even as interference, in dBm.
    pub interference_floor_dbm: f64,
    #[serde(default)]
    pub path_loss: FreeSpacePathLoss,
    #[serde(default)]
    pub codec: CodecConfig,
}

fn default_propagation_speed() -> f64 {
    SPEED_OF_LIGHT
}

impl MediumConfig {
    /// Load a medium configuration from a TOML file.
    pub fn load(path: &str) -> Result<MediumConfig, SceneLoadError> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path))
            .map_err(|e| SceneLoadError::FileReadError(e.to_string()))?;
        let config: MediumConfig = toml::from_str(&data)
            .context("Invalid TOML format")
            .map_err(|e| SceneLoadError::ParseError(e.to_string()))?;
        validate_config(&config).map_err(SceneLoadError::ValidationError)?;
        Ok(config)
    }
}

/// Load, parse, and validate a scene from a JSON file.
pub fn load_scene(path: &str) -> Result<Scene, SceneLoadError> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path))
        .map_err(|e| SceneLoadError::FileReadError(e.to_string()))?;

    let scene: Scene = serde_json::from_str(&data)
        .context("Invalid JSON format")
        .map_err(|e| SceneLoadError::ParseError(e.to_string()))?;

    validate_scene(&scene).map_err(SceneLoadError::ValidationError)?;
    Ok(scene)
}

/// Validate a parsed scene.
///
/// # Returns
///
/// `Ok(())` if validation passes, `Err(String)` with a description of the
/// first problem otherwise.
pub fn validate_scene(scene: &Scene) -> Result<(), String> {
    const MAX_RADIOS: usize = 10_000;
    const MIN_POWER_DBM: f64 = -50.0;
    const MAX_POWER_DBM: f64 = 50.0;

    if scene.space_min.x >= scene.space_max.x
        || scene.space_min.y >= scene.space_max.y
        || scene.space_min.z > scene.space_max.z
    {
        return Err("World space is empty: space_min must lie below space_max".to_string());
    }

    if scene.radios.is_empty() {
        return Err("Scene must contain at least one radio".to_string());
    }
    if scene.radios.len() > MAX_RADIOS {
        return Err(format!("Radio count {} exceeds maximum of {}", scene.radios.len(), MAX_RADIOS));
    }

    let mut radio_ids = HashSet::new();
    for radio in &scene.radios {
        if !radio_ids.insert(radio.id) {
            return Err(format!("Duplicate radio id found: {}", radio.id));
        }
        if !position_in_bounds(&radio.position, scene) {
            return Err(format!(
                "{} position ({}, {}, {}) lies outside the world space",
                radio.id, radio.position.x, radio.position.y, radio.position.z
            ));
        }
        if radio.power_dbm < MIN_POWER_DBM || radio.power_dbm > MAX_POWER_DBM {
            return Err(format!(
                "{} power {} dBm outside realistic range ({} to {} dBm)",
                radio.id, radio.power_dbm, MIN_POWER_DBM, MAX_POWER_DBM
            ));
        }
        if radio.receiver.carrier_frequency <= 0.0 || radio.receiver.bandwidth <= 0.0 {
            return Err(format!("{} has a non-positive carrier frequency or bandwidth", radio.id));
        }
    }

    let mut material_names = HashSet::new();
    for material in &scene.materials {
        if !material_names.insert(material.name.as_str()) {
            return Err(format!("Duplicate material name: {}", material.name));
        }
        if material.relative_permittivity < 1.0
            || material.relative_permeability <= 0.0
            || material.resistivity <= 0.0
        {
            return Err(format!("Material {} has non-physical constants", material.name));
        }
    }

    let mut object_ids = HashSet::new();
    for object in &scene.objects {
        if !object_ids.insert(object.id) {
            return Err(format!("Duplicate object id found: {}", object.id));
        }
        if !material_names.contains(object.material.as_str()) {
            return Err(format!(
                "Object {} references unknown material '{}'",
                object.id, object.material
            ));
        }
        validate_shape(object)?;
    }

    Ok(())
}

fn validate_shape(object: &SceneObject) -> Result<(), String> {
    match &object.shape {
        Shape::Cuboid { size } => {
            if size.x <= 0.0 || size.y <= 0.0 || size.z <= 0.0 {
                return Err(format!("Object {} cuboid has a non-positive edge", object.id));
            }
        }
        Shape::Sphere { radius } => {
            if *radius <= 0.0 {
                return Err(format!("Object {} sphere has a non-positive radius", object.id));
            }
        }
        Shape::Prism { base, height } => {
            if *height <= 0.0 {
                return Err(format!("Object {} prism has a non-positive height", object.id));
            }
            if base.len() < 3 {
                return Err(format!(
                    "Object {} prism base needs at least 3 vertices, has {}",
                    object.id,
                    base.len()
                ));
            }
            // Intersection clipping assumes a convex counter-clockwise base
            for i in 0..base.len() {
                let (x1, y1) = base[i];
                let (x2, y2) = base[(i + 1) % base.len()];
                let (x3, y3) = base[(i + 2) % base.len()];
                let cross = (x2 - x1) * (y3 - y2) - (y2 - y1) * (x3 - x2);
                if cross <= 0.0 {
                    return Err(format!(
                        "Object {} prism base must be convex and counter-clockwise",
                        object.id
                    ));
                }
            }
        }
    }
    Ok(())
}

fn position_in_bounds(position: &Coord, scene: &Scene) -> bool {
    position.x >= scene.space_min.x
        && position.x <= scene.space_max.x
        && position.y >= scene.space_min.y
        && position.y <= scene.space_max.y
        && position.z >= scene.space_min.z
        && position.z <= scene.space_max.z
}

fn validate_config(config: &MediumConfig) -> Result<(), String> {
    if config.propagation_speed <= 0.0 {
        return Err("propagation_speed must be positive".to_string());
    }
    if config.path_loss.alpha < 1.0 {
        return Err(format!("path loss alpha {} below 1.0 is non-physical", config.path_loss.alpha));
    }
    if config.path_loss.system_loss < 1.0 {
        return Err("path loss system_loss must be at least 1.0".to_string());
    }
    if config.interference_floor_dbm > config.background_noise_dbm {
        return Err(
            "interference_floor_dbm above background_noise_dbm would drop audible interferers"
                .to_string(),
        );
    }
    Ok(())
}

impl Scene {
    /// Resolve material references and build the physical environment.
    ///
    /// Assumes the scene has been validated; unknown material names were
    /// rejected there.
    pub fn build_environment(&self) -> PhysicalEnvironment {
        let objects = self
            .objects
            .iter()
            .filter_map(|object| {
                let material = self.materials.iter().find(|m| m.name == object.material)?;
                Some(PhysicalObject {
                    id: object.id,
                    position: object.position,
                    shape: object.shape.clone(),
                    material: Material {
                        name: material.name.clone(),
                        relative_permittivity: material.relative_permittivity,
                        relative_permeability: material.relative_permeability,
                        resistivity: material.resistivity,
                    },
                })
            })
            .collect();
        PhysicalEnvironment::new(self.space_min, self.space_max, objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::Modulation;

    fn scene_json() -> &'static str {
        r#"{
            "space_min": {"x": 0.0, "y": 0.0, "z": 0.0},
            "space_max": {"x": 1000.0, "y": 1000.0, "z": 50.0},
            "materials": [
                {"name": "concrete", "relative_permittivity": 4.5, "resistivity": 100.0}
            ],
            "objects": [
                {
                    "id": 1,
                    "position": {"x": 500.0, "y": 500.0, "z": 0.0},
                    "shape": {"type": "cuboid", "size": {"x": 10.0, "y": 20.0, "z": 8.0}},
                    "material": "concrete"
                }
            ],
            "radios": [
                {
                    "id": 1,
                    "position": {"x": 10.0, "y": 10.0, "z": 1.0},
                    "power_dbm": 14.0,
                    "receiver": {
                        "carrier_frequency": 868e6,
                        "bandwidth": 125e3,
                        "modulation": "bpsk",
                        "sensitivity_dbm": -110.0,
                        "snir_threshold_db": 6.0
                    }
                },
                {
                    "id": 2,
                    "position": {"x": 900.0, "y": 900.0, "z": 1.0},
                    "power_dbm": 14.0,
                    "receiver": {
                        "carrier_frequency": 868e6,
                        "bandwidth": 125e3,
                        "modulation": "qpsk",
                        "sensitivity_dbm": -110.0,
                        "snir_threshold_db": 6.0
                    }
                }
            ]
        }"#
    }

    fn parse(json: &str) -> Scene {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn well_formed_scene_parses_and_validates() {
        let scene = parse(scene_json());
        validate_scene(&scene).unwrap();
        assert_eq!(scene.radios.len(), 2);
        assert_eq!(scene.radios[0].receiver.modulation, Modulation::Bpsk);

        let env = scene.build_environment();
        assert_eq!(env.objects.len(), 1);
        assert_eq!(env.objects[0].material.name, "concrete");
        assert_eq!(env.objects[0].material.relative_permeability, 1.0);
    }

    #[test]
    fn duplicate_radio_id_is_rejected() {
        let mut scene = parse(scene_json());
        scene.radios[1].id = scene.radios[0].id;
        let err = validate_scene(&scene).unwrap_err();
        assert!(err.contains("Duplicate radio id"));
    }

    #[test]
    fn out_of_bounds_radio_is_rejected() {
        let mut scene = parse(scene_json());
        scene.radios[0].position.x = 5000.0;
        let err = validate_scene(&scene).unwrap_err();
        assert!(err.contains("outside the world space"));
    }

    #[test]
    fn unknown_material_is_rejected() {
        let mut scene = parse(scene_json());
        scene.objects[0].material = "unobtainium".to_string();
        let err = validate_scene(&scene).unwrap_err();
        assert!(err.contains("unknown material"));
    }

    #[test]
    fn degenerate_shapes_are_rejected() {
        let mut scene = parse(scene_json());
        scene.objects[0].shape = Shape::Sphere { radius: 0.0 };
        assert!(validate_scene(&scene).is_err());

        scene.objects[0].shape = Shape::Prism { base: vec![(0.0, 0.0), (1.0, 0.0)], height: 5.0 };
        assert!(validate_scene(&scene).is_err());

        // Clockwise winding trips the convexity check
        scene.objects[0].shape = Shape::Prism {
            base: vec![(0.0, 0.0), (0.0, 1.0), (1.0, 0.0)],
            height: 5.0,
        };
        assert!(validate_scene(&scene).is_err());
    }

    #[test]
    fn medium_config_parses_with_defaults() {
        let toml_text = r#"
            background_noise_dbm = -120.0
            interference_floor_dbm = -130.0

            [path_loss]
            alpha = 2.0

            [codec.fec]
            constraint_length = 7
            generators = [121, 91]
        "#;
        let config: MediumConfig = toml::from_str(toml_text).unwrap();
        validate_config(&config).unwrap();
        assert_eq!(config.propagation_speed, SPEED_OF_LIGHT);
        assert_eq!(config.path_loss.system_loss, 1.0);
        assert!(config.codec.scrambler.is_none());
        assert_eq!(config.codec.fec.unwrap().constraint_length, 7);
    }

    #[test]
    fn inverted_floor_and_noise_is_rejected() {
        let config = MediumConfig {
            propagation_speed: SPEED_OF_LIGHT,
            background_noise_dbm: -120.0,
            interference_floor_dbm: -110.0,
            path_loss: FreeSpacePathLoss::default(),
            codec: CodecConfig::default(),
        };
        assert!(validate_config(&config).is_err());
    }
}
