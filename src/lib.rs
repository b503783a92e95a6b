//! Radio medium model for discrete-event network simulation.
//!
//! This crate models the physical-layer transmission-reception pipeline of a
//! shared radio medium. It integrates:
//! - Geometry primitives and a closed set of obstacle shapes
//! - Materials and the static physical environment
//! - Path loss (Friis free-space, log-distance with shadowing) and obstacle
//!   loss (dielectric and reflection losses over intersected objects)
//! - A layered bit codec (serialize, scramble, FEC, interleave) with
//!   configuration-time optional stages
//! - A SNIR-based reception decision engine
//! - A communication cache tracking in-flight transmissions and their
//!   interference windows
//! - The `RadioMedium` orchestrator publishing lifecycle events to
//!   registered subscribers
//! - A discrete-event scheduler standing in for the host simulation kernel
//!
//! ## Module Organization
//!
//! - `geometry`: Coordinates, segments, shape intersection
//! - `environment`: Materials and physical objects
//! - `signal`: Path loss models and power conversions
//! - `codec`: The layered encode/decode pipeline
//! - `medium`: Transmissions, receptions, decisions, cache, orchestrator
//! - `scheduler`: Simulated time and the timer queue
//! - `scene`: Scene (JSON) and medium parameter (TOML) loading
//!
//! ## Control flow
//!
//! A packet handed to [`RadioMedium::transmit`] is encoded into a bit model
//! and cached with a precomputed interference end time. At the simulated
//! instants chosen by [`RadioMedium::next_change_time`], the embedding host
//! calls [`RadioMedium::receive`] per interested radio; the decision engine
//! evaluates the reception against the interference set and ambient noise,
//! and subscribers are notified of the outcome. Expired transmissions are
//! evicted by [`RadioMedium::purge_expired`].

pub mod codec;
pub mod environment;
pub mod geometry;
pub mod medium;
pub mod scene;
pub mod scheduler;
pub mod signal;

pub use codec::{Codec, CodecConfig, CodecError, PacketModel, TransmissionBitModel};
pub use environment::{Material, PhysicalEnvironment, PhysicalObject};
pub use geometry::{Coord, LineSegment, Shape};
pub use medium::{
    FigureHandle, Listening, MediumError, MediumEvent, MediumLimits, Modulation, RadioId,
    RadioMedium, Reception, ReceptionDecision, Receiver, Transmission, TransmissionId,
};
pub use scene::{MediumConfig, Scene, SceneLoadError};
pub use scheduler::{EventScheduler, SimDuration, SimTime, TimerHandle};
