//! The radio medium: the shared channel all radios transmit into and
//! receive from.
//!
//! [`RadioMedium`] owns the registered radios, the physical environment,
//! the codec, and the communication cache. It orchestrates the life of a
//! transmission from `transmit` through any number of `receive` attempts
//! to its removal in `purge_expired`, and publishes every state change to
//! registered listeners so displays and statistics can follow along
//! without being consulted on the hot path.

pub mod cache;
pub mod receiver;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};

use crate::codec::{Codec, CodecError, PacketModel};
use crate::environment::PhysicalEnvironment;
use crate::geometry::Coord;
use crate::scene::MediumConfig;
use crate::scheduler::{SimDuration, SimTime};
use crate::signal::{FreeSpacePathLoss, ObstacleLoss, db_to_ratio, ratio_to_db};

pub use cache::{CommunicationCache, FigureHandle};
pub use receiver::Receiver;
pub use types::{
    Listening, Modulation, RadioId, Reception, ReceptionDecision, ReceptionIndication,
    Transmission, TransmissionId,
};

/// Errors of medium-level operations.
#[derive(Debug)]
pub enum MediumError {
    UnknownRadio(RadioId),
    UnknownTransmission(TransmissionId),
    DuplicateRadio(RadioId),
    /// Reception was attempted before the first bit arrives at the
    /// receiver.
    ReceptionNotStarted(TransmissionId),
    Codec(CodecError),
}

impl std::fmt::Display for MediumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediumError::UnknownRadio(id) => write!(f, "unknown radio {id}"),
            MediumError::UnknownTransmission(id) => write!(f, "unknown transmission {id}"),
            MediumError::DuplicateRadio(id) => write!(f, "radio {id} is already registered"),
            MediumError::ReceptionNotStarted(id) => {
                write!(f, "reception of {id} attempted before its arrival")
            }
            MediumError::Codec(e) => write!(f, "codec failure: {e}"),
        }
    }
}

impl std::error::Error for MediumError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MediumError::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecError> for MediumError {
    fn from(e: CodecError) -> Self {
        MediumError::Codec(e)
    }
}

/// State change notifications published by the medium.
#[derive(Debug, Clone)]
pub enum MediumEvent {
    /// Something about the set of live signals changed; cheap catch-all
    /// for displays that redraw wholesale.
    MediumChanged,
    TransmissionAdded(Arc<Transmission>),
    TransmissionRemoved(Arc<Transmission>),
    RadioAdded(RadioId),
    RadioRemoved(RadioId),
    PacketReceived(Arc<ReceptionDecision>),
}

/// Handle for unregistering a medium listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// Bounds derived from the current radio population, recomputed whenever
/// a radio is added or removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediumLimits {
    /// Farthest distance any registered pair could still communicate at.
    pub max_communication_range: f64,
    /// Farthest distance a signal stays above the interference floor.
    pub max_interference_range: f64,
    /// Worst-case signal travel time across the space.
    pub max_propagation_delay: SimDuration,
}

/// Expanding wave front of a live transmission, for display layers.
#[derive(Debug, Clone, Copy)]
pub struct PropagationRing {
    pub transmission: TransmissionId,
    pub center: Coord,
    /// Distance the first transmitted bit has travelled.
    pub outer_radius: f64,
    /// Distance the last bit has travelled; zero while still on the air.
    pub inner_radius: f64,
}

struct RadioEntry {
    position: Coord,
    power_dbm: f64,
    receiver: Receiver,
}

type Listener = Box<dyn FnMut(&MediumEvent)>;

/// The medium itself. Single-threaded by construction; the surrounding
/// event loop drives it at whatever pace it likes.
pub struct RadioMedium {
    propagation_speed: f64,
    background_noise_dbm: f64,
    /// Signals weaker than this are ignored even as interference.
    interference_floor_dbm: f64,
    path_loss: FreeSpacePathLoss,
    environment: PhysicalEnvironment,
    codec: Codec,
    radios: HashMap<RadioId, RadioEntry>,
    cache: CommunicationCache,
    limits: MediumLimits,
    listeners: Vec<(ListenerId, Listener)>,
    next_transmission_id: u64,
    next_listener_id: u64,
}

impl RadioMedium {
    pub fn new(config: &MediumConfig, environment: PhysicalEnvironment) -> Self {
        let mut medium = RadioMedium {
            propagation_speed: config.propagation_speed,
            background_noise_dbm: config.background_noise_dbm,
            interference_floor_dbm: config.interference_floor_dbm,
            path_loss: config.path_loss.clone(),
            environment,
            codec: Codec::new(config.codec.clone()),
            radios: HashMap::new(),
            cache: CommunicationCache::new(),
            limits: MediumLimits::default(),
            listeners: Vec::new(),
            next_transmission_id: 0,
            next_listener_id: 0,
        };
        medium.recompute_limits();
        medium
    }

    pub fn limits(&self) -> MediumLimits {
        self.limits
    }

    pub fn environment(&self) -> &PhysicalEnvironment {
        &self.environment
    }

    /// Register a callback for every medium event. The returned id
    /// unregisters it again.
    pub fn add_listener(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    fn notify(&mut self, event: MediumEvent) {
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }

    /// Attach a radio to the medium.
    pub fn add_radio(&mut self, id: RadioId, position: Coord, power_dbm: f64, receiver: Receiver) -> Result<(), MediumError> {
        if self.radios.contains_key(&id) {
            return Err(MediumError::DuplicateRadio(id));
        }
        info!("medium: adding {id} at ({:.1}, {:.1}, {:.1})", position.x, position.y, position.z);
        self.radios.insert(id, RadioEntry { position, power_dbm, receiver });
        self.recompute_limits();
        self.notify(MediumEvent::RadioAdded(id));
        Ok(())
    }

    /// Detach a radio. Its past transmissions stay in the cache until
    /// their interference windows close.
    pub fn remove_radio(&mut self, id: RadioId) -> Result<(), MediumError> {
        if self.radios.remove(&id).is_none() {
            return Err(MediumError::UnknownRadio(id));
        }
        self.recompute_limits();
        self.notify(MediumEvent::RadioRemoved(id));
        Ok(())
    }

    pub fn radio_position(&self, id: RadioId) -> Option<Coord> {
        self.radios.get(&id).map(|entry| entry.position)
    }

    // Range limits come from the loudest transmitter against the most
    // sensitive receiver on the lowest carrier in use.
    fn recompute_limits(&mut self) {
        self.limits.max_propagation_delay =
            SimDuration::from_secs_f64(self.environment.diagonal() / self.propagation_speed);
        let Some(max_power) = self
            .radios
            .values()
            .map(|r| r.power_dbm)
            .max_by(|a, b| a.total_cmp(b))
        else {
            self.limits.max_communication_range = 0.0;
            self.limits.max_interference_range = 0.0;
            return;
        };
        let min_sensitivity = self
            .radios
            .values()
            .map(|r| r.receiver.sensitivity_dbm)
            .min_by(|a, b| a.total_cmp(b))
            .unwrap_or(0.0);
        let min_frequency = self
            .radios
            .values()
            .map(|r| r.receiver.carrier_frequency)
            .min_by(|a, b| a.total_cmp(b))
            .unwrap_or(1.0);

        let communication_loss = db_to_ratio(min_sensitivity - max_power);
        let interference_loss = db_to_ratio(self.interference_floor_dbm - max_power);
        self.limits.max_communication_range =
            self.path_loss.compute_range(self.propagation_speed, min_frequency, communication_loss);
        self.limits.max_interference_range =
            self.path_loss.compute_range(self.propagation_speed, min_frequency, interference_loss);
        debug!(
            "medium: limits recomputed: comm {:.0} m, interference {:.0} m, max delay {:.3} us",
            self.limits.max_communication_range,
            self.limits.max_interference_range,
            self.limits.max_propagation_delay.as_secs_f64() * 1e6
        );
    }

    /// Put a packet on the air from `radio` starting at `now`.
    ///
    /// The packet is run through the codec; airtime follows from the coded
    /// bit count and the packet's bit rate. The transmission stays cached
    /// until its interference window closes.
    pub fn transmit(
        &mut self,
        radio: RadioId,
        packet: &PacketModel,
        now: SimTime,
    ) -> Result<Arc<Transmission>, MediumError> {
        let entry = self.radios.get(&radio).ok_or(MediumError::UnknownRadio(radio))?;
        let bit_model = self.codec.encode(packet)?;
        let duration = SimDuration::from_secs_f64(bit_model.duration_secs());

        let id = TransmissionId(self.next_transmission_id);
        self.next_transmission_id += 1;

        let transmission = Arc::new(Transmission {
            id,
            radio,
            start_time: now,
            end_time: now + duration,
            start_position: entry.position,
            end_position: entry.position,
            power_dbm: entry.power_dbm,
            carrier_frequency: entry.receiver.carrier_frequency,
            bandwidth: entry.receiver.bandwidth,
            modulation: entry.receiver.modulation,
            bit_model,
        });
        let interference_end_time = transmission.end_time + self.limits.max_propagation_delay;
        info!(
            "medium: {radio} transmits {id}, {} bits, on air {:.6}s to {:.6}s",
            transmission.bit_model.bits.len(),
            transmission.start_time.as_secs_f64(),
            transmission.end_time.as_secs_f64()
        );
        self.cache.transmission_added(transmission.clone(), interference_end_time);
        self.notify(MediumEvent::TransmissionAdded(transmission.clone()));
        self.notify(MediumEvent::MediumChanged);
        Ok(transmission)
    }

    /// Attempt reception of a cached transmission at `radio`.
    ///
    /// Returns the full decision record and, when the attempt succeeds,
    /// the decoded packet. The attempt must not precede the arrival of
    /// the transmission's first bit at the receiver; a host driving the
    /// medium from [`next_change_time`](Self::next_change_time) never
    /// does.
    pub fn receive(
        &mut self,
        radio: RadioId,
        transmission: TransmissionId,
        now: SimTime,
    ) -> Result<(Arc<ReceptionDecision>, Option<PacketModel>), MediumError> {
        let entry = self.radios.get(&radio).ok_or(MediumError::UnknownRadio(radio))?;
        let tx = self
            .cache
            .get_transmission(transmission)
            .ok_or(MediumError::UnknownTransmission(transmission))?
            .clone();

        let reception = self.compute_reception(&tx, entry.position, radio);
        if now < reception.start_time {
            return Err(MediumError::ReceptionNotStarted(transmission));
        }
        let listening = entry.receiver.create_listening(
            radio,
            reception.start_time,
            reception.end_time,
            entry.position,
        );

        // Interference aggregation is skipped entirely when the wanted
        // signal is not even on the listened band.
        let band_matches = reception.carrier_frequency == listening.carrier_frequency
            && reception.bandwidth == listening.bandwidth;
        let interfering = if band_matches {
            self.compute_interference(&tx, &reception, entry.position, radio)
        } else {
            Vec::new()
        };
        let interfering_refs: Vec<&Reception> = interfering.iter().collect();
        let decision = Arc::new(entry.receiver.compute_reception_decision(
            &listening,
            &reception,
            &interfering_refs,
            self.background_noise_dbm,
        ));

        let packet = if decision.successful {
            Some(self.codec.decode(&tx.bit_model.bits, &tx.bit_model)?)
        } else {
            None
        };
        debug!(
            "medium: {radio} reception of {transmission}: possible={} acceptable={} successful={}",
            decision.reception_possible, decision.snir_acceptable, decision.successful
        );
        self.notify(MediumEvent::PacketReceived(decision.clone()));
        Ok((decision, packet))
    }

    // Arrival frame and received power of `tx` at `position`.
    fn compute_reception(&self, tx: &Transmission, position: Coord, radio: RadioId) -> Reception {
        let distance = tx.start_position.distance_to(&position);
        let delay = SimDuration::from_secs_f64(distance / self.propagation_speed);
        let path_factor =
            self.path_loss
                .compute_path_loss(self.propagation_speed, tx.carrier_frequency, distance);
        let obstacle_factor = ObstacleLoss::new(&self.environment).compute_obstacle_loss(
            tx.carrier_frequency,
            tx.start_position,
            position,
        );
        Reception {
            transmission: tx.id,
            radio,
            start_time: tx.start_time + delay,
            end_time: tx.end_time + delay,
            position,
            carrier_frequency: tx.carrier_frequency,
            bandwidth: tx.bandwidth,
            power_dbm: tx.power_dbm + ratio_to_db(path_factor * obstacle_factor),
        }
    }

    // Concurrent receptions that land in the listened band above the
    // interference floor. Band overlap here is a genuine spectral overlap
    // test, unlike the exact-equality receivability rule. What must overlap
    // in time is the arrival windows at the listening position, not the
    // source-side transmission windows: a signal keyed up elsewhere only
    // interferes once its first bit has propagated here.
    fn compute_interference(
        &self,
        wanted: &Transmission,
        reception: &Reception,
        position: Coord,
        radio: RadioId,
    ) -> Vec<Reception> {
        self.cache
            .interfering_candidates(reception.start_time, reception.end_time, wanted.id)
            .into_iter()
            .filter(|candidate| {
                (candidate.carrier_frequency - wanted.carrier_frequency).abs()
                    < (candidate.bandwidth + wanted.bandwidth) / 2.0
            })
            .map(|candidate| self.compute_reception(candidate, position, radio))
            .filter(|interferer| {
                interferer.start_time < reception.end_time
                    && reception.start_time < interferer.end_time
            })
            .filter(|interferer| interferer.power_dbm >= self.interference_floor_dbm)
            .collect()
    }

    /// Drop every transmission whose interference window has closed.
    pub fn purge_expired(&mut self, now: SimTime) {
        let expired = self.cache.expired_transmissions(now);
        if expired.is_empty() {
            return;
        }
        for id in expired {
            if let Some(tx) = self.cache.transmission_removed(id) {
                debug!("medium: {id} expired at {:.6}s", now.as_secs_f64());
                self.notify(MediumEvent::TransmissionRemoved(tx));
            }
        }
        self.notify(MediumEvent::MediumChanged);
    }

    /// The next instant at which the set of live signals changes, for
    /// event loops that sleep between changes.
    pub fn next_change_time(&self, now: SimTime) -> Option<SimTime> {
        self.cache.next_change_time(now)
    }

    /// Wave fronts of all tracked transmissions at `now`, radii clamped to
    /// `max_display_radius`. Purely a display aid; clamping has no effect
    /// on reception or interference.
    pub fn propagation_rings(&self, now: SimTime, max_display_radius: f64) -> Vec<PropagationRing> {
        self.cache
            .transmissions()
            .filter(|tx| tx.start_time <= now)
            .map(|tx| {
                let outer =
                    now.saturating_since(tx.start_time).as_secs_f64() * self.propagation_speed;
                let inner =
                    now.saturating_since(tx.end_time).as_secs_f64() * self.propagation_speed;
                PropagationRing {
                    transmission: tx.id,
                    center: tx.start_position,
                    outer_radius: outer.min(max_display_radius),
                    inner_radius: inner.min(max_display_radius),
                }
            })
            .collect()
    }
}
