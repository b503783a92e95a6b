//! Core data types of the radio medium: transmissions, listenings,
//! receptions and the decision record a reception attempt produces.
//!
//! All of these are immutable snapshots once constructed. A
//! [`Transmission`] is created when a radio starts sending and never
//! changes afterwards; receivers derive [`Reception`]s from it for their
//! own position and time frame.

use serde::Deserialize;

use crate::codec::TransmissionBitModel;
use crate::geometry::Coord;
use crate::scheduler::SimTime;

/// Identifier of a transmission, unique for the lifetime of the medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransmissionId(pub u64);

/// Identifier of a radio attached to the medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub struct RadioId(pub u32);

impl std::fmt::Display for TransmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tx#{}", self.0)
    }
}

impl std::fmt::Display for RadioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "radio#{}", self.0)
    }
}

/// Modulation scheme of a narrowband signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Modulation {
    Bpsk,
    Qpsk,
    Psk8,
    Qam16,
}

/// One signal put on the medium by a transmitting radio.
///
/// Start and end positions are distinct so a moving transmitter is
/// representable, though position is sampled only at these two instants.
#[derive(Debug, Clone)]
pub struct Transmission {
    pub id: TransmissionId,
    pub radio: RadioId,
    pub start_time: SimTime,
    pub end_time: SimTime,
    pub start_position: Coord,
    pub end_position: Coord,
    pub power_dbm: f64,
    /// Carrier center frequency in Hz.
    pub carrier_frequency: f64,
    /// Occupied bandwidth in Hz.
    pub bandwidth: f64,
    pub modulation: Modulation,
    pub bit_model: TransmissionBitModel,
}

impl Transmission {
    /// Whether the signal is still on the air at `time`.
    pub fn is_on_air(&self, time: SimTime) -> bool {
        self.start_time <= time && time < self.end_time
    }
}

/// A receiver's window of attention on the medium: where it listens, when,
/// and on which band.
#[derive(Debug, Clone)]
pub struct Listening {
    pub radio: RadioId,
    pub start_time: SimTime,
    pub end_time: SimTime,
    pub position: Coord,
    pub carrier_frequency: f64,
    pub bandwidth: f64,
}

/// A transmission as it arrives at one receiver: delayed by propagation
/// and attenuated by path and obstacle loss.
#[derive(Debug, Clone)]
pub struct Reception {
    pub transmission: TransmissionId,
    pub radio: RadioId,
    /// Arrival time of the first bit.
    pub start_time: SimTime,
    /// Arrival time of the last bit.
    pub end_time: SimTime,
    pub position: Coord,
    pub carrier_frequency: f64,
    pub bandwidth: f64,
    /// Received signal power after all losses.
    pub power_dbm: f64,
}

/// Physical measurements backing a reception decision.
#[derive(Debug, Clone, Copy)]
pub struct ReceptionIndication {
    pub power_dbm: f64,
    /// Total noise plus interference power.
    pub noise_power_dbm: f64,
    /// Signal to noise-and-interference power ratio (linear, not dB).
    pub snir: f64,
}

/// Outcome of a reception attempt.
///
/// The power and SNIR flags are judged independently and `successful` is
/// their conjunction, so a failed attempt still shows which gate it
/// failed at. A band mismatch clears all three.
#[derive(Debug, Clone)]
pub struct ReceptionDecision {
    pub reception: Reception,
    pub indication: ReceptionIndication,
    /// Band matches and the signal is above sensitivity.
    pub reception_possible: bool,
    /// SNIR clears the receiver threshold.
    pub snir_acceptable: bool,
    /// The attempt yields the packet.
    pub successful: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transmission_on_air_window_is_half_open() {
        let tx = Transmission {
            id: TransmissionId(1),
            radio: RadioId(1),
            start_time: SimTime::from_millis(100),
            end_time: SimTime::from_millis(200),
            start_position: Coord::ZERO,
            end_position: Coord::ZERO,
            power_dbm: 14.0,
            carrier_frequency: 868e6,
            bandwidth: 125e3,
            modulation: Modulation::Bpsk,
            bit_model: crate::codec::TransmissionBitModel {
                header_bit_length: 16,
                payload_bit_length: 0,
                bit_rate: 50_000.0,
                bits: vec![false; 16],
                fec: None,
            },
        };
        assert!(!tx.is_on_air(SimTime::from_millis(99)));
        assert!(tx.is_on_air(SimTime::from_millis(100)));
        assert!(tx.is_on_air(SimTime::from_millis(199)));
        assert!(!tx.is_on_air(SimTime::from_millis(200)));
    }
}
