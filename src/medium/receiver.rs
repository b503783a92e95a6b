//! Narrowband receiver model and the three-gate reception decision.
//!
//! A reception attempt is judged by three flags:
//!
//! 1. Possible: the bands match exactly and the signal power clears the
//!    receiver sensitivity.
//! 2. Acceptable: the SNIR against all concurrent interferers clears the
//!    receiver threshold, regardless of absolute power.
//! 3. Successful: both of the above, the packet is handed up.
//!
//! SNIR is computed in the linear milliwatt domain and compared against a
//! threshold given in dB. A band mismatch settles the decision before any
//! interference is aggregated, so off-channel traffic costs nothing to
//! dismiss.

use log::trace;
use serde::Deserialize;

use super::types::{
    Listening, Modulation, RadioId, Reception, ReceptionDecision, ReceptionIndication,
    Transmission,
};
use crate::geometry::Coord;
use crate::scheduler::SimTime;
use crate::signal::{db_to_ratio, dbm_to_mw, mw_to_dbm};

/// Reception parameters of a narrowband radio.
#[derive(Debug, Clone, Deserialize)]
pub struct Receiver {
    /// Carrier center frequency in Hz.
    pub carrier_frequency: f64,
    /// Occupied bandwidth in Hz.
    pub bandwidth: f64,
    pub modulation: Modulation,
    /// Minimum signal power the hardware can detect, in dBm.
    pub sensitivity_dbm: f64,
    /// Minimum SNIR for successful decoding, in dB.
    pub snir_threshold_db: f64,
}

impl Receiver {
    /// The band this radio listens on during `[start_time, end_time)`.
    pub fn create_listening(
        &self,
        radio: RadioId,
        start_time: SimTime,
        end_time: SimTime,
        position: Coord,
    ) -> Listening {
        Listening {
            radio,
            start_time,
            end_time,
            position,
            carrier_frequency: self.carrier_frequency,
            bandwidth: self.bandwidth,
        }
    }

    /// A narrowband receiver only ever locks onto its exact own channel;
    /// overlapping but unequal bands are interference, not candidates.
    pub fn is_transmission_receivable(&self, transmission: &Transmission) -> bool {
        transmission.carrier_frequency == self.carrier_frequency
            && transmission.bandwidth == self.bandwidth
    }

    /// Gate one: band match plus sensitivity.
    pub fn is_reception_possible(&self, listening: &Listening, reception: &Reception) -> bool {
        reception.carrier_frequency == listening.carrier_frequency
            && reception.bandwidth == listening.bandwidth
            && reception.power_dbm >= self.sensitivity_dbm
    }

    /// Run all three gates for one reception attempt.
    ///
    /// `interference` holds the concurrent receptions whose power lands in
    /// the listened band; `background_noise_dbm` is the thermal noise
    /// floor. On a band mismatch the decision short-circuits with all
    /// flags false and an indication computed against background noise
    /// alone.
    pub fn compute_reception_decision(
        &self,
        listening: &Listening,
        reception: &Reception,
        interference: &[&Reception],
        background_noise_dbm: f64,
    ) -> ReceptionDecision {
        let signal_mw = dbm_to_mw(reception.power_dbm);
        let ambient_mw = dbm_to_mw(background_noise_dbm);

        if reception.carrier_frequency != listening.carrier_frequency
            || reception.bandwidth != listening.bandwidth
        {
            trace!(
                "{}: band mismatch for {} ({} Hz vs {} Hz), not receivable",
                reception.radio, reception.transmission,
                reception.carrier_frequency, listening.carrier_frequency
            );
            return ReceptionDecision {
                reception: reception.clone(),
                indication: ReceptionIndication {
                    power_dbm: reception.power_dbm,
                    noise_power_dbm: background_noise_dbm,
                    snir: signal_mw / ambient_mw,
                },
                reception_possible: false,
                snir_acceptable: false,
                successful: false,
            };
        }

        let interference_mw: f64 = interference.iter().map(|r| dbm_to_mw(r.power_dbm)).sum();
        let noise_mw = ambient_mw + interference_mw;
        let snir = signal_mw / noise_mw;

        // The power and SNIR gates are judged independently so higher
        // layers can tell a weak signal from a drowned one; success is
        // their conjunction.
        let reception_possible = reception.power_dbm >= self.sensitivity_dbm;
        let snir_acceptable = snir >= db_to_ratio(self.snir_threshold_db);
        let successful = reception_possible && snir_acceptable;

        trace!(
            "{}: decision for {}: power {:.1} dBm, noise {:.1} dBm, snir {:.2}, \
             possible={} acceptable={} successful={}",
            reception.radio, reception.transmission,
            reception.power_dbm, mw_to_dbm(noise_mw), snir,
            reception_possible, snir_acceptable, successful
        );

        ReceptionDecision {
            reception: reception.clone(),
            indication: ReceptionIndication {
                power_dbm: reception.power_dbm,
                noise_power_dbm: mw_to_dbm(noise_mw),
                snir,
            },
            reception_possible,
            snir_acceptable,
            successful,
        }
    }
}
