//! Communication cache: per-transmission bookkeeping for the medium.
//!
//! The cache owns the shared [`Transmission`] snapshots and the values
//! derived from them that are expensive or awkward to recompute, chiefly
//! the interference end time (transmission end plus the worst-case
//! propagation delay across the space) and an optional visualization
//! figure handle. Entries live from `transmission_added` until
//! `transmission_removed`.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};

use super::types::{Transmission, TransmissionId};
use crate::scheduler::SimTime;

/// Opaque handle to a visualization figure owned by a display layer.
/// The cache stores it without interpreting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FigureHandle(pub u64);

struct CacheEntry {
    transmission: Arc<Transmission>,
    /// Instant after which this transmission can no longer interfere with
    /// any reception anywhere in the space.
    interference_end_time: SimTime,
    figure: Option<FigureHandle>,
}

/// Bookkeeping for all transmissions currently known to the medium.
#[derive(Default)]
pub struct CommunicationCache {
    entries: HashMap<TransmissionId, CacheEntry>,
}

impl CommunicationCache {
    pub fn new() -> Self {
        CommunicationCache { entries: HashMap::new() }
    }

    /// Start tracking a transmission. The interference end time is fixed
    /// here, once, from the maximum propagation delay at add time.
    pub fn transmission_added(&mut self, transmission: Arc<Transmission>, interference_end_time: SimTime) {
        debug!(
            "cache: tracking {} until {:.6}s",
            transmission.id,
            interference_end_time.as_secs_f64()
        );
        self.entries.insert(
            transmission.id,
            CacheEntry { transmission, interference_end_time, figure: None },
        );
    }

    /// Stop tracking a transmission. Removing an unknown id is a no-op in
    /// release builds; it indicates a double removal upstream.
    pub fn transmission_removed(&mut self, id: TransmissionId) -> Option<Arc<Transmission>> {
        let removed = self.entries.remove(&id);
        if removed.is_none() {
            debug_assert!(false, "removed unknown transmission {id}");
            warn!("cache: asked to remove unknown transmission {id}");
        }
        removed.map(|entry| entry.transmission)
    }

    pub fn get_transmission(&self, id: TransmissionId) -> Option<&Arc<Transmission>> {
        self.entries.get(&id).map(|entry| &entry.transmission)
    }

    pub fn get_cached_interference_end_time(&self, id: TransmissionId) -> Option<SimTime> {
        self.entries.get(&id).map(|entry| entry.interference_end_time)
    }

    pub fn set_cached_figure(&mut self, id: TransmissionId, figure: FigureHandle) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.figure = Some(figure);
        }
    }

    pub fn get_cached_figure(&self, id: TransmissionId) -> Option<FigureHandle> {
        self.entries.get(&id).and_then(|entry| entry.figure)
    }

    pub fn remove_cached_figure(&mut self, id: TransmissionId) -> Option<FigureHandle> {
        self.entries.get_mut(&id).and_then(|entry| entry.figure.take())
    }

    /// All tracked transmissions, in no particular order.
    pub fn transmissions(&self) -> impl Iterator<Item = &Arc<Transmission>> {
        self.entries.values().map(|entry| &entry.transmission)
    }

    /// Transmissions whose interference window is over at `now`.
    pub fn expired_transmissions(&self, now: SimTime) -> Vec<TransmissionId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.interference_end_time <= now)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Earliest upcoming change among tracked transmissions: the next
    /// transmission end or interference end after `now`.
    pub fn next_change_time(&self, now: SimTime) -> Option<SimTime> {
        self.entries
            .values()
            .flat_map(|entry| [entry.transmission.end_time, entry.interference_end_time])
            .filter(|&t| t > now)
            .min()
    }

    /// Transmissions other than `excluded` whose interference window
    /// overlaps `[start, end)`. This is a coarse source-side prefilter;
    /// callers narrow it to arrival-window overlap at the listening
    /// position.
    pub fn interfering_candidates(
        &self,
        start: SimTime,
        end: SimTime,
        excluded: TransmissionId,
    ) -> Vec<&Arc<Transmission>> {
        self.entries
            .values()
            .filter(|entry| {
                entry.transmission.id != excluded
                    && entry.transmission.start_time < end
                    && start < entry.interference_end_time
            })
            .map(|entry| &entry.transmission)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::TransmissionBitModel;
    use crate::geometry::Coord;
    use crate::medium::types::{Modulation, RadioId};

    fn transmission(id: u64, start_ms: u64, end_ms: u64) -> Arc<Transmission> {
        Arc::new(Transmission {
            id: TransmissionId(id),
            radio: RadioId(1),
            start_time: SimTime::from_millis(start_ms),
            end_time: SimTime::from_millis(end_ms),
            start_position: Coord::ZERO,
            end_position: Coord::ZERO,
            power_dbm: 14.0,
            carrier_frequency: 868e6,
            bandwidth: 125e3,
            modulation: Modulation::Bpsk,
            bit_model: TransmissionBitModel {
                header_bit_length: 16,
                payload_bit_length: 8,
                bit_rate: 50_000.0,
                bits: vec![false; 24],
                fec: None,
            },
        })
    }

    #[test]
    fn lifecycle_and_lookup() {
        let mut cache = CommunicationCache::new();
        let tx = transmission(1, 0, 10);
        cache.transmission_added(tx.clone(), SimTime::from_millis(12));

        assert_eq!(cache.len(), 1);
        assert!(cache.get_transmission(TransmissionId(1)).is_some());
        assert_eq!(
            cache.get_cached_interference_end_time(TransmissionId(1)),
            Some(SimTime::from_millis(12))
        );

        let removed = cache.transmission_removed(TransmissionId(1));
        assert!(removed.is_some());
        assert!(cache.is_empty());
    }

    #[test]
    fn figure_handle_roundtrip() {
        let mut cache = CommunicationCache::new();
        cache.transmission_added(transmission(1, 0, 10), SimTime::from_millis(12));

        assert_eq!(cache.get_cached_figure(TransmissionId(1)), None);
        cache.set_cached_figure(TransmissionId(1), FigureHandle(42));
        assert_eq!(cache.get_cached_figure(TransmissionId(1)), Some(FigureHandle(42)));
        assert_eq!(cache.remove_cached_figure(TransmissionId(1)), Some(FigureHandle(42)));
        assert_eq!(cache.get_cached_figure(TransmissionId(1)), None);
    }

    #[test]
    fn expiry_uses_interference_end_not_transmission_end() {
        let mut cache = CommunicationCache::new();
        cache.transmission_added(transmission(1, 0, 10), SimTime::from_millis(13));

        // Past the transmission end but within the interference window
        assert!(cache.expired_transmissions(SimTime::from_millis(11)).is_empty());
        assert_eq!(
            cache.expired_transmissions(SimTime::from_millis(13)),
            vec![TransmissionId(1)]
        );
    }

    #[test]
    fn next_change_time_picks_earliest_future_edge() {
        let mut cache = CommunicationCache::new();
        cache.transmission_added(transmission(1, 0, 10), SimTime::from_millis(13));
        cache.transmission_added(transmission(2, 5, 20), SimTime::from_millis(23));

        assert_eq!(cache.next_change_time(SimTime::from_millis(0)), Some(SimTime::from_millis(10)));
        assert_eq!(cache.next_change_time(SimTime::from_millis(10)), Some(SimTime::from_millis(13)));
        assert_eq!(cache.next_change_time(SimTime::from_millis(23)), None);
    }

    #[test]
    fn interfering_candidates_overlap_and_exclusion() {
        let mut cache = CommunicationCache::new();
        cache.transmission_added(transmission(1, 0, 10), SimTime::from_millis(12));
        cache.transmission_added(transmission(2, 8, 18), SimTime::from_millis(20));
        cache.transmission_added(transmission(3, 30, 40), SimTime::from_millis(42));

        let candidates = cache.interfering_candidates(
            SimTime::from_millis(9),
            SimTime::from_millis(15),
            TransmissionId(1),
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, TransmissionId(2));
    }
}
