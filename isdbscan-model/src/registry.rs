//! Channel registry and the merge rules that deduplicate relay detections.
//!
//! Terrestrial scanning is exhaustive over physical channels, so the same
//! station is often received from several relay transmitters. The registry
//! collapses those into exactly one entry per service, keeping the
//! detection with the best measured signal quality (equal quality resolves
//! to the lower physical channel, independent of merge order).

use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::channel::BroadcastKind;
use crate::types::{ServiceInfo, TransportStreamInfo};

/// Global identity of a service across the whole registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceKey {
    pub network_id: u16,
    pub transport_stream_id: u16,
    pub service_id: u16,
}

#[derive(Debug, Clone)]
struct StreamEntry {
    info: TransportStreamInfo,
    signal_quality: f64,
}

/// Deduplicated scan result, keyed by (network id, transport-stream id).
///
/// Built incrementally by [`ChannelRegistry::merge`]; once the scan loop
/// finishes, exporters only read from it.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    streams: BTreeMap<(u16, u16), StreamEntry>,
}

/// Transport streams grouped per band the way exporters consume them
/// (CS1 and CS2 are one "CS" group, each sorted by physical channel).
#[derive(Debug, Default, Clone)]
pub struct BandStreams {
    pub terrestrial: Vec<TransportStreamInfo>,
    pub bs: Vec<TransportStreamInfo>,
    pub cs: Vec<TransportStreamInfo>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one interpreted transport stream into the registry.
    ///
    /// A new (network id, transport-stream id) inserts as-is. An already
    /// known stream is a relay duplicate: the incoming detection replaces
    /// the stored one only if its signal quality is strictly higher, or
    /// equal with a strictly lower physical channel number. Either way the
    /// service sets are united so a service seen by only one detection is
    /// never lost; on collision the winning detection's record is kept.
    /// Merging the same detection twice is a no-op.
    pub fn merge(&mut self, incoming: TransportStreamInfo, signal_quality: f64) {
        let key = incoming.key();
        match self.streams.entry(key) {
            Entry::Vacant(vacant) => {
                let mut info = incoming;
                info.services.sort_by_key(|s| s.service_id);
                vacant.insert(StreamEntry { info, signal_quality });
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let replace = match compare_quality(signal_quality, entry.signal_quality) {
                    Ordering::Greater => true,
                    Ordering::Equal => {
                        incoming.physical_channel < entry.info.physical_channel
                    }
                    Ordering::Less => false,
                };
                if replace {
                    let mut info = incoming;
                    for svc in entry.info.services.drain(..) {
                        if !info.services.iter().any(|s| s.service_id == svc.service_id) {
                            info.services.push(svc);
                        }
                    }
                    info.services.sort_by_key(|s| s.service_id);
                    *entry = StreamEntry { info, signal_quality };
                } else {
                    for svc in incoming.services {
                        if !entry
                            .info
                            .services
                            .iter()
                            .any(|s| s.service_id == svc.service_id)
                        {
                            entry.info.services.push(svc);
                        }
                    }
                    entry.info.services.sort_by_key(|s| s.service_id);
                }
            }
        }
    }

    /// Number of transport streams currently registered.
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Total number of services across all streams.
    pub fn service_count(&self) -> usize {
        self.streams.values().map(|e| e.info.services.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Every registered service, paired with its owning transport stream.
    pub fn all_services(&self) -> impl Iterator<Item = (&TransportStreamInfo, &ServiceInfo)> {
        self.streams
            .values()
            .flat_map(|e| e.info.services.iter().map(move |s| (&e.info, s)))
    }

    /// Signal quality recorded for a stream, if registered.
    pub fn signal_quality(&self, network_id: u16, transport_stream_id: u16) -> Option<f64> {
        self.streams
            .get(&(network_id, transport_stream_id))
            .map(|e| e.signal_quality)
    }

    /// Transport streams of one band, sorted by physical channel.
    pub fn streams_of(&self, kind: BroadcastKind) -> Vec<&TransportStreamInfo> {
        let mut out: Vec<&TransportStreamInfo> = self
            .streams
            .values()
            .map(|e| &e.info)
            .filter(|info| info.broadcast_kind() == kind)
            .collect();
        out.sort_by_key(|info| info.physical_channel);
        out
    }

    /// Clone the registry content grouped per band for export.
    ///
    /// With `exclude_pay_tv` set, terrestrial and BS streams drop their
    /// non-free services and CS streams drop every service (CS is operated
    /// as a pay platform; its couple of free shopping channels are not
    /// worth keeping). The unfiltered grouping retains BS pay services.
    pub fn export_view(&self, exclude_pay_tv: bool) -> BandStreams {
        let mut view = BandStreams::default();
        for entry in self.streams.values() {
            let mut info = entry.info.clone();
            match info.broadcast_kind() {
                BroadcastKind::Terrestrial => {
                    if exclude_pay_tv {
                        info.services.retain(|s| s.is_free);
                    }
                    view.terrestrial.push(info);
                }
                BroadcastKind::Bs => {
                    if exclude_pay_tv {
                        info.services.retain(|s| s.is_free);
                    }
                    view.bs.push(info);
                }
                BroadcastKind::Cs1 | BroadcastKind::Cs2 => {
                    if exclude_pay_tv {
                        info.services.clear();
                    }
                    view.cs.push(info);
                }
            }
        }
        view.terrestrial.sort_by_key(|i| i.physical_channel);
        view.bs.sort_by_key(|i| i.physical_channel);
        view.cs.sort_by_key(|i| i.physical_channel);
        view
    }
}

// Signal readings never come back as NaN from a real measurement, but an
// unmeasured placeholder must still order deterministically.
fn compare_quality(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::PhysicalChannel;
    use crate::types::{satellite_channel_number, service_type, terrestrial_channel_number};

    fn terrestrial_ts(channel: u8, tsid: u16, sids: &[u16]) -> TransportStreamInfo {
        let mut ts = TransportStreamInfo::new(
            0x7FE8,
            tsid,
            PhysicalChannel::Terrestrial(channel),
        );
        ts.network_name = "テスト局".to_string();
        ts.remote_control_key_id = Some(1);
        ts.services = sids
            .iter()
            .map(|&sid| ServiceInfo {
                channel_number: terrestrial_channel_number(sid, 1),
                service_id: sid,
                service_type: service_type::DIGITAL_TV,
                service_name: format!("サービス{sid}"),
                is_free: true,
                is_oneseg: false,
            })
            .collect();
        ts
    }

    fn bs_ts(sids_free: &[(u16, bool)]) -> TransportStreamInfo {
        let mut ts = TransportStreamInfo::new(
            0x0004,
            0x4010,
            PhysicalChannel::BsSlot { transponder: 1, slot: 0 },
        );
        ts.network_name = "BSネットワーク".to_string();
        ts.satellite_transponder = Some(1);
        ts.satellite_slot_number = Some(0);
        ts.services = sids_free
            .iter()
            .map(|&(sid, is_free)| ServiceInfo {
                channel_number: satellite_channel_number(sid),
                service_id: sid,
                service_type: service_type::DIGITAL_TV,
                service_name: format!("BS{sid}"),
                is_free,
                is_oneseg: false,
            })
            .collect();
        ts
    }

    #[test]
    fn test_higher_quality_wins() {
        let mut registry = ChannelRegistry::new();
        registry.merge(terrestrial_ts(26, 0x7FE0, &[1024]), 36.2);
        registry.merge(terrestrial_ts(29, 0x7FE0, &[1024]), 41.5);

        assert_eq!(registry.stream_count(), 1);
        let streams = registry.streams_of(BroadcastKind::Terrestrial);
        assert_eq!(streams[0].physical_channel, PhysicalChannel::Terrestrial(29));
        assert_eq!(registry.signal_quality(0x7FE8, 0x7FE0), Some(41.5));
    }

    #[test]
    fn test_lower_quality_discarded() {
        let mut registry = ChannelRegistry::new();
        registry.merge(terrestrial_ts(29, 0x7FE0, &[1024]), 41.5);
        registry.merge(terrestrial_ts(26, 0x7FE0, &[1024]), 36.2);

        let streams = registry.streams_of(BroadcastKind::Terrestrial);
        assert_eq!(streams[0].physical_channel, PhysicalChannel::Terrestrial(29));
    }

    #[test]
    fn test_equal_quality_tie_breaks_to_lower_channel() {
        // Same quality, both merge orders: the lower channel must win.
        for order in [[26u8, 29u8], [29, 26]] {
            let mut registry = ChannelRegistry::new();
            for ch in order {
                registry.merge(terrestrial_ts(ch, 0x7FE0, &[1024]), 38.0);
            }
            let streams = registry.streams_of(BroadcastKind::Terrestrial);
            assert_eq!(
                streams[0].physical_channel,
                PhysicalChannel::Terrestrial(26),
                "merge order {order:?}"
            );
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut registry = ChannelRegistry::new();
        registry.merge(terrestrial_ts(26, 0x7FE0, &[1024, 1025]), 36.2);
        let before: Vec<_> = registry
            .all_services()
            .map(|(ts, s)| (ts.physical_channel, s.service_id))
            .collect();

        registry.merge(terrestrial_ts(26, 0x7FE0, &[1024, 1025]), 36.2);
        let after: Vec<_> = registry
            .all_services()
            .map(|(ts, s)| (ts.physical_channel, s.service_id))
            .collect();

        assert_eq!(before, after);
        assert_eq!(registry.stream_count(), 1);
        assert_eq!(registry.service_count(), 2);
    }

    #[test]
    fn test_services_unioned_across_detections() {
        let mut registry = ChannelRegistry::new();
        registry.merge(terrestrial_ts(26, 0x7FE0, &[1024, 1025]), 41.5);
        registry.merge(terrestrial_ts(29, 0x7FE0, &[1024, 1026]), 36.2);

        let streams = registry.streams_of(BroadcastKind::Terrestrial);
        assert_eq!(streams[0].physical_channel, PhysicalChannel::Terrestrial(26));
        let sids: Vec<u16> = streams[0].services.iter().map(|s| s.service_id).collect();
        assert_eq!(sids, vec![1024, 1025, 1026]);
    }

    #[test]
    fn test_no_orphaned_services() {
        let mut registry = ChannelRegistry::new();
        registry.merge(terrestrial_ts(26, 0x7FE0, &[1024]), 36.2);
        registry.merge(terrestrial_ts(29, 0x7FE0, &[1024]), 41.5);
        registry.merge(bs_ts(&[(101, true), (200, false)]), 22.0);

        for (ts, _svc) in registry.all_services() {
            assert!(registry.signal_quality(ts.network_id, ts.transport_stream_id).is_some());
        }
    }

    #[test]
    fn test_export_view_pay_tv_filter() {
        let mut registry = ChannelRegistry::new();
        registry.merge(terrestrial_ts(29, 0x7FE0, &[1024]), 41.5);
        registry.merge(bs_ts(&[(101, true), (200, false)]), 22.0);

        let unfiltered = registry.export_view(false);
        assert_eq!(unfiltered.bs[0].services.len(), 2);

        let filtered = registry.export_view(true);
        assert_eq!(filtered.terrestrial[0].services.len(), 1);
        let bs_sids: Vec<u16> = filtered.bs[0].services.iter().map(|s| s.service_id).collect();
        assert_eq!(bs_sids, vec![101]);
    }

    #[test]
    fn test_export_view_clears_cs_services_when_excluding_pay_tv() {
        let mut registry = ChannelRegistry::new();
        let mut cs = TransportStreamInfo::new(0x0007, 0x6020, PhysicalChannel::Nd(4));
        cs.services.push(ServiceInfo {
            channel_number: "055".to_string(),
            service_id: 55,
            service_type: service_type::DIGITAL_TV,
            service_name: "ショップ".to_string(),
            is_free: true,
            is_oneseg: false,
        });
        registry.merge(cs, 18.0);

        let filtered = registry.export_view(true);
        assert_eq!(filtered.cs.len(), 1);
        assert!(filtered.cs[0].services.is_empty());

        let unfiltered = registry.export_view(false);
        assert_eq!(unfiltered.cs[0].services.len(), 1);
    }
}
