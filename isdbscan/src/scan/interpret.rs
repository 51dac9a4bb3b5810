//! Interpreting decoded tables into the domain model.
//!
//! The NIT builds the transport-stream records and the SDT fills in their
//! services. For a terrestrial probe that yields exactly the tuned stream;
//! for a satellite probe the NIT announces every transponder of the
//! network, so one probe expands into the network's full lineup.

use std::collections::{BTreeMap, BTreeSet};

use log::warn;

use isdbscan_model::channel::{NID_BS, NID_CS1, NID_CS2, NID_TERRESTRIAL};
use isdbscan_model::types::{
    satellite_channel_number, service_type, terrestrial_channel_number,
};
use isdbscan_model::{BroadcastKind, PhysicalChannel, ServiceInfo, TransportStreamInfo};

use super::planner::ScanTarget;
use crate::ts::DecodedTables;

/// Turn one probe's decoded tables into transport-stream records.
pub fn interpret(target: &ScanTarget, tables: &DecodedTables) -> Vec<TransportStreamInfo> {
    let mut ts_map: BTreeMap<u16, TransportStreamInfo> = BTreeMap::new();
    let mut oneseg_sids: BTreeMap<u16, BTreeSet<u16>> = BTreeMap::new();

    for nit in &tables.nit {
        for entry in &nit.transport_streams {
            let tsid = entry.transport_stream_id;
            let info = ts_map.entry(tsid).or_insert_with(|| {
                TransportStreamInfo::new(nit.network_id, tsid, target.physical_channel)
            });
            info.network_id = nit.network_id;

            // Satellite TSIDs encode their own physical channel
            // (ARIB TR-B15: low 4 bits of the NID, flags, transponder,
            // then the relative TS number for BS).
            match nit.network_id {
                NID_BS => {
                    let transponder = (tsid >> 4 & 0x1F) as u8;
                    let slot = (tsid & 0x7) as u8;
                    info.satellite_transponder = Some(transponder);
                    info.satellite_slot_number = Some(slot);
                    info.physical_channel = PhysicalChannel::BsSlot { transponder, slot };
                }
                NID_CS1 | NID_CS2 => {
                    let transponder = (tsid >> 4 & 0x1F) as u8;
                    info.satellite_transponder = Some(transponder);
                    info.physical_channel = PhysicalChannel::Nd(transponder);
                }
                _ => {}
            }

            if NID_TERRESTRIAL.contains(&nit.network_id) {
                if let Some(name) = &entry.ts_name {
                    info.network_name = name.clone();
                }
                if let Some(key) = entry.remote_control_key_id {
                    info.remote_control_key_id = Some(key);
                }
                if !entry.partial_reception_service_ids.is_empty() {
                    oneseg_sids
                        .entry(tsid)
                        .or_default()
                        .extend(entry.partial_reception_service_ids.iter().copied());
                }
            } else {
                if let Some(frequency) = entry.satellite_frequency {
                    info.satellite_frequency = Some(frequency);
                }
                // Terrestrial NITs carry a region blurb here, useless as a
                // station name; only satellite networks use it.
                if let Some(name) = &nit.network_name {
                    info.network_name = name.clone();
                }
            }
        }
    }

    renumber_bs_slots(&mut ts_map);

    if target.kind() == BroadcastKind::Terrestrial {
        // PSI cannot tell which RF channel was received; the tuned one is
        // authoritative, and an actual-network NIT lists only its own TS.
        if ts_map.len() > 1 {
            warn!(
                "{}: terrestrial NIT listed {} transport streams",
                target.physical_channel,
                ts_map.len()
            );
        }
        for info in ts_map.values_mut() {
            info.physical_channel = target.physical_channel;
        }
    }

    for sdt in &tables.sdt {
        let Some(info) = ts_map.get_mut(&sdt.transport_stream_id) else {
            continue;
        };
        for entry in &sdt.services {
            let service = ServiceInfo {
                channel_number: String::new(),
                service_id: entry.service_id,
                service_type: entry.service_type.unwrap_or(0),
                service_name: entry
                    .service_name
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string()),
                is_free: !entry.free_ca_mode,
                is_oneseg: false,
            };
            match info
                .services
                .iter_mut()
                .find(|s| s.service_id == entry.service_id)
            {
                Some(existing) => {
                    warn!(
                        "{}: service {} described twice; keeping the later record",
                        target.physical_channel, entry.service_id
                    );
                    *existing = service;
                }
                None => info.services.push(service),
            }
        }
    }

    let mut streams: Vec<TransportStreamInfo> = ts_map.into_values().collect();
    for info in &mut streams {
        if let Some(sids) = oneseg_sids.get(&info.transport_stream_id) {
            for service in &mut info.services {
                if sids.contains(&service.service_id) {
                    service.is_oneseg = true;
                }
            }
        }

        // Engineering services and entries with no usable type are not
        // receivable content.
        info.services
            .retain(|s| service_type::is_receivable_content(s.service_type));

        let terrestrial = NID_TERRESTRIAL.contains(&info.network_id);
        for service in &mut info.services {
            service.channel_number = if terrestrial {
                terrestrial_channel_number(
                    service.service_id,
                    info.remote_control_key_id.unwrap_or(0),
                )
            } else {
                satellite_channel_number(service.service_id)
            };
        }
        info.services.sort_by_key(|s| s.service_id);

        if info.network_name.is_empty() {
            info.network_name = "Unknown".to_string();
        }
    }
    streams.sort_by_key(|info| info.physical_channel);
    streams
}

/// Renumber BS relative TS numbers per transponder into a 0-started
/// consecutive sequence. Band reorganizations leave gaps in the announced
/// numbers, while the drivers select by a 0-started index.
fn renumber_bs_slots(ts_map: &mut BTreeMap<u16, TransportStreamInfo>) {
    let mut groups: BTreeMap<u8, Vec<u16>> = BTreeMap::new();
    for info in ts_map.values() {
        if info.network_id == NID_BS {
            if let Some(transponder) = info.satellite_transponder {
                groups.entry(transponder).or_default().push(info.transport_stream_id);
            }
        }
    }
    for (transponder, mut tsids) in groups {
        tsids.sort_by_key(|tsid| {
            ts_map
                .get(tsid)
                .and_then(|info| info.satellite_slot_number)
                .unwrap_or(u8::MAX)
        });
        for (new_slot, tsid) in tsids.iter().enumerate() {
            if let Some(info) = ts_map.get_mut(tsid) {
                let slot = new_slot as u8;
                info.satellite_slot_number = Some(slot);
                info.physical_channel = PhysicalChannel::BsSlot { transponder, slot };
            }
        }
    }
}
