//! EDCB channel-set files (ChSet4/ChSet5).
//!
//! Both are headerless tab-separated files that EDCB insists on reading
//! as UTF-8 with a BOM. ChSet4 is per-tuner (with the tuning-space and
//! per-space channel index), ChSet5 is the receiver-wide service list.

use isdbscan_model::types::service_type;
use isdbscan_model::{BandStreams, TransportStreamInfo};

const BOM: &str = "\u{feff}";

/// Render a ChSet4 file.
///
/// Columns: ch name, service name, network name, space, ch, NID, TSID,
/// SID, service type, partial flag, view flag, remote-control key.
/// Spaces are 0/1/2 for terrestrial/BS/CS, each with its own 0-based
/// channel index per transport stream.
pub fn chset4(view: &BandStreams) -> String {
    let mut out = String::from(BOM);
    for (space, streams) in [&view.terrestrial, &view.bs, &view.cs].into_iter().enumerate() {
        for (ch_index, ts) in streams.iter().enumerate() {
            let prefix = match space {
                0 => "Terrestrial",
                1 => "BS",
                _ => "CS",
            };
            for service in &ts.services {
                let row = [
                    format!("{prefix}:{}", ts.physical_channel),
                    service.service_name.clone(),
                    ts.network_name.clone(),
                    space.to_string(),
                    ch_index.to_string(),
                    ts.network_id.to_string(),
                    ts.transport_stream_id.to_string(),
                    service.service_id.to_string(),
                    service.service_type.to_string(),
                    u8::from(service.is_oneseg).to_string(),
                    u8::from(service.service_type == service_type::DIGITAL_TV).to_string(),
                    ts.remote_control_key_id.unwrap_or(0).to_string(),
                ];
                out.push_str(&row.join("\t"));
                out.push('\n');
            }
        }
    }
    out
}

/// Render the ChSet5 file.
///
/// Columns: service name, network name, NID, TSID, SID, service type,
/// partial flag, EPG flag, search flag; rows sorted by (NID, TSID).
pub fn chset5(view: &BandStreams) -> String {
    let mut streams: Vec<&TransportStreamInfo> = view
        .terrestrial
        .iter()
        .chain(view.bs.iter())
        .chain(view.cs.iter())
        .collect();
    streams.sort_by_key(|ts| (ts.network_id, ts.transport_stream_id));

    let mut out = String::from(BOM);
    for ts in streams {
        for service in &ts.services {
            let video = u8::from(service.service_type == service_type::DIGITAL_TV);
            let row = [
                service.service_name.clone(),
                ts.network_name.clone(),
                ts.network_id.to_string(),
                ts.transport_stream_id.to_string(),
                service.service_id.to_string(),
                service.service_type.to_string(),
                u8::from(service.is_oneseg).to_string(),
                video.to_string(),
                video.to_string(),
            ];
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use isdbscan_model::types::terrestrial_channel_number;
    use isdbscan_model::{PhysicalChannel, ServiceInfo};

    fn view() -> BandStreams {
        let mut ter = TransportStreamInfo::new(0x7FE8, 0x7FE0, PhysicalChannel::Terrestrial(27));
        ter.network_name = "NHK総合".to_string();
        ter.remote_control_key_id = Some(1);
        ter.services.push(ServiceInfo {
            channel_number: terrestrial_channel_number(1024, 1),
            service_id: 1024,
            service_type: service_type::DIGITAL_TV,
            service_name: "NHK総合1".to_string(),
            is_free: true,
            is_oneseg: false,
        });

        let mut bs = TransportStreamInfo::new(
            0x0004,
            0x4010,
            PhysicalChannel::BsSlot { transponder: 1, slot: 0 },
        );
        bs.network_name = "BSデジタル".to_string();
        bs.services.push(ServiceInfo {
            channel_number: "101".to_string(),
            service_id: 101,
            service_type: service_type::DIGITAL_TV,
            service_name: "BS朝日".to_string(),
            is_free: true,
            is_oneseg: false,
        });

        BandStreams {
            terrestrial: vec![ter],
            bs: vec![bs],
            cs: vec![],
        }
    }

    #[test]
    fn test_chset4_rows() {
        let rendered = chset4(&view());
        assert!(rendered.starts_with('\u{feff}'));
        let lines: Vec<&str> = rendered.trim_start_matches('\u{feff}').lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "Terrestrial:T27\tNHK総合1\tNHK総合\t0\t0\t32744\t32736\t1024\t1\t0\t1\t1"
        );
        assert_eq!(
            lines[1],
            "BS:BS01/TS0\tBS朝日\tBSデジタル\t1\t0\t4\t16400\t101\t1\t0\t1\t0"
        );
    }

    #[test]
    fn test_chset5_sorted_by_nid_tsid() {
        let rendered = chset5(&view());
        let lines: Vec<&str> = rendered.trim_start_matches('\u{feff}').lines().collect();
        assert_eq!(lines.len(), 2);
        // BS (NID 4) sorts before terrestrial (NID 32744)
        assert!(lines[0].starts_with("BS朝日\tBSデジタル\t4\t16400\t101\t1\t0\t1\t1"));
        assert!(lines[1].starts_with("NHK総合1\tNHK総合\t32744\t32736\t1024\t1\t0\t1\t1"));
    }
}
