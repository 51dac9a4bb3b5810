//! `Channels.json` output.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use isdbscan_model::{BandStreams, TransportStreamInfo};

#[derive(Serialize)]
struct ChannelsDocument<'a> {
    #[serde(rename = "Terrestrial")]
    terrestrial: &'a [TransportStreamInfo],
    #[serde(rename = "BS")]
    bs: &'a [TransportStreamInfo],
    #[serde(rename = "CS")]
    cs: &'a [TransportStreamInfo],
}

/// Write the scan result as indented JSON grouped per band.
pub fn write_channels_json(path: &Path, view: &BandStreams) -> io::Result<()> {
    let document = ChannelsDocument {
        terrestrial: &view.terrestrial,
        bs: &view.bs,
        cs: &view.cs,
    };

    let file = BufWriter::new(File::create(path)?);
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(file, formatter);
    document
        .serialize(&mut serializer)
        .map_err(io::Error::other)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use isdbscan_model::PhysicalChannel;

    #[test]
    fn test_document_shape() {
        let mut ts = TransportStreamInfo::new(0x0004, 0x4010, PhysicalChannel::BsSlot {
            transponder: 1,
            slot: 0,
        });
        ts.network_name = "BS".to_string();
        let view = BandStreams {
            bs: vec![ts],
            ..Default::default()
        };
        let document = ChannelsDocument {
            terrestrial: &view.terrestrial,
            bs: &view.bs,
            cs: &view.cs,
        };
        let value = serde_json::to_value(&document).unwrap();
        assert!(value["Terrestrial"].as_array().unwrap().is_empty());
        assert_eq!(value["BS"][0]["physical_channel"], "BS01/TS0");
        assert_eq!(value["BS"][0]["network_id"], 4);
        assert!(value["CS"].as_array().unwrap().is_empty());
    }
}
