//! Exporters over the finished registry.
//!
//! Exporters only see registry snapshots ([`BandStreams`]); the scan is
//! over by the time they run and nothing here mutates scan state.

pub mod chset;
pub mod json;

use std::io;
use std::path::Path;

use log::info;

use isdbscan_model::ChannelRegistry;

/// Write every output format under `output_dir`.
///
/// `Channels.json` is always the full unfiltered result (BS pay services
/// included); the EDCB channel sets honor the pay-TV exclusion.
pub fn write_all(
    output_dir: &Path,
    registry: &ChannelRegistry,
    exclude_pay_tv: bool,
) -> io::Result<()> {
    let edcb_dir = output_dir.join("EDCB");
    std::fs::create_dir_all(&edcb_dir)?;

    let full = registry.export_view(false);
    let filtered = registry.export_view(exclude_pay_tv);

    let json_path = output_dir.join("Channels.json");
    json::write_channels_json(&json_path, &full)?;
    info!("wrote {}", json_path.display());

    let combined = edcb_dir.join("BonDriver_isdbscan(BonDriver_isdbscan).ChSet4.txt");
    std::fs::write(&combined, chset::chset4(&filtered))?;
    info!("wrote {}", combined.display());

    let terrestrial_only = isdbscan_model::BandStreams {
        terrestrial: filtered.terrestrial.clone(),
        ..Default::default()
    };
    let path = edcb_dir.join("BonDriver_isdbscan_T(BonDriver_isdbscan).ChSet4.txt");
    std::fs::write(&path, chset::chset4(&terrestrial_only))?;
    info!("wrote {}", path.display());

    let satellite_only = isdbscan_model::BandStreams {
        bs: filtered.bs.clone(),
        cs: filtered.cs.clone(),
        ..Default::default()
    };
    let path = edcb_dir.join("BonDriver_isdbscan_S(BonDriver_isdbscan).ChSet4.txt");
    std::fs::write(&path, chset::chset4(&satellite_only))?;
    info!("wrote {}", path.display());

    let path = edcb_dir.join("ChSet5.txt");
    std::fs::write(&path, chset::chset5(&filtered))?;
    info!("wrote {}", path.display());

    Ok(())
}
