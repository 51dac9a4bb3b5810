//! Tuner device enumeration.
//!
//! Covers the chardev driver families the scanner supports. Device files
//! appear under `/dev` with fixed names per driver; which half of a
//! PT/PX-series board a node belongs to is encoded in its number.

use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use isdbscan_model::BroadcastKind;

/// What a tuner can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunerCapability {
    /// ISDB-T only.
    Terrestrial,
    /// ISDB-S only.
    Satellite,
    /// ISDB-T/ISDB-S combined.
    Multi,
}

impl TunerCapability {
    /// Whether a tuner of this capability can probe the given band.
    pub fn supports(self, kind: BroadcastKind) -> bool {
        match self {
            TunerCapability::Multi => true,
            TunerCapability::Terrestrial => kind == BroadcastKind::Terrestrial,
            TunerCapability::Satellite => kind.is_satellite(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TunerCapability::Terrestrial => "Terrestrial",
            TunerCapability::Satellite => "Satellite",
            TunerCapability::Multi => "Multi",
        }
    }
}

impl fmt::Display for TunerCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One enumerated tuner device.
#[derive(Debug, Clone)]
pub struct TunerDevice {
    pub path: PathBuf,
    pub name: String,
    pub capability: TunerCapability,
    /// Held open by another process at enumeration time; such devices are
    /// excluded from allocation entirely.
    pub busy: bool,
}

/// Source of tuner devices. The chardev implementation below is the real
/// one; tests substitute their own.
pub trait DeviceEnumerator {
    fn enumerate(&self) -> io::Result<Vec<TunerDevice>>;
}

/// Enumerates the known chardev tuner device files.
pub struct ChardevEnumerator;

impl DeviceEnumerator for ChardevEnumerator {
    fn enumerate(&self) -> io::Result<Vec<TunerDevice>> {
        // Dedicated tuners first so combined ones stay free for whichever
        // band still needs them.
        let mut devices = Vec::new();
        for (path, capability, name) in known_device_table() {
            if !is_char_device(&path) {
                continue;
            }
            let busy = is_busy(&path);
            devices.push(TunerDevice { path, name, capability, busy });
        }
        Ok(devices)
    }
}

/// All known chardev device paths with capability and display name, in
/// allocation-preference order.
fn known_device_table() -> Vec<(PathBuf, TunerCapability, String)> {
    let mut table = Vec::new();

    // Earthsoft PT1/PT2/PT3 and PLEX PX4/PX5 series expose four nodes per
    // board: numbers 0,1 mod 4 are satellite, 2,3 mod 4 terrestrial.
    for (prefix, label) in [
        ("pt1video", "Earthsoft PT1/PT2"),
        ("pt3video", "Earthsoft PT3"),
        ("px4video", "PLEX PX4/PX5 Series"),
    ] {
        for n in 0..16u32 {
            let (capability, unit) = pt_style_split(n);
            if capability == TunerCapability::Terrestrial {
                continue;
            }
            table.push((
                PathBuf::from(format!("/dev/{prefix}{n}")),
                capability,
                format!("{label} (Satellite) #{unit}"),
            ));
        }
    }
    for (prefix, label) in [
        ("pt1video", "Earthsoft PT1/PT2"),
        ("pt3video", "Earthsoft PT3"),
        ("px4video", "PLEX PX4/PX5 Series"),
    ] {
        for n in 0..16u32 {
            let (capability, unit) = pt_style_split(n);
            if capability == TunerCapability::Satellite {
                continue;
            }
            table.push((
                PathBuf::from(format!("/dev/{prefix}{n}")),
                capability,
                format!("{label} (Terrestrial) #{unit}"),
            ));
        }
    }

    // Single-capability USB boxes.
    for n in 0..8u32 {
        table.push((
            PathBuf::from(format!("/dev/pxs1urvideo{n}")),
            TunerCapability::Terrestrial,
            format!("PLEX PX-S1UR #{}", n + 1),
        ));
    }
    for n in 0..8u32 {
        table.push((
            PathBuf::from(format!("/dev/isdbt2071video{n}")),
            TunerCapability::Terrestrial,
            format!("e-better DTV03A-1TU #{}", n + 1),
        ));
    }

    // Combined ISDB-T/ISDB-S tuners.
    for n in 0..8u32 {
        table.push((
            PathBuf::from(format!("/dev/isdb6014video{n}")),
            TunerCapability::Multi,
            format!("e-better DTV02A-4TS-P #{}", n + 1),
        ));
    }
    for n in 0..10u32 {
        table.push((
            PathBuf::from(format!("/dev/pxmlt5video{n}")),
            TunerCapability::Multi,
            format!("PLEX PX-MLT5PE #{}", n + 1),
        ));
    }
    for n in 0..16u32 {
        table.push((
            PathBuf::from(format!("/dev/pxmlt8video{n}")),
            TunerCapability::Multi,
            format!("PLEX PX-MLT8PE #{}", n + 1),
        ));
    }
    for n in 0..8u32 {
        table.push((
            PathBuf::from(format!("/dev/isdb2056video{n}")),
            TunerCapability::Multi,
            format!("e-better DTV02A-1T1S-U #{}", n + 1),
        ));
    }
    for n in 0..8u32 {
        table.push((
            PathBuf::from(format!("/dev/pxm1urvideo{n}")),
            TunerCapability::Multi,
            format!("PLEX PX-M1UR #{}", n + 1),
        ));
    }

    table
}

/// Capability and per-board unit number of a PT/PX-style node.
fn pt_style_split(n: u32) -> (TunerCapability, u32) {
    let remainder = n % 4;
    let (capability, mut unit) = if remainder < 2 {
        (TunerCapability::Satellite, n / 4 * 2 + 1)
    } else {
        (TunerCapability::Terrestrial, (n - 2) / 4 * 2 + 1)
    };
    if remainder == 1 || remainder == 3 {
        unit += 1;
    }
    (capability, unit)
}

fn is_char_device(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.file_type().is_char_device())
        .unwrap_or(false)
}

/// A tuner held by another process fails a read-write open with
/// EBUSY (V4L-DVB drivers) or EALREADY (chardev drivers).
fn is_busy(path: &Path) -> bool {
    const EALREADY: i32 = 114;
    match OpenOptions::new().read(true).write(true).open(path) {
        Ok(_) => false,
        Err(e) => {
            e.kind() == io::ErrorKind::ResourceBusy || e.raw_os_error() == Some(EALREADY)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pt_style_split() {
        // PT boards: 0,1 satellite; 2,3 terrestrial; next board continues.
        assert_eq!(pt_style_split(0), (TunerCapability::Satellite, 1));
        assert_eq!(pt_style_split(1), (TunerCapability::Satellite, 2));
        assert_eq!(pt_style_split(2), (TunerCapability::Terrestrial, 1));
        assert_eq!(pt_style_split(3), (TunerCapability::Terrestrial, 2));
        assert_eq!(pt_style_split(4), (TunerCapability::Satellite, 3));
        assert_eq!(pt_style_split(7), (TunerCapability::Terrestrial, 4));
    }

    #[test]
    fn test_capability_supports() {
        assert!(TunerCapability::Multi.supports(BroadcastKind::Terrestrial));
        assert!(TunerCapability::Multi.supports(BroadcastKind::Bs));
        assert!(TunerCapability::Terrestrial.supports(BroadcastKind::Terrestrial));
        assert!(!TunerCapability::Terrestrial.supports(BroadcastKind::Cs1));
        assert!(TunerCapability::Satellite.supports(BroadcastKind::Cs2));
        assert!(!TunerCapability::Satellite.supports(BroadcastKind::Terrestrial));
    }

    #[test]
    fn test_dedicated_tuners_listed_before_multi() {
        let table = known_device_table();
        let first_multi = table
            .iter()
            .position(|(_, c, _)| *c == TunerCapability::Multi)
            .unwrap();
        assert!(table[..first_multi]
            .iter()
            .all(|(_, c, _)| *c != TunerCapability::Multi));
    }
}
