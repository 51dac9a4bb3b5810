//! Broadcast band classification and physical channel selectors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A channel or LNB selector string that could not be understood.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid selector: {0}")]
pub struct ParseSelectorError(String);

/// Network ID of the BS network.
pub const NID_BS: u16 = 0x0004;
/// Network ID of the CS1 network (former Plat-One transponders).
pub const NID_CS1: u16 = 0x0006;
/// Network ID of the CS2 network (former SKY PerfecTV! 2 transponders).
pub const NID_CS2: u16 = 0x0007;
/// Inclusive network ID range assigned to digital terrestrial stations
/// (ARIB STD-B10 第2部 付録N, including the 県複フラグ=1 range).
pub const NID_TERRESTRIAL: std::ops::RangeInclusive<u16> = 0x7880..=0x7FE8;

/// First terrestrial physical channel (UHF 13ch).
pub const TERRESTRIAL_CH_MIN: u8 = 13;
/// Last terrestrial physical channel. 53-62ch were retired nationally but
/// cable community channels still transmit there.
pub const TERRESTRIAL_CH_MAX: u8 = 62;

/// CS transponders operated as the CS1 network; every other ND transponder
/// belongs to CS2.
pub const CS1_TRANSPONDERS: [u8; 3] = [2, 8, 10];

/// Broadcast band a transport stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BroadcastKind {
    /// Digital terrestrial television (ISDB-T).
    Terrestrial,
    /// BS satellite broadcasting (ISDB-S).
    Bs,
    /// 110-degree CS satellite broadcasting, CS1 network.
    Cs1,
    /// 110-degree CS satellite broadcasting, CS2 network.
    Cs2,
}

impl BroadcastKind {
    /// Classify a band from a network ID.
    pub fn from_network_id(nid: u16) -> Option<Self> {
        match nid {
            NID_BS => Some(BroadcastKind::Bs),
            NID_CS1 => Some(BroadcastKind::Cs1),
            NID_CS2 => Some(BroadcastKind::Cs2),
            nid if NID_TERRESTRIAL.contains(&nid) => Some(BroadcastKind::Terrestrial),
            _ => None,
        }
    }

    /// True for the BS/CS bands.
    pub fn is_satellite(self) -> bool {
        !matches!(self, BroadcastKind::Terrestrial)
    }

    /// Display name used in logs and exported files.
    pub fn name(self) -> &'static str {
        match self {
            BroadcastKind::Terrestrial => "Terrestrial",
            BroadcastKind::Bs => "BS",
            BroadcastKind::Cs1 => "CS1",
            BroadcastKind::Cs2 => "CS2",
        }
    }
}

impl fmt::Display for BroadcastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// LNB power supplied to the satellite antenna while tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LnbVoltage {
    /// Let the tuner decide (no explicit supply).
    #[default]
    Low,
    /// 11 V feed.
    V11,
    /// 15 V feed.
    V15,
}

impl LnbVoltage {
    /// Spelling accepted by the external tuning tool's `--lnb` flag.
    pub fn as_arg(self) -> &'static str {
        match self {
            LnbVoltage::Low => "low",
            LnbVoltage::V11 => "11v",
            LnbVoltage::V15 => "15v",
        }
    }
}

impl fmt::Display for LnbVoltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

impl FromStr for LnbVoltage {
    type Err = ParseSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(LnbVoltage::Low),
            "11v" => Ok(LnbVoltage::V11),
            "15v" => Ok(LnbVoltage::V15),
            other => Err(ParseSelectorError(other.to_string())),
        }
    }
}

/// A physical channel the tuner can lock.
///
/// The derived ordering is scan/export order: terrestrial channels by
/// number, then BS transponders by (transponder, relative TS), then CS
/// transponders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhysicalChannel {
    /// Terrestrial UHF channel number (13-62).
    Terrestrial(u8),
    /// BS transponder with its relative TS number.
    BsSlot { transponder: u8, slot: u8 },
    /// 110-degree CS transponder (ND number).
    Nd(u8),
}

impl PhysicalChannel {
    /// Band this channel belongs to. For ND transponders the CS1/CS2 split
    /// follows the transponders CS1 actually operates on.
    pub fn kind(self) -> BroadcastKind {
        match self {
            PhysicalChannel::Terrestrial(_) => BroadcastKind::Terrestrial,
            PhysicalChannel::BsSlot { .. } => BroadcastKind::Bs,
            PhysicalChannel::Nd(nd) if CS1_TRANSPONDERS.contains(&nd) => BroadcastKind::Cs1,
            PhysicalChannel::Nd(_) => BroadcastKind::Cs2,
        }
    }

    /// Spelling accepted by the external tuning tool
    /// (`T13`, `BS01_0`, `CS04`).
    pub fn tuner_arg(self) -> String {
        match self {
            PhysicalChannel::Terrestrial(ch) => format!("T{ch}"),
            PhysicalChannel::BsSlot { transponder, slot } => format!("BS{transponder:02}_{slot}"),
            PhysicalChannel::Nd(nd) => format!("CS{nd:02}"),
        }
    }
}

impl fmt::Display for PhysicalChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PhysicalChannel::Terrestrial(ch) => write!(f, "T{ch}"),
            PhysicalChannel::BsSlot { transponder, slot } => {
                write!(f, "BS{transponder:02}/TS{slot}")
            }
            PhysicalChannel::Nd(nd) => write!(f, "ND{nd:02}"),
        }
    }
}

impl FromStr for PhysicalChannel {
    type Err = ParseSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ParseSelectorError(s.to_string());
        if let Some(ch) = s.strip_prefix('T') {
            let ch: u8 = ch.parse().map_err(|_| bad())?;
            return Ok(PhysicalChannel::Terrestrial(ch));
        }
        if let Some(rest) = s.strip_prefix("BS") {
            let (tp, slot) = rest.split_once("/TS").ok_or_else(bad)?;
            let transponder: u8 = tp.parse().map_err(|_| bad())?;
            let slot: u8 = slot.parse().map_err(|_| bad())?;
            return Ok(PhysicalChannel::BsSlot { transponder, slot });
        }
        if let Some(nd) = s.strip_prefix("ND") {
            let nd: u8 = nd.parse().map_err(|_| bad())?;
            return Ok(PhysicalChannel::Nd(nd));
        }
        Err(bad())
    }
}

// Serialized as the display string ("T13", "BS01/TS0", "ND04") so exported
// JSON carries the human-readable selector.
impl Serialize for PhysicalChannel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PhysicalChannel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_network_id() {
        assert_eq!(BroadcastKind::from_network_id(0x0004), Some(BroadcastKind::Bs));
        assert_eq!(BroadcastKind::from_network_id(0x0006), Some(BroadcastKind::Cs1));
        assert_eq!(BroadcastKind::from_network_id(0x0007), Some(BroadcastKind::Cs2));
        assert_eq!(
            BroadcastKind::from_network_id(0x7FE8),
            Some(BroadcastKind::Terrestrial)
        );
        assert_eq!(
            BroadcastKind::from_network_id(0x7880),
            Some(BroadcastKind::Terrestrial)
        );
        assert_eq!(BroadcastKind::from_network_id(0x000A), None);
    }

    #[test]
    fn test_cs_network_split_by_transponder() {
        assert_eq!(PhysicalChannel::Nd(2).kind(), BroadcastKind::Cs1);
        assert_eq!(PhysicalChannel::Nd(8).kind(), BroadcastKind::Cs1);
        assert_eq!(PhysicalChannel::Nd(10).kind(), BroadcastKind::Cs1);
        assert_eq!(PhysicalChannel::Nd(4).kind(), BroadcastKind::Cs2);
        assert_eq!(PhysicalChannel::Nd(24).kind(), BroadcastKind::Cs2);
    }

    #[test]
    fn test_tuner_arg_spelling() {
        assert_eq!(PhysicalChannel::Terrestrial(13).tuner_arg(), "T13");
        assert_eq!(
            PhysicalChannel::BsSlot { transponder: 1, slot: 0 }.tuner_arg(),
            "BS01_0"
        );
        assert_eq!(PhysicalChannel::Nd(4).tuner_arg(), "CS04");
    }

    #[test]
    fn test_display_roundtrip() {
        for ch in [
            PhysicalChannel::Terrestrial(26),
            PhysicalChannel::BsSlot { transponder: 23, slot: 3 },
            PhysicalChannel::Nd(10),
        ] {
            let parsed: PhysicalChannel = ch.to_string().parse().unwrap();
            assert_eq!(parsed, ch);
        }
    }

    #[test]
    fn test_scan_order() {
        let mut channels = vec![
            PhysicalChannel::Nd(2),
            PhysicalChannel::BsSlot { transponder: 1, slot: 0 },
            PhysicalChannel::Terrestrial(62),
            PhysicalChannel::Terrestrial(13),
        ];
        channels.sort();
        assert_eq!(
            channels,
            vec![
                PhysicalChannel::Terrestrial(13),
                PhysicalChannel::Terrestrial(62),
                PhysicalChannel::BsSlot { transponder: 1, slot: 0 },
                PhysicalChannel::Nd(2),
            ]
        );
    }
}
