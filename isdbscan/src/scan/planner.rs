//! Scan target planning.

use isdbscan_model::{
    channel::{TERRESTRIAL_CH_MAX, TERRESTRIAL_CH_MIN},
    BroadcastKind, PhysicalChannel,
};

/// One unit of scan work: a physical channel to lock and analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTarget {
    pub physical_channel: PhysicalChannel,
}

impl ScanTarget {
    pub fn kind(&self) -> BroadcastKind {
        self.physical_channel.kind()
    }
}

/// Build the ordered target list.
///
/// Terrestrial channels are scanned exhaustively, 13ch through 62ch; the
/// 53-62 range was retired nationally but cable community channels still
/// use it. Each satellite network needs only one representative channel
/// because its NIT announces the whole transponder map:
///
/// - BS via BS01/TS0. The operational default TS would be BS15/TS0, but
///   its NIT repetition is unreliable on common hardware, so the first
///   transponder is probed instead.
/// - CS1 via ND02 and CS2 via ND04, both dropped entirely when pay TV is
///   excluded: CS carries no free-to-air lineup worth a probe. BS stays
///   either way since it mixes free and pay services; those are filtered
///   after the scan.
pub fn plan(include_pay_tv: bool) -> Vec<ScanTarget> {
    let mut targets: Vec<ScanTarget> = (TERRESTRIAL_CH_MIN..=TERRESTRIAL_CH_MAX)
        .map(|ch| ScanTarget {
            physical_channel: PhysicalChannel::Terrestrial(ch),
        })
        .collect();

    targets.push(ScanTarget {
        physical_channel: PhysicalChannel::BsSlot { transponder: 1, slot: 0 },
    });
    if include_pay_tv {
        targets.push(ScanTarget {
            physical_channel: PhysicalChannel::Nd(2),
        });
        targets.push(ScanTarget {
            physical_channel: PhysicalChannel::Nd(4),
        });
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_plan() {
        let targets = plan(true);
        assert_eq!(targets.len(), 50 + 3);
        assert_eq!(
            targets[0].physical_channel,
            PhysicalChannel::Terrestrial(13)
        );
        assert_eq!(
            targets[49].physical_channel,
            PhysicalChannel::Terrestrial(62)
        );
        assert_eq!(
            targets[50].physical_channel,
            PhysicalChannel::BsSlot { transponder: 1, slot: 0 }
        );
        assert_eq!(targets[51].kind(), BroadcastKind::Cs1);
        assert_eq!(targets[52].kind(), BroadcastKind::Cs2);
    }

    #[test]
    fn test_pay_tv_exclusion_drops_cs_only() {
        let targets = plan(false);
        assert_eq!(targets.len(), 50 + 1);
        assert!(targets.iter().all(|t| !matches!(
            t.kind(),
            BroadcastKind::Cs1 | BroadcastKind::Cs2
        )));
        // BS is retained unconditionally.
        assert!(targets.iter().any(|t| t.kind() == BroadcastKind::Bs));
    }

    #[test]
    fn test_terrestrial_ascending() {
        let targets = plan(false);
        let channels: Vec<_> = targets
            .iter()
            .filter_map(|t| match t.physical_channel {
                PhysicalChannel::Terrestrial(ch) => Some(ch),
                _ => None,
            })
            .collect();
        assert!(channels.windows(2).all(|w| w[0] < w[1]));
    }
}
