//! Tuner allocation pool.
//!
//! Every probe exclusively owns one tuner for its duration; the pool is
//! the only shared mutable state in a scan. Allocation and the busy mark
//! happen under one lock so a device can never be handed out twice, and
//! leases give the device back on drop, whatever path the probe exits by.

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use isdbscan_model::BroadcastKind;

use super::device::TunerDevice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    Leased,
    /// Held by another process at enumeration; never allocated.
    Unavailable,
    /// Open failed earlier in this run; not tried again.
    Disabled,
}

#[derive(Debug)]
struct Slot {
    device: TunerDevice,
    state: SlotState,
}

/// Pool of enumerated tuner devices.
pub struct TunerPool {
    slots: Mutex<Vec<Slot>>,
}

impl TunerPool {
    /// Build a pool from enumeration results. Devices reported busy by
    /// another process are registered but never allocated.
    pub fn new(devices: Vec<TunerDevice>) -> Self {
        let slots = devices
            .into_iter()
            .map(|device| {
                let state = if device.busy {
                    info!("tuner {} is in use by another process", device.path.display());
                    SlotState::Unavailable
                } else {
                    SlotState::Free
                };
                Slot { device, state }
            })
            .collect();
        Self { slots: Mutex::new(slots) }
    }

    /// Try to allocate the first free tuner able to probe `kind`.
    ///
    /// Returns `None` when every matching tuner is leased, disabled or
    /// unavailable; callers retry with backoff rather than block.
    pub fn try_acquire(self: &Arc<Self>, kind: BroadcastKind) -> Option<TunerLease> {
        let mut slots = self.slots.lock().expect("tuner pool poisoned");
        for (index, slot) in slots.iter_mut().enumerate() {
            if slot.state == SlotState::Free && slot.device.capability.supports(kind) {
                slot.state = SlotState::Leased;
                debug!("acquired tuner {} for {kind}", slot.device.path.display());
                return Some(TunerLease {
                    pool: Arc::clone(self),
                    index,
                    device: slot.device.clone(),
                    failed: false,
                });
            }
        }
        None
    }

    /// Whether any usable tuner (free or currently leased) supports `kind`.
    pub fn supports(&self, kind: BroadcastKind) -> bool {
        let slots = self.slots.lock().expect("tuner pool poisoned");
        slots.iter().any(|s| {
            matches!(s.state, SlotState::Free | SlotState::Leased)
                && s.device.capability.supports(kind)
        })
    }

    /// Number of devices that can currently be allocated.
    pub fn usable_count(&self) -> usize {
        let slots = self.slots.lock().expect("tuner pool poisoned");
        slots
            .iter()
            .filter(|s| matches!(s.state, SlotState::Free | SlotState::Leased))
            .count()
    }

    fn release(&self, index: usize, failed: bool) {
        let mut slots = self.slots.lock().expect("tuner pool poisoned");
        let slot = &mut slots[index];
        if failed {
            warn!(
                "tuner {} failed to open; excluded for the rest of the run",
                slot.device.path.display()
            );
            slot.state = SlotState::Disabled;
        } else {
            slot.state = SlotState::Free;
        }
    }
}

/// Exclusive hold on one tuner. Dropping it frees the device.
pub struct TunerLease {
    pool: Arc<TunerPool>,
    index: usize,
    device: TunerDevice,
    failed: bool,
}

impl TunerLease {
    pub fn device(&self) -> &TunerDevice {
        &self.device
    }

    /// Mark the device as unusable; the drop will disable it instead of
    /// freeing it.
    pub fn mark_failed(&mut self) {
        self.failed = true;
    }
}

impl Drop for TunerLease {
    fn drop(&mut self) {
        self.pool.release(self.index, self.failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuner::device::TunerCapability;
    use std::path::PathBuf;

    fn device(name: &str, capability: TunerCapability, busy: bool) -> TunerDevice {
        TunerDevice {
            path: PathBuf::from(format!("/dev/{name}")),
            name: name.to_string(),
            capability,
            busy,
        }
    }

    #[test]
    fn test_acquire_prefers_first_matching_device() {
        let pool = Arc::new(TunerPool::new(vec![
            device("sat0", TunerCapability::Satellite, false),
            device("ter0", TunerCapability::Terrestrial, false),
            device("multi0", TunerCapability::Multi, false),
        ]));

        let lease = pool.try_acquire(BroadcastKind::Terrestrial).unwrap();
        assert_eq!(lease.device().name, "ter0");

        // Terrestrial tuner taken: the multi tuner backs it up.
        let second = pool.try_acquire(BroadcastKind::Terrestrial).unwrap();
        assert_eq!(second.device().name, "multi0");

        assert!(pool.try_acquire(BroadcastKind::Terrestrial).is_none());
    }

    #[test]
    fn test_release_on_drop() {
        let pool = Arc::new(TunerPool::new(vec![device(
            "ter0",
            TunerCapability::Terrestrial,
            false,
        )]));

        {
            let _lease = pool.try_acquire(BroadcastKind::Terrestrial).unwrap();
            assert!(pool.try_acquire(BroadcastKind::Terrestrial).is_none());
        }
        assert!(pool.try_acquire(BroadcastKind::Terrestrial).is_some());
    }

    #[test]
    fn test_busy_devices_never_allocated() {
        let pool = Arc::new(TunerPool::new(vec![device(
            "ter0",
            TunerCapability::Terrestrial,
            true,
        )]));
        assert!(pool.try_acquire(BroadcastKind::Terrestrial).is_none());
        assert_eq!(pool.usable_count(), 0);
        assert!(!pool.supports(BroadcastKind::Terrestrial));
    }

    #[test]
    fn test_failed_device_stays_disabled() {
        let pool = Arc::new(TunerPool::new(vec![
            device("ter0", TunerCapability::Terrestrial, false),
            device("ter1", TunerCapability::Terrestrial, false),
        ]));

        {
            let mut lease = pool.try_acquire(BroadcastKind::Terrestrial).unwrap();
            assert_eq!(lease.device().name, "ter0");
            lease.mark_failed();
        }

        let lease = pool.try_acquire(BroadcastKind::Terrestrial).unwrap();
        assert_eq!(lease.device().name, "ter1");
        drop(lease);
        // ter0 must not come back.
        let lease = pool.try_acquire(BroadcastKind::Terrestrial).unwrap();
        assert_eq!(lease.device().name, "ter1");
    }

    #[test]
    fn test_satellite_acquire_skips_terrestrial_only() {
        let pool = Arc::new(TunerPool::new(vec![
            device("ter0", TunerCapability::Terrestrial, false),
            device("sat0", TunerCapability::Satellite, false),
        ]));
        let lease = pool.try_acquire(BroadcastKind::Bs).unwrap();
        assert_eq!(lease.device().name, "sat0");
    }
}
