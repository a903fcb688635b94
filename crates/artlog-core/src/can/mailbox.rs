//! Per-slot frame mailboxes
//!
//! [`CanBus`] is the reception side: it filters incoming frames against the
//! registered slots and latches each accepted frame into that slot's mailbox.
//! [`CanMailbox`] is drained by the sampling loop once per tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::CanFrame;
use crate::channel::ChannelRegistry;
use crate::latch::{latch, LatchReader, LatchWriter};

/// Create the reception and sampling halves for every enabled CAN slot
pub fn mailbox(registry: &ChannelRegistry) -> (CanBus, CanMailbox) {
    let bus_error = Arc::new(AtomicBool::new(false));
    let mut filters = Vec::new();
    let mut slots = Vec::new();

    for (idx, channel) in registry.enabled_can() {
        let (tx, rx) = latch(CanFrame::default());
        filters.push(SlotFilter {
            slot: idx,
            message_id: channel.message_id,
            id_mask: channel.id_mask,
            tx,
        });
        slots.push((idx, rx));
    }

    (
        CanBus {
            filters,
            bus_error: Arc::clone(&bus_error),
        },
        CanMailbox { slots, bus_error },
    )
}

struct SlotFilter {
    slot: usize,
    message_id: u32,
    id_mask: u32,
    tx: LatchWriter<CanFrame>,
}

impl SlotFilter {
    fn accepts(&self, id: u32) -> bool {
        (id & self.id_mask) == (self.message_id & self.id_mask)
    }
}

/// Reception side of the CAN mailboxes
pub struct CanBus {
    filters: Vec<SlotFilter>,
    bus_error: Arc<AtomicBool>,
}

impl CanBus {
    /// Latch a received frame into the first slot that accepts its ID.
    ///
    /// A matched frame clears the bus error flag. Returns the slot index, or
    /// `None` when no registered slot accepts the frame.
    pub fn deliver(&self, frame: CanFrame) -> Option<usize> {
        let filter = self.filters.iter().find(|f| f.accepts(frame.id))?;
        filter.tx.publish(frame);
        self.bus_error.store(false, Ordering::Release);
        Some(filter.slot)
    }

    /// Record a controller status fault
    pub fn report_bus_error(&self) {
        if !self.bus_error.swap(true, Ordering::AcqRel) {
            tracing::warn!("CAN controller reported a bus error");
        }
    }

    /// Registered slot indices
    pub fn slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.filters.iter().map(|f| f.slot)
    }
}

/// Sampling side of the CAN mailboxes
pub struct CanMailbox {
    slots: Vec<(usize, LatchReader<CanFrame>)>,
    bus_error: Arc<AtomicBool>,
}

impl CanMailbox {
    /// Decode every frame received since the last tick into the registry.
    ///
    /// Slots without a new frame keep their raw values. Returns the number of
    /// frames decoded.
    pub fn drain_into(&mut self, registry: &mut ChannelRegistry) -> usize {
        let mut decoded = 0;
        for (idx, rx) in &mut self.slots {
            let Some(frame) = rx.take() else {
                continue;
            };
            if let Some(channel) = registry.can_mut(*idx).filter(|ch| ch.enabled) {
                let raw = frame.decode(channel.raw());
                channel.load_raw(raw);
                decoded += 1;
            }
        }
        decoded
    }

    /// Whether a bus error is pending (cleared by the next matched frame)
    pub fn bus_error(&self) -> bool {
        self.bus_error.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::CanChannel;

    fn registry() -> ChannelRegistry {
        let mut reg = ChannelRegistry::new();
        *reg.can_mut(2).unwrap() = CanChannel::new(0x300, 0xFFFFF, Default::default());
        *reg.can_mut(5).unwrap() = CanChannel::new(0x123, 0xFFFFF, Default::default());
        reg
    }

    #[test]
    fn test_deliver_and_drain() {
        let mut reg = registry();
        let (bus, mut mailbox) = mailbox(&reg);
        assert_eq!(bus.slots().collect::<Vec<_>>(), vec![2, 5]);

        assert_eq!(bus.deliver(CanFrame::new(0x123, &[0, 1, 0, 2, 0, 3, 0, 4])), Some(5));
        assert_eq!(bus.deliver(CanFrame::new(0x999, &[0xFF; 8])), None);

        assert_eq!(mailbox.drain_into(&mut reg), 1);
        assert_eq!(reg.can(5).unwrap().raw(), [1, 2, 3, 4]);
        assert_eq!(reg.can(2).unwrap().raw(), [0, 0, 0, 0]);

        // nothing new: values retained
        assert_eq!(mailbox.drain_into(&mut reg), 0);
        assert_eq!(reg.can(5).unwrap().raw(), [1, 2, 3, 4]);
    }

    #[test]
    fn test_mask_matching() {
        let mut reg = ChannelRegistry::new();
        *reg.can_mut(0).unwrap() = CanChannel::new(0x18FEF100, 0x0000FFFF, Default::default());
        let (bus, _mailbox) = mailbox(&reg);

        assert_eq!(bus.deliver(CanFrame::new(0x18FEF100, &[0; 8])), Some(0));
        assert_eq!(bus.deliver(CanFrame::new(0x0CFEF100, &[0; 8])), Some(0));
        assert_eq!(bus.deliver(CanFrame::new(0x18FEF200, &[0; 8])), None);
    }

    #[test]
    fn test_latest_frame_wins() {
        let mut reg = registry();
        let (bus, mut mailbox) = mailbox(&reg);
        bus.deliver(CanFrame::new(0x300, &[0, 1]));
        bus.deliver(CanFrame::new(0x300, &[0, 2]));
        mailbox.drain_into(&mut reg);
        assert_eq!(reg.can(2).unwrap().raw()[0], 2);
    }

    #[test]
    fn test_bus_error_cleared_by_match() {
        let reg = registry();
        let (bus, mailbox) = mailbox(&reg);

        bus.report_bus_error();
        assert!(mailbox.bus_error());

        bus.deliver(CanFrame::new(0x777, &[0; 8]));
        assert!(mailbox.bus_error());

        bus.deliver(CanFrame::new(0x300, &[0; 8]));
        assert!(!mailbox.bus_error());
    }
}
