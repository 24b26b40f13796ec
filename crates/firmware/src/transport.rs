//! Bridges the controller's [`Transport`] to the USB tasks through a pair of `embassy-sync` channels.

use defmt::*;
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    channel::{self, Channel},
};
use organ_brain_lib::{
    note_bitmap::NOTE_COUNT,
    output_queue::QUEUE_CAPACITY,
    ranks::Rank,
    transport::{KeyEvent, Transport},
    usb_midi::{self, PACKET_LEN},
};
use wmidi::{Note, Velocity};

pub const INBOUND_CAPACITY: usize = 64;
/// Room for everything the organ can send between two waits for an empty channel: a cycle followed by a panic.
///
/// A cycle changes each pipe at most once, so however its instructions are split into batches of
/// `sends_per_batch`, it sends no more than a full queue's worth. The blanket off of a panic then sends one
/// note-off per pipe. A packet which doesn't fit is dropped, so this bound must hold.
pub const OUTBOUND_CAPACITY: usize = QUEUE_CAPACITY + NOTE_COUNT * Rank::ALL.len();

// every pipe of every rank must fit in the queue for the bound above to cover a whole cycle
const _: () = core::assert!(QUEUE_CAPACITY >= NOTE_COUNT * Rank::ALL.len());

pub type Inbound = Channel<CriticalSectionRawMutex, KeyEvent, INBOUND_CAPACITY>;
pub type InboundSender<'a> =
    channel::Sender<'a, CriticalSectionRawMutex, KeyEvent, INBOUND_CAPACITY>;
pub type InboundReceiver<'a> =
    channel::Receiver<'a, CriticalSectionRawMutex, KeyEvent, INBOUND_CAPACITY>;

pub type Outbound = Channel<CriticalSectionRawMutex, [u8; PACKET_LEN], OUTBOUND_CAPACITY>;
pub type OutboundSender<'a> =
    channel::Sender<'a, CriticalSectionRawMutex, [u8; PACKET_LEN], OUTBOUND_CAPACITY>;
pub type OutboundReceiver<'a> =
    channel::Receiver<'a, CriticalSectionRawMutex, [u8; PACKET_LEN], OUTBOUND_CAPACITY>;

/// Non-blocking [`Transport`] over the inbound and outbound channels.
pub struct ChannelTransport {
    inbound: InboundReceiver<'static>,
    outbound: OutboundSender<'static>,
}

impl ChannelTransport {
    pub fn new(inbound: InboundReceiver<'static>, outbound: OutboundSender<'static>) -> Self {
        Self { inbound, outbound }
    }

    fn send(&mut self, channel: wmidi::Channel, note: Note, velocity: Velocity, on: bool) {
        let Some(packet) = usb_midi::note_packet(channel, note, velocity, on) else {
            error!(
                "Could not encode note {} for channel {}",
                note.to_str(),
                channel.number()
            );
            return;
        };
        if self.outbound.try_send(packet).is_err() {
            warn!(
                "Outbound buffer full, dropping {} for channel {}",
                note.to_str(),
                channel.number()
            );
        }
    }
}

impl Transport for ChannelTransport {
    fn poll_event(&mut self) -> Option<KeyEvent> {
        self.inbound.try_receive().ok()
    }

    fn send_note_on(&mut self, channel: wmidi::Channel, note: Note, velocity: Velocity) {
        self.send(channel, note, velocity, true);
    }

    fn send_note_off(&mut self, channel: wmidi::Channel, note: Note, velocity: Velocity) {
        self.send(channel, note, velocity, false);
    }
}
