//! Converts between USB-MIDI Event Packets and the note events the controller deals in.

use crate::transport::KeyEvent;
use wmidi::{Channel, MidiMessage, Note, Velocity};

/// Length of a USB-MIDI Event Packet.
pub const PACKET_LEN: usize = 4;

/// Extracts every [`KeyEvent`] from `data`, which may contain one or more USB-MIDI Event Packets.
///
/// Anything which isn't a note message is skipped.
pub fn key_events(data: &[u8]) -> impl Iterator<Item = KeyEvent> + '_ {
    data.chunks(PACKET_LEN)
        .filter_map(|potential_packet| {
            if potential_packet.len() != PACKET_LEN {
                error!("USB-MIDI Event Packets must always be 32 bits long");
                None
            } else {
                // byte 0 is the packet header (cable number and code index), which only repeats the status byte
                MidiMessage::from_bytes(&potential_packet[1..]).ok()
            }
        })
        .filter_map(|msg| KeyEvent::from_midi(&msg))
}

/// Builds the USB-MIDI Event Packet for a note-on (`on`) or note-off, on cable 0.
pub fn note_packet(
    channel: Channel,
    note: Note,
    velocity: Velocity,
    on: bool,
) -> Option<[u8; PACKET_LEN]> {
    let msg = if on {
        MidiMessage::NoteOn(channel, note, velocity)
    } else {
        MidiMessage::NoteOff(channel, note, velocity)
    };
    let mut packet = [0_u8; PACKET_LEN];
    msg.copy_to_slice(&mut packet[1..]).ok()?;
    // for channel voice messages the code index number is the upper nibble of the status byte
    packet[0] = packet[1] >> 4;
    Some(packet)
}
