//! Provides the [`Transport`] trait through which the controller exchanges note events with the outside world, and
//! [`KeyEvent`], the only kind of inbound message the controller cares about.
//!
//! Inbound and outbound traffic share one narrow, half-duplex link, so the controller polls for input constantly
//! and hands output to the transport a little at a time.

use wmidi::{Channel, MidiMessage, Note, Velocity};

/// A key on some keyboard was depressed or released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Channel the keyboard transmits on.
    pub channel: Channel,
    /// The key.
    pub note: Note,
    /// Velocity as transmitted; unused by the organ, as pipes have no dynamics.
    pub velocity: Velocity,
    /// `true` when the key went down.
    pub pressed: bool,
}

#[cfg(feature = "defmt")]
impl defmt::Format for KeyEvent {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "KeyEvent {{ channel: {}, note: {}, velocity: {}, pressed: {} }}",
            self.channel.number(),
            self.note.to_str(),
            u8::from(self.velocity),
            self.pressed
        );
    }
}

impl KeyEvent {
    /// Extracts a `KeyEvent` from a MIDI message, if it is a note message.
    ///
    /// A NoteOn with zero velocity is a release, per the MIDI convention used with running status.
    pub fn from_midi(msg: &MidiMessage) -> Option<Self> {
        match *msg {
            MidiMessage::NoteOn(channel, note, velocity) => Some(Self {
                channel,
                note,
                velocity,
                pressed: u8::from(velocity) != 0,
            }),
            MidiMessage::NoteOff(channel, note, velocity) => Some(Self {
                channel,
                note,
                velocity,
                pressed: false,
            }),
            _ => None,
        }
    }
}

/// Collaborator carrying note events in and out of the controller.
pub trait Transport {
    /// Returns the next inbound key event without blocking, or `None` if none is waiting.
    fn poll_event(&mut self) -> Option<KeyEvent>;

    /// Hands a note-on to the wire layer. Fire and forget.
    fn send_note_on(&mut self, channel: Channel, note: Note, velocity: Velocity);

    /// Hands a note-off to the wire layer. Fire and forget.
    fn send_note_off(&mut self, channel: Channel, note: Note, velocity: Velocity);
}
