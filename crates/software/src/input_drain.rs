//! Keeps the inbound side of the transport empty.
//!
//! Draining never touches rank state or the output queue, which is what makes it safe to call between any two units
//! of work in a cycle. It is called a lot.

use crate::{configuration::OrganConfig, keyboards::Keyboards, transport::Transport};

/// Polls `transport` until it has nothing left to give.
///
/// When `accept` is `false` (i.e., during a panic) every event is read and discarded, so the wire layer can't
/// overrun, but none of them is applied. Events on a channel which belongs to no keyboard are discarded too.
pub fn drain(
    transport: &mut impl Transport,
    keyboards: &mut Keyboards,
    config: &OrganConfig,
    accept: bool,
) {
    while let Some(event) = transport.poll_event() {
        if !accept {
            continue;
        }
        match config.manual_for(event.channel) {
            Some(manual) => {
                keyboards.set(manual, event.note, event.pressed);
                debug!(
                    "Received {}: channel {}, note {}",
                    if event.pressed { "NoteOn" } else { "NoteOff" },
                    event.channel.number(),
                    event.note.to_str()
                );
            }
            None => {
                trace!(
                    "Ignoring note on unmapped channel {}",
                    event.channel.number()
                );
            }
        }
    }
}
