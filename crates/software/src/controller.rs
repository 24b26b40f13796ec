//! Provides [`OrganController`], the owner of all engine state, and the per-cycle control flow which ties the other
//! modules together.
//!
//! A cycle drains input, refreshes the stop panel, rebuilds the candidate rank state from scratch, queues the
//! differences against what the pipes were last told, and then sends a bounded batch of queued instructions. Input is
//! drained between every unit of work along the way.

use crate::{
    configuration::{OrganConfig, RegistrationMode},
    fail_safe::{Clock, FailSafe, PanicCause},
    input_drain,
    keyboards::Keyboards,
    note_bitmap::all_notes,
    output_queue::{OutputQueue, QUEUE_CAPACITY, QueueOverflow},
    output_state::OutputStateTracker,
    ranks::{Rank, Ranks},
    registration::Registration,
    routing::RoutingEngine,
    stop_panel::{StopPanel, SwitchPanelReader},
    transport::Transport,
};

/// What a call to [`OrganController::run_cycle`] amounted to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleOutcome {
    /// An ordinary cycle ran to completion.
    Ran,
    /// The cycle was abandoned for a panic; the console is now cooling down.
    Panicked,
    /// The console is still cooling down from an earlier panic; input was drained and discarded.
    CoolingDown,
}

/// The whole engine: keyboards, stop panel, rank state, queue and fail-safe, owned by one value.
///
/// Only input draining writes the keyboards, only reconciliation writes rank state and the queue, and only a panic
/// clears everything.
pub struct OrganController<const N: usize = QUEUE_CAPACITY> {
    config: OrganConfig,
    registration: Registration,
    keyboards: Keyboards,
    panel: StopPanel,
    candidate: Ranks,
    output: OutputStateTracker,
    queue: OutputQueue<N>,
    fail_safe: FailSafe,
}

impl<const N: usize> OrganController<N> {
    /// Constructs an `OrganController` with nothing held, nothing drawn and nothing sounding.
    pub fn new(config: OrganConfig, registration: Registration) -> Self {
        Self {
            fail_safe: FailSafe::new(config.cooldown),
            config,
            registration,
            keyboards: Keyboards::new(),
            panel: StopPanel::new(),
            candidate: Ranks::new(),
            output: OutputStateTracker::new(),
            queue: OutputQueue::new(),
        }
    }

    /// Returns the configuration for modification, e.g., to change the [`RegistrationMode`].
    pub fn config_mut(&mut self) -> &mut OrganConfig {
        &mut self.config
    }

    /// Closes every pipe and clears all state without cooling down; run once when the device starts, as the pipes
    /// may have been left open by whatever drove them before.
    pub fn power_on(&mut self, transport: &mut impl Transport) {
        info!("Power on: closing every pipe");
        self.silence_and_reset(transport);
    }

    /// Runs a single cycle of the control loop.
    pub fn run_cycle(
        &mut self,
        transport: &mut impl Transport,
        switches: &mut impl SwitchPanelReader,
        clock: &impl Clock,
    ) -> CycleOutcome {
        self.fail_safe.poll(clock.now());
        if !self.fail_safe.accepts_input() {
            self.drain(transport);
            return CycleOutcome::CoolingDown;
        }

        self.drain(transport);

        if let Some(button) = self.config.panic_button {
            if button.read(switches) {
                self.panic(PanicCause::Requested, transport, clock);
                return CycleOutcome::Panicked;
            }
        }
        self.refresh_panel(switches);
        self.drain(transport);

        self.route(transport);

        if self.reconcile(transport).is_err() {
            self.panic(PanicCause::QueueOverflow, transport, clock);
            return CycleOutcome::Panicked;
        }

        self.drain(transport);
        self.send_batch(transport);
        CycleOutcome::Ran
    }

    /// Pops and sends up to [`OrganConfig::sends_per_batch`] instructions, draining input after each.
    fn send_batch(&mut self, transport: &mut impl Transport) {
        for _ in 0..self.config.sends_per_batch {
            let Some(instruction) = self.queue.pop() else {
                break;
            };
            let channel = self.config.rank_channel(instruction.rank);
            if instruction.on {
                transport.send_note_on(channel, instruction.note, self.config.output_velocity);
            } else {
                transport.send_note_off(channel, instruction.note, self.config.output_velocity);
            }
            self.drain(transport);
        }
    }

    fn drain(&mut self, transport: &mut impl Transport) {
        input_drain::drain(
            transport,
            &mut self.keyboards,
            &self.config,
            self.fail_safe.accepts_input(),
        );
    }

    fn refresh_panel(&mut self, switches: &mut impl SwitchPanelReader) {
        self.panel.refresh(switches, self.config.wiring);
        if self.config.registration_mode == RegistrationMode::FullOrgan {
            self.panel.draw_full_organ();
        }
    }

    /// Rebuilds the candidate state from the current keyboard and panel snapshots.
    fn route(&mut self, transport: &mut impl Transport) {
        self.candidate.clear();
        for note in all_notes() {
            // keys which arrive mid-sweep only affect the notes not yet visited; the next cycle catches the rest
            if self.keyboards.any_held(note) {
                RoutingEngine::new(&self.registration).route_note(
                    note,
                    &self.keyboards,
                    &self.panel,
                    &mut self.candidate,
                );
            }
            self.drain(transport);
        }
    }

    /// Queues every difference between candidate and output state, sending a batch after each note.
    fn reconcile(&mut self, transport: &mut impl Transport) -> Result<(), QueueOverflow> {
        for note in all_notes() {
            self.output
                .reconcile_note(note, &self.candidate, &mut self.queue)
                .inspect_err(|_| warn!("Output queue overflow at {}", note.to_str()))?;
            self.drain(transport);
            self.send_batch(transport);
        }
        Ok(())
    }

    fn panic(&mut self, cause: PanicCause, transport: &mut impl Transport, clock: &impl Clock) {
        self.fail_safe.begin_panic(cause);
        self.silence_and_reset(transport);
        self.fail_safe.begin_cooldown(clock.now());
    }

    /// Sends a note-off for every note of every rank straight to the transport, regardless of tracked state, then
    /// forgets all keys, rank state and queued instructions.
    fn silence_and_reset(&mut self, transport: &mut impl Transport) {
        for note in all_notes() {
            for rank in Rank::ALL {
                let channel = self.config.rank_channel(rank);
                transport.send_note_off(channel, note, self.config.output_velocity);
                self.drain(transport);
            }
        }
        self.keyboards.clear();
        self.candidate.clear();
        self.output.clear();
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::{
        configuration::DEFAULT_SENDS_PER_BATCH,
        fail_safe::FailSafeState,
        keyboards::Manual,
        stop_panel::{Sensor, Stop, SwitchWiring},
        transport::KeyEvent,
    };
    use core::cell::Cell;
    use embassy_time::{Duration, Instant};
    use std::{collections::VecDeque, vec::Vec};
    use wmidi::{Channel, Note, U7, Velocity};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Sent {
        channel: Channel,
        note: Note,
        on: bool,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        Poll,
        Send,
    }

    /// Scripted inbound events, recorded outbound ones.
    #[derive(Default)]
    struct FakeTransport {
        inbound: VecDeque<KeyEvent>,
        /// Events which only become visible once the transport has been polled the given number of times.
        delayed: VecDeque<(usize, KeyEvent)>,
        sent: Vec<Sent>,
        ops: Vec<Op>,
        polls: usize,
    }

    fn key_event(manual: Manual, note: Note, pressed: bool) -> KeyEvent {
        KeyEvent {
            channel: OrganConfig::default().manual_channels[manual as usize],
            note,
            velocity: U7::from_u8_lossy(100),
            pressed,
        }
    }

    impl FakeTransport {
        fn key(&mut self, manual: Manual, note: Note, pressed: bool) {
            self.inbound.push_back(key_event(manual, note, pressed));
        }

        fn key_after(&mut self, polls: usize, manual: Manual, note: Note) {
            let event = key_event(manual, note, true);
            self.delayed.push_back((self.polls + polls, event));
        }

        fn take_sent(&mut self) -> Vec<Sent> {
            self.ops.clear();
            core::mem::take(&mut self.sent)
        }

        fn record(&mut self, sent: Sent) {
            self.ops.push(Op::Send);
            self.sent.push(sent);
        }
    }

    impl Transport for FakeTransport {
        fn poll_event(&mut self) -> Option<KeyEvent> {
            self.polls += 1;
            self.ops.push(Op::Poll);
            while let Some(&(at, event)) = self.delayed.front() {
                if at > self.polls {
                    break;
                }
                self.inbound.push_back(event);
                self.delayed.pop_front();
            }
            self.inbound.pop_front()
        }

        fn send_note_on(&mut self, channel: Channel, note: Note, _: Velocity) {
            self.record(Sent {
                channel,
                note,
                on: true,
            });
        }

        fn send_note_off(&mut self, channel: Channel, note: Note, _: Velocity) {
            self.record(Sent {
                channel,
                note,
                on: false,
            });
        }
    }

    /// Digital ids are stop discriminants; analog id 0 is the panic button.
    #[derive(Default)]
    struct FakeSwitches {
        drawn: [bool; Stop::COUNT],
        panic_button: bool,
    }

    impl FakeSwitches {
        fn draw(&mut self, stop: Stop, drawn: bool) {
            self.drawn[stop as usize] = drawn;
        }
    }

    impl SwitchPanelReader for FakeSwitches {
        fn read_digital(&mut self, id: u8) -> bool {
            self.drawn[usize::from(id)]
        }

        fn read_analog(&mut self, id: u8) -> bool {
            id == 0 && self.panic_button
        }
    }

    static WIRING: [SwitchWiring; Stop::COUNT] = {
        let first = SwitchWiring::new(Stop::SwellOpenDiapason8, Sensor::Digital(0));
        let mut wiring = [first; Stop::COUNT];
        let mut i = 0;
        while i < Stop::COUNT {
            wiring[i] = SwitchWiring::new(Stop::ALL[i], Sensor::Digital(i as u8));
            i += 1;
        }
        wiring
    };

    struct ManualClock(Cell<Instant>);

    impl ManualClock {
        fn new() -> Self {
            Self(Cell::new(Instant::from_millis(0)))
        }

        fn advance(&self, duration: Duration) {
            self.0.set(self.0.get() + duration);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.0.get()
        }
    }

    /// The collaborators of a controller under test.
    struct Rig {
        io: FakeTransport,
        switches: FakeSwitches,
        clock: ManualClock,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                io: FakeTransport::default(),
                switches: FakeSwitches::default(),
                clock: ManualClock::new(),
            }
        }

        fn cycle<const N: usize>(&mut self, organ: &mut OrganController<N>) -> CycleOutcome {
            organ.run_cycle(&mut self.io, &mut self.switches, &self.clock)
        }
    }

    fn config() -> OrganConfig {
        OrganConfig {
            wiring: &WIRING,
            panic_button: Some(Sensor::Analog(0)),
            sends_per_batch: 512,
            ..OrganConfig::default()
        }
    }

    fn controller<const N: usize>() -> OrganController<N> {
        OrganController::new(config(), Registration::default())
    }

    fn principal(note: Note, on: bool) -> Sent {
        Sent {
            channel: Channel::Ch13,
            note,
            on,
        }
    }

    fn flute(note: Note, on: bool) -> Sent {
        Sent {
            channel: Channel::Ch15,
            note,
            on,
        }
    }

    fn assert_silent_and_clear<const N: usize>(organ: &OrganController<N>) {
        assert!(organ.keyboards.is_empty());
        assert!(organ.candidate.is_empty());
        assert_eq!(
            OutputStateTracker::new(),
            organ.output,
            "Expected left but got right"
        );
        assert!(organ.queue.is_empty());
    }

    #[test]
    fn edge_triggered_emission() {
        let mut organ = controller::<512>();
        let mut rig = Rig::new();
        rig.switches.draw(Stop::SwellOpenDiapason8, true);

        rig.io.key(Manual::Swell, Note::C4, true);
        assert_eq!(CycleOutcome::Ran, rig.cycle(&mut organ));
        assert_eq!(std::vec![principal(Note::C4, true)], rig.io.take_sent());

        for _ in 0..3 {
            rig.cycle(&mut organ);
            assert!(
                rig.io.take_sent().is_empty(),
                "Holding a key must not repeat its instruction"
            );
        }

        rig.io.key(Manual::Swell, Note::C4, false);
        rig.cycle(&mut organ);
        assert_eq!(std::vec![principal(Note::C4, false)], rig.io.take_sent());

        rig.cycle(&mut organ);
        assert!(rig.io.take_sent().is_empty());
        assert_silent_and_clear(&organ);
    }

    #[test]
    fn union_across_keyboards() {
        let mut organ = controller::<512>();
        let mut rig = Rig::new();
        rig.switches.draw(Stop::SwellOpenDiapason8, true);
        rig.switches.draw(Stop::GreatOpenDiapason8, true);

        rig.io.key(Manual::Swell, Note::C4, true);
        rig.io.key(Manual::Great, Note::C4, true);
        rig.cycle(&mut organ);
        assert_eq!(std::vec![principal(Note::C4, true)], rig.io.take_sent());

        rig.io.key(Manual::Swell, Note::C4, false);
        rig.cycle(&mut organ);
        assert!(
            rig.io.take_sent().is_empty(),
            "The great still supplies the pipe"
        );

        rig.io.key(Manual::Great, Note::C4, false);
        rig.cycle(&mut organ);
        assert_eq!(std::vec![principal(Note::C4, false)], rig.io.take_sent());
    }

    #[test]
    fn pushing_in_a_stop_closes_its_pipes() {
        let mut organ = controller::<512>();
        let mut rig = Rig::new();
        rig.switches.draw(Stop::GreatLieblich8, true);

        rig.io.key(Manual::Great, Note::A4, true);
        rig.cycle(&mut organ);
        assert_eq!(std::vec![flute(Note::A4, true)], rig.io.take_sent());

        rig.switches.draw(Stop::GreatLieblich8, false);
        rig.cycle(&mut organ);
        assert_eq!(std::vec![flute(Note::A4, false)], rig.io.take_sent());
    }

    #[test]
    fn coupler_additivity() {
        let mut organ = controller::<512>();
        let mut rig = Rig::new();
        rig.switches.draw(Stop::SwellStoppedDiapason8, true);
        rig.switches.draw(Stop::SwellToGreat, true);

        rig.io.key(Manual::Great, Note::E4, true);
        rig.cycle(&mut organ);
        assert_eq!(std::vec![flute(Note::E4, true)], rig.io.take_sent());

        rig.switches.draw(Stop::SwellToGreat, false);
        rig.cycle(&mut organ);
        assert_eq!(
            std::vec![flute(Note::E4, false)],
            rig.io.take_sent(),
            "Clearing the coupler with the key still held must remove its contribution"
        );
        assert!(organ.keyboards[Manual::Great].contains(Note::E4));
    }

    #[test]
    fn transposition_bounds() {
        let mut organ = controller::<512>();
        let mut rig = Rig::new();
        rig.switches.draw(Stop::SwellPrincipal4, true);
        let note_120 = Note::from(U7::from_u8_lossy(120));
        let note_108 = Note::from(U7::from_u8_lossy(108));

        rig.io.key(Manual::Swell, note_120, true);
        rig.io.key(Manual::Swell, note_108, true);
        assert_eq!(CycleOutcome::Ran, rig.cycle(&mut organ));

        assert_eq!(
            std::vec![principal(note_120, true)],
            rig.io.take_sent(),
            "Only 108 + 12 exists"
        );
        assert!(
            !organ.candidate[Rank::Principal].get(4),
            "132 must not wrap to 4"
        );
        for rank in [Rank::String, Rank::Flute, Rank::Reed] {
            assert!(
                organ.candidate[rank].is_empty(),
                "{:?} must be untouched",
                rank
            );
        }
    }

    #[test]
    fn full_organ_mode_ignores_stop_switches() {
        let mut organ = controller::<512>();
        let mut rig = Rig::new();
        organ.config_mut().registration_mode = RegistrationMode::FullOrgan;

        rig.io.key(Manual::Pedal, Note::C2, true);
        rig.cycle(&mut organ);

        let sent = rig.io.take_sent();
        let string = Sent {
            channel: Channel::Ch14,
            note: Note::C2,
            on: true,
        };
        assert_eq!(3, sent.len(), "Expected left but got right");
        assert!(sent.contains(&principal(Note::C2, true)));
        assert!(sent.contains(&string));
        assert!(sent.contains(&flute(Note::C2, true)));
    }

    #[test]
    fn full_organ_mode_couples_swell_to_great() {
        let mut organ = controller::<512>();
        let mut rig = Rig::new();
        organ.config_mut().registration_mode = RegistrationMode::FullOrgan;

        rig.io.key(Manual::Great, Note::C4, true);
        rig.cycle(&mut organ);
        let sent = rig.io.take_sent();

        // the swell's 2' flute only reaches the great through the coupler
        assert!(
            sent.contains(&flute(Note::C6, true)),
            "Swell stops should speak from the great"
        );
        assert!(organ.panel.is_drawn(Stop::SwellToGreat));
        assert!(!organ.panel.is_drawn(Stop::SwellToPedal));
        assert!(!organ.panel.is_drawn(Stop::GreatToPedal));
    }

    #[test]
    fn send_batch_is_rate_limited() {
        let mut organ = OrganController::<512>::new(
            OrganConfig {
                wiring: &WIRING,
                sends_per_batch: 2,
                ..OrganConfig::default()
            },
            Registration::default(),
        );
        let mut rig = Rig::new();
        rig.switches.draw(Stop::GreatOpenDiapason8, true);

        for note in [Note::C4, Note::D4, Note::E4, Note::F4, Note::G4] {
            rig.io.key(Manual::Great, note, true);
        }
        rig.cycle(&mut organ);
        assert_eq!(
            5,
            rig.io.take_sent().len(),
            "Every note should go out within the sweep's batches"
        );
        assert!(organ.queue.is_empty());

        // a batch sends no more than configured
        let mut queued = OrganController::<512>::new(organ.config, Registration::default());
        for note in [Note::C4, Note::D4, Note::E4] {
            rig.io.key(Manual::Great, note, true);
        }
        queued.drain(&mut rig.io);
        queued.refresh_panel(&mut rig.switches);
        queued.route(&mut rig.io);
        for note in all_notes() {
            queued
                .output
                .reconcile_note(note, &queued.candidate, &mut queued.queue)
                .unwrap();
        }
        for expected in [2, 1, 0] {
            queued.send_batch(&mut rig.io);
            assert_eq!(
                expected,
                rig.io.take_sent().len(),
                "Expected left but got right"
            );
        }
        assert!(queued.queue.is_empty());
    }

    #[test]
    fn default_batches_keep_a_small_queue_from_overflowing() {
        let mut organ = OrganController::<8>::new(
            OrganConfig {
                wiring: &WIRING,
                registration_mode: RegistrationMode::FullOrgan,
                ..OrganConfig::default()
            },
            Registration::default(),
        );
        assert_eq!(DEFAULT_SENDS_PER_BATCH, organ.config.sends_per_batch);
        let mut rig = Rig::new();

        for note in all_notes() {
            rig.io.key(Manual::Great, note, true);
        }
        assert_eq!(CycleOutcome::Ran, rig.cycle(&mut organ));
        let sent = rig.io.take_sent();
        assert_eq!(128 * 4, sent.len(), "Expected left but got right");
        assert!(sent.iter().all(|sent| sent.on));
        assert!(organ.queue.is_empty());

        for note in all_notes() {
            rig.io.key(Manual::Great, note, false);
        }
        assert_eq!(CycleOutcome::Ran, rig.cycle(&mut organ));
        assert_eq!(128 * 4, rig.io.take_sent().len());
        assert_silent_and_clear(&organ);
    }

    #[test]
    fn every_send_is_followed_by_a_drain() {
        let mut organ = controller::<512>();
        let mut rig = Rig::new();
        rig.switches.draw(Stop::GreatOpenDiapason8, true);
        rig.switches.draw(Stop::GreatLieblich8, true);
        for note in [Note::C4, Note::E4, Note::G4] {
            rig.io.key(Manual::Great, note, true);
        }

        rig.cycle(&mut organ);
        let ops = core::mem::take(&mut rig.io.ops);
        assert_eq!(6, rig.io.take_sent().len(), "Expected left but got right");
        for (index, pair) in ops.windows(2).enumerate() {
            if pair[0] == Op::Send {
                assert_eq!(
                    Op::Poll,
                    pair[1],
                    "Send at op {} was not followed by a poll",
                    index
                );
            }
        }
        assert_eq!(Some(&Op::Poll), ops.last(), "Expected left but got right");
    }

    #[test]
    fn keys_arriving_mid_cycle_are_applied_mid_cycle() {
        let mut organ = controller::<512>();
        let mut rig = Rig::new();
        rig.switches.draw(Stop::SwellOpenDiapason8, true);

        // early in the routing sweep, well before C4 is visited
        rig.io.key_after(10, Manual::Swell, Note::C4);
        // late in the reconciliation sweep, after E4 has been compared
        rig.io.key_after(240, Manual::Swell, Note::E4);

        assert_eq!(CycleOutcome::Ran, rig.cycle(&mut organ));
        assert!(
            rig.io.delayed.is_empty(),
            "Both keys should arrive within one cycle"
        );
        assert!(organ.keyboards[Manual::Swell].contains(Note::C4));
        assert!(organ.keyboards[Manual::Swell].contains(Note::E4));
        assert_eq!(
            std::vec![principal(Note::C4, true)],
            rig.io.take_sent(),
            "A key read during routing should sound in the same cycle"
        );

        rig.cycle(&mut organ);
        assert_eq!(
            std::vec![principal(Note::E4, true)],
            rig.io.take_sent(),
            "A key read after its note was reconciled should sound next cycle"
        );
    }

    #[test]
    fn overflow_panics() {
        let mut organ = controller::<4>();
        let mut rig = Rig::new();
        organ.config_mut().sends_per_batch = 0;
        rig.switches.draw(Stop::GreatOpenDiapason8, true);

        for note in [Note::C4, Note::D4, Note::E4, Note::F4, Note::G4] {
            rig.io.key(Manual::Great, note, true);
        }
        assert_eq!(CycleOutcome::Panicked, rig.cycle(&mut organ));

        // every pipe was closed directly, bypassing the queue
        let sent = rig.io.take_sent();
        assert_eq!(128 * 4, sent.len(), "Expected left but got right");
        assert!(sent.iter().all(|sent| !sent.on));
        for channel in [Channel::Ch13, Channel::Ch14, Channel::Ch15, Channel::Ch16] {
            for note in all_notes() {
                let off = Sent {
                    channel,
                    note,
                    on: false,
                };
                assert!(sent.contains(&off));
            }
        }

        // and everything forgotten
        assert_silent_and_clear(&organ);
        assert!(matches!(
            organ.fail_safe.state(),
            FailSafeState::Cooldown { .. }
        ));
    }

    #[test]
    fn cooldown_discards_input() {
        let mut organ = controller::<4>();
        let mut rig = Rig::new();
        organ.config_mut().sends_per_batch = 0;
        rig.switches.draw(Stop::GreatOpenDiapason8, true);
        for note in [Note::C4, Note::D4, Note::E4, Note::F4, Note::G4] {
            rig.io.key(Manual::Great, note, true);
        }
        rig.cycle(&mut organ);
        rig.io.take_sent();
        organ.config_mut().sends_per_batch = 24;

        rig.clock.advance(Duration::from_secs(4));
        rig.io.key(Manual::Great, Note::A4, true);
        assert_eq!(CycleOutcome::CoolingDown, rig.cycle(&mut organ));
        assert!(
            rig.io.inbound.is_empty(),
            "Input must still be drained during cooldown"
        );
        assert!(
            organ.keyboards.is_empty(),
            "Input must not be applied during cooldown"
        );
        assert!(rig.io.take_sent().is_empty());

        rig.clock.advance(Duration::from_secs(1));
        rig.io.key(Manual::Great, Note::B4, true);
        assert_eq!(CycleOutcome::Ran, rig.cycle(&mut organ));
        assert!(!organ.keyboards[Manual::Great].contains(Note::A4));
        assert_eq!(std::vec![principal(Note::B4, true)], rig.io.take_sent());
    }

    #[test]
    fn panic_button() {
        let mut organ = controller::<512>();
        let mut rig = Rig::new();
        rig.switches.draw(Stop::SwellOpenDiapason8, true);
        rig.io.key(Manual::Swell, Note::C4, true);
        rig.cycle(&mut organ);
        rig.io.take_sent();

        rig.switches.panic_button = true;
        assert_eq!(CycleOutcome::Panicked, rig.cycle(&mut organ));
        assert_eq!(
            128 * 4,
            rig.io.take_sent().len(),
            "Expected left but got right"
        );
        assert_silent_and_clear(&organ);

        rig.switches.panic_button = false;
        rig.clock.advance(Duration::from_secs(5));
        assert_eq!(CycleOutcome::Ran, rig.cycle(&mut organ));
        assert!(
            rig.io.take_sent().is_empty(),
            "The released key must not come back"
        );
    }

    #[test]
    fn power_on_closes_every_pipe_without_cooldown() {
        let mut organ = controller::<512>();
        let mut io = FakeTransport::default();
        io.key(Manual::Swell, Note::C4, true);

        organ.power_on(&mut io);

        let sent = io.take_sent();
        assert_eq!(128 * 4, sent.len(), "Expected left but got right");
        assert!(sent.iter().all(|sent| !sent.on));
        assert_eq!(
            FailSafeState::Normal,
            organ.fail_safe.state(),
            "Expected left but got right"
        );
        assert!(organ.keyboards.is_empty());
    }
}
