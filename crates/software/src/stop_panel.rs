//! Provides the [`StopPanel`], a once-per-cycle snapshot of the console's registration switches, along with the
//! [`SwitchPanelReader`] trait through which hardware reports them.

use crate::keyboards::Manual;

/// A registration switch on the console: either a speaking stop or a coupler.
///
/// Which stops sound which pipes is not decided here but by the [`Registration`](crate::registration::Registration)
/// table; this enum only names the switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum Stop {
    #[default]
    SwellOpenDiapason8,
    SwellStoppedDiapason8,
    SwellPrincipal4,
    SwellFlute4,
    SwellFifteenth2,
    SwellTwelfth2_2_3,
    GreatOpenDiapason8,
    GreatLieblich8,
    GreatSalicional8,
    GreatGemshorn4,
    GreatSalicet4,
    GreatNazard2_2_3,
    GreatHorn8,
    GreatClarion4,
    PedalBassFlute8,
    PedalBourdon16,
    SwellToGreat,
    SwellToPedal,
    GreatToPedal,
}

impl Stop {
    /// Number of switches on the panel.
    pub const COUNT: usize = Self::ALL.len();

    /// Every switch, in panel order.
    pub const ALL: [Stop; 19] = [
        Stop::SwellOpenDiapason8,
        Stop::SwellStoppedDiapason8,
        Stop::SwellPrincipal4,
        Stop::SwellFlute4,
        Stop::SwellFifteenth2,
        Stop::SwellTwelfth2_2_3,
        Stop::GreatOpenDiapason8,
        Stop::GreatLieblich8,
        Stop::GreatSalicional8,
        Stop::GreatGemshorn4,
        Stop::GreatSalicet4,
        Stop::GreatNazard2_2_3,
        Stop::GreatHorn8,
        Stop::GreatClarion4,
        Stop::PedalBassFlute8,
        Stop::PedalBourdon16,
        Stop::SwellToGreat,
        Stop::SwellToPedal,
        Stop::GreatToPedal,
    ];

    /// Returns `true` for switches which couple one keyboard to another division rather than speak themselves.
    pub fn is_coupler(self) -> bool {
        matches!(
            self,
            Stop::SwellToGreat | Stop::SwellToPedal | Stop::GreatToPedal
        )
    }

    /// Returns the division a speaking stop belongs to, or `None` for a coupler.
    pub fn division(self) -> Option<Manual> {
        match self {
            Stop::SwellOpenDiapason8
            | Stop::SwellStoppedDiapason8
            | Stop::SwellPrincipal4
            | Stop::SwellFlute4
            | Stop::SwellFifteenth2
            | Stop::SwellTwelfth2_2_3 => Some(Manual::Swell),
            Stop::GreatOpenDiapason8
            | Stop::GreatLieblich8
            | Stop::GreatSalicional8
            | Stop::GreatGemshorn4
            | Stop::GreatSalicet4
            | Stop::GreatNazard2_2_3
            | Stop::GreatHorn8
            | Stop::GreatClarion4 => Some(Manual::Great),
            Stop::PedalBassFlute8 | Stop::PedalBourdon16 => Some(Manual::Pedal),
            Stop::SwellToGreat | Stop::SwellToPedal | Stop::GreatToPedal => None,
        }
    }
}

/// Collaborator which samples the physical switches.
///
/// Identifiers are opaque to this crate; they are whatever the board's wiring table says they are.
pub trait SwitchPanelReader {
    /// Returns the level of a digital input.
    fn read_digital(&mut self, id: u8) -> bool;

    /// Returns whether an analog input reads above its switching threshold.
    fn read_analog(&mut self, id: u8) -> bool;
}

/// How a single switch is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sensor {
    /// A digital input.
    Digital(u8),
    /// An analog-only input, thresholded by the reader.
    Analog(u8),
}

impl Sensor {
    /// Samples the sensor through `reader`.
    pub fn read(self, reader: &mut impl SwitchPanelReader) -> bool {
        match self {
            Sensor::Digital(id) => reader.read_digital(id),
            Sensor::Analog(id) => reader.read_analog(id),
        }
    }
}

/// One row of a board's wiring table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SwitchWiring {
    /// The switch.
    pub stop: Stop,
    /// Where it is read from.
    pub sensor: Sensor,
}

impl SwitchWiring {
    /// Constructs a `SwitchWiring`.
    pub const fn new(stop: Stop, sensor: Sensor) -> Self {
        Self { stop, sensor }
    }
}

/// Snapshot of which stops are drawn.
///
/// A stop missing from the wiring table is never drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StopPanel {
    drawn: [bool; Stop::COUNT],
}

impl StopPanel {
    /// Constructs a `StopPanel` with every stop pushed in.
    pub const fn new() -> Self {
        Self {
            drawn: [false; Stop::COUNT],
        }
    }

    /// Re-reads every wired switch, replacing the previous snapshot. Returns `true` if any switch moved.
    pub fn refresh(
        &mut self,
        reader: &mut impl SwitchPanelReader,
        wiring: &[SwitchWiring],
    ) -> bool {
        let previous = self.drawn;
        self.drawn = [false; Stop::COUNT];
        for row in wiring {
            self.drawn[row.stop as usize] = row.sensor.read(reader);
        }
        let changed = previous != self.drawn;
        if changed {
            info!("Stop panel changed: {}", *self);
        }
        changed
    }

    /// Determine if a stop is drawn.
    pub fn is_drawn(&self, stop: Stop) -> bool {
        self.drawn[stop as usize]
    }

    /// Draws or pushes in a single stop.
    pub fn set(&mut self, stop: Stop, drawn: bool) {
        self.drawn[stop as usize] = drawn;
    }

    /// Draws every speaking stop and the swell to great coupler. The pedal couplers are left as they are.
    pub fn draw_full_organ(&mut self) {
        for stop in Stop::ALL {
            if !stop.is_coupler() || stop == Stop::SwellToGreat {
                self.set(stop, true);
            }
        }
    }
}
