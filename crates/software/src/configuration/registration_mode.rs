use num_derive::{FromPrimitive, ToPrimitive};

/// Determines where the console takes its registration (the set of drawn stops) from.
#[derive(Debug, Default, Copy, Clone, ToPrimitive, FromPrimitive, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistrationMode {
    /// Stops are read from the switch panel every cycle.
    #[default]
    Console,
    /// Every speaking stop and the swell to great coupler are drawn regardless of their switches; the pedal
    /// couplers still follow the panel. Handy when bringing up a console whose stop switches aren't wired yet.
    FullOrgan,
}
impl super::CycleConfig for RegistrationMode {}
