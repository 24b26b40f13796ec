//! Provides the [`Registration`] rule table, which decides which pipes a drawn stop sounds and which keyboards a drawn
//! coupler connects.
//!
//! The table is plain data supplied when the controller is built, so the routing logic never names a stop.
//! [`Registration::default`] describes the LMNC console: a swell, a great and a pedal division over principal,
//! string, flute and reed ranks.

use crate::{keyboards::Manual, ranks::Rank, stop_panel::Stop};
use tinyvec::{ArrayVec, array_vec};

/// Sounds at written pitch.
pub const UNISON: i8 = 0;
/// Sounds an octave above written pitch (a 4' stop).
pub const OCTAVE: i8 = 12;
/// Sounds two octaves above written pitch (a 2' stop).
pub const TWO_OCTAVES: i8 = 24;
/// Offset used by the mutation stops (twelfth and nazard).
pub const TWELFTH: i8 = 31;

/// Most routes a [`Registration`] can hold.
pub const MAX_ROUTES: usize = 32;
/// Most couplers a [`Registration`] can hold.
pub const MAX_COUPLERS: usize = 8;

/// One contribution of a speaking stop: while `stop` is drawn, a key held in `division` sounds `rank` at
/// `offset` semitones from the key.
///
/// A stop with several contributions (e.g., a flute speaking at two pitches) has several routes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Route {
    /// The switch enabling this route.
    pub stop: Stop,
    /// The division whose keys drive this route.
    pub division: Manual,
    /// The rank sounded.
    pub rank: Rank,
    /// Transposition in semitones.
    pub offset: i8,
}

impl Route {
    /// Constructs a `Route`.
    pub const fn new(stop: Stop, division: Manual, rank: Rank, offset: i8) -> Self {
        Self {
            stop,
            division,
            rank,
            offset,
        }
    }
}

/// While `stop` is drawn, a key held on `keyboard` also plays the routes of `division`, as though the key
/// `offset` semitones away had been held there.
///
/// The coupled offset is independent of the offsets of the routes it reaches; both apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Coupler {
    /// The switch enabling this coupler.
    pub stop: Stop,
    /// The division whose stops are borrowed.
    pub division: Manual,
    /// The keyboard which borrows them.
    pub keyboard: Manual,
    /// Transposition in semitones applied to the coupled key.
    pub offset: i8,
}

impl Coupler {
    /// Constructs a `Coupler`.
    pub const fn new(stop: Stop, division: Manual, keyboard: Manual, offset: i8) -> Self {
        Self {
            stop,
            division,
            keyboard,
            offset,
        }
    }
}

/// Rows were dropped because the table was already full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TableFull;

/// The complete stop and coupler rule table.
#[derive(Clone, Debug, PartialEq)]
pub struct Registration {
    routes: ArrayVec<[Route; MAX_ROUTES]>,
    couplers: ArrayVec<[Coupler; MAX_COUPLERS]>,
}

impl Registration {
    /// Constructs an empty `Registration`; nothing will ever sound.
    pub fn new() -> Self {
        Self {
            routes: array_vec!(),
            couplers: array_vec!(),
        }
    }

    /// Appends a [`Route`].
    pub fn add_route(&mut self, route: Route) -> Result<(), TableFull> {
        self.routes
            .try_push(route)
            .map_or(Ok(()), |_| Err(TableFull))
    }

    /// Appends a [`Coupler`].
    pub fn add_coupler(&mut self, coupler: Coupler) -> Result<(), TableFull> {
        self.couplers
            .try_push(coupler)
            .map_or(Ok(()), |_| Err(TableFull))
    }

    /// Returns the routes driven by `division`.
    pub fn routes_for(&self, division: Manual) -> impl Iterator<Item = &Route> {
        self.routes
            .iter()
            .filter(move |route| route.division == division)
    }

    /// Returns the couplers played from `keyboard`.
    pub fn couplers_for(&self, keyboard: Manual) -> impl Iterator<Item = &Coupler> {
        self.couplers
            .iter()
            .filter(move |coupler| coupler.keyboard == keyboard)
    }
}

impl Default for Registration {
    fn default() -> Self {
        use Manual::*;
        use Rank::*;

        Self {
            routes: array_vec!([Route; MAX_ROUTES] =>
                Route::new(Stop::SwellOpenDiapason8, Swell, Principal, UNISON),
                Route::new(Stop::SwellStoppedDiapason8, Swell, Flute, UNISON),
                Route::new(Stop::SwellPrincipal4, Swell, Principal, OCTAVE),
                Route::new(Stop::SwellFlute4, Swell, Flute, OCTAVE),
                Route::new(Stop::SwellFlute4, Swell, Flute, TWO_OCTAVES),
                Route::new(Stop::SwellFifteenth2, Swell, Principal, TWO_OCTAVES),
                Route::new(Stop::SwellTwelfth2_2_3, Swell, Principal, TWELFTH),
                Route::new(Stop::GreatOpenDiapason8, Great, Principal, UNISON),
                Route::new(Stop::GreatLieblich8, Great, Flute, UNISON),
                Route::new(Stop::GreatSalicional8, Great, String, UNISON),
                Route::new(Stop::GreatGemshorn4, Great, Principal, OCTAVE),
                Route::new(Stop::GreatSalicet4, Great, String, OCTAVE),
                Route::new(Stop::GreatNazard2_2_3, Great, Flute, TWELFTH),
                Route::new(Stop::GreatHorn8, Great, Reed, UNISON),
                Route::new(Stop::GreatClarion4, Great, Reed, OCTAVE),
                Route::new(Stop::PedalBassFlute8, Pedal, Principal, UNISON),
                Route::new(Stop::PedalBassFlute8, Pedal, String, UNISON),
                Route::new(Stop::PedalBourdon16, Pedal, Flute, UNISON)
            ),
            couplers: array_vec!([Coupler; MAX_COUPLERS] =>
                Coupler::new(Stop::SwellToGreat, Swell, Great, UNISON),
                Coupler::new(Stop::SwellToPedal, Swell, Pedal, UNISON),
                Coupler::new(Stop::GreatToPedal, Great, Pedal, UNISON)
            ),
        }
    }
}
