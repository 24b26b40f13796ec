//! Board wiring of the stop panel and the panic button.

use embassy_stm32::{
    adc::{Adc, AnyAdcChannel},
    gpio::Input,
    peripherals::ADC1,
};
use organ_brain_lib::stop_panel::{Sensor, Stop, SwitchPanelReader, SwitchWiring};

/// Number of stop switches wired to GPIO inputs.
pub const DIGITAL_CNT: usize = 18;
/// Number of sensors wired to ADC channels.
pub const ANALOG_CNT: usize = 2;

/// 12-bit ADC reading above which an analog sensor counts as closed (roughly a fifth of full scale).
const ANALOG_THRESHOLD: u16 = 800;

/// Which sensor each stop switch is connected to. Digital ids index [`BoardSwitches::digital`], analog ids
/// [`BoardSwitches::analog`].
pub static WIRING: [SwitchWiring; Stop::COUNT] = [
    SwitchWiring::new(Stop::SwellOpenDiapason8, Sensor::Digital(0)),
    SwitchWiring::new(Stop::SwellStoppedDiapason8, Sensor::Digital(1)),
    SwitchWiring::new(Stop::SwellPrincipal4, Sensor::Digital(2)),
    SwitchWiring::new(Stop::SwellFlute4, Sensor::Digital(3)),
    SwitchWiring::new(Stop::SwellFifteenth2, Sensor::Digital(4)),
    SwitchWiring::new(Stop::SwellTwelfth2_2_3, Sensor::Digital(5)),
    SwitchWiring::new(Stop::GreatOpenDiapason8, Sensor::Digital(6)),
    SwitchWiring::new(Stop::GreatLieblich8, Sensor::Digital(7)),
    SwitchWiring::new(Stop::GreatSalicional8, Sensor::Digital(8)),
    SwitchWiring::new(Stop::GreatGemshorn4, Sensor::Digital(9)),
    SwitchWiring::new(Stop::GreatSalicet4, Sensor::Digital(10)),
    SwitchWiring::new(Stop::GreatNazard2_2_3, Sensor::Digital(11)),
    SwitchWiring::new(Stop::GreatHorn8, Sensor::Digital(12)),
    SwitchWiring::new(Stop::GreatClarion4, Sensor::Digital(13)),
    SwitchWiring::new(Stop::PedalBassFlute8, Sensor::Analog(0)),
    SwitchWiring::new(Stop::PedalBourdon16, Sensor::Digital(14)),
    SwitchWiring::new(Stop::SwellToGreat, Sensor::Digital(15)),
    SwitchWiring::new(Stop::SwellToPedal, Sensor::Digital(16)),
    SwitchWiring::new(Stop::GreatToPedal, Sensor::Digital(17)),
];

/// The panic button shares the ADC with the bass flute switch.
pub const PANIC_BUTTON: Sensor = Sensor::Analog(1);

/// Samples the stop switches and the panic button.
pub struct BoardSwitches {
    digital: [Input<'static>; DIGITAL_CNT],
    adc: Adc<'static, ADC1>,
    analog: [AnyAdcChannel<ADC1>; ANALOG_CNT],
}

impl BoardSwitches {
    pub fn new(
        digital: [Input<'static>; DIGITAL_CNT],
        adc: Adc<'static, ADC1>,
        analog: [AnyAdcChannel<ADC1>; ANALOG_CNT],
    ) -> Self {
        Self {
            digital,
            adc,
            analog,
        }
    }
}

impl SwitchPanelReader for BoardSwitches {
    fn read_digital(&mut self, id: u8) -> bool {
        self.digital
            .get(usize::from(id))
            .is_some_and(|pin| pin.is_high())
    }

    fn read_analog(&mut self, id: u8) -> bool {
        match self.analog.get_mut(usize::from(id)) {
            Some(channel) => self.adc.blocking_read(channel) > ANALOG_THRESHOLD,
            None => false,
        }
    }
}
