//! Organ Brain is [Embassy](https://embassy.dev)-based firmware for the console of a MIDI-driven
//! [pipe organ](https://en.wikipedia.org/wiki/Pipe_organ). It runs on the [Nucleo-F767ZI development
//! board](https://www.st.com/en/evaluation-tools/nucleo-f767zi.html), which is powered by an F7-series
//! STM32 microcontroller.
//!
//! Three keyboards (swell, great and pedal) send their notes over USB-MIDI on separate channels. The firmware combines
//! them with the stop switches on the console and tells four ranks of pipes (principal, string, flute and reed), each
//! listening on its own channel, which pipes to open and close. The logic lives in [`organ_brain_lib`]; this crate
//! only wires it to the board.
//!
//! The user button cycles the [`RegistrationMode`] (blue LED lit for full organ). The red LED is lit while the
//! console rests after a panic.

#![no_std]
#![no_main]

mod switches;
mod transport;

use crate::{
    switches::BoardSwitches,
    transport::{ChannelTransport, Inbound, InboundSender, Outbound, OutboundReceiver},
};
use defmt::{panic, *};
use embassy_executor::Spawner;
use embassy_futures::yield_now;
use embassy_stm32::{
    Config,
    adc::{Adc, AdcChannel},
    bind_interrupts,
    exti::ExtiInput,
    gpio::{Input, Level, Output, Pull, Speed},
    peripherals,
    time::Hertz,
    usb,
};
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    watch::{Receiver, Sender, Watch},
};
use embassy_usb::{
    Builder, UsbDevice,
    class::midi::{MidiClass, Receiver as MidiReceiver, Sender as MidiSender},
    driver::EndpointError,
};
use organ_brain_lib::{
    configuration::{CycleConfig, OrganConfig, RegistrationMode},
    controller::{CycleOutcome, OrganController},
    fail_safe::SystemClock,
    registration::Registration,
    usb_midi::{self, PACKET_LEN},
};
use static_cell::StaticCell;

#[cfg(feature = "defmt-rtt")]
use defmt_rtt as _;
#[cfg(not(feature = "panic-probe"))]
use panic_halt as _;
#[cfg(feature = "panic-probe")]
use panic_probe as _;

bind_interrupts!(
    #[doc(hidden)]
    struct Irqs {
        OTG_FS => usb::InterruptHandler<peripherals::USB_OTG_FS>;
    }
);

type UsbDriver = usb::Driver<'static, peripherals::USB_OTG_FS>;

const REGISTRATION_MODE_RECEIVER_CNT: usize = 1;
type RegistrationModeSync =
    Watch<CriticalSectionRawMutex, RegistrationMode, REGISTRATION_MODE_RECEIVER_CNT>;
type RegistrationModeSender<'a> =
    Sender<'a, CriticalSectionRawMutex, RegistrationMode, REGISTRATION_MODE_RECEIVER_CNT>;
type RegistrationModeReceiver<'a> =
    Receiver<'a, CriticalSectionRawMutex, RegistrationMode, REGISTRATION_MODE_RECEIVER_CNT>;

/// Synchronizes the user-selected [`RegistrationMode`].
static REGISTRATION_MODE: RegistrationModeSync = Watch::new();

/// Key events on their way from USB to the organ.
static INBOUND: Inbound = Inbound::new();

/// USB-MIDI Event Packets on their way from the organ to USB.
static OUTBOUND: Outbound = Outbound::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Initializing Organ Brain");

    let mut config = Config::default();
    {
        use embassy_stm32::rcc::*;
        // hse: high-speed external clock
        config.rcc.hse = Some(Hse {
            freq: Hertz(8_000_000),
            mode: HseMode::Bypass,
        });

        // pll: phase-locked loop, crucial for dividing clock
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL216,
            divp: Some(PllPDiv::DIV2), // 8mhz / 4 * 216 / 2 = 216Mhz
            // per section 5.2 of RM0410, the 48MHz clock used for USB OTG FS is derived from the main PLL VCO
            divq: Some(PllQDiv::DIV9), // 8mhz / 4 * 216 / 9 = 48Mhz
            divr: None,
        });
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        config.rcc.apb2_pre = APBPrescaler::DIV2;
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.mux.clk48sel = mux::Clk48sel::PLL1_Q;
    }
    let p = embassy_stm32::init(config);

    let button = ExtiInput::new(p.PC13, p.EXTI13, Pull::None);
    let blue_led = Output::new(p.PB7, Level::Low, Speed::Low);
    let mode_sender = REGISTRATION_MODE.sender();
    mode_sender.send(RegistrationMode::default());
    unwrap!(spawner.spawn(registration_mode_task(button, blue_led, mode_sender)));

    // stop switches pull their input high when drawn
    let digital = [
        Input::new(p.PF13, Pull::Down),
        Input::new(p.PE9, Pull::Down),
        Input::new(p.PE11, Pull::Down),
        Input::new(p.PF14, Pull::Down),
        Input::new(p.PE13, Pull::Down),
        Input::new(p.PF15, Pull::Down),
        Input::new(p.PG14, Pull::Down),
        Input::new(p.PG9, Pull::Down),
        Input::new(p.PE8, Pull::Down),
        Input::new(p.PE7, Pull::Down),
        Input::new(p.PE10, Pull::Down),
        Input::new(p.PE12, Pull::Down),
        Input::new(p.PE14, Pull::Down),
        Input::new(p.PE15, Pull::Down),
        Input::new(p.PB10, Pull::Down),
        Input::new(p.PB11, Pull::Down),
        Input::new(p.PD15, Pull::Down),
        Input::new(p.PD14, Pull::Down),
    ];
    let adc = Adc::new(p.ADC1);
    let analog = [p.PA3.degrade_adc(), p.PC0.degrade_adc()];
    let switches = BoardSwitches::new(digital, adc, analog);

    // Create the driver, from the HAL.
    static ENDPOINT_OUT_BUFFER: StaticCell<[u8; 256]> = StaticCell::new();
    let mut config = embassy_stm32::usb::Config::default();

    // USB devices which are self-powered (i.e., that can stay powered on if unplugged from the host)
    // need to enable vbus_detection. Per section 6.10 of the Nucleo board manual (UM1974), CN13 (the USB port)
    // cannot power the board; external power is necessary.
    config.vbus_detection = true;

    let driver = usb::Driver::new_fs(
        p.USB_OTG_FS,
        Irqs,
        p.PA12,
        p.PA11,
        ENDPOINT_OUT_BUFFER.init([0; 256]),
        config,
    );

    // per https://pid.codes, FOSS projects can apply to be listed under the vendor ID owned by InterBiometrics;
    // 0x0001 is one of its test product IDs
    let vendor_id = 0x1209;
    let product_id = 0x0001;

    let mut config = embassy_usb::Config::new(vendor_id, product_id);
    config.manufacturer = Some("LMNC");
    config.product = Some("Organ Brain");
    config.self_powered = true;
    config.max_power = 0;

    // It needs some buffers for building the descriptors.
    static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static CONTROL_BUFFER: StaticCell<[u8; 64]> = StaticCell::new();

    let mut builder = Builder::new(
        driver,
        config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [], // no msos descriptors
        CONTROL_BUFFER.init([0; 64]),
    );

    // one jack in, one jack out; the keyboards and the pipes share the link
    let class = MidiClass::new(&mut builder, 1, 1, 64);
    let usb = builder.build();
    let (midi_tx, midi_rx) = class.split();

    unwrap!(spawner.spawn(usb_task(usb)));
    unwrap!(spawner.spawn(midi_rx_task(midi_rx, INBOUND.sender())));
    unwrap!(spawner.spawn(midi_tx_task(midi_tx, OUTBOUND.receiver())));

    let red_led = Output::new(p.PB14, Level::Low, Speed::Low);
    let mode_receiver = REGISTRATION_MODE
        .receiver()
        .expect("Registration mode synchronizer should have a receiver available");
    unwrap!(spawner.spawn(organ_task(switches, red_led, mode_receiver)));
}

/// Runs the organ: one cooperative control loop, yielding to the USB tasks between cycles.
#[embassy_executor::task]
async fn organ_task(
    mut switches: BoardSwitches,
    mut red_led: Output<'static>,
    mut registration_mode: RegistrationModeReceiver<'static>,
) -> ! {
    let config = OrganConfig {
        wiring: &switches::WIRING,
        panic_button: Some(switches::PANIC_BUTTON),
        ..OrganConfig::default()
    };
    let mut organ: OrganController = OrganController::new(config, Registration::default());
    let mut transport = ChannelTransport::new(INBOUND.receiver(), OUTBOUND.sender());

    organ.power_on(&mut transport);

    loop {
        // a cycle and a panic following it can emit at most OUTBOUND_CAPACITY packets; until the host reads
        // them, there is nothing to do
        while !OUTBOUND.is_empty() {
            yield_now().await;
        }

        if let Some(mode) = registration_mode.try_changed() {
            organ.config_mut().registration_mode = mode;
        }

        match organ.run_cycle(&mut transport, &mut switches, &SystemClock) {
            CycleOutcome::Ran => red_led.set_low(),
            CycleOutcome::Panicked | CycleOutcome::CoolingDown => red_led.set_high(),
        }
        yield_now().await;
    }
}

/// Handles button presses, cycling through the [`RegistrationMode`] configurations.
#[embassy_executor::task]
async fn registration_mode_task(
    mut button: ExtiInput<'static>,
    mut led: Output<'static>,
    sender: RegistrationModeSender<'static>,
) -> ! {
    let mut mode = RegistrationMode::default();
    loop {
        button.wait_for_rising_edge().await;
        mode = mode.cycle();
        info!("Registration mode: {}", mode);

        match mode {
            RegistrationMode::Console => led.set_low(),
            RegistrationMode::FullOrgan => led.set_high(),
        }
        sender.send(mode);
    }
}

#[embassy_executor::task]
async fn usb_task(mut usb: UsbDevice<'static, UsbDriver>) -> ! {
    usb.run().await
}

#[embassy_executor::task]
async fn midi_rx_task(
    mut rx: MidiReceiver<'static, UsbDriver>,
    inbound: InboundSender<'static>,
) -> ! {
    loop {
        rx.wait_connection().await;
        info!("USB connected");
        let _ = receive_midi(&mut rx, inbound).await;
        info!("USB disconnected");
    }
}

#[embassy_executor::task]
async fn midi_tx_task(
    mut tx: MidiSender<'static, UsbDriver>,
    outbound: OutboundReceiver<'static>,
) -> ! {
    loop {
        tx.wait_connection().await;
        let _ = transmit_midi(&mut tx, outbound).await;
    }
}

#[doc(hidden)]
struct Disconnected {}

impl From<EndpointError> for Disconnected {
    fn from(val: EndpointError) -> Self {
        match val {
            EndpointError::BufferOverflow => panic!("Buffer overflow"),
            EndpointError::Disabled => Disconnected {},
        }
    }
}

/// Helper function which interprets data received over USB, forwarding key events to the organ.
async fn receive_midi<'d, T: usb::Instance + 'd>(
    rx: &mut MidiReceiver<'d, usb::Driver<'d, T>>,
    inbound: InboundSender<'static>,
) -> Result<(), Disconnected> {
    let mut buf = [0; 64];
    loop {
        let n = rx.read_packet(&mut buf).await?;
        for event in usb_midi::key_events(&buf[..n]) {
            inbound.send(event).await;
        }
    }
}

/// Helper function which writes queued packets to USB, as many per transfer as fit.
async fn transmit_midi<'d, T: usb::Instance + 'd>(
    tx: &mut MidiSender<'d, usb::Driver<'d, T>>,
    outbound: OutboundReceiver<'static>,
) -> Result<(), Disconnected> {
    let mut buf = [0; 64];
    loop {
        let mut n = 0;
        let mut next = Some(outbound.receive().await);
        while let Some(packet) = next {
            buf[n..n + PACKET_LEN].copy_from_slice(&packet);
            n += PACKET_LEN;
            next = if n < buf.len() {
                outbound.try_receive().ok()
            } else {
                None
            };
        }
        tx.write_packet(&buf[..n]).await?;
    }
}
