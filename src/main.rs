//! PetFeeder firmware entry point.
//!
//! Hexagonal architecture with a single cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter        LogEventSink     Esp32TimeAdapter      │
//! │  (buttons, DRV8825,     (EventSink)      (TimePort, DelayNs)   │
//! │   buzzer, I2C sensor)                                          │
//! │  ModemSession<UartModem> (SmsLink over SIM800L)                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │             FeederService (pure logic)                 │    │
//! │  │  Sensors · Auto-feed FSM · Motion · Safety · SMS queue │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Watchdog fed once per loop iteration                          │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, PinDriver, Pull};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{self, UartDriver};
use esp_idf_hal::units::Hertz;

use petfeeder::adapters::hardware::HardwareAdapter;
use petfeeder::adapters::log_sink::LogEventSink;
use petfeeder::adapters::time::Esp32TimeAdapter;
use petfeeder::adapters::uart_modem::UartModem;
use petfeeder::app::ports::TimePort;
use petfeeder::app::service::FeederService;
use petfeeder::config::SystemConfig;
use petfeeder::drivers::buzzer::Buzzer;
use petfeeder::drivers::stepper::StepperDriver;
use petfeeder::drivers::watchdog::{self, Watchdog};
use petfeeder::gsm::session::{ModemSession, SessionTimings};
use petfeeder::pins;

/// Loop pause while the motor is idle.  Skipped during a dispense so the
/// pulse train is only interrupted by the other tasks.
const LOOP_IDLE_DELAY_MS: u32 = 10;

/// Build-time JSON override, if any, on top of the defaults.
fn load_config() -> SystemConfig {
    match option_env!("PETFEEDER_CONFIG_JSON") {
        Some(json) => match SystemConfig::from_json(json) {
            Ok(cfg) => {
                info!("Config: build-time override applied");
                cfg
            }
            Err(e) => {
                warn!("Config override rejected ({}), using defaults", e);
                SystemConfig::default()
            }
        },
        None => SystemConfig::default(),
    }
}

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PetFeeder v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = load_config();
    let peripherals = Peripherals::take()?;
    let io = peripherals.pins;
    let clock = Esp32TimeAdapter::new();

    // ── Buttons (active low, internal pull-ups) ──────────────
    let mut feed_button = PinDriver::input(io.gpio10)?;
    feed_button.set_pull(Pull::Up)?;
    let mut mode_button = PinDriver::input(io.gpio11)?;
    mode_button.set_pull(Pull::Up)?;

    // ── DRV8825 + buzzer ─────────────────────────────────────
    let stepper = StepperDriver::new(
        PinDriver::output(io.gpio2)?,
        PinDriver::output(io.gpio1)?,
        PinDriver::output(io.gpio3)?,
        clock,
    );
    let buzzer = Buzzer::new(PinDriver::output(io.gpio12)?, clock);

    // ── Distance sensor on I2C0 ──────────────────────────────
    let i2c_config = I2cConfig::new().baudrate(Hertz(pins::I2C_BAUDRATE_HZ));
    let i2c = I2cDriver::new(peripherals.i2c0, io.gpio8, io.gpio9, &i2c_config)?;
    info!(
        "Pins: STEP={} DIR={} EN={} SDA={} SCL={} FEED={} MODE={} BUZZ={}",
        pins::STEP_GPIO,
        pins::DIR_GPIO,
        pins::ENABLE_GPIO,
        pins::I2C_SDA_GPIO,
        pins::I2C_SCL_GPIO,
        pins::FEED_BUTTON_GPIO,
        pins::MODE_BUTTON_GPIO,
        pins::BUZZER_GPIO
    );

    let mut hw = HardwareAdapter::new(feed_button, mode_button, i2c, stepper, buzzer, clock);

    // ── SIM800L on UART1 ─────────────────────────────────────
    let uart_config = uart::config::Config::default().baudrate(Hertz(pins::GSM_BAUD));
    let uart = UartDriver::new(
        peripherals.uart1,
        io.gpio7,
        io.gpio6,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &uart_config,
    )?;
    let reset = PinDriver::output(AnyOutputPin::from(io.gpio13))?;
    info!(
        "GSM: UART1 TX={} RX={} RST={} @ {} baud",
        pins::GSM_TX_GPIO,
        pins::GSM_RX_GPIO,
        pins::GSM_RESET_GPIO,
        pins::GSM_BAUD
    );
    let mut modem = ModemSession::new(UartModem::new(uart, reset), clock, SessionTimings::from(&config));

    let watchdog = Watchdog::new(watchdog::timeout_for(&config));
    let mut sink = LogEventSink::new();

    let mut feeder = FeederService::new(config, clock.now_ms());
    feeder.start(&mut hw, &mut sink);
    modem.begin(clock.now_ms());
    watchdog.feed();

    info!("System ready. Entering control loop.");

    loop {
        feeder.tick(&mut hw, &mut modem, &mut sink);
        watchdog.feed();

        if !feeder.is_dispensing() {
            FreeRtos::delay_ms(LOOP_IDLE_DELAY_MS);
        }
    }
}
