//! Kiln controller firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Max31855 (SPI2)   CurrentClamp (ADC1)   RelayPin (GPIO)       │
//! │  TaskWatchdog      FsStore (SPIFFS)      MonotonicClock        │
//! │  ChannelTelemetrySink + LogTelemetrySink                       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │   ControlService → ControlKernel                       │    │
//! │  │   PID · Profile · DutyCycleActuator                    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  TaskExecutor workers: relay PWM · CT RMS sampler               │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::spi::config::Config as SpiConfig;
use esp_idf_hal::spi::{SpiDeviceDriver, SpiDriver, SpiDriverConfig};
use esp_idf_hal::units::Hertz;

use kilnctl::adapters::storage::FsStore;
use kilnctl::adapters::telemetry::{ChannelTelemetrySink, LogTelemetrySink, TeeSink};
use kilnctl::adapters::time::MonotonicClock;
use kilnctl::app::channels::{COMMAND_CHANNEL, REPLY_CHANNEL, TELEMETRY_CHANNEL};
use kilnctl::app::ports::ConfigPort;
use kilnctl::app::service::ControlService;
use kilnctl::config::ControllerConfig;
use kilnctl::control::kernel::ControlKernel;
use kilnctl::drivers::hw_init;
use kilnctl::drivers::relay::RelayPin;
use kilnctl::drivers::watchdog::TaskWatchdog;
use kilnctl::pins;
use kilnctl::runtime::{self, TaskExecutor};
use kilnctl::sensors::current::{CurrentClamp, CurrentSampler};
use kilnctl::sensors::thermocouple::Max31855;

const DEFAULT_PROFILE: &str = "default";

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    // async-io-mini's reactor needs eventfd in the VFS.
    esp_idf_svc::io::vfs::initialize_eventfd(5)?;

    info!("╔══════════════════════════════════════╗");
    info!("║  kilnctl v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Hardware peripherals (relay LOW first) ─────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Without a relay output the kiln cannot be controlled safely.
        log::error!("HAL init failed: {}, halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // ── 3. Load config (or defaults) ──────────────────────────
    let mut store = FsStore::mount(c"/spiffs").unwrap_or_else(|e| {
        warn!("Storage mount failed ({}), config and profiles unavailable", e);
        FsStore::new("/spiffs")
    });
    let config = match ConfigPort::load(&store) {
        Ok(cfg) => {
            info!("Config loaded from settings.json");
            cfg
        }
        Err(e) => {
            warn!("Config load failed ({}), using defaults", e);
            let cfg = ControllerConfig::default();
            if let Err(e) = ConfigPort::save(&mut store, &cfg) {
                warn!("Could not write default settings.json: {}", e);
            }
            cfg
        }
    };

    let watchdog = TaskWatchdog::new(config.watchdog_timeout());

    // ── 4. Thermocouple on SPI2 ───────────────────────────────
    // gpio12 = SCK, gpio13 = MISO, gpio10 = CS (see `pins`).
    let peripherals = Peripherals::take()?;
    let spi = SpiDriver::new_without_sdo(
        peripherals.spi2,
        peripherals.pins.gpio12,
        peripherals.pins.gpio13,
        &SpiDriverConfig::new(),
    )?;
    let thermocouple_bus = SpiDeviceDriver::new(
        spi,
        Some(peripherals.pins.gpio10),
        &SpiConfig::new().baudrate(Hertz(pins::THERMOCOUPLE_SPI_HZ)),
    )?;
    let thermocouple = Max31855::new(thermocouple_bus);

    // ── 5. Executor + background workers ──────────────────────
    let executor = TaskExecutor::new();

    let mut sampler = CurrentSampler::new(CurrentClamp::new(), config.current_settings());
    sampler.calibrate(&mut FreeRtos);
    sampler.start(&executor);

    // ── 6. Kernel + service ───────────────────────────────────
    let mut kernel = ControlKernel::new(
        &executor,
        config,
        RelayPin::new(pins::RELAY_GPIO),
        MonotonicClock::new(),
        sampler.reading(),
    );
    kernel.set_program(Some(DEFAULT_PROFILE), &store);

    let mut service = ControlService::new(
        kernel,
        thermocouple,
        watchdog,
        store,
        &COMMAND_CHANNEL,
        &REPLY_CHANNEL,
    );
    let mut sink = TeeSink(ChannelTelemetrySink::new(&TELEMETRY_CHANNEL), LogTelemetrySink::new());

    // ── 7. Control loop (never returns) ───────────────────────
    runtime::run(&executor, service.run(&mut sink));

    sampler.stop();
    Ok(())
}
