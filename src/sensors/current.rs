//! Heater current via an analog current-transformer clamp.
//!
//! The CT burden voltage is biased to mid-rail.  A background worker samples
//! it at a fixed rate and reduces every `sample_count` samples to one RMS
//! reading:
//!
//! ```text
//!   Irms = sqrt( Σ (v - offset)² / N ) · rating
//! ```
//!
//! `offset` is the DC bias, measured once by [`CurrentSampler::calibrate`]
//! while the element is de-energised.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: [`CurrentClamp`] reads the CT channel of ADC1 (initialised by
//! hw_init).  On host/test: reads from a static AtomicU16 for injection.

use core::cell::{Cell, RefCell};
use core::sync::atomic::AtomicU16;
#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::Ordering;
use core::time::Duration;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::app::ports::CurrentSense;
#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::error::SensorError;
use crate::runtime::{self, Task, TaskExecutor};

/// Samples averaged to find the DC bias.
pub const CALIBRATION_SAMPLES: u32 = 100;
const CALIBRATION_INTERVAL_MS: u32 = 10;

/// Sampling parameters, derived from [`ControllerConfig`](crate::config::ControllerConfig).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentSettings {
    /// Amperes per volt RMS.
    pub rating: f32,
    /// Interval between raw samples.
    pub sample_period: Duration,
    /// Samples per RMS window.
    pub sample_count: u32,
}

// ── RMS window ────────────────────────────────────────────────

/// Sum-of-squares accumulator producing one RMS current per window.
#[derive(Debug, Clone)]
pub struct CurrentAccumulator {
    rating: f32,
    sample_count: u32,
    offset: f32,
    sum_of_squares: f32,
    samples: u32,
}

impl CurrentAccumulator {
    pub fn new(settings: &CurrentSettings, offset: f32) -> Self {
        Self {
            rating: settings.rating,
            sample_count: settings.sample_count.max(1),
            offset,
            sum_of_squares: 0.0,
            samples: 0,
        }
    }

    /// Add one raw sample (volts).  Returns the RMS current (A) when the
    /// window completes, then starts a fresh window.
    pub fn push(&mut self, volts: f32) -> Option<f32> {
        let centred = volts - self.offset;
        self.sum_of_squares += centred * centred;
        self.samples += 1;
        if self.samples < self.sample_count {
            return None;
        }
        let rms = (self.sum_of_squares / self.sample_count as f32).sqrt();
        self.sum_of_squares = 0.0;
        self.samples = 0;
        Some(rms * self.rating)
    }
}

// ── Shared reading ────────────────────────────────────────────

/// Read handle to the latest RMS current (A).  Cloned into the kernel.
#[derive(Debug, Clone, Default)]
pub struct CurrentReading(Rc<Cell<f32>>);

impl CurrentReading {
    pub fn get(&self) -> f32 {
        self.0.get()
    }

    fn set(&self, amps: f32) {
        self.0.set(amps);
    }
}

// ── Sampler ───────────────────────────────────────────────────

/// Background RMS current measurement.
pub struct CurrentSampler<S> {
    sensor: Rc<RefCell<S>>,
    settings: CurrentSettings,
    offset: f32,
    reading: CurrentReading,
    worker: Option<Task<()>>,
}

impl<S: CurrentSense + 'static> CurrentSampler<S> {
    pub fn new(sensor: S, settings: CurrentSettings) -> Self {
        Self {
            sensor: Rc::new(RefCell::new(sensor)),
            settings,
            offset: 0.0,
            reading: CurrentReading::default(),
            worker: None,
        }
    }

    /// Average [`CALIBRATION_SAMPLES`] samples, 10 ms apart, as the DC bias.
    ///
    /// Blocking; call before the scheduler starts, with the element OFF.
    /// Failed samples are skipped.  If every sample fails the bias stays at
    /// its previous value.
    pub fn calibrate(&mut self, delay: &mut impl DelayNs) -> f32 {
        let mut sum = 0.0;
        let mut good = 0u32;
        for _ in 0..CALIBRATION_SAMPLES {
            match self.sensor.borrow_mut().read_volts() {
                Ok(v) => {
                    sum += v;
                    good += 1;
                }
                Err(e) => debug!("CT calibration sample skipped: {}", e),
            }
            delay.delay_ms(CALIBRATION_INTERVAL_MS);
        }

        if good == 0 {
            warn!("CT calibration failed: no valid samples, offset unchanged");
        } else {
            self.offset = sum / good as f32;
            info!("CT calibrated: offset={:.4} V ({} samples)", self.offset, good);
        }
        self.offset
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Handle to the latest RMS reading.
    pub fn reading(&self) -> CurrentReading {
        self.reading.clone()
    }

    pub fn current(&self) -> f32 {
        self.reading.get()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Spawn the sampling worker.  No-op if already running.
    pub fn start(&mut self, executor: &TaskExecutor) {
        if self.worker.is_some() {
            return;
        }
        let task = executor.spawn(sample_loop(
            self.sensor.clone(),
            CurrentAccumulator::new(&self.settings, self.offset),
            self.reading.clone(),
            self.settings.sample_period,
        ));
        self.worker = Some(task);
        debug!(
            "CT sampler started ({} samples every {:?})",
            self.settings.sample_count, self.settings.sample_period
        );
    }

    pub fn stop(&mut self) {
        if self.worker.take().is_some() {
            debug!("CT sampler stopped");
        }
    }
}

async fn sample_loop<S: CurrentSense>(
    sensor: Rc<RefCell<S>>,
    mut window: CurrentAccumulator,
    reading: CurrentReading,
    period: Duration,
) {
    loop {
        let sample = sensor.borrow_mut().read_volts();
        match sample {
            Ok(volts) => {
                if let Some(amps) = window.push(volts) {
                    reading.set(amps);
                }
            }
            Err(e) => debug!("CT sample skipped: {}", e),
        }
        runtime::sleep(period).await;
    }
}

// ── ADC adapter ───────────────────────────────────────────────

const ADC_MAX: f32 = 4095.0;
const V_REF: f32 = 3.3;

static SIM_CT_ADC: AtomicU16 = AtomicU16::new(2048);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_ct_adc(raw: u16) {
    SIM_CT_ADC.store(raw, Ordering::Relaxed);
}

/// CT burden voltage on ADC1.
#[derive(Debug, Default)]
pub struct CurrentClamp;

impl CurrentClamp {
    pub fn new() -> Self {
        Self
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> Option<u16> {
        hw_init::adc1_read(hw_init::ADC1_CH_CT)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> Option<u16> {
        Some(SIM_CT_ADC.load(Ordering::Relaxed))
    }
}

impl CurrentSense for CurrentClamp {
    fn read_volts(&mut self) -> Result<f32, SensorError> {
        let raw = self.read_adc().ok_or(SensorError::AdcReadFailed)?;
        Ok(raw as f32 / ADC_MAX * V_REF)
    }
}
