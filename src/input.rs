//! Interrupt-context handling: button presses, the clock tick and the tilt
//! check.
//!
//! Everything here runs inside the interrupt vector. Nothing blocks except the
//! ADC conversion of the tilt sample, which takes microseconds.

use crate::adc::AnalogInput;
use crate::config::{ALARM_BUZZER, OUTPUT_PORT, TILT_CHANNEL, TILT_SAMPLE_TICKS, TILT_THRESHOLD};
use crate::dio::{DigitalIo, Level};
use crate::interrupt::{Interrupt, InterruptController};
use crate::registers::RegisterBlock;
use crate::shared::Isr;
use crate::time::TickClock;

/// Anti-theft check sampling the tilt sensor every [`TILT_SAMPLE_TICKS`] ticks.
///
/// Independent of the vending cycle: it never changes the machine state, it
/// only reports the level the buzzer should take.
pub struct TiltMonitor<A: AnalogInput> {
    adc: A,
    ticks: u8,
    tilted: bool,
}

impl<A: AnalogInput> TiltMonitor<A> {
    pub fn new(adc: A) -> Self {
        Self {
            adc,
            ticks: 0,
            tilted: false,
        }
    }

    /// Initialises the converter.
    pub fn init(&mut self) {
        self.adc.init();
    }

    /// Counts one tick. Every [`TILT_SAMPLE_TICKS`] ticks the sensor is
    /// sampled and the buzzer level returned: high above the threshold, low
    /// otherwise.
    pub fn on_tick(&mut self) -> Option<Level> {
        self.ticks = self.ticks.wrapping_add(1);
        if self.ticks < TILT_SAMPLE_TICKS {
            return None;
        }
        self.ticks = 0;

        let sample = self.adc.read(TILT_CHANNEL);
        let tilted = sample > TILT_THRESHOLD;
        if tilted != self.tilted {
            if tilted {
                warn!("tilt detected, sample {}", sample);
            } else {
                info!("tilt cleared, sample {}", sample);
            }
            self.tilted = tilted;
        }
        Some(Level::from(tilted))
    }

    /// Returns true while the last sample was above the threshold.
    pub fn is_tilted(&self) -> bool {
        self.tilted
    }
}

/// The interrupt handler.
///
/// Owns the interrupt side of the shared state, the tilt monitor and an I/O
/// handle for the buzzer.
pub struct InputHandler<'a, A: AnalogInput, O: DigitalIo> {
    isr: Isr<'a>,
    clock: &'a TickClock,
    tilt: TiltMonitor<A>,
    io: O,
}

impl<'a, A: AnalogInput, O: DigitalIo> InputHandler<'a, A, O> {
    pub fn new(isr: Isr<'a>, clock: &'a TickClock, adc: A, io: O) -> Self {
        Self {
            isr,
            clock,
            tilt: TiltMonitor::new(adc),
            io,
        }
    }

    /// Initialises the tilt sensor's converter. Call before enabling
    /// interrupts.
    pub fn init(&mut self) {
        self.tilt.init();
    }

    /// Full interrupt vector body: classify, handle, acknowledge.
    pub fn service<R: RegisterBlock>(&mut self, controller: &InterruptController<R>) {
        if let Some(irq) = controller.pending() {
            self.handle(irq);
            controller.acknowledge(irq);
        }
    }

    /// Handles one classified interrupt.
    pub fn handle(&mut self, irq: Interrupt) {
        match irq {
            Interrupt::Button(button) => {
                let after = self.isr.press(button);
                debug!(
                    "button {} -> {} {} balance {}",
                    button, after.state, after.drink, after.balance
                );
            }
            Interrupt::PinChange => {}
            Interrupt::TimerOverflow => {
                self.clock.tick();
                if let Some(level) = self.tilt.on_tick() {
                    self.io.set_pin_value(OUTPUT_PORT, ALARM_BUZZER, level);
                }
            }
        }
    }

    pub fn tilt(&self) -> &TiltMonitor<A> {
        &self.tilt
    }

    /// Returns the I/O handle driving the buzzer.
    pub fn io(&self) -> &O {
        &self.io
    }
}
