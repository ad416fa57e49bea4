//! Compile-time configuration: board wiring, converter setup and timings.
//!
//! The machine has no runtime configuration. Changing the wiring or timings
//! means editing these constants and rebuilding.

use crate::adc::{AdcConfig, Channel, ConversionClock, Resolution};
use crate::dio::{Pin, Port};
use crate::lcd::LcdPins;

/// Instruction clock of the 4 MHz crystal (Fosc / 4).
pub const INSTRUCTION_CLOCK_HZ: u32 = 1_000_000;

/// Port carrying both dispenser LEDs and the buzzer.
pub const OUTPUT_PORT: Port = Port::A;
/// LED lit while the drink is dispensed.
pub const DRINK_LED: Pin = Pin::P0;
/// LED lit while change is returned.
pub const CHANGE_LED: Pin = Pin::P1;
/// Anti-theft buzzer.
pub const ALARM_BUZZER: Pin = Pin::P2;

/// Port carrying the three push-buttons (active low, interrupt-on-change).
pub const BUTTON_PORT: Port = Port::B;
/// Next drink / 1-unit coin.
pub const BUTTON_A: Pin = Pin::P0;
/// Confirm selection / 2-unit coin.
pub const BUTTON_B: Pin = Pin::P1;
/// 5-unit coin.
pub const BUTTON_C: Pin = Pin::P2;

/// Character display wiring.
pub const LCD_PINS: LcdPins = LcdPins {
    port: Port::C,
    rs: Pin::P0,
    en: Pin::P3,
    d4: Pin::P4,
    d5: Pin::P5,
    d6: Pin::P6,
    d7: Pin::P7,
};

/// Visible columns per display row.
pub const LCD_COLUMNS: usize = 16;

/// Converter setup.
pub const ADC: AdcConfig = AdcConfig {
    resolution: Resolution::TenBit,
    clock: ConversionClock::FoscDiv8,
};

/// Potentiometer standing in for the tilt sensor.
pub const TILT_CHANNEL: Channel = Channel::An9;

/// Tilt alarm threshold at 10-bit resolution (about 2 V on a 5 V reference).
pub const TILT_THRESHOLD_10BIT: u16 = 0x199;

/// Tilt threshold at the configured resolution.
pub const TILT_THRESHOLD: u16 = ADC.resolution.scale_from_ten_bit(TILT_THRESHOLD_10BIT);

/// Timer2 prescaler field value (1:16).
pub const TIMER2_PRESCALER: u8 = 0b11;
/// Timer2 postscaler field value (1:10).
pub const TIMER2_POSTSCALER: u8 = 0x9;
/// Timer2 period register.
pub const TIMER2_PERIOD: u8 = 0x8E;

/// Length of one clock tick: 16 * (PR2 + 1) * 10 instruction cycles.
pub const TICK_PERIOD_US: u32 =
    16 * (TIMER2_PERIOD as u32 + 1) * 10 * (1_000_000 / INSTRUCTION_CLOCK_HZ);

/// Ticks between tilt samples (about 500 ms).
pub const TILT_SAMPLE_TICKS: u8 = 22;

/// One Timer0 overflow at 1:256 prescale.
const TIMER0_OVERFLOW_US: u64 = 256 * 256;

/// Timer0 overflows making up the dispensing time.
pub const DISPENSE_OVERFLOWS: u64 = 76;

/// Time the drink LED stays lit.
pub const DISPENSE_MS: u64 = DISPENSE_OVERFLOWS * TIMER0_OVERFLOW_US / 1_000;

/// Overflow counts after which a progress mark is drawn while dispensing.
const PROGRESS_OVERFLOWS: [u64; 4] = [2, 21, 41, 71];

/// Offsets into the dispensing time at which progress marks appear.
pub const PROGRESS_MARKS_MS: [u64; 4] = [
    PROGRESS_OVERFLOWS[0] * TIMER0_OVERFLOW_US / 1_000,
    PROGRESS_OVERFLOWS[1] * TIMER0_OVERFLOW_US / 1_000,
    PROGRESS_OVERFLOWS[2] * TIMER0_OVERFLOW_US / 1_000,
    PROGRESS_OVERFLOWS[3] * TIMER0_OVERFLOW_US / 1_000,
];

/// Time the change LED stays lit and the change is shown.
pub const CHANGE_MS: u64 = 5_000;

/// Time the collection message is shown before the machine resets.
pub const COLLECT_MS: u64 = 5_000;
