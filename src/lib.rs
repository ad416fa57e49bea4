#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`VendingMachine`**: Foreground controller; call `service()` from the main loop
//! - **`InputHandler`**: Interrupt-context half; call `service()` from the interrupt vector
//! - **`SharedState`**: The state, drink and balance shared by both, split into
//!   a `Foreground` and an `Isr` handle with fixed write ownership
//! - **`Snapshot`**: One consistent reading of the shared state, plus the pure
//!   transition functions applied to it
//! - **`Deadline`**: Non-blocking replacement for the timed waits
//! - **`TickClock`**: `TimeSource` advanced by the periodic timer interrupt
//! - **`DigitalIo`**, **`AnalogInput`**, **`CharacterDisplay`**: Traits the core
//!   drives; `Dio`, `Adc` and `Lcd` implement them on top of a `RegisterBlock`
//!
//! Amounts are counted in coin units of 10p and shown as a single digit
//! followed by `0`, so every price and every change amount must stay within
//! 0-9 units.

#[macro_use]
mod fmt;

pub mod config;
pub mod registers;
pub mod dio;
pub mod adc;
pub mod lcd;
pub mod time;
pub mod interrupt;
pub mod types;
pub mod shared;
pub mod input;
pub mod machine;

pub use adc::{Adc, AdcConfig, AnalogInput, Channel, ConversionClock, InvalidChannel, Resolution};
pub use dio::{DigitalIo, Dio, InvalidPin, Level, Pin, PinMode, Port};
pub use input::{InputHandler, TiltMonitor};
pub use interrupt::{Interrupt, InterruptController};
pub use lcd::{CharacterDisplay, Lcd, LcdPins, LcdPinsError};
pub use machine::{ServiceTiming, VendingMachine};
pub use registers::{Register, RegisterBlock, RegisterFile};
pub use shared::{Foreground, Isr, SharedState, Snapshot};
pub use time::{Deadline, Millis, TickClock, TickInstant, TimeDuration, TimeInstant, TimeSource};
pub use types::{Balance, Button, Coin, Drink, State};
