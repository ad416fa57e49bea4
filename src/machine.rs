//! The foreground half of the vending machine.
//!
//! [`VendingMachine::service`] is called from the main loop. Each call reads
//! the shared state once, runs the handler for the current phase and returns.
//! Phases that used to block on a timer now start a [`Deadline`] on entry and
//! poll it on every later call, so the loop never stalls and the interrupt
//! handler keeps running throughout.

use heapless::String;

use crate::config::{
    ALARM_BUZZER, BUTTON_PORT, CHANGE_LED, CHANGE_MS, COLLECT_MS, DISPENSE_MS, DRINK_LED,
    LCD_COLUMNS, OUTPUT_PORT, PROGRESS_MARKS_MS,
};
use crate::dio::{DigitalIo, Level, PinMode};
use crate::interrupt::button_pin;
use crate::lcd::CharacterDisplay;
use crate::shared::{Foreground, Snapshot};
use crate::time::{Deadline, TimeDuration, TimeInstant, TimeSource};
use crate::types::{Button, Drink, State, digit_glyph};

/// Fixed screen texts.
pub mod text {
    pub const SELECT_DRINK: &str = "Select Drink:";
    pub const INSERT_COINS: &str = "Insert Coins:";
    pub const DISPENSING: &str = "Drink Dispensing";
    pub const PLEASE_COLLECT: &str = "Please Collect";
    pub const YOUR_DRINK: &str = "Your Drink!";
    pub const CHANGE_DUE: &str = "Change due:";
    pub const PROGRESS: &str = "....";
}

/// When the foreground next needs servicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServiceTiming<D> {
    /// The phase redraws or checks input on every pass. Service again
    /// immediately.
    Continuous,

    /// A timed phase is running. Nothing changes on screen for at least
    /// this long; the caller may sleep until the next interrupt.
    Delay(D),
}

/// Progress of a timed phase, private to the foreground.
#[derive(Clone, Copy)]
enum Activity<I: TimeInstant> {
    Idle,
    Dispensing { deadline: Deadline<I>, marks: usize },
    ReturningChange { deadline: Deadline<I> },
    Presenting { deadline: Deadline<I> },
}

/// Foreground controller of the vending machine.
///
/// # Type Parameters
/// * `'a` - Lifetime of the shared state and time source
/// * `I` - Time instant type
/// * `T` - Time source implementation type
/// * `O` - Digital I/O driving the LEDs and configuring the buttons
/// * `D` - Character display
pub struct VendingMachine<'a, I, T, O, D>
where
    I: TimeInstant,
    T: TimeSource<I>,
    O: DigitalIo,
    D: CharacterDisplay,
{
    io: O,
    display: D,
    shared: Foreground<'a>,
    clock: &'a T,
    activity: Activity<I>,
    last_change: u8,
}

impl<'a, I, T, O, D> VendingMachine<'a, I, T, O, D>
where
    I: TimeInstant,
    T: TimeSource<I>,
    O: DigitalIo,
    D: CharacterDisplay,
{
    /// Creates the controller. Nothing is touched until [`Self::init`] or the
    /// first [`Self::service`].
    pub fn new(io: O, display: D, shared: Foreground<'a>, clock: &'a T) -> Self {
        Self {
            io,
            display,
            shared,
            clock,
            activity: Activity::Idle,
            last_change: 0,
        }
    }

    /// Configures the pins and enters drink selection.
    ///
    /// The display must already be initialised. Calling this is optional:
    /// the machine starts in [`State::Initial`] and the first
    /// [`Self::service`] performs the same reset.
    pub fn init(&mut self) {
        self.reset();
    }

    /// Runs one pass of the foreground loop.
    pub fn service(&mut self) -> ServiceTiming<I::Duration> {
        let mut snapshot = self.shared.snapshot();
        if snapshot.state == State::Initial {
            snapshot = self.reset();
        }

        match snapshot.state {
            State::DrinkSelection => {
                self.show_selection(snapshot.drink);
                ServiceTiming::Continuous
            }
            State::CoinInsertion => {
                self.collect_coins(snapshot);
                ServiceTiming::Continuous
            }
            State::DrinkDispense => self.dispense(),
            State::DispenseChange => self.return_change(),
            State::DrinkReady => self.present(),
            // Reserved states are never entered; nothing to do if one shows up.
            State::Initial | State::TiltSensing | State::Alarm => ServiceTiming::Continuous,
        }
    }

    /// Current shared state.
    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshot()
    }

    /// Change units counted in the most recent change return.
    pub fn last_change(&self) -> u8 {
        self.last_change
    }

    /// Returns the I/O handle.
    pub fn io(&self) -> &O {
        &self.io
    }

    /// Returns the display.
    pub fn display(&self) -> &D {
        &self.display
    }

    /// `Initial -> DrinkSelection`.
    fn reset(&mut self) -> Snapshot {
        self.io.set_pin_mode(OUTPUT_PORT, DRINK_LED, PinMode::Output);
        self.io.set_pin_mode(OUTPUT_PORT, CHANGE_LED, PinMode::Output);
        self.io.set_pin_value(OUTPUT_PORT, DRINK_LED, Level::Low);
        self.io.set_pin_value(OUTPUT_PORT, CHANGE_LED, Level::Low);
        // The buzzer level belongs to the tilt check and is left alone.
        self.io.set_pin_mode(OUTPUT_PORT, ALARM_BUZZER, PinMode::Output);
        for button in Button::PRIORITY {
            self.io
                .set_pin_mode(BUTTON_PORT, button_pin(button), PinMode::InterruptOnChange);
        }

        self.display.clear();
        let snapshot = self.shared.reset();
        self.activity = Activity::Idle;
        self.write_row(0, text::SELECT_DRINK);

        info!("reset: selecting drinks");
        snapshot
    }

    fn show_selection(&mut self, drink: Drink) {
        self.write_row(1, drink.label());
    }

    fn collect_coins(&mut self, snapshot: Snapshot) {
        if snapshot.balance > 0 {
            self.write_row(0, text::INSERT_COINS);
            self.write_amount(1, snapshot.balance as u8);
        } else {
            let next = self.shared.finish_payment();
            info!("paid, balance {} -> {}", next.balance, next.state);
        }
    }

    fn dispense(&mut self) -> ServiceTiming<I::Duration> {
        let now = self.clock.now();
        let (deadline, mut marks) = match self.activity {
            Activity::Dispensing { deadline, marks } => (deadline, marks),
            _ => {
                self.io.set_pin_value(OUTPUT_PORT, DRINK_LED, Level::High);
                self.write_row(0, text::DISPENSING);
                self.write_row(1, "");
                self.display.set_cursor(1, 0);
                info!("dispensing");
                (Deadline::start(now, I::Duration::from_millis(DISPENSE_MS)), 0)
            }
        };

        let elapsed = deadline.elapsed(now).as_millis();
        while marks < PROGRESS_MARKS_MS.len() && elapsed >= PROGRESS_MARKS_MS[marks] {
            self.display.put_str(text::PROGRESS);
            marks += 1;
        }

        if deadline.has_elapsed(now) {
            self.io.set_pin_value(OUTPUT_PORT, DRINK_LED, Level::Low);
            self.activity = Activity::Idle;
            let next = self.shared.finish_dispense();
            info!("dispensed -> {}", next.state);
            return ServiceTiming::Continuous;
        }

        self.activity = Activity::Dispensing { deadline, marks };
        let until_deadline = deadline.remaining(now).as_millis();
        let wait = match PROGRESS_MARKS_MS.get(marks) {
            Some(mark) => until_deadline.min(mark.saturating_sub(elapsed)),
            None => until_deadline,
        };
        ServiceTiming::Delay(I::Duration::from_millis(wait))
    }

    fn return_change(&mut self) -> ServiceTiming<I::Duration> {
        let now = self.clock.now();
        let deadline = match self.activity {
            Activity::ReturningChange { deadline } => deadline,
            _ => {
                let change = self.shared.settle_change();
                self.last_change = change;
                self.io.set_pin_value(OUTPUT_PORT, CHANGE_LED, Level::High);
                self.write_row(0, text::CHANGE_DUE);
                self.write_amount(1, change);
                info!("returning {} units of change", change);
                Deadline::start(now, I::Duration::from_millis(CHANGE_MS))
            }
        };

        if deadline.has_elapsed(now) {
            self.io.set_pin_value(OUTPUT_PORT, CHANGE_LED, Level::Low);
            self.activity = Activity::Idle;
            self.shared.finish_change();
            return ServiceTiming::Continuous;
        }

        self.activity = Activity::ReturningChange { deadline };
        ServiceTiming::Delay(deadline.remaining(now))
    }

    fn present(&mut self) -> ServiceTiming<I::Duration> {
        let now = self.clock.now();
        let deadline = match self.activity {
            Activity::Presenting { deadline } => deadline,
            _ => {
                self.write_row(0, text::PLEASE_COLLECT);
                self.write_row(1, text::YOUR_DRINK);
                Deadline::start(now, I::Duration::from_millis(COLLECT_MS))
            }
        };

        if deadline.has_elapsed(now) {
            self.activity = Activity::Idle;
            self.shared.finish_collection();
            info!("drink collected");
            return ServiceTiming::Continuous;
        }

        self.activity = Activity::Presenting { deadline };
        ServiceTiming::Delay(deadline.remaining(now))
    }

    /// Writes `text` at the start of `row`, blanking the rest of the row.
    fn write_row(&mut self, row: u8, text: &str) {
        let mut line: String<LCD_COLUMNS> = String::new();
        for c in text.chars() {
            if line.push(c).is_err() {
                break;
            }
        }
        while line.push(' ').is_ok() {}

        self.display.set_cursor(row, 0);
        self.display.put_str(&line);
    }

    /// Writes a single-digit amount in pence ("6" shows as "60").
    fn write_amount(&mut self, row: u8, amount: u8) {
        self.display.set_cursor(row, 0);
        self.display.put_char(digit_glyph(amount));
        self.display.put_char(b'0');
        for _ in 2..LCD_COLUMNS {
            self.display.put_char(b' ');
        }
    }
}
