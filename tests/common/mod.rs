//! Shared test infrastructure for vending-machine integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use core::cell::{Cell, RefCell};

use embedded_hal::delay::DelayNs;
use vending_machine::config::LCD_PINS;
use vending_machine::interrupt::button_pin;
use vending_machine::registers::bits;
use vending_machine::{
    AnalogInput, Button, CharacterDisplay, Channel, DigitalIo, InputHandler, Interrupt, Level,
    Millis, Pin, PinMode, Port, Register, RegisterBlock, RegisterFile, ServiceTiming, SharedState,
    State, TickClock, TickInstant, TimeDuration, TimeInstant, TimeSource, VendingMachine,
};

// ============================================================================
// Mock Time Types
// ============================================================================

/// Mock duration type for testing (wraps milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestDuration(pub u64);

impl TimeDuration for TestDuration {
    const ZERO: Self = TestDuration(0);

    fn as_millis(&self) -> u64 {
        self.0
    }

    fn from_millis(millis: u64) -> Self {
        TestDuration(millis)
    }

    fn saturating_sub(self, other: Self) -> Self {
        TestDuration(self.0.saturating_sub(other.0))
    }
}

/// Mock instant type for testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestInstant(pub u64);

impl TimeInstant for TestInstant {
    type Duration = TestDuration;

    fn duration_since(&self, earlier: Self) -> Self::Duration {
        TestDuration(self.0 - earlier.0)
    }
}

// ============================================================================
// Mock Time Source
// ============================================================================

/// Mock time source with controllable time advancement
pub struct MockTimeSource {
    current_time: Cell<TestInstant>,
}

impl MockTimeSource {
    pub fn new() -> Self {
        Self {
            current_time: Cell::new(TestInstant(0)),
        }
    }

    /// Advance time by the given duration
    pub fn advance(&self, duration: TestDuration) {
        let current = self.current_time.get();
        self.current_time.set(TestInstant(current.0 + duration.0));
    }
}

impl TimeSource<TestInstant> for MockTimeSource {
    fn now(&self) -> TestInstant {
        self.current_time.get()
    }
}

// ============================================================================
// Mock Digital I/O
// ============================================================================

/// Mock I/O that tracks pin modes and levels and records every level write
pub struct MockIo {
    modes: [[Option<PinMode>; 8]; 3],
    levels: [[Level; 8]; 3],
    history: heapless::Vec<(Port, Pin, Level), 256>,
}

impl MockIo {
    pub fn new() -> Self {
        Self {
            modes: [[None; 8]; 3],
            levels: [[Level::Low; 8]; 3],
            history: heapless::Vec::new(),
        }
    }

    pub fn mode(&self, port: Port, pin: Pin) -> Option<PinMode> {
        self.modes[port as usize][pin.number() as usize]
    }

    pub fn level(&self, port: Port, pin: Pin) -> Level {
        self.levels[port as usize][pin.number() as usize]
    }

    /// Levels written to one pin, oldest first
    pub fn writes_to(&self, port: Port, pin: Pin) -> Vec<Level> {
        self.history
            .iter()
            .filter(|(p, n, _)| *p == port && *n == pin)
            .map(|(_, _, level)| *level)
            .collect()
    }
}

impl DigitalIo for MockIo {
    fn set_pin_mode(&mut self, port: Port, pin: Pin, mode: PinMode) {
        self.modes[port as usize][pin.number() as usize] = Some(mode);
    }

    fn set_pin_value(&mut self, port: Port, pin: Pin, level: Level) {
        self.levels[port as usize][pin.number() as usize] = level;
        let _ = self.history.push((port, pin, level));
    }
}

// ============================================================================
// Mock Display
// ============================================================================

const DDRAM_COLUMNS: usize = 40;
const VISIBLE_COLUMNS: usize = 16;

/// Mock character display keeping a DDRAM image of four rows
pub struct MockDisplay {
    ddram: [[u8; DDRAM_COLUMNS]; 4],
    cursor: (usize, usize),
    clears: usize,
    on: bool,
}

impl MockDisplay {
    pub fn new() -> Self {
        Self {
            ddram: [[b' '; DDRAM_COLUMNS]; 4],
            cursor: (0, 0),
            clears: 0,
            on: true,
        }
    }

    /// The visible part of a row
    pub fn row(&self, row: usize) -> String {
        String::from_utf8_lossy(&self.ddram[row][..VISIBLE_COLUMNS]).into_owned()
    }

    /// The visible part of a row without trailing blanks
    pub fn text(&self, row: usize) -> String {
        self.row(row).trim_end().to_string()
    }

    pub fn cursor(&self) -> (usize, usize) {
        self.cursor
    }

    pub fn clears(&self) -> usize {
        self.clears
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl CharacterDisplay for MockDisplay {
    fn set_cursor(&mut self, row: u8, column: u8) {
        if (row as usize) < self.ddram.len() {
            self.cursor = (row as usize, column as usize);
        }
    }

    fn put_char(&mut self, byte: u8) {
        let (row, column) = self.cursor;
        if column < DDRAM_COLUMNS {
            self.ddram[row][column] = byte;
        }
        self.cursor.1 += 1;
    }

    fn clear(&mut self) {
        self.ddram = [[b' '; DDRAM_COLUMNS]; 4];
        self.cursor = (0, 0);
        self.clears += 1;
    }

    fn display_on(&mut self) {
        self.on = true;
    }

    fn display_off(&mut self) {
        self.on = false;
    }
}

// ============================================================================
// Mock Analog Input
// ============================================================================

/// Mock converter returning a settable sample. Handed out by reference so
/// the sample can change while a handler owns the converter.
pub struct MockAdc {
    sample: Cell<u16>,
    initialised: Cell<bool>,
    reads: RefCell<Vec<Channel>>,
}

impl MockAdc {
    pub fn new(sample: u16) -> Self {
        Self {
            sample: Cell::new(sample),
            initialised: Cell::new(false),
            reads: RefCell::new(Vec::new()),
        }
    }

    pub fn set_sample(&self, sample: u16) {
        self.sample.set(sample);
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised.get()
    }

    pub fn reads(&self) -> Vec<Channel> {
        self.reads.borrow().clone()
    }
}

impl AnalogInput for &MockAdc {
    fn init(&mut self) {
        self.initialised.set(true);
    }

    fn read(&mut self, channel: Channel) -> u16 {
        self.reads.borrow_mut().push(channel);
        self.sample.get()
    }
}

// ============================================================================
// Mock Delay
// ============================================================================

/// Delay provider that returns immediately and totals the requested time
#[derive(Default)]
pub struct NoopDelay {
    total_ns: u64,
}

impl NoopDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_us(&self) -> u64 {
        self.total_ns / 1_000
    }
}

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}

// ============================================================================
// Simulated Special Function Registers
// ============================================================================

/// Register bank with just enough peripheral behaviour for the drivers:
/// setting GO completes a conversion at once, loading the result registers
/// from the analog sample, and every falling edge on the display's enable
/// line is captured as an (RS, nibble) transfer.
pub struct SimulatedSfr {
    regs: RegisterFile,
    sample: Cell<u16>,
    transfers: RefCell<Vec<(bool, u8)>>,
}

impl SimulatedSfr {
    pub fn new() -> Self {
        Self {
            regs: RegisterFile::new(),
            sample: Cell::new(0),
            transfers: RefCell::new(Vec::new()),
        }
    }

    /// Sets the 10-bit analog value the next conversion returns
    pub fn set_sample(&self, sample: u16) {
        self.sample.set(sample & 0x3FF);
    }

    /// Display transfers latched so far, oldest first
    pub fn transfers(&self) -> Vec<(bool, u8)> {
        self.transfers.borrow().clone()
    }

    pub fn clear_transfers(&self) {
        self.transfers.borrow_mut().clear();
    }

    /// Drives the button port pins: a pressed button reads low
    pub fn hold_buttons(&self, pressed: &[Button]) {
        let mut port = 0b0000_0111;
        for button in pressed {
            port &= !(1u8 << button_pin(*button).number());
        }
        self.regs.write(Register::PortB, port);
        self.regs.set_bit(Register::Intcon, bits::RBIF);
    }

    /// Raises the Timer2 match flag
    pub fn timer_match(&self) {
        self.regs.set_bit(Register::Pir1, bits::TMR2IF);
    }

    fn convert(&self, adcon0: u8) -> u8 {
        let sample = self.sample.get();
        if self.regs.read(Register::AdCon1) & 0x80 != 0 {
            self.regs.write(Register::AdResH, (sample >> 8) as u8);
            self.regs.write(Register::AdResL, (sample & 0xFF) as u8);
        } else {
            self.regs.write(Register::AdResH, (sample >> 2) as u8);
            self.regs.write(Register::AdResL, ((sample & 0b11) << 6) as u8);
        }
        adcon0 & !(1 << bits::GO)
    }

    fn latch(&self, before: u8, after: u8) {
        let en = 1 << LCD_PINS.en.number();
        if before & en != 0 && after & en == 0 {
            let rs = after & (1 << LCD_PINS.rs.number()) != 0;
            let nibble = [LCD_PINS.d4, LCD_PINS.d5, LCD_PINS.d6, LCD_PINS.d7]
                .iter()
                .enumerate()
                .fold(0, |acc, (i, pin)| {
                    acc | (((after >> pin.number()) & 1) << i)
                });
            self.transfers.borrow_mut().push((rs, nibble));
        }
    }
}

impl RegisterBlock for SimulatedSfr {
    fn read(&self, register: Register) -> u8 {
        self.regs.read(register)
    }

    fn write(&self, register: Register, value: u8) {
        match register {
            Register::AdCon0 if value & (1 << bits::GO) != 0 => {
                let done = self.convert(value);
                self.regs.write(register, done);
            }
            Register::PortC => {
                let before = self.regs.read(register);
                self.regs.write(register, value);
                self.latch(before, value);
            }
            _ => self.regs.write(register, value),
        }
    }
}

/// Reassembles latched nibble pairs into (RS, byte) transfers
pub fn bytes(transfers: &[(bool, u8)]) -> Vec<(bool, u8)> {
    transfers
        .chunks(2)
        .map(|pair| (pair[0].0, (pair[0].1 << 4) | pair[1].1))
        .collect()
}

// ============================================================================
// Test Helper Functions
// ============================================================================

pub type Machine<'a> = VendingMachine<'a, TickInstant, TickClock, MockIo, MockDisplay>;
pub type Handler<'a> = InputHandler<'a, &'a MockAdc, MockIo>;

/// Builds both halves of a machine over mock peripherals
pub fn parts<'a>(
    shared: &'a SharedState,
    clock: &'a TickClock,
    adc: &'a MockAdc,
) -> (Machine<'a>, Handler<'a>) {
    let (foreground, isr) = shared.split().expect("state already split");
    let machine = VendingMachine::new(MockIo::new(), MockDisplay::new(), foreground, clock);
    let handler = InputHandler::new(isr, clock, adc, MockIo::new());
    (machine, handler)
}

/// Presses a button as the interrupt handler would see it
pub fn press(handler: &mut Handler<'_>, button: Button) {
    handler.handle(Interrupt::Button(button));
}

/// Delivers `count` clock ticks without servicing the foreground
pub fn tick(handler: &mut Handler<'_>, count: u32) {
    for _ in 0..count {
        handler.handle(Interrupt::TimerOverflow);
    }
}

/// Alternates ticks and foreground passes until the machine leaves `state`.
/// Returns the number of ticks it took.
pub fn run_while(
    machine: &mut Machine<'_>,
    handler: &mut Handler<'_>,
    state: State,
    max_ticks: u32,
) -> u32 {
    let mut ticks = 0;
    while machine.snapshot().state == state {
        assert!(ticks < max_ticks, "still in {:?} after {} ticks", state, ticks);
        handler.handle(Interrupt::TimerOverflow);
        ticks += 1;
        machine.service();
    }
    ticks
}

/// Services the foreground until it reports a timed phase
pub fn service_until_delay(machine: &mut Machine<'_>) -> Millis {
    for _ in 0..10 {
        if let ServiceTiming::Delay(wait) = machine.service() {
            return wait;
        }
    }
    panic!("machine never entered a timed phase");
}
