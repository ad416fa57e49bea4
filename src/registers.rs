//! Special function register access for the peripheral drivers.
//!
//! The drivers in this crate never touch memory directly. They go through
//! [`RegisterBlock`], which a board crate implements with volatile accesses to
//! the device's SFR addresses. [`RegisterFile`] is an in-memory implementation
//! with the device's power-on reset values, used for host-side testing and
//! simulation.

use core::cell::Cell;

/// The special function registers used by the drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    PortA,
    PortB,
    PortC,
    TrisA,
    TrisB,
    TrisC,
    Ansel,
    AnselH,
    Iocb,
    Intcon,
    Pir1,
    Pie1,
    T2Con,
    Pr2,
    Tmr2,
    AdCon0,
    AdCon1,
    AdResH,
    AdResL,
}

impl Register {
    /// Number of registers in the map.
    pub const COUNT: usize = 19;

    const fn index(self) -> usize {
        self as usize
    }

    /// Value the register holds after a power-on reset.
    pub const fn reset_value(self) -> u8 {
        match self {
            Register::TrisA | Register::TrisB | Register::TrisC => 0xFF,
            Register::Ansel => 0xFF,
            Register::AnselH => 0x3F,
            Register::Pr2 => 0xFF,
            _ => 0x00,
        }
    }
}

/// Bit positions within the control registers.
pub mod bits {
    /// INTCON: global interrupt enable.
    pub const GIE: u8 = 7;
    /// INTCON: peripheral interrupt enable.
    pub const PEIE: u8 = 6;
    /// INTCON: port-B change interrupt enable.
    pub const RBIE: u8 = 3;
    /// INTCON: port-B change interrupt flag.
    pub const RBIF: u8 = 0;

    /// PIR1 / PIE1: Timer2 to PR2 match flag and enable.
    pub const TMR2IF: u8 = 1;
    pub const TMR2IE: u8 = 1;

    /// T2CON: Timer2 on.
    pub const TMR2ON: u8 = 2;
    /// T2CON: postscaler field shift (bits 6:3).
    pub const TOUTPS_SHIFT: u8 = 3;
    /// T2CON: prescaler field mask (bits 1:0).
    pub const T2CKPS_MASK: u8 = 0b0000_0011;

    /// ADCON0: conversion clock field shift (bits 7:6).
    pub const ADCS_SHIFT: u8 = 6;
    /// ADCON0: channel select field (bits 5:2).
    pub const CHS_SHIFT: u8 = 2;
    pub const CHS_MASK: u8 = 0b0011_1100;
    /// ADCON0: conversion in progress.
    pub const GO: u8 = 1;
    /// ADCON0: converter enabled.
    pub const ADON: u8 = 0;
}

/// Access to a bank of 8-bit special function registers.
///
/// Methods take `&self`: like memory-mapped hardware, the registers are
/// reachable from every handle, and implementations provide their own
/// interior mutability. The bit helpers are a read followed by a write;
/// drivers writing a register that both execution contexts touch run them
/// inside a critical section.
pub trait RegisterBlock {
    /// Reads the current value of a register.
    fn read(&self, register: Register) -> u8;

    /// Writes a new value to a register.
    fn write(&self, register: Register, value: u8);

    /// Read-modify-write of a register.
    #[inline]
    fn modify<F: FnOnce(u8) -> u8>(&self, register: Register, f: F) {
        let value = self.read(register);
        self.write(register, f(value));
    }

    #[inline]
    fn set_bit(&self, register: Register, bit: u8) {
        self.modify(register, |v| v | (1 << bit));
    }

    #[inline]
    fn clear_bit(&self, register: Register, bit: u8) {
        self.modify(register, |v| v & !(1 << bit));
    }

    #[inline]
    fn bit_is_set(&self, register: Register, bit: u8) -> bool {
        self.read(register) & (1 << bit) != 0
    }
}

impl<T: RegisterBlock + ?Sized> RegisterBlock for &T {
    #[inline]
    fn read(&self, register: Register) -> u8 {
        (**self).read(register)
    }

    #[inline]
    fn write(&self, register: Register, value: u8) {
        (**self).write(register, value)
    }
}

/// In-memory register bank initialised to the power-on reset values.
///
/// Writes are stored verbatim; no hardware side effects are simulated.
#[derive(Debug)]
pub struct RegisterFile {
    cells: [Cell<u8>; Register::COUNT],
}

impl RegisterFile {
    /// Creates a register file in its power-on reset state.
    pub fn new() -> Self {
        let file = Self {
            cells: [const { Cell::new(0) }; Register::COUNT],
        };
        file.reset();
        file
    }

    /// Restores every register to its power-on reset value.
    pub fn reset(&self) {
        for register in ALL_REGISTERS {
            self.cells[register.index()].set(register.reset_value());
        }
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBlock for RegisterFile {
    fn read(&self, register: Register) -> u8 {
        self.cells[register.index()].get()
    }

    fn write(&self, register: Register, value: u8) {
        self.cells[register.index()].set(value);
    }
}

const ALL_REGISTERS: [Register; Register::COUNT] = [
    Register::PortA,
    Register::PortB,
    Register::PortC,
    Register::TrisA,
    Register::TrisB,
    Register::TrisC,
    Register::Ansel,
    Register::AnselH,
    Register::Iocb,
    Register::Intcon,
    Register::Pir1,
    Register::Pie1,
    Register::T2Con,
    Register::Pr2,
    Register::Tmr2,
    Register::AdCon0,
    Register::AdCon1,
    Register::AdResH,
    Register::AdResL,
];
