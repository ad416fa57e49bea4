//! Digital I/O driver: pin direction, interrupt-on-change arming and output levels.

use crate::registers::{Register, RegisterBlock, bits};

/// An 8-bit I/O port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    A,
    B,
    C,
}

impl Port {
    fn data_register(self) -> Register {
        match self {
            Port::A => Register::PortA,
            Port::B => Register::PortB,
            Port::C => Register::PortC,
        }
    }

    fn direction_register(self) -> Register {
        match self {
            Port::A => Register::TrisA,
            Port::B => Register::TrisB,
            Port::C => Register::TrisC,
        }
    }
}

/// A pin number within a port (0-7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pin(u8);

impl Pin {
    pub const P0: Pin = Pin(0);
    pub const P1: Pin = Pin(1);
    pub const P2: Pin = Pin(2);
    pub const P3: Pin = Pin(3);
    pub const P4: Pin = Pin(4);
    pub const P5: Pin = Pin(5);
    pub const P6: Pin = Pin(6);
    pub const P7: Pin = Pin(7);

    /// Creates a pin from its number.
    pub const fn new(number: u8) -> Result<Self, InvalidPin> {
        if number < 8 {
            Ok(Pin(number))
        } else {
            Err(InvalidPin(number))
        }
    }

    /// Returns the pin number.
    #[inline]
    pub const fn number(self) -> u8 {
        self.0
    }

    #[inline]
    pub(crate) const fn mask(self) -> u8 {
        1 << self.0
    }

    /// ANSELH bit that shares the port-B pin with an analog channel.
    fn port_b_analog_bit(self) -> Option<u8> {
        match self.0 {
            0 => Some(4),
            1 => Some(2),
            2 => Some(0),
            3 => Some(1),
            4 => Some(3),
            5 => Some(5),
            _ => None,
        }
    }
}

/// A pin number outside 0-7 was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidPin(pub u8);

impl core::fmt::Display for InvalidPin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "pin {} does not exist, ports have pins 0-7", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidPin {}

/// How a pin is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    /// Push-pull output.
    Output,
    /// Digital input without pull-up.
    InputNoPull,
    /// Digital input raising the port-change interrupt. Port B only.
    InterruptOnChange,
}

/// Logic level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

/// Pin-level digital I/O as consumed by the vending machine.
///
/// Implementations cannot fail: unsupported port/mode combinations are
/// ignored.
pub trait DigitalIo {
    /// Configures the direction (and interrupt behaviour) of a pin.
    fn set_pin_mode(&mut self, port: Port, pin: Pin, mode: PinMode);

    /// Drives an output pin.
    fn set_pin_value(&mut self, port: Port, pin: Pin, level: Level);
}

impl<T: DigitalIo + ?Sized> DigitalIo for &mut T {
    fn set_pin_mode(&mut self, port: Port, pin: Pin, mode: PinMode) {
        (**self).set_pin_mode(port, pin, mode)
    }

    fn set_pin_value(&mut self, port: Port, pin: Pin, level: Level) {
        (**self).set_pin_value(port, pin, level)
    }
}

/// Register-level digital I/O driver.
#[derive(Debug, Clone)]
pub struct Dio<R: RegisterBlock> {
    regs: R,
}

impl<R: RegisterBlock> Dio<R> {
    pub fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Reads the level currently present on a pin.
    pub fn pin_level(&self, port: Port, pin: Pin) -> Level {
        Level::from(self.regs.read(port.data_register()) & pin.mask() != 0)
    }

    /// Releases the register handle.
    pub fn free(self) -> R {
        self.regs
    }

    fn set_direction(&self, port: Port, pin: Pin, output: bool) {
        let tris = port.direction_register();
        if output {
            self.regs.clear_bit(tris, pin.number());
        } else {
            self.regs.set_bit(tris, pin.number());
        }
    }

    /// Switches the pin's analog function off so it reads digitally.
    fn disable_analog(&self, port: Port, pin: Pin) {
        match port {
            Port::A => self.regs.clear_bit(Register::Ansel, pin.number()),
            Port::B => {
                if let Some(bit) = pin.port_b_analog_bit() {
                    self.regs.clear_bit(Register::AnselH, bit);
                }
            }
            Port::C => {}
        }
    }

    fn configure(&self, port: Port, pin: Pin, mode: PinMode) {
        self.disable_analog(port, pin);

        match (port, mode) {
            (_, PinMode::Output) => self.set_direction(port, pin, true),
            (_, PinMode::InputNoPull) => self.set_direction(port, pin, false),
            (Port::B, PinMode::InterruptOnChange) => {
                // Global interrupts are enabled separately.
                self.set_direction(port, pin, false);
                self.regs.set_bit(Register::Iocb, pin.number());
                self.regs.clear_bit(Register::Intcon, bits::RBIF);
                self.regs.set_bit(Register::Intcon, bits::RBIE);
            }
            (_, PinMode::InterruptOnChange) => {}
        }
    }
}

impl<R: RegisterBlock> DigitalIo for Dio<R> {
    fn set_pin_mode(&mut self, port: Port, pin: Pin, mode: PinMode) {
        critical_section::with(|_| self.configure(port, pin, mode));
    }

    fn set_pin_value(&mut self, port: Port, pin: Pin, level: Level) {
        let data = port.data_register();
        // The foreground and the interrupt handler share the output port; the
        // read-modify-write must not be split by the other context.
        critical_section::with(|_| match level {
            Level::Low => self.regs.clear_bit(data, pin.number()),
            Level::High => self.regs.set_bit(data, pin.number()),
        });
    }
}
