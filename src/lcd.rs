//! HD44780-compatible character display driver in 4-bit mode.
//!
//! The display's six control and data lines sit on one port. Every transfer
//! is a nibble presented on D4-D7 and latched by a pulse on EN; RS selects
//! between the command and data registers. Timing is delegated to an
//! [`embedded_hal::delay::DelayNs`] implementation.

use embedded_hal::delay::DelayNs;

use crate::dio::{Pin, Port};
use crate::registers::{Register, RegisterBlock};

/// Display commands.
pub mod command {
    pub const CLEAR: u8 = 0x01;
    pub const ENTRY_DECREMENT: u8 = 0x04;
    pub const ENTRY_INCREMENT: u8 = 0x06;
    pub const DISPLAY_OFF: u8 = 0x08;
    /// Display on, cursor off.
    pub const DISPLAY_ON: u8 = 0x0C;
    pub const SHIFT_LEFT: u8 = 0x18;
    pub const SHIFT_RIGHT: u8 = 0x1C;
    /// 4-bit interface, two lines, 5x8 font.
    pub const FUNCTION_SET_4BIT_2LINE: u8 = 0x28;
}

/// DDRAM address of the first column of each row.
const ROW_BASES: [u8; 4] = [0x80, 0xC0, 0x94, 0xD4];

/// Character output as consumed by the vending machine.
pub trait CharacterDisplay {
    /// Moves the cursor. Rows past the display's last row are ignored.
    fn set_cursor(&mut self, row: u8, column: u8);

    /// Writes one character at the cursor and advances it.
    fn put_char(&mut self, byte: u8);

    /// Writes a string at the cursor.
    fn put_str(&mut self, text: &str) {
        for byte in text.bytes() {
            self.put_char(byte);
        }
    }

    /// Blanks the display and homes the cursor.
    fn clear(&mut self);

    fn display_on(&mut self);

    fn display_off(&mut self);
}

impl<T: CharacterDisplay + ?Sized> CharacterDisplay for &mut T {
    fn set_cursor(&mut self, row: u8, column: u8) {
        (**self).set_cursor(row, column)
    }

    fn put_char(&mut self, byte: u8) {
        (**self).put_char(byte)
    }

    fn put_str(&mut self, text: &str) {
        (**self).put_str(text)
    }

    fn clear(&mut self) {
        (**self).clear()
    }

    fn display_on(&mut self) {
        (**self).display_on()
    }

    fn display_off(&mut self) {
        (**self).display_off()
    }
}

/// Wiring of the display to a single port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LcdPins {
    pub port: Port,
    pub rs: Pin,
    pub en: Pin,
    pub d4: Pin,
    pub d5: Pin,
    pub d6: Pin,
    pub d7: Pin,
}

impl LcdPins {
    /// Checks that every line has its own pin.
    pub fn validate(&self) -> Result<(), LcdPinsError> {
        let lines = self.lines();
        for (i, pin) in lines.iter().enumerate() {
            if lines[i + 1..].contains(pin) {
                return Err(LcdPinsError::Overlapping { pin: *pin });
            }
        }
        Ok(())
    }

    fn lines(&self) -> [Pin; 6] {
        [self.rs, self.en, self.d4, self.d5, self.d6, self.d7]
    }

    fn data_lines(&self) -> [Pin; 4] {
        [self.d4, self.d5, self.d6, self.d7]
    }
}

/// Invalid display wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LcdPinsError {
    /// Two display lines were assigned the same pin.
    Overlapping { pin: Pin },
}

impl core::fmt::Display for LcdPinsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LcdPinsError::Overlapping { pin } => {
                write!(f, "pin {} is assigned to more than one display line", pin.number())
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LcdPinsError {}

/// Register-level HD44780 driver.
pub struct Lcd<R: RegisterBlock, D: DelayNs> {
    regs: R,
    pins: LcdPins,
    delay: D,
}

impl<R: RegisterBlock, D: DelayNs> Lcd<R, D> {
    /// Creates a driver for validated wiring. Call [`Lcd::init`] before use.
    pub fn new(regs: R, pins: LcdPins, delay: D) -> Result<Self, LcdPinsError> {
        pins.validate()?;
        Ok(Self { regs, pins, delay })
    }

    /// Runs the 4-bit power-on initialisation sequence and turns the display on.
    pub fn init(&mut self) {
        let tris = match self.pins.port {
            Port::A => Register::TrisA,
            Port::B => Register::TrisB,
            Port::C => Register::TrisC,
        };
        for pin in self.pins.lines() {
            self.regs.clear_bit(tris, pin.number());
        }

        self.delay.delay_ms(20);

        // Reset sequence forcing the controller into a known 8-bit state
        // before dropping to 4-bit.
        self.write_nibble(0x03);
        self.delay.delay_ms(5);
        self.write_nibble(0x03);
        self.delay.delay_ms(16);
        self.write_nibble(0x03);
        self.write_nibble(0x02);

        self.command(command::FUNCTION_SET_4BIT_2LINE);
        self.command(command::ENTRY_INCREMENT);
        self.command(command::DISPLAY_ON);
    }

    /// Sends a raw command byte as two nibbles.
    pub fn command(&mut self, byte: u8) {
        self.write_nibble(byte >> 4);
        self.write_nibble(byte & 0x0F);
    }

    pub fn shift_left(&mut self) {
        self.command(command::SHIFT_LEFT);
    }

    pub fn shift_right(&mut self) {
        self.command(command::SHIFT_RIGHT);
    }

    /// Moves the cursor left after each character.
    pub fn cursor_decrement(&mut self) {
        self.command(command::ENTRY_DECREMENT);
    }

    /// Moves the cursor right after each character, the power-on setting.
    pub fn cursor_increment(&mut self) {
        self.command(command::ENTRY_INCREMENT);
    }

    /// Releases the register handle and delay provider.
    pub fn free(self) -> (R, D) {
        (self.regs, self.delay)
    }

    fn data_register(&self) -> Register {
        match self.pins.port {
            Port::A => Register::PortA,
            Port::B => Register::PortB,
            Port::C => Register::PortC,
        }
    }

    fn set_line(&self, pin: Pin, high: bool) {
        let data = self.data_register();
        if high {
            self.regs.set_bit(data, pin.number());
        } else {
            self.regs.clear_bit(data, pin.number());
        }
    }

    fn present_nibble(&self, nibble: u8) {
        for (i, pin) in self.pins.data_lines().into_iter().enumerate() {
            self.set_line(pin, nibble & (1 << i) != 0);
        }
    }

    /// Command-register nibble with the long enable pulse.
    fn write_nibble(&mut self, nibble: u8) {
        self.set_line(self.pins.rs, false);
        self.present_nibble(nibble);

        self.set_line(self.pins.en, true);
        self.delay.delay_ms(4);
        self.set_line(self.pins.en, false);
    }

    /// Data-register nibble with the short enable pulse.
    fn write_data_nibble(&mut self, nibble: u8) {
        self.present_nibble(nibble);

        self.set_line(self.pins.en, true);
        self.delay.delay_us(40);
        self.set_line(self.pins.en, false);
    }
}

impl<R: RegisterBlock, D: DelayNs> CharacterDisplay for Lcd<R, D> {
    fn set_cursor(&mut self, row: u8, column: u8) {
        if let Some(base) = ROW_BASES.get(row as usize) {
            self.command(base.wrapping_add(column));
        }
    }

    fn put_char(&mut self, byte: u8) {
        self.set_line(self.pins.rs, true);
        self.write_data_nibble(byte >> 4);
        self.write_data_nibble(byte & 0x0F);
    }

    fn clear(&mut self) {
        self.command(command::CLEAR);
    }

    fn display_on(&mut self) {
        self.command(command::DISPLAY_ON);
    }

    fn display_off(&mut self) {
        self.command(command::DISPLAY_OFF);
    }
}
