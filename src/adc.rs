//! Analog-to-digital converter driver.
//!
//! Single-sample, blocking conversions. Resolution and conversion clock are
//! fixed at construction from an [`AdcConfig`], normally the compile-time
//! [`crate::config::ADC`].

use crate::registers::{Register, RegisterBlock, bits};

/// Conversion result width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    /// 0..=255, upper eight bits of the result.
    EightBit,
    /// 0..=1023, right-justified.
    TenBit,
}

impl Resolution {
    /// Largest value a conversion can return.
    pub const fn max(self) -> u16 {
        match self {
            Resolution::EightBit => 0xFF,
            Resolution::TenBit => 0x3FF,
        }
    }

    /// Rescales a value expressed at 10-bit resolution to this resolution.
    pub const fn scale_from_ten_bit(self, value: u16) -> u16 {
        match self {
            Resolution::EightBit => value >> 2,
            Resolution::TenBit => value,
        }
    }
}

/// Conversion clock source (ADCS field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ConversionClock {
    FoscDiv2 = 0,
    FoscDiv8 = 1,
    FoscDiv32 = 2,
    /// Internal RC oscillator.
    Frc = 3,
}

/// Static converter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcConfig {
    pub resolution: Resolution,
    pub clock: ConversionClock,
}

/// Analog input channels available on the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Channel {
    An0 = 0,
    An1 = 1,
    An2 = 2,
    An3 = 3,
    An4 = 4,
    An8 = 8,
    An9 = 9,
    An10 = 10,
    An11 = 11,
    An12 = 12,
    An13 = 13,
}

impl Channel {
    /// Channel number as written to the CHS field.
    #[inline]
    pub const fn number(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Channel {
    type Error = InvalidChannel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Channel::An0),
            1 => Ok(Channel::An1),
            2 => Ok(Channel::An2),
            3 => Ok(Channel::An3),
            4 => Ok(Channel::An4),
            8 => Ok(Channel::An8),
            9 => Ok(Channel::An9),
            10 => Ok(Channel::An10),
            11 => Ok(Channel::An11),
            12 => Ok(Channel::An12),
            13 => Ok(Channel::An13),
            other => Err(InvalidChannel(other)),
        }
    }
}

/// The requested channel number has no analog input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidChannel(pub u8);

impl core::fmt::Display for InvalidChannel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "analog channel {} does not exist, valid channels are 0-4 and 8-13",
            self.0
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidChannel {}

/// Blocking analog input as consumed by the tilt check.
pub trait AnalogInput {
    /// Configures and enables the converter.
    fn init(&mut self);

    /// Converts one sample from `channel`, blocking until it is ready.
    fn read(&mut self, channel: Channel) -> u16;
}

/// Register-level ADC driver.
#[derive(Debug, Clone)]
pub struct Adc<R: RegisterBlock> {
    regs: R,
    config: AdcConfig,
}

impl<R: RegisterBlock> Adc<R> {
    pub fn new(regs: R, config: AdcConfig) -> Self {
        Self { regs, config }
    }

    /// Returns the configured resolution.
    pub fn resolution(&self) -> Resolution {
        self.config.resolution
    }

    fn enable_analog_function(&self, channel: Channel) {
        let n = channel.number();
        if n < 8 {
            self.regs.set_bit(Register::Ansel, n);
        } else {
            self.regs.set_bit(Register::AnselH, n - 8);
        }
    }
}

impl<R: RegisterBlock> AnalogInput for Adc<R> {
    fn init(&mut self) {
        let clock = self.config.clock as u8;
        self.regs.modify(Register::AdCon0, |v| {
            (v & !(0b11 << bits::ADCS_SHIFT)) | (clock << bits::ADCS_SHIFT)
        });

        // Internal Vref; ADFM selects right justification for 10-bit reads.
        let adcon1 = match self.config.resolution {
            Resolution::TenBit => 0x80,
            Resolution::EightBit => 0x00,
        };
        self.regs.write(Register::AdCon1, adcon1);

        self.regs.set_bit(Register::AdCon0, bits::ADON);
    }

    fn read(&mut self, channel: Channel) -> u16 {
        self.enable_analog_function(channel);

        let chs = channel.number() << bits::CHS_SHIFT;
        self.regs
            .modify(Register::AdCon0, |v| (v & !bits::CHS_MASK) | chs);

        self.regs.set_bit(Register::AdCon0, bits::GO);
        while self.regs.bit_is_set(Register::AdCon0, bits::GO) {
            core::hint::spin_loop();
        }

        let high = self.regs.read(Register::AdResH) as u16;
        match self.config.resolution {
            Resolution::TenBit => (high << 8) | self.regs.read(Register::AdResL) as u16,
            Resolution::EightBit => high,
        }
    }
}
