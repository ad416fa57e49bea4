//! Interrupt source classification and the periodic tick timer.
//!
//! The device has a single interrupt vector. On entry the handler asks
//! [`InterruptController::pending`] which source fired, services it, then
//! clears the flag with [`InterruptController::acknowledge`]. One source is
//! serviced per entry; a still-pending flag re-enters the vector.

use crate::config::{
    BUTTON_A, BUTTON_B, BUTTON_C, TIMER2_PERIOD, TIMER2_POSTSCALER, TIMER2_PRESCALER,
};
use crate::dio::Pin;
use crate::registers::{Register, RegisterBlock, bits};
use crate::types::Button;

/// Cause of an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interrupt {
    /// Port-B change with a button held low.
    Button(Button),
    /// Port-B change with no button low (a release).
    PinChange,
    /// Timer2 period match: one clock tick.
    TimerOverflow,
}

/// Pin a button is wired to on the button port.
pub const fn button_pin(button: Button) -> Pin {
    match button {
        Button::A => BUTTON_A,
        Button::B => BUTTON_B,
        Button::C => BUTTON_C,
    }
}

/// Register-level access to the interrupt flags and Timer2.
#[derive(Debug, Clone)]
pub struct InterruptController<R: RegisterBlock> {
    regs: R,
}

impl<R: RegisterBlock> InterruptController<R> {
    pub fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Programs Timer2 as the tick source and enables its interrupt.
    pub fn configure_tick_timer(&self) {
        self.regs.clear_bit(Register::T2Con, bits::TMR2ON);
        self.regs.write(
            Register::T2Con,
            (TIMER2_POSTSCALER << bits::TOUTPS_SHIFT) | (TIMER2_PRESCALER & bits::T2CKPS_MASK),
        );
        self.regs.set_bit(Register::Pie1, bits::TMR2IE);
        self.regs.clear_bit(Register::Pir1, bits::TMR2IF);
        self.regs.write(Register::Pr2, TIMER2_PERIOD);
        self.regs.set_bit(Register::T2Con, bits::TMR2ON);
        self.regs.write(Register::Tmr2, 0);
    }

    /// Enables global and peripheral interrupts.
    pub fn enable(&self) {
        self.regs.set_bit(Register::Intcon, bits::GIE);
        self.regs.set_bit(Register::Intcon, bits::PEIE);
    }

    /// Classifies the pending interrupt, if any.
    ///
    /// A port change wins over a timer match. Buttons are active low and
    /// resolved in [`Button::PRIORITY`] order; only the first pressed one is
    /// reported.
    pub fn pending(&self) -> Option<Interrupt> {
        if self.regs.bit_is_set(Register::Intcon, bits::RBIF) {
            // Reading the port also ends the change-mismatch condition.
            let port = self.regs.read(Register::PortB);
            let pressed = Button::PRIORITY
                .into_iter()
                .find(|button| port & button_pin(*button).mask() == 0);
            return Some(pressed.map_or(Interrupt::PinChange, Interrupt::Button));
        }

        if self.regs.bit_is_set(Register::Pir1, bits::TMR2IF) {
            return Some(Interrupt::TimerOverflow);
        }

        None
    }

    /// Clears the flag that raised `irq`.
    pub fn acknowledge(&self, irq: Interrupt) {
        match irq {
            Interrupt::Button(_) | Interrupt::PinChange => {
                self.regs.clear_bit(Register::Intcon, bits::RBIF)
            }
            Interrupt::TimerOverflow => self.regs.clear_bit(Register::Pir1, bits::TMR2IF),
        }
    }
}
