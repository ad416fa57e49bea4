//! State shared between the foreground loop and the interrupt handler.
//!
//! The machine state, selected drink and outstanding balance are the only
//! channel between the two contexts. They live together in one
//! [`critical_section::Mutex`] so each context always sees a consistent
//! [`Snapshot`], and every update is a read-modify-write inside a single
//! critical section.
//!
//! Write ownership is enforced by the two handles returned from
//! [`SharedState::split`]:
//!
//! | Field   | [`Isr`] writes                     | [`Foreground`] writes                      |
//! |---------|------------------------------------|--------------------------------------------|
//! | state   | `DrinkSelection -> CoinInsertion`  | every phase completion                     |
//! | drink   | while `DrinkSelection`             | reset to the first drink on `Initial`      |
//! | balance | load on confirm, coins             | settle to zero in `DispenseChange`, reset  |
//!
//! Neither handle writes a field outside the phases listed, so the two
//! contexts never race on the same field within one phase.

use core::cell::Cell;

use critical_section::Mutex;

use crate::types::{Balance, Button, Drink, State};

/// The three shared variables as seen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Snapshot {
    pub state: State,
    pub drink: Drink,
    pub balance: Balance,
}

impl Snapshot {
    /// Values the machine holds on entering drink selection.
    pub const SELECTING: Snapshot = Snapshot {
        state: State::DrinkSelection,
        drink: Drink::Cola,
        balance: 0,
    };

    /// Effect of a button press in the current state.
    ///
    /// Combinations with no meaning in the current state (any press while
    /// dispensing, button C while selecting) leave the snapshot unchanged.
    pub fn apply(self, button: Button) -> Snapshot {
        match (self.state, button) {
            (State::DrinkSelection, Button::A) => Snapshot {
                drink: self.drink.next(),
                ..self
            },
            (State::DrinkSelection, Button::B) => Snapshot {
                state: State::CoinInsertion,
                balance: self.drink.price(),
                ..self
            },
            (State::CoinInsertion, _) => Snapshot {
                balance: self.balance.saturating_sub(button.coin().value()),
                ..self
            },
            _ => self,
        }
    }

    /// Moves to dispensing once the drink is paid for.
    pub fn paid(self) -> Snapshot {
        match self.state {
            State::CoinInsertion if self.balance <= 0 => Snapshot {
                state: State::DrinkDispense,
                ..self
            },
            _ => self,
        }
    }

    /// Leaves dispensing: straight to collection when paid exactly, otherwise
    /// to change return.
    pub fn dispensed(self) -> Snapshot {
        match self.state {
            State::DrinkDispense if self.balance == 0 => Snapshot {
                state: State::DrinkReady,
                ..self
            },
            State::DrinkDispense => Snapshot {
                state: State::DispenseChange,
                ..self
            },
            _ => self,
        }
    }

    /// Change units owed, counted while driving the balance to zero.
    ///
    /// A balance that is already zero or positive owes nothing and is left
    /// as it is.
    pub fn settle(self) -> (Snapshot, u8) {
        if self.balance < 0 {
            (Snapshot { balance: 0, ..self }, self.balance.unsigned_abs())
        } else {
            (self, 0)
        }
    }
}

/// Owner of the shared variables.
///
/// Place it in a `static` so the interrupt handler can reach it, then call
/// [`SharedState::split`] once during start-up.
pub struct SharedState {
    inner: Mutex<Cell<Snapshot>>,
    taken: Mutex<Cell<bool>>,
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(Snapshot {
                state: State::Initial,
                drink: Drink::Cola,
                balance: 0,
            })),
            taken: Mutex::new(Cell::new(false)),
        }
    }

    /// Hands out the foreground and interrupt handles. Returns `None` after
    /// the first call.
    pub fn split(&self) -> Option<(Foreground<'_>, Isr<'_>)> {
        let first = critical_section::with(|cs| !self.taken.borrow(cs).replace(true));
        first.then(|| (Foreground { shared: self }, Isr { shared: self }))
    }

    /// Reads all three variables at once.
    pub fn snapshot(&self) -> Snapshot {
        critical_section::with(|cs| self.inner.borrow(cs).get())
    }

    /// Puts the machine in an arbitrary state, bypassing the transitions.
    #[cfg(test)]
    pub(crate) fn force(&self, snapshot: Snapshot) {
        self.update(|_| snapshot);
    }

    /// Atomically replaces the snapshot with `f(snapshot)`, returning the new
    /// value.
    fn update<F: FnOnce(Snapshot) -> Snapshot>(&self, f: F) -> Snapshot {
        critical_section::with(|cs| {
            let cell = self.inner.borrow(cs);
            let next = f(cell.get());
            cell.set(next);
            next
        })
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

/// Foreground loop's view of the shared state.
pub struct Foreground<'a> {
    shared: &'a SharedState,
}

impl Foreground<'_> {
    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshot()
    }

    /// Enters drink selection with the first drink and no balance.
    pub fn reset(&self) -> Snapshot {
        self.shared.update(|_| Snapshot::SELECTING)
    }

    /// Moves to dispensing if the balance is settled. Returns the new snapshot.
    pub fn finish_payment(&self) -> Snapshot {
        self.shared.update(Snapshot::paid)
    }

    /// Ends dispensing. Returns the new snapshot.
    pub fn finish_dispense(&self) -> Snapshot {
        self.shared.update(Snapshot::dispensed)
    }

    /// Drives the balance to zero and returns the change units owed.
    pub fn settle_change(&self) -> u8 {
        critical_section::with(|cs| {
            let cell = self.shared.inner.borrow(cs);
            let (next, change) = cell.get().settle();
            cell.set(next);
            change
        })
    }

    /// Ends change return.
    pub fn finish_change(&self) -> Snapshot {
        self.shared.update(|s| match s.state {
            State::DispenseChange => Snapshot {
                state: State::DrinkReady,
                ..s
            },
            _ => s,
        })
    }

    /// Ends the cycle; the next foreground pass resets the machine.
    pub fn finish_collection(&self) -> Snapshot {
        self.shared.update(|s| match s.state {
            State::DrinkReady => Snapshot {
                state: State::Initial,
                ..s
            },
            _ => s,
        })
    }
}

/// Interrupt handler's view of the shared state.
pub struct Isr<'a> {
    shared: &'a SharedState,
}

impl Isr<'_> {
    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshot()
    }

    /// Applies a button press against the state current at this instant.
    pub fn press(&self, button: Button) -> Snapshot {
        self.shared.update(|s| s.apply(button))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paying(balance: Balance) -> Snapshot {
        Snapshot {
            state: State::CoinInsertion,
            drink: Drink::Orange,
            balance,
        }
    }

    #[test]
    fn split_hands_out_handles_once() {
        let shared = SharedState::new();
        assert!(shared.split().is_some());
        assert!(shared.split().is_none());
    }

    #[test]
    fn confirm_loads_price_of_current_drink() {
        let s = Snapshot::SELECTING.apply(Button::A).apply(Button::A);
        assert_eq!(s.drink, Drink::Orange);

        let s = s.apply(Button::B);
        assert_eq!(s.state, State::CoinInsertion);
        assert_eq!(s.balance, 6);
    }

    #[test]
    fn button_c_does_nothing_while_selecting() {
        assert_eq!(Snapshot::SELECTING.apply(Button::C), Snapshot::SELECTING);
    }

    #[test]
    fn buttons_are_ignored_outside_selection_and_payment() {
        for state in [
            State::Initial,
            State::DrinkDispense,
            State::DrinkReady,
            State::DispenseChange,
            State::TiltSensing,
            State::Alarm,
        ] {
            let s = Snapshot {
                state,
                drink: Drink::Water,
                balance: -3,
            };
            for button in Button::PRIORITY {
                assert_eq!(s.apply(button), s);
            }
        }
    }

    #[test]
    fn coins_subtract_their_value() {
        assert_eq!(paying(6).apply(Button::A).balance, 5);
        assert_eq!(paying(6).apply(Button::B).balance, 4);
        assert_eq!(paying(6).apply(Button::C).balance, 1);
        // Drink selection is frozen once paying.
        assert_eq!(paying(6).apply(Button::A).drink, Drink::Orange);
    }

    #[test]
    fn balance_saturates_instead_of_wrapping() {
        assert_eq!(paying(i8::MIN + 1).apply(Button::C).balance, i8::MIN);
    }

    #[test]
    fn payment_completes_at_zero_or_below() {
        assert_eq!(paying(1).paid().state, State::CoinInsertion);
        assert_eq!(paying(0).paid().state, State::DrinkDispense);
        assert_eq!(paying(-4).paid().state, State::DrinkDispense);
    }

    #[test]
    fn dispensed_branches_on_change() {
        let exact = Snapshot {
            state: State::DrinkDispense,
            ..paying(0)
        };
        let over = Snapshot {
            state: State::DrinkDispense,
            ..paying(-2)
        };
        assert_eq!(exact.dispensed().state, State::DrinkReady);
        assert_eq!(over.dispensed().state, State::DispenseChange);
    }

    #[test]
    fn settle_counts_every_unit_and_stops_at_zero() {
        for balance in -20..=0 {
            let (after, change) = paying(balance).settle();
            assert_eq!(after.balance, 0);
            assert_eq!(change as i16, -(balance as i16));
        }
        let (after, change) = paying(0).settle();
        assert_eq!((after.balance, change), (0, 0));
    }

    #[test]
    fn foreground_settles_once() {
        let shared = SharedState::new();
        let (fg, isr) = shared.split().unwrap();
        fg.reset();
        isr.press(Button::B);
        isr.press(Button::C);
        isr.press(Button::C);
        assert_eq!(fg.snapshot().balance, -2);

        assert_eq!(fg.settle_change(), 2);
        assert_eq!(fg.settle_change(), 0);
        assert_eq!(fg.snapshot().balance, 0);
    }

    #[test]
    fn foreground_phase_ends_only_apply_in_their_phase() {
        let shared = SharedState::new();
        let (fg, _isr) = shared.split().unwrap();
        fg.reset();
        assert_eq!(fg.finish_change().state, State::DrinkSelection);
        assert_eq!(fg.finish_collection().state, State::DrinkSelection);
        assert_eq!(fg.finish_dispense().state, State::DrinkSelection);
        assert_eq!(fg.finish_payment().state, State::DrinkSelection);
    }
}
