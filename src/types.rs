//! Core types shared by both execution contexts.

/// Outstanding amount owed in coin units (one unit is 10p).
///
/// Negative once the customer has overpaid; the magnitude is then the change
/// owed.
pub type Balance = i8;

/// Phase of the vending cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Entry phase; the foreground resets the machine on seeing it.
    #[default]
    Initial,
    /// Browsing the drinks.
    DrinkSelection,
    /// Paying for the confirmed drink.
    CoinInsertion,
    /// Drink LED lit for the dispensing time.
    DrinkDispense,
    /// Collection message shown, then back to `Initial`.
    DrinkReady,
    /// Change LED lit and change count shown.
    DispenseChange,
    /// Reserved. Never entered; the tilt check only drives the buzzer.
    TiltSensing,
    /// Reserved. Never entered.
    Alarm,
}

/// The products on sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Drink {
    #[default]
    Cola,
    Lemonade,
    Orange,
    Water,
}

impl Drink {
    /// All drinks in browsing order.
    pub const ALL: [Drink; 4] = [Drink::Cola, Drink::Lemonade, Drink::Orange, Drink::Water];

    /// The drink shown after this one; wraps from the last to the first.
    pub fn next(self) -> Self {
        match self {
            Drink::Cola => Drink::Lemonade,
            Drink::Lemonade => Drink::Orange,
            Drink::Orange => Drink::Water,
            Drink::Water => Drink::Cola,
        }
    }

    /// Price in coin units.
    pub const fn price(self) -> Balance {
        match self {
            Drink::Cola => 8,
            Drink::Lemonade => 8,
            Drink::Orange => 6,
            Drink::Water => 5,
        }
    }

    /// Name and price as shown on the selection screen.
    pub const fn label(self) -> &'static str {
        match self {
            Drink::Cola => "Cola 80p",
            Drink::Lemonade => "Lemonade 80p",
            Drink::Orange => "Orange 60p",
            Drink::Water => "Water 50p",
        }
    }
}

/// The three push-buttons, in interrupt priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// Next drink while selecting, 1-unit coin while paying.
    A,
    /// Confirm while selecting, 2-unit coin while paying.
    B,
    /// 5-unit coin while paying.
    C,
}

impl Button {
    /// Priority order in which simultaneous presses are resolved.
    pub const PRIORITY: [Button; 3] = [Button::A, Button::B, Button::C];

    /// Coin this button inserts during payment.
    pub const fn coin(self) -> Coin {
        match self {
            Button::A => Coin::One,
            Button::B => Coin::Two,
            Button::C => Coin::Five,
        }
    }
}

/// Accepted coin denominations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Coin {
    One,
    Two,
    Five,
}

impl Coin {
    /// Value in coin units.
    pub const fn value(self) -> Balance {
        match self {
            Coin::One => 1,
            Coin::Two => 2,
            Coin::Five => 5,
        }
    }
}

/// Display glyph for a single-digit amount.
///
/// Amounts are shown as one digit followed by a literal `0` ("6" reads 60p).
/// Only 0-9 are representable; anything else lands on whatever character
/// follows `'9'` in the display's character set, as the price table keeps
/// every amount a customer can normally reach within range.
pub const fn digit_glyph(amount: u8) -> u8 {
    b'0'.wrapping_add(amount)
}
