//! GPIO signal head adapter.
//!
//! Drives two three-lamp heads (six pins) through `embedded-hal`
//! [`OutputPin`].  On every change the lamps going dark are switched off
//! on both heads before any lamp is switched on, so no instant shows two
//! colours on one head or a proceed colour on both.

use embedded_hal::digital::{Error as _, OutputPin};
use log::error;

use crate::app::ports::SignalHeadPort;
use crate::signal::Color;

/// The three lamp pins of one head.
pub struct HeadPins<P> {
    pub red: P,
    pub amber: P,
    pub green: P,
}

impl<P: OutputPin> HeadPins<P> {
    fn pin(&mut self, color: Color) -> &mut P {
        match color {
            Color::Red => &mut self.red,
            Color::Amber => &mut self.amber,
            Color::Green => &mut self.green,
        }
    }
}

pub struct GpioSignalHeads<P> {
    heads: [HeadPins<P>; 2],
    /// Lamp currently lit per head; `None` while dark or unknown.
    lit: [Option<Color>; 2],
    pin_errors: u32,
}

impl<P: OutputPin> GpioSignalHeads<P> {
    /// Take the pins, switch everything off, then show Red on both heads.
    pub fn new(head1: HeadPins<P>, head2: HeadPins<P>) -> Self {
        let mut heads = Self {
            heads: [head1, head2],
            lit: [None, None],
            pin_errors: 0,
        };
        for head in 0..2 {
            for color in [Color::Red, Color::Amber, Color::Green] {
                heads.drive(head, color, false);
            }
        }
        heads.all_red();
        heads
    }

    /// Lamps currently lit, per head.
    pub fn lit(&self) -> [Option<Color>; 2] {
        self.lit
    }

    /// Pin writes that failed since construction.
    pub fn pin_errors(&self) -> u32 {
        self.pin_errors
    }

    fn drive(&mut self, head: usize, color: Color, on: bool) -> bool {
        let pin = self.heads[head].pin(color);
        let result = if on { pin.set_high() } else { pin.set_low() };
        match result {
            Ok(()) => true,
            Err(e) => {
                self.pin_errors = self.pin_errors.saturating_add(1);
                error!("Head {} {} lamp write failed: {:?}", head + 1, color, e.kind());
                false
            }
        }
    }
}

/// Pin that only remembers its level, for running without hardware.
#[derive(Debug, Default)]
pub struct SimPin {
    high: bool,
}

impl SimPin {
    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl embedded_hal::digital::ErrorType for SimPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}

impl HeadPins<SimPin> {
    pub fn simulated() -> Self {
        Self {
            red: SimPin::default(),
            amber: SimPin::default(),
            green: SimPin::default(),
        }
    }
}

impl<P: OutputPin> SignalHeadPort for GpioSignalHeads<P> {
    fn set_heads(&mut self, light1: Color, light2: Color) {
        let wanted = [light1, light2];

        // Off first, on both heads.
        for head in 0..2 {
            match self.lit[head] {
                Some(old) if old == wanted[head] => {}
                Some(old) => {
                    self.drive(head, old, false);
                    self.lit[head] = None;
                }
                None => {}
            }
        }

        for head in 0..2 {
            if self.lit[head].is_none() && self.drive(head, wanted[head], true) {
                self.lit[head] = Some(wanted[head]);
            }
        }
    }
}
