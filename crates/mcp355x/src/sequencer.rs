//! The CE handshake that triggers one conversion and reads it back.
//!
//! ```text
//!            tCSHSD   tCONV/2   tCONV/2       3 bytes
//! CE   ‾‾‾‾‾‾‾‾‾‾‾‾‾‾|_______|‾‾‾‾‾‾‾‾‾‾‾‾‾‾|_________|‾‾‾
//! SPI  closed .................................| open ....
//! ```
//!
//! The chip tells the end of a conversion by the CE pattern alone, so every
//! wait must run in full and in this order. Shortening any phase returns stale
//! or garbage data with no error.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;
use tracing::trace;

use crate::error::Error;
use crate::peripheral::{Peripheral, PinFunction, SpiConfig};

/// CE high to shutdown, in microseconds (10 us typical).
pub const T_CSHSD_US: u32 = 20;

/// Bytes in the output register.
pub const REGISTER_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    /// SPI closed, CE and MISO are GPIO, CE high.
    ShutDown,
    /// CE pulled low, conversion running.
    Triggering,
    /// CE back high for the second half of the conversion.
    Converting,
    /// SPI reopened.
    BusRestoring,
    /// Register clocked out.
    Reading,
}

/// Runs one conversion on the chip selected by `ce`.
pub struct Sequencer<'a, P: Peripheral, D> {
    peripheral: &'a mut P,
    delay: &'a mut D,
    config: &'a SpiConfig,
    ce: P::Pin,
    conversion_time_us: u32,
    state: State,
    buffer: [u8; REGISTER_LEN],
    raw: Option<u32>,
}

impl<'a, P, D> Sequencer<'a, P, D>
where
    P: Peripheral,
    D: DelayNs,
{
    pub fn new(
        peripheral: &'a mut P,
        delay: &'a mut D,
        config: &'a SpiConfig,
        ce: P::Pin,
        conversion_time_us: u32,
    ) -> Self {
        Self {
            peripheral,
            delay,
            config,
            ce,
            conversion_time_us,
            state: State::Idle,
            buffer: [0; REGISTER_LEN],
            raw: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The assembled register, once the sequence has come back to idle.
    pub fn raw(&self) -> Option<u32> {
        self.raw
    }

    /// Runs the whole handshake and returns the 24-bit register value.
    pub fn run(mut self) -> Result<u32, Error<P::Error>> {
        loop {
            self.step()?;
            if let Some(raw) = self.raw {
                return Ok(raw);
            }
        }
    }

    /// Performs the transition out of the current state and returns the new one.
    pub fn step(&mut self) -> Result<State, Error<P::Error>> {
        let next = match self.state {
            State::Idle => {
                self.raw = None;
                self.peripheral.spi_end().map_err(Error::Bus)?;

                let miso = self.peripheral.miso();
                self.set_function(self.ce, PinFunction::Output)?;
                self.set_function(miso, PinFunction::Input)?;
                self.write_ce(PinState::High)?;
                State::ShutDown
            }
            State::ShutDown => {
                self.delay.delay_us(T_CSHSD_US);
                self.write_ce(PinState::Low)?;
                State::Triggering
            }
            State::Triggering => {
                self.delay.delay_us(self.conversion_time_us / 2);
                self.write_ce(PinState::High)?;
                State::Converting
            }
            State::Converting => {
                // Second half rounds up so odd conversion times still elapse in full.
                self.delay
                    .delay_us(self.conversion_time_us - self.conversion_time_us / 2);
                self.peripheral
                    .spi_begin(self.config)
                    .map_err(Error::Bus)?;
                State::BusRestoring
            }
            State::BusRestoring => {
                self.buffer = [0; REGISTER_LEN];
                self.set_function(self.ce, PinFunction::Output)?;
                self.write_ce(PinState::Low)?;
                let transferred = self.peripheral.transfer_in_place(&mut self.buffer);
                // Deselect even when the transfer failed.
                self.write_ce(PinState::High)?;
                transferred.map_err(Error::Transfer)?;
                State::Reading
            }
            State::Reading => {
                let [high, mid, low] = self.buffer;
                self.raw = Some(u32::from_be_bytes([0, high, mid, low]));
                State::Idle
            }
        };

        trace!(from = ?self.state, to = ?next, "conversion step");
        self.state = next;
        Ok(next)
    }

    fn set_function(&mut self, pin: P::Pin, function: PinFunction) -> Result<(), Error<P::Error>> {
        self.peripheral
            .set_function(pin, function)
            .map_err(Error::Pin)
    }

    fn write_ce(&mut self, state: PinState) -> Result<(), Error<P::Error>> {
        self.peripheral.write(self.ce, state).map_err(Error::Pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Begin,
        End,
        Function(u8, PinFunction),
        Write(u8, PinState),
        Transfer(usize),
        Delay(u32),
    }

    struct MockPeripheral<'a> {
        log: &'a RefCell<Vec<Op>>,
        reply: [u8; 3],
        fail_transfer: bool,
    }

    impl Peripheral for MockPeripheral<'_> {
        type Pin = u8;
        type Error = &'static str;

        fn miso(&self) -> u8 {
            9
        }

        fn spi_begin(&mut self, config: &SpiConfig) -> Result<(), Self::Error> {
            assert_eq!(*config, SpiConfig::MCP355X);
            self.log.borrow_mut().push(Op::Begin);
            Ok(())
        }

        fn spi_end(&mut self) -> Result<(), Self::Error> {
            self.log.borrow_mut().push(Op::End);
            Ok(())
        }

        fn set_function(&mut self, pin: u8, function: PinFunction) -> Result<(), Self::Error> {
            self.log.borrow_mut().push(Op::Function(pin, function));
            Ok(())
        }

        fn write(&mut self, pin: u8, state: PinState) -> Result<(), Self::Error> {
            self.log.borrow_mut().push(Op::Write(pin, state));
            Ok(())
        }

        fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
            self.log.borrow_mut().push(Op::Transfer(words.len()));
            if self.fail_transfer {
                return Err("transfer");
            }
            words.copy_from_slice(&self.reply);
            Ok(())
        }
    }

    struct MockDelay<'a> {
        log: &'a RefCell<Vec<Op>>,
    }

    impl DelayNs for MockDelay<'_> {
        fn delay_ns(&mut self, ns: u32) {
            self.log.borrow_mut().push(Op::Delay(ns / 1_000));
        }

        fn delay_us(&mut self, us: u32) {
            self.log.borrow_mut().push(Op::Delay(us));
        }
    }

    #[test]
    fn handshake_order() {
        let log = RefCell::new(Vec::new());
        let mut peripheral = MockPeripheral {
            log: &log,
            reply: [0x12, 0x34, 0x56],
            fail_transfer: false,
        };
        let mut delay = MockDelay { log: &log };
        let config = SpiConfig::MCP355X;

        let raw = Sequencer::new(&mut peripheral, &mut delay, &config, 7, 19_455)
            .run()
            .unwrap();

        assert_eq!(raw, 0x123456);
        assert_eq!(
            *log.borrow(),
            [
                Op::End,
                Op::Function(7, PinFunction::Output),
                Op::Function(9, PinFunction::Input),
                Op::Write(7, PinState::High),
                Op::Delay(T_CSHSD_US),
                Op::Write(7, PinState::Low),
                Op::Delay(9_727),
                Op::Write(7, PinState::High),
                Op::Delay(9_728),
                Op::Begin,
                Op::Function(7, PinFunction::Output),
                Op::Write(7, PinState::Low),
                Op::Transfer(3),
                Op::Write(7, PinState::High),
            ]
        );
    }

    #[test]
    fn steps_through_every_state() {
        let log = RefCell::new(Vec::new());
        let mut peripheral = MockPeripheral {
            log: &log,
            reply: [0x80, 0x00, 0x01],
            fail_transfer: false,
        };
        let mut delay = MockDelay { log: &log };
        let config = SpiConfig::MCP355X;
        let mut sequencer = Sequencer::new(&mut peripheral, &mut delay, &config, 22, 75_000);

        assert_eq!(sequencer.state(), State::Idle);
        let mut states = Vec::new();
        for _ in 0..6 {
            let state = sequencer.step().unwrap();
            assert_eq!(sequencer.state(), state);
            states.push(state);
        }

        assert_eq!(
            states,
            [
                State::ShutDown,
                State::Triggering,
                State::Converting,
                State::BusRestoring,
                State::Reading,
                State::Idle,
            ]
        );
        assert_eq!(sequencer.raw(), Some(0x800001));
    }

    #[test]
    fn transfer_failure_deselects_and_stops_the_sequence() {
        let log = RefCell::new(Vec::new());
        let mut peripheral = MockPeripheral {
            log: &log,
            reply: [0; 3],
            fail_transfer: true,
        };
        let mut delay = MockDelay { log: &log };
        let config = SpiConfig::MCP355X;

        let result = Sequencer::new(&mut peripheral, &mut delay, &config, 7, 100).run();

        assert_eq!(result, Err(Error::Transfer("transfer")));
        let log = log.borrow();
        assert_eq!(log[log.len() - 2..], [Op::Transfer(3), Op::Write(7, PinState::High)]);
    }
}
