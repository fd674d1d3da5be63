//! Bit-banged driver for the MCP3208 8-channel 12-bit SAR ADC.
//!
//! A conversion is a fixed clocked exchange: chip select goes active, five
//! command bits are shifted out MSB first (start, single-ended, D2..D0), one
//! null bit is clocked in and dropped, then twelve result bits are sampled
//! MSB first. The exchange is described by [`Phase`] and driven over any
//! [`SerialBus`], so it runs the same on GPIO lines ([`PinBus`]) and on a
//! simulated device.

#![cfg_attr(not(test), no_std)]

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, ErrorKind, InputPin, OutputPin, PinState};

/// Number of single-ended input channels.
pub const CHANNEL_COUNT: u8 = 8;

/// Result width in bits.
pub const RESOLUTION_BITS: u8 = 12;

/// Largest code the converter can return.
pub const FULL_SCALE: u16 = (1 << RESOLUTION_BITS) - 1;

const COMMAND_BITS: u8 = 5;
const START_BIT: u8 = 0b1_0000;
const SINGLE_ENDED: u8 = 0b0_1000;

/// Default clock half period (1 µs, a 500 kHz clock).
pub const DEFAULT_HALF_PERIOD_NS: u32 = 1_000;

/// One conversion result, `0..=FULL_SCALE`.
pub type RawSample = u16;

/// Driver errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// Channel outside `0..CHANNEL_COUNT`. No bus activity took place.
    InvalidChannel(u8),
    /// A line of the bus could not be driven or sampled.
    BusUnavailable(E),
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidChannel(channel) => {
                write!(f, "invalid ADC channel {} (expected 0-7)", channel)
            }
            Error::BusUnavailable(e) => write!(f, "ADC bus unavailable: {:?}", e),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Error<E> {}

/// The four lines a transfer needs.
///
/// `set_select(true)` makes the chip select line active (electrically low).
pub trait SerialBus {
    type Error: fmt::Debug;

    fn set_select(&mut self, active: bool) -> Result<(), Self::Error>;
    fn set_clock(&mut self, high: bool) -> Result<(), Self::Error>;
    fn set_data(&mut self, high: bool) -> Result<(), Self::Error>;
    fn read_data(&mut self) -> Result<bool, Self::Error>;
}

/// [`SerialBus`] over embedded-hal pins. Owns the pins for its lifetime.
pub struct PinBus<CS, CLK, DIN, DOUT> {
    cs: CS,
    clk: CLK,
    din: DIN,
    dout: DOUT,
}

impl<CS, CLK, DIN, DOUT> PinBus<CS, CLK, DIN, DOUT>
where
    CS: OutputPin,
    CLK: OutputPin,
    DIN: OutputPin,
    DOUT: InputPin,
{
    /// `din` is the device's data input (host MOSI), `dout` its data output
    /// (host MISO).
    pub fn new(cs: CS, clk: CLK, din: DIN, dout: DOUT) -> Self {
        Self { cs, clk, din, dout }
    }

    pub fn release(self) -> (CS, CLK, DIN, DOUT) {
        (self.cs, self.clk, self.din, self.dout)
    }
}

impl<CS, CLK, DIN, DOUT> SerialBus for PinBus<CS, CLK, DIN, DOUT>
where
    CS: OutputPin,
    CLK: OutputPin,
    DIN: OutputPin,
    DOUT: InputPin,
{
    type Error = ErrorKind;

    fn set_select(&mut self, active: bool) -> Result<(), ErrorKind> {
        // active low
        self.cs
            .set_state(PinState::from(!active))
            .map_err(|e| e.kind())
    }

    fn set_clock(&mut self, high: bool) -> Result<(), ErrorKind> {
        self.clk.set_state(PinState::from(high)).map_err(|e| e.kind())
    }

    fn set_data(&mut self, high: bool) -> Result<(), ErrorKind> {
        self.din.set_state(PinState::from(high)).map_err(|e| e.kind())
    }

    fn read_data(&mut self) -> Result<bool, ErrorKind> {
        self.dout.is_high().map_err(|e| e.kind())
    }
}

/// Position inside one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Chip select inactive -> active, clock parked low.
    Select,
    /// Command bit `bit` (0 = start bit) is presented and clocked.
    Command { bit: u8 },
    /// One clock whose sample is the device's null bit.
    NullBit,
    /// Result bit `bit` (0 = MSB) is clocked and sampled.
    Sample { bit: u8 },
    /// Chip select back to inactive.
    Deselect,
    Done,
}

impl Phase {
    pub fn next(self) -> Phase {
        match self {
            Phase::Select => Phase::Command { bit: 0 },
            Phase::Command { bit } if bit + 1 < COMMAND_BITS => Phase::Command { bit: bit + 1 },
            Phase::Command { .. } => Phase::NullBit,
            Phase::NullBit => Phase::Sample { bit: 0 },
            Phase::Sample { bit } if bit + 1 < RESOLUTION_BITS => Phase::Sample { bit: bit + 1 },
            Phase::Sample { .. } => Phase::Deselect,
            Phase::Deselect | Phase::Done => Phase::Done,
        }
    }

    /// Clock pulses issued while in this phase.
    pub fn clock_pulses(self) -> u8 {
        match self {
            Phase::Command { .. } | Phase::NullBit | Phase::Sample { .. } => 1,
            Phase::Select | Phase::Deselect | Phase::Done => 0,
        }
    }
}

/// Five-bit command for a single-ended read of `channel`.
pub fn command_word(channel: u8) -> u8 {
    START_BIT | SINGLE_ENDED | (channel & 0x07)
}

/// MCP3208 reader. Never retries and never averages.
pub struct Mcp3208<B, D> {
    bus: B,
    delay: D,
    half_period_ns: u32,
}

impl<B, D> Mcp3208<B, D>
where
    B: SerialBus,
    D: DelayNs,
{
    pub fn new(bus: B, delay: D) -> Self {
        Self {
            bus,
            delay,
            half_period_ns: DEFAULT_HALF_PERIOD_NS,
        }
    }

    pub fn with_half_period_ns(mut self, half_period_ns: u32) -> Self {
        self.half_period_ns = half_period_ns;
        self
    }

    /// Run one conversion on `channel`.
    pub fn read_channel(&mut self, channel: u8) -> Result<RawSample, Error<B::Error>> {
        if channel >= CHANNEL_COUNT {
            return Err(Error::InvalidChannel(channel));
        }

        match self.transfer(command_word(channel)) {
            Ok(sample) => Ok(sample),
            Err(e) => {
                // leave the device deselected even if the transfer broke off
                let _ = self.bus.set_select(false);
                Err(Error::BusUnavailable(e))
            }
        }
    }

    fn transfer(&mut self, command: u8) -> Result<RawSample, B::Error> {
        let mut phase = Phase::Select;
        let mut result: u16 = 0;

        loop {
            match phase {
                Phase::Select => {
                    self.bus.set_select(false)?;
                    self.bus.set_clock(false)?;
                    self.bus.set_select(true)?;
                }
                Phase::Command { bit } => {
                    let shift = COMMAND_BITS - 1 - bit;
                    self.bus.set_data((command >> shift) & 1 == 1)?;
                    self.pulse()?;
                }
                Phase::NullBit => {
                    self.pulse()?;
                    self.bus.read_data()?;
                }
                Phase::Sample { .. } => {
                    self.pulse()?;
                    result = (result << 1) | u16::from(self.bus.read_data()?);
                }
                Phase::Deselect => self.bus.set_select(false)?,
                Phase::Done => return Ok(result & FULL_SCALE),
            }
            phase = phase.next();
        }
    }

    fn pulse(&mut self) -> Result<(), B::Error> {
        self.bus.set_clock(true)?;
        self.delay.delay_ns(self.half_period_ns);
        self.bus.set_clock(false)?;
        self.delay.delay_ns(self.half_period_ns);
        Ok(())
    }

    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct BusFault;

    /// Behavioural model of the converter on the far side of the bus.
    struct SimulatedAdc {
        samples: [u16; 8],
        selected: bool,
        clock_high: bool,
        data_in: bool,
        rising_edges: u8,
        command: u8,
        operations: usize,
        fail_after: Option<usize>,
    }

    impl SimulatedAdc {
        fn new(samples: [u16; 8]) -> Self {
            Self {
                samples,
                selected: false,
                clock_high: false,
                data_in: false,
                rising_edges: 0,
                command: 0,
                operations: 0,
                fail_after: None,
            }
        }

        fn count(&mut self) -> Result<(), BusFault> {
            self.operations += 1;
            match self.fail_after {
                Some(limit) if self.operations > limit => Err(BusFault),
                _ => Ok(()),
            }
        }

        fn output_bit(&self) -> bool {
            // edges 1..=5 carry the command, edge 6 is the null bit,
            // edges 7..=18 carry B11..B0
            if !self.selected || self.rising_edges < 7 || self.rising_edges > 18 {
                return false;
            }
            let channel = (self.command & 0x07) as usize;
            let shift = 11 - (self.rising_edges - 7);
            (self.samples[channel] >> shift) & 1 == 1
        }
    }

    impl SerialBus for SimulatedAdc {
        type Error = BusFault;

        fn set_select(&mut self, active: bool) -> Result<(), BusFault> {
            self.count()?;
            if active && !self.selected {
                self.rising_edges = 0;
                self.command = 0;
            }
            self.selected = active;
            Ok(())
        }

        fn set_clock(&mut self, high: bool) -> Result<(), BusFault> {
            self.count()?;
            if high && !self.clock_high && self.selected {
                if self.rising_edges < COMMAND_BITS {
                    self.command = (self.command << 1) | u8::from(self.data_in);
                }
                self.rising_edges += 1;
            }
            self.clock_high = high;
            Ok(())
        }

        fn set_data(&mut self, high: bool) -> Result<(), BusFault> {
            self.count()?;
            self.data_in = high;
            Ok(())
        }

        fn read_data(&mut self) -> Result<bool, BusFault> {
            self.count()?;
            Ok(self.output_bit())
        }
    }

    fn reader(samples: [u16; 8]) -> Mcp3208<SimulatedAdc, NoDelay> {
        Mcp3208::new(SimulatedAdc::new(samples), NoDelay)
    }

    #[test]
    fn test_reads_every_channel() {
        let samples = [0, 1, 0x0A5A, 2048, 1234, 4094, 4095, 0x0555];
        let mut adc = reader(samples);

        for channel in 0..CHANNEL_COUNT {
            let value = adc.read_channel(channel).unwrap();
            assert_eq!(value, samples[channel as usize]);
            assert!(value <= FULL_SCALE);
        }
    }

    #[test]
    fn test_device_receives_command_word() {
        let mut adc = reader([0; 8]);
        adc.read_channel(5).unwrap();

        let (bus, _) = adc.release();
        assert_eq!(bus.command, command_word(5));
        assert_eq!(bus.rising_edges, 18);
        assert!(!bus.selected);
    }

    #[test]
    fn test_invalid_channel_touches_nothing() {
        let mut adc = reader([0; 8]);

        assert_eq!(adc.read_channel(8), Err(Error::InvalidChannel(8)));
        assert_eq!(adc.read_channel(255), Err(Error::InvalidChannel(255)));

        let (bus, _) = adc.release();
        assert_eq!(bus.operations, 0);
    }

    #[test]
    fn test_bus_fault_reports_unavailable_and_deselects() {
        let mut sim = SimulatedAdc::new([100; 8]);
        sim.fail_after = Some(10);
        let mut adc = Mcp3208::new(sim, NoDelay);

        let result = adc.read_channel(0);
        assert_eq!(result, Err(Error::BusUnavailable(BusFault)));

        // the deselect attempt itself fails on this bus, so the model stays
        // selected; a bus that recovers gets released
        let (mut bus, delay) = adc.release();
        bus.fail_after = None;
        bus.operations = 0;
        let mut adc = Mcp3208::new(bus, delay);
        assert_eq!(adc.read_channel(3), Ok(100));
    }

    #[test]
    fn test_same_input_same_code() {
        let mut adc = reader([3210; 8]);
        let first = adc.read_channel(2).unwrap();
        let second = adc.read_channel(2).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_command_word_layout() {
        assert_eq!(command_word(0), 0b11000);
        assert_eq!(command_word(3), 0b11011);
        assert_eq!(command_word(7), 0b11111);
    }

    #[test]
    fn test_phase_sequence_clock_count() {
        let mut phase = Phase::Select;
        let mut pulses = 0u32;
        let mut steps = 0;
        while phase != Phase::Done {
            pulses += u32::from(phase.clock_pulses());
            phase = phase.next();
            steps += 1;
        }
        assert_eq!(pulses, 5 + 1 + 12);
        assert_eq!(steps, 1 + 5 + 1 + 12 + 1);
    }

    #[test]
    fn test_error_display() {
        let e: Error<BusFault> = Error::InvalidChannel(9);
        assert_eq!(e.to_string(), "invalid ADC channel 9 (expected 0-7)");
    }
}
