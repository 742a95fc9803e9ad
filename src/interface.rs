//! Register access over the chip-select framed link.

mod spi;
pub use spi::*;

use crate::registers::HostCommand;

/// Framed memory access to an EVE chip.
///
/// Every call is one complete chip-select transaction. Implementations must
/// not interleave transactions if they are shared between several owners.
pub trait Interface {
    /// Error type
    type Error: core::fmt::Debug;

    /// Send a host command (power mode and clock selection).
    fn host_command(&mut self, command: HostCommand) -> Result<(), Self::Error>;

    /// Read `buf.len()` bytes starting at `address`.
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write `data` starting at `address`.
    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), Self::Error>;
}

impl<T: Interface + ?Sized> Interface for &mut T {
    type Error = T::Error;

    fn host_command(&mut self, command: HostCommand) -> Result<(), Self::Error> {
        T::host_command(self, command)
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        T::read(self, address, buf)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), Self::Error> {
        T::write(self, address, data)
    }
}

/// Sized little-endian register helpers on top of [`Interface`].
pub trait InterfaceExt: Interface {
    fn read8(&mut self, address: u32) -> Result<u8, Self::Error> {
        let mut buf = [0; 1];
        self.read(address, &mut buf)?;
        Ok(buf[0])
    }

    fn read16(&mut self, address: u32) -> Result<u16, Self::Error> {
        let mut buf = [0; 2];
        self.read(address, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read32(&mut self, address: u32) -> Result<u32, Self::Error> {
        let mut buf = [0; 4];
        self.read(address, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn write8(&mut self, address: u32, value: u8) -> Result<(), Self::Error> {
        self.write(address, &[value])
    }

    fn write16(&mut self, address: u32, value: u16) -> Result<(), Self::Error> {
        self.write(address, &value.to_le_bytes())
    }

    fn write32(&mut self, address: u32, value: u32) -> Result<(), Self::Error> {
        self.write(address, &value.to_le_bytes())
    }

    fn read_burst(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.read(address, buf)
    }

    fn write_burst(&mut self, address: u32, data: &[u8]) -> Result<(), Self::Error> {
        self.write(address, data)
    }
}

impl<T: Interface + ?Sized> InterfaceExt for T {}
