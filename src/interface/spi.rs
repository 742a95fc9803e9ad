use embedded_hal::spi::{Operation, SpiDevice};

use super::Interface;
use crate::registers::HostCommand;

/// SPI interface.
///
/// Chip select is owned by the [`SpiDevice`], so each transaction below is one
/// framed access as the EVE expects.
pub struct SpiInterface<SPI> {
    spi: SPI,
}

impl<SPI> SpiInterface<SPI>
where
    SPI: SpiDevice,
{
    /// Create new interface
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Release the SPI device back, deconstructing the interface
    pub fn release(self) -> SPI {
        self.spi
    }
}

fn write_header(address: u32) -> [u8; 3] {
    [
        ((address >> 16) as u8 & 0x3F) | 0x80,
        (address >> 8) as u8,
        address as u8,
    ]
}

// Reads carry one dummy byte after the address.
fn read_header(address: u32) -> [u8; 4] {
    [
        (address >> 16) as u8 & 0x3F,
        (address >> 8) as u8,
        address as u8,
        0x00,
    ]
}

impl<SPI> Interface for SpiInterface<SPI>
where
    SPI: SpiDevice,
{
    type Error = SPI::Error;

    fn host_command(&mut self, command: HostCommand) -> Result<(), Self::Error> {
        self.spi.write(&[command as u8, 0x00, 0x00])
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        let header = read_header(address);
        self.spi
            .transaction(&mut [Operation::Write(&header), Operation::Read(buf)])
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), Self::Error> {
        let header = write_header(address);
        self.spi
            .transaction(&mut [Operation::Write(&header), Operation::Write(data)])
    }
}
