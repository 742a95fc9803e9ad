#![no_std]

//! This crate provides a blocking driver for the FTDI/Bridgetek EVE graphics
//! coprocessors (FT81x, BT815/6, BT817/8) on the boards and panels of the
//! Matrix Orbital EVE series.
//!
//! The chip is reached over SPI through the [`interface::Interface`] trait.
//! [`Builder`] takes it from power-on to a blank visible screen with touch
//! configured and returns an [`Eve`] handle. Drawing happens by streaming
//! display list and coprocessor words through the [`fifo::CommandFifo`] the
//! handle owns.
//!
//! ## Example
//! ```rust,ignore
//! use bt81x::{interface::SpiInterface, models::{Board, PanelModel, TouchKind}, Builder};
//!
//! let di = SpiInterface::new(spi_device);
//! let mut eve = Builder::new(di, PanelModel::Display43_480x272)
//!     .board(Board::Eve3)
//!     .touch(TouchKind::Capacitive)
//!     .reset_pin(pd_pin)
//!     .init(&mut delay)?;
//!
//! let fifo = eve.fifo_mut();
//! fifo.dl_start()?;
//! fifo.enqueue_words(&[
//!     display_list::clear_color(Rgb888::BLUE),
//!     display_list::clear(true, true, true),
//! ])?;
//! fifo.text(240, 136, 31, commands::OPT_CENTER, "Hello")?;
//! fifo.enqueue_word(display_list::display())?;
//! fifo.swap()?;
//! fifo.publish()?;
//! fifo.wait_idle()?;
//! ```

use embedded_hal::delay::DelayNs;

pub mod interface;
pub mod registers;

mod builder;
pub use builder::*;

pub mod calibration;
pub mod commands;
pub mod display_list;
pub mod fifo;
pub mod fixed;
pub mod models;
pub mod touch;

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod _mock;

use crate::{
    calibration::{CalibrationError, TouchTransform},
    fifo::{Cancel, CommandFifo},
    interface::{Interface, InterfaceExt},
    models::{PanelModel, TouchKind},
    registers::{HostCommand, RAM_G, REG_PWM_DUTY},
};

/// What bring-up configured, for the lifetime of the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayInfo {
    /// Visible width in pixels.
    pub width: u16,
    /// Visible height in pixels.
    pub height: u16,
    /// Left edge of the visible area within the scanned frame.
    pub h_offset: u16,
    /// Top edge of the visible area within the scanned frame.
    pub v_offset: u16,
    pub touch: TouchKind,
}

/// An EVE chip that has completed bring-up.
pub struct Eve<DI> {
    fifo: CommandFifo<DI>,
    info: DisplayInfo,
    model: PanelModel,
    /// `REG_CHIP_ID` as read during bring-up.
    chip_id: u32,
}

impl<DI> Eve<DI>
where
    DI: Interface,
{
    /// Returns the geometry and touch setup of the panel.
    pub fn display(&self) -> &DisplayInfo {
        &self.info
    }

    pub fn model(&self) -> PanelModel {
        self.model
    }

    /// Chip identity read during bring-up, e.g. `0x0817_0100` for a BT817.
    pub fn chip_id(&self) -> u32 {
        self.chip_id
    }

    pub fn fifo(&self) -> &CommandFifo<DI> {
        &self.fifo
    }

    /// The command FIFO, for building and submitting display lists.
    pub fn fifo_mut(&mut self) -> &mut CommandFifo<DI> {
        &mut self.fifo
    }

    /// Sends a power or clock host command.
    pub fn host_command(&mut self, command: HostCommand) -> Result<(), DI::Error> {
        self.fifo.interface_mut().host_command(command)
    }

    /// Sets the backlight PWM duty, 0 (off) to 128 (full).
    pub fn set_backlight(&mut self, duty: u8) -> Result<(), DI::Error> {
        self.fifo.interface_mut().write8(REG_PWM_DUTY, duty)
    }

    /// Copies `data` into general purpose RAM at `offset`, bypassing the
    /// coprocessor.
    pub fn write_block_ram(&mut self, offset: u32, data: &[u8]) -> Result<(), DI::Error> {
        self.fifo.interface_mut().write_burst(RAM_G + offset, data)
    }

    /// Installs a touch transform for a controller reporting `0..=touch_max`
    /// linearly across the visible area.
    pub fn calibrate_fixed(
        &mut self,
        touch_max: (u16, u16),
    ) -> Result<TouchTransform, CalibrationError<DI::Error>> {
        calibration::calibrate_fixed(
            self.fifo.interface_mut(),
            self.info.width,
            self.info.height,
            touch_max,
        )
    }

    /// Asks the user to tap three targets and installs the resulting
    /// transform.
    pub fn calibrate_interactive<D: DelayNs, C: Cancel>(
        &mut self,
        delay: &mut D,
        cancel: &mut C,
    ) -> Result<TouchTransform, CalibrationError<DI::Error>> {
        calibration::calibrate_interactive(&mut self.fifo, &self.info, delay, cancel)
    }

    /// The transform the touch engine is currently using.
    pub fn touch_transform(&mut self) -> Result<TouchTransform, DI::Error> {
        TouchTransform::read(self.fifo.interface_mut())
    }

    /// Releases the display interface.
    pub fn release(self) -> DI {
        self.fifo.release()
    }
}
