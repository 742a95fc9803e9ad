//! Coprocessor commands.
//!
//! These enqueue without publishing, like any other word sent through
//! [`CommandFifo`]. The flash helpers are the exception: they run to completion
//! and report the resulting flash state.

use crate::{
    fifo::CommandFifo,
    interface::{Interface, InterfaceExt},
    registers::{FLASH_STATUS_BASIC, FLASH_STATUS_DETACHED, FLASH_STATUS_FULL, REG_FLASH_STATUS},
};

pub const CMD_DLSTART: u32 = 0xFFFF_FF00;
pub const CMD_SWAP: u32 = 0xFFFF_FF01;
pub const CMD_TEXT: u32 = 0xFFFF_FF0C;
pub const CMD_FLASHERASE: u32 = 0xFFFF_FF44;
pub const CMD_FLASHDETACH: u32 = 0xFFFF_FF48;
pub const CMD_FLASHATTACH: u32 = 0xFFFF_FF49;
pub const CMD_FLASHFAST: u32 = 0xFFFF_FF4A;

/// Centers text on both axes.
pub const OPT_CENTER: u16 = 1536;

/// Packs `a` into the low and `b` into the high half of a word.
fn pair(a: u16, b: u16) -> u32 {
    (u32::from(b) << 16) | u32::from(a)
}

impl<DI> CommandFifo<DI>
where
    DI: Interface,
{
    /// Starts a new display list.
    pub fn dl_start(&mut self) -> Result<(), DI::Error> {
        self.enqueue_word(CMD_DLSTART)
    }

    /// Swaps the finished display list in at the next frame.
    pub fn swap(&mut self) -> Result<(), DI::Error> {
        self.enqueue_word(CMD_SWAP)
    }

    /// Draws `text` with one of the built-in or installed fonts.
    ///
    /// The string is sent little-endian, null terminated and padded to a word.
    /// An empty string still sends the command with a lone terminator word.
    pub fn text(
        &mut self,
        x: u16,
        y: u16,
        font: u16,
        options: u16,
        text: &str,
    ) -> Result<(), DI::Error> {
        self.enqueue_words(&[CMD_TEXT, pair(x, y), pair(font, options)])?;

        let bytes = text.as_bytes();
        for chunk in bytes.chunks(4) {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            self.enqueue_word(u32::from_le_bytes(word))?;
        }
        // a length that fills the last word exactly still needs its terminator
        if bytes.len() % 4 == 0 {
            self.enqueue_word(0)?;
        }
        Ok(())
    }

    fn run_flash_command(&mut self, command: u32) -> Result<u8, DI::Error> {
        self.enqueue_words(&[command, 0])?;
        self.publish()?;
        self.wait_idle()?;
        self.interface_mut().read8(REG_FLASH_STATUS)
    }

    /// Attaches the external flash. Returns `true` once it is in basic mode.
    pub fn flash_attach(&mut self) -> Result<bool, DI::Error> {
        Ok(self.run_flash_command(CMD_FLASHATTACH)? == FLASH_STATUS_BASIC)
    }

    /// Detaches the external flash. Returns `true` once it is detached.
    pub fn flash_detach(&mut self) -> Result<bool, DI::Error> {
        Ok(self.run_flash_command(CMD_FLASHDETACH)? == FLASH_STATUS_DETACHED)
    }

    /// Switches the flash to full speed. Returns `true` once it is in full mode.
    pub fn flash_fast(&mut self) -> Result<bool, DI::Error> {
        Ok(self.run_flash_command(CMD_FLASHFAST)? == FLASH_STATUS_FULL)
    }

    /// Erases the whole flash and waits for it to finish.
    pub fn flash_erase(&mut self) -> Result<(), DI::Error> {
        self.enqueue_word(CMD_FLASHERASE)?;
        self.publish()?;
        self.wait_idle()
    }
}
