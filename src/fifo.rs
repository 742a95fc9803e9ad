//! Coprocessor command FIFO.
//!
//! The coprocessor drains a 4 KiB ring buffer at [`RAM_CMD`]. The host owns the
//! write cursor: words are written into chip RAM at the cursor, and nothing
//! happens until the cursor is published to `REG_CMD_WRITE`. The chip owns the
//! read cursor in `REG_CMD_READ`, which reads [`FAULT_SENTINEL`] when the
//! coprocessor has halted.
//!
//! Waiting is busy polling. Every wait has a `_with` variant taking a
//! [`Cancel`] token; the plain variants poll forever like the hardware
//! protocol expects.

use heapless::String;
use log::warn;

use crate::{
    interface::{Interface, InterfaceExt},
    registers::{
        CMD_FIFO_SIZE, CMD_WORD_SIZE, CPU_RESET_COPRO, ERR_REPORT_LEN, FAULT_SENTINEL, RAM_CMD,
        RAM_ERR_REPORT, REG_CMD_DL, REG_CMD_READ, REG_CMD_WRITE, REG_COPRO_PATCH_PTR,
        REG_CPU_RESET,
    },
};

/// Bytes held back so a full ring is never mistaken for an empty one.
pub const RESERVED_MARGIN: u16 = CMD_WORD_SIZE;

/// Most free space the FIFO can ever report.
pub const MAX_FREE_SPACE: u16 = CMD_FIFO_SIZE - RESERVED_MARGIN;

/// Size of one staged burst in [`CommandFifo::write_bulk`].
pub const CHUNK_SIZE: usize = 512;

/// Checked once per unsuccessful poll of a busy wait.
pub trait Cancel {
    /// Returns `true` to abandon the wait.
    fn cancelled(&mut self) -> bool;
}

/// Never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct Forever;

impl Cancel for Forever {
    fn cancelled(&mut self) -> bool {
        false
    }
}

/// Gives up after the given number of unsuccessful polls.
#[derive(Debug, Clone, Copy)]
pub struct MaxPolls(pub u32);

impl Cancel for MaxPolls {
    fn cancelled(&mut self) -> bool {
        self.0 = self.0.saturating_sub(1);
        self.0 == 0
    }
}

impl<F: FnMut() -> bool> Cancel for F {
    fn cancelled(&mut self) -> bool {
        self()
    }
}

/// FIFO error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// Error caused by the interface.
    Interface(E),
    /// The [`Cancel`] token ended a wait.
    Cancelled,
}

impl<E> From<E> for Error<E> {
    fn from(value: E) -> Self {
        Self::Interface(value)
    }
}

// Only for waits driven by `Forever`.
fn uncancelled<T, E>(result: Result<T, Error<E>>) -> Result<T, E> {
    result.map_err(|e| match e {
        Error::Interface(e) => e,
        Error::Cancelled => unreachable!("Forever never cancels"),
    })
}

/// What the coprocessor reported before it was reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultReport {
    message: String<ERR_REPORT_LEN>,
    patch_ptr: u32,
}

impl FaultReport {
    /// The fault message, up to the first null byte.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// The patch pointer that was saved and restored across the reset.
    pub fn patch_ptr(&self) -> u32 {
        self.patch_ptr
    }
}

fn read_fault_message<DI: Interface>(di: &mut DI) -> Result<String<ERR_REPORT_LEN>, DI::Error> {
    let mut raw = [0u8; ERR_REPORT_LEN];
    di.read_burst(RAM_ERR_REPORT, &mut raw)?;

    let mut message = String::new();
    for &b in raw.iter().take_while(|&&b| b != 0) {
        let c = if b.is_ascii() { b as char } else { '?' };
        // one byte per char, cannot exceed the capacity
        let _ = message.push(c);
    }
    Ok(message)
}

/// Resets the coprocessor and zeroes its cursors, keeping the patch pointer.
///
/// Returns the patch pointer that was restored.
fn reset_coprocessor<DI: Interface>(di: &mut DI) -> Result<u32, DI::Error> {
    let patch_ptr = di.read32(REG_COPRO_PATCH_PTR)?;
    di.write8(REG_CPU_RESET, CPU_RESET_COPRO)?;
    di.write16(REG_CMD_READ, 0)?;
    di.write16(REG_CMD_WRITE, 0)?;
    di.write16(REG_CMD_DL, 0)?;
    di.write8(REG_CPU_RESET, 0)?;
    di.write32(REG_COPRO_PATCH_PTR, patch_ptr)?;
    Ok(patch_ptr)
}

/// Writes `data` into the ring at `cursor`, splitting at the end of the ring.
fn write_ring<DI: Interface>(di: &mut DI, cursor: u16, data: &[u8]) -> Result<(), DI::Error> {
    let room = usize::from(CMD_FIFO_SIZE - cursor);
    let address = RAM_CMD + u32::from(cursor);
    if data.len() <= room {
        di.write_burst(address, data)
    } else {
        let (head, tail) = data.split_at(room);
        di.write_burst(address, head)?;
        di.write_burst(RAM_CMD, tail)
    }
}

/// Host side of the command ring buffer.
pub struct CommandFifo<DI> {
    di: DI,
    /// Next free byte in the ring.
    write: u16,
    /// Last value written to `REG_CMD_WRITE`.
    published: u16,
    faults: u32,
    last_fault: Option<FaultReport>,
    staging: [u8; CHUNK_SIZE],
}

impl<DI> CommandFifo<DI>
where
    DI: Interface,
{
    /// Takes over the interface with both cursors at 0, as after a chip reset.
    pub fn new(di: DI) -> Self {
        Self {
            di,
            write: 0,
            published: 0,
            faults: 0,
            last_fault: None,
            staging: [0; CHUNK_SIZE],
        }
    }

    /// Current write cursor, as an offset into the ring.
    pub fn write_cursor(&self) -> u16 {
        self.write
    }

    /// Write cursor the coprocessor was last told about.
    pub fn published_cursor(&self) -> u16 {
        self.published
    }

    /// Number of fault recoveries performed so far.
    pub fn fault_count(&self) -> u32 {
        self.faults
    }

    /// The most recent fault, if any.
    pub fn last_fault(&self) -> Option<&FaultReport> {
        self.last_fault.as_ref()
    }

    /// Register access that bypasses the ring.
    pub fn interface_mut(&mut self) -> &mut DI {
        &mut self.di
    }

    /// Releases the interface.
    pub fn release(self) -> DI {
        self.di
    }

    pub(crate) fn reset_cursors(&mut self) {
        self.write = 0;
        self.published = 0;
    }

    fn advance(&mut self, bytes: u16) {
        self.write = (self.write + bytes) % CMD_FIFO_SIZE;
    }

    /// Writes one command word at the write cursor without publishing it.
    pub fn enqueue_word(&mut self, value: u32) -> Result<(), DI::Error> {
        self.di
            .write32(RAM_CMD + u32::from(self.write), value)?;
        self.advance(CMD_WORD_SIZE);
        Ok(())
    }

    /// Writes several command words, see [`enqueue_word`](Self::enqueue_word).
    pub fn enqueue_words(&mut self, values: &[u32]) -> Result<(), DI::Error> {
        values.iter().try_for_each(|&v| self.enqueue_word(v))
    }

    /// Tells the coprocessor about everything enqueued so far.
    pub fn publish(&mut self) -> Result<(), DI::Error> {
        self.di.write16(REG_CMD_WRITE, self.write)?;
        self.published = self.write;
        Ok(())
    }

    fn free_space_at(&self, read: u16) -> u16 {
        let used = self.write.wrapping_sub(read) % CMD_FIFO_SIZE;
        MAX_FREE_SPACE.saturating_sub(used)
    }

    /// Bytes that can be enqueued without overrunning the coprocessor.
    ///
    /// Counts enqueued words whether or not they have been published.
    pub fn free_space(&mut self) -> Result<u16, DI::Error> {
        let read = self.di.read16(REG_CMD_READ)?;
        Ok(self.free_space_at(read))
    }

    /// Polls until at least `bytes` are free, recovering from faults.
    ///
    /// `bytes` above [`MAX_FREE_SPACE`] can never be satisfied.
    pub fn wait_for_space(&mut self, bytes: u16) -> Result<(), DI::Error> {
        uncancelled(self.wait_for_space_with(bytes, &mut Forever))
    }

    /// [`wait_for_space`](Self::wait_for_space) with a cancellation token.
    pub fn wait_for_space_with<C: Cancel>(
        &mut self,
        bytes: u16,
        cancel: &mut C,
    ) -> Result<(), Error<DI::Error>> {
        loop {
            let read = self.di.read16(REG_CMD_READ)?;
            if read == FAULT_SENTINEL {
                self.recover()?;
            } else if self.free_space_at(read) >= bytes {
                return Ok(());
            }
            if cancel.cancelled() {
                return Err(Error::Cancelled);
            }
        }
    }

    /// Polls until the coprocessor has consumed everything published.
    ///
    /// A fault is recovered from in place and polling continues.
    pub fn wait_idle(&mut self) -> Result<(), DI::Error> {
        uncancelled(self.wait_idle_with(&mut Forever))
    }

    /// [`wait_idle`](Self::wait_idle) with a cancellation token.
    pub fn wait_idle_with<C: Cancel>(&mut self, cancel: &mut C) -> Result<(), Error<DI::Error>> {
        loop {
            let read = self.di.read16(REG_CMD_READ)?;
            if read == FAULT_SENTINEL {
                self.recover()?;
            } else if read == self.published {
                return Ok(());
            }
            if cancel.cancelled() {
                return Err(Error::Cancelled);
            }
        }
    }

    /// Reads the fault message and resets the coprocessor.
    ///
    /// Both cursors are 0 afterwards. Anything enqueued but not yet consumed is
    /// lost.
    pub fn recover(&mut self) -> Result<(), DI::Error> {
        let message = read_fault_message(&mut self.di)?;
        warn!("coprocessor fault: {}", message.as_str());

        let patch_ptr = reset_coprocessor(&mut self.di)?;
        self.reset_cursors();
        self.faults = self.faults.wrapping_add(1);
        self.last_fault = Some(FaultReport { message, patch_ptr });
        Ok(())
    }

    /// Streams a payload of any length through the ring.
    ///
    /// The payload goes out in [`CHUNK_SIZE`] bursts, each published as soon as
    /// it is written. The final chunk is padded up to a whole word.
    pub fn write_bulk(&mut self, data: &[u8]) -> Result<(), DI::Error> {
        uncancelled(self.write_bulk_with(data, &mut Forever))
    }

    /// [`write_bulk`](Self::write_bulk) with a cancellation token.
    pub fn write_bulk_with<C: Cancel>(
        &mut self,
        data: &[u8],
        cancel: &mut C,
    ) -> Result<(), Error<DI::Error>> {
        let mut remaining = data;
        while !remaining.is_empty() {
            self.wait_for_space_with(CHUNK_SIZE as u16, cancel)?;

            let len = remaining.len().min(CHUNK_SIZE);
            let padded = (len + 3) & !3;
            self.staging[..len].copy_from_slice(&remaining[..len]);
            self.staging[len..padded].fill(0);

            write_ring(&mut self.di, self.write, &self.staging[..padded])?;
            self.advance(padded as u16);
            self.publish()?;

            remaining = &remaining[len..];
        }
        Ok(())
    }
}
