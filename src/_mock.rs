use std::{collections::BTreeMap, collections::VecDeque, vec::Vec};

use core::convert::Infallible;
use embedded_hal::delay::DelayNs;

use crate::{
    interface::Interface,
    registers::{
        HostCommand, CHIP_ID_SENTINEL, FAULT_SENTINEL, REG_CMD_READ, REG_CMD_WRITE,
        REG_CPU_RESET, REG_ID, REG_TOUCH_DIRECT_XY,
    },
};

/// A recorded bus transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Host(HostCommand),
    Write { address: u32, data: Vec<u8> },
}

/// How the simulated coprocessor consumes the command ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumer {
    /// `REG_CMD_READ` never moves on its own.
    Stalled,
    /// Every read of `REG_CMD_READ` catches up with `REG_CMD_WRITE`.
    Draining,
}

/// Simulated EVE chip: a sparse byte-addressed memory plus scripted registers.
pub struct MockEve {
    mem: BTreeMap<u32, u8>,
    pub log: Vec<Access>,
    pub consumer: Consumer,
    /// Number of `REG_ID` reads answered with 0 before the identity shows up.
    /// `None` never answers.
    pub id_ready_after: Option<u32>,
    pub id_reads: u32,
    /// Same as `id_ready_after`, for the CPU reset status.
    pub cpu_ready_after: Option<u32>,
    pub cpu_reset_reads: u32,
    /// Remaining `REG_CMD_READ` reads that report the fault sentinel.
    pub faults: u32,
    pub touches: VecDeque<u32>,
    pub touch_reads: u32,
    /// `REG_CMD_READ` reads that stay put after each write to `REG_CMD_WRITE`.
    pub stall_per_publish: u32,
    stalls: u32,
}

impl MockEve {
    pub fn new() -> Self {
        Self {
            mem: BTreeMap::new(),
            log: Vec::new(),
            consumer: Consumer::Draining,
            id_ready_after: Some(0),
            id_reads: 0,
            cpu_ready_after: Some(0),
            cpu_reset_reads: 0,
            faults: 0,
            touches: VecDeque::new(),
            touch_reads: 0,
            stall_per_publish: 0,
            stalls: 0,
        }
    }

    pub fn stalled() -> Self {
        Self {
            consumer: Consumer::Stalled,
            ..Self::new()
        }
    }

    pub fn poke(&mut self, address: u32, data: &[u8]) {
        for (i, b) in data.iter().enumerate() {
            self.mem.insert(address + i as u32, *b);
        }
    }

    pub fn peek(&self, address: u32, len: usize) -> Vec<u8> {
        (0..len as u32)
            .map(|i| self.mem.get(&(address + i)).copied().unwrap_or(0))
            .collect()
    }

    pub fn peek16(&self, address: u32) -> u16 {
        let b = self.peek(address, 2);
        u16::from_le_bytes([b[0], b[1]])
    }

    pub fn peek32(&self, address: u32) -> u32 {
        let b = self.peek(address, 4);
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    /// Writes to `address`, in order.
    pub fn writes_to(&self, address: u32) -> Vec<Vec<u8>> {
        self.log
            .iter()
            .filter_map(|a| match a {
                Access::Write { address: at, data } if *at == address => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    /// Index in the log of the first write to `address`.
    pub fn first_write(&self, address: u32) -> Option<usize> {
        self.log
            .iter()
            .position(|a| matches!(a, Access::Write { address: at, .. } if *at == address))
    }

    /// Index in the log of the last write to `address`.
    pub fn last_write(&self, address: u32) -> Option<usize> {
        self.log
            .iter()
            .rposition(|a| matches!(a, Access::Write { address: at, .. } if *at == address))
    }

    pub fn host_commands(&self) -> Vec<HostCommand> {
        self.log
            .iter()
            .filter_map(|a| match a {
                Access::Host(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    fn scripted(&mut self, address: u32) -> Option<Vec<u8>> {
        match address {
            REG_ID => {
                self.id_reads += 1;
                let ready = matches!(self.id_ready_after, Some(n) if self.id_reads > n);
                Some(std::vec![if ready { CHIP_ID_SENTINEL } else { 0 }])
            }
            REG_CPU_RESET => {
                self.cpu_reset_reads += 1;
                let ready = matches!(self.cpu_ready_after, Some(n) if self.cpu_reset_reads > n);
                if ready {
                    None
                } else {
                    Some(std::vec![0x07, 0x00, 0x00, 0x00])
                }
            }
            REG_CMD_READ => {
                if self.faults > 0 {
                    self.faults -= 1;
                    return Some(FAULT_SENTINEL.to_le_bytes().to_vec());
                }
                if self.stalls > 0 {
                    self.stalls -= 1;
                    return None;
                }
                if self.consumer == Consumer::Draining {
                    let write = self.peek(REG_CMD_WRITE, 2);
                    self.poke(REG_CMD_READ, &write);
                }
                None
            }
            REG_TOUCH_DIRECT_XY => {
                self.touch_reads += 1;
                let v = self.touches.pop_front().unwrap_or(0x8000_8000);
                Some(v.to_le_bytes().to_vec())
            }
            _ => None,
        }
    }
}

impl Interface for MockEve {
    type Error = Infallible;

    fn host_command(&mut self, command: HostCommand) -> Result<(), Self::Error> {
        self.log.push(Access::Host(command));
        Ok(())
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        let bytes = self
            .scripted(address)
            .unwrap_or_else(|| self.peek(address, buf.len()));
        for (i, b) in buf.iter_mut().enumerate() {
            *b = bytes.get(i).copied().unwrap_or(0);
        }
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), Self::Error> {
        if address == REG_CMD_WRITE {
            self.stalls = self.stall_per_publish;
        }
        self.poke(address, data);
        self.log.push(Access::Write {
            address,
            data: data.to_vec(),
        });
        Ok(())
    }
}

/// Delay that only counts.
#[derive(Default)]
pub struct MockDelay {
    pub total_ns: u64,
    pub calls: u32,
}

impl MockDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
        self.calls += 1;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ns += u64::from(ms) * 1_000_000;
        self.calls += 1;
    }
}

/// Reset pin that records its levels.
#[derive(Default)]
pub struct MockPin {
    pub levels: Vec<bool>,
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.push(true);
        Ok(())
    }
}
