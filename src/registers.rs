//! EVE memory map, register addresses and host commands.
//!
//! Register addresses are absolute (already offset by [`RAM_REG`]) so they can
//! be handed straight to [`InterfaceExt`](crate::interface::InterfaceExt).

/// General purpose graphics RAM.
pub const RAM_G: u32 = 0x00_0000;
/// Display list RAM.
pub const RAM_DL: u32 = 0x30_0000;
/// Register block.
pub const RAM_REG: u32 = 0x30_2000;
/// Coprocessor command ring buffer.
pub const RAM_CMD: u32 = 0x30_8000;
/// Null terminated coprocessor fault message.
pub const RAM_ERR_REPORT: u32 = 0x30_9800;

/// Size of the command ring buffer in bytes.
pub const CMD_FIFO_SIZE: u16 = 4096;
/// Size of a single command word.
pub const CMD_WORD_SIZE: u16 = 4;
/// Maximum length of the fault message at [`RAM_ERR_REPORT`].
pub const ERR_REPORT_LEN: usize = 128;

/// `REG_CMD_READ` holds this value when the coprocessor has halted on a fault.
pub const FAULT_SENTINEL: u16 = 0xFFF;
/// Value of [`REG_ID`] once the chip is up.
pub const CHIP_ID_SENTINEL: u8 = 0x7C;

pub const REG_ID: u32 = RAM_REG;
pub const REG_FREQUENCY: u32 = RAM_REG + 0x0C;
pub const REG_CPU_RESET: u32 = RAM_REG + 0x20;
pub const REG_HCYCLE: u32 = RAM_REG + 0x2C;
pub const REG_HOFFSET: u32 = RAM_REG + 0x30;
pub const REG_HSIZE: u32 = RAM_REG + 0x34;
pub const REG_HSYNC0: u32 = RAM_REG + 0x38;
pub const REG_HSYNC1: u32 = RAM_REG + 0x3C;
pub const REG_VCYCLE: u32 = RAM_REG + 0x40;
pub const REG_VOFFSET: u32 = RAM_REG + 0x44;
pub const REG_VSIZE: u32 = RAM_REG + 0x48;
pub const REG_VSYNC0: u32 = RAM_REG + 0x4C;
pub const REG_VSYNC1: u32 = RAM_REG + 0x50;
pub const REG_DLSWAP: u32 = RAM_REG + 0x54;
pub const REG_DITHER: u32 = RAM_REG + 0x60;
pub const REG_SWIZZLE: u32 = RAM_REG + 0x64;
pub const REG_CSPREAD: u32 = RAM_REG + 0x68;
pub const REG_PCLK_POL: u32 = RAM_REG + 0x6C;
pub const REG_PCLK: u32 = RAM_REG + 0x70;
pub const REG_GPIOX_DIR: u32 = RAM_REG + 0x98;
pub const REG_GPIOX: u32 = RAM_REG + 0x9C;
pub const REG_PWM_HZ: u32 = RAM_REG + 0xD0;
pub const REG_PWM_DUTY: u32 = RAM_REG + 0xD4;
pub const REG_CMD_READ: u32 = RAM_REG + 0xF8;
pub const REG_CMD_WRITE: u32 = RAM_REG + 0xFC;
pub const REG_CMD_DL: u32 = RAM_REG + 0x100;
pub const REG_TOUCH_MODE: u32 = RAM_REG + 0x104;
pub const REG_TOUCH_ADC_MODE: u32 = RAM_REG + 0x108;
pub const REG_TOUCH_OVERSAMPLE: u32 = RAM_REG + 0x114;
pub const REG_TOUCH_RZTHRESH: u32 = RAM_REG + 0x118;
/// First of the six consecutive 32-bit touch transform registers (A..F).
pub const REG_TOUCH_TRANSFORM_A: u32 = RAM_REG + 0x150;
pub const REG_TOUCH_CONFIG: u32 = RAM_REG + 0x168;
pub const REG_TOUCH_DIRECT_XY: u32 = RAM_REG + 0x18C;
pub const REG_FLASH_STATUS: u32 = RAM_REG + 0x5F0;
pub const REG_COPRO_PATCH_PTR: u32 = RAM_REG + 0x7162;
pub const REG_CHIP_ID: u32 = 0x0C_0000;

/// `REG_CPU_RESET` bit holding the coprocessor in reset.
pub const CPU_RESET_COPRO: u8 = 1 << 0;
/// `REG_CPU_RESET` bit holding the touch engine in reset.
pub const CPU_RESET_TOUCH: u8 = 1 << 1;

/// `REG_DLSWAP` value: swap at the next frame boundary.
pub const DLSWAP_FRAME: u8 = 2;

/// `REG_GPIOX` bit driving the panel DISP line.
pub const GPIOX_DISP: u16 = 1 << 15;
/// `REG_GPIOX` bit wired to the touch controller reset line.
pub const GPIOX_TOUCH_RESET: u8 = 1 << 3;

pub const FLASH_STATUS_DETACHED: u8 = 1;
pub const FLASH_STATUS_BASIC: u8 = 2;
pub const FLASH_STATUS_FULL: u8 = 3;

/// Host commands, sent as a bare three byte transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HostCommand {
    Active = 0x00,
    Standby = 0x41,
    Sleep = 0x42,
    PowerDown = 0x50,
    ClockInternal = 0x48,
    ClockExternal = 0x44,
    CoreReset = 0x68,
}
