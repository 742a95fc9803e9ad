//! Touch controller firmware.
//!
//! Some capacitive controllers boot from a firmware or configuration image
//! streamed through the command FIFO. The controller then has to be taken
//! through a reset on GPIO3 while the touch engine is held in reset.

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::{
    fifo::{self, Cancel, CommandFifo},
    interface::{Interface, InterfaceExt},
    registers::{CPU_RESET_TOUCH, GPIOX_TOUCH_RESET, REG_CPU_RESET, REG_GPIOX, REG_GPIOX_DIR},
};

/// Images the bring-up sequence uploads, when the configuration needs them.
///
/// The images are vendor data and are not bundled with the driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct TouchFirmware<'a> {
    /// Goodix configuration, uploaded for capacitive touch on EVE2 boards.
    pub goodix_config: Option<&'a [u8]>,
    /// Ilitek firmware for the wide-glass 7" and the 10.1" 1024x600 panels.
    pub ilitek: Option<&'a [u8]>,
    /// Cypress firmware for the 5.2" 480x128 panel.
    pub cypress: Option<&'a [u8]>,
}

/// Streams `image` to the chip, then resets the touch controller so it picks
/// the image up.
pub fn upload_touch_firmware<DI, D, C>(
    fifo: &mut CommandFifo<DI>,
    image: &[u8],
    delay: &mut D,
    cancel: &mut C,
) -> Result<(), fifo::Error<DI::Error>>
where
    DI: Interface,
    D: DelayNs,
    C: Cancel,
{
    debug!("uploading {} byte touch image", image.len());
    fifo.write_bulk_with(image, cancel)?;
    fifo.wait_idle_with(cancel)?;

    let di = fifo.interface_mut();
    di.write8(REG_CPU_RESET, CPU_RESET_TOUCH)?;

    // drive GPIO3 low
    let dir = di.read8(REG_GPIOX_DIR)?;
    di.write8(REG_GPIOX_DIR, dir | GPIOX_TOUCH_RESET)?;
    let gpio = di.read8(REG_GPIOX)?;
    di.write8(REG_GPIOX, gpio & !GPIOX_TOUCH_RESET)?;
    delay.delay_ms(1);

    di.write8(REG_CPU_RESET, 0)?;
    // controller needs at least 55 ms
    delay.delay_ms(100);

    // release GPIO3
    let dir = di.read8(REG_GPIOX_DIR)?;
    di.write8(REG_GPIOX_DIR, dir & !GPIOX_TOUCH_RESET)?;
    Ok(())
}
