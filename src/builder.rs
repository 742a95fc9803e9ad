//! [super::Eve] builder module

use embedded_graphics_core::pixelcolor::{Rgb888, RgbColor};
use embedded_hal::{
    delay::DelayNs,
    digital::{self, OutputPin},
};
use log::{debug, error, info, warn};

use crate::{
    calibration::{self, CalibrationError, SolveError},
    display_list as dl,
    fifo::{self, Cancel, CommandFifo},
    interface::{Interface, InterfaceExt},
    models::{Board, PanelModel, Timings, TouchFirmwareKind, TouchKind, ILITEK_TOUCH_RANGE},
    registers::*,
    touch::{upload_touch_firmware, TouchFirmware},
    DisplayInfo, Eve,
};

/// Power-down line hold time, low then high.
const RESET_DURATION_MS: u32 = 20;
/// Oscillator settle time after the clock host commands.
const WAKE_SETTLE_MS: u32 = 300;
const PRESENCE_POLL_MS: u32 = 5;
const DEFAULT_PRESENCE_ATTEMPTS: u32 = 50;
const TOUCH_RESET_MS: u32 = 10;

const TOUCH_CONFIG_RESISTIVE: u16 = 0x8381;
const TOUCH_RZTHRESH: u16 = 1200;
const TOUCH_MODE_CONTINUOUS: u8 = 2;
const TOUCH_ADC_DIFFERENTIAL: u8 = 1;
const TOUCH_OVERSAMPLE_MAX: u8 = 15;

const PWM_HZ: u16 = 0xFA;
const DEFAULT_BACKLIGHT: u8 = 128;

/// Configuration for a panel controller the EVE cannot set up by itself.
///
/// Only [`PanelModel::Display24_320x240`] needs one. The hook runs while the
/// pixel clock is stopped, before the timing registers are written. An error
/// ends bring-up with [`InitError::ExternalPanel`].
pub trait ExternalPanel {
    /// `false` only for [`NoExternalPanel`].
    const PRESENT: bool = true;

    type Error: core::fmt::Debug;

    fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error>;
}

/// No external panel controller.
pub struct NoExternalPanel;

impl ExternalPanel for NoExternalPanel {
    const PRESENT: bool = false;

    type Error = core::convert::Infallible;

    fn init<D: DelayNs>(&mut self, _delay: &mut D) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Builder for [Eve] instances.
pub struct Builder<'a, DI, RST, EXT>
where
    DI: Interface,
{
    di: DI,
    model: Result<PanelModel, u8>,
    board: Board,
    touch: TouchKind,
    rst: Option<RST>,
    firmware: TouchFirmware<'a>,
    external: EXT,
    presence_attempts: u32,
    poll_limit: Option<u32>,
    backlight: u8,
}

impl<'a, DI> Builder<'a, DI, NoResetPin, NoExternalPanel>
where
    DI: Interface,
{
    #[must_use]
    pub fn new(di: DI, model: PanelModel) -> Self {
        Self::with_model(di, Ok(model))
    }

    /// Selects the panel by its numeric id, see [`PanelModel::from_id`].
    ///
    /// An unknown id is reported by [`init`](Builder::init) before any
    /// hardware is touched.
    #[must_use]
    pub fn from_panel_id(di: DI, id: u8) -> Self {
        Self::with_model(di, PanelModel::from_id(id).ok_or(id))
    }

    fn with_model(di: DI, model: Result<PanelModel, u8>) -> Self {
        Self {
            di,
            model,
            board: Board::Eve3,
            touch: TouchKind::None,
            rst: None,
            firmware: TouchFirmware::default(),
            external: NoExternalPanel,
            presence_attempts: DEFAULT_PRESENCE_ATTEMPTS,
            poll_limit: None,
            backlight: DEFAULT_BACKLIGHT,
        }
    }
}

impl<'a, DI, RST, EXT> Builder<'a, DI, RST, EXT>
where
    DI: Interface,
    RST: OutputPin,
    EXT: ExternalPanel,
{
    #[must_use]
    pub fn board(mut self, board: Board) -> Self {
        self.board = board;
        self
    }
    #[must_use]
    pub fn touch(mut self, touch: TouchKind) -> Self {
        self.touch = touch;
        self
    }
    #[must_use]
    pub fn touch_firmware(mut self, firmware: TouchFirmware<'a>) -> Self {
        self.firmware = firmware;
        self
    }
    /// Polls of the identity and reset status registers before giving up.
    #[must_use]
    pub fn presence_attempts(mut self, attempts: u32) -> Self {
        self.presence_attempts = attempts;
        self
    }
    /// Bounds the unsuccessful FIFO polls of each touch image upload during
    /// bring-up. The budget starts afresh for every image. Unbounded by
    /// default.
    #[must_use]
    pub fn poll_limit(mut self, polls: u32) -> Self {
        self.poll_limit = Some(polls);
        self
    }
    /// Initial backlight PWM duty, 0 (off) to 128 (full).
    #[must_use]
    pub fn backlight(mut self, duty: u8) -> Self {
        self.backlight = duty;
        self
    }

    #[must_use]
    pub fn reset_pin<RST2: OutputPin>(self, rst: RST2) -> Builder<'a, DI, RST2, EXT> {
        Builder {
            di: self.di,
            model: self.model,
            board: self.board,
            touch: self.touch,
            rst: Some(rst),
            firmware: self.firmware,
            external: self.external,
            presence_attempts: self.presence_attempts,
            poll_limit: self.poll_limit,
            backlight: self.backlight,
        }
    }

    #[must_use]
    pub fn external_panel<EXT2: ExternalPanel>(
        self,
        external: EXT2,
    ) -> Builder<'a, DI, RST, EXT2> {
        Builder {
            di: self.di,
            model: self.model,
            board: self.board,
            touch: self.touch,
            rst: self.rst,
            firmware: self.firmware,
            external,
            presence_attempts: self.presence_attempts,
            poll_limit: self.poll_limit,
            backlight: self.backlight,
        }
    }

    /// Brings the chip from reset to a blank, visible screen with touch
    /// configured.
    ///
    /// There is no rollback: on error the chip is left part way through and
    /// needs another full bring-up.
    pub fn init<D: DelayNs>(
        mut self,
        delay: &mut D,
    ) -> Result<Eve<DI>, InitError<DI::Error, RST::Error, EXT::Error>> {
        let model = match self.model {
            Ok(model) => model,
            Err(id) => {
                error!("unsupported panel model {}", id);
                return Err(InitError::UnsupportedProfile(id));
            }
        };
        let timings = model.timings();

        if let Some(ref mut rst) = self.rst {
            rst.set_low().map_err(InitError::ResetPin)?;
            delay.delay_ms(RESET_DURATION_MS);
            rst.set_high().map_err(InitError::ResetPin)?;
            delay.delay_ms(RESET_DURATION_MS);
        }
        let mut fifo = CommandFifo::new(self.di);

        let clock = if self.board.has_external_clock() {
            HostCommand::ClockExternal
        } else {
            HostCommand::ClockInternal
        };
        let di = fifo.interface_mut();
        di.host_command(clock).map_err(InitError::Interface)?;
        di.host_command(HostCommand::Active)
            .map_err(InitError::Interface)?;
        delay.delay_ms(WAKE_SETTLE_MS);

        let attempts = self.presence_attempts;
        if !poll(attempts, delay, || di.read8(REG_ID).map(|id| id == CHIP_ID_SENTINEL))
            .map_err(InitError::Interface)?
        {
            error!("no EVE found: REG_ID never read {:#04x}", CHIP_ID_SENTINEL);
            return Err(InitError::NotDetected(DetectStage::Identity));
        }
        // ready once every engine bit has cleared
        if !poll(attempts, delay, || di.read16(REG_CPU_RESET).map(|r| r == 0))
            .map_err(InitError::Interface)?
        {
            error!("EVE found but its engines never left reset");
            return Err(InitError::NotDetected(DetectStage::CpuReset));
        }

        let chip_id = di.read32(REG_CHIP_ID).map_err(InitError::Interface)?;
        info!("chip id {:#010x}", chip_id);

        if di.read16(REG_CMD_READ).map_err(InitError::Interface)? == FAULT_SENTINEL {
            debug!("clearing fault left by a previous session");
            fifo.recover().map_err(InitError::Interface)?;
        }

        let di = fifo.interface_mut();
        debug!("system clock {} Hz", model.system_clock());
        di.write32(REG_FREQUENCY, model.system_clock())
            .map_err(InitError::Interface)?;
        display_off(di).map_err(InitError::Interface)?;

        if model.needs_external_init() {
            if EXT::PRESENT {
                debug!("configuring external panel controller");
                self.external
                    .init(delay)
                    .map_err(InitError::ExternalPanel)?;
            } else {
                warn!("{:?} needs an external panel hook, none given", model);
            }
        }

        write_timings(di, timings).map_err(InitError::Interface)?;

        di.write32(REG_CPU_RESET, u32::from(CPU_RESET_TOUCH))
            .map_err(InitError::Interface)?;
        delay.delay_ms(TOUCH_RESET_MS);
        di.write32(REG_CPU_RESET, 0).map_err(InitError::Interface)?;
        delay.delay_ms(TOUCH_RESET_MS);

        match self.touch {
            TouchKind::None => {}
            TouchKind::Resistive => {
                debug!("resistive touch");
                di.write16(REG_TOUCH_CONFIG, TOUCH_CONFIG_RESISTIVE)
                    .map_err(InitError::Interface)?;
            }
            TouchKind::Capacitive => {
                debug!("capacitive touch");
                di.write16(REG_TOUCH_CONFIG, model.capacitive_touch_config())
                    .map_err(InitError::Interface)?;
                if self.board == Board::Eve2 {
                    upload_if_given(
                        &mut fifo,
                        "Goodix config",
                        self.firmware.goodix_config,
                        delay,
                        self.poll_limit,
                    )?;
                }
                match model.touch_firmware() {
                    Some(TouchFirmwareKind::Ilitek) => {
                        upload_if_given(
                            &mut fifo,
                            "Ilitek firmware",
                            self.firmware.ilitek,
                            delay,
                            self.poll_limit,
                        )?;
                        calibration::calibrate_fixed(
                            fifo.interface_mut(),
                            timings.width,
                            timings.height,
                            ILITEK_TOUCH_RANGE,
                        )?;
                    }
                    Some(TouchFirmwareKind::Cypress) => {
                        upload_if_given(
                            &mut fifo,
                            "Cypress firmware",
                            self.firmware.cypress,
                            delay,
                            self.poll_limit,
                        )?;
                    }
                    None => {}
                }
            }
        }

        let di = fifo.interface_mut();
        finish_touch(di).map_err(InitError::Interface)?;

        di.write16(REG_GPIOX_DIR, 0xFFFF)
            .map_err(InitError::Interface)?;
        di.write16(REG_GPIOX, model.gpiox_final())
            .map_err(InitError::Interface)?;

        di.write16(REG_PWM_HZ, PWM_HZ).map_err(InitError::Interface)?;
        di.write8(REG_PWM_DUTY, self.backlight)
            .map_err(InitError::Interface)?;

        first_frame(di, timings.pclk).map_err(InitError::Interface)?;
        info!("{:?} up, {}x{}", model, timings.width, timings.height);

        Ok(Eve {
            fifo,
            info: DisplayInfo {
                width: timings.width,
                height: timings.height,
                h_offset: timings.h_offset,
                v_offset: timings.v_offset,
                touch: self.touch,
            },
            model,
            chip_id,
        })
    }
}

/// Calls `ready` up to `attempts` times, sleeping between failed polls.
fn poll<D, E, F>(attempts: u32, delay: &mut D, mut ready: F) -> Result<bool, E>
where
    D: DelayNs,
    F: FnMut() -> Result<bool, E>,
{
    for _ in 0..attempts {
        if ready()? {
            return Ok(true);
        }
        delay.delay_ms(PRESENCE_POLL_MS);
    }
    Ok(false)
}

fn display_off<DI: Interface>(di: &mut DI) -> Result<(), DI::Error> {
    let gpiox = di.read16(REG_GPIOX)?;
    di.write16(REG_GPIOX, gpiox & !GPIOX_DISP)?;
    di.write8(REG_PCLK, 0)
}

fn write_timings<DI: Interface>(di: &mut DI, t: &Timings) -> Result<(), DI::Error> {
    di.write16(REG_HCYCLE, t.hcycle)?;
    di.write16(REG_HOFFSET, t.hoffset)?;
    di.write16(REG_HSYNC0, t.hsync0)?;
    di.write16(REG_HSYNC1, t.hsync1)?;
    di.write16(REG_VCYCLE, t.vcycle)?;
    di.write16(REG_VOFFSET, t.voffset)?;
    di.write16(REG_VSYNC0, t.vsync0)?;
    di.write16(REG_VSYNC1, t.vsync1)?;
    di.write8(REG_SWIZZLE, t.swizzle)?;
    di.write8(REG_PCLK_POL, t.pclk_pol)?;
    di.write16(REG_HSIZE, t.hsize)?;
    di.write16(REG_VSIZE, t.vsize)?;
    di.write8(REG_CSPREAD, t.cspread)?;
    di.write8(REG_DITHER, t.dither)
}

fn finish_touch<DI: Interface>(di: &mut DI) -> Result<(), DI::Error> {
    di.write16(REG_TOUCH_RZTHRESH, TOUCH_RZTHRESH)?;
    di.write8(REG_TOUCH_MODE, TOUCH_MODE_CONTINUOUS)?;
    di.write8(REG_TOUCH_ADC_MODE, TOUCH_ADC_DIFFERENTIAL)?;
    di.write8(REG_TOUCH_OVERSAMPLE, TOUCH_OVERSAMPLE_MAX)
}

/// Blank screen written straight into display list RAM, then the pixel clock.
fn first_frame<DI: Interface>(di: &mut DI, pclk: u8) -> Result<(), DI::Error> {
    di.write32(RAM_DL, dl::clear_color(Rgb888::BLACK))?;
    di.write32(RAM_DL + 4, dl::clear(true, true, true))?;
    di.write32(RAM_DL + 8, dl::display())?;
    di.write8(REG_DLSWAP, DLSWAP_FRAME)?;
    // output starts here
    di.write8(REG_PCLK, pclk)
}

fn upload_if_given<DI, D>(
    fifo: &mut CommandFifo<DI>,
    what: &str,
    image: Option<&[u8]>,
    delay: &mut D,
    poll_limit: Option<u32>,
) -> Result<(), fifo::Error<DI::Error>>
where
    DI: Interface,
    D: DelayNs,
{
    match image {
        Some(image) => upload_touch_firmware(fifo, image, delay, &mut PollLimit(poll_limit)),
        None => {
            warn!("{} not supplied, touch may not work", what);
            Ok(())
        }
    }
}

/// [`Cancel`] for an optional poll budget.
struct PollLimit(Option<u32>);

impl Cancel for PollLimit {
    fn cancelled(&mut self) -> bool {
        match self.0 {
            None => false,
            Some(ref mut left) => {
                *left = left.saturating_sub(1);
                *left == 0
            }
        }
    }
}

/// Bring-up step that found no chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectStage {
    /// The identity register never showed the EVE signature.
    Identity,
    /// The chip answered but its engines never came out of reset.
    CpuReset,
}

#[derive(Debug)]
pub enum InitError<DIError, PinError, PanelError = core::convert::Infallible> {
    Interface(DIError),
    ResetPin(PinError),
    /// The [`ExternalPanel`] hook failed.
    ExternalPanel(PanelError),
    UnsupportedProfile(u8),
    NotDetected(DetectStage),
    /// A touch image upload ran out of polls, see [`Builder::poll_limit`].
    Cancelled,
    Calibration(SolveError),
}

impl<DIError, PinError, PanelError> From<fifo::Error<DIError>>
    for InitError<DIError, PinError, PanelError>
{
    fn from(value: fifo::Error<DIError>) -> Self {
        match value {
            fifo::Error::Interface(e) => InitError::Interface(e),
            fifo::Error::Cancelled => InitError::Cancelled,
        }
    }
}

impl<DIError, PinError, PanelError> From<CalibrationError<DIError>>
    for InitError<DIError, PinError, PanelError>
{
    fn from(value: CalibrationError<DIError>) -> Self {
        match value {
            CalibrationError::Interface(e) => InitError::Interface(e),
            CalibrationError::Cancelled => InitError::Cancelled,
            CalibrationError::Solve(e) => InitError::Calibration(e),
        }
    }
}

pub enum NoResetPin {}
impl digital::OutputPin for NoResetPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
impl digital::ErrorType for NoResetPin {
    type Error = core::convert::Infallible;
}
