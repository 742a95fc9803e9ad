//! Touch calibration.
//!
//! The touch engine maps raw readings to screen coordinates through a 2x3
//! affine matrix held in `REG_TOUCH_TRANSFORM_A..F`:
//!
//! ```text
//! screen_x = A * raw_x + B * raw_y + C
//! screen_y = D * raw_x + E * raw_y + F
//! ```
//!
//! The matrix is solved from three (screen, raw) pairs with Cramer's rule.
//! The three screen points must not be collinear.

use embedded_graphics_core::{
    geometry::Point,
    pixelcolor::{Rgb888, RgbColor},
};
use embedded_hal::delay::DelayNs;
use log::debug;

use crate::{
    commands::OPT_CENTER,
    display_list::{self as dl, Primitive},
    fifo::{self, Cancel, CommandFifo},
    fixed::Fixed16,
    interface::{Interface, InterfaceExt},
    registers::{REG_TOUCH_DIRECT_XY, REG_TOUCH_TRANSFORM_A},
    DisplayInfo,
};

/// Built-in font used for the calibration screen.
const FONT: u16 = 27;

/// Settle time after each calibration screen before sampling touches.
const SETTLE_MS: u32 = 300;

const LABELS: [&str; 3] = ["1", "2", "3"];

/// Set in `REG_TOUCH_DIRECT_XY` while nothing is touching the panel.
const NO_TOUCH: u32 = 1 << 31;

/// Why a transform could not be solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveError {
    /// The raw points are collinear, the system has no unique solution.
    Degenerate,
    /// A coefficient does not fit the 16.16 register format.
    Overflow,
}

/// Calibration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError<E> {
    /// Error caused by the interface.
    Interface(E),
    /// The [`Cancel`] token ended a wait.
    Cancelled,
    Solve(SolveError),
}

impl<E> From<SolveError> for CalibrationError<E> {
    fn from(value: SolveError) -> Self {
        Self::Solve(value)
    }
}

impl<E> From<fifo::Error<E>> for CalibrationError<E> {
    fn from(value: fifo::Error<E>) -> Self {
        match value {
            fifo::Error::Interface(e) => Self::Interface(e),
            fifo::Error::Cancelled => Self::Cancelled,
        }
    }
}

/// Raw touch to screen transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchTransform {
    coefficients: [Fixed16; 6],
}

impl TouchTransform {
    /// Solves the transform mapping each `touch[i]` onto `display[i]`.
    ///
    /// Coefficients are truncated toward zero.
    pub fn solve(display: &[Point; 3], touch: &[Point; 3]) -> Result<Self, SolveError> {
        let [dx0, dx1, dx2] = display.map(|p| i64::from(p.x));
        let [dy0, dy1, dy2] = display.map(|p| i64::from(p.y));
        let [tx0, tx1, tx2] = touch.map(|p| i64::from(p.x));
        let [ty0, ty1, ty2] = touch.map(|p| i64::from(p.y));

        let k = (tx0 - tx2) * (ty1 - ty2) - (tx1 - tx2) * (ty0 - ty2);
        if k == 0 {
            return Err(SolveError::Degenerate);
        }

        let row = |d0: i64, d1: i64, d2: i64| {
            [
                (d0 - d2) * (ty1 - ty2) - (d1 - d2) * (ty0 - ty2),
                (tx0 - tx2) * (d1 - d2) - (d0 - d2) * (tx1 - tx2),
                ty0 * (tx2 * d1 - tx1 * d2)
                    + ty1 * (tx0 * d2 - tx2 * d0)
                    + ty2 * (tx1 * d0 - tx0 * d1),
            ]
        };
        let [a, b, c] = row(dx0, dx1, dx2);
        let [d, e, f] = row(dy0, dy1, dy2);

        let mut coefficients = [Fixed16::ZERO; 6];
        for (out, numerator) in coefficients.iter_mut().zip([a, b, c, d, e, f]) {
            *out = Fixed16::from_ratio(numerator, k).ok_or(SolveError::Overflow)?;
        }
        Ok(Self { coefficients })
    }

    /// Builds a transform from raw register values, A first.
    pub fn from_coefficients(coefficients: [Fixed16; 6]) -> Self {
        Self { coefficients }
    }

    /// Coefficients A to F.
    pub fn coefficients(&self) -> &[Fixed16; 6] {
        &self.coefficients
    }

    /// Maps a raw touch reading to screen coordinates, rounding down.
    pub fn apply(&self, raw: Point) -> Point {
        let [a, b, c, d, e, f] = self.coefficients;
        let x = a.mul_int(raw.x) + b.mul_int(raw.y) + i64::from(c.to_bits());
        let y = d.mul_int(raw.x) + e.mul_int(raw.y) + i64::from(f.to_bits());
        Point::new((x >> 16) as i32, (y >> 16) as i32)
    }

    /// Installs the transform in the touch engine.
    pub fn write<DI: Interface>(&self, di: &mut DI) -> Result<(), DI::Error> {
        for (i, coefficient) in self.coefficients.iter().enumerate() {
            debug!("touch transform {}: {}", i, coefficient);
            di.write32(REG_TOUCH_TRANSFORM_A + 4 * i as u32, coefficient.to_bits() as u32)?;
        }
        Ok(())
    }

    /// Reads back the transform the touch engine is using.
    pub fn read<DI: Interface>(di: &mut DI) -> Result<Self, DI::Error> {
        let mut coefficients = [Fixed16::ZERO; 6];
        for (i, coefficient) in coefficients.iter_mut().enumerate() {
            let bits = di.read32(REG_TOUCH_TRANSFORM_A + 4 * i as u32)?;
            *coefficient = Fixed16::from_bits(bits as i32);
        }
        Ok(Self { coefficients })
    }
}

/// Corner points for a panel whose raw range is exactly linear over
/// `0..=touch_max` on both axes: top-left, top-right, bottom-right.
pub fn fixed_points(width: u16, height: u16, touch_max: (u16, u16)) -> ([Point; 3], [Point; 3]) {
    let (w, h) = (i32::from(width), i32::from(height));
    let (tx, ty) = (i32::from(touch_max.0), i32::from(touch_max.1));
    (
        [Point::new(0, 0), Point::new(w, 0), Point::new(w, h)],
        [Point::new(0, 0), Point::new(tx, 0), Point::new(tx, ty)],
    )
}

/// Solves and installs the transform for an assumed full-scale raw range.
pub fn calibrate_fixed<DI: Interface>(
    di: &mut DI,
    width: u16,
    height: u16,
    touch_max: (u16, u16),
) -> Result<TouchTransform, CalibrationError<DI::Error>> {
    let (display, touch) = fixed_points(width, height, touch_max);
    let transform = TouchTransform::solve(&display, &touch)?;
    transform.write(di).map_err(CalibrationError::Interface)?;
    Ok(transform)
}

/// Screen targets for interactive calibration, inset from the edges so they
/// can be hit reliably: (15%, 15%), (85%, 50%), (50%, 85%).
pub fn interactive_targets(display: &DisplayInfo) -> [Point; 3] {
    let (w, h) = (i32::from(display.width), i32::from(display.height));
    let (x0, y0) = (i32::from(display.h_offset), i32::from(display.v_offset));
    [
        Point::new(w * 15 / 100 + x0, h * 15 / 100 + y0),
        Point::new(w * 85 / 100 + x0, h / 2 + y0),
        Point::new(w / 2 + x0, h * 85 / 100 + y0),
    ]
}

fn draw_target<DI: Interface>(
    fifo: &mut CommandFifo<DI>,
    display: &DisplayInfo,
    target: Point,
    label: &str,
) -> Result<(), DI::Error> {
    let center_x = display.width / 2 + display.h_offset;

    fifo.dl_start()?;
    fifo.enqueue_words(&[
        dl::clear_color(Rgb888::BLACK),
        dl::clear(true, true, true),
        dl::color(Rgb888::RED),
        dl::point_size(20 * 16),
        dl::vertex_format(0),
        dl::begin(Primitive::Points),
        dl::vertex2f(target.x as i16, target.y as i16),
        dl::end(),
        dl::color(Rgb888::WHITE),
    ])?;
    fifo.text(
        center_x,
        display.height / 3 + display.v_offset,
        FONT,
        OPT_CENTER,
        "Calibrating",
    )?;
    fifo.text(
        center_x,
        display.height / 2 + display.v_offset,
        FONT,
        OPT_CENTER,
        "Please tap the dots",
    )?;
    fifo.text(target.x as u16, target.y as u16, FONT, OPT_CENTER, label)?;
    fifo.enqueue_word(dl::display())?;
    fifo.swap()?;
    fifo.publish()
}

/// Polls until the panel reports a touch, returning the raw 10-bit reading.
fn wait_for_touch<DI: Interface, C: Cancel>(
    di: &mut DI,
    cancel: &mut C,
) -> Result<Point, CalibrationError<DI::Error>> {
    loop {
        let xy = di
            .read32(REG_TOUCH_DIRECT_XY)
            .map_err(CalibrationError::Interface)?;
        if xy & NO_TOUCH == 0 {
            let x = (xy >> 16) & 0x3FF;
            let y = xy & 0x3FF;
            return Ok(Point::new(x as i32, y as i32));
        }
        if cancel.cancelled() {
            return Err(CalibrationError::Cancelled);
        }
    }
}

fn wait_for_release<DI: Interface, C: Cancel>(
    di: &mut DI,
    cancel: &mut C,
) -> Result<(), CalibrationError<DI::Error>> {
    loop {
        let xy = di
            .read32(REG_TOUCH_DIRECT_XY)
            .map_err(CalibrationError::Interface)?;
        if xy & NO_TOUCH != 0 {
            return Ok(());
        }
        if cancel.cancelled() {
            return Err(CalibrationError::Cancelled);
        }
    }
}

/// Shows three targets in turn, records where the user touched, then solves
/// and installs the transform.
///
/// Each target is drawn only once the coprocessor has consumed everything
/// already published.
pub fn calibrate_interactive<DI, D, C>(
    fifo: &mut CommandFifo<DI>,
    display: &DisplayInfo,
    delay: &mut D,
    cancel: &mut C,
) -> Result<TouchTransform, CalibrationError<DI::Error>>
where
    DI: Interface,
    D: DelayNs,
    C: Cancel,
{
    let targets = interactive_targets(display);
    let mut touches = [Point::zero(); 3];

    for (i, (target, touch)) in targets.iter().zip(touches.iter_mut()).enumerate() {
        fifo.wait_idle_with(cancel)?;
        draw_target(fifo, display, *target, LABELS[i]).map_err(CalibrationError::Interface)?;
        fifo.wait_idle_with(cancel)?;
        delay.delay_ms(SETTLE_MS);

        *touch = wait_for_touch(fifo.interface_mut(), cancel)?;
        debug!(
            "calibration point {}: screen ({}, {}) raw ({}, {})",
            i, target.x, target.y, touch.x, touch.y
        );
        wait_for_release(fifo.interface_mut(), cancel)?;
    }

    let transform = TouchTransform::solve(&targets, &touches)?;
    transform
        .write(fifo.interface_mut())
        .map_err(CalibrationError::Interface)?;
    Ok(transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        _mock::{MockDelay, MockEve},
        fifo::MaxPolls,
        models::TouchKind,
        registers::{RAM_CMD, REG_CMD_WRITE},
    };

    fn bits(t: &TouchTransform) -> [i32; 6] {
        t.coefficients().map(|c| c.to_bits())
    }

    fn info(width: u16, height: u16) -> DisplayInfo {
        DisplayInfo {
            width,
            height,
            h_offset: 0,
            v_offset: 0,
            touch: TouchKind::Resistive,
        }
    }

    #[test]
    fn solves_ten_bit_range_onto_800x480() {
        let display = [Point::new(0, 0), Point::new(800, 0), Point::new(800, 480)];
        let touch = [Point::new(0, 0), Point::new(1023, 0), Point::new(1023, 1023)];
        let t = TouchTransform::solve(&display, &touch).unwrap();

        // 800/1023 and 480/1023 in 16.16
        assert_eq!(bits(&t), [51250, 0, 0, 0, 30750, 0]);
        assert_eq!(t.apply(Point::new(1023, 1023)), Point::new(799, 479));
        assert_eq!(t.apply(Point::new(0, 0)), Point::new(0, 0));
    }

    #[test]
    fn recovers_known_affine_transform() {
        // x = 0.75 tx - 0.125 ty + 40, y = 0.0625 tx + 0.5 ty - 8
        let touch = [Point::new(64, 32), Point::new(960, 96), Point::new(512, 992)];
        let display = [Point::new(84, 12), Point::new(748, 100), Point::new(300, 520)];
        let t = TouchTransform::solve(&display, &touch).unwrap();

        let expected = [49152, -8192, 40 << 16, 4096, 32768, -8 << 16];
        for (got, want) in bits(&t).iter().zip(expected) {
            assert!((got - want).abs() <= 1, "{} vs {}", got, want);
        }
        for (d, r) in display.iter().zip(touch) {
            assert_eq!(t.apply(r), *d);
        }
    }

    #[test]
    fn collinear_points_are_rejected() {
        let display = [Point::new(0, 0), Point::new(10, 10), Point::new(20, 20)];
        let touch = [Point::new(0, 0), Point::new(100, 100), Point::new(200, 200)];
        assert_eq!(
            TouchTransform::solve(&display, &touch),
            Err(SolveError::Degenerate)
        );
    }

    #[test]
    fn huge_gain_overflows() {
        let display = [Point::new(0, 0), Point::new(100_000, 0), Point::new(100_000, 100_000)];
        let touch = [Point::new(0, 0), Point::new(1, 0), Point::new(1, 1)];
        assert_eq!(
            TouchTransform::solve(&display, &touch),
            Err(SolveError::Overflow)
        );
    }

    #[test]
    fn fixed_calibration_writes_six_registers() {
        let mut mock = MockEve::new();
        let t = calibrate_fixed(&mut mock, 1024, 600, (16384, 16384)).unwrap();

        assert_eq!(bits(&t), [4096, 0, 0, 0, 2400, 0]);
        for (i, want) in bits(&t).iter().enumerate() {
            assert_eq!(mock.peek32(REG_TOUCH_TRANSFORM_A + 4 * i as u32), *want as u32);
        }
        assert_eq!(TouchTransform::read(&mut mock).unwrap(), t);
        assert_eq!(mock.log.len(), 6);
    }

    #[test]
    fn targets_are_inset_and_offset() {
        let mut display = info(480, 128);
        display.v_offset = 126;
        assert_eq!(
            interactive_targets(&display),
            [Point::new(72, 19 + 126), Point::new(408, 64 + 126), Point::new(240, 108 + 126)]
        );
    }

    #[test]
    fn interactive_captures_three_points() {
        let display = info(800, 480);
        let targets = interactive_targets(&display);
        // raw = screen * 1.25 for both axes
        let mut mock = MockEve::new();
        for t in targets {
            let raw = ((t.x * 5 / 4) as u32) << 16 | (t.y * 5 / 4) as u32;
            mock.touches.extend([NO_TOUCH, NO_TOUCH, raw, raw, NO_TOUCH]);
        }

        let mut fifo = CommandFifo::new(mock);
        let mut delay = MockDelay::default();
        let t = calibrate_interactive(&mut fifo, &display, &mut delay, &mut fifo::Forever)
            .unwrap();

        assert_eq!(bits(&t), [52428, 0, 0, 0, 52428, 0]);
        assert_eq!(delay.total_ms(), 3 * u64::from(SETTLE_MS));
        let mock = fifo.release();
        assert!(mock.touches.is_empty());
        assert_eq!(mock.peek32(REG_TOUCH_TRANSFORM_A), 52428);
    }

    #[test]
    fn interactive_can_be_cancelled_while_waiting_for_touch() {
        let mut fifo = CommandFifo::new(MockEve::new());
        let mut delay = MockDelay::default();
        let result =
            calibrate_interactive(&mut fifo, &info(480, 272), &mut delay, &mut MaxPolls(20));
        assert_eq!(result, Err(CalibrationError::Cancelled));
        assert_eq!(fifo.release().touch_reads, 20);
    }

    #[test]
    fn interactive_waits_for_pending_commands_before_drawing() {
        let mut fifo = CommandFifo::new(MockEve::stalled());
        fifo.enqueue_words(&[0xA000_0000; 1008]).unwrap();
        fifo.publish().unwrap();

        let mut delay = MockDelay::default();
        let result =
            calibrate_interactive(&mut fifo, &info(480, 272), &mut delay, &mut MaxPolls(5));
        assert_eq!(result, Err(CalibrationError::Cancelled));
        assert_eq!(fifo.write_cursor(), 4032);
        assert_eq!(fifo.published_cursor(), 4032);

        // the unconsumed commands are intact and nothing else was written
        let mock = fifo.release();
        assert_eq!(mock.peek32(RAM_CMD), 0xA000_0000);
        assert_eq!(mock.peek32(RAM_CMD + 4028), 0xA000_0000);
        assert_eq!(mock.peek32(RAM_CMD + 4032), 0);
        assert_eq!(mock.writes_to(REG_CMD_WRITE).len(), 1);
        assert_eq!(mock.touch_reads, 0);
    }
}
