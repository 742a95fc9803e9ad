//! Supported panels, boards and touch technologies.

/// Panel timing and geometry, written verbatim into the timing registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Visible width in pixels.
    pub width: u16,
    /// Visible height in pixels.
    pub height: u16,
    /// Horizontal offset of the visible area inside `hsize`.
    pub h_offset: u16,
    /// Vertical offset of the visible area inside `vsize`.
    pub v_offset: u16,
    pub hcycle: u16,
    pub hoffset: u16,
    pub hsync0: u16,
    pub hsync1: u16,
    pub vcycle: u16,
    pub voffset: u16,
    pub vsync0: u16,
    pub vsync1: u16,
    /// Pixel clock divisor. Written last; 0 keeps the output off.
    pub pclk: u8,
    pub swizzle: u8,
    pub pclk_pol: u8,
    pub hsize: u16,
    pub vsize: u16,
    pub cspread: u8,
    pub dither: u8,
}

/// Displays with a known timing profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelModel {
    Display70_800x480,
    Display70_800x480Wg,
    Display50_800x480,
    Display43_480x272,
    Display43_800x480,
    Display39_480x128,
    Display38_480x116,
    Display35_320x240,
    Display29_320x102,
    Display40_720x720,
    Display101_1280x800,
    Display70_1024x600,
    Display70_1024x600Wg,
    /// Needs its external panel controller configured, see
    /// [`ExternalPanel`](crate::ExternalPanel).
    Display24_320x240,
    Display52_480x128,
    Display101_1024x600Ili,
    Display101_1024x600Gix,
}

const T_800X480: Timings = Timings {
    width: 800,
    height: 480,
    h_offset: 0,
    v_offset: 0,
    hcycle: 928,
    hoffset: 88,
    hsync0: 0,
    hsync1: 48,
    vcycle: 525,
    voffset: 32,
    vsync0: 0,
    vsync1: 3,
    pclk: 2,
    swizzle: 0,
    pclk_pol: 1,
    hsize: 800,
    vsize: 480,
    cspread: 0,
    dither: 1,
};

const T_43_480X272: Timings = Timings {
    width: 480,
    height: 272,
    h_offset: 0,
    v_offset: 0,
    hcycle: 548,
    hoffset: 43,
    hsync0: 0,
    hsync1: 41,
    vcycle: 292,
    voffset: 12,
    vsync0: 0,
    vsync1: 10,
    pclk: 5,
    swizzle: 0,
    pclk_pol: 1,
    hsize: 480,
    vsize: 272,
    cspread: 1,
    dither: 1,
};

const T_43_800X480: Timings = Timings {
    hcycle: 977,
    hoffset: 176,
    hsync0: 40,
    hsync1: 88,
    vcycle: 529,
    voffset: 48,
    vsync0: 13,
    vsync1: 16,
    ..T_800X480
};

const T_39_480X128: Timings = Timings {
    width: 480,
    height: 128,
    h_offset: 0,
    v_offset: 126,
    hcycle: 552,
    hoffset: 71,
    hsync0: 28,
    hsync1: 44,
    vcycle: 308,
    voffset: 35,
    vsync0: 8,
    vsync1: 11,
    pclk: 6,
    swizzle: 0,
    pclk_pol: 1,
    hsize: 480,
    vsize: 272,
    cspread: 0,
    dither: 1,
};

const T_38_480X116: Timings = Timings {
    width: 480,
    height: 116,
    h_offset: 0,
    v_offset: 156,
    hcycle: 527,
    hoffset: 46,
    hsync0: 1,
    hsync1: 3,
    vcycle: 291,
    voffset: 18,
    vsync0: 4,
    vsync1: 6,
    pclk: 5,
    swizzle: 0,
    pclk_pol: 1,
    hsize: 480,
    vsize: 272,
    cspread: 1,
    dither: 1,
};

const T_35_320X240: Timings = Timings {
    width: 320,
    height: 240,
    h_offset: 0,
    v_offset: 0,
    hcycle: 408,
    hoffset: 68,
    hsync0: 0,
    hsync1: 10,
    vcycle: 262,
    voffset: 18,
    vsync0: 0,
    vsync1: 2,
    pclk: 8,
    swizzle: 0,
    pclk_pol: 0,
    hsize: 320,
    vsize: 240,
    cspread: 1,
    dither: 1,
};

const T_29_320X102: Timings = Timings {
    width: 320,
    height: 105,
    h_offset: 0,
    v_offset: 135,
    hcycle: 429,
    hoffset: 108,
    hsync0: 20,
    hsync1: 40,
    vcycle: 283,
    voffset: 42,
    vsync0: 4,
    vsync1: 24,
    pclk: 9,
    swizzle: 0,
    pclk_pol: 1,
    hsize: 320,
    vsize: 240,
    cspread: 0,
    dither: 1,
};

const T_40_720X720: Timings = Timings {
    width: 720,
    height: 720,
    h_offset: 0,
    v_offset: 0,
    hcycle: 812,
    hoffset: 91,
    hsync0: 46,
    hsync1: 48,
    vcycle: 756,
    voffset: 35,
    vsync0: 16,
    vsync1: 18,
    pclk: 2,
    swizzle: 0,
    pclk_pol: 1,
    hsize: 720,
    vsize: 720,
    cspread: 0,
    dither: 0,
};

const T_101_1280X800: Timings = Timings {
    width: 1280,
    height: 800,
    h_offset: 0,
    v_offset: 0,
    hcycle: 1440,
    hoffset: 158,
    hsync0: 78,
    hsync1: 80,
    vcycle: 823,
    voffset: 22,
    vsync0: 11,
    vsync1: 12,
    pclk: 1,
    swizzle: 0,
    pclk_pol: 0,
    hsize: 1280,
    vsize: 800,
    cspread: 0,
    dither: 1,
};

const T_70_1024X600: Timings = Timings {
    width: 1024,
    height: 600,
    h_offset: 0,
    v_offset: 0,
    hcycle: 1344,
    hoffset: 319,
    hsync0: 12,
    hsync1: 230,
    vcycle: 635,
    voffset: 34,
    vsync0: 12,
    vsync1: 22,
    pclk: 1,
    swizzle: 0,
    pclk_pol: 1,
    hsize: 1024,
    vsize: 600,
    cspread: 0,
    dither: 1,
};

// Portrait panel, width and height as scanned.
const T_24_320X240: Timings = Timings {
    width: 240,
    height: 320,
    h_offset: 0,
    v_offset: 0,
    hcycle: 298,
    hoffset: 57,
    hsync0: 38,
    hsync1: 48,
    vcycle: 336,
    voffset: 15,
    vsync0: 8,
    vsync1: 8,
    pclk: 6,
    swizzle: 0,
    pclk_pol: 0,
    hsize: 240,
    vsize: 320,
    cspread: 1,
    dither: 1,
};

const T_52_480X128: Timings = Timings {
    width: 480,
    height: 128,
    h_offset: 0,
    v_offset: 68,
    hcycle: 536,
    hoffset: 55,
    hsync0: 8,
    hsync1: 12,
    vcycle: 297,
    voffset: 24,
    vsync0: 8,
    vsync1: 12,
    pclk: 6,
    swizzle: 0,
    pclk_pol: 1,
    hsize: 480,
    vsize: 272,
    cspread: 0,
    dither: 1,
};

const T_101_1024X600: Timings = Timings {
    hcycle: 1353,
    hoffset: 328,
    hsync0: 160,
    hsync1: 168,
    vcycle: 644,
    voffset: 43,
    vsync0: 12,
    vsync1: 20,
    ..T_70_1024X600
};

const ALL_MODELS: [PanelModel; 17] = [
    PanelModel::Display70_800x480,
    PanelModel::Display70_800x480Wg,
    PanelModel::Display50_800x480,
    PanelModel::Display43_480x272,
    PanelModel::Display43_800x480,
    PanelModel::Display39_480x128,
    PanelModel::Display38_480x116,
    PanelModel::Display35_320x240,
    PanelModel::Display29_320x102,
    PanelModel::Display40_720x720,
    PanelModel::Display101_1280x800,
    PanelModel::Display70_1024x600,
    PanelModel::Display70_1024x600Wg,
    PanelModel::Display24_320x240,
    PanelModel::Display52_480x128,
    PanelModel::Display101_1024x600Ili,
    PanelModel::Display101_1024x600Gix,
];

impl PanelModel {
    /// Looks up a model by its numeric selector (declaration order, from 0).
    pub fn from_id(id: u8) -> Option<Self> {
        ALL_MODELS.get(usize::from(id)).copied()
    }

    /// Numeric selector accepted by [`from_id`](Self::from_id).
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn timings(self) -> &'static Timings {
        use PanelModel::*;
        match self {
            Display70_800x480 | Display70_800x480Wg | Display50_800x480 => &T_800X480,
            Display43_480x272 => &T_43_480X272,
            Display43_800x480 => &T_43_800X480,
            Display39_480x128 => &T_39_480X128,
            Display38_480x116 => &T_38_480X116,
            Display35_320x240 => &T_35_320X240,
            Display29_320x102 => &T_29_320X102,
            Display40_720x720 => &T_40_720X720,
            Display101_1280x800 => &T_101_1280X800,
            Display70_1024x600 | Display70_1024x600Wg => &T_70_1024X600,
            Display24_320x240 => &T_24_320X240,
            Display52_480x128 => &T_52_480X128,
            Display101_1024x600Ili | Display101_1024x600Gix => &T_101_1024X600,
        }
    }

    /// System clock in Hz. Only the largest panel needs the fast clock.
    pub fn system_clock(self) -> u32 {
        match self {
            PanelModel::Display101_1280x800 => 80_000_000,
            _ => 60_000_000,
        }
    }

    /// `REG_GPIOX` once bring-up completes: speaker on, motor off.
    ///
    /// The motor output is active high on the 10.1" 1280x800 board and active
    /// low everywhere else.
    pub fn gpiox_final(self) -> u16 {
        match self {
            PanelModel::Display101_1280x800 => 0x80F7,
            _ => 0x80FF,
        }
    }

    /// Capacitive `REG_TOUCH_CONFIG` value for this panel's controller.
    pub fn capacitive_touch_config(self) -> u16 {
        match self {
            PanelModel::Display40_720x720 => 0x0480,
            _ => 0x05D0,
        }
    }

    /// Touch controller firmware this panel needs after bring-up, if any.
    pub fn touch_firmware(self) -> Option<TouchFirmwareKind> {
        use PanelModel::*;
        match self {
            Display70_1024x600Wg | Display70_800x480Wg | Display101_1024x600Ili => {
                Some(TouchFirmwareKind::Ilitek)
            }
            Display52_480x128 => Some(TouchFirmwareKind::Cypress),
            _ => None,
        }
    }

    /// `true` for panels driven through a controller the EVE does not
    /// configure by itself.
    pub fn needs_external_init(self) -> bool {
        matches!(self, PanelModel::Display24_320x240)
    }
}

/// Touch controller firmware families uploaded during bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchFirmwareKind {
    /// Followed by a fixed calibration over the full raw range.
    Ilitek,
    Cypress,
}

/// Raw coordinate range reported by panels running the Ilitek firmware.
pub const ILITEK_TOUCH_RANGE: (u16, u16) = (16384, 16384);

/// Board revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Board {
    Eve2,
    Eve3,
    Eve4,
}

impl Board {
    /// EVE3 and later carry an external crystal.
    pub fn has_external_clock(self) -> bool {
        self >= Board::Eve3
    }
}

/// Touch technology fitted to the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchKind {
    None,
    Resistive,
    Capacitive,
}
