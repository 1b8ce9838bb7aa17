//! ILI9341 protocol definitions and encoding.
//!
//! Protocol structure:
//! - Every command is a single opcode byte sent with D/C low
//! - Parameters and pixel data follow with D/C high
//! - Pixels are RGB565, big-endian on the wire
//! - A pixel transfer is CASET + PASET + RAMWR, then the pixel stream

use std::ops::Range;

use crate::{LCD_HEIGHT, LCD_WIDTH};

/// Bytes per pixel (RGB565).
pub const BYTES_PER_PIXEL: usize = 2;

/// Size of one full frame in bytes.
pub const FRAME_BYTES: usize = LCD_WIDTH as usize * LCD_HEIGHT as usize * BYTES_PER_PIXEL;

/// Maximum payload of a single SPI transaction.
pub const MAX_TRANSACTION_BYTES: usize = 4094;

/// Number of chunks for a full screen send.
pub const FULL_FRAME_CHUNK_COUNT: usize = 40;

/// Size of each full screen chunk (8 rows: 240 * 8 * 2 = 3840).
pub const FULL_FRAME_CHUNK_SIZE: usize = FRAME_BYTES / FULL_FRAME_CHUNK_COUNT;

const _: () = assert!(FULL_FRAME_CHUNK_SIZE * FULL_FRAME_CHUNK_COUNT == FRAME_BYTES);
const _: () = assert!(FULL_FRAME_CHUNK_SIZE <= MAX_TRANSACTION_BYTES);
const _: () = assert!(FULL_FRAME_CHUNK_SIZE % BYTES_PER_PIXEL == 0);

/// Settle time after driving the reset line high.
pub const RESET_SETTLE_MS: u32 = 10;

/// Settle time between SLEEP_OUT and DISPLAY_ON.
pub const SLEEP_OUT_SETTLE_MS: u32 = 120;

/// ILI9341 command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Nop = 0x00,
    Reset = 0x01,
    ReadDisplayIdentification = 0x04,
    ReadDisplayStatus = 0x09,
    ReadDisplayPowerMode = 0x0A,
    ReadDisplayMadctl = 0x0B,
    ReadDisplayPixelFormat = 0x0C,
    ReadDisplayImageFormat = 0x0D,
    ReadDisplaySignalMode = 0x0E,
    ReadDisplaySelfDiagnostic = 0x0F,
    EnterSleepMode = 0x10,
    SleepOut = 0x11,
    PartialModeOn = 0x12,
    NormalDisplayModeOn = 0x13,
    DisplayInversionOff = 0x20,
    DisplayInversionOn = 0x21,
    SetGamma = 0x26,
    DisplayOff = 0x28,
    DisplayOn = 0x29,
    /// Column address set.
    ColumnAddr = 0x2A,
    /// Page (row) address set.
    PageAddr = 0x2B,
    /// Memory write; pixel data follows.
    WriteRam = 0x2C,
    ColorSet = 0x2D,
    MemoryRead = 0x2E,
    PartialArea = 0x30,
    VerticalScrollingDefinition = 0x33,
    TearingEffectLineOff = 0x34,
    TearingEffectLineOn = 0x35,
    MemoryAccessControl = 0x36,
    VerticalScrollingStartAddress = 0x37,
    IdleModeOff = 0x38,
    IdleModeOn = 0x39,
    PixelFormat = 0x3A,
    /// Write memory continue.
    Wmc = 0x3C,
    /// Read memory continue.
    Rmc = 0x3E,
    SetTearScanline = 0x44,
    /// Write display brightness.
    Wdb = 0x51,
    ReadDisplayBrightness = 0x52,
    /// Write CTRL display.
    Wcd = 0x53,
    ReadCtrlDisplay = 0x54,
    /// Write content adaptive brightness control.
    Wcabc = 0x55,
    Rcabc = 0x56,
    Wcabcmb = 0x5E,
    Rcabcmb = 0x5F,
    RgbInterface = 0xB0,
    FrameRateControl = 0xB1,
    FrameCtrlNormal = 0xB2,
    FrameCtrlIdle = 0xB3,
    FrameCtrlPartial = 0xB4,
    /// Blanking porch control.
    Bpc = 0xB5,
    DisplayFunctionControl = 0xB6,
    EntryModeSet = 0xB7,
    BacklightControl1 = 0xB8,
    BacklightControl2 = 0xB9,
    BacklightControl3 = 0xBA,
    BacklightControl4 = 0xBB,
    BacklightControl5 = 0xBC,
    BacklightControl6 = 0xBD,
    BacklightControl7 = 0xBE,
    BacklightControl8 = 0xBF,
    Power1 = 0xC0,
    Power2 = 0xC1,
    Vcom1 = 0xC5,
    Vcom2 = 0xC7,
    PowerA = 0xCB,
    PowerB = 0xCF,
    ReadId1 = 0xDA,
    ReadId2 = 0xDB,
    ReadId3 = 0xDC,
    PositiveGammaCorrection = 0xE0,
    NegativeGammaCorrection = 0xE1,
    /// Driver timing control A.
    Dtca = 0xE8,
    /// Driver timing control B.
    Dtcb = 0xEA,
    PowerSequence = 0xED,
    Enable3Gamma = 0xF2,
    Interface = 0xF6,
    /// Pump ratio control.
    Prc = 0xF7,
}

impl Command {
    /// Returns the opcode byte.
    pub const fn opcode(self) -> u8 {
        self as u8
    }
}

/// One step of the panel bring-up sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStep {
    /// Send a command followed by its parameter bytes.
    Command(Command, &'static [u8]),
    /// Blocking wait before the next step may run.
    Delay(u32),
}

/// Panel initialization sequence. Must be replayed byte for byte.
pub const INIT_SEQUENCE: &[InitStep] = &[
    InitStep::Command(Command::Power1, &[0x23]),
    InitStep::Command(Command::Power2, &[0x10]),
    InitStep::Command(Command::Vcom1, &[0x3E, 0x28]),
    InitStep::Command(Command::Vcom2, &[0x86]),
    // Bottom right start, RGB color filter panel
    InitStep::Command(Command::MemoryAccessControl, &[0x08]),
    // 65K color: 16-bit/pixel
    InitStep::Command(Command::PixelFormat, &[0x55]),
    InitStep::Command(Command::DisplayInversionOff, &[]),
    InitStep::Command(Command::FrameRateControl, &[0x00, 0x18]),
    // REV:1 GS:0 SS:0 SM:0
    InitStep::Command(Command::DisplayFunctionControl, &[0x08, 0xA2, 0x27, 0x00]),
    InitStep::Command(Command::SetGamma, &[0x01]),
    InitStep::Command(
        Command::PositiveGammaCorrection,
        &[
            0x0F, 0x31, 0x2B, 0x0C, 0x0E, 0x08, 0x4E, 0xF1, 0x37, 0x07, 0x10, 0x03, 0x0E, 0x09,
            0x00,
        ],
    ),
    InitStep::Command(
        Command::NegativeGammaCorrection,
        &[
            0x00, 0x0E, 0x14, 0x03, 0x11, 0x07, 0x31, 0xC1, 0x48, 0x08, 0x0F, 0x0C, 0x31, 0x36,
            0x0F,
        ],
    ),
    InitStep::Command(Command::SleepOut, &[]),
    InitStep::Delay(SLEEP_OUT_SETTLE_MS),
    InitStep::Command(Command::DisplayOn, &[]),
];

/// Encodes an inclusive address range as the 4-byte CASET/PASET payload.
pub fn build_window_params(start: u16, end: u16) -> [u8; 4] {
    let [s_hi, s_lo] = start.to_be_bytes();
    let [e_hi, e_lo] = end.to_be_bytes();
    [s_hi, s_lo, e_hi, e_lo]
}

/// Byte ranges of a full frame send.
pub fn full_frame_chunks() -> impl Iterator<Item = Range<usize>> {
    (0..FULL_FRAME_CHUNK_COUNT)
        .map(|i| i * FULL_FRAME_CHUNK_SIZE..(i + 1) * FULL_FRAME_CHUNK_SIZE)
}

/// Splits `total_bytes` of pixel data into transactions.
///
/// `limit` is the largest whole-pixel count strictly under `ceiling` bytes,
/// and the chunk count is the fewest chunks of at most `limit` pixels. Chunks
/// hold whole pixels and differ by at most one pixel; the ranges cover
/// `0..total_bytes` exactly.
pub fn chunk_plan(total_bytes: usize, ceiling: usize) -> Vec<Range<usize>> {
    let pixels = total_bytes / BYTES_PER_PIXEL;
    let limit = (ceiling.saturating_sub(1) / BYTES_PER_PIXEL).max(1);
    if pixels == 0 {
        return Vec::new();
    }

    let count = pixels.div_ceil(limit);
    let base = pixels / count;
    let extra = pixels % count;

    let mut chunks = Vec::with_capacity(count);
    let mut start = 0;
    for i in 0..count {
        let len = (base + usize::from(i < extra)) * BYTES_PER_PIXEL;
        if len == 0 {
            continue;
        }
        chunks.push(start..start + len);
        start += len;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_sequence_order() {
        let opcodes: Vec<u8> = INIT_SEQUENCE
            .iter()
            .filter_map(|step| match step {
                InitStep::Command(cmd, _) => Some(cmd.opcode()),
                InitStep::Delay(_) => None,
            })
            .collect();
        assert_eq!(
            opcodes,
            vec![0xC0, 0xC1, 0xC5, 0xC7, 0x36, 0x3A, 0x20, 0xB1, 0xB6, 0x26, 0xE0, 0xE1, 0x11, 0x29]
        );
    }

    #[test]
    fn test_sleep_out_settle_precedes_display_on() {
        let len = INIT_SEQUENCE.len();
        assert_eq!(INIT_SEQUENCE[len - 3], InitStep::Command(Command::SleepOut, &[]));
        assert_eq!(INIT_SEQUENCE[len - 2], InitStep::Delay(120));
        assert_eq!(INIT_SEQUENCE[len - 1], InitStep::Command(Command::DisplayOn, &[]));
    }

    #[test]
    fn test_gamma_payloads() {
        let payload = |target: Command| {
            INIT_SEQUENCE.iter().find_map(|step| match step {
                InitStep::Command(cmd, data) if *cmd == target => Some(*data),
                _ => None,
            })
        };
        let positive = payload(Command::PositiveGammaCorrection).unwrap();
        let negative = payload(Command::NegativeGammaCorrection).unwrap();
        assert_eq!(positive.len(), 15);
        assert_eq!(negative.len(), 15);
        assert_eq!(positive[7], 0xF1);
        assert_eq!(negative[7], 0xC1);
        assert_eq!(payload(Command::DisplayFunctionControl).unwrap(), &[0x08, 0xA2, 0x27, 0x00]);
    }

    #[test]
    fn test_window_params() {
        assert_eq!(build_window_params(0, 239), [0x00, 0x00, 0x00, 0xEF]);
        assert_eq!(build_window_params(0x0102, 0x013F), [0x01, 0x02, 0x01, 0x3F]);
    }

    #[test]
    fn test_full_frame_chunks() {
        let chunks: Vec<_> = full_frame_chunks().collect();
        assert_eq!(chunks.len(), 40);
        assert!(chunks.iter().all(|c| c.len() == 3840));
        assert_eq!(chunks.last().unwrap().end, FRAME_BYTES);
    }

    #[test]
    fn test_chunk_plan_accounts_for_every_byte() {
        for (w, h) in [
            (1, 1),
            (3, 7),
            (100, 148),
            (170, 18),
            (239, 319),
            (45, 91),
            (2046, 1),
            (2047, 1),
            (4093, 1),
        ] {
            let total = w * h * BYTES_PER_PIXEL;
            let chunks = chunk_plan(total, MAX_TRANSACTION_BYTES);
            let sum: usize = chunks.iter().map(|c| c.len()).sum();
            assert_eq!(sum, total, "{}x{}", w, h);
            assert!(
                chunks.iter().all(|c| c.len() < MAX_TRANSACTION_BYTES),
                "{}x{}: {:?}",
                w,
                h,
                chunks
            );
            assert!(chunks.iter().all(|c| c.len() % BYTES_PER_PIXEL == 0));
            // Contiguous and ordered
            for pair in chunks.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
            assert_eq!(chunks[0].start, 0);
        }
    }

    #[test]
    fn test_chunk_plan_odd_remainder_not_dropped() {
        // 101 * 41 pixels do not split evenly into 3 chunks
        let total = 101 * 41 * 2;
        let chunks = chunk_plan(total, MAX_TRANSACTION_BYTES);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.last().unwrap().end, total);
    }

    #[test]
    fn test_chunk_plan_never_reaches_ceiling() {
        // 4093 pixels would split 2047 + 2046 at the ceiling itself
        let chunks = chunk_plan(4093 * 2, MAX_TRANSACTION_BYTES);
        let sizes: Vec<_> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![2730, 2728, 2728]);

        // Largest single chunk sits one pixel under the ceiling
        assert_eq!(chunk_plan(2046 * 2, MAX_TRANSACTION_BYTES), vec![0..4092]);
        assert_eq!(chunk_plan(2047 * 2, MAX_TRANSACTION_BYTES).len(), 2);
    }

    #[test]
    fn test_chunk_plan_empty() {
        assert!(chunk_plan(0, MAX_TRANSACTION_BYTES).is_empty());
    }
}
