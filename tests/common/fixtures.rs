use foodscan::detection::ocr::{DigitRecognizer, PageLayout};
use foodscan::detection::symbology::{DecodedSymbol, SymbolDecoder};
use foodscan::{check_digit, validate_barcode, Detection, PipelineContext, PipelineStep};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use rxing::{BarcodeFormat, MultiFormatWriter, Writer};
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

/// Append the check digit to a 12-digit payload
pub fn ean13(payload: &str) -> String {
    let digit = check_digit(payload).expect("payload must be digits");
    format!("{}{}", payload, digit)
}

const L_CODES: [&str; 10] = [
    "0001101", "0011001", "0010011", "0111101", "0100011",
    "0110001", "0101111", "0111011", "0110111", "0001011",
];
const G_CODES: [&str; 10] = [
    "0100111", "0110011", "0011011", "0100001", "0011101",
    "0111001", "0000101", "0010001", "0001001", "0010111",
];
const R_CODES: [&str; 10] = [
    "1110010", "1100110", "1101100", "1000010", "1011100",
    "1001110", "1010000", "1000100", "1001000", "1110100",
];
/// Left-half parity pattern selected by the first digit
const PARITY: [&str; 10] = [
    "LLLLLL", "LLGLGG", "LLGGLG", "LLGGGL", "LGLLGG",
    "LGGLLG", "LGGGLL", "LGLGLG", "LGLGGL", "LGGLGL",
];

/// Module pattern ('1' = bar) of a 13-digit EAN code, 95 modules long
pub fn ean13_modules(code: &str) -> String {
    let digits: Vec<usize> = code
        .bytes()
        .map(|b| (b - b'0') as usize)
        .collect();
    assert_eq!(digits.len(), 13, "EAN-13 needs 13 digits");

    let mut modules = String::from("101");
    for (i, parity) in PARITY[digits[0]].chars().enumerate() {
        let d = digits[i + 1];
        modules.push_str(if parity == 'L' { L_CODES[d] } else { G_CODES[d] });
    }
    modules.push_str("01010");
    for &d in &digits[7..] {
        modules.push_str(R_CODES[d]);
    }
    modules.push_str("101");
    modules
}

/// Render black bars on white with a 12-module quiet zone on both sides
pub fn render_ean13(code: &str, module_px: u32, height: u32) -> GrayImage {
    let modules: Vec<bool> = ean13_modules(code).chars().map(|c| c == '1').collect();
    let quiet = 12;
    let width = (modules.len() as u32 + 2 * quiet) * module_px;
    let margin = height / 10;

    GrayImage::from_fn(width, height, |x, y| {
        let m = x / module_px;
        let bar = y >= margin
            && y < height - margin
            && m >= quiet
            && modules.get((m - quiet) as usize).copied().unwrap_or(false);
        Luma([if bar { 0 } else { 255 }])
    })
}

/// Render any symbology rxing can write, black on white
pub fn render_symbol(contents: &str, format: BarcodeFormat, width: u32, height: u32) -> GrayImage {
    let matrix = MultiFormatWriter
        .encode(contents, &format, width as i32, height as i32)
        .expect("Failed to encode test symbol");
    GrayImage::from_fn(matrix.getWidth(), matrix.getHeight(), |x, y| {
        Luma([if matrix.get(x, y) { 0 } else { 255 }])
    })
}

/// Encode an image as PNG bytes
pub fn png_bytes(img: &DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .expect("Failed to encode test image");
    buf.into_inner()
}

/// Encode an image as JPEG with an EXIF APP1 segment carrying `orientation`
pub fn jpeg_with_orientation(img: &DynamicImage, orientation: u16) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg)
        .expect("Failed to encode test image");
    let jpeg = buf.into_inner();

    // Big-endian TIFF header and a single IFD entry: tag 0x0112, SHORT, count 1
    let mut tiff = vec![b'M', b'M', 0x00, 0x2A, 0, 0, 0, 8, 0x00, 0x01, 0x01, 0x12, 0x00, 0x03, 0, 0, 0, 1];
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0, 0, 0, 0, 0, 0]);

    let mut segment = vec![0xFF, 0xE1];
    segment.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    segment.extend_from_slice(b"Exif\0\0");
    segment.extend_from_slice(&tiff);

    // Right after the SOI marker
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&segment);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Plain light-gray image with nothing to find
pub fn blank_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([230u8])))
}

/// Recognizer that returns the same text for every call and counts them
pub struct FixedRecognizer {
    text: String,
    calls: AtomicUsize,
}

impl FixedRecognizer {
    pub fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DigitRecognizer for FixedRecognizer {
    fn recognize(&self, _image: &GrayImage, _layout: PageLayout) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

/// Recognizer whose engine never loads
pub struct UnavailableRecognizer;

impl DigitRecognizer for UnavailableRecognizer {
    fn recognize(&self, _image: &GrayImage, _layout: PageLayout) -> anyhow::Result<String> {
        anyhow::bail!("recognize called on an unavailable engine")
    }

    fn warm_up(&self) -> anyhow::Result<()> {
        anyhow::bail!("OCR models not found")
    }
}

/// Decoder that reports a fixed symbol (or none)
pub struct FixedDecoder {
    symbol: Option<DecodedSymbol>,
}

impl FixedDecoder {
    pub fn found(payload: &str, format: &str) -> Arc<Self> {
        Arc::new(Self {
            symbol: Some(DecodedSymbol {
                payload: payload.to_string(),
                format: format.to_string(),
            }),
        })
    }

    pub fn nothing() -> Arc<Self> {
        Arc::new(Self { symbol: None })
    }
}

impl SymbolDecoder for FixedDecoder {
    fn decode(&self, _image: &GrayImage) -> anyhow::Result<Option<DecodedSymbol>> {
        Ok(self.symbol.clone())
    }
}

/// Records the size of the last image the pipeline handed it
pub struct SizeRecorder {
    width: AtomicU32,
    height: AtomicU32,
}

impl SizeRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            width: AtomicU32::new(0),
            height: AtomicU32::new(0),
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width.load(Ordering::SeqCst), self.height.load(Ordering::SeqCst))
    }
}

impl PipelineStep for SizeRecorder {
    fn process(&self, image: &DynamicImage, _context: &PipelineContext) -> anyhow::Result<Option<Detection>> {
        self.width.store(image.width(), Ordering::SeqCst);
        self.height.store(image.height(), Ordering::SeqCst);
        Ok(None)
    }

    fn name(&self) -> &str {
        "Size Recorder"
    }
}

/// Step that always errors
pub struct FailingStep;

impl PipelineStep for FailingStep {
    fn process(&self, _image: &DynamicImage, _context: &PipelineContext) -> anyhow::Result<Option<Detection>> {
        anyhow::bail!("step exploded")
    }

    fn name(&self) -> &str {
        "Failing"
    }
}

/// Step that validates a fixed digit string and counts its calls
pub struct FixedStep {
    name: &'static str,
    digits: &'static str,
    calls: AtomicUsize,
}

impl FixedStep {
    pub fn new(name: &'static str, digits: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            digits,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PipelineStep for FixedStep {
    fn process(&self, _image: &DynamicImage, _context: &PipelineContext) -> anyhow::Result<Option<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(validate_barcode(self.digits).map(|b| Detection::new(b, self.name)))
    }

    fn name(&self) -> &str {
        self.name
    }
}
