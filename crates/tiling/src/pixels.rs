//! Single-band pixel storage in the source's native sample type.

use tiff::decoder::DecodingResult;

/// Row-major single-band pixels.
///
/// Raw strips always decode to [`PixelBuffer::U8`]; GeoTIFF sources keep
/// whatever sample type the file declares.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Apply `$body` to the vector inside any variant, rewrapping the result in
/// the same variant.
macro_rules! map_samples {
    ($buf:expr, $data:ident => $body:expr) => {
        match $buf {
            PixelBuffer::U8($data) => PixelBuffer::U8($body),
            PixelBuffer::U16($data) => PixelBuffer::U16($body),
            PixelBuffer::U32($data) => PixelBuffer::U32($body),
            PixelBuffer::U64($data) => PixelBuffer::U64($body),
            PixelBuffer::I8($data) => PixelBuffer::I8($body),
            PixelBuffer::I16($data) => PixelBuffer::I16($body),
            PixelBuffer::I32($data) => PixelBuffer::I32($body),
            PixelBuffer::I64($data) => PixelBuffer::I64($body),
            PixelBuffer::F32($data) => PixelBuffer::F32($body),
            PixelBuffer::F64($data) => PixelBuffer::F64($body),
        }
    };
}

/// Evaluate `$body` against the vector inside any variant.
macro_rules! with_samples {
    ($buf:expr, $data:ident => $body:expr) => {
        match $buf {
            PixelBuffer::U8($data) => $body,
            PixelBuffer::U16($data) => $body,
            PixelBuffer::U32($data) => $body,
            PixelBuffer::U64($data) => $body,
            PixelBuffer::I8($data) => $body,
            PixelBuffer::I16($data) => $body,
            PixelBuffer::I32($data) => $body,
            PixelBuffer::I64($data) => $body,
            PixelBuffer::F32($data) => $body,
            PixelBuffer::F64($data) => $body,
        }
    };
}

impl PixelBuffer {
    /// Number of samples.
    pub fn len(&self) -> usize {
        with_samples!(self, data => data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short name of the sample type, e.g. `u8` or `f32`.
    pub fn sample_type(&self) -> &'static str {
        match self {
            PixelBuffer::U8(_) => "u8",
            PixelBuffer::U16(_) => "u16",
            PixelBuffer::U32(_) => "u32",
            PixelBuffer::U64(_) => "u64",
            PixelBuffer::I8(_) => "i8",
            PixelBuffer::I16(_) => "i16",
            PixelBuffer::I32(_) => "i32",
            PixelBuffer::I64(_) => "i64",
            PixelBuffer::F32(_) => "f32",
            PixelBuffer::F64(_) => "f64",
        }
    }

    /// Copy the `size` x `size` window whose upper-left pixel is
    /// `(col, row)` out of a raster `width` pixels wide.
    ///
    /// The window must lie entirely inside the buffer.
    pub fn window(&self, width: usize, col: usize, row: usize, size: usize) -> PixelBuffer {
        map_samples!(self, data => copy_window(data, width, col, row, size))
    }

    /// Keep the first of every `samples_per_pixel` interleaved samples.
    pub fn first_band(self, samples_per_pixel: usize) -> PixelBuffer {
        if samples_per_pixel <= 1 {
            return self;
        }
        map_samples!(self, data => data.into_iter().step_by(samples_per_pixel).collect())
    }

    /// Borrow 8-bit samples, if that is the sample type.
    pub fn as_u8(&self) -> Option<&[u8]> {
        match self {
            PixelBuffer::U8(data) => Some(data),
            _ => None,
        }
    }
}

impl From<DecodingResult> for PixelBuffer {
    fn from(result: DecodingResult) -> Self {
        match result {
            DecodingResult::U8(v) => PixelBuffer::U8(v),
            DecodingResult::U16(v) => PixelBuffer::U16(v),
            DecodingResult::U32(v) => PixelBuffer::U32(v),
            DecodingResult::U64(v) => PixelBuffer::U64(v),
            DecodingResult::I8(v) => PixelBuffer::I8(v),
            DecodingResult::I16(v) => PixelBuffer::I16(v),
            DecodingResult::I32(v) => PixelBuffer::I32(v),
            DecodingResult::I64(v) => PixelBuffer::I64(v),
            DecodingResult::F32(v) => PixelBuffer::F32(v),
            DecodingResult::F64(v) => PixelBuffer::F64(v),
        }
    }
}

fn copy_window<T: Copy>(data: &[T], width: usize, col: usize, row: usize, size: usize) -> Vec<T> {
    debug_assert!(col + size <= width);
    let mut out = Vec::with_capacity(size * size);
    for r in row..row + size {
        let start = r * width + col;
        out.extend_from_slice(&data[start..start + size]);
    }
    out
}
