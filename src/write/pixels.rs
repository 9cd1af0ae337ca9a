//! Pixel sample buffers accepted by the writer.

use bytes::BufMut;

use crate::error::ValidationError;

/// Flat pixel-interleaved samples of a single element type.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// SampleFormat values.
pub mod sample_format {
    pub const UNSIGNED: u16 = 1;
    pub const SIGNED: u16 = 2;
    pub const FLOAT: u16 = 3;
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::I8(v) => v.len(),
            Samples::U16(v) => v.len(),
            Samples::I16(v) => v.len(),
            Samples::U32(v) => v.len(),
            Samples::I32(v) => v.len(),
            Samples::F32(v) => v.len(),
            Samples::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Width of one element in bytes.
    pub fn element_width(&self) -> usize {
        match self {
            Samples::U8(_) | Samples::I8(_) => 1,
            Samples::U16(_) | Samples::I16(_) => 2,
            Samples::U32(_) | Samples::I32(_) | Samples::F32(_) => 4,
            Samples::F64(_) => 8,
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        (self.element_width() * 8) as u16
    }

    /// SampleFormat code implied by the element type.
    pub fn sample_format(&self) -> u16 {
        match self {
            Samples::U8(_) | Samples::U16(_) | Samples::U32(_) => sample_format::UNSIGNED,
            Samples::I8(_) | Samples::I16(_) | Samples::I32(_) => sample_format::SIGNED,
            Samples::F32(_) | Samples::F64(_) => sample_format::FLOAT,
        }
    }

    /// Sample at `index` widened to f64 (exact for every element type).
    pub fn value(&self, index: usize) -> Option<f64> {
        match self {
            Samples::U8(v) => v.get(index).map(|&s| f64::from(s)),
            Samples::I8(v) => v.get(index).map(|&s| f64::from(s)),
            Samples::U16(v) => v.get(index).map(|&s| f64::from(s)),
            Samples::I16(v) => v.get(index).map(|&s| f64::from(s)),
            Samples::U32(v) => v.get(index).map(|&s| f64::from(s)),
            Samples::I32(v) => v.get(index).map(|&s| f64::from(s)),
            Samples::F32(v) => v.get(index).map(|&s| f64::from(s)),
            Samples::F64(v) => v.get(index).copied(),
        }
    }

    /// Append sample `index` in big-endian order using its native width.
    ///
    /// Returns false when `index` is out of range.
    pub fn put_native_be(&self, index: usize, out: &mut impl BufMut) -> bool {
        match self {
            Samples::U8(v) => v.get(index).map(|&s| out.put_u8(s)).is_some(),
            Samples::I8(v) => v.get(index).map(|&s| out.put_i8(s)).is_some(),
            Samples::U16(v) => v.get(index).map(|&s| out.put_u16(s)).is_some(),
            Samples::I16(v) => v.get(index).map(|&s| out.put_i16(s)).is_some(),
            Samples::U32(v) => v.get(index).map(|&s| out.put_u32(s)).is_some(),
            Samples::I32(v) => v.get(index).map(|&s| out.put_i32(s)).is_some(),
            Samples::F32(v) => v.get(index).map(|&s| out.put_f32(s)).is_some(),
            Samples::F64(v) => v.get(index).map(|&s| out.put_f64(s)).is_some(),
        }
    }
}

/// Element types that can be collected into [`Samples`].
pub trait Sample: Copy {
    fn into_samples(values: Vec<Self>) -> Samples;
}

macro_rules! impl_sample {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Sample for $ty {
                fn into_samples(values: Vec<Self>) -> Samples {
                    Samples::$variant(values)
                }
            }

            impl From<Vec<$ty>> for Samples {
                fn from(values: Vec<$ty>) -> Self {
                    Samples::$variant(values)
                }
            }
        )*
    };
}

impl_sample!(
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    f32 => F32,
    f64 => F64,
);

/// Raster samples plus whatever shape could be inferred from their layout.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelData {
    samples: Samples,
    bands: Option<usize>,
    height: Option<usize>,
    width: Option<usize>,
}

impl PixelData {
    /// Flat pixel-interleaved samples; width and height must come from metadata.
    pub fn flat(samples: impl Into<Samples>) -> Self {
        Self {
            samples: samples.into(),
            bands: None,
            height: None,
            width: None,
        }
    }

    /// Nested `bands[band][row][column]` samples.
    ///
    /// The result is flattened row-major with bands interleaved per pixel,
    /// and the band count, height and width are taken from the nesting.
    pub fn from_bands<T: Sample>(bands: Vec<Vec<Vec<T>>>) -> Result<Self, ValidationError> {
        let band_count = bands.len();
        let height = bands.first().map(Vec::len).ok_or(ValidationError::Empty)?;
        let width = bands
            .first()
            .and_then(|rows| rows.first())
            .map(Vec::len)
            .ok_or(ValidationError::Empty)?;

        for (band, rows) in bands.iter().enumerate() {
            if rows.len() != height {
                return Err(ValidationError::Ragged {
                    band,
                    row: rows.len(),
                    expected: height,
                    actual: rows.len(),
                });
            }
            if let Some((row, cols)) = rows.iter().enumerate().find(|(_, cols)| cols.len() != width) {
                return Err(ValidationError::Ragged {
                    band,
                    row,
                    expected: width,
                    actual: cols.len(),
                });
            }
        }

        let mut flat = Vec::with_capacity(band_count * height * width);
        for row in 0..height {
            for col in 0..width {
                for band in &bands {
                    flat.push(band[row][col]);
                }
            }
        }

        Ok(Self {
            samples: T::into_samples(flat),
            bands: Some(band_count),
            height: Some(height),
            width: Some(width),
        })
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn bands(&self) -> Option<usize> {
        self.bands
    }

    pub fn height(&self) -> Option<usize> {
        self.height
    }

    pub fn width(&self) -> Option<usize> {
        self.width
    }
}
