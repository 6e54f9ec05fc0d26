//! Shaped pixel buffers.
//!
//! A [`Frame`] owns a contiguous, row-major buffer of 8-bit samples with a
//! `(height, width, channels)` shape. A [`BufferView`] borrows any shaped
//! buffer, including a strided window into a larger frame, without copying.

use std::fmt;
use std::sync::Arc;

use crate::hash::ContentHash;

/// Error returned when a buffer's length does not agree with its shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// The data length is not `height * row_stride` (or the last row is short).
    #[error("buffer of {len} bytes does not fit shape {shape:?} with row stride {stride}")]
    LengthMismatch {
        /// The requested shape.
        shape: Vec<usize>,
        /// The requested row stride in bytes.
        stride: usize,
        /// The actual data length.
        len: usize,
    },

    /// The row stride is smaller than one row of visible samples.
    #[error("row stride {stride} is smaller than a row of {row_bytes} bytes")]
    StrideTooSmall {
        /// The requested row stride in bytes.
        stride: usize,
        /// The bytes occupied by one visible row.
        row_bytes: usize,
    },

    /// The requested crop lies outside the frame.
    #[error("crop {x},{y} {width}x{height} lies outside a {frame_width}x{frame_height} frame")]
    CropOutOfBounds {
        /// Left edge of the crop.
        x: usize,
        /// Top edge of the crop.
        y: usize,
        /// Crop width in pixels.
        width: usize,
        /// Crop height in pixels.
        height: usize,
        /// Frame width in pixels.
        frame_width: usize,
        /// Frame height in pixels.
        frame_height: usize,
    },
}

/// An owned video frame or image.
///
/// The sample buffer is reference counted, so cloning a frame is cheap and
/// never duplicates pixel data.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    height: usize,
    width: usize,
    channels: usize,
    data: Arc<[u8]>,
}

impl Frame {
    /// Creates a frame from contiguous row-major samples.
    pub fn new(
        height: usize,
        width: usize,
        channels: usize,
        data: impl Into<Arc<[u8]>>,
    ) -> Result<Self, ShapeError> {
        let data = data.into();
        if data.len() != height * width * channels {
            return Err(ShapeError::LengthMismatch {
                shape: vec![height, width, channels],
                stride: width * channels,
                len: data.len(),
            });
        }
        Ok(Self {
            height,
            width,
            channels,
            data,
        })
    }

    /// Creates a frame with every sample set to zero.
    pub fn zeros(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
            data: vec![0u8; height * width * channels].into(),
        }
    }

    /// Frame height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Frame width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Samples per pixel.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// The `(height, width, channels)` shape.
    pub fn shape(&self) -> [usize; 3] {
        [self.height, self.width, self.channels]
    }

    /// The raw sample bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Borrows the whole frame as a view.
    pub fn view(&self) -> BufferView<'_> {
        BufferView {
            shape: vec![self.height, self.width, self.channels],
            stride: self.width * self.channels,
            data: &self.data,
        }
    }

    /// Borrows a rectangular window of the frame without copying.
    pub fn crop(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<BufferView<'_>, ShapeError> {
        if x + width > self.width || y + height > self.height {
            return Err(ShapeError::CropOutOfBounds {
                x,
                y,
                width,
                height,
                frame_width: self.width,
                frame_height: self.height,
            });
        }
        let stride = self.width * self.channels;
        let shape = vec![height, width, self.channels];
        if width == 0 || height == 0 || self.channels == 0 {
            return Ok(BufferView {
                shape,
                stride,
                data: &self.data[..0],
            });
        }
        let start = y * stride + x * self.channels;
        let end = start + (height - 1) * stride + width * self.channels;
        Ok(BufferView {
            shape,
            stride,
            data: &self.data[start..end],
        })
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame({}x{}x{})",
            self.height, self.width, self.channels
        )
    }
}

/// A borrowed, shaped, possibly strided byte buffer.
///
/// The first shape dimension counts rows; the remaining dimensions multiply
/// out to the visible bytes of one row. Rows start `stride` bytes apart, so
/// padding between rows is never part of the content.
#[derive(Clone, PartialEq, Eq)]
pub struct BufferView<'a> {
    shape: Vec<usize>,
    stride: usize,
    data: &'a [u8],
}

impl<'a> BufferView<'a> {
    /// Views a contiguous buffer with the given shape.
    pub fn contiguous(shape: &[usize], data: &'a [u8]) -> Result<Self, ShapeError> {
        let row_bytes = row_bytes(shape);
        Self::strided(shape, row_bytes, data)
    }

    /// Views a buffer whose rows start `stride` bytes apart.
    ///
    /// `data` must start at the first visible byte and end at the last one.
    pub fn strided(shape: &[usize], stride: usize, data: &'a [u8]) -> Result<Self, ShapeError> {
        let rows = shape.first().copied().unwrap_or(1);
        let row_bytes = row_bytes(shape);
        if stride < row_bytes {
            return Err(ShapeError::StrideTooSmall { stride, row_bytes });
        }
        let expected = if rows == 0 || row_bytes == 0 {
            0
        } else {
            (rows - 1) * stride + row_bytes
        };
        if data.len() != expected {
            return Err(ShapeError::LengthMismatch {
                shape: shape.to_vec(),
                stride,
                len: data.len(),
            });
        }
        Ok(Self {
            shape: shape.to_vec(),
            stride,
            data,
        })
    }

    /// The buffer's dimensions.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Iterates over the visible bytes of each row.
    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        let rows = self.shape.first().copied().unwrap_or(1);
        let row_bytes = row_bytes(&self.shape);
        let data = self.data;
        let stride = self.stride;
        (0..rows).map(move |r| {
            if row_bytes == 0 {
                return &data[..0];
            }
            let start = r * stride;
            &data[start..start + row_bytes]
        })
    }

    /// Hashes the visible content, ignoring row padding.
    ///
    /// A strided window and a contiguous copy of the same pixels hash
    /// identically.
    pub fn content_hash(&self) -> ContentHash {
        let rows = self.shape.first().copied().unwrap_or(1);
        let row_bytes = row_bytes(&self.shape);
        if rows == 0 || row_bytes == 0 || self.stride == row_bytes {
            return ContentHash::from_bytes(self.data);
        }
        ContentHash::from_chunks(self.rows())
    }
}

impl fmt::Debug for BufferView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BufferView({:?}, stride {})", self.shape, self.stride)
    }
}

fn row_bytes(shape: &[usize]) -> usize {
    shape.iter().skip(1).product()
}
