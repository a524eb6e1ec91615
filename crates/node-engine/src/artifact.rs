//! Image artifacts passed between nodes
//!
//! An artifact is a row-major buffer of 8-bit samples with either one
//! (grayscale) or three (RGB) interleaved channels. RGB is the canonical
//! channel order everywhere inside the engine; codecs convert at the edges.

use std::fmt;

use crate::error::{NodeEngineError, Result};

/// Number of interleaved channels in an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channels {
    /// Single luma channel
    Gray,
    /// Red, green, blue
    Rgb,
}

impl Channels {
    /// Samples per pixel
    pub fn count(&self) -> usize {
        match self {
            Channels::Gray => 1,
            Channels::Rgb => 3,
        }
    }
}

/// In-memory image produced by a node
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    width: u32,
    height: u32,
    channels: Channels,
    data: Vec<u8>,
}

impl Artifact {
    /// Wrap a sample buffer, checking it matches the declared shape
    pub fn new(width: u32, height: u32, channels: Channels, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * channels.count();
        if data.len() != expected {
            return Err(NodeEngineError::processing(
                "Artifact",
                format!(
                    "buffer of {} bytes does not match {}x{}x{}",
                    data.len(),
                    width,
                    height,
                    channels.count()
                ),
            ));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// An artifact filled with a single value
    pub fn filled(width: u32, height: u32, channels: Channels, value: u8) -> Self {
        let len = width as usize * height as usize * channels.count();
        Self {
            width,
            height,
            channels,
            data: vec![value; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// (height, width, channels), matching the array shape convention
    pub fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels.count(),
        )
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Samples of the pixel at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = self.channels.count();
        let start = (y as usize * self.width as usize + x as usize) * c;
        &self.data[start..start + c]
    }

    /// Same shape, new samples; used by per-sample transforms
    pub fn map_samples(&self, f: impl Fn(u8) -> u8) -> Self {
        Self {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("bytes", &self.data.len())
            .finish()
    }
}
