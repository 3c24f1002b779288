use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// The shape of a single sample flowing through a layer graph, batch axis excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// A `height x width x channels` feature map (channels last).
    Spatial {
        height: usize,
        width: usize,
        channels: usize,
    },
    /// A flat vector of `units` values.
    Flat(usize),
}

impl Shape {
    /// Creates a new spatial shape.
    pub fn spatial(height: usize, width: usize, channels: usize) -> Self {
        Self::Spatial {
            height,
            width,
            channels,
        }
    }

    /// Returns the amount of values a sample of this shape holds.
    pub fn len(&self) -> usize {
        match *self {
            Shape::Spatial {
                height,
                width,
                channels,
            } => height * width * channels,
            Shape::Flat(units) => units,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the size of the last axis.
    pub fn channels(&self) -> usize {
        match *self {
            Shape::Spatial { channels, .. } => channels,
            Shape::Flat(units) => units,
        }
    }

    /// Returns the dimensions as a list, ready to be prefixed with a batch axis.
    pub fn dims(&self) -> Vec<usize> {
        match *self {
            Shape::Spatial {
                height,
                width,
                channels,
            } => vec![height, width, channels],
            Shape::Flat(units) => vec![units],
        }
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Spatial {
                height,
                width,
                channels,
            } => write!(f, "({height}, {width}, {channels})"),
            Shape::Flat(units) => write!(f, "({units})"),
        }
    }
}
