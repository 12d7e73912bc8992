use burn::tensor::{Tensor, TensorData, backend::Backend};

use crate::error::GridError;
use crate::grid::Grid;
use crate::state::ObservationSpace;

/// One-hot encoded observation laid out as `(channels, height, width)`.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedState {
    data: Vec<f32>,
    shape: [usize; 3],
}

impl EncodedState {
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Value at `(channel, row, col)`.
    pub fn get(&self, channel: usize, row: usize, col: usize) -> f32 {
        let [_, height, width] = self.shape;
        self.data[(channel * height + row) * width + col]
    }

    /// Batched tensor `[1, channels, height, width]` holding this state alone.
    pub fn to_batch<B: Backend>(&self, device: &B::Device) -> Tensor<B, 4> {
        batch_tensor(self.data.clone(), self.shape, device)
    }
}

/// Converts raw integer grids into one-hot channel stacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateEncoder {
    channels: usize,
    height: usize,
    width: usize,
}

impl StateEncoder {
    pub fn new(space: ObservationSpace) -> Self {
        Self {
            channels: space.channel_count(),
            height: space.height,
            width: space.width,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }

    pub fn features(&self) -> usize {
        self.channels * self.height * self.width
    }

    pub fn encode(&self, grid: &Grid) -> Result<EncodedState, GridError> {
        if grid.height() != self.height || grid.width() != self.width {
            return Err(GridError::ShapeMismatch {
                height: self.height,
                width: self.width,
                actual_height: grid.height(),
                actual_width: grid.width(),
            });
        }
        let plane = self.height * self.width;
        let mut data = vec![0.0f32; self.features()];
        for (index, &value) in grid.cells().iter().enumerate() {
            let channel = value as usize;
            if channel >= self.channels {
                return Err(GridError::CellOutOfRange {
                    row: index / self.width,
                    col: index % self.width,
                    value,
                    channels: self.channels,
                });
            }
            data[channel * plane + index] = 1.0;
        }
        Ok(EncodedState {
            data,
            shape: self.shape(),
        })
    }
}

/// Reshapes concatenated `(channels, height, width)` states into a
/// `[rows, channels, height, width]` tensor.
pub fn batch_tensor<B: Backend>(
    data: Vec<f32>,
    shape: [usize; 3],
    device: &B::Device,
) -> Tensor<B, 4> {
    let [channels, height, width] = shape;
    let features = channels * height * width;
    debug_assert!(features > 0 && data.len() % features == 0);
    let rows = data.len() / features;
    Tensor::<B, 4>::from_data(
        TensorData::new(data, [rows, channels, height, width]),
        device,
    )
}
