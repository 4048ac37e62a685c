//! Matrix types

/// Fill pattern for the input matrices
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatrixType {
    /// A filled with 1, B filled with 2
    OnesAndTwos,
    /// A filled with 3, B filled with 4
    ThreesAndFours,
    /// Uniform values in [0, 1)
    Random,
}

impl MatrixType {
    /// Constant fill values, when the pattern has them.
    pub fn constants(self) -> Option<(f32, f32)> {
        match self {
            MatrixType::OnesAndTwos => Some((1.0, 2.0)),
            MatrixType::ThreesAndFours => Some((3.0, 4.0)),
            MatrixType::Random => None,
        }
    }
}

/// Square row-major matrix of `f32`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub(super) width: usize,
    pub(super) data: Vec<f32>,
}

impl Matrix {
    pub fn filled(width: usize, value: f32) -> Self {
        Self {
            width,
            data: vec![value; width * width],
        }
    }

    pub fn zeros(width: usize) -> Self {
        Self::filled(width, 0.0)
    }

    /// Wrap row-major data. Returns `None` when `data.len() != width²`.
    pub fn from_vec(width: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == width * width).then_some(Self { width, data })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.data)
    }

    pub fn byte_len(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_view_matches_footprint() {
        let m = Matrix::filled(4, 1.5);
        assert_eq!(m.as_bytes().len(), 4 * 4 * 4);
        assert_eq!(m.byte_len(), 64);
        assert_eq!(&m.as_bytes()[..4], &1.5f32.to_ne_bytes());
    }

    #[test]
    fn from_vec_checks_len() {
        assert!(Matrix::from_vec(2, vec![0.0; 4]).is_some());
        assert!(Matrix::from_vec(2, vec![0.0; 5]).is_none());
    }
}
