use ndarray::{Array3, ArrayView2, Axis};

use crate::error::{Error, Result};

/// 滤波器最大单元数，2^20 个滤波器已经远超实际需要
pub const MAX_FILTER_CELLS: usize = 20;

/// 所有 `rows x cols` 二值矩阵构成的滤波器组
///
/// 第 `i` 个滤波器是整数 `i` 的二进制展开：从最高位数起的第 `k` 位放在按行展开的第 `k` 个位置。
/// 其他计算依赖这个固定的序号到图案的映射，因此顺序不能改变。
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBank {
    rows: usize,
    cols: usize,
    filters: Array3<u8>,
}

impl FilterBank {
    pub fn generate(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidConfiguration(format!(
                "滤波器尺寸必须为正数: {rows}x{cols}"
            )));
        }
        let cells = rows * cols;
        if cells > MAX_FILTER_CELLS {
            return Err(Error::InvalidConfiguration(format!(
                "滤波器 {rows}x{cols} 过大，单元数不能超过 {MAX_FILTER_CELLS}"
            )));
        }

        let n = 1usize << cells;
        let filters = Array3::from_shape_fn((n, rows, cols), |(i, r, c)| {
            let k = r * cols + c;
            ((i >> (cells - 1 - k)) & 1) as u8
        });
        Ok(Self { rows, cols, filters })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// 单个滤波器的单元数
    pub fn cells(&self) -> usize {
        self.rows * self.cols
    }

    pub fn len(&self) -> usize {
        self.filters.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> ArrayView2<'_, u8> {
        self.filters.index_axis(Axis(0), index)
    }

    pub fn iter(&self) -> impl Iterator<Item = ArrayView2<'_, u8>> {
        self.filters.outer_iter()
    }

    /// 按行展开的单个滤波器
    pub(crate) fn flat(&self, index: usize) -> &[u8] {
        let cells = self.cells();
        let data = self.filters.as_slice().expect("filter bank is contiguous");
        &data[index * cells..(index + 1) * cells]
    }
}
