//! Accessor-backed storage behaves identically to dense slices.

use num_complex::Complex64;
use strided_ternary::{
    apply_ternary, Accessor, AccessorMut, MemoryOrder, View, ViewMut,
};

/// Bit-packed boolean buffer over u32 words.
struct BitBuffer {
    words: Vec<u32>,
    len: usize,
}

impl BitBuffer {
    fn new(len: usize) -> Self {
        Self {
            words: vec![0u32; (len + 31) / 32],
            len,
        }
    }

    fn from_bools(bits: &[bool]) -> Self {
        let mut buf = Self::new(bits.len());
        for (i, &b) in bits.iter().enumerate() {
            buf.set(i, b);
        }
        buf
    }

    fn to_bools(&self) -> Vec<bool> {
        (0..self.len).map(|i| self.get(i)).collect()
    }
}

impl Accessor<bool> for BitBuffer {
    fn get(&self, idx: usize) -> bool {
        (self.words[idx / 32] >> (idx % 32)) & 1 != 0
    }
}

impl AccessorMut<bool> for BitBuffer {
    fn set(&mut self, idx: usize, value: bool) {
        let mask = 1u32 << (idx % 32);
        if value {
            self.words[idx / 32] |= mask;
        } else {
            self.words[idx / 32] &= !mask;
        }
    }
}

/// Complex values stored as interleaved (re, im) f64 lanes.
struct InterleavedComplex {
    lanes: Vec<f64>,
}

impl InterleavedComplex {
    fn from_values(values: &[Complex64]) -> Self {
        let mut lanes = Vec::with_capacity(values.len() * 2);
        for v in values {
            lanes.push(v.re);
            lanes.push(v.im);
        }
        Self { lanes }
    }
}

impl Accessor<Complex64> for InterleavedComplex {
    fn get(&self, idx: usize) -> Complex64 {
        Complex64::new(self.lanes[2 * idx], self.lanes[2 * idx + 1])
    }
}

impl AccessorMut<Complex64> for InterleavedComplex {
    fn set(&mut self, idx: usize, value: Complex64) {
        self.lanes[2 * idx] = value.re;
        self.lanes[2 * idx + 1] = value.im;
    }
}

fn majority(a: bool, b: bool, c: bool) -> bool {
    (a & b) | (a & c) | (b & c)
}

#[test]
fn test_bit_packed_bool_majority() {
    let shape = [5usize, 7];
    let strides = [7isize, 1];
    let numel = 35usize;

    let x_bits: Vec<bool> = (0..numel).map(|i| i % 2 == 0).collect();
    let y_bits: Vec<bool> = (0..numel).map(|i| i % 3 == 0).collect();
    let z_bits: Vec<bool> = (0..numel).map(|i| i % 5 != 0).collect();

    // Dense reference run.
    let mut expected = vec![false; numel];
    {
        let x = View::new(&x_bits, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
        let y = View::new(&y_bits, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
        let z = View::new(&z_bits, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
        let mut d =
            ViewMut::new(&mut expected, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
        apply_ternary(&mut d, &x, &y, &z, majority).unwrap();
    }

    // Same computation through bit-packed storage on every view.
    let x_buf = BitBuffer::from_bools(&x_bits);
    let y_buf = BitBuffer::from_bools(&y_bits);
    let z_buf = BitBuffer::from_bools(&z_bits);
    let mut d_buf = BitBuffer::new(numel);

    let x = View::with_accessor(&x_buf, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
    let y = View::with_accessor(&y_buf, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
    let z = View::with_accessor(&z_buf, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
    let mut d =
        ViewMut::with_accessor(&mut d_buf, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();

    apply_ternary(&mut d, &x, &y, &z, majority).unwrap();
    assert_eq!(d_buf.to_bools(), expected);
}

#[test]
fn test_interleaved_complex_fma() {
    let shape = [4usize, 4];
    let strides = [4isize, 1];
    let numel = 16usize;

    let x_vals: Vec<Complex64> = (0..numel)
        .map(|i| Complex64::new(i as f64, -(i as f64)))
        .collect();
    let y_vals: Vec<Complex64> = (0..numel)
        .map(|i| Complex64::new(0.5 * i as f64, 1.0))
        .collect();
    let z_vals: Vec<Complex64> = (0..numel)
        .map(|i| Complex64::new(-1.0, i as f64))
        .collect();

    let mut expected = vec![Complex64::new(0.0, 0.0); numel];
    {
        let x = View::new(&x_vals, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
        let y = View::new(&y_vals, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
        let z = View::new(&z_vals, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
        let mut d =
            ViewMut::new(&mut expected, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
        apply_ternary(&mut d, &x, &y, &z, |a, b, c| a * b + c).unwrap();
    }

    let x_buf = InterleavedComplex::from_values(&x_vals);
    let y_buf = InterleavedComplex::from_values(&y_vals);
    let z_buf = InterleavedComplex::from_values(&z_vals);
    let mut d_buf = InterleavedComplex::from_values(&vec![Complex64::new(0.0, 0.0); numel]);

    let x = View::with_accessor(&x_buf, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
    let y = View::with_accessor(&y_buf, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
    let z = View::with_accessor(&z_buf, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
    let mut d =
        ViewMut::with_accessor(&mut d_buf, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();

    apply_ternary(&mut d, &x, &y, &z, |a, b, c| a * b + c).unwrap();

    for i in 0..numel {
        assert_eq!(d_buf.get(i), expected[i]);
    }
}

#[test]
fn test_mixed_slice_and_accessor_storage() {
    // One accessor input among dense slices forces the indirect kernels for
    // the whole call; results must not change.
    let shape = [3usize, 5];
    let strides = [5isize, 1];
    let numel = 15usize;

    let x_bits: Vec<bool> = (0..numel).map(|i| i % 4 < 2).collect();
    let y_bits: Vec<bool> = (0..numel).map(|i| i % 2 == 1).collect();
    let z_bits: Vec<bool> = (0..numel).map(|i| i < 8).collect();

    let mut expected = vec![false; numel];
    {
        let x = View::new(&x_bits, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
        let y = View::new(&y_bits, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
        let z = View::new(&z_bits, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
        let mut d =
            ViewMut::new(&mut expected, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
        apply_ternary(&mut d, &x, &y, &z, majority).unwrap();
    }

    let y_buf = BitBuffer::from_bools(&y_bits);
    let mut out = vec![false; numel];

    let x = View::new(&x_bits, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
    let y = View::with_accessor(&y_buf, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
    let z = View::new(&z_bits, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
    let mut d = ViewMut::new(&mut out, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
    assert!(y.is_accessor());

    apply_ternary(&mut d, &x, &y, &z, majority).unwrap();
    assert_eq!(out, expected);
}

#[test]
fn test_accessor_with_transposed_input() {
    // Accessor storage combined with a layout disagreement: the blocked path
    // must drive the accessor at the right buffer indices.
    let shape = [8usize, 6];
    let row = [6isize, 1];
    let col = [1isize, 8];
    let numel = 48usize;

    let x_bits: Vec<bool> = (0..numel).map(|i| i % 3 == 0).collect();
    let y_bits: Vec<bool> = (0..numel).map(|i| i % 7 < 3).collect();
    let z_bits: Vec<bool> = (0..numel).map(|i| i % 2 == 0).collect();

    let mut expected = vec![false; numel];
    {
        let x = View::new(&x_bits, &shape, &row, 0, MemoryOrder::RowMajor).unwrap();
        let y = View::new(&y_bits, &shape, &col, 0, MemoryOrder::RowMajor).unwrap();
        let z = View::new(&z_bits, &shape, &row, 0, MemoryOrder::RowMajor).unwrap();
        let mut d = ViewMut::new(&mut expected, &shape, &row, 0, MemoryOrder::RowMajor).unwrap();
        apply_ternary(&mut d, &x, &y, &z, majority).unwrap();
    }

    let y_buf = BitBuffer::from_bools(&y_bits);
    let mut d_buf = BitBuffer::new(numel);

    let x = View::new(&x_bits, &shape, &row, 0, MemoryOrder::RowMajor).unwrap();
    let y = View::with_accessor(&y_buf, &shape, &col, 0, MemoryOrder::RowMajor).unwrap();
    let z = View::new(&z_bits, &shape, &row, 0, MemoryOrder::RowMajor).unwrap();
    let mut d =
        ViewMut::with_accessor(&mut d_buf, &shape, &row, 0, MemoryOrder::RowMajor).unwrap();

    apply_ternary(&mut d, &x, &y, &z, majority).unwrap();
    assert_eq!(d_buf.to_bools(), expected);
}
