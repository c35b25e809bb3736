use std::fmt;
use std::iter;

use dal::types::DalType;
use dal::Hyperslab;

use ndarray::ArrayD;
use rand::prelude::Rng;

/// Generate a random shape with all dimensions in `1..=10`.
pub fn gen_shape<R: Rng + ?Sized>(rng: &mut R, ndim: usize) -> Vec<usize> {
    iter::repeat(()).map(|_| rng.gen_range(1..11)).take(ndim).collect()
}

/// Generate a random block `(start, block)` that starts inside `shape` and may reach
/// up to twice as far in every dimension.
pub fn gen_block<R: Rng + ?Sized>(rng: &mut R, shape: &[usize]) -> (Vec<isize>, Vec<isize>) {
    shape
        .iter()
        .map(|&dim| {
            let start = rng.gen_range(0..dim);
            let block = rng.gen_range(1..=dim);
            (start as isize, block as isize)
        })
        .unzip()
}

/// Generate a random valid strided hyperslab starting inside `shape`.
pub fn gen_hyperslab<R: Rng + ?Sized>(rng: &mut R, shape: &[usize]) -> Hyperslab {
    let (mut start, mut stride, mut count, mut block) = (vec![], vec![], vec![], vec![]);
    for &dim in shape {
        let b = rng.gen_range(1..=dim.min(4));
        start.push(rng.gen_range(0..dim) as isize);
        block.push(b as isize);
        count.push(rng.gen_range(1..4) as isize);
        stride.push(rng.gen_range(b..=b + 3) as isize);
    }
    Hyperslab::new(&start, &stride, &count, &block).unwrap()
}

pub trait Gen: Sized + fmt::Debug {
    fn gen<R: Rng + ?Sized>(rng: &mut R) -> Self;
}

macro_rules! impl_gen_primitive {
    ($ty:ty) => {
        impl Gen for $ty {
            fn gen<R: Rng + ?Sized>(rng: &mut R) -> Self {
                rng.gen()
            }
        }
    };
    ($ty:ty, $($tys:ty),+) => {
        impl_gen_primitive!($ty);
        impl_gen_primitive!($($tys),*);
    };
}

impl_gen_primitive!(usize, isize, u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

pub fn gen_vec<R: Rng + ?Sized, T: Gen>(rng: &mut R, size: usize) -> Vec<T> {
    iter::repeat(()).map(|_| T::gen(rng)).take(size).collect()
}

pub fn gen_arr<T, R>(rng: &mut R, ndim: usize) -> ArrayD<T>
where
    T: DalType + Gen,
    R: Rng + ?Sized,
{
    let shape = gen_shape(rng, ndim);
    let size = shape.iter().product();
    let vec = gen_vec(rng, size);
    ArrayD::from_shape_vec(shape, vec).unwrap()
}
