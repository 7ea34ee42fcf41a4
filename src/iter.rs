//! Typed iteration over descriptor elements in view order.

use smallvec::SmallVec;

use crate::array::Ndarray;
use crate::dtype::Scalar;
use crate::order::Order;
use crate::{NdarrayError, Result};

/// Iterator over the elements of an [`Ndarray`] in view order.
///
/// The declared order decides the traversal: row-major varies the last axis
/// fastest, column-major the first.
pub struct ElementsIter<'s, 'a, T: Scalar> {
    array: &'s Ndarray<'a>,
    indices: SmallVec<[usize; 8]>,
    remaining: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<'s, 'a, T: Scalar> ElementsIter<'s, 'a, T> {
    pub(crate) fn new(array: &'s Ndarray<'a>) -> Result<Self> {
        if std::mem::size_of::<T>() != array.bytes_per_element() {
            return Err(NdarrayError::UnknownDType(array.dtype().code()));
        }
        Ok(Self {
            array,
            indices: SmallVec::from_elem(0, array.ndims()),
            remaining: array.len(),
            _marker: std::marker::PhantomData,
        })
    }

    /// Byte offset of the element at the current subscripts.
    #[inline]
    fn current_offset(&self) -> isize {
        let strides = self.array.strides();
        let mut pos = self.array.offset();
        for (i, &idx) in self.indices.iter().enumerate() {
            pos += idx as isize * strides[i];
        }
        pos
    }

    /// Advances the subscripts one step in view order.
    #[inline]
    fn advance(&mut self) {
        let shape = self.array.shape();
        match self.array.order() {
            Order::RowMajor => {
                for i in (0..shape.len()).rev() {
                    self.indices[i] += 1;
                    if self.indices[i] < shape[i] {
                        return;
                    }
                    self.indices[i] = 0;
                }
            }
            Order::ColumnMajor => {
                for i in 0..shape.len() {
                    self.indices[i] += 1;
                    if self.indices[i] < shape[i] {
                        return;
                    }
                    self.indices[i] = 0;
                }
            }
        }
    }
}

impl<T: Scalar> Iterator for ElementsIter<'_, '_, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let offset = self.current_offset();
        let value = unsafe { T::read(self.array.data().as_ptr().offset(offset)) };
        self.advance();
        self.remaining -= 1;
        Some(value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Scalar> ExactSizeIterator for ElementsIter<'_, '_, T> {}
