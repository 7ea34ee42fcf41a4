//! Element-wise unary apply engine.
//!
//! Applies a callback over every element of an input view and writes the
//! results through one or two output views of the same shape. Loops are
//! selected by rank: dedicated 1D/2D bodies, a rank-parametric nested loop
//! for ranks up to [`MAX_LOOP_RANK`], and a linear-index fallback above
//! that. Each multi-dimensional rank also has a cache-blocked variant that
//! interchanges loops by ascending input stride magnitude and tiles the
//! iteration space.
//!
//! The engine validates shapes once up front and never allocates per call;
//! loop state lives in fixed-capacity scratch. Traversal follows the input
//! descriptor's declared order; pointer increments for non-innermost loops
//! subtract the distance covered by the loop inside them.

use num_traits::AsPrimitive;
use smallvec::SmallVec;

use crate::array::{Ndarray, NdarrayMut, ROW_MAJOR_CONTIGUOUS_FLAG};
use crate::dtype::Scalar;
use crate::ind::vind_to_bind;
use crate::order::{IterationOrder, Order};
use crate::shape::iteration_order;
use crate::{NdarrayError, Result};

/// Highest rank served by the nested-loop implementations.
///
/// Higher ranks fall back to linear-index traversal.
pub const MAX_LOOP_RANK: usize = 10;

/// Byte budget of one cache block in the blocked loop variants.
pub const BLOCK_SIZE_IN_BYTES: usize = 64;

/// Block size in elements when no participant has a fixed element width.
pub const BLOCK_SIZE_IN_ELEMENTS: usize = 8;

type Dims = SmallVec<[usize; MAX_LOOP_RANK]>;
type Steps = SmallVec<[isize; MAX_LOOP_RANK]>;

fn ensure_same_shape(a: &[usize], b: &[usize]) -> Result<()> {
    if a != b {
        return Err(NdarrayError::ShapeMismatch(a.to_vec(), b.to_vec()));
    }
    Ok(())
}

/// Block size for the given participant element widths.
fn block_size(bpes: &[usize]) -> usize {
    match bpes.iter().copied().max() {
        None | Some(0) => BLOCK_SIZE_IN_ELEMENTS,
        Some(m) => (BLOCK_SIZE_IN_BYTES / m).max(1),
    }
}

/// Maps a loop level (0 = innermost) to an array axis for an order.
#[inline]
fn level_axis(order: Order, ndims: usize, level: usize) -> usize {
    match order {
        Order::RowMajor => ndims - 1 - level,
        Order::ColumnMajor => level,
    }
}

// ============================================================================
// Loop bodies
// ============================================================================

/// One-dimensional loop.
fn loop_1d<const K: usize, F>(
    len: usize,
    bases: [*mut u8; K],
    strides: [&[isize]; K],
    mut f: F,
) where
    F: FnMut(&[*mut u8; K]),
{
    let mut ptrs = bases;
    let mut d = [0isize; K];
    for k in 0..K {
        d[k] = strides[k][0];
    }
    for _ in 0..len {
        f(&ptrs);
        for k in 0..K {
            ptrs[k] = ptrs[k].wrapping_offset(d[k]);
        }
    }
}

/// Two-dimensional loop with loop interchange per the declared order.
fn loop_2d<const K: usize, F>(
    shape: &[usize],
    order: Order,
    bases: [*mut u8; K],
    strides: [&[isize]; K],
    mut f: F,
) where
    F: FnMut(&[*mut u8; K]),
{
    let a0 = level_axis(order, 2, 0);
    let a1 = level_axis(order, 2, 1);
    let s0 = shape[a0];
    let s1 = shape[a1];
    let mut d0 = [0isize; K];
    let mut d1 = [0isize; K];
    for k in 0..K {
        d0[k] = strides[k][a0];
        d1[k] = strides[k][a1] - s0 as isize * strides[k][a0];
    }
    let mut ptrs = bases;
    for _ in 0..s1 {
        for _ in 0..s0 {
            f(&ptrs);
            for k in 0..K {
                ptrs[k] = ptrs[k].wrapping_offset(d0[k]);
            }
        }
        for k in 0..K {
            ptrs[k] = ptrs[k].wrapping_offset(d1[k]);
        }
    }
}

/// Rank-parametric nested loop for ranks `3..=MAX_LOOP_RANK`.
///
/// Behaviorally identical to the dedicated bodies; an odometer tracks the
/// non-innermost loop counters.
fn loop_nd<const K: usize, F>(
    shape: &[usize],
    order: Order,
    bases: [*mut u8; K],
    strides: [&[isize]; K],
    mut f: F,
) where
    F: FnMut(&[*mut u8; K]),
{
    let n = shape.len();
    let mut dims: Dims = SmallVec::with_capacity(n);
    for level in 0..n {
        dims.push(shape[level_axis(order, n, level)]);
    }
    let mut deltas: SmallVec<[Steps; 3]> = SmallVec::with_capacity(K);
    for stride in strides.iter() {
        let mut d: Steps = SmallVec::with_capacity(n);
        for level in 0..n {
            let s = stride[level_axis(order, n, level)];
            if level == 0 {
                d.push(s);
            } else {
                let prev = stride[level_axis(order, n, level - 1)];
                d.push(s - dims[level - 1] as isize * prev);
            }
        }
        deltas.push(d);
    }
    let mut counters: Dims = SmallVec::from_elem(0, n);
    let mut ptrs = bases;
    'outer: loop {
        for _ in 0..dims[0] {
            f(&ptrs);
            for k in 0..K {
                ptrs[k] = ptrs[k].wrapping_offset(deltas[k][0]);
            }
        }
        let mut level = 1;
        loop {
            if level == n {
                break 'outer;
            }
            for k in 0..K {
                ptrs[k] = ptrs[k].wrapping_offset(deltas[k][level]);
            }
            counters[level] += 1;
            if counters[level] < dims[level] {
                break;
            }
            counters[level] = 0;
            level += 1;
        }
    }
}

/// Cache-blocked loop for ranks `2..=MAX_LOOP_RANK`.
///
/// Performs a loop interchange by sorting axes on ascending input stride
/// magnitude, then visits the permuted space in tiles of at most `bsize`
/// elements per axis, recomputing tile base pointers from the permuted
/// strides.
fn loop_blocked<const K: usize, F>(
    shape: &[usize],
    bases: [*mut u8; K],
    strides: [&[isize]; K],
    bsize: usize,
    mut f: F,
) where
    F: FnMut(&[*mut u8; K]),
{
    let n = shape.len();

    // Loop interchange: insertion sort of axes by |input stride|.
    let mut perm: Dims = (0..n).collect();
    for i in 1..n {
        let mut j = i;
        while j > 0
            && strides[0][perm[j]].unsigned_abs() < strides[0][perm[j - 1]].unsigned_abs()
        {
            perm.swap(j, j - 1);
            j -= 1;
        }
    }

    let mut pshape: Dims = SmallVec::with_capacity(n);
    for &axis in perm.iter() {
        pshape.push(shape[axis]);
    }
    let mut pstrides: SmallVec<[Steps; 3]> = SmallVec::with_capacity(K);
    for stride in strides.iter() {
        let mut p: Steps = SmallVec::with_capacity(n);
        for &axis in perm.iter() {
            p.push(stride[axis]);
        }
        pstrides.push(p);
    }

    let mut starts: Dims = SmallVec::from_elem(0, n);
    let mut extents: Dims = SmallVec::from_elem(0, n);
    tile_level(
        n - 1,
        &pshape,
        &pstrides,
        bsize,
        bases,
        &mut starts,
        &mut extents,
        &mut f,
    );
}

/// Recursively tiles one permuted axis, outermost first.
///
/// Tiles are visited from the high end of the axis toward zero; the start
/// index of the current tile is the remaining count after carving it off.
#[allow(clippy::too_many_arguments)]
fn tile_level<const K: usize, F>(
    level: usize,
    pshape: &[usize],
    pstrides: &[Steps],
    bsize: usize,
    bases: [*mut u8; K],
    starts: &mut Dims,
    extents: &mut Dims,
    f: &mut F,
) where
    F: FnMut(&[*mut u8; K]),
{
    let mut j = pshape[level];
    while j > 0 {
        let s;
        if j < bsize {
            s = j;
            j = 0;
        } else {
            s = bsize;
            j -= bsize;
        }
        starts[level] = j;
        extents[level] = s;
        if level == 0 {
            tile_body(pshape.len(), pstrides, bases, starts, extents, f);
        } else {
            tile_level(
                level - 1,
                pshape,
                pstrides,
                bsize,
                bases,
                starts,
                extents,
                f,
            );
        }
    }
}

/// Runs the nested loop over one tile.
fn tile_body<const K: usize, F>(
    n: usize,
    pstrides: &[Steps],
    bases: [*mut u8; K],
    starts: &Dims,
    extents: &Dims,
    f: &mut F,
) where
    F: FnMut(&[*mut u8; K]),
{
    // Pointers to the first element of the tile.
    let mut ptrs = bases;
    for k in 0..K {
        let mut off = 0isize;
        for level in 0..n {
            off += starts[level] as isize * pstrides[k][level];
        }
        ptrs[k] = ptrs[k].wrapping_offset(off);
    }
    // Loop offset increments within the tile.
    let mut deltas: SmallVec<[Steps; 3]> = SmallVec::with_capacity(K);
    for pstride in pstrides.iter() {
        let mut d: Steps = SmallVec::with_capacity(n);
        d.push(pstride[0]);
        for level in 1..n {
            d.push(pstride[level] - extents[level - 1] as isize * pstride[level - 1]);
        }
        deltas.push(d);
    }
    let mut counters: Dims = SmallVec::from_elem(0, n);
    'outer: loop {
        for _ in 0..extents[0] {
            f(&ptrs);
            for k in 0..K {
                ptrs[k] = ptrs[k].wrapping_offset(deltas[k][0]);
            }
        }
        let mut level = 1;
        loop {
            if level == n {
                break 'outer;
            }
            for k in 0..K {
                ptrs[k] = ptrs[k].wrapping_offset(deltas[k][level]);
            }
            counters[level] += 1;
            if counters[level] < extents[level] {
                break;
            }
            counters[level] = 0;
            level += 1;
        }
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Whether a view is dense and walks the buffer front to back.
fn contiguous_forward(flags: u32, strides: &[isize]) -> bool {
    flags & ROW_MAJOR_CONTIGUOUS_FLAG != 0
        && iteration_order(strides) == IterationOrder::Forward
}

/// Runs a kernel over every element of the operand views.
///
/// `bases` point at each view's first indexed element (offset applied).
/// Traversal order comes from the first operand's descriptor.
#[allow(clippy::too_many_arguments)]
fn drive<const K: usize, F>(
    shape: &[usize],
    order: Order,
    length: usize,
    bases: [*mut u8; K],
    strides: [&[isize]; K],
    bpes: [usize; K],
    flags: [u32; K],
    blocked: bool,
    mut f: F,
) where
    F: FnMut(&[*mut u8; K]),
{
    if length == 0 {
        return;
    }
    // Dense same-direction views collapse to a flat walk.
    if (0..K).all(|k| contiguous_forward(flags[k], strides[k])) {
        let mut ptrs = bases;
        for _ in 0..length {
            f(&ptrs);
            for k in 0..K {
                ptrs[k] = ptrs[k].wrapping_add(bpes[k]);
            }
        }
        return;
    }
    match shape.len() {
        0 => f(&bases),
        1 => loop_1d(shape[0], bases, strides, f),
        2 => {
            if blocked {
                loop_blocked(shape, bases, strides, block_size(&bpes), f)
            } else {
                loop_2d(shape, order, bases, strides, f)
            }
        }
        _ => {
            if blocked {
                loop_blocked(shape, bases, strides, block_size(&bpes), f)
            } else {
                loop_nd(shape, order, bases, strides, f)
            }
        }
    }
}

/// Linear-index traversal driven by [`vind_to_bind`] for each participant.
///
/// Canonical but slow; serves ranks above [`MAX_LOOP_RANK`].
fn fallback_2<Tin, Tout, F>(dest: &mut NdarrayMut, src: &Ndarray, mut f: F) -> Result<()>
where
    Tin: Scalar,
    Tout: Scalar,
    F: FnMut(Tin) -> Tout,
{
    let dptr = dest.buffer_mut_ptr();
    let sptr = src.data().as_ptr();
    for i in 0..src.len() as isize {
        let bin = vind_to_bind(
            src.shape(),
            src.strides(),
            src.offset(),
            src.order(),
            i,
            src.index_mode(),
        )?;
        let bout = vind_to_bind(
            dest.shape(),
            dest.strides(),
            dest.offset(),
            dest.order(),
            i,
            dest.index_mode(),
        )?;
        unsafe {
            let v = Tin::read(sptr.offset(bin));
            Tout::write(dptr.offset(bout), f(v));
        }
    }
    Ok(())
}

fn apply_inner<Tin, Tout, F>(
    dest: &mut NdarrayMut,
    src: &Ndarray,
    blocked: bool,
    mut f: F,
) -> Result<()>
where
    Tin: Scalar,
    Tout: Scalar,
    F: FnMut(Tin) -> Tout,
{
    ensure_same_shape(src.shape(), dest.shape())?;
    if src.ndims() > MAX_LOOP_RANK {
        return fallback_2(dest, src, f);
    }
    let dptr = dest.as_mut_ptr();
    let sptr = src.as_ptr() as *mut u8;
    drive(
        src.shape(),
        src.order(),
        src.len(),
        [sptr, dptr],
        [src.strides(), dest.strides()],
        [src.bytes_per_element(), dest.bytes_per_element()],
        [src.flags(), dest.flags()],
        blocked,
        |ptrs: &[*mut u8; 2]| unsafe {
            let v = Tin::read(ptrs[0]);
            Tout::write(ptrs[1], f(v));
        },
    );
    Ok(())
}

// ============================================================================
// Public API
// ============================================================================

/// Applies `f` element-wise: `dest[i] = f(src[i])`.
///
/// Both views must share a shape; contiguity, stride signs, and declared
/// orders are free. Traversal follows the input's declared order. Fails
/// with [`NdarrayError::ShapeMismatch`] before touching any element,
/// whether the disagreement is in rank or in extents.
///
/// The caller certifies that `Tin` and `Tout` match the descriptor dtypes.
pub fn apply<Tin, Tout, F>(dest: &mut NdarrayMut, src: &Ndarray, f: F) -> Result<()>
where
    Tin: Scalar,
    Tout: Scalar,
    F: FnMut(Tin) -> Tout,
{
    apply_inner(dest, src, false, f)
}

/// Cache-blocked variant of [`apply`].
///
/// Produces bit-identical output to [`apply`] for any input; only the
/// memory access pattern differs.
pub fn apply_blocked<Tin, Tout, F>(dest: &mut NdarrayMut, src: &Ndarray, f: F) -> Result<()>
where
    Tin: Scalar,
    Tout: Scalar,
    F: FnMut(Tin) -> Tout,
{
    apply_inner(dest, src, true, f)
}

/// Applies `f` and casts the result: `dest[i] = f(src[i]) as Tout`.
pub fn apply_cast<Tin, V, Tout, F>(dest: &mut NdarrayMut, src: &Ndarray, mut f: F) -> Result<()>
where
    Tin: Scalar,
    V: AsPrimitive<Tout>,
    Tout: Scalar,
    F: FnMut(Tin) -> V,
{
    apply(dest, src, move |x| f(x).as_())
}

/// Casts the argument and the result: `dest[i] = f(src[i] as Fin) as Tout`.
pub fn apply_arg_cast<Tin, Fin, Tout, F>(
    dest: &mut NdarrayMut,
    src: &Ndarray,
    mut f: F,
) -> Result<()>
where
    Tin: Scalar + AsPrimitive<Fin>,
    Fin: Copy + 'static + AsPrimitive<Tout>,
    Tout: Scalar,
    F: FnMut(Fin) -> Fin,
{
    apply(dest, src, move |x: Tin| f(x.as_()).as_())
}

/// Converts with caller-supplied functions on both sides:
/// `dest[i] = cout(f(cin(src[i])))`.
pub fn apply_with<Tin, U, V, Tout, F, Cin, Cout>(
    dest: &mut NdarrayMut,
    src: &Ndarray,
    mut f: F,
    mut cin: Cin,
    mut cout: Cout,
) -> Result<()>
where
    Tin: Scalar,
    Tout: Scalar,
    F: FnMut(U) -> V,
    Cin: FnMut(Tin) -> U,
    Cout: FnMut(V) -> Tout,
{
    apply(dest, src, move |x| cout(f(cin(x))))
}

/// Converts the result with a caller-supplied function:
/// `dest[i] = cout(f(src[i]))`.
pub fn apply_ret_with<Tin, V, Tout, F, Cout>(
    dest: &mut NdarrayMut,
    src: &Ndarray,
    mut f: F,
    mut cout: Cout,
) -> Result<()>
where
    Tin: Scalar,
    Tout: Scalar,
    F: FnMut(Tin) -> V,
    Cout: FnMut(V) -> Tout,
{
    apply(dest, src, move |x| cout(f(x)))
}

fn apply2_inner<Tin, T1, T2, F>(
    dest1: &mut NdarrayMut,
    dest2: &mut NdarrayMut,
    src: &Ndarray,
    blocked: bool,
    mut f: F,
) -> Result<()>
where
    Tin: Scalar,
    T1: Scalar,
    T2: Scalar,
    F: FnMut(Tin) -> (T1, T2),
{
    ensure_same_shape(src.shape(), dest1.shape())?;
    ensure_same_shape(src.shape(), dest2.shape())?;
    if src.ndims() > MAX_LOOP_RANK {
        let d1 = dest1.buffer_mut_ptr();
        let d2 = dest2.buffer_mut_ptr();
        let sptr = src.data().as_ptr();
        for i in 0..src.len() as isize {
            let bin = vind_to_bind(
                src.shape(),
                src.strides(),
                src.offset(),
                src.order(),
                i,
                src.index_mode(),
            )?;
            let b1 = vind_to_bind(
                dest1.shape(),
                dest1.strides(),
                dest1.offset(),
                dest1.order(),
                i,
                dest1.index_mode(),
            )?;
            let b2 = vind_to_bind(
                dest2.shape(),
                dest2.strides(),
                dest2.offset(),
                dest2.order(),
                i,
                dest2.index_mode(),
            )?;
            unsafe {
                let (r1, r2) = f(Tin::read(sptr.offset(bin)));
                T1::write(d1.offset(b1), r1);
                T2::write(d2.offset(b2), r2);
            }
        }
        return Ok(());
    }
    let d1 = dest1.as_mut_ptr();
    let d2 = dest2.as_mut_ptr();
    let sptr = src.as_ptr() as *mut u8;
    drive(
        src.shape(),
        src.order(),
        src.len(),
        [sptr, d1, d2],
        [src.strides(), dest1.strides(), dest2.strides()],
        [
            src.bytes_per_element(),
            dest1.bytes_per_element(),
            dest2.bytes_per_element(),
        ],
        [src.flags(), dest1.flags(), dest2.flags()],
        blocked,
        |ptrs: &[*mut u8; 3]| unsafe {
            let (r1, r2) = f(Tin::read(ptrs[0]));
            T1::write(ptrs[1], r1);
            T2::write(ptrs[2], r2);
        },
    );
    Ok(())
}

/// Applies `f` element-wise with two outputs:
/// `(dest1[i], dest2[i]) = f(src[i])`.
///
/// All three views must share a shape; strides and dtypes are independent.
pub fn apply2<Tin, T1, T2, F>(
    dest1: &mut NdarrayMut,
    dest2: &mut NdarrayMut,
    src: &Ndarray,
    f: F,
) -> Result<()>
where
    Tin: Scalar,
    T1: Scalar,
    T2: Scalar,
    F: FnMut(Tin) -> (T1, T2),
{
    apply2_inner(dest1, dest2, src, false, f)
}

/// Cache-blocked variant of [`apply2`].
pub fn apply2_blocked<Tin, T1, T2, F>(
    dest1: &mut NdarrayMut,
    dest2: &mut NdarrayMut,
    src: &Ndarray,
    f: F,
) -> Result<()>
where
    Tin: Scalar,
    T1: Scalar,
    T2: Scalar,
    F: FnMut(Tin) -> (T1, T2),
{
    apply2_inner(dest1, dest2, src, true, f)
}
