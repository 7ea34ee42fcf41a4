use approx::assert_relative_eq;
use bytemuck::cast_slice;
use ndarray_base::shape::broadcast_shapes;
use ndarray_base::{
    bind_to_vind, unary, vind_to_bind, DType, IndexMode, IterationOrder, Ndarray, NdarrayError,
    NdarrayMut, Order, ScalarValue, COLUMN_MAJOR_CONTIGUOUS_FLAG, ROW_MAJOR_CONTIGUOUS_FLAG,
};

fn f64_bytes(values: &[f64]) -> Vec<u8> {
    cast_slice(values).to_vec()
}

#[test]
fn test_row_major_contiguous_read() {
    let buf = f64_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let a = Ndarray::new(DType::Float64, &buf, &[2, 3], &[24, 8], 0, Order::RowMajor).unwrap();
    assert_eq!(a.iget_t::<f64>(4).unwrap(), 5.0);
    assert_eq!(a.get_t::<f64>(&[1, 1]).unwrap(), 5.0);
    assert_eq!(a.iget(4).unwrap(), ScalarValue::Float64(5.0));
    assert!(a.has_flags(ROW_MAJOR_CONTIGUOUS_FLAG));
}

#[test]
fn test_column_major_contiguous_read() {
    // Column-major storage of [[1, 2, 3], [4, 5, 6]].
    let buf = f64_bytes(&[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    let a = Ndarray::new(
        DType::Float64,
        &buf,
        &[2, 3],
        &[8, 16],
        0,
        Order::ColumnMajor,
    )
    .unwrap();
    // View index 4 in column-major order is subscript [0, 2].
    assert_eq!(a.iget_t::<f64>(4).unwrap(), 3.0);
    assert_eq!(a.get_t::<f64>(&[0, 2]).unwrap(), 3.0);
    assert!(a.has_flags(COLUMN_MAJOR_CONTIGUOUS_FLAG));
}

#[test]
fn test_negative_stride_with_offset() {
    let buf = f64_bytes(&[10.0, 20.0, 30.0]);
    let a = Ndarray::new(DType::Float64, &buf, &[3], &[-8], 16, Order::RowMajor).unwrap();
    assert_eq!(a.iget_t::<f64>(0).unwrap(), 30.0);
    assert_eq!(a.iget_t::<f64>(2).unwrap(), 10.0);
    assert_eq!(
        vind_to_bind(&[3], &[-8], 16, Order::RowMajor, 0, IndexMode::Error).unwrap(),
        16
    );
}

#[test]
fn test_wrap_index_mode() {
    let buf = f64_bytes(&[0.0, 1.0, 2.0, 3.0, 4.0]);
    let a = Ndarray::with_modes(
        DType::Float64,
        &buf,
        &[5],
        &[8],
        0,
        Order::RowMajor,
        IndexMode::Wrap,
        &[IndexMode::Error],
    )
    .unwrap();
    assert_eq!(
        a.iget_t::<f64>(-1).unwrap(),
        a.iget_t::<f64>(4).unwrap()
    );
    assert_eq!(a.iget_t::<f64>(7).unwrap(), a.iget_t::<f64>(2).unwrap());
}

#[test]
fn test_broadcast_compatibility() {
    assert_eq!(
        broadcast_shapes(&[&[8, 1, 6, 1], &[7, 1, 5]]).unwrap(),
        vec![8, 7, 6, 5]
    );
    assert!(matches!(
        broadcast_shapes(&[&[3], &[4]]),
        Err(NdarrayError::BroadcastFailure(_))
    ));
}

#[test]
fn test_unary_apply_2d_square() {
    let src_buf = f64_bytes(&[1.0, 2.0, 3.0, 4.0]);
    let src = Ndarray::new(
        DType::Float64,
        &src_buf,
        &[2, 2],
        &[16, 8],
        0,
        Order::RowMajor,
    )
    .unwrap();

    let mut plain_buf = f64_bytes(&[0.0; 4]);
    let mut plain = NdarrayMut::new(
        DType::Float64,
        &mut plain_buf,
        &[2, 2],
        &[16, 8],
        0,
        Order::RowMajor,
    )
    .unwrap();
    unary::apply(&mut plain, &src, |x: f64| x * x).unwrap();
    assert_eq!(plain.get_t::<f64>(&[0, 0]).unwrap(), 1.0);
    assert_eq!(plain.get_t::<f64>(&[0, 1]).unwrap(), 4.0);
    assert_eq!(plain.get_t::<f64>(&[1, 0]).unwrap(), 9.0);
    assert_eq!(plain.get_t::<f64>(&[1, 1]).unwrap(), 16.0);
    drop(plain);

    let mut blocked_buf = f64_bytes(&[0.0; 4]);
    let mut blocked = NdarrayMut::new(
        DType::Float64,
        &mut blocked_buf,
        &[2, 2],
        &[16, 8],
        0,
        Order::RowMajor,
    )
    .unwrap();
    unary::apply_blocked(&mut blocked, &src, |x: f64| x * x).unwrap();
    drop(blocked);
    assert_eq!(plain_buf, blocked_buf);
}

#[test]
fn test_identity_apply_is_bit_equal() {
    let values: Vec<f64> = (0..30).map(|v| v as f64 * 0.5 - 7.0).collect();
    let src_buf = f64_bytes(&values);
    let src = Ndarray::new(
        DType::Float64,
        &src_buf,
        &[5, 6],
        &[48, 8],
        0,
        Order::RowMajor,
    )
    .unwrap();
    let mut dst_buf = f64_bytes(&vec![0.0; 30]);
    let mut dst = NdarrayMut::new(
        DType::Float64,
        &mut dst_buf,
        &[5, 6],
        &[48, 8],
        0,
        Order::RowMajor,
    )
    .unwrap();
    unary::apply(&mut dst, &src, |x: f64| x).unwrap();
    drop(dst);
    assert_eq!(src_buf, dst_buf);
}

#[test]
fn test_round_trip_view_and_buffer_indices() {
    let cases: [(&[usize], &[isize], isize, Order); 6] = [
        (&[2, 3], &[24, 8], 0, Order::RowMajor),
        (&[2, 3], &[8, 16], 0, Order::ColumnMajor),
        (&[4], &[-8], 24, Order::RowMajor),
        (&[4], &[-8], 24, Order::ColumnMajor),
        (&[2, 2, 2], &[32, 16, 8], 0, Order::RowMajor),
        (&[2, 2, 2], &[8, 16, 32], 0, Order::ColumnMajor),
    ];
    for (shape, stride, offset, order) in cases {
        let len: usize = shape.iter().product();
        for i in 0..len as isize {
            let b = vind_to_bind(shape, stride, offset, order, i, IndexMode::Error).unwrap();
            let v = bind_to_vind(shape, stride, offset, order, b, IndexMode::Error).unwrap();
            assert_eq!(v, i, "shape {shape:?} strides {stride:?} order {order:?}");
        }
    }
}

#[test]
fn test_apply_respects_input_declared_order() {
    // A column-major declared input is visited first-axis-fastest. The
    // input has a row gap, so the nested loop (not the flat fast path)
    // drives the traversal.
    let src_buf = f64_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let src = Ndarray::new(
        DType::Float64,
        &src_buf,
        &[2, 2],
        &[32, 8],
        0,
        Order::ColumnMajor,
    )
    .unwrap();
    let mut dst_buf = f64_bytes(&[0.0; 4]);
    let mut dst = NdarrayMut::new(
        DType::Float64,
        &mut dst_buf,
        &[2, 2],
        &[16, 8],
        0,
        Order::ColumnMajor,
    )
    .unwrap();
    let mut seen = Vec::new();
    unary::apply(&mut dst, &src, |x: f64| {
        seen.push(x);
        x
    })
    .unwrap();
    // Subscript order [0,0], [1,0], [0,1], [1,1]; src[i][j] is buffer
    // element 4*i + j.
    assert_eq!(seen, vec![1.0, 5.0, 2.0, 6.0]);
}

#[test]
fn test_apply_f32_with_cast_variant() {
    let src: Vec<f32> = vec![1.5, 2.5, 3.5];
    let src_buf: Vec<u8> = cast_slice(&src).to_vec();
    let a = Ndarray::new(DType::Float32, &src_buf, &[3], &[4], 0, Order::RowMajor).unwrap();
    let mut dst_buf = vec![0u8; 24];
    let mut d = NdarrayMut::new(DType::Float64, &mut dst_buf, &[3], &[8], 0, Order::RowMajor)
        .unwrap();
    unary::apply_cast::<f32, f32, f64, _>(&mut d, &a, |x| x + 0.5).unwrap();
    assert_relative_eq!(d.get_t::<f64>(&[0]).unwrap(), 2.0);
    assert_relative_eq!(d.get_t::<f64>(&[2]).unwrap(), 4.0);
}

#[test]
fn test_flags_track_contiguity_predicates() {
    let buf = f64_bytes(&[0.0; 6]);
    for (shape, strides, order) in [
        (vec![2usize, 3], vec![24isize, 8], Order::RowMajor),
        (vec![2, 3], vec![8, 16], Order::ColumnMajor),
        (vec![6], vec![8], Order::RowMajor),
    ] {
        let a = Ndarray::new(DType::Float64, &buf, &shape, &strides, 0, order).unwrap();
        let rm = ndarray_base::shape::is_row_major_contiguous(
            DType::Float64,
            &shape,
            &strides,
            0,
        );
        let cm = ndarray_base::shape::is_column_major_contiguous(
            DType::Float64,
            &shape,
            &strides,
            0,
        );
        assert_eq!(a.has_flags(ROW_MAJOR_CONTIGUOUS_FLAG), rm);
        assert_eq!(a.has_flags(COLUMN_MAJOR_CONTIGUOUS_FLAG), cm);
    }
}

#[test]
fn test_iteration_order_signs() {
    use ndarray_base::shape::iteration_order;
    assert_eq!(iteration_order(&[24, 8]), IterationOrder::Forward);
    assert_eq!(iteration_order(&[-24, -8]), IterationOrder::Reverse);
    assert_eq!(iteration_order(&[24, -8]), IterationOrder::Mixed);
}

#[test]
fn test_safe_cast_diagonal() {
    use ndarray_base::{DTYPES, SAFE_CASTS};
    for &d in &DTYPES {
        assert!(SAFE_CASTS[d.index()][d.index()], "{d:?}");
    }
}

#[test]
fn test_partial_output_on_mid_sequence_failure() {
    // A failed subscript write after successful ones leaves earlier writes
    // in place; callers must treat the output as invalid.
    let mut buf = f64_bytes(&[0.0; 4]);
    let mut a = NdarrayMut::new(DType::Float64, &mut buf, &[4], &[8], 0, Order::RowMajor)
        .unwrap();
    a.set_t::<f64>(&[0], 1.0).unwrap();
    a.set_t::<f64>(&[1], 2.0).unwrap();
    assert!(a.set_t::<f64>(&[4], 3.0).is_err());
    assert_eq!(a.get_t::<f64>(&[0]).unwrap(), 1.0);
    assert_eq!(a.get_t::<f64>(&[1]).unwrap(), 2.0);
}
