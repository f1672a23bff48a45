//! End-to-end checks: raw `.npy` bytes in, tensor views out.

use conjure_core::{npy, DType, Element, Tensor, TensorError};
use proptest::prelude::*;

fn npy_blob(header: &str, payload: &[u8]) -> Vec<u8> {
    let mut raw = b"\x93NUMPY\x01\x00".to_vec();
    raw.extend_from_slice(&(header.len() as u16).to_le_bytes());
    raw.extend_from_slice(header.as_bytes());
    raw.extend_from_slice(payload);
    raw
}

#[test]
fn decoded_matrix_rows_are_sub_tensors() {
    let payload: Vec<u8> = (0..6).flat_map(|i| (i as f32).to_le_bytes()).collect();
    let raw = npy_blob("{'descr': '<f4', 'fortran_order': False, 'shape': (2,3), }", &payload);

    let t = npy::decode(&raw).unwrap();
    assert_eq!(t.shape().dims(), &[2, 3]);
    assert_eq!(t.total_size(), 6);
    match t.get_element(1).unwrap() {
        Element::Tensor(row) => assert_eq!(row.values(), vec![3.0, 4.0, 5.0]),
        Element::Scalar(v) => panic!("expected a sub-tensor, got scalar {v}"),
    }
}

#[test]
fn single_element_tuple_parses_as_one_axis() {
    let payload: Vec<u8> = (0..6u32).flat_map(|i| i.to_le_bytes()).collect();
    let raw = npy_blob("{'descr': '<u4', 'fortran_order': False, 'shape': (6,), }", &payload);

    let t = npy::decode(&raw).unwrap();
    assert_eq!(t.shape().dims(), &[6]);
    assert_eq!(t.rank(), 1);
    assert_eq!(t.dtype(), DType::U32);
    assert_eq!(t.get_element(5).unwrap().as_scalar(), Some(5.0));
}

#[test]
fn unknown_dtype_never_falls_back() {
    let raw = npy_blob("{'descr': '<i8', 'fortran_order': False, 'shape': (1,), }", &[0u8; 8]);
    assert!(matches!(
        npy::decode(&raw),
        Err(TensorError::UnsupportedDtype { ref descr }) if descr == "<i8"
    ));
}

#[test]
fn visit_walks_every_element_in_flat_order() {
    let t = Tensor::from_f64(vec![10.0, 20.0, 30.0, 40.0], &[2, 2]).unwrap();
    let mut seen = Vec::new();
    let values = t.visit(|v, coord| {
        seen.push(coord.to_vec());
        v
    });
    assert_eq!(values, vec![10.0, 20.0, 30.0, 40.0]);
    assert_eq!(seen, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
}

#[test]
fn short_buffer_is_rejected() {
    assert!(matches!(
        Tensor::from_f32(vec![1.0, 2.0, 3.0], &[2, 2]),
        Err(TensorError::SizeMismatch { expected: 4, got: 3 })
    ));
}

#[test]
fn overflowing_header_shape_is_malformed() {
    let half = 1usize << (usize::BITS / 2);
    let header = format!("{{'descr': '<f4', 'fortran_order': False, 'shape': ({half}, {half}, 3), }}");
    assert!(matches!(
        npy::decode(&npy_blob(&header, &[])),
        Err(TensorError::MalformedHeader { field: "shape", .. })
    ));

    let header = "{'descr': '<u4', 'fortran_order': False, 'shape': (0, 7), }";
    let t = npy::decode(&npy_blob(header, &[])).unwrap();
    assert_eq!(t.total_size(), 0);
    assert_eq!(t.shape().dims(), &[0, 7]);
}

#[test]
fn max_value_is_zero_seeded() {
    let t = Tensor::from_f32(vec![-5.0, -1.0, -9.0], &[3]).unwrap();
    assert_eq!(t.max_value(), 0.0);
    assert_eq!(t.min_value(), -9.0);
    assert_eq!(t.value_range(), Some((-9.0, -1.0)));
}

#[test]
fn time_series_channels_from_decoded_blob() {
    let samples: Vec<f64> = (0..8).map(|i| i as f64 * 0.25).collect();
    let payload: Vec<u8> = samples.iter().flat_map(|v| v.to_le_bytes()).collect();
    let raw = npy_blob("{'descr': '<f8', 'fortran_order': False, 'shape': (2, 4), }", &payload);

    let t = npy::decode(&raw).unwrap();
    assert_eq!(t.get_channel_data(0).unwrap(), vec![0.0, 0.25, 0.5, 0.75]);
    assert_eq!(t.get_channel_data(1).unwrap(), vec![1.0, 1.25, 1.5, 1.75]);
    assert_eq!(t.to_rgba().unwrap().len(), 32);
}

fn tensor_strategy() -> impl Strategy<Value = Tensor> {
    prop::collection::vec(1usize..5, 0..=4).prop_flat_map(|shape| {
        let n: usize = shape.iter().product();
        prop::collection::vec(-1e6f32..1e6, n)
            .prop_map(move |data| Tensor::from_f32(data, &shape).unwrap())
    })
}

proptest! {
    #[test]
    fn prop_encode_decode_preserves_tensor(t in tensor_strategy()) {
        let back = npy::decode(&npy::encode(&t).unwrap()).unwrap();
        prop_assert_eq!(back.shape(), t.shape());
        prop_assert_eq!(back.values(), t.values());
    }

    #[test]
    fn prop_visit_is_total_and_ordered(t in tensor_strategy()) {
        let flats = t.visit(|_, coord| conjure_core::ravel_index(coord, t.strides()));
        prop_assert_eq!(flats, (0..t.total_size()).collect::<Vec<_>>());
    }

    #[test]
    fn prop_get_element_matches_flat_slice(t in tensor_strategy()) {
        prop_assume!(t.rank() >= 2);
        let len = t.strides()[0];
        for i in 0..t.shape().dims()[0] {
            let sub = t.get_element(i).unwrap().into_tensor().unwrap();
            prop_assert_eq!(sub.values(), t.values()[i * len..(i + 1) * len].to_vec());
        }
    }
}
