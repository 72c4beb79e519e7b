use gridfold::{apply, apply_flagged, EngineError};
use gridfold_runtime::{DeviceClient, DeviceConfig};

fn client(max_group_size: u32) -> DeviceClient {
    DeviceClient::new(DeviceConfig {
        max_group_size,
        pool_size: Some(2),
    })
    .unwrap()
}

#[test]
fn apply_transforms_every_element() {
    let client = client(4);
    let mut array = client.create(&[0i32, 1, 2, 3]);
    apply(&client, &mut array, |x| x + 1).unwrap();
    assert_eq!(array.read(), &[1, 2, 3, 4]);
}

#[test]
fn apply_flagged_skips_unflagged_elements() {
    let client = client(4);
    let mut array = client.create(&[0i32, 1, 2, 3]);
    let flags = client.create(&[1i32, 0, 1, 0]);
    apply_flagged(&client, &mut array, &flags, |x| x + 1).unwrap();
    assert_eq!(array.read(), &[1, 1, 3, 3]);
}

#[test]
fn apply_on_empty_array_is_a_no_op() {
    let client = client(4);
    let mut array = client.create::<f32>(&[]);
    apply(&client, &mut array, |x| x * 2.0).unwrap();
    assert!(array.read().is_empty());
}

#[test]
fn flag_length_mismatch_is_rejected_before_launch() {
    let client = client(4);
    let mut array = client.create(&[1i32, 2, 3]);
    let flags = client.create(&[1i32, 0]);
    let err = apply_flagged(&client, &mut array, &flags, |x| x).unwrap_err();
    assert!(matches!(
        err,
        EngineError::LengthMismatch {
            elements: 3,
            flags: 2
        }
    ));
    assert_eq!(array.read(), &[1, 2, 3]);
}

#[test]
fn apply_covers_ragged_multi_group_partitions() {
    let client = client(8);
    let input: Vec<u64> = (0..1000).collect();
    let mut array = client.create(&input);
    apply(&client, &mut array, |x| x * x).unwrap();
    let expected: Vec<u64> = input.iter().map(|x| x * x).collect();
    assert_eq!(array.read(), expected.as_slice());
}
