use gridfold::{reduce, EngineError};
use gridfold_runtime::{DeviceClient, DeviceConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn client(max_group_size: u32) -> DeviceClient {
    DeviceClient::new(DeviceConfig {
        max_group_size,
        pool_size: Some(2),
    })
    .unwrap()
}

#[test]
fn sums_a_small_array() {
    let client = client(4);
    let mut array = client.create(&[9i64, 3, 15]);
    let total = reduce(&client, &mut array, |a, b| a + b).unwrap();
    assert_eq!(total, 27);
}

#[test]
fn result_is_stable_across_group_sizes() {
    for cap in [2, 4, 8] {
        let client = client(cap);
        let input: Vec<i64> = (1..=7).collect();
        let mut array = client.create(&input);
        let total = reduce(&client, &mut array, |a, b| a + b).unwrap();
        assert_eq!(total, 28, "group cap {cap}");
    }
}

#[test]
fn single_element_is_returned_without_combining() {
    let client = client(4);
    let mut array = client.create(&[42i32]);
    let total = reduce(&client, &mut array, |_: i32, _| {
        panic!("combiner must not run for a single element")
    })
    .unwrap();
    assert_eq!(total, 42);
}

#[test]
fn empty_array_is_rejected() {
    let client = client(4);
    let mut array = client.create::<f64>(&[]);
    let err = reduce(&client, &mut array, |a, b| a + b).unwrap_err();
    assert!(matches!(err, EngineError::EmptyInput));
}

#[test]
fn matches_a_sequential_fold_on_random_input() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..10 {
        let len = rng.gen_range(1..2000);
        let input: Vec<i64> = (0..len).map(|_| rng.gen_range(-1000..1000)).collect();
        let expected: i64 = input.iter().sum();

        let client = client(8);
        let mut array = client.create(&input);
        let total = reduce(&client, &mut array, |a, b| a + b).unwrap();
        assert_eq!(total, expected, "len {len}");
    }
}

fn matmul2(a: [i64; 4], b: [i64; 4]) -> [i64; 4] {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
    ]
}

// Matrix products are associative but not commutative; the tree must
// combine left-biased pairs only, so the result equals the sequential
// left fold for every partition.
#[test]
fn preserves_operand_order_for_non_commutative_functions() {
    let mut rng = StdRng::seed_from_u64(7);
    let input: Vec<[i64; 4]> = (0..37)
        .map(|_| std::array::from_fn(|_| rng.gen_range(-3..4)))
        .collect();
    let expected = input[1..]
        .iter()
        .fold(input[0], |acc, m| matmul2(acc, *m));

    for cap in [2, 4, 16] {
        let client = client(cap);
        let mut array = client.create(&input);
        let product = reduce(&client, &mut array, matmul2).unwrap();
        assert_eq!(product, expected, "group cap {cap}");
    }
}

#[test]
fn panic_in_the_combiner_surfaces_as_an_execution_fault() {
    let client = client(4);
    let input: Vec<i32> = (0..64).collect();
    let mut array = client.create(&input);
    let err = reduce(&client, &mut array, |a: i32, b| {
        if b == 33 {
            panic!("bad pair");
        }
        a + b
    })
    .unwrap_err();
    assert!(matches!(err, EngineError::Execution(_)));
    assert!(err.to_string().contains("bad pair"));
}
