//! Property tests for permutations, layout transforms and drop masks.

use ndarray::{Array1, Array2, Array3, Axis};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use zoneout_streams::data::transforms::to_time_major;
use zoneout_streams::data::{
    BatchScheme, BatchSource, Corpus, DataStream, Dataset, DropMaskSampler, DropSpec,
    Permutation, WindowedDataset,
};

fn ramp(b: usize, l: usize, f: usize) -> Array3<f32> {
    Array3::from_shape_fn((b, l, f), |(i, j, k)| (i * 10_000 + j * 100 + k) as f32)
}

proptest! {
    #[test]
    fn permutation_inverse_restores_axis(n in 1usize..40, seed in any::<u64>(), axis in 0usize..3) {
        let mut rng = StdRng::seed_from_u64(seed);
        let perm = Permutation::random(n, &mut rng);

        let mut sorted = perm.indices().to_vec();
        sorted.sort_unstable();
        prop_assert_eq!(sorted, (0..n).collect::<Vec<_>>());

        let mut shape = [2, 3, 2];
        shape[axis] = n;
        let data = ramp(shape[0], shape[1], shape[2]);
        let permuted = perm.apply(&data, Axis(axis)).unwrap();
        let restored = perm.inverse().apply(&permuted, Axis(axis)).unwrap();
        prop_assert_eq!(restored, data);
    }

    #[test]
    fn time_major_swaps_first_two_axes(b in 1usize..6, l in 1usize..12, f in 1usize..5) {
        let data = ramp(b, l, f);
        let tm = to_time_major(data.clone());
        prop_assert_eq!(tm.shape(), &[l, b, f]);
        for ((i, j, k), &value) in data.indexed_iter() {
            prop_assert_eq!(tm[[j, i, k]], value);
        }
    }

    #[test]
    fn training_masks_are_binary(
        p in 0.0f32..=1.0,
        steps in 1usize..20,
        batch in 1usize..8,
        hidden in 1usize..10,
        seed in any::<u64>(),
    ) {
        let spec = DropSpec::Single { prob: p, hidden_dim: hidden };
        let mut sampler = DropMaskSampler::new(spec, false, StdRng::seed_from_u64(seed)).unwrap();
        let mask = sampler.sample(steps, batch).unwrap();
        prop_assert_eq!(mask.shape(), &[steps, batch, hidden]);
        prop_assert!(mask.iter().all(|&v| v == 0.0 || v == 1.0));
    }

    #[test]
    fn evaluation_masks_are_constant(
        primary in 0.0f32..=1.0,
        secondary in 0.0f32..=1.0,
        steps in 1usize..10,
        batch in 1usize..5,
    ) {
        let spec = DropSpec::Pair { primary, secondary };
        let mut sampler = DropMaskSampler::new(spec, true, StdRng::seed_from_u64(0)).unwrap();
        let mask = sampler.sample(steps, batch).unwrap();
        prop_assert_eq!(mask.shape(), &[steps, batch, 2]);
        prop_assert!(mask.index_axis(Axis(2), 0).iter().all(|&v| v == primary));
        prop_assert!(mask.index_axis(Axis(2), 1).iter().all(|&v| v == secondary));
    }

    #[test]
    fn windows_fit_inside_the_corpus(
        rows in 20usize..400,
        length in 1usize..20,
        augment in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let data = Array2::from_shape_fn((rows, 1), |(i, _)| i as f32);
        let corpus = Arc::new(Corpus::new(data, None).unwrap());
        let expected = (rows / length).saturating_sub(augment as usize);
        prop_assume!(expected > 0);

        let dataset = WindowedDataset::new(corpus, length, augment, None).unwrap();
        prop_assert_eq!(dataset.num_examples(), expected);

        let mut stream = DataStream::new(dataset, BatchScheme::shuffled(7), StdRng::seed_from_u64(seed)).unwrap();
        for _ in 0..3 {
            let mut starts = Vec::new();
            for batch in stream.epoch() {
                let batch = batch.unwrap();
                let first: Array1<f32> = batch.features.index_axis(Axis(1), 0).column(0).to_owned();
                starts.extend(first.iter().map(|&v| v as usize));
                // Строки внутри окна идут подряд
                for window in batch.features.outer_iter() {
                    let column = window.column(0);
                    prop_assert!(column.windows(2).into_iter().all(|w| w[1] == w[0] + 1.0));
                    prop_assert!((column[length - 1] as usize) < rows);
                }
            }
            prop_assert_eq!(starts.len(), expected);
            let offset = starts.iter().min().copied().unwrap_or(0);
            prop_assert!(starts.iter().all(|&s| (s - offset) % length == 0));
            stream.open_epoch().unwrap();
        }
    }
}
