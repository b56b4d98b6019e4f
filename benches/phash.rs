use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lecture_analyzer::slides::{hamming_distance, AverageHasher, Frame, FrameHasher};

fn synthetic_frame(width: u32, height: u32, seed: u8) -> Frame {
    let data = (0..width as usize * height as usize)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect();
    Frame {
        width,
        height,
        data,
    }
}

fn bench_average_hash(c: &mut Criterion) {
    let hasher = AverageHasher;

    let small = synthetic_frame(640, 360, 7);
    c.bench_function("ahash_640x360", |b| {
        b.iter(|| black_box(hasher.hash(black_box(&small)).unwrap()))
    });

    let large = synthetic_frame(1920, 1080, 7);
    c.bench_function("ahash_1920x1080", |b| {
        b.iter(|| black_box(hasher.hash(black_box(&large)).unwrap()))
    });
}

fn bench_hamming(c: &mut Criterion) {
    let hasher = AverageHasher;
    let a = hasher.hash(&synthetic_frame(640, 360, 7)).unwrap();
    let b_hash = hasher.hash(&synthetic_frame(640, 360, 113)).unwrap();

    c.bench_function("hamming_distance", |b| {
        b.iter(|| black_box(hamming_distance(black_box(a), black_box(b_hash))))
    });
}

criterion_group!(benches, bench_average_hash, bench_hamming);
criterion_main!(benches);
