mod shifter;

pub use shifter::bench_shifter;
