mod delay;
mod envelope;
mod smooth;

pub use delay::bench_delay;
pub use envelope::bench_envelope;
pub use smooth::bench_smooth;
