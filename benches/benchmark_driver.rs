use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wmles_driver::comm::SerialComm;
use wmles_driver::driver::synthetic::ChannelConfig;
use wmles_driver::driver::{ScriptedDriver, SyntheticChannel};
use wmles_driver::run;
use wmles_driver::sink::{BoundaryHistory, Discard};
use wmles_driver::types::{TimeWindow, VertexSample};

const SIZES: [usize; 3] = [64, 512, 4096];
const N_ITER: usize = 100;

fn channel(n_vertex: usize) -> ChannelConfig {
    ChannelConfig::from_toml(&format!(
        "n_iter = {}\nfluctuation = 0.1\n\n[[marker]]\nname = \"lower\"\nvertices = {}\n",
        N_ITER, n_vertex
    ))
    .unwrap()
}

pub fn bench_scripted(c: &mut Criterion) {
    let mut group = c.benchmark_group("Scripted");
    group.significance_level(0.1).sample_size(10);
    for n in SIZES.iter() {
        let name = format!("Size: {} x {}", N_ITER, *n);
        group.bench_function(&name, |b| {
            b.iter(|| {
                let mut driver = ScriptedDriver::new(TimeWindow::new(0, N_ITER))
                    .with_marker("lower", vec![VertexSample::default(); *n]);
                run(&mut driver, "lower", 0, &mut Discard, &SerialComm).unwrap()
            })
        });
    }
    group.finish();
}

pub fn bench_synthetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("Synthetic");
    group.significance_level(0.1).sample_size(10);
    for n in SIZES.iter() {
        let config = channel(*n);
        let name = format!("Size: {} x {}", N_ITER, *n);
        group.bench_function(&name, |b| {
            b.iter(|| {
                let mut driver = SyntheticChannel::new(config.clone(), 0, 1).unwrap();
                let mut history = BoundaryHistory::new();
                run(&mut driver, "lower", 0, &mut history, &SerialComm).unwrap();
                black_box(history.mean_tauw())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scripted, bench_synthetic);
criterion_main!(benches);
