//! Driver loop against the scripted backend
use std::cell::Cell;
use wmles_driver::boundary::BoundaryReader;
use wmles_driver::comm::Communication;
use wmles_driver::driver::scripted::Call;
use wmles_driver::driver::{
    resolve_marker, step_lifecycle, time_window, Controller, FlowDriver, ScriptedDriver,
};
use wmles_driver::sink::{BoundaryHistory, Discard};
use wmles_driver::types::{LifecycleStage, MarkerId, TimeWindow, VertexSample};
use wmles_driver::{integrate, run, DriverError, StopReason};

/// Serial context that counts barriers
#[derive(Default)]
struct CountingComm {
    barriers: Cell<usize>,
}

impl Communication for CountingComm {
    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn barrier(&self) {
        self.barriers.set(self.barriers.get() + 1);
    }
    fn all_gather_sum(&self, local: &[f64], global: &mut [f64]) {
        global.copy_from_slice(local);
    }
}

fn lower_wall(n: usize) -> Vec<VertexSample> {
    (0..n)
        .map(|j| VertexSample {
            u: 10. + j as f64,
            du: 100.,
            y: 0.05,
            tauw: 1.,
        })
        .collect()
}

fn channel(start: usize, n_iter: usize) -> ScriptedDriver {
    ScriptedDriver::new(TimeWindow::new(start, n_iter))
        .with_marker("lower", lower_wall(4))
        .with_marker("upper", lower_wall(3))
}

fn lifecycle(t: usize) -> Vec<Call> {
    vec![
        Call::Preprocess(t),
        Call::Run,
        Call::Postprocess,
        Call::Update,
        Call::Output(t),
        Call::Monitor(t),
    ]
}

#[test]
fn test_time_window_is_idempotent() {
    let driver = channel(7, 10);
    let first = time_window(&driver);
    for _ in 0..3 {
        assert_eq!(time_window(&driver), first);
    }
    assert_eq!(driver.n_time_iter(), 10);
    assert_eq!(first.iter().collect::<Vec<_>>(), (7..17).collect::<Vec<_>>());
}

#[test]
fn test_marker_resolution_is_deterministic() {
    let driver = channel(0, 1);
    let first = resolve_marker(&driver, "upper");
    assert_eq!(first, Some(MarkerId(1)));
    assert_eq!(resolve_marker(&driver, "upper"), first);
}

#[test]
fn test_lifecycle_order_for_every_time_iteration() {
    let mut driver = channel(3, 5);
    let comm = CountingComm::default();
    let summary = run(&mut driver, "lower", 0, &mut Discard, &comm).unwrap();
    assert_eq!(summary.steps, 5);
    let expected: Vec<Call> = (3..8).flat_map(lifecycle).collect();
    assert_eq!(driver.lifecycle_calls(), expected);
    assert_eq!(comm.barriers.get(), 1);
}

#[test]
fn test_monitor_stop_ends_loop_without_reads() {
    let mut driver = channel(0, 10).stop_at(4);
    let mut history = BoundaryHistory::new();
    let summary = run(&mut driver, "lower", 0, &mut history, &CountingComm::default()).unwrap();
    assert_eq!(summary.reason, StopReason::Monitor);
    assert_eq!(summary.steps, 5);
    assert_eq!(summary.last_time_iter, Some(4));
    // Reads happened for 0..=3 only
    assert_eq!(history.time_iters, vec![0, 1, 2, 3]);
    assert_eq!(driver.read_count(), 4 * 4 * 4);
    assert_eq!(driver.calls().last(), Some(&Call::Monitor(4)));
}

#[test]
fn test_vertex_count_is_queried_once() {
    let mut driver = channel(0, 6);
    run(&mut driver, "lower", 0, &mut Discard, &CountingComm::default()).unwrap();
    let queries = driver
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::NumberVertices(_)))
        .count();
    assert_eq!(queries, 1);
    // Re-querying after the run gives the same count
    assert_eq!(driver.number_vertices(MarkerId(0)), 4);
}

#[test]
fn test_ten_steps_four_vertices() {
    let mut driver = channel(0, 10);
    let mut history = BoundaryHistory::new();
    let summary = run(&mut driver, "lower", 0, &mut history, &CountingComm::default()).unwrap();
    assert_eq!(summary.steps, 10);
    assert_eq!(summary.samples, 40);
    assert_eq!(summary.reason, StopReason::Completed);
    assert_eq!(driver.lifecycle_calls().len(), 60);
    // Four getters per vertex sample
    assert_eq!(driver.read_count(), 40 * 4);
    assert_eq!(history.len(), 10);
    for snapshot in history.snapshots() {
        assert_eq!(snapshot.n_vertex(), 4);
        assert_eq!(snapshot.fields().len(), 4);
        assert_eq!(snapshot.sample(1).unwrap().to_array(), [11., 100., 0.05, 1.]);
    }
}

#[test]
fn test_missing_marker_is_fatal_before_loop() {
    let mut driver =
        ScriptedDriver::new(TimeWindow::new(0, 10)).with_marker("lower", lower_wall(4));
    let comm = CountingComm::default();
    let err = run(&mut driver, "upper", 0, &mut Discard, &comm).unwrap_err();
    assert!(matches!(err, DriverError::MarkerNotFound { ref name } if name == "upper"));
    assert!(driver
        .calls()
        .iter()
        .all(|c| matches!(c, Call::MarkerTags | Call::MarkerIds)));
    assert_eq!(comm.barriers.get(), 0);
}

#[test]
fn test_tag_without_id_is_not_found() {
    let mut driver = channel(0, 3).with_unmapped_tag("side");
    assert_eq!(resolve_marker(&driver, "side"), None);
    assert!(run(&mut driver, "side", 0, &mut Discard, &CountingComm::default()).is_err());
    assert!(driver.lifecycle_calls().is_empty());
}

#[test]
fn test_solver_failure_aborts_run() {
    let mut driver = channel(0, 10).fail_at(LifecycleStage::Run, 2);
    let mut history = BoundaryHistory::new();
    let err = run(&mut driver, "lower", 0, &mut history, &CountingComm::default()).unwrap_err();
    assert!(matches!(
        err,
        DriverError::Solver {
            stage: LifecycleStage::Run,
            time_iter: 2,
            ..
        }
    ));
    assert_eq!(history.time_iters, vec![0, 1]);
    let calls = driver.lifecycle_calls();
    assert_eq!(calls.last(), Some(&Call::Run));
    assert_eq!(calls.len(), 6 * 2 + 2);
}

#[test]
fn test_samples_reflect_latest_step() {
    let mut driver = channel(0, 3).with_drift(1.);
    let mut history = BoundaryHistory::new();
    run(&mut driver, "lower", 0, &mut history, &CountingComm::default()).unwrap();
    let tauw: Vec<f64> = history.snapshots().iter().map(|s| s.tauw[0]).collect();
    assert_eq!(tauw, vec![1., 2., 3.]);
}

#[test]
fn test_integrate_with_controller() {
    let driver = channel(0, 4);
    let reader = BoundaryReader::new(&driver, "upper", 1).unwrap();
    let mut controller = Controller::new(driver);
    let summary = integrate(
        &mut controller,
        &reader,
        &mut Discard,
        &CountingComm::default(),
    )
    .unwrap();
    assert_eq!(summary.samples, 12);
    // Integrating again is rejected, time iteration 0 does not follow 3
    assert!(integrate(
        &mut controller,
        &reader,
        &mut Discard,
        &CountingComm::default()
    )
    .is_err());
    let mut driver = controller.into_inner();
    assert!(step_lifecycle(&mut driver, 4).is_ok());
}
