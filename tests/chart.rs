use std::sync::Arc;

use chrono::{TimeZone, Utc};

use latency_blip::chart::{ChartRenderer, Rendered, TerminalRasterizer};
use latency_blip::sampling::{HistoryStore, Latency, Measurement, Sample, Target};

fn targets() -> Arc<[Target]> {
    vec![
        Target::new("gstatic", "https://www.gstatic.com/generate_204"),
        Target::new("apenwarr", "https://apenwarr.ca"),
    ]
    .into()
}

fn push(store: &HistoryStore, secs: i64, g: Latency, a: Latency) {
    store.append(Arc::new(Sample {
        timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        measurements: vec![
            Measurement {
                target: "gstatic".into(),
                latency: g,
            },
            Measurement {
                target: "apenwarr".into(),
                latency: a,
            },
        ],
    }));
}

fn renderer(store: Arc<HistoryStore>) -> ChartRenderer<TerminalRasterizer> {
    ChartRenderer::new(store, targets(), TerminalRasterizer::new(100, 30))
}

#[test]
fn no_data_below_two_samples() {
    let store = Arc::new(HistoryStore::new(60));
    let renderer = renderer(store.clone());
    assert!(renderer.render().is_no_data());

    push(&store, 0, Latency::Millis(12), Latency::Millis(80));
    assert!(renderer.render().is_no_data());

    push(&store, 1, Latency::Millis(14), Latency::Millis(85));
    assert!(!renderer.render().is_no_data());
}

#[test]
fn one_point_per_sample_per_series() {
    let store = Arc::new(HistoryStore::new(60));
    for secs in 0..7 {
        let a = if secs % 3 == 0 {
            Latency::Failed
        } else {
            Latency::Millis(90 + secs as u64)
        };
        push(&store, secs, Latency::Millis(10 + secs as u64), a);
    }

    let rendered = renderer(store.clone()).render();
    let data = rendered.data().expect("chart");
    assert_eq!(data.series.len(), 2);
    for series in &data.series {
        assert_eq!(series.points.len(), store.len());
    }
    // Failures are gaps, never zero
    let apenwarr = &data.series[1];
    assert_eq!(apenwarr.plotted_points(), 4);
    assert!(apenwarr
        .points
        .iter()
        .filter_map(|p| p.latency_ms)
        .all(|ms| ms >= 90.0));
}

#[test]
fn rendering_twice_is_identical_and_read_only() {
    let store = Arc::new(HistoryStore::new(60));
    for secs in 0..5 {
        push(&store, secs, Latency::Millis(20), Latency::Failed);
    }
    let before = store.snapshot();

    let renderer = renderer(store.clone());
    let first = renderer.render();
    let second = renderer.render();

    assert_eq!(first.image(), second.image());
    assert_eq!(first.data(), second.data());
    assert!(first.image().is_some());

    let after = store.snapshot();
    assert_eq!(before.len(), after.len());
    assert!(before.iter().zip(&after).all(|(b, a)| Arc::ptr_eq(b, a)));
}

#[test]
fn snapshot_follows_the_retention_window() {
    let store = Arc::new(HistoryStore::new(3));
    for secs in 0..8 {
        push(&store, secs, Latency::Millis(secs as u64), Latency::Millis(1));
    }

    let Rendered::Chart { data, .. } = renderer(store).render() else {
        panic!("expected a chart");
    };
    let values: Vec<Option<f64>> = data.series[0].points.iter().map(|p| p.latency_ms).collect();
    assert_eq!(values, vec![Some(5.0), Some(6.0), Some(7.0)]);
}
