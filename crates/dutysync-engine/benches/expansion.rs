use chrono::{Duration, NaiveTime, TimeZone, Utc, Weekday};
use criterion::{criterion_group, criterion_main, Criterion};
use dutysync_engine::{
    diff, expand, Override, RemoteInterval, Restriction, RotationLayer, ScheduleSpec, Window,
};
use std::hint::black_box;

fn year_long_schedule() -> (ScheduleSpec, Window) {
    let anchor = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
    let people: Vec<String> = ["ana", "ben", "cho", "dev", "eli", "fay"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let weekly = RotationLayer::new(people.clone(), Duration::days(7), anchor).unwrap();
    let business_hours = RotationLayer::new(people[..3].to_vec(), Duration::days(1), anchor)
        .unwrap()
        .with_restriction(
            Restriction::new(
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
            )
            .unwrap(),
        );

    let mut spec = ScheduleSpec::new("bench", chrono_tz::America::New_York)
        .with_layer(weekly)
        .with_layer(business_hours);
    for week in 0..52 {
        let start = anchor + Duration::weeks(week) + Duration::days(2);
        spec = spec.with_override(Override::new("gus", start, start + Duration::hours(6)).unwrap());
    }

    let window = Window::new(anchor, anchor + Duration::days(365)).unwrap();
    (spec, window)
}

fn bench_expand(c: &mut Criterion) {
    let (spec, window) = year_long_schedule();
    c.bench_function("expand_year", |b| {
        b.iter(|| expand(black_box(&spec), black_box(&window)))
    });
}

fn bench_diff(c: &mut Criterion) {
    let (spec, window) = year_long_schedule();
    let desired = expand(&spec, &window);
    let actual: Vec<RemoteInterval> = desired
        .iter()
        .enumerate()
        .map(|(i, iv)| {
            let mut iv = iv.clone();
            // Shift every other interval so half the year needs updating.
            if i % 2 == 0 {
                iv.end = iv.end - Duration::minutes(30);
            }
            RemoteInterval::new(format!("R{i}"), iv)
        })
        .collect();

    c.bench_function("diff_year_half_changed", |b| {
        b.iter(|| diff(black_box(&desired), black_box(&actual)))
    });
}

criterion_group!(benches, bench_expand, bench_diff);
criterion_main!(benches);
