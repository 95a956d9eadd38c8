//! Benchmarks for destination rendering
//!
//! Measures template compilation and per-file path rendering.

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use reelname::context::{Context, Field};
use reelname::source::{EpisodeModel, Match, ParentModel};
use reelname::template::TemplateSet;
use reelname_common::MediaKind;
use std::path::Path;

/// Single component
const TEMPLATE_SIMPLE: &[&str] = &["{{ny}}"];

/// Default series layout
const TEMPLATE_SERIES: &[&str] = &["{{n}} ({{y}})", "Season {{s}}", "{{n}} - {{s00e00}} - {{t}}"];

/// Filters and media fields in every component
const TEMPLATE_COMPLEX: &[&str] = &[
    "{{az}}",
    "{{n|upper}} ({{y|default:unknown}})",
    "Season {{s|pad:2}}",
    "{{n}} - {{s00e00}} - {{t}} [{{vf}} {{vc}} {{ac}} {{channels}}] {{audioLanguages|join:+}}",
];

fn create_context() -> Context {
    let m = Match::Episode {
        parent: ParentModel {
            kind: MediaKind::Series,
            source: "tvdb".into(),
            ref_id: "78874".into(),
            title: "Firefly".into(),
            year: Some(2002),
        },
        episode: EpisodeModel {
            ref_id: "297989".into(),
            season: 1,
            episode: 1,
            name: Some("Serenity: Part 1/2".into()),
            air_date: NaiveDate::from_ymd_opt(2002, 12, 20),
        },
    };
    let mut ctx = Context::new();
    m.fill_context(&mut ctx);
    ctx.set(Field::VideoStandard, "1080p");
    ctx.set(Field::VideoCodec, "x265");
    ctx.set(Field::AudioCodec, "E-AC-3");
    ctx.set(Field::Channels, "5.1");
    ctx.set(Field::AudioLanguages, vec!["en".to_string(), "ja".to_string()]);
    ctx
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("template_compile");

    for (name, template) in [
        ("simple", TEMPLATE_SIMPLE),
        ("series", TEMPLATE_SERIES),
        ("complex", TEMPLATE_COMPLEX),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), template, |b, t| {
            b.iter(|| TemplateSet::compile(black_box(t)))
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_destination");
    let view = create_context().render_view();
    let base = Path::new("/media/tv");

    for (name, template) in [
        ("simple", TEMPLATE_SIMPLE),
        ("series", TEMPLATE_SERIES),
        ("complex", TEMPLATE_COMPLEX),
    ] {
        let set = TemplateSet::compile(template).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &set, |b, set| {
            b.iter(|| set.render_destination(black_box(&view), base, ".mkv"))
        });
    }

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_batch");
    let set = TemplateSet::compile(TEMPLATE_SERIES).unwrap();
    let base = Path::new("/media/tv");

    for size in [10usize, 100, 1000] {
        let contexts: Vec<_> = (0..size).map(|_| create_context()).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &contexts, |b, contexts| {
            b.iter(|| {
                for ctx in contexts {
                    let _ = black_box(set.render_destination(&ctx.render_view(), base, ".mkv"));
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_render, bench_batch);
criterion_main!(benches);
