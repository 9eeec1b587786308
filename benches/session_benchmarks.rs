// ABOUTME: Benchmarks for the hot paths a bound session runs per message
// ABOUTME: Covers receipt parsing, submit_sm encoding, inbound frame parsing and the token bucket

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use smpp_session::datatypes::{DeliverSm, SubmitSm, SubmitSmResponse};
use smpp_session::session::TokenBucket;
use smpp_session::{Encodable, Frame, parse_receipt};
use std::io::Cursor;
use std::time::Duration;
use tokio::time::Instant;

const RECEIPT: &str =
    "id:0A1B2C3D4E sub:001 dlvrd:001 submit date:2401011200 done date:2401011201 stat:DELIVRD err:000 text:Hello World";

fn bench_receipt_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("receipt_parse");

    group.bench_function("standard", |b| b.iter(|| parse_receipt(black_box(RECEIPT))));
    group.bench_function("reordered_lowercase", |b| {
        b.iter(|| parse_receipt(black_box("err:000 STAT:delivrd text:x ID:0A1B2C3D4E")))
    });
    group.bench_function("no_receipt", |b| {
        b.iter(|| parse_receipt(black_box("see you at eight, bring the charger")))
    });

    group.finish();
}

fn bench_submit_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_sm_encode");

    for size in [16usize, 140, 254] {
        let submit = SubmitSm::new(1, "ACME", "15550001", "x".repeat(size)).with_delivery_receipt(true);
        group.bench_with_input(BenchmarkId::from_parameter(size), &submit, |b, submit| {
            b.iter(|| black_box(submit.to_bytes()))
        });
    }

    group.finish();
}

fn bench_frame_parse(c: &mut Criterion) {
    let submit_resp = SubmitSmResponse::new(7, 0, "0A1B2C3D4E").to_bytes().unwrap_or_default();
    let receipt = DeliverSm::receipt(8, RECEIPT).to_bytes().unwrap_or_default();

    let mut group = c.benchmark_group("frame_parse");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("submit_sm_resp", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(&submit_resp[..]));
            let len = Frame::check(&mut cursor).unwrap_or_default();
            black_box(Frame::parse(&submit_resp[..len]).is_ok())
        })
    });
    group.bench_function("deliver_sm_receipt", |b| {
        b.iter(|| black_box(Frame::parse(black_box(&receipt[..])).is_ok()))
    });

    group.finish();
}

fn bench_token_bucket(c: &mut Criterion) {
    c.bench_function("token_bucket_acquire", |b| {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(u32::MAX, start);
        b.iter(|| black_box(bucket.try_acquire(start)))
    });
}

criterion_group!(
    benches,
    bench_receipt_parse,
    bench_submit_encode,
    bench_frame_parse,
    bench_token_bucket
);
criterion_main!(benches);
