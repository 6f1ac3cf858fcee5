// ABOUTME: Benchmark suite for SSMI codec and dispatch performance
// ABOUTME: Measures line encoding, decoding with greedy last fields, and inbound dispatch

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ssmi::clock::ManualClock;
use ssmi::commands::request::SendBinarySms;
use ssmi::{BinaryMessage, Command, Direction, SsmiProtocol, TypedCommand};
use std::time::Duration;

const MO_LINE: &str = "SSMI,103,27821234567,1234,Hello there, how are you doing today?";
const SEQ_LINE: &str = "SSMI,100,27821234567,1234";

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("send_binary_sms", |b| {
        b.iter(|| {
            let command = Command::build(
                SendBinarySms::DESCRIPTOR,
                [("msisdn", "27821234567"), ("hex_msg", "0B0504158A00000003")],
                SendBinarySms::DEFAULTS,
            )
            .unwrap();
            black_box(command.encode())
        })
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("seq", |b| {
        b.iter(|| black_box(Command::decode(black_box(SEQ_LINE), Direction::Response).unwrap()))
    });

    for size in [16, 160, 1600] {
        let line = format!("SSMI,105,{}", "text, ".repeat(size / 6));
        group.bench_with_input(BenchmarkId::new("free_form", size), &line, |b, line| {
            b.iter(|| black_box(Command::decode(line, Direction::Response).unwrap()))
        });
    }

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    group.bench_function("mo_event", |b| {
        let mut protocol = SsmiProtocol::new(Vec::new(), ManualClock::new());
        b.iter(|| {
            protocol.line_received(black_box(MO_LINE)).unwrap();
            black_box(protocol.next_event())
        })
    });

    group.bench_function("send_and_correlate", |b| {
        let mut protocol = SsmiProtocol::new(Vec::new(), ManualClock::new());
        b.iter(|| {
            let mut pending = protocol
                .send_binary_message(BinaryMessage::new("27821234567", "CAFE"))
                .unwrap();
            protocol.line_received(SEQ_LINE).unwrap();
            protocol.transport_mut().clear();
            black_box(pending.try_take())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_dispatch);
criterion_main!(benches);
