//! Performance benchmarks for the modem output tokenizer and bridge codec.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench sms_parser_bench
//! ```

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use homeguard_protocol::{BridgeCodec, Notifications, StoredMessages};
use std::hint::black_box;
use tokio_util::codec::Decoder;

/// Build a list dump with `count` records, every fourth one damaged.
fn list_dump(count: usize) -> String {
    let mut dump = String::from("AT+CMGL=\"ALL\"\r\n");
    for i in 0..count {
        if i % 4 == 3 {
            dump.push_str(&format!("+CMGL: {i},\"REC READ\",\"+260970846745\r\nOPEN\r\n"));
        } else {
            dump.push_str(&format!(
                "+CMGL: {i},\"REC UNREAD\",\"+260970846745\",\"\",\"24/05/10,12:46:06+08\"\r\nSTATUS\r\n"
            ));
        }
    }
    dump.push_str("\r\nOK\r\n");
    dump
}

fn bench_list_dump(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_dump");

    for count in [1usize, 10, 50] {
        let dump = list_dump(count);
        group.throughput(Throughput::Bytes(dump.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &dump, |b, dump| {
            b.iter(|| black_box(StoredMessages::new(black_box(dump)).count()));
        });
    }

    group.finish();
}

fn bench_notifications(c: &mut Criterion) {
    let mut group = c.benchmark_group("notifications");
    group.throughput(Throughput::Elements(1));

    let input = "\r\n+CMT: \"+260970846745\",\"\",\"24/05/10,12:46:06+08\"\r\nOPEN\r\n";
    group.bench_function("single_notification", |b| {
        b.iter(|| black_box(Notifications::new(black_box(input)).count()));
    });

    group.finish();
}

fn bench_bridge_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("bridge_decode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("keypad_line", |b| {
        b.iter(|| {
            let mut codec = BridgeCodec::new();
            let mut buffer = BytesMut::from(&b"KEYPAD:123456\r\n"[..]);
            black_box(codec.decode(&mut buffer).unwrap());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_list_dump,
    bench_notifications,
    bench_bridge_decode
);
criterion_main!(benches);
