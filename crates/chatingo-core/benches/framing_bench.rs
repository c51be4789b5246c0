//! Criterion benchmarks for the Chatingo line framer.
//!
//! Measures how fast a burst of buffered chat lines is split into frames and
//! how fast server messages are rendered to wire text.
//!
//! Run with:
//! ```bash
//! cargo bench --package chatingo-core --bench framing_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use chatingo_core::{read_frame, ServerMessage};

fn make_burst(lines: usize, line_len: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(lines * (line_len + 2));
    for i in 0..lines {
        let body = "x".repeat(line_len);
        // Alternate terminators so both stripping paths are exercised.
        if i % 2 == 0 {
            buf.extend_from_slice(format!("{body}\n").as_bytes());
        } else {
            buf.extend_from_slice(format!("{body}\r\n").as_bytes());
        }
    }
    buf
}

fn bench_read_frame(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime");

    let mut group = c.benchmark_group("read_frame");
    for line_len in [16usize, 256, 2048] {
        let burst = make_burst(100, line_len);
        group.bench_with_input(BenchmarkId::from_parameter(line_len), &burst, |b, burst| {
            b.iter(|| {
                runtime.block_on(async {
                    let mut input: &[u8] = burst.as_slice();
                    while let Ok(frame) = read_frame(&mut input).await {
                        black_box(frame);
                    }
                })
            })
        });
    }
    group.finish();
}

fn bench_render_chat(c: &mut Criterion) {
    let msg = ServerMessage::Chat {
        from: "alice".to_string(),
        text: "Hello, everyone! How is it going today?".to_string(),
    };
    c.bench_function("render_chat_frame", |b| b.iter(|| black_box(&msg).to_frame()));
}

criterion_group!(benches, bench_read_frame, bench_render_chat);
criterion_main!(benches);
