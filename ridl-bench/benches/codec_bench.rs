//! Wire protocol and struct codec benchmarks.

use bytes::{Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ridl_codec::{CodecRegistry, StructValue, Value};
use ridl_protocol::{Frame, FrameDecoder};
use ridl_schema::Schema;
use std::sync::Arc;

const SCHEMA: &str = r#"
enums:
  - name: Kind
    values: [PLAIN, FANCY]
structs:
  - name: Point
    fields:
      - {id: 1, name: x, type: i32, requiredness: required}
      - {id: 2, name: y, type: i32, requiredness: required}
  - name: Shape
    fields:
      - {id: 1, name: name, type: string}
      - {id: 2, name: kind, type: Kind}
      - {id: 3, name: points, type: "list<Point>"}
      - {id: 4, name: tags, type: "map<string,i64>"}
      - {id: 5, name: parent, type: Shape, requiredness: optional}
"#;

fn registry() -> CodecRegistry {
    let schema = Schema::from_yaml_str(SCHEMA).unwrap();
    CodecRegistry::compile(Arc::new(schema)).unwrap()
}

fn shape(points: usize) -> StructValue {
    let points = (0..points as i32)
        .map(|i| StructValue::new("Point").with(1, i).with(2, -i).into())
        .collect();
    let tags = (0..8)
        .map(|i| (Value::from(format!("tag-{}", i)), Value::I64(i)))
        .collect();
    StructValue::new("Shape")
        .with(1, "polygon")
        .with(2, 1)
        .with(3, Value::List(points))
        .with(4, Value::Map(tags))
}

fn bench_struct_encode(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("struct_encode");

    for points in [10, 100, 1000] {
        let value = shape(points);

        group.throughput(Throughput::Elements(points as u64));
        group.bench_with_input(BenchmarkId::from_parameter(points), &value, |b, value| {
            b.iter(|| black_box(registry.encode_struct("Shape", value).unwrap()));
        });
    }

    group.finish();
}

fn bench_struct_decode(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("struct_decode");

    for points in [10, 100, 1000] {
        let encoded = registry.encode_struct("Shape", &shape(points)).unwrap();

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(points), &encoded, |b, encoded| {
            b.iter(|| black_box(registry.decode_struct("Shape", encoded.clone()).unwrap()));
        });
    }

    group.finish();
}

fn bench_nested_decode(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("nested_decode");

    for depth in [1, 8, 32] {
        let mut value = shape(1);
        for _ in 0..depth {
            value = shape(1).with(5, value);
        }
        let encoded = registry.encode_struct("Shape", &value).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(depth), &encoded, |b, encoded| {
            b.iter(|| black_box(registry.decode_struct("Shape", encoded.clone()).unwrap()));
        });
    }

    group.finish();
}

fn bench_encoded_size(c: &mut Criterion) {
    let registry = registry();
    let value = shape(100);

    c.bench_function("encoded_size", |b| {
        b.iter(|| black_box(registry.encoded_size("Shape", &value).unwrap()));
    });
}

fn bench_frame_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode");

    for size in [100, 1000, 10000] {
        let frame = Frame::new(Bytes::from(vec![0x42u8; size]));

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &frame, |b, frame| {
            b.iter(|| black_box(frame.encode().unwrap()));
        });
    }

    group.finish();
}

fn bench_frame_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode");

    for size in [100, 1000, 10000] {
        let encoded = Frame::new(Bytes::from(vec![0x42u8; size])).encode().unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| {
                let mut buf = BytesMut::from(&encoded[..]);
                black_box(Frame::decode(&mut buf).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_frame_decoder_partial(c: &mut Criterion) {
    let encoded = Frame::new(Bytes::from(vec![0x42u8; 4096])).encode().unwrap();

    c.bench_function("frame_decoder_partial_reads", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::new();
            for chunk in encoded.chunks(512) {
                decoder.extend(chunk);
            }
            black_box(decoder.decode_message().unwrap())
        });
    });
}

fn bench_crc32c(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32c");

    for size in [100, 1000, 10000, 100000] {
        let data = vec![0x42u8; size];

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| black_box(crc32c::crc32c(data)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_struct_encode,
    bench_struct_decode,
    bench_nested_decode,
    bench_encoded_size,
    bench_frame_encode,
    bench_frame_decode,
    bench_frame_decoder_partial,
    bench_crc32c,
);

criterion_main!(benches);
