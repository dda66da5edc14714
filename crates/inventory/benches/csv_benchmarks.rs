use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use stockroom_inventory::csv::{read_records, ImportLayout, ImportRow};

/// Template-shaped file with `rows` data rows, a share of them quoted.
fn template_file(rows: usize) -> String {
    let mut out = String::from("\u{feff}Name,Description,Current Stock,Min Stock,Location\r\n");
    for i in 0..rows {
        if i % 5 == 0 {
            out.push_str(&format!(
                "\"Laptop {i}, refurbished\",\"14\"\" screen\",{},{},\"Shelf {}, bay 2\"\r\n",
                i % 40,
                i % 7,
                i % 12
            ));
        } else {
            out.push_str(&format!("Mouse {i},USB,{},{},Shelf {}\r\n", i % 40, i % 7, i % 12));
        }
    }
    out
}

fn bench_read_records(c: &mut Criterion) {
    let mut group = c.benchmark_group("csv_read_records");
    for rows in [100usize, 1_000, 10_000] {
        let input = template_file(rows);
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &input, |b, input| {
            b.iter(|| read_records(black_box(input)))
        });
    }
    group.finish();
}

fn bench_extract_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("csv_extract_rows");
    for rows in [1_000usize, 10_000] {
        let mut records = read_records(&template_file(rows));
        let header = records.remove(0);
        let layout = ImportLayout::detect(&header);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &records, |b, records| {
            b.iter(|| {
                records
                    .iter()
                    .filter(|r| ImportRow::extract(&layout, r).is_ok())
                    .count()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_read_records, bench_extract_rows);
criterion_main!(benches);
