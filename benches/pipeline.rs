use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use mailcast::model::record::Record;
use mailcast::source;
use mailcast::template::Template;
use mailcast::validate::validate;

fn contact_table(rows: usize) -> String {
    let mut text = String::from("SNo,Name,Email,Title,Company\n");
    for i in 1..=rows {
        text.push_str(&format!(
            "{i},Person {i},person{i}@example.com,Engineer,\"Company {i}, Inc.\"\n"
        ));
    }
    text
}

fn bench_parse_and_validate(c: &mut Criterion) {
    let text = contact_table(1_000);

    c.bench_function("parse_validate_1000_rows", |b| {
        b.iter(|| {
            source::parse(black_box(&text))
                .filter(|row| validate(row).is_valid())
                .count()
        })
    });
}

fn bench_render(c: &mut Criterion) {
    let template = Template::builtin();
    let record = Record::new(7, "Ann Lee", "ann@acme.com", "Engineering Manager", "Acme");

    c.bench_function("render_builtin_template", |b| {
        b.iter(|| template.render(black_box(&record)))
    });
}

criterion_group!(benches, bench_parse_and_validate, bench_render);
criterion_main!(benches);
