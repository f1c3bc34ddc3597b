use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sf_compiler::{build_whole_word_pattern, compile_tag_ruleset, selector_from_template};

fn tag_rules(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 3 {
            0 => format!("tag{}", i),
            1 => format!("tag{}&tag{}", i, i + 1),
            _ => format!("tag{}|tag{}&tag{}", i, i + 1, i + 2),
        })
        .collect()
}

fn bench_compile(c: &mut Criterion) {
    let rules = tag_rules(300);
    let generator = |tag: &str| selector_from_template("a.tag[href$=\"/{tag}\"]", tag);

    c.bench_function("compile_tag_ruleset_300", |b| {
        b.iter(|| compile_tag_ruleset(black_box(&rules), &generator))
    });

    let words: Vec<String> = (0..300).map(|i| format!("word{}", i)).collect();
    c.bench_function("whole_word_pattern_300", |b| {
        b.iter(|| build_whole_word_pattern(black_box(&words)))
    });
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
