// benches/benchmarks.rs — Performance benchmarks (criterion)
//
// Hot paths of one request, model call excluded:
//   1. CSV load and typing
//   2. Code extraction and sanitizing of a model response
//   3. Prompt construction
//   4. Script execution against a loaded dataset

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use datascribe::dataset::loader::load_csv_reader;
use datascribe::dataset::Dataset;
use datascribe::infra::config::Config;
use datascribe::pipeline::extract::CodeExtractor;
use datascribe::pipeline::prompt::{AnalysisRequest, PromptBuilder};
use datascribe::pipeline::sanitize::Sanitizer;
use datascribe::sandbox::output::RecordingRenderer;
use datascribe::sandbox::rhai_executor::RhaiExecutor;
use datascribe::sandbox::{Bindings, Executor};

// ─── Helpers ────────────────────────────────────────────────────────────────

/// CSV text with `n` rows of date, region, sales, visitors.
fn sales_csv(n: usize) -> String {
    let regions = ["north", "south", "east", "west"];
    let mut csv = String::from("date,region,sales,visitors\n");
    for i in 0..n {
        csv.push_str(&format!(
            "2023-{:02}-{:02},{},{},{}\n",
            i % 12 + 1,
            i % 28 + 1,
            regions[i % regions.len()],
            1000 + (i * 37) % 5000,
            100 + (i * 13) % 400
        ));
    }
    csv
}

fn sales_dataset(n: usize) -> Dataset {
    load_csv_reader(sales_csv(n).as_bytes()).expect("valid csv")
}

const RESPONSE: &str = "Sure, here is the analysis:\n\n\
```rhai\n\
uploaded_file = st.file_uploader(\"Upload\");\n\
data = read_csv(\"sales.csv\");\n\
let g = data.group_by(\"region\", \"sales\", \"sum\");\n\
plt.bar(g[\"region\"], g[\"sales\"]);\n\
plt.title(\"Sales by region\");\n\
plt.show();\n\
st.metric(\"Total\", data.sum(\"sales\"));\n\
```\n\n\
The chart shows the totals.";

// ─── CSV load ───────────────────────────────────────────────────────────────

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");
    for n in [100, 10_000] {
        let csv = sales_csv(n);
        group.bench_function(format!("csv_{n}_rows"), |b| {
            b.iter(|| load_csv_reader(black_box(csv.as_bytes())).expect("valid csv"))
        });
    }
    group.finish();
}

// ─── Extract + sanitize ─────────────────────────────────────────────────────

fn bench_sanitize(c: &mut Criterion) {
    let config = Config::default();
    let extractor = CodeExtractor::new(&config.prompt.accepted_tags).expect("extractor");
    let sanitizer = Sanitizer::from_config(&config).expect("sanitizer");

    let mut group = c.benchmark_group("sanitize");
    group.bench_function("extract", |b| {
        b.iter(|| extractor.extract(black_box(RESPONSE)).expect("code block"))
    });
    let code = extractor.extract(RESPONSE).expect("code block");
    group.bench_function("rewrite_and_screen", |b| {
        b.iter(|| sanitizer.sanitize(black_box(code)).expect("passes screen"))
    });
    group.finish();
}

// ─── Prompt ─────────────────────────────────────────────────────────────────

fn bench_prompt(c: &mut Criterion) {
    let config = Config::default();
    let builder = PromptBuilder::from_config(&config);
    let dataset = sales_dataset(1_000);

    c.bench_function("prompt_build", |b| {
        b.iter(|| {
            let request = AnalysisRequest::from_dataset(
                "total sales per region",
                &dataset,
                config.prompt.preview_rows,
            );
            builder.build(black_box(&request))
        })
    });
}

// ─── Execution ──────────────────────────────────────────────────────────────

fn bench_execute(c: &mut Criterion) {
    let config = Config::default();
    let extractor = CodeExtractor::new(&config.prompt.accepted_tags).expect("extractor");
    let sanitizer = Sanitizer::from_config(&config).expect("sanitizer");
    let code = sanitizer
        .sanitize(extractor.extract(RESPONSE).expect("code block"))
        .expect("passes screen");
    let executor = RhaiExecutor::from_config(&config.execution);

    let mut group = c.benchmark_group("execute");
    for n in [100, 10_000] {
        let dataset = Arc::new(sales_dataset(n));
        group.bench_function(format!("group_by_chart_{n}_rows"), |b| {
            b.iter(|| {
                let renderer = Arc::new(RecordingRenderer::new());
                let bindings =
                    Bindings::new(config.bindings.clone(), dataset.clone(), renderer.clone());
                executor.execute(&code, bindings).expect("runs");
                renderer.take()
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_load,
    bench_sanitize,
    bench_prompt,
    bench_execute,
);
criterion_main!(benches);
