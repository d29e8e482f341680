//! Benchmarks for pipeline definition.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use stepflow::prelude::*;
use stepflow::testing::{adder_step, TestCollaborators};

fn chain_pipeline(fixture: &TestCollaborators, length: usize) -> Pipeline {
    let adder = adder_step()
        .instance(&fixture.collaborators)
        .expect("adder step is valid");
    Pipeline::new("chain", fixture.collaborators.clone(), move || {
        let mut previous = adder.call(CallArgs::new().arg(json!(0)))?;
        for _ in 1..length {
            let artifact = previous
                .artifact()
                .cloned()
                .ok_or_else(|| StepflowError::Execution("expected one output".to_string()))?;
            previous = adder.call(CallArgs::new().arg(&artifact))?;
        }
        Ok(())
    })
    .with_emitter(std::sync::Arc::new(NoOpDefinitionEmitter))
}

fn wide_pipeline(fixture: &TestCollaborators, width: usize) -> Pipeline {
    let adder = adder_step()
        .instance(&fixture.collaborators)
        .expect("adder step is valid");
    Pipeline::new("wide", fixture.collaborators.clone(), move || {
        for a in 0..width {
            adder.call(CallArgs::new().arg(json!(a)))?;
        }
        Ok(())
    })
    .with_emitter(std::sync::Arc::new(NoOpDefinitionEmitter))
}

fn definition_benchmark(c: &mut Criterion) {
    let fixture = TestCollaborators::new();
    let mut group = c.benchmark_group("define");

    for size in [10, 100] {
        let chain = chain_pipeline(&fixture, size);
        group.bench_with_input(BenchmarkId::new("chain", size), &chain, |b, pipeline| {
            b.iter(|| black_box(pipeline.define().expect("chain defines")));
        });

        let wide = wide_pipeline(&fixture, size);
        group.bench_with_input(BenchmarkId::new("wide", size), &wide, |b, pipeline| {
            b.iter(|| black_box(pipeline.define().expect("wide defines")));
        });
    }
    group.finish();
}

criterion_group!(benches, definition_benchmark);
criterion_main!(benches);
