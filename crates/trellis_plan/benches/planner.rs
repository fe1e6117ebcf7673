use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use trellis_core::EntityId;
use trellis_plan::{
    AgentDef, PlanOptions, Planner, Resolved, SystemInputs, TieBreak, WorkflowDef, WorkflowStep,
    strategy_fn,
};

const SIZES: [usize; 3] = [100, 1_000, 10_000];

/// n0 <- n1 <- ... <- n{len-1}
fn chain(len: usize) -> SystemInputs {
    let mut inputs = SystemInputs::new().with_agent(AgentDef::new("n0"));
    for i in 1..len {
        let agent = AgentDef::new(format!("n{i}")).with_sub_agents([format!("n{}", i - 1)]);
        inputs = inputs.with_agent(agent);
    }
    inputs
}

/// `width` leaf agents, each led by a step of one workflow
fn fan_in(width: usize) -> SystemInputs {
    let mut inputs = SystemInputs::new();
    let mut workflow = WorkflowDef::new("sink");
    for i in 0..width {
        let id = format!("leaf{i:05}");
        inputs = inputs.with_agent(AgentDef::new(id.clone()));
        workflow = workflow.with_step(WorkflowStep::new(id));
    }
    inputs.with_workflow(workflow)
}

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("planner.plan");

    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));

        let inputs = chain(size);
        group.bench_with_input(BenchmarkId::new("chain", size), &inputs, |b, inputs| {
            let planner = Planner::default();
            b.iter(|| black_box(planner.plan(inputs).map(|p| p.order().len())));
        });

        let inputs = fan_in(size);
        for tie_break in [TieBreak::Lexical, TieBreak::Declaration] {
            let id = BenchmarkId::new(format!("fan_in/{tie_break}"), size);
            group.bench_with_input(id, &inputs, |b, inputs| {
                let planner = Planner::new(PlanOptions::new().with_tie_break(tie_break));
                b.iter(|| black_box(planner.plan(inputs).map(|p| p.order().len())));
            });
        }
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("planner.compile");

    for size in SIZES {
        let inputs = chain(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("chain", size), &inputs, |b, inputs| {
            let planner = Planner::default();
            b.iter(|| {
                let mut strategy = strategy_fn(
                    |_: &EntityId, deps: &Resolved<'_, usize, usize>| Ok::<_, String>(deps.len()),
                    |_: &EntityId, deps: &Resolved<'_, usize, usize>| Ok(deps.len()),
                );
                black_box(planner.build_and_compile(inputs, &mut strategy).is_ok())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_plan, bench_compile);
criterion_main!(benches);
