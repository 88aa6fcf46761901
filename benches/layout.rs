use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sankey_layout::config::Config;
use sankey_layout::ir::{FlowGraph, LinkSpec, NodeSpec};
use sankey_layout::layout::Sankey;
use sankey_layout::render::render_svg;
use std::hint::black_box;

/// `columns` stages of `per_column` nodes, each node feeding `fan_out`
/// nodes of the next stage with deterministic pseudo-random weights.
fn layered_graph(columns: usize, per_column: usize, fan_out: usize) -> FlowGraph {
    let mut graph = FlowGraph::new();
    for c in 0..columns {
        graph.columns.push(format!("c{c}"));
        for n in 0..per_column {
            graph.nodes.push(NodeSpec::new(format!("c{c}-{n}")));
        }
    }
    let mut seed = 0x2545_f491u64;
    for c in 0..columns.saturating_sub(1) {
        for n in 0..per_column {
            for k in 0..fan_out {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let target = (n + k * 3 + (seed >> 40) as usize) % per_column;
                let value = 1.0 + ((seed >> 33) % 50) as f64;
                graph.links.push(LinkSpec::new(
                    c * per_column + n,
                    (c + 1) * per_column + target,
                    value,
                ));
            }
        }
    }
    graph
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let sankey = Sankey::new().size(960.0, 500.0);
    for (columns, per_column, fan_out) in [(4usize, 6usize, 2usize), (6, 12, 3), (8, 24, 4)] {
        let name = format!("{columns}x{per_column}x{fan_out}");
        let graph = layered_graph(columns, per_column, fan_out);
        group.bench_with_input(BenchmarkId::from_parameter(name), &graph, |b, graph| {
            b.iter(|| {
                let layout = sankey.layout(black_box(graph), 32).expect("layout failed");
                black_box(layout.nodes().len());
            });
        });
    }
    group.finish();
}

fn bench_iterations(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_iterations");
    let sankey = Sankey::new().size(960.0, 500.0);
    let graph = layered_graph(6, 12, 3);
    for iterations in [0usize, 8, 32, 128] {
        group.bench_with_input(
            BenchmarkId::from_parameter(iterations),
            &iterations,
            |b, &iterations| {
                b.iter(|| {
                    let layout = sankey.layout(&graph, black_box(iterations)).expect("layout failed");
                    black_box(layout.link_bend());
                });
            },
        );
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let config = Config::default();
    let graph = layered_graph(6, 12, 3);
    let layout = Sankey::from_config(&config.layout)
        .layout(&graph, config.layout.iterations)
        .expect("layout failed");
    c.bench_function("render_svg", |b| {
        b.iter(|| {
            let svg = render_svg(
                black_box(&layout),
                &config.theme,
                &config.layout,
                &config.render,
            );
            black_box(svg.len());
        });
    });
}

criterion_group!(benches, bench_layout, bench_iterations, bench_render);
criterion_main!(benches);
