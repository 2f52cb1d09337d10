use criterion::{criterion_group, criterion_main, Criterion};
use pin_bus::SimulatedBus;
use pin_panel::{Color, Panel};

fn bench_fill_and_refresh(c: &mut Criterion) {
    c.bench_function("panel_clear_and_refresh", |b| {
        b.iter(|| {
            let mut panel = Panel::init(SimulatedBus::new()).unwrap();
            panel.clear(Color::White);
            for i in 0..200 {
                panel.draw_rect(i, i, 20, 20, Color::Red, true);
            }
            panel.refresh(pin_panel::RefreshMode::Full).unwrap();
        });
    });
}

criterion_group!(benches, bench_fill_and_refresh);
criterion_main!(benches);
