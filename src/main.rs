use logix::node::builtin::{Clock, Constant, Counter, Inverter, IoPin, PinData};
use logix::node::PointerEvent;
use logix::{LogixResult, NodeId, Scheduler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("═══════════════════════════════════════════════════════");
    println!("  LogiX — Event-Driven Logic Simulation");
    println!("═══════════════════════════════════════════════════════");
    println!();

    if let Err(e) = run() {
        error!(error = %e, "demo failed");
        std::process::exit(1);
    }
}

fn run() -> LogixResult<()> {
    // ── Combinational: constant through an inverter ───────────
    let mut sim = Scheduler::new();
    let c = sim.add(Constant::new(4, 0xA)?)?;
    let inv = sim.add(Inverter::new(4)?)?;
    sim.connect(c, "Y", inv, "in")?;
    sim.prepare();
    sim.tick();
    println!("  Inverter: in={} out={}", sim.read(inv, "in")?, sim.read(inv, "out")?);
    println!();

    // ── Sequential: clocked counter ───────────────────────────
    let mut sim = Scheduler::new();
    let clk = sim.add(Clock::new(1, 1)?)?;
    let counter = sim.add(Counter::new(4)?)?;
    let en = sim.add(level(1, "1")?)?;
    let ld = sim.add(level(1, "0")?)?;
    let up = sim.add(level(1, "1")?)?;
    let not_q = sim.add(Inverter::new(4)?)?;
    sim.connect(clk, "CLK", counter, "CLK")?;
    sim.connect(en, "Q", counter, "EN")?;
    sim.connect(ld, "Q", counter, "LD")?;
    sim.connect(up, "Q", counter, "UP")?;
    sim.connect(counter, "Q", not_q, "in")?;

    let report = sim.prepare();
    info!(prepared = report.prepared, "circuit ready");

    println!("  {:>5}  {:>3}  {:>4}  {:>4}", "tick", "CLK", "Q", "~Q");
    print_row(&sim, clk, counter, not_q)?;
    for _ in 0..12 {
        sim.tick();
        print_row(&sim, clk, counter, not_q)?;
    }

    // Flip UP and count back down.
    sim.interact(up, PointerEvent::secondary(None))?;
    info!(tick = %sim.now(), "counting down");
    for _ in 0..8 {
        sim.tick();
        print_row(&sim, clk, counter, not_q)?;
    }
    println!();

    for diagnostic in sim.diagnostics() {
        println!("  ! {}", diagnostic);
    }
    println!("  ✓ Demo complete at {}.", sim.now());
    Ok(())
}

/// An input pin holding a fixed level.
fn level(bits: usize, values: &str) -> LogixResult<IoPin> {
    IoPin::with_data(PinData {
        bits,
        values: values.into(),
        ..PinData::default()
    })
}

fn print_row(sim: &Scheduler, clk: NodeId, counter: NodeId, not_q: NodeId) -> LogixResult<()> {
    println!(
        "  {:>5}  {:>3}  {:>4}  {:>4}",
        sim.now().to_string(),
        sim.read(clk, "CLK")?.to_string(),
        sim.read(counter, "Q")?.to_string(),
        sim.read(not_q, "out")?.to_string(),
    );
    Ok(())
}
