//! Circuit-level tests for the scheduler and the built-in nodes.

use crate::config::SchedulerConfig;
use crate::event::EventId;
use crate::node::builtin::{
    self, Adder, Bidirectional, BidirectionalMode, Buffer, Clock, Constant, Counter, Gate, GateOp,
    Inverter, IoPin, PinData, PinMode, PrioEncoder, Register, SplitDirection, Splitter, SrFlipFlop,
    TriState,
};
use crate::node::{
    Node, NodeDescription, NodeId, PinCollection, PinConfig, PinDirection, PinRef, PinWrite, Pins,
    PointerEvent,
};
use crate::scheduler::{Diagnostic, Scheduler};
use crate::signal::{LogicValue, LogicVec, ObservableValue, SignalError, SignalId};
use crate::tick::Tick;

fn read(s: &Scheduler, node: NodeId, pin: &str) -> String {
    s.read(node, pin).unwrap().to_string()
}

fn input_pin(bits: usize, values: &str) -> IoPin {
    IoPin::with_data(PinData {
        bits,
        values: values.into(),
        ..PinData::default()
    })
    .unwrap()
}

fn toggle(s: &mut Scheduler, pin: NodeId, bit: Option<usize>) {
    assert!(s.interact(pin, PointerEvent::secondary(bit)).unwrap());
}

// ── Propagation scenarios ─────────────────────────────────────────────

#[test]
fn test_constant_into_inverter() {
    let mut s = Scheduler::new();
    let c = s.add(Constant::new(4, 0xA).unwrap()).unwrap();
    let inv = s.add(Inverter::new(4).unwrap()).unwrap();
    s.connect(c, "Y", inv, "in").unwrap();

    let report = s.prepare();
    assert_eq!(report.prepared, 2);
    assert_eq!(read(&s, inv, "in"), "1010");
    // The inverter's write carries one tick of delay.
    assert_eq!(read(&s, inv, "out"), "ZZZZ");

    s.tick();
    assert_eq!(s.read(inv, "out").unwrap().to_u64(), Some(0x5));
}

#[test]
fn test_floating_input_floats_inverter() {
    let mut s = Scheduler::new();
    let inv = s.add(Inverter::new(2).unwrap()).unwrap();
    s.run_for(3);
    assert_eq!(read(&s, inv, "out"), "ZZ");
}

#[test]
fn test_tick_prepares_automatically() {
    let mut s = Scheduler::new();
    let c = s.add(Constant::new(1, 1).unwrap()).unwrap();
    let inv = s.add(Inverter::new(1).unwrap()).unwrap();
    s.connect(c, "Y", inv, "in").unwrap();

    let report = s.tick();
    assert_eq!(report.prepared, 2);
    assert_eq!(report.tick, Tick::new(1));
    assert_eq!(read(&s, inv, "out"), "0");
}

#[test]
fn test_tristate_bus_contention() {
    let mut s = Scheduler::new();
    let c1 = s.add(Constant::new(4, 0b1100).unwrap()).unwrap();
    let c2 = s.add(Constant::new(4, 0b0011).unwrap()).unwrap();
    let en1 = s.add(input_pin(1, "1")).unwrap();
    let en2 = s.add(input_pin(1, "1")).unwrap();
    let t1 = s.add(TriState::new(4).unwrap()).unwrap();
    let t2 = s.add(TriState::new(4).unwrap()).unwrap();
    s.connect(c1, "Y", t1, "in").unwrap();
    s.connect(c2, "Y", t2, "in").unwrap();
    s.connect(en1, "Q", t1, "EN").unwrap();
    s.connect(en2, "Q", t2, "EN").unwrap();
    s.connect(t1, "out", t2, "out").unwrap();

    s.prepare();
    s.tick();
    assert_eq!(read(&s, t1, "out"), "XXXX");
    assert_eq!(s.signal(t1, "out").unwrap().driver_count(), 2);
}

#[test]
fn test_tristate_single_driver_and_toggle() {
    let mut s = Scheduler::new();
    let c1 = s.add(Constant::new(4, 0b1100).unwrap()).unwrap();
    let c2 = s.add(Constant::new(4, 0b0011).unwrap()).unwrap();
    let en1 = s.add(input_pin(1, "1")).unwrap();
    let en2 = s.add(input_pin(1, "0")).unwrap();
    let t1 = s.add(TriState::new(4).unwrap()).unwrap();
    let t2 = s.add(TriState::new(4).unwrap()).unwrap();
    s.connect(c1, "Y", t1, "in").unwrap();
    s.connect(c2, "Y", t2, "in").unwrap();
    s.connect(en1, "Q", t1, "EN").unwrap();
    s.connect(en2, "Q", t2, "EN").unwrap();
    s.connect(t1, "out", t2, "out").unwrap();

    s.tick();
    assert_eq!(read(&s, t2, "out"), "1100");

    // Enable the second buffer: the toggle lands next tick, the buffer
    // output one tick after that.
    toggle(&mut s, en2, None);
    s.tick();
    assert_eq!(read(&s, t2, "out"), "1100");
    s.tick();
    assert_eq!(read(&s, t2, "out"), "XXXX");

    // Disable the first: the bus follows the second driver.
    toggle(&mut s, en1, None);
    s.run_for(2);
    assert_eq!(read(&s, t2, "out"), "0011");
}

#[test]
fn test_register_write_latency() {
    let mut s = Scheduler::new();
    let reg = s.add(Register::new(4).unwrap()).unwrap();
    let d = s.add(input_pin(4, "1001")).unwrap();
    let we = s.add(input_pin(1, "1")).unwrap();
    let clk = s.add(input_pin(1, "0")).unwrap();
    s.connect(d, "Q", reg, "D").unwrap();
    s.connect(we, "Q", reg, "WE").unwrap();
    s.connect(clk, "Q", reg, "CLK").unwrap();

    s.prepare();
    assert_eq!(read(&s, reg, "Q"), "0000");

    // Rising edge applied at t=1; Q follows at t=2.
    toggle(&mut s, clk, None);
    s.tick();
    assert_eq!(read(&s, reg, "Q"), "0000");
    s.tick();
    assert_eq!(read(&s, reg, "Q"), "1001");

    // Drop WE, change D, clock again: Q holds.
    toggle(&mut s, we, None);
    toggle(&mut s, d, Some(0));
    toggle(&mut s, clk, None);
    s.tick();
    assert_eq!(read(&s, reg, "D"), "1000");
    toggle(&mut s, clk, None);
    s.run_for(4);
    assert_eq!(read(&s, reg, "Q"), "1001");
    assert_eq!(s.node::<Register>(reg).unwrap().value().to_string(), "1001");
}

#[test]
fn test_register_reset() {
    let mut s = Scheduler::new();
    let reg = s.add(Register::new(2).unwrap()).unwrap();
    let d = s.add(input_pin(2, "11")).unwrap();
    let we = s.add(input_pin(1, "1")).unwrap();
    let clk = s.add(input_pin(1, "0")).unwrap();
    let r = s.add(input_pin(1, "0")).unwrap();
    s.connect(d, "Q", reg, "D").unwrap();
    s.connect(we, "Q", reg, "WE").unwrap();
    s.connect(clk, "Q", reg, "CLK").unwrap();
    s.connect(r, "Q", reg, "R").unwrap();

    s.prepare();
    toggle(&mut s, clk, None);
    s.run_for(2);
    assert_eq!(read(&s, reg, "Q"), "11");

    toggle(&mut s, r, None);
    s.run_for(2);
    assert_eq!(read(&s, reg, "Q"), "00");
}

#[test]
fn test_clock_waveform() {
    let mut s = Scheduler::new();
    let clk = s.add(Clock::new(2, 3).unwrap()).unwrap();
    s.prepare();

    let mut wave = read(&s, clk, "CLK");
    for _ in 0..10 {
        s.tick();
        wave.push_str(&read(&s, clk, "CLK"));
    }
    // Period 5 (3 low + 2 high), starting low.
    assert_eq!(wave, "00011000110");
}

#[test]
fn test_counter_counts_clock_edges() {
    let mut s = Scheduler::new();
    let clk = s.add(Clock::new(1, 1).unwrap()).unwrap();
    let counter = s.add(Counter::new(4).unwrap()).unwrap();
    let en = s.add(input_pin(1, "1")).unwrap();
    let ld = s.add(input_pin(1, "0")).unwrap();
    let up = s.add(input_pin(1, "1")).unwrap();
    s.connect(clk, "CLK", counter, "CLK").unwrap();
    s.connect(en, "Q", counter, "EN").unwrap();
    s.connect(ld, "Q", counter, "LD").unwrap();
    s.connect(up, "Q", counter, "UP").unwrap();

    // Rising edges at t=1 and t=3, each visible one tick later.
    s.run_for(4);
    assert_eq!(s.read(counter, "Q").unwrap().to_u64(), Some(2));

    // Count down.
    toggle(&mut s, up, None);
    s.run_for(4);
    assert_eq!(s.read(counter, "Q").unwrap().to_u64(), Some(0));
    assert_eq!(s.node::<Counter>(counter).unwrap().count(), Some(0));
}

#[test]
fn test_counter_wraps_below_zero() {
    let mut s = Scheduler::new();
    let counter = s.add(Counter::new(3).unwrap()).unwrap();
    let clk = s.add(input_pin(1, "0")).unwrap();
    let en = s.add(input_pin(1, "1")).unwrap();
    let ld = s.add(input_pin(1, "0")).unwrap();
    let up = s.add(input_pin(1, "0")).unwrap();
    s.connect(clk, "Q", counter, "CLK").unwrap();
    s.connect(en, "Q", counter, "EN").unwrap();
    s.connect(ld, "Q", counter, "LD").unwrap();
    s.connect(up, "Q", counter, "UP").unwrap();

    s.prepare();
    toggle(&mut s, clk, None);
    s.run_for(2);
    assert_eq!(s.read(counter, "Q").unwrap().to_u64(), Some(0b111));
}

#[test]
fn test_sr_flip_flop() {
    let mut s = Scheduler::new();
    let ff = s.add(SrFlipFlop::new()).unwrap();
    let set = s.add(input_pin(1, "0")).unwrap();
    let reset = s.add(input_pin(1, "0")).unwrap();
    let clk = s.add(input_pin(1, "0")).unwrap();
    s.connect(set, "Q", ff, "S").unwrap();
    s.connect(reset, "Q", ff, "R").unwrap();
    s.connect(clk, "Q", ff, "CLK").unwrap();

    s.prepare();
    assert_eq!(read(&s, ff, "Q"), "0");
    assert_eq!(read(&s, ff, "Q'"), "1");

    // S without clock does nothing.
    toggle(&mut s, set, None);
    s.run_for(2);
    assert_eq!(read(&s, ff, "Q"), "0");

    // Clock high latches the set.
    toggle(&mut s, clk, None);
    s.run_for(2);
    assert_eq!(read(&s, ff, "Q"), "1");
    assert_eq!(read(&s, ff, "Q'"), "0");

    // Both high is forbidden.
    toggle(&mut s, reset, None);
    s.run_for(2);
    assert_eq!(read(&s, ff, "Q"), "X");
    assert_eq!(read(&s, ff, "Q'"), "X");
}

#[test]
fn test_gate_and_adder() {
    let mut s = Scheduler::new();
    let a = s.add(Constant::new(4, 0xF).unwrap()).unwrap();
    let b = s.add(Constant::new(4, 0x1).unwrap()).unwrap();
    let cin = s.add(Constant::new(1, 0).unwrap()).unwrap();
    let adder = s.add(Adder::new(4).unwrap()).unwrap();
    let gate = s.add(Gate::new(GateOp::Xor, 4, 2).unwrap()).unwrap();
    s.connect(a, "Y", adder, "A").unwrap();
    s.connect(b, "Y", adder, "B").unwrap();
    s.connect(cin, "Y", adder, "CIN").unwrap();
    s.connect(a, "Y", gate, "A").unwrap();
    s.connect(b, "Y", gate, "B").unwrap();

    s.tick();
    assert_eq!(read(&s, adder, "SUM"), "0000");
    assert_eq!(read(&s, adder, "COUT"), "1");
    assert_eq!(read(&s, gate, "O"), "1110");
}

#[test]
fn test_adder_unsettled_input_is_undefined() {
    let mut s = Scheduler::new();
    let a = s.add(Constant::new(4, 3).unwrap()).unwrap();
    let adder = s.add(Adder::new(4).unwrap()).unwrap();
    s.connect(a, "Y", adder, "A").unwrap();
    s.tick();
    assert_eq!(read(&s, adder, "SUM"), "XXXX");
    assert_eq!(read(&s, adder, "COUT"), "X");
}

#[test]
fn test_splitter_both_directions() {
    let mut s = Scheduler::new();
    let c = s.add(Constant::new(4, 0b0110).unwrap()).unwrap();
    let split = s.add(Splitter::new(4, SplitDirection::Split).unwrap()).unwrap();
    let join = s.add(Splitter::new(4, SplitDirection::Combine).unwrap()).unwrap();
    s.connect(c, "Y", split, "multi").unwrap();
    for i in 0..4 {
        let pin = Splitter::single(i);
        s.connect(split, &pin, join, &pin).unwrap();
    }

    s.tick();
    assert_eq!(read(&s, split, "single_0"), "0");
    assert_eq!(read(&s, split, "single_1"), "1");
    s.tick();
    assert_eq!(read(&s, join, "multi"), "0110");
}

#[test]
fn test_buffer_delays() {
    let mut s = Scheduler::new();
    let c = s.add(Constant::new(1, 1).unwrap()).unwrap();
    let buf = s.add(Buffer::new(1, 3).unwrap()).unwrap();
    s.connect(c, "Y", buf, "in").unwrap();

    s.run_for(2);
    assert_eq!(read(&s, buf, "out"), "Z");
    s.tick();
    assert_eq!(read(&s, buf, "out"), "1");
}

#[test]
fn test_output_pin_observes_net() {
    let mut s = Scheduler::new();
    let c = s.add(Constant::new(3, 5).unwrap()).unwrap();
    let watch = s.add(IoPin::output(3).unwrap()).unwrap();
    s.connect(c, "Y", watch, "Q").unwrap();
    s.prepare();
    assert_eq!(s.node::<IoPin>(watch).unwrap().current().to_string(), "101");
    assert_eq!(
        s.node_description(watch).unwrap().data["values"],
        serde_json::json!("101")
    );
}

#[test]
fn test_clock_restarts_low_after_losing_the_line() {
    let mut s = Scheduler::new();
    let clk = s.add(Clock::new(1, 1).unwrap()).unwrap();
    s.prepare();

    // Float the clock's own drive at t=1, then force it undefined at t=5.
    s.schedule(clk, "CLK", LogicVec::floating(1), 1).unwrap();
    let mut wave = read(&s, clk, "CLK");
    for t in 1..=7 {
        if t == 5 {
            s.schedule(clk, "CLK", LogicVec::undefined(1), 0).unwrap();
        }
        s.tick();
        wave.push_str(&read(&s, clk, "CLK"));
    }
    assert_eq!(wave, "0Z010X01");
}

#[test]
fn test_input_pin_starts_low_where_undefined() {
    let mut s = Scheduler::new();
    let pin = s.add(input_pin(3, "X1Z")).unwrap();
    s.prepare();
    assert_eq!(read(&s, pin, "Q"), "01Z");
    assert_eq!(s.node::<IoPin>(pin).unwrap().current().to_string(), "01Z");
    assert_eq!(
        s.node_description(pin).unwrap().data["values"],
        serde_json::json!("01Z")
    );
}

#[test]
fn test_input_pin_follows_external_writes() {
    let mut s = Scheduler::new();
    let pin = s.add(input_pin(2, "00")).unwrap();
    s.prepare();

    s.schedule(pin, "Q", LogicVec::from_u64(0b11, 2), 1).unwrap();
    s.tick();
    assert_eq!(read(&s, pin, "Q"), "11");
    assert_eq!(s.node::<IoPin>(pin).unwrap().current().to_string(), "11");
    assert_eq!(
        s.node_description(pin).unwrap().data["values"],
        serde_json::json!("11")
    );

    // Toggling works from the value written from outside.
    toggle(&mut s, pin, Some(0));
    s.tick();
    assert_eq!(read(&s, pin, "Q"), "10");

    // A fight on the net does not overwrite the stored value.
    let c = s.add(Constant::new(2, 0b01).unwrap()).unwrap();
    s.connect(c, "Y", pin, "Q").unwrap();
    s.tick();
    assert_eq!(read(&s, pin, "Q"), "XX");
    assert_eq!(s.node::<IoPin>(pin).unwrap().current().to_string(), "10");
}

#[test]
fn test_counter_parallel_load() {
    let mut s = Scheduler::new();
    let counter = s.add(Counter::new(4).unwrap()).unwrap();
    let d = s.add(input_pin(4, "1010")).unwrap();
    let clk = s.add(input_pin(1, "0")).unwrap();
    let en = s.add(input_pin(1, "1")).unwrap();
    let ld = s.add(input_pin(1, "1")).unwrap();
    let up = s.add(input_pin(1, "1")).unwrap();
    s.connect(d, "Q", counter, "D").unwrap();
    s.connect(clk, "Q", counter, "CLK").unwrap();
    s.connect(en, "Q", counter, "EN").unwrap();
    s.connect(ld, "Q", counter, "LD").unwrap();
    s.connect(up, "Q", counter, "UP").unwrap();

    s.prepare();
    toggle(&mut s, clk, None);
    s.run_for(2);
    assert_eq!(read(&s, counter, "Q"), "1010");
    assert_eq!(s.node::<Counter>(counter).unwrap().count(), Some(0b1010));

    // Back to counting from the loaded value.
    toggle(&mut s, ld, None);
    toggle(&mut s, clk, None);
    s.tick();
    toggle(&mut s, clk, None);
    s.run_for(2);
    assert_eq!(read(&s, counter, "Q"), "1011");
}

#[test]
fn test_counter_undefined_load_then_reset() {
    let mut s = Scheduler::new();
    let counter = s.add(Counter::new(4).unwrap()).unwrap();
    let clk = s.add(input_pin(1, "0")).unwrap();
    let en = s.add(input_pin(1, "1")).unwrap();
    let ld = s.add(input_pin(1, "1")).unwrap();
    let r = s.add(input_pin(1, "0")).unwrap();
    s.connect(clk, "Q", counter, "CLK").unwrap();
    s.connect(en, "Q", counter, "EN").unwrap();
    s.connect(ld, "Q", counter, "LD").unwrap();
    s.connect(r, "Q", counter, "R").unwrap();

    // D is left floating, so the load is unknown.
    s.prepare();
    toggle(&mut s, clk, None);
    s.run_for(2);
    assert_eq!(read(&s, counter, "Q"), "XXXX");
    assert_eq!(s.node::<Counter>(counter).unwrap().count(), None);

    toggle(&mut s, r, None);
    s.run_for(2);
    assert_eq!(read(&s, counter, "Q"), "0000");
    assert_eq!(s.node::<Counter>(counter).unwrap().count(), Some(0));
}

#[test]
fn test_tristate_unknown_enable() {
    let mut s = Scheduler::new();
    let c = s.add(Constant::new(4, 0b1010).unwrap()).unwrap();
    let t = s.add(TriState::new(4).unwrap()).unwrap();
    s.connect(c, "Y", t, "in").unwrap();

    // Floating enable.
    s.run_for(2);
    assert_eq!(read(&s, t, "out"), "XXXX");

    // Contended enable.
    let hi = s.add(input_pin(1, "1")).unwrap();
    let lo = s.add(Constant::new(1, 0).unwrap()).unwrap();
    s.connect(hi, "Q", t, "EN").unwrap();
    s.connect(lo, "Y", t, "EN").unwrap();
    s.run_for(2);
    assert_eq!(read(&s, t, "EN"), "X");
    assert_eq!(read(&s, t, "out"), "XXXX");

    s.remove_node(lo).unwrap();
    s.run_for(2);
    assert_eq!(read(&s, t, "out"), "1010");
}

#[test]
fn test_bidirectional_a_to_b_then_released() {
    let mut s = Scheduler::new();
    let a = s.add(input_pin(4, "1010")).unwrap();
    let dir = s.add(input_pin(1, "0")).unwrap();
    let bidi = s
        .add(Bidirectional::new(4, BidirectionalMode::SinglePin).unwrap())
        .unwrap();
    let watch = s.add(IoPin::output(4).unwrap()).unwrap();
    s.connect(a, "Q", bidi, "A").unwrap();
    s.connect(dir, "Q", bidi, "DIR").unwrap();
    s.connect(bidi, "B", watch, "Q").unwrap();

    s.tick();
    assert_eq!(read(&s, watch, "Q"), "1010");
    assert_eq!(read(&s, bidi, "A"), "1010");

    // A floating DIR drives neither side.
    s.schedule(dir, "Q", LogicVec::floating(1), 0).unwrap();
    s.run_for(2);
    assert_eq!(read(&s, watch, "Q"), "ZZZZ");
    assert_eq!(read(&s, bidi, "A"), "1010");
}

#[test]
fn test_bidirectional_b_to_a_and_back() {
    let mut s = Scheduler::new();
    let watch = s.add(IoPin::output(4).unwrap()).unwrap();
    let b = s.add(input_pin(4, "0110")).unwrap();
    let dir = s.add(input_pin(1, "1")).unwrap();
    let bidi = s
        .add(Bidirectional::new(4, BidirectionalMode::SinglePin).unwrap())
        .unwrap();
    s.connect(watch, "Q", bidi, "A").unwrap();
    s.connect(b, "Q", bidi, "B").unwrap();
    s.connect(dir, "Q", bidi, "DIR").unwrap();

    s.tick();
    assert_eq!(read(&s, watch, "Q"), "0110");

    // Turning around releases A; nothing else drives it.
    toggle(&mut s, dir, None);
    s.run_for(3);
    assert_eq!(read(&s, watch, "Q"), "ZZZZ");
    assert_eq!(read(&s, bidi, "B"), "0110");
}

#[test]
fn test_bidirectional_separate_enables() {
    let mut s = Scheduler::new();
    let a = s.add(input_pin(4, "1100")).unwrap();
    let a_to_b = s.add(input_pin(1, "1")).unwrap();
    let b_to_a = s.add(input_pin(1, "1")).unwrap();
    let bidi = s
        .add(Bidirectional::new(4, BidirectionalMode::SeparatePins).unwrap())
        .unwrap();
    let watch = s.add(IoPin::output(4).unwrap()).unwrap();
    s.connect(a, "Q", bidi, "A").unwrap();
    s.connect(a_to_b, "Q", bidi, "A->B").unwrap();
    s.connect(b_to_a, "Q", bidi, "B->A").unwrap();
    s.connect(bidi, "B", watch, "Q").unwrap();

    // Both enables high: neither direction.
    s.tick();
    assert_eq!(read(&s, watch, "Q"), "ZZZZ");

    toggle(&mut s, b_to_a, None);
    s.run_for(2);
    assert_eq!(read(&s, watch, "Q"), "1100");
}

#[test]
fn test_prio_encoder_picks_highest_select() {
    let mut s = Scheduler::new();
    let enc = s
        .add(PrioEncoder::new(2, PinMode::Separate, PinMode::Combined).unwrap())
        .unwrap();
    let s1 = s.add(input_pin(1, "1")).unwrap();
    let s3 = s.add(input_pin(1, "0")).unwrap();
    s.connect(s1, "Q", enc, "S1").unwrap();
    s.connect(s3, "Q", enc, "S3").unwrap();

    // S0 and S2 float and count as low.
    s.tick();
    assert_eq!(read(&s, enc, "O"), "01");

    toggle(&mut s, s3, None);
    s.run_for(2);
    assert_eq!(read(&s, enc, "O"), "11");
}

#[test]
fn test_prio_encoder_defaults_to_zero() {
    let mut s = Scheduler::new();
    let enc = s
        .add(PrioEncoder::new(2, PinMode::Combined, PinMode::Separate).unwrap())
        .unwrap();
    let select = s.add(input_pin(4, "0000")).unwrap();
    s.connect(select, "Q", enc, "S").unwrap();

    s.tick();
    assert_eq!(read(&s, enc, "O1"), "0");
    assert_eq!(read(&s, enc, "O0"), "0");

    toggle(&mut s, select, Some(2));
    s.run_for(2);
    assert_eq!(read(&s, enc, "O1"), "1");
    assert_eq!(read(&s, enc, "O0"), "0");
}

// ── Lifecycle ─────────────────────────────────────────────────────────

#[test]
fn test_remove_node_releases_driver() {
    let mut s = Scheduler::new();
    let c1 = s.add(Constant::new(1, 1).unwrap()).unwrap();
    let c2 = s.add(Constant::new(1, 0).unwrap()).unwrap();
    let watch = s.add(IoPin::output(1).unwrap()).unwrap();
    s.connect(c1, "Y", watch, "Q").unwrap();
    s.connect(c2, "Y", watch, "Q").unwrap();
    s.prepare();
    assert_eq!(read(&s, watch, "Q"), "X");

    let removed = s.remove_node(c2).unwrap();
    assert_eq!(removed.kind(), "constant");
    assert_eq!(read(&s, watch, "Q"), "1");
    s.tick();
    assert_eq!(s.node::<IoPin>(watch).unwrap().current().to_string(), "1");

    s.remove_node(c1).unwrap();
    assert_eq!(read(&s, watch, "Q"), "Z");
    assert_eq!(s.wire_count(), 0);
    assert!(matches!(s.remove_node(c1), Err(crate::LogixError::NodeNotFound(_))));
}

#[test]
fn test_remove_node_purges_pending_events() {
    let mut s = Scheduler::new();
    let c = s.add(Constant::new(1, 1).unwrap()).unwrap();
    let buf = s.add(Buffer::new(1, 3).unwrap()).unwrap();
    let watch = s.add(IoPin::output(1).unwrap()).unwrap();
    s.connect(c, "Y", buf, "in").unwrap();
    s.connect(buf, "out", watch, "Q").unwrap();
    s.prepare();
    assert_eq!(s.pending_events(), 1);

    s.remove_node(buf).unwrap();
    assert_eq!(s.pending_events(), 0);
    s.run_for(5);
    assert_eq!(read(&s, watch, "Q"), "Z");
}

#[test]
fn test_disconnect_splits_net() {
    let mut s = Scheduler::new();
    let c = s.add(Constant::new(1, 1).unwrap()).unwrap();
    let watch = s.add(IoPin::output(1).unwrap()).unwrap();
    s.connect(c, "Y", watch, "Q").unwrap();
    s.prepare();
    assert_eq!(read(&s, watch, "Q"), "1");

    assert!(s.disconnect(watch, "Q", c, "Y").unwrap());
    assert!(!s.disconnect(watch, "Q", c, "Y").unwrap());
    assert_eq!(read(&s, watch, "Q"), "Z");
    assert_eq!(read(&s, c, "Y"), "1");
}

#[test]
fn test_connect_errors() {
    let mut s = Scheduler::new();
    let c = s.add(Constant::new(1, 1).unwrap()).unwrap();
    let inv = s.add(Inverter::new(1).unwrap()).unwrap();
    assert!(matches!(
        s.connect(c, "Q", inv, "in"),
        Err(crate::LogixError::UnknownPin { .. })
    ));
    assert!(matches!(
        s.connect(c, "Y", NodeId::new(99), "in"),
        Err(crate::LogixError::NodeNotFound(_))
    ));
    assert!(matches!(
        s.connect(inv, "in", inv, "in"),
        Err(crate::LogixError::SelfConnection { .. })
    ));
    assert!(s.connect(c, "Y", inv, "in").unwrap());
    assert!(!s.connect(inv, "in", c, "Y").unwrap());
}

#[test]
fn test_reinitialize_keeps_wires_by_name() {
    let mut s = Scheduler::new();
    let c = s.add(Constant::new(4, 0x3).unwrap()).unwrap();
    let inv = s.add(Inverter::new(4).unwrap()).unwrap();
    s.connect(c, "Y", inv, "in").unwrap();
    s.run_for(2);
    assert_eq!(read(&s, inv, "out"), "1100");

    s.reinitialize(c, &serde_json::json!({ "bits": 4, "value": 12 })).unwrap();
    assert_eq!(s.wire_count(), 1);
    s.run_for(2);
    assert_eq!(read(&s, inv, "out"), "0011");

    assert!(s.reinitialize(c, &serde_json::json!({ "bits": 0 })).is_err());
}

#[test]
fn test_description_round_trip_through_scheduler() {
    let mut s = Scheduler::new();
    let gate = s.add(Gate::new(GateOp::Nand, 2, 3).unwrap()).unwrap();
    let description = s.node_description(gate).unwrap();
    assert_eq!(description.kind, "gate");

    let copy = s.add_described(&description).unwrap();
    assert_eq!(
        s.pins(gate).unwrap().configs(),
        s.pins(copy).unwrap().configs()
    );
    let unknown = NodeDescription::new("nope", serde_json::Value::Null);
    assert!(s.add_described(&unknown).is_err());
}

// ── Engine guarantees ─────────────────────────────────────────────────

/// A node that inverts its own pin with no delay: a combinational loop.
struct Oscillator;

impl Node for Oscillator {
    fn kind(&self) -> &'static str {
        "oscillator"
    }

    fn pin_configuration(&self) -> Vec<PinConfig> {
        vec![PinConfig::new("x", 1, PinDirection::Bidirectional, true)]
    }

    fn initialize(&mut self, _data: &serde_json::Value) -> crate::LogixResult<()> {
        Ok(())
    }

    fn node_data(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn prepare(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        vec![pins.get("x").drive_bit(LogicValue::Low)]
    }

    fn evaluate(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        let x = pins.get("x");
        vec![x.drive_bit(!x.read_bit())]
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[test]
fn test_runaway_cascade_is_contained() {
    let config = SchedulerConfig {
        max_delta_iterations: 8,
        ..SchedulerConfig::default()
    };
    let mut s = Scheduler::with_config(config).unwrap();
    s.add(Oscillator).unwrap();

    let report = s.prepare();
    assert!(report.runaway);
    assert_eq!(report.passes, 8);
    assert_eq!(
        s.diagnostics().collect::<Vec<_>>(),
        vec![&Diagnostic::RunawayCascade {
            tick: Tick::ZERO,
            passes: 8,
            deferred: 1
        }]
    );

    // The engine keeps going.
    let report = s.tick();
    assert!(report.runaway);
    assert_eq!(s.now(), Tick::new(1));
    assert_eq!(s.take_diagnostics().len(), 2);
    assert_eq!(s.diagnostics().count(), 0);
}

#[test]
fn test_handle_from_another_thread() {
    let mut s = Scheduler::new();
    let pin = s.add(input_pin(1, "0")).unwrap();
    let inv = s.add(Inverter::new(1).unwrap()).unwrap();
    s.connect(pin, "Q", inv, "in").unwrap();
    s.tick();
    assert_eq!(read(&s, inv, "out"), "1");

    let handle = s.handle();
    std::thread::spawn(move || {
        handle
            .schedule(pin, "Q", LogicVec::from_u64(1, 1), 0)
            .unwrap();
        handle
            .schedule(pin, "nope", LogicVec::from_u64(1, 1), 0)
            .unwrap();
    })
    .join()
    .unwrap();

    s.tick();
    assert_eq!(read(&s, pin, "Q"), "1");
    s.tick();
    assert_eq!(read(&s, inv, "out"), "0");
    assert!(matches!(
        s.diagnostics().next(),
        Some(Diagnostic::DroppedWrite { pin: p, .. }) if p.as_str() == "nope"
    ));
}

#[test]
fn test_width_mismatch_is_sticky() {
    let mut s = Scheduler::new();
    let c = s.add(Constant::new(4, 0xA).unwrap()).unwrap();
    let inv = s.add(Inverter::new(2).unwrap()).unwrap();
    s.connect(c, "Y", inv, "in").unwrap();

    let expected = SignalError::PinWidthsMismatch {
        declared: 4,
        found: 2,
    };
    assert_eq!(s.signal_error(inv, "in").unwrap(), Some(expected));
    assert_eq!(s.signal_error(c, "Y").unwrap(), Some(expected));
    assert_eq!(s.signal_error(inv, "out").unwrap(), None);

    s.tick();
    assert_eq!(read(&s, inv, "in"), "XX");
    assert_eq!(read(&s, inv, "out"), "XX");
    // The wider side still sees the driven value.
    assert_eq!(read(&s, c, "Y"), "1010");
}

#[test]
fn test_same_tick_writes_from_one_driver() {
    let mut s = Scheduler::new();
    let pin = s.add(input_pin(1, "0")).unwrap();
    s.prepare();
    s.schedule(pin, "Q", LogicVec::from_u64(0, 1), 2).unwrap();
    s.schedule(pin, "Q", LogicVec::from_u64(1, 1), 2).unwrap();
    s.run_for(2);
    assert_eq!(read(&s, pin, "Q"), "1");
}

#[test]
fn test_runs_are_deterministic() {
    fn trace() -> Vec<String> {
        let mut s = Scheduler::new();
        let clk = s.add(Clock::new(1, 2).unwrap()).unwrap();
        let counter = s.add(Counter::new(3).unwrap()).unwrap();
        let en = s.add(input_pin(1, "1")).unwrap();
        let ld = s.add(input_pin(1, "0")).unwrap();
        let up = s.add(input_pin(1, "1")).unwrap();
        let inv = s.add(Inverter::new(3).unwrap()).unwrap();
        s.connect(clk, "CLK", counter, "CLK").unwrap();
        s.connect(en, "Q", counter, "EN").unwrap();
        s.connect(ld, "Q", counter, "LD").unwrap();
        s.connect(up, "Q", counter, "UP").unwrap();
        s.connect(counter, "Q", inv, "in").unwrap();
        (0..30)
            .map(|_| {
                let report = s.tick();
                format!("{} {} {:?}", read(&s, counter, "Q"), read(&s, inv, "out"), report)
            })
            .collect()
    }
    assert_eq!(trace(), trace());
}

// ── Evaluation contract ──────────────────────────────────────────────

/// Pins for `node` with every signal driven to `fill`.
fn harness(node: &dyn Node, fill: LogicValue) -> (PinCollection, Vec<ObservableValue>) {
    let configs = node.pin_configuration();
    let mut pins = PinCollection::from_config(node.kind(), configs.clone()).unwrap();
    let mut signals = Vec::new();
    for (i, config) in configs.iter().enumerate() {
        let index = pins.index_of(&config.name).unwrap();
        let mut signal = ObservableValue::new(SignalId::new(i), config.bits);
        signal.contribute(
            PinRef::new(NodeId::new(1000), index),
            EventId::new(i as u64),
            LogicVec::new(config.bits, fill),
        );
        signal.resolve();
        pins.attach(index, SignalId::new(i));
        signals.push(signal);
    }
    (pins, signals)
}

#[test]
fn test_evaluate_is_deterministic_for_every_kind() {
    for kind in builtin::KINDS {
        for fill in LogicValue::ALL {
            let mut first = builtin::create(kind, &serde_json::Value::Null).unwrap();
            let mut second = builtin::create(kind, &serde_json::Value::Null).unwrap();
            let (collection, signals) = harness(first.as_ref(), fill);
            let pins = Pins::new(NodeId::new(0), &collection, &signals);
            assert_eq!(first.evaluate(&pins), second.evaluate(&pins), "{} {:?}", kind, fill);
        }
    }
}

#[test]
fn test_combinational_evaluate_is_repeatable() {
    for kind in [
        "inverter",
        "gate",
        "buffer",
        "tristate",
        "splitter",
        "bidirectional",
        "prio_encoder",
        "adder",
    ] {
        let mut node = builtin::create(kind, &serde_json::Value::Null).unwrap();
        let (collection, signals) = harness(node.as_ref(), LogicValue::High);
        let pins = Pins::new(NodeId::new(0), &collection, &signals);
        let once = node.evaluate(&pins);
        assert!(!once.is_empty(), "{}", kind);
        assert_eq!(once, node.evaluate(&pins), "{}", kind);
    }
}

#[test]
#[should_panic(expected = "has no pin named")]
fn test_undeclared_pin_is_a_bug() {
    let node = Inverter::new(1).unwrap();
    let (collection, signals) = harness(&node, LogicValue::Low);
    let pins = Pins::new(NodeId::new(0), &collection, &signals);
    pins.get("CLK");
}
