//! Generator protocol integration tests.
//!
//! Drives generators through the public API only:
//!
//! - Lifecycle: step results, state transitions, context ownership
//! - Exchange: values delivered with `step_with` and read back by the body
//! - Suspension rules: `yield` outside a generator, faults, aborts
//! - Resource accounting: pool usage across drops and construction failures

use cogen_core::{Dictionary, Value};
use cogen_vm::bytecode::{Procedure, ProcedureBuilder};
use cogen_vm::generators::GeneratorIter;
use cogen_vm::heap::COMPACT_FLOOR;
use cogen_vm::{
    create_generator, Engine, EngineConfig, Generator, GeneratorError, GeneratorState,
    NativeCall, RuntimeErrorKind, VmResult,
};
use proptest::prelude::*;
use std::cell::{Cell, RefCell};
use std::sync::Arc;

// =============================================================================
// Test Infrastructure
// =============================================================================

/// for i in 0..n { yield(i) }
fn count_to() -> Arc<Procedure> {
    let mut b = ProcedureBuilder::new("count_to", 1);
    let n = b.param(0);
    let (i, one, cond, reply) = (
        b.alloc_register(),
        b.alloc_register(),
        b.alloc_register(),
        b.alloc_register(),
    );
    let top = b.new_label();
    let done = b.new_label();
    b.emit_load_int(i, 0);
    b.emit_load_int(one, 1);
    b.bind_label(top);
    b.emit_lt(cond, i, n);
    b.emit_jump_if_false(cond, done);
    b.emit_yield(reply, Some(i));
    b.emit_add(i, i, one);
    b.emit_jump(top);
    b.bind_label(done);
    b.emit_return_none();
    b.finish().unwrap()
}

/// reply = yield(arg); v = retrieve(reply); yield(v); return
fn echo_back() -> Arc<Procedure> {
    let mut b = ProcedureBuilder::new("echo_back", 1);
    let (reply, v) = (b.alloc_register(), b.alloc_register());
    b.emit_yield(reply, Some(b.param(0)));
    b.emit_retrieve(v, reply);
    b.emit_yield(reply, Some(v));
    b.emit_return_none();
    b.finish().unwrap()
}

/// yield(1); yield(2); return
fn one_two() -> Arc<Procedure> {
    let mut b = ProcedureBuilder::new("one_two", 1);
    let (v, reply) = (b.alloc_register(), b.alloc_register());
    b.emit_load_int(v, 1);
    b.emit_yield(reply, Some(v));
    b.emit_load_int(v, 2);
    b.emit_yield(reply, Some(v));
    b.emit_return_none();
    b.finish().unwrap()
}

/// yield(arg); raise "boom"
fn yield_then_raise() -> Arc<Procedure> {
    let mut b = ProcedureBuilder::new("yield_then_raise", 1);
    let r = b.alloc_register();
    b.emit_yield(r, Some(b.param(0)));
    b.emit_load_const(r, "boom");
    b.emit_raise(r);
    b.finish().unwrap()
}

/// Step until the body finishes, checking context ownership after each step.
fn drain(generator: &Generator) -> u32 {
    let mut yielded = 0;
    while generator.step().unwrap() {
        yielded += 1;
        assert!(generator.has_context());
        assert!(!generator.is_completed());
    }
    assert!(!generator.has_context());
    assert!(generator.is_completed());
    yielded
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_yield_one_two_then_return() {
    let engine = Engine::new();
    let generator = Generator::new(&engine, one_two(), Value::None).unwrap();
    assert_eq!(generator.state(), GeneratorState::Created);
    assert!(generator.value().is_empty());

    assert!(generator.step().unwrap());
    assert_eq!(generator.value().retrieve_int(), Some(1));
    assert_eq!(generator.state(), GeneratorState::Suspended);

    assert!(generator.step().unwrap());
    assert_eq!(generator.value().retrieve_int(), Some(2));

    assert!(!generator.step().unwrap());
    assert_eq!(generator.state(), GeneratorState::Completed);
    assert_eq!(generator.yields(), 2);
}

#[test]
fn test_steps_stay_false_after_completion() {
    let engine = Engine::new();
    let generator = Generator::new(&engine, count_to(), 3_i64).unwrap();
    assert_eq!(drain(&generator), 3);

    for _ in 0..5 {
        assert!(!generator.step().unwrap());
        assert!(!generator.step_with(1_i64).unwrap());
    }
    assert_eq!(generator.stats().steps, 4);
}

#[test]
fn test_body_without_yield() {
    // return 17
    let mut b = ProcedureBuilder::new("plain", 1);
    let r = b.alloc_register();
    b.emit_load_int(r, 17);
    b.emit_return(r);

    let engine = Engine::new();
    let generator = Generator::new(&engine, b.finish().unwrap(), Value::None).unwrap();
    assert!(!generator.step().unwrap());
    assert!(generator.value().is_empty());
    assert_eq!(generator.yields(), 0);
    assert!(!generator.has_context());
}

#[test]
fn test_bare_yield_publishes_nothing() {
    // yield(arg); yield(); return
    let mut b = ProcedureBuilder::new("bare", 1);
    let r = b.alloc_register();
    b.emit_yield(r, Some(b.param(0)));
    b.emit_yield(r, None);
    b.emit_return_none();

    let engine = Engine::new();
    let generator = Generator::new(&engine, b.finish().unwrap(), 4_i64).unwrap();
    assert!(generator.step().unwrap());
    assert_eq!(generator.value().retrieve_int(), Some(4));
    assert!(generator.step().unwrap());
    assert!(generator.value().is_empty());
    assert!(!generator.step().unwrap());
}

#[test]
fn test_interleaved_generators_are_independent() {
    let engine = Engine::new();
    let a = Generator::new(&engine, count_to(), 3_i64).unwrap();
    let b = Generator::new(&engine, one_two(), Value::None).unwrap();
    assert_eq!(engine.pool_stats().in_use, 2);

    assert!(a.step().unwrap());
    assert!(b.step().unwrap());
    assert!(a.step().unwrap());
    assert_eq!(a.value().retrieve_int(), Some(1));
    assert_eq!(b.value().retrieve_int(), Some(1));

    assert!(b.step().unwrap());
    assert!(!b.step().unwrap());
    assert_eq!(a.value().retrieve_int(), Some(1));
    assert_eq!(engine.pool_stats().in_use, 1);

    assert!(a.step().unwrap());
    assert_eq!(a.value().retrieve_int(), Some(2));
    assert!(!a.step().unwrap());
    assert_eq!(engine.pool_stats().in_use, 0);
}

#[test]
fn test_iterator_adapter() {
    let engine = Engine::new();
    let generator = Generator::new(&engine, count_to(), 5_i64).unwrap();
    let mut total = 0;
    for value in &generator {
        total += value.unwrap().as_int().unwrap();
    }
    assert_eq!(total, 10);

    let mut iter: GeneratorIter<'_> = generator.iter();
    assert!(iter.next().is_none());
}

// =============================================================================
// Exchange
// =============================================================================

#[test]
fn test_step_with_int() {
    let engine = Engine::new();
    let generator = Generator::new(&engine, echo_back(), 0_i64).unwrap();
    assert!(generator.step().unwrap());
    assert!(generator.step_with(7_i64).unwrap());
    assert_eq!(generator.value().retrieve_int(), Some(7));
    assert!(!generator.step().unwrap());
}

#[test]
fn test_step_with_float() {
    let engine = Engine::new();
    let generator = Generator::new(&engine, echo_back(), 0_i64).unwrap();
    generator.step().unwrap();
    assert!(generator.step_with(2.5_f64).unwrap());
    assert_eq!(generator.value().retrieve_float(), Some(2.5));
}

#[test]
fn test_step_with_dict_keeps_identity() {
    let engine = Engine::new();
    let generator = Generator::new(&engine, echo_back(), 0_i64).unwrap();
    generator.step().unwrap();

    let dict = Dictionary::new();
    dict.set("k", 1_i64);
    assert!(generator.step_with(dict.clone()).unwrap());

    let out = generator.value().retrieve();
    assert!(out.as_dict().unwrap().ptr_eq(&dict));
}

#[test]
fn test_plain_step_delivers_nothing() {
    let engine = Engine::new();
    let generator = Generator::new(&engine, echo_back(), 0_i64).unwrap();
    generator.step().unwrap();
    assert!(generator.step().unwrap());
    assert!(generator.value().retrieve().is_none());
}

#[test]
fn test_argument_reaches_body() {
    let engine = Engine::new();
    let generator = Generator::new(&engine, echo_back(), "seed").unwrap();
    generator.step().unwrap();
    assert_eq!(generator.value().retrieve().as_str(), Some("seed"));
}

// =============================================================================
// Suspension Rules
// =============================================================================

#[test]
fn test_yield_outside_generator_faults() {
    let mut b = ProcedureBuilder::new("stray", 0);
    let r = b.alloc_register();
    b.emit_yield(r, None);
    b.emit_return_none();

    let engine = Engine::new();
    let err = engine.call(b.finish().unwrap(), &[]).unwrap_err();
    assert!(err.is_invalid_suspension());
    assert_eq!(engine.pool_stats().in_use, 0);
}

#[test]
fn test_yield_in_nested_call_suspends_generator() {
    // helper(x) = yield(x); body(arg) = helper(arg); yield(arg + 1)
    let mut h = ProcedureBuilder::new("helper", 1);
    let r = h.alloc_register();
    h.emit_yield(r, Some(h.param(0)));
    h.emit_return_none();
    let helper = h.finish().unwrap();

    let mut b = ProcedureBuilder::new("outer", 1);
    let (tmp, one) = (b.alloc_register(), b.alloc_register());
    b.emit_call(tmp, &helper, &[b.param(0)]);
    b.emit_load_int(one, 1);
    b.emit_add(tmp, b.param(0), one);
    b.emit_yield(tmp, Some(tmp));
    b.emit_return_none();

    let engine = Engine::new();
    let generator = Generator::new(&engine, b.finish().unwrap(), 10_i64).unwrap();
    assert!(generator.step().unwrap());
    assert_eq!(generator.value().retrieve_int(), Some(10));
    assert!(generator.step().unwrap());
    assert_eq!(generator.value().retrieve_int(), Some(11));
    assert!(!generator.step().unwrap());
}

#[test]
fn test_fault_completes_generator() {
    let engine = Engine::new();
    let generator = Generator::new(&engine, yield_then_raise(), 1_i64).unwrap();
    assert!(generator.step().unwrap());

    let err = generator.step().unwrap_err();
    let GeneratorError::Fault(runtime) = &err else {
        panic!("expected a body fault, got {err:?}");
    };
    assert!(matches!(runtime.kind, RuntimeErrorKind::Exception { .. }));
    assert_eq!(runtime.traceback[0].procedure.as_ref(), "yield_then_raise");

    assert!(generator.is_completed());
    assert!(!generator.has_context());
    assert!(!generator.step().unwrap());
    assert_eq!(engine.pool_stats().in_use, 0);
}

#[test]
fn test_instruction_budget_aborts_step() {
    // loop forever without yielding
    let mut b = ProcedureBuilder::new("spin", 1);
    let top = b.new_label();
    b.bind_label(top);
    b.emit_nop();
    b.emit_jump(top);

    let config = EngineConfig::default().with_instruction_budget(Some(1_000));
    let engine = Engine::with_config(config);
    let generator = Generator::new(&engine, b.finish().unwrap(), Value::None).unwrap();

    let err = generator.step().unwrap_err();
    assert_eq!(
        err.runtime_error().map(|e| e.kind.clone()),
        Some(RuntimeErrorKind::ExecutionLimit { budget: 1_000 })
    );
    assert!(generator.is_completed());
    assert_eq!(engine.pool_stats().in_use, 0);
}

#[test]
fn test_budget_applies_per_step() {
    let config = EngineConfig::default().with_instruction_budget(Some(64));
    let engine = Engine::with_config(config);
    let generator = Generator::new(&engine, count_to(), 200_i64).unwrap();
    assert_eq!(drain(&generator), 200);
}

thread_local! {
    static REENTRY_TARGET: RefCell<Option<Generator>> = const { RefCell::new(None) };
    static OBSERVED_RUNNING: Cell<bool> = const { Cell::new(false) };
}

/// Steps the thread's target generator from inside its own body.
fn native_reenter(call: &mut NativeCall<'_>) -> VmResult<Value> {
    call.expect_argc(0, 0)?;
    let rejected = REENTRY_TARGET.with(|target| {
        target.borrow().as_ref().map(|generator| {
            OBSERVED_RUNNING.with(|seen| seen.set(generator.state() == GeneratorState::Running));
            matches!(generator.step(), Err(GeneratorError::AlreadyRunning))
        })
    });
    Ok(Value::Bool(rejected.unwrap_or(false)))
}

#[test]
fn test_reentrant_step_is_rejected() {
    // r = reenter(); yield(r); return
    let mut b = ProcedureBuilder::new("reentrant", 1);
    let r = b.alloc_register();
    b.emit_call_native(r, "reenter", &[]);
    b.emit_yield(r, Some(r));
    b.emit_return_none();

    let engine = Engine::new();
    engine.register_native("reenter", native_reenter);
    let generator = Generator::new(&engine, b.finish().unwrap(), Value::None).unwrap();
    REENTRY_TARGET.with(|target| *target.borrow_mut() = Some(generator.clone()));

    assert!(generator.step().unwrap());
    assert_eq!(generator.value().retrieve().as_bool(), Some(true));
    assert!(OBSERVED_RUNNING.with(Cell::get));
    assert_eq!(generator.stats().steps, 1);

    REENTRY_TARGET.with(|target| target.borrow_mut().take());
    assert!(!generator.step().unwrap());
}

// =============================================================================
// Resource Accounting
// =============================================================================

#[test]
fn test_drop_suspended_releases_once() {
    let engine = Engine::with_config(EngineConfig::for_testing());
    let generator = Generator::new(&engine, count_to(), 10_i64).unwrap();
    let other = generator.clone();
    assert!(generator.step().unwrap());
    assert_eq!(engine.pool_stats().in_use, 1);

    drop(generator);
    assert_eq!(engine.pool_stats().in_use, 1);
    drop(other);

    let stats = engine.pool_stats();
    assert_eq!(stats.in_use, 0);
    assert_eq!(stats.acquired, 1);
    assert_eq!(stats.released, 1);
}

#[test]
fn test_drop_completed_does_not_release_again() {
    let engine = Engine::with_config(EngineConfig::for_testing());
    let generator = Generator::new(&engine, one_two(), Value::None).unwrap();
    drain(&generator);
    drop(generator);
    assert_eq!(engine.pool_stats().released, 1);
}

#[test]
fn test_pool_exhaustion_refuses_generator() {
    let config = EngineConfig::for_testing().with_max_contexts(2);
    let engine = Engine::with_config(config);
    let a = Generator::new(&engine, count_to(), 1_i64).unwrap();
    let _b = Generator::new(&engine, count_to(), 1_i64).unwrap();

    let err = Generator::new(&engine, count_to(), 1_i64).unwrap_err();
    assert!(matches!(
        err.runtime_error().map(|e| &e.kind),
        Some(RuntimeErrorKind::ContextPoolExhausted { capacity: 2 })
    ));
    assert!(create_generator(&engine, count_to(), 1_i64).is_none());
    assert_eq!(engine.pool_stats().in_use, 2);

    drop(a);
    assert!(create_generator(&engine, count_to(), 1_i64).is_some());
}

#[test]
fn test_contexts_are_reused() {
    let engine = Engine::with_config(EngineConfig::for_testing());
    for n in 0..20 {
        let generator = Generator::new(&engine, count_to(), n as i64).unwrap();
        assert_eq!(drain(&generator), n);
    }
    let stats = engine.pool_stats();
    assert_eq!(stats.in_use, 0);
    assert_eq!(stats.peak, 1);
}

#[test]
fn test_garbage_reclaimed_between_steps() {
    // loop { d = {}; yield(d) } bounded by n
    let mut b = ProcedureBuilder::new("dicts", 1);
    let n = b.param(0);
    let (i, one, cond, d, reply) = (
        b.alloc_register(),
        b.alloc_register(),
        b.alloc_register(),
        b.alloc_register(),
        b.alloc_register(),
    );
    let top = b.new_label();
    let done = b.new_label();
    b.emit_load_int(i, 0);
    b.emit_load_int(one, 1);
    b.bind_label(top);
    b.emit_lt(cond, i, n);
    b.emit_jump_if_false(cond, done);
    b.emit_new_dict(d);
    b.emit_yield(reply, Some(d));
    b.emit_add(i, i, one);
    b.emit_jump(top);
    b.bind_label(done);
    b.emit_return_none();

    let engine = Engine::new();
    let generator = Generator::new(&engine, b.finish().unwrap(), 8_i64).unwrap();
    assert_eq!(drain(&generator), 8);

    let stats = generator.stats();
    assert_eq!(stats.objects_created, 16);
    assert!(stats.objects_destroyed > 0);
    assert!(engine.heap().statistics().live < 16);
}

#[test]
fn test_heap_bounded_without_step_collection() {
    // loop { d = {}; yield(d) }
    let mut b = ProcedureBuilder::new("endless_dicts", 1);
    let (d, reply) = (b.alloc_register(), b.alloc_register());
    let top = b.new_label();
    b.bind_label(top);
    b.emit_new_dict(d);
    b.emit_yield(reply, Some(d));
    b.emit_jump(top);

    let engine = Engine::with_config(EngineConfig::default().with_collect_after_step(false));
    let generator = Generator::new(&engine, b.finish().unwrap(), Value::None).unwrap();
    for _ in 0..10_000 {
        assert!(generator.step().unwrap());
    }

    let stats = engine.heap().statistics();
    assert_eq!(stats.allocated, 20_000);
    assert!(stats.live < COMPACT_FLOOR, "live = {}", stats.live);
    assert_eq!(generator.stats().objects_created, 0);
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_yields_match_loop_count(n in 0i64..48) {
        let engine = Engine::new();
        let generator = Generator::new(&engine, count_to(), n).unwrap();
        let mut seen = Vec::new();
        while generator.step().unwrap() {
            seen.push(generator.value().retrieve_int().unwrap());
        }
        prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());
        prop_assert_eq!(generator.yields() as i64, n);
        prop_assert!(!generator.has_context());
        prop_assert!(!generator.step().unwrap());
        prop_assert_eq!(engine.pool_stats().in_use, 0);
    }

    #[test]
    fn prop_echo_returns_delivered_int(x in any::<i64>()) {
        let engine = Engine::new();
        let generator = Generator::new(&engine, echo_back(), 0_i64).unwrap();
        prop_assert!(generator.step().unwrap());
        prop_assert!(generator.step_with(x).unwrap());
        prop_assert_eq!(generator.value().retrieve_int(), Some(x));
    }
}
