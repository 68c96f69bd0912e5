// Copyright (c) 2017-2021 Fabian Schuiki

#[macro_use]
extern crate indoc;

use livedce::{
    analysis::{value_key, Liveness, PredecessorTable},
    assembly::parse_function,
    ir::prelude::*,
};

fn analyze(func: &Function) -> Liveness {
    let _ = env_logger::builder().is_test(true).try_init();
    Liveness::compute(func, &PredecessorTable::new(func))
}

fn block(func: &Function, name: &str) -> Block {
    func.blocks()
        .find(|&bb| func.block_name(bb) == Some(name))
        .unwrap()
}

fn value(func: &Function, name: &str) -> Value {
    func.args()
        .iter()
        .cloned()
        .chain(func.blocks().flat_map(|bb| func.block_params(bb).to_vec()))
        .chain(func.all_insts().filter_map(|inst| func.get_inst_result(inst)))
        .find(|&v| func.get_name(v) == Some(name))
        .unwrap()
}

#[test]
fn value_live_across_edge() {
    let mut func = Function::new("f");
    let mut builder = FunctionBuilder::new(&mut func);
    let a = builder.named_arg("a");
    let b = builder.named_arg("b");
    let bb_a = builder.named_block("A");
    let bb_b = builder.named_block("B");
    builder.append_to(bb_a);
    let x = builder.ins().name("x").add(a, b);
    builder.ins().br(bb_b);
    builder.append_to(bb_b);
    builder.ins().ret_value(x);

    let lv = analyze(&func);
    assert_eq!(lv.live_out(bb_a), vec![x]);
    assert_eq!(lv.live_in(bb_b), vec![x]);
    assert_eq!(lv.live_in(bb_a), vec![a, b]);
    assert!(lv.live_out(bb_b).is_empty());
    assert!(!lv.is_live_in(bb_a, x));
}

#[test]
fn block_params_defined_on_entry() {
    let mut func = Function::new("f");
    let mut builder = FunctionBuilder::new(&mut func);
    let a = builder.named_arg("a");
    let entry = builder.named_block("entry");
    let next = builder.named_block("next");
    let p = builder.named_block_param(next, "p");
    builder.append_to(entry);
    builder.ins().br((next, vec![a]));
    builder.append_to(next);
    builder.ins().ret_value(p);

    let lv = analyze(&func);
    assert!(lv.live_in(next).is_empty());
    assert!(lv.live_out(entry).is_empty());
    assert_eq!(lv.live_in(entry), vec![a]);
}

#[test]
fn loop_reaches_fixed_point() {
    let func = parse_function(indoc! {"
        func @count (%n, %step) {
        %entry:
            %zero = const 0
            br %header(%zero)
        %header(%i):
            %done = ge %i, %n
            br %done, %exit, %body
        %body:
            %next = add %i, %step
            br %header(%next)
        %exit:
            ret %i
        }
    "})
    .unwrap();
    let lv = analyze(&func);
    let (n, step, i) = (value(&func, "n"), value(&func, "step"), value(&func, "i"));
    let (entry, header, body, exit) = (
        block(&func, "entry"),
        block(&func, "header"),
        block(&func, "body"),
        block(&func, "exit"),
    );

    assert_eq!(lv.live_in(entry), vec![n, step]);
    assert_eq!(lv.live_in(header), vec![n, step]);
    assert_eq!(lv.live_out(header), vec![n, step, i]);
    assert_eq!(lv.live_in(body), vec![n, step, i]);
    assert_eq!(lv.live_out(body), vec![n, step]);
    assert_eq!(lv.live_in(exit), vec![i]);
    assert!(lv.visits() >= 4);
}

#[test]
fn unreachable_blocks_not_analyzed() {
    let func = parse_function(indoc! {"
        func @f (%a) {
        %entry:
            %x = neg %a
            ret
        %dead:
            ret %x
        }
    "})
    .unwrap();
    let lv = analyze(&func);
    let x = value(&func, "x");
    assert!(lv.is_analyzed(block(&func, "entry")));
    assert!(!lv.is_analyzed(block(&func, "dead")));
    assert!(lv.live_in(block(&func, "dead")).is_empty());
    assert!(lv.is_pinned(x));
    assert!(!lv.is_live_out(block(&func, "entry"), x));
}

#[test]
fn operands_of_terminators_are_live() {
    let func = parse_function(indoc! {"
        func @f (%a, %b) {
        %entry:
            %c = lt %a, %b
            br %c, %left(%a), %right(%b)
        %left(%l):
            ret %l
        %right(%r):
            ret %b
        }
    "})
    .unwrap();
    let lv = analyze(&func);
    let (a, b) = (value(&func, "a"), value(&func, "b"));
    assert_eq!(lv.live_in(block(&func, "entry")), vec![a, b]);
    assert!(lv.live_in(block(&func, "left")).is_empty());
    assert_eq!(lv.live_in(block(&func, "right")), vec![b]);
    assert_eq!(lv.live_out(block(&func, "entry")), vec![b]);
}

#[test]
fn uses_without_reaching_definition_pinned() {
    let func = parse_function(indoc! {"
        func @f (%p) {
        %entry:
            store %p, %x
            br %late
        %late:
            %x = const 1
            %y = const 2
            ret
        }
    "})
    .unwrap();
    let lv = analyze(&func);
    let (p, x, y) = (value(&func, "p"), value(&func, "x"), value(&func, "y"));
    let entry = block(&func, "entry");
    assert_eq!(lv.live_in(entry), vec![p, x]);
    assert!(lv.live_in_set(entry).unwrap().contains(value_key(x)));
    assert!(lv.is_pinned(x));
    assert!(!lv.is_pinned(y));
    assert!(!lv.is_live_in(block(&func, "late"), x));
}
