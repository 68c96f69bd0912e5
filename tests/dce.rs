// Copyright (c) 2017-2021 Fabian Schuiki

#[macro_use]
extern crate indoc;

use livedce::{
    assembly::{parse_function, parse_module},
    ir::prelude::*,
    pass::{dce::DceStats, DeadCodeElim, Pass, PassContext},
    verifier::Verifier,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Run dead code elimination on a function given as assembly.
fn run_dce(input: &str) -> (Function, DceStats) {
    init_logger();
    let mut func = parse_function(input).unwrap();
    let stats = DeadCodeElim::run(&PassContext::silent(), &mut func);
    (func, stats)
}

#[test]
fn unused_result_removed() {
    let (func, stats) = run_dce(indoc! {"
        func @f (%a, %b, %c, %p) {
        %entry:
            %v1 = add %a, %b
            %v2 = mul %v1, %c
            store %p, %v1
            ret
        }
    "});
    assert_eq!(
        func.to_string(),
        indoc! {"
            func @f (%a, %b, %c, %p) {
            %entry:
                %v1 = add %a, %b
                store %p, %v1
                ret
            }
        "}
    );
    assert_eq!(
        stats,
        DceStats {
            rounds: 2,
            removed: 1
        }
    );
}

#[test]
fn dead_chain_removed_in_one_sweep() {
    let (func, stats) = run_dce(indoc! {"
        func @chain () {
        %entry:
            %v1 = call pure @f()
            %v2 = call pure @g(%v1)
            %v3 = call pure @h(%v2)
            ret
        }
    "});
    assert_eq!(
        func.to_string(),
        indoc! {"
            func @chain () {
            %entry:
                ret
            }
        "}
    );
    assert_eq!(stats.removed, 3);
    assert_eq!(stats.rounds, 2);
}

#[test]
fn call_with_side_effects_kept() {
    let input = indoc! {"
        func @f (%a) {
        %entry:
            %r = call @log(%a)
            ret
        }
    "};
    let (func, stats) = run_dce(input);
    assert_eq!(func.to_string(), input);
    assert_eq!(stats.removed, 0);
    assert!(!stats.modified());
}

#[test]
fn value_used_in_other_block_kept() {
    let input = indoc! {"
        func @f (%a, %b) {
        %A:
            %x = add %a, %b
            br %B
        %B:
            ret %x
        }
    "};
    let (func, stats) = run_dce(input);
    assert_eq!(func.to_string(), input);
    assert_eq!(stats.removed, 0);
}

#[test]
fn empty_function_unchanged() {
    init_logger();
    let mut func = parse_function("func @empty () {\n}\n").unwrap();
    let ctx = PassContext::capturing();
    let stats = DeadCodeElim::run(&ctx, &mut func);
    assert_eq!(stats.removed, 0);
    assert!(!stats.modified());
    assert_eq!(ctx.captured(), vec!["my DCE  for function: empty!".to_owned()]);
}

#[test]
fn dead_values_across_blocks_take_several_rounds() {
    let (func, stats) = run_dce(indoc! {"
        func @f (%a, %b) {
        %A:
            %x = add %a, %b
            br %B
        %B:
            %y = mul %x, %x
            ret
        }
    "});
    assert_eq!(
        func.to_string(),
        indoc! {"
            func @f (%a, %b) {
            %A:
                br %B
            %B:
                ret
            }
        "}
    );
    assert_eq!(
        stats,
        DceStats {
            rounds: 3,
            removed: 2
        }
    );
}

#[test]
fn loop_carried_values_kept() {
    let (func, stats) = run_dce(indoc! {"
        func @count (%n) {
        %entry:
            %zero = const 0
            %one = const 1
            br %header(%zero)
        %header(%i):
            %done = ge %i, %n
            br %done, %exit, %body
        %body:
            %next = add %i, %one
            %junk = mul %i, %i
            br %header(%next)
        %exit:
            ret %i
        }
    "});
    assert_eq!(
        func.to_string(),
        indoc! {"
            func @count (%n) {
            %entry:
                %zero = const 0
                %one = const 1
                br %header(%zero)
            %header(%i):
                %done = ge %i, %n
                br %done, %exit, %body
            %body:
                %next = add %i, %one
                br %header(%next)
            %exit:
                ret %i
            }
        "}
    );
    assert_eq!(stats.removed, 1);
}

#[test]
fn branch_arguments_keep_values_alive() {
    let input = indoc! {"
        func @f (%a) {
        %entry:
            %x = neg %a
            br %next(%x)
        %next(%p):
            ret
        }
    "};
    let (func, stats) = run_dce(input);
    assert_eq!(func.to_string(), input);
    assert_eq!(stats.removed, 0);
}

#[test]
fn unreachable_blocks_pin_their_uses() {
    let (func, stats) = run_dce(indoc! {"
        func @f (%a) {
        %entry:
            %x = add %a, %a
            %y = neg %a
            ret
        %dead:
            %z = mul %x, %x
            ret
        }
    "});
    assert_eq!(
        func.to_string(),
        indoc! {"
            func @f (%a) {
            %entry:
                %x = add %a, %a
                ret
            %dead:
                %z = mul %x, %x
                ret
            }
        "}
    );
    assert_eq!(stats.removed, 1);
}

#[test]
fn undefined_operands_tolerated() {
    let (func, stats) = run_dce(indoc! {"
        func @f () {
        %entry:
            %u = add %ghost, %ghost
            %w = not %phantom
            ret %u
        }
    "});
    assert_eq!(
        func.to_string(),
        indoc! {"
            func @f () {
            %entry:
                %u = add %ghost, %ghost
                ret %u
            }
        "}
    );
    assert_eq!(stats.removed, 1);
}

#[test]
fn memory_effects() {
    let (func, stats) = run_dce(indoc! {"
        func @f (%v) {
        %entry:
            %p = alloca
            %q = alloca
            %l = load volatile %p
            %m = load %q
            store %p, %v
            ret
        }
    "});
    assert_eq!(
        func.to_string(),
        indoc! {"
            func @f (%v) {
            %entry:
                %p = alloca
                %l = load volatile %p
                store %p, %v
                ret
            }
        "}
    );
    assert_eq!(stats.removed, 2);
}

#[test]
fn second_run_is_noop() {
    let (mut func, stats) = run_dce(indoc! {"
        func @f (%a) {
        %entry:
            %x = neg %a
            %y = not %x
            %z = add %a, %a
            ret %z
        }
    "});
    assert_eq!(stats.removed, 2);
    let before = func.to_string();
    let again = DeadCodeElim::run(&PassContext::silent(), &mut func);
    assert_eq!(again.removed, 0);
    assert_eq!(again.rounds, 1);
    assert_eq!(func.to_string(), before);
}

#[test]
fn result_remains_well_formed() {
    let (func, _) = run_dce(indoc! {"
        func @f (%a, %p) {
        %entry:
            %c = const 7
            %x = mul %a, %c
            %t = lt %a, %c
            br %t, %yes(%x), %no
        %yes(%r):
            %s = sub %r, %a
            store %p, %r
            br %no
        %no:
            ret
        }
    "});
    let mut verifier = Verifier::new();
    verifier.verify_function(&func);
    verifier.finish_panic();
    assert_eq!(func.num_insts(), 7);
}

#[test]
fn module_pass_reports_changes() {
    init_logger();
    let mut module = parse_module(indoc! {"
        func @clean (%a) {
        %entry:
            ret %a
        }

        func @dirty (%a) {
        %entry:
            %x = neg %a
            ret %a
        }
    "})
    .unwrap();
    let ctx = PassContext::capturing();
    assert!(DeadCodeElim::run_on_module(&ctx, &mut module));
    let mut lines = ctx.captured();
    lines.sort();
    assert_eq!(
        lines,
        vec![
            "my DCE  for function: clean!".to_owned(),
            "my DCE  for function: dirty!".to_owned(),
        ]
    );
    assert_eq!(module.num_insts(), 2);
    assert!(!DeadCodeElim::run_on_module(&PassContext::silent(), &mut module));
}

#[test]
fn remove_by_position() {
    let mut func = parse_function(indoc! {"
        func @f (%a) {
        %entry:
            %x = neg %a
            %y = not %a
            ret %y
        }
    "})
    .unwrap();
    let entry = func.entry().unwrap();
    let data = func.remove_inst_at(entry, 0).unwrap();
    assert_eq!(data.opcode(), Opcode::Neg);
    assert!(func.remove_inst_at(entry, 5).is_none());
    let y = func.inst_at(entry, 0).unwrap();
    assert_eq!(func.inst_position(y), Some(0));
    assert_eq!(func.num_insts(), 2);
}

#[test]
fn use_before_definition_across_blocks_kept() {
    let (func, stats) = run_dce(indoc! {"
        func @f (%p) {
        %entry:
            store %p, %x
            br %late
        %late:
            %x = const 1
            %z = neg %x
            ret
        }
    "});
    assert_eq!(
        func.to_string(),
        indoc! {"
            func @f (%p) {
            %entry:
                store %p, %x
                br %late
            %late:
                %x = const 1
                ret
            }
        "}
    );
    assert_eq!(
        stats,
        DceStats {
            rounds: 2,
            removed: 1
        }
    );
    let mut verifier = Verifier::new();
    verifier.verify_function(&func);
    verifier.finish_panic();
}

#[test]
fn use_before_definition_in_block_kept() {
    let input = indoc! {"
        func @f () {
        %entry:
            %y = add %x, %x
            %x = const 1
            ret %y
        }
    "};
    let (func, stats) = run_dce(input);
    assert_eq!(func.to_string(), input);
    assert_eq!(stats.removed, 0);
    let mut verifier = Verifier::new();
    verifier.verify_function(&func);
    verifier.finish_panic();
}
