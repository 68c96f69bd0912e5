// Copyright (c) 2017-2021 Fabian Schuiki

#[macro_use]
extern crate indoc;

use livedce::{
    assembly::{parse_function, parse_module, write_string, ParseError},
    ir::prelude::*,
    verifier::Verifier,
};

fn loopback(input: &str) {
    let module = parse_module(input).unwrap();
    assert_eq!(write_string(&module), input);
}

#[test]
fn empty() {
    loopback(indoc! {"
        func @a () {
        }

        func @b (%x, %y) {
        }
    "});
}

#[test]
fn instructions() {
    loopback(indoc! {"
        func @main (%a, %p) {
        %entry:
            %k = const -3
            %c = lt %a, %k
            br %c, %then(%a), %else
        %then(%t):
            %r = call pure @abs(%t)
            store volatile %p, %r
            br %else
        %else:
            call @flush()
            %l = load %p
            %n = not %l
            ret %n
        }

        func @nothing () {
        %entry:
            unreachable
        }
    "});
}

#[test]
fn comments_ignored() {
    let func = parse_function(indoc! {"
        ; leading comment
        func @f (%a) { ; trailing comment
        %entry:
            ; inside
            ret %a
        }
    "})
    .unwrap();
    assert_eq!(func.name(), "f");
    assert_eq!(func.num_insts(), 1);
}

#[test]
fn forward_references_resolved() {
    let input = indoc! {"
        func @fwd (%a) {
        %entry:
            br %next
        %later:
            ret %y
        %next:
            %y = neg %a
            br %later
        }
    "};
    let func = parse_function(input).unwrap();
    assert_eq!(func.to_string(), input);
    let mut verifier = Verifier::new();
    verifier.verify_function(&func);
    verifier.finish_panic();
}

#[test]
fn undefined_names_become_undef() {
    let func = parse_function(indoc! {"
        func @f () {
        %entry:
            ret %ghost
        }
    "})
    .unwrap();
    let ret = func.all_insts().next().unwrap();
    let ghost = func[ret].args()[0];
    assert!(func[ghost].is_undef());
    assert_eq!(func.get_name(ghost), Some("ghost"));
}

#[test]
fn unnamed_values_get_temporary_names() {
    let mut func = Function::new("anon");
    let mut builder = FunctionBuilder::new(&mut func);
    let a = builder.add_arg();
    let bb = builder.block();
    builder.append_to(bb);
    let x = builder.ins().neg(a);
    builder.ins().ret_value(x);
    assert_eq!(
        func.to_string(),
        indoc! {"
            func @anon (%0) {
            %1:
                %2 = neg %0
                ret %2
            }
        "}
    );
}

#[test]
fn duplicate_names_uniquified() {
    let mut func = Function::new("dup");
    let mut builder = FunctionBuilder::new(&mut func);
    let a = builder.named_arg("x");
    let bb = builder.named_block("entry");
    builder.append_to(bb);
    let x = builder.ins().name("x").neg(a);
    builder.ins().ret_value(x);
    let asm = func.to_string();
    assert_eq!(
        asm,
        indoc! {"
            func @dup (%x) {
            %entry:
                %x1 = neg %x
                ret %x1
            }
        "}
    );
    assert!(parse_function(&asm).is_ok());
}

fn parse_err(input: &str) -> ParseError {
    parse_module(input).unwrap_err()
}

#[test]
fn unknown_block() {
    let err = parse_err(indoc! {"
        func @f () {
        %entry:
            br %nowhere
        }
    "});
    assert_eq!(err.line, 3);
    assert_eq!(err.to_string(), "line 3: unknown block %nowhere");
}

#[test]
fn value_defined_twice() {
    let err = parse_err(indoc! {"
        func @f (%a) {
        %entry:
            %x = neg %a
            %x = not %a
            ret
        }
    "});
    assert_eq!(err.line, 4);
    assert_eq!(err.message, "value %x defined more than once");
}

#[test]
fn function_defined_twice() {
    let err = parse_err(indoc! {"
        func @f () {
        }
        func @f () {
        }
    "});
    assert_eq!(err.line, 3);
}

#[test]
fn unexpected_tokens() {
    let err = parse_err("func @f () {\n%entry:\n    %x = frobnicate %a\n}\n");
    assert_eq!(err.line, 3);
    assert_eq!(err.message, "invalid token `frobnicate`");

    let err = parse_err("func @f () {\n%entry:\n    ret\n");
    assert!(err.message.starts_with("unexpected end of input"));

    let err = parse_err("func @f () { # }");
    assert_eq!(err.to_string(), "line 1: invalid token `#`");

    let err = parse_err("func @f (%a {\n}\n");
    assert_eq!(err.line, 1);
    assert!(err.message.starts_with("unexpected `{`, expected"));
    assert!(err.message.contains("`)`"));
}

#[test]
fn constant_out_of_range() {
    let err = parse_err(indoc! {"
        func @f () {
        %entry:
            %k = const 99999999999999999999
            ret %k
        }
    "});
    assert_eq!(err.line, 3);
    assert_eq!(err.message, "integer `99999999999999999999` out of range");
}

#[test]
fn return_value_told_apart_from_next_block() {
    let func = parse_function(indoc! {"
        func @f (%a) {
        %entry:
            br %a, %one, %two(%a)
        %one:
            ret
        %two(%b):
            ret %b
        %three:
            ret
        }
    "})
    .unwrap();
    let opcodes: Vec<_> = func.all_insts().map(|inst| func[inst].opcode()).collect();
    assert_eq!(
        opcodes,
        vec![Opcode::BrCond, Opcode::Ret, Opcode::RetValue, Opcode::Ret]
    );
}
