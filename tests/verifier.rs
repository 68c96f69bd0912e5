// Copyright (c) 2017-2021 Fabian Schuiki

#[macro_use]
extern crate indoc;

use livedce::{
    assembly::parse_function,
    ir::prelude::*,
    verifier::{Verifier, VerifierErrors},
};

fn verify(input: &str) -> Result<(), VerifierErrors> {
    let func = parse_function(input).unwrap();
    let mut verifier = Verifier::new();
    verifier.verify_function(&func);
    verifier.finish()
}

fn messages(input: &str) -> Vec<String> {
    verify(input)
        .unwrap_err()
        .iter()
        .map(|err| err.message.clone())
        .collect()
}

#[test]
fn well_formed() {
    verify(indoc! {"
        func @f (%a, %p) {
        %entry:
            %x = add %a, %a
            br %x, %next(%x), %next(%a)
        %next(%v):
            store %p, %v
            ret
        }
    "})
    .unwrap();
}

#[test]
fn missing_entry() {
    assert_eq!(messages("func @f () {\n}\n"), vec!["layout has no entry block"]);
}

#[test]
fn missing_terminator() {
    let errs = verify(indoc! {"
        func @f (%a) {
        %entry:
            %x = neg %a
        }
    "})
    .unwrap_err();
    assert_eq!(errs.len(), 1);
    assert_eq!(
        errs.to_string(),
        "- func @f: %entry: last instruction `%x = neg %a` must be a terminator\n"
    );
}

#[test]
fn terminator_in_middle() {
    let msgs = messages(indoc! {"
        func @f () {
        %entry:
            ret
            ret
        }
    "});
    assert_eq!(msgs, vec!["terminator must be at the end of block %entry"]);
}

#[test]
fn empty_block() {
    let msgs = messages(indoc! {"
        func @f () {
        %entry:
            br %next
        %next:
        }
    "});
    assert_eq!(msgs, vec!["block is empty"]);
}

#[test]
fn argument_count_mismatch() {
    let msgs = messages(indoc! {"
        func @f (%a) {
        %entry:
            br %next
        %next(%p):
            ret
        }
    "});
    assert_eq!(msgs, vec!["%next expects 1 arguments, 0 given"]);
}

#[test]
fn undefined_use() {
    let msgs = messages(indoc! {"
        func @f () {
        %entry:
            ret %ghost
        }
    "});
    assert_eq!(msgs, vec!["uses undefined value %ghost"]);
}

#[test]
fn malformed_instructions() {
    let mut func = Function::new("f");
    let mut builder = FunctionBuilder::new(&mut func);
    let bb = builder.named_block("entry");
    builder.append_to(bb);
    builder.build_inst(InstData::new(Opcode::Add), true);
    builder.build_inst(InstData::new(Opcode::Const), false);
    builder.ins().ret();

    let mut verifier = Verifier::new();
    verifier.verify_function(&func);
    let msgs: Vec<_> = verifier
        .finish()
        .unwrap_err()
        .iter()
        .map(|err| err.message.clone())
        .collect();
    assert_eq!(
        msgs,
        vec![
            "add requires 2 operands, has 0",
            "const must produce a result",
            "const requires an immediate",
        ]
    );
}
