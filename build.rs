// Copyright (c) 2017-2021 Fabian Schuiki

fn main() {
    lalrpop::Configuration::new()
        .use_cargo_dir_conventions()
        .process_file("src/assembly/grammar.lalrpop")
        .unwrap();
    println!("cargo:rerun-if-changed=src/assembly/grammar.lalrpop");
}
