// Copyright (c) 2017-2021 Fabian Schuiki

#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;

use anyhow::{anyhow, Context, Result};
use clap::Arg;
use livedce::{
    assembly::{parse_module, write_module},
    ir::Module,
    pass::{PassContext, PassRegistry},
    verifier::Verifier,
};
use std::{
    fs::File,
    io::{BufWriter, Read},
    sync::atomic::Ordering,
};

fn main() {
    match main_inner() {
        Ok(_) => (),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn main_inner() -> Result<()> {
    let matches = app_from_crate!()
        .about("Removes dead instructions from assembly.")
        .arg(
            Arg::with_name("verbosity")
                .short("v")
                .multiple(true)
                .help(HELP_VERBOSITY.lines().next().unwrap_or_default())
                .long_help(HELP_VERBOSITY),
        )
        .arg(
            Arg::with_name("input")
                .help("Assembly file to optimize")
                .required_unless("list-passes"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .help("File to write output to; stdout if omitted"),
        )
        .arg(
            Arg::with_name("time-passes")
                .short("t")
                .long("time")
                .help("Print execution time statistics per pass"),
        )
        .arg(
            Arg::with_name("single-threaded")
                .short("s")
                .long("no-parallel")
                .help("Do not parallelize execution"),
        )
        .arg(
            Arg::with_name("passes")
                .short("p")
                .long("pass")
                .value_name("PASS")
                .takes_value(true)
                .multiple(true)
                .help("Exact order of passes to run; see --list-passes"),
        )
        .arg(
            Arg::with_name("list-passes")
                .long("list-passes")
                .help("List the available passes and exit"),
        )
        .get_matches();

    // Configure the logger.
    let verbose = std::cmp::max(1, matches.occurrences_of("verbosity") as usize) - 1;
    let quiet = !matches.is_present("verbosity");
    stderrlog::new()
        .module("livedce")
        .module("livedce_opt")
        .quiet(quiet)
        .verbosity(verbose)
        .init()
        .context("cannot initialize logger")?;

    let registry = PassRegistry::with_builtin_passes();
    if matches.is_present("list-passes") {
        for info in registry.passes() {
            println!("{:10}  {}", info.name, info.description);
        }
        println!("{:10}  {}", "verify", "Verify the module");
        return Ok(());
    }

    // Configure rayon to be single-threaded if requested.
    if matches.is_present("single-threaded") {
        info!("Limiting to one rayon worker thread");
        rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build_global()
            .context("cannot configure worker threads")?;
    }

    // Prepare the time tracking.
    let mut times = vec![];
    let tinit = time::precise_time_ns();

    // Read the input.
    let t0 = time::precise_time_ns();
    let mut module = {
        let path = matches
            .value_of("input")
            .ok_or_else(|| anyhow!("no input file given"))?;
        let mut contents = String::new();
        File::open(path)
            .and_then(|mut input| input.read_to_string(&mut contents))
            .with_context(|| format!("cannot read `{}`", path))?;
        let module = parse_module(&contents).with_context(|| format!("cannot parse `{}`", path))?;
        verify(&module).context("input is malformed")?;
        module
    };
    let t1 = time::precise_time_ns();
    times.push(("parse".to_owned(), t1 - t0));

    // Determine the passes to be run.
    let passes: Vec<&str> = match matches.values_of("passes") {
        Some(passes) => passes.collect(),
        None => registry
            .default_pipeline()
            .into_iter()
            .map(|info| info.name)
            .collect(),
    };

    // Apply the passes.
    debug!("Running {:?}", passes);
    let ctx = PassContext::new();
    for &pass in &passes {
        trace!("Running pass {}", pass);
        let t0 = time::precise_time_ns();
        let changed = match (pass, registry.get(pass)) {
            (_, Some(info)) => info.run(&ctx, &mut module),
            ("verify", None) => {
                if let Err(errs) = verify(&module) {
                    error!("Verification failed:\n{}", errs);
                }
                false
            }
            (_, None) => {
                error!("Unknown pass `{}`", pass);
                continue;
            }
        };
        debug!("Pass {} changed module: {}", pass, changed);
        let t1 = time::precise_time_ns();
        times.push((pass.to_owned(), t1 - t0));
    }

    // Verify modified module.
    let t0 = time::precise_time_ns();
    verify(&module).context("verification failed after optimization")?;
    let t1 = time::precise_time_ns();
    times.push(("verify".to_owned(), t1 - t0));

    // Write the output.
    let t0 = time::precise_time_ns();
    if let Some(path) = matches.value_of("output") {
        let output = File::create(path).with_context(|| format!("cannot create `{}`", path))?;
        let output = BufWriter::with_capacity(1 << 20, output);
        write_module(output, &module).with_context(|| format!("cannot write `{}`", path))?;
    } else {
        write_module(std::io::stdout().lock(), &module).context("cannot write output")?;
    }
    let t1 = time::precise_time_ns();
    times.push(("output".to_owned(), t1 - t0));

    // Final time stat.
    let tfinal = time::precise_time_ns();
    times.push(("total".to_owned(), tfinal - tinit));

    // Print execution time statistics if requested by the user.
    if matches.is_present("time-passes") {
        eprintln!("Execution Time Statistics:");
        for (mut name, ns) in times {
            name.push(':');
            eprintln!("  {:10}  {:8.3} ms", name, ns as f64 * 1.0e-6);
        }
        eprintln!("");
        eprintln!("Structure Statistics:");
        eprintln!(
            "  Liveness Analysis: {:8.3} ms",
            livedce::analysis::LIVENESS_TIME.load(Ordering::SeqCst) as f64 * 1.0e-6
        );
        eprintln!(
            "  Instructions Removed: {}",
            livedce::pass::dce::INSTS_REMOVED.load(Ordering::SeqCst)
        );
    }

    // Dump some threading statistics.
    info!("Used {} rayon worker threads", rayon::current_num_threads());

    Ok(())
}

fn verify(module: &Module) -> Result<(), livedce::verifier::VerifierErrors> {
    let mut verifier = Verifier::new();
    verifier.verify_module(module);
    verifier.finish()
}

static HELP_VERBOSITY: &str = "Increase message verbosity

This option can be specified multiple times to increase the level of verbosity \
in the output:

-v      Only print errors
-vv     Also print warnings
-vvv    Also print info messages
-vvvv   Also print debug messages
-vvvvv  Also print detailed tracing messages
";
