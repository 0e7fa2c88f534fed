use std::env;
use std::fs;
use std::io::{self, Read, Write};

use anyhow::{Context as _, Error};
use clap::{value_t, values_t, App, AppSettings, Arg};
use env_logger::{fmt, Builder, Target};
use log::{error, info};
use log::{Level, LevelFilter, Record};

use xorsat::config::SolverConfigUpdate;
use xorsat::solver::{Solver, SolverResult};

/// Process exit codes mandated by the SAT solver conventions.
const EXIT_SAT: i32 = 10;
const EXIT_UNSAT: i32 = 20;
const EXIT_UNDETERMINED: i32 = 15;

fn main() {
    let exit_code = match main_with_err() {
        Err(err) => {
            error!("{:#}", err);
            1
        }
        Ok(exit_code) => exit_code,
    };
    std::process::exit(exit_code);
}

fn init_logging() {
    let format = |buf: &mut fmt::Formatter, record: &Record| {
        if record.level() == Level::Info {
            writeln!(buf, "c {}", record.args())
        } else {
            writeln!(buf, "c {}: {}", record.level(), record.args())
        }
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stdout)
        .format(format)
        .filter(None, LevelFilter::Info);

    if let Ok(ref env_var) = env::var("XORSAT_LOG") {
        builder.parse_filters(env_var);
    }

    builder.init();
}

fn banner() {
    info!("This is xorsat {}", env!("CARGO_PKG_VERSION"));
}

fn main_with_err() -> Result<i32, Error> {
    let matches = App::new("xorsat")
        .version(env!("CARGO_PKG_VERSION"))
        .setting(AppSettings::DisableHelpSubcommand)
        .arg_from_usage("[INPUT] 'The input file to use (stdin if omitted)'")
        .arg_from_usage(
            "[RESULT-OUTPUT] 'Write the result to this file instead of stdout'",
        )
        .arg_from_usage("[config-file] --config=[FILE] 'Read parameters from configuration file'")
        .arg(
            Arg::from_usage("[config-option] -C --config-option")
                .value_name("OPTION>=<VALUE")
                .help("Specify a single config option")
                .multiple(true)
                .number_of_values(1),
        )
        .arg_from_usage(
            "[max-solutions] --max-solutions=[N] 'Enumerate up to N satisfying assignments'",
        )
        .arg_from_usage(
            "[dump-learnts] --dump-learnts=[FILE] 'Dump the learnt clauses on exit'",
        )
        .arg_from_usage(
            "[max-dump-learnts-size] --max-dump-learnts-size=[N] \
             'Only dump learnt clauses with at most N literals'",
        )
        .arg_from_usage(
            "[dump-irred] --dump-irred=[FILE] 'Dump the simplified original clauses on exit'",
        )
        .get_matches();

    init_logging();
    banner();

    let mut config_update = SolverConfigUpdate::new();

    if let Some(config_path) = matches.value_of("config-file") {
        let mut config_contents = String::new();
        fs::File::open(config_path)
            .and_then(|mut file| file.read_to_string(&mut config_contents))
            .with_context(|| format!("could not read configuration file '{}'", config_path))?;

        config_update.merge(toml::from_str(&config_contents)?);
    }

    for config_option in values_t!(matches, "config-option", String).unwrap_or_else(|_| vec![]) {
        config_update.merge(
            toml::from_str(&config_option)
                .with_context(|| format!("invalid config option '{}'", config_option))?,
        );
    }

    if matches.is_present("max-solutions") {
        config_update.max_solutions = Some(value_t!(matches, "max-solutions", usize)?);
    }

    let mut solver = Solver::new();

    solver.config(&config_update)?;

    let max_solutions = config_update.max_solutions.unwrap_or(1);

    let stdin = io::stdin();

    let mut locked_stdin;
    let mut opened_file;

    let file: &mut dyn io::Read = match matches.value_of("INPUT") {
        Some(path) => {
            info!("Reading file '{}'", path);
            opened_file = fs::File::open(path)
                .with_context(|| format!("could not open input file '{}'", path))?;
            &mut opened_file
        }
        None => {
            info!("Reading from stdin");
            locked_stdin = stdin.lock();
            &mut locked_stdin
        }
    };

    solver.add_dimacs_cnf(file)?;

    let mut result_file = match matches.value_of("RESULT-OUTPUT") {
        Some(path) => Some(
            fs::File::create(path)
                .with_context(|| format!("could not create result file '{}'", path))?,
        ),
        None => None,
    };

    let mut models_found = 0;
    let mut final_result = SolverResult::Undetermined;

    loop {
        let result = solver.solve();

        match result {
            SolverResult::Sat => {
                models_found += 1;
                let model = solver.model().unwrap_or_else(Vec::new);

                emit_result(&mut result_file, result, Some(&model))?;

                if models_found >= max_solutions {
                    final_result = SolverResult::Sat;
                    break;
                }
                solver.block_model();
            }
            SolverResult::Unsat => {
                final_result = if models_found > 0 {
                    // Enumeration exhausted the model space; the original
                    // instance is still satisfiable.
                    SolverResult::Sat
                } else {
                    emit_result(&mut result_file, result, None)?;
                    SolverResult::Unsat
                };
                if models_found > 0 {
                    info!("No more solutions after {} models", models_found);
                }
                break;
            }
            SolverResult::Undetermined => {
                emit_result(&mut result_file, result, None)?;
                final_result = SolverResult::Undetermined;
                break;
            }
        }
    }

    log_stats(&solver);

    write_dumps(&matches, &solver)?;

    Ok(match final_result {
        SolverResult::Sat => EXIT_SAT,
        SolverResult::Unsat => EXIT_UNSAT,
        SolverResult::Undetermined => EXIT_UNDETERMINED,
    })
}

/// Write one result (and model) to the result file or stdout.
fn emit_result(
    result_file: &mut Option<fs::File>,
    result: SolverResult,
    model: Option<&[xorsat::Lit]>,
) -> Result<(), Error> {
    match result_file {
        Some(file) => {
            let line = match result {
                SolverResult::Sat => "SAT",
                SolverResult::Unsat => "UNSAT",
                SolverResult::Undetermined => "INCONCLUSIVE",
            };
            writeln!(file, "{}", line).context("could not write result file")?;
            if let Some(model) = model {
                let mut line = String::new();
                for lit in model {
                    line.push_str(&lit.to_dimacs().to_string());
                    line.push(' ');
                }
                line.push('0');
                writeln!(file, "{}", line).context("could not write result file")?;
            }
        }
        None => {
            let line = match result {
                SolverResult::Sat => "s SATISFIABLE",
                SolverResult::Unsat => "s UNSATISFIABLE",
                SolverResult::Undetermined => "s INCONCLUSIVE",
            };
            println!("{}", line);
            if let Some(model) = model {
                print!("v");
                for lit in model {
                    print!(" {}", lit);
                }
                println!(" 0");
            }
        }
    }
    Ok(())
}

/// Log a summary of the search statistics.
fn log_stats(solver: &Solver) {
    let stats = solver.stats();
    info!(
        "decisions: {} propagations: {} conflicts: {} restarts: {}",
        stats.decisions, stats.propagations, stats.conflicts, stats.restarts
    );
    info!(
        "learnt: {} units, {} binary, {} ternary, {} long ({} deleted)",
        stats.learnt_units,
        stats.learnt_binaries,
        stats.learnt_ternaries,
        stats.learnt_longs,
        stats.deleted_clauses
    );
    if stats.xor_propagations + stats.gauss_calls > 0 {
        info!(
            "xor: {} propagations, {} conflicts, gauss: {} calls, {} propagations, {} conflicts",
            stats.xor_propagations,
            stats.xor_conflicts,
            stats.gauss_calls,
            stats.gauss_propagations,
            stats.gauss_conflicts
        );
    }
}

/// Write the learnt and irredundant clause dumps when requested.
fn write_dumps(matches: &clap::ArgMatches, solver: &Solver) -> Result<(), Error> {
    if let Some(path) = matches.value_of("dump-learnts") {
        let max_len = if matches.is_present("max-dump-learnts-size") {
            value_t!(matches, "max-dump-learnts-size", usize)?
        } else {
            usize::max_value()
        };
        let mut file = fs::File::create(path)
            .with_context(|| format!("could not create learnt dump file '{}'", path))?;
        solver
            .write_learnts(&mut file, max_len)
            .context("could not write learnt dump")?;
        info!("Dumped learnt clauses to '{}'", path);
    }

    if let Some(path) = matches.value_of("dump-irred") {
        let mut file = fs::File::create(path)
            .with_context(|| format!("could not create dump file '{}'", path))?;
        solver
            .write_irredundant(&mut file)
            .context("could not write irredundant dump")?;
        info!("Dumped irredundant clauses to '{}'", path);
    }

    Ok(())
}
