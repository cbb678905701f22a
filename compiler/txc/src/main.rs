//! Twin expression CLI.

use tx_bind::BindOptions;
use txc::commands::{
    bind_expression, describe_expression, eval_expression, parse_expression,
    simplify_expression, unbound_expression, BindRequest, CommandError, EvalMode,
};

fn main() {
    txc::init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    let result = match command.as_str() {
        "parse" => {
            require_expression(&args, "Usage: txc parse <expr | @file>");
            parse_expression(&args[2])
        }
        "simplify" => {
            require_expression(&args, "Usage: txc simplify <expr | @file>");
            simplify_expression(&args[2])
        }
        "describe" => {
            require_expression(&args, "Usage: txc describe <expr | @file> [--imperial]");
            let metric = !args.iter().skip(3).any(|a| a == "--imperial");
            describe_expression(&args[2], metric)
        }
        "unbound" => {
            require_expression(&args, "Usage: txc unbound <expr | @file>");
            unbound_expression(&args[2])
        }
        "eval" => {
            require_expression(&args, "Usage: txc eval <expr | @file> [--env=<env.json>] [--as=direct|bool|number]");
            let mut env_path = None;
            let mut mode = EvalMode::Direct;
            for arg in args.iter().skip(3) {
                if let Some(path) = arg.strip_prefix("--env=") {
                    env_path = Some(path);
                } else if let Some(flag) = arg.strip_prefix("--as=") {
                    let Some(parsed) = EvalMode::from_flag(flag) else {
                        eprintln!("error: unknown evaluation mode '{flag}'");
                        eprintln!("Valid modes: direct, bool, number");
                        std::process::exit(1);
                    };
                    mode = parsed;
                } else {
                    eprintln!("warning: ignoring unknown option '{arg}'");
                }
            }
            eval_expression(&args[2], env_path, mode)
        }
        "bind" => run_bind(&args),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        "version" | "--version" | "-v" => {
            println!("txc {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn require_expression(args: &[String], usage: &str) {
    if args.len() < 3 {
        eprintln!("{usage}");
        std::process::exit(1);
    }
}

fn run_bind(args: &[String]) -> Result<(), CommandError> {
    const USAGE: &str = "Usage: txc bind <expr | @file> --building=<building.json> --twin=<id> [options]";
    require_expression(args, USAGE);

    let mut building = None;
    let mut request = BindRequest::default();
    let mut options = BindOptions::default();
    for arg in args.iter().skip(3) {
        if let Some(path) = arg.strip_prefix("--building=") {
            building = Some(path);
        } else if let Some(id) = arg.strip_prefix("--twin=") {
            id.clone_into(&mut request.twin);
        } else if let Some(path) = arg.strip_prefix("--env=") {
            request.env = Some(path.to_owned());
        } else if let Some(max) = arg.strip_prefix("--max-array=") {
            let Ok(max) = max.parse() else {
                eprintln!("error: --max-array expects a number, got '{max}'");
                std::process::exit(1);
            };
            options.max_array_count = max;
        } else if let Some(names) = arg.strip_prefix("--ignore=") {
            options = options.with_ignored(names.split(',').filter(|n| !n.is_empty()));
        } else {
            eprintln!("warning: ignoring unknown option '{arg}'");
        }
    }

    let Some(building) = building else {
        eprintln!("error: missing --building");
        eprintln!("{USAGE}");
        std::process::exit(1);
    };
    if request.twin.is_empty() {
        eprintln!("error: missing --twin");
        eprintln!("{USAGE}");
        std::process::exit(1);
    }

    request.options = options;
    bind_expression(&args[2], building, request)
}

fn print_usage() {
    println!("Twin expression CLI");
    println!();
    println!("Usage: txc <command> [options]");
    println!();
    println!("Expressions are given inline or as @path to read them from a file.");
    println!();
    println!("Commands:");
    println!("  parse <expr>         Show the parsed tree and its canonical form");
    println!("  simplify <expr>      Fold constants and print the canonical form");
    println!("  describe <expr>      Describe the expression in English");
    println!("  unbound <expr>       List free variables and unknown functions");
    println!("  eval <expr>          Evaluate the expression");
    println!("  bind <expr>          Bind the expression to a twin, simplify and evaluate");
    println!("  help                 Show this help message");
    println!("  version              Show version information");
    println!();
    println!("Describe options:");
    println!("  --imperial           Convert amounts to imperial units");
    println!();
    println!("Eval options:");
    println!("  --env=<file>         Environment fixture (variables, units, functions)");
    println!("  --as=<mode>          direct (default), bool or number");
    println!();
    println!("Bind options:");
    println!("  --building=<file>    Building fixture (twins, relationships, models)");
    println!("  --twin=<id>          Twin the expression is centred on");
    println!("  --env=<file>         Environment fixture");
    println!("  --max-array=<n>      Array elements to fold before failing (default: 10)");
    println!("  --ignore=<a,b,...>   Names to leave unbound");
}
