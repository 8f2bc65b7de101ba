use robot_mission::SimConfig;
use robot_mission::logging;
use robot_mission::runner::{self, SweepPlan};

fn parse_usize_list(arg: &str) -> Option<Vec<usize>> {
    let mut values = Vec::new();
    for part in arg.split(',') {
        if part.trim().is_empty() {
            return None;
        }
        let value = part.trim().parse::<usize>().ok()?;
        values.push(value);
    }
    Some(values)
}

fn parse_name_list(arg: &str) -> Option<Vec<String>> {
    let mut values = Vec::new();
    for part in arg.split(',') {
        let name = part.trim();
        if name.is_empty() {
            return None;
        }
        values.push(name.to_string());
    }
    Some(values)
}

fn print_usage(program: &str) {
    println!("Robot Mission CLI");
    println!("Usage:");
    println!("  {program} (run demo with defaults)");
    println!("  {program} run [config.toml]");
    println!("  {program} sweep [heuristics] [robot_sets] [waste_sets] [runs] [max_steps]");
    println!("  {program} --help");
    println!();
    println!("Sets are comma-separated lists (e.g., 1,2,4). Use \"-\" to keep a default.");
    println!("Heuristics: closest, farthest, random, min_total_distance, astar, astar_<selection>");
    println!("Defaults:");
    println!("  run    30x30 grid, robots=5,3,2 waste=10,0,0 heuristic=closest");
    println!("         max_steps=2000 seed=42");
    println!("  sweep  heuristics=closest,random,min_total_distance");
    println!("         robots=1,2,4 waste=4,8,16 runs=10");
    println!("Set RUST_LOG (e.g. RUST_LOG=info) for progress on stderr.");
}

fn exit_with_usage(program: &str, message: &str) -> ! {
    eprintln!("{message}");
    print_usage(program);
    std::process::exit(2);
}

fn invalid_sweep_arg(program: &str, name: &str, arg: &str) -> ! {
    exit_with_usage(program, &format!("sweep: invalid {name} value: {arg}"))
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

fn run_config(config: SimConfig) {
    let summary = match runner::run_single(config.clone()) {
        Ok(summary) => summary,
        Err(err) => exit_with_error(&err.to_string()),
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(err) = runner::write_summary(&mut out, &config, &summary) {
        exit_with_error(&err.to_string());
    }
}

fn main() {
    logging::init();
    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "robot_mission".to_string());
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("run") => {
            let config = match args.next() {
                Some(path) => match SimConfig::from_file(&path) {
                    Ok(config) => config,
                    Err(err) => exit_with_error(&format!("{path}: {err}")),
                },
                None => SimConfig::default(),
            };
            if let Some(extra) = args.next() {
                exit_with_usage(&program, &format!("run: unexpected argument: {extra}"));
            }
            run_config(config);
        }
        Some("sweep") => {
            let mut plan = SweepPlan::default();
            for (index, arg) in args.enumerate() {
                if arg == "-" {
                    continue;
                }
                match index {
                    0 => match parse_name_list(&arg) {
                        Some(values) => plan.heuristics = values,
                        None => invalid_sweep_arg(&program, "heuristics", &arg),
                    },
                    1 => match parse_usize_list(&arg) {
                        Some(values) => plan.robot_sets = values,
                        None => invalid_sweep_arg(&program, "robot_sets", &arg),
                    },
                    2 => match parse_usize_list(&arg) {
                        Some(values) => plan.waste_sets = values,
                        None => invalid_sweep_arg(&program, "waste_sets", &arg),
                    },
                    3 => match arg.parse::<usize>() {
                        Ok(value) if value > 0 => plan.runs = value,
                        _ => invalid_sweep_arg(&program, "runs", &arg),
                    },
                    4 => match arg.parse::<u64>() {
                        Ok(value) => plan.base.max_steps = value,
                        Err(_) => invalid_sweep_arg(&program, "max_steps", &arg),
                    },
                    _ => {
                        exit_with_usage(&program, &format!("sweep: unexpected argument: {arg}"))
                    }
                }
            }
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            if let Err(err) = runner::run_sweep(&plan, &mut out) {
                exit_with_error(&err.to_string());
            }
        }
        Some("--help") | Some("-h") | Some("help") => print_usage(&program),
        Some(other) => {
            exit_with_usage(&program, &format!("unknown command: {other}"));
        }
        None => run_config(SimConfig::default()),
    }
}
