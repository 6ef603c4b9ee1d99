use crossbeam_channel::{select, tick};
use getopts::Options;
use hotstatsd::{parse_interval, Printer, Server};
use log::{error, info};
use std::{env, io, process};

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

pub fn opts() -> Options {
    let mut opts = Options::new();

    opts.optopt("", "host", "host to listen on (default: 127.0.0.1)", "HOST");
    opts.optopt("p", "port", "port to listen on (default: 8125)", "PORT");
    opts.optopt("f", "flush", "seconds between flushes (default: 10)", "SECONDS");
    opts.optflag("", "no-suppress-empty", "print empty snapshots in full");
    opts.optflag("h", "help", "print this help menu");

    opts
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = &args[0];
    let opts = opts();

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => {
            error!("Failed to parse command line args: {}", f);
            process::exit(2);
        },
    };

    if matches.opt_present("help") {
        print_usage(program, &opts);
        return;
    }

    let host = matches.opt_str("host").unwrap_or_else(|| "127.0.0.1".to_owned());
    let port: u16 = match matches.opt_str("port").unwrap_or_else(|| "8125".to_owned()).parse() {
        Ok(port) => port,
        Err(e) => {
            error!("invalid port: {}", e);
            process::exit(2);
        },
    };
    let flush = match parse_interval(&matches.opt_str("flush").unwrap_or_else(|| "10".to_owned())) {
        Some(interval) => interval,
        None => {
            error!("flush interval must be a positive number of seconds");
            process::exit(2);
        },
    };

    let handle = match Server::builder().address(format!("{}:{}", host, port)).build().and_then(|s| s.spawn()) {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start statsd server: {}", e);
            process::exit(1);
        },
    };
    info!("Started statsd server on {}", handle.local_addr());

    let mut printer = Printer::new().suppress_empty(!matches.opt_present("no-suppress-empty"));
    let ticker = tick(flush);
    let stdout = io::stdout();

    loop {
        select! {
            recv(ticker) -> _ => {
                let snapshot = handle.metrics().flush_and_snapshot();
                if let Err(e) = printer.print(&mut stdout.lock(), &snapshot) {
                    error!("failed to print metrics: {}", e);
                }
            },
            recv(handle.done()) -> e => {
                if let Ok(e) = e {
                    error!("statsd server stopped: {}", e);
                }
                process::exit(1);
            },
        }
    }
}
