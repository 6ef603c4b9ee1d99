use chrono::Local;
use crossbeam_channel::{select, tick};
use getopts::Options;
use hotstatsd::{parse_interval, web, window_key, Recorder, Server};
use log::{error, info};
use std::{env, net::SocketAddr, process, sync::Arc, thread};

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

pub fn opts() -> Options {
    let mut opts = Options::new();

    opts.optopt("", "host", "host to listen on (default: 127.0.0.1)", "HOST");
    opts.optopt("p", "port", "UDP port to listen on for statsd (default: 8125)", "PORT");
    opts.optopt("", "http", "HTTP address for the web UI (default: 127.0.0.1:8080)", "ADDRESS");
    opts.optopt("w", "window", "seconds to aggregate metrics by (default: 1)", "SECONDS");
    opts.optflag("h", "help", "print this help menu");

    opts
}

fn fail(message: String) -> ! {
    error!("{}", message);
    process::exit(2);
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = &args[0];
    let opts = opts();

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => fail(format!("Failed to parse command line args: {}", f)),
    };

    if matches.opt_present("help") {
        print_usage(program, &opts);
        return;
    }

    let host = matches.opt_str("host").unwrap_or_else(|| "127.0.0.1".to_owned());
    let port: u16 = matches
        .opt_str("port")
        .unwrap_or_else(|| "8125".to_owned())
        .parse()
        .unwrap_or_else(|e| fail(format!("invalid port: {}", e)));
    let http: SocketAddr = matches
        .opt_str("http")
        .unwrap_or_else(|| "127.0.0.1:8080".to_owned())
        .parse()
        .unwrap_or_else(|e| fail(format!("invalid HTTP address: {}", e)));
    let window = match parse_interval(&matches.opt_str("window").unwrap_or_else(|| "1".to_owned())) {
        Some(window) => window,
        None => fail("window must be a positive number of seconds".to_owned()),
    };

    let handle = match Server::builder().address(format!("{}:{}", host, port)).build().and_then(|s| s.spawn()) {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start statsd server: {}", e);
            process::exit(1);
        },
    };
    info!("Started statsd server on {}", handle.local_addr());

    let recorder = Arc::new(Recorder::new());
    let http_recorder = Arc::clone(&recorder);
    let spawned = thread::Builder::new().name("statsd-http".to_owned()).spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("failed to create HTTP runtime: {}", e);
                process::exit(1);
            },
        };

        info!("Serving web UI on http://{}", http);
        if let Err(e) = runtime.block_on(web::serve(http_recorder, http)) {
            error!("HTTP server stopped: {}", e);
            process::exit(1);
        }
    });
    if let Err(e) = spawned {
        error!("failed to spawn HTTP server thread: {}", e);
        process::exit(1);
    }

    let ticker = tick(window);
    loop {
        select! {
            recv(ticker) -> _ => {
                let snapshot = handle.metrics().flush_and_snapshot();
                recorder.record(window_key(Local::now(), window), snapshot);
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
