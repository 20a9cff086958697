use std::env;

mod session;

use session::Session;

fn main() {
    init_logging(log::LevelFilter::Info);

    println!("program begin");
    let mut session = Session::new(env::args().skip(1));
    session.start();
    println!("program end");
}

fn init_logging(level: log::LevelFilter) {
    let outcome = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply();

    if let Err(err) = outcome {
        eprintln!("failed to initialize logging: {err}");
    }
}
