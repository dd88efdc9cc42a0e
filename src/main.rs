use mapx_logger::{log, LogSeverity::Fatal};

fn main() {
    if let Err(err) = mapx::run() {
        log(format!("{:#}", err), Fatal);
        std::process::exit(1);
    }
}
