use std::path::PathBuf;

#[tokio::main]
async fn main() {
    env_logger::init();

    let arg = std::env::args().nth(1);
    if matches!(arg.as_deref(), Some("--version" | "-V")) {
        println!("{}", siggo::version::long_version());
        return;
    }

    if let Err(e) = siggo::app::run(arg.map(PathBuf::from)).await {
        log::error!("{e}");
        eprintln!("siggo: {e}");
        std::process::exit(1);
    }
}
