use slyther::cmdline;

fn main() {
    pretty_env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    if let Err(e) = cmdline::launch(&args) {
        eprintln!("{}", cmdline::paint_error(&e));
        std::process::exit(1);
    }
}
