fn main() {
    let args: Vec<String> = std::env::args().collect();
    shoal_cli::setup_logging(shoal_cli::log_level(&args));

    let code = shoal_cli::run(&args, &mut std::io::stdout(), &mut std::io::stderr());
    std::process::exit(code);
}
