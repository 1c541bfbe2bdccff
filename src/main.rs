use sketch_lighting::DemoConfig;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = sketch_lighting::run(DemoConfig::default()) {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
