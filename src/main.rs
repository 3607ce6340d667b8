fn main() {
    if let Err(err) = waffle_hub::run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
