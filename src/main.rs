fn main() {
    let texture_path = std::env::args().nth(1);
    if let Err(err) = quadbatch::run(texture_path) {
        eprintln!("Application error: {err}");
    }
}
