fn main() {
    if let Err(err) = sheet_pb::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
