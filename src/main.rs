fn main() {
    if let Err(e) = seamm_datastore::run() {
        eprintln!("seamm-datastore error: {}", e);
        std::process::exit(1);
    }
}
