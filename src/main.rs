use std::process;

fn main() {
    match drover::cli::run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}
