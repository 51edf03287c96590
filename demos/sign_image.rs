//! Sign a photo with a handwriting image and report the detection score.
//!
//! Usage:
//! ```sh
//! cargo run --example sign_image -- photo.jpg signature.png signed.jpg [strength]
//! ```

use std::env;
use std::path::Path;
use std::process;

use stegosign::{ProcessOptions, SignatureEngine};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <input> <signature> <output> [strength]", args[0]);
        process::exit(1);
    }

    let input = Path::new(&args[1]);
    let output = Path::new(&args[3]);
    let strength = args.get(4).map_or(Ok(0.08), |s| s.parse::<f32>());
    let Ok(strength) = strength else {
        eprintln!("Error: strength must be a number (e.g. 0.08)");
        process::exit(1);
    };

    let engine = SignatureEngine::open(Path::new(&args[2])).expect("failed to load signature");
    let opts = ProcessOptions {
        strength,
        ..ProcessOptions::default()
    };

    let before = engine.detect_file(input).expect("failed to score input");
    if let Err(e) = engine.embed_file(input, output, &opts) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
    let after = engine.detect_file(output).expect("failed to score output");

    println!("Score before: {:.5}", before.score);
    println!("Score after:  {:.5}", after.score);
}
