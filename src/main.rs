//! `webp_core_util`: a small CLI around the library for manual testing —
//! decode a `.webp` file to a `.ppm`, or print its header fields.
//!
//! Grounded in the teacher's `pico-args`/`simple_logger`/`git-version`
//! dependency trio for exactly this kind of utility binary.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use log::{error, info};
use webp_core::DecoderOptions;

fn print_usage() {
    eprintln!(
        "webp_core_util {}\n\n\
         USAGE:\n\
         \x20   webp_core_util decode <input.webp> <output.ppm> [--no-fancy-upsampling]\n\
         \x20   webp_core_util info <input.webp>\n",
        git_version::git_version!(fallback = "unknown")
    );
}

fn main() {
    simple_logger::SimpleLogger::new().init().ok();

    let mut args = pico_args::Arguments::from_env();
    let subcommand = args.subcommand().unwrap_or(None);

    let result = match subcommand.as_deref() {
        Some("decode") => run_decode(&mut args),
        Some("info") => run_info(&mut args),
        _ => {
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run_decode(args: &mut pico_args::Arguments) -> anyhow::Result<()> {
    let no_fancy = args.contains("--no-fancy-upsampling");
    let input: PathBuf = args.free_from_str()?;
    let output: PathBuf = args.free_from_str()?;

    let data = fs::read(&input)?;
    let options = DecoderOptions { no_fancy_upsampling: no_fancy, ..Default::default() };
    let payload = find_vp8_chunk(&data)?;
    let image = webp_core::frame::decode_keyframe(payload)?;
    let rgb = webp_core::decode_rgb(&data, &options).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let mut f = fs::File::create(&output)?;
    write!(f, "P6\n{} {}\n255\n", image.width, image.height)?;
    f.write_all(&rgb)?;
    info!("wrote {}x{} to {}", image.width, image.height, output.display());
    Ok(())
}

fn run_info(args: &mut pico_args::Arguments) -> anyhow::Result<()> {
    let input: PathBuf = args.free_from_str()?;
    let data = fs::read(&input)?;
    let payload = find_vp8_chunk(&data)?;
    let image = webp_core::frame::decode_keyframe(payload)?;
    println!("{}: {}x{} keyframe", input.display(), image.width, image.height);
    Ok(())
}

fn find_vp8_chunk(data: &[u8]) -> anyhow::Result<&[u8]> {
    webp_core::container::find_vp8_chunk(data).map_err(|e| anyhow::anyhow!(e.to_string()))
}
