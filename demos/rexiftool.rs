use std::{error::Error, fs::File};

use clap::Parser;
use nom_imagemeta::{DecodeOptions, Exif, MetaParser};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Files to decode.
    #[arg(required = true)]
    files: Vec<String>,

    /// Print the decoded record as JSON.
    #[arg(short, long)]
    json: bool,

    /// Skip maker-note decoding.
    #[arg(long)]
    no_maker_notes: bool,

    /// Print every tag, not only the summary.
    #[arg(short, long)]
    tags: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let opts = DecodeOptions::new().decode_maker_notes(!cli.no_maker_notes);
    let mut parser = MetaParser::with_options(opts);

    for path in &cli.files {
        let f = File::open(path)?;
        let exif = match parser.parse(&f) {
            Ok(exif) => exif,
            Err(e) => {
                eprintln!("{path}: {e}");
                continue;
            }
        };

        if cli.json {
            print_json(&exif)?;
        } else {
            println!("== {path}");
            print_summary(&exif);
            if cli.tags {
                print_tags(&exif);
            }
        }
    }

    Ok(())
}

fn print_summary(exif: &Exif) {
    let line = |name: &str, value: String| println!("{name:<32}=> {value}");

    line("ImageType", exif.image_type.to_string());
    line("ByteOrder", exif.header.byte_order.to_string());
    if let Some(make) = &exif.make {
        line("Make", make.clone());
    }
    if let Some(model) = &exif.model {
        line("Model", model.clone());
    }
    line(
        "ImageSize",
        format!("{}x{}", exif.image_width, exif.image_height),
    );
    if let Some(iso) = exif.exposure.iso {
        line("ISO", iso.to_string());
    }
    if let Some(f) = exif.exposure.aperture() {
        line("FNumber", format!("{f:.1}"));
    }
    if let Some(t) = exif.exposure.shutter_seconds() {
        line("ExposureTime", format!("{t}s"));
    }
    if let Some(focal) = exif.focal_length.and_then(|f| f.to_f64()) {
        line("FocalLength", format!("{focal:.1} mm"));
    }
    if let Some(t) = exif.dates.original {
        line("DateTimeOriginal", t.to_rfc3339());
    }
    if let Some(gps) = &exif.gps {
        line("GPS", format!("{gps:?}"));
    }
    if let Some(lens) = &exif.lens.model {
        line("Lens", lens.clone());
    }
    if let Some(canon) = exif.maker_note.as_canon() {
        if let Some(name) = canon.model_name() {
            line("CanonModel", name.to_owned());
        }
        if let Some(lens) = &canon.lens_name {
            line("CanonLens", lens.clone());
        }
        if let Some(af) = &canon.af_info {
            line("AFInfo", format!("{af:?}"));
        }
    }
    if let Some(xmp) = exif.xmp {
        line("XMP", format!("{} bytes at {:#x}", xmp.length, xmp.offset));
    }
}

fn print_tags(exif: &Exif) {
    for tag in exif.tags.sorted() {
        let name = exif
            .tag_name(tag)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("{:#06x}", tag.id));
        let value = tag
            .value
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| format!("<{} x {:?}>", tag.unit_count, tag.tag_type));
        println!("{:<8}{name:<32}=> {value}", tag.ifd.to_string());
    }
}

#[cfg(feature = "json_dump")]
fn print_json(exif: &Exif) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(exif)?);
    Ok(())
}

#[cfg(not(feature = "json_dump"))]
fn print_json(_: &Exif) -> Result<(), Box<dyn Error>> {
    Err("rebuild with the `json_dump` feature for JSON output".into())
}
