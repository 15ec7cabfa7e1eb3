use tracing_subscriber::EnvFilter;

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    afl::fuzz!(|data: &[u8]| {
        let _ = nom_imagemeta::decode(data);
        let _ = nom_imagemeta::decode_jpeg(data);
        let _ = nom_imagemeta::decode_tiff(data);
        let _ = nom_imagemeta::decode_heif(data);
        let _ = nom_imagemeta::decode_cr3(data);
        let _ = nom_imagemeta::decode_png(data);
        let _ = nom_imagemeta::decode_webp(data);
        let _ = nom_imagemeta::scan_segments(data);
    });
}
