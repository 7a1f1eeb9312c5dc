use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

fn load_image(path: &str) -> Result<(Vec<u8>, usize, usize), Box<dyn std::error::Error>> {
    let mut decoder = png::Decoder::new(File::open(path)?);
    decoder.set_transformations(
        png::Transformations::normalize_to_color8() | png::Transformations::ALPHA,
    );

    let mut reader = decoder.read_info()?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;

    if info.color_type != png::ColorType::Rgba {
        return Err(format!("cannot decode {path} to RGBA").into());
    }

    buf.truncate(info.buffer_size());

    Ok((buf, info.width as usize, info.height as usize))
}

fn save_image(
    path: &str,
    palette: &palquant::Palette,
    indexes: &[u8],
    width: usize,
    height: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rgb_palette = Vec::with_capacity((palette.count * 3) as usize);
    let mut trans = Vec::with_capacity(palette.count as usize);

    for e in palette.as_slice().iter() {
        rgb_palette.push(e.r);
        rgb_palette.push(e.g);
        rgb_palette.push(e.b);
        trans.push(e.a);
    }

    let file = File::create(Path::new(path))?;
    let w = &mut BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, width as u32, height as u32);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(rgb_palette);
    encoder.set_trns(trans);
    let mut writer = encoder.write_header()?;

    writer.write_image_data(indexes)?;

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 || args.len() > 4 {
        println!("Usage: palquant_demo <src_path> <dst_path> [speed]");
        std::process::exit(1)
    }

    let src_path = &args[1];
    let dst_path = &args[2];
    let speed = match args.get(3) {
        Some(s) => s.parse::<i32>()?,
        None => palquant::SPEED_DEFAULT,
    };

    let (bytes, width, height) = load_image(src_path)?;

    let mut attr = palquant::Attributes::new()?;
    attr.set_speed(speed)?;

    let image = attr.new_image(bytes, width, height, 0.0)?;

    let mut result = image.quantize(&attr)?;
    result.set_dithering_level(1.0)?;

    let indexes = result.write_remapped_image()?;

    save_image(dst_path, result.palette(), &indexes, width, height)
}
