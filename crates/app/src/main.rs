//! Entry point for meshtex.
//! Inspect and convert TGA images and Wavefront OBJ meshes.

use anyhow::{Context, Result, bail};
use asset::{
    mesh::MeshData,
    obj::{DEFAULT_MAX_LINE_LEN, ObjParser},
    texture::TextureData,
    tga::{Image, Pixel},
};

const USAGE: &str = "usage: meshtex <command> [args] [--flags]

commands:
  tga-info <file.tga>
  obj-info <file.obj> [--max-line=N]
  tga-fill <out.tga> [--size=WxH] [--color=RRGGBB[AA]]
  tga-to-png <in.tga> <out.png>
  png-to-tga <in.png> <out.tga>";

fn parse_size_args(args: &[String]) -> (u16, u16) {
    let mut w: Option<u16> = None;
    let mut h: Option<u16> = None;

    for arg in args {
        if let Some(v) = arg.strip_prefix("--size=") {
            if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                if let (Ok(pw), Ok(ph)) = (sw.parse::<u16>(), sh.parse::<u16>()) {
                    w = Some(pw);
                    h = Some(ph);
                }
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            if let Ok(pw) = v.parse::<u16>() {
                w = Some(pw);
            }
        } else if let Some(v) = arg.strip_prefix("--height=") {
            if let Ok(ph) = v.parse::<u16>() {
                h = Some(ph);
            }
        }
    }

    (w.unwrap_or(32), h.unwrap_or(32))
}

fn parse_color_arg(args: &[String]) -> Pixel {
    // --color=RRGGBB or --color=RRGGBBAA, default opaque black
    for arg in args {
        if let Some(val) = arg.strip_prefix("--color=") {
            let val = val.trim_start_matches('#');
            let channel = |i: usize| {
                val.get(i..i + 2)
                    .and_then(|s| u8::from_str_radix(s, 16).ok())
            };
            let parsed = match val.len() {
                6 => channel(0)
                    .zip(channel(2))
                    .zip(channel(4))
                    .map(|((r, g), b)| Pixel::rgb(r, g, b)),
                8 => channel(0)
                    .zip(channel(2))
                    .zip(channel(4))
                    .zip(channel(6))
                    .map(|(((r, g), b), a)| Pixel::rgba(r, g, b, a)),
                _ => None,
            };
            return parsed.unwrap_or_else(|| {
                log::warn!("Unknown color '{}', falling back to black.", val);
                Pixel::BLACK
            });
        }
    }
    Pixel::BLACK
}

fn parse_max_line_arg(args: &[String]) -> usize {
    for arg in args {
        if let Some(v) = arg.strip_prefix("--max-line=") {
            match v.parse::<usize>() {
                Ok(n) if n > 0 => return n,
                _ => log::warn!("Invalid --max-line '{}', using {}.", v, DEFAULT_MAX_LINE_LEN),
            }
        }
    }
    DEFAULT_MAX_LINE_LEN
}

fn positional(args: &[String], idx: usize, what: &str) -> Result<String> {
    args.iter()
        .filter(|a| !a.starts_with("--"))
        .nth(idx)
        .cloned()
        .with_context(|| format!("missing {what}\n\n{USAGE}"))
}

fn tga_info(args: &[String]) -> Result<()> {
    let path = positional(args, 1, "input TGA path")?;
    let image = Image::read(&path).with_context(|| format!("Failed to read {path}"))?;
    let header = image.header();
    let spec = &header.image_spec;

    log::info!(
        "{}: {}x{} origin=({}, {}) bpp={} alpha(depth={}, dir={})",
        path,
        spec.width,
        spec.height,
        spec.origin_x,
        spec.origin_y,
        spec.bpp,
        spec.alpha.depth,
        spec.alpha.dir
    );
    log::info!(
        "image_type={} ({:?}) id_length={} color_map(type={}, first={}, len={}, size={})",
        header.image_type,
        header.kind(),
        header.id_length,
        header.color_map_type,
        header.color_map.first_entry,
        header.color_map.length,
        header.color_map.entry_size
    );
    log::info!("{} pixels", image.pixels().len());
    Ok(())
}

fn obj_info(args: &[String]) -> Result<()> {
    let path = positional(args, 1, "input OBJ path")?;
    let parser = ObjParser::new().with_max_line_len(parse_max_line_arg(args));
    let obj = parser
        .parse_path(&path)
        .with_context(|| format!("Failed to parse {path}"))?;

    log::info!(
        "{}: object={:?} vertices={} normals={} uvs={} faces={}",
        path,
        obj.object_name().unwrap_or("<unnamed>"),
        obj.vertices().len(),
        obj.normals().len(),
        obj.uvs().len(),
        obj.faces().len()
    );
    for warning in obj.warnings() {
        log::warn!("{}", warning);
    }

    let mesh = MeshData::from_obj(&obj).context("Failed to unpack faces")?;
    log::info!("Unpacked {} triangles", mesh.triangle_count());
    Ok(())
}

fn tga_fill(args: &[String]) -> Result<()> {
    let path = positional(args, 1, "output TGA path")?;
    let (width, height) = parse_size_args(args);
    let fill = parse_color_arg(args);

    Image::with_fill(width, height, fill)
        .write(&path)
        .with_context(|| format!("Failed to write {path}"))?;
    log::info!("Wrote {}x{} image to {}", width, height, path);
    Ok(())
}

fn tga_to_png(args: &[String]) -> Result<()> {
    let input = positional(args, 1, "input TGA path")?;
    let output = positional(args, 2, "output PNG path")?;
    TextureData::load_tga(&input)?.save_png(&output)
}

fn png_to_tga(args: &[String]) -> Result<()> {
    let input = positional(args, 1, "input PNG path")?;
    let output = positional(args, 2, "output TGA path")?;
    let image = TextureData::load_png(&input)?.to_tga()?;
    image
        .write(&output)
        .with_context(|| format!("Failed to write {output}"))?;
    log::info!("Wrote {}x{} image to {}", image.width(), image.height(), output);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = positional(&args, 0, "command")?;
    log::debug!("Running '{}' with {:?}", command, args);

    match command.as_str() {
        "tga-info" => tga_info(&args),
        "obj-info" => obj_info(&args),
        "tga-fill" => tga_fill(&args),
        "tga-to-png" => tga_to_png(&args),
        "png-to-tga" => png_to_tga(&args),
        other => bail!("unknown command '{other}'\n\n{USAGE}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn size_flags() {
        assert_eq!(parse_size_args(&args(&["tga-fill", "a.tga"])), (32, 32));
        assert_eq!(parse_size_args(&args(&["--size=800X600"])), (800, 600));
        assert_eq!(parse_size_args(&args(&["--width=3", "--height=4"])), (3, 4));
        assert_eq!(parse_size_args(&args(&["--size=70000x1"])), (32, 32));
    }

    #[test]
    fn color_flag() {
        assert_eq!(parse_color_arg(&args(&[])), Pixel::BLACK);
        assert_eq!(parse_color_arg(&args(&["--color=ff8000"])), Pixel::rgb(255, 128, 0));
        assert_eq!(
            parse_color_arg(&args(&["--color=#0000FF80"])),
            Pixel::rgba(0, 0, 255, 128)
        );
        assert_eq!(parse_color_arg(&args(&["--color=zzzzzz"])), Pixel::BLACK);
    }

    #[test]
    fn max_line_flag() {
        assert_eq!(parse_max_line_arg(&args(&[])), DEFAULT_MAX_LINE_LEN);
        assert_eq!(parse_max_line_arg(&args(&["--max-line=1024"])), 1024);
        assert_eq!(parse_max_line_arg(&args(&["--max-line=0"])), DEFAULT_MAX_LINE_LEN);
    }

    #[test]
    fn positional_skips_flags() {
        let a = args(&["tga-fill", "--size=2x2", "out.tga"]);
        assert_eq!(positional(&a, 1, "output").unwrap(), "out.tga");
        assert!(positional(&a, 2, "extra").is_err());
    }
}
