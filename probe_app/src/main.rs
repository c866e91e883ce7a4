//! Field probe
//!
//! Loads a scene description, registers its producers and prints the
//! composed force of every active category at each query point.
//!
//! ```text
//! field_probe demos/planet.toml --layer 0 0,2.5,0 10,0,3
//! ```

use force_field::foundation::logging;
use force_field::prelude::*;
use log::info;
use thiserror::Error;

#[derive(Debug, Error)]
enum ProbeError {
    #[error("usage: field_probe <scene.toml|scene.ron> [--layer N] x,y,z [x,y,z ...]")]
    Usage,

    #[error("invalid point '{0}', expected x,y,z")]
    InvalidPoint(String),

    #[error("invalid layer '{0}', expected 0..=31")]
    InvalidLayer(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Field(#[from] FieldError),
}

#[derive(Debug, PartialEq)]
struct ProbeArgs {
    scene: String,
    layer: Option<u8>,
    points: Vec<Vec3>,
}

fn parse_point(text: &str) -> Result<Vec3, ProbeError> {
    let invalid = || ProbeError::InvalidPoint(text.to_string());
    let components = text
        .split(',')
        .map(|c| c.trim().parse::<f32>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;
    match components.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(invalid()),
    }
}

fn parse_layer(text: &str) -> Result<u8, ProbeError> {
    text.parse::<u8>()
        .ok()
        .filter(|layer| *layer <= force_field::producer::MAX_LAYER)
        .ok_or_else(|| ProbeError::InvalidLayer(text.to_string()))
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ProbeArgs, ProbeError> {
    let mut args = args.into_iter();
    let scene = args.next().ok_or(ProbeError::Usage)?;
    let mut layer = None;
    let mut points = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--layer" {
            let value = args.next().ok_or(ProbeError::Usage)?;
            layer = Some(parse_layer(&value)?);
        } else {
            points.push(parse_point(&arg)?);
        }
    }

    if points.is_empty() {
        return Err(ProbeError::Usage);
    }
    Ok(ProbeArgs {
        scene,
        layer,
        points,
    })
}

fn run(args: &ProbeArgs) -> Result<(), ProbeError> {
    let config = FieldConfig::load_from_file(&args.scene)?;
    logging::init_with_level(&config.log_level);
    info!("Loaded scene '{}' ({} producers)", args.scene, config.producers.len());

    let field = config.build_field()?;
    field.log_diagnostics();

    for point in &args.points {
        println!("point ({:.3}, {:.3}, {:.3})", point.x, point.y, point.z);
        let forces = field.query_all_categories(*point, args.layer)?;
        if forces.is_empty() {
            println!("  no active categories");
        }
        for (category, force) in &forces {
            println!(
                "  {:<16} {:<15} ({:>9.4}, {:>9.4}, {:>9.4})  |{:.4}|",
                category.as_str(),
                format!("{:?}", field.categories().mode(category)),
                force.x,
                force.y,
                force.z,
                force.norm()
            );
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args(std::env::args().skip(1))?;
    run(&args)?;
    Ok(())
}
