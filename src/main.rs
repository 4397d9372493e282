use std::{
    fs,
    io::Write as _,
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use log::{info, warn};
use rand::{SeedableRng, rngs::StdRng};
use seidel_triangulator::{Scene, Triangle, TriangulationError, run_triangulation};
use serde::Serialize;

#[derive(Parser)]
struct Cli {
    /// Seed for the random edge order and point colors. A fixed seed
    /// reproduces a run exactly; random when absent.
    #[arg(long)]
    seed: Option<u64>,
    /// Output path. Defaults to a timestamped file in the working directory.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Write the result as a TOML report instead of plain text lines.
    #[arg(long)]
    toml: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Takes a text file with one `x y` pair per line; blank lines separate
    /// polygons.
    File { path: PathBuf },
    /// Takes a TOML scene with the polygons and an optional stored seed.
    Scene { path: PathBuf },
}

fn parse_or_readline() -> anyhow::Result<Cli> {
    // Args were provided (try to parse, exit on fail)
    if std::env::args_os().len() > 1 {
        return Ok(Cli::parse());
    }

    let mut cmd = Cli::command().no_binary_name(true);

    println!("No CLI arguments were provided");
    println!("Specify arguments via stdin:");
    println!("{}", cmd.render_long_help());

    std::io::stdout().flush().context("could not write to stdout")?;
    let mut buffer = String::new();
    std::io::stdin().read_line(&mut buffer).context("could not read stdin")?;

    let args = shlex::split(buffer.trim()).context("invalid quoting")?;
    let matches = cmd.try_get_matches_from(args).context("failed to parse args")?;

    Cli::from_arg_matches(&matches).context("failed to parse args")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let args = parse_or_readline()?;

    let scene = match &args.cmd {
        Command::File { path } => Scene { seed: None, polygons: load_polygons(path)? },
        Command::Scene { path } => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("could not read {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("{} is not a valid scene", path.display()))?
        }
    };

    let seed = args.seed.or(scene.seed);
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let area = scene.into_area_with_rng(&mut rng)?;
    area.check_simple().context("the input area must be free of crossing edges")?;
    info!("triangulating {} vertices", area.vertex_count());

    let (future, interrupter) = run_triangulation(area, rng);

    if let Err(err) = ctrlc::set_handler({
        let interrupter = interrupter.clone();
        let mut is_repeat = false;
        move || {
            if is_repeat {
                warn!("Aborting immediately");
                std::process::exit(-1);
            }

            is_repeat = true;
            warn!("Stopping...");
            interrupter.interrupt();
        }
    }) {
        warn!("Failed to set interrupt handler! {}", err);
    }

    let triangles = match future.future().await {
        Ok(triangles) => triangles,
        Err(err) => {
            if let Some(TriangulationError::Interrupted) =
                err.downcast_ref::<TriangulationError>()
            {
                info!("interrupted, nothing written");
                return Ok(());
            }
            return Err(err);
        }
    };

    let covered: f64 = triangles.iter().map(|t| t.signed_area().abs()).sum();
    info!("emitted {} triangles covering area {covered:.3}", triangles.len());

    let out_path = args.out.unwrap_or_else(|| {
        let run_timestamp = chrono::Utc::now().format("%y%m%d_%H%M%S");
        let extension = if args.toml { "toml" } else { "txt" };
        PathBuf::from(format!("triangles_{run_timestamp}.{extension}"))
    });

    if args.toml {
        write_toml_report(&out_path, seed, &triangles)?;
    } else {
        write_plain_report(&out_path, &triangles)?;
    }
    info!("wrote {}", out_path.display());

    Ok(())
}

fn load_polygons(path: &Path) -> anyhow::Result<Vec<Vec<(f64, f64)>>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    parse_polygons(&contents)
}

fn parse_polygons(contents: &str) -> anyhow::Result<Vec<Vec<(f64, f64)>>> {
    let mut polygons = Vec::new();
    let mut current = Vec::new();

    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                polygons.push(std::mem::take(&mut current));
            }
            continue;
        }

        let mut parts = line.split_whitespace();
        let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
            bail!("line {}: expected `x y`", index + 1);
        };
        let x = x.parse().with_context(|| format!("line {}: bad x coordinate", index + 1))?;
        let y = y.parse().with_context(|| format!("line {}: bad y coordinate", index + 1))?;
        current.push((x, y));
    }
    if !current.is_empty() {
        polygons.push(current);
    }

    Ok(polygons)
}

fn write_plain_report(path: &Path, triangles: &[Triangle]) -> anyhow::Result<()> {
    let mut out = String::new();
    for triangle in triangles {
        let [a, b, c] = triangle.vertices();
        out.push_str(&format!(
            "{} {} {} {} {} {} {}\n",
            a.x,
            a.y,
            b.x,
            b.y,
            c.x,
            c.y,
            triangle.color_hex()
        ));
    }
    fs::write(path, out).with_context(|| format!("could not write {}", path.display()))
}

#[derive(Serialize)]
struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    triangles: Vec<TriangleRecord>,
}

#[derive(Serialize)]
struct TriangleRecord {
    vertices: [(f64, f64); 3],
    color: String,
}

fn write_toml_report(path: &Path, seed: Option<u64>, triangles: &[Triangle]) -> anyhow::Result<()> {
    let report = Report {
        seed,
        triangles: triangles
            .iter()
            .map(|triangle| TriangleRecord {
                vertices: triangle.vertices().map(|p| (p.x, p.y)),
                color: triangle.color_hex(),
            })
            .collect(),
    };

    let contents = toml::to_string(&report).context("could not serialize the report")?;
    fs::write(path, contents).with_context(|| format!("could not write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_blank_line_separated_polygons() {
        let polygons = parse_polygons("0 0\n10 0\n0 10\n\n3 3\n3 7\n7 7\n").unwrap();
        assert_eq!(polygons, vec![
            vec![(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)],
            vec![(3.0, 3.0), (3.0, 7.0), (7.0, 7.0)],
        ]);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_polygons("0 0\n1\n").is_err());
        assert!(parse_polygons("0 0 0\n").is_err());
        assert!(parse_polygons("zero one\n").is_err());
    }
}
