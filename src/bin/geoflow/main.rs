//! Geoflow CLI - headless mean curvature flow.
//!
//! Usage: geoflow <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `geoflow --help` for available commands.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};

use geoflow::algo::curvature::AREA_EPSILON;
use geoflow::algo::integrate::{max_curvature_norm, positions_finite};
use geoflow::algo::Progress;
use geoflow::io;
use geoflow::mesh::generators;
use geoflow::prelude::*;

#[derive(Parser)]
#[command(name = "geoflow")]
#[command(author, version, about = "Mean curvature flow CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh information and curvature statistics
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Run explicit mean curvature flow for a fixed number of steps
    Flow {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Number of steps
        #[arg(short = 'n', long, default_value = "100")]
        steps: usize,

        /// Time delta per step, in seconds
        #[arg(short = 't', long, default_value = "0.016")]
        time_step: f64,

        /// Flow speed (step scale = time step * speed)
        #[arg(short, long, default_value = "0.05")]
        speed: f64,

        /// Clamp every step's time delta to this value
        #[arg(long)]
        max_time_step: Option<f64>,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Write a procedurally generated mesh
    Generate {
        /// Output mesh file
        output: PathBuf,

        /// Shape to generate
        #[arg(long, value_enum, default_value = "icosphere")]
        shape: Shape,

        /// Subdivision level (icosphere) or cells per side (grid)
        #[arg(short = 'd', long, default_value = "3")]
        subdivisions: usize,

        /// Sphere radius or grid spacing
        #[arg(short, long, default_value = "1.0")]
        radius: f64,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Shape {
    /// Subdivided icosahedron projected onto a sphere
    Icosphere,
    /// Flat square grid in the XY plane
    Grid,
    /// Regular octahedron
    Octahedron,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> std::result::Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input } => {
            cmd_info(&input)?;
        }

        Commands::Flow {
            input,
            output,
            steps,
            time_step,
            speed,
            max_time_step,
            sequential,
        } => {
            let options = FlowOptions {
                flow_speed: speed,
                max_time_step,
                parallel: !sequential,
                ..FlowOptions::default()
            };
            options.validate()?;
            if !(time_step.is_finite() && time_step >= 0.0) {
                return Err(MeshError::invalid_param("time_step", time_step, "must be finite and non-negative").into());
            }
            cmd_flow(&input, &output, steps, time_step, options)?;
        }

        Commands::Generate {
            output,
            shape,
            subdivisions,
            radius,
        } => {
            cmd_generate(&output, shape, subdivisions, radius)?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0));

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // Never move the bar backwards.
        let previous = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        let percent = previous.max(raw_percent);
        if percent == previous && percent != 100 {
            return;
        }

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {} ({}/{})", bar, space, percent, message, current, total);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn cmd_info(input: &PathBuf) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mesh: FlowMesh = io::load(input)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Faces: {}", mesh.num_faces());

    let mut min_area = f64::MAX;
    let mut max_area = 0.0_f64;
    for fid in mesh.face_ids() {
        let area = mesh.face_area(fid);
        min_area = min_area.min(area);
        max_area = max_area.max(area);
    }
    println!("Surface area: {:.6}", mesh.surface_area());
    println!("Face area range: [{:.6}, {:.6}]", min_area, max_area);

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }

    // A driver that is never enabled only runs the normal and curvature passes.
    let driver = StepDriver::new(mesh, FlowOptions::default());
    let mesh = driver.mesh();

    let isolated = count_without_area(driver.vertex_areas());
    if isolated > 0 {
        println!("Vertices without area: {}", isolated);
    }

    let mean: Vec<f64> = mesh.vertex_ids().map(|v| mesh.mean_curvature(v)).collect();
    let h_min = mean.iter().cloned().fold(f64::INFINITY, f64::min);
    let h_max = mean.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let h_avg = mean.iter().sum::<f64>() / mean.len() as f64;

    println!("\nCurvature:");
    println!("  Mean |H|: min={:.4}, max={:.4}, avg={:.4}", h_min, h_max, h_avg);
    println!("  Largest |K|: {:.4}", max_curvature_norm(mesh));

    Ok(())
}

/// Vertices whose area is too small for the curvature pass to divide by.
fn count_without_area(areas: &[f64]) -> usize {
    areas.iter().filter(|&&a| a <= AREA_EPSILON).count()
}

fn cmd_flow(
    input: &PathBuf,
    output: &PathBuf,
    steps: usize,
    time_step: f64,
    options: FlowOptions,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mesh: FlowMesh = io::load(input)?;
    println!("Loaded: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());

    let area_before = mesh.surface_area();
    let mode = if options.parallel { "parallel" } else { "sequential" };
    println!(
        "Flowing {} steps (dt={}, speed={}, {})...",
        steps, time_step, options.flow_speed, mode
    );

    let mut driver = StepDriver::new(mesh, options);
    let progress = create_progress();

    let start = Instant::now();
    let largest = driver.run(steps, time_step, &progress);
    let elapsed = start.elapsed();

    let mesh = driver.into_mesh();
    if !positions_finite(&mesh) {
        return Err("flow diverged: non-finite vertex positions (try a smaller --time-step)".into());
    }

    println!(
        "Result: surface area {:.6} -> {:.6}, largest step displacement {:.3e}",
        area_before,
        mesh.surface_area(),
        largest
    );
    io::save(&mesh, output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}

fn cmd_generate(
    output: &PathBuf,
    shape: Shape,
    subdivisions: usize,
    radius: f64,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    if !(radius.is_finite() && radius > 0.0) {
        return Err(MeshError::invalid_param("radius", radius, "must be positive").into());
    }

    let mesh = match shape {
        Shape::Icosphere => generators::icosphere(subdivisions, radius),
        Shape::Grid => generators::flat_grid(subdivisions, radius),
        Shape::Octahedron => generators::octahedron(),
    };

    println!("Generated: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());
    io::save(&mesh, output)?;
    println!("Saved: {}", output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoflow::mesh::generators::tetrahedron;
    use geoflow::nalgebra::Point3;

    #[test]
    fn test_tiny_areas_count_as_missing() {
        let areas = [0.0, AREA_EPSILON * 0.5, AREA_EPSILON, 1e-6, 0.25];
        assert_eq!(count_without_area(&areas), 3);
    }

    #[test]
    fn test_collapsed_vertex_reported() {
        // A unit triangle next to one shrunk to 1e-8, whose vertex areas fall
        // below the threshold without being exactly zero.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(5.0, 5.0, 0.0),
            Point3::new(5.0 + 1e-8, 5.0, 0.0),
            Point3::new(5.0, 5.0 + 1e-8, 0.0),
        ];
        let mesh: FlowMesh = FlowMesh::from_triangles(&vertices, &[[0, 1, 2], [3, 4, 5]]).unwrap();

        let driver = StepDriver::new(mesh, FlowOptions::default());
        assert!(driver.vertex_areas()[3..].iter().all(|&a| a > 0.0));
        assert_eq!(count_without_area(driver.vertex_areas()), 3);

        let healthy = StepDriver::new(tetrahedron(), FlowOptions::default());
        assert_eq!(count_without_area(healthy.vertex_areas()), 0);
    }
}
