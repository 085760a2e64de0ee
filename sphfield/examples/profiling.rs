use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use sphfield::{Kernel, KernelKind, Particle, ParticleSet, SimulationBox, Snapshot, Vector3D};
use sphfield::forces::LandshoffParameters;
use sphfield::interpolation::regular_grid;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let n_particles = match std::env::args().nth(1) {
        Some(value) => value.parse()?,
        None => 20_000,
    };

    // enable collection of profiling data
    time_graph::enable_data_collection(true);
    // clear any existing collected data
    time_graph::clear_collected_data();

    // run the calculation
    time_graph::spanned!("Full calculation", {
        analyze_snapshot(n_particles)
    })?;

    // get the call graph and display it
    let graph = time_graph::get_full_graph();
    // (this requires the "table" feature for the time_graph crate)
    println!("{}", graph.as_short_table());

    // also available for saving profiling data to the disk & future analysis
    // (this requires the "json" feature for the time_graph crate)
    println!("{}", graph.as_json());

    Ok(())
}

/// Density, velocity field and viscous stress for a random 2D snapshot with
/// a shear flow along x
fn analyze_snapshot(n_particles: usize) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(0);

    let volume = 1.0 / n_particles as f64;
    let mut particles = Vec::new();
    for _ in 0..n_particles {
        let x = rng.random::<f64>();
        let y = rng.random::<f64>();
        particles.push(Particle {
            position: Vector3D::new(x, y, 0.0),
            velocity: Vector3D::new(y - 0.5, 0.0, 0.0),
            density: 1.0,
            volume: volume,
            kind: 0,
        });
    }

    let particles = ParticleSet::from_particles(2, &particles)?;
    let mut snapshot = Snapshot::new(SimulationBox::square(1.0, true), particles)?;

    let smoothing_length = 3.0 * f64::sqrt(volume);
    let kernel = Kernel::new(KernelKind::Lucy, smoothing_length, 2)?;
    let density = snapshot.density(&kernel)?;
    println!("mean density: {}", density.mean().unwrap_or(f64::NAN));

    let grid = regular_grid(snapshot.domain(), 0.02)?;
    let velocities = snapshot.velocity_field(grid.points.view(), &kernel)?;
    println!("interpolated velocities on a {:?} grid", grid.shape);

    let parameters = LandshoffParameters {
        sound_speed: 10.0,
        density: 1.0,
        q1: 1.0,
        smoothing_length: smoothing_length,
        epsilon: 0.01,
        repulsion_only: false,
    };
    let stress = snapshot.stress_field(grid.points.view(), &kernel, &parameters)?;
    assert_eq!(stress.dim().0, velocities.nrows());

    Ok(())
}
