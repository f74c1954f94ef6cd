use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use nalgebra::{SMatrix, Vector3};
use std::time::Instant;

use bicrystal_lattice::math::rational_approximation::best_rational_approximation;
use bicrystal_lattice::{
    bicrystal_report, coincident_deformations_2d, coincident_rotations_2d, coincident_rotations_about_axis,
    CoincidentLattice, Lattice, ReciprocalLatticeDirection, SearchConfig, SmithDecomposition,
};

#[derive(Parser)]
#[command(author, version, about = "Coincidence-site lattices and bicrystallography")]
struct Cli {
    /// Debug-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Builds the bicrystal of two lattices and prints its report.
    Csl {
        /// Basis of A, column-major (4 values for 2D, 9 for 3D).
        #[arg(long)]
        a: String,

        /// Basis of B, column-major.
        #[arg(long)]
        b: String,

        /// Keep the raw CSL and DSCL bases.
        #[arg(long)]
        no_rlll: bool,

        /// Miller-index range of the boundary-normal candidates.
        #[arg(long, default_value_t = 2)]
        normal_bound: i64,
    },
    /// RLLL-reduces a basis.
    Reduce {
        #[arg(long)]
        basis: String,

        #[arg(long, default_value_t = 0.75)]
        delta: f64,
    },
    /// Smith normal form of an integer matrix.
    Snf {
        /// Integer matrix, column-major.
        #[arg(long)]
        matrix: String,
    },
    /// Best rational approximation of a real number.
    Approx {
        #[arg(allow_hyphen_values = true)]
        x: f64,

        #[arg(long, default_value_t = 1000)]
        max_den: i64,
    },
    /// Coincident rotations (or strained deformations in 2D) of a lattice.
    Rotations {
        #[arg(long)]
        basis: String,

        /// Rotation axis as a reciprocal-lattice direction (3D only).
        #[arg(long)]
        axis: Option<String>,

        #[arg(long, default_value_t = 100)]
        max_den: i64,

        #[arg(long, default_value_t = 10)]
        bound: i64,

        #[arg(long, default_value_t = 0.0)]
        max_strain: f64,

        #[arg(long, default_value_t = 80)]
        max_configurations: usize,
    },
}

fn parse_list<T: std::str::FromStr>(text: &str) -> Result<Vec<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    text.split(',')
        .map(|s| s.trim().parse::<T>().with_context(|| format!("invalid number '{}'", s.trim())))
        .collect()
}

fn square<T: nalgebra::Scalar, const D: usize>(values: &[T]) -> SMatrix<T, D, D> {
    SMatrix::<T, D, D>::from_column_slice(values)
}

fn dimension(len: usize) -> Result<usize> {
    match len {
        4 => Ok(2),
        9 => Ok(3),
        n => bail!("expected 4 (2D) or 9 (3D) column-major values, got {}", n),
    }
}

fn run_csl<const D: usize>(a: &[f64], b: &[f64], config: &SearchConfig) -> Result<()> {
    let a = Lattice::new(square::<f64, D>(a)).context("invalid basis for A")?;
    let b = Lattice::new(square::<f64, D>(b)).context("invalid basis for B")?;
    let report = bicrystal_report(&a, &b, config).context("bicrystal construction failed")?;
    println!("{}", report);
    Ok(())
}

fn run_reduce<const D: usize>(basis: &[f64], delta: f64) -> Result<()> {
    let lattice = Lattice::new(square::<f64, D>(basis)).context("invalid basis")?;
    let (reduced, transform) = lattice.reduced(delta).context("reduction failed")?;
    println!("Reduced basis (columns):{}", reduced.basis());
    println!("Unimodular transform U:{}", transform);
    Ok(())
}

fn run_snf<const D: usize>(matrix: &[i64]) -> Result<()> {
    let smith = SmithDecomposition::new(&square::<i64, D>(matrix)).context("Smith decomposition failed")?;
    println!("D:{}", smith.matrix_d());
    println!("U:{}", smith.matrix_u());
    println!("V:{}", smith.matrix_v());
    println!("Index: {}", smith.index()?);
    Ok(())
}

fn print_coincident<const D: usize>(found: &[CoincidentLattice<D>]) {
    println!("-> {} configurations", found.len());
    for (i, c) in found.iter().enumerate() {
        match c.angle {
            Some(theta) => println!("{:>4}  angle {:>11.6} deg  sigma {}", i + 1, theta.to_degrees(), c.sigma),
            None => println!(
                "{:>4}  sigma_A {} sigma_B {}  F ={}",
                i + 1,
                c.sigma_a,
                c.sigma_b,
                c.deformation
            ),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    let start_time = Instant::now();

    match cli.command {
        Commands::Csl { a, b, no_rlll, normal_bound } => {
            let a: Vec<f64> = parse_list(&a)?;
            let b: Vec<f64> = parse_list(&b)?;
            if a.len() != b.len() {
                bail!("A and B must have the same dimension");
            }
            let config = SearchConfig { use_rlll: !no_rlll, gb_normal_bound: normal_bound, ..SearchConfig::default() };
            match dimension(a.len())? {
                2 => run_csl::<2>(&a, &b, &config)?,
                _ => run_csl::<3>(&a, &b, &config)?,
            }
        }
        Commands::Reduce { basis, delta } => {
            let basis: Vec<f64> = parse_list(&basis)?;
            match dimension(basis.len())? {
                2 => run_reduce::<2>(&basis, delta)?,
                _ => run_reduce::<3>(&basis, delta)?,
            }
        }
        Commands::Snf { matrix } => {
            let matrix: Vec<i64> = parse_list(&matrix)?;
            match dimension(matrix.len())? {
                2 => run_snf::<2>(&matrix)?,
                _ => run_snf::<3>(&matrix)?,
            }
        }
        Commands::Approx { x, max_den } => {
            let q = best_rational_approximation(x, max_den).context("approximation failed")?;
            println!("{} ≈ {} (error {:.3e})", x, q, x - q.to_f64());
        }
        Commands::Rotations { basis, axis, max_den, bound, max_strain, max_configurations } => {
            let basis: Vec<f64> = parse_list(&basis)?;
            let config = SearchConfig {
                max_denominator: max_den,
                max_strain,
                enumeration_bound: bound,
                max_configurations,
                ..SearchConfig::default()
            };
            match dimension(basis.len())? {
                2 => {
                    let lattice = Lattice::new(square::<f64, 2>(&basis)).context("invalid basis")?;
                    let found = if max_strain > 0.0 {
                        coincident_deformations_2d(&lattice, &config)?
                    } else {
                        coincident_rotations_2d(&lattice, &config)?
                    };
                    print_coincident(&found);
                }
                _ => {
                    let axis = axis.context("--axis is required for 3D lattices")?;
                    let axis: Vec<i64> = parse_list(&axis)?;
                    if axis.len() != 3 {
                        bail!("--axis needs 3 Miller indices, got {}", axis.len());
                    }
                    let lattice = Lattice::new(square::<f64, 3>(&basis)).context("invalid basis")?;
                    let direction = ReciprocalLatticeDirection::from_coordinates(Vector3::new(axis[0], axis[1], axis[2]), &lattice)
                        .context("invalid axis")?;
                    let found = coincident_rotations_about_axis(&lattice, &direction, &config)?;
                    print_coincident(&found);
                }
            }
        }
    }

    log::debug!("done in {:.2?}", start_time.elapsed());
    Ok(())
}
